//! Profile returned by the current-user endpoint.

// self
use crate::_prelude::*;

/// Authenticated user as reported by the session endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Server-side identifier; some deployments return numbers, others strings.
	#[serde(default, deserialize_with = "de_opt_id")]
	pub id: Option<String>,
	/// Account email.
	pub email: String,
	/// Display name.
	#[serde(default)]
	pub name: Option<String>,
}

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum RawId {
		Text(String),
		Number(u64),
	}

	Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
		RawId::Text(text) => text,
		RawId::Number(number) => number.to_string(),
	}))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn accepts_numeric_and_missing_ids() {
		let numeric: UserProfile =
			serde_json::from_str(r#"{"id":42,"email":"ops@example.com","name":"Ops"}"#)
				.expect("Numeric ids should deserialize.");
		let missing: UserProfile = serde_json::from_str(r#"{"email":"ops@example.com"}"#)
			.expect("Missing ids should deserialize.");

		assert_eq!(numeric.id.as_deref(), Some("42"));
		assert_eq!(missing.id, None);
		assert_eq!(missing.name, None);
	}
}

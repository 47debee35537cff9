//! Per-company dashboard fetch.

// self
use crate::{
	_prelude::*,
	client::{AuthenticatedClient, RequestDescriptor, executor},
	error::ConfigError,
	http::HttpTransport,
	obs::{self, FlowKind},
};

impl<T> AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Fetches the dashboard of `company_id` as an opaque JSON payload.
	///
	/// The id is percent-encoded into a single path segment. A `204` yields [`Value::Null`].
	pub async fn dashboard(&self, company_id: &str) -> Result<Value> {
		obs::observe(FlowKind::Dashboard, "dashboard", async move {
			let path = dashboard_path(&self.config().endpoints.dashboard, company_id)?;

			Ok(self.call(RequestDescriptor::get(path)).await?.unwrap_or(Value::Null))
		})
		.await
	}

	/// Fetches the dashboard of `company_id`, decoded into `R`.
	pub async fn dashboard_as<R>(&self, company_id: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		executor::decode(Some(self.dashboard(company_id).await?))
	}
}

fn dashboard_path(prefix: &str, company_id: &str) -> Result<String, ConfigError> {
	if matches!(company_id, "" | "." | "..") {
		return Err(ConfigError::InvalidPathSegment { segment: company_id.into() });
	}

	Ok(format!("{}/{}", prefix.trim_end_matches('/'), urlencoding::encode(company_id)))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn company_id_is_appended_as_one_segment() {
		assert_eq!(dashboard_path("/dashboard", "7").expect("Plain id should encode."), "/dashboard/7");
		assert_eq!(
			dashboard_path("/dashboard/", "acme corp").expect("Spaces should encode."),
			"/dashboard/acme%20corp"
		);
		assert_eq!(
			dashboard_path("/dashboard", "7/../../admin/users?x=#top")
				.expect("Reserved characters should encode."),
			"/dashboard/7%2F..%2F..%2Fadmin%2Fusers%3Fx%3D%23top"
		);
	}

	#[test]
	fn dot_and_empty_ids_are_rejected() {
		for id in ["", ".", ".."] {
			let err = dashboard_path("/dashboard", id).expect_err("Dot segments should be rejected.");

			assert!(matches!(err, ConfigError::InvalidPathSegment { .. }));
		}
	}
}

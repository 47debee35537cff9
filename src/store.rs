//! Storage contracts for session credentials and the built-in key-value backends.

pub mod file;
pub mod memory;
pub mod tokens;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use tokens::TokenStore;

// self
use crate::_prelude::*;

/// Boxed future returned by every [`KeyValueStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Opaque async key-value capability the session credentials are persisted in.
///
/// Every operation is individually fallible. Callers above [`TokenStore`] never see these
/// errors; the facade degrades them to "absent" and logs a diagnostic.
pub trait KeyValueStore
where
	Self: Send + Sync,
{
	/// Fetches the value stored under `key`, if present.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Persists or replaces the value stored under `key`.
	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

	/// Removes `key`; removing a missing key is not an error.
	fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;

	/// Removes several keys at once.
	///
	/// The default implementation deletes one key at a time and stops at the first failure;
	/// backends that can remove keys in one step should override it.
	fn delete_many<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			for key in keys {
				self.delete(*key).await?;
			}

			Ok(())
		})
	}
}

/// Error type produced by [`KeyValueStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

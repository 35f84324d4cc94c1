//! Token storage port and built-in implementations.
//!
//! The two tokens are the only persistent client state. They live behind [`TokenStore`], a
//! get/set/clear contract keyed by [`TokenKey`], so production code can persist them on disk
//! while tests swap in [`MemoryStore`].

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{TokenKey, TokenPair, TokenSecret},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for the persisted token pair.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Fetches the value stored under `key`, if present.
	fn get(&self, key: TokenKey) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Persists or replaces the value stored under `key`.
	fn set(&self, key: TokenKey, value: TokenSecret) -> StoreFuture<'_, ()>;

	/// Removes the value stored under `key`; removing a missing key succeeds.
	fn clear(&self, key: TokenKey) -> StoreFuture<'_, ()>;
}
impl dyn TokenStore {
	/// Writes both tokens, access first.
	pub async fn save_pair(&self, pair: TokenPair) -> Result<(), StoreError> {
		self.set(TokenKey::AccessToken, pair.access_token).await?;
		self.set(TokenKey::RefreshToken, pair.refresh_token).await
	}

	/// Reads both tokens; `None` unless both are present.
	pub async fn load_pair(&self) -> Result<Option<TokenPair>, StoreError> {
		let access = self.get(TokenKey::AccessToken).await?;
		let refresh = self.get(TokenKey::RefreshToken).await?;

		Ok(access
			.zip(refresh)
			.map(|(access_token, refresh_token)| TokenPair { access_token, refresh_token }))
	}

	/// Removes both tokens, attempting the second even when the first fails.
	pub async fn clear_all(&self) -> Result<(), StoreError> {
		let access = self.clear(TokenKey::AccessToken).await;
		let refresh = self.clear(TokenKey::RefreshToken).await;

		access.and(refresh)
	}
}

/// Error type produced by [`TokenStore`] implementations.
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

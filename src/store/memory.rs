//! Thread-safe in-memory [`TokenStore`] implementation for tests and short-lived processes.

// self
use crate::{
	_prelude::*,
	auth::{TokenKey, TokenSecret},
	store::{StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<TokenKey, TokenSecret>>>;

/// Storage backend that keeps the token pair in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns a store pre-seeded with the provided values.
	pub fn with_tokens<I>(tokens: I) -> Self
	where
		I: IntoIterator<Item = (TokenKey, TokenSecret)>,
	{
		Self(Arc::new(RwLock::new(tokens.into_iter().collect())))
	}

	/// Synchronous snapshot of a stored value, handy for assertions.
	pub fn peek(&self, key: TokenKey) -> Option<TokenSecret> {
		self.0.read().get(&key).cloned()
	}

	/// Returns `true` when neither token is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl TokenStore for MemoryStore {
	fn get(&self, key: TokenKey) -> StoreFuture<'_, Option<TokenSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(&key).cloned()) })
	}

	fn set(&self, key: TokenKey, value: TokenSecret) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key, value);

			Ok(())
		})
	}

	fn clear(&self, key: TokenKey) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().remove(&key);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn set_replaces_and_clear_is_idempotent() {
		let store = MemoryStore::with_tokens([(TokenKey::AccessToken, TokenSecret::new("old"))]);

		store
			.set(TokenKey::AccessToken, TokenSecret::new("new"))
			.await
			.expect("Replacing a token should succeed.");

		assert_eq!(store.peek(TokenKey::AccessToken), Some(TokenSecret::new("new")));

		store.clear(TokenKey::RefreshToken).await.expect("Clearing a missing key should succeed.");
		store.clear(TokenKey::AccessToken).await.expect("Clearing a present key should succeed.");

		assert!(store.is_empty());
	}
}

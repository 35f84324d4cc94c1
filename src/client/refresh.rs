//! Access-token refresh against the token endpoint.
//!
//! A refresh posts the stored refresh token as `{ "refresh": ... }` and expects
//! `{ "access": ... }` back. Success replaces only the access token. Any failure to obtain a new
//! access token (missing refresh token, non-2xx, network error, unusable body) clears both tokens
//! so the caller lands in a logged-out state.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use ::http::Method;
// self
use crate::{
	_prelude::*,
	auth::{TokenKey, TokenSecret},
	client::{ApiClient, RequestBody, build_request},
	http::ApiHttpClient,
	obs::{self, CallSpan, Operation, Outcome, trace_debug, trace_warn},
	store::TokenStore,
};

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
	refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
	access: TokenSecret,
}

impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Exchanges the stored refresh token for a new access token and persists it.
	///
	/// Returns [`Error::NoRefreshToken`] when no refresh token is stored and
	/// [`Error::AuthExpired`] when the token endpoint does not produce a usable access token; both
	/// clear the stored pair first. Store failures surface as [`Error::Storage`].
	pub async fn refresh_access_token(&self) -> Result<TokenSecret> {
		const OPERATION: Operation = Operation::Refresh;

		let span = CallSpan::new(OPERATION, "refresh_access_token");

		obs::record_call_outcome(OPERATION, Outcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span
			.instrument(async move {
				let Some(refresh) = self.store.get(TokenKey::RefreshToken).await? else {
					self.force_logout().await?;

					return Err(Error::NoRefreshToken);
				};
				let Some(access) = self.exchange_refresh_token(&refresh).await? else {
					self.force_logout().await?;

					return Err(Error::AuthExpired);
				};

				self.store.set(TokenKey::AccessToken, access.clone()).await?;

				Ok(access)
			})
			.await;

		match &result {
			Ok(_) => self.refresh_metrics.record_success(),
			Err(_) => self.refresh_metrics.record_failure(),
		}

		obs::record_call_outcome(OPERATION, Outcome::of(&result));

		result
	}

	/// Calls the token endpoint; `Ok(None)` means the endpoint did not yield a usable token.
	async fn exchange_refresh_token(&self, refresh: &TokenSecret) -> Result<Option<TokenSecret>> {
		let url = self.config.refresh_url()?;
		let body = RequestBody::json(&RefreshRequest { refresh: refresh.expose() })?;
		let request = build_request(&url, &Method::POST, &body, None)?;
		let response = match self.http_client.execute(request).await {
			Ok(response) => response,
			Err(_e) => {
				trace_debug!(error = %_e, "Token refresh request failed.");

				return Ok(None);
			},
		};

		if !response.status().is_success() {
			trace_debug!(status = response.status().as_u16(), "Token endpoint rejected refresh.");

			return Ok(None);
		}

		Ok(serde_json::from_slice::<RefreshResponse>(response.body())
			.ok()
			.map(|payload| payload.access)
			.filter(|access| !access.expose().is_empty()))
	}

	/// Clears both stored tokens after an unrecoverable authentication failure.
	async fn force_logout(&self) -> Result<()> {
		trace_warn!("Clearing stored tokens after failed refresh.");

		self.refresh_metrics.record_forced_logout();
		<dyn TokenStore>::clear_all(self.store.as_ref()).await?;

		Ok(())
	}
}

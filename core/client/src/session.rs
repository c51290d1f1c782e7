use std::fmt;

use monai_cloud_types::{LoginRequest, LoginResponse};
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, info};
use url::Url;
use zeroize::Zeroizing;

use crate::error::ApiError;

/// Credentials obtained from `POST /api/v1/login`.
///
/// A session lives in memory only. It is never refreshed: once the token expires every call
/// fails with [`ApiError::Unauthorized`] and a new login is required.
pub struct Session {
    host: Url,
    user_id: String,
    token: Zeroizing<String>,
}

impl Session {
    /// Exchanges `api_key` for a bearer token.
    ///
    /// Anything other than a 201 carrying both `user_id` and `token` is an
    /// [`ApiError::Authentication`]; no retry is attempted.
    pub async fn login(http: &Client, host: &Url, api_key: &str) -> Result<Self, ApiError> {
        let url = join_segments(host, &["api", "v1", "login"])?;
        debug!("logging in at {url}");

        let response = http
            .post(url)
            .json(&LoginRequest {
                ngc_api_key: api_key,
            })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Authentication(format!(
                "login returned {status}: {body}"
            )));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Authentication(format!("unreadable login response: {e}")))?;
        let (user_id, token) = body.into_parts().ok_or_else(|| {
            ApiError::Authentication("login response is missing user_id or token".to_string())
        })?;

        info!("logged in as user {user_id}");
        Ok(Self {
            host: host.clone(),
            user_id,
            token: Zeroizing::new(token),
        })
    }

    /// Builds a session from credentials obtained elsewhere.
    pub fn from_parts(host: Url, user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host,
            user_id: user_id.into(),
            token: Zeroizing::new(token.into()),
        }
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// `{host}/api/v1/users/{user_id}`, the root of every resource path.
    pub fn base_url(&self) -> Result<Url, ApiError> {
        join_segments(&self.host, &["api", "v1", "users", &self.user_id])
    }

    /// `base_url` followed by `segments`.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        join_segments(&self.base_url()?, segments)
    }

    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.token.as_str())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host.as_str())
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Parses the host given by the user. Only absolute `http`/`https` urls are accepted.
pub fn parse_host(host: &str) -> Result<Url, ApiError> {
    let url = Url::parse(host.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ApiError::InvalidHost(format!(
            "unsupported scheme '{scheme}' in {host}"
        ))),
    }
}

/// Appends path segments to `base`.
///
/// Segments are pushed one by one rather than joined as a relative url, so ids containing
/// `:` (as in `{job}:cancel`) are not mistaken for a scheme.
pub fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidHost(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

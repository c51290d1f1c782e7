use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/login`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub ngc_api_key: &'a str,
}

/// Body returned by a successful login.
///
/// Both fields are optional on the wire so that a truncated response can be reported as an
/// authentication failure instead of a decoding error.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl LoginResponse {
    /// Returns `(user_id, token)` when both are present and non-empty.
    pub fn into_parts(self) -> Option<(String, String)> {
        match (self.user_id, self.token) {
            (Some(user_id), Some(token)) if !user_id.is_empty() && !token.is_empty() => {
                Some((user_id, token))
            },
            _ => None,
        }
    }
}

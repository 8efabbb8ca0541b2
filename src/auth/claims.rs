use serde::{Deserialize, Serialize};

/// JWT payload of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,         // user ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>, // user ID again, for verifiers that only read custom claims
    pub iat: usize,          // issued at (unix timestamp)
    pub exp: usize,          // expires at (unix timestamp)
    pub iss: String,         // issuer
}

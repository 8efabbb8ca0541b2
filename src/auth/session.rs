use std::time::Duration;

use axum::extract::FromRef;
use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::claims::Claims, config::SessionConfig, state::AppState};

pub const SESSION_COOKIE: &str = "minibio_session";
pub const SESSION_ISSUER: &str = "minibio.app";
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Signing and verification keys for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    pub issuer: String,
    pub ttl: Duration,
    pub secure_cookie: bool,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.session)
    }
}

impl SessionKeys {
    pub fn new(cfg: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: SESSION_ISSUER.to_string(),
            ttl: SESSION_TTL,
            secure_cookie: cfg.secure_cookie,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, user_id: Uuid, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id.to_string(),
            uid: Some(user_id.to_string()),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token signed");
        Ok(token)
    }

    /// Resolves a token to its user id. Every failure mode collapses into `None`.
    pub fn verify(&self, token: &str) -> Option<Uuid> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_aud = false;
        validation.leeway = 0;

        let claims = match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!(error = %e, "session token rejected");
                return None;
            }
        };

        let raw = claims.uid.as_deref().unwrap_or(&claims.sub);
        match Uuid::parse_str(raw) {
            Ok(user_id) => Some(user_id),
            Err(_) => {
                debug!("session token subject is not a user id");
                None
            }
        }
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .path("/")
            .max_age(TimeDuration::seconds(self.ttl.as_secs() as i64))
            .build()
    }

    pub fn cleared_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .path("/")
            .max_age(TimeDuration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }
}

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::error::AppError;
use crate::profiles::repo_types::{CustomLink, ProfileDraft, SocialLinks, SocialPlatform};

pub const MAX_USERNAME_LEN: usize = 32;
pub const MAX_DISPLAY_NAME_LEN: usize = 100;
pub const MAX_BIO_LEN: usize = 500;
pub const MAX_LINK_TITLE_LEN: usize = 100;
pub const MAX_URL_LEN: usize = 2048;
pub const MAX_CUSTOM_LINKS: usize = 50;
/// Inline `data:` images can be large; everything else is capped at [`MAX_URL_LEN`].
pub const MAX_INLINE_IMAGE_LEN: usize = 4 * 1024 * 1024;

/// Names that collide with site routes; a profile under one of them could never be viewed.
pub const RESERVED_USERNAMES: &[&str] = &[
    "crear",
    "editar",
    "api",
    "admin",
    "_next",
    "favicon.ico",
];

/// `GET /profiles` selector: `?username=X` or `?mine=true`.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    pub username: Option<String>,
    #[serde(default)]
    pub mine: bool,
}

/// Body of `POST`/`PUT /profiles` as sent by clients.
#[derive(Debug, Default, Deserialize)]
pub struct ProfilePayload {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub social_links: BTreeMap<SocialPlatform, String>,
    #[serde(default)]
    pub custom_links: Vec<CustomLink>,
}

pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn is_reserved_username(username: &str) -> bool {
    RESERVED_USERNAMES.contains(&username)
}

pub fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[a-z0-9_]+$").unwrap();
    }
    !username.is_empty() && username.len() <= MAX_USERNAME_LEN && USERNAME_RE.is_match(username)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn too_long(field: &str, max: usize) -> AppError {
    AppError::validation(format!("{field} must be at most {max} characters"))
}

fn is_image_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://") || url.starts_with("data:image/")
}

impl ProfilePayload {
    /// Validates and normalizes the payload.
    pub fn into_draft(self) -> Result<ProfileDraft, AppError> {
        let username = self
            .username
            .as_deref()
            .map(normalize_username)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::validation("Username is required"))?;
        if !is_valid_username(&username) {
            return Err(AppError::validation(format!(
                "Username may only contain a-z, 0-9 and _ (max {MAX_USERNAME_LEN})"
            )));
        }
        if is_reserved_username(&username) {
            return Err(AppError::validation(format!(
                "Username \"{username}\" is reserved"
            )));
        }

        let display_name = non_blank(self.display_name).unwrap_or_else(|| username.clone());
        if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(too_long("display_name", MAX_DISPLAY_NAME_LEN));
        }

        let bio = non_blank(self.bio);
        if bio.as_ref().is_some_and(|b| b.chars().count() > MAX_BIO_LEN) {
            return Err(too_long("bio", MAX_BIO_LEN));
        }

        let profile_image_url = non_blank(self.profile_image_url);
        if let Some(url) = &profile_image_url {
            if !is_image_url(url) {
                return Err(AppError::validation(
                    "profile_image_url must be an http(s) or data:image URL",
                ));
            }
            let max = if url.starts_with("data:") {
                MAX_INLINE_IMAGE_LEN
            } else {
                MAX_URL_LEN
            };
            if url.len() > max {
                return Err(too_long("profile_image_url", max));
            }
        }

        let mut social_links = SocialLinks::new();
        for (platform, url) in self.social_links {
            let url = url.trim();
            if url.is_empty() {
                continue;
            }
            if url.len() > MAX_URL_LEN {
                return Err(too_long("social link", MAX_URL_LEN));
            }
            social_links.insert(platform, url.to_string());
        }

        if self.custom_links.len() > MAX_CUSTOM_LINKS {
            return Err(AppError::validation(format!(
                "At most {MAX_CUSTOM_LINKS} custom links are allowed"
            )));
        }
        let mut custom_links = Vec::with_capacity(self.custom_links.len());
        for link in self.custom_links {
            let title = link.title.trim();
            let url = link.url.trim();
            if title.is_empty() || url.is_empty() {
                return Err(AppError::validation("Custom links need a title and a url"));
            }
            if title.chars().count() > MAX_LINK_TITLE_LEN {
                return Err(too_long("link title", MAX_LINK_TITLE_LEN));
            }
            if url.len() > MAX_URL_LEN {
                return Err(too_long("link url", MAX_URL_LEN));
            }
            custom_links.push(CustomLink {
                title: title.to_string(),
                url: url.to_string(),
            });
        }

        Ok(ProfileDraft {
            username,
            display_name,
            bio,
            profile_image_url,
            social_links,
            custom_links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> ProfilePayload {
        serde_json::from_str(json).expect("payload parses")
    }

    #[test]
    fn username_only_payload_gets_defaults() {
        let draft = payload(r#"{"username":"  Alice_1 "}"#).into_draft().unwrap();
        assert_eq!(draft.username, "alice_1");
        assert_eq!(draft.display_name, "alice_1");
        assert!(draft.bio.is_none());
        assert!(draft.social_links.is_empty());
        assert!(draft.custom_links.is_empty());
    }

    #[test]
    fn rejects_missing_or_bad_username() {
        assert!(matches!(
            payload(r#"{}"#).into_draft(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            payload(r#"{"username":"al ice"}"#).into_draft(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            payload(r#"{"username":"al-ice"}"#).into_draft(),
            Err(AppError::Validation(_))
        ));
        let long = "a".repeat(MAX_USERNAME_LEN + 1);
        assert!(matches!(
            payload(&format!(r#"{{"username":"{long}"}}"#)).into_draft(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn reserved_route_names_are_rejected() {
        for name in ["admin", "API", " crear ", "editar", "_next"] {
            let json = serde_json::json!({ "username": name }).to_string();
            assert!(
                matches!(payload(&json).into_draft(), Err(AppError::Validation(_))),
                "{name:?} should be rejected"
            );
        }
        assert!(payload(r#"{"username":"admin2"}"#).into_draft().is_ok());
        assert!(is_reserved_username("favicon.ico"));
    }

    #[test]
    fn empty_social_links_are_dropped() {
        let draft = payload(
            r#"{"username":"a","social_links":{"instagram":"https://ig/a","tiktok":"  "}}"#,
        )
        .into_draft()
        .unwrap();
        assert_eq!(draft.social_links.len(), 1);
        assert_eq!(
            draft.social_links.get(&SocialPlatform::Instagram).map(String::as_str),
            Some("https://ig/a")
        );
    }

    #[test]
    fn custom_links_keep_order_and_need_both_fields() {
        let draft = payload(
            r#"{"username":"a","custom_links":[
                {"title":"Zeta","url":"https://z"},
                {"title":"Alpha","url":"https://a"}
            ]}"#,
        )
        .into_draft()
        .unwrap();
        let titles: Vec<_> = draft.custom_links.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, ["Zeta", "Alpha"]);

        assert!(matches!(
            payload(r#"{"username":"a","custom_links":[{"title":"","url":"https://z"}]}"#)
                .into_draft(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn image_url_must_be_http_or_inline_image() {
        assert!(payload(r#"{"username":"a","profile_image_url":"https://cdn/x.png"}"#)
            .into_draft()
            .is_ok());
        assert!(payload(r#"{"username":"a","profile_image_url":"data:image/png;base64,AAAA"}"#)
            .into_draft()
            .is_ok());
        assert!(matches!(
            payload(r#"{"username":"a","profile_image_url":"javascript:alert(1)"}"#).into_draft(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn mine_defaults_to_false() {
        let q: ProfileQuery = serde_json::from_str(r#"{"username":"a"}"#).unwrap();
        assert!(!q.mine);
    }
}

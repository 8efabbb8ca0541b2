use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Platforms a profile may link to from its social bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Instagram,
    Tiktok,
    Twitter,
    Youtube,
    Linkedin,
    Email,
}

pub type SocialLinks = BTreeMap<SocialPlatform, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLink {
    pub title: String,
    pub url: String,
}

/// Validated, normalized profile content ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDraft {
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub social_links: SocialLinks,
    pub custom_links: Vec<CustomLink>,
}

/// Raw `profiles` row. Link columns stay untyped JSON so that rows written by older
/// releases (unknown platforms, malformed entries, NULL) still load.
#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub social_links: Option<Json<Value>>,
    pub custom_links: Option<Json<Value>>,
    pub user_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Public profile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub social_links: SocialLinks,
    pub custom_links: Vec<CustomLink>,
    pub user_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ProfileRow> for Profile {
    fn from(r: ProfileRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            display_name: r.display_name,
            bio: r.bio,
            profile_image_url: r.profile_image_url,
            social_links: social_links_from_json(r.social_links.map(|j| j.0)),
            custom_links: custom_links_from_json(r.custom_links.map(|j| j.0)),
            user_id: r.user_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Keeps the entries naming a known platform with a non-empty string URL.
fn social_links_from_json(value: Option<Value>) -> SocialLinks {
    let Some(Value::Object(map)) = value else {
        return SocialLinks::new();
    };
    map.into_iter()
        .filter_map(|(key, url)| {
            let platform = serde_json::from_value(Value::String(key)).ok()?;
            match url {
                Value::String(url) if !url.trim().is_empty() => Some((platform, url)),
                _ => None,
            }
        })
        .collect()
}

/// Keeps the well-formed `{title, url}` entries, in stored order.
fn custom_links_from_json(value: Option<Value>) -> Vec<CustomLink> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

impl Profile {
    /// True when the stored content already equals `draft`.
    pub fn matches(&self, draft: &ProfileDraft) -> bool {
        self.username == draft.username
            && self.display_name == draft.display_name
            && self.bio == draft.bio
            && self.profile_image_url == draft.profile_image_url
            && self.social_links == draft.social_links
            && self.custom_links == draft.custom_links
    }
}

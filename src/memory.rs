//! In-process implementations of the store traits, with the same uniqueness rules as the
//! Postgres schema. Used by tests and for running the API without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{NewUser, User},
    },
    error::RepoError,
    profiles::{
        repo::{ProfileRepo, OWNER_CONSTRAINT, USERNAME_CONSTRAINT},
        repo_types::{Profile, ProfileDraft},
    },
};

const EMAIL_CONSTRAINT: &str = "users_email_lower_key";

fn conflict(constraint: &str) -> RepoError {
    RepoError::Conflict {
        constraint: constraint.to_string(),
    }
}

#[derive(Default)]
pub struct MemoryUserRepo {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(conflict(EMAIL_CONSTRAINT));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

/// Profiles keyed by username.
#[derive(Default)]
pub struct MemoryProfileRepo {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl MemoryProfileRepo {
    /// Stores a profile with no owner, as left behind by accounts-less signups.
    pub async fn seed_unclaimed(&self, draft: ProfileDraft) -> Profile {
        let profile = new_profile(draft, None);
        self.profiles
            .write()
            .await
            .insert(profile.username.clone(), profile.clone());
        profile
    }
}

fn new_profile(draft: ProfileDraft, owner: Option<Uuid>) -> Profile {
    let now = OffsetDateTime::now_utc();
    Profile {
        id: Uuid::new_v4(),
        username: draft.username,
        display_name: draft.display_name,
        bio: draft.bio,
        profile_image_url: draft.profile_image_url,
        social_links: draft.social_links,
        custom_links: draft.custom_links,
        user_id: owner,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl ProfileRepo for MemoryProfileRepo {
    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, RepoError> {
        Ok(self.profiles.read().await.get(username).cloned())
    }

    async fn find_by_owner(&self, user_id: Uuid) -> Result<Option<Profile>, RepoError> {
        let profiles = self.profiles.read().await;
        Ok(profiles
            .values()
            .find(|p| p.user_id == Some(user_id))
            .cloned())
    }

    async fn insert(&self, owner: Uuid, draft: &ProfileDraft) -> Result<Profile, RepoError> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&draft.username) {
            return Err(conflict(USERNAME_CONSTRAINT));
        }
        if profiles.values().any(|p| p.user_id == Some(owner)) {
            return Err(conflict(OWNER_CONSTRAINT));
        }
        let profile = new_profile(draft.clone(), Some(owner));
        profiles.insert(profile.username.clone(), profile.clone());
        Ok(profile)
    }

    async fn update(
        &self,
        expected_owner: Option<Uuid>,
        owner: Uuid,
        draft: &ProfileDraft,
    ) -> Result<Option<Profile>, RepoError> {
        let mut profiles = self.profiles.write().await;
        if profiles
            .values()
            .any(|p| p.user_id == Some(owner) && p.username != draft.username)
        {
            return Err(conflict(OWNER_CONSTRAINT));
        }
        let Some(profile) = profiles.get_mut(&draft.username) else {
            return Ok(None);
        };
        if profile.user_id != expected_owner {
            return Ok(None);
        }
        profile.display_name = draft.display_name.clone();
        profile.bio = draft.bio.clone();
        profile.profile_image_url = draft.profile_image_url.clone();
        profile.social_links = draft.social_links.clone();
        profile.custom_links = draft.custom_links.clone();
        profile.user_id = Some(owner);
        profile.updated_at = OffsetDateTime::now_utc();
        Ok(Some(profile.clone()))
    }
}

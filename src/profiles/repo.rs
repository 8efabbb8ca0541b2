use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::error::RepoError;
use crate::profiles::repo_types::{Profile, ProfileDraft, ProfileRow};

pub const USERNAME_CONSTRAINT: &str = "profiles_username_key";
pub const OWNER_CONSTRAINT: &str = "profiles_user_id_key";

/// Profile store. Reads return `Ok(None)` for a missing row.
#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, RepoError>;
    async fn find_by_owner(&self, user_id: Uuid) -> Result<Option<Profile>, RepoError>;
    /// Insert a new profile owned by `owner`. A taken username or an owner that already has
    /// a profile surfaces as [`RepoError::Conflict`].
    async fn insert(&self, owner: Uuid, draft: &ProfileDraft) -> Result<Profile, RepoError>;
    /// Overwrite the content of `draft.username` and set its owner to `owner`, but only
    /// while the row is still owned by `expected_owner`. `Ok(None)` means the row is gone
    /// or its owner changed in between.
    async fn update(
        &self,
        expected_owner: Option<Uuid>,
        owner: Uuid,
        draft: &ProfileDraft,
    ) -> Result<Option<Profile>, RepoError>;
}

const PROFILE_COLUMNS: &str = "id, username, display_name, bio, profile_image_url, \
     social_links, custom_links, user_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgProfileRepo {
    db: PgPool,
}

impl PgProfileRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileRepo for PgProfileRepo {
    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>, RepoError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Profile::from))
    }

    async fn find_by_owner(&self, user_id: Uuid) -> Result<Option<Profile>, RepoError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Profile::from))
    }

    async fn insert(&self, owner: Uuid, draft: &ProfileDraft) -> Result<Profile, RepoError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO profiles
                (username, display_name, bio, profile_image_url, social_links, custom_links, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(&draft.username)
        .bind(&draft.display_name)
        .bind(&draft.bio)
        .bind(&draft.profile_image_url)
        .bind(Json(&draft.social_links))
        .bind(Json(&draft.custom_links))
        .bind(owner)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn update(
        &self,
        expected_owner: Option<Uuid>,
        owner: Uuid,
        draft: &ProfileDraft,
    ) -> Result<Option<Profile>, RepoError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            UPDATE profiles
            SET display_name = $1,
                bio = $2,
                profile_image_url = $3,
                social_links = $4,
                custom_links = $5,
                user_id = $6,
                updated_at = NOW()
            WHERE username = $7 AND user_id IS NOT DISTINCT FROM $8
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(&draft.display_name)
        .bind(&draft.bio)
        .bind(&draft.profile_image_url)
        .bind(Json(&draft.social_links))
        .bind(Json(&draft.custom_links))
        .bind(owner)
        .bind(&draft.username)
        .bind(expected_owner)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Profile::from))
    }
}

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, RepoError},
    profiles::{
        policy::{self, Denial, WritePlan},
        repo::{ProfileRepo, OWNER_CONSTRAINT},
        repo_types::{Profile, ProfileDraft},
    },
};

/// Outcome of a successful write.
#[derive(Debug)]
pub enum Saved {
    Created(Profile),
    Updated(Profile),
}

impl Saved {
    pub fn into_profile(self) -> Profile {
        match self {
            Saved::Created(p) | Saved::Updated(p) => p,
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::UsernameTaken => AppError::Conflict("Username is already taken"),
            Denial::AlreadyHasProfile => AppError::Conflict("This account already has a profile"),
            Denial::NotFound => AppError::NotFound("Profile not found"),
        }
    }
}

pub async fn get_public(profiles: &dyn ProfileRepo, username: &str) -> Result<Profile, AppError> {
    profiles
        .find_by_username(username)
        .await?
        .ok_or(AppError::NotFound("Profile not found"))
}

pub async fn get_mine(profiles: &dyn ProfileRepo, caller: Uuid) -> Result<Profile, AppError> {
    profiles
        .find_by_owner(caller)
        .await?
        .ok_or(AppError::NotFound("Profile not found"))
}

/// Create, claim or update, keyed on the caller's ownership of the username.
pub async fn upsert(
    profiles: &dyn ProfileRepo,
    caller: Uuid,
    draft: ProfileDraft,
) -> Result<Saved, AppError> {
    let target = profiles.find_by_username(&draft.username).await?;
    let own = profiles.find_by_owner(caller).await?;
    let plan = policy::plan_upsert(target.as_ref(), own.as_ref(), caller).map_err(|d| {
        warn!(user_id = %caller, username = %draft.username, denial = ?d, "profile upsert denied");
        AppError::from(d)
    })?;
    apply(profiles, caller, plan, target, draft, Denial::UsernameTaken).await
}

/// Update an existing profile the caller owns (or claims).
pub async fn update(
    profiles: &dyn ProfileRepo,
    caller: Uuid,
    draft: ProfileDraft,
) -> Result<Profile, AppError> {
    let target = profiles.find_by_username(&draft.username).await?;
    let own = profiles.find_by_owner(caller).await?;
    let plan = policy::plan_update(target.as_ref(), own.as_ref(), caller).map_err(|d| {
        warn!(user_id = %caller, username = %draft.username, denial = ?d, "profile update denied");
        AppError::from(d)
    })?;
    let saved = apply(profiles, caller, plan, target, draft, Denial::NotFound).await?;
    Ok(saved.into_profile())
}

async fn apply(
    profiles: &dyn ProfileRepo,
    caller: Uuid,
    plan: WritePlan,
    target: Option<Profile>,
    draft: ProfileDraft,
    on_lost_race: Denial,
) -> Result<Saved, AppError> {
    match plan {
        WritePlan::Create => match profiles.insert(caller, &draft).await {
            Ok(profile) => {
                info!(user_id = %caller, username = %profile.username, "profile created");
                Ok(Saved::Created(profile))
            }
            Err(RepoError::Conflict { constraint }) => {
                warn!(user_id = %caller, username = %draft.username, %constraint, "profile insert lost race");
                if constraint == OWNER_CONSTRAINT {
                    Err(Denial::AlreadyHasProfile.into())
                } else {
                    Err(Denial::UsernameTaken.into())
                }
            }
            Err(e) => Err(e.into()),
        },
        WritePlan::Update {
            expected_owner,
            claim,
        } => {
            if let Some(existing) = target.filter(|p| !claim && p.matches(&draft)) {
                return Ok(Saved::Updated(existing));
            }
            match profiles.update(expected_owner, caller, &draft).await {
                Ok(Some(profile)) => {
                    if claim {
                        info!(user_id = %caller, username = %profile.username, "profile claimed");
                    } else {
                        info!(user_id = %caller, username = %profile.username, "profile updated");
                    }
                    Ok(Saved::Updated(profile))
                }
                Ok(None) => {
                    warn!(user_id = %caller, username = %draft.username, "profile owner changed before write");
                    Err(on_lost_race.into())
                }
                Err(RepoError::Conflict { .. }) => Err(Denial::AlreadyHasProfile.into()),
                Err(e) => Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryProfileRepo;
    use crate::profiles::repo_types::SocialLinks;

    fn draft(username: &str, display_name: &str) -> ProfileDraft {
        ProfileDraft {
            username: username.into(),
            display_name: display_name.into(),
            bio: None,
            profile_image_url: None,
            social_links: SocialLinks::new(),
            custom_links: vec![],
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_updates_in_place() {
        let repo = MemoryProfileRepo::default();
        let alice = Uuid::new_v4();

        let created = upsert(&repo, alice, draft("alice", "Alice")).await.unwrap();
        let Saved::Created(first) = created else {
            panic!("expected create");
        };
        assert_eq!(first.user_id, Some(alice));

        let updated = upsert(&repo, alice, draft("alice", "Alice 2")).await.unwrap();
        let Saved::Updated(second) = updated else {
            panic!("expected update");
        };
        assert_eq!(second.id, first.id);
        assert_eq!(second.display_name, "Alice 2");
        assert_eq!(get_public(&repo, "alice").await.unwrap().display_name, "Alice 2");
    }

    #[tokio::test]
    async fn resubmitting_same_payload_is_idempotent() {
        let repo = MemoryProfileRepo::default();
        let alice = Uuid::new_v4();
        upsert(&repo, alice, draft("alice", "Alice")).await.unwrap();
        let before = get_public(&repo, "alice").await.unwrap();
        upsert(&repo, alice, draft("alice", "Alice")).await.unwrap();
        let after = get_public(&repo, "alice").await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn foreign_username_is_conflict() {
        let repo = MemoryProfileRepo::default();
        upsert(&repo, Uuid::new_v4(), draft("alice", "Alice"))
            .await
            .unwrap();
        let err = upsert(&repo, Uuid::new_v4(), draft("alice", "Mallory"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = update(&repo, Uuid::new_v4(), draft("alice", "Mallory"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unclaimed_profile_goes_to_first_editor() {
        let repo = MemoryProfileRepo::default();
        repo.seed_unclaimed(draft("legacy", "Legacy")).await;
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let claimed = update(&repo, first, draft("legacy", "Mine now")).await.unwrap();
        assert_eq!(claimed.user_id, Some(first));

        let err = update(&repo, second, draft("legacy", "No, mine")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(get_mine(&repo, first).await.unwrap().display_name, "Mine now");
    }

    #[tokio::test]
    async fn stale_claim_loses_cleanly() {
        let repo = MemoryProfileRepo::default();
        repo.seed_unclaimed(draft("legacy", "Legacy")).await;
        let target = repo.find_by_username("legacy").await.unwrap();
        let winner = Uuid::new_v4();
        let loser = Uuid::new_v4();

        update(&repo, winner, draft("legacy", "Winner")).await.unwrap();

        let plan = WritePlan::Update {
            expected_owner: None,
            claim: true,
        };
        let err = apply(&repo, loser, plan, target, draft("legacy", "Loser"), Denial::NotFound)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(get_public(&repo, "legacy").await.unwrap().display_name, "Winner");
    }

    #[tokio::test]
    async fn second_profile_for_same_user_is_conflict() {
        let repo = MemoryProfileRepo::default();
        let alice = Uuid::new_v4();
        upsert(&repo, alice, draft("alice", "Alice")).await.unwrap();
        let err = upsert(&repo, alice, draft("alice2", "Alice")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn lookups_of_missing_rows_are_not_found() {
        let repo = MemoryProfileRepo::default();
        assert!(matches!(
            get_public(&repo, "doesnotexist").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            get_mine(&repo, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }
}

//! Ownership rules for profile mutations.
//!
//! The functions here are pure: the caller resolves the target row and the caller's own
//! profile first, then asks for a [`WritePlan`]. The store applies the plan with a
//! compare-and-set on the owner column, so a plan made from a stale read fails cleanly.

use uuid::Uuid;

use super::repo_types::Profile;

/// What a mutation request is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePlan {
    /// Insert a new row owned by the caller.
    Create,
    /// Overwrite the row. `claim` is set when the row had no owner and the caller takes it.
    Update { expected_owner: Option<Uuid>, claim: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The username belongs to another account.
    UsernameTaken,
    /// The caller already owns a different profile.
    AlreadyHasProfile,
    /// No such profile, or one the caller may not touch. Deliberately the same outcome.
    NotFound,
}

/// Whether `caller` may modify a profile currently owned by `owner`.
pub fn may_modify(owner: Option<Uuid>, caller: Uuid) -> bool {
    match owner {
        None => true,
        Some(owner) => owner == caller,
    }
}

/// Create-or-update (`POST`).
pub fn plan_upsert(
    target: Option<&Profile>,
    callers_profile: Option<&Profile>,
    caller: Uuid,
) -> Result<WritePlan, Denial> {
    match target {
        None => match callers_profile {
            Some(_) => Err(Denial::AlreadyHasProfile),
            None => Ok(WritePlan::Create),
        },
        Some(existing) => {
            plan_existing(existing, callers_profile, caller).map_err(|denial| match denial {
                Denial::NotFound => Denial::UsernameTaken,
                other => other,
            })
        }
    }
}

/// Update only (`PUT`).
pub fn plan_update(
    target: Option<&Profile>,
    callers_profile: Option<&Profile>,
    caller: Uuid,
) -> Result<WritePlan, Denial> {
    match target {
        None => Err(Denial::NotFound),
        Some(existing) => plan_existing(existing, callers_profile, caller),
    }
}

fn plan_existing(
    existing: &Profile,
    callers_profile: Option<&Profile>,
    caller: Uuid,
) -> Result<WritePlan, Denial> {
    if !may_modify(existing.user_id, caller) {
        return Err(Denial::NotFound);
    }
    let claim = existing.user_id.is_none();
    if claim {
        if let Some(own) = callers_profile {
            if own.id != existing.id {
                return Err(Denial::AlreadyHasProfile);
            }
        }
    }
    Ok(WritePlan::Update {
        expected_owner: existing.user_id,
        claim,
    })
}

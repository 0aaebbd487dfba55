//! Role-rank authorization.
//!
//! Lower permission numbers are more privileged. The ladder thresholds come
//! from configuration; a caller holds a rank when its token permission is at
//! or below that rank's threshold.

use thiserror::Error;

use crate::core::config::PermissionSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Rank {
    Admin,
    Professor,
    Student,
}

impl Rank {
    pub(crate) fn slug(self) -> &'static str {
        match self {
            Rank::Admin => "admin",
            Rank::Professor => "professor",
            Rank::Student => "student",
        }
    }

    pub(crate) fn display_name(self) -> &'static str {
        match self {
            Rank::Admin => "Administrator",
            Rank::Professor => "Professor",
            Rank::Student => "Student",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PermissionLadder {
    admin: i32,
    professor: i32,
    student: i32,
}

impl PermissionLadder {
    pub(crate) fn from_settings(settings: PermissionSettings) -> Self {
        Self { admin: settings.admin, professor: settings.professor, student: settings.student }
    }

    pub(crate) fn threshold(&self, rank: Rank) -> i32 {
        match rank {
            Rank::Admin => self.admin,
            Rank::Professor => self.professor,
            Rank::Student => self.student,
        }
    }

    pub(crate) fn satisfies(&self, permission: i32, rank: Rank) -> bool {
        permission <= self.threshold(rank)
    }

    /// Most privileged rank the permission reaches, if any.
    pub(crate) fn rank_of(&self, permission: i32) -> Option<Rank> {
        [Rank::Admin, Rank::Professor, Rank::Student]
            .into_iter()
            .find(|rank| self.satisfies(permission, *rank))
    }
}

/// Identity of the caller as carried by its token.
#[derive(Debug, Clone)]
pub(crate) struct Caller {
    pub(crate) user_id: String,
    pub(crate) permission: i32,
}

impl Caller {
    pub(crate) fn new(user_id: impl Into<String>, permission: i32) -> Self {
        Self { user_id: user_id.into(), permission }
    }
}

/// Owner and collaborators of a quiz or an event.
#[derive(Debug, Clone, Default)]
pub(crate) struct Possession {
    pub(crate) owner_id: String,
    pub(crate) collaborator_ids: Vec<String>,
}

impl Possession {
    pub(crate) fn new(owner_id: impl Into<String>, collaborator_ids: Vec<String>) -> Self {
        Self { owner_id: owner_id.into(), collaborator_ids }
    }

    pub(crate) fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    pub(crate) fn is_held_by(&self, user_id: &str) -> bool {
        self.is_owner(user_id) || self.collaborator_ids.iter().any(|id| id == user_id)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Check<'a> {
    Rank(Rank),
    Possession(&'a Possession),
    Ownership(&'a Possession),
    SelfOnly(&'a str),
}

impl Check<'_> {
    fn passes(&self, ladder: &PermissionLadder, caller: &Caller) -> bool {
        match self {
            Check::Rank(rank) => ladder.satisfies(caller.permission, *rank),
            Check::Possession(possession) => possession.is_held_by(&caller.user_id),
            Check::Ownership(possession) => possession.is_owner(&caller.user_id),
            Check::SelfOnly(user_id) => caller.user_id == *user_id,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Access forbidden")]
pub(crate) struct PolicyDenied;

pub(crate) fn require_rank(
    ladder: &PermissionLadder,
    caller: &Caller,
    rank: Rank,
) -> Result<(), PolicyDenied> {
    if ladder.satisfies(caller.permission, rank) {
        Ok(())
    } else {
        Err(PolicyDenied)
    }
}

/// Runs `extra_checks` for everyone, then lets admins through; anyone else
/// must also pass every check in `bypass_if_admin`.
pub(crate) fn authorize(
    ladder: &PermissionLadder,
    caller: &Caller,
    extra_checks: &[Check<'_>],
    bypass_if_admin: &[Check<'_>],
) -> Result<(), PolicyDenied> {
    if !extra_checks.iter().all(|check| check.passes(ladder, caller)) {
        return Err(PolicyDenied);
    }
    if ladder.satisfies(caller.permission, Rank::Admin) {
        return Ok(());
    }
    if bypass_if_admin.iter().all(|check| check.passes(ladder, caller)) {
        Ok(())
    } else {
        Err(PolicyDenied)
    }
}

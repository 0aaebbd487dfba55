//! Anti-cheat warning gates.
//!
//! Presence is blocked past three warnings on every quiz. Submissions are
//! refused from the third warning, on strict quizzes only.

use thiserror::Error;

pub(crate) const PRESENCE_LIMIT: i32 = 3;
pub(crate) const SUBMISSION_LIMIT: i32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum WarningBlock {
    #[error("Too many warnings to stay in this event")]
    Presence,
    #[error("Too many warnings to submit answers")]
    Submission,
}

pub(crate) fn check_presence(amount: i32) -> Result<(), WarningBlock> {
    if amount > PRESENCE_LIMIT {
        Err(WarningBlock::Presence)
    } else {
        Ok(())
    }
}

pub(crate) fn check_submission(amount: i32, strict: bool) -> Result<(), WarningBlock> {
    if strict && amount >= SUBMISSION_LIMIT {
        Err(WarningBlock::Submission)
    } else {
        Ok(())
    }
}

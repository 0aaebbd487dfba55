pub(crate) mod answer_submission;
pub(crate) mod event_activity;
pub(crate) mod event_overlap;
pub(crate) mod permissions;
pub(crate) mod presence;
pub(crate) mod warnings;

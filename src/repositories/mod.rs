pub(crate) mod answers;
pub(crate) mod event_warns;
pub(crate) mod events;
pub(crate) mod groups;
pub(crate) mod health;
pub(crate) mod labels;
pub(crate) mod questions;
pub(crate) mod quizzes;
pub(crate) mod roles;
pub(crate) mod specifications;
pub(crate) mod user_answers;
pub(crate) mod users;

pub(crate) mod answers;
pub(crate) mod auth;
pub(crate) mod catalog;
pub(crate) mod errors;
pub(crate) mod events;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod questions;
pub(crate) mod quizzes;
pub(crate) mod realtime;
pub(crate) mod roles;
pub(crate) mod router;
pub(crate) mod user_answers;
pub(crate) mod users;
pub(crate) mod validation;

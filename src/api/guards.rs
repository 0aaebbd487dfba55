use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::security::{self, Claims};
use crate::core::state::AppState;
use crate::services::permissions::{self, Caller, Rank};

/// Bearer identity. The user row is not loaded here; handlers that need it
/// fetch it and decide what a missing user means for them.
pub(crate) struct CurrentUser {
    pub(crate) claims: Claims,
    pub(crate) caller: Caller,
}

/// Caller holding at least professor rank.
pub(crate) struct CurrentProfessor(pub(crate) CurrentUser);

/// Caller holding admin rank.
pub(crate) struct CurrentAdmin(pub(crate) CurrentUser);

impl CurrentUser {
    pub(crate) fn from_token(state: &AppState, token: &str) -> Result<Self, ApiError> {
        let claims = security::verify_token(token, state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;
        let caller = Caller::new(claims.user_id.clone(), claims.role_permission);
        Ok(Self { claims, caller })
    }

    pub(crate) fn id(&self) -> &str {
        &self.caller.user_id
    }

    pub(crate) fn has_rank(&self, state: &AppState, rank: Rank) -> bool {
        state.ladder().satisfies(self.caller.permission, rank)
    }

    pub(crate) fn require(&self, state: &AppState, rank: Rank) -> Result<(), ApiError> {
        permissions::require_rank(&state.ladder(), &self.caller, rank)?;
        Ok(())
    }
}

pub(crate) fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let token = bearer_token(parts)
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        CurrentUser::from_token(&app_state, token)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentProfessor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        user.require(state, Rank::Professor)?;
        Ok(CurrentProfessor(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        user.require(state, Rank::Admin)?;
        Ok(CurrentAdmin(user))
    }
}

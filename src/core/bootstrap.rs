use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Role;
use crate::repositories;
use crate::services::permissions::Rank;

/// Makes sure one role exists per rank of the permission ladder, keeping
/// their permission numbers in sync with the configuration.
pub(crate) async fn ensure_roles(state: &AppState) -> anyhow::Result<Vec<Role>> {
    let ladder = state.ladder();
    let now = primitive_now_utc();
    let mut roles = Vec::with_capacity(3);

    for rank in [Rank::Admin, Rank::Professor, Rank::Student] {
        let permission = ladder.threshold(rank);
        let role = match repositories::roles::find_by_slug(state.db(), rank.slug()).await? {
            Some(role) if role.permission == permission => role,
            Some(role) => {
                tracing::info!(role = rank.slug(), permission, "Realigning role permission");
                repositories::roles::update(
                    state.db(),
                    &role.id,
                    repositories::roles::UpdateRole {
                        slug: None,
                        name: None,
                        permission: Some(permission),
                        updated_at: now,
                    },
                )
                .await?
                .unwrap_or(role)
            }
            None => {
                tracing::info!(role = rank.slug(), permission, "Creating default role");
                repositories::roles::create(
                    state.db(),
                    repositories::roles::CreateRole {
                        id: &Uuid::new_v4().to_string(),
                        slug: rank.slug(),
                        name: rank.display_name(),
                        permission,
                        created_at: now,
                        updated_at: now,
                    },
                )
                .await?
            }
        };
        roles.push(role);
    }

    Ok(roles)
}

pub(crate) async fn ensure_first_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.password.is_empty() {
        tracing::warn!("FIRST_ADMIN_PASSWORD not configured; skipping admin creation");
        return Ok(());
    }

    let roles = ensure_roles(state).await?;
    let Some(admin_role) = roles.into_iter().find(|role| role.slug == Rank::Admin.slug()) else {
        anyhow::bail!("admin role missing after bootstrap");
    };

    let username = &admin.username;
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_username(state.db(), username).await? {
        let verified = security::verify_password(&admin.password, &user.hashed_password)
            .unwrap_or(false);
        if verified && user.role_id == admin_role.id {
            tracing::info!("Default admin already up to date");
            return Ok(());
        }

        let hashed_password = if verified {
            None
        } else {
            Some(security::hash_password(&admin.password)?)
        };

        repositories::users::update(
            state.db(),
            &user.id,
            repositories::users::UpdateUser {
                username: None,
                first_name: None,
                last_name: None,
                gender: None,
                hashed_password,
                role_id: Some(admin_role.id.clone()),
                updated_at: now,
            },
        )
        .await?;

        tracing::info!("Updated default admin {username}");
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.password)?;
    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username,
            first_name: "Quizroom",
            last_name: "Admin",
            hashed_password,
            gender: None,
            role_id: &admin_role.id,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;

    tracing::info!("Created default admin {username}");
    Ok(())
}

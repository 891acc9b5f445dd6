use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Verifies that the user belongs to the organization before any insight
/// computation runs. Positive lookups are cached with a short TTL; negative
/// results always hit the database so a fresh invite takes effect quickly.
pub async fn assert_org_member(state: &AppState, user_id: &str, org_id: Uuid) -> AppResult<()> {
    let cache_key = format!("{org_id}:{user_id}");
    if state.org_membership_cache.get(&cache_key).await == Some(true) {
        return Ok(());
    }

    let pool = state.db_pool()?;
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*)::bigint
         FROM organization_members
         WHERE organization_id = $1 AND user_id = $2::uuid",
    )
    .bind(org_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(|error| {
        tracing::error!(db_error = %error, "Membership lookup failed");
        AppError::Dependency("Database operation failed.".to_string())
    })?;

    if count == 0 {
        return Err(AppError::Forbidden(
            "Forbidden: not a member of this organization.".to_string(),
        ));
    }

    state.org_membership_cache.insert(cache_key, true).await;
    Ok(())
}

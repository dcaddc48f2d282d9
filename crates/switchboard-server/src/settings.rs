//! Settings and provider listing routes

use axum::Json;
use axum::extract::State;
use switchboard_config::{SettingsUpdate, SettingsView};
use switchboard_llm::{ProviderDescriptor, registry};

use crate::error::ApiError;
use crate::state::AppState;

/// Handle `GET /api/settings/llm`
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsView> {
    Json(state.settings.read().await.masked())
}

/// Handle `PUT /api/settings/llm`
///
/// Applies a partial update; the stored settings are unchanged when the
/// update is rejected.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<SettingsView>, ApiError> {
    let mut settings = state.settings.write().await;
    settings.apply(update)?;

    tracing::info!(
        provider = %settings.provider,
        fallback_enabled = settings.fallback_enabled,
        "llm settings updated"
    );

    Ok(Json(settings.masked()))
}

/// Handle `GET /api/providers`
pub async fn list_providers() -> Json<Vec<&'static ProviderDescriptor>> {
    Json(registry::descriptors().collect())
}

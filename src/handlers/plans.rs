use axum::extract::State;
use reelbox_api::PlanResponse;

use crate::app::AppState;
use crate::error::AppError;
use crate::response::AppResponse;

/// GET /api/plans
/// Catalogue public des plans
pub async fn list_plans(
    State(state): State<AppState>,
) -> Result<AppResponse<Vec<PlanResponse>>, AppError> {
    let plans = state
        .quota
        .list_plans()?
        .into_iter()
        .map(PlanResponse::from)
        .collect();
    Ok(AppResponse::ok(plans))
}

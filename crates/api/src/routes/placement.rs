use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use placement_core::model::{AttemptId, BlueprintId};
use services::SectionSubmission;
use storage::repository::Page;

use crate::{
    errors::{AppError, Result},
    identity::Identity,
    models::{
        ActiveBlueprintView, AttemptResponse, BlueprintSummary, CompleteRequest, ListQuery,
        PageQuery, StartRequest, SubmitSectionRequest,
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/start", post(start))
        .route("/submit-section", post(submit_section))
        .route("/complete", post(complete))
        .route("/my-results", get(my_results))
        .route("/all", get(all_results))
        .route("/active", get(active_blueprint))
        .route("/attempts/:id", get(get_attempt))
        .route("/blueprints", get(list_blueprints))
        .route("/blueprints/:id/activate", post(activate_blueprint))
}

/// Start the caller's attempt, or resume the unfinished one.
async fn start(
    identity: Identity,
    State(state): State<AppState>,
    payload: std::result::Result<Json<StartRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;
    let started = state
        .services
        .sessions()
        .start(identity.user_id, req.blueprint_id)
        .await?;

    let status = if started.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(AttemptResponse::from(started.attempt))))
}

async fn submit_section(
    identity: Identity,
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubmitSectionRequest>, JsonRejection>,
) -> Result<Json<SectionSubmission>> {
    let Json(req) = payload?;
    let submission = state
        .services
        .grader()
        .submit_section(req.attempt_id, identity.user_id, req.section_type, &req.answers)
        .await?;
    Ok(Json(submission))
}

async fn complete(
    identity: Identity,
    State(state): State<AppState>,
    payload: std::result::Result<Json<CompleteRequest>, JsonRejection>,
) -> Result<Json<AttemptResponse>> {
    let Json(req) = payload?;
    let attempt = state
        .services
        .scorer()
        .complete(req.attempt_id, identity.user_id)
        .await?;
    Ok(Json(AttemptResponse::from(attempt)))
}

async fn my_results(
    identity: Identity,
    State(state): State<AppState>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Page<AttemptResponse>>> {
    let Query(query) = query?;
    let page = state
        .services
        .results()
        .my_results(identity.user_id, query.into())
        .await?;
    Ok(Json(page.map(AttemptResponse::from)))
}

async fn all_results(
    identity: Identity,
    State(state): State<AppState>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Page<AttemptResponse>>> {
    identity.require_admin()?;
    let Query(query) = query?;
    let page = state.services.results().all_results(query.into()).await?;
    Ok(Json(page.map(AttemptResponse::from)))
}

/// The active blueprint with correct answers withheld.
async fn active_blueprint(
    _identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<ActiveBlueprintView>> {
    let blueprint = state.services.blueprints().active_blueprint().await?;
    Ok(Json(ActiveBlueprintView::from(&blueprint)))
}

async fn get_attempt(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AttemptResponse>> {
    let id: AttemptId = id
        .parse()
        .map_err(|e| AppError::BadRequest(format!("{e}")))?;
    let attempt = state
        .services
        .results()
        .attempt_for(identity.viewer(), id)
        .await?;
    Ok(Json(AttemptResponse::from(attempt)))
}

/// Every stored blueprint, oldest first, for administrators picking one to activate.
async fn list_blueprints(
    identity: Identity,
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<BlueprintSummary>>> {
    identity.require_admin()?;
    let Query(query) = query?;
    let blueprints = state.services.blueprints().list(query.limit()).await?;
    Ok(Json(blueprints.iter().map(BlueprintSummary::from).collect()))
}

async fn activate_blueprint(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BlueprintSummary>> {
    identity.require_admin()?;
    let id: BlueprintId = id
        .parse()
        .map_err(|e| AppError::BadRequest(format!("{e}")))?;
    let blueprint = state.services.blueprints().activate(id).await?;
    tracing::info!(blueprint_id = %id, activated_by = %identity.user_id, "activation requested");
    Ok(Json(BlueprintSummary::from(&blueprint)))
}

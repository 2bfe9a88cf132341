//! HTTP API handlers for Campaign Lens.
//!
//! Analytics endpoints accept a common set of filter parameters:
//!
//! - `start`, `end`: ISO dates, both or neither
//! - `staff`, `countries`, `campaigns`: comma-separated names
//! - `follower_tiers`, `cost_tiers`: comma-separated labels (English or Korean)
//!
//! A `campaigns` list containing `전체` or `ALL` selects every campaign.
//!
//! Status codes: `400` for malformed parameters, `404` for unknown ids and
//! `409` when an update would break the outreach workflow.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::aggregation::GroupAggregate;
use crate::dashboard::{
    Dashboard, DashboardSummary, GroupView, GroupsResponse, InfluencerDetail, ListView, StaffBoard,
};
use crate::filter::{CampaignSelection, FilterSpec, InfluencerQuery};
use crate::model::{
    Campaign, ContactInfo, ContactUpdate, CostTier, EnrichedRecord, FollowerTier, InfluencerUpdate,
    Labeled,
};
use crate::ranking::Page;
use crate::store::StoreError;
use crate::workflow::{KanbanColumn, KanbanLane};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Dashboard,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/influencers", get(list_influencers))
        .route("/influencers/:id", get(get_influencer).patch(patch_influencer))
        .route("/analytics/summary", get(get_summary))
        .route("/analytics/groups", get(get_groups))
        .route("/analytics/staff", get(get_staff_board))
        .route("/analytics/campaigns/recent", get(get_recent_campaigns))
        .route("/campaigns", get(list_campaigns))
        .route("/hospitals", get(list_hospitals))
        .route("/hospitals/:hospital/kanban", get(get_kanban))
        .route("/hospitals/:hospital/kanban/move", post(move_kanban_card))
        .route("/hospitals/:hospital/contacts", get(get_contacts))
        .route("/contacts/:id", patch(patch_contact))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Analytics filter parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub staff: Option<String>,
    pub countries: Option<String>,
    pub follower_tiers: Option<String>,
    pub cost_tiers: Option<String>,
    pub campaigns: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterParamError {
    #[error("start and end must be given together")]
    HalfOpenRange,

    #[error("unknown {param} value: {value}")]
    UnknownLabel { param: &'static str, value: String },
}

impl FilterQuery {
    /// Convert the raw parameters into a [`FilterSpec`].
    pub fn to_spec(&self) -> Result<FilterSpec, FilterParamError> {
        let mut spec = FilterSpec::new()
            .with_staff(split_list(&self.staff))
            .with_countries(split_list(&self.countries))
            .with_follower_tiers(parse_labels::<FollowerTier>("follower_tiers", &self.follower_tiers)?)
            .with_cost_tiers(parse_labels::<CostTier>("cost_tiers", &self.cost_tiers)?)
            .with_campaigns(CampaignSelection::from_tokens(split_list(&self.campaigns)));

        match (self.start, self.end) {
            (Some(start), Some(end)) => spec = spec.with_date_range(start, end),
            (None, None) => {}
            _ => return Err(FilterParamError::HalfOpenRange),
        }

        Ok(spec)
    }
}

fn split_list(raw: &Option<String>) -> Vec<String> {
    raw.as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_labels<T: Labeled>(
    param: &'static str,
    raw: &Option<String>,
) -> Result<Vec<T>, FilterParamError> {
    split_list(raw)
        .into_iter()
        .map(|value| {
            T::parse_label(&value).ok_or(FilterParamError::UnknownLabel { param, value })
        })
        .collect()
}

fn filter_spec(query: &FilterQuery) -> Result<FilterSpec, StatusCode> {
    query.to_spec().map_err(|e| {
        warn!(error = %e, "Rejected filter parameters");
        StatusCode::BAD_REQUEST
    })
}

fn store_error_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Workflow(_) => StatusCode::CONFLICT,
    }
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// GET /influencers - Searched, sorted and paged influencer list.
///
/// # Query Parameters
///
/// - `search`: substring of username or url
/// - `status`, `type`, `hospital`, `round`: exact matches
/// - `sort` (default `username`), `order` (`asc` or `desc`)
/// - `page` (default 1), `per_page` (default 50)
#[instrument(skip(state))]
pub async fn list_influencers(
    State(state): State<AppState>,
    Query(query): Query<InfluencerQuery>,
    Query(view): Query<ListView>,
) -> Json<Page<EnrichedRecord>> {
    let page = state.dashboard.influencers(&query, &view).await;
    info!(
        total = page.total_items,
        page = page.page,
        "Influencer list queried"
    );
    Json(page)
}

/// GET /influencers/:id - One influencer with workflow progress.
#[instrument(skip(state))]
pub async fn get_influencer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InfluencerDetail>, StatusCode> {
    match state.dashboard.influencer(&id).await {
        Ok(detail) => Ok(Json(detail)),
        Err(e) => {
            warn!(id = %id, error = %e, "Failed to fetch influencer");
            Err(store_error_status(&e))
        }
    }
}

/// PATCH /influencers/:id - Partially update an influencer.
///
/// Only base attributes are accepted; EMV, cost and ROAS are recomputed.
///
/// # Request Body
///
/// ```json
/// {
///     "status": "booking_confirmed",
///     "views": 12000
/// }
/// ```
#[instrument(skip(state, update))]
pub async fn patch_influencer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<InfluencerUpdate>,
) -> Result<Json<InfluencerDetail>, StatusCode> {
    if update.is_empty() {
        warn!(id = %id, "Empty influencer update");
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.dashboard.store().update_influencer(&id, &update).await {
        Ok(record) => {
            info!(id = %id, emv = record.metrics.emv, "Influencer updated");
            Ok(Json(InfluencerDetail::from(record)))
        }
        Err(e) => {
            warn!(id = %id, error = %e, "Failed to update influencer");
            Err(store_error_status(&e))
        }
    }
}

/// GET /analytics/summary - Totals and breakdowns of the filtered set.
#[instrument(skip(state))]
pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<DashboardSummary>, StatusCode> {
    let spec = filter_spec(&query)?;
    let summary = state.dashboard.summary(&spec).await;
    info!(
        influencers = summary.totals.influencer_count,
        total_emv = summary.totals.total_emv,
        "Summary queried"
    );
    Ok(Json(summary))
}

/// GET /analytics/groups - Grouped aggregates, sorted and paged.
///
/// # Query Parameters
///
/// - `by`: `campaign` (default), `staff`, `country`, `follower_tier`, `hospital`
/// - `sort`: `emv` (default), `name`, `performance`, `influencers`, `views`, `roas`
/// - `page`: 1-based, clamped into range
/// - `search`, `active_only`: group filter
/// - filter parameters, see module docs
#[instrument(skip(state))]
pub async fn get_groups(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
    Query(view): Query<GroupView>,
) -> Result<Json<GroupsResponse>, StatusCode> {
    let spec = filter_spec(&query)?;
    let response = state.dashboard.groups(&spec, &view).await;
    info!(
        by = ?response.by,
        groups = response.page.total_items,
        page = response.page.page,
        "Groups queried"
    );
    Ok(Json(response))
}

/// GET /analytics/staff - Staff performance board.
#[instrument(skip(state))]
pub async fn get_staff_board(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<StaffBoard>, StatusCode> {
    let spec = filter_spec(&query)?;
    Ok(Json(state.dashboard.staff_board(&spec).await))
}

/// GET /analytics/campaigns/recent - Campaigns with the latest activity.
#[instrument(skip(state))]
pub async fn get_recent_campaigns(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<GroupAggregate>>, StatusCode> {
    let spec = filter_spec(&query)?;
    Ok(Json(state.dashboard.recent_campaigns(&spec).await))
}

/// GET /campaigns - Hospital campaigns with their members.
pub async fn list_campaigns(State(state): State<AppState>) -> Json<Vec<Campaign>> {
    Json(state.dashboard.store().campaigns().await)
}

/// GET /hospitals - Known hospitals.
pub async fn list_hospitals(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.dashboard.store().hospitals().await)
}

/// GET /hospitals/:hospital/kanban - Status board of one hospital.
#[instrument(skip(state))]
pub async fn get_kanban(
    State(state): State<AppState>,
    Path(hospital): Path<String>,
) -> Json<Vec<KanbanColumn>> {
    Json(state.dashboard.kanban(&hospital).await)
}

/// Request body of a kanban move.
#[derive(Debug, Deserialize)]
pub struct MoveCardRequest {
    pub influencer_id: String,
    pub lane: KanbanLane,
}

/// POST /hospitals/:hospital/kanban/move - Drop a card on a lane.
///
/// # Request Body
///
/// ```json
/// {
///     "influencer_id": "12",
///     "lane": "booking_confirmed"
/// }
/// ```
///
/// Dropping on the combined rejected/cancelled lane sets the status to
/// rejected. Cards of other hospitals are reported as not found.
#[instrument(skip(state))]
pub async fn move_kanban_card(
    State(state): State<AppState>,
    Path(hospital): Path<String>,
    Json(request): Json<MoveCardRequest>,
) -> Result<Json<InfluencerDetail>, StatusCode> {
    match state
        .dashboard
        .store()
        .move_card(&hospital, &request.influencer_id, request.lane)
        .await
    {
        Ok(record) => {
            info!(
                id = %request.influencer_id,
                lane = ?request.lane,
                status = ?record.record.status,
                "Card moved"
            );
            Ok(Json(InfluencerDetail::from(record)))
        }
        Err(e) => {
            warn!(id = %request.influencer_id, error = %e, "Failed to move card");
            Err(store_error_status(&e))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ContactsQuery {
    pub search: Option<String>,
}

/// GET /hospitals/:hospital/contacts - Contact sheet of one hospital.
#[instrument(skip(state))]
pub async fn get_contacts(
    State(state): State<AppState>,
    Path(hospital): Path<String>,
    Query(query): Query<ContactsQuery>,
) -> Json<Vec<ContactInfo>> {
    Json(
        state
            .dashboard
            .contacts(&hospital, query.search.as_deref())
            .await,
    )
}

/// PATCH /contacts/:id - Partially update a contact.
#[instrument(skip(state, update))]
pub async fn patch_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ContactUpdate>,
) -> Result<Json<ContactInfo>, StatusCode> {
    match state.dashboard.store().update_contact(&id, &update).await {
        Ok(contact) => {
            info!(id = %id, "Contact updated");
            Ok(Json(contact))
        }
        Err(e) => {
            warn!(id = %id, error = %e, "Failed to update contact");
            Err(store_error_status(&e))
        }
    }
}

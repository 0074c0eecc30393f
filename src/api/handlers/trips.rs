//! Trips and applications to join them.

use axum::{
    Json,
    extract::{Extension, Path, Query, rejection::JsonRejection},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use super::{
    ApiError, Created, CurrentUser, ErrorBody, Validate, ensure, ensure_not_blank, insert,
    valid_body,
};
use crate::store::{Document, Filter, SharedStore, serialize_all};

pub const TRIP_COLLECTION: &str = "trip";
pub const APPLICATION_COLLECTION: &str = "application";

const TRIP_LIST_LIMIT: usize = 100;

const TRIP_STATUSES: &[&str] = &["open", "planning", "closed"];
const APPLICATION_STATUSES: &[&str] = &["pending", "accepted", "rejected"];

fn default_trip_status() -> String {
    "open".to_string()
}

fn default_application_status() -> String {
    "pending".to_string()
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct NewTrip {
    title: String,
    destination: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    budget_estimate: Option<f64>,
    capacity: Option<i64>,
    needed_members: Option<i64>,
    itinerary: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    organizer_id: Option<String>,
    #[serde(default = "default_trip_status")]
    status: String,
}

impl Validate for NewTrip {
    fn validate(&self) -> Result<(), ApiError> {
        ensure_not_blank(&self.title, "title")?;
        ensure_not_blank(&self.destination, "destination")?;
        ensure(
            self.budget_estimate.is_none_or(|budget| budget >= 0.0),
            "budget_estimate must be >= 0",
        )?;
        ensure(
            self.capacity.is_none_or(|capacity| capacity >= 1),
            "capacity must be >= 1",
        )?;
        ensure(
            self.needed_members.is_none_or(|needed| needed >= 0),
            "needed_members must be >= 0",
        )?;
        ensure(
            TRIP_STATUSES.contains(&self.status.as_str()),
            "status must be one of open, planning, closed",
        )
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct NewApplication {
    /// Ignored; the trip is taken from the path.
    trip_id: Option<String>,
    applicant_id: Option<String>,
    message: Option<String>,
    #[serde(default = "default_application_status")]
    status: String,
}

impl Validate for NewApplication {
    fn validate(&self) -> Result<(), ApiError> {
        ensure(
            APPLICATION_STATUSES.contains(&self.status.as_str()),
            "status must be one of pending, accepted, rejected",
        )
    }
}

#[derive(Deserialize, IntoParams, Debug)]
pub struct TripQuery {
    /// Only trips carrying this tag.
    tag: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/trips",
    request_body = NewTrip,
    responses(
        (status = 200, description = "Trip created", body = Created),
        (status = 400, description = "Invalid trip", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "trips"
)]
#[instrument(skip_all)]
pub async fn create_trip(
    Extension(store): Extension<SharedStore>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<NewTrip>, JsonRejection>,
) -> Result<Json<Created>, ApiError> {
    let mut trip = valid_body(payload)?;
    trip.organizer_id.get_or_insert(user.id);
    Ok(Json(insert(store.as_ref(), TRIP_COLLECTION, &trip).await?))
}

#[utoipa::path(
    get,
    path = "/api/trips",
    params(TripQuery),
    responses(
        (status = 200, description = "Up to 100 trips", body = [NewTrip]),
    ),
    tag = "trips"
)]
#[instrument(skip_all)]
pub async fn list_trips(
    Extension(store): Extension<SharedStore>,
    Query(query): Query<TripQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let mut filter = Filter::new();
    if let Some(tag) = query.tag.filter(|tag| !tag.is_empty()) {
        filter = filter.one_of("tags", [tag]);
    }
    let trips = store.query(TRIP_COLLECTION, &filter, TRIP_LIST_LIMIT).await?;
    Ok(Json(serialize_all(&trips)))
}

#[derive(Serialize)]
struct ApplicationRecord<'a> {
    trip_id: &'a str,
    applicant_id: Option<String>,
    message: Option<String>,
    status: String,
}

#[utoipa::path(
    post,
    path = "/api/trips/{trip_id}/apply",
    params(("trip_id" = String, Path, description = "Trip to apply to")),
    request_body = NewApplication,
    responses(
        (status = 200, description = "Application created", body = Created),
        (status = 400, description = "Invalid application", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "trips"
)]
#[instrument(skip_all, fields(trip_id = %trip_id))]
pub async fn apply_to_trip(
    Extension(store): Extension<SharedStore>,
    Path(trip_id): Path<String>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<NewApplication>, JsonRejection>,
) -> Result<Json<Created>, ApiError> {
    let application = valid_body(payload)?;
    let record = ApplicationRecord {
        trip_id: &trip_id,
        applicant_id: application.applicant_id.or(Some(user.id)),
        message: application.message,
        status: application.status,
    };
    Ok(Json(
        insert(store.as_ref(), APPLICATION_COLLECTION, &record).await?,
    ))
}

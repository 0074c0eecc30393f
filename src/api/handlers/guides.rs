//! Guides and the reviews left for them.

use axum::{
    Json,
    extract::{Extension, Path, Query, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use super::{
    ApiError, Created, CurrentUser, ErrorBody, Validate, ensure, ensure_http_url,
    ensure_not_blank, insert, valid_body,
};
use crate::store::{Document, Filter, SharedStore, serialize_all};

pub const GUIDE_COLLECTION: &str = "guide";
pub const REVIEW_COLLECTION: &str = "review";

const GUIDE_LIST_LIMIT: usize = 100;
const REVIEW_LIST_LIMIT: usize = 100;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct NewGuide {
    name: String,
    location: String,
    #[serde(default)]
    expertise: Vec<String>,
    #[serde(default)]
    languages: Vec<String>,
    price_per_day: Option<f64>,
    bio: Option<String>,
    avatar_url: Option<String>,
    #[serde(default)]
    rating: f64,
    #[serde(default)]
    rating_count: i64,
}

impl Validate for NewGuide {
    fn validate(&self) -> Result<(), ApiError> {
        ensure_not_blank(&self.name, "name")?;
        ensure_not_blank(&self.location, "location")?;
        ensure(
            self.price_per_day.is_none_or(|price| price >= 0.0),
            "price_per_day must be >= 0",
        )?;
        ensure_http_url(self.avatar_url.as_deref(), "avatar_url")?;
        ensure(
            (0.0..=5.0).contains(&self.rating),
            "rating must be between 0 and 5",
        )?;
        ensure(self.rating_count >= 0, "rating_count must be >= 0")
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct NewReview {
    guide_id: String,
    reviewer_id: Option<String>,
    rating: i64,
    comment: Option<String>,
}

impl Validate for NewReview {
    fn validate(&self) -> Result<(), ApiError> {
        ensure_not_blank(&self.guide_id, "guide_id")?;
        ensure(
            (1..=5).contains(&self.rating),
            "rating must be between 1 and 5",
        )
    }
}

#[derive(Deserialize, IntoParams, Debug)]
pub struct GuideQuery {
    /// Case-insensitive substring of the guide's location.
    location: Option<String>,
    /// Only guides listing this expertise.
    expertise: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/guides",
    request_body = NewGuide,
    responses(
        (status = 200, description = "Guide created", body = Created),
        (status = 400, description = "Invalid guide", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "guides"
)]
#[instrument(skip_all)]
pub async fn create_guide(
    Extension(store): Extension<SharedStore>,
    _caller: CurrentUser,
    payload: Result<Json<NewGuide>, JsonRejection>,
) -> Result<Json<Created>, ApiError> {
    let guide = valid_body(payload)?;
    Ok(Json(insert(store.as_ref(), GUIDE_COLLECTION, &guide).await?))
}

#[utoipa::path(
    get,
    path = "/api/guides",
    params(GuideQuery),
    responses(
        (status = 200, description = "Up to 100 guides", body = [NewGuide]),
    ),
    tag = "guides"
)]
#[instrument(skip_all)]
pub async fn list_guides(
    Extension(store): Extension<SharedStore>,
    Query(query): Query<GuideQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let mut filter = Filter::new();
    if let Some(location) = query.location.filter(|location| !location.is_empty()) {
        filter = filter.contains_ignore_case("location", location);
    }
    if let Some(expertise) = query.expertise.filter(|expertise| !expertise.is_empty()) {
        filter = filter.one_of("expertise", [expertise]);
    }
    let guides = store
        .query(GUIDE_COLLECTION, &filter, GUIDE_LIST_LIMIT)
        .await?;
    Ok(Json(serialize_all(&guides)))
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = NewReview,
    responses(
        (status = 200, description = "Review created", body = Created),
        (status = 400, description = "Invalid review", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "guides"
)]
#[instrument(skip_all)]
pub async fn create_review(
    Extension(store): Extension<SharedStore>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<NewReview>, JsonRejection>,
) -> Result<Json<Created>, ApiError> {
    let mut review = valid_body(payload)?;
    review.reviewer_id.get_or_insert(user.id);
    Ok(Json(insert(store.as_ref(), REVIEW_COLLECTION, &review).await?))
}

#[utoipa::path(
    get,
    path = "/api/guides/{guide_id}/reviews",
    params(("guide_id" = String, Path, description = "Guide whose reviews to list")),
    responses(
        (status = 200, description = "Up to 100 reviews", body = [NewReview]),
    ),
    tag = "guides"
)]
#[instrument(skip_all, fields(guide_id = %guide_id))]
pub async fn list_reviews(
    Extension(store): Extension<SharedStore>,
    Path(guide_id): Path<String>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let filter = Filter::new().eq("guide_id", guide_id);
    let reviews = store
        .query(REVIEW_COLLECTION, &filter, REVIEW_LIST_LIMIT)
        .await?;
    Ok(Json(serialize_all(&reviews)))
}

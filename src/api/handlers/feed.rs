use axum::{
    Json,
    extract::{Extension, Query, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use super::{
    ApiError, Created, CurrentUser, ErrorBody, Validate, ensure, ensure_http_url,
    ensure_not_blank, insert, valid_body,
};
use crate::store::{CREATED_AT_FIELD, Document, Filter, SharedStore, parse_date, serialize_all};

pub const FEED_COLLECTION: &str = "feedpost";

const FEED_LIST_LIMIT: usize = 50;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct NewFeedPost {
    author_id: Option<String>,
    content: String,
    image_url: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    likes: i64,
}

impl Validate for NewFeedPost {
    fn validate(&self) -> Result<(), ApiError> {
        ensure_not_blank(&self.content, "content")?;
        ensure_http_url(self.image_url.as_deref(), "image_url")?;
        ensure(self.likes >= 0, "likes must be >= 0")
    }
}

#[derive(Deserialize, IntoParams, Debug)]
pub struct FeedQuery {
    /// Only posts carrying this tag.
    tag: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/feed",
    request_body = NewFeedPost,
    responses(
        (status = 200, description = "Post created", body = Created),
        (status = 400, description = "Invalid post", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "feed"
)]
#[instrument(skip_all)]
pub async fn create_post(
    Extension(store): Extension<SharedStore>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<NewFeedPost>, JsonRejection>,
) -> Result<Json<Created>, ApiError> {
    let mut post = valid_body(payload)?;
    post.author_id.get_or_insert(user.id);
    Ok(Json(insert(store.as_ref(), FEED_COLLECTION, &post).await?))
}

#[utoipa::path(
    get,
    path = "/api/feed",
    params(FeedQuery),
    responses(
        (status = 200, description = "Up to 50 posts, newest first", body = [NewFeedPost]),
    ),
    tag = "feed"
)]
#[instrument(skip_all)]
pub async fn list_posts(
    Extension(store): Extension<SharedStore>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let mut filter = Filter::new();
    if let Some(tag) = query.tag.filter(|tag| !tag.is_empty()) {
        filter = filter.one_of("tags", [tag]);
    }
    let mut posts = store.query(FEED_COLLECTION, &filter, FEED_LIST_LIMIT).await?;
    newest_first(&mut posts);
    Ok(Json(serialize_all(&posts)))
}

/// Sort by `created_at` descending; records without a readable timestamp go last.
fn newest_first(posts: &mut [Document]) {
    posts.sort_by_key(|post| {
        Reverse(
            post.get(CREATED_AT_FIELD)
                .and_then(parse_date)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    });
}

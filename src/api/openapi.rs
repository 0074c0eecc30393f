use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use super::handlers::{Created, ErrorBody, auth, feed, guides, health, trips};
use crate::auth::{AuthSession, PublicUser};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::root,
        health::health,
        auth::register,
        auth::login,
        auth::me,
        trips::create_trip,
        trips::list_trips,
        trips::apply_to_trip,
        guides::create_guide,
        guides::list_guides,
        guides::create_review,
        guides::list_reviews,
        feed::create_post,
        feed::list_posts,
    ),
    components(schemas(
        AuthSession,
        PublicUser,
        ErrorBody,
        Created,
        auth::RegisterRequest,
        auth::LoginRequest,
        trips::NewTrip,
        trips::NewApplication,
        guides::NewGuide,
        guides::NewReview,
        feed::NewFeedPost,
        health::Health,
        health::Banner,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "auth", description = "Registration, login and the current identity"),
        (name = "trips", description = "Trips and applications to join them"),
        (name = "guides", description = "Guides and their reviews"),
        (name = "feed", description = "Community feed"),
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// `OpenAPI` document for every route served by [`super::router`], with
/// title and version taken from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = Some(env!("CARGO_PKG_DESCRIPTION").to_string());
    doc
}

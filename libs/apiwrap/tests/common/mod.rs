#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use apiwrap::{Params, Resource, Settings, WebError, Wrap, tag_response};
use apiwrap_logging::LogService;
use axum::body::Body;
use axum::response::{Json, Response};
use axum::routing::get;
use axum::Router;
use http::{Request, StatusCode};
use serde_json::{Value, json};

pub fn wrap(settings: Settings, router: Router) -> Router {
    Wrap::new(settings, LogService::disabled())
        .unwrap()
        .apply(router)
}

/// A small application exercising every error class and envelope shape.
pub fn demo_router() -> Router {
    let users = Router::new()
        .route(
            "/users",
            get(|| async { Json(json!([{"name": "ada"}, {"name": "grace"}])) }),
        )
        .route("/user", get(|| async { Json(json!({"name": "ada"})) }))
        .layer(tag_response(Resource::new("users")));

    Router::new()
        .merge(users)
        .route(
            "/search",
            get(|params: Params| async move {
                let value = params.string("value")?.to_owned();
                Ok::<_, WebError>(Json(json!({"query": value})))
            }),
        )
        .route(
            "/assert",
            get(|| async { Err::<(), _>(WebError::assertion("never gonna happen")) }),
        )
        .route(
            "/boom",
            get(|| async { Err::<(), _>(WebError::database("duplicate key")) }),
        )
        .route(
            "/private",
            get(|| async { Err::<(), _>(WebError::http(StatusCode::UNAUTHORIZED)) }),
        )
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

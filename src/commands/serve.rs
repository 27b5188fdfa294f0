use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::{DefaultBodyLimit, Form, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::ApiError;
use crate::store::PasteStore;
use crate::types::api::{CreatePaste, CreatedPaste, PasteInfo};
use crate::App;

/// The manual for the program in man page form.
const MAN_PAGE: &str = include_str!("../../assets/man.txt");

pub async fn run(app: App) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], app.config.port));

    info!("listening on http://{addr}");

    axum::Server::bind(&addr)
        .serve(router(app).into_make_service())
        .await?;

    Ok(())
}

pub(crate) fn router(app: App) -> Router {
    let max_upload_size = app.config.limits.max_upload_size;

    Router::new()
        .route("/", get(index).post(create_paste))
        .route("/:slug", get(get_paste_raw).delete(delete_paste))
        .route("/:slug/", get(get_paste_raw).delete(delete_paste)) // hack
        .route("/:slug/json", get(get_paste_json))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_size))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

async fn index() -> &'static str {
    MAN_PAGE
}

async fn create_paste(
    State(config): State<Config>,
    State(store): State<PasteStore>,
    Form(form): Form<CreatePaste>,
) -> crate::ApiResult<impl IntoResponse> {
    let paste = store
        .create(form.content, form.title, form.language, form.expire_days)
        .await?;

    let path = format!("/{slug}", slug = paste.slug);
    let url = format!("{base_url}{path}", base_url = config.base_url);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, path)],
        Json(CreatedPaste {
            slug: paste.slug,
            url,
            delete_key: paste.delete_key,
            expires_at: paste.expires_at,
        }),
    ))
}

async fn get_paste_raw(
    State(store): State<PasteStore>,
    Path(slug): Path<String>,
) -> crate::ApiResult<impl IntoResponse> {
    let paste = store.fetch(&slug).await?;

    let headers = [
        (
            header::CONTENT_TYPE,
            "text/plain; charset=utf-8".to_owned(),
        ),
        (
            header::EXPIRES,
            paste
                .expires_at
                .format("%a, %d %b %Y %H:%M:%S GMT")
                .to_string(),
        ),
    ];

    Ok((headers, paste.content))
}

async fn get_paste_json(
    State(store): State<PasteStore>,
    Path(slug): Path<String>,
) -> crate::ApiResult<Json<PasteInfo>> {
    let paste = store.fetch(&slug).await?;
    Ok(Json(paste.into()))
}

async fn delete_paste(
    State(store): State<PasteStore>,
    Query(params): Query<HashMap<String, String>>,
    Path(slug): Path<String>,
) -> crate::ApiResult<StatusCode> {
    let delete_key = params
        .get("delete_key")
        .ok_or_else(|| ApiError::MissingDeleteKey)?;

    store.delete(&slug, delete_key).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{Duration, SubsecRound, Utc};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::{self, Limits};
    use crate::db::Database;
    use crate::types::Paste;

    /// Build an app over a private in-memory database, handing back the
    /// database so tests can seed rows directly.
    async fn test_app(limits: Limits) -> (App, Database) {
        let config = Config {
            database: config::Database {
                url: "sqlite::memory:".to_owned(),
                max_connections: 1,
                acquire_timeout_secs: 1,
            },
            limits,
            ..Config::default()
        };

        let db = Database::connect(&config.database).await.unwrap();
        db.init_schema().await.unwrap();
        let store = PasteStore::new(db.clone(), config.limits.clone());

        (App { config, store }, db)
    }

    fn form_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn delete_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    #[tokio::test]
    async fn created_pastes_are_immediately_fetchable() {
        let (app, _db) = test_app(Limits::default()).await;
        let router = router(app);

        let response = router
            .clone()
            .oneshot(form_request("content=hello%20world&expire_days=1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let location = response.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .to_owned();
        let created = body_json(response).await;
        let slug = created["slug"].as_str().unwrap().to_owned();

        assert_eq!(slug.len(), 7);
        assert_eq!(location, format!("/{slug}"));
        assert_eq!(
            created["url"].as_str().unwrap(),
            format!("http://localhost:8080/{slug}")
        );
        assert!(created["delete_key"].is_string());

        let response = router
            .clone()
            .oneshot(get_request(&format!("/{slug}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let expires = response.headers()[header::EXPIRES].to_str().unwrap();
        assert!(expires.ends_with("GMT"));
        assert_eq!(body_string(response).await, "hello world");
    }

    #[tokio::test]
    async fn trailing_slash_still_finds_the_paste() {
        let (app, _db) = test_app(Limits::default()).await;
        let router = router(app);

        let created = body_json(
            router
                .clone()
                .oneshot(form_request("content=hi"))
                .await
                .unwrap(),
        )
        .await;
        let slug = created["slug"].as_str().unwrap().to_owned();

        let response = router
            .clone()
            .oneshot(get_request(&format!("/{slug}/")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "hi");
    }

    #[tokio::test]
    async fn json_view_carries_metadata_but_not_the_delete_key() {
        let (app, _db) = test_app(Limits::default()).await;
        let router = router(app);

        let created = body_json(
            router
                .clone()
                .oneshot(form_request("content=fn%20main()%20%7B%7D&title=snippet&language=rust"))
                .await
                .unwrap(),
        )
        .await;
        let slug = created["slug"].as_str().unwrap().to_owned();

        let response = router
            .clone()
            .oneshot(get_request(&format!("/{slug}/json")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let info = body_json(response).await;
        assert_eq!(info["slug"].as_str().unwrap(), slug);
        assert_eq!(info["title"], "snippet");
        assert_eq!(info["language"], "rust");
        assert_eq!(info["content"], "fn main() {}");
        assert!(info["created_at"].is_string());
        assert!(info["expires_at"].is_string());
        assert!(info.get("delete_key").is_none());
    }

    #[tokio::test]
    async fn missing_and_expired_pastes_are_the_same_not_found() {
        let (app, db) = test_app(Limits::default()).await;
        let created_at = Utc::now().trunc_subsecs(0);
        db.insert_paste(&Paste {
            slug: "bygones".to_owned(),
            title: None,
            language: None,
            content: "long gone".to_owned(),
            delete_key: Uuid::new_v4().to_string(),
            created_at,
            expires_at: created_at - Duration::seconds(10),
        })
        .await
        .unwrap();
        let router = router(app);

        let expired = router
            .clone()
            .oneshot(get_request("/bygones"))
            .await
            .unwrap();
        let missing = router
            .clone()
            .oneshot(get_request("/neverwas"))
            .await
            .unwrap();

        assert_eq!(expired.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(expired).await, body_string(missing).await);
    }

    #[tokio::test]
    async fn blank_content_is_a_client_error() {
        let (app, _db) = test_app(Limits::default()).await;

        let response = router(app).oneshot(form_request("content=")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "paste content is empty");
    }

    #[tokio::test]
    async fn absent_content_field_is_a_client_error() {
        let (app, _db) = test_app(Limits::default()).await;

        let response = router(app)
            .oneshot(form_request("title=no%20content"))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn disallowed_expiry_is_a_client_error() {
        let (app, _db) = test_app(Limits::default()).await;

        let response = router(app)
            .oneshot(form_request("content=hi&expire_days=2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "unsupported expiry of 2 days");
    }

    #[tokio::test]
    async fn oversized_content_is_rejected_after_validation() {
        let limits = Limits {
            max_content_size: 16,
            ..Limits::default()
        };
        let (app, _db) = test_app(limits).await;

        let body = format!("content={}", "x".repeat(17));
        let response = router(app).oneshot(form_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn oversized_bodies_are_cut_off_by_the_limit_layer() {
        let limits = Limits {
            max_upload_size: 32,
            ..Limits::default()
        };
        let (app, _db) = test_app(limits).await;

        let body = format!("content={}", "x".repeat(500));
        let response = router(app).oneshot(form_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn delete_needs_the_right_key() {
        let (app, _db) = test_app(Limits::default()).await;
        let router = router(app);

        let created = body_json(
            router
                .clone()
                .oneshot(form_request("content=ephemeral"))
                .await
                .unwrap(),
        )
        .await;
        let slug = created["slug"].as_str().unwrap().to_owned();
        let delete_key = created["delete_key"].as_str().unwrap().to_owned();

        let response = router
            .clone()
            .oneshot(delete_request(&format!("/{slug}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .clone()
            .oneshot(delete_request(&format!("/{slug}?delete_key=wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router
            .clone()
            .oneshot(delete_request(&format!("/{slug}?delete_key={delete_key}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = router
            .clone()
            .oneshot(get_request(&format!("/{slug}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router
            .clone()
            .oneshot(delete_request(&format!("/{slug}?delete_key={delete_key}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn index_serves_the_manual() {
        let (app, _db) = test_app(Limits::default()).await;

        let response = router(app).oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("minibin"));
    }
}

use std::net::SocketAddr;

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, comments, posts, report, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(report::router())
        .route("/health", get(|| async { "ok" }))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::gate::request_gate,
        ))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn signup(app: &Router, email: &str) -> Value {
        let (status, body) = send(
            app,
            json_request(
                Method::POST,
                "/auth/signup",
                None,
                json!({"name": "Jane", "email": email, "password": "pw"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn signup_returns_token_pair() {
        let app = build_app(AppState::fake());
        let body = signup(&app, "jane@x.com").await;
        assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
        assert!(body["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn duplicate_signup_reports_unique_email() {
        let app = build_app(AppState::fake());
        signup(&app, "jane@x.com").await;
        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/auth/signup",
                None,
                json!({"name": "Jane", "email": "JANE@x.com", "password": "pw"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"][0], "email must be unique.");
    }

    #[tokio::test]
    async fn wrong_password_is_forbidden() {
        let app = build_app(AppState::fake());
        signup(&app, "jane@x.com").await;
        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/auth/signin",
                None,
                json!({"email": "jane@x.com", "password": "nope"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"][0], "Access denied.");
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let app = build_app(AppState::fake());
        let (status, body) =
            send(&app, json_request(Method::POST, "/auth/logout", None, json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["statusCode"], 401);

        let (status, _) = send(
            &app,
            json_request(Method::PATCH, "/posts/1/rate", Some("garbage"), json!({"rate": "like"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn tokens_are_not_interchangeable() {
        let app = build_app(AppState::fake());
        let pair = signup(&app, "jane@x.com").await;
        let access = pair["access_token"].as_str().unwrap();
        let refresh = pair["refresh_token"].as_str().unwrap();

        let (status, _) =
            send(&app, json_request(Method::POST, "/auth/refresh", Some(access), json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send(&app, json_request(Method::POST, "/auth/logout", Some(refresh), json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_rotates_over_http() {
        let app = build_app(AppState::fake());
        let pair = signup(&app, "jane@x.com").await;
        let first = pair["refresh_token"].as_str().unwrap().to_string();

        let (status, rotated) =
            send(&app, json_request(Method::POST, "/auth/refresh", Some(&first), json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(rotated["refresh_token"].as_str().unwrap(), first);

        let (status, _) =
            send(&app, json_request(Method::POST, "/auth/refresh", Some(&first), json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_then_refresh_is_rejected() {
        let app = build_app(AppState::fake());
        let pair = signup(&app, "jane@x.com").await;
        let access = pair["access_token"].as_str().unwrap();
        let refresh = pair["refresh_token"].as_str().unwrap();

        let (status, body) =
            send(&app, json_request(Method::POST, "/auth/logout", Some(access), json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(true));

        let (status, _) =
            send(&app, json_request(Method::POST, "/auth/refresh", Some(refresh), json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_and_foreign_profile_edit() {
        let app = build_app(AppState::fake());
        let pair = signup(&app, "jane@x.com").await;
        let access = pair["access_token"].as_str().unwrap();

        let (status, me) = send(
            &app,
            Request::get("/users/me")
                .header(header::AUTHORIZATION, format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "jane@x.com");
        assert!(me.get("password_hash").is_none());

        let other = me["id"].as_i64().unwrap() + 1;
        let (status, _) = send(
            &app,
            json_request(
                Method::PATCH,
                &format!("/users/{other}"),
                Some(access),
                json!({"name": "Mallory"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    async fn raw_signup(app: &Router, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::POST).uri("/auth/signup");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        send(app, builder.body(Body::from(body.to_string())).unwrap()).await
    }

    #[tokio::test]
    async fn unreadable_json_bodies_use_the_error_envelope() {
        let app = build_app(AppState::fake());
        let cases = [
            (Some("application/json"), r#"{"name":"J","email":"j@x.com","password":123}"#),
            (Some("application/json"), r#"{"name":"J","email":"#),
            (None, r#"{"name":"J","email":"j@x.com","password":"pw"}"#),
        ];
        for (content_type, body) in cases {
            let (status, json) = raw_signup(&app, content_type, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(json["statusCode"], 400);
            assert_eq!(json["error"], "Bad Request");
            assert!(json["message"][0].as_str().is_some_and(|m| !m.is_empty()));
        }
    }

    #[tokio::test]
    async fn post_without_multipart_is_a_validation_error() {
        let app = build_app(AppState::fake());
        let pair = signup(&app, "jane@x.com").await;
        let access = pair["access_token"].as_str().unwrap();

        let (status, json) = send(
            &app,
            json_request(Method::POST, "/posts", Some(access), json!({"title": "t"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["statusCode"], 400);
    }

    #[tokio::test]
    async fn content_routes_round_trip_through_the_router() {
        let app = build_app(AppState::fake());
        let pair = signup(&app, "jane@x.com").await;
        let access = pair["access_token"].as_str().unwrap();

        let boundary = "XBOUNDARY";
        let form = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nHello\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"description\"\r\n\r\nWorld\r\n\
             --{boundary}--\r\n"
        );
        let (status, post) = send(
            &app,
            Request::post("/posts")
                .header(header::AUTHORIZATION, format!("Bearer {access}"))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(form))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(post["title"], "Hello");
        assert!(post.get("image_key").is_none());
        let id = post["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            json_request(Method::PATCH, &format!("/posts/{id}/rate"), Some(access), json!({"rate": "like"})),
        )
        .await;
        assert_eq!((status, body), (StatusCode::OK, json!(true)));

        let (status, comment) = send(
            &app,
            json_request(
                Method::POST,
                "/comments",
                Some(access),
                json!({"post_id": id, "description": "first"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(comment.get("deleted_by").is_none());

        let (status, report) = send(
            &app,
            Request::get("/report").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            report,
            json!([{"title": "Hello", "number_of_comments": 1, "views": 1, "likes": 1, "dislikes": 0}])
        );
    }
}

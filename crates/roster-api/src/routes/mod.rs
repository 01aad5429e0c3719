//! API routes

mod auth;
mod employees;
mod ops;
pub mod types;
mod users;
pub mod validation;

use axum::{Router, extract::DefaultBodyLimit, middleware};
use roster_auth::auth_middleware;
use std::sync::Arc;

use crate::state::{AppState, MetricsHandle};

/// Request bodies are small JSON documents
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Create the main router
///
/// The authentication middleware wraps every route, including `/metrics`
/// and the fallback, so unknown paths fall under the default policy too.
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let gate = state.gate.clone();

    let mut router = Router::new()
        .merge(ops::health_routes())
        .merge(auth::routes())
        .merge(employees::routes())
        .merge(users::routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    if let Some(handle) = metrics_handle {
        router = router.merge(ops::metrics_routes(handle));
    }

    router.layer(middleware::from_fn_with_state(gate, auth_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
        response::Response,
    };
    use roster_auth::{
        AuthGate, Authenticator, RoutePolicy, RoutePolicyTable, RouteRule, TokenService,
        hash_password,
    };
    use roster_db::{Database, NewUser};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::types::{MeResponse, TokenResponse};

    const SECRET: &str = "router-test-secret-that-is-long-enough";

    fn policies() -> RoutePolicyTable {
        let admin = || RoutePolicy::Role("ROLE_ADMIN".to_string());
        RoutePolicyTable::new(
            vec![
                RouteRule::new("/health", RoutePolicy::Public),
                RouteRule::new("/metrics", RoutePolicy::Public),
                RouteRule::new("/api/auth/me", RoutePolicy::Authenticated),
                RouteRule::new("/api/auth/**", RoutePolicy::Public),
                RouteRule::new("/api/employees/{id}", admin()).with_method("DELETE"),
                RouteRule::new("/api/users/**", admin()),
                RouteRule::new("/api/**", RoutePolicy::Authenticated),
            ],
            RoutePolicy::Authenticated,
        )
        .unwrap()
    }

    async fn app() -> Router {
        let db = Database::in_memory().await.unwrap();
        for (username, password, roles) in [
            ("admin", "admin123", vec!["ROLE_ADMIN", "ROLE_USER"]),
            ("user", "user123", vec!["ROLE_USER"]),
        ] {
            db.insert_user(NewUser {
                username: username.to_string(),
                password_hash: hash_password(password).unwrap(),
                roles: roles.into_iter().map(String::from).collect(),
            })
            .await
            .unwrap();
        }

        let tokens = Arc::new(TokenService::new(SECRET, 36000));
        let auth = Authenticator::new(Arc::new(db.clone()), tokens.clone());
        let gate = AuthGate::new(tokens, Arc::new(policies()));
        create_router(AppState::new(db, auth, gate), None)
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(app: &Router, username: &str, password: &str) -> String {
        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        read_json::<TokenResponse>(response).await.token
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = app().await;
        let response = app
            .oneshot(request(Method::GET, "/health", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = read_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "up");
    }

    #[tokio::test]
    async fn test_unknown_path_falls_under_default_policy() {
        let app = app().await;
        let response = app
            .clone()
            .oneshot(request(Method::GET, "/nowhere", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let token = login(&app, "user", "user123").await;
        let response = app
            .oneshot(request(Method::GET, "/nowhere", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_login_then_me() {
        let app = app().await;
        let token = login(&app, "admin", "admin123").await;

        let response = app
            .oneshot(request(Method::GET, "/api/auth/me", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let me: MeResponse = read_json(response).await;
        assert_eq!(me.username, "admin");
        assert!(me.roles.iter().any(|r| r == "ROLE_ADMIN"));
    }

    #[tokio::test]
    async fn test_me_requires_token() {
        let app = app().await;
        let response = app
            .oneshot(request(Method::GET, "/api/auth/me", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let app = app().await;

        let wrong_password = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": "admin", "password": "nope" })),
            ))
            .await
            .unwrap();
        let unknown_user = app
            .oneshot(request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": "ghost", "password": "nope" })),
            ))
            .await
            .unwrap();

        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

        let a: Value = read_json(wrong_password).await;
        let b: Value = read_json(unknown_user).await;
        assert_eq!(a, b);
        assert_eq!(a["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_login_rejects_bad_username() {
        let app = app().await;
        let response = app
            .oneshot(request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": "admin'; --", "password": "x" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_employees_require_authentication() {
        let app = app().await;
        let response = app
            .oneshot(request(Method::GET, "/api/employees", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_delete_employee_requires_admin() {
        let app = app().await;
        let user_token = login(&app, "user", "user123").await;
        let admin_token = login(&app, "admin", "admin123").await;

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/employees",
                Some(&user_token),
                Some(json!({ "name": "Bilbo Baggins", "role": "burglar" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: Value = read_json(response).await;
        let uri = format!("/api/employees/{}", created["id"]);

        let response = app
            .clone()
            .oneshot(request(Method::DELETE, &uri, Some(&user_token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(request(Method::DELETE, &uri, Some(&admin_token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(request(Method::GET, &uri, Some(&user_token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_refresh_issues_new_token() {
        let app = app().await;
        let token = login(&app, "user", "user123").await;

        let response = app
            .clone()
            .oneshot(request(Method::POST, "/api/auth/refresh", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let renewed: TokenResponse = read_json(response).await;

        let response = app
            .oneshot(request(Method::GET, "/api/auth/me", Some(&renewed.token), None))
            .await
            .unwrap();
        let me: MeResponse = read_json(response).await;
        assert_eq!(me.username, "user");
    }

    #[tokio::test]
    async fn test_refresh_without_token() {
        let app = app().await;
        let response = app
            .oneshot(request(Method::POST, "/api/auth/refresh", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_user_admin_routes() {
        let app = app().await;
        let user_token = login(&app, "user", "user123").await;
        let admin_token = login(&app, "admin", "admin123").await;

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/users", Some(&user_token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/users",
                Some(&admin_token),
                Some(json!({ "username": "frodo", "password": "ring-bearer" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: Value = read_json(response).await;
        assert_eq!(created["roles"], json!(["ROLE_USER"]));
        assert!(created.get("password_hash").is_none());

        let token = login(&app, "frodo", "ring-bearer").await;
        assert!(!token.is_empty());
    }
}

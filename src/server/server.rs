use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::catalog::CatalogClient;
use crate::stats::{FieldCapabilities, StatsStore};
use crate::user::{AuthTokenValue, UserManager, UserStore};
use axum_extra::extract::cookie::{Cookie, SameSite};

use axum::{
    body::Body,
    extract::State,
    http::{response, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::metrics::{self, metrics_handler};
use super::stats_routes::make_stats_routes;
#[cfg(feature = "slowdown")]
use super::{http_layers::slowdown_request, log_requests, state::*, ServerConfig};
#[cfg(not(feature = "slowdown"))]
use super::{log_requests, state::*, ServerConfig};
use crate::server::session::{Session, SESSION_TOKEN_COOKIE};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub user_handle: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginBody>,
) -> Response {
    debug!("login() called for user {}", body.user_handle);
    let started = Instant::now();
    let mut locked_manager = user_manager.lock().unwrap();
    let credentials = match locked_manager.get_user_credentials(&body.user_handle) {
        Ok(credentials) => credentials,
        Err(err) => {
            error!("Error loading credentials of {}: {}", body.user_handle, err);
            metrics::record_login_attempt("error", started.elapsed());
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    if let Some(credentials) = credentials {
        if let Some(password_credentials) = &credentials.username_password {
            if let Ok(true) = password_credentials.hasher.verify(
                &body.password,
                &password_credentials.hash,
                &password_credentials.salt,
            ) {
                return match locked_manager.generate_auth_token(&credentials) {
                    Ok(auth_token) => {
                        metrics::record_login_attempt("success", started.elapsed());
                        let response_body = LoginSuccessResponse {
                            token: auth_token.value.0.clone(),
                        };
                        let response_body = serde_json::to_string(&response_body).unwrap();

                        let cookie_value = HeaderValue::from_str(&format!(
                            "{}={}; Path=/; HttpOnly",
                            SESSION_TOKEN_COOKIE,
                            auth_token.value.0.clone()
                        ))
                        .unwrap();
                        response::Builder::new()
                            .status(StatusCode::CREATED)
                            .header(axum::http::header::SET_COOKIE, cookie_value)
                            .body(Body::from(response_body))
                            .unwrap()
                    }
                    Err(err) => {
                        error!("Error with auth token generation: {}", err);
                        metrics::record_login_attempt("error", started.elapsed());
                        StatusCode::INTERNAL_SERVER_ERROR.into_response()
                    }
                };
            }
        }
    }
    metrics::record_login_attempt("failure", started.elapsed());
    StatusCode::UNAUTHORIZED.into_response()
}

async fn logout(State(user_manager): State<GuardedUserManager>, session: Session) -> Response {
    let mut locked_manager = user_manager.lock().unwrap();
    match locked_manager.delete_auth_token(&session.user_id, &AuthTokenValue(session.token)) {
        Ok(()) => {
            let cookie_value = Cookie::build(Cookie::new(SESSION_TOKEN_COOKIE, ""))
                .path("/")
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
                .same_site(SameSite::Lax)
                .build();

            response::Builder::new()
                .status(StatusCode::OK)
                .header(axum::http::header::SET_COOKIE, cookie_value.to_string())
                .body(Body::empty())
                .unwrap()
        }
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

impl ServerState {
    fn new(
        config: ServerConfig,
        capabilities: FieldCapabilities,
        stats_store: Arc<dyn StatsStore>,
        catalog: Arc<dyn CatalogClient>,
        user_manager: UserManager,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            stats_store,
            catalog,
            user_manager: Arc::new(Mutex::new(user_manager)),
            capabilities,
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    capabilities: FieldCapabilities,
    stats_store: Arc<dyn StatsStore>,
    catalog: Arc<dyn CatalogClient>,
    user_store: Box<dyn UserStore>,
) -> Result<Router> {
    let user_manager = UserManager::new(user_store);
    let state = ServerState::new(config, capabilities, stats_store, catalog, user_manager);

    let auth_routes: Router = Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout))
        .with_state(state.clone());

    let stats_routes = make_stats_routes(state.clone());

    let home_router: Router = Router::new().route("/", get(home)).with_state(state.clone());

    let mut app: Router = home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1/stats", stats_routes);

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(slowdown_request));
    }
    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    capabilities: FieldCapabilities,
    stats_store: Arc<dyn StatsStore>,
    catalog: Arc<dyn CatalogClient>,
    user_store: Box<dyn UserStore>,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, capabilities, stats_store, catalog, user_store)?;

    let metrics_app: Router = Router::new().route("/metrics", get(metrics_handler));
    let metrics_listener =
        tokio::net::TcpListener::bind(format!("127.0.0.1:{}", metrics_port)).await?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, metrics_app).await {
            error!("Metrics server stopped: {}", err);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .unwrap();

    Ok(axum::serve(listener, app).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogArtist;
    use crate::catalog::CatalogTrack;
    use crate::stats::SqliteStatsStore;
    use crate::user::auth::{AuthToken, UserAuthCredentials};
    use crate::user::{Permission, UserAuthCredentialsStore, UserAuthTokenStore, UserRole};
    use async_trait::async_trait;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    struct NoCatalog;

    #[async_trait]
    impl CatalogClient for NoCatalog {
        async fn get_track(&self, _track_id: &str) -> Result<Option<CatalogTrack>> {
            Ok(None)
        }

        async fn get_tracks_by_ids(&self, _track_ids: &[String]) -> Result<Vec<CatalogTrack>> {
            Ok(vec![])
        }

        async fn search_tracks(&self, _query: &str) -> Result<Vec<CatalogTrack>> {
            Ok(vec![])
        }

        async fn get_artist(&self, _artist_id: &str) -> Result<Option<CatalogArtist>> {
            Ok(None)
        }

        async fn get_artists_by_ids(&self, _artist_ids: &[String]) -> Result<Vec<CatalogArtist>> {
            Ok(vec![])
        }

        async fn get_artist_tracks(&self, _artist_id: &str) -> Result<Vec<CatalogTrack>> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct InMemoryUserStore {}

    impl UserStore for InMemoryUserStore {
        fn create_user(&self, _user_handle: &str) -> Result<usize> {
            todo!()
        }

        fn get_user_handle(&self, _user_id: usize) -> Result<Option<String>> {
            todo!()
        }

        fn get_all_user_handles(&self) -> Result<Vec<String>> {
            todo!()
        }

        fn get_user_id(&self, _user_handle: &str) -> Result<Option<usize>> {
            todo!()
        }

        fn get_user_roles(&self, _user_id: usize) -> Result<Vec<UserRole>> {
            todo!()
        }

        fn add_user_role(&self, _user_id: usize, _role: UserRole) -> Result<()> {
            todo!()
        }

        fn remove_user_role(&self, _user_id: usize, _role: UserRole) -> Result<()> {
            todo!()
        }

        fn resolve_user_permissions(&self, _user_id: usize) -> Result<Vec<Permission>> {
            Ok(vec![])
        }
    }

    impl UserAuthTokenStore for InMemoryUserStore {
        fn get_user_auth_token(&self, _token: &AuthTokenValue) -> Result<Option<AuthToken>> {
            Ok(None)
        }

        fn delete_user_auth_token(&self, _token: &AuthTokenValue) -> Result<Option<AuthToken>> {
            todo!()
        }

        fn update_user_auth_token_last_used_timestamp(
            &self,
            _token: &AuthTokenValue,
        ) -> Result<()> {
            todo!()
        }

        fn add_user_auth_token(&self, _token: AuthToken) -> Result<()> {
            todo!()
        }

        fn get_all_user_auth_tokens(&self, _user_handle: &str) -> Result<Vec<AuthToken>> {
            todo!()
        }

        fn prune_unused_auth_tokens(&self, _unused_for_days: u64) -> Result<usize> {
            todo!()
        }
    }

    impl UserAuthCredentialsStore for InMemoryUserStore {
        fn get_user_auth_credentials(&self, _user_handle: &str) -> Result<Option<UserAuthCredentials>> {
            Ok(None)
        }

        fn update_user_auth_credentials(&self, _credentials: UserAuthCredentials) -> Result<()> {
            todo!()
        }
    }

    fn make_test_app_with_config(dir: &tempfile::TempDir, config: ServerConfig) -> Router {
        let stats_store = Arc::new(
            SqliteStatsStore::new(dir.path().join("stats.db"), FieldCapabilities::default())
                .unwrap(),
        );
        make_app(
            config,
            FieldCapabilities::default(),
            stats_store,
            Arc::new(NoCatalog),
            Box::new(InMemoryUserStore::default()),
        )
        .unwrap()
    }

    fn make_test_app(dir: &tempfile::TempDir) -> Router {
        make_test_app_with_config(dir, ServerConfig::default())
    }

    #[tokio::test]
    async fn responds_unauthorized_on_protected_routes() {
        let dir = tempfile::tempdir().unwrap();
        let app = make_test_app(&dir);

        let protected_routes = vec![
            "/v1/stats/songs/123/plays",
            "/v1/stats/songs/123/aggregate",
            "/v1/stats/songs/123/ratings",
            "/v1/stats/songs/123/rating",
            "/v1/stats/albums/123/sales",
            "/v1/stats/artists/ratings",
            "/v1/stats/artists/123/aggregate",
            "/v1/stats/global",
            "/v1/auth/logout",
        ];

        for route in protected_routes.into_iter() {
            println!("Trying route {}", route);
            let request = Request::builder().uri(route).body(Body::empty()).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let request = Request::builder()
            .method("POST")
            .uri("/v1/stats/songs/123/plays")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn home_works_without_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let app = make_test_app(&dir);

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body.get("uptime").is_some());
        assert!(body.get("session_token").unwrap().is_null());
    }

    #[tokio::test]
    async fn dev_role_header_grants_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            dev_role_header: Some("X-Dev-Role".to_string()),
            ..Default::default()
        };
        let app = make_test_app_with_config(&dir, config);

        let request = Request::builder()
            .uri("/v1/stats/songs/123/plays")
            .header("X-Dev-Role", "Admin")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // An unknown role name grants nothing
        let request = Request::builder()
            .uri("/v1/stats/songs/123/plays")
            .header("X-Dev-Role", "Superuser")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn dev_role_header_is_ignored_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let app = make_test_app(&dir);

        let request = Request::builder()
            .uri("/v1/stats/songs/123/plays")
            .header("X-Dev-Role", "Admin")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_with_unknown_user_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let app = make_test_app(&dir);

        let request = Request::builder()
            .method("POST")
            .uri("/v1/auth/login")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"user_handle": "nobody", "password": "nope"}"#,
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0d 00:00:00");
        assert_eq!(format_uptime(Duration::from_secs(61)), "0d 00:01:01");
        assert_eq!(
            format_uptime(Duration::from_secs(2 * 86_400 + 3 * 3600 + 4 * 60 + 5)),
            "2d 03:04:05"
        );
    }
}

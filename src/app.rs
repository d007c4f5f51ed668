use std::net::SocketAddr;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, campaigns, dashboard, invoices};

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.imports.max_upload_bytes + 64 * 1024;
    Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(campaigns::router())
        .merge(invoices::router())
        .route("/health", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
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
pub(crate) mod testing {
    //! Drives the router in-process against the in-memory store.

    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{
        auth::{jwt::JwtKeys, password::hash_password},
        state::AppState,
        store::{memory::MemoryStore, NewUser, User},
    };

    pub const PASSWORD: &str = "correct-password";

    pub struct TestApp {
        pub state: AppState,
        pub store: Arc<MemoryStore>,
        router: Router,
    }

    impl TestApp {
        pub fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let state = AppState::with_store(store.clone());
            let router = super::build_app(state.clone());
            Self {
                state,
                store,
                router,
            }
        }

        /// Stores a user directly and returns it with a bearer token.
        pub async fn user(&self, email: &str, pan: &str, is_admin: bool) -> (User, String) {
            let user = self
                .state
                .store
                .insert_user(NewUser {
                    first_name: "Test".into(),
                    last_name: email.split('@').next().unwrap_or("user").into(),
                    email: email.into(),
                    phone: "9000000000".into(),
                    pan: pan.into(),
                    password_hash: hash_password(PASSWORD).unwrap(),
                    is_admin,
                })
                .await
                .unwrap();
            let token = JwtKeys::from_ref(&self.state).sign(&user).unwrap();
            (user, token)
        }
    }

    pub async fn send_request(app: &TestApp, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let res = app.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
        let mut b = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        b
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }

    pub async fn send(
        app: &TestApp,
        method: Method,
        uri: &str,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let req = builder(method, uri, token).body(Body::empty()).unwrap();
        let (status, bytes) = send_request(app, req).await;
        (status, json_body(&bytes))
    }

    pub async fn send_json(
        app: &TestApp,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let req = builder(method, uri, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes) = send_request(app, req).await;
        (status, json_body(&bytes))
    }

    pub async fn send_csv(
        app: &TestApp,
        uri: &str,
        token: Option<&str>,
        csv: &str,
    ) -> (StatusCode, Value) {
        const BOUNDARY: &str = "X-CSV-BOUNDARY";
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"upload.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{BOUNDARY}--\r\n"
        );
        let req = builder(Method::POST, uri, token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, bytes) = send_request(app, req).await;
        (status, json_body(&bytes))
    }
}

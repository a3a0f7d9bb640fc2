//! Counter example for kv-session-store
//!
//! A tiny Axum server that keeps a per-visitor counter in Redis. The session id
//! travels in a `session_id` cookie; the handler does the cookie work itself,
//! since the store only deals in ids and attributes.
//!
//! # Running the example
//!
//! 1. Make sure you have a Redis server running
//! 2. Optionally point the store somewhere else:
//!    ```bash
//!    export SESSION_STORE_HOST=127.0.0.1
//!    export SESSION_STORE_PORT=6379
//!    export SESSION_STORE_EXPIRE_AFTER=3600
//!    ```
//! 3. Run the example:
//!    ```bash
//!    cargo run --example counter
//!    ```
//!
//! # Testing the example
//!
//! ```bash
//! curl -v -c cookies.txt -b cookies.txt http://127.0.0.1:3000/
//! curl -v -c cookies.txt -b cookies.txt http://127.0.0.1:3000/
//! curl -v -c cookies.txt -b cookies.txt -X POST http://127.0.0.1:3000/renew
//! curl -v -c cookies.txt -b cookies.txt -X POST http://127.0.0.1:3000/logout
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use dotenvy::dotenv;
use kv_session_store::{KvBackend, KvStore, RedisBackend, StoreConfig};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const COOKIE_NAME: &str = "session_id";

type Store<B> = Arc<KvStore<B>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for better logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    // Load environment variables from .env file if present
    dotenv().ok();

    let config = StoreConfig::from_env();
    info!("Connecting to Redis at {}", config.redis_url());

    // The handlers run on a multi-threaded runtime, so lock by default.
    let store = KvStore::connect(&config).await?.with_concurrent(true);

    let app = Router::new()
        .route("/", get(increment::<RedisBackend>))
        .route("/renew", post(renew::<RedisBackend>))
        .route("/logout", post(logout::<RedisBackend>))
        .with_state(Arc::new(store));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("Server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Increments the visitor's counter, creating a session on first visit.
async fn increment<B: KvBackend>(State(store): State<Store<B>>, headers: HeaderMap) -> Response {
    let cookie = session_cookie(&headers);
    let options = store.options();

    let (id, mut attributes) = match store.get(cookie.as_deref(), &options).await {
        Ok(loaded) => loaded,
        Err(e) => return internal_error(e),
    };

    let counter = attributes
        .get("counter")
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
        + 1;
    attributes.insert("counter", counter);

    let Some(id) = id else {
        return unavailable();
    };

    if let Err(e) = store.set(&id, &attributes, &options).await {
        return internal_error(e);
    }

    let body = format!("counter = {counter}");
    // Only send the cookie when the id changed.
    if cookie.as_deref() == Some(id.as_str()) {
        body.into_response()
    } else {
        ([(header::SET_COOKIE, set_cookie(&id))], body).into_response()
    }
}

/// Moves the session to a fresh id, keeping its attributes.
///
/// An unknown cookie already gets a fresh session from `get`; that session is
/// handed out as is.
async fn renew<B: KvBackend>(State(store): State<Store<B>>, headers: HeaderMap) -> Response {
    let Some(old_id) = session_cookie(&headers) else {
        return (StatusCode::BAD_REQUEST, "No session to renew").into_response();
    };
    let options = store.options();

    let attributes = match store.get(Some(&old_id), &options).await {
        Ok((Some(id), attributes)) if id == old_id => attributes,
        Ok((Some(fresh_id), _)) => return renewed(&fresh_id),
        Ok((None, _)) => return unavailable(),
        Err(e) => return internal_error(e),
    };

    let new_id = match store.destroy(&old_id, &options).await {
        Ok(Some(new_id)) => new_id,
        Ok(None) => return unavailable(),
        Err(e) => return internal_error(e),
    };

    if let Err(e) = store.set(&new_id, &attributes, &options).await {
        return internal_error(e);
    }

    renewed(&new_id)
}

/// Destroys the session without a replacement.
async fn logout<B: KvBackend>(State(store): State<Store<B>>, headers: HeaderMap) -> Response {
    if let Some(id) = session_cookie(&headers) {
        let options = store.options().with_drop(true);
        if let Err(e) = store.destroy(&id, &options).await {
            return internal_error(e);
        }
    }

    (
        [(
            header::SET_COOKIE,
            format!("{COOKIE_NAME}=; Path=/; HttpOnly; Max-Age=0"),
        )],
        "Logged out",
    )
        .into_response()
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .map(|(_, value)| value.to_string())
}

fn set_cookie(id: &str) -> String {
    format!("{COOKIE_NAME}={id}; Path=/; HttpOnly")
}

fn renewed(id: &str) -> Response {
    ([(header::SET_COOKIE, set_cookie(id))], "Session renewed").into_response()
}

fn unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "Session backend unavailable").into_response()
}

fn internal_error(e: kv_session_store::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Session store error: {e}"),
    )
        .into_response()
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use super::auth::Claims;

/// Keyed admission check. Injected so deployments can swap the in-process
/// window for a shared store without touching the middleware.
pub trait RateLimiter: Send + Sync {
    fn allow(&self, key: &str) -> bool;
}

#[derive(Debug)]
struct WindowState {
    start: Instant,
    count: u32,
}

/// Fixed window counter per key. The window resets wholesale on expiry, so a
/// burst straddling the boundary can briefly exceed the limit; acceptable
/// here.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, WindowState>>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit.max(1),
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();
        let state = windows.entry(key.to_string()).or_insert(WindowState {
            start: now,
            count: 0,
        });
        if now.duration_since(state.start) >= self.window {
            state.start = now;
            state.count = 0;
        }
        if state.count < self.limit {
            state.count += 1;
            true
        } else {
            false
        }
    }
}

#[derive(Clone)]
pub struct RateLimitState(pub Arc<dyn RateLimiter>);

pub fn per_user_state(limit: u32, window: Duration) -> RateLimitState {
    RateLimitState(Arc::new(FixedWindowLimiter::new(limit, window)))
}

/// Counts against the authenticated user id; anonymous traffic shares one
/// bucket. Runs after bearer auth so the claims are already in extensions.
pub async fn per_user_middleware(
    State(state): State<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = req
        .extensions()
        .get::<Claims>()
        .map(|claims| claims.sub.clone())
        .unwrap_or_else(|| "anonymous".to_string());
    if !state.0.allow(&key) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "rate_limit_exceeded" })),
        )
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enforces_limit_within_window() {
        let limiter = FixedWindowLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.allow("alice"));
        assert!(limiter.allow("alice"));
        assert!(!limiter.allow("alice"));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.allow("alice"));
        assert!(!limiter.allow("alice"));
        assert!(limiter.allow("bob"));
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_millis(50));
        assert!(limiter.allow("alice"));
        assert!(!limiter.allow("alice"));
        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.allow("alice"));
    }
}

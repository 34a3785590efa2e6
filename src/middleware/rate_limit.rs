use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue, RETRY_AFTER},
    Error, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::warn;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Fixed-window request counter keyed by client address. Shared by every
/// worker, so it is built once outside the `HttpServer` factory.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, client: &str, now: Instant) -> Decision {
        let mut clients = self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // Drop expired windows so the map does not grow without bound.
        if clients.len() > 10_000 {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients.entry(client.to_string()).or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, count: 0 };
        }

        if entry.count >= self.max_requests {
            let elapsed = now.duration_since(entry.started);
            return Decision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            };
        }

        entry.count += 1;
        Decision::Allowed {
            remaining: self.max_requests - entry.count,
        }
    }
}

pub struct RateLimit {
    limiter: Arc<RateLimiter>,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitService {
            service,
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitService<S> {
    service: S,
    limiter: Arc<RateLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let client = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        match self.limiter.check(&client, Instant::now()) {
            Decision::Allowed { remaining } => {
                let fut = self.service.call(req);
                Box::pin(async move {
                    let mut res = fut.await?;
                    res.headers_mut().insert(
                        HeaderName::from_static("ratelimit-remaining"),
                        HeaderValue::from(remaining),
                    );
                    Ok(res.map_into_left_body())
                })
            }
            Decision::Limited { retry_after } => {
                warn!("Rate limit exceeded for {client}");
                let response = HttpResponse::TooManyRequests()
                    .insert_header((RETRY_AFTER, retry_after.as_secs().max(1).to_string()))
                    .json(json!({ "error": LIMIT_MESSAGE }));
                Box::pin(ready(Ok(req.into_response(response).map_into_right_body())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as actix_test, web, App};

    #[test]
    fn test_window_counts_and_resets() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert_eq!(limiter.check("1.2.3.4", start), Decision::Allowed { remaining: 1 });
        assert_eq!(limiter.check("1.2.3.4", start), Decision::Allowed { remaining: 0 });
        assert!(matches!(limiter.check("1.2.3.4", start), Decision::Limited { .. }));
        assert_eq!(limiter.check("5.6.7.8", start), Decision::Allowed { remaining: 1 });

        let later = start + Duration::from_secs(61);
        assert_eq!(limiter.check("1.2.3.4", later), Decision::Allowed { remaining: 1 });
    }

    #[actix_rt::test]
    async fn test_middleware_returns_429() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(60)));
        let app = actix_test::init_service(
            App::new()
                .wrap(RateLimit::new(limiter))
                .route("/ping", web::get().to(|| async { "pong" })),
        )
        .await;

        let resp = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/ping").to_request()).await;
        assert!(resp.status().is_success());
        assert_eq!(resp.headers().get("ratelimit-remaining").unwrap(), "0");

        let resp = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/ping").to_request()).await;
        assert_eq!(resp.status(), 429);
        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"], LIMIT_MESSAGE);
    }
}

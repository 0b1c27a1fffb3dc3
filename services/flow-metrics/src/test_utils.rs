//!
//! src/test_utils.rs
//!
//! Canned transport used by the client, scraper and matcher tests
//!

use std::sync::Mutex;

use async_trait::async_trait;

use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};

type Route = Box<dyn Fn(&HttpRequest) -> Option<Result<HttpResponse, TransportError>> + Send + Sync>;

/// Answers each request with the first route that accepts it and records
/// every request it sees. Unrouted requests come back as 404
#[derive(Default)]
pub struct FakeTransport {
    routes: Vec<Route>,
    seen: Mutex<Vec<HttpRequest>>
}

impl FakeTransport {
    pub fn new() -> Self { Self::default() }

    /// Responds with `body` for requests whose url ends with `suffix`
    pub fn on(self, suffix: &str, body: &str) -> Self {
        let suffix = suffix.to_string();
        let body = body.to_string();
        self.route(move |req| {
            req.url.ends_with(&suffix).then(|| Ok(HttpResponse::ok(body.clone())))
        })
    }

    pub fn on_status(self, suffix: &str, status: u16) -> Self {
        let suffix = suffix.to_string();
        self.route(move |req| {
            req.url.ends_with(&suffix).then(|| Ok(HttpResponse::new(status, "")))
        })
    }

    pub fn route<F>(mut self, f: F) -> Self
    where
        F: Fn(&HttpRequest) -> Option<Result<HttpResponse, TransportError>> + Send + Sync + 'static
    {
        self.routes.push(Box::new(f));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    pub fn count(&self, suffix: &str) -> usize {
        self.requests().iter().filter(|r| r.url.ends_with(suffix)).count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.clone());
        }
        self.routes
            .iter()
            .find_map(|route| route(&request))
            .unwrap_or_else(|| Ok(HttpResponse::new(404, "")))
    }
}

mockall::mock! {
    pub Transport {}

    #[async_trait]
    impl Transport for Transport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
    }
}

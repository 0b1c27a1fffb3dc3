//!
//! src/http.rs
//!
//! Transport seam shared by every provider client. Clients describe a
//! request as plain data and hand it to a Transport; production uses the
//! reqwest backed implementation, tests swap in canned responses
//!

use async_trait::async_trait;
use reqwest::{Client, header, redirect};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::HttpConfig;
use crate::errors::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub basic_auth: Option<(String, String)>,
    pub bearer: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            form: Vec::new(),
            basic_auth: None,
            bearer: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self { Self::new(Method::Get, url) }

    pub fn head(url: impl Into<String>) -> Self { Self::new(Method::Head, url) }

    pub fn post(url: impl Into<String>) -> Self { Self::new(Method::Post, url) }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    pub fn form(mut self, key: &str, value: impl Into<String>) -> Self {
        self.form.push((key.to_string(), value.into()));
        self
    }

    pub fn basic_auth(mut self, user: &str, password: &str) -> Self {
        self.basic_auth = Some((user.to_string(), password.to_string()));
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    /// First value for a query key, used by tests and debug logging
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn ok(body: impl Into<String>) -> Self { Self::new(200, body) }

    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Failure below the HTTP status layer: dns, connect, timeout, body read
#[derive(Error, Debug, Clone, PartialEq)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client
}

impl ReqwestTransport {
    /// Json api client, every request asks for application/json
    pub fn json(http: &HttpConfig, user_agent: Option<&str>) -> Result<Self, FlowError> {
        let mut h = header::HeaderMap::new();
        h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(agent) = user_agent {
            h.insert(
                header::USER_AGENT,
                header::HeaderValue::from_str(agent)
                    .map_err(|e| FlowError::Config(format!("invalid user-agent {e}")))?
            );
        }

        let http = client_helper(http)
            .default_headers(h)
            .build()
            .map_err(|e| FlowError::Http(format!("build client: {e}")))?;
        Ok( Self { http } )
    }

    /// Html page client, headers are supplied per request
    pub fn pages(http: &HttpConfig, timeout: std::time::Duration) -> Result<Self, FlowError> {
        let http = client_helper(http)
            .timeout(timeout)
            .build()
            .map_err(|e| FlowError::Http(format!("build client: {e}")))?;
        Ok( Self { http } )
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut rb = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Head => self.http.head(&request.url),
            Method::Post => self.http.post(&request.url),
        };

        if !request.query.is_empty() {
            rb = rb.query(&request.query);
        }
        for (key, value) in &request.headers {
            rb = rb.header(key.as_str(), value.as_str());
        }
        if !request.form.is_empty() {
            rb = rb.form(&request.form);
        }
        if let Some((user, password)) = &request.basic_auth {
            rb = rb.basic_auth(user, Some(password));
        }
        if let Some(token) = &request.bearer {
            rb = rb.bearer_auth(token);
        }

        let response = rb
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        Ok( HttpResponse { status, body } )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_collects_parts() {
        let req = HttpRequest::get("https://api.example.test/search")
            .query("q", "nas")
            .query("limit", 10)
            .bearer("token");

        assert_eq!(req.method, Method::Get);
        assert_eq!(req.query_value("q"), Some("nas"));
        assert_eq!(req.query_value("limit"), Some("10"));
        assert_eq!(req.query_value("offset"), None);
        assert_eq!(req.bearer.as_deref(), Some("token"));
    }

    #[test]
    fn response_status_classes() {
        assert!(HttpResponse::ok("{}").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(404, "").is_success());
        assert!(!HttpResponse::new(503, "").is_success());
    }
}

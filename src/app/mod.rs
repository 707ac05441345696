//! Application interface consumed by the crawler
//!
//! The application is invoked in-process: the crawler builds a [`Request`],
//! calls [`Application::call`] and receives a [`Response`] whose body may be a
//! byte buffer, a pull-based chunk source or any sequential reader.

mod body;

pub use body::{Body, BodyReader, ChunkSource};

use crate::url::CrawlTarget;

/// An in-process request/response application
///
/// Implementations must tolerate being called repeatedly and from several
/// worker threads at once. Returning `Err` (or panicking) is treated by the
/// materializer as an application failure: status 500, no file written.
pub trait Application: Send + Sync {
    fn call(&self, request: &Request) -> anyhow::Result<Response>;
}

impl<F> Application for F
where
    F: Fn(&Request) -> anyhow::Result<Response> + Send + Sync,
{
    fn call(&self, request: &Request) -> anyhow::Result<Response> {
        self(request)
    }
}

/// Request descriptor handed to the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method, always `GET` for crawled targets
    pub method: String,

    /// URL scheme (`http` when the target carried none)
    pub scheme: String,

    /// Host the target was addressed to, if any
    pub host: Option<String>,

    /// URL path, always starting with `/`
    pub path: String,

    /// Raw query string without the leading `?`
    pub query: Option<String>,

    /// Ordered request headers
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Builds a GET request for a crawl target
    pub fn get(target: &CrawlTarget) -> Self {
        Self {
            method: "GET".to_string(),
            scheme: target.scheme.clone().unwrap_or_else(|| "http".to_string()),
            host: target.host.clone(),
            path: target.path.clone(),
            query: target.query.clone(),
            headers: Vec::new(),
        }
    }

    /// Appends a header, keeping any existing headers of the same name
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the first header value with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Response produced by the application
#[derive(Debug)]
pub struct Response {
    /// Status code; `999` is reserved for materialization conflicts
    pub status: u16,

    /// Ordered headers, names may repeat
    pub headers: Vec<(String, String)>,

    pub body: Body,
}

impl Response {
    /// Creates a response with the given status and an empty body
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::empty(),
        }
    }

    /// Convenience constructor for a 200 response with a body
    pub fn ok(body: impl Into<Body>) -> Self {
        Self::new(200).with_body(body)
    }

    /// Convenience constructor for a 301 response pointing at `location`
    pub fn moved_permanently(location: impl Into<String>) -> Self {
        Self::new(301).with_header("Location", location)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the first header value with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_hostless_target() {
        let target = CrawlTarget::parse("/docs/?page=2").unwrap();
        let request = Request::get(&target);

        assert_eq!(request.method, "GET");
        assert_eq!(request.scheme, "http");
        assert_eq!(request.host, None);
        assert_eq!(request.path, "/docs/");
        assert_eq!(request.query.as_deref(), Some("page=2"));
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_request_from_absolute_target() {
        let target = CrawlTarget::parse("https://example.com/a").unwrap();
        let request = Request::get(&target);

        assert_eq!(request.scheme, "https");
        assert_eq!(request.host.as_deref(), Some("example.com"));
        assert_eq!(request.path, "/a");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = Response::new(200)
            .with_header("Content-Type", "text/html")
            .with_header("Set-Cookie", "a=1")
            .with_header("set-cookie", "b=2");

        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("SET-COOKIE"), Some("a=1"));
        assert_eq!(response.headers.len(), 3);
        assert_eq!(response.header("Location"), None);
    }

    #[test]
    fn test_closure_is_an_application() {
        let app = |request: &Request| -> anyhow::Result<Response> {
            Ok(Response::ok(format!("hello {}", request.path)))
        };

        let target = CrawlTarget::parse("/world").unwrap();
        let response = app.call(&Request::get(&target)).unwrap();
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_moved_permanently() {
        let response = Response::moved_permanently("/new");
        assert_eq!(response.status, 301);
        assert_eq!(response.header("location"), Some("/new"));
    }
}

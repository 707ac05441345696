use crate::{UrlError, UrlResult};
use std::fmt;
use url::Url;

/// Base used to resolve targets that carry no host of their own.
/// The host never leaks out: anything resolved against it comes back hostless.
const HOSTLESS_BASE: &str = "http://hostless.invalid/";
const HOSTLESS_HOST: &str = "hostless.invalid";

/// A unit of crawl work
///
/// Seeds given as bare paths and links found relative to a hostless page have
/// no `scheme` or `host`; absolute links keep both so the host filter can see
/// them. Deduplication only ever looks at [`CrawlTarget::path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlTarget {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Percent-encoded path, always starting with `/`
    pub path: String,
    pub query: Option<String>,
}

impl CrawlTarget {
    /// Parses an operator-supplied literal into a target
    ///
    /// Absolute `http`/`https` URLs keep their host. Anything else is treated as
    /// a reference relative to `/`, so `about` and `/about` are the same target.
    ///
    /// # Examples
    ///
    /// ```
    /// use site_freezer::url::CrawlTarget;
    ///
    /// let target = CrawlTarget::parse("about/../docs/?v=1#top").unwrap();
    /// assert_eq!(target.path, "/docs/");
    /// assert_eq!(target.query.as_deref(), Some("v=1"));
    /// assert_eq!(target.host, None);
    ///
    /// let target = CrawlTarget::parse("https://example.com").unwrap();
    /// assert_eq!(target.host.as_deref(), Some("example.com"));
    /// assert_eq!(target.path, "/");
    /// ```
    pub fn parse(literal: &str) -> UrlResult<Self> {
        let literal = literal.trim();
        if literal.is_empty() {
            return Err(UrlError::Empty);
        }

        let root = Self::root();
        resolve(literal, &root)?
            .ok_or_else(|| UrlError::Parse(format!("unsupported URL: {}", literal)))
    }

    /// The hostless `/` target used when no seeds are given
    pub fn root() -> Self {
        Self {
            scheme: None,
            host: None,
            port: None,
            path: "/".to_string(),
            query: None,
        }
    }

    /// Converts the target to an absolute URL, substituting a placeholder host
    /// when the target has none
    pub(crate) fn to_base_url(&self) -> UrlResult<Url> {
        let mut url = match (&self.scheme, &self.host) {
            (Some(scheme), Some(host)) => {
                let authority = match self.port {
                    Some(port) => format!("{}://{}:{}/", scheme, host, port),
                    None => format!("{}://{}/", scheme, host),
                };
                Url::parse(&authority).map_err(|e| UrlError::Parse(e.to_string()))?
            }
            _ => Url::parse(HOSTLESS_BASE).map_err(|e| UrlError::Parse(e.to_string()))?,
        };

        url.set_path(&self.path);
        url.set_query(self.query.as_deref());
        Ok(url)
    }

    fn from_url(url: &Url) -> Self {
        let hostless = url.host_str() == Some(HOSTLESS_HOST);

        Self {
            scheme: (!hostless).then(|| url.scheme().to_string()),
            host: if hostless {
                None
            } else {
                url.host_str().map(str::to_string)
            },
            port: if hostless { None } else { url.port() },
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
        }
    }
}

impl fmt::Display for CrawlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            let scheme = self.scheme.as_deref().unwrap_or("http");
            write!(f, "{}://{}", scheme, host)?;
            if let Some(port) = self.port {
                write!(f, ":{}", port)?;
            }
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{}", query)?;
        }
        Ok(())
    }
}

/// Resolves a link found on `origin` into a crawl target
///
/// Relative links inherit the origin's host (or lack of one). Fragments are
/// dropped. Links with a non-HTTP scheme, or that cannot be parsed at all,
/// resolve to `None`.
///
/// # Examples
///
/// ```
/// use site_freezer::url::{resolve_link, CrawlTarget};
///
/// let origin = CrawlTarget::parse("/docs/intro").unwrap();
/// let next = resolve_link("../api/", &origin).unwrap();
/// assert_eq!(next.path, "/api/");
/// assert_eq!(next.host, None);
///
/// assert!(resolve_link("mailto:someone@example.com", &origin).is_none());
/// ```
pub fn resolve_link(link: &str, origin: &CrawlTarget) -> Option<CrawlTarget> {
    match resolve(link.trim(), origin) {
        Ok(target) => target,
        Err(e) => {
            tracing::debug!("Failed to resolve link {:?} from {}: {}", link, origin, e);
            None
        }
    }
}

fn resolve(link: &str, origin: &CrawlTarget) -> UrlResult<Option<CrawlTarget>> {
    let base = origin.to_base_url()?;
    let mut url = base
        .join(link)
        .map_err(|e| UrlError::Parse(format!("{}: {}", link, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Ok(None);
    }
    if url.host_str().is_none() {
        return Ok(None);
    }

    url.set_fragment(None);
    Ok(Some(CrawlTarget::from_url(&url)))
}

//! HTTP transport with timeouts and per-session cookie handling

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, SET_COOKIE, USER_AGENT,
};
use reqwest::{Client, Method, Url};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Status code and full body of a device response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Anything below 400 counts as success, redirects included
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// Request/response exchange with a SOMweb device.
///
/// Implementations read the whole body before returning and never retry. A
/// non-success status is a normal [`Reply`]; only failures to get a reply at all
/// are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request to `path`, relative to the device base url
    async fn request(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Reply>;

    /// Release the underlying connection pool. Idempotent.
    async fn close(&self);

    fn is_closed(&self) -> bool;

    async fn get(&self, path: &str) -> Result<Reply> {
        self.request(Method::GET, path, None).await
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<Reply> {
        self.request(Method::POST, path, Some(form)).await
    }
}

#[derive(Clone)]
enum Pool {
    /// Built by us, dropped on close
    Owned(Client),
    /// Supplied by the caller, who keeps its own handle
    Borrowed(Client),
}

impl Pool {
    fn client(&self) -> &Client {
        match self {
            Pool::Owned(client) | Pool::Borrowed(client) => client,
        }
    }

    /// Owned clients carry the jar themselves, including on redirect hops
    fn manual_cookies(&self) -> bool {
        matches!(self, Pool::Borrowed(_))
    }
}

/// [`Transport`] over a `reqwest` client
pub struct HttpClient {
    base_url: String,
    pool: Mutex<Option<Pool>>,
    // Cookie provider of an owned client. A borrowed client may have no cookie
    // store, so the jar is applied by hand around each of its requests.
    cookies: Arc<Jar>,
    timeout: Duration,
}

impl HttpClient {
    /// Create a transport with its own connection pool
    pub fn new(base_url: &str, timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("somweb-rs/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let cookies = Arc::new(Jar::default());
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .default_headers(headers)
            .cookie_provider(cookies.clone())
            .build()
            .map_err(Error::Build)?;

        Self::build(base_url, Pool::Owned(client), cookies, timeout)
    }

    /// Create a transport on top of a caller supplied client. Closing the
    /// transport leaves that client usable.
    pub fn with_client(base_url: &str, client: Client, timeout: Duration) -> Result<Self> {
        Self::build(base_url, Pool::Borrowed(client), Arc::new(Jar::default()), timeout)
    }

    fn build(base_url: &str, pool: Pool, cookies: Arc<Jar>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|_| Error::InvalidUrl {
            url: base_url.clone(),
        })?;

        Ok(Self {
            base_url,
            pool: Mutex::new(Some(pool)),
            cookies,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn pool(&self) -> MutexGuard<'_, Option<Pool>> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cheap handle to the pool; the lock is not held across requests
    fn handle(&self) -> Result<Pool> {
        self.pool().clone().ok_or(Error::Closed)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Reply> {
        let pool = self.handle()?;
        let manual_cookies = pool.manual_cookies();
        let raw = format!("{}{}", self.base_url, path);
        let url = Url::parse(&raw).map_err(|_| Error::InvalidUrl { url: raw.clone() })?;

        let mut request = pool
            .client()
            .request(method.clone(), url.clone())
            .timeout(self.timeout);
        if manual_cookies {
            if let Some(cookie) = self.cookies.cookies(&url) {
                request = request.header(COOKIE, cookie);
            }
        }
        if let Some(form) = form {
            request = request.form(form);
        }

        let map_err = |source: reqwest::Error| {
            if source.is_timeout() {
                Error::Timeout {
                    path: path.to_string(),
                    timeout: self.timeout,
                }
            } else {
                Error::Request {
                    path: path.to_string(),
                    source,
                }
            }
        };

        let response = request.send().await.map_err(map_err)?;

        if manual_cookies {
            let mut set_cookies = response.headers().get_all(SET_COOKIE).iter();
            self.cookies.set_cookies(&mut set_cookies, response.url());
        }

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_err)?;
        tracing::debug!("{} {} -> {}", method, path, status);

        Ok(Reply { status, body })
    }

    async fn close(&self) {
        match self.pool().take() {
            Some(Pool::Owned(_)) => tracing::debug!("Closed http client for {}", self.base_url),
            Some(Pool::Borrowed(_)) => {
                tracing::debug!("Released borrowed http client for {}", self.base_url)
            }
            None => {}
        }
    }

    fn is_closed(&self) -> bool {
        self.pool().is_none()
    }
}

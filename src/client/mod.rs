//! SOMweb client
//!
//! [`SomwebClient`] is bound to one device. It owns the credentials, the transport
//! and the current session (web token plus the page it was scraped from). The
//! operations are split by concern:
//!
//! - `auth`: login, liveness and properties derived from the logged in page
//! - `door`: door status, open/close/toggle and waiting for a door position
//! - `device`: update check and device info

mod auth;
mod device;
mod door;

use crate::error::{Error, Result};
use crate::http::{HttpClient, Transport, CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
use crate::models::{Credentials, DeviceAddress};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

pub(crate) const SOMWEB_ALIVE_URI: &str = "/blank.html";
pub(crate) const SOMWEB_AUTH_URI: &str = "/index.php";
pub(crate) const SOMWEB_DEVICE_INFO_URI: &str = "/index.php?op=config&opc=deviceinfo&lang=en";
pub(crate) const SOMWEB_DOOR_STATUS_URI: &str = "/isg/statusDoor.php";
pub(crate) const SOMWEB_TOGGLE_DOOR_STATUS_URI: &str = "/isg/opendoor.php";
pub(crate) const SOMWEB_CHECK_FOR_UPDATE_URI: &str = "/isg/CheckForUpdates.php";

pub const CHECK_DOOR_STATE_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_DOOR_STATE_CHANGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Tunables for a [`SomwebClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Only used when the client builds its own connection pool
    pub connect_timeout: Duration,
    /// Delay between status probes in [`SomwebClient::wait_for_state`]
    pub poll_interval: Duration,
    /// Default wait used by [`SomwebClient::wait_for_state_default`]
    pub state_change_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            poll_interval: CHECK_DOOR_STATE_INTERVAL,
            state_change_timeout: DEFAULT_DOOR_STATE_CHANGE_TIMEOUT,
        }
    }
}

/// Token and the page it was found in. Replaced as a whole on every login.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) token: String,
    pub(crate) page_content: String,
}

/// Client for SOMMER garage doors, gates and barriers connected to a SOMweb device.
///
/// # Concurrency
///
/// Door operations take `&self` and may run concurrently for different doors.
/// Each operation reads the session once when it starts, so a concurrent
/// [`authenticate`](Self::authenticate) is only seen by operations started after it.
pub struct SomwebClient<T: Transport = HttpClient> {
    credentials: Credentials,
    transport: T,
    session: RwLock<Option<Arc<SessionState>>>,
    options: ClientOptions,
}

impl<T: Transport> std::fmt::Debug for SomwebClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SomwebClient")
            .field("credentials", &self.credentials)
            .field("authenticated", &self.snapshot().is_some())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl SomwebClient<HttpClient> {
    /// Connect to a device by url or UDI with default options
    pub fn new(address: DeviceAddress, credentials: Credentials) -> Result<Self> {
        Self::with_options(address, credentials, ClientOptions::default())
    }

    /// Connect to a device through the cloud service using the UDI printed on it
    pub fn from_udi(udi: impl Into<String>, credentials: Credentials) -> Result<Self> {
        Self::new(DeviceAddress::Udi(udi.into()), credentials)
    }

    pub fn with_options(
        address: DeviceAddress,
        credentials: Credentials,
        options: ClientOptions,
    ) -> Result<Self> {
        let transport = HttpClient::new(
            &address.base_url()?,
            options.request_timeout,
            options.connect_timeout,
        )?;
        Ok(Self::with_transport(transport, credentials, options))
    }

    /// Use a connection pool owned by the caller. [`close`](Self::close) will not
    /// shut it down.
    pub fn with_http_client(
        address: DeviceAddress,
        credentials: Credentials,
        client: reqwest::Client,
        options: ClientOptions,
    ) -> Result<Self> {
        let transport =
            HttpClient::with_client(&address.base_url()?, client, options.request_timeout)?;
        Ok(Self::with_transport(transport, credentials, options))
    }
}

impl<T: Transport> SomwebClient<T> {
    pub fn with_transport(transport: T, credentials: Credentials, options: ClientOptions) -> Self {
        Self {
            credentials,
            transport,
            session: RwLock::new(None),
            options,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Release the transport. Later calls fail fast without touching the network.
    pub async fn close(&self) {
        if !self.transport.is_closed() {
            tracing::info!("Closing http client");
            self.transport.close().await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Current session, read once
    pub(crate) fn snapshot(&self) -> Option<Arc<SessionState>> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn replace_session(&self, state: Option<SessionState>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = state.map(Arc::new);
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.transport.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport for driving the client without a device

    use crate::error::{Error, Result};
    use crate::http::{Reply, Transport};
    use async_trait::async_trait;
    use reqwest::Method;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    type Responder = Box<dyn Fn(&str) -> Result<Reply> + Send + Sync>;

    pub struct FakeTransport {
        responder: Responder,
        calls: Mutex<Vec<String>>,
        closed: AtomicBool,
        delay: Duration,
    }

    impl FakeTransport {
        pub fn new(responder: impl Fn(&str) -> Result<Reply> + Send + Sync + 'static) -> Self {
            Self {
                responder: Box::new(responder),
                calls: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
                delay: Duration::ZERO,
            }
        }

        /// Every reply arrives only after `delay`
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Requested paths, in order
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn request(
            &self,
            _method: Method,
            path: &str,
            _form: Option<&[(&str, &str)]>,
        ) -> Result<Reply> {
            if self.is_closed() {
                return Err(Error::Closed);
            }
            self.calls.lock().unwrap().push(path.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.responder)(path)
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }
}

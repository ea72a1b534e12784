//! Door status, door actions and waiting for a door to settle
//!
//! The device only knows how to *toggle* a door. Opening and closing are built on
//! top of it: read the current position first and only toggle when the door is
//! not already where it should be.

use super::{SomwebClient, SOMWEB_DOOR_STATUS_URI, SOMWEB_TOGGLE_DOOR_STATUS_URI};
use crate::error::{Error, Result};
use crate::http::Transport;
use crate::models::{DoorAction, DoorStatus};
use std::time::Duration;

impl<T: Transport> SomwebClient<T> {
    /// Current position of a door.
    ///
    /// A door that is moving is reported in its old position until it has fully
    /// reached the new one. Never fails: unreadable answers and transport errors
    /// give [`DoorStatus::Unknown`].
    pub async fn door_status(&self, door_id: u32) -> DoorStatus {
        // status=1 asks "is the door closed": the device answers OK or FAIL.
        // bit=0 keeps those textual answers.
        let path = format!("{SOMWEB_DOOR_STATUS_URI}?numdoor={door_id}&status=1&bit=0");

        match self.transport().get(&path).await {
            Ok(reply) if reply.is_success() => DoorStatus::from_probe(&reply.body),
            Ok(reply) => {
                tracing::error!(
                    "Failed getting status of door {}. Status: {}",
                    door_id,
                    reply.status
                );
                DoorStatus::Unknown
            }
            Err(e) => {
                tracing::error!("Failed getting status of door {}: {}", door_id, e);
                DoorStatus::Unknown
            }
        }
    }

    /// Move a door to the position `action` asks for.
    ///
    /// Does nothing and returns `true` when the door is already there. Otherwise
    /// returns whether the device accepted the toggle; the door may still be moving
    /// when this returns, see [`wait_for_state`](Self::wait_for_state).
    ///
    /// `token` overrides the session token and is normally `None`.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`] or [`Error::NotAuthenticated`], both before any request.
    pub async fn perform_action(
        &self,
        door_id: u32,
        action: DoorAction,
        token: Option<&str>,
    ) -> Result<bool> {
        self.ensure_open()?;
        let token = self.resolve_token(token)?;

        let target = action.target();
        // An unreadable status is Unknown, which never equals a target, so the
        // door gets toggled
        let current = self.door_status(door_id).await;
        if current == target {
            tracing::debug!("Door {} already {}", door_id, target);
            return Ok(true);
        }

        tracing::info!("Door {} is {}, toggling to {}", door_id, current, target);
        Ok(self.send_toggle(door_id, &token).await)
    }

    /// Open a door. No-op if it is already open.
    pub async fn open_door(&self, door_id: u32, token: Option<&str>) -> Result<bool> {
        self.perform_action(door_id, DoorAction::Open, token).await
    }

    /// Close a door. No-op if it is already closed.
    pub async fn close_door(&self, door_id: u32, token: Option<&str>) -> Result<bool> {
        self.perform_action(door_id, DoorAction::Close, token).await
    }

    /// Flip a door's position regardless of where it is now.
    ///
    /// Returns `true` only when the device acknowledges with `OK`.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`] or [`Error::NotAuthenticated`], both before any request.
    pub async fn toggle(&self, door_id: u32, token: Option<&str>) -> Result<bool> {
        self.ensure_open()?;
        let token = self.resolve_token(token)?;
        Ok(self.send_toggle(door_id, &token).await)
    }

    /// Poll a door until it reports `state` or `timeout` runs out.
    ///
    /// Returns `false` on timeout. The deadline is enforced from the outside, so a
    /// status request still in flight at that moment is dropped and its answer
    /// ignored.
    pub async fn wait_for_state(&self, door_id: u32, state: DoorStatus, timeout: Duration) -> bool {
        if self.is_closed() {
            return false;
        }

        let poll_interval = self.options().poll_interval;
        let poll = async {
            while self.door_status(door_id).await != state {
                tokio::time::sleep(poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    "Timeout waiting for door {} to be {} after {:?}",
                    door_id,
                    state,
                    timeout
                );
                false
            }
        }
    }

    /// [`wait_for_state`](Self::wait_for_state) with the configured default timeout
    pub async fn wait_for_state_default(&self, door_id: u32, state: DoorStatus) -> bool {
        self.wait_for_state(door_id, state, self.options().state_change_timeout)
            .await
    }

    fn resolve_token(&self, token: Option<&str>) -> Result<String> {
        match token {
            Some(token) => {
                tracing::debug!("Using provided token");
                Ok(token.to_string())
            }
            None => {
                tracing::debug!("Using internal token");
                self.snapshot()
                    .map(|s| s.token.clone())
                    .ok_or(Error::NotAuthenticated)
            }
        }
    }

    async fn send_toggle(&self, door_id: u32, token: &str) -> bool {
        let path = format!(
            "{SOMWEB_TOGGLE_DOOR_STATUS_URI}?numdoor={door_id}&status=0&webtoken={}",
            urlencoding::encode(token)
        );

        match self.transport().get(&path).await {
            Ok(reply) => {
                let accepted = reply.is_success() && reply.body == "OK";
                if !accepted {
                    tracing::warn!(
                        "Toggle of door {} rejected. Status: {}, body: '{}'",
                        door_id,
                        reply.status,
                        reply.body.chars().take(50).collect::<String>()
                    );
                }
                accepted
            }
            Err(e) => {
                tracing::error!("Toggle of door {} failed: {}", door_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::FakeTransport;
    use super::super::{ClientOptions, SessionState};
    use super::*;
    use crate::http::Reply;
    use crate::models::Credentials;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const STATUS: &str = "/isg/statusDoor.php?numdoor=2&status=1&bit=0";
    const TOGGLE: &str = "/isg/opendoor.php?numdoor=2&status=0&webtoken=token1";

    fn client_with(transport: FakeTransport) -> SomwebClient<FakeTransport> {
        let client = SomwebClient::with_transport(
            transport,
            Credentials::new("user", "password"),
            ClientOptions::default(),
        );
        client.replace_session(Some(SessionState {
            token: "token1".into(),
            page_content: String::new(),
        }));
        client
    }

    /// Device answering status probes with `status` and toggles with `toggle`
    fn fixed(status: &'static str, toggle: &'static str) -> FakeTransport {
        FakeTransport::new(move |path| {
            if path.starts_with("/isg/statusDoor.php") {
                Ok(Reply::new(200, status))
            } else {
                Ok(Reply::new(200, toggle))
            }
        })
    }

    /// Device whose door really moves when toggled
    fn door(initial: DoorStatus) -> FakeTransport {
        let state = Arc::new(Mutex::new(initial));
        FakeTransport::new(move |path| {
            let mut state = state.lock().unwrap();
            if path.starts_with("/isg/statusDoor.php") {
                let body = match *state {
                    DoorStatus::Closed => "OK",
                    DoorStatus::Open => "FAIL",
                    DoorStatus::Unknown => "?",
                };
                Ok(Reply::new(200, body))
            } else {
                *state = match *state {
                    DoorStatus::Closed => DoorStatus::Open,
                    _ => DoorStatus::Closed,
                };
                Ok(Reply::new(200, "OK"))
            }
        })
    }

    #[tokio::test]
    async fn test_door_status_mapping() {
        assert_eq!(client_with(fixed("OK", "")).door_status(2).await, DoorStatus::Closed);
        assert_eq!(client_with(fixed("FAIL", "")).door_status(2).await, DoorStatus::Open);
        assert_eq!(client_with(fixed("NOPE", "")).door_status(2).await, DoorStatus::Unknown);

        let client = client_with(fixed("OK", ""));
        client.door_status(2).await;
        assert_eq!(client.transport().calls(), vec![STATUS.to_string()]);
    }

    #[tokio::test]
    async fn test_door_status_http_error_is_unknown() {
        let client = client_with(FakeTransport::new(|_| Ok(Reply::new(500, "OK"))));
        assert_eq!(client.door_status(2).await, DoorStatus::Unknown);
    }

    #[tokio::test]
    async fn test_close_open_door() {
        let client = client_with(fixed("FAIL", "OK"));
        assert!(client.perform_action(2, DoorAction::Close, None).await.unwrap());
        assert_eq!(
            client.transport().calls(),
            vec![STATUS.to_string(), TOGGLE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_close_already_closed_door() {
        let client = client_with(fixed("OK", "OK"));
        assert!(client.close_door(2, None).await.unwrap());
        assert_eq!(client.transport().count("/isg/opendoor.php"), 0);
    }

    #[tokio::test]
    async fn test_open_already_open_door() {
        let client = client_with(fixed("FAIL", "OK"));
        assert!(client.open_door(2, None).await.unwrap());
        assert_eq!(client.transport().count("/isg/opendoor.php"), 0);
    }

    #[tokio::test]
    async fn test_open_twice_toggles_once() {
        let client = client_with(door(DoorStatus::Closed));
        assert!(client.open_door(2, None).await.unwrap());
        assert!(client.open_door(2, None).await.unwrap());

        assert_eq!(client.transport().count("/isg/opendoor.php"), 1);
        assert_eq!(client.door_status(2).await, DoorStatus::Open);
    }

    #[tokio::test]
    async fn test_toggle_rejected() {
        let client = client_with(fixed("OK", "FAIL"));
        assert!(!client.toggle(2, None).await.unwrap());

        let client = client_with(FakeTransport::new(|_| Ok(Reply::new(404, "OK"))));
        assert!(!client.toggle(2, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_unreadable_status_toggles() {
        let client = client_with(fixed("garbage", "OK"));
        assert!(client.open_door(2, None).await.unwrap());
        assert_eq!(client.transport().count("/isg/opendoor.php"), 1);
    }

    #[tokio::test]
    async fn test_provided_token_overrides_session() {
        let client = client_with(fixed("OK", "OK"));
        assert!(client.toggle(2, Some("other")).await.unwrap());
        assert_eq!(
            client.transport().calls(),
            vec!["/isg/opendoor.php?numdoor=2&status=0&webtoken=other".to_string()]
        );
    }

    #[tokio::test]
    async fn test_action_requires_token() {
        let client = SomwebClient::with_transport(
            fixed("OK", "OK"),
            Credentials::new("user", "password"),
            ClientOptions::default(),
        );

        let err = client.open_door(2, None).await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
        let err = client.toggle(2, None).await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
        assert!(client.transport().calls().is_empty());

        // a supplied token is enough
        assert!(client.toggle(2, Some("token1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_client_rejects_actions() {
        let client = client_with(fixed("OK", "OK"));
        client.close().await;

        assert!(matches!(client.toggle(2, None).await, Err(Error::Closed)));
        assert!(matches!(
            client.perform_action(2, DoorAction::Open, None).await,
            Err(Error::Closed)
        ));
        assert!(!client.wait_for_state(2, DoorStatus::Closed, Duration::from_secs(5)).await);
        assert!(client.transport().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_state_reached() {
        let probes = Arc::new(AtomicUsize::new(0));
        let counter = probes.clone();
        let client = client_with(FakeTransport::new(move |_| {
            // closed on the third probe
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::new(200, if n >= 2 { "OK" } else { "FAIL" }))
        }));

        let start = tokio::time::Instant::now();
        assert!(client.wait_for_state(2, DoorStatus::Closed, Duration::from_secs(60)).await);
        assert_eq!(probes.load(Ordering::SeqCst), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_state_times_out() {
        let client = client_with(fixed("OK", "OK"));

        let start = tokio::time::Instant::now();
        assert!(!client.wait_for_state(2, DoorStatus::Open, Duration::from_secs(5)).await);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(5) + client.options().poll_interval);

        // probes at 0s, 2s and 4s; nothing after the deadline
        assert_eq!(client.transport().count("/isg/statusDoor.php"), 3);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.transport().count("/isg/statusDoor.php"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_state_abandons_slow_probe() {
        let client = client_with(fixed("FAIL", "OK").with_delay(Duration::from_secs(20)));

        let start = tokio::time::Instant::now();
        assert!(!client.wait_for_state(2, DoorStatus::Closed, Duration::from_secs(3)).await);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
        assert_eq!(client.transport().count("/isg/statusDoor.php"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_state_default_timeout() {
        let client = client_with(fixed("OK", "OK"));

        let start = tokio::time::Instant::now();
        assert!(!client.wait_for_state_default(2, DoorStatus::Open).await);
        assert!(start.elapsed() >= Duration::from_secs(60));
    }
}

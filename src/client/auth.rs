//! Login and session-derived properties

use super::{SessionState, SomwebClient, SOMWEB_ALIVE_URI, SOMWEB_AUTH_URI};
use crate::error::Result;
use crate::http::Transport;
use crate::models::{AuthResult, Door};
use crate::parser::{self, Field};

impl<T: Transport> SomwebClient<T> {
    /// Check that the device is reachable and answering.
    ///
    /// Needs no login. Never fails; any problem reads as "not alive".
    pub async fn is_alive(&self) -> bool {
        match self.transport().get(SOMWEB_ALIVE_URI).await {
            Ok(reply) => reply.is_success() && reply.body == "1",
            Err(e) => {
                tracing::error!("SOMweb not reachable: {}", e);
                false
            }
        }
    }

    /// Log in, or log in again once the token has expired.
    ///
    /// On success the token and the returned page become the current session. A
    /// page without a token (typically wrong credentials) gives `success = false`
    /// with the page attached, and drops any previous session.
    ///
    /// # Errors
    ///
    /// Only [`Error::Closed`](crate::Error::Closed); device and network failures are
    /// reported through [`AuthResult::success`].
    pub async fn authenticate(&self) -> Result<AuthResult> {
        self.ensure_open()?;

        let credentials = self.credentials();
        let form = [
            ("login", credentials.username.as_str()),
            ("pass", credentials.password()),
            ("send-login", "Sign in"),
        ];

        let reply = match self.transport().post_form(SOMWEB_AUTH_URI, &form).await {
            Ok(reply) if reply.is_success() => reply,
            Ok(reply) => {
                tracing::error!("Authentication failed. Status: {}", reply.status);
                return Ok(AuthResult::failed());
            }
            Err(e) => {
                tracing::error!("Authentication failed: {}", e);
                return Ok(AuthResult::failed());
            }
        };

        let Some(token) = parser::extract(&reply.body, Field::WebToken).map(str::to_string) else {
            tracing::warn!("Authentication failed. No web token in response");
            self.replace_session(None);
            return Ok(AuthResult {
                success: false,
                token: None,
                page_content: Some(reply.body),
            });
        };

        tracing::debug!("Authenticated as {}", credentials.username);
        self.replace_session(Some(SessionState {
            token: token.clone(),
            page_content: reply.body.clone(),
        }));

        Ok(AuthResult {
            success: true,
            token: Some(token),
            page_content: Some(reply.body),
        })
    }

    /// Whether a token from a successful login is held
    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Doors listed on the page from the last successful login. Empty before login.
    pub fn doors(&self) -> Vec<Door> {
        self.snapshot()
            .map(|s| parser::doors(&s.page_content))
            .unwrap_or_default()
    }

    /// Doors listed on any page, e.g. [`AuthResult::page_content`].
    ///
    /// Same as [`parser::doors`]; kept on the client next to [`doors`](Self::doors).
    pub fn doors_from_page(&self, page_content: &str) -> Vec<Door> {
        parser::doors(page_content)
    }

    /// Device UDI from the logged in page, `None` before login
    pub fn udi(&self) -> Option<String> {
        let session = self.snapshot()?;
        parser::extract(&session.page_content, Field::Udi).map(str::to_string)
    }

    /// Whether the logged in user is an administrator, `None` before login
    pub fn is_admin(&self) -> Option<bool> {
        self.snapshot().map(|s| parser::is_admin(&s.page_content))
    }
}

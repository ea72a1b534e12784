//! # somweb
//!
//! Client for garage doors, gates and barriers from SOMMER connected to a SOMweb
//! device, over the device's web interface.
//!
//! The device has no real API. The client logs in with a form post, scrapes the
//! session token and the list of doors out of the returned page, and then drives
//! the doors with the token. Because the only door command the device offers is a
//! toggle, [`SomwebClient::open_door`] and [`SomwebClient::close_door`] check the
//! current position first and leave a door alone when it is already there.
//!
//! ```no_run
//! use somweb::{Credentials, DeviceAddress, DoorStatus, SomwebClient};
//! use std::time::Duration;
//!
//! # async fn example() -> somweb::Result<()> {
//! let client = SomwebClient::new(
//!     DeviceAddress::Udi("1234abcd".into()),
//!     Credentials::new("user", "password"),
//! )?;
//!
//! let auth = client.authenticate().await?;
//! if auth.success {
//!     for door in client.doors() {
//!         println!("[{}] {}", door.id, door.name);
//!     }
//!     if client.open_door(1, None).await? {
//!         client.wait_for_state(1, DoorStatus::Open, Duration::from_secs(60)).await;
//!     }
//! }
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! Calls that only read from the device (`is_alive`, `door_status`,
//! `update_available`, `device_info`, `wait_for_state`) never fail: problems are
//! logged through `tracing` and reported as `false`, [`DoorStatus::Unknown`] or
//! `None`. The [`Result`]s returned elsewhere only carry misuse such as a closed
//! client or a door command without a token.

pub mod client;
pub mod error;
pub mod http;
pub mod models;
pub mod parser;

pub use client::{ClientOptions, SomwebClient};
pub use error::{Error, Result};
pub use http::{HttpClient, Reply, Transport};
pub use models::{
    AuthResult, Credentials, DeviceAddress, DeviceInfo, Door, DoorAction, DoorStatus,
    UpdateStatus,
};

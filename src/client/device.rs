//! Firmware update check and device information

use super::{SomwebClient, SOMWEB_CHECK_FOR_UPDATE_URI, SOMWEB_DEVICE_INFO_URI};
use crate::http::Transport;
use crate::models::{DeviceInfo, UpdateStatus};
use crate::parser;

impl<T: Transport> SomwebClient<T> {
    /// What the device says about firmware updates.
    ///
    /// Anything but a 200 response, including transport errors, is
    /// [`UpdateStatus::Unknown`].
    pub async fn update_status(&self) -> UpdateStatus {
        match self.transport().get(SOMWEB_CHECK_FOR_UPDATE_URI).await {
            Ok(reply) if reply.status == 200 => UpdateStatus::from_probe(&reply.body),
            Ok(reply) => {
                tracing::error!("Checking for update failed. Status: {}", reply.status);
                UpdateStatus::Unknown
            }
            Err(e) => {
                tracing::error!("Checking for update failed: {}", e);
                UpdateStatus::Unknown
            }
        }
    }

    /// `true` only when the device reports a new firmware version
    pub async fn update_available(&self) -> bool {
        self.update_status().await == UpdateStatus::Available
    }

    /// Device details from the configuration pages.
    ///
    /// Requires a logged in administrator; otherwise returns `None` without
    /// sending a request. Also `None` when the page cannot be fetched. Fields
    /// that cannot be found on the page are left empty.
    pub async fn device_info(&self) -> Option<DeviceInfo> {
        if self.is_admin() != Some(true) {
            tracing::warn!("Admin rights required to get device info");
            return None;
        }

        match self.transport().get(SOMWEB_DEVICE_INFO_URI).await {
            Ok(reply) if reply.status == 200 => Some(parser::device_info(&reply.body)),
            Ok(reply) => {
                tracing::warn!("Getting device info failed. Status: {}", reply.status);
                None
            }
            Err(e) => {
                tracing::warn!("Getting device info failed: {}", e);
                None
            }
        }
    }
}

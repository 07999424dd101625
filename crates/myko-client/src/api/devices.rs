//! Devices API.

use crate::client::MykoClient;
use crate::error::{Error, Result};
use crate::types::{Device, DeviceState, DeviceStates, SetStateRequest};

const STATE_EXPANSION: (&str, &str) = ("expansions", "state");

/// Percent-encode one path segment so `/` and `?` stay literal.
///
/// Bare `.` and `..` are rejected: URL resolution removes them even when
/// percent-encoded.
fn segment(value: &str) -> Result<String> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(Error::Config(format!("invalid path segment: {:?}", value)));
    }
    let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
    // Form encoding writes spaces as `+`, which a path would keep literally.
    Ok(encoded.replace('+', "%20"))
}

/// Devices API client.
pub struct DevicesApi {
    client: MykoClient,
}

impl DevicesApi {
    pub(crate) fn new(client: MykoClient) -> Self {
        Self { client }
    }

    async fn metadevices_path(&self) -> Result<String> {
        let account = self.client.account().id().await?;
        Ok(format!("accounts/{}/metadevices", segment(&account)?))
    }

    /// List all devices on the account, with current state.
    pub async fn list(&self) -> Result<Vec<Device>> {
        let path = self.metadevices_path().await?;
        self.client.get(&path, &[STATE_EXPANSION]).await
    }

    /// List devices of one class (e.g. `fan`).
    pub async fn list_class(&self, device_class: &str) -> Result<Vec<Device>> {
        let devices = self.list().await?;
        Ok(devices
            .into_iter()
            .filter(|d| d.device_class == device_class)
            .collect())
    }

    /// Get a device by metadevice ID.
    pub async fn get(&self, id: &str) -> Result<Device> {
        let path = format!("{}/{}", self.metadevices_path().await?, segment(id)?);
        self.client.get(&path, &[STATE_EXPANSION]).await
    }

    /// Get the current states of a device.
    pub async fn states(&self, id: &str) -> Result<Vec<DeviceState>> {
        let path = format!("{}/{}/state", self.metadevices_path().await?, segment(id)?);
        let states: DeviceStates = self.client.get(&path, &[]).await?;
        Ok(states.values)
    }

    /// Apply new states to a device.
    pub async fn set_state(&self, id: &str, values: Vec<DeviceState>) -> Result<()> {
        let path = format!("{}/{}/state", self.metadevices_path().await?, segment(id)?);
        let request = SetStateRequest {
            metadevice_id: id.to_string(),
            values,
        };
        self.client.put(&path, &request).await?;
        Ok(())
    }
}

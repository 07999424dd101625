//! Request and response types for the Myko API.
//!
//! These types mirror the device cloud's JSON contract. Devices arrive as
//! nested "metadevice" documents and are flattened into [`Device`].

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Deserialize a field that may be missing or `null` as its default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ─────────────────────────────────────────────────────────────────────────────
// Account
// ─────────────────────────────────────────────────────────────────────────────

/// Response from `users/me`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// Accounts the user can access.
    #[serde(default)]
    pub account_access: Vec<AccountAccess>,
}

/// One account grant within [`UserInfo`].
#[derive(Debug, Clone, Deserialize)]
pub struct AccountAccess {
    /// The account itself.
    pub account: Account,
}

/// Account identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account identifier used in device URLs.
    pub account_id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Devices
// ─────────────────────────────────────────────────────────────────────────────

/// State of a single device function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    /// Function class (e.g. `power`).
    #[serde(default, deserialize_with = "null_as_default")]
    pub function_class: String,
    /// Current value.
    #[serde(default)]
    pub value: Value,
    /// Last update time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<i64>,
    /// Function instance (e.g. `light-power`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_instance: Option<String>,
}

impl DeviceState {
    /// Create a state update for a function class.
    pub fn new(function_class: impl Into<String>, value: Value) -> Self {
        Self {
            function_class: function_class.into(),
            value,
            last_update_time: None,
            function_instance: None,
        }
    }

    /// Set the function instance.
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.function_instance = Some(instance.into());
        self
    }
}

/// A device as reported by the cloud, flattened.
///
/// Deserializes from either the nested metadevice shape or the flat shape
/// this type serializes to. Missing or `null` wire fields become empty.
/// Two devices are equal when their `id` and `friendly_name` match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "DeviceRepr")]
pub struct Device {
    /// Metadevice ID.
    pub id: String,
    /// Physical device ID.
    pub device_id: String,
    /// Model name, after fix-ups.
    pub model: String,
    /// Device class (e.g. `fan`, `light`).
    pub device_class: String,
    /// Default name from the catalog.
    pub default_name: String,
    /// Catalog image identifier.
    pub default_image: String,
    /// User-assigned name.
    pub friendly_name: String,
    /// Function descriptors, passed through unparsed.
    pub functions: Vec<Value>,
    /// Current states.
    pub states: Vec<DeviceState>,
    /// Child metadevice IDs.
    pub children: Vec<String>,
    /// Manufacturer, when reported.
    pub manufacturer_name: Option<String>,
}

impl Device {
    /// Build a device from one element of the metadevice listing.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// First state matching a function class and optional instance.
    pub fn state(&self, function_class: &str, instance: Option<&str>) -> Option<&DeviceState> {
        self.states.iter().find(|s| {
            s.function_class == function_class
                && (instance.is_none() || s.function_instance.as_deref() == instance)
        })
    }

    // The catalog leaves several models blank or "TBD"; the icon identifies them.
    fn apply_model_fixups(&mut self) {
        let image = self.default_image.as_str();
        if self.model.is_empty() && image == "ceiling-fan-snyder-park-icon" {
            self.model = "DriskolFan".to_string();
        }
        if self.model.is_empty() && image == "ceiling-fan-vinings-icon" {
            self.model = "VinwoodFan".to_string();
        }
        if self.device_class == "fan" && self.model == "TBD" && image == "ceiling-fan-chandra-icon"
        {
            self.model = "ZandraFan".to_string();
        }
        if self.model == "TBD" && image == "ceiling-fan-ac-cct-dardanus-icon" {
            self.model = "NevaliFan".to_string();
        }
        if self.device_class == "fan" && self.model.is_empty() && image == "ceiling-fan-slender-icon"
        {
            self.model = "TagerFan".to_string();
        }
        if self.model == "Smart Stake Timer" {
            self.model = "YardStake".to_string();
        }
        if image == "a19-e26-color-cct-60w-smd-frosted-icon" {
            self.model = "12A19060WRGBWH2".to_string();
        }
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.friendly_name == other.friendly_name
    }
}

impl Eq for Device {}

impl Hash for Device {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.friendly_name.hash(state);
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DeviceRepr {
    Flat(FlatDevice),
    Wire(RawDevice),
}

impl From<DeviceRepr> for Device {
    fn from(repr: DeviceRepr) -> Self {
        match repr {
            DeviceRepr::Flat(flat) => Device {
                id: flat.id,
                device_id: flat.device_id,
                model: flat.model,
                device_class: flat.device_class,
                default_name: flat.default_name,
                default_image: flat.default_image,
                friendly_name: flat.friendly_name,
                functions: flat.functions,
                states: flat.states,
                children: flat.children,
                manufacturer_name: flat.manufacturer_name,
            },
            DeviceRepr::Wire(raw) => raw.into(),
        }
    }
}

/// The shape [`Device`] serializes to.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FlatDevice {
    id: String,
    device_id: String,
    model: String,
    device_class: String,
    default_name: String,
    default_image: String,
    friendly_name: String,
    functions: Vec<Value>,
    states: Vec<DeviceState>,
    children: Vec<String>,
    #[serde(default)]
    manufacturer_name: Option<String>,
}

/// Wire shape of a metadevice.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDevice {
    #[serde(default, deserialize_with = "null_as_default")]
    id: String,
    #[serde(default)]
    device_id: Option<String>,
    #[serde(default)]
    friendly_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    description: RawDescription,
    #[serde(default, deserialize_with = "null_as_default")]
    state: RawStateBlock,
    #[serde(default, deserialize_with = "null_as_default")]
    children: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescription {
    #[serde(default, deserialize_with = "null_as_default")]
    device: RawCatalogEntry,
    #[serde(default)]
    default_image: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    functions: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCatalogEntry {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    device_class: Option<String>,
    #[serde(default)]
    default_name: Option<String>,
    #[serde(default)]
    manufacturer_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStateBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    values: Vec<DeviceState>,
}

impl From<RawDevice> for Device {
    fn from(raw: RawDevice) -> Self {
        let catalog = raw.description.device;
        let mut device = Device {
            id: raw.id,
            device_id: raw.device_id.unwrap_or_default(),
            model: catalog.model.unwrap_or_default(),
            device_class: catalog.device_class.unwrap_or_default(),
            default_name: catalog.default_name.unwrap_or_default(),
            default_image: raw.description.default_image.unwrap_or_default(),
            friendly_name: raw.friendly_name.unwrap_or_default(),
            functions: raw.description.functions,
            states: raw.state.values,
            children: raw.children,
            manufacturer_name: catalog.manufacturer_name,
        };
        device.apply_model_fixups();
        device
    }
}

/// Body of a state update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStateRequest {
    /// Target metadevice.
    pub metadevice_id: String,
    /// States to apply.
    pub values: Vec<DeviceState>,
}

/// Response from the per-device state endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStates {
    /// Metadevice the states belong to.
    #[serde(default)]
    pub metadevice_id: Option<String>,
    /// Current states.
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Vec<DeviceState>,
}

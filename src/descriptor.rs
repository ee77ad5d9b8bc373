//! Device descriptor snapshot
//!
//! A `DeviceDescriptor` is captured once, when a handle is built, and never
//! changes afterwards. It carries everything the backend reported about the
//! device at enumeration time.

use serde::{Deserialize, Serialize};

/// Immutable snapshot of a HID device's descriptor metadata
///
/// Every field is required; only the text fields may be absent, when the
/// device does not report them. Deserializing follows the same rule: text
/// fields may be `null`, but a missing key is an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Opaque platform path (e.g. `/dev/hidraw3` or a Windows device path)
    pub path: Vec<u8>,
    pub vendor_id: u16,
    pub product_id: u16,
    #[serde(deserialize_with = "Option::deserialize")]
    pub serial_number: Option<String>,
    /// BCD device release number
    pub release_number: u16,
    #[serde(deserialize_with = "Option::deserialize")]
    pub manufacturer_string: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub product_string: Option<String>,
    pub usage_page: u16,
    pub usage: u16,
    /// USB interface number, -1 when the platform does not report one
    pub interface_number: i32,
}

impl DeviceDescriptor {
    /// Check if this descriptor matches an optional VID/PID filter
    pub fn matches(&self, vendor_id: Option<u16>, product_id: Option<u16>) -> bool {
        vendor_id.map_or(true, |vid| vid == self.vendor_id)
            && product_id.map_or(true, |pid| pid == self.product_id)
    }
}

#[cfg(feature = "hidapi")]
impl From<&hidapi::DeviceInfo> for DeviceDescriptor {
    fn from(info: &hidapi::DeviceInfo) -> Self {
        Self {
            path: info.path().to_bytes().to_vec(),
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            serial_number: info.serial_number().map(|s| s.to_string()),
            release_number: info.release_number(),
            manufacturer_string: info.manufacturer_string().map(|s| s.to_string()),
            product_string: info.product_string().map(|s| s.to_string()),
            usage_page: info.usage_page(),
            usage: info.usage(),
            interface_number: info.interface_number(),
        }
    }
}

//! Normalized HID device handles
//!
//! Platform HID libraries agree on the broad shape of HID I/O but differ in
//! the details: which ways of opening a device exist, whether reads can be
//! made non-blocking, and how report IDs are counted. This crate wraps such a
//! library behind [`HidBackend`] and exposes one consistent handle:
//!
//! - [`HidDeviceHandle`] opens with the best available strategy
//!   (path, then VID/PID, then VID/PID/serial)
//! - reads are timed or non-blocking; only an explicit negative timeout
//!   blocks until a report arrives
//! - written and feature-report buffers always carry their report ID in
//!   byte 0, and returned counts include it
//! - identity (`bus`, `address`, `port`, IDs) looks the same as for any
//!   other device kind via [`DeviceIdentity`]
//!
//! The `hidapi` feature (on by default) binds the traits to the `hidapi`
//! crate. The `mock` feature adds `mock::MockBackend`, a recording
//! in-memory backend for tests.

pub mod backend;
pub mod descriptor;
pub mod error;
pub mod handle;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "hidapi")]
mod hidapi_backend;

pub use backend::{BackendDevice, Capabilities, HidBackend};
pub use descriptor::DeviceDescriptor;
pub use error::{HidError, Result};
pub use handle::{DeviceIdentity, HandleOptions, HidDeviceHandle, OpenStrategy, BUS_HID};

/// Handle bound to the system hidapi library
#[cfg(feature = "hidapi")]
pub type HidapiHandle<'a> = HidDeviceHandle<&'a hidapi::HidApi>;

/// List HID devices through a system hidapi instance, optionally filtered
/// by vendor and product ID
#[cfg(feature = "hidapi")]
pub fn find_hidapi_devices(
    api: &hidapi::HidApi,
    vendor_id: Option<u16>,
    product_id: Option<u16>,
) -> Result<Vec<HidapiHandle<'_>>> {
    HidDeviceHandle::enumerate(api, vendor_id, product_id)
}

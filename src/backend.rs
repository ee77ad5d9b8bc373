//! Backend abstraction
//!
//! A platform HID library is split into two roles:
//!
//! ```text
//! [HidBackend]     ← device factory: enumerate + open strategies
//!       |
//! [BackendDevice]  ← one live device: raw read/write/feature reports
//!       |
//! [HidDeviceHandle] ← normalizes the above
//! ```
//!
//! Backends differ in which entry points exist, so the optional ones are
//! advertised through [`Capabilities`] and default to
//! [`HidError::Unsupported`].

use std::rc::Rc;
use std::sync::Arc;

use bitflags::bitflags;

use crate::descriptor::DeviceDescriptor;
use crate::error::{HidError, Result};

bitflags! {
    /// Optional entry points a backend provides
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// `open_path` with an opaque platform path
        const OPEN_PATH = 1 << 0;
        /// `open` by vendor/product ID
        const OPEN_VID_PID = 1 << 1;
        /// `open_serial` by vendor/product ID and serial number
        const OPEN_SERIAL = 1 << 2;
        /// `set_nonblocking` on opened devices
        const SET_NONBLOCKING = 1 << 3;
    }
}

/// Device factory side of a HID library
pub trait HidBackend {
    /// Live device type produced by the open calls
    type Device: BackendDevice;

    /// Entry points this backend supports
    fn capabilities(&self) -> Capabilities;

    /// List the HID devices currently visible to the backend
    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>>;

    fn open_path(&self, _path: &[u8]) -> Result<Self::Device> {
        Err(HidError::Unsupported("open_path"))
    }

    fn open(&self, _vendor_id: u16, _product_id: u16) -> Result<Self::Device> {
        Err(HidError::Unsupported("open"))
    }

    fn open_serial(&self, _vendor_id: u16, _product_id: u16, _serial: &str) -> Result<Self::Device> {
        Err(HidError::Unsupported("open_serial"))
    }
}

/// Raw I/O on an opened device
///
/// Buffers follow the backend's conventions: outgoing buffers already carry
/// the report ID in byte 0, returned counts include it.
pub trait BackendDevice {
    /// Switch between non-blocking and blocking reads
    fn set_nonblocking(&mut self, _nonblocking: bool) -> Result<()> {
        Err(HidError::Unsupported("set_nonblocking"))
    }

    /// Read one input report of at most `max_length` bytes
    ///
    /// `timeout_ms == 0` returns immediately, empty when nothing is queued.
    fn read(&mut self, max_length: usize, timeout_ms: i32) -> Result<Vec<u8>>;

    fn write(&mut self, data: &[u8]) -> Result<usize>;

    fn get_feature_report(&mut self, report_id: u8, max_length: usize) -> Result<Vec<u8>>;

    fn send_feature_report(&mut self, data: &[u8]) -> Result<usize>;

    /// Release the OS resource. Backends that release on drop keep the default.
    fn close(&mut self) {}
}

impl<B: HidBackend + ?Sized> HidBackend for &B {
    type Device = B::Device;

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>> {
        (**self).enumerate()
    }

    fn open_path(&self, path: &[u8]) -> Result<Self::Device> {
        (**self).open_path(path)
    }

    fn open(&self, vendor_id: u16, product_id: u16) -> Result<Self::Device> {
        (**self).open(vendor_id, product_id)
    }

    fn open_serial(&self, vendor_id: u16, product_id: u16, serial: &str) -> Result<Self::Device> {
        (**self).open_serial(vendor_id, product_id, serial)
    }
}

macro_rules! forward_shared_backend {
    ($ptr:ident) => {
        impl<B: HidBackend + ?Sized> HidBackend for $ptr<B> {
            type Device = B::Device;

            fn capabilities(&self) -> Capabilities {
                (**self).capabilities()
            }

            fn enumerate(&self) -> Result<Vec<DeviceDescriptor>> {
                (**self).enumerate()
            }

            fn open_path(&self, path: &[u8]) -> Result<Self::Device> {
                (**self).open_path(path)
            }

            fn open(&self, vendor_id: u16, product_id: u16) -> Result<Self::Device> {
                (**self).open(vendor_id, product_id)
            }

            fn open_serial(
                &self,
                vendor_id: u16,
                product_id: u16,
                serial: &str,
            ) -> Result<Self::Device> {
                (**self).open_serial(vendor_id, product_id, serial)
            }
        }
    };
}

forward_shared_backend!(Rc);
forward_shared_backend!(Arc);

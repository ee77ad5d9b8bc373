//! `hidapi` binding
//!
//! `HidApi` is the device factory and `HidDevice` the live device. hidapi
//! exposes every optional entry point, so all capabilities are advertised.

use std::ffi::CString;

use hidapi::{HidApi, HidDevice};
use tracing::debug;

use crate::backend::{BackendDevice, Capabilities, HidBackend};
use crate::descriptor::DeviceDescriptor;
use crate::error::{HidError, Result};

impl HidBackend for HidApi {
    type Device = HidDevice;

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>> {
        Ok(self.device_list().map(DeviceDescriptor::from).collect())
    }

    fn open_path(&self, path: &[u8]) -> Result<HidDevice> {
        let path = CString::new(path)
            .map_err(|e| HidError::InvalidPath(String::from_utf8_lossy(&e.into_vec()).into()))?;
        debug!("hidapi open_path {:?}", path);
        Ok(HidApi::open_path(self, &path)?)
    }

    fn open(&self, vendor_id: u16, product_id: u16) -> Result<HidDevice> {
        debug!("hidapi open {:04X}:{:04X}", vendor_id, product_id);
        Ok(HidApi::open(self, vendor_id, product_id)?)
    }

    fn open_serial(&self, vendor_id: u16, product_id: u16, serial: &str) -> Result<HidDevice> {
        debug!(
            "hidapi open_serial {:04X}:{:04X} {}",
            vendor_id, product_id, serial
        );
        Ok(HidApi::open_serial(self, vendor_id, product_id, serial)?)
    }
}

impl BackendDevice for HidDevice {
    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        Ok(self.set_blocking_mode(!nonblocking)?)
    }

    fn read(&mut self, max_length: usize, timeout_ms: i32) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_length];
        let len = self.read_timeout(&mut buf, timeout_ms)?;
        buf.truncate(len);
        Ok(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(HidDevice::write(self, data)?)
    }

    fn get_feature_report(&mut self, report_id: u8, max_length: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_length.max(1)];
        buf[0] = report_id;
        let len = HidDevice::get_feature_report(self, &mut buf)?;
        buf.truncate(len);
        Ok(buf)
    }

    fn send_feature_report(&mut self, data: &[u8]) -> Result<usize> {
        // hidapi-rs drops the C library's byte count on success
        HidDevice::send_feature_report(self, data)?;
        Ok(data.len())
    }
}

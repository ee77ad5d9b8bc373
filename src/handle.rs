//! Normalized HID device handle
//!
//! `HidDeviceHandle` wraps a backend and a descriptor snapshot and gives
//! every platform the same I/O contract:
//!
//! - reads are either timed (`Some(ms)`) or non-blocking (`None`)
//! - outgoing buffers carry their report ID in byte 0 (`0x00` for devices
//!   without numbered reports) and returned counts include it
//! - feature reports come back with the report ID in byte 0
//!
//! Handles are synchronous and take `&mut self` for anything touching the
//! device; callers sharing one across threads must lock it themselves.

use std::fmt;

use tracing::{debug, trace};

use crate::backend::{BackendDevice, Capabilities, HidBackend};
use crate::descriptor::DeviceDescriptor;
use crate::error::{HidError, Result};

/// Transport family tag for HID devices
pub const BUS_HID: &str = "hid";

/// Uniform identity shared by every device kind
///
/// `bus` names the transport family, `address` identifies the device on
/// that bus and `port` is only meaningful for transports with port chains.
pub trait DeviceIdentity {
    fn vendor_id(&self) -> u16;
    fn product_id(&self) -> u16;
    fn release_number(&self) -> u16;
    fn serial_number(&self) -> Option<&str>;
    fn bus(&self) -> &'static str;
    fn address(&self) -> &[u8];
    fn port(&self) -> Option<&[u8]>;
}

/// Ways of opening a device, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStrategy {
    /// Opaque platform path
    Path,
    /// Vendor/product ID pair
    VendorProduct,
    /// Vendor/product ID pair plus serial number
    VendorProductSerial,
}

impl OpenStrategy {
    /// Strategies in the order `open` tries them
    pub const PRIORITY: [OpenStrategy; 3] = [
        OpenStrategy::Path,
        OpenStrategy::VendorProduct,
        OpenStrategy::VendorProductSerial,
    ];

    /// Whether the backend and descriptor together allow this strategy
    pub fn is_supported(&self, caps: Capabilities, descriptor: &DeviceDescriptor) -> bool {
        match self {
            OpenStrategy::Path => {
                caps.contains(Capabilities::OPEN_PATH) && !descriptor.path.is_empty()
            }
            OpenStrategy::VendorProduct => caps.contains(Capabilities::OPEN_VID_PID),
            OpenStrategy::VendorProductSerial => {
                caps.contains(Capabilities::OPEN_SERIAL) && descriptor.serial_number.is_some()
            }
        }
    }

    fn open<B: HidBackend>(&self, backend: &B, descriptor: &DeviceDescriptor) -> Result<B::Device> {
        let (vid, pid) = (descriptor.vendor_id, descriptor.product_id);
        match self {
            OpenStrategy::Path => backend.open_path(&descriptor.path),
            OpenStrategy::VendorProduct => backend.open(vid, pid),
            OpenStrategy::VendorProductSerial => {
                let serial = descriptor
                    .serial_number
                    .as_deref()
                    .ok_or(HidError::Unsupported("open_serial without serial number"))?;
                backend.open_serial(vid, pid, serial)
            }
        }
    }
}

/// Tunables for a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleOptions {
    /// Read timeout used to drain reports when non-blocking mode is
    /// unavailable; raised to 1 when not positive
    pub flush_timeout_ms: i32,
    /// Buffer size for each discarded report; raised to 1 when zero
    pub flush_read_length: usize,
}

impl Default for HandleOptions {
    fn default() -> Self {
        Self {
            flush_timeout_ms: 1,
            flush_read_length: 1,
        }
    }
}

impl HandleOptions {
    pub fn flush_timeout_ms(mut self, ms: i32) -> Self {
        self.flush_timeout_ms = ms;
        self
    }

    pub fn flush_read_length(mut self, len: usize) -> Self {
        self.flush_read_length = len;
        self
    }

    /// Timeout actually used for fallback drain reads
    ///
    /// Must stay positive: 0 means non-blocking to the backend and a negative
    /// value blocks forever.
    pub fn effective_flush_timeout_ms(&self) -> i32 {
        self.flush_timeout_ms.max(1)
    }

    /// Buffer size actually used for drain reads; a 0-byte read would look
    /// like an empty queue
    pub fn effective_flush_read_length(&self) -> usize {
        self.flush_read_length.max(1)
    }
}

/// A HID device with normalized I/O semantics
pub struct HidDeviceHandle<B: HidBackend> {
    backend: B,
    descriptor: DeviceDescriptor,
    device: Option<B::Device>,
    options: HandleOptions,
}

impl<B: HidBackend> HidDeviceHandle<B> {
    /// Create a closed handle for `descriptor`
    pub fn new(backend: B, descriptor: DeviceDescriptor) -> Self {
        Self::with_options(backend, descriptor, HandleOptions::default())
    }

    pub fn with_options(backend: B, descriptor: DeviceDescriptor, options: HandleOptions) -> Self {
        Self {
            backend,
            descriptor,
            device: None,
            options,
        }
    }

    /// Build one closed handle per device the backend lists, optionally
    /// filtered by vendor and product ID
    pub fn enumerate(
        backend: B,
        vendor_id: Option<u16>,
        product_id: Option<u16>,
    ) -> Result<Vec<Self>>
    where
        B: Clone,
    {
        let handles: Vec<Self> = backend
            .enumerate()?
            .into_iter()
            .filter(|d| d.matches(vendor_id, product_id))
            .map(|d| Self::new(backend.clone(), d))
            .collect();
        debug!(
            "Enumerated {} HID device(s) matching {:04X?}:{:04X?}",
            handles.len(),
            vendor_id,
            product_id
        );
        Ok(handles)
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn options(&self) -> &HandleOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Open the device with the first strategy the backend supports
    ///
    /// Runtime failures of a strategy are returned as-is. Later strategies
    /// are only tried when earlier ones are not supported at all: either not
    /// advertised in the backend's capabilities, or answered with
    /// [`HidError::Unsupported`].
    pub fn open(&mut self) -> Result<()> {
        if self.device.is_some() {
            return Err(HidError::AlreadyOpen);
        }

        let caps = self.backend.capabilities();
        for strategy in OpenStrategy::PRIORITY {
            if !strategy.is_supported(caps, &self.descriptor) {
                continue;
            }

            debug!("Opening {} via {:?}", self, strategy);
            match strategy.open(&self.backend, &self.descriptor) {
                Ok(device) => {
                    self.device = Some(device);
                    return Ok(());
                }
                Err(e) if e.is_unsupported() => {
                    debug!("{:?} advertised but not implemented: {}", strategy, e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(HidError::NoOpenStrategy {
            vendor_id: self.descriptor.vendor_id,
            product_id: self.descriptor.product_id,
        })
    }

    /// Release the backend device; no-op if already closed
    pub fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.close();
            debug!("Closed {}", self);
        }
    }

    fn device_mut(&mut self) -> Result<&mut B::Device> {
        self.device.as_mut().ok_or(HidError::NotOpen)
    }

    /// Discard input reports already buffered by the backend
    ///
    /// Returns how many reports were dropped. Never blocks for longer than
    /// `flush_timeout_ms` per queued report.
    pub fn clear_enqueued_reports(&mut self) -> Result<usize> {
        let nonblocking_capable = self
            .backend
            .capabilities()
            .contains(Capabilities::SET_NONBLOCKING);
        let fallback_timeout_ms = self.options.effective_flush_timeout_ms();
        let read_length = self.options.effective_flush_read_length();
        let device = self.device_mut()?;

        let timeout_ms = if nonblocking_capable && device.set_nonblocking(true).is_ok() {
            0
        } else {
            debug!(
                "Non-blocking mode unavailable, draining with {}ms reads",
                fallback_timeout_ms
            );
            fallback_timeout_ms
        };

        let mut discarded = 0;
        while !device.read(read_length, timeout_ms)?.is_empty() {
            discarded += 1;
        }
        debug!("Discarded {} previously enqueued reports", discarded);
        Ok(discarded)
    }

    /// Read one input report
    ///
    /// With `Some(timeout_ms)` the timeout goes to the backend unchanged: it
    /// waits up to that long, and a negative value blocks until a report
    /// arrives. With `None` the read is non-blocking and returns empty when
    /// nothing is queued.
    /// The report ID, when the device uses numbered reports, is byte 0 and
    /// counts toward `max_length`.
    pub fn read(&mut self, max_length: usize, timeout_ms: Option<i32>) -> Result<Vec<u8>> {
        let nonblocking_capable = self
            .backend
            .capabilities()
            .contains(Capabilities::SET_NONBLOCKING);
        let device = self.device_mut()?;

        let mut data = match timeout_ms {
            Some(ms) => device.read(max_length, ms)?,
            None => {
                if nonblocking_capable {
                    if let Err(e) = device.set_nonblocking(true) {
                        debug!("Could not switch to non-blocking mode: {}", e);
                    }
                }
                device.read(max_length, 0)?
            }
        };
        data.truncate(max_length);
        trace!("Read {} bytes: {:02X?}", data.len(), data);
        Ok(data)
    }

    /// Write an output report
    ///
    /// `data[0]` must be the report ID (`0x00` for unnumbered reports). The
    /// returned count includes it.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let written = self.device_mut()?.write(data)?;
        trace!("Wrote {} bytes: {:02X?}", written, data);
        Ok(written)
    }

    /// Get a feature report; byte 0 of the result is `report_id`
    pub fn get_feature_report(&mut self, report_id: u8, max_length: usize) -> Result<Vec<u8>> {
        let mut data = self
            .device_mut()?
            .get_feature_report(report_id, max_length)?;
        data.truncate(max_length);
        trace!("Feature report 0x{:02X}: {:02X?}", report_id, data);
        Ok(data)
    }

    /// Send a feature report; same buffer convention as [`write`](Self::write)
    pub fn send_feature_report(&mut self, data: &[u8]) -> Result<usize> {
        let sent = self.device_mut()?.send_feature_report(data)?;
        trace!("Sent feature report of {} bytes: {:02X?}", sent, data);
        Ok(sent)
    }
}

impl<B: HidBackend> DeviceIdentity for HidDeviceHandle<B> {
    fn vendor_id(&self) -> u16 {
        self.descriptor.vendor_id
    }

    fn product_id(&self) -> u16 {
        self.descriptor.product_id
    }

    fn release_number(&self) -> u16 {
        self.descriptor.release_number
    }

    fn serial_number(&self) -> Option<&str> {
        self.descriptor.serial_number.as_deref()
    }

    fn bus(&self) -> &'static str {
        BUS_HID
    }

    fn address(&self) -> &[u8] {
        &self.descriptor.path
    }

    fn port(&self) -> Option<&[u8]> {
        None
    }
}

impl<B: HidBackend> fmt::Display for HidDeviceHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X}:{:04X}",
            self.descriptor.vendor_id, self.descriptor.product_id
        )?;
        if let Some(product) = &self.descriptor.product_string {
            write!(f, " ({})", product)?;
        }
        Ok(())
    }
}

impl<B: HidBackend> fmt::Debug for HidDeviceHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HidDeviceHandle")
            .field("descriptor", &self.descriptor)
            .field("open", &self.is_open())
            .field("options", &self.options)
            .finish()
    }
}

impl<B: HidBackend> Drop for HidDeviceHandle<B> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(path: &[u8], serial: Option<&str>) -> DeviceDescriptor {
        DeviceDescriptor {
            path: path.to_vec(),
            vendor_id: 0x1e71,
            product_id: 0x2007,
            serial_number: serial.map(String::from),
            release_number: 0x0100,
            manufacturer_string: Some("NZXT".into()),
            product_string: None,
            usage_page: 0xff00,
            usage: 0x01,
            interface_number: 0,
        }
    }

    #[test]
    fn test_strategy_priority_order() {
        assert_eq!(
            OpenStrategy::PRIORITY,
            [
                OpenStrategy::Path,
                OpenStrategy::VendorProduct,
                OpenStrategy::VendorProductSerial
            ]
        );
    }

    #[test]
    fn test_path_strategy_needs_path() {
        let caps = Capabilities::OPEN_PATH;
        assert!(OpenStrategy::Path.is_supported(caps, &descriptor(b"/dev/hidraw7", None)));
        assert!(!OpenStrategy::Path.is_supported(caps, &descriptor(b"", None)));
    }

    #[test]
    fn test_serial_strategy_needs_serial() {
        let caps = Capabilities::OPEN_SERIAL;
        let with_serial = descriptor(b"p", Some("0123456789"));
        assert!(OpenStrategy::VendorProductSerial.is_supported(caps, &with_serial));
        assert!(!OpenStrategy::VendorProductSerial.is_supported(caps, &descriptor(b"p", None)));
    }

    #[test]
    fn test_capability_gates_strategy() {
        let desc = descriptor(b"/dev/hidraw7", Some("0123456789"));
        assert!(!OpenStrategy::Path.is_supported(Capabilities::empty(), &desc));
        assert!(!OpenStrategy::VendorProduct.is_supported(Capabilities::OPEN_PATH, &desc));
        assert!(OpenStrategy::VendorProduct.is_supported(Capabilities::all(), &desc));
    }

    #[test]
    fn test_effective_flush_settings_stay_positive() {
        let opts = HandleOptions {
            flush_timeout_ms: -1,
            flush_read_length: 0,
        };
        assert_eq!(opts.effective_flush_timeout_ms(), 1);
        assert_eq!(opts.effective_flush_read_length(), 1);

        let opts = HandleOptions::default().flush_timeout_ms(0);
        assert_eq!(opts.effective_flush_timeout_ms(), 1);

        let opts = HandleOptions::default()
            .flush_timeout_ms(25)
            .flush_read_length(64);
        assert_eq!(opts.effective_flush_timeout_ms(), 25);
        assert_eq!(opts.effective_flush_read_length(), 64);
    }
}

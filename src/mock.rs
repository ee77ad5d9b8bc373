//! In-memory backend for tests
//!
//! `MockBackend` records every call it receives and serves input reports
//! from a queue, so handle behavior can be checked without hardware.
//! Clones share state: keep one clone in the test and give the other to
//! the handle.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{BackendDevice, Capabilities, HidBackend};
use crate::descriptor::DeviceDescriptor;
use crate::error::{HidError, Result};

/// One backend call, as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    OpenPath(Vec<u8>),
    Open { vendor_id: u16, product_id: u16 },
    OpenSerial { vendor_id: u16, product_id: u16, serial: String },
    SetNonblocking(bool),
    Read { max_length: usize, timeout_ms: i32 },
    Write(Vec<u8>),
    GetFeatureReport { report_id: u8, max_length: usize },
    SendFeatureReport(Vec<u8>),
    Close,
}

struct MockState {
    /// What `capabilities()` reports
    capabilities: Capabilities,
    /// What the entry points actually do; the rest answer `Unsupported`
    implemented: Capabilities,
    devices: Vec<DeviceDescriptor>,
    /// Pending input reports, popped from the back
    queue: Vec<Vec<u8>>,
    nonblocking_ok: bool,
    open_error: Option<HidError>,
    io_error: Option<HidError>,
    calls: Vec<MockCall>,
}

/// Scriptable backend that records its calls
#[derive(Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Backend with every capability and an empty queue
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                capabilities: Capabilities::all(),
                implemented: Capabilities::all(),
                devices: Vec::new(),
                queue: Vec::new(),
                nonblocking_ok: true,
                open_error: None,
                io_error: None,
                calls: Vec::new(),
            })),
        }
    }

    /// Advertise and implement exactly `capabilities`
    pub fn with_capabilities(self, capabilities: Capabilities) -> Self {
        {
            let mut state = self.state.lock();
            state.capabilities = capabilities;
            state.implemented = capabilities;
        }
        self
    }

    /// Advertise `capabilities` without changing which entry points work
    pub fn with_advertised(self, capabilities: Capabilities) -> Self {
        self.state.lock().capabilities = capabilities;
        self
    }

    /// Devices returned by `enumerate`
    pub fn with_devices(self, devices: Vec<DeviceDescriptor>) -> Self {
        self.state.lock().devices = devices;
        self
    }

    /// Make `set_nonblocking` fail even though it is advertised
    pub fn with_nonblocking_failure(self) -> Self {
        self.state.lock().nonblocking_ok = false;
        self
    }

    /// Make every open call fail with `error`
    pub fn with_open_error(self, error: HidError) -> Self {
        self.state.lock().open_error = Some(error);
        self
    }

    /// Make every I/O call on opened devices fail with `error`
    pub fn with_io_error(self, error: HidError) -> Self {
        self.state.lock().io_error = Some(error);
        self
    }

    /// Queue input reports; the last one is read first
    pub fn with_queue(self, reports: Vec<Vec<u8>>) -> Self {
        self.state.lock().queue = reports;
        self
    }

    pub fn push_report(&self, report: Vec<u8>) {
        self.state.lock().queue.push(report);
    }

    pub fn queued_reports(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// All calls received so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn count_calls(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    fn open_with(&self, call: MockCall, required: Capabilities, name: &'static str) -> Result<MockDevice> {
        let mut state = self.state.lock();
        if !state.implemented.contains(required) {
            return Err(HidError::Unsupported(name));
        }
        state.calls.push(call);
        if let Some(err) = state.open_error.clone() {
            return Err(err);
        }
        Ok(MockDevice {
            state: Arc::clone(&self.state),
        })
    }
}

impl HidBackend for MockBackend {
    type Device = MockDevice;

    fn capabilities(&self) -> Capabilities {
        self.state.lock().capabilities
    }

    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>> {
        Ok(self.state.lock().devices.clone())
    }

    fn open_path(&self, path: &[u8]) -> Result<MockDevice> {
        self.open_with(
            MockCall::OpenPath(path.to_vec()),
            Capabilities::OPEN_PATH,
            "open_path",
        )
    }

    fn open(&self, vendor_id: u16, product_id: u16) -> Result<MockDevice> {
        self.open_with(
            MockCall::Open {
                vendor_id,
                product_id,
            },
            Capabilities::OPEN_VID_PID,
            "open",
        )
    }

    fn open_serial(&self, vendor_id: u16, product_id: u16, serial: &str) -> Result<MockDevice> {
        self.open_with(
            MockCall::OpenSerial {
                vendor_id,
                product_id,
                serial: serial.to_string(),
            },
            Capabilities::OPEN_SERIAL,
            "open_serial",
        )
    }
}

/// Device opened from a [`MockBackend`]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    fn record(&self, call: MockCall) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(call);
        match state.io_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl BackendDevice for MockDevice {
    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        let mut state = self.state.lock();
        if !state.implemented.contains(Capabilities::SET_NONBLOCKING) {
            return Err(HidError::Unsupported("set_nonblocking"));
        }
        state.calls.push(MockCall::SetNonblocking(nonblocking));
        if state.nonblocking_ok {
            Ok(())
        } else {
            Err(HidError::Backend("hid_set_nonblocking returned -1".into()))
        }
    }

    fn read(&mut self, max_length: usize, timeout_ms: i32) -> Result<Vec<u8>> {
        self.record(MockCall::Read {
            max_length,
            timeout_ms,
        })?;
        Ok(self.state.lock().queue.pop().unwrap_or_default())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.record(MockCall::Write(data.to_vec()))?;
        Ok(data.len())
    }

    fn get_feature_report(&mut self, report_id: u8, max_length: usize) -> Result<Vec<u8>> {
        self.record(MockCall::GetFeatureReport {
            report_id,
            max_length,
        })?;
        let mut report = vec![0u8; max_length.max(1)];
        report[0] = report_id;
        Ok(report)
    }

    fn send_feature_report(&mut self, data: &[u8]) -> Result<usize> {
        self.record(MockCall::SendFeatureReport(data.to_vec()))?;
        Ok(data.len())
    }

    fn close(&mut self) {
        self.state.lock().calls.push(MockCall::Close);
    }
}

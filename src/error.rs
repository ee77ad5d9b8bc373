//! HID handle error types

use thiserror::Error;

/// Errors that can occur while opening or talking to a HID device
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HidError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("HID permission denied: {0}")]
    PermissionDenied(String),

    /// Failure reported by the backend, message kept verbatim
    #[error("HID error: {0}")]
    Backend(String),

    /// The backend lacks an optional entry point
    #[error("Backend does not support {0}")]
    Unsupported(&'static str),

    #[error("No supported open strategy for device {vendor_id:04X}:{product_id:04X}")]
    NoOpenStrategy { vendor_id: u16, product_id: u16 },

    #[error("Device is not open")]
    NotOpen,

    #[error("Device is already open")]
    AlreadyOpen,

    #[error("Invalid device path: {0}")]
    InvalidPath(String),
}

impl HidError {
    /// True for errors meaning "this backend cannot do that", as opposed to
    /// a runtime failure of something it can do
    pub fn is_unsupported(&self) -> bool {
        matches!(self, HidError::Unsupported(_))
    }
}

#[cfg(feature = "hidapi")]
impl From<hidapi::HidError> for HidError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") || msg.contains("EACCES") {
            HidError::PermissionDenied(msg)
        } else {
            HidError::Backend(msg)
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, HidError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = HidError::NoOpenStrategy {
            vendor_id: 0x1e71,
            product_id: 0x170e,
        };
        assert_eq!(
            err.to_string(),
            "No supported open strategy for device 1E71:170E"
        );
        assert_eq!(HidError::NotOpen.to_string(), "Device is not open");
        assert_eq!(
            HidError::Backend("read error".into()).to_string(),
            "HID error: read error"
        );
    }

    #[test]
    fn test_is_unsupported() {
        assert!(HidError::Unsupported("open_path").is_unsupported());
        assert!(!HidError::Backend("x".into()).is_unsupported());
        assert!(!HidError::NotOpen.is_unsupported());
    }
}

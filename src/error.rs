//! Unified error type for ergolink.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Nothing here is fatal: callers log the error and either ignore the
//! input or fall back to scanning.

/// Top-level error type used across the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // BLE
    /// The SoftDevice returned a BLE-level error.
    Ble(BleError),

    /// A transmission was attempted with no connection to carry it.
    NotConnected,

    // Key model
    /// Key index outside `1..=MAX_KEY_INDEX` (and not the release sentinel).
    InvalidKeyIndex(i8),

    // HID
    /// The outgoing report could not be queued or written.
    ReportSendFailed,
}

/// Subset of BLE errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// Scan was cancelled or could not start.
    ScanFailed,
    /// Connection attempt failed.
    ConnectFailed,
    /// GATT discovery failed.
    DiscoveryFailed,
    /// Characteristic subscribe/notify failed.
    NotifyFailed,
    /// Advertising could not start.
    AdvertiseFailed,
}

// Convenience conversions

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        Error::Ble(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ble_errors_wrap_into_the_crate_error() {
        assert_eq!(Error::from(BleError::NotifyFailed), Error::Ble(BleError::NotifyFailed));
        assert_ne!(Error::from(BleError::ScanFailed), Error::NotConnected);
    }
}

//! Application-wide constants and compile-time configuration.
//!
//! All naming, radio timing, and key-layout parameters live here so they
//! can be tuned in one place.

use crate::link::adv::Uuid128;
use crate::role::Role;

/// Role this build runs as, chosen by Cargo feature.
pub const ROLE: Role = Role::configured();

// Device identity

/// GAP name of the controlling half (the one the host pairs with).
pub const CENTRAL_DEVICE_NAME: &str = "ErgoTravel";

/// GAP name of the half that only publishes its key index.
pub const PERIPHERAL_DEVICE_NAME: &str = "ErgoTravel - Peripheral Side";

/// Device Information Service strings.
pub const MANUFACTURER_NAME: &str = "JPConstantineau.com";
pub const DEVICE_MODEL: &str = "BlueMicro";

/// GAP appearance: HID keyboard.
pub const APPEARANCE_HID_KEYBOARD: u16 = 0x03C1;

/// Radio TX power (dBm). Accepted values: -40, -20, -16, -12, -8, -4, 0, 4.
pub const TX_POWER_DBM: i8 = 0;

// Link service

/// Service carrying the peripheral half's key index. The GATT macros in
/// `ble::central` and `ble::peripheral` need it as a string literal; keep
/// them in sync with this value.
pub const LINK_SERVICE_UUID: Uuid128 = Uuid128::from_u128(0xD2E52F8B_564D_4F11_A4DE_411FF1B6EAC6);

/// Nordic UART service, accepted by the scan filter with `uart-scan-match`.
pub const UART_SERVICE_UUID: Uuid128 = Uuid128::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);

// Scanning (central with link)

/// Adverts weaker than this (dBm) are ignored so only the nearby half links.
pub const SCAN_RSSI_FLOOR: i8 = -80;

/// Scan interval / window in 0.625 ms units (100 ms / 50 ms).
pub const SCAN_INTERVAL: u16 = 160;
pub const SCAN_WINDOW: u16 = 80;

/// Scanning stops after this long without a match (seconds).
pub const SCAN_TIMEOUT_SECS: u16 = 120;

/// Passive scan; the scan response is not needed to match the service UUID.
pub const SCAN_ACTIVE: bool = false;

/// Whether the scan filter also accepts the Nordic UART service UUID.
pub const SCAN_MATCH_UART_SERVICE: bool = cfg!(feature = "uart-scan-match");

// Advertising

/// Advertising interval in 0.625 ms units (fast 20 ms, slow 152.5 ms).
pub const ADV_INTERVAL_FAST: u32 = 32;
pub const ADV_INTERVAL_SLOW: u32 = 244;

/// Seconds spent in fast advertising mode before dropping to slow mode.
pub const ADV_FAST_TIMEOUT_SECS: u64 = 30;

// Connection parameters

/// BLE connection interval range (in 1.25 ms units).
/// 6 = 7.5 ms (lowest latency for HID).
pub const BLE_CONN_INTERVAL_MIN: u16 = 6;
pub const BLE_CONN_INTERVAL_MAX: u16 = 12;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

// Key model

/// Simultaneously tracked key entries across both halves.
pub const KEY_INDEX_NUM: usize = 20;

/// Highest physical key index in the keymap.
pub const MAX_KEY_INDEX: i8 = 56;

/// Longest notify payload accepted from the link characteristic.
pub const NOTIFY_MAX_LEN: usize = 20;

/// Depth of the single event queue drained by the main loop.
pub const EVENT_QUEUE_DEPTH: usize = 16;

/// Depth of the queue between the HID reporter and the host link.
pub const HID_REPORT_QUEUE_DEPTH: usize = 8;

/// Depth of the queue carrying link requests to the radio task.
pub const RADIO_REQUEST_QUEUE_DEPTH: usize = 8;

/// Bonded hosts remembered until power-off.
pub const MAX_BONDED_HOSTS: usize = 4;
/// Room for one host's stored GATT system attributes (CCCD values).
pub const SYS_ATTRS_CAPACITY: usize = 64;

// Matrix

pub const MATRIX_ROWS: usize = 4;
pub const MATRIX_COLS: usize = 7;

/// Matrix poll period (ms). Much faster and the radio cannot keep up.
pub const MATRIX_SCAN_DELAY_MS: u64 = 25;

/// Consecutive polls a key must read pressed / released before it counts.
pub const KEY_PRESS_DEBOUNCE: u8 = 5;
pub const KEY_RELEASE_DEBOUNCE: u8 = 3;

/// Key indices of the controlling half, row-major, column 0 first.
pub const CENTRAL_MATRIX: [[i8; MATRIX_COLS]; MATRIX_ROWS] = [
    [1, 2, 3, 4, 5, 6, 7],
    [15, 16, 17, 18, 19, 20, 21],
    [29, 30, 31, 32, 33, 34, 35],
    [43, 44, 45, 46, 47, 48, 49],
];

/// Key indices of the peripheral half. The board is mirrored, so column 0
/// is the outermost key.
pub const PERIPHERAL_MATRIX: [[i8; MATRIX_COLS]; MATRIX_ROWS] = [
    [14, 13, 12, 11, 10, 9, 8],
    [28, 27, 26, 25, 24, 23, 22],
    [42, 41, 40, 39, 38, 37, 36],
    [56, 55, 54, 53, 52, 51, 50],
];

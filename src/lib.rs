//! Library side of ergolink.
//!
//! Holds everything that does not need hardware: the key model, the
//! aggregator, HID report generation, the link state machine, the
//! peripheral's key-index channel, advertisement parsing and matrix
//! debouncing. It builds for the target (`no_std`) and for the host, where
//! all of it is unit tested.
//!
//! Usage: `cargo test`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and drives the types here from Embassy tasks.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod aggregator;
pub mod config;
pub mod error;
pub mod hid;
pub mod key;
pub mod link;
pub mod matrix;
pub mod role;
pub mod split;

pub use aggregator::{KeyAggregator, KeyIndexSet};
pub use error::{BleError, Error};
pub use hid::{HidReporter, KeyboardReport, ReportOutcome, ReportSink};
pub use key::{KeyEvent, KeyIndex, KeySource, NO_KEY};
pub use link::{
    KeyIndexAttribute, KeyIndexChannel, LinkEvent, LinkManager, LinkState, Radio, RadioRequest,
};
pub use role::Role;
pub use split::{Event, SplitCentral, SplitPeripheral};

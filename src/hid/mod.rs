//! HID side of the controlling half: keymap, report type, and the
//! deduplicating reporter.

pub mod keyboard;
pub mod keymap;
pub mod reporter;

#[cfg(test)]
mod tests;

pub use keyboard::KeyboardReport;
pub use reporter::{HidReporter, ReportOutcome, ReportSink};

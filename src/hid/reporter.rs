//! Turns the aggregated key state into deduplicated HID reports.
//!
//! Outbound traffic is one report per actual state change plus exactly one
//! release report per release.

use crate::aggregator::KeyAggregator;
use crate::error::Error;

use super::keyboard::KeyboardReport;
use super::keymap;

/// Where finished reports go (HID-over-GATT on target, a recorder in tests).
pub trait ReportSink {
    fn send_report(&mut self, report: &KeyboardReport) -> Result<(), Error>;
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn send_report(&mut self, report: &KeyboardReport) -> Result<(), Error> {
        (**self).send_report(report)
    }
}

/// What one report cycle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportOutcome {
    /// A new report went out.
    Sent,
    /// Same as the last transmitted report.
    Unchanged,
    /// All keys released and the release was already sent.
    ReleaseAlreadySent,
    /// The sink refused the report; the cache is untouched.
    Failed,
}

pub struct HidReporter<S> {
    sink: S,
    last: KeyboardReport,
    release_sent: bool,
}

impl<S: ReportSink> HidReporter<S> {
    /// Starts out as if a release had already been sent, so an idle
    /// keyboard never emits one on boot.
    pub const fn new(sink: S) -> Self {
        Self {
            sink,
            last: KeyboardReport::empty(),
            release_sent: true,
        }
    }

    /// Build the candidate report from `keys` and transmit it if needed.
    pub fn report(&mut self, keys: &KeyAggregator) -> ReportOutcome {
        let candidate = keymap::build_report(keys.active());
        self.submit(candidate)
    }

    /// Dedup and transmit an already-built candidate.
    pub fn submit(&mut self, candidate: KeyboardReport) -> ReportOutcome {
        if candidate.is_empty() {
            if self.release_sent {
                return ReportOutcome::ReleaseAlreadySent;
            }
        } else if candidate == self.last {
            return ReportOutcome::Unchanged;
        }

        if let Err(e) = self.sink.send_report(&candidate) {
            warn!("HID report not sent: {:?}", e);
            return ReportOutcome::Failed;
        }

        if candidate.is_empty() {
            debug!("Sent key release");
        } else {
            debug!(
                "Sent report M:{} K:{:?}",
                candidate.modifier, candidate.keycodes
            );
        }
        self.release_sent = candidate.is_empty();
        self.last = candidate;
        ReportOutcome::Sent
    }

    /// Last report that actually went out.
    pub fn last_report(&self) -> &KeyboardReport {
        &self.last
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

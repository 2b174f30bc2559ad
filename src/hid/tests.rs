//! Unit tests for report building, the keymap, and report deduplication.
//!
//! These tests run on the host (not embedded) and verify the pure
//! logic of the HID layer.

use std::vec::Vec;

use super::keyboard::{KeyboardReport, KEYBOARD_REPORT_SIZE};
use super::keymap::{self, usage};
use super::reporter::{HidReporter, ReportOutcome, ReportSink};
use crate::aggregator::KeyAggregator;
use crate::error::Error;
use crate::key::{KeyIndex, KeySource, NO_KEY};

#[derive(Default)]
struct RecordingSink {
    sent: Vec<KeyboardReport>,
    fail: bool,
}

impl ReportSink for RecordingSink {
    fn send_report(&mut self, report: &KeyboardReport) -> Result<(), Error> {
        if self.fail {
            return Err(Error::ReportSendFailed);
        }
        self.sent.push(*report);
        Ok(())
    }
}

fn key(raw: i8) -> KeyIndex {
    KeyIndex::from_raw(raw).unwrap().unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// Keyboard Report Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn keyboard_report_empty() {
    let report = KeyboardReport::empty();
    assert!(report.is_empty());
    assert_eq!(report.modifier, 0);
    assert_eq!(report.keycodes, [0; 6]);
}

#[test]
fn keyboard_report_serialize_layout() {
    let report = KeyboardReport {
        modifier: 0x05,
        reserved: 0x00,
        keycodes: [0x04, 0x05, 0x06, 0x00, 0x00, 0x00],
    };

    let mut buf = [0u8; 8];
    let written = report.serialize(&mut buf);

    assert_eq!(written, KEYBOARD_REPORT_SIZE);
    assert_eq!(buf, [0x05, 0x00, 0x04, 0x05, 0x06, 0x00, 0x00, 0x00]);
}

#[test]
fn keyboard_report_serialize_buffer_too_small() {
    let report = KeyboardReport::empty();
    let mut small_buf = [0u8; 4];
    assert_eq!(report.serialize(&mut small_buf), 0);
}

#[test]
fn keyboard_report_modifier_only_is_not_empty() {
    let mut report = KeyboardReport::empty();
    report.modifier = 0x01;
    assert!(!report.is_empty());
    assert_eq!(report.keycode_count(), 0);
}

#[test]
fn push_keycode_fills_six_slots_then_refuses() {
    let mut report = KeyboardReport::empty();
    for code in 0x04..0x0A {
        assert!(report.push_keycode(code));
    }
    assert!(!report.push_keycode(0x0A));
    assert!(report.push_keycode(0x04)); // duplicate, already present
    assert_eq!(report.keycodes, [0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);
}

// ═══════════════════════════════════════════════════════════════════════════
// Keymap Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn keymap_covers_every_index() {
    assert_eq!(keymap::KEYMAP[0], usage::NONE);
    for i in 1..=crate::config::MAX_KEY_INDEX {
        assert_ne!(keymap::keycode(key(i)), usage::NONE, "index {}", i);
    }
}

#[test]
fn modifier_usages_map_to_bits() {
    assert_eq!(keymap::modifier_bit(usage::LEFT_CTRL), Some(0x01));
    assert_eq!(keymap::modifier_bit(usage::LEFT_SHIFT), Some(0x02));
    assert_eq!(keymap::modifier_bit(usage::RIGHT_GUI), Some(0x80));
    assert_eq!(keymap::modifier_bit(usage::A), None);
}

#[test]
fn build_report_puts_modifiers_in_modifier_byte() {
    // 29 = Left Shift, 16 = A
    let report = keymap::build_report([key(29), key(16)]);
    assert_eq!(report.modifier, 0x02);
    assert_eq!(report.keycodes, [usage::A, 0, 0, 0, 0, 0]);
}

#[test]
fn build_report_caps_at_six_keycodes_in_press_order() {
    let keys = [1, 2, 3, 4, 5, 6, 7].map(key);
    let report = keymap::build_report(keys);
    assert_eq!(report.keycode_count(), 6);
    assert_eq!(
        report.keycodes,
        [usage::TAB, usage::Q, usage::W, usage::E, usage::R, usage::T]
    );
}

#[test]
fn build_report_modifiers_do_not_use_slots() {
    // six letters plus Left Ctrl (43) pressed last
    let keys = [2, 3, 4, 5, 6, 16, 43].map(key);
    let report = keymap::build_report(keys);
    assert_eq!(report.modifier, 0x01);
    assert_eq!(report.keycode_count(), 6);
}

#[test]
fn build_report_encodes_shared_usage_once() {
    // 48 and 51 are both Space
    let report = keymap::build_report([key(48), key(51)]);
    assert_eq!(report.keycodes, [usage::SPACE, 0, 0, 0, 0, 0]);
}

// ═══════════════════════════════════════════════════════════════════════════
// Reporter Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn idle_keyboard_sends_nothing() {
    let mut reporter = HidReporter::new(RecordingSink::default());
    let keys = KeyAggregator::new();
    assert_eq!(reporter.report(&keys), ReportOutcome::ReleaseAlreadySent);
    assert!(reporter.sink().sent.is_empty());
}

#[test]
fn identical_state_is_sent_once() {
    let mut reporter = HidReporter::new(RecordingSink::default());
    let mut keys = KeyAggregator::new();
    keys.press(16, KeySource::Local).unwrap();

    assert_eq!(reporter.report(&keys), ReportOutcome::Sent);
    assert_eq!(reporter.report(&keys), ReportOutcome::Unchanged);
    assert_eq!(reporter.sink().sent.len(), 1);
}

#[test]
fn two_idle_cycles_yield_one_release() {
    let mut reporter = HidReporter::new(RecordingSink::default());
    let mut keys = KeyAggregator::new();
    keys.update(5, KeySource::Remote).unwrap();
    reporter.report(&keys);

    keys.update(NO_KEY, KeySource::Remote).unwrap();
    assert_eq!(reporter.report(&keys), ReportOutcome::Sent);
    assert_eq!(reporter.report(&keys), ReportOutcome::ReleaseAlreadySent);

    let sent = &reporter.sink().sent;
    assert_eq!(sent.len(), 2);
    assert!(sent[1].is_empty());
}

#[test]
fn each_state_change_sends_one_report() {
    let mut reporter = HidReporter::new(RecordingSink::default());
    let mut keys = KeyAggregator::new();

    keys.press(2, KeySource::Local).unwrap();
    reporter.report(&keys);
    keys.press(3, KeySource::Local).unwrap();
    reporter.report(&keys);
    keys.release(2, KeySource::Local).unwrap();
    reporter.report(&keys);
    keys.release(3, KeySource::Local).unwrap();
    reporter.report(&keys);
    reporter.report(&keys);

    let sent = &reporter.sink().sent;
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[0].keycodes[..2], [usage::Q, 0]);
    assert_eq!(sent[1].keycodes[..2], [usage::Q, usage::W]);
    assert_eq!(sent[2].keycodes[..2], [usage::W, 0]);
    assert!(sent[3].is_empty());
}

#[test]
fn failed_send_keeps_cache_so_next_cycle_retries() {
    let mut reporter = HidReporter::new(RecordingSink {
        fail: true,
        ..Default::default()
    });
    let mut keys = KeyAggregator::new();
    keys.press(2, KeySource::Local).unwrap();

    assert_eq!(reporter.report(&keys), ReportOutcome::Failed);
    assert!(reporter.last_report().is_empty());

    reporter.sink_mut().fail = false;
    assert_eq!(reporter.report(&keys), ReportOutcome::Sent);
    assert_eq!(reporter.sink().sent.len(), 1);
}

#[test]
fn failed_release_is_retried() {
    let mut reporter = HidReporter::new(RecordingSink::default());
    let mut keys = KeyAggregator::new();
    keys.press(2, KeySource::Local).unwrap();
    reporter.report(&keys);

    keys.release(2, KeySource::Local).unwrap();
    reporter.sink_mut().fail = true;
    assert_eq!(reporter.report(&keys), ReportOutcome::Failed);

    reporter.sink_mut().fail = false;
    assert_eq!(reporter.report(&keys), ReportOutcome::Sent);
    assert_eq!(reporter.report(&keys), ReportOutcome::ReleaseAlreadySent);
}

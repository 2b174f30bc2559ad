//! Fixed key index → HID usage table for the 56-key ErgoTravel layout.
//!
//! Indices run left to right across both halves, row by row:
//! ```text
//!  1.. 7 |  8..14     Tab  Q W E R T -   | =  Y U I O P Bksp
//! 15..21 | 22..28     Esc  A S D F G [   | ]  H J K L ; '
//! 29..35 | 36..42     Shft Z X C V B `   | \  N M , . / Enter
//! 43..49 | 50..56     Ctl Gui Alt ← ↓ Spc PgUp | PgDn Spc ↑ → Alt Gui Ctl
//! ```

use crate::key::KeyIndex;

use super::keyboard::KeyboardReport;

/// HID keyboard usage codes (usage page 0x07) used by the layout.
pub mod usage {
    pub const NONE: u8 = 0x00;
    pub const A: u8 = 0x04;
    pub const B: u8 = 0x05;
    pub const C: u8 = 0x06;
    pub const D: u8 = 0x07;
    pub const E: u8 = 0x08;
    pub const F: u8 = 0x09;
    pub const G: u8 = 0x0A;
    pub const H: u8 = 0x0B;
    pub const I: u8 = 0x0C;
    pub const J: u8 = 0x0D;
    pub const K: u8 = 0x0E;
    pub const L: u8 = 0x0F;
    pub const M: u8 = 0x10;
    pub const N: u8 = 0x11;
    pub const O: u8 = 0x12;
    pub const P: u8 = 0x13;
    pub const Q: u8 = 0x14;
    pub const R: u8 = 0x15;
    pub const S: u8 = 0x16;
    pub const T: u8 = 0x17;
    pub const U: u8 = 0x18;
    pub const V: u8 = 0x19;
    pub const W: u8 = 0x1A;
    pub const X: u8 = 0x1B;
    pub const Y: u8 = 0x1C;
    pub const Z: u8 = 0x1D;
    pub const ENTER: u8 = 0x28;
    pub const ESCAPE: u8 = 0x29;
    pub const BACKSPACE: u8 = 0x2A;
    pub const TAB: u8 = 0x2B;
    pub const SPACE: u8 = 0x2C;
    pub const MINUS: u8 = 0x2D;
    pub const EQUAL: u8 = 0x2E;
    pub const LEFT_BRACKET: u8 = 0x2F;
    pub const RIGHT_BRACKET: u8 = 0x30;
    pub const BACKSLASH: u8 = 0x31;
    pub const SEMICOLON: u8 = 0x33;
    pub const QUOTE: u8 = 0x34;
    pub const GRAVE: u8 = 0x35;
    pub const COMMA: u8 = 0x36;
    pub const DOT: u8 = 0x37;
    pub const SLASH: u8 = 0x38;
    pub const PAGE_UP: u8 = 0x4B;
    pub const PAGE_DOWN: u8 = 0x4E;
    pub const RIGHT: u8 = 0x4F;
    pub const LEFT: u8 = 0x50;
    pub const DOWN: u8 = 0x51;
    pub const UP: u8 = 0x52;
    pub const LEFT_CTRL: u8 = 0xE0;
    pub const LEFT_SHIFT: u8 = 0xE1;
    pub const LEFT_ALT: u8 = 0xE2;
    pub const LEFT_GUI: u8 = 0xE3;
    pub const RIGHT_CTRL: u8 = 0xE4;
    pub const RIGHT_SHIFT: u8 = 0xE5;
    pub const RIGHT_ALT: u8 = 0xE6;
    pub const RIGHT_GUI: u8 = 0xE7;
}

use usage::*;

/// Usage for each key index; slot 0 is the release sentinel.
#[rustfmt::skip]
pub const KEYMAP: [u8; 57] = [
    NONE,
    // Row 0
    TAB, Q, W, E, R, T, MINUS,
    EQUAL, Y, U, I, O, P, BACKSPACE,
    // Row 1
    ESCAPE, A, S, D, F, G, LEFT_BRACKET,
    RIGHT_BRACKET, H, J, K, L, SEMICOLON, QUOTE,
    // Row 2
    LEFT_SHIFT, Z, X, C, V, B, GRAVE,
    BACKSLASH, N, M, COMMA, DOT, SLASH, ENTER,
    // Row 3
    LEFT_CTRL, LEFT_GUI, LEFT_ALT, LEFT, DOWN, SPACE, PAGE_UP,
    PAGE_DOWN, SPACE, UP, RIGHT, RIGHT_ALT, RIGHT_GUI, RIGHT_CTRL,
];

/// Usage bound to a key index.
pub fn keycode(key: KeyIndex) -> u8 {
    KEYMAP.get(key.get() as usize).copied().unwrap_or(NONE)
}

/// Modifier bit for usages 0xE0..=0xE7.
pub const fn modifier_bit(usage: u8) -> Option<u8> {
    if usage >= LEFT_CTRL && usage <= RIGHT_GUI {
        Some(1 << (usage - LEFT_CTRL))
    } else {
        None
    }
}

/// Encode pressed keys (oldest first) into a boot report.
///
/// Modifiers go to the modifier byte. Once the 6 keycode slots are full,
/// later keys are left out; that is the boot protocol's ceiling, not an
/// error.
pub fn build_report(keys: impl IntoIterator<Item = KeyIndex>) -> KeyboardReport {
    let mut report = KeyboardReport::empty();
    let mut dropped = 0usize;
    for key in keys {
        let code = keycode(key);
        if let Some(bit) = modifier_bit(code) {
            report.modifier |= bit;
        } else if !report.push_keycode(code) {
            dropped += 1;
        }
    }
    if dropped > 0 {
        debug!("{} key(s) beyond the 6-key ceiling left out", dropped);
    }
    report
}

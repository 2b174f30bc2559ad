//! Per-key debounce for one half's matrix.
//!
//! A key changes state only after the raw reading has disagreed with the
//! debounced state for `KEY_PRESS_DEBOUNCE` (press) or
//! `KEY_RELEASE_DEBOUNCE` (release) consecutive scans. Each change becomes
//! an [`Event::Key`] carrying the key's index.

use crate::config::{KEY_PRESS_DEBOUNCE, KEY_RELEASE_DEBOUNCE, MATRIX_COLS, MATRIX_ROWS};
use crate::split::Event;

pub type KeyGrid = [[bool; MATRIX_COLS]; MATRIX_ROWS];

pub struct Debouncer {
    layout: &'static [[i8; MATRIX_COLS]; MATRIX_ROWS],
    state: KeyGrid,
    counters: [[u8; MATRIX_COLS]; MATRIX_ROWS],
}

impl Debouncer {
    /// `layout` gives the key index at each row/column.
    pub const fn new(layout: &'static [[i8; MATRIX_COLS]; MATRIX_ROWS]) -> Self {
        Self {
            layout,
            state: [[false; MATRIX_COLS]; MATRIX_ROWS],
            counters: [[0; MATRIX_COLS]; MATRIX_ROWS],
        }
    }

    /// Feed one raw scan (`true` = pressed) and emit every debounced change.
    pub fn update(&mut self, raw: &KeyGrid, mut emit: impl FnMut(Event)) {
        for row in 0..MATRIX_ROWS {
            for col in 0..MATRIX_COLS {
                let pressed = raw[row][col];
                if pressed == self.state[row][col] {
                    self.counters[row][col] = 0;
                    continue;
                }
                self.counters[row][col] += 1;
                let needed = if pressed {
                    KEY_PRESS_DEBOUNCE
                } else {
                    KEY_RELEASE_DEBOUNCE
                };
                if self.counters[row][col] >= needed {
                    self.state[row][col] = pressed;
                    self.counters[row][col] = 0;
                    emit(Event::Key {
                        index: self.layout[row][col],
                        pressed,
                    });
                }
            }
        }
    }

    /// Debounced state, `true` = pressed.
    pub fn state(&self) -> &KeyGrid {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;
    use crate::config::CENTRAL_MATRIX;

    fn scan(deb: &mut Debouncer, raw: &KeyGrid, times: u8) -> Vec<Event> {
        let mut out = Vec::new();
        for _ in 0..times {
            deb.update(raw, |e| out.push(e));
        }
        out
    }

    fn with(row: usize, col: usize) -> KeyGrid {
        let mut grid = [[false; MATRIX_COLS]; MATRIX_ROWS];
        grid[row][col] = true;
        grid
    }

    const IDLE: KeyGrid = [[false; MATRIX_COLS]; MATRIX_ROWS];

    #[test]
    fn press_needs_consecutive_scans() {
        let mut deb = Debouncer::new(&CENTRAL_MATRIX);
        assert!(scan(&mut deb, &with(1, 1), KEY_PRESS_DEBOUNCE - 1).is_empty());

        let events = scan(&mut deb, &with(1, 1), 1);
        assert_eq!(
            events,
            [Event::Key {
                index: 16,
                pressed: true
            }]
        );
        assert!(deb.state()[1][1]);
    }

    #[test]
    fn release_uses_its_own_threshold() {
        let mut deb = Debouncer::new(&CENTRAL_MATRIX);
        scan(&mut deb, &with(0, 0), KEY_PRESS_DEBOUNCE);

        assert!(scan(&mut deb, &IDLE, KEY_RELEASE_DEBOUNCE - 1).is_empty());
        let events = scan(&mut deb, &IDLE, 1);
        assert_eq!(
            events,
            [Event::Key {
                index: 1,
                pressed: false
            }]
        );
    }

    #[test]
    fn bounce_resets_the_counter() {
        let mut deb = Debouncer::new(&CENTRAL_MATRIX);
        let mut events = scan(&mut deb, &with(2, 3), KEY_PRESS_DEBOUNCE - 1);
        events.extend(scan(&mut deb, &IDLE, 1));
        events.extend(scan(&mut deb, &with(2, 3), KEY_PRESS_DEBOUNCE - 1));
        assert!(events.is_empty());
        assert!(!deb.state()[2][3]);
    }

    #[test]
    fn held_key_reports_once() {
        let mut deb = Debouncer::new(&CENTRAL_MATRIX);
        let events = scan(&mut deb, &with(3, 6), KEY_PRESS_DEBOUNCE * 4);
        assert_eq!(events.len(), 1);
    }
}

//! Key matrix GPIO (nice!nano / Pro Micro footprint).
//!
//! Rows are driven low one at a time; columns idle high through their
//! pull-ups and read low when the key at the crossing is down.

use defmt::info;
use embassy_nrf::gpio::{AnyPin, Input, Level, Output, OutputDrive, Pull};
use embassy_time::{Duration, Timer};
use ergolink::config::{self, MATRIX_COLS, MATRIX_ROWS};
use ergolink::matrix::{Debouncer, KeyGrid};
use ergolink::Event;
use heapless::Vec;

use crate::ble::central::EventSender;

pub struct Matrix {
    rows: [Output<'static>; MATRIX_ROWS],
    cols: [Input<'static>; MATRIX_COLS],
}

impl Matrix {
    pub fn new(rows: [AnyPin; MATRIX_ROWS], cols: [AnyPin; MATRIX_COLS]) -> Self {
        Self {
            rows: rows.map(|pin| Output::new(pin, Level::High, OutputDrive::Standard)),
            cols: cols.map(|pin| Input::new(pin, Pull::Up)),
        }
    }

    /// One raw pass over the matrix, `true` = pressed.
    pub async fn scan(&mut self) -> KeyGrid {
        let mut grid = [[false; MATRIX_COLS]; MATRIX_ROWS];
        for (row, out) in self.rows.iter_mut().enumerate() {
            out.set_low();
            // let the column lines settle
            Timer::after(Duration::from_micros(1)).await;
            for (col, input) in self.cols.iter().enumerate() {
                grid[row][col] = input.is_low();
            }
            out.set_high();
        }
        grid
    }
}

/// Scan, debounce and forward key transitions to the event loop.
pub async fn run(mut matrix: Matrix, events: &EventSender) -> ! {
    let mut debouncer = Debouncer::new(config::ROLE.matrix());
    info!("Matrix scan running ({} ms)", config::MATRIX_SCAN_DELAY_MS);

    loop {
        let raw = matrix.scan().await;
        let mut changes: Vec<Event, { MATRIX_ROWS * MATRIX_COLS }> = Vec::new();
        debouncer.update(&raw, |event| {
            let _ = changes.push(event);
        });
        for event in changes {
            events.send(event).await;
        }
        Timer::after(Duration::from_millis(config::MATRIX_SCAN_DELAY_MS)).await;
    }
}

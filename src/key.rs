//! Key events as they travel between the halves.

use core::num::NonZeroI8;

use crate::config::MAX_KEY_INDEX;
use crate::error::Error;

/// Wire value meaning "no key" / "released".
pub const NO_KEY: i8 = 0;

/// Which half a key event came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeySource {
    /// Scanned by this half's own matrix.
    Local,
    /// Notified over the link by the other half.
    Remote,
}

/// A physical key position, `1..=MAX_KEY_INDEX`. Never the sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyIndex(NonZeroI8);

impl KeyIndex {
    /// Validate a raw index. `Ok(None)` is the release sentinel.
    pub fn from_raw(raw: i8) -> Result<Option<Self>, Error> {
        match raw {
            NO_KEY => Ok(None),
            1..=MAX_KEY_INDEX => Ok(NonZeroI8::new(raw).map(KeyIndex)),
            _ => Err(Error::InvalidKeyIndex(raw)),
        }
    }

    /// Value as carried on the wire.
    pub const fn get(self) -> i8 {
        self.0.get()
    }
}

/// One key transition, tagged with the half it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    /// Pressed key, or `NO_KEY` for a release.
    pub index: i8,
    pub source: KeySource,
}

impl KeyEvent {
    pub const fn new(index: i8, source: KeySource) -> Self {
        Self { index, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_the_release_sentinel() {
        assert_eq!(KeyIndex::from_raw(0), Ok(None));
    }

    #[test]
    fn valid_indices_round_trip() {
        let k = KeyIndex::from_raw(5).unwrap().unwrap();
        assert_eq!(k.get(), 5);
        let k = KeyIndex::from_raw(MAX_KEY_INDEX).unwrap().unwrap();
        assert_eq!(k.get(), MAX_KEY_INDEX);
    }

    #[test]
    fn out_of_table_indices_are_rejected() {
        assert_eq!(KeyIndex::from_raw(-1), Err(Error::InvalidKeyIndex(-1)));
        assert_eq!(
            KeyIndex::from_raw(MAX_KEY_INDEX + 1),
            Err(Error::InvalidKeyIndex(MAX_KEY_INDEX + 1))
        );
        // A notify byte of 0xFF arrives as -1.
        assert!(KeyIndex::from_raw(0xFFu8 as i8).is_err());
    }
}

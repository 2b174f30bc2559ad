//! Merges key events from both halves into one "currently pressed" set.
//!
//! Every entry is tagged with the half it came from, so losing the link
//! can drop exactly the remote half's keys and nothing else.
//!
//! Two kinds of entry exist per source:
//! - the *current* entry, driven by [`KeyAggregator::update`]: the link
//!   only ever carries one index at a time, so a new index replaces the
//!   old one and the sentinel removes it;
//! - *held* entries, driven by [`KeyAggregator::press`] /
//!   [`KeyAggregator::release`], for a matrix that reports every key.
//!
//! A key can be both at once; it stays pressed until neither role is left.

use heapless::Vec;

use crate::config::KEY_INDEX_NUM;
use crate::error::Error;
use crate::key::{KeyEvent, KeyIndex, KeySource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    key: KeyIndex,
    source: KeySource,
    current: bool,
    held: bool,
}

impl Entry {
    fn is(&self, key: KeyIndex, source: KeySource) -> bool {
        self.key == key && self.source == source
    }

    fn is_live(&self) -> bool {
        self.current || self.held
    }
}

/// Active key entries of both halves, oldest press first.
#[derive(Clone, Debug, Default)]
pub struct KeyIndexSet {
    entries: Vec<Entry, KEY_INDEX_NUM>,
}

impl KeyIndexSet {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Make `key` the current entry of `source`, replacing any previous one.
    /// Setting the key that is already current changes nothing, so its
    /// place in the press order is kept.
    ///
    /// Returns `false` if the set is full and the key could not be recorded.
    pub fn set_current(&mut self, key: KeyIndex, source: KeySource) -> bool {
        if self
            .entries
            .iter()
            .any(|e| e.current && e.is(key, source))
        {
            return true;
        }
        self.clear_current(source);
        if let Some(existing) = self.entries.iter_mut().find(|e| e.is(key, source)) {
            existing.current = true;
            return true;
        }
        self.entries
            .push(Entry {
                key,
                source,
                current: true,
                held: false,
            })
            .is_ok()
    }

    /// Drop the current role of `source`'s current entry, if any.
    pub fn clear_current(&mut self, source: KeySource) {
        for e in self.entries.iter_mut().filter(|e| e.source == source) {
            e.current = false;
        }
        self.entries.retain(Entry::is_live);
    }

    /// Record a held key. Already-present keys are left where they are.
    pub fn insert(&mut self, key: KeyIndex, source: KeySource) -> bool {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.is(key, source)) {
            existing.held = true;
            return true;
        }
        self.entries
            .push(Entry {
                key,
                source,
                current: false,
                held: true,
            })
            .is_ok()
    }

    /// Release a held key. A key that is also `source`'s current entry
    /// stays until the current entry moves on.
    pub fn remove(&mut self, key: KeyIndex, source: KeySource) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.is(key, source)) {
            existing.held = false;
        }
        self.entries.retain(Entry::is_live);
    }

    /// Remove every entry of `source` in one step. Returns how many went.
    pub fn clear_source(&mut self, source: KeySource) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.source != source);
        before - self.entries.len()
    }

    pub fn contains(&self, key: KeyIndex, source: KeySource) -> bool {
        self.entries.iter().any(|e| e.is(key, source))
    }

    pub fn count(&self, source: KeySource) -> usize {
        self.entries.iter().filter(|e| e.source == source).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in press order.
    pub fn iter(&self) -> impl Iterator<Item = KeyEvent> + '_ {
        self.entries
            .iter()
            .map(|e| KeyEvent::new(e.key.get(), e.source))
    }

    /// Pressed keys in press order, regardless of source.
    pub fn keys(&self) -> impl Iterator<Item = KeyIndex> + '_ {
        self.entries.iter().map(|e| e.key)
    }
}

/// Single owner of the pressed-key state consumed by the HID reporter.
#[derive(Clone, Debug, Default)]
pub struct KeyAggregator {
    set: KeyIndexSet,
}

impl KeyAggregator {
    pub const fn new() -> Self {
        Self {
            set: KeyIndexSet::new(),
        }
    }

    /// Apply a single-index update: `0` removes `source`'s current entry,
    /// anything else sets or replaces it. Other sources are untouched.
    pub fn update(&mut self, index: i8, source: KeySource) -> Result<(), Error> {
        match KeyIndex::from_raw(index)? {
            None => {
                debug!("{:?} released", source);
                self.set.clear_current(source);
            }
            Some(key) => {
                debug!("{:?} current key {}", source, index);
                if !self.set.set_current(key, source) {
                    warn!("Key index set full - dropping {} from {:?}", index, source);
                }
            }
        }
        Ok(())
    }

    /// Record one held key from a source that reports individual transitions.
    pub fn press(&mut self, index: i8, source: KeySource) -> Result<(), Error> {
        let Some(key) = KeyIndex::from_raw(index)? else {
            return Ok(());
        };
        if !self.set.insert(key, source) {
            warn!("Key index set full - dropping {} from {:?}", index, source);
        }
        Ok(())
    }

    /// Release one held key.
    pub fn release(&mut self, index: i8, source: KeySource) -> Result<(), Error> {
        if let Some(key) = KeyIndex::from_raw(index)? {
            self.set.remove(key, source);
        }
        Ok(())
    }

    /// Drop everything `source` has pressed. Runs to completion before any
    /// report is generated, so the reporter never sees half of it.
    pub fn clear_source(&mut self, source: KeySource) -> usize {
        let removed = self.set.clear_source(source);
        if removed > 0 {
            info!("Cleared {} key(s) from {:?}", removed, source);
        }
        removed
    }

    /// The canonical pressed set, oldest first.
    pub fn active(&self) -> impl Iterator<Item = KeyIndex> + '_ {
        self.set.keys()
    }

    pub fn entries(&self) -> &KeyIndexSet {
        &self.set
    }

    pub fn is_idle(&self) -> bool {
        self.set.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::NO_KEY;
    use KeySource::{Local, Remote};

    fn key(raw: i8) -> KeyIndex {
        KeyIndex::from_raw(raw).unwrap().unwrap()
    }

    #[test]
    fn update_sets_and_replaces_current_entry() {
        let mut agg = KeyAggregator::new();
        agg.update(5, Remote).unwrap();
        assert!(agg.entries().contains(key(5), Remote));

        agg.update(9, Remote).unwrap();
        assert!(!agg.entries().contains(key(5), Remote));
        assert!(agg.entries().contains(key(9), Remote));
        assert_eq!(agg.entries().count(Remote), 1);
    }

    #[test]
    fn sentinel_removes_only_that_sources_entry() {
        let mut agg = KeyAggregator::new();
        agg.update(3, Local).unwrap();
        agg.update(12, Remote).unwrap();

        agg.update(NO_KEY, Remote).unwrap();
        assert_eq!(agg.entries().count(Remote), 0);
        assert!(agg.entries().contains(key(3), Local));
    }

    #[test]
    fn sentinel_with_nothing_pressed_is_harmless() {
        let mut agg = KeyAggregator::new();
        agg.update(NO_KEY, Remote).unwrap();
        assert!(agg.is_idle());
    }

    #[test]
    fn update_leaves_held_keys_of_same_source() {
        let mut agg = KeyAggregator::new();
        agg.press(1, Local).unwrap();
        agg.press(2, Local).unwrap();
        agg.update(3, Local).unwrap();
        agg.update(NO_KEY, Local).unwrap();

        let held: std::vec::Vec<i8> = agg.active().map(|k| k.get()).collect();
        assert_eq!(held, [1, 2]);
    }

    #[test]
    fn update_to_an_already_held_key_does_not_duplicate() {
        let mut agg = KeyAggregator::new();
        agg.press(4, Local).unwrap();
        agg.update(4, Local).unwrap();
        assert_eq!(agg.entries().len(), 1);
    }

    #[test]
    fn sentinel_keeps_a_held_key_that_was_also_current() {
        let mut agg = KeyAggregator::new();
        agg.press(4, Local).unwrap();
        agg.update(4, Local).unwrap();
        agg.update(NO_KEY, Local).unwrap();
        assert_eq!(agg.entries().len(), 1);
        assert!(agg.entries().contains(key(4), Local));

        agg.release(4, Local).unwrap();
        assert!(agg.is_idle());
    }

    #[test]
    fn release_keeps_the_current_entry_until_it_moves_on() {
        let mut agg = KeyAggregator::new();
        agg.update(6, Local).unwrap();
        agg.press(6, Local).unwrap();
        agg.release(6, Local).unwrap();
        assert!(agg.entries().contains(key(6), Local));

        agg.update(7, Local).unwrap();
        assert!(!agg.entries().contains(key(6), Local));
    }

    #[test]
    fn repeating_the_current_key_keeps_its_place() {
        let mut agg = KeyAggregator::new();
        agg.update(5, Remote).unwrap();
        agg.press(1, Local).unwrap();
        agg.update(5, Remote).unwrap();

        let order: std::vec::Vec<i8> = agg.active().map(|k| k.get()).collect();
        assert_eq!(order, [5, 1]);
    }

    #[test]
    fn press_and_release_track_individual_keys() {
        let mut agg = KeyAggregator::new();
        agg.press(1, Local).unwrap();
        agg.press(2, Local).unwrap();
        agg.press(2, Local).unwrap();
        assert_eq!(agg.entries().len(), 2);

        agg.release(1, Local).unwrap();
        let held: std::vec::Vec<i8> = agg.active().map(|k| k.get()).collect();
        assert_eq!(held, [2]);
    }

    #[test]
    fn clear_source_removes_every_entry_of_that_source() {
        let mut agg = KeyAggregator::new();
        agg.press(1, Local).unwrap();
        agg.press(8, Remote).unwrap();
        agg.update(9, Remote).unwrap();

        assert_eq!(agg.clear_source(Remote), 2);
        assert_eq!(agg.entries().count(Remote), 0);
        assert!(agg.entries().contains(key(1), Local));
        assert_eq!(agg.clear_source(Remote), 0);
    }

    #[test]
    fn invalid_indices_are_rejected_without_side_effects() {
        let mut agg = KeyAggregator::new();
        agg.update(7, Remote).unwrap();
        assert_eq!(agg.update(-3, Remote), Err(Error::InvalidKeyIndex(-3)));
        assert_eq!(agg.press(100, Local), Err(Error::InvalidKeyIndex(100)));
        assert!(agg.entries().contains(key(7), Remote));
        assert_eq!(agg.entries().len(), 1);
    }

    #[test]
    fn presses_beyond_capacity_are_dropped() {
        let mut agg = KeyAggregator::new();
        for i in 1..=(KEY_INDEX_NUM as i8 + 3) {
            agg.press(i, Local).unwrap();
        }
        assert_eq!(agg.entries().len(), KEY_INDEX_NUM);
        assert!(!agg.entries().contains(key(KEY_INDEX_NUM as i8 + 1), Local));
    }

    #[test]
    fn entries_keep_press_order_across_sources() {
        let mut agg = KeyAggregator::new();
        agg.press(2, Local).unwrap();
        agg.update(10, Remote).unwrap();
        agg.press(1, Local).unwrap();

        let order: std::vec::Vec<KeyEvent> = agg.entries().iter().collect();
        assert_eq!(
            order,
            [
                KeyEvent::new(2, Local),
                KeyEvent::new(10, Remote),
                KeyEvent::new(1, Local),
            ]
        );
    }
}

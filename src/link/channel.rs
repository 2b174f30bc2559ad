//! Peripheral-side key index publication.

use crate::error::Error;
use crate::key::NO_KEY;

/// The one-byte read + notify attribute the central subscribes to.
pub trait KeyIndexAttribute {
    /// Store the value served to reads.
    fn write(&mut self, value: u8);
    /// Push the value to a subscribed central.
    fn notify(&mut self, value: u8) -> Result<(), Error>;
}

/// Publishes this half's current key to the other half.
///
/// Delivery is best-effort. A lost notification is recovered by the next
/// transition, by a direct read, or by the central clearing this half's
/// keys when the link drops.
pub struct KeyIndexChannel<A> {
    attr: A,
    value: i8,
}

impl<A: KeyIndexAttribute> KeyIndexChannel<A> {
    /// The attribute holds the release sentinel before any key activity.
    pub fn new(mut attr: A) -> Self {
        attr.write(NO_KEY as u8);
        Self {
            attr,
            value: NO_KEY,
        }
    }

    /// Publish `index` (0 = released): store it, then notify once.
    pub fn set(&mut self, index: i8) {
        self.value = index;
        let raw = index as u8;
        self.attr.write(raw);
        if let Err(e) = self.attr.notify(raw) {
            // nobody subscribed, or the stack is busy; reads still see it
            debug!("Key index {} not notified: {:?}", index, e);
        }
    }

    /// Translate a matrix transition: press publishes the key, release
    /// publishes the sentinel.
    pub fn on_key(&mut self, index: i8, pressed: bool) {
        self.set(if pressed { index } else { NO_KEY });
    }

    pub fn read(&self) -> i8 {
        self.value
    }

    pub fn attribute(&self) -> &A {
        &self.attr
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;
    use crate::error::BleError;

    #[derive(Default)]
    struct RecordingAttr {
        value: Option<u8>,
        notified: Vec<u8>,
        fail: bool,
    }

    impl KeyIndexAttribute for RecordingAttr {
        fn write(&mut self, value: u8) {
            self.value = Some(value);
        }

        fn notify(&mut self, value: u8) -> Result<(), Error> {
            if self.fail {
                return Err(Error::Ble(BleError::NotifyFailed));
            }
            self.notified.push(value);
            Ok(())
        }
    }

    #[test]
    fn attribute_starts_at_sentinel() {
        let channel = KeyIndexChannel::new(RecordingAttr::default());
        assert_eq!(channel.read(), NO_KEY);
        assert_eq!(channel.attribute().value, Some(0));
        assert!(channel.attribute().notified.is_empty());
    }

    #[test]
    fn read_back_equals_last_set() {
        let mut channel = KeyIndexChannel::new(RecordingAttr::default());
        channel.set(17);
        channel.set(4);
        assert_eq!(channel.read(), 4);
        assert_eq!(channel.attribute().value, Some(4));
    }

    #[test]
    fn each_transition_notifies_once() {
        let mut channel = KeyIndexChannel::new(RecordingAttr::default());
        channel.on_key(9, true);
        channel.on_key(9, false);
        channel.on_key(12, true);
        assert_eq!(channel.attribute().notified, [9, 0, 12]);
    }

    #[test]
    fn failed_notify_keeps_value_for_reads() {
        let mut channel = KeyIndexChannel::new(RecordingAttr {
            fail: true,
            ..Default::default()
        });
        channel.set(30);
        assert_eq!(channel.read(), 30);
        assert_eq!(channel.attribute().value, Some(30));
        assert!(channel.attribute().notified.is_empty());
    }
}

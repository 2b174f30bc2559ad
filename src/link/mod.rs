//! Link between the two halves.
//!
//! The central half runs a [`LinkManager`] that scans for, connects to and
//! subscribes to the peripheral half. The peripheral half publishes its
//! current key through a [`KeyIndexChannel`].
//!
//! Neither side talks to the radio directly. The radio stack posts
//! [`LinkEvent`]s into the event loop and receives [`RadioRequest`]s
//! through the [`Radio`] trait, so everything here runs on the host too.

pub mod adv;
pub mod channel;
pub mod manager;

use heapless::Vec;

use crate::config::NOTIFY_MAX_LEN;

pub use adv::{ScanParams, Uuid128};
pub use channel::{KeyIndexAttribute, KeyIndexChannel};
pub use manager::LinkManager;

/// Connection handle assigned by the radio stack.
pub type ConnHandle = u16;

/// Maximum legacy advertising payload.
pub const ADV_DATA_MAX_LEN: usize = 31;

/// Where the link currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    #[default]
    None,
    Scanning,
    Connecting,
    Discovering,
    Linked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressKind {
    Public,
    RandomStatic,
    RandomPrivateResolvable,
    RandomPrivateNonResolvable,
}

/// Bluetooth device address of a peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerAddress {
    pub kind: AddressKind,
    pub bytes: [u8; 6],
}

impl PeerAddress {
    pub const fn new(kind: AddressKind, bytes: [u8; 6]) -> Self {
        Self { kind, bytes }
    }

    pub const fn random_static(bytes: [u8; 6]) -> Self {
        Self::new(AddressKind::RandomStatic, bytes)
    }
}

/// One advertisement seen while scanning.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvReport {
    pub peer: PeerAddress,
    pub rssi: i8,
    pub data: Vec<u8, ADV_DATA_MAX_LEN>,
}

impl AdvReport {
    /// Anything past 31 bytes is cut off.
    pub fn new(peer: PeerAddress, rssi: i8, data: &[u8]) -> Self {
        let len = data.len().min(ADV_DATA_MAX_LEN);
        let mut buf = Vec::new();
        // cannot fail, len is capped to capacity
        let _ = buf.extend_from_slice(&data[..len]);
        Self {
            peer,
            rssi,
            data: buf,
        }
    }
}

/// Something the radio stack observed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    Advertisement(AdvReport),
    Connected {
        handle: ConnHandle,
    },
    ServiceDiscovered {
        handle: ConnHandle,
        found: bool,
    },
    CharacteristicDiscovered {
        handle: ConnHandle,
        found: bool,
    },
    Notification {
        handle: ConnHandle,
        data: Vec<u8, NOTIFY_MAX_LEN>,
    },
    /// The link went down, or a connect attempt gave up before a handle
    /// existed (`handle: None`).
    Disconnected {
        handle: Option<ConnHandle>,
        reason: u8,
    },
    /// Scanning ran for its full duration without a match.
    ScanTimeout,
}

impl LinkEvent {
    /// Notification carrying `data`, truncated to the notify payload size.
    pub fn notification(handle: ConnHandle, data: &[u8]) -> Self {
        let len = data.len().min(NOTIFY_MAX_LEN);
        let mut buf = Vec::new();
        let _ = buf.extend_from_slice(&data[..len]);
        LinkEvent::Notification { handle, data: buf }
    }
}

/// Something the link logic wants the radio stack to do.
///
/// All requests are fire-and-forget: the outcome comes back later as a
/// [`LinkEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioRequest {
    /// Start scanning, replacing any scan in progress.
    StartScan(ScanParams),
    Connect(PeerAddress),
    DiscoverService(ConnHandle),
    DiscoverCharacteristic(ConnHandle),
    EnableNotify(ConnHandle),
    Disconnect(ConnHandle),
}

/// Outbound side of the radio stack.
pub trait Radio {
    fn request(&mut self, req: RadioRequest);
}

impl<R: Radio + ?Sized> Radio for &mut R {
    fn request(&mut self, req: RadioRequest) {
        (**self).request(req)
    }
}

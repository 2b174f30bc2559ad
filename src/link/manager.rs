//! Central-side link state machine.
//!
//! ```text
//! None -start-> Scanning -advert-> Connecting -connected-> Discovering -found-> Linked
//!                  ^                                                              |
//!                  +------------- disconnect / discovery failure -----------------+
//! ```
//!
//! Every way back to `Scanning` clears the remote half's keys first.

use crate::aggregator::KeyAggregator;
use crate::key::KeySource;

use super::{
    AdvReport, ConnHandle, LinkEvent, LinkState, PeerAddress, Radio, RadioRequest, ScanParams,
};

pub struct LinkManager<R> {
    radio: R,
    params: ScanParams,
    state: LinkState,
    peer: Option<PeerAddress>,
    conn: Option<ConnHandle>,
    subscribed: bool,
    scanning: bool,
}

impl<R: Radio> LinkManager<R> {
    pub fn new(radio: R) -> Self {
        Self::with_params(radio, ScanParams::default())
    }

    pub fn with_params(radio: R, params: ScanParams) -> Self {
        Self {
            radio,
            params,
            state: LinkState::None,
            peer: None,
            conn: None,
            subscribed: false,
            scanning: false,
        }
    }

    /// Begin scanning for the peripheral half.
    ///
    /// Calling this again while unlinked restarts the scan.
    pub fn start(&mut self) {
        match self.state {
            LinkState::None | LinkState::Scanning => self.scan(),
            state => debug!("start() ignored in {:?}", state),
        }
    }

    /// Process one radio event to completion.
    pub fn handle(&mut self, event: LinkEvent, keys: &mut KeyAggregator) {
        match event {
            LinkEvent::Advertisement(report) => self.on_advertisement(&report),
            LinkEvent::Connected { handle } => self.on_connected(handle, keys),
            LinkEvent::ServiceDiscovered { handle, found } => {
                if self.expects(LinkState::Discovering, handle) && !self.subscribed {
                    if found {
                        debug!("Link service found on {}", handle);
                        self.radio.request(RadioRequest::DiscoverCharacteristic(handle));
                    } else {
                        warn!("Link service missing on {}", handle);
                        self.fail(handle, keys);
                    }
                }
            }
            LinkEvent::CharacteristicDiscovered { handle, found } => {
                if self.expects(LinkState::Discovering, handle) && !self.subscribed {
                    if found {
                        self.radio.request(RadioRequest::EnableNotify(handle));
                        self.subscribed = true;
                        self.transition(LinkState::Linked);
                    } else {
                        warn!("Key index characteristic missing on {}", handle);
                        self.fail(handle, keys);
                    }
                }
            }
            LinkEvent::Notification { handle, data } => {
                if !self.expects(LinkState::Linked, handle) {
                    return;
                }
                let Some(&byte) = data.first() else {
                    debug!("Empty notification ignored");
                    return;
                };
                if let Err(e) = keys.update(byte as i8, KeySource::Remote) {
                    warn!("Notification ignored: {:?}", e);
                }
            }
            LinkEvent::Disconnected { handle, reason } => {
                info!("Disconnected (handle {:?}, reason {})", handle, reason);
                self.drop_link(keys);
            }
            LinkEvent::ScanTimeout => {
                if self.scanning {
                    info!("Scan timed out, continuing with local keys only");
                }
                self.scanning = false;
            }
        }
    }

    fn on_advertisement(&mut self, report: &AdvReport) {
        if self.state != LinkState::Scanning || !self.params.matches(report) {
            return;
        }
        info!(
            "Found peripheral {:?} (RSSI {})",
            report.peer.bytes, report.rssi
        );
        self.peer = Some(report.peer);
        self.scanning = false;
        self.transition(LinkState::Connecting);
        self.radio.request(RadioRequest::Connect(report.peer));
    }

    fn on_connected(&mut self, handle: ConnHandle, keys: &mut KeyAggregator) {
        if self.state != LinkState::Connecting {
            warn!("Unexpected connection {} in {:?}", handle, self.state);
            self.radio.request(RadioRequest::Disconnect(handle));
            return;
        }
        // a stale Remote entry must not survive into the new link
        keys.clear_source(KeySource::Remote);
        self.conn = Some(handle);
        self.subscribed = false;
        self.transition(LinkState::Discovering);
        self.radio.request(RadioRequest::DiscoverService(handle));
    }

    /// Tear down after a discovery failure. The disconnect event that
    /// follows finds us already scanning.
    fn fail(&mut self, handle: ConnHandle, keys: &mut KeyAggregator) {
        self.radio.request(RadioRequest::Disconnect(handle));
        self.drop_link(keys);
    }

    fn drop_link(&mut self, keys: &mut KeyAggregator) {
        keys.clear_source(KeySource::Remote);
        self.conn = None;
        self.peer = None;
        self.subscribed = false;
        self.scan();
    }

    fn scan(&mut self) {
        self.transition(LinkState::Scanning);
        self.scanning = true;
        self.radio.request(RadioRequest::StartScan(self.params));
    }

    fn expects(&self, state: LinkState, handle: ConnHandle) -> bool {
        let ok = self.state == state && self.conn == Some(handle);
        if !ok {
            debug!("Stale event for {} in {:?}", handle, self.state);
        }
        ok
    }

    fn transition(&mut self, to: LinkState) {
        if self.state != to {
            info!("Link {:?} -> {:?}", self.state, to);
            self.state = to;
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Whether a scan is running. False after a scan timeout even though
    /// the state stays `Scanning`.
    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn connection(&self) -> Option<ConnHandle> {
        self.conn
    }

    pub fn peer(&self) -> Option<PeerAddress> {
        self.peer
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }
}

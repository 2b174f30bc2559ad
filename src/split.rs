//! Single-consumer event loop state for each half.
//!
//! Every producer (matrix scan, radio stack) posts an [`Event`]; one loop
//! owns the state below and handles events one at a time, so no handler
//! ever sees another half-finished.

use crate::aggregator::KeyAggregator;
use crate::hid::{HidReporter, ReportOutcome, ReportSink};
use crate::key::KeySource;
use crate::link::{KeyIndexAttribute, KeyIndexChannel, LinkEvent, LinkManager, LinkState, Radio};
use crate::role::Role;

/// Input to the event loop.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Debounced transition from this half's matrix.
    Key { index: i8, pressed: bool },
    Link(LinkEvent),
}

impl From<LinkEvent> for Event {
    fn from(event: LinkEvent) -> Self {
        Event::Link(event)
    }
}

/// The controlling half: aggregates keys and reports to the host.
pub struct SplitCentral<R, S> {
    link: Option<LinkManager<R>>,
    keys: KeyAggregator,
    reporter: HidReporter<S>,
}

impl<R: Radio, S: ReportSink> SplitCentral<R, S> {
    /// The link manager only exists for [`Role::CentralWithLink`].
    pub fn new(role: Role, radio: R, sink: S) -> Self {
        Self {
            link: role.has_link().then(|| LinkManager::new(radio)),
            keys: KeyAggregator::new(),
            reporter: HidReporter::new(sink),
        }
    }

    pub fn start(&mut self) {
        if let Some(link) = self.link.as_mut() {
            link.start();
        }
    }

    /// Handle one event to completion, then run one report cycle.
    pub fn dispatch(&mut self, event: Event) -> ReportOutcome {
        match event {
            Event::Key { index, pressed } => {
                let res = if pressed {
                    self.keys.press(index, KeySource::Local)
                } else {
                    self.keys.release(index, KeySource::Local)
                };
                if let Err(e) = res {
                    warn!("Matrix event ignored: {:?}", e);
                }
            }
            Event::Link(event) => match self.link.as_mut() {
                Some(link) => link.handle(event, &mut self.keys),
                None => debug!("No link in this role, dropping {:?}", event),
            },
        }
        self.reporter.report(&self.keys)
    }

    pub fn link_state(&self) -> LinkState {
        self.link
            .as_ref()
            .map_or(LinkState::None, |link| link.state())
    }

    pub fn link(&self) -> Option<&LinkManager<R>> {
        self.link.as_ref()
    }

    pub fn keys(&self) -> &KeyAggregator {
        &self.keys
    }

    pub fn reporter(&self) -> &HidReporter<S> {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut HidReporter<S> {
        &mut self.reporter
    }
}

/// The publishing half: forwards matrix transitions to the link attribute.
pub struct SplitPeripheral<A> {
    channel: KeyIndexChannel<A>,
}

impl<A: KeyIndexAttribute> SplitPeripheral<A> {
    pub fn new(attr: A) -> Self {
        Self {
            channel: KeyIndexChannel::new(attr),
        }
    }

    pub fn dispatch(&mut self, event: Event) {
        match event {
            Event::Key { index, pressed } => self.channel.on_key(index, pressed),
            Event::Link(LinkEvent::Disconnected { reason, .. }) => {
                info!("Central disconnected ({})", reason)
            }
            Event::Link(_) => {}
        }
    }

    pub fn channel(&self) -> &KeyIndexChannel<A> {
        &self.channel
    }
}

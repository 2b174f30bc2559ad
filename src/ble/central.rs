//! Radio side of the link manager.
//!
//! The event loop's [`LinkManager`](ergolink::LinkManager) decides *what*
//! to do; this task does it on the SoftDevice and posts the outcome back
//! as [`LinkEvent`]s. Requests are handled one at a time; a newer request
//! interrupts a scan or connect still in progress.

use defmt::{info, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use ergolink::config::{self, EVENT_QUEUE_DEPTH, RADIO_REQUEST_QUEUE_DEPTH};
use ergolink::link::{AdvReport, ConnHandle, LinkEvent, Radio, RadioRequest, ScanParams};
use ergolink::{BleError, Event};
use nrf_softdevice::ble::gatt_client::{self, DiscoverError};
use nrf_softdevice::ble::{central, Address, Connection};
use nrf_softdevice::{raw, Softdevice};

use crate::ble::{from_address, report_failure, to_address};

pub type RequestSender = Sender<'static, CriticalSectionRawMutex, RadioRequest, RADIO_REQUEST_QUEUE_DEPTH>;
pub type RequestReceiver =
    Receiver<'static, CriticalSectionRawMutex, RadioRequest, RADIO_REQUEST_QUEUE_DEPTH>;
pub type EventSender = Sender<'static, CriticalSectionRawMutex, Event, EVENT_QUEUE_DEPTH>;

/// Reason reported when we drop the link ourselves.
const LOCAL_HOST_TERMINATED: u8 = raw::BLE_HCI_LOCAL_HOST_TERMINATED_CONNECTION as u8;
/// Reason reported when the link drops under us; the SoftDevice does not
/// tell `gatt_client::run` why.
const LINK_LOST: u8 = raw::BLE_HCI_CONNECTION_TIMEOUT as u8;

/// GATT client for the peripheral half's link service.
// service UUID is `config::LINK_SERVICE_UUID`
#[nrf_softdevice::gatt_client(uuid = "d2e52f8b-564d-4f11-a4de-411ff1b6eac6")]
pub struct LinkServiceClient {
    #[characteristic(uuid = "daabad40-d802-4997-82c1-b518bd9d9fd3", read, notify)]
    pub key_index: u8,
}

/// [`Radio`] handed to the link manager: queues requests for [`run`].
pub struct ChannelRadio {
    tx: RequestSender,
}

impl ChannelRadio {
    pub fn new(tx: RequestSender) -> Self {
        Self { tx }
    }
}

impl Radio for ChannelRadio {
    fn request(&mut self, req: RadioRequest) {
        if self.tx.try_send(req).is_err() {
            warn!("Radio request queue full - dropping {}", req);
        }
    }
}

/// The connection to the peripheral half and how far it got.
struct Link {
    conn: Connection,
    handle: ConnHandle,
    client: Option<LinkServiceClient>,
    subscribed: bool,
}

impl Link {
    fn is(&self, handle: ConnHandle) -> bool {
        self.handle == handle
    }
}

pub async fn run(sd: &'static Softdevice, requests: &RequestReceiver, events: &EventSender) -> ! {
    let mut link: Option<Link> = None;
    let mut pending: Option<RadioRequest> = None;

    loop {
        let req = match pending.take() {
            Some(req) => req,
            None => {
                // Keep listening for notifications while waiting.
                let listening = match link.as_ref() {
                    Some(l) if l.subscribed => match l.client.as_ref() {
                        Some(client) => Some(
                            select(listen(&l.conn, client, l.handle, events), requests.receive())
                                .await,
                        ),
                        None => None,
                    },
                    _ => None,
                };
                match listening {
                    Some(Either::First(handle)) => {
                        info!("Link to peripheral lost");
                        link = None;
                        post(events, LinkEvent::Disconnected {
                            handle: Some(handle),
                            reason: LINK_LOST,
                        })
                        .await;
                        continue;
                    }
                    Some(Either::Second(req)) => req,
                    None => requests.receive().await,
                }
            }
        };

        match req {
            RadioRequest::StartScan(params) => {
                match select(scan(sd, &params), requests.receive()).await {
                    Either::First(event) => post(events, event).await,
                    Either::Second(next) => pending = Some(next),
                }
            }
            RadioRequest::Connect(peer) => {
                let address = to_address(&peer);
                match select(connect(sd, &address), requests.receive()).await {
                    Either::First(Ok(conn)) => {
                        let Some(handle) = conn.handle() else {
                            post(events, LinkEvent::Disconnected {
                                handle: None,
                                reason: LINK_LOST,
                            })
                            .await;
                            continue;
                        };
                        info!("Connected to peripheral (handle {})", handle);
                        link = Some(Link {
                            conn,
                            handle,
                            client: None,
                            subscribed: false,
                        });
                        post(events, LinkEvent::Connected { handle }).await;
                    }
                    Either::First(Err(e)) => {
                        report_failure(BleError::ConnectFailed, e);
                        post(events, LinkEvent::Disconnected {
                            handle: None,
                            reason: LINK_LOST,
                        })
                        .await;
                    }
                    Either::Second(next) => {
                        pending = Some(next);
                        post(events, LinkEvent::Disconnected {
                            handle: None,
                            reason: LOCAL_HOST_TERMINATED,
                        })
                        .await;
                    }
                }
            }
            RadioRequest::DiscoverService(handle) => {
                let Some(l) = link.as_mut().filter(|l| l.is(handle)) else {
                    continue;
                };
                let found = match gatt_client::discover::<LinkServiceClient>(&l.conn).await {
                    Ok(client) => {
                        l.client = Some(client);
                        true
                    }
                    // service present but the key index characteristic is not
                    Err(DiscoverError::ServiceIncomplete) => true,
                    Err(e) => {
                        report_failure(BleError::DiscoveryFailed, e);
                        false
                    }
                };
                post(events, LinkEvent::ServiceDiscovered { handle, found }).await;
            }
            RadioRequest::DiscoverCharacteristic(handle) => {
                let Some(l) = link.as_ref().filter(|l| l.is(handle)) else {
                    continue;
                };
                let found = l.client.is_some();
                post(events, LinkEvent::CharacteristicDiscovered { handle, found }).await;
            }
            RadioRequest::EnableNotify(handle) => {
                let Some(client) = link
                    .as_ref()
                    .filter(|l| l.is(handle))
                    .and_then(|l| l.client.as_ref())
                else {
                    continue;
                };
                match client.key_index_cccd_write(true).await {
                    Ok(()) => {
                        info!("Subscribed to peripheral key index");
                        if let Some(l) = link.as_mut() {
                            l.subscribed = true;
                        }
                    }
                    Err(e) => {
                        report_failure(BleError::NotifyFailed, e);
                        drop_link(&mut link, handle, events).await;
                    }
                }
            }
            RadioRequest::Disconnect(handle) => {
                if link.as_ref().is_some_and(|l| l.is(handle)) {
                    drop_link(&mut link, handle, events).await;
                }
            }
        }
    }
}

async fn drop_link(link: &mut Option<Link>, handle: ConnHandle, events: &EventSender) {
    if let Some(l) = link.take() {
        let _ = l.conn.disconnect();
    }
    post(
        events,
        LinkEvent::Disconnected {
            handle: Some(handle),
            reason: LOCAL_HOST_TERMINATED,
        },
    )
    .await;
}

/// Scan until a matching advert shows up or the scan times out.
async fn scan(sd: &Softdevice, params: &ScanParams) -> LinkEvent {
    let scan_config = central::ScanConfig {
        active: params.active,
        interval: params.interval as u32,
        window: params.window as u32,
        // 10 ms units
        timeout: params.timeout_secs.saturating_mul(100),
        ..Default::default()
    };
    info!("Scanning for peripheral ({} s)", params.timeout_secs);

    let result = central::scan(sd, &scan_config, |report| {
        let data =
            unsafe { core::slice::from_raw_parts(report.data.p_data, report.data.len as usize) };
        let peer = from_address(&Address::from_raw(report.peer_addr));
        let adv = AdvReport::new(peer, report.rssi, data);
        params.matches(&adv).then_some(adv)
    })
    .await;

    match result {
        Ok(adv) => LinkEvent::Advertisement(adv),
        Err(central::ScanError::Timeout) => LinkEvent::ScanTimeout,
        Err(e) => {
            report_failure(BleError::ScanFailed, e);
            LinkEvent::ScanTimeout
        }
    }
}

async fn connect(sd: &Softdevice, address: &Address) -> Result<Connection, central::ConnectError> {
    let whitelist = [address];
    let conn_config = central::ConnectConfig {
        scan_config: central::ScanConfig {
            whitelist: Some(&whitelist),
            ..Default::default()
        },
        conn_params: raw::ble_gap_conn_params_t {
            min_conn_interval: config::BLE_CONN_INTERVAL_MIN,
            max_conn_interval: config::BLE_CONN_INTERVAL_MAX,
            slave_latency: config::BLE_SLAVE_LATENCY,
            conn_sup_timeout: config::BLE_SUP_TIMEOUT,
        },
        ..Default::default()
    };
    central::connect(sd, &conn_config).await
}

/// Forward key index notifications until the link drops.
async fn listen(
    conn: &Connection,
    client: &LinkServiceClient,
    handle: ConnHandle,
    events: &EventSender,
) -> ConnHandle {
    let _ = gatt_client::run(conn, client, |event| match event {
        LinkServiceClientEvent::KeyIndexNotification(value) => {
            let event = Event::Link(LinkEvent::notification(handle, &[value]));
            // callbacks cannot await; a full queue loses this transition only
            if events.try_send(event).is_err() {
                warn!("Event queue full - dropping key index {}", value);
            }
        }
    })
    .await;
    handle
}

async fn post(events: &EventSender, event: LinkEvent) {
    events.send(Event::Link(event)).await;
}

//! Peripheral half: serves the key index characteristic to the
//! controlling half.
//!
//! [`GattKeyIndex`] is the attribute the event loop's
//! [`KeyIndexChannel`](ergolink::KeyIndexChannel) writes through; [`run`]
//! advertises the link service and keeps the connection slot up to date.

use core::cell::RefCell;

use defmt::{info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Timer;
use ergolink::config;
use ergolink::link::LinkEvent;
use ergolink::{BleError, Error, Event, KeyIndexAttribute};
use nrf_softdevice::ble::advertisement_builder::{
    AdvertisementDataType, Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload,
    ServiceList,
};
use nrf_softdevice::ble::gatt_server::{self, set_sys_attrs};
use nrf_softdevice::ble::peripheral::{self, ConnectableAdvertisement};
use nrf_softdevice::ble::Connection;
use nrf_softdevice::Softdevice;

use crate::ble::central::EventSender;
use crate::ble::{adv_config, report_failure, DeviceInformationService};

/// User description of the key index characteristic.
const KEY_INDEX_DESCRIPTION: [u8; 9] = *b"Key index";

/// Link service; the central looks for its UUID in adverts.
// service UUID is `config::LINK_SERVICE_UUID`
#[nrf_softdevice::gatt_service(uuid = "d2e52f8b-564d-4f11-a4de-411ff1b6eac6")]
pub struct KeyIndexService {
    #[characteristic(
        uuid = "daabad40-d802-4997-82c1-b518bd9d9fd3",
        read,
        notify,
        descriptor(uuid = "2901", value = "KEY_INDEX_DESCRIPTION")
    )]
    pub key_index: u8,
}

#[nrf_softdevice::gatt_server]
pub struct LinkServer {
    pub dis: DeviceInformationService,
    pub link: KeyIndexService,
}

/// Connection to the controlling half, if any.
static CENTRAL_CONN: Mutex<CriticalSectionRawMutex, RefCell<Option<Connection>>> =
    Mutex::new(RefCell::new(None));

/// The key index characteristic as seen by the event loop.
pub struct GattKeyIndex {
    server: &'static LinkServer,
}

impl GattKeyIndex {
    pub fn new(server: &'static LinkServer) -> Self {
        Self { server }
    }
}

impl KeyIndexAttribute for GattKeyIndex {
    fn write(&mut self, value: u8) {
        if let Err(e) = self.server.link.key_index_set(&value) {
            warn!("Key index write failed: {:?}", e);
        }
    }

    fn notify(&mut self, value: u8) -> Result<(), Error> {
        CENTRAL_CONN.lock(|slot| match slot.borrow().as_ref() {
            Some(conn) => self
                .server
                .link
                .key_index_notify(conn, &value)
                .map_err(|_| BleError::NotifyFailed.into()),
            None => Err(Error::NotConnected),
        })
    }
}

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .raw(AdvertisementDataType::TXPOWER_LEVEL, &[config::TX_POWER_DBM as u8])
    .raw(AdvertisementDataType::APPEARANCE, &config::APPEARANCE_HID_KEYBOARD.to_le_bytes())
    .services_128(ServiceList::Complete, &[config::LINK_SERVICE_UUID.0])
    .build();

static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .full_name(config::PERIPHERAL_DEVICE_NAME)
    .build();

/// Advertise the link service and serve the controlling half.
pub async fn run(sd: &'static Softdevice, server: &'static LinkServer, events: &EventSender) -> ! {
    let mut fast = true;
    loop {
        let adv = ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        info!("Advertising link service ({})", if fast { "fast" } else { "slow" });
        let conn = match peripheral::advertise_connectable(sd, adv, &adv_config(fast)).await {
            Ok(conn) => conn,
            Err(peripheral::AdvertiseError::Timeout) => {
                fast = false;
                continue;
            }
            Err(e) => {
                report_failure(BleError::AdvertiseFailed, e);
                Timer::after_secs(1).await;
                continue;
            }
        };

        info!("Controlling half connected");
        fast = true;
        let _ = set_sys_attrs(&conn, None);
        CENTRAL_CONN.lock(|slot| slot.replace(Some(conn.clone())));

        let e = gatt_server::run(&conn, server, |event| match event {
            LinkServerEvent::Link(KeyIndexServiceEvent::KeyIndexCccdWrite { notifications }) => {
                info!("Key index notifications: {}", notifications)
            }
            _ => {}
        })
        .await;
        info!("Controlling half disconnected: {:?}", e);

        CENTRAL_CONN.lock(|slot| slot.replace(None));
        events
            .send(Event::Link(LinkEvent::Disconnected {
                handle: conn.handle(),
                reason: 0,
            }))
            .await;
    }
}

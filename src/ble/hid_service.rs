//! HID-over-GATT towards the computer.
//!
//! The event loop's [`HidReporter`](ergolink::HidReporter) hands finished
//! reports to [`HostReportSink`]; [`run`] advertises, accepts the host and
//! notifies each queued report on the input report characteristic.

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::info;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::Timer;
use ergolink::config::{self, HID_REPORT_QUEUE_DEPTH};
use ergolink::hid::keyboard::{KEYBOARD_REPORT_DESCRIPTOR, KEYBOARD_REPORT_ID, KEYBOARD_REPORT_SIZE};
use ergolink::{BleError, Error, KeyboardReport, ReportSink};
use nrf_softdevice::ble::advertisement_builder::{
    AdvertisementDataType, Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload,
    ServiceList, ServiceUuid16,
};
use nrf_softdevice::ble::peripheral::{self, ConnectableAdvertisement};
use nrf_softdevice::ble::{gatt_server, Connection};
use nrf_softdevice::Softdevice;

use crate::ble::bonder::Bonder;
use crate::ble::{adv_config, report_failure, DeviceInformationService};

pub type ReportSender = Sender<'static, CriticalSectionRawMutex, KeyboardReport, HID_REPORT_QUEUE_DEPTH>;
pub type ReportReceiver =
    Receiver<'static, CriticalSectionRawMutex, KeyboardReport, HID_REPORT_QUEUE_DEPTH>;

/// Set while a host is connected.
static HOST_CONNECTED: AtomicBool = AtomicBool::new(false);
/// Set when the host switched to the boot protocol.
static BOOT_PROTOCOL: AtomicBool = AtomicBool::new(false);

const REPORT_MAP: &[u8] = KEYBOARD_REPORT_DESCRIPTOR;
const NO_DATA: &[u8] = &[];
/// Report reference: report id, input.
const INPUT_REFERENCE: [u8; 2] = [KEYBOARD_REPORT_ID, 0x01];
const BOOT_INPUT_REPORT_VALUE: [u8; KEYBOARD_REPORT_SIZE] = [0; KEYBOARD_REPORT_SIZE];
/// HID 1.1, no country, remote wake + normally connectable.
const HID_INFORMATION_VALUE: [u8; 4] = [0x01, 0x01, 0x00, 0x03];
const REPORT_PROTOCOL: u8 = 0x01;

#[nrf_softdevice::gatt_service(uuid = "1812")]
pub struct HidService {
    #[characteristic(
        uuid = "2A4D",
        initial_value = "NO_DATA",
        security = "justworks",
        read,
        notify,
        descriptor(uuid = "2908", security = "justworks", value = "INPUT_REFERENCE")
    )]
    pub input_report: [u8; KEYBOARD_REPORT_SIZE],
    #[characteristic(uuid = "2A4B", initial_value = "REPORT_MAP", security = "justworks", read)]
    pub report_map: [u8; REPORT_MAP.len()],
    #[characteristic(
        uuid = "2A22",
        initial_value = "BOOT_INPUT_REPORT_VALUE",
        security = "justworks",
        read,
        notify
    )]
    pub boot_input_report: [u8; KEYBOARD_REPORT_SIZE],
    #[characteristic(uuid = "2A4A", initial_value = "HID_INFORMATION_VALUE", security = "justworks", read)]
    pub hid_information: [u8; 4],
    #[characteristic(uuid = "2A4C", security = "justworks", write_without_response)]
    pub control_point: u8,
    #[characteristic(uuid = "2A4E", security = "justworks", read, write_without_response)]
    pub protocol_mode: u8,
}

#[nrf_softdevice::gatt_server]
pub struct HostServer {
    pub dis: DeviceInformationService,
    pub hid: HidService,
}

/// [`ReportSink`] handed to the reporter: queues reports for [`run`].
pub struct HostReportSink {
    tx: ReportSender,
}

impl HostReportSink {
    pub fn new(tx: ReportSender) -> Self {
        Self { tx }
    }
}

impl ReportSink for HostReportSink {
    fn send_report(&mut self, report: &KeyboardReport) -> Result<(), Error> {
        if !HOST_CONNECTED.load(Ordering::Acquire) {
            return Err(Error::NotConnected);
        }
        self.tx.try_send(*report).map_err(|_| Error::ReportSendFailed)
    }
}

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_16(ServiceList::Incomplete, &[ServiceUuid16::HUMAN_INTERFACE_DEVICE])
    .raw(AdvertisementDataType::APPEARANCE, &config::APPEARANCE_HID_KEYBOARD.to_le_bytes())
    .raw(AdvertisementDataType::TXPOWER_LEVEL, &[config::TX_POWER_DBM as u8])
    .build();

static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .full_name(config::CENTRAL_DEVICE_NAME)
    .build();

/// Advertise to hosts, serve one at a time, forward queued reports.
pub async fn run(
    sd: &'static Softdevice,
    server: &HostServer,
    bonder: &'static Bonder,
    reports: &ReportReceiver,
) -> ! {
    let mut fast = true;
    loop {
        HOST_CONNECTED.store(false, Ordering::Release);
        let adv = ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        info!("Advertising to hosts ({})", if fast { "fast" } else { "slow" });
        let conn = match peripheral::advertise_pairable(sd, adv, &adv_config(fast), bonder).await {
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

        info!("Host connected");
        fast = true;
        BOOT_PROTOCOL.store(false, Ordering::Release);
        // reports queued while nobody listened are stale
        while reports.try_receive().is_ok() {}
        HOST_CONNECTED.store(true, Ordering::Release);

        let served = gatt_server::run(&conn, server, |event| match event {
            HostServerEvent::Hid(HidServiceEvent::InputReportCccdWrite { notifications }) => {
                info!("Host input report notifications: {}", notifications);
                bonder.store_sys_attrs(&conn);
            }
            HostServerEvent::Hid(HidServiceEvent::ProtocolModeWrite(mode)) => {
                info!("Host protocol mode: {}", mode);
                BOOT_PROTOCOL.store(mode != REPORT_PROTOCOL, Ordering::Release);
            }
            _ => {}
        });
        match select(served, forward(&conn, server, reports)).await {
            Either::First(e) => info!("Host disconnected: {:?}", e),
            Either::Second(()) => {}
        }
    }
}

async fn forward(conn: &Connection, server: &HostServer, reports: &ReportReceiver) {
    loop {
        let report = reports.receive().await;
        let bytes = report.to_bytes();
        let result = if BOOT_PROTOCOL.load(Ordering::Acquire) {
            server.hid.boot_input_report_notify(conn, &bytes)
        } else {
            server.hid.input_report_notify(conn, &bytes)
        };
        if let Err(e) = result {
            report_failure(BleError::NotifyFailed, e);
            let _ = server.hid.input_report_set(&bytes);
        }
    }
}

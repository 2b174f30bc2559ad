//! ergolink firmware entry point (nRF52840 + SoftDevice S140).
//!
//! Which tasks run depends on the role picked at build time:
//!
//! - controlling half: matrix scan, event loop (aggregator + link manager +
//!   HID reporter), radio task towards the other half, HID-over-GATT host
//!   link
//! - peripheral half: matrix scan, event loop (key index channel), link
//!   service server
//!
//! All tasks talk through the channels below.

#![no_std]
#![no_main]

mod ble;
mod board;

use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::gpio::Pin as _;
use embassy_nrf::interrupt::Priority;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use ergolink::config::{self, EVENT_QUEUE_DEPTH, HID_REPORT_QUEUE_DEPTH, RADIO_REQUEST_QUEUE_DEPTH};
use ergolink::{Event, KeyboardReport, RadioRequest, SplitCentral, SplitPeripheral};
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use ble::bonder::{bonder, Bonder};
use ble::central::{ChannelRadio, EventSender, RequestReceiver, RequestSender};
use ble::hid_service::{HostReportSink, HostServer, ReportReceiver, ReportSender};
use ble::peripheral::{GattKeyIndex, LinkServer};
use board::Matrix;

type EventReceiver = Receiver<'static, CriticalSectionRawMutex, Event, EVENT_QUEUE_DEPTH>;

/// Key and link events for the event loop.
static EVENTS: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_DEPTH> = Channel::new();
/// Link manager requests for the radio task.
static RADIO_REQUESTS: Channel<CriticalSectionRawMutex, RadioRequest, RADIO_REQUEST_QUEUE_DEPTH> =
    Channel::new();
/// Reports on their way to the host.
static HID_REPORTS: Channel<CriticalSectionRawMutex, KeyboardReport, HID_REPORT_QUEUE_DEPTH> =
    Channel::new();

static HOST_SERVER: StaticCell<HostServer> = StaticCell::new();
static LINK_SERVER: StaticCell<LinkServer> = StaticCell::new();

#[embassy_executor::task]
async fn matrix_task(matrix: Matrix, events: EventSender) -> ! {
    board::run(matrix, &events).await
}

#[embassy_executor::task]
async fn central_task(events: EventReceiver, radio: RequestSender, reports: ReportSender) -> ! {
    let mut central = SplitCentral::new(
        config::ROLE,
        ChannelRadio::new(radio),
        HostReportSink::new(reports),
    );
    central.start();
    loop {
        let event = events.receive().await;
        central.dispatch(event);
    }
}

#[embassy_executor::task]
async fn radio_task(sd: &'static Softdevice, requests: RequestReceiver, events: EventSender) -> ! {
    ble::central::run(sd, &requests, &events).await
}

#[embassy_executor::task]
async fn host_task(
    sd: &'static Softdevice,
    server: &'static HostServer,
    bonder: &'static Bonder,
    reports: ReportReceiver,
) -> ! {
    ble::hid_service::run(sd, server, bonder, &reports).await
}

#[embassy_executor::task]
async fn peripheral_task(events: EventReceiver, server: &'static LinkServer) -> ! {
    let mut half = SplitPeripheral::new(GattKeyIndex::new(server));
    loop {
        let event = events.receive().await;
        half.dispatch(event);
    }
}

#[embassy_executor::task]
async fn link_server_task(
    sd: &'static Softdevice,
    server: &'static LinkServer,
    events: EventSender,
) -> ! {
    ble::peripheral::run(sd, server, &events).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("ergolink starting as {}", config::ROLE);

    // interrupt priorities P0, P1 and P4 belong to the SoftDevice
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);

    let matrix = Matrix::new(
        [
            p.P0_24.degrade(),
            p.P1_00.degrade(),
            p.P0_11.degrade(),
            p.P1_04.degrade(),
        ],
        [
            p.P0_02.degrade(),
            p.P0_29.degrade(),
            p.P0_31.degrade(),
            p.P1_13.degrade(),
            p.P1_11.degrade(),
            p.P0_10.degrade(),
            p.P0_09.degrade(),
        ],
    );

    let sd = Softdevice::enable(&ble::softdevice_config(config::ROLE.device_name()));

    if config::ROLE.reports_to_host() {
        let server: &'static HostServer = HOST_SERVER.init(unwrap!(HostServer::new(sd)));
        let sd: &'static Softdevice = sd;
        unwrap!(spawner.spawn(ble::softdevice_task(sd)));

        unwrap!(spawner.spawn(central_task(
            EVENTS.receiver(),
            RADIO_REQUESTS.sender(),
            HID_REPORTS.sender(),
        )));
        if config::ROLE.has_link() {
            unwrap!(spawner.spawn(radio_task(sd, RADIO_REQUESTS.receiver(), EVENTS.sender())));
        }
        unwrap!(spawner.spawn(host_task(sd, server, bonder(), HID_REPORTS.receiver())));
    } else {
        let server: &'static LinkServer = LINK_SERVER.init(unwrap!(LinkServer::new(sd)));
        let sd: &'static Softdevice = sd;
        unwrap!(spawner.spawn(ble::softdevice_task(sd)));

        unwrap!(spawner.spawn(peripheral_task(EVENTS.receiver(), server)));
        unwrap!(spawner.spawn(link_server_task(sd, server, EVENTS.sender())));
    }

    unwrap!(spawner.spawn(matrix_task(matrix, EVENTS.sender())));
}

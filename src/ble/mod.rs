//! Bluetooth Low Energy subsystem (Nordic SoftDevice S140).
//!
//! Depending on the role this half plays:
//!
//! 1. **Central** - [`central`] runs the link manager's radio requests
//!    (scan, connect, discover, subscribe) against the peripheral half.
//! 2. **Host link** - [`hid_service`] exposes HID-over-GATT to the computer
//!    and forwards the reporter's keyboard reports.
//! 3. **Peripheral** - [`peripheral`] serves the one-byte key index
//!    characteristic to the controlling half.
//!
//! Communication with the event loop is done via Embassy channels defined
//! in the crate root.

pub mod bonder;
pub mod central;
pub mod hid_service;
pub mod peripheral;

use core::mem;

use defmt::warn;
use ergolink::{config, BleError, Error};
use ergolink::link::{AddressKind, PeerAddress};
use nrf_softdevice::ble::peripheral::Config as AdvConfig;
use nrf_softdevice::ble::{Address, AddressType, TxPower};
use nrf_softdevice::{raw, Config, Softdevice};

/// SoftDevice configuration shared by both halves.
pub fn softdevice_config(device_name: &'static str) -> Config {
    Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 2,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 1,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: device_name.as_ptr() as _,
            current_len: device_name.len() as u16,
            max_len: device_name.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// Log a SoftDevice failure under the crate's error kinds.
pub fn report_failure<E: defmt::Format>(kind: BleError, cause: E) {
    warn!("{:?}: {:?}", Error::from(kind), cause);
}

/// Background task of nrf_softdevice
#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Advertising parameters: fast for a while after boot or disconnect, then
/// slow until someone connects.
pub fn adv_config(fast: bool) -> AdvConfig {
    AdvConfig {
        interval: if fast {
            config::ADV_INTERVAL_FAST
        } else {
            config::ADV_INTERVAL_SLOW
        },
        // 10 ms units
        timeout: fast.then_some((config::ADV_FAST_TIMEOUT_SECS * 100) as u16),
        tx_power: TxPower::ZerodBm,
        ..Default::default()
    }
}

pub fn to_address(peer: &PeerAddress) -> Address {
    let kind = match peer.kind {
        AddressKind::Public => AddressType::Public,
        AddressKind::RandomStatic => AddressType::RandomStatic,
        AddressKind::RandomPrivateResolvable => AddressType::RandomPrivateResolvable,
        AddressKind::RandomPrivateNonResolvable => AddressType::RandomPrivateNonResolvable,
    };
    Address::new(kind, peer.bytes)
}

pub fn from_address(addr: &Address) -> PeerAddress {
    let kind = match addr.address_type() {
        AddressType::Public => AddressKind::Public,
        AddressType::RandomPrivateResolvable => AddressKind::RandomPrivateResolvable,
        AddressType::RandomPrivateNonResolvable => AddressKind::RandomPrivateNonResolvable,
        _ => AddressKind::RandomStatic,
    };
    PeerAddress::new(kind, addr.bytes())
}

const MANUFACTURER_NAME: &[u8] = config::MANUFACTURER_NAME.as_bytes();
const MODEL_NUMBER: &[u8] = config::DEVICE_MODEL.as_bytes();

/// Device Information Service, served by both halves.
#[nrf_softdevice::gatt_service(uuid = "180a")]
pub struct DeviceInformationService {
    #[characteristic(uuid = "2a29", initial_value = "MANUFACTURER_NAME", read)]
    pub manufacturer_name: [u8; MANUFACTURER_NAME.len()],
    #[characteristic(uuid = "2a24", initial_value = "MODEL_NUMBER", read)]
    pub model_number: [u8; MODEL_NUMBER.len()],
}

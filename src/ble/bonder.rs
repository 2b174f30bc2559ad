//! In-RAM bond store for host connections.
//!
//! Each bond keeps the host's keys plus the GATT system attributes (CCCD
//! state) captured when the host disconnects, so a reconnecting host gets
//! its input report subscription back without writing the CCCD again.
//! Bonds survive reconnects but not power cycles.

use core::cell::RefCell;

use defmt::{debug, info, warn};
use ergolink::config::{MAX_BONDED_HOSTS, SYS_ATTRS_CAPACITY};
use heapless::Vec;
use nrf_softdevice::ble::gatt_server::{get_sys_attrs, set_sys_attrs};
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{Connection, EncryptionInfo, IdentityKey, MasterId, SecurityMode};
use static_cell::StaticCell;

/// A bonded host and the attribute state it left behind.
struct HostBond {
    master_id: MasterId,
    key: EncryptionInfo,
    identity: IdentityKey,
    sys_attrs: Vec<u8, SYS_ATTRS_CAPACITY>,
}

impl HostBond {
    fn is_host(&self, conn: &Connection) -> bool {
        self.identity.is_match(conn.peer_address())
    }
}

/// Security handler for the host link. Oldest bond goes first when full.
pub struct Bonder {
    hosts: RefCell<Vec<HostBond, MAX_BONDED_HOSTS>>,
}

impl Bonder {
    fn new() -> Self {
        Self {
            hosts: RefCell::new(Vec::new()),
        }
    }

    /// Capture `conn`'s current system attributes into its bond, if bonded.
    pub fn store_sys_attrs(&self, conn: &Connection) {
        let mut hosts = self.hosts.borrow_mut();
        let Some(bond) = hosts.iter_mut().find(|h| h.is_host(conn)) else {
            debug!("Host {} not bonded, CCCD state not kept", conn.peer_address());
            return;
        };

        let mut buf = [0u8; SYS_ATTRS_CAPACITY];
        match get_sys_attrs(conn, &mut buf) {
            Ok(len) if bond.sys_attrs.as_slice() != &buf[..len] => {
                bond.sys_attrs.clear();
                // len never exceeds buf, which matches the capacity
                let _ = bond.sys_attrs.extend_from_slice(&buf[..len]);
                debug!("Stored {} bytes of system attributes", len);
            }
            Ok(_) => {}
            Err(e) => warn!("Reading system attributes failed: {:?}", e),
        }
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        IoCapabilities::None
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        true
    }

    fn on_bonded(&self, conn: &Connection, master_id: MasterId, key: EncryptionInfo, identity: IdentityKey) {
        info!("Host bonded: {}", identity.addr);
        {
            let mut hosts = self.hosts.borrow_mut();
            match hosts
                .iter_mut()
                .find(|h| h.master_id == master_id || h.identity.is_match(identity.addr))
            {
                Some(bond) => {
                    bond.master_id = master_id;
                    bond.key = key;
                    bond.identity = identity;
                }
                None => {
                    if hosts.is_full() {
                        hosts.remove(0);
                    }
                    let _ = hosts.push(HostBond {
                        master_id,
                        key,
                        identity,
                        sys_attrs: Vec::new(),
                    });
                }
            }
        }
        self.store_sys_attrs(conn);
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        self.hosts
            .borrow()
            .iter()
            .find_map(|h| (h.master_id == master_id).then_some(h.key))
    }

    fn save_sys_attrs(&self, conn: &Connection) {
        self.store_sys_attrs(conn);
    }

    fn load_sys_attrs(&self, conn: &Connection) {
        let hosts = self.hosts.borrow();
        let attrs = hosts
            .iter()
            .find(|h| h.is_host(conn) && !h.sys_attrs.is_empty())
            .map(|h| h.sys_attrs.as_slice());
        debug!("Restoring system attributes: {}", attrs.is_some());
        if let Err(e) = set_sys_attrs(conn, attrs) {
            warn!("Setting system attributes failed: {:?}", e);
        }
    }

    fn on_security_update(&self, _conn: &Connection, mode: SecurityMode) {
        info!("BLE security mode updated: {}", mode);
    }
}

pub fn bonder() -> &'static Bonder {
    static BONDER: StaticCell<Bonder> = StaticCell::new();
    BONDER.init(Bonder::new())
}

//! Build-time role of this keyboard half.

use crate::config;

#[cfg(all(feature = "split", feature = "peripheral"))]
compile_error!("features `split` and `peripheral` are mutually exclusive");

/// What this half does on the radio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Stand-alone keyboard: local keys only, reports to the host.
    Central,
    /// Controlling half: reports to the host and links to the other half.
    CentralWithLink,
    /// Publishes its key index to the controlling half; never talks HID.
    Peripheral,
}

impl Role {
    /// Role selected by the enabled Cargo features.
    pub const fn configured() -> Self {
        if cfg!(feature = "peripheral") {
            Role::Peripheral
        } else if cfg!(feature = "split") {
            Role::CentralWithLink
        } else {
            Role::Central
        }
    }

    /// Whether this half runs the link manager (scans for the other half).
    pub const fn has_link(self) -> bool {
        matches!(self, Role::CentralWithLink)
    }

    /// Whether this half sends HID reports to the host.
    pub const fn reports_to_host(self) -> bool {
        !matches!(self, Role::Peripheral)
    }

    /// GAP device name advertised for this role.
    pub const fn device_name(self) -> &'static str {
        match self {
            Role::Central | Role::CentralWithLink => config::CENTRAL_DEVICE_NAME,
            Role::Peripheral => config::PERIPHERAL_DEVICE_NAME,
        }
    }

    /// Key indices produced by this half's matrix.
    pub const fn matrix(self) -> &'static [[i8; config::MATRIX_COLS]; config::MATRIX_ROWS] {
        match self {
            Role::Central | Role::CentralWithLink => &config::CENTRAL_MATRIX,
            Role::Peripheral => &config::PERIPHERAL_MATRIX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_linked_central_scans() {
        assert!(Role::CentralWithLink.has_link());
        assert!(!Role::Central.has_link());
        assert!(!Role::Peripheral.has_link());
    }

    #[test]
    fn peripheral_never_reports_to_host() {
        assert!(Role::Central.reports_to_host());
        assert!(Role::CentralWithLink.reports_to_host());
        assert!(!Role::Peripheral.reports_to_host());
    }

    #[test]
    fn halves_cover_disjoint_key_indices() {
        let central = Role::CentralWithLink.matrix();
        let peripheral = Role::Peripheral.matrix();
        for row in central.iter() {
            for index in row.iter() {
                assert!(peripheral.iter().all(|r| !r.contains(index)));
            }
        }
        let max = central
            .iter()
            .chain(peripheral.iter())
            .flat_map(|r| r.iter())
            .copied()
            .max();
        assert_eq!(max, Some(config::MAX_KEY_INDEX));
    }

    #[test]
    fn device_name_follows_role() {
        assert_eq!(Role::Central.device_name(), "ErgoTravel");
        assert_eq!(
            Role::Peripheral.device_name(),
            "ErgoTravel - Peripheral Side"
        );
    }

    #[test]
    fn test_build_is_a_linked_central() {
        // dev-dependencies enable `split`
        assert_eq!(Role::configured(), Role::CentralWithLink);
    }
}

//! Advertisement parsing and the central's scan filter.

use crate::config;

use super::AdvReport;

/// A 128-bit service UUID in the little-endian byte order it has on air.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Uuid128(pub [u8; 16]);

impl Uuid128 {
    /// From the UUID written as one big-endian number,
    /// e.g. `0xD2E52F8B_564D_4F11_A4DE_411FF1B6EAC6`.
    pub const fn from_u128(value: u128) -> Self {
        Uuid128(value.to_le_bytes())
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

// AD types
const AD_INCOMPLETE_UUID128: u8 = 0x06;
const AD_COMPLETE_UUID128: u8 = 0x07;

/// Walk the AD structures, yielding `(ad_type, payload)`.
///
/// Stops at the first zero-length or truncated structure.
fn ad_structures(data: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut i = 0;
    core::iter::from_fn(move || {
        let len = *data.get(i)? as usize;
        if len == 0 || i + len >= data.len() {
            return None;
        }
        let ad_type = data[i + 1];
        let payload = &data[i + 2..i + 1 + len];
        i += len + 1;
        Some((ad_type, payload))
    })
}

/// Check if raw advertisement data lists the given 128-bit service UUID.
pub fn contains_uuid128(data: &[u8], uuid: &Uuid128) -> bool {
    ad_structures(data)
        .filter(|(ty, _)| *ty == AD_INCOMPLETE_UUID128 || *ty == AD_COMPLETE_UUID128)
        .any(|(_, payload)| {
            payload
                .chunks_exact(16)
                .any(|chunk| chunk == uuid.as_bytes())
        })
}

/// Scan settings and the filter applied to each advertisement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanParams {
    /// Weaker adverts (dBm) are ignored.
    pub rssi_floor: i8,
    /// 0.625 ms units.
    pub interval: u16,
    /// 0.625 ms units.
    pub window: u16,
    /// Scanning stops after this many seconds without a match.
    pub timeout_secs: u16,
    /// Request scan responses.
    pub active: bool,
    /// Also accept the Nordic UART service UUID.
    pub match_uart_service: bool,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            rssi_floor: config::SCAN_RSSI_FLOOR,
            interval: config::SCAN_INTERVAL,
            window: config::SCAN_WINDOW,
            timeout_secs: config::SCAN_TIMEOUT_SECS,
            active: config::SCAN_ACTIVE,
            match_uart_service: config::SCAN_MATCH_UART_SERVICE,
        }
    }
}

impl ScanParams {
    /// Whether `report` comes from a half worth connecting to.
    pub fn matches(&self, report: &AdvReport) -> bool {
        if report.rssi < self.rssi_floor {
            return false;
        }
        contains_uuid128(&report.data, &config::LINK_SERVICE_UUID)
            || (self.match_uart_service
                && contains_uuid128(&report.data, &config::UART_SERVICE_UUID))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::PeerAddress;

    fn uuid128_ad(uuid: &Uuid128) -> [u8; 18] {
        let mut ad = [0u8; 18];
        ad[0] = 17;
        ad[1] = AD_COMPLETE_UUID128;
        ad[2..].copy_from_slice(uuid.as_bytes());
        ad
    }

    fn report(rssi: i8, data: &[u8]) -> AdvReport {
        AdvReport::new(PeerAddress::random_static([1, 2, 3, 4, 5, 6]), rssi, data)
    }

    #[test]
    fn uuid_is_stored_little_endian() {
        let uuid = Uuid128::from_u128(0x00112233_4455_6677_8899_AABBCCDDEEFF);
        assert_eq!(uuid.0[0], 0xFF);
        assert_eq!(uuid.0[15], 0x00);
    }

    #[test]
    fn detect_link_service_uuid() {
        let ad = uuid128_ad(&config::LINK_SERVICE_UUID);
        assert!(contains_uuid128(&ad, &config::LINK_SERVICE_UUID));
        assert!(!contains_uuid128(&ad, &config::UART_SERVICE_UUID));
    }

    #[test]
    fn detect_uuid_after_flags_and_name() {
        let mut ad = std::vec![0x02, 0x01, 0x06, 0x03, 0x09, b'E', b'T'];
        ad.extend_from_slice(&uuid128_ad(&config::LINK_SERVICE_UUID));
        assert!(contains_uuid128(&ad, &config::LINK_SERVICE_UUID));
    }

    #[test]
    fn incomplete_uuid128_list_is_checked() {
        let mut ad = uuid128_ad(&config::LINK_SERVICE_UUID);
        ad[1] = AD_INCOMPLETE_UUID128;
        assert!(contains_uuid128(&ad, &config::LINK_SERVICE_UUID));
    }

    #[test]
    fn malformed_lengths_stop_parsing() {
        assert!(!contains_uuid128(&[], &config::LINK_SERVICE_UUID));
        assert!(!contains_uuid128(&[0x00], &config::LINK_SERVICE_UUID));

        // claims 17 bytes but only carries 4
        let truncated = [0x11, 0x07, 0xC6, 0xEA, 0xB6, 0xF1];
        assert!(!contains_uuid128(&truncated, &config::LINK_SERVICE_UUID));
    }

    #[test]
    fn filter_accepts_near_link_service() {
        let params = ScanParams::default();
        let ad = uuid128_ad(&config::LINK_SERVICE_UUID);
        assert!(params.matches(&report(-60, &ad)));
        assert!(params.matches(&report(config::SCAN_RSSI_FLOOR, &ad)));
    }

    #[test]
    fn filter_rejects_distant_adverts() {
        let params = ScanParams::default();
        let ad = uuid128_ad(&config::LINK_SERVICE_UUID);
        assert!(!params.matches(&report(-81, &ad)));
    }

    #[test]
    fn filter_rejects_other_services() {
        let params = ScanParams::default();
        assert!(!params.matches(&report(-40, &[0x03, 0x03, 0x12, 0x18])));
    }

    #[test]
    fn uart_service_only_matches_when_enabled() {
        let ad = uuid128_ad(&config::UART_SERVICE_UUID);
        let strict = ScanParams {
            match_uart_service: false,
            ..Default::default()
        };
        let lenient = ScanParams {
            match_uart_service: true,
            ..Default::default()
        };
        assert!(!strict.matches(&report(-50, &ad)));
        assert!(lenient.matches(&report(-50, &ad)));
    }
}

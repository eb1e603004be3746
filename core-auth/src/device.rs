//! Device identifiers.
//!
//! Two different ids are involved in a session. The string id is presented at
//! login and bound to the long-lived token; it comes from the host hardware or
//! is synthesized from the login name. The numeric stream id is read back from
//! the account's registered devices and selects the device-bound stream path.

use bridge_traits::RemoteDevice;
use sha2::{Digest, Sha256};

/// Device type whose id is used for stream requests.
const STREAM_DEVICE_TYPE: &str = "PHONE";

const SYNTHESIZED_ID_LEN: usize = 16;

/// Numeric stream device id from the account's device list.
///
/// Picks the most recently used phone, strips an optional `0x` prefix and
/// parses the rest as hex. Returns 0 when there is no phone or its id does not
/// parse.
pub fn resolve_stream_device_id(devices: &[RemoteDevice]) -> u64 {
    devices
        .iter()
        .filter(|device| device.device_type.eq_ignore_ascii_case(STREAM_DEVICE_TYPE))
        .max_by_key(|device| device.last_used_millis)
        .and_then(|device| parse_hex_id(&device.id))
        .unwrap_or(0)
}

fn parse_hex_id(id: &str) -> Option<u64> {
    let digits = id.strip_prefix("0x").unwrap_or(id);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Stable device id for hosts without a hardware-derived one.
///
/// Derived from the login name, so the same account always presents the same
/// device across runs and machines.
pub fn synthesize_device_id(login: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(login.trim().to_lowercase().as_bytes()));
    digest[..SYNTHESIZED_ID_LEN].to_string()
}

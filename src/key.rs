//! Correlation keys binding one dispatched event to its eventual envelope.
//!
//! A key is `{event_name}-{unix_millis}-{suffix}` where the suffix is 12 base36
//! characters drawn from the random bits of a v4 UUID (62 bits of entropy).

use time::OffsetDateTime;
use uuid::Uuid;

const SUFFIX_LEN: usize = 12;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const LOW_56_BITS: u128 = (1 << 56) - 1;

/// Generates a fresh correlation key for `event_name` using the wall clock.
#[must_use]
pub fn generate_key(event_name: &str) -> String {
    generate_key_at(event_name, unix_millis())
}

/// Generates a correlation key for `event_name` stamped with `millis`.
#[must_use]
pub fn generate_key_at(event_name: &str, millis: u64) -> String {
    format!("{event_name}-{millis}-{}", random_suffix())
}

/// Milliseconds since the Unix epoch, saturating at zero for clocks before 1970.
#[must_use]
pub fn unix_millis() -> u64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    u64::try_from(nanos / 1_000_000).unwrap_or(0)
}

fn random_suffix() -> String {
    // Bytes 6 and 8 of a v4 UUID carry version/variant bits; skip them.
    let bits = Uuid::new_v4().as_u128();
    let mut value = (bits & LOW_56_BITS) | (((bits >> 80) & 0x3f) << 56);

    let mut digits = [b'0'; SUFFIX_LEN];
    for slot in digits.iter_mut().rev() {
        *slot = BASE36[(value % 36) as usize];
        value /= 36;
    }

    digits.iter().map(|&digit| char::from(digit)).collect()
}

//! Network time: seconds since the graphset epoch.
//!
//! Message timestamps are 32-bit seconds relative to a fixed epoch rather
//! than the Unix epoch, which keeps them inside the 4-byte field of the
//! tsHash for the next ~136 years.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CoreError;

/// The network epoch: 2021-01-01T00:00:00Z, in Unix milliseconds.
pub const NETWORK_EPOCH_MS: u64 = 1_609_459_200_000;

/// Current network time in seconds.
pub fn network_time_now() -> Result<u64, CoreError> {
    let unix_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| CoreError::MalformedMessage(format!("system clock before epoch: {e}")))?
        .as_millis() as u64;
    to_network_time(unix_ms)
}

/// Convert a Unix-milliseconds instant to network seconds.
pub fn to_network_time(unix_ms: u64) -> Result<u64, CoreError> {
    if unix_ms < NETWORK_EPOCH_MS {
        return Err(CoreError::MalformedMessage(
            "timestamp predates the network epoch".into(),
        ));
    }
    Ok((unix_ms - NETWORK_EPOCH_MS) / 1000)
}

/// Convert network seconds back to Unix milliseconds.
pub fn from_network_time(seconds: u64) -> u64 {
    NETWORK_EPOCH_MS + seconds * 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_is_zero() {
        assert_eq!(to_network_time(NETWORK_EPOCH_MS).unwrap(), 0);
    }

    #[test]
    fn test_roundtrip() {
        let seconds = 12_345_678;
        assert_eq!(to_network_time(from_network_time(seconds)).unwrap(), seconds);
    }

    #[test]
    fn test_pre_epoch_rejected() {
        assert!(to_network_time(NETWORK_EPOCH_MS - 1).is_err());
    }

    #[test]
    fn test_now_is_positive() {
        assert!(network_time_now().unwrap() > 0);
    }
}

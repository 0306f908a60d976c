//! Time utilities for Amorce.
//!
//! Internal timestamps are Unix epoch microseconds (u64). Envelope
//! metadata uses RFC 3339 UTC strings on the wire.

/// Return the current time as microseconds since Unix epoch.
pub fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_micros() as u64
}

/// Return the current time as an RFC 3339 UTC string.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

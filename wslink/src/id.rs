//!
//! Client identifier generation (spec §3 "Client ID").
//!

use std::fmt::Write;

/// Opaque per-connection identifier: 128 random bits rendered as 32
/// lowercase hex characters with no separators.
pub type ClientId = String;

pub fn generate_client_id() -> ClientId {
    let bytes: [u8; 16] = rand::random();
    let mut out = String::with_capacity(32);
    for byte in bytes {
        write!(out, "{byte:02x}").expect("write to String never fails");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_32_hex_chars() {
        let id = generate_client_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generates_distinct_ids() {
        let a = generate_client_id();
        let b = generate_client_id();
        assert_ne!(a, b);
    }
}

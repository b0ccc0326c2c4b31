//! SECS-I control characters (SEMI E4)
//!
//! The link-protocol engine hunts for these bytes with filtered polls while
//! it waits for a handshake step.

/// Enquiry: a sender requests the line
pub const ENQ: u8 = 0x05;

/// End of transmission: the receiver grants the line
pub const EOT: u8 = 0x04;

/// Acknowledge: the block was received correctly
pub const ACK: u8 = 0x06;

/// Negative acknowledge: the block was rejected
pub const NAK: u8 = 0x15;

/// All control characters
pub const ALL: [u8; 4] = [ENQ, EOT, ACK, NAK];

/// Get human-readable control character name
pub fn name(byte: u8) -> Option<&'static str> {
    match byte {
        ENQ => Some("ENQ"),
        EOT => Some("EOT"),
        ACK => Some("ACK"),
        NAK => Some("NAK"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(name(ENQ), Some("ENQ"));
        assert_eq!(name(NAK), Some("NAK"));
        assert_eq!(name(0x41), None);
        assert!(ALL.iter().all(|&b| name(b).is_some()));
    }
}

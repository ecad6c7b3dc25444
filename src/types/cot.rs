//! IEC 60870-5-104 Cause of Transmission (COT).
//!
//! The cause of transmission defines the reason for sending an ASDU. The
//! P/N and test flags share the COT octet but belong to the ASDU header;
//! see [`crate::types::AsduHeader`].

use crate::error::{Iec104Error, Result};

/// Cause of Transmission (COT).
///
/// Closed set of causes handled by this codec; any other cause id in the
/// low 6 bits of the COT octet fails with [`Iec104Error::UnknownCot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Cot {
    /// Periodic, cyclic (1)
    Periodic = 1,

    /// Spontaneous (3)
    Spontaneous = 3,

    /// Request or requested (5)
    Request = 5,

    /// Activation (6)
    Activation = 6,

    /// Activation confirmation (7)
    ActivationConfirm = 7,

    /// Return information caused by a remote command (11)
    ReturnRemoteCommand = 11,
}

impl Cot {
    /// Create COT from raw byte value (lower 6 bits; P/N and test bits
    /// are ignored here).
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        let cause_id = value & 0x3F;

        match cause_id {
            1 => Ok(Self::Periodic),
            3 => Ok(Self::Spontaneous),
            5 => Ok(Self::Request),
            6 => Ok(Self::Activation),
            7 => Ok(Self::ActivationConfirm),
            11 => Ok(Self::ReturnRemoteCommand),
            _ => Err(Iec104Error::UnknownCot { cot: cause_id }),
        }
    }

    /// Convert to raw byte value.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this cause belongs to the command activation dialogue.
    #[inline]
    pub const fn is_command_dialogue(&self) -> bool {
        matches!(
            self,
            Self::Activation | Self::ActivationConfirm | Self::ReturnRemoteCommand
        )
    }
}

impl std::fmt::Display for Cot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Periodic => write!(f, "Periodic"),
            Self::Spontaneous => write!(f, "Spontaneous"),
            Self::Request => write!(f, "Request"),
            Self::Activation => write!(f, "Activation"),
            Self::ActivationConfirm => write!(f, "ActivationConfirm"),
            Self::ReturnRemoteCommand => write!(f, "ReturnRemoteCommand"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cot_roundtrip() {
        for val in [1, 3, 5, 6, 7, 11] {
            let cot = Cot::from_u8(val).unwrap();
            assert_eq!(cot.as_u8(), val, "roundtrip failed for value {val}");
        }
    }

    #[test]
    fn test_cot_invalid_values() {
        for val in [0, 2, 4, 8, 9, 10, 12, 20, 44, 63] {
            assert_eq!(
                Cot::from_u8(val),
                Err(Iec104Error::UnknownCot { cot: val }),
                "expected error for cause {val}"
            );
        }
    }

    #[test]
    fn test_cot_upper_bits_masked() {
        // P/N bit set: 64 + 1 -> Periodic
        assert_eq!(Cot::from_u8(65).unwrap(), Cot::Periodic);
        // Test bit set: 128 + 1 -> Periodic
        assert_eq!(Cot::from_u8(129).unwrap(), Cot::Periodic);
        // Both set on Activation
        assert_eq!(Cot::from_u8(0xC6).unwrap(), Cot::Activation);
    }

    #[test]
    fn test_cot_command_dialogue() {
        assert!(Cot::Activation.is_command_dialogue());
        assert!(Cot::ActivationConfirm.is_command_dialogue());
        assert!(Cot::ReturnRemoteCommand.is_command_dialogue());
        assert!(!Cot::Periodic.is_command_dialogue());
        assert!(!Cot::Spontaneous.is_command_dialogue());
    }

    #[test]
    fn test_cot_display() {
        assert_eq!(Cot::Periodic.to_string(), "Periodic");
        assert_eq!(Cot::Spontaneous.to_string(), "Spontaneous");
        assert_eq!(Cot::ActivationConfirm.to_string(), "ActivationConfirm");
    }
}

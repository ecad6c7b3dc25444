//! IEC 60870-5-104 Type Identification.
//!
//! Type identification defines the structure and meaning of information objects.

use crate::error::{Iec104Error, Result};

/// IEC 60870-5-104 Type Identification.
///
/// Closed set of the type identifications handled by this codec. Decoding
/// any other identification fails with [`Iec104Error::UnknownTypeId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeId {
    /// Bitstring of 32 bit (M_BO_NA_1)
    Bitstring32 = 7,

    /// Measured value, short floating point (M_ME_NC_1)
    MeasuredFloat = 13,

    /// Single command (C_SC_NA_1)
    SingleCommand = 45,

    /// Interrogation command (C_IC_NA_1)
    InterrogationCommand = 100,

    /// Read command (C_RD_NA_1)
    ReadCommand = 102,
}

impl TypeId {
    /// Create TypeId from raw byte value.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            7 => Ok(Self::Bitstring32),
            13 => Ok(Self::MeasuredFloat),
            45 => Ok(Self::SingleCommand),
            100 => Ok(Self::InterrogationCommand),
            102 => Ok(Self::ReadCommand),
            _ => Err(Iec104Error::UnknownTypeId { type_id: value }),
        }
    }

    /// Convert to raw byte value.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this type is in the monitoring direction (from RTU to master).
    #[inline]
    pub const fn is_monitoring(&self) -> bool {
        matches!(self, Self::Bitstring32 | Self::MeasuredFloat)
    }

    /// Check if this type is in the control direction (from master to RTU).
    #[inline]
    pub const fn is_control(&self) -> bool {
        !self.is_monitoring()
    }

    /// Check if this type permits the SQ=1 sequence encoding (one address
    /// covering a run of elements at consecutive addresses).
    #[inline]
    pub const fn supports_sequence(&self) -> bool {
        matches!(self, Self::Bitstring32 | Self::MeasuredFloat)
    }

    /// Byte length of one element payload, excluding the object address.
    #[inline]
    pub const fn element_len(&self) -> usize {
        match self {
            Self::Bitstring32 => 5,          // 4-byte bitstring + QDS
            Self::MeasuredFloat => 5,        // IEEE 754 binary32 + QDS
            Self::SingleCommand => 1,        // SCO
            Self::InterrogationCommand => 1, // QOI
            Self::ReadCommand => 0,          // address only
        }
    }

    /// Get the IEC standard name (e.g., "M_BO_NA_1").
    #[inline]
    pub const fn standard_name(&self) -> &'static str {
        match self {
            Self::Bitstring32 => "M_BO_NA_1",
            Self::MeasuredFloat => "M_ME_NC_1",
            Self::SingleCommand => "C_SC_NA_1",
            Self::InterrogationCommand => "C_IC_NA_1",
            Self::ReadCommand => "C_RD_NA_1",
        }
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.standard_name())
    }
}

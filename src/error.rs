//! Error types for the IEC 60870-5-104 codec.

use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Iec104Error>;

/// IEC 60870-5-104 codec error taxonomy.
///
/// Every fallible operation in this crate reports one of these variants.
/// The set is closed: decoding an APDU can only fail in the ways the wire
/// format allows, and encoding can only fail on a range or structure
/// violation of the value being serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Iec104Error {
    /// Start byte of the APDU header is not `0x68`.
    #[error("invalid start byte 0x{byte:02X}, expected 0x68")]
    HeaderMagic {
        /// The byte found where `0x68` was expected
        byte: u8,
    },

    /// APDU length is unusable: header not 2 bytes, declared length
    /// outside `[4, 253]`, or too short for the frame type.
    #[error("invalid APDU length {length}")]
    HeaderLength {
        /// The offending length value
        length: usize,
    },

    /// A numeric field is outside its allowed range.
    #[error("{field} out of range: {value} not in {min}..={max}")]
    RangeViolation {
        /// Name of the violated field
        field: &'static str,
        /// The rejected value
        value: u32,
        /// Lowest allowed value
        min: u32,
        /// Highest allowed value
        max: u32,
    },

    /// Control field matches none of the I/S/U frame formats.
    #[error("unrecognized control field 0x{control:02X}")]
    UnknownFrame {
        /// First control-field byte
        control: u8,
    },

    /// U-frame function byte is not in the closed function set.
    #[error("unknown U-frame function 0x{control:02X}")]
    UnknownFunction {
        /// First control-field byte
        control: u8,
    },

    /// Type identification is not in the closed type set.
    #[error("unknown type identification {type_id}")]
    UnknownTypeId {
        /// The rejected type identification
        type_id: u8,
    },

    /// Cause of transmission is not in the closed cause set.
    #[error("unknown cause of transmission {cot}")]
    UnknownCot {
        /// The rejected cause id (low 6 bits of the COT octet)
        cot: u8,
    },

    /// Declared size of the information-object region disagrees with the
    /// size implied by the type identification and the VSQ.
    #[error("information object region length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Size implied by type id, SQ bit and element count
        expected: usize,
        /// Size actually present
        actual: usize,
    },

    /// VSQ announced zero information objects but payload bytes remain.
    #[error("{residual} residual bytes after ASDU header with zero objects")]
    UnexpectedPayload {
        /// Number of unexplained bytes
        residual: usize,
    },

    /// Sequence encoding requested for a type that forbids it, or a
    /// command type with an element count other than one.
    #[error("type identification {type_id} does not permit this structure")]
    TypeSequenceIllegal {
        /// The offending type identification
        type_id: u8,
    },

    /// Element count is zero or exceeds the 7-bit VSQ maximum.
    #[error("information object count {count} out of range")]
    CountOutOfRange {
        /// The rejected count
        count: usize,
    },

    /// I/O failure surfaced by a stream transport driving the codec.
    ///
    /// Only the [`std::io::ErrorKind`] is retained, which keeps this
    /// type `Copy` and comparable in tests.
    #[error("I/O error: {kind}")]
    Io {
        /// Kind of the underlying I/O error
        kind: std::io::ErrorKind,
    },
}

impl From<std::io::Error> for Iec104Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io { kind: err.kind() }
    }
}

impl Iec104Error {
    /// Check if this error was raised by the 2-byte start header.
    #[inline]
    pub const fn is_header_error(&self) -> bool {
        matches!(self, Self::HeaderMagic { .. } | Self::HeaderLength { .. })
    }

    /// Check if this error names an identifier outside a closed set.
    #[inline]
    pub const fn is_unknown_code(&self) -> bool {
        matches!(
            self,
            Self::UnknownFrame { .. }
                | Self::UnknownFunction { .. }
                | Self::UnknownTypeId { .. }
                | Self::UnknownCot { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Iec104Error::HeaderMagic { byte: 0x60 };
        assert_eq!(err.to_string(), "invalid start byte 0x60, expected 0x68");

        let err = Iec104Error::RangeViolation {
            field: "send sequence number",
            value: 32768,
            min: 0,
            max: 32767,
        };
        assert_eq!(
            err.to_string(),
            "send sequence number out of range: 32768 not in 0..=32767"
        );

        let err = Iec104Error::LengthMismatch {
            expected: 16,
            actual: 13,
        };
        assert!(err.to_string().contains("expected 16"));
        assert!(err.to_string().contains("got 13"));
    }

    #[test]
    fn test_error_display_all_variants() {
        let errors = [
            Iec104Error::HeaderMagic { byte: 0x60 },
            Iec104Error::HeaderLength { length: 254 },
            Iec104Error::RangeViolation {
                field: "common address",
                value: 0,
                min: 1,
                max: 65535,
            },
            Iec104Error::UnknownFrame { control: 0x15 },
            Iec104Error::UnknownFunction { control: 0x0F },
            Iec104Error::UnknownTypeId { type_id: 255 },
            Iec104Error::UnknownCot { cot: 63 },
            Iec104Error::LengthMismatch {
                expected: 8,
                actual: 5,
            },
            Iec104Error::UnexpectedPayload { residual: 16 },
            Iec104Error::TypeSequenceIllegal { type_id: 102 },
            Iec104Error::CountOutOfRange { count: 128 },
        ];

        for err in errors {
            assert!(!err.to_string().is_empty(), "empty Display for {err:?}");
        }
    }

    #[test]
    fn test_io_error_conversion() {
        use std::io::{Error as IoError, ErrorKind};
        let io_err = IoError::new(ErrorKind::ConnectionReset, "reset");
        let err: Iec104Error = io_err.into();
        assert_eq!(
            err,
            Iec104Error::Io {
                kind: ErrorKind::ConnectionReset
            }
        );
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_is_header_error() {
        assert!(Iec104Error::HeaderMagic { byte: 0 }.is_header_error());
        assert!(Iec104Error::HeaderLength { length: 300 }.is_header_error());
        assert!(!Iec104Error::UnknownFrame { control: 0x15 }.is_header_error());
        assert!(!Iec104Error::CountOutOfRange { count: 0 }.is_header_error());
    }

    #[test]
    fn test_is_unknown_code() {
        assert!(Iec104Error::UnknownFrame { control: 0x15 }.is_unknown_code());
        assert!(Iec104Error::UnknownFunction { control: 0x0F }.is_unknown_code());
        assert!(Iec104Error::UnknownTypeId { type_id: 1 }.is_unknown_code());
        assert!(Iec104Error::UnknownCot { cot: 2 }.is_unknown_code());
        assert!(!Iec104Error::HeaderMagic { byte: 0 }.is_unknown_code());
    }
}

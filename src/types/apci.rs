//! IEC 60870-5-104 APCI (Application Protocol Control Information).
//!
//! APCI is the 4-byte control field of an APDU, carrying the frame type
//! and sequence numbers.

use crate::error::{Iec104Error, Result};

/// Start byte for IEC 104 frames.
pub const START_BYTE: u8 = 0x68;

/// Minimum APDU length (APCI only, no ASDU).
pub const MIN_APDU_LENGTH: usize = 4;

/// Maximum APDU length.
pub const MAX_APDU_LENGTH: usize = 253;

/// Minimum APDU length of an I-frame (APCI + 6-byte ASDU header).
pub const MIN_I_FRAME_LENGTH: usize = 10;

/// Maximum send/receive sequence number (15 bits).
pub const MAX_SEQ: u16 = 32767;

/// U-frame function codes.
///
/// The control byte of every function carries `11` in its low two bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UFunction {
    /// STARTDT act (Start Data Transfer activation)
    StartDtAct,
    /// STARTDT con (Start Data Transfer confirmation)
    StartDtCon,
    /// STOPDT act (Stop Data Transfer activation)
    StopDtAct,
    /// STOPDT con (Stop Data Transfer confirmation)
    StopDtCon,
    /// TESTFR act (Test Frame activation)
    TestFrAct,
    /// TESTFR con (Test Frame confirmation)
    TestFrCon,
    /// No function active (bare frame-format bits)
    NoFunc,
}

impl UFunction {
    /// Get the control field byte for this U-function.
    pub const fn control_byte(&self) -> u8 {
        match self {
            Self::StartDtAct => 0x07, // 0000 0111
            Self::StartDtCon => 0x0B, // 0000 1011
            Self::StopDtAct => 0x13,  // 0001 0011
            Self::StopDtCon => 0x23,  // 0010 0011
            Self::TestFrAct => 0x43,  // 0100 0011
            Self::TestFrCon => 0x83,  // 1000 0011
            Self::NoFunc => 0x03,     // 0000 0011
        }
    }

    /// Parse U-function from control byte.
    pub fn from_control_byte(byte: u8) -> Result<Self> {
        match byte {
            0x07 => Ok(Self::StartDtAct),
            0x0B => Ok(Self::StartDtCon),
            0x13 => Ok(Self::StopDtAct),
            0x23 => Ok(Self::StopDtCon),
            0x43 => Ok(Self::TestFrAct),
            0x83 => Ok(Self::TestFrCon),
            0x03 => Ok(Self::NoFunc),
            _ => Err(Iec104Error::UnknownFunction { control: byte }),
        }
    }

    /// Get the conventional name (e.g., "STARTDT_ACT").
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StartDtAct => "STARTDT_ACT",
            Self::StartDtCon => "STARTDT_CON",
            Self::StopDtAct => "STOPDT_ACT",
            Self::StopDtCon => "STOPDT_CON",
            Self::TestFrAct => "TESTFR_ACT",
            Self::TestFrCon => "TESTFR_CON",
            Self::NoFunc => "NO_FUNC",
        }
    }
}

/// APCI (Application Protocol Control Information).
///
/// The 4-byte control field of an IEC 104 APDU.
///
/// ```text
/// +--------+--------+--------+--------+--------+--------+
/// | 0x68   | Length | CF1    | CF2    | CF3    | CF4    |
/// +--------+--------+--------+--------+--------+--------+
///   Start    APDU     Control Field (4 bytes)
///   Byte     Length
/// ```
///
/// Sequence numbers are 15-bit values stored as little-endian 16-bit
/// words with the low bit of the first octet reserved for the frame
/// format (`0` = I, `01` = S, `11` = U).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apci {
    /// I-frame with send and receive sequence numbers.
    IFrame {
        /// Send sequence number (0-32767)
        send_seq: u16,
        /// Receive sequence number (0-32767)
        recv_seq: u16,
    },
    /// S-frame with receive sequence number only.
    SFrame {
        /// Receive sequence number (0-32767)
        recv_seq: u16,
    },
    /// U-frame with function code.
    UFrame {
        /// U-frame function
        function: UFunction,
    },
}

impl Apci {
    /// Create a new I-frame APCI.
    pub const fn i_frame(send_seq: u16, recv_seq: u16) -> Self {
        Self::IFrame { send_seq, recv_seq }
    }

    /// Create a new S-frame APCI.
    pub const fn s_frame(recv_seq: u16) -> Self {
        Self::SFrame { recv_seq }
    }

    /// Create a new U-frame APCI.
    pub const fn u_frame(function: UFunction) -> Self {
        Self::UFrame { function }
    }

    /// Parse APCI from the 4 bytes of the control field.
    pub fn parse(control: &[u8]) -> Result<Self> {
        if control.len() < 4 {
            return Err(Iec104Error::HeaderLength {
                length: control.len(),
            });
        }

        let cf1 = control[0];

        if cf1 & 0x01 == 0 {
            // I-frame: bit 0 = 0
            let send_seq = ((control[1] as u16) << 7) | ((cf1 >> 1) as u16);
            let recv_seq = ((control[3] as u16) << 7) | ((control[2] >> 1) as u16);
            Ok(Self::IFrame { send_seq, recv_seq })
        } else if cf1 == 0x01 {
            // S-frame: bits 0-1 = 01, upper bits of the first octet zero
            let recv_seq = ((control[3] as u16) << 7) | ((control[2] >> 1) as u16);
            Ok(Self::SFrame { recv_seq })
        } else if cf1 & 0x03 == 0x03 {
            // U-frame: bits 0-1 = 11
            let function = UFunction::from_control_byte(cf1)?;
            Ok(Self::UFrame { function })
        } else {
            Err(Iec104Error::UnknownFrame { control: cf1 })
        }
    }

    /// Encode APCI to 4 bytes of control field.
    ///
    /// Sequence numbers above 32767 do not fit the 15-bit wire slots and
    /// fail with [`Iec104Error::RangeViolation`].
    pub fn encode(&self) -> Result<[u8; 4]> {
        match self {
            Self::IFrame { send_seq, recv_seq } => {
                check_seq("send sequence number", *send_seq)?;
                check_seq("receive sequence number", *recv_seq)?;
                let cf1 = ((send_seq & 0x7F) << 1) as u8;
                let cf2 = (send_seq >> 7) as u8;
                let cf3 = ((recv_seq & 0x7F) << 1) as u8;
                let cf4 = (recv_seq >> 7) as u8;
                Ok([cf1, cf2, cf3, cf4])
            }
            Self::SFrame { recv_seq } => {
                check_seq("receive sequence number", *recv_seq)?;
                let cf3 = ((recv_seq & 0x7F) << 1) as u8;
                let cf4 = (recv_seq >> 7) as u8;
                Ok([0x01, 0x00, cf3, cf4])
            }
            Self::UFrame { function } => Ok([function.control_byte(), 0x00, 0x00, 0x00]),
        }
    }

    /// Check if this is an I-frame.
    pub const fn is_i_frame(&self) -> bool {
        matches!(self, Self::IFrame { .. })
    }

    /// Check if this is an S-frame.
    pub const fn is_s_frame(&self) -> bool {
        matches!(self, Self::SFrame { .. })
    }

    /// Check if this is a U-frame.
    pub const fn is_u_frame(&self) -> bool {
        matches!(self, Self::UFrame { .. })
    }

    /// Get the send sequence number (I-frame only).
    pub const fn send_seq(&self) -> Option<u16> {
        match self {
            Self::IFrame { send_seq, .. } => Some(*send_seq),
            _ => None,
        }
    }

    /// Get the receive sequence number (I-frame and S-frame).
    pub const fn recv_seq(&self) -> Option<u16> {
        match self {
            Self::IFrame { recv_seq, .. } | Self::SFrame { recv_seq } => Some(*recv_seq),
            _ => None,
        }
    }
}

#[inline]
fn check_seq(field: &'static str, value: u16) -> Result<()> {
    if value > MAX_SEQ {
        return Err(Iec104Error::RangeViolation {
            field,
            value: value as u32,
            min: 0,
            max: MAX_SEQ as u32,
        });
    }
    Ok(())
}

impl std::fmt::Display for Apci {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IFrame { send_seq, recv_seq } => {
                write!(f, "I(S={}, R={})", send_seq, recv_seq)
            }
            Self::SFrame { recv_seq } => {
                write!(f, "S(R={})", recv_seq)
            }
            Self::UFrame { function } => write!(f, "U({})", function.name()),
        }
    }
}

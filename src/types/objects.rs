//! Information-object payloads and the per-type object container.
//!
//! Each type identification owns a distinct element layout; the
//! [`InformationObjects`] union carries the parsed form of the whole
//! object region of an ASDU, including which of the two addressing
//! encodings (SQ=0 individual addresses, SQ=1 one address plus a run)
//! is in use.

use bytes::{BufMut, BytesMut};

use crate::error::{Iec104Error, Result};
use crate::types::asdu::{Ioa, MAX_OBJECT_COUNT};
use crate::types::TypeId;

/// Quality descriptor (QDS) for monitored values.
///
/// Wire layout: bit 0 overflow, bits 1-3 reserved (encoded 0), bit 4
/// blocked, bit 5 substituted, bit 6 not topical, bit 7 invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Qds {
    /// Overflow (OV)
    pub overflow: bool,
    /// Blocked (BL)
    pub blocked: bool,
    /// Substituted (SB)
    pub substituted: bool,
    /// Not topical (NT)
    pub not_topical: bool,
    /// Invalid (IV)
    pub invalid: bool,
}

impl Qds {
    /// Create a quality descriptor with all flags false.
    #[inline]
    pub const fn new() -> Self {
        Self {
            overflow: false,
            blocked: false,
            substituted: false,
            not_topical: false,
            invalid: false,
        }
    }

    /// Parse from QDS byte. Reserved bits 1-3 are ignored.
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        Self {
            overflow: (value & 0x01) != 0,
            blocked: (value & 0x10) != 0,
            substituted: (value & 0x20) != 0,
            not_topical: (value & 0x40) != 0,
            invalid: (value & 0x80) != 0,
        }
    }

    /// Encode to QDS byte. Reserved bits 1-3 are emitted as 0.
    #[inline]
    pub const fn as_u8(&self) -> u8 {
        let mut result = 0u8;
        if self.overflow {
            result |= 0x01;
        }
        if self.blocked {
            result |= 0x10;
        }
        if self.substituted {
            result |= 0x20;
        }
        if self.not_topical {
            result |= 0x40;
        }
        if self.invalid {
            result |= 0x80;
        }
        result
    }

    /// Check if the quality is good (all flags false).
    #[inline]
    pub const fn is_good(&self) -> bool {
        !self.overflow && !self.blocked && !self.substituted && !self.not_topical && !self.invalid
    }
}

/// Qualifier of command (QOC), the 6-bit field inside an SCO octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Qoc {
    /// Qualifier value (0-31)
    pub qualifier: u8,
    /// Select (true) / execute (false) bit
    pub select_execute: bool,
}

impl Qoc {
    /// Highest qualifier value representable in the 5-bit field.
    pub const MAX_QUALIFIER: u8 = 31;

    /// Create a new qualifier of command.
    ///
    /// Qualifier values above 31 do not fit the 5-bit wire slot and fail
    /// with [`Iec104Error::RangeViolation`].
    pub fn new(qualifier: u8, select_execute: bool) -> Result<Self> {
        if qualifier > Self::MAX_QUALIFIER {
            return Err(Iec104Error::RangeViolation {
                field: "qualifier of command",
                value: qualifier as u32,
                min: 0,
                max: Self::MAX_QUALIFIER as u32,
            });
        }
        Ok(Self {
            qualifier,
            select_execute,
        })
    }

    /// Parse from the 6-bit QOC field (low 5 bits qualifier, bit 5 S/E).
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            qualifier: bits & 0x1F,
            select_execute: (bits >> 5) & 0x01 != 0,
        }
    }

    /// Encode to the 6-bit QOC field.
    #[inline]
    pub const fn to_bits(&self) -> u8 {
        (self.qualifier & 0x1F) | ((self.select_execute as u8) << 5)
    }
}

/// Single command (SCO) element of a C_SC_NA_1 object.
///
/// Wire layout: bit 0 command state, bit 1 reserved (encoded 0),
/// bits 2-7 qualifier of command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SingleCommand {
    /// Commanded state (off/on)
    pub state: bool,
    /// Qualifier of command
    pub qualifier: Qoc,
}

impl SingleCommand {
    /// Create a new single command.
    #[inline]
    pub const fn new(state: bool, qualifier: Qoc) -> Self {
        Self { state, qualifier }
    }

    /// Parse from SCO byte. The reserved bit 1 is ignored.
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        Self {
            state: (value & 0x01) != 0,
            qualifier: Qoc::from_bits((value & 0xFC) >> 2),
        }
    }

    /// Encode to SCO byte. The reserved bit 1 is emitted as 0.
    #[inline]
    pub const fn as_u8(&self) -> u8 {
        (self.state as u8) | (self.qualifier.to_bits() << 2)
    }
}

/// Bitstring of 32 bit (BSI) element of an M_BO_NA_1 object.
///
/// The value is an opaque 4-byte slot, emitted verbatim on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitstring32 {
    /// The 4 bitstring bytes, in wire order
    pub raw: [u8; 4],
    /// Quality descriptor
    pub quality: Qds,
}

impl Bitstring32 {
    /// Create a bitstring element from exactly 4 bytes.
    #[inline]
    pub const fn new(raw: [u8; 4], quality: Qds) -> Self {
        Self { raw, quality }
    }

    /// Create a bitstring element from an arbitrary byte slice.
    ///
    /// Input longer than 4 bytes is truncated and the quality overflow
    /// flag is raised; shorter input is zero-padded. This mirrors the
    /// wire slot being fixed at 4 bytes and makes over-length input
    /// non-lossless by design of the format.
    pub fn from_payload(payload: &[u8], quality: Qds) -> Self {
        let mut raw = [0u8; 4];
        let truncated = payload.len() > 4;
        let take = payload.len().min(4);
        raw[..take].copy_from_slice(&payload[..take]);
        let mut quality = quality;
        if truncated {
            quality.overflow = true;
        }
        Self { raw, quality }
    }

    /// The bitstring as a little-endian 32-bit word.
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        u32::from_le_bytes(self.raw)
    }
}

/// Short floating point element of an M_ME_NC_1 object.
///
/// IEEE 754 binary32, little-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShortFloat {
    /// The measured value
    pub value: f32,
    /// Quality descriptor
    pub quality: Qds,
}

impl ShortFloat {
    /// Create a new short floating point element.
    #[inline]
    pub const fn new(value: f32, quality: Qds) -> Self {
        Self { value, quality }
    }
}

/// The information-object region of an ASDU, in parsed form.
///
/// The variant fixes both the type identification and the addressing
/// encoding, so a command with several objects or a sequence run of a
/// non-sequence type cannot be represented. The `Empty` variant is the
/// "no information objects" sentinel of an ASDU whose VSQ count is 0.
#[derive(Debug, Clone, PartialEq)]
pub enum InformationObjects {
    /// M_BO_NA_1, SQ=0: individually addressed bitstring elements.
    Bitstrings(Vec<(Ioa, Bitstring32)>),
    /// M_BO_NA_1, SQ=1: bitstring elements at consecutive addresses
    /// starting at `start`.
    BitstringSequence {
        /// Address of the first element
        start: Ioa,
        /// Elements of the run, in address order
        elements: Vec<Bitstring32>,
    },
    /// M_ME_NC_1, SQ=0: individually addressed float elements.
    Floats(Vec<(Ioa, ShortFloat)>),
    /// M_ME_NC_1, SQ=1: float elements at consecutive addresses
    /// starting at `start`.
    FloatSequence {
        /// Address of the first element
        start: Ioa,
        /// Elements of the run, in address order
        elements: Vec<ShortFloat>,
    },
    /// C_SC_NA_1: exactly one single command.
    SingleCommand {
        /// Address of the commanded object
        ioa: Ioa,
        /// The command
        command: SingleCommand,
    },
    /// C_IC_NA_1: exactly one interrogation command.
    Interrogation {
        /// Address of the interrogated object (conventionally 0)
        ioa: Ioa,
        /// Qualifier of interrogation (full octet range)
        qualifier: u8,
    },
    /// C_RD_NA_1: exactly one read command, address only.
    Read {
        /// Address of the object to read
        ioa: Ioa,
    },
    /// VSQ count 0: an ASDU carrying no information objects.
    Empty {
        /// Type identification announced by the ASDU
        type_id: TypeId,
    },
}

impl InformationObjects {
    /// Type identification implied by this object region.
    pub const fn type_id(&self) -> TypeId {
        match self {
            Self::Bitstrings(_) | Self::BitstringSequence { .. } => TypeId::Bitstring32,
            Self::Floats(_) | Self::FloatSequence { .. } => TypeId::MeasuredFloat,
            Self::SingleCommand { .. } => TypeId::SingleCommand,
            Self::Interrogation { .. } => TypeId::InterrogationCommand,
            Self::Read { .. } => TypeId::ReadCommand,
            Self::Empty { type_id } => *type_id,
        }
    }

    /// Value of the VSQ sequence bit for this object region.
    pub const fn sequence(&self) -> bool {
        matches!(
            self,
            Self::BitstringSequence { .. } | Self::FloatSequence { .. }
        )
    }

    /// Number of information objects/elements (the VSQ count).
    pub fn count(&self) -> usize {
        match self {
            Self::Bitstrings(objects) => objects.len(),
            Self::BitstringSequence { elements, .. } => elements.len(),
            Self::Floats(objects) => objects.len(),
            Self::FloatSequence { elements, .. } => elements.len(),
            Self::SingleCommand { .. } | Self::Interrogation { .. } | Self::Read { .. } => 1,
            Self::Empty { .. } => 0,
        }
    }

    /// Serialized byte length of this object region.
    pub fn encoded_len(&self) -> usize {
        let element = self.type_id().element_len();
        match self {
            Self::BitstringSequence { elements, .. } => Ioa::SIZE + elements.len() * element,
            Self::FloatSequence { elements, .. } => Ioa::SIZE + elements.len() * element,
            Self::Bitstrings(objects) => objects.len() * (Ioa::SIZE + element),
            Self::Floats(objects) => objects.len() * (Ioa::SIZE + element),
            Self::SingleCommand { .. } | Self::Interrogation { .. } | Self::Read { .. } => {
                Ioa::SIZE + element
            }
            Self::Empty { .. } => 0,
        }
    }

    /// Check that the element count fits the 7-bit VSQ field.
    ///
    /// A list variant with no elements has no valid VSQ either: count 0
    /// on the wire means "no objects", which is what `Empty` encodes.
    pub fn validate_count(&self) -> Result<()> {
        let count = self.count();
        match self {
            Self::Empty { .. } => Ok(()),
            _ if count == 0 || count > MAX_OBJECT_COUNT => {
                Err(Iec104Error::CountOutOfRange { count })
            }
            _ => Ok(()),
        }
    }

    /// Serialize this object region into `buf`.
    ///
    /// SQ=1 variants emit the leading address once, then the element
    /// payloads; SQ=0 variants emit `address || payload` per element.
    pub fn encode_to(&self, buf: &mut BytesMut) -> Result<()> {
        self.validate_count()?;
        match self {
            Self::Bitstrings(objects) => {
                for (ioa, element) in objects {
                    buf.put_slice(&ioa.to_bytes());
                    put_bitstring(buf, element);
                }
            }
            Self::BitstringSequence { start, elements } => {
                buf.put_slice(&start.to_bytes());
                for element in elements {
                    put_bitstring(buf, element);
                }
            }
            Self::Floats(objects) => {
                for (ioa, element) in objects {
                    buf.put_slice(&ioa.to_bytes());
                    put_float(buf, element);
                }
            }
            Self::FloatSequence { start, elements } => {
                buf.put_slice(&start.to_bytes());
                for element in elements {
                    put_float(buf, element);
                }
            }
            Self::SingleCommand { ioa, command } => {
                buf.put_slice(&ioa.to_bytes());
                buf.put_u8(command.as_u8());
            }
            Self::Interrogation { ioa, qualifier } => {
                buf.put_slice(&ioa.to_bytes());
                buf.put_u8(*qualifier);
            }
            Self::Read { ioa } => {
                buf.put_slice(&ioa.to_bytes());
            }
            Self::Empty { .. } => {}
        }
        Ok(())
    }
}

#[inline]
fn put_bitstring(buf: &mut BytesMut, element: &Bitstring32) {
    buf.put_slice(&element.raw);
    buf.put_u8(element.quality.as_u8());
}

#[inline]
fn put_float(buf: &mut BytesMut, element: &ShortFloat) {
    buf.put_slice(&element.value.to_le_bytes());
    buf.put_u8(element.quality.as_u8());
}

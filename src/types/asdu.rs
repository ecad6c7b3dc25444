//! IEC 60870-5-104 ASDU (Application Service Data Unit).
//!
//! The ASDU is the payload of an I-frame: a fixed 6-byte header
//! (`TI | VSQ | COT | OA | CA[2]`) followed by the information-object
//! region. [`AsduHeader`] is the exact wire codec for the header;
//! [`Asdu`] is the validated whole, with the type identification, the
//! SQ bit and the element count derived from the object region so the
//! three can never disagree.

use bytes::{BufMut, BytesMut};

use crate::error::{Iec104Error, Result};
use crate::parser::parse_information_objects;
use crate::types::objects::{InformationObjects, Qoc, SingleCommand};
use crate::types::{Cot, TypeId};

/// Highest element count representable in the 7-bit VSQ field.
pub const MAX_OBJECT_COUNT: usize = 127;

/// Variable Structure Qualifier (VSQ).
///
/// Wire byte: SQ bit in bit 7, element count in bits 0-6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vsq {
    /// Number of information objects/elements (0-127)
    pub count: u8,
    /// If true, one address covers a run of elements (SQ=1)
    pub sequence: bool,
}

impl Vsq {
    /// Create a new VSQ. Counts above 127 do not fit the 7-bit field and
    /// fail with [`Iec104Error::CountOutOfRange`].
    pub fn new(count: u8, sequence: bool) -> Result<Self> {
        if count as usize > MAX_OBJECT_COUNT {
            return Err(Iec104Error::CountOutOfRange {
                count: count as usize,
            });
        }
        Ok(Self { count, sequence })
    }

    /// Parse VSQ from byte.
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        Self {
            count: value & 0x7F,
            sequence: (value & 0x80) != 0,
        }
    }

    /// Encode VSQ to byte.
    #[inline]
    pub const fn as_u8(&self) -> u8 {
        (self.count & 0x7F) | if self.sequence { 0x80 } else { 0 }
    }
}

/// Information Object Address (IOA).
///
/// 3-byte little-endian address identifying a data point within a
/// common address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Ioa(u32);

impl Ioa {
    /// Wire size of an information object address.
    pub const SIZE: usize = 3;

    /// Highest address representable in 3 bytes.
    pub const MAX: u32 = 0x00FF_FFFF;

    /// Create an IOA, rejecting values beyond the 24-bit range.
    pub fn new(value: u32) -> Result<Self> {
        if value > Self::MAX {
            return Err(Iec104Error::RangeViolation {
                field: "information object address",
                value,
                min: 0,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    /// Parse IOA from its fixed 3-byte wire form.
    #[inline(always)]
    pub const fn from_array(bytes: [u8; Self::SIZE]) -> Self {
        Self((bytes[0] as u32) | ((bytes[1] as u32) << 8) | ((bytes[2] as u32) << 16))
    }

    /// Encode IOA to 3 bytes (little-endian).
    #[inline(always)]
    pub const fn to_bytes(&self) -> [u8; Self::SIZE] {
        [
            (self.0 & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            ((self.0 >> 16) & 0xFF) as u8,
        ]
    }

    /// Get the raw value.
    #[inline(always)]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Ioa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Auto-incrementing information-object-address generator.
///
/// One counter belongs to one encoding session: it starts at 0, hands
/// out consecutive addresses in allocation order, and can be reset or
/// repositioned explicitly. Concurrent flows need their own counters
/// (or external serialization); `&mut` access enforces single-flow use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoaCounter {
    next: u32,
}

impl IoaCounter {
    /// Create a counter positioned at address 0.
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Next address the counter will hand out.
    #[inline]
    pub const fn peek(&self) -> u32 {
        self.next
    }

    /// Hand out the current address and advance by one.
    ///
    /// Fails with [`Iec104Error::RangeViolation`] once the 24-bit
    /// address space is exhausted.
    pub fn allocate(&mut self) -> Result<Ioa> {
        let ioa = Ioa::new(self.next)?;
        self.next += 1;
        Ok(ioa)
    }

    /// Reposition the counter (caller override).
    pub fn set_next(&mut self, value: u32) -> Result<()> {
        if value > Ioa::MAX {
            return Err(Iec104Error::RangeViolation {
                field: "information object address",
                value,
                min: 0,
                max: Ioa::MAX,
            });
        }
        self.next = value;
        Ok(())
    }

    /// Reset the counter to address 0.
    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// Address a batch of elements in input order.
    pub fn assign<T>(&mut self, elements: Vec<T>) -> Result<Vec<(Ioa, T)>> {
        let mut addressed = Vec::with_capacity(elements.len());
        for element in elements {
            addressed.push((self.allocate()?, element));
        }
        Ok(addressed)
    }
}

/// ASDU header: the fixed 6-byte prefix `TI | VSQ | COT | OA | CA[2]`.
///
/// This is the raw wire codec; consistency between `type_id`/`vsq` and
/// the object region is the concern of [`Asdu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsduHeader {
    /// Type identification
    pub type_id: TypeId,
    /// Variable structure qualifier
    pub vsq: Vsq,
    /// Cause of transmission
    pub cot: Cot,
    /// Test flag (bit 7 of the COT octet)
    pub test: bool,
    /// Negative confirmation flag (P/N, bit 6 of the COT octet)
    pub negative: bool,
    /// Originator address
    pub originator: u8,
    /// Common address of ASDU (station address, little-endian)
    pub common_address: u16,
}

impl AsduHeader {
    /// Wire size of the ASDU header.
    pub const SIZE: usize = 6;

    /// Parse an ASDU header from bytes.
    ///
    /// Returns the header and the number of bytes consumed.
    pub fn parse(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < Self::SIZE {
            return Err(Iec104Error::HeaderLength {
                length: data.len(),
            });
        }

        let type_id = TypeId::from_u8(data[0])?;
        let vsq = Vsq::from_u8(data[1]);
        let cot = Cot::from_u8(data[2])?;
        let negative = (data[2] & 0x40) != 0;
        let test = (data[2] & 0x80) != 0;
        let originator = data[3];
        let common_address = data[4] as u16 | ((data[5] as u16) << 8);

        Ok((
            Self {
                type_id,
                vsq,
                cot,
                test,
                negative,
                originator,
                common_address,
            },
            Self::SIZE,
        ))
    }

    /// Encode this header into `buf`.
    ///
    /// Common address 0 is not addressable and fails with
    /// [`Iec104Error::RangeViolation`].
    pub fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        if self.common_address == 0 {
            return Err(Iec104Error::RangeViolation {
                field: "common address",
                value: 0,
                min: 1,
                max: u16::MAX as u32,
            });
        }

        buf.put_u8(self.type_id.as_u8());
        buf.put_u8(self.vsq.as_u8());

        let mut cot_byte = self.cot.as_u8();
        if self.negative {
            cot_byte |= 0x40;
        }
        if self.test {
            cot_byte |= 0x80;
        }
        buf.put_u8(cot_byte);
        buf.put_u8(self.originator);
        buf.put_u16_le(self.common_address);
        Ok(())
    }
}

/// Complete ASDU.
///
/// The type identification, SQ bit and element count are properties of
/// `objects`; they are computed, not stored, so a header/body mismatch
/// cannot be constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Asdu {
    /// Cause of transmission
    pub cot: Cot,
    /// Test flag
    pub test: bool,
    /// Negative confirmation flag (P/N)
    pub negative: bool,
    /// Originator address (0 if not used)
    pub originator: u8,
    /// Common address of ASDU (station address)
    pub common_address: u16,
    /// The information-object region
    pub objects: InformationObjects,
}

impl Asdu {
    /// Create a new ASDU with clear flags and originator 0.
    pub fn new(cot: Cot, common_address: u16, objects: InformationObjects) -> Self {
        Self {
            cot,
            test: false,
            negative: false,
            originator: 0,
            common_address,
            objects,
        }
    }

    /// Create a station interrogation command ASDU.
    pub fn interrogation_command(common_address: u16, qualifier: u8) -> Self {
        Self::new(
            Cot::Activation,
            common_address,
            InformationObjects::Interrogation {
                ioa: Ioa::from_array([0, 0, 0]),
                qualifier,
            },
        )
    }

    /// Create a read command ASDU for one object.
    pub fn read_command(common_address: u16, ioa: Ioa) -> Self {
        Self::new(
            Cot::Request,
            common_address,
            InformationObjects::Read { ioa },
        )
    }

    /// Create a single command ASDU.
    pub fn single_command(common_address: u16, ioa: Ioa, state: bool, qualifier: Qoc) -> Self {
        Self::new(
            Cot::Activation,
            common_address,
            InformationObjects::SingleCommand {
                ioa,
                command: SingleCommand::new(state, qualifier),
            },
        )
    }

    /// Type identification of this ASDU.
    #[inline]
    pub const fn type_id(&self) -> TypeId {
        self.objects.type_id()
    }

    /// SQ bit of this ASDU.
    #[inline]
    pub const fn sequence(&self) -> bool {
        self.objects.sequence()
    }

    /// Element count of this ASDU (the VSQ count).
    #[inline]
    pub fn count(&self) -> usize {
        self.objects.count()
    }

    /// The 6-byte wire header for this ASDU.
    pub fn header(&self) -> Result<AsduHeader> {
        self.objects.validate_count()?;
        Ok(AsduHeader {
            type_id: self.type_id(),
            vsq: Vsq::new(self.count() as u8, self.sequence())?,
            cot: self.cot,
            test: self.test,
            negative: self.negative,
            originator: self.originator,
            common_address: self.common_address,
        })
    }

    /// Parse an ASDU from bytes (the region after the APCI).
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (header, consumed) = AsduHeader::parse(data)?;
        let objects = parse_information_objects(header.type_id, header.vsq, &data[consumed..])?;

        Ok(Self {
            cot: header.cot,
            test: header.test,
            negative: header.negative,
            originator: header.originator,
            common_address: header.common_address,
            objects,
        })
    }

    /// Encode this ASDU to a fresh buffer.
    pub fn encode(&self) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_to(&mut buf)?;
        Ok(buf)
    }

    /// Encode this ASDU into the provided buffer.
    pub fn encode_to(&self, buf: &mut BytesMut) -> Result<()> {
        self.header()?.encode(buf)?;
        self.objects.encode_to(buf)
    }

    /// Serialized byte length of this ASDU.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        AsduHeader::SIZE + self.objects.encoded_len()
    }
}

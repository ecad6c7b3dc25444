//! Information-object region parser.
//!
//! Decodes the byte region after the 6-byte ASDU header into
//! [`InformationObjects`], dispatching on the type identification and
//! the VSQ sequence bit. Every structural rule is re-checked here: the
//! region size must reconcile exactly with the announced element count,
//! command types carry exactly one object, and sequence encoding is
//! only accepted for the types that permit it.

use crate::error::{Iec104Error, Result};
use crate::types::{
    Bitstring32, InformationObjects, Ioa, Qds, ShortFloat, SingleCommand, TypeId, Vsq,
};

/// Parse the information-object region of an ASDU.
///
/// `data` is the residual region after the ASDU header; its length must
/// equal the size implied by `type_id`, the SQ bit and the count:
///
/// - SQ=1: `count * element_len + 3` (one leading address)
/// - SQ=0: `count * (element_len + 3)` (an address per element)
pub fn parse_information_objects(
    type_id: TypeId,
    vsq: Vsq,
    data: &[u8],
) -> Result<InformationObjects> {
    let count = vsq.count as usize;

    if count == 0 {
        if !data.is_empty() {
            return Err(Iec104Error::UnexpectedPayload {
                residual: data.len(),
            });
        }
        return Ok(InformationObjects::Empty { type_id });
    }

    if vsq.sequence && !type_id.supports_sequence() {
        return Err(Iec104Error::TypeSequenceIllegal {
            type_id: type_id.as_u8(),
        });
    }
    if type_id.is_control() && count != 1 {
        return Err(Iec104Error::TypeSequenceIllegal {
            type_id: type_id.as_u8(),
        });
    }

    let expected = if vsq.sequence {
        count * type_id.element_len() + Ioa::SIZE
    } else {
        count * (type_id.element_len() + Ioa::SIZE)
    };
    if data.len() != expected {
        return Err(Iec104Error::LengthMismatch {
            expected,
            actual: data.len(),
        });
    }

    match type_id {
        TypeId::Bitstring32 if vsq.sequence => parse_bitstring_sequence(data, count),
        TypeId::Bitstring32 => parse_bitstrings(data, count),
        TypeId::MeasuredFloat if vsq.sequence => parse_float_sequence(data, count),
        TypeId::MeasuredFloat => parse_floats(data, count),
        TypeId::SingleCommand => Ok(InformationObjects::SingleCommand {
            ioa: read_ioa(data, 0),
            command: SingleCommand::from_u8(data[3]),
        }),
        TypeId::InterrogationCommand => Ok(InformationObjects::Interrogation {
            ioa: read_ioa(data, 0),
            qualifier: data[3],
        }),
        TypeId::ReadCommand => Ok(InformationObjects::Read {
            ioa: read_ioa(data, 0),
        }),
    }
}

/// Parse an M_BO_NA_1 region with individual addresses (SQ=0).
fn parse_bitstrings(data: &[u8], count: usize) -> Result<InformationObjects> {
    let mut objects = Vec::with_capacity(count);
    let mut offset = 0;

    for _ in 0..count {
        let ioa = read_ioa(data, offset);
        let element = read_bitstring(data, offset + Ioa::SIZE);
        objects.push((ioa, element));
        offset += Ioa::SIZE + 5;
    }

    Ok(InformationObjects::Bitstrings(objects))
}

/// Parse an M_BO_NA_1 region in sequence encoding (SQ=1).
fn parse_bitstring_sequence(data: &[u8], count: usize) -> Result<InformationObjects> {
    let start = read_ioa(data, 0);
    let mut elements = Vec::with_capacity(count);
    let mut offset = Ioa::SIZE;

    for _ in 0..count {
        elements.push(read_bitstring(data, offset));
        offset += 5;
    }

    Ok(InformationObjects::BitstringSequence { start, elements })
}

/// Parse an M_ME_NC_1 region with individual addresses (SQ=0).
fn parse_floats(data: &[u8], count: usize) -> Result<InformationObjects> {
    let mut objects = Vec::with_capacity(count);
    let mut offset = 0;

    for _ in 0..count {
        let ioa = read_ioa(data, offset);
        let element = read_float(data, offset + Ioa::SIZE);
        objects.push((ioa, element));
        offset += Ioa::SIZE + 5;
    }

    Ok(InformationObjects::Floats(objects))
}

/// Parse an M_ME_NC_1 region in sequence encoding (SQ=1).
fn parse_float_sequence(data: &[u8], count: usize) -> Result<InformationObjects> {
    let start = read_ioa(data, 0);
    let mut elements = Vec::with_capacity(count);
    let mut offset = Ioa::SIZE;

    for _ in 0..count {
        elements.push(read_float(data, offset));
        offset += 5;
    }

    Ok(InformationObjects::FloatSequence { start, elements })
}

/// Read a 3-byte little-endian address (region size already checked).
#[inline(always)]
fn read_ioa(data: &[u8], offset: usize) -> Ioa {
    Ioa::from_array([data[offset], data[offset + 1], data[offset + 2]])
}

/// Read a bitstring element: 4 raw bytes and a QDS octet.
#[inline]
fn read_bitstring(data: &[u8], offset: usize) -> Bitstring32 {
    Bitstring32::new(
        [
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ],
        Qds::from_u8(data[offset + 4]),
    )
}

/// Read a float element: IEEE 754 binary32 little-endian and a QDS octet.
#[inline]
fn read_float(data: &[u8], offset: usize) -> ShortFloat {
    ShortFloat::new(
        f32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]),
        Qds::from_u8(data[offset + 4]),
    )
}

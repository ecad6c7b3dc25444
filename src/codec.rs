//! Whole-APDU codec and stream framing.
//!
//! [`Apdu`] ties the 4-byte APCI control field to an optional ASDU and
//! owns the outer wire form `0x68 || length || apci[4] || asdu?`.
//! [`Iec104Codec`] adapts the same codec to the tokio-util
//! [`Decoder`]/[`Encoder`] traits for use with `Framed` transports,
//! buffering partial frames and resynchronizing on garbage bytes.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{Iec104Error, Result};
use crate::types::{
    Apci, Asdu, MAX_APDU_LENGTH, MIN_APDU_LENGTH, MIN_I_FRAME_LENGTH, START_BYTE,
};

/// Parse the 2-byte APDU start header, returning the declared length.
///
/// The header must be exactly 2 bytes, begin with `0x68`, and declare a
/// length in `[4, 253]`.
pub fn parse_header(header: &[u8]) -> Result<usize> {
    if header.len() != 2 {
        return Err(Iec104Error::HeaderLength {
            length: header.len(),
        });
    }
    if header[0] != START_BYTE {
        return Err(Iec104Error::HeaderMagic { byte: header[0] });
    }
    let length = header[1] as usize;
    if !(MIN_APDU_LENGTH..=MAX_APDU_LENGTH).contains(&length) {
        return Err(Iec104Error::HeaderLength { length });
    }
    Ok(length)
}

/// An IEC 104 APDU (Application Protocol Data Unit).
///
/// Contains the APCI control field and, for I-frames, an ASDU.
#[derive(Debug, Clone, PartialEq)]
pub struct Apdu {
    /// APCI (Application Protocol Control Information)
    pub apci: Apci,
    /// ASDU (Application Service Data Unit), present in I-frames only
    pub asdu: Option<Asdu>,
}

impl Apdu {
    /// Create a new I-frame APDU carrying an ASDU.
    pub fn i_frame(send_seq: u16, recv_seq: u16, asdu: Asdu) -> Self {
        Self {
            apci: Apci::i_frame(send_seq, recv_seq),
            asdu: Some(asdu),
        }
    }

    /// Create a new S-frame APDU.
    pub fn s_frame(recv_seq: u16) -> Self {
        Self {
            apci: Apci::s_frame(recv_seq),
            asdu: None,
        }
    }

    /// Create a new U-frame APDU.
    pub fn u_frame(function: crate::types::UFunction) -> Self {
        Self {
            apci: Apci::u_frame(function),
            asdu: None,
        }
    }

    /// Check if this is an I-frame.
    pub const fn is_i_frame(&self) -> bool {
        self.apci.is_i_frame()
    }

    /// Check if this is an S-frame.
    pub const fn is_s_frame(&self) -> bool {
        self.apci.is_s_frame()
    }

    /// Check if this is a U-frame.
    pub const fn is_u_frame(&self) -> bool {
        self.apci.is_u_frame()
    }

    /// Parse a complete APDU, start header included.
    ///
    /// The declared length must match the byte count actually present;
    /// I-frames must declare at least 10 bytes (APCI + ASDU header) and
    /// S/U-frames exactly 4.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(Iec104Error::HeaderLength {
                length: data.len(),
            });
        }
        let length = parse_header(&data[..2])?;
        let body = &data[2..];
        if body.len() != length {
            return Err(Iec104Error::LengthMismatch {
                expected: length,
                actual: body.len(),
            });
        }

        let apci = Apci::parse(&body[..4])?;
        let asdu = if apci.is_i_frame() {
            if length < MIN_I_FRAME_LENGTH {
                return Err(Iec104Error::HeaderLength { length });
            }
            Some(Asdu::parse(&body[4..])?)
        } else {
            if length != MIN_APDU_LENGTH {
                return Err(Iec104Error::HeaderLength { length });
            }
            None
        };

        Ok(Self { apci, asdu })
    }

    /// Encode this APDU to wire bytes, start header included.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(2 + MIN_APDU_LENGTH + self.asdu_len());
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Encode this APDU into the provided buffer.
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<()> {
        let body_length = MIN_APDU_LENGTH + self.asdu_len();

        // An I-frame without an ASDU (or an S/U-frame with one) has no
        // conforming declared length.
        if self.apci.is_i_frame() != self.asdu.is_some() || body_length > MAX_APDU_LENGTH {
            return Err(Iec104Error::HeaderLength {
                length: body_length,
            });
        }

        buf.reserve(2 + body_length);
        buf.extend_from_slice(&[START_BYTE, body_length as u8]);
        buf.extend_from_slice(&self.apci.encode()?);
        if let Some(asdu) = &self.asdu {
            asdu.encode_to(buf)?;
        }
        Ok(())
    }

    #[inline]
    fn asdu_len(&self) -> usize {
        self.asdu.as_ref().map_or(0, Asdu::encoded_len)
    }
}

impl std::fmt::Display for Apdu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.apci)?;
        if let Some(asdu) = &self.asdu {
            write!(
                f,
                " [{}] COT={} CA={}",
                asdu.type_id(),
                asdu.cot,
                asdu.common_address
            )?;
        }
        Ok(())
    }
}

/// IEC 60870-5-104 stream codec.
///
/// Splits APDUs out of a byte stream and serializes them back, for use
/// with `tokio_util::codec::Framed` over any `AsyncRead + AsyncWrite`.
///
/// # Example
///
/// ```rust,ignore
/// use tokio_util::codec::Framed;
/// use iec104_codec::{Apdu, Iec104Codec, UFunction};
///
/// let mut framed = Framed::new(stream, Iec104Codec::new());
/// framed.send(Apdu::u_frame(UFunction::StartDtAct)).await?;
/// while let Some(apdu) = framed.next().await {
///     println!("received: {}", apdu?);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Iec104Codec {
    // State for handling partial frames
    state: DecodeState,
}

#[derive(Debug, Clone, Default)]
#[allow(clippy::enum_variant_names)]
enum DecodeState {
    #[default]
    WaitingForStart,
    WaitingForLength,
    WaitingForData {
        length: usize,
    },
}

impl Iec104Codec {
    /// Create a new IEC 104 stream codec.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for Iec104Codec {
    type Item = Apdu;
    type Error = Iec104Error;

    fn decode(&mut self, src: &mut BytesMut) -> std::result::Result<Option<Apdu>, Iec104Error> {
        loop {
            match &self.state {
                DecodeState::WaitingForStart => {
                    // Skip bytes until the next start byte
                    while !src.is_empty() && src[0] != START_BYTE {
                        src.advance(1);
                    }

                    if src.is_empty() {
                        return Ok(None);
                    }

                    self.state = DecodeState::WaitingForLength;
                }

                DecodeState::WaitingForLength => {
                    if src.len() < 2 {
                        return Ok(None);
                    }

                    let length = src[1] as usize;

                    if !(MIN_APDU_LENGTH..=MAX_APDU_LENGTH).contains(&length) {
                        // Unusable length: drop the start byte and rescan
                        src.advance(1);
                        self.state = DecodeState::WaitingForStart;
                        continue;
                    }

                    self.state = DecodeState::WaitingForData { length };
                }

                DecodeState::WaitingForData { length } => {
                    let total_length = 2 + length;

                    if src.len() < total_length {
                        return Ok(None);
                    }

                    let frame = src.split_to(total_length);
                    self.state = DecodeState::WaitingForStart;

                    return Apdu::parse(&frame).map(Some);
                }
            }
        }
    }
}

impl Encoder<Apdu> for Iec104Codec {
    type Error = Iec104Error;

    fn encode(&mut self, item: Apdu, dst: &mut BytesMut) -> std::result::Result<(), Iec104Error> {
        item.encode_into(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Bitstring32, Cot, InformationObjects, Ioa, Qds, Qoc, ShortFloat, UFunction,
    };
    use futures::{SinkExt, StreamExt};
    use tokio_util::codec::Framed;

    /// I-frame fixture: two individually addressed bitstring objects.
    const BITSTRING_APDU: [u8; 28] = [
        0x68, 0x1A, // start, length 26
        0x02, 0x00, 0x02, 0x00, // I-frame, SSN=1, RSN=1
        0x07, 0x02, 0x01, 0x00, 0x01, 0x00, // M_BO_NA_1, VSQ=2, periodic, OA=0, CA=1
        0x00, 0x00, 0x00, 0x54, 0x65, 0x73, 0x74, 0x00, // IOA=0, "Test", QDS=0
        0x01, 0x00, 0x00, 0x54, 0x65, 0x73, 0x74, 0x00, // IOA=1, "Test", QDS=0
    ];

    fn bitstring_apdu() -> Apdu {
        Apdu::i_frame(
            1,
            1,
            Asdu::new(
                Cot::Periodic,
                1,
                InformationObjects::Bitstrings(vec![
                    (
                        Ioa::new(0).unwrap(),
                        Bitstring32::from_payload(b"Test", Qds::new()),
                    ),
                    (
                        Ioa::new(1).unwrap(),
                        Bitstring32::from_payload(b"Test", Qds::new()),
                    ),
                ]),
            ),
        )
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header(&[0x68, 0x1A]).unwrap(), 26);
        assert_eq!(
            parse_header(&[0x60, 0x1A]),
            Err(Iec104Error::HeaderMagic { byte: 0x60 })
        );
        assert_eq!(
            parse_header(&[0x68]),
            Err(Iec104Error::HeaderLength { length: 1 })
        );
        assert_eq!(
            parse_header(&[0x68, 0x1A, 0x11]),
            Err(Iec104Error::HeaderLength { length: 3 })
        );
        // Declared lengths outside [4, 253]
        assert_eq!(
            parse_header(&[0x68, 0x03]),
            Err(Iec104Error::HeaderLength { length: 3 })
        );
        assert_eq!(
            parse_header(&[0x68, 0xFE]),
            Err(Iec104Error::HeaderLength { length: 254 })
        );
    }

    #[test]
    fn test_parse_bitstring_apdu() {
        let apdu = Apdu::parse(&BITSTRING_APDU).unwrap();
        assert_eq!(apdu.apci, Apci::i_frame(1, 1));

        let asdu = apdu.asdu.as_ref().unwrap();
        assert_eq!(asdu.type_id(), crate::types::TypeId::Bitstring32);
        assert!(!asdu.sequence());
        assert_eq!(asdu.count(), 2);
        assert_eq!(asdu.cot, Cot::Periodic);
        assert!(!asdu.test);
        assert!(!asdu.negative);
        assert_eq!(asdu.originator, 0);
        assert_eq!(asdu.common_address, 1);

        assert_eq!(apdu, bitstring_apdu());
    }

    #[test]
    fn test_encode_bitstring_apdu() {
        let encoded = bitstring_apdu().encode().unwrap();
        assert_eq!(&encoded[..], &BITSTRING_APDU[..]);
    }

    #[test]
    fn test_float_sequence_roundtrip() {
        let apdu = Apdu::i_frame(
            1,
            1,
            Asdu::new(
                Cot::Spontaneous,
                1,
                InformationObjects::FloatSequence {
                    start: Ioa::new(0xFFFFFF).unwrap(),
                    elements: vec![
                        ShortFloat::new(3.4, Qds::new()),
                        ShortFloat::new(3.4, Qds::from_u8(0x01)),
                    ],
                },
            ),
        );

        let encoded = apdu.encode().unwrap();
        // length 23: APCI + header + 13-byte object region, VSQ packs 130
        assert_eq!(encoded[1], 23);
        assert_eq!(encoded[7], 130);
        assert_eq!(
            &encoded[12..],
            &[0xFF, 0xFF, 0xFF, 0x9A, 0x99, 0x59, 0x40, 0x00, 0x9A, 0x99, 0x59, 0x40, 0x01]
        );

        assert_eq!(Apdu::parse(&encoded).unwrap(), apdu);
    }

    #[test]
    fn test_single_command_roundtrip() {
        let apdu = Apdu::i_frame(
            0,
            0,
            Asdu::single_command(
                1,
                Ioa::new(65537).unwrap(),
                false,
                Qoc::new(31, true).unwrap(),
            ),
        );
        let encoded = apdu.encode().unwrap();
        assert_eq!(encoded[1], 14);
        assert_eq!(&encoded[12..], &[0x01, 0x00, 0x01, 0xFC]);
        assert_eq!(Apdu::parse(&encoded).unwrap(), apdu);
    }

    #[test]
    fn test_read_command_roundtrip() {
        let apdu = Apdu::i_frame(0, 0, Asdu::read_command(1, Ioa::new(65537).unwrap()));
        let encoded = apdu.encode().unwrap();
        assert_eq!(encoded[1], 13);
        assert_eq!(&encoded[12..], &[0x01, 0x00, 0x01]);
        assert_eq!(Apdu::parse(&encoded).unwrap(), apdu);
    }

    #[test]
    fn test_read_command_rejects_count_two() {
        // VSQ announces 2 objects on a read command
        let bytes = [
            0x68, 0x0D, 0x02, 0x00, 0x02, 0x00, //
            0x66, 0x02, 0x05, 0x00, 0x01, 0x00, //
            0x01, 0x00, 0x01,
        ];
        assert_eq!(
            Apdu::parse(&bytes),
            Err(Iec104Error::TypeSequenceIllegal { type_id: 102 })
        );
    }

    #[test]
    fn test_u_frame_startdt() {
        let apdu = Apdu::u_frame(UFunction::StartDtAct);
        let encoded = apdu.encode().unwrap();
        assert_eq!(&encoded[..], &[0x68, 0x04, 0x07, 0x00, 0x00, 0x00]);

        let parsed = Apdu::parse(&encoded).unwrap();
        assert_eq!(
            parsed.apci,
            Apci::UFrame {
                function: UFunction::StartDtAct
            }
        );
        assert!(parsed.asdu.is_none());
    }

    #[test]
    fn test_zero_count_sentinel() {
        // VSQ=0: ASDU header only, no object bytes
        let bytes = [
            0x68, 0x0A, 0x02, 0x00, 0x02, 0x00, 0x07, 0x00, 0x01, 0x00, 0x01, 0x00,
        ];
        let apdu = Apdu::parse(&bytes).unwrap();
        let asdu = apdu.asdu.unwrap();
        assert_eq!(asdu.count(), 0);
        assert_eq!(
            asdu.objects,
            InformationObjects::Empty {
                type_id: crate::types::TypeId::Bitstring32
            }
        );
    }

    #[test]
    fn test_zero_count_with_residual_bytes() {
        let bytes = [
            0x68, 0x0C, 0x02, 0x00, 0x02, 0x00, 0x07, 0x00, 0x01, 0x00, 0x01, 0x00, 0xAA, 0xBB,
        ];
        assert_eq!(
            Apdu::parse(&bytes),
            Err(Iec104Error::UnexpectedPayload { residual: 2 })
        );
    }

    #[test]
    fn test_declared_length_must_match() {
        assert_eq!(
            Apdu::parse(&[0x68, 0x05, 0x01, 0x00, 0x00, 0x00]),
            Err(Iec104Error::LengthMismatch {
                expected: 5,
                actual: 4,
            })
        );
    }

    #[test]
    fn test_i_frame_needs_ten_bytes() {
        assert_eq!(
            Apdu::parse(&[0x68, 0x04, 0x02, 0x00, 0x02, 0x00]),
            Err(Iec104Error::HeaderLength { length: 4 })
        );
    }

    #[test]
    fn test_s_frame_body_exactly_four() {
        assert_eq!(
            Apdu::parse(&[0x68, 0x05, 0x01, 0x00, 0x02, 0x00, 0xFF]),
            Err(Iec104Error::HeaderLength { length: 5 })
        );
    }

    #[test]
    fn test_mismatched_frame_and_asdu() {
        let no_asdu = Apdu {
            apci: Apci::i_frame(0, 0),
            asdu: None,
        };
        assert_eq!(
            no_asdu.encode(),
            Err(Iec104Error::HeaderLength { length: 4 })
        );

        let stray_asdu = Apdu {
            apci: Apci::s_frame(0),
            asdu: Some(Asdu::interrogation_command(1, 20)),
        };
        assert_eq!(
            stray_asdu.encode(),
            Err(Iec104Error::HeaderLength { length: 14 })
        );
    }

    #[test]
    fn test_body_length_boundary() {
        // 48 sequence elements: 4 + 6 + 3 + 48*5 = 253, the ceiling
        let elements = vec![Bitstring32::new(*b"ABCD", Qds::new()); 48];
        let apdu = Apdu::i_frame(
            0,
            0,
            Asdu::new(
                Cot::Periodic,
                1,
                InformationObjects::BitstringSequence {
                    start: Ioa::new(0).unwrap(),
                    elements,
                },
            ),
        );
        let encoded = apdu.encode().unwrap();
        assert_eq!(encoded[1], 253);
        assert_eq!(encoded.len(), 255);
        assert_eq!(Apdu::parse(&encoded).unwrap(), apdu);

        // One more element and no conforming length exists
        let elements = vec![Bitstring32::new(*b"ABCD", Qds::new()); 49];
        let apdu = Apdu::i_frame(
            0,
            0,
            Asdu::new(
                Cot::Periodic,
                1,
                InformationObjects::BitstringSequence {
                    start: Ioa::new(0).unwrap(),
                    elements,
                },
            ),
        );
        assert_eq!(
            apdu.encode(),
            Err(Iec104Error::HeaderLength { length: 258 })
        );
    }

    #[test]
    fn test_apdu_display() {
        assert_eq!(
            Apdu::u_frame(UFunction::TestFrCon).to_string(),
            "U(TESTFR_CON)"
        );
        assert_eq!(
            bitstring_apdu().to_string(),
            "I(S=1, R=1) [M_BO_NA_1] COT=Periodic CA=1"
        );
    }

    #[test]
    fn test_codec_decode_u_frame() {
        let mut codec = Iec104Codec::new();
        let mut buf = BytesMut::from(&[0x68, 0x04, 0x07, 0x00, 0x00, 0x00][..]);

        let apdu = codec.decode(&mut buf).unwrap().unwrap();
        assert!(apdu.is_u_frame());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_decode_s_frame() {
        let mut codec = Iec104Codec::new();
        // S-frame with recv_seq = 100
        let mut buf = BytesMut::from(&[0x68, 0x04, 0x01, 0x00, 0xC8, 0x00][..]);

        let apdu = codec.decode(&mut buf).unwrap().unwrap();
        assert!(apdu.is_s_frame());
        assert_eq!(apdu.apci.recv_seq(), Some(100));
    }

    #[test]
    fn test_codec_encode_s_frame() {
        let mut codec = Iec104Codec::new();
        let mut buf = BytesMut::new();

        codec.encode(Apdu::s_frame(100), &mut buf).unwrap();
        assert_eq!(&buf[..], &[0x68, 0x04, 0x01, 0x00, 0xC8, 0x00]);
    }

    #[test]
    fn test_codec_decode_partial_frame() {
        let mut codec = Iec104Codec::new();

        let mut buf = BytesMut::from(&BITSTRING_APDU[..10]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&BITSTRING_APDU[10..]);
        let apdu = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(apdu, bitstring_apdu());
    }

    #[test]
    fn test_codec_decode_skip_garbage() {
        let mut codec = Iec104Codec::new();
        let mut buf = BytesMut::from(&[0xFF, 0xAA][..]);
        buf.extend_from_slice(&[0x68, 0x04, 0x07, 0x00, 0x00, 0x00]);

        let apdu = codec.decode(&mut buf).unwrap().unwrap();
        assert!(apdu.is_u_frame());
    }

    #[test]
    fn test_codec_resync_on_bad_length() {
        let mut codec = Iec104Codec::new();
        // Start byte with an impossible length, then a valid frame
        let mut buf = BytesMut::from(&[0x68, 0x02][..]);
        buf.extend_from_slice(&[0x68, 0x04, 0x01, 0x00, 0x00, 0x00]);

        let apdu = codec.decode(&mut buf).unwrap().unwrap();
        assert!(apdu.is_s_frame());
    }

    #[test]
    fn test_codec_back_to_back_frames() {
        let mut codec = Iec104Codec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&BITSTRING_APDU);
        buf.extend_from_slice(&[0x68, 0x04, 0x83, 0x00, 0x00, 0x00]);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first, bitstring_apdu());

        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second, Apdu::u_frame(UFunction::TestFrCon));

        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_framed_roundtrip() {
        // Drive the codec end to end over mock async I/O
        let startdt = [0x68, 0x04, 0x07, 0x00, 0x00, 0x00];

        tokio_test::block_on(async {
            let mock = tokio_test::io::Builder::new()
                .write(&startdt)
                .read(&BITSTRING_APDU)
                .build();
            let mut framed = Framed::new(mock, Iec104Codec::new());

            framed
                .send(Apdu::u_frame(UFunction::StartDtAct))
                .await
                .unwrap();

            let received = framed.next().await.unwrap().unwrap();
            assert_eq!(received, bitstring_apdu());
        });
    }
}

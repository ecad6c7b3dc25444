//! # iec104-codec
//!
//! IEC 60870-5-104 application-layer codec for Rust.
//!
//! This crate encodes and decodes the telecontrol messages exchanged by
//! IEC 60870-5-104 stations: the APCI framing byte layout and the ASDU
//! body. It is a pure codec: connection lifecycle, the
//! STARTDT/STOPDT/TESTFR procedure, T1/T2/T3 timers and k/w window
//! accounting belong to the transport layer and are out of scope.
//!
//! ## Quick Start
//!
//! ```rust
//! use iec104_codec::{Apdu, Asdu, Ioa, Result};
//!
//! fn main() -> Result<()> {
//!     // Build and encode a read command
//!     let asdu = Asdu::read_command(1, Ioa::new(65537)?);
//!     let bytes = Apdu::i_frame(0, 0, asdu).encode()?;
//!
//!     // Decode it back
//!     let apdu = Apdu::parse(&bytes)?;
//!     assert!(apdu.is_i_frame());
//!     Ok(())
//! }
//! ```
//!
//! For stream transports, [`Iec104Codec`] implements the tokio-util
//! `Decoder`/`Encoder` traits and can be wrapped in a `Framed`.
//!
//! ## Protocol Overview
//!
//! An APDU starts with a 2-byte header (start byte `0x68` plus the body
//! length) followed by a 4-byte control field and, for I-frames, an
//! ASDU. Three frame formats exist:
//!
//! - **I-frame**: information transfer (carries an ASDU)
//! - **S-frame**: supervisory (acknowledgment)
//! - **U-frame**: unnumbered (control: STARTDT, STOPDT, TESTFR)
//!
//! ### APDU Structure
//!
//! ```text
//! +--------+--------+--------+--------+--------+--------+--------
//! | 0x68   | Length | Control Field (4 bytes)           | ASDU...
//! +--------+--------+--------+--------+--------+--------+--------
//! ```
//!
//! All multi-byte integers are little-endian; measured floats are
//! IEEE 754 binary32, little-endian.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod codec;
pub mod error;
pub mod parser;
pub mod types;

// Re-export main types
pub use codec::{parse_header, Apdu, Iec104Codec};
pub use error::{Iec104Error, Result};
pub use parser::parse_information_objects;
pub use types::*;

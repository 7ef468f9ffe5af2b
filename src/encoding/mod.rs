//! Wire encodings of a [`Message`].
//!
//! Two encodings are supported: the classic pipe-delimited form (ER7) that travels over MLLP,
//! and the HL7 v2 XML form. Both are lossless for every populated value, and encoding is
//! deterministic, so the same message always produces the same bytes.

mod pipe;
mod xml;

use std::fmt;

use crate::error::Result;
use crate::message::Message;

pub use pipe::{Delimiters, SEGMENT_TERMINATOR};
pub use xml::NAMESPACE;

/// The two text encodings of an HL7 v2 message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// `MSH|^~\&|...` segments terminated by carriage returns.
    Pipe,
    /// HL7 v2 XML (`urn:hl7-org:v2xml`).
    Xml,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Pipe => write!(f, "pipe-delimited"),
            Encoding::Xml => write!(f, "XML"),
        }
    }
}

/// Serializes a message.
pub fn encode(message: &Message, encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Pipe => pipe::encode(message),
        Encoding::Xml => xml::encode(message),
    }
}

/// Parses a message from its text form.
pub fn decode(text: &str, encoding: Encoding) -> Result<Message> {
    match encoding {
        Encoding::Pipe => pipe::decode(text),
        Encoding::Xml => xml::decode(text),
    }
}

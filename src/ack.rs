//! General acknowledgments (`ACK`) and their MSA segment.

use std::fmt;

use crate::builder::segments::{ENCODING_CHARACTERS, FIELD_SEPARATOR, VERSION_ID};
use crate::clock::Clock;
use crate::error::{Hl7Error, Result};
use crate::message::{Message, Segment};

/// MSA-1 acknowledgment codes, original and enhanced mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckCode {
    ApplicationAccept,
    ApplicationError,
    ApplicationReject,
    CommitAccept,
    CommitError,
    CommitReject,
}

impl AckCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AckCode::ApplicationAccept => "AA",
            AckCode::ApplicationError => "AE",
            AckCode::ApplicationReject => "AR",
            AckCode::CommitAccept => "CA",
            AckCode::CommitError => "CE",
            AckCode::CommitReject => "CR",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "AA" => Some(AckCode::ApplicationAccept),
            "AE" => Some(AckCode::ApplicationError),
            "AR" => Some(AckCode::ApplicationReject),
            "CA" => Some(AckCode::CommitAccept),
            "CE" => Some(AckCode::CommitError),
            "CR" => Some(AckCode::CommitReject),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AckCode::ApplicationAccept | AckCode::CommitAccept)
    }
}

impl fmt::Display for AckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The MSA segment of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgment {
    pub code: AckCode,
    /// MSA-2, the control ID of the message being acknowledged.
    pub control_id: Option<String>,
    pub text: Option<String>,
}

impl Acknowledgment {
    pub fn from_message(message: &Message) -> Result<Self> {
        let msa = message
            .segment("MSA")
            .ok_or_else(|| Hl7Error::encoding("response has no MSA segment"))?;
        let raw_code = msa.get(1, 1).unwrap_or_default();
        let code = AckCode::from_code(raw_code).ok_or_else(|| {
            Hl7Error::encoding(format!("unknown acknowledgment code '{}'", raw_code))
        })?;

        let text_of = |field| {
            msa.get(field, 1)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Ok(Self {
            code,
            control_id: text_of(2),
            text: text_of(3),
        })
    }

    /// Whether this acknowledges the message with the given control ID.
    pub fn acknowledges(&self, control_id: &str) -> bool {
        self.control_id.as_deref() == Some(control_id)
    }
}

/// Builds the `ACK` reply to `original`, swapping sender and receiver.
///
/// `original` may be empty when the inbound bytes could not be decoded; the reply then carries
/// only the fixed header values.
pub fn build_ack(
    original: &Message,
    code: AckCode,
    text: Option<&str>,
    clock: &dyn Clock,
) -> Result<Message> {
    let timestamp = clock.timestamp();
    let copy = |path: &str| original.get(path).filter(|v| !v.is_empty());

    let mut msh = Segment::new("MSH");
    msh.set(1, 1, FIELD_SEPARATOR);
    msh.set(2, 1, ENCODING_CHARACTERS);
    for (to, from) in [(3, "MSH-5"), (4, "MSH-6"), (5, "MSH-3"), (6, "MSH-4")] {
        if let Some(value) = copy(from) {
            msh.set(to, 1, value);
        }
    }
    msh.set(7, 1, timestamp.as_str());
    msh.set(9, 1, "ACK");
    if let Some(event) = copy("MSH-9-2") {
        msh.set(9, 2, event);
    }
    msh.set(9, 3, "ACK");
    msh.set(10, 1, format!("ACK{}", timestamp));
    msh.set(11, 1, copy("MSH-11").unwrap_or("P"));
    msh.set(12, 1, copy("MSH-12").unwrap_or(VERSION_ID));

    let mut msa = Segment::new("MSA");
    msa.set(1, 1, code.as_str());
    if let Some(control_id) = original.control_id().filter(|v| !v.is_empty()) {
        msa.set(2, 1, control_id);
    }
    if let Some(text) = text.filter(|t| !t.is_empty()) {
        if text.chars().any(char::is_control) {
            return Err(Hl7Error::field_format("MSA", 3, "control characters are not allowed"));
        }
        msa.set(3, 1, text);
    }

    let mut ack = Message::new();
    ack.push(msh);
    ack.push(msa);
    Ok(ack)
}

//! Message builders.
//!
//! A [`MessageBuilder`] produces one complete message for one trigger event. The
//! [`MessageFactory`](crate::factory::MessageFactory) holds them keyed by that event code.

pub mod params;
pub mod segments;

use std::sync::Arc;

use log::debug;

use crate::clock::Clock;
use crate::error::Result;
use crate::message::Message;

pub use params::{AdtA01Params, HeaderParams, PatientParams, VisitParams};
use segments::{build_evn, build_msh, build_pid, build_pv1, MessageStamp};

/// Builds messages for a single trigger event.
pub trait MessageBuilder: Send + Sync {
    /// The trigger event code this builder is registered under, e.g. `A01`.
    fn trigger_event(&self) -> &str;

    /// Builds a fresh message. Either every segment is populated or an error is returned.
    fn build(&self) -> Result<Message>;
}

/// ADT^A01, patient admit.
pub struct AdtA01Builder {
    params: AdtA01Params,
    clock: Arc<dyn Clock>,
}

impl AdtA01Builder {
    pub const TRIGGER_EVENT: &'static str = "A01";
    pub const STRUCTURE: &'static str = "ADT_A01";
    /// Segment order of the produced message.
    pub const SEGMENTS: [&'static str; 4] = ["MSH", "EVN", "PID", "PV1"];

    pub fn new(params: AdtA01Params, clock: Arc<dyn Clock>) -> Self {
        Self { params, clock }
    }

    pub fn params(&self) -> &AdtA01Params {
        &self.params
    }
}

impl MessageBuilder for AdtA01Builder {
    fn trigger_event(&self) -> &str {
        Self::TRIGGER_EVENT
    }

    fn build(&self) -> Result<Message> {
        // one timestamp for the whole message
        let stamp = MessageStamp::new(&self.params.header.control_id_prefix, self.clock.timestamp())?;

        let msh = build_msh(
            &self.params.header,
            Self::TRIGGER_EVENT,
            Self::STRUCTURE,
            &stamp,
        )?;
        let evn = build_evn(Self::TRIGGER_EVENT, &stamp.timestamp)?;
        let pid = build_pid(&self.params.patient)?;
        let pv1 = build_pv1(&self.params.visit, &stamp.timestamp)?;

        let mut message = Message::new();
        message.push(msh);
        message.push(evn);
        message.push(pid);
        message.push(pv1);

        debug!("Built ADT^A01 with control ID {}", stamp.control_id);
        Ok(message)
    }
}

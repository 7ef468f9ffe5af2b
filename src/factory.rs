//! Dispatch from trigger event code to builder.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, warn};

use crate::builder::{AdtA01Builder, AdtA01Params, MessageBuilder};
use crate::clock::Clock;
use crate::error::{Hl7Error, Result};
use crate::message::Message;

/// Registry of builders keyed by trigger event code.
///
/// Supporting another event means registering another [`MessageBuilder`]; the existing ones are
/// left untouched.
#[derive(Default)]
pub struct MessageFactory {
    builders: BTreeMap<String, Box<dyn MessageBuilder>>,
}

impl MessageFactory {
    /// An empty factory, every code is unsupported until registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory with the ADT builders this crate ships.
    pub fn adt(params: AdtA01Params, clock: Arc<dyn Clock>) -> Self {
        let mut factory = Self::new();
        factory.register(Box::new(AdtA01Builder::new(params, clock)));
        factory
    }

    /// Registers a builder under its trigger event, returning any builder it replaces.
    pub fn register(&mut self, builder: Box<dyn MessageBuilder>) -> Option<Box<dyn MessageBuilder>> {
        let code = builder.trigger_event().to_string();
        let replaced = self.builders.insert(code.clone(), builder);
        if replaced.is_some() {
            warn!("Replaced existing builder for trigger event {}", code);
        }
        replaced
    }

    pub fn supported_codes(&self) -> Vec<&str> {
        self.builders.keys().map(String::as_str).collect()
    }

    /// Builds the message registered for `trigger_event_code`.
    pub fn create_message(&self, trigger_event_code: &str) -> Result<Message> {
        if trigger_event_code.is_empty() {
            return Err(Hl7Error::EmptyTriggerEvent);
        }

        let builder = self
            .builders
            .get(trigger_event_code)
            .ok_or_else(|| Hl7Error::UnsupportedMessageType(trigger_event_code.to_string()))?;

        debug!("Creating message for trigger event {}", trigger_event_code);
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::message::Segment;

    fn factory() -> MessageFactory {
        let clock = FixedClock::parse("20240115093000").unwrap();
        MessageFactory::adt(AdtA01Params::default(), Arc::new(clock))
    }

    #[test]
    fn a01_is_supported() {
        let msg = factory().create_message("A01").unwrap();
        assert_eq!(msg.segment_names(), vec!["MSH", "EVN", "PID", "PV1"]);
        assert_eq!(msg.message_type(), Some(("ADT", "A01")));
    }

    #[test]
    fn unregistered_code_names_itself() {
        match factory().create_message("A02") {
            Err(Hl7Error::UnsupportedMessageType(code)) => assert_eq!(code, "A02"),
            other => panic!("expected unsupported message type, got {:?}", other),
        }
    }

    #[test]
    fn codes_are_case_sensitive() {
        assert!(matches!(
            factory().create_message("a01"),
            Err(Hl7Error::UnsupportedMessageType(_))
        ));
    }

    #[test]
    fn empty_code_is_rejected() {
        assert!(matches!(
            factory().create_message(""),
            Err(Hl7Error::EmptyTriggerEvent)
        ));
    }

    struct DischargeStub;

    impl MessageBuilder for DischargeStub {
        fn trigger_event(&self) -> &str {
            "A03"
        }

        fn build(&self) -> Result<Message> {
            let mut msh = Segment::new("MSH");
            msh.set(9, 2, "A03");
            let mut msg = Message::new();
            msg.push(msh);
            Ok(msg)
        }
    }

    #[test]
    fn new_builders_register_without_touching_existing_ones() {
        let mut factory = factory();
        assert!(factory.register(Box::new(DischargeStub)).is_none());

        assert_eq!(factory.supported_codes(), vec!["A01", "A03"]);
        assert_eq!(factory.create_message("A03").unwrap().get("MSH-9-2"), Some("A03"));
        assert!(factory.create_message("A01").is_ok());
    }
}

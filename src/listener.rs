//! A minimal MLLP receiver that acknowledges everything it is sent.
//!
//! Each inbound frame is decoded as ER7 and answered with an `AA` acknowledgment, or `AR` when
//! the frame is not a readable HL7 message. Used as the local counterpart of the client.

use std::sync::Arc;

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use crate::ack::{build_ack, AckCode};
use crate::clock::Clock;
use crate::encoding::{decode, encode, Encoding};
use crate::error::{MllpError, Result};
use crate::message::Message;
use crate::mllp::MllpCodec;

/// Builds the encoded reply for one inbound payload.
pub fn acknowledge(payload: &[u8], clock: &dyn Clock) -> Result<String> {
    let parsed = std::str::from_utf8(payload)
        .map_err(|e| e.to_string())
        .and_then(|text| decode(text, Encoding::Pipe).map_err(|e| e.to_string()));

    let ack = match parsed {
        Ok(message) => {
            info!(
                "Received {} with control ID {}",
                message.structure().unwrap_or_default(),
                message.control_id().unwrap_or("<none>")
            );
            build_ack(&message, AckCode::ApplicationAccept, None, clock)?
        }
        Err(reason) => {
            warn!("Rejecting unreadable message: {}", reason);
            let reason = printable_reason(&reason);
            build_ack(&Message::new(), AckCode::ApplicationReject, Some(&reason), clock)
                .or_else(|_| build_ack(&Message::new(), AckCode::ApplicationReject, None, clock))?
        }
    };
    encode(&ack, Encoding::Pipe)
}

/// Decode errors quote the offending input, which may hold control characters MSA-3 cannot carry.
fn printable_reason(reason: &str) -> String {
    reason
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Accepts connections forever, handling each on its own task.
pub async fn serve(listener: TcpListener, clock: Arc<dyn Clock>) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let clock = clock.clone();

        tokio::spawn(async move {
            info!("Connection opened from {}", peer);
            if let Err(e) = process(stream, clock).await {
                error!("Failed to process connection from {}; error = {}", peer, e);
            }
        });
    }
}

/// Answers every frame on one connection until the peer hangs up.
pub async fn process(stream: TcpStream, clock: Arc<dyn Clock>) -> std::result::Result<(), MllpError> {
    let mut transport = Framed::new(stream, MllpCodec::new());

    while let Some(result) = transport.next().await {
        let message = result?;
        debug!("Got {} byte message", message.len());

        let reply = match acknowledge(&message, clock.as_ref()) {
            Ok(reply) => reply,
            Err(e) => {
                error!("Could not build acknowledgment: {}", e);
                continue;
            }
        };
        transport.send(BytesMut::from(reply.as_str())).await?;
        debug!("  ACK sent...");
    }

    info!("Connection closed...");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    #[test]
    fn accepts_readable_messages() {
        let clock = FixedClock::parse("20240115093005").unwrap();
        let reply = acknowledge(b"MSH|^~\\&|APP|FAC|||20240115093000||ADT^A01|ABCC1|T|2.4\r", &clock).unwrap();

        let ack = decode(&reply, Encoding::Pipe).unwrap();
        assert_eq!(ack.get("MSA-1"), Some("AA"));
        assert_eq!(ack.get("MSA-2"), Some("ABCC1"));
        assert_eq!(ack.get("MSH-5"), Some("APP"));
    }

    #[test]
    fn rejects_garbage() {
        let clock = FixedClock::parse("20240115093005").unwrap();
        let reply = acknowledge(b"not hl7 at all", &clock).unwrap();

        let ack = decode(&reply, Encoding::Pipe).unwrap();
        assert_eq!(ack.get("MSA-1"), Some("AR"));
        assert!(ack.get("MSA-3").unwrap().contains("MSH"));
    }

    #[test]
    fn rejects_control_characters_in_segment_names() {
        let clock = FixedClock::parse("20240115093005").unwrap();
        let reply = acknowledge(b"MSH|^~\\&|A\rP\tD|x\r", &clock).unwrap();

        let ack = decode(&reply, Encoding::Pipe).unwrap();
        assert_eq!(ack.get("MSA-1"), Some("AR"));
        let text = ack.get("MSA-3").unwrap();
        assert!(text.contains("P D"), "unexpected reason: {}", text);
        assert!(!text.chars().any(char::is_control));
    }
}

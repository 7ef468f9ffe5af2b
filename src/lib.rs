/*!
# Build HL7 v2.4 ADT^A01 messages and send them over MLLP.

 An ADT^A01 ("admit a patient") is assembled segment by segment (MSH, EVN, PID, PV1) from an
 [`AdtA01Params`](builder::AdtA01Params) structure, encoded as pipe-delimited ER7 text and as HL7 v2
 XML, and sent to a remote system wrapped in MLLP framing. The remote system answers with an `ACK`
 in the same framing.

 Builders are looked up by trigger event code through a [`MessageFactory`](factory::MessageFactory);
 only `A01` ships, other events are added by registering another [`MessageBuilder`](builder::MessageBuilder).
 Timestamps come from an injected [`Clock`](clock::Clock) so builds can be made reproducible.

 ## Example
 ```no_run
use std::sync::Arc;
use std::time::Duration;

use hl7_adt_client::builder::AdtA01Params;
use hl7_adt_client::client::MllpClient;
use hl7_adt_client::clock::SystemClock;
use hl7_adt_client::encoding::{decode, encode, Encoding};
use hl7_adt_client::factory::MessageFactory;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let factory = MessageFactory::adt(AdtA01Params::default(), Arc::new(SystemClock));
    let admit = factory.create_message("A01")?;

    let client = MllpClient::new("127.0.0.1", 2575, Duration::from_secs(5), Duration::from_secs(30));
    let reply = client.send_and_receive(&encode(&admit, Encoding::Pipe)?).await?;

    println!("  Received response: {:?}", decode(&reply, Encoding::Pipe)?.get("MSA-1"));
    Ok(())
}
```
 */

pub mod ack;
pub mod builder;
pub mod client;
pub mod clock;
pub mod config;
pub mod encoding;
pub mod error;
pub mod factory;
pub mod listener;
pub mod message;
pub mod mllp;
pub mod orchestrator;

pub use error::{Hl7Error, MllpError, Result, TransportError};
pub use message::Message;
pub use mllp::MllpCodec;

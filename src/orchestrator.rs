//! The end-to-end flow: build, print, persist, send, show the reply.
//!
//! Steps run strictly in order and the first failure stops the run. Files written before the
//! failing step are left on disk.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::ack::Acknowledgment;
use crate::client::MllpClient;
use crate::clock::Clock;
use crate::config::Config;
use crate::encoding::{decode, encode, Encoding};
use crate::error::{Hl7Error, Result};
use crate::factory::MessageFactory;
use crate::message::Message;

/// What a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    pub control_id: String,
    pub pipe_file: PathBuf,
    pub xml_file: PathBuf,
    pub response: Message,
    /// Present when the reply carried a readable MSA segment.
    pub acknowledgment: Option<Acknowledgment>,
}

/// Writes `text` to `path`, replacing any existing file.
pub fn persist(path: &Path, text: &str) -> Result<()> {
    let io_error = |source: std::io::Error| Hl7Error::Io {
        path: path.to_path_buf(),
        source,
    };

    // the handle is closed on drop, on every path out of here
    let mut file = File::create(path).map_err(io_error)?;
    file.write_all(text.as_bytes()).map_err(io_error)?;
    file.flush().map_err(io_error)?;
    Ok(())
}

fn write_output(encoding: Encoding, path: &Path, text: &str, control_id: &str) -> Result<()> {
    println!("Serializing {} message to file...", encoding);
    persist(path, text)?;
    info!("Message {} written to '{}'", control_id, path.display());
    println!("Message serialized to file '{}' successfully\n", path.display());
    Ok(())
}

/// ER7 uses bare carriage returns between segments, which most terminals overwrite in place.
fn printable(er7: &str) -> String {
    er7.trim_end_matches('\r').replace('\r', "\n")
}

pub async fn run(config: &Config, clock: Arc<dyn Clock>) -> Result<RunReport> {
    let factory = MessageFactory::adt(config.message.clone(), clock);
    let client = MllpClient::from_config(&config.endpoint);
    run_with(config, &factory, &client).await
}

/// Same as [`run`] with an explicit factory and client.
pub async fn run_with(
    config: &Config,
    factory: &MessageFactory,
    client: &MllpClient,
) -> Result<RunReport> {
    println!("Creating ADT {} message...", config.trigger_event);
    let message = factory.create_message(&config.trigger_event)?;
    let control_id = message.control_id().unwrap_or_default().to_string();

    let er7 = encode(&message, Encoding::Pipe)?;
    println!("Message was constructed successfully...\n");
    println!("{}\n", printable(&er7));

    write_output(Encoding::Pipe, &config.output.pipe_file, &er7, &control_id)?;
    let xml = encode(&message, Encoding::Xml)?;
    write_output(Encoding::Xml, &config.output.xml_file, &xml, &control_id)?;

    println!("Printing message structure to console...");
    println!("{}", message.print_structure());

    println!("Sending message to {}:\n{}", client.endpoint(), printable(&er7));
    let reply = client.send_and_receive(&er7).await?;
    let response = decode(&reply, Encoding::Pipe)?;
    println!("Received response:\n{}", printable(&reply));

    let acknowledgment = match Acknowledgment::from_message(&response) {
        Ok(ack) => {
            println!("Acknowledgment code: {}", ack.code);
            if !ack.code.is_success() {
                warn!(
                    "Remote endpoint answered {} for {}: {}",
                    ack.code,
                    control_id,
                    ack.text.as_deref().unwrap_or("no reason given")
                );
            }
            if !ack.acknowledges(&control_id) {
                warn!(
                    "Acknowledgment references {:?}, expected {}",
                    ack.control_id, control_id
                );
            }
            Some(ack)
        }
        Err(e) => {
            warn!("Response carries no usable acknowledgment: {}", e);
            None
        }
    };

    Ok(RunReport {
        control_id,
        pipe_file: config.output.pipe_file.clone(),
        xml_file: config.output.xml_file.clone(),
        response,
        acknowledgment,
    })
}

//! Listens for inbound HL7 messages over MLLP and answers each with an ACK.
//!
//! Binds to `listener.bind` from the configuration (`127.0.0.1:52463` by default), the same
//! endpoint `hl7-adt-client` sends to out of the box.

use std::error::Error;
use std::sync::Arc;

use log::info;
use tokio::net::TcpListener;

use hl7_adt_client::clock::SystemClock;
use hl7_adt_client::config::Config;
use hl7_adt_client::listener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let tcp = TcpListener::bind(&config.listener.bind).await?;
    info!("Listening on {}", tcp.local_addr()?);

    listener::serve(tcp, Arc::new(SystemClock)).await?;
    Ok(())
}

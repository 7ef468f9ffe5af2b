use std::error::Error;
use std::sync::Arc;

use log::error;

use hl7_adt_client::clock::SystemClock;
use hl7_adt_client::config::Config;
use hl7_adt_client::orchestrator;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Architecture Services POC for HL7 v2.4");

    let result = match Config::load() {
        Ok(config) => orchestrator::run(&config, Arc::new(SystemClock)).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("Run aborted: {}", e);
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}

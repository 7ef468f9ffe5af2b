use std::sync::Arc;

use tokio::net::TcpListener;

use hl7_adt_client::ack::AckCode;
use hl7_adt_client::builder::AdtA01Params;
use hl7_adt_client::clock::FixedClock;
use hl7_adt_client::config::{Config, EndpointConfig, OutputConfig};
use hl7_adt_client::encoding::{decode, encode, Encoding};
use hl7_adt_client::factory::MessageFactory;
use hl7_adt_client::{listener, orchestrator, Hl7Error, Message, TransportError};

const TS: &str = "20240115093000";

fn factory_at(timestamp: &str) -> MessageFactory {
    let clock = FixedClock::parse(timestamp).unwrap();
    MessageFactory::adt(AdtA01Params::default(), Arc::new(clock))
}

fn admit() -> Message {
    factory_at(TS).create_message("A01").unwrap()
}

/// Every value the A01 builder populates.
const POPULATED: &[&str] = &[
    "MSH-1", "MSH-2", "MSH-3", "MSH-4", "MSH-5", "MSH-6", "MSH-7", "MSH-9-1", "MSH-9-2",
    "MSH-9-3", "MSH-10", "MSH-11", "MSH-12", "EVN-1", "EVN-2", "PID-3-1", "PID-5-1", "PID-5-2",
    "PID-11-1", "PID-11-3", "PID-11-4", "PID-11-6", "PV1-2", "PV1-3-1", "PV1-3-4", "PV1-4",
    "PV1-8-1", "PV1-8-2", "PV1-8-3", "PV1-8-13", "PV1-44",
];

#[test]
fn pid_carries_patient_in_documented_positions() {
    let er7 = encode(&admit(), Encoding::Pipe).unwrap();
    let segments: Vec<&str> = er7.split('\r').collect();

    assert_eq!(
        segments[0],
        "MSH|^~\\&|Connect Care <--Sending System|University of Alberta Hospital<--Sending Facility|CII <-- Receiving Remote System|CII HUB <--Receiving Remote Facility|20240115093000||ADT^A01^ADT_A01|ABCC20240115093000|T|2.4"
    );
    assert_eq!(segments[1], "EVN|A01|20240115093000");
    assert_eq!(
        segments[2],
        "PID|||378785433211||Mouse^Mickey||||||123 Main Street^^Edmonton^AB^^CA"
    );

    let pv1 = segments[3];
    let expected_start = format!(
        "PV1||O|CT:Some Point of Care^^^Radiology UofA:Some Treatment Facility Name|ALERT||||99999999^Smith^Jack{}456789|",
        "^".repeat(10)
    );
    assert!(pv1.starts_with(&expected_start), "unexpected PV1: {}", pv1);
    assert_eq!(pv1.split('|').count(), 45);
    assert!(pv1.ends_with("|20240115093000"));
}

#[test]
fn both_encodings_preserve_every_populated_value() {
    let message = admit();

    for encoding in [Encoding::Pipe, Encoding::Xml] {
        let decoded = decode(&encode(&message, encoding).unwrap(), encoding).unwrap();

        for path in POPULATED {
            let value = message.get(path);
            assert!(value.map_or(false, |v| !v.is_empty()), "{} not populated", path);
            assert_eq!(decoded.get(path), value, "{} changed through {}", path, encoding);
        }
        assert_eq!(decoded, message, "structure changed through {}", encoding);
    }
}

#[test]
fn encoding_is_repeatable_and_only_time_fields_move() {
    let first = admit();
    assert_eq!(
        encode(&first, Encoding::Pipe).unwrap(),
        encode(&first, Encoding::Pipe).unwrap()
    );
    assert_eq!(
        encode(&first, Encoding::Xml).unwrap(),
        encode(&first, Encoding::Xml).unwrap()
    );

    let later = factory_at("20240115093001").create_message("A01").unwrap();
    let time_fields = ["MSH-7", "MSH-10", "EVN-2", "PV1-44"];
    for path in POPULATED {
        if time_fields.contains(path) {
            assert_ne!(first.get(path), later.get(path), "{} should follow the clock", path);
        } else {
            assert_eq!(first.get(path), later.get(path), "{} should not depend on time", path);
        }
    }
}

#[test]
fn unsupported_trigger_event_returns_nothing() {
    match factory_at(TS).create_message("A02") {
        Err(Hl7Error::UnsupportedMessageType(code)) => assert_eq!(code, "A02"),
        other => panic!("expected an unsupported type error, got {:?}", other),
    }
}

fn config_for(dir: &std::path::Path, port: u16) -> Config {
    Config {
        endpoint: EndpointConfig {
            host: "127.0.0.1".to_string(),
            port,
            connect_timeout_ms: 2_000,
            response_timeout_ms: 5_000,
        },
        output: OutputConfig {
            pipe_file: dir.join("admit.txt"),
            xml_file: dir.join("admit.xml"),
        },
        ..Config::default()
    }
}

#[tokio::test]
async fn full_run_persists_sends_and_reads_ack() {
    let dir = tempfile::tempdir().unwrap();
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = tcp.local_addr().unwrap().port();
    tokio::spawn(listener::serve(
        tcp,
        Arc::new(FixedClock::parse("20240115093005").unwrap()),
    ));

    let config = config_for(dir.path(), port);
    let clock = Arc::new(FixedClock::parse(TS).unwrap());
    let report = orchestrator::run(&config, clock).await.unwrap();

    assert_eq!(report.control_id, "ABCC20240115093000");

    let er7 = std::fs::read_to_string(&report.pipe_file).unwrap();
    assert!(er7.starts_with("MSH|^~\\&|"));
    assert_eq!(decode(&er7, Encoding::Pipe).unwrap(), admit());

    let xml = std::fs::read_to_string(&report.xml_file).unwrap();
    assert!(xml.contains("<ADT_A01 xmlns=\"urn:hl7-org:v2xml\">"));
    assert_eq!(decode(&xml, Encoding::Xml).unwrap(), admit());

    let ack = report.acknowledgment.expect("listener replies with an MSA");
    assert_eq!(ack.code, AckCode::ApplicationAccept);
    assert!(ack.acknowledges("ABCC20240115093000"));
    assert_eq!(report.response.get("MSH-9-1"), Some("ACK"));
}

// Files written before a failing step stay on disk.
#[tokio::test]
async fn failed_send_keeps_written_files() {
    let dir = tempfile::tempdir().unwrap();
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = tcp.local_addr().unwrap().port();
    drop(tcp);

    let config = config_for(dir.path(), port);
    let clock = Arc::new(FixedClock::parse(TS).unwrap());

    match orchestrator::run(&config, clock).await {
        Err(Hl7Error::Transport(TransportError::Connection { .. })) => {}
        other => panic!("expected a connection error, got {:?}", other),
    }
    assert!(config.output.pipe_file.exists());
    assert!(config.output.xml_file.exists());
}

#[tokio::test]
async fn unsupported_event_stops_before_any_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        trigger_event: "A02".to_string(),
        ..config_for(dir.path(), 1)
    };
    let clock = Arc::new(FixedClock::parse(TS).unwrap());

    assert!(matches!(
        orchestrator::run(&config, clock).await,
        Err(Hl7Error::UnsupportedMessageType(_))
    ));
    assert!(!config.output.pipe_file.exists());
    assert!(!config.output.xml_file.exists());
}

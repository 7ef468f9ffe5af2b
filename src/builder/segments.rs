//! One function per segment of an ADT^A01.
//!
//! Each builder checks the values it writes and fails with [`Hl7Error::FieldFormat`] naming the
//! segment and field, so callers never see a half-populated segment.

use crate::builder::params::{HeaderParams, PatientParams, VisitParams};
use crate::clock::parse_timestamp;
use crate::error::{Hl7Error, Result};
use crate::message::Segment;

pub const FIELD_SEPARATOR: &str = "|";
pub const ENCODING_CHARACTERS: &str = "^~\\&";
pub const VERSION_ID: &str = "2.4";

/// MSH-10 is an `ST` of at most 20 characters in v2.4.
const MAX_CONTROL_ID_LEN: usize = 20;

/// Message-wide values captured once per build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageStamp {
    pub timestamp: String,
    pub control_id: String,
}

impl MessageStamp {
    /// Control ID is `<prefix><timestamp>`.
    pub fn new(prefix: &str, timestamp: String) -> Result<Self> {
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Hl7Error::field_format(
                "MSH",
                10,
                format!("control ID prefix '{}' must be alphanumeric", prefix),
            ));
        }
        check_timestamp("MSH", 7, &timestamp)?;

        let control_id = format!("{}{}", prefix, timestamp);
        if control_id.len() > MAX_CONTROL_ID_LEN {
            return Err(Hl7Error::field_format(
                "MSH",
                10,
                format!(
                    "control ID '{}' exceeds {} characters",
                    control_id, MAX_CONTROL_ID_LEN
                ),
            ));
        }
        Ok(Self {
            timestamp,
            control_id,
        })
    }
}

fn check_value<'a>(segment: &'static str, field: usize, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Hl7Error::field_format(segment, field, "value must not be empty"));
    }
    if let Some(c) = value.chars().find(|c| c.is_control()) {
        return Err(Hl7Error::field_format(
            segment,
            field,
            format!("control character {:?} is not allowed", c),
        ));
    }
    Ok(value)
}

fn check_timestamp<'a>(segment: &'static str, field: usize, value: &'a str) -> Result<&'a str> {
    match parse_timestamp(value) {
        Some(_) => Ok(value),
        None => Err(Hl7Error::field_format(
            segment,
            field,
            format!("'{}' is not a yyyyMMddHHmmss timestamp", value),
        )),
    }
}

fn check_at_least_one<T>(segment: &'static str, field: usize, items: &[T]) -> Result<()> {
    if items.is_empty() {
        return Err(Hl7Error::field_format(
            segment,
            field,
            "at least one repetition is required",
        ));
    }
    Ok(())
}

/// Message Header: delimiters, both endpoints, timestamp, type, control ID and version.
///
/// `structure` is the abstract message structure (MSH-9-3), e.g. `ADT_A01`.
pub fn build_msh(
    header: &HeaderParams,
    trigger_event: &str,
    structure: &str,
    stamp: &MessageStamp,
) -> Result<Segment> {
    let mut msh = Segment::new("MSH");
    msh.set(1, 1, FIELD_SEPARATOR);
    msh.set(2, 1, ENCODING_CHARACTERS);
    msh.set(3, 1, check_value("MSH", 3, &header.sending_application)?);
    msh.set(4, 1, check_value("MSH", 4, &header.sending_facility)?);
    msh.set(5, 1, check_value("MSH", 5, &header.receiving_application)?);
    msh.set(6, 1, check_value("MSH", 6, &header.receiving_facility)?);
    msh.set(7, 1, check_timestamp("MSH", 7, &stamp.timestamp)?);
    msh.set(9, 1, "ADT");
    msh.set(9, 2, check_value("MSH", 9, trigger_event)?);
    msh.set(9, 3, check_value("MSH", 9, structure)?);
    msh.set(10, 1, check_value("MSH", 10, &stamp.control_id)?);

    let processing_id = check_value("MSH", 11, &header.processing_id)?;
    if !matches!(processing_id, "P" | "T" | "D") {
        return Err(Hl7Error::field_format(
            "MSH",
            11,
            format!("processing ID '{}' must be P, T or D", processing_id),
        ));
    }
    msh.set(11, 1, processing_id);
    msh.set(12, 1, VERSION_ID);
    Ok(msh)
}

/// Event Type: the trigger event and when it was recorded.
pub fn build_evn(trigger_event: &str, timestamp: &str) -> Result<Segment> {
    let mut evn = Segment::new("EVN");
    evn.set(1, 1, check_value("EVN", 1, trigger_event)?);
    evn.set(2, 1, check_timestamp("EVN", 2, timestamp)?);
    Ok(evn)
}

/// Patient Identification: identifier list (PID-3), names (PID-5) and addresses (PID-11).
pub fn build_pid(patient: &PatientParams) -> Result<Segment> {
    let mut pid = Segment::new("PID");

    check_at_least_one("PID", 3, &patient.identifiers)?;
    for (rep, id) in patient.identifiers.iter().enumerate() {
        pid.set_at(3, rep, 1, 1, check_value("PID", 3, id)?);
    }

    check_at_least_one("PID", 5, &patient.names)?;
    for (rep, name) in patient.names.iter().enumerate() {
        pid.set_at(5, rep, 1, 1, check_value("PID", 5, &name.family)?);
        pid.set_at(5, rep, 2, 1, check_value("PID", 5, &name.given)?);
    }

    check_at_least_one("PID", 11, &patient.addresses)?;
    for (rep, address) in patient.addresses.iter().enumerate() {
        pid.set_at(11, rep, 1, 1, check_value("PID", 11, &address.street)?);
        pid.set_at(11, rep, 3, 1, check_value("PID", 11, &address.city)?);
        pid.set_at(11, rep, 4, 1, check_value("PID", 11, &address.province)?);
        pid.set_at(11, rep, 6, 1, check_value("PID", 11, &address.country)?);
    }

    Ok(pid)
}

/// Patient Visit: class, location, admission type, referring doctors and admit time.
pub fn build_pv1(visit: &VisitParams, timestamp: &str) -> Result<Segment> {
    let mut pv1 = Segment::new("PV1");
    pv1.set(2, 1, check_value("PV1", 2, &visit.patient_class)?);

    // PL: point of care is component 1, facility component 4
    pv1.set(3, 1, check_value("PV1", 3, &visit.point_of_care)?);
    pv1.set(3, 4, check_value("PV1", 3, &visit.facility)?);

    pv1.set(4, 1, check_value("PV1", 4, &visit.admission_type)?);

    check_at_least_one("PV1", 8, &visit.referring_doctors)?;
    for (rep, doctor) in visit.referring_doctors.iter().enumerate() {
        pv1.set_at(8, rep, 1, 1, check_value("PV1", 8, &doctor.id)?);
        pv1.set_at(8, rep, 2, 1, check_value("PV1", 8, &doctor.family)?);
        pv1.set_at(8, rep, 3, 1, check_value("PV1", 8, &doctor.given)?);
        pv1.set_at(
            8,
            rep,
            13,
            1,
            check_value("PV1", 8, &doctor.identifier_type_code)?,
        );
    }

    let admit_time = visit.admit_time.as_deref().unwrap_or(timestamp);
    pv1.set(44, 1, check_timestamp("PV1", 44, admit_time)?);
    Ok(pv1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::params::{PersonName, Provider};

    const TS: &str = "20240115093000";

    fn stamp() -> MessageStamp {
        MessageStamp::new("ABCC", TS.to_string()).unwrap()
    }

    fn expect_field_error(result: Result<Segment>, segment: &str, field: usize) {
        match result {
            Err(Hl7Error::FieldFormat {
                segment: s,
                field: f,
                ..
            }) => {
                assert_eq!(s, segment);
                assert_eq!(f, field);
            }
            other => panic!("expected {}-{} format error, got {:?}", segment, field, other),
        }
    }

    #[test]
    fn stamp_joins_prefix_and_timestamp() {
        assert_eq!(stamp().control_id, "ABCC20240115093000");
    }

    #[test]
    fn stamp_rejects_bad_prefix_and_overlong_ids() {
        assert!(matches!(
            MessageStamp::new("AB-C", TS.to_string()),
            Err(Hl7Error::FieldFormat { field: 10, .. })
        ));
        assert!(matches!(
            MessageStamp::new("ABCDEFGHI", TS.to_string()),
            Err(Hl7Error::FieldFormat { field: 10, .. })
        ));
        assert!(matches!(
            MessageStamp::new("ABCC", "2024".to_string()),
            Err(Hl7Error::FieldFormat { field: 7, .. })
        ));
    }

    #[test]
    fn msh_carries_delimiters_and_version() {
        let msh = build_msh(&HeaderParams::default(), "A01", "ADT_A01", &stamp()).unwrap();

        assert_eq!(msh.get(1, 1), Some("|"));
        assert_eq!(msh.get(2, 1), Some("^~\\&"));
        assert_eq!(msh.get(3, 1), Some("Connect Care <--Sending System"));
        assert_eq!(msh.get(7, 1), Some(TS));
        assert_eq!(msh.get(9, 2), Some("A01"));
        assert_eq!(msh.get(10, 1), Some("ABCC20240115093000"));
        assert_eq!(msh.get(11, 1), Some("T"));
        assert_eq!(msh.get(12, 1), Some("2.4"));
    }

    #[test]
    fn msh_rejects_unknown_processing_id() {
        let header = HeaderParams {
            processing_id: "X".to_string(),
            ..HeaderParams::default()
        };
        expect_field_error(build_msh(&header, "A01", "ADT_A01", &stamp()), "MSH", 11);
    }

    #[test]
    fn msh_rejects_empty_sending_facility() {
        let header = HeaderParams {
            sending_facility: "  ".to_string(),
            ..HeaderParams::default()
        };
        expect_field_error(build_msh(&header, "A01", "ADT_A01", &stamp()), "MSH", 4);
    }

    #[test]
    fn pid_supports_repeating_names() {
        let mut patient = PatientParams::default();
        patient.names.push(PersonName {
            family: "Mouse".to_string(),
            given: "Mick".to_string(),
        });
        let pid = build_pid(&patient).unwrap();

        assert_eq!(pid.get_at(5, 0, 2, 1), Some("Mickey"));
        assert_eq!(pid.get_at(5, 1, 2, 1), Some("Mick"));
        assert_eq!(pid.get_at(11, 0, 4, 1), Some("AB"));
    }

    #[test]
    fn pid_requires_an_identifier() {
        let patient = PatientParams {
            identifiers: Vec::new(),
            ..PatientParams::default()
        };
        expect_field_error(build_pid(&patient), "PID", 3);
    }

    #[test]
    fn pid_rejects_control_characters() {
        let mut patient = PatientParams::default();
        patient.addresses[0].city = "Edmon\rton".to_string();
        expect_field_error(build_pid(&patient), "PID", 11);
    }

    #[test]
    fn pv1_defaults_admit_time_to_message_time() {
        let pv1 = build_pv1(&VisitParams::default(), TS).unwrap();

        assert_eq!(pv1.get(2, 1), Some("O"));
        assert_eq!(pv1.get(3, 1), Some("CT:Some Point of Care"));
        assert_eq!(pv1.get(3, 4), Some("Radiology UofA:Some Treatment Facility Name"));
        assert_eq!(pv1.get(8, 13), Some("456789"));
        assert_eq!(pv1.get(44, 1), Some(TS));
    }

    #[test]
    fn pv1_rejects_malformed_admit_time() {
        let visit = VisitParams {
            admit_time: Some("2024-01-15".to_string()),
            ..VisitParams::default()
        };
        expect_field_error(build_pv1(&visit, TS), "PV1", 44);
    }

    #[test]
    fn pv1_requires_a_referring_doctor() {
        let visit = VisitParams {
            referring_doctors: Vec::<Provider>::new(),
            ..VisitParams::default()
        };
        expect_field_error(build_pv1(&visit, TS), "PV1", 8);
    }
}

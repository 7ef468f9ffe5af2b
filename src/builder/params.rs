//! Input values for the ADT^A01 builder.
//!
//! Every struct deserializes from the `[message]` table of the configuration file and falls back
//! to the demonstration values below for anything left out.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdtA01Params {
    pub header: HeaderParams,
    pub patient: PatientParams,
    pub visit: VisitParams,
}

/// MSH values that identify the two ends of the exchange.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeaderParams {
    pub sending_application: String,
    pub sending_facility: String,
    pub receiving_application: String,
    pub receiving_facility: String,
    /// Short alphanumeric prefix of the message control ID.
    pub control_id_prefix: String,
    /// MSH-11, `P`roduction, `T`raining or `D`ebugging.
    pub processing_id: String,
}

impl Default for HeaderParams {
    fn default() -> Self {
        Self {
            sending_application: "Connect Care <--Sending System".to_string(),
            sending_facility: "University of Alberta Hospital<--Sending Facility".to_string(),
            receiving_application: "CII <-- Receiving Remote System".to_string(),
            receiving_facility: "CII HUB <--Receiving Remote Facility".to_string(),
            control_id_prefix: "ABCC".to_string(),
            processing_id: "T".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatientParams {
    pub names: Vec<PersonName>,
    pub identifiers: Vec<String>,
    pub addresses: Vec<Address>,
}

impl Default for PatientParams {
    fn default() -> Self {
        Self {
            names: vec![PersonName {
                family: "Mouse".to_string(),
                given: "Mickey".to_string(),
            }],
            identifiers: vec!["378785433211".to_string()],
            addresses: vec![Address {
                street: "123 Main Street".to_string(),
                city: "Edmonton".to_string(),
                province: "AB".to_string(),
                country: "CA".to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonName {
    pub family: String,
    pub given: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub province: String,
    pub country: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisitParams {
    pub patient_class: String,
    pub facility: String,
    pub point_of_care: String,
    pub admission_type: String,
    pub referring_doctors: Vec<Provider>,
    /// PV1-44; the message timestamp is used when unset.
    pub admit_time: Option<String>,
}

impl Default for VisitParams {
    fn default() -> Self {
        Self {
            patient_class: "O".to_string(),
            facility: "Radiology UofA:Some Treatment Facility Name".to_string(),
            point_of_care: "CT:Some Point of Care".to_string(),
            admission_type: "ALERT".to_string(),
            referring_doctors: vec![Provider {
                id: "99999999".to_string(),
                family: "Smith".to_string(),
                given: "Jack".to_string(),
                identifier_type_code: "456789".to_string(),
            }],
            admit_time: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Provider {
    pub id: String,
    pub family: String,
    pub given: String,
    pub identifier_type_code: String,
}

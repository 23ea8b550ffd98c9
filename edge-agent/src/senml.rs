//! SenML (RFC 8428) JSON payloads
//!
//! Every response the agent sends to the control plane is a SenML pack
//! holding a single record:
//! - `bn` echoes the caller-supplied identifier
//! - `n` carries the command verb
//! - `vs` carries the textual result (always present, possibly empty)
//!
//! Inbound requests use the same format, so the module decodes as well.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A single SenML record. Only the string-valued subset is produced by the
/// agent, but the full field set is accepted on decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "bn", default, skip_serializing_if = "String::is_empty")]
    pub base_name: String,
    #[serde(rename = "bt", skip_serializing_if = "Option::is_none")]
    pub base_time: Option<f64>,
    #[serde(rename = "bu", skip_serializing_if = "Option::is_none")]
    pub base_unit: Option<String>,
    #[serde(rename = "bver", skip_serializing_if = "Option::is_none")]
    pub base_version: Option<u32>,
    #[serde(rename = "bv", skip_serializing_if = "Option::is_none")]
    pub base_value: Option<f64>,
    #[serde(rename = "bs", skip_serializing_if = "Option::is_none")]
    pub base_sum: Option<f64>,
    #[serde(rename = "n", default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "u", skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(rename = "t", skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(rename = "ut", skip_serializing_if = "Option::is_none")]
    pub update_time: Option<f64>,
    #[serde(rename = "v", skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(rename = "vs", skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(rename = "vb", skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
    #[serde(rename = "vd", skip_serializing_if = "Option::is_none")]
    pub data_value: Option<String>,
    #[serde(rename = "s", skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
}

impl Record {
    /// Record with only `bn`, `n` and `vs` set.
    pub fn string(base_name: &str, name: &str, value: &str) -> Self {
        Self {
            base_name: base_name.to_string(),
            name: name.to_string(),
            string_value: Some(value.to_string()),
            ..Default::default()
        }
    }
}

/// A SenML pack is a JSON array of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pack {
    pub records: Vec<Record>,
}

/// Encode `(bn, n, vs)` as a one-record SenML JSON pack.
pub fn encode(base_name: &str, name: &str, value: &str) -> Result<Vec<u8>> {
    let pack = Pack {
        records: vec![Record::string(base_name, name, value)],
    };
    Ok(serde_json::to_vec(&pack)?)
}

pub fn decode(payload: &[u8]) -> Result<Pack> {
    Ok(serde_json::from_slice(payload)?)
}

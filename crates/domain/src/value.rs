//! Typed replacement for free-form JSON metadata bags.
//!
//! The source system attaches ad hoc JSON blobs (`annotations`, `metadata`)
//! to several entities. Per the redesign notes, those become a map from
//! string to a small tagged union covering the primitives actually used,
//! instead of an open `serde_json::Value`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetadataValue {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<String>),
}

pub type Metadata = BTreeMap<String, MetadataValue>;

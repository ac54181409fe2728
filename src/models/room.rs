use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::wire::text;

/// A room as returned by the room scan endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    #[serde(default, deserialize_with = "text")]
    pub uid: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub floor: Option<String>,
    /// Fields this client does not interpret, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

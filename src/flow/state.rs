use serde::Serialize;

use crate::api::LookupError;
use crate::card::EquipmentCard;
use crate::models::EquipmentRecord;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LookupFailure {
    NotFound,
    Transport,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FlowState {
    Scanning,
    Loading {
        code: String,
    },
    Result {
        code: String,
        card: EquipmentCard,
    },
    Error {
        code: String,
        kind: LookupFailure,
        message: String,
    },
}

impl Default for FlowState {
    fn default() -> Self {
        FlowState::Scanning
    }
}

impl FlowState {
    pub fn from_lookup(code: String, outcome: Result<EquipmentRecord, LookupError>) -> Self {
        match outcome {
            Ok(record) => FlowState::Result {
                code,
                card: EquipmentCard::from_record(&record),
            },
            Err(err) => FlowState::Error {
                code,
                kind: if err.is_not_found() {
                    LookupFailure::NotFound
                } else {
                    LookupFailure::Transport
                },
                message: err.to_string(),
            },
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            FlowState::Scanning => None,
            FlowState::Loading { code }
            | FlowState::Result { code, .. }
            | FlowState::Error { code, .. } => Some(code),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, FlowState::Loading { .. })
    }
}

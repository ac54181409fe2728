mod client;
pub mod commands;
mod error;

use std::future::Future;

use crate::models::EquipmentRecord;

pub use client::{InventoryClient, DEFAULT_BASE_URL};
pub use error::{Entity, LookupError};

/// Resolves a decoded payload to an equipment record.
pub trait EquipmentLookup: Send + Sync + 'static {
    fn scan_equipment(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<EquipmentRecord, LookupError>> + Send;
}

mod equipment;
mod room;
pub mod wire;

pub use equipment::{EquipmentRecord, Location};
pub use room::RoomRecord;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::wire::{non_empty, resolve_relation, text, value_text, RelationField};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquipmentStatus {
    New,
    Broken,
    InRepair,
    Disposed,
    /// Anything the service adds later; shown verbatim.
    Other(String),
}

impl EquipmentStatus {
    pub fn parse(code: &str) -> Self {
        match code {
            "new" => EquipmentStatus::New,
            "broken" => EquipmentStatus::Broken,
            "in_repair" => EquipmentStatus::InRepair,
            "disposed" => EquipmentStatus::Disposed,
            other => EquipmentStatus::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            EquipmentStatus::New => "new",
            EquipmentStatus::Broken => "broken",
            EquipmentStatus::InRepair => "in_repair",
            EquipmentStatus::Disposed => "disposed",
            EquipmentStatus::Other(code) => code,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            EquipmentStatus::New => "New",
            EquipmentStatus::Broken => "Broken",
            EquipmentStatus::InRepair => "In repair",
            EquipmentStatus::Disposed => "Disposed",
            EquipmentStatus::Other(code) => code,
        }
    }

    pub fn css_class(&self) -> &str {
        match self {
            EquipmentStatus::New => "status-new",
            EquipmentStatus::Broken => "status-broken",
            EquipmentStatus::InRepair => "status-in_repair",
            EquipmentStatus::Disposed => "status-disposed",
            EquipmentStatus::Other(_) => "status-badge",
        }
    }
}

impl Serialize for EquipmentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedEntity {
    #[serde(default, deserialize_with = "text")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(default, deserialize_with = "text")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub floor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    #[serde(default, deserialize_with = "text")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "text")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub last_name: Option<String>,
}

impl Author {
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Location {
    Room(Room),
    Warehouse(Warehouse),
}

/// One entry of the free-form `specs` map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SpecValue {
    Scalar(Value),
    Labeled { value: Value, display: Option<String> },
}

impl<'de> Deserialize<'de> for SpecValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Object(mut map) => SpecValue::Labeled {
                value: map.remove("value").unwrap_or(Value::Null),
                display: map.remove("display").and_then(value_text),
            },
            other => SpecValue::Scalar(other),
        })
    }
}

impl SpecValue {
    pub fn value_text(&self) -> String {
        let value = match self {
            SpecValue::Scalar(value) | SpecValue::Labeled { value, .. } => value,
        };
        value_text(value.clone()).unwrap_or_default()
    }

    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        match self {
            SpecValue::Labeled {
                display: Some(display),
                ..
            } if !display.trim().is_empty() => display,
            _ => key,
        }
    }
}

/// Shape of the equipment JSON as the service sends it.
#[derive(Debug, Default, Deserialize)]
struct EquipmentWire {
    #[serde(default, deserialize_with = "text")]
    name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    inn: Option<String>,
    #[serde(default, deserialize_with = "text")]
    status: Option<String>,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    specs: Option<IndexMap<String, SpecValue>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    qr_code_url: Option<String>,
    #[serde(default)]
    tenant: Option<RelationField<NamedEntity>>,
    #[serde(default)]
    tenant_data: Option<NamedEntity>,
    #[serde(default, rename = "type")]
    equipment_type: Option<RelationField<NamedEntity>>,
    #[serde(default)]
    type_data: Option<NamedEntity>,
    #[serde(default)]
    room: Option<RelationField<Room>>,
    #[serde(default)]
    room_data: Option<Room>,
    #[serde(default)]
    warehouse: Option<RelationField<Warehouse>>,
    #[serde(default)]
    warehouse_data: Option<Warehouse>,
    #[serde(default)]
    author: Option<RelationField<Author>>,
    #[serde(default)]
    author_data: Option<Author>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "text")]
    uid: Option<String>,
}

/// Equipment with every relation already resolved to present-or-absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EquipmentWire", rename_all = "camelCase")]
pub struct EquipmentRecord {
    pub name: Option<String>,
    pub inventory_number: Option<String>,
    pub status: Option<EquipmentStatus>,
    pub is_active: bool,
    pub photo: Option<String>,
    pub specs: IndexMap<String, SpecValue>,
    pub description: Option<String>,
    pub qr_code_url: Option<String>,
    pub organization: Option<String>,
    pub equipment_type: Option<NamedEntity>,
    pub location: Option<Location>,
    pub author: Option<Author>,
    pub created_at: Option<String>,
    pub uid: Option<String>,
}

impl EquipmentRecord {
    pub fn from_wire(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

impl From<EquipmentWire> for EquipmentRecord {
    fn from(wire: EquipmentWire) -> Self {
        let room = resolve_relation(wire.room, wire.room_data);
        let warehouse = resolve_relation(wire.warehouse, wire.warehouse_data)
            .filter(|w| non_empty(w.name.clone()).is_some());
        let location = match (room, warehouse) {
            (Some(room), _) => Some(Location::Room(room)),
            (None, Some(warehouse)) => Some(Location::Warehouse(warehouse)),
            (None, None) => None,
        };

        Self {
            name: non_empty(wire.name),
            inventory_number: non_empty(wire.inn),
            status: non_empty(wire.status).map(|code| EquipmentStatus::parse(&code)),
            is_active: wire.is_active.unwrap_or(false),
            photo: non_empty(wire.photo_url).or_else(|| non_empty(wire.photo)),
            specs: wire.specs.unwrap_or_default(),
            description: non_empty(wire.description),
            qr_code_url: non_empty(wire.qr_code_url),
            organization: resolve_relation(wire.tenant, wire.tenant_data)
                .and_then(|tenant| non_empty(tenant.name)),
            equipment_type: resolve_relation(wire.equipment_type, wire.type_data),
            location,
            author: resolve_relation(wire.author, wire.author_data),
            created_at: non_empty(wire.created_at),
            uid: non_empty(wire.uid),
        }
    }
}

//! Display formatting for a resolved equipment record.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::{EquipmentRecord, Location};

pub const NOT_SPECIFIED: &str = "Not specified";
pub const UNNAMED: &str = "Unnamed";
pub const UNKNOWN_TYPE: &str = "Unknown type";
pub const NO_DATE: &str = "—";
const ROOM_FALLBACK: &str = "Room";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub label: String,
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecRow {
    pub name: String,
    pub value: String,
}

/// Everything the result screen shows, already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentCard {
    pub title: String,
    pub type_label: String,
    pub inventory_number: String,
    pub organization: String,
    pub location: String,
    /// Only rooms with a known floor get this line.
    pub floor: Option<String>,
    pub status: Badge,
    pub activity: Badge,
    pub specs: Vec<SpecRow>,
    pub description: String,
    pub photo: Option<String>,
    pub qr_code_url: Option<String>,
    pub created: String,
    pub author: String,
    pub uid: String,
}

impl EquipmentCard {
    pub fn from_record(record: &EquipmentRecord) -> Self {
        let or_not_specified =
            |value: &Option<String>| value.clone().unwrap_or_else(|| NOT_SPECIFIED.to_string());

        let status = match &record.status {
            Some(status) => Badge {
                label: status.label().to_string(),
                class: status.css_class().to_string(),
            },
            None => Badge {
                label: NOT_SPECIFIED.to_string(),
                class: "status-badge".to_string(),
            },
        };

        let activity = if record.is_active {
            Badge {
                label: "Active".to_string(),
                class: "status-active".to_string(),
            }
        } else {
            Badge {
                label: "Inactive".to_string(),
                class: "status-inactive".to_string(),
            }
        };

        let specs = record
            .specs
            .iter()
            .map(|(key, value)| SpecRow {
                name: value.display_name(key).to_string(),
                value: value.value_text(),
            })
            .collect();

        Self {
            title: record.name.clone().unwrap_or_else(|| UNNAMED.to_string()),
            type_label: record
                .equipment_type
                .as_ref()
                .and_then(|t| t.name.clone())
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
            inventory_number: or_not_specified(&record.inventory_number),
            organization: or_not_specified(&record.organization),
            location: location_label(record.location.as_ref()),
            floor: floor_line(record.location.as_ref()),
            status,
            activity,
            specs,
            description: or_not_specified(&record.description),
            photo: record.photo.clone(),
            qr_code_url: record.qr_code_url.clone(),
            created: format_date(record.created_at.as_deref()),
            author: record
                .author
                .as_ref()
                .and_then(|author| author.full_name())
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            uid: or_not_specified(&record.uid),
        }
    }
}

fn location_label(location: Option<&Location>) -> String {
    match location {
        Some(Location::Room(room)) => {
            let label = format!(
                "{} {}",
                room.number.as_deref().unwrap_or_default(),
                room.name.as_deref().unwrap_or_default()
            );
            let label = label.trim();
            if label.is_empty() {
                ROOM_FALLBACK.to_string()
            } else {
                label.to_string()
            }
        }
        Some(Location::Warehouse(warehouse)) => warehouse
            .name
            .clone()
            .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        None => NOT_SPECIFIED.to_string(),
    }
}

fn floor_line(location: Option<&Location>) -> Option<String> {
    match location {
        Some(Location::Room(room)) => room
            .floor
            .as_deref()
            .map(str::trim)
            .filter(|floor| !floor.is_empty() && *floor != "0")
            .map(|floor| format!("Floor {floor}")),
        _ => None,
    }
}

/// `dd.mm.yyyy` in the timestamp's own offset. Unparseable input is shown as-is.
pub fn format_date(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return NO_DATE.to_string();
    };

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return timestamp.format("%d.%m.%Y").to_string();
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return timestamp.format("%d.%m.%Y").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%d.%m.%Y").to_string();
    }
    raw.to_string()
}

impl fmt::Display for EquipmentCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}]", self.title, self.type_label)?;
        writeln!(f, "Inventory number: {}", self.inventory_number)?;
        writeln!(f, "Organization: {}", self.organization)?;
        match &self.floor {
            Some(floor) => writeln!(f, "Location: {} ({floor})", self.location)?,
            None => writeln!(f, "Location: {}", self.location)?,
        }
        writeln!(f, "Status: {}", self.status.label)?;
        writeln!(f, "Activity: {}", self.activity.label)?;
        for row in &self.specs {
            writeln!(f, "  {}: {}", row.name, row.value)?;
        }
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "Added: {}", self.created)?;
        writeln!(f, "Author: {}", self.author)?;
        write!(f, "UID: {}", self.uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn card(value: serde_json::Value) -> EquipmentCard {
        EquipmentCard::from_record(&EquipmentRecord::from_wire(value).unwrap())
    }

    #[test]
    fn empty_record_uses_placeholders() {
        let card = card(json!({}));
        assert_eq!(card.title, UNNAMED);
        assert_eq!(card.type_label, UNKNOWN_TYPE);
        assert_eq!(card.inventory_number, NOT_SPECIFIED);
        assert_eq!(card.organization, NOT_SPECIFIED);
        assert_eq!(card.location, NOT_SPECIFIED);
        assert_eq!(card.floor, None);
        assert_eq!(card.status.class, "status-badge");
        assert_eq!(card.activity.label, "Inactive");
        assert_eq!(card.description, NOT_SPECIFIED);
        assert_eq!(card.created, NO_DATE);
        assert_eq!(card.author, NOT_SPECIFIED);
        assert_eq!(card.uid, NOT_SPECIFIED);
        assert!(card.specs.is_empty());
    }

    #[test]
    fn sibling_relations_render_like_nested_ones() {
        let nested = card(json!({
            "name": "Microscope",
            "type": {"name": "Optics"},
            "room": {"number": "310", "name": "Biology", "floor": 3},
            "author": {"first_name": "Olga", "last_name": "Sidorova"}
        }));
        let siblings = card(json!({
            "name": "Microscope",
            "type": 8,
            "type_data": {"name": "Optics"},
            "room": 41,
            "room_data": {"number": "310", "name": "Biology", "floor": 3},
            "author": 5,
            "author_data": {"first_name": "Olga", "last_name": "Sidorova"}
        }));

        assert_eq!(nested, siblings);
        assert_eq!(nested.type_label, "Optics");
        assert_eq!(nested.location, "310 Biology");
        assert_eq!(nested.floor.as_deref(), Some("Floor 3"));
        assert_eq!(nested.author, "Olga Sidorova");
    }

    #[test]
    fn unknown_status_renders_literally() {
        let card = card(json!({"status": "archived"}));
        assert_eq!(
            card.status,
            Badge {
                label: "archived".into(),
                class: "status-badge".into()
            }
        );
    }

    #[test]
    fn known_statuses_map_to_labels() {
        let card = card(json!({"status": "in_repair", "is_active": true}));
        assert_eq!(card.status.label, "In repair");
        assert_eq!(card.status.class, "status-in_repair");
        assert_eq!(card.activity.class, "status-active");
    }

    #[test]
    fn room_without_number_or_name() {
        let card = card(json!({"room": {"floor": null}}));
        assert_eq!(card.location, "Room");
        assert_eq!(card.floor, None);
    }

    #[test]
    fn warehouse_location() {
        let card = card(json!({"warehouse_data": {"name": "Store 2"}}));
        assert_eq!(card.location, "Store 2");
    }

    #[test]
    fn spec_rows_fall_back_to_key() {
        let card = card(json!({
            "specs": {"weight": {"value": "2 kg"}, "color": "black"}
        }));
        assert_eq!(
            card.specs,
            vec![
                SpecRow {
                    name: "weight".into(),
                    value: "2 kg".into()
                },
                SpecRow {
                    name: "color".into(),
                    value: "black".into()
                },
            ]
        );
    }

    #[test]
    fn dates_use_their_own_offset() {
        assert_eq!(format_date(Some("2024-03-05T23:30:00+03:00")), "05.03.2024");
        assert_eq!(format_date(Some("2024-03-05T23:30:00Z")), "05.03.2024");
        assert_eq!(format_date(Some("2024-12-01T08:00:00.123456")), "01.12.2024");
        assert_eq!(format_date(Some("2024-12-01")), "01.12.2024");
        assert_eq!(format_date(Some("yesterday")), "yesterday");
        assert_eq!(format_date(None), NO_DATE);
        assert_eq!(format_date(Some("")), NO_DATE);
    }

    #[test]
    fn display_renders_plain_text() {
        let text = card(json!({
            "name": "Projector",
            "inn": "INV-0042",
            "status": "new",
            "created_at": "2023-09-01T10:00:00Z"
        }))
        .to_string();

        assert!(text.starts_with("Projector [Unknown type]\n"));
        assert!(text.contains("Inventory number: INV-0042"));
        assert!(text.contains("Status: New"));
        assert!(text.contains("Added: 01.09.2023"));
        assert!(text.ends_with("UID: Not specified"));
    }
}

//! Reading and writing the flat `pins.json` format.
//!
//! Loading is forgiving: each array element is repaired field by field, and an
//! element that is not even an object becomes a fully defaulted pin. Only a
//! file that is unreadable, not JSON, or not an array is an error.

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::PersistenceError;
use crate::normalize::{normalize_color, normalize_link, DEFAULT_PIN_NAME};
use crate::pin::{MapPoint, Pin, PinFields};

/// Name suggested to the user when exporting.
pub const EXPORT_FILE_NAME: &str = "pins.json";

/// One element of the pin file. Field order is the on-disk order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PinRecord {
    pub name: String,
    pub description: String,
    pub link: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
}

impl PinRecord {
    pub fn from_pin(pin: &Pin) -> Self {
        Self {
            name: pin.name().to_string(),
            description: pin.description().to_string(),
            link: pin.link().to_string(),
            color: pin.color().to_string(),
            x: pin.position.x,
            y: pin.position.y,
        }
    }

    pub fn into_parts(self) -> (PinFields, MapPoint) {
        let position = MapPoint::new(self.x, self.y);
        let fields = PinFields {
            name: self.name,
            description: self.description,
            link: self.link,
            color: self.color,
        };
        (fields, position)
    }
}

#[derive(Debug, Default, Deserialize)]
struct LenientRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    link: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    color: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    y: Option<f64>,
}

impl From<LenientRecord> for PinRecord {
    fn from(raw: LenientRecord) -> Self {
        Self {
            name: raw.name.unwrap_or_else(|| DEFAULT_PIN_NAME.to_string()),
            description: raw.description.unwrap_or_default(),
            link: normalize_link(raw.link.as_deref().unwrap_or("")),
            color: normalize_color(raw.color.as_deref().unwrap_or("")),
            x: raw.x.unwrap_or(0.0),
            y: raw.y.unwrap_or(0.0),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

pub fn parse_pins(json: &str) -> Result<Vec<PinRecord>, PersistenceError> {
    let Value::Array(items) = serde_json::from_str::<Value>(json)? else {
        return Err(PersistenceError::NotAnArray);
    };
    let records = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let raw = serde_json::from_value::<LenientRecord>(item).unwrap_or_else(|err| {
                warn!("pin record {index} is malformed ({err}), using defaults");
                LenientRecord::default()
            });
            PinRecord::from(raw)
        })
        .collect();
    Ok(records)
}

pub fn load_pins(path: &Path) -> Result<Vec<PinRecord>, PersistenceError> {
    let data = std::fs::read_to_string(path).map_err(|source| PersistenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_pins(&data)?;
    info!("loaded {} pins from {}", records.len(), path.display());
    Ok(records)
}

pub fn pins_to_json(pins: &[Pin]) -> Result<String, PersistenceError> {
    let records: Vec<PinRecord> = pins.iter().map(PinRecord::from_pin).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

pub fn save_pins(path: &Path, pins: &[Pin]) -> Result<(), PersistenceError> {
    let data = pins_to_json(pins)?;
    std::fs::write(path, data).map_err(|source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("saved {} pins to {}", pins.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::DEFAULT_PIN_COLOR;
    use crate::pin::PinStore;

    #[test]
    fn missing_optional_fields_default() {
        let records = parse_pins(r#"[{"name":"Shop","x":100,"y":50}]"#).unwrap();
        assert_eq!(
            records,
            vec![PinRecord {
                name: "Shop".to_string(),
                description: String::new(),
                link: String::new(),
                color: DEFAULT_PIN_COLOR.to_string(),
                x: 100.0,
                y: 50.0,
            }]
        );
    }

    #[test]
    fn loaded_links_and_colors_are_normalized() {
        let records =
            parse_pins(r#"[{"name":"a","link":" example.com ","color":"ABC","x":0,"y":0}]"#)
                .unwrap();
        assert_eq!(records[0].link, "https://example.com");
        assert_eq!(records[0].color, "#ABC");
    }

    #[test]
    fn ill_typed_fields_are_repaired() {
        let records = parse_pins(
            r#"[{"name":null,"description":7,"color":false,"x":"12.5","y":[1],"extra":true}]"#,
        )
        .unwrap();
        let record = &records[0];
        assert_eq!(record.name, DEFAULT_PIN_NAME);
        assert_eq!(record.description, "7");
        assert_eq!(record.color, DEFAULT_PIN_COLOR);
        assert_eq!(record.x, 12.5);
        assert_eq!(record.y, 0.0);
    }

    #[test]
    fn non_object_record_is_fully_defaulted() {
        let records = parse_pins(r#"[42, {"name":"ok","x":1,"y":2}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, DEFAULT_PIN_NAME);
        assert_eq!((records[0].x, records[0].y), (0.0, 0.0));
        assert_eq!(records[1].name, "ok");
    }

    #[test]
    fn top_level_must_be_an_array() {
        assert!(matches!(
            parse_pins(r#"{"name":"x"}"#),
            Err(PersistenceError::NotAnArray)
        ));
        assert!(matches!(parse_pins("not json"), Err(PersistenceError::Json(_))));
    }

    #[test]
    fn export_uses_canonical_field_order() {
        let mut store = PinStore::new();
        store.add(
            PinFields {
                name: "Shop".to_string(),
                description: "corner".to_string(),
                link: "example.com".to_string(),
                color: "f00".to_string(),
            },
            MapPoint::new(100.0, 50.5),
        );
        let json = pins_to_json(store.list()).unwrap();
        let keys: Vec<usize> = ["\"name\"", "\"description\"", "\"link\"", "\"color\"", "\"x\"", "\"y\""]
            .iter()
            .map(|key| json.find(key).unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]), "{json}");
        assert!(json.contains("\"https://example.com\""));
        assert!(json.contains("\"#f00\""));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EXPORT_FILE_NAME);

        let mut store = PinStore::new();
        store.add(
            PinFields {
                name: "Tower".to_string(),
                description: "north \"gate\"".to_string(),
                link: "mailto:x@y.z".to_string(),
                color: "rgb(1,2,3)".to_string(),
            },
            MapPoint::new(0.1 + 0.2, -7200.75),
        );
        store.add(PinFields::default(), MapPoint::new(3600.0, 1e-9));
        save_pins(&path, store.list()).unwrap();

        let loaded = load_pins(&path).unwrap();
        let saved: Vec<PinRecord> = store.list().iter().map(PinRecord::from_pin).collect();
        assert_eq!(loaded.len(), saved.len());
        for (a, b) in loaded.iter().zip(&saved) {
            assert_eq!((&a.name, &a.description, &a.link, &a.color), (&b.name, &b.description, &b.link, &b.color));
            assert!((a.x - b.x).abs() < 1e-9);
            assert!((a.y - b.y).abs() < 1e-9);
        }
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_pins(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PersistenceError::Read { .. }));
    }
}

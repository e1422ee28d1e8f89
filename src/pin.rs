use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::normalize::{normalize_color, normalize_link, DEFAULT_PIN_COLOR};

// ── Data Model ──────────────────────────────────────────────────────────────

/// Identity of a pin within one [`PinStore`]. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinId(u64);

impl PinId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A coordinate in map-image space. `y` grows upwards from the image's
/// bottom edge, matching the files this tool reads and writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
}

impl MapPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The user-editable part of a pin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinFields {
    pub name: String,
    pub description: String,
    pub link: String,
    pub color: String,
}

impl PinFields {
    /// Applies the link and color normalizers. Name and description are kept.
    pub fn normalized(self) -> Self {
        Self {
            link: normalize_link(&self.link),
            color: normalize_color(&self.color),
            ..self
        }
    }
}

impl Default for PinFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            link: String::new(),
            color: DEFAULT_PIN_COLOR.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pin {
    id: PinId,
    pub position: MapPoint,
    pub fields: PinFields,
}

impl Pin {
    pub fn id(&self) -> PinId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.fields.name
    }

    pub fn description(&self) -> &str {
        &self.fields.description
    }

    pub fn link(&self) -> &str {
        &self.fields.link
    }

    pub fn color(&self) -> &str {
        &self.fields.color
    }
}

// ── Store ───────────────────────────────────────────────────────────────────

/// The authoritative, insertion-ordered pin collection.
///
/// Every write goes through [`PinFields::normalized`], so callers may pass raw
/// dialog input and the stored color and link are always canonical.
#[derive(Debug, Default)]
pub struct PinStore {
    pins: Vec<Pin>,
    next_id: u64,
}

impl PinStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, fields: PinFields, position: MapPoint) -> PinId {
        let id = PinId(self.next_id);
        self.next_id += 1;
        self.pins.push(Pin {
            id,
            position,
            fields: fields.normalized(),
        });
        debug!("added pin {id} at ({}, {})", position.x, position.y);
        id
    }

    /// Replaces name, description, link and color. Position is untouched.
    pub fn update(&mut self, id: PinId, fields: PinFields) -> Result<(), StoreError> {
        let pin = self.get_mut(id)?;
        pin.fields = fields.normalized();
        debug!("updated pin {id}");
        Ok(())
    }

    pub fn move_to(&mut self, id: PinId, position: MapPoint) -> Result<(), StoreError> {
        let pin = self.get_mut(id)?;
        pin.position = position;
        debug!("moved pin {id} to ({}, {})", position.x, position.y);
        Ok(())
    }

    /// Removes a pin. Unknown ids are ignored.
    pub fn remove(&mut self, id: PinId) -> Option<Pin> {
        let index = self.pins.iter().position(|p| p.id == id)?;
        debug!("removed pin {id}");
        Some(self.pins.remove(index))
    }

    pub fn get(&self, id: PinId) -> Option<&Pin> {
        self.pins.iter().find(|p| p.id == id)
    }

    pub fn list(&self) -> &[Pin] {
        &self.pins
    }

    pub fn ids(&self) -> Vec<PinId> {
        self.pins.iter().map(Pin::id).collect()
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Drops every pin and inserts `records` in order. Ids keep counting up.
    pub fn replace_all<I>(&mut self, records: I) -> Vec<PinId>
    where
        I: IntoIterator<Item = (PinFields, MapPoint)>,
    {
        self.pins.clear();
        records
            .into_iter()
            .map(|(fields, position)| self.add(fields, position))
            .collect()
    }

    fn get_mut(&mut self, id: PinId) -> Result<&mut Pin, StoreError> {
        self.pins
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::PinNotFound(id))
    }
}

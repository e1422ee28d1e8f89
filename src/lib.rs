//! Labeled, colored, linkable pins on a large static map image.
//!
//! The crate is split into a rendering-agnostic core ([`editor::Editor`] and
//! the modules it wires together) and the egui front-end in the binary.

pub mod config;
pub mod editor;
pub mod error;
pub mod mode;
pub mod normalize;
pub mod persistence;
pub mod pin;
pub mod port;
pub mod workflow;

pub use editor::Editor;
pub use pin::{MapPoint, Pin, PinFields, PinId, PinStore};
pub use port::{MarkerSurface, ScreenAnchor, SurfaceCommand, SurfaceEvent};

//! Map module - interactive network map generation

mod renderer;

pub use renderer::{MapError, MapRenderer, NetworkMarker};

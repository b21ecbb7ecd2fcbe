//! warscan - wireless capture reconciliation and network mapping.
//!
//! The pipeline: load a raw capture CSV, reject invalid rows, keep the most
//! recent observation per device, order for review, write the canonical
//! table. The map module renders that table as a Leaflet page.

pub mod data;
pub mod map;

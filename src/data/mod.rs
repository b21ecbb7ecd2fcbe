//! Data module - capture loading, reconciliation and canonical output

mod loader;
mod processor;
mod writer;

pub use loader::{ColumnSet, DeviceClass, LoaderError, ScanLoader, ScanRow, ScanTable};
pub use processor::{Reconciliation, RejectedCounts, ScanProcessor, Summary};
pub use writer::{ScanWriter, WriterError};

/// Recognized column names (case-sensitive, after header trimming).
pub mod columns {
    pub const LOCAL_TIME: &str = "LocalTime";
    pub const BSSID: &str = "BSSID";
    pub const ESSID: &str = "ESSID";
    pub const POWER: &str = "Power";
    pub const SECURITY: &str = "Security";
    pub const TYPE: &str = "Type";
    pub const LATITUDE: &str = "Latitude";
    pub const LONGITUDE: &str = "Longitude";
}

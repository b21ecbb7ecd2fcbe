//! Reconciliation Module
//! Collapses noisy duplicate observations into one canonical row per device.

use std::collections::HashMap;

use super::loader::{DeviceClass, ScanRow, ScanTable};

/// Rows dropped by the validity filter, counted per rule.
///
/// A row that trips both rules counts once, under `empty_field`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectedCounts {
    pub empty_field: usize,
    pub zero_field: usize,
}

impl RejectedCounts {
    pub fn total(&self) -> usize {
        self.empty_field + self.zero_field
    }
}

/// Result of collapsing one batch of raw observations.
#[derive(Debug)]
pub struct Reconciliation {
    /// Canonical rows, in first-encounter order of their hardware id.
    pub records: Vec<ScanRow>,
    pub total_raw: usize,
    pub rejected: RejectedCounts,
}

/// Aggregate counts for one run, recomputed from the canonical rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub access_points: usize,
    pub clients: usize,
    pub total_raw: usize,
    pub canonical: usize,
    pub rejected: RejectedCounts,
}

/// The reconciliation engine: validity filter, grouping by hardware id,
/// most-recent selection and canonical ordering.
pub struct ScanProcessor;

impl ScanProcessor {
    /// Run the full pipeline over a loaded table: filter, reconcile, order.
    ///
    /// Returns the canonical table (same headers, one row per device) and
    /// the run summary.
    pub fn process(table: ScanTable) -> (ScanTable, Summary) {
        let ScanTable { headers, rows } = table;
        let outcome = Self::reconcile(rows);
        let mut records = outcome.records;
        Self::order_canonical(&mut records);
        let summary = Self::summarize(&records, outcome.total_raw, outcome.rejected);
        (
            ScanTable {
                headers,
                rows: records,
            },
            summary,
        )
    }

    /// Collapse raw rows to one canonical row per distinct hardware id.
    ///
    /// Within a group the row with the latest timestamp wins; an exact
    /// timestamp tie goes to the later row in file order. Selection replaces
    /// the whole candidate row, never individual fields.
    pub fn reconcile(rows: Vec<ScanRow>) -> Reconciliation {
        let total_raw = rows.len();
        let mut rejected = RejectedCounts::default();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut records: Vec<ScanRow> = Vec::new();

        for row in rows {
            if Self::has_empty_cell(&row) {
                rejected.empty_field += 1;
                continue;
            }
            if Self::has_zero_cell(&row) {
                rejected.zero_field += 1;
                continue;
            }
            let (Some(key), Some(timestamp)) = (row.hardware_id.clone(), row.timestamp) else {
                rejected.empty_field += 1;
                continue;
            };

            // Grouping is case-insensitive; loader output is already upper.
            let key = key.to_ascii_uppercase();
            match index.get(&key) {
                Some(&slot) => {
                    let newer = records[slot]
                        .timestamp
                        .map_or(true, |best| timestamp >= best);
                    if newer {
                        records[slot] = row;
                    }
                }
                None => {
                    index.insert(key, records.len());
                    records.push(row);
                }
            }
        }

        Reconciliation {
            records,
            total_raw,
            rejected,
        }
    }

    /// Canonical output ordering: device class ascending (AP before Client),
    /// then power descending. Stable, so equal keys keep encounter order.
    pub fn order_canonical(records: &mut [ScanRow]) {
        records.sort_by(|a, b| {
            a.device_class
                .cmp(&b.device_class)
                .then_with(|| b.power.cmp(&a.power))
        });
    }

    pub fn summarize(records: &[ScanRow], total_raw: usize, rejected: RejectedCounts) -> Summary {
        let access_points = records
            .iter()
            .filter(|r| r.device_class == Some(DeviceClass::AccessPoint))
            .count();
        let clients = records
            .iter()
            .filter(|r| r.device_class == Some(DeviceClass::Client))
            .count();
        Summary {
            access_points,
            clients,
            total_raw,
            canonical: records.len(),
            rejected,
        }
    }

    // Whole-row filter, deliberately blunt: any empty cell rejects the row.
    fn has_empty_cell(row: &ScanRow) -> bool {
        row.cells.iter().any(|cell| cell.is_none())
    }

    // "0" in any column is the numeric empty sentinel.
    fn has_zero_cell(row: &ScanRow) -> bool {
        row.cells
            .iter()
            .any(|cell| cell.as_deref().map(str::trim) == Some("0"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    const HEADERS: [&str; 8] = [
        "LocalTime", "BSSID", "ESSID", "Power", "Security", "Type", "Latitude", "Longitude",
    ];

    fn ts(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").expect("test timestamp")
    }

    fn row(time: &str, bssid: &str, essid: &str, power: i32, class: &str) -> ScanRow {
        let cells = vec![
            Some(time.to_string()),
            Some(bssid.to_string()),
            Some(essid.to_string()),
            Some(power.to_string()),
            Some("WPA2".to_string()),
            Some(class.to_string()),
            Some("24.7136".to_string()),
            Some("46.6753".to_string()),
        ];
        ScanRow {
            cells,
            timestamp: Some(ts(time)),
            hardware_id: Some(bssid.to_ascii_uppercase()),
            power: Some(power),
            device_class: DeviceClass::parse(class),
        }
    }

    fn table(rows: Vec<ScanRow>) -> ScanTable {
        ScanTable {
            headers: HEADERS.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn most_recent_observation_wins() {
        let rows = vec![
            row("2024-03-01 10:00:00", "AA:BB:CC:00:11:22", "Net", -80, "AP"),
            row("2024-03-01 10:05:00", "AA:BB:CC:00:11:22", "Net", -55, "AP"),
        ];
        let outcome = ScanProcessor::reconcile(rows);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].power, Some(-55));
        assert_eq!(outcome.records[0].timestamp, Some(ts("2024-03-01 10:05:00")));
    }

    #[test]
    fn timestamp_tie_keeps_last_row_in_file_order() {
        let rows = vec![
            row("2024-03-01 10:00:00", "AA:BB:CC:00:11:22", "First", -80, "AP"),
            row("2024-03-01 10:00:00", "AA:BB:CC:00:11:22", "Second", -55, "AP"),
        ];
        let outcome = ScanProcessor::reconcile(rows);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].power, Some(-55));
    }

    #[test]
    fn stale_observation_does_not_replace_newer() {
        let rows = vec![
            row("2024-03-01 10:05:00", "AA:BB:CC:00:11:22", "Net", -55, "AP"),
            row("2024-03-01 10:00:00", "AA:BB:CC:00:11:22", "Net", -80, "AP"),
        ];
        let outcome = ScanProcessor::reconcile(rows);
        assert_eq!(outcome.records[0].power, Some(-55));
    }

    #[test]
    fn zero_power_row_rejected_and_counted() {
        let rows = vec![
            row("2024-03-01 10:00:00", "AA:BB:CC:00:11:22", "Net", 0, "AP"),
            row("2024-03-01 10:00:00", "DD:EE:FF:00:11:22", "Other", -60, "AP"),
        ];
        let outcome = ScanProcessor::reconcile(rows);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].hardware_id.as_deref(), Some("DD:EE:FF:00:11:22"));
        assert_eq!(outcome.rejected.zero_field, 1);
        assert_eq!(outcome.rejected.empty_field, 0);
    }

    #[test]
    fn rejects_row_with_zero_passthrough_cell() {
        // The whole-row filter rejects on any "0" cell, even one the
        // pipeline never interprets (here: Latitude).
        let mut zeroed = row("2024-03-01 10:00:00", "AA:BB:CC:00:11:22", "Net", -60, "AP");
        zeroed.cells[6] = Some("0".to_string());
        let outcome = ScanProcessor::reconcile(vec![zeroed]);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.rejected.zero_field, 1);
    }

    #[test]
    fn empty_cell_rejected_and_counted() {
        let mut blank = row("2024-03-01 10:00:00", "AA:BB:CC:00:11:22", "Net", -60, "AP");
        blank.cells[2] = None;
        let outcome = ScanProcessor::reconcile(vec![blank]);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.rejected.empty_field, 1);
    }

    #[test]
    fn one_record_per_distinct_hardware_id() {
        let rows = vec![
            row("2024-03-01 10:00:00", "AA:AA:AA:00:00:01", "A", -60, "AP"),
            row("2024-03-01 10:01:00", "BB:BB:BB:00:00:02", "B", -65, "AP"),
            row("2024-03-01 10:02:00", "AA:AA:AA:00:00:01", "A", -61, "AP"),
            row("2024-03-01 10:03:00", "CC:CC:CC:00:00:03", "C", -70, "Client"),
            row("2024-03-01 10:04:00", "BB:BB:BB:00:00:02", "B", -62, "AP"),
        ];
        let outcome = ScanProcessor::reconcile(rows);
        assert_eq!(outcome.records.len(), 3);
        let mut ids: Vec<_> = outcome
            .records
            .iter()
            .filter_map(|r| r.hardware_id.as_deref())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3, "hardware ids must be distinct");
    }

    #[test]
    fn groups_bssid_case_insensitively() {
        let mut lower = row("2024-03-01 10:00:00", "AA:BB:CC:00:11:22", "Net", -80, "AP");
        lower.hardware_id = Some("aa:bb:cc:00:11:22".to_string());
        let upper = row("2024-03-01 10:05:00", "AA:BB:CC:00:11:22", "Net", -55, "AP");
        let outcome = ScanProcessor::reconcile(vec![lower, upper]);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].power, Some(-55));
    }

    #[test]
    fn access_points_ordered_before_clients() {
        let rows = vec![
            row("2024-03-01 10:00:00", "AA:AA:AA:00:00:01", "Phone", -60, "Client"),
            row("2024-03-01 10:00:00", "BB:BB:BB:00:00:02", "Router", -60, "AP"),
        ];
        let (canonical, _) = ScanProcessor::process(table(rows));
        assert_eq!(canonical.rows[0].device_class, Some(DeviceClass::AccessPoint));
        assert_eq!(canonical.rows[1].device_class, Some(DeviceClass::Client));
    }

    #[test]
    fn power_descends_within_device_class() {
        let rows = vec![
            row("2024-03-01 10:00:00", "AA:AA:AA:00:00:01", "Weak", -80, "AP"),
            row("2024-03-01 10:00:00", "BB:BB:BB:00:00:02", "Strong", -40, "AP"),
            row("2024-03-01 10:00:00", "CC:CC:CC:00:00:03", "Mid", -60, "AP"),
        ];
        let (canonical, _) = ScanProcessor::process(table(rows));
        let powers: Vec<_> = canonical.rows.iter().map(|r| r.power).collect();
        assert_eq!(powers, vec![Some(-40), Some(-60), Some(-80)]);
    }

    #[test]
    fn equal_sort_keys_keep_encounter_order() {
        let rows = vec![
            row("2024-03-01 10:00:00", "AA:AA:AA:00:00:01", "First", -60, "AP"),
            row("2024-03-01 10:00:00", "BB:BB:BB:00:00:02", "Second", -60, "AP"),
        ];
        let (canonical, _) = ScanProcessor::process(table(rows));
        assert_eq!(canonical.rows[0].hardware_id.as_deref(), Some("AA:AA:AA:00:00:01"));
        assert_eq!(canonical.rows[1].hardware_id.as_deref(), Some("BB:BB:BB:00:00:02"));
    }

    #[test]
    fn empty_input_yields_empty_canonical_table() {
        let (canonical, summary) = ScanProcessor::process(table(Vec::new()));
        assert!(canonical.rows.is_empty());
        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn summary_counts_classes_and_totals() {
        let rows = vec![
            row("2024-03-01 10:00:00", "AA:AA:AA:00:00:01", "A", -60, "AP"),
            row("2024-03-01 10:01:00", "AA:AA:AA:00:00:01", "A", -58, "AP"),
            row("2024-03-01 10:02:00", "BB:BB:BB:00:00:02", "B", -70, "Client"),
            row("2024-03-01 10:03:00", "CC:CC:CC:00:00:03", "C", 0, "Client"),
        ];
        let (_, summary) = ScanProcessor::process(table(rows));
        assert_eq!(summary.access_points, 1);
        assert_eq!(summary.clients, 1);
        assert_eq!(summary.total_raw, 4);
        assert_eq!(summary.canonical, 2);
        assert_eq!(summary.rejected.zero_field, 1);
    }

    #[test]
    fn processing_is_idempotent_on_canonical_output() {
        let rows = vec![
            row("2024-03-01 10:00:00", "AA:AA:AA:00:00:01", "A", -60, "AP"),
            row("2024-03-01 10:05:00", "AA:AA:AA:00:00:01", "A", -55, "AP"),
            row("2024-03-01 10:00:00", "BB:BB:BB:00:00:02", "B", -70, "Client"),
        ];
        let (first, _) = ScanProcessor::process(table(rows));
        let (second, summary) = ScanProcessor::process(first.clone());
        assert_eq!(first.rows, second.rows);
        assert_eq!(summary.canonical, summary.total_raw);
        assert_eq!(summary.rejected.total(), 0);
    }

    #[test]
    fn no_canonical_record_has_empty_or_zero_cell() {
        let mut zeroed = row("2024-03-01 10:00:00", "AA:AA:AA:00:00:01", "A", -60, "AP");
        zeroed.cells[7] = Some("0".to_string());
        let mut blank = row("2024-03-01 10:01:00", "BB:BB:BB:00:00:02", "B", -70, "AP");
        blank.cells[4] = None;
        let good = row("2024-03-01 10:02:00", "CC:CC:CC:00:00:03", "C", -50, "Client");
        let outcome = ScanProcessor::reconcile(vec![zeroed, blank, good]);
        assert_eq!(outcome.records.len(), 1);
        for record in &outcome.records {
            assert!(record.cells.iter().all(|c| c.is_some()));
            assert!(record
                .cells
                .iter()
                .all(|c| c.as_deref().map(str::trim) != Some("0")));
        }
    }
}

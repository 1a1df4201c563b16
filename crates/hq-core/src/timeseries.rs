//! Snapshot-indexed tables.
//!
//! Each table is a timestamp index plus named columns (one per load or
//! generator), stored row-major so a snapshot is a contiguous slice.
//! Timestamp lookups go through a sorted row map, so resolving a snapshot
//! costs `O(log T)` whatever the horizon length.

use std::collections::BTreeMap;

use crate::{GridError, GridResult, Network};
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TimeSeriesTable {
    pub index: Vec<NaiveDateTime>,
    pub columns: Vec<String>,
    /// `values[row][col]`
    pub values: Vec<Vec<f64>>,
    /// First row of each timestamp
    #[serde(skip)]
    rows: BTreeMap<NaiveDateTime, usize>,
}

impl TimeSeriesTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            index: Vec::new(),
            columns,
            values: Vec::new(),
            rows: BTreeMap::new(),
        }
    }

    fn append(&mut self, timestamp: NaiveDateTime, row: Vec<f64>) {
        self.rows.entry(timestamp).or_insert(self.index.len());
        self.index.push(timestamp);
        self.values.push(row);
    }

    pub fn push_row(&mut self, timestamp: NaiveDateTime, row: Vec<f64>) -> GridResult<()> {
        if row.len() != self.columns.len() {
            return Err(GridError::Parse(format!(
                "row at {} has {} values, expected {}",
                timestamp,
                row.len(),
                self.columns.len()
            )));
        }
        self.append(timestamp, row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Whole column in index order.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.column_index(name)?;
        Some(self.values.iter().map(|row| row[col]).collect())
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        self.values.get(row).map(Vec::as_slice)
    }

    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let col = self.column_index(name)?;
        self.values.get(row).map(|r| r[col])
    }

    pub fn position(&self, timestamp: &NaiveDateTime) -> Option<usize> {
        self.rows.get(timestamp).copied()
    }

    /// Value of `name` at a timestamp, if both exist in this table.
    pub fn value_at(&self, timestamp: &NaiveDateTime, name: &str) -> Option<f64> {
        self.position(timestamp).and_then(|row| self.value(row, name))
    }

    /// Sum of a row; missing (NaN) cells are skipped.
    pub fn row_sum(&self, row: usize) -> f64 {
        self.row(row)
            .map(|r| r.iter().filter(|v| v.is_finite()).sum())
            .unwrap_or(0.0)
    }

    /// Mean of a row over its non-missing cells.
    pub fn row_mean(&self, row: usize) -> f64 {
        let Some(r) = self.row(row) else {
            return 0.0;
        };
        let finite: Vec<f64> = r.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            0.0
        } else {
            finite.iter().sum::<f64>() / finite.len() as f64
        }
    }

    /// Rows with `start <= t <= end`; open bounds keep everything on that side.
    pub fn restrict(&self, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        let mut out = Self::new(self.columns.clone());
        for (t, row) in self.index.iter().zip(self.values.iter()) {
            if start.map_or(true, |s| *t >= s) && end.map_or(true, |e| *t <= e) {
                out.append(*t, row.clone());
            }
        }
        out
    }
}

/// The time-varying inputs of a study horizon.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkTimeSeries {
    /// Load demand (MW), one column per load
    pub loads_p_set: TimeSeriesTable,
    /// Generator marginal cost ($/MWh), one column per generator
    pub generators_marginal_cost: TimeSeriesTable,
    /// Generator availability (fraction of p_nom); may be empty
    pub generators_p_max_pu: TimeSeriesTable,
}

impl NetworkTimeSeries {
    /// Study snapshots, taken from the load table.
    pub fn snapshots(&self) -> &[NaiveDateTime] {
        &self.loads_p_set.index
    }

    pub fn restrict(&self, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self {
            loads_p_set: self.loads_p_set.restrict(start, end),
            generators_marginal_cost: self.generators_marginal_cost.restrict(start, end),
            generators_p_max_pu: self.generators_p_max_pu.restrict(start, end),
        }
    }

    pub fn total_load_at(&self, row: usize) -> f64 {
        self.loads_p_set.row_sum(row)
    }

    /// Write the values of snapshot `row` into the static network.
    ///
    /// Loads take their `p_set`, generators their marginal cost and
    /// availability. Elements without a column (or with a missing cell)
    /// keep their static values.
    pub fn apply_snapshot(&self, network: &mut Network, row: usize) -> GridResult<()> {
        let Some(timestamp) = self.snapshots().get(row).copied() else {
            return Err(GridError::Validation(format!(
                "snapshot {} out of range ({} snapshots)",
                row,
                self.snapshots().len()
            )));
        };
        for load in network.loads_mut() {
            if let Some(p) = self.loads_p_set.value(row, &load.name) {
                if p.is_finite() {
                    load.p_set = crate::Megawatts(p);
                }
            }
        }
        let cost_row = self.generators_marginal_cost.position(&timestamp);
        let pu_row = self.generators_p_max_pu.position(&timestamp);
        for gen in network.generators_mut() {
            let cost = cost_row.and_then(|r| self.generators_marginal_cost.value(r, &gen.name));
            if let Some(cost) = cost.filter(|c| c.is_finite()) {
                gen.marginal_cost = cost;
            }
            let pu = pu_row.and_then(|r| self.generators_p_max_pu.value(r, &gen.name));
            if let Some(pu) = pu.filter(|p| p.is_finite()) {
                gen.p_max_pu = pu;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn table() -> TimeSeriesTable {
        let mut t = TimeSeriesTable::new(vec!["Montreal".into(), "Quebec".into()]);
        t.push_row(ts(1, 0), vec![100.0, 50.0]).unwrap();
        t.push_row(ts(1, 1), vec![110.0, 55.0]).unwrap();
        t.push_row(ts(2, 0), vec![90.0, 45.0]).unwrap();
        t
    }

    #[test]
    fn column_and_row_access() {
        let t = table();
        assert_eq!(t.column("Quebec").unwrap(), vec![50.0, 55.0, 45.0]);
        assert_eq!(t.row_sum(1), 165.0);
        assert_eq!(t.value_at(&ts(2, 0), "Montreal"), Some(90.0));
        assert_eq!(t.value_at(&ts(3, 0), "Montreal"), None);
    }

    #[test]
    fn push_row_checks_width() {
        let mut t = table();
        assert!(t.push_row(ts(3, 0), vec![1.0]).is_err());
    }

    #[test]
    fn missing_cells_are_skipped_in_sums() {
        let mut t = TimeSeriesTable::new(vec!["a".into(), "b".into()]);
        t.push_row(ts(1, 0), vec![10.0, f64::NAN]).unwrap();
        assert_eq!(t.row_sum(0), 10.0);
        assert_eq!(t.row_mean(0), 10.0);
    }

    #[test]
    fn apply_snapshot_updates_loads_and_costs() {
        use crate::{Bus, BusId, GenId, Generator, Load, LoadId};

        let mut network = Network::new();
        network.add_bus(Bus::new(BusId::new(0), "Montreal"));
        network.add_load(Load::new(LoadId::new(0), "Montreal", BusId::new(0), 1.0));
        network.add_generator(
            Generator::new(GenId::new(0), "Beauharnois", BusId::new(0)).with_marginal_cost(1.0),
        );

        let mut costs = TimeSeriesTable::new(vec!["Beauharnois".into()]);
        costs.push_row(ts(1, 1), vec![12.5]).unwrap();
        let series = NetworkTimeSeries {
            loads_p_set: table(),
            generators_marginal_cost: costs,
            ..NetworkTimeSeries::default()
        };

        series.apply_snapshot(&mut network, 1).unwrap();
        assert_eq!(network.loads()[0].p_set.value(), 110.0);
        assert_eq!(network.generators()[0].marginal_cost, 12.5);

        assert!(series.apply_snapshot(&mut network, 99).is_err());
    }

    #[test]
    fn year_of_hourly_snapshots_applies_quickly() {
        use crate::{Bus, BusId, GenId, Generator};
        use std::time::{Duration, Instant};

        let names: Vec<String> = (0..40).map(|i| format!("G{i}")).collect();
        let mut network = Network::new();
        network.add_bus(Bus::new(BusId::new(0), "Montreal"));
        for (i, name) in names.iter().enumerate() {
            network.add_generator(Generator::new(GenId::new(i), name.clone(), BusId::new(0)));
        }

        let start = ts(1, 0);
        let mut loads = TimeSeriesTable::new(vec!["Montreal".into()]);
        let mut costs = TimeSeriesTable::new(names.clone());
        let mut availability = TimeSeriesTable::new(names);
        for h in 0..8760 {
            let t = start + chrono::Duration::hours(h);
            loads.push_row(t, vec![1000.0]).unwrap();
            costs.push_row(t, vec![h as f64; 40]).unwrap();
            availability.push_row(t, vec![0.5; 40]).unwrap();
        }
        let series = NetworkTimeSeries {
            loads_p_set: loads,
            generators_marginal_cost: costs,
            generators_p_max_pu: availability,
        };

        let began = Instant::now();
        for row in 0..series.snapshots().len() {
            series.apply_snapshot(&mut network, row).unwrap();
        }
        assert_eq!(network.generators()[39].marginal_cost, 8759.0);
        assert!(began.elapsed() < Duration::from_secs(5), "{:?}", began.elapsed());
        assert_eq!(series.generators_marginal_cost.position(&ts(31, 23)), Some(743));
    }

    #[test]
    fn duplicate_timestamps_resolve_to_first_row() {
        let mut t = table();
        t.push_row(ts(1, 1), vec![0.0, 0.0]).unwrap();
        assert_eq!(t.position(&ts(1, 1)), Some(1));
        let restricted = t.restrict(Some(ts(1, 1)), None);
        assert_eq!(restricted.position(&ts(2, 0)), Some(1));
    }

    #[test]
    fn restrict_is_inclusive() {
        let t = table().restrict(Some(ts(1, 1)), Some(ts(2, 0)));
        assert_eq!(t.len(), 2);
        let open = table().restrict(None, Some(ts(1, 0)));
        assert_eq!(open.len(), 1);
    }
}

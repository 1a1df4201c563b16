use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use hq_core::{Network, NetworkTimeSeries};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info};

use super::{solve_power_flow, PowerFlowMode, PowerFlowSettings, PowerFlowSolution};
use crate::PowerFlowError;

/// Key used in loss reports for lines without a standard type.
pub const UNTYPED_LINE: &str = "untyped";

#[derive(Debug, Clone, Serialize)]
pub struct LineLoading {
    pub line: String,
    pub bus0: String,
    pub bus1: String,
    pub line_type: Option<String>,
    pub s_nom: f64,
    /// max |p0| / s_nom · 100 over the solved snapshots
    pub loading_percent: f64,
    pub power_flow_mw: f64,
    pub remaining_capacity_mw: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CriticalLine {
    pub line: String,
    pub loading: f64,
    pub power_flow: f64,
    pub from_bus: String,
    pub to_bus: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LossReport {
    pub total_losses_mw: f64,
    pub losses_percent: f64,
    pub losses_by_type: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoltageProfileRow {
    pub bus: String,
    pub voltage_pu: f64,
    pub voltage_min: f64,
    pub voltage_max: f64,
    pub angle_deg: f64,
}

/// Runs power flows over the snapshots of a study and reports on them.
///
/// Without a time series the network is solved once as it stands.
pub struct PowerFlowAnalyzer<'a> {
    network: &'a Network,
    series: Option<&'a NetworkTimeSeries>,
    mode: PowerFlowMode,
    settings: PowerFlowSettings,
    results: Vec<PowerFlowSolution>,
    last_mode: Option<PowerFlowMode>,
}

impl<'a> PowerFlowAnalyzer<'a> {
    pub fn new(network: &'a Network) -> Self {
        Self {
            network,
            series: None,
            mode: PowerFlowMode::default(),
            settings: PowerFlowSettings::default(),
            results: Vec::new(),
            last_mode: None,
        }
    }

    pub fn with_time_series(mut self, series: &'a NetworkTimeSeries) -> Self {
        self.series = Some(series);
        self
    }

    /// Mode used when [`run_power_flow`](Self::run_power_flow) is given none.
    pub fn with_mode(mut self, mode: PowerFlowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_settings(mut self, settings: PowerFlowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn results(&self) -> &[PowerFlowSolution] {
        &self.results
    }

    /// Solve one snapshot, or all of them when `snapshot` is `None`.
    ///
    /// Returns whether every solve converged; errors are logged and leave
    /// the analyzer without results.
    pub fn run_power_flow(
        &mut self,
        snapshot: Option<NaiveDateTime>,
        mode: Option<PowerFlowMode>,
    ) -> bool {
        match self.try_run(snapshot, mode) {
            Ok(converged) => converged,
            Err(err) => {
                error!("power flow failed: {err}");
                false
            }
        }
    }

    /// Like [`run_power_flow`](Self::run_power_flow) but surfaces the error.
    pub fn try_run(
        &mut self,
        snapshot: Option<NaiveDateTime>,
        mode: Option<PowerFlowMode>,
    ) -> Result<bool, PowerFlowError> {
        self.results.clear();
        self.last_mode = None;
        let mode = mode.unwrap_or(self.mode);

        let rows: Vec<usize> = match (self.series, snapshot) {
            (None, _) => Vec::new(),
            (Some(series), Some(ts)) => {
                let row = series
                    .loads_p_set
                    .position(&ts)
                    .ok_or_else(|| PowerFlowError::UnknownSnapshot(ts.to_string()))?;
                vec![row]
            }
            (Some(series), None) => (0..series.snapshots().len()).collect(),
        };

        let results = match self.series {
            Some(series) if !rows.is_empty() => self.solve_rows(series, &rows, mode)?,
            Some(_) => return Err(PowerFlowError::InvalidNetwork("time series has no snapshots".into())),
            None => vec![solve_power_flow(self.network, mode, &self.settings)?],
        };

        let converged = results.iter().all(|r| r.converged);
        info!(
            mode = %mode,
            snapshots = results.len(),
            converged,
            "power flow finished"
        );
        self.results = results;
        self.last_mode = Some(mode);
        Ok(converged)
    }

    fn solve_rows(
        &self,
        series: &NetworkTimeSeries,
        rows: &[usize],
        mode: PowerFlowMode,
    ) -> Result<Vec<PowerFlowSolution>, PowerFlowError> {
        let solve_row = |row: usize| -> Result<PowerFlowSolution, PowerFlowError> {
            let mut network = self.network.clone();
            series.apply_snapshot(&mut network, row)?;
            let mut solution = solve_power_flow(&network, mode, &self.settings)?;
            solution.snapshot = series.snapshots().get(row).copied();
            Ok(solution)
        };

        #[cfg(feature = "parallel")]
        let results = rows.par_iter().map(|&row| solve_row(row)).collect();
        #[cfg(not(feature = "parallel"))]
        let results = rows.iter().map(|&row| solve_row(row)).collect();
        results
    }

    fn require_results(&self) -> Result<&[PowerFlowSolution], PowerFlowError> {
        if self.results.is_empty() {
            Err(PowerFlowError::NoResults)
        } else {
            Ok(&self.results)
        }
    }

    /// Loading of every line, from the largest |p0| across the solved snapshots.
    ///
    /// A line without a rating reports infinite loading when it carries flow.
    pub fn get_line_loading(&self) -> Result<Vec<LineLoading>, PowerFlowError> {
        let results = self.require_results()?;
        let first = &results[0];
        let rows = first
            .lines
            .iter()
            .enumerate()
            .map(|(k, line)| {
                let max_flow = results
                    .iter()
                    .filter_map(|r| r.lines.get(k))
                    .map(|l| l.p0.abs())
                    .fold(0.0_f64, f64::max);
                let loading_percent = if line.s_nom > 0.0 {
                    max_flow / line.s_nom * 100.0
                } else if max_flow > 0.0 {
                    f64::INFINITY
                } else {
                    0.0
                };
                LineLoading {
                    line: line.name.clone(),
                    bus0: line.bus0.clone(),
                    bus1: line.bus1.clone(),
                    line_type: line.line_type.clone(),
                    s_nom: line.s_nom,
                    loading_percent,
                    power_flow_mw: max_flow,
                    remaining_capacity_mw: line.s_nom - max_flow,
                }
            })
            .collect();
        Ok(rows)
    }

    /// Lines loaded strictly above `threshold` percent.
    pub fn get_critical_lines(&self, threshold: f64) -> Result<Vec<CriticalLine>, PowerFlowError> {
        Ok(self
            .get_line_loading()?
            .into_iter()
            .filter(|l| l.loading_percent > threshold)
            .map(|l| CriticalLine {
                line: l.line,
                loading: l.loading_percent,
                power_flow: l.power_flow_mw,
                from_bus: l.bus0,
                to_bus: l.bus1,
            })
            .collect())
    }

    /// Losses summed over lines and snapshots.
    pub fn analyze_network_losses(&self) -> Result<LossReport, PowerFlowError> {
        let results = self.require_results()?;
        let total_generation: f64 = results.iter().map(|r| r.total_generation_mw()).sum();

        let mut losses_by_type = BTreeMap::new();
        let mut total_losses_mw = 0.0;
        for line in results.iter().flat_map(|r| r.lines.iter()) {
            let losses = line.losses_mw();
            total_losses_mw += losses;
            let key = line.line_type.clone().unwrap_or_else(|| UNTYPED_LINE.to_string());
            *losses_by_type.entry(key).or_insert(0.0) += losses;
        }

        let losses_percent = if total_generation.abs() > f64::EPSILON {
            total_losses_mw / total_generation * 100.0
        } else {
            0.0
        };
        Ok(LossReport {
            total_losses_mw,
            losses_percent,
            losses_by_type,
        })
    }

    /// Per-bus voltage statistics; `None` when the last run was DC.
    pub fn get_voltage_profile(&self) -> Result<Option<Vec<VoltageProfileRow>>, PowerFlowError> {
        let results = self.require_results()?;
        if self.last_mode != Some(PowerFlowMode::Ac) {
            return Ok(None);
        }
        let count = results.len() as f64;
        let rows = results[0]
            .buses
            .iter()
            .enumerate()
            .map(|(k, bus)| {
                let mags: Vec<f64> = results.iter().map(|r| r.buses[k].v_mag_pu).collect();
                let mean_angle = results.iter().map(|r| r.buses[k].v_ang_rad).sum::<f64>() / count;
                VoltageProfileRow {
                    bus: bus.bus.clone(),
                    voltage_pu: mags.iter().sum::<f64>() / count,
                    voltage_min: mags.iter().copied().fold(f64::INFINITY, f64::min),
                    voltage_max: mags.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    angle_deg: mean_angle.to_degrees(),
                }
            })
            .collect();
        Ok(Some(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hq_core::{
        Bus, BusId, GenControl, GenId, Generator, Line, LineId, Load, LoadId, TimeSeriesTable,
    };

    fn network() -> Network {
        let mut net = Network::new();
        net.add_bus(Bus::new(BusId::new(0), "Manic"));
        net.add_bus(Bus::new(BusId::new(1), "Montreal"));
        net.add_generator(
            Generator::new(GenId::new(0), "Manic-5", BusId::new(0))
                .with_control(GenControl::Slack)
                .with_p_nom(3000.0),
        );
        net.add_load(Load::new(LoadId::new(0), "Montreal", BusId::new(1), 1000.0));
        let mut line = Line::new(LineId::new(0), "L0001", BusId::new(0), BusId::new(1))
            .with_impedance(3.0, 90.0)
            .with_s_nom(2000.0);
        line.line_type = Some("735kV_line".into());
        net.add_line(line).unwrap();
        net
    }

    fn series() -> NetworkTimeSeries {
        let mut loads = TimeSeriesTable::new(vec!["Montreal".into()]);
        for (hour, mw) in [(0, 1000.0), (1, 1900.0)] {
            let t = NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap();
            loads.push_row(t, vec![mw]).unwrap();
        }
        NetworkTimeSeries {
            loads_p_set: loads,
            ..NetworkTimeSeries::default()
        }
    }

    #[test]
    fn analysis_requires_a_run() {
        let net = network();
        let analyzer = PowerFlowAnalyzer::new(&net);
        assert!(matches!(analyzer.get_line_loading(), Err(PowerFlowError::NoResults)));
        assert!(matches!(
            analyzer.analyze_network_losses(),
            Err(PowerFlowError::NoResults)
        ));
    }

    #[test]
    fn loading_uses_peak_snapshot() {
        let net = network();
        let ts = series();
        let mut analyzer = PowerFlowAnalyzer::new(&net).with_time_series(&ts);
        assert!(analyzer.run_power_flow(None, None));
        assert_eq!(analyzer.results().len(), 2);

        let loading = analyzer.get_line_loading().unwrap();
        assert_eq!(loading.len(), 1);
        assert!((loading[0].power_flow_mw - 1900.0).abs() < 1e-6);
        assert!((loading[0].loading_percent - 95.0).abs() < 1e-6);
        assert!((loading[0].remaining_capacity_mw - 100.0).abs() < 1e-6);

        let critical = analyzer.get_critical_lines(90.0).unwrap();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].from_bus, "Manic");
        assert!(analyzer.get_critical_lines(96.0).unwrap().is_empty());

        // DC runs have no voltage profile
        assert!(analyzer.get_voltage_profile().unwrap().is_none());
    }

    #[test]
    fn ac_run_reports_losses_and_voltages() {
        let net = network();
        let ts = series();
        let mut analyzer = PowerFlowAnalyzer::new(&net).with_time_series(&ts);
        assert!(analyzer.run_power_flow(None, Some(PowerFlowMode::Ac)));

        let losses = analyzer.analyze_network_losses().unwrap();
        assert!(losses.total_losses_mw > 0.0);
        assert!(losses.losses_percent > 0.0 && losses.losses_percent < 5.0);
        assert!((losses.losses_by_type["735kV_line"] - losses.total_losses_mw).abs() < 1e-9);

        let profile = analyzer.get_voltage_profile().unwrap().unwrap();
        let mtl = profile.iter().find(|r| r.bus == "Montreal").unwrap();
        assert!(mtl.voltage_min <= mtl.voltage_pu && mtl.voltage_pu <= mtl.voltage_max);
        assert!(mtl.voltage_max < 1.0);
        assert!(mtl.angle_deg < 0.0);
    }

    #[test]
    fn single_snapshot_and_unknown_snapshot() {
        let net = network();
        let ts = series();
        let mut analyzer = PowerFlowAnalyzer::new(&net).with_time_series(&ts);
        let t = ts.snapshots()[1];
        assert!(analyzer.run_power_flow(Some(t), None));
        assert_eq!(analyzer.results().len(), 1);
        assert_eq!(analyzer.results()[0].snapshot, Some(t));

        let missing = NaiveDate::from_ymd_opt(2030, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(!analyzer.run_power_flow(Some(missing), None));
        assert!(matches!(
            analyzer.try_run(Some(missing), None),
            Err(PowerFlowError::UnknownSnapshot(_))
        ));
    }

    #[test]
    fn static_network_is_solved_once() {
        let net = network();
        let mut analyzer = PowerFlowAnalyzer::new(&net).with_mode(PowerFlowMode::Ac);
        assert!(analyzer.run_power_flow(None, None));
        assert_eq!(analyzer.results().len(), 1);
        assert!(analyzer.results()[0].snapshot.is_none());
    }
}

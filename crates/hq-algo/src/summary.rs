//! Network and energy summaries printed by `inspect` and the studies.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use hq_core::{graph_stats, Dispatchability, GraphStats, Network, NetworkTimeSeries};
use serde::Serialize;

use crate::power_flow::PowerFlowSolution;
use crate::timeseries::{format_resolution, time_resolution};

#[derive(Debug, Clone, Serialize)]
pub struct TimeHorizon {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub snapshots: usize,
    pub resolution: String,
    pub peak_load_mw: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkSummary {
    pub buses: usize,
    pub lines: usize,
    pub generators: usize,
    pub loads: usize,
    pub line_types: usize,
    pub carriers: usize,
    pub slack_generators: usize,
    /// Islands, bus degrees and isolated buses
    pub topology: GraphStats,
    pub total_capacity_mw: f64,
    pub total_line_length_km: f64,
    pub pilotable_by_carrier: BTreeMap<String, f64>,
    pub non_pilotable_by_carrier: BTreeMap<String, f64>,
    pub horizon: Option<TimeHorizon>,
}

impl NetworkSummary {
    pub fn new(network: &Network, series: Option<&NetworkTimeSeries>) -> Self {
        let stats = network.stats();
        let mut pilotable_by_carrier = BTreeMap::new();
        let mut non_pilotable_by_carrier = BTreeMap::new();
        for gen in network.generators() {
            let target = match gen.dispatchability {
                Dispatchability::Pilotable => &mut pilotable_by_carrier,
                Dispatchability::NonPilotable => &mut non_pilotable_by_carrier,
            };
            *target.entry(gen.carrier.clone()).or_insert(0.0) += gen.p_nom.value();
        }

        let horizon = series.and_then(|s| {
            let snapshots = s.snapshots();
            let (start, end) = (*snapshots.first()?, *snapshots.last()?);
            let peak_load_mw = (0..snapshots.len())
                .map(|row| s.total_load_at(row))
                .fold(f64::NEG_INFINITY, f64::max);
            Some(TimeHorizon {
                start,
                end,
                snapshots: snapshots.len(),
                resolution: format_resolution(time_resolution(s)),
                peak_load_mw,
            })
        });

        Self {
            buses: stats.num_buses,
            lines: stats.num_lines,
            generators: stats.num_gens,
            loads: stats.num_loads,
            line_types: stats.num_line_types,
            carriers: stats.num_carriers,
            slack_generators: stats.num_slack,
            topology: graph_stats(network),
            total_capacity_mw: network.total_capacity_mw(),
            total_line_length_km: network.lines().iter().map(|l| l.length.value()).sum(),
            pilotable_by_carrier,
            non_pilotable_by_carrier,
            horizon,
        }
    }
}

impl fmt::Display for NetworkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Buses:            {}", self.buses)?;
        writeln!(f, "Lines:            {} ({:.0} km)", self.lines, self.total_line_length_km)?;
        writeln!(f, "Generators:       {} ({} slack)", self.generators, self.slack_generators)?;
        writeln!(f, "Loads:            {}", self.loads)?;
        writeln!(f, "Line types:       {}", self.line_types)?;
        writeln!(f, "Carriers:         {}", self.carriers)?;
        let t = &self.topology;
        writeln!(f, "Islands:          {}", t.islands)?;
        writeln!(
            f,
            "Bus degree:       min {}, avg {:.2}, max {} ({} isolated)",
            t.min_degree, t.avg_degree, t.max_degree, t.isolated_buses
        )?;
        writeln!(f, "Capacity:         {:.1} MW", self.total_capacity_mw)?;
        for (title, table) in [
            ("Pilotable", &self.pilotable_by_carrier),
            ("Non-pilotable", &self.non_pilotable_by_carrier),
        ] {
            writeln!(f, "{title} capacity by carrier:")?;
            for (carrier, mw) in table {
                writeln!(f, "  {carrier:<18} {mw:>10.1} MW")?;
            }
        }
        if let Some(h) = &self.horizon {
            writeln!(f, "Horizon:          {} → {} ({} snapshots)", h.start, h.end, h.snapshots)?;
            writeln!(f, "Resolution:       {}", h.resolution)?;
            writeln!(f, "Peak load:        {:.1} MW", h.peak_load_mw)?;
        }
        Ok(())
    }
}

/// Production against consumption, with production split by carrier.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnergyBalance {
    pub total_generation: f64,
    pub total_load: f64,
    pub generation_by_type: BTreeMap<String, f64>,
}

impl EnergyBalance {
    /// Balance of the current set-points.
    pub fn from_network(network: &Network) -> Self {
        let mut generation_by_type = BTreeMap::new();
        for gen in network.generators() {
            *generation_by_type.entry(gen.carrier.clone()).or_insert(0.0) += gen.p_set.value();
        }
        Self {
            total_generation: network.total_generation_mw(),
            total_load: network.total_load_mw(),
            generation_by_type,
        }
    }

    /// Balance of solved power flows, summed over their snapshots.
    pub fn from_solutions(solutions: &[PowerFlowSolution]) -> Self {
        let mut balance = Self::default();
        for sol in solutions {
            balance.total_load += sol.total_load_mw;
            for gen in &sol.generators {
                balance.total_generation += gen.p_mw;
                *balance
                    .generation_by_type
                    .entry(gen.carrier.clone())
                    .or_insert(0.0) += gen.p_mw;
            }
        }
        balance
    }

    /// Generation minus load; the network losses once a flow is solved.
    pub fn surplus(&self) -> f64 {
        self.total_generation - self.total_load
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hq_core::{Bus, BusId, GenId, Generator, Line, LineId, Load, LoadId, TimeSeriesTable};

    fn network() -> Network {
        let mut net = Network::new();
        net.add_bus(Bus::new(BusId::new(0), "A"));
        net.add_bus(Bus::new(BusId::new(1), "B"));
        net.add_generator(
            Generator::new(GenId::new(0), "Res", BusId::new(0))
                .with_carrier("hydro_reservoir")
                .with_p_nom(500.0)
                .with_p_set(300.0),
        );
        net.add_generator(
            Generator::new(GenId::new(1), "Wind", BusId::new(1))
                .with_carrier("eolien")
                .with_p_nom(100.0)
                .with_p_set(50.0),
        );
        net.add_load(Load::new(LoadId::new(0), "B", BusId::new(1), 340.0));
        net.add_line(
            Line::new(LineId::new(0), "L0001", BusId::new(0), BusId::new(1)).with_length(233.0),
        )
        .unwrap();
        net
    }

    #[test]
    fn summary_splits_capacity_by_dispatchability() {
        let mut loads = TimeSeriesTable::new(vec!["B".into()]);
        for (hour, mw) in [(0, 300.0), (1, 420.0)] {
            let t = NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap();
            loads.push_row(t, vec![mw]).unwrap();
        }
        let series = NetworkTimeSeries {
            loads_p_set: loads,
            ..NetworkTimeSeries::default()
        };

        let summary = NetworkSummary::new(&network(), Some(&series));
        assert_eq!(summary.pilotable_by_carrier["hydro_reservoir"], 500.0);
        assert_eq!(summary.non_pilotable_by_carrier["eolien"], 100.0);
        assert_eq!(summary.total_line_length_km, 233.0);
        let horizon = summary.horizon.as_ref().unwrap();
        assert_eq!(horizon.snapshots, 2);
        assert_eq!(horizon.peak_load_mw, 420.0);
        assert_eq!(horizon.resolution, "0 days 01:00:00");
        assert!(summary.to_string().contains("eolien"));
        assert_eq!(summary.topology.islands, 1);
        assert_eq!(summary.topology.max_degree, 1);
        assert_eq!(summary.topology.isolated_buses, 0);
    }

    #[test]
    fn isolated_bus_shows_in_topology() {
        let mut net = network();
        net.add_bus(Bus::new(BusId::new(2), "C"));
        let summary = NetworkSummary::new(&net, None);
        assert_eq!(summary.topology.islands, 2);
        assert_eq!(summary.topology.isolated_buses, 1);
        assert_eq!(summary.topology.min_degree, 0);
        assert!(summary
            .to_string()
            .contains("Bus degree:       min 0, avg 0.67, max 1 (1 isolated)"));
    }

    #[test]
    fn energy_balance_from_set_points() {
        let balance = EnergyBalance::from_network(&network());
        assert_eq!(balance.total_generation, 350.0);
        assert_eq!(balance.total_load, 340.0);
        assert_eq!(balance.surplus(), 10.0);
        assert_eq!(balance.generation_by_type["eolien"], 50.0);
    }
}

//! Generator dispatch over the snapshots of a study.
//!
//! Two methods are available:
//!
//! - **Merit order**: every unit starts at its minimum output, the rest of
//!   the load is filled by ascending marginal cost. Network limits are
//!   ignored.
//! - **Linear OPF**: minimise Σ cost·p subject to DC nodal balance and
//!   line ratings, solved as an LP with `good_lp` + Clarabel.
//!
//! Pilotable generators offer `[p_min_pu·p_nom, p_nom]`; non-pilotable
//! ones offer `[0, p_max_pu(t)·p_nom]`. Marginal costs and availabilities
//! come from the time series when it has a column for the generator.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use hq_core::{BusId, Dispatchability, Network, NetworkTimeSeries};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::summary::EnergyBalance;
use crate::DispatchError;

/// Shortfall tolerated by the merit order before reporting infeasibility (MW).
const UNSERVED_TOLERANCE_MW: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMethod {
    #[default]
    MeritOrder,
    LinearOpf,
}

impl FromStr for DispatchMethod {
    type Err = DispatchError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "merit" | "merit_order" => Ok(DispatchMethod::MeritOrder),
            "lopf" | "opf" | "linear_opf" => Ok(DispatchMethod::LinearOpf),
            other => Err(DispatchError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for DispatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMethod::MeritOrder => f.write_str("merit order"),
            DispatchMethod::LinearOpf => f.write_str("linear OPF"),
        }
    }
}

/// What one generator can supply in a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Offer {
    pub generator: String,
    pub carrier: String,
    #[serde(skip)]
    pub bus: BusId,
    pub p_min: f64,
    pub p_max: f64,
    pub cost: f64,
}

/// Offers of every generator of `network` as it currently stands.
pub fn snapshot_offers(network: &Network) -> Vec<Offer> {
    network
        .generators()
        .into_iter()
        .map(|g| {
            let (p_min, p_max) = match g.dispatchability {
                Dispatchability::Pilotable => (g.p_min_mw(), g.p_nom.value()),
                Dispatchability::NonPilotable => (0.0, g.available_mw(g.p_max_pu)),
            };
            Offer {
                generator: g.name.clone(),
                carrier: g.carrier.clone(),
                bus: g.bus,
                p_min: p_min.max(0.0),
                p_max: p_max.max(p_min.max(0.0)),
                cost: g.marginal_cost,
            }
        })
        .collect()
}

/// Fill `load` from the cheapest offers upwards, everyone starting at p_min.
pub fn merit_order(offers: &[Offer], load: f64) -> Result<Vec<f64>, DispatchError> {
    let mut dispatch: Vec<f64> = offers.iter().map(|o| o.p_min).collect();
    let total_min: f64 = dispatch.iter().sum();
    if total_min > load + UNSERVED_TOLERANCE_MW {
        return Err(DispatchError::Infeasible(format!(
            "minimum generation {total_min:.1} MW exceeds load {load:.1} MW"
        )));
    }

    let mut order: Vec<usize> = (0..offers.len()).collect();
    order.sort_by(|&a, &b| offers[a].cost.total_cmp(&offers[b].cost));

    let mut remaining = load - total_min;
    for idx in order {
        if remaining <= 1e-6 {
            break;
        }
        let headroom = (offers[idx].p_max - dispatch[idx]).max(0.0);
        let increment = remaining.min(headroom);
        dispatch[idx] += increment;
        remaining -= increment;
    }

    if remaining > UNSERVED_TOLERANCE_MW {
        return Err(DispatchError::Infeasible(format!(
            "cannot meet load: {remaining:.3} MW unserved after dispatch"
        )));
    }
    Ok(dispatch)
}

#[cfg(feature = "solver-clarabel")]
fn linear_opf(
    network: &Network,
    offers: &[Offer],
    base_mva: f64,
) -> Result<(Vec<f64>, BTreeMap<String, f64>), DispatchError> {
    use std::collections::HashMap;

    use good_lp::solvers::clarabel::clarabel;
    use good_lp::{
        constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel,
        Variable,
    };

    let buses = network.buses();
    let index: HashMap<BusId, usize> = buses.iter().enumerate().map(|(i, b)| (b.id, i)).collect();

    let mut vars = variables!();
    let p_vars: Vec<Variable> = offers
        .iter()
        .map(|o| vars.add(variable().min(o.p_min).max(o.p_max)))
        .collect();

    // one angle reference per island, preferably the slack bus
    let slack_buses: Vec<BusId> = network.slack_generators().iter().map(|g| g.bus).collect();
    let mut theta: Vec<Option<Variable>> = vec![None; buses.len()];
    for island in hq_core::bus_islands(network) {
        let reference = island
            .buses
            .iter()
            .find(|b| slack_buses.contains(b))
            .or_else(|| island.buses.first())
            .copied();
        for bus in &island.buses {
            if Some(*bus) != reference {
                if let Some(&i) = index.get(bus) {
                    theta[i] = Some(vars.add(variable().min(-1e3).max(1e3)));
                }
            }
        }
    }

    let objective = offers
        .iter()
        .zip(p_vars.iter())
        .fold(Expression::from(0.0), |acc, (o, p)| acc + o.cost * *p);
    let mut problem = vars.minimise(objective).using(clarabel);

    let angle = |i: usize| -> Expression {
        theta[i].map(Expression::from).unwrap_or_else(|| Expression::from(0.0))
    };

    let mut balance: Vec<Expression> = vec![Expression::from(0.0); buses.len()];
    for (offer, p) in offers.iter().zip(p_vars.iter()) {
        if let Some(&i) = index.get(&offer.bus) {
            balance[i] += *p;
        }
    }
    for load in network.loads() {
        if let Some(&i) = index.get(&load.bus) {
            balance[i] -= load.p_set.value();
        }
    }

    let mut flows: Vec<(String, Expression)> = Vec::new();
    for line in network.lines() {
        let (Some(&i), Some(&j)) = (index.get(&line.bus0), index.get(&line.bus1)) else {
            continue;
        };
        let x_pu = line.impedance_pu(buses[i].v_nom, base_mva).x;
        if x_pu.abs() < 1e-12 {
            warn!(line = %line.name, "zero reactance, line left out of the OPF");
            continue;
        }
        let flow: Expression = (angle(i) - angle(j)) * (base_mva / x_pu);
        balance[i] -= flow.clone();
        balance[j] += flow.clone();

        let s_nom = line.s_nom.value();
        if s_nom > 0.0 {
            problem = problem.with(constraint!(flow.clone() <= s_nom));
            problem = problem.with(constraint!(flow.clone() >= -s_nom));
        }
        flows.push((line.name.clone(), flow));
    }

    for expr in balance {
        problem = problem.with(constraint!(expr == 0.0));
    }

    let solution = problem.solve().map_err(|e| match e {
        ResolutionError::Infeasible => {
            DispatchError::Infeasible("no dispatch satisfies balance and line limits".into())
        }
        other => DispatchError::Solver(other.to_string()),
    })?;

    let dispatch = p_vars.iter().map(|p| solution.value(*p)).collect();
    let line_flows = flows
        .into_iter()
        .map(|(name, expr)| (name, solution.eval(expr)))
        .collect();
    Ok((dispatch, line_flows))
}

#[cfg(not(feature = "solver-clarabel"))]
fn linear_opf(
    _network: &Network,
    _offers: &[Offer],
    _base_mva: f64,
) -> Result<(Vec<f64>, BTreeMap<String, f64>), DispatchError> {
    Err(DispatchError::Unavailable("linear OPF (enable `solver-clarabel`)"))
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDispatch {
    pub snapshot: Option<NaiveDateTime>,
    pub generator_p: BTreeMap<String, f64>,
    pub total_cost: f64,
    pub total_load: f64,
    /// DC line flows (MW); only filled by the linear OPF
    pub line_flows: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub method: DispatchMethod,
    pub snapshots: Vec<SnapshotDispatch>,
    /// generator → carrier
    pub carriers: BTreeMap<String, String>,
}

impl DispatchResult {
    pub fn total_cost(&self) -> f64 {
        self.snapshots.iter().map(|s| s.total_cost).sum()
    }

    /// Energy produced per carrier, summed over snapshots (MW per snapshot).
    pub fn production_by_carrier(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for snap in &self.snapshots {
            for (gen, p) in &snap.generator_p {
                let carrier = self.carriers.get(gen).cloned().unwrap_or_default();
                *out.entry(carrier).or_insert(0.0) += p;
            }
        }
        out
    }

    pub fn energy_balance(&self) -> EnergyBalance {
        let generation_by_type = self.production_by_carrier();
        EnergyBalance {
            total_generation: generation_by_type.values().sum(),
            total_load: self.snapshots.iter().map(|s| s.total_load).sum(),
            generation_by_type,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    pub method: DispatchMethod,
    pub base_mva: f64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            method: DispatchMethod::MeritOrder,
            base_mva: 100.0,
        }
    }
}

impl Dispatcher {
    pub fn new(method: DispatchMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Dispatch every snapshot of `series`, or the static network once.
    pub fn run(
        &self,
        network: &Network,
        series: Option<&NetworkTimeSeries>,
    ) -> Result<DispatchResult, DispatchError> {
        let carriers = network
            .generators()
            .into_iter()
            .map(|g| (g.name.clone(), g.carrier.clone()))
            .collect();

        let mut snapshots = Vec::new();
        match series.filter(|s| !s.snapshots().is_empty()) {
            Some(series) => {
                for (row, t) in series.snapshots().iter().enumerate() {
                    let mut net = network.clone();
                    series.apply_snapshot(&mut net, row)?;
                    let mut snap = self.dispatch_one(&net).map_err(|e| match e {
                        DispatchError::Infeasible(msg) => {
                            DispatchError::Infeasible(format!("{t}: {msg}"))
                        }
                        other => other,
                    })?;
                    snap.snapshot = Some(*t);
                    snapshots.push(snap);
                }
            }
            None => snapshots.push(self.dispatch_one(network)?),
        }

        let result = DispatchResult {
            method: self.method,
            snapshots,
            carriers,
        };
        info!(
            method = %self.method,
            snapshots = result.snapshots.len(),
            total_cost = result.total_cost(),
            "dispatch finished"
        );
        Ok(result)
    }

    fn dispatch_one(&self, network: &Network) -> Result<SnapshotDispatch, DispatchError> {
        let offers = snapshot_offers(network);
        if offers.is_empty() {
            return Err(DispatchError::DataValidation("network has no generators".into()));
        }
        let total_load = network.total_load_mw();
        let (dispatch, line_flows) = match self.method {
            DispatchMethod::MeritOrder => (merit_order(&offers, total_load)?, BTreeMap::new()),
            DispatchMethod::LinearOpf => linear_opf(network, &offers, self.base_mva)?,
        };
        let total_cost: f64 = offers.iter().zip(&dispatch).map(|(o, p)| o.cost * p).sum();
        debug!(load_mw = total_load, cost = total_cost, "snapshot dispatched");
        Ok(SnapshotDispatch {
            snapshot: None,
            generator_p: offers
                .iter()
                .zip(dispatch)
                .map(|(o, p)| (o.generator.clone(), p))
                .collect(),
            total_cost,
            total_load,
            line_flows,
        })
    }
}

/// Whether every snapshot can be served: available capacity covers the
/// load and the summed minimum outputs do not exceed it.
pub fn check_feasibility(network: &Network, series: Option<&NetworkTimeSeries>) -> (bool, String) {
    let mut checked = 0;
    let mut failures: Vec<String> = Vec::new();

    match series.filter(|s| !s.snapshots().is_empty()) {
        Some(series) => {
            for (row, t) in series.snapshots().iter().enumerate() {
                checked += 1;
                let mut net = network.clone();
                let failure = match series.apply_snapshot(&mut net, row) {
                    Ok(()) => capacity_shortfall(&net),
                    Err(err) => Some(err.to_string()),
                };
                if let Some(reason) = failure {
                    failures.push(format!("{t}: {reason}"));
                }
            }
        }
        None => {
            checked = 1;
            if let Some(reason) = capacity_shortfall(network) {
                failures.push(format!("static network: {reason}"));
            }
        }
    }

    if failures.is_empty() {
        (true, format!("feasible: capacity covers load in {checked} snapshot(s)"))
    } else {
        let message = format!(
            "infeasible in {} of {} snapshot(s); first at {}",
            failures.len(),
            checked,
            failures[0]
        );
        (false, message)
    }
}

fn capacity_shortfall(network: &Network) -> Option<String> {
    let offers = snapshot_offers(network);
    let load = network.total_load_mw();
    let available: f64 = offers.iter().map(|o| o.p_max).sum();
    let minimum: f64 = offers.iter().map(|o| o.p_min).sum();
    if available + UNSERVED_TOLERANCE_MW < load {
        Some(format!(
            "load {load:.1} MW exceeds available capacity {available:.1} MW"
        ))
    } else if minimum > load + UNSERVED_TOLERANCE_MW {
        Some(format!("minimum generation {minimum:.1} MW exceeds load {load:.1} MW"))
    } else {
        None
    }
}

/// Write the dispatch of snapshot `index` into the generators' p_set.
pub fn apply_snapshot(
    network: &mut Network,
    result: &DispatchResult,
    index: usize,
) -> Result<(), DispatchError> {
    let snap = result
        .snapshots
        .get(index)
        .ok_or(DispatchError::SnapshotOutOfRange {
            index,
            len: result.snapshots.len(),
        })?;
    for gen in network.generators_mut() {
        if let Some(&p) = snap.generator_p.get(&gen.name) {
            gen.p_set = hq_core::Megawatts(p);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hq_core::{Bus, GenControl, GenId, Generator, Line, LineId, Load, LoadId, TimeSeriesTable};

    fn offer(name: &str, p_min: f64, p_max: f64, cost: f64) -> Offer {
        Offer {
            generator: name.into(),
            carrier: "hydro_reservoir".into(),
            bus: BusId::new(0),
            p_min,
            p_max,
            cost,
        }
    }

    fn network() -> Network {
        let mut net = Network::new();
        net.add_bus(Bus::new(BusId::new(0), "Nord"));
        net.add_bus(Bus::new(BusId::new(1), "Sud"));
        net.add_generator(
            Generator::new(GenId::new(0), "Cheap", BusId::new(0))
                .with_carrier("hydro_reservoir")
                .with_control(GenControl::Slack)
                .with_p_nom(1000.0)
                .with_marginal_cost(2.0),
        );
        net.add_generator(
            Generator::new(GenId::new(1), "Dear", BusId::new(1))
                .with_carrier("thermique")
                .with_p_nom(1000.0)
                .with_marginal_cost(50.0),
        );
        net.add_generator(
            Generator::new(GenId::new(2), "Wind", BusId::new(1))
                .with_carrier("eolien")
                .with_p_nom(400.0),
        );
        net.add_load(Load::new(LoadId::new(0), "Sud", BusId::new(1), 900.0));
        net.add_line(
            Line::new(LineId::new(0), "L0001", BusId::new(0), BusId::new(1))
                .with_impedance(1.0, 50.0)
                .with_s_nom(300.0),
        )
        .unwrap();
        net
    }

    #[test]
    fn method_parsing() {
        assert_eq!("merit".parse::<DispatchMethod>().unwrap(), DispatchMethod::MeritOrder);
        assert_eq!("LOPF".parse::<DispatchMethod>().unwrap(), DispatchMethod::LinearOpf);
        assert!("milp".parse::<DispatchMethod>().is_err());
    }

    #[test]
    fn merit_order_fills_cheapest_first() {
        let offers = [
            offer("a", 100.0, 500.0, 30.0),
            offer("b", 0.0, 400.0, 10.0),
            offer("c", 50.0, 300.0, 20.0),
        ];
        let p = merit_order(&offers, 700.0).unwrap();
        assert_eq!(p, vec![100.0, 400.0, 200.0]);
    }

    #[test]
    fn merit_order_reports_shortfall_and_surplus_minimum() {
        let offers = [offer("a", 0.0, 100.0, 1.0)];
        assert!(matches!(merit_order(&offers, 150.0), Err(DispatchError::Infeasible(_))));
        let offers = [offer("a", 200.0, 300.0, 1.0)];
        assert!(matches!(merit_order(&offers, 150.0), Err(DispatchError::Infeasible(_))));
    }

    #[test]
    fn offers_follow_dispatchability() {
        let mut net = network();
        for gen in net.generators_mut() {
            if gen.name == "Wind" {
                gen.p_max_pu = 0.25;
            }
        }
        let offers = snapshot_offers(&net);
        let wind = offers.iter().find(|o| o.generator == "Wind").unwrap();
        assert_eq!((wind.p_min, wind.p_max), (0.0, 100.0));
        let dear = offers.iter().find(|o| o.generator == "Dear").unwrap();
        assert_eq!(dear.p_max, 1000.0);
    }

    #[test]
    fn merit_dispatch_over_series_tracks_costs() {
        let net = network();
        let mut loads = TimeSeriesTable::new(vec!["Sud".into()]);
        let mut costs = TimeSeriesTable::new(vec!["Cheap".into()]);
        for (hour, load, cost) in [(0, 900.0, 2.0), (1, 1200.0, 80.0)] {
            let t = NaiveDate::from_ymd_opt(2024, 7, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap();
            loads.push_row(t, vec![load]).unwrap();
            costs.push_row(t, vec![cost]).unwrap();
        }
        let series = NetworkTimeSeries {
            loads_p_set: loads,
            generators_marginal_cost: costs,
            ..NetworkTimeSeries::default()
        };

        let result = Dispatcher::default().run(&net, Some(&series)).unwrap();
        assert_eq!(result.snapshots.len(), 2);
        // hour 0: wind (free) then Cheap
        assert_eq!(result.snapshots[0].generator_p["Wind"], 400.0);
        assert_eq!(result.snapshots[0].generator_p["Cheap"], 500.0);
        // hour 1: Cheap now costs more than Dear
        assert_eq!(result.snapshots[1].generator_p["Dear"], 800.0);
        assert_eq!(result.snapshots[1].generator_p["Cheap"], 0.0);

        let balance = result.energy_balance();
        assert_eq!(balance.total_load, 2100.0);
        assert!((balance.total_generation - 2100.0).abs() < 1e-9);
        assert_eq!(result.production_by_carrier()["eolien"], 800.0);

        let mut applied = net.clone();
        apply_snapshot(&mut applied, &result, 1).unwrap();
        assert_eq!(applied.generator_by_name("Dear").unwrap().p_set.value(), 800.0);
        assert!(matches!(
            apply_snapshot(&mut applied, &result, 5),
            Err(DispatchError::SnapshotOutOfRange { index: 5, len: 2 })
        ));
    }

    #[cfg(feature = "solver-clarabel")]
    #[test]
    fn linear_opf_respects_line_rating() {
        let net = network();
        let result = Dispatcher::new(DispatchMethod::LinearOpf).run(&net, None).unwrap();
        let snap = &result.snapshots[0];
        // Cheap is behind a 300 MW line, so Dear covers what wind and the line cannot
        assert!((snap.line_flows["L0001"] - 300.0).abs() < 1e-3);
        assert!((snap.generator_p["Cheap"] - 300.0).abs() < 1e-3);
        assert!((snap.generator_p["Wind"] - 400.0).abs() < 1e-3);
        assert!((snap.generator_p["Dear"] - 200.0).abs() < 1e-3);
    }

    #[test]
    fn feasibility_check_reports_short_snapshots() {
        let net = network();
        let (ok, message) = check_feasibility(&net, None);
        assert!(ok, "{message}");

        let mut short = net.clone();
        for load in short.loads_mut() {
            load.p_set = hq_core::Megawatts(5000.0);
        }
        let (ok, message) = check_feasibility(&short, None);
        assert!(!ok);
        assert!(message.contains("exceeds available capacity"));
    }
}

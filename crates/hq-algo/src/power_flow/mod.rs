//! Steady-state power flow.
//!
//! Two formulations share one per-unit model of the network:
//!
//! - [`PowerFlowMode::Dc`]: lossless linearised flow, B′θ = P solved per
//!   island with the slack generator's bus as the angle reference.
//! - [`PowerFlowMode::Ac`]: full Newton-Raphson over the bus admittance
//!   matrix, warm-started from the DC angles.
//!
//! Every solve validates the network first: dangling references and islands
//! without exactly one slack generator are rejected with
//! [`PowerFlowError::InvalidNetwork`].
//!
//! [`PowerFlowAnalyzer`] runs the solves over a time series and derives the
//! line loading, loss and voltage reports.

mod ac;
mod analyzer;
mod dc;
mod model;

pub use analyzer::{CriticalLine, LineLoading, LossReport, PowerFlowAnalyzer, VoltageProfileRow};

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use hq_core::{Network, SolverKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::PowerFlowError;
use model::PfModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerFlowMode {
    #[default]
    Dc,
    Ac,
}

impl FromStr for PowerFlowMode {
    type Err = PowerFlowError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "dc" | "lpf" => Ok(PowerFlowMode::Dc),
            "ac" | "pf" => Ok(PowerFlowMode::Ac),
            other => Err(PowerFlowError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for PowerFlowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerFlowMode::Dc => f.write_str("dc"),
            PowerFlowMode::Ac => f.write_str("ac"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PowerFlowSettings {
    /// System base for per-unit conversion (MVA)
    pub base_mva: f64,
    /// Newton-Raphson mismatch tolerance (per unit)
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Switch PV buses to PQ when their generators leave [q_min, q_max]
    pub enforce_q_limits: bool,
    pub max_q_iterations: usize,
    pub solver: SolverKind,
}

impl Default for PowerFlowSettings {
    fn default() -> Self {
        Self {
            base_mva: 100.0,
            tolerance: 1e-5,
            max_iterations: 20,
            enforce_q_limits: false,
            max_q_iterations: 10,
            solver: SolverKind::default(),
        }
    }
}

impl PowerFlowSettings {
    pub fn with_base_mva(mut self, base_mva: f64) -> Self {
        self.base_mva = base_mva;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_q_limit_enforcement(mut self, enable: bool) -> Self {
        self.enforce_q_limits = enable;
        self
    }

    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BusVoltage {
    pub bus: String,
    pub v_mag_pu: f64,
    pub v_ang_rad: f64,
}

/// Flows at both ends of a line. Positive p0 leaves bus0; p1 is measured
/// entering the line at bus1, so p0 + p1 are the line losses.
#[derive(Debug, Clone, Serialize)]
pub struct LineFlow {
    pub name: String,
    pub bus0: String,
    pub bus1: String,
    pub line_type: Option<String>,
    pub s_nom: f64,
    pub p0: f64,
    pub p1: f64,
    pub q0: f64,
    pub q1: f64,
}

impl LineFlow {
    pub fn losses_mw(&self) -> f64 {
        self.p0 + self.p1
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratorOutput {
    pub name: String,
    pub bus: String,
    pub carrier: String,
    pub p_mw: f64,
    pub q_mvar: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerFlowSolution {
    pub mode: PowerFlowMode,
    pub snapshot: Option<NaiveDateTime>,
    pub converged: bool,
    pub iterations: usize,
    pub max_mismatch: f64,
    pub buses: Vec<BusVoltage>,
    pub lines: Vec<LineFlow>,
    pub generators: Vec<GeneratorOutput>,
    pub total_load_mw: f64,
}

impl PowerFlowSolution {
    pub fn total_generation_mw(&self) -> f64 {
        self.generators.iter().map(|g| g.p_mw).sum()
    }

    pub fn total_losses_mw(&self) -> f64 {
        self.lines.iter().map(LineFlow::losses_mw).sum()
    }

    pub fn line(&self, name: &str) -> Option<&LineFlow> {
        self.lines.iter().find(|l| l.name == name)
    }

    pub fn generator(&self, name: &str) -> Option<&GeneratorOutput> {
        self.generators.iter().find(|g| g.name == name)
    }

    pub fn bus(&self, name: &str) -> Option<&BusVoltage> {
        self.buses.iter().find(|b| b.bus == name)
    }
}

/// Solve one operating point of `network` as it currently stands.
pub fn solve_power_flow(
    network: &Network,
    mode: PowerFlowMode,
    settings: &PowerFlowSettings,
) -> Result<PowerFlowSolution, PowerFlowError> {
    let model = PfModel::build(network, settings.base_mva)?;
    let backend = settings.solver.build_solver();
    let dc_state = dc::solve_dc(&model, backend.as_ref())?;

    let bus_name = |i: usize| model.bus_names[i].clone();
    let total_load_mw = model.load_p.iter().sum();

    let solution = match mode {
        PowerFlowMode::Dc => {
            let lines = model
                .branches
                .iter()
                .enumerate()
                .map(|(k, br)| {
                    let p0 = dc::branch_flow_mw(&model, &dc_state.theta, k);
                    LineFlow {
                        name: br.name.clone(),
                        bus0: bus_name(br.from),
                        bus1: bus_name(br.to),
                        line_type: br.line_type.clone(),
                        s_nom: br.s_nom,
                        p0,
                        p1: -p0,
                        q0: 0.0,
                        q1: 0.0,
                    }
                })
                .collect();
            PowerFlowSolution {
                mode,
                snapshot: None,
                converged: true,
                iterations: 1,
                max_mismatch: 0.0,
                buses: (0..model.bus_count())
                    .map(|i| BusVoltage {
                        bus: bus_name(i),
                        v_mag_pu: 1.0,
                        v_ang_rad: dc_state.theta[i],
                    })
                    .collect(),
                lines,
                generators: generator_outputs(&model, &dc_state.gen_p, &vec![0.0; model.gens.len()]),
                total_load_mw,
            }
        }
        PowerFlowMode::Ac => {
            let state = ac::solve_ac(&model, settings, backend.as_ref(), &dc_state.theta)?;
            let lines = model
                .branches
                .iter()
                .zip(state.branch_s.iter())
                .map(|(br, (s0, s1))| LineFlow {
                    name: br.name.clone(),
                    bus0: bus_name(br.from),
                    bus1: bus_name(br.to),
                    line_type: br.line_type.clone(),
                    s_nom: br.s_nom,
                    p0: s0.re,
                    p1: s1.re,
                    q0: s0.im,
                    q1: s1.im,
                })
                .collect();
            PowerFlowSolution {
                mode,
                snapshot: None,
                converged: state.converged,
                iterations: state.iterations,
                max_mismatch: state.max_mismatch,
                buses: (0..model.bus_count())
                    .map(|i| BusVoltage {
                        bus: bus_name(i),
                        v_mag_pu: state.v_mag[i],
                        v_ang_rad: state.v_ang[i],
                    })
                    .collect(),
                lines,
                generators: generator_outputs(&model, &state.gen_p, &state.gen_q),
                total_load_mw,
            }
        }
    };

    debug!(
        mode = %mode,
        converged = solution.converged,
        iterations = solution.iterations,
        losses_mw = solution.total_losses_mw(),
        "power flow solved"
    );
    Ok(solution)
}

fn generator_outputs(model: &PfModel, p: &[f64], q: &[f64]) -> Vec<GeneratorOutput> {
    model
        .gens
        .iter()
        .enumerate()
        .map(|(k, g)| GeneratorOutput {
            name: g.name.clone(),
            bus: model.bus_names[g.bus].clone(),
            carrier: g.carrier.clone(),
            p_mw: p[k],
            q_mvar: q[k],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hq_core::{Bus, BusId, GenControl, GenId, Generator, Line, LineId, Load, LoadId};

    /// Three buses in a ring, slack at A, 300 MW drawn at C.
    fn ring() -> Network {
        let mut net = Network::new();
        for (i, name) in ["A", "B", "C"].into_iter().enumerate() {
            net.add_bus(Bus::new(BusId::new(i), name).with_v_nom(735.0));
        }
        net.add_generator(
            Generator::new(GenId::new(0), "G-A", BusId::new(0))
                .with_control(GenControl::Slack)
                .with_p_nom(1000.0),
        );
        net.add_generator(
            Generator::new(GenId::new(1), "G-B", BusId::new(1))
                .with_p_nom(200.0)
                .with_p_set(100.0),
        );
        net.add_load(Load::new(LoadId::new(0), "C", BusId::new(2), 300.0));
        for (k, (a, b)) in [(0, 1), (1, 2), (0, 2)].into_iter().enumerate() {
            net.add_line(
                Line::new(LineId::new(k), format!("L{k}"), BusId::new(a), BusId::new(b))
                    .with_impedance(2.0, 40.0)
                    .with_s_nom(500.0),
            )
            .unwrap();
        }
        net
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("AC".parse::<PowerFlowMode>().unwrap(), PowerFlowMode::Ac);
        assert_eq!("lpf".parse::<PowerFlowMode>().unwrap(), PowerFlowMode::Dc);
        assert!(matches!(
            "newton".parse::<PowerFlowMode>(),
            Err(PowerFlowError::UnknownMode(_))
        ));
    }

    #[test]
    fn dc_flows_balance_and_split_evenly() {
        let sol = solve_power_flow(&ring(), PowerFlowMode::Dc, &PowerFlowSettings::default()).unwrap();
        assert!(sol.converged);
        assert!(sol.total_losses_mw().abs() < 1e-9);
        assert!((sol.generator("G-A").unwrap().p_mw - 200.0).abs() < 1e-9);

        // equal reactances: A-C carries 5/3 pu, B-C 4/3 pu
        let ac = sol.line("L2").unwrap().p0;
        let bc = sol.line("L1").unwrap().p0;
        assert!((ac + bc - 300.0).abs() < 1e-9);
        assert!((ac - 166.666_666_7).abs() < 1e-6);
    }

    #[test]
    fn ac_losses_are_positive_and_carried_by_slack() {
        let sol = solve_power_flow(&ring(), PowerFlowMode::Ac, &PowerFlowSettings::default()).unwrap();
        assert!(sol.converged);
        let losses = sol.total_losses_mw();
        assert!(losses > 0.0);
        let slack = sol.generator("G-A").unwrap().p_mw;
        assert!((slack - (200.0 + losses)).abs() < 1e-2);
        assert!(sol.bus("C").unwrap().v_mag_pu < 1.0);
    }

    #[test]
    fn missing_slack_is_rejected() {
        let mut net = ring();
        for gen in net.generators_mut() {
            gen.control = GenControl::PQ;
        }
        let err = solve_power_flow(&net, PowerFlowMode::Dc, &PowerFlowSettings::default()).unwrap_err();
        assert!(matches!(err, PowerFlowError::InvalidNetwork(_)));
    }

    #[test]
    fn gauss_and_faer_give_the_same_angles() {
        let net = ring();
        let a = solve_power_flow(&net, PowerFlowMode::Ac, &PowerFlowSettings::default()).unwrap();
        let b = solve_power_flow(
            &net,
            PowerFlowMode::Ac,
            &PowerFlowSettings::default().with_solver(SolverKind::Gauss),
        )
        .unwrap();
        for (x, y) in a.buses.iter().zip(b.buses.iter()) {
            assert!((x.v_ang_rad - y.v_ang_rad).abs() < 1e-8);
        }
    }
}

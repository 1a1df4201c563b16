//! Slack redistribution.
//!
//! Starting from the current set-points, pre-load the cheapest generators
//! with an estimate of the network losses, then repeatedly solve the power
//! flow and hand whatever the slack generator produced back to the other
//! generators in merit order. Stops when the slack output is within a
//! fraction of the total load, or after `max_iterations` re-solves.
//!
//! | slack output | receivers                    | bound       |
//! |--------------|------------------------------|-------------|
//! | positive     | ascending marginal cost      | available   |
//! | negative     | descending marginal cost     | p_min       |

use std::collections::BTreeMap;

use hq_core::{GridError, Megawatts, Network};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dispatch::{self, DispatchResult};
use crate::error::PowerFlowError;
use crate::power_flow::{solve_power_flow, PowerFlowMode, PowerFlowSettings, PowerFlowSolution};

#[derive(Debug, Clone)]
pub struct RedistributionSettings {
    /// Initial loss estimate as a fraction of total load
    pub loss_estimate_fraction: f64,
    /// Convergence threshold on |slack| as a fraction of total load
    pub tolerance_fraction: f64,
    pub max_iterations: usize,
    pub mode: PowerFlowMode,
    pub power_flow: PowerFlowSettings,
}

impl Default for RedistributionSettings {
    fn default() -> Self {
        Self {
            loss_estimate_fraction: 0.10,
            tolerance_fraction: 1e-3,
            max_iterations: 50,
            mode: PowerFlowMode::Ac,
            power_flow: PowerFlowSettings::default(),
        }
    }
}

impl RedistributionSettings {
    pub fn with_mode(mut self, mode: PowerFlowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_loss_estimate(mut self, fraction: f64) -> Self {
        self.loss_estimate_fraction = fraction;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RedistributionReport {
    /// Re-solves after the initial one
    pub iterations: usize,
    pub converged: bool,
    pub final_slack_mw: f64,
    /// Slack output after every solve, initial solve first
    pub history: Vec<f64>,
    pub generator_p: BTreeMap<String, f64>,
    /// |p0 + p1| per line
    pub line_losses: BTreeMap<String, f64>,
    pub line_flows: BTreeMap<String, f64>,
    pub total_generation: f64,
    pub total_load: f64,
    pub total_losses: f64,
    #[serde(skip)]
    pub solution: PowerFlowSolution,
}

/// Move up to `amount` MW (signed) onto the non-slack generators in merit
/// order. Returns what could not be placed.
pub fn distribute(network: &mut Network, amount: f64) -> f64 {
    let mut gens: Vec<_> = network.generators_mut().filter(|g| !g.is_slack()).collect();
    if amount >= 0.0 {
        gens.sort_by(|a, b| a.marginal_cost.total_cmp(&b.marginal_cost));
    } else {
        gens.sort_by(|a, b| b.marginal_cost.total_cmp(&a.marginal_cost));
    }

    let mut remaining = amount;
    for gen in gens {
        if remaining.abs() <= f64::EPSILON {
            break;
        }
        let p = gen.p_set.value();
        let step = if remaining > 0.0 {
            remaining.min(gen.headroom_mw())
        } else {
            remaining.max(-(p - gen.p_min_mw()).max(0.0))
        };
        if step != 0.0 {
            gen.p_set = Megawatts(p + step);
            remaining -= step;
        }
    }
    remaining
}

fn slack_output(network: &Network, solution: &PowerFlowSolution) -> f64 {
    network
        .slack_generators()
        .iter()
        .filter_map(|g| solution.generator(&g.name))
        .map(|g| g.p_mw)
        .sum()
}

/// Run the redistribution loop on `network`, leaving the final set-points
/// in place.
pub fn redistribute(
    network: &mut Network,
    settings: &RedistributionSettings,
) -> Result<RedistributionReport, PowerFlowError> {
    if network.slack_generators().is_empty() {
        return Err(PowerFlowError::InvalidNetwork(
            "no slack generator to redistribute from".into(),
        ));
    }
    let total_load = network.total_load_mw();
    let tolerance = settings.tolerance_fraction * total_load;

    let loss_estimate = settings.loss_estimate_fraction * total_load;
    let unplaced = distribute(network, loss_estimate);
    debug!(loss_estimate, unplaced, "initial loss estimate distributed");

    let mut solution = solve_power_flow(network, settings.mode, &settings.power_flow)?;
    let mut slack = slack_output(network, &solution);
    let mut history = vec![slack];
    let mut iterations = 0;

    while slack.abs() > tolerance && iterations < settings.max_iterations {
        let unplaced = distribute(network, slack);
        if unplaced.abs() > tolerance {
            debug!(unplaced, "generators saturated, slack keeps the rest");
        }
        solution = solve_power_flow(network, settings.mode, &settings.power_flow)?;
        slack = slack_output(network, &solution);
        history.push(slack);
        iterations += 1;
        debug!(iteration = iterations, slack_mw = slack, "redistribution step");
    }

    let converged = slack.abs() <= tolerance;
    if converged {
        info!(iterations, slack_mw = slack, "slack redistribution converged");
    } else {
        warn!(
            iterations,
            slack_mw = slack,
            tolerance_mw = tolerance,
            "slack redistribution stopped before converging"
        );
    }

    let generator_p = solution
        .generators
        .iter()
        .map(|g| (g.name.clone(), g.p_mw))
        .collect();
    let line_losses: BTreeMap<String, f64> = solution
        .lines
        .iter()
        .map(|l| (l.name.clone(), l.losses_mw().abs()))
        .collect();
    let line_flows = solution.lines.iter().map(|l| (l.name.clone(), l.p0)).collect();
    let total_generation = solution.total_generation_mw();

    Ok(RedistributionReport {
        iterations,
        converged,
        final_slack_mw: slack,
        history,
        generator_p,
        line_losses,
        line_flows,
        total_generation,
        total_load,
        total_losses: total_generation - total_load,
        solution,
    })
}

/// Start from snapshot `index` of a dispatch, then redistribute.
pub fn redistribute_after_dispatch(
    network: &mut Network,
    result: &DispatchResult,
    index: usize,
    settings: &RedistributionSettings,
) -> Result<RedistributionReport, GridError> {
    dispatch::apply_snapshot(network, result, index)?;
    Ok(redistribute(network, settings)?)
}

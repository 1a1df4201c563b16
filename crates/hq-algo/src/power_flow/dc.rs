//! Linearised (DC) power flow: B′θ = P per island, lossless.

use std::collections::HashMap;

use hq_core::LinearSystemBackend;
use tracing::warn;

use super::model::PfModel;
use crate::PowerFlowError;

#[derive(Debug, Clone)]
pub(crate) struct DcState {
    /// Bus voltage angles (radians), slack buses at 0
    pub theta: Vec<f64>,
    /// Active power of each generator (MW); slack generators balance their island
    pub gen_p: Vec<f64>,
}

pub(crate) fn solve_dc(
    model: &PfModel,
    backend: &dyn LinearSystemBackend,
) -> Result<DcState, PowerFlowError> {
    let n = model.bus_count();
    let mut theta = vec![0.0; n];
    let p_sched = model.scheduled_p();

    for branch in model.branches.iter().filter(|b| b.x.abs() < 1e-12) {
        warn!(line = %branch.name, "zero reactance, line ignored by the DC solve");
    }

    for (island_id, island) in model.islands.iter().enumerate() {
        let unknowns: Vec<usize> = island
            .buses
            .iter()
            .copied()
            .filter(|&b| b != island.slack_bus)
            .collect();
        if unknowns.is_empty() {
            continue;
        }
        let local: HashMap<usize, usize> =
            unknowns.iter().enumerate().map(|(k, &b)| (b, k)).collect();

        let m = unknowns.len();
        let mut b_matrix = vec![vec![0.0; m]; m];
        for branch in &model.branches {
            if branch.x.abs() < 1e-12 {
                continue;
            }
            let susceptance = 1.0 / branch.x;
            let from = local.get(&branch.from).copied();
            let to = local.get(&branch.to).copied();
            if let Some(i) = from {
                b_matrix[i][i] += susceptance;
            }
            if let Some(j) = to {
                b_matrix[j][j] += susceptance;
            }
            if let (Some(i), Some(j)) = (from, to) {
                b_matrix[i][j] -= susceptance;
                b_matrix[j][i] -= susceptance;
            }
        }

        let rhs: Vec<f64> = unknowns
            .iter()
            .map(|&b| p_sched[b] / model.base_mva)
            .collect();
        let angles = backend
            .solve(&b_matrix, &rhs)
            .map_err(|e| PowerFlowError::Singular {
                context: format!("DC island {island_id}"),
                message: e.to_string(),
            })?;
        for (k, &b) in unknowns.iter().enumerate() {
            theta[b] = angles[k];
        }
    }

    let mut gen_p: Vec<f64> = model.gens.iter().map(|g| g.p_mw).collect();
    for island in &model.islands {
        let imbalance: f64 = island.buses.iter().map(|&b| p_sched[b]).sum();
        gen_p[island.slack_gen] = -imbalance;
    }

    Ok(DcState { theta, gen_p })
}

/// Active flow entering a branch at its `from` end, in MW.
pub(crate) fn branch_flow_mw(model: &PfModel, theta: &[f64], branch: usize) -> f64 {
    let br = &model.branches[branch];
    if br.x.abs() < 1e-12 {
        return 0.0;
    }
    (theta[br.from] - theta[br.to]) / br.x * model.base_mva
}

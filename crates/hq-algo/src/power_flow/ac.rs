//! Newton-Raphson AC power flow in polar coordinates.
//!
//! Bus types follow the generator control modes:
//!
//! | type  | specified | solved for |
//! |-------|-----------|------------|
//! | Slack | V, θ      | P, Q       |
//! | PV    | P, \|V\|  | Q, θ       |
//! | PQ    | P, Q      | \|V\|, θ   |
//!
//! With Q-limit enforcement a PV bus whose generators leave their reactive
//! range is switched to PQ with Q fixed at the violated limit, and the
//! Newton loop is re-run from the current state.

use hq_core::{GenControl, LinearSystemBackend};
use num_complex::Complex64;
use tracing::{debug, warn};

use super::model::PfModel;
use super::PowerFlowSettings;
use crate::PowerFlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BusType {
    Slack,
    PV,
    PQ,
}

#[derive(Debug, Clone)]
pub(crate) struct AcState {
    pub converged: bool,
    pub iterations: usize,
    /// Largest mismatch (per unit) at exit
    pub max_mismatch: f64,
    pub v_mag: Vec<f64>,
    pub v_ang: Vec<f64>,
    pub gen_p: Vec<f64>,
    pub gen_q: Vec<f64>,
    /// Complex power entering each branch at its from / to end (MVA)
    pub branch_s: Vec<(Complex64, Complex64)>,
}

struct NrOutcome {
    converged: bool,
    iterations: usize,
    max_mismatch: f64,
}

pub(crate) fn solve_ac(
    model: &PfModel,
    settings: &PowerFlowSettings,
    backend: &dyn LinearSystemBackend,
    theta_start: &[f64],
) -> Result<AcState, PowerFlowError> {
    let n = model.bus_count();
    let base = model.base_mva;
    let y_bus = build_y_bus(model);
    let mut bus_types = classify_buses(model);

    let mut v_mag = vec![1.0; n];
    for (i, t) in bus_types.iter().enumerate() {
        if *t != BusType::PQ {
            v_mag[i] = model.v_set[i];
        }
    }
    let mut v_ang = theta_start.to_vec();

    let p_spec: Vec<f64> = model.scheduled_p().iter().map(|p| p / base).collect();
    let mut q_fixed: Vec<Option<f64>> = vec![None; n];
    let mut q_spec = vec![0.0; n];
    for i in 0..n {
        q_spec[i] = (scheduled_q(model, i, None) - model.load_q[i]) / base;
    }

    let mut total_iterations = 0;
    let mut outcome;
    let mut q_round = 0;
    loop {
        outcome = newton_raphson(
            &y_bus,
            &bus_types,
            &p_spec,
            &q_spec,
            &mut v_mag,
            &mut v_ang,
            settings,
            backend,
        )?;
        total_iterations += outcome.iterations;

        if !outcome.converged || !settings.enforce_q_limits || q_round >= settings.max_q_iterations
        {
            break;
        }
        let (_, q_calc) = compute_power(&y_bus, &v_mag, &v_ang);
        let switched = enforce_q_limits(
            model,
            &q_calc,
            &mut bus_types,
            &mut q_fixed,
            &mut q_spec,
        );
        if !switched {
            break;
        }
        q_round += 1;
        debug!(round = q_round, "PV buses switched to PQ, re-solving");
    }

    if !outcome.converged {
        warn!(
            iterations = total_iterations,
            mismatch = outcome.max_mismatch,
            "Newton-Raphson did not converge"
        );
    }

    let (p_calc, q_calc) = compute_power(&y_bus, &v_mag, &v_ang);
    let (gen_p, gen_q) = generator_outputs(model, &bus_types, &q_fixed, &p_calc, &q_calc);
    let branch_s = branch_flows(model, &v_mag, &v_ang);

    Ok(AcState {
        converged: outcome.converged,
        iterations: total_iterations,
        max_mismatch: outcome.max_mismatch,
        v_mag,
        v_ang,
        gen_p,
        gen_q,
        branch_s,
    })
}

fn classify_buses(model: &PfModel) -> Vec<BusType> {
    let mut types = vec![BusType::PQ; model.bus_count()];
    for gen in &model.gens {
        if gen.control == GenControl::PV {
            types[gen.bus] = BusType::PV;
        }
    }
    for island in &model.islands {
        types[island.slack_bus] = BusType::Slack;
    }
    types
}

/// Reactive injection (Mvar) fixed by PQ generators at a bus, plus the fixed
/// limit of its PV generators once they have been switched.
fn scheduled_q(model: &PfModel, bus: usize, pv_fixed: Option<f64>) -> f64 {
    let pq: f64 = model
        .gens
        .iter()
        .filter(|g| g.bus == bus && g.control == GenControl::PQ)
        .map(|g| g.q_mvar)
        .sum();
    pq + pv_fixed.unwrap_or(0.0)
}

/// Y-bus with π-model branches: series 1/(r+jx), shunt b/2 at each end.
fn build_y_bus(model: &PfModel) -> Vec<Vec<Complex64>> {
    let n = model.bus_count();
    let mut y_bus = vec![vec![Complex64::new(0.0, 0.0); n]; n];
    for branch in &model.branches {
        if !branch.has_impedance() {
            continue;
        }
        let (i, j) = (branch.from, branch.to);
        let y_series = Complex64::new(branch.r, branch.x).inv();
        let y_shunt = Complex64::new(0.0, branch.b / 2.0);

        y_bus[i][j] -= y_series;
        y_bus[j][i] -= y_series;
        y_bus[i][i] += y_series + y_shunt;
        y_bus[j][j] += y_series + y_shunt;
    }
    y_bus
}

fn compute_power(y_bus: &[Vec<Complex64>], v_mag: &[f64], v_ang: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = v_mag.len();
    let mut p = vec![0.0; n];
    let mut q = vec![0.0; n];
    for i in 0..n {
        for j in 0..n {
            let y = y_bus[i][j];
            if y.re == 0.0 && y.im == 0.0 {
                continue;
            }
            let theta_ij = v_ang[i] - v_ang[j];
            let (sin, cos) = theta_ij.sin_cos();
            p[i] += v_mag[i] * v_mag[j] * (y.re * cos + y.im * sin);
            q[i] += v_mag[i] * v_mag[j] * (y.re * sin - y.im * cos);
        }
    }
    (p, q)
}

#[allow(clippy::too_many_arguments)]
fn newton_raphson(
    y_bus: &[Vec<Complex64>],
    bus_types: &[BusType],
    p_spec: &[f64],
    q_spec: &[f64],
    v_mag: &mut [f64],
    v_ang: &mut [f64],
    settings: &PowerFlowSettings,
    backend: &dyn LinearSystemBackend,
) -> Result<NrOutcome, PowerFlowError> {
    let p_buses: Vec<usize> = (0..bus_types.len())
        .filter(|&i| bus_types[i] != BusType::Slack)
        .collect();
    let q_buses: Vec<usize> = (0..bus_types.len())
        .filter(|&i| bus_types[i] == BusType::PQ)
        .collect();
    let n_p = p_buses.len();
    let n_vars = n_p + q_buses.len();
    if n_vars == 0 {
        return Ok(NrOutcome {
            converged: true,
            iterations: 0,
            max_mismatch: 0.0,
        });
    }

    let mismatch_of = |v_mag: &[f64], v_ang: &[f64]| {
        let (p_calc, q_calc) = compute_power(y_bus, v_mag, v_ang);
        let mut mismatch = Vec::with_capacity(n_vars);
        mismatch.extend(p_buses.iter().map(|&i| p_spec[i] - p_calc[i]));
        mismatch.extend(q_buses.iter().map(|&i| q_spec[i] - q_calc[i]));
        let max = mismatch.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
        (mismatch, max, p_calc, q_calc)
    };

    for iter in 0..settings.max_iterations {
        let (mismatch, max_mismatch, p_calc, q_calc) = mismatch_of(v_mag, v_ang);
        if max_mismatch < settings.tolerance {
            return Ok(NrOutcome {
                converged: true,
                iterations: iter,
                max_mismatch,
            });
        }

        let jacobian = build_jacobian(y_bus, v_mag, v_ang, &p_calc, &q_calc, &p_buses, &q_buses);
        let delta = backend
            .solve(&jacobian, &mismatch)
            .map_err(|e| PowerFlowError::Singular {
                context: format!("Jacobian, iteration {iter}"),
                message: e.to_string(),
            })?;

        for (k, &i) in p_buses.iter().enumerate() {
            v_ang[i] += delta[k];
        }
        for (k, &i) in q_buses.iter().enumerate() {
            v_mag[i] += delta[n_p + k];
        }
    }

    let (_, max_mismatch, _, _) = mismatch_of(v_mag, v_ang);
    Ok(NrOutcome {
        converged: max_mismatch < settings.tolerance,
        iterations: settings.max_iterations,
        max_mismatch,
    })
}

fn build_jacobian(
    y_bus: &[Vec<Complex64>],
    v_mag: &[f64],
    v_ang: &[f64],
    p_calc: &[f64],
    q_calc: &[f64],
    p_buses: &[usize],
    q_buses: &[usize],
) -> Vec<Vec<f64>> {
    let n_p = p_buses.len();
    let n_vars = n_p + q_buses.len();
    let mut jac = vec![vec![0.0; n_vars]; n_vars];

    // (∂P/∂θ, ∂P/∂V, ∂Q/∂θ, ∂Q/∂V) of bus i with respect to bus j
    let partials = |i: usize, j: usize| -> (f64, f64, f64, f64) {
        let y = y_bus[i][j];
        let (g, b) = (y.re, y.im);
        if i == j {
            let v2 = v_mag[i] * v_mag[i];
            (
                -q_calc[i] - b * v2,
                p_calc[i] / v_mag[i] + g * v_mag[i],
                p_calc[i] - g * v2,
                q_calc[i] / v_mag[i] - b * v_mag[i],
            )
        } else {
            let (sin, cos) = (v_ang[i] - v_ang[j]).sin_cos();
            let vv = v_mag[i] * v_mag[j];
            (
                vv * (g * sin - b * cos),
                v_mag[i] * (g * cos + b * sin),
                -vv * (g * cos + b * sin),
                v_mag[i] * (g * sin - b * cos),
            )
        }
    };

    for (row, &i) in p_buses.iter().enumerate() {
        for (col, &j) in p_buses.iter().enumerate() {
            jac[row][col] = partials(i, j).0;
        }
        for (col, &j) in q_buses.iter().enumerate() {
            jac[row][n_p + col] = partials(i, j).1;
        }
    }
    for (row, &i) in q_buses.iter().enumerate() {
        for (col, &j) in p_buses.iter().enumerate() {
            jac[n_p + row][col] = partials(i, j).2;
        }
        for (col, &j) in q_buses.iter().enumerate() {
            jac[n_p + row][n_p + col] = partials(i, j).3;
        }
    }
    jac
}

/// Reactive output (Mvar) the PV generators at `bus` must supply.
fn pv_requirement(model: &PfModel, bus: usize, q_calc: &[f64]) -> f64 {
    q_calc[bus] * model.base_mva + model.load_q[bus] - scheduled_q(model, bus, None)
}

fn pv_limits(model: &PfModel, bus: usize) -> (f64, f64) {
    model
        .gens
        .iter()
        .filter(|g| g.bus == bus && g.control == GenControl::PV)
        .fold((0.0, 0.0), |(lo, hi), g| (lo + g.q_min, hi + g.q_max))
}

fn enforce_q_limits(
    model: &PfModel,
    q_calc: &[f64],
    bus_types: &mut [BusType],
    q_fixed: &mut [Option<f64>],
    q_spec: &mut [f64],
) -> bool {
    let mut switched = false;
    for bus in 0..bus_types.len() {
        if bus_types[bus] != BusType::PV {
            continue;
        }
        let q = pv_requirement(model, bus, q_calc);
        let (q_min, q_max) = pv_limits(model, bus);
        let limit = if q > q_max {
            q_max
        } else if q < q_min {
            q_min
        } else {
            continue;
        };
        debug!(
            bus = %model.bus_names[bus],
            q_mvar = q,
            limit,
            "PV bus hit its reactive limit, switching to PQ"
        );
        bus_types[bus] = BusType::PQ;
        q_fixed[bus] = Some(limit);
        q_spec[bus] = (scheduled_q(model, bus, Some(limit)) - model.load_q[bus]) / model.base_mva;
        switched = true;
    }
    switched
}

fn generator_outputs(
    model: &PfModel,
    bus_types: &[BusType],
    q_fixed: &[Option<f64>],
    p_calc: &[f64],
    q_calc: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    let base = model.base_mva;
    let mut gen_p: Vec<f64> = model.gens.iter().map(|g| g.p_mw).collect();
    let mut gen_q: Vec<f64> = model.gens.iter().map(|g| g.q_mvar).collect();

    for island in &model.islands {
        let bus = island.slack_bus;
        let others = |value: fn(&super::model::GenPu) -> f64| -> f64 {
            model
                .gens
                .iter()
                .enumerate()
                .filter(|(k, g)| g.bus == bus && *k != island.slack_gen)
                .map(|(_, g)| value(g))
                .sum()
        };
        gen_p[island.slack_gen] = p_calc[bus] * base + model.load_p[bus] - others(|g| g.p_mw);
        gen_q[island.slack_gen] = q_calc[bus] * base + model.load_q[bus] - others(|g| g.q_mvar);
    }

    for bus in 0..bus_types.len() {
        if model.is_slack_bus(bus) {
            continue;
        }
        let pv: Vec<usize> = model
            .gens
            .iter()
            .enumerate()
            .filter(|(_, g)| g.bus == bus && g.control == GenControl::PV)
            .map(|(k, _)| k)
            .collect();
        if pv.is_empty() {
            continue;
        }
        let total = match (bus_types[bus], q_fixed[bus]) {
            (BusType::PQ, Some(limit)) => limit,
            _ => pv_requirement(model, bus, q_calc),
        };
        let share = total / pv.len() as f64;
        for k in pv {
            gen_q[k] = share;
        }
    }

    (gen_p, gen_q)
}

fn branch_flows(model: &PfModel, v_mag: &[f64], v_ang: &[f64]) -> Vec<(Complex64, Complex64)> {
    let base = model.base_mva;
    let voltage = |i: usize| Complex64::from_polar(v_mag[i], v_ang[i]);
    model
        .branches
        .iter()
        .map(|br| {
            if !br.has_impedance() {
                return (Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0));
            }
            let y_series = Complex64::new(br.r, br.x).inv();
            let y_shunt = Complex64::new(0.0, br.b / 2.0);
            let (vf, vt) = (voltage(br.from), voltage(br.to));
            let i_from = (vf - vt) * y_series + vf * y_shunt;
            let i_to = (vt - vf) * y_series + vt * y_shunt;
            (vf * i_from.conj() * base, vt * i_to.conj() * base)
        })
        .collect()
}

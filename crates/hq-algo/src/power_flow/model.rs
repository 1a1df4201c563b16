//! Per-unit view of a network, indexed for the solvers.

use std::collections::HashMap;

use hq_core::{bus_islands, BusId, Diagnostics, GenControl, Network};

use crate::PowerFlowError;

#[derive(Debug, Clone)]
pub(crate) struct BranchPu {
    pub name: String,
    pub line_type: Option<String>,
    pub from: usize,
    pub to: usize,
    pub r: f64,
    pub x: f64,
    pub b: f64,
    pub s_nom: f64,
}

impl BranchPu {
    pub fn has_impedance(&self) -> bool {
        self.x.abs() > 1e-12 || self.r.abs() > 1e-12
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GenPu {
    pub name: String,
    pub carrier: String,
    pub bus: usize,
    pub control: GenControl,
    pub p_mw: f64,
    pub q_mvar: f64,
    pub q_min: f64,
    pub q_max: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct IslandPu {
    pub buses: Vec<usize>,
    pub slack_bus: usize,
    /// Index into `PfModel::gens`
    pub slack_gen: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct PfModel {
    pub base_mva: f64,
    pub bus_names: Vec<String>,
    pub v_set: Vec<f64>,
    /// MW / Mvar withdrawn at each bus
    pub load_p: Vec<f64>,
    pub load_q: Vec<f64>,
    pub gens: Vec<GenPu>,
    pub branches: Vec<BranchPu>,
    pub islands: Vec<IslandPu>,
}

impl PfModel {
    /// Validate the network and convert it to per-unit on `base_mva`.
    pub fn build(network: &Network, base_mva: f64) -> Result<Self, PowerFlowError> {
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        if diag.has_errors() {
            let messages: Vec<String> = diag.errors().map(|i| i.to_string()).collect();
            return Err(PowerFlowError::InvalidNetwork(messages.join("; ")));
        }

        let buses = network.buses();
        let index: HashMap<BusId, usize> =
            buses.iter().enumerate().map(|(i, b)| (b.id, i)).collect();
        let bus_names = buses.iter().map(|b| b.name.clone()).collect();
        let v_set = buses.iter().map(|b| b.v_mag_pu_set.value()).collect();

        let n = buses.len();
        let mut load_p = vec![0.0; n];
        let mut load_q = vec![0.0; n];
        for load in network.loads() {
            if let Some(&i) = index.get(&load.bus) {
                load_p[i] += load.p_set.value();
                load_q[i] += load.q_set.value();
            }
        }

        let gens: Vec<GenPu> = network
            .generators()
            .into_iter()
            .filter_map(|g| {
                index.get(&g.bus).map(|&bus| GenPu {
                    name: g.name.clone(),
                    carrier: g.carrier.clone(),
                    bus,
                    control: g.control,
                    p_mw: g.p_set.value(),
                    q_mvar: g.q_set.value(),
                    q_min: g.q_min.value(),
                    q_max: g.q_max.value(),
                })
            })
            .collect();

        let mut branches = Vec::new();
        for line in network.lines() {
            let (Some(&from), Some(&to)) = (index.get(&line.bus0), index.get(&line.bus1)) else {
                continue;
            };
            let z = line.impedance_pu(buses[from].v_nom, base_mva);
            branches.push(BranchPu {
                name: line.name.clone(),
                line_type: line.line_type.clone(),
                from,
                to,
                r: z.r,
                x: z.x,
                b: z.b,
                s_nom: line.s_nom.value(),
            });
        }

        let mut islands = Vec::new();
        for island in bus_islands(network) {
            let members: Vec<usize> = island
                .buses
                .iter()
                .filter_map(|id| index.get(id).copied())
                .collect();
            let slack_gen = gens
                .iter()
                .position(|g| g.control == GenControl::Slack && members.contains(&g.bus))
                .ok_or_else(|| {
                    PowerFlowError::InvalidNetwork(format!(
                        "island {} has no slack generator",
                        island.island_id
                    ))
                })?;
            islands.push(IslandPu {
                buses: members,
                slack_bus: gens[slack_gen].bus,
                slack_gen,
            });
        }

        Ok(Self {
            base_mva,
            bus_names,
            v_set,
            load_p,
            load_q,
            gens,
            branches,
            islands,
        })
    }

    pub fn bus_count(&self) -> usize {
        self.bus_names.len()
    }

    pub fn is_slack_gen(&self, gen: usize) -> bool {
        self.islands.iter().any(|isl| isl.slack_gen == gen)
    }

    pub fn is_slack_bus(&self, bus: usize) -> bool {
        self.islands.iter().any(|isl| isl.slack_bus == bus)
    }

    /// Net scheduled injection per bus in MW, slack generators excluded.
    pub fn scheduled_p(&self) -> Vec<f64> {
        let mut p: Vec<f64> = self.load_p.iter().map(|l| -l).collect();
        for (g, gen) in self.gens.iter().enumerate() {
            if !self.is_slack_gen(g) {
                p[gen.bus] += gen.p_mw;
            }
        }
        p
    }
}

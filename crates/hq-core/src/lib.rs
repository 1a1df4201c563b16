//! # hq-core: transmission grid model
//!
//! Data structures for the Hydro-Québec transmission network studies.
//!
//! The grid is an **undirected multigraph**:
//! - **Nodes**: buses, generators and loads
//! - **Edges**: transmission lines between buses
//!
//! Generators and loads are stand-alone nodes that reference their bus by
//! [`BusId`]; only lines connect buses. Parallel circuits between the same
//! pair of buses are separate edges.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hq_core::*;
//!
//! let mut network = Network::new();
//!
//! let mtl = network.add_bus(Bus::new(BusId::new(0), "Montreal").with_v_nom(735.0));
//! let qc = network.add_bus(Bus::new(BusId::new(1), "Quebec").with_v_nom(735.0));
//!
//! network.add_generator(
//!     Generator::new(GenId::new(0), "Beauharnois", BusId::new(0))
//!         .with_control(GenControl::Slack)
//!         .with_p_nom(1900.0)
//!         .with_marginal_cost(3.0),
//! );
//! network.add_load(Load::new(LoadId::new(0), "Quebec", BusId::new(1), 800.0));
//!
//! network.graph.add_edge(
//!     mtl,
//!     qc,
//!     Edge::Line(Line::new(LineId::new(0), "L0001", BusId::new(0), BusId::new(1)).with_length(233.0)),
//! );
//! ```
//!
//! ## Modules
//!
//! - [`diagnostics`] - validation and import issue reporting
//! - [`geometry`] - geographic points and region polygons
//! - [`graph_utils`] - islands and degree statistics
//! - [`solver`] - dense linear-system backends used by the power flows
//! - [`timeseries`] - snapshot-indexed tables (loads, costs, availability)
//! - [`units`] - typed physical quantities

use petgraph::{prelude::*, Undirected};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod graph_utils;
pub mod solver;
pub mod timeseries;
pub mod units;

pub use diagnostics::{DiagnosticIssue, Diagnostics, ImportDiagnostics, ImportStats, Severity};
pub use error::{GridError, GridResult};
pub use geometry::{GeoPoint, Polygon, Region};
pub use graph_utils::*;
pub use petgraph::graph::NodeIndex;
pub use solver::*;
pub use timeseries::{NetworkTimeSeries, TimeSeriesTable};
pub use units::{Kilometers, Kilovolts, Megavars, MegavoltAmperes, Megawatts, PerUnit};

/// Carriers whose output follows an availability profile rather than a set-point.
pub const NON_PILOTABLE_CARRIERS: &[&str] = &["hydro_fil", "eolien", "solaire"];

/// Carriers that can be dispatched.
pub const PILOTABLE_CARRIERS: &[&str] = &["hydro_reservoir", "thermique"];

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadId(usize);

impl BusId {
    #[inline]
    pub fn new(value: usize) -> Self {
        BusId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl LineId {
    #[inline]
    pub fn new(value: usize) -> Self {
        LineId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl GenId {
    #[inline]
    pub fn new(value: usize) -> Self {
        GenId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl LoadId {
    #[inline]
    pub fn new(value: usize) -> Self {
        LoadId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    /// Nominal voltage (kV), also the per-unit voltage base
    pub v_nom: Kilovolts,
    /// Longitude in decimal degrees
    pub x: f64,
    /// Latitude in decimal degrees
    pub y: f64,
    /// Voltage magnitude set-point used by PV and slack buses
    pub v_mag_pu_set: PerUnit,
    pub carrier: String,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            id: BusId(0),
            name: String::new(),
            v_nom: Kilovolts(735.0),
            x: 0.0,
            y: 0.0,
            v_mag_pu_set: PerUnit(1.0),
            carrier: "AC".to_string(),
        }
    }
}

impl Bus {
    pub fn new(id: BusId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_v_nom(mut self, kv: f64) -> Self {
        self.v_nom = Kilovolts(kv);
        self
    }

    /// Place the bus at a longitude/latitude pair.
    pub fn at(mut self, lon: f64, lat: f64) -> Self {
        self.x = lon;
        self.y = lat;
        self
    }

    /// True when the bus carries a usable geographic position.
    pub fn has_coordinates(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && !(self.x == 0.0 && self.y == 0.0)
    }
}

/// Standard electrical parameters shared by lines of the same construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineType {
    pub name: String,
    /// Nominal frequency (Hz)
    pub f_nom: f64,
    /// Series resistance per km (Ω/km)
    pub r_per_length: f64,
    /// Series reactance per km (Ω/km)
    pub x_per_length: f64,
    /// Shunt capacitance per km (nF/km)
    pub c_per_length: f64,
    /// Shunt susceptance per km (S/km); overrides `c_per_length` when set
    pub b_per_length: Option<f64>,
    /// Nominal current (kA)
    pub i_nom: f64,
}

impl Default for LineType {
    fn default() -> Self {
        Self {
            name: String::new(),
            f_nom: 60.0,
            r_per_length: 0.0,
            x_per_length: 0.0,
            c_per_length: 0.0,
            b_per_length: None,
            i_nom: 0.0,
        }
    }
}

impl LineType {
    /// Shunt susceptance per km in siemens.
    pub fn susceptance_per_km(&self) -> f64 {
        match self.b_per_length {
            Some(b) => b,
            None => 2.0 * std::f64::consts::PI * self.f_nom * self.c_per_length * 1e-9,
        }
    }
}

/// Line impedance expressed on the system base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineImpedancePu {
    pub r: f64,
    pub x: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Line {
    pub id: LineId,
    pub name: String,
    pub bus0: BusId,
    pub bus1: BusId,
    pub line_type: Option<String>,
    pub length: Kilometers,
    /// Series resistance (Ω)
    pub r_ohm: f64,
    /// Series reactance (Ω)
    pub x_ohm: f64,
    /// Total shunt susceptance (S)
    pub b_siemens: f64,
    /// Thermal rating
    pub s_nom: MegavoltAmperes,
    pub num_parallel: f64,
    pub capital_cost: f64,
}

impl Default for Line {
    fn default() -> Self {
        Self {
            id: LineId(0),
            name: String::new(),
            bus0: BusId(0),
            bus1: BusId(0),
            line_type: None,
            length: Kilometers(0.0),
            r_ohm: 0.0,
            x_ohm: 0.0,
            b_siemens: 0.0,
            s_nom: MegavoltAmperes(0.0),
            num_parallel: 1.0,
            capital_cost: 0.0,
        }
    }
}

impl Line {
    pub fn new(id: LineId, name: impl Into<String>, bus0: BusId, bus1: BusId) -> Self {
        Self {
            id,
            name: name.into(),
            bus0,
            bus1,
            ..Self::default()
        }
    }

    pub fn with_length(mut self, km: f64) -> Self {
        self.length = Kilometers(km);
        self
    }

    pub fn with_impedance(mut self, r_ohm: f64, x_ohm: f64) -> Self {
        self.r_ohm = r_ohm;
        self.x_ohm = x_ohm;
        self
    }

    pub fn with_s_nom(mut self, mva: f64) -> Self {
        self.s_nom = MegavoltAmperes(mva);
        self
    }

    /// Derive r, x and b from a standard type and the current length.
    pub fn apply_line_type(&mut self, line_type: &LineType) {
        let km = self.length.value();
        let parallel = if self.num_parallel > 0.0 {
            self.num_parallel
        } else {
            1.0
        };
        self.r_ohm = line_type.r_per_length * km / parallel;
        self.x_ohm = line_type.x_per_length * km / parallel;
        self.b_siemens = line_type.susceptance_per_km() * km * parallel;
    }

    /// Convert the physical impedance to per-unit with Z_base = V_nom² / S_base.
    pub fn impedance_pu(&self, v_nom: Kilovolts, base_mva: f64) -> LineImpedancePu {
        let z_base = v_nom.base_impedance(base_mva);
        LineImpedancePu {
            r: self.r_ohm / z_base,
            x: self.x_ohm / z_base,
            b: self.b_siemens * z_base,
        }
    }
}

/// Energy carrier (technology) of a generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Carrier {
    pub name: String,
    /// Specific emissions (t CO2 / MWh)
    #[serde(default)]
    pub co2_emissions: f64,
    #[serde(default)]
    pub nice_name: Option<String>,
}

/// Voltage/power control mode of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GenControl {
    Slack,
    PV,
    #[default]
    PQ,
}

impl FromStr for GenControl {
    type Err = GridError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "slack" => Ok(GenControl::Slack),
            "pv" => Ok(GenControl::PV),
            "pq" | "" => Ok(GenControl::PQ),
            other => Err(GridError::Parse(format!(
                "unknown generator control '{other}'; expected Slack, PV or PQ"
            ))),
        }
    }
}

impl fmt::Display for GenControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GenControl::Slack => "Slack",
            GenControl::PV => "PV",
            GenControl::PQ => "PQ",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dispatchability {
    #[default]
    Pilotable,
    NonPilotable,
}

impl Dispatchability {
    /// Classify a carrier name; unknown carriers are treated as dispatchable.
    pub fn from_carrier(carrier: &str) -> Self {
        if NON_PILOTABLE_CARRIERS.contains(&carrier) {
            Dispatchability::NonPilotable
        } else {
            Dispatchability::Pilotable
        }
    }
}

impl FromStr for Dispatchability {
    type Err = GridError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pilotable" => Ok(Dispatchability::Pilotable),
            "non_pilotable" | "nonpilotable" => Ok(Dispatchability::NonPilotable),
            other => Err(GridError::Parse(format!(
                "unknown generator type '{other}'; expected pilotable or non_pilotable"
            ))),
        }
    }
}

impl fmt::Display for Dispatchability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatchability::Pilotable => f.write_str("pilotable"),
            Dispatchability::NonPilotable => f.write_str("non_pilotable"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Generator {
    pub id: GenId,
    pub name: String,
    pub bus: BusId,
    pub carrier: String,
    pub dispatchability: Dispatchability,
    pub control: GenControl,
    /// Nameplate capacity
    pub p_nom: Megawatts,
    /// Minimum output as a fraction of `p_nom`
    pub p_min_pu: f64,
    /// Maximum output (static availability) as a fraction of `p_nom`
    pub p_max_pu: f64,
    /// Active power set-point
    pub p_set: Megawatts,
    /// Reactive power set-point
    pub q_set: Megavars,
    pub q_min: Megavars,
    pub q_max: Megavars,
    /// Marginal cost ($/MWh)
    pub marginal_cost: f64,
}

impl Generator {
    pub fn new(id: GenId, name: impl Into<String>, bus: BusId) -> Self {
        Self {
            id,
            name: name.into(),
            bus,
            carrier: String::new(),
            dispatchability: Dispatchability::Pilotable,
            control: GenControl::PQ,
            p_nom: Megawatts(0.0),
            p_min_pu: 0.0,
            p_max_pu: 1.0,
            p_set: Megawatts(0.0),
            q_set: Megavars(0.0),
            q_min: Megavars(f64::NEG_INFINITY),
            q_max: Megavars(f64::INFINITY),
            marginal_cost: 0.0,
        }
    }

    pub fn with_control(mut self, control: GenControl) -> Self {
        self.control = control;
        self
    }

    pub fn with_p_nom(mut self, mw: f64) -> Self {
        self.p_nom = Megawatts(mw);
        self
    }

    pub fn with_p_set(mut self, mw: f64) -> Self {
        self.p_set = Megawatts(mw);
        self
    }

    pub fn with_marginal_cost(mut self, cost: f64) -> Self {
        self.marginal_cost = cost;
        self
    }

    /// Set the carrier and derive dispatchability from it.
    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = carrier.into();
        self.dispatchability = Dispatchability::from_carrier(&self.carrier);
        self
    }

    pub fn with_q_limits(mut self, q_min: f64, q_max: f64) -> Self {
        self.q_min = Megavars(q_min);
        self.q_max = Megavars(q_max);
        self
    }

    pub fn is_slack(&self) -> bool {
        self.control == GenControl::Slack
    }

    pub fn p_min_mw(&self) -> f64 {
        self.p_min_pu * self.p_nom.value()
    }

    /// Output ceiling for a given availability factor.
    pub fn available_mw(&self, p_max_pu: f64) -> f64 {
        p_max_pu.clamp(0.0, 1.0) * self.p_nom.value()
    }

    /// Unused capacity above the current set-point.
    pub fn headroom_mw(&self) -> f64 {
        (self.available_mw(self.p_max_pu) - self.p_set.value()).max(0.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Load {
    pub id: LoadId,
    pub name: String,
    pub bus: BusId,
    pub p_set: Megawatts,
    pub q_set: Megavars,
}

impl Load {
    pub fn new(id: LoadId, name: impl Into<String>, bus: BusId, p_mw: f64) -> Self {
        Self {
            id,
            name: name.into(),
            bus,
            p_set: Megawatts(p_mw),
            q_set: Megavars(0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Bus(Bus),
    Gen(Generator),
    Load(Load),
}

#[derive(Debug, Clone)]
pub enum Edge {
    Line(Line),
}

/// The transmission network graph plus its reference tables.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub graph: Graph<Node, Edge, Undirected>,
    pub line_types: BTreeMap<String, LineType>,
    pub carriers: BTreeMap<String, Carrier>,
}

impl Network {
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
            line_types: BTreeMap::new(),
            carriers: BTreeMap::new(),
        }
    }

    pub fn add_bus(&mut self, bus: Bus) -> NodeIndex {
        self.graph.add_node(Node::Bus(bus))
    }

    pub fn add_generator(&mut self, generator: Generator) -> NodeIndex {
        self.graph.add_node(Node::Gen(generator))
    }

    pub fn add_load(&mut self, load: Load) -> NodeIndex {
        self.graph.add_node(Node::Load(load))
    }

    /// Connect two buses by id. Fails if either bus is missing.
    pub fn add_line(&mut self, line: Line) -> GridResult<EdgeIndex> {
        let from = self.bus_node(line.bus0).ok_or_else(|| {
            GridError::Network(format!("line '{}' references unknown bus0", line.name))
        })?;
        let to = self.bus_node(line.bus1).ok_or_else(|| {
            GridError::Network(format!("line '{}' references unknown bus1", line.name))
        })?;
        Ok(self.graph.add_edge(from, to, Edge::Line(line)))
    }

    /// Compute basic statistics about the network
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats::default();

        for node in self.graph.node_weights() {
            match node {
                Node::Bus(_) => stats.num_buses += 1,
                Node::Gen(g) => {
                    stats.num_gens += 1;
                    stats.total_gen_capacity_mw += g.p_nom.value();
                    stats.total_gen_set_mw += g.p_set.value();
                    if g.is_slack() {
                        stats.num_slack += 1;
                    }
                }
                Node::Load(l) => {
                    stats.num_loads += 1;
                    stats.total_load_mw += l.p_set.value();
                }
            }
        }

        stats.num_lines = self.graph.edge_count();
        stats.num_line_types = self.line_types.len();
        stats.num_carriers = self.carriers.len();
        stats
    }

    /// Check structural invariants before a solve.
    ///
    /// Dangling bus references and islands without exactly one slack
    /// generator are errors; missing loads or short capacity are warnings.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();

        if stats.num_buses == 0 {
            diag.add_error("structure", "Network has no buses");
            return;
        }

        if stats.num_gens == 0 {
            diag.add_error("structure", "Network has no generators");
        }

        if stats.num_lines == 0 && stats.num_buses > 1 {
            diag.add_error("structure", "Network has multiple buses but no lines");
        }

        if stats.num_loads == 0 {
            diag.add_warning("structure", "Network has no loads");
        }

        if stats.total_gen_capacity_mw < stats.total_load_mw {
            diag.add_warning(
                "capacity",
                &format!(
                    "Total generation capacity ({:.1} MW) is less than total load ({:.1} MW)",
                    stats.total_gen_capacity_mw, stats.total_load_mw
                ),
            );
        }

        for bus in self.buses() {
            if bus.v_nom.value() <= 0.0 {
                diag.add_error_with_entity(
                    "physical",
                    "Nominal voltage must be positive",
                    &format!("Bus {}", bus.name),
                );
            }
        }

        for gen in self.generators() {
            if self.bus(gen.bus).is_none() {
                diag.add_error_with_entity(
                    "reference",
                    "Generator references a bus that does not exist",
                    &format!("Generator {}", gen.name),
                );
            }
        }
        for load in self.loads() {
            if self.bus(load.bus).is_none() {
                diag.add_error_with_entity(
                    "reference",
                    "Load references a bus that does not exist",
                    &format!("Load {}", load.name),
                );
            }
        }
        for line in self.lines() {
            if self.bus(line.bus0).is_none() || self.bus(line.bus1).is_none() {
                diag.add_error_with_entity(
                    "reference",
                    "Line references a bus that does not exist",
                    &format!("Line {}", line.name),
                );
            }
            if line.x_ohm.abs() < 1e-12 {
                diag.add_warning_with_entity(
                    "physical",
                    "Line has zero reactance",
                    &format!("Line {}", line.name),
                );
            }
        }

        for island in bus_islands(self) {
            let slack_count = self
                .generators()
                .into_iter()
                .filter(|g| g.is_slack() && island.buses.contains(&g.bus))
                .count();
            if slack_count != 1 {
                diag.add_error_with_entity(
                    "slack",
                    &format!(
                        "Island has {} slack generators, expected exactly one",
                        slack_count
                    ),
                    &format!("Island {}", island.island_id),
                );
            }
        }
    }

    /// Re-derive r, x and b for every line that names a known type.
    ///
    /// Returns the names of lines whose type is not in `line_types`.
    pub fn apply_line_types(&mut self) -> Vec<String> {
        let types = self.line_types.clone();
        let mut unknown = Vec::new();
        for line in self.lines_mut() {
            let Some(type_name) = line.line_type.clone() else {
                continue;
            };
            match types.get(&type_name) {
                Some(lt) => line.apply_line_type(lt),
                None => unknown.push(line.name.clone()),
            }
        }
        unknown
    }

    /// Get total active power generation set-point (MW)
    pub fn total_generation_mw(&self) -> f64 {
        self.generators().iter().map(|g| g.p_set.value()).sum()
    }

    /// Get total active power load (MW)
    pub fn total_load_mw(&self) -> f64 {
        self.loads().iter().map(|l| l.p_set.value()).sum()
    }

    /// Get total nameplate capacity (MW)
    pub fn total_capacity_mw(&self) -> f64 {
        self.generators()
            .iter()
            .map(|g| g.p_nom.value())
            .filter(|v| v.is_finite())
            .sum()
    }

    /// Installed capacity per carrier.
    pub fn capacity_by_carrier(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for gen in self.generators() {
            *out.entry(gen.carrier.clone()).or_insert(0.0) += gen.p_nom.value();
        }
        out
    }

    /// Installed capacity per dispatchability class.
    pub fn capacity_by_dispatchability(&self) -> BTreeMap<Dispatchability, f64> {
        let mut out = BTreeMap::new();
        for gen in self.generators() {
            *out.entry(gen.dispatchability).or_insert(0.0) += gen.p_nom.value();
        }
        out
    }

    pub fn bus_node(&self, bus_id: BusId) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|idx| matches!(&self.graph[*idx], Node::Bus(b) if b.id == bus_id))
    }

    pub fn bus(&self, bus_id: BusId) -> Option<&Bus> {
        self.graph.node_weights().find_map(|n| match n {
            Node::Bus(b) if b.id == bus_id => Some(b),
            _ => None,
        })
    }

    pub fn bus_by_name(&self, name: &str) -> Option<&Bus> {
        self.graph.node_weights().find_map(|n| match n {
            Node::Bus(b) if b.name == name => Some(b),
            _ => None,
        })
    }

    pub fn generator_by_name(&self, name: &str) -> Option<&Generator> {
        self.graph.node_weights().find_map(|n| match n {
            Node::Gen(g) if g.name == name => Some(g),
            _ => None,
        })
    }

    pub fn generator_by_name_mut(&mut self, name: &str) -> Option<&mut Generator> {
        self.graph.node_weights_mut().find_map(|n| match n {
            Node::Gen(g) if g.name == name => Some(g),
            _ => None,
        })
    }

    /// Find generators at a specific bus
    pub fn generators_at_bus(&self, bus_id: BusId) -> Vec<&Generator> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Gen(g) if g.bus == bus_id => Some(g),
                _ => None,
            })
            .collect()
    }

    /// Find loads at a specific bus
    pub fn loads_at_bus(&self, bus_id: BusId) -> Vec<&Load> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Load(l) if l.bus == bus_id => Some(l),
                _ => None,
            })
            .collect()
    }

    pub fn slack_generators(&self) -> Vec<&Generator> {
        self.generators().into_iter().filter(|g| g.is_slack()).collect()
    }

    /// Get all buses as a vector
    pub fn buses(&self) -> Vec<&Bus> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Bus(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    /// Get all generators as a vector
    pub fn generators(&self) -> Vec<&Generator> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Gen(g) => Some(g),
                _ => None,
            })
            .collect()
    }

    pub fn generators_mut(&mut self) -> impl Iterator<Item = &mut Generator> {
        self.graph.node_weights_mut().filter_map(|n| match n {
            Node::Gen(g) => Some(g),
            _ => None,
        })
    }

    pub fn loads(&self) -> Vec<&Load> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Load(l) => Some(l),
                _ => None,
            })
            .collect()
    }

    pub fn loads_mut(&mut self) -> impl Iterator<Item = &mut Load> {
        self.graph.node_weights_mut().filter_map(|n| match n {
            Node::Load(l) => Some(l),
            _ => None,
        })
    }

    /// Get all lines as a vector
    pub fn lines(&self) -> Vec<&Line> {
        self.graph
            .edge_weights()
            .map(|e| match e {
                Edge::Line(l) => l,
            })
            .collect()
    }

    pub fn lines_mut(&mut self) -> impl Iterator<Item = &mut Line> {
        self.graph.edge_weights_mut().map(|e| match e {
            Edge::Line(l) => l,
        })
    }
}

/// Statistics about a network's size and capacity
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_gens: usize,
    pub num_slack: usize,
    pub num_loads: usize,
    pub num_lines: usize,
    pub num_line_types: usize,
    pub num_carriers: usize,
    pub total_load_mw: f64,
    pub total_gen_capacity_mw: f64,
    pub total_gen_set_mw: f64,
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} buses, {} lines, {} gens ({:.0} MW), {} loads ({:.0} MW)",
            self.num_buses,
            self.num_lines,
            self.num_gens,
            self.total_gen_capacity_mw,
            self.num_loads,
            self.total_load_mw
        )
    }
}

impl Node {
    /// Returns a human-readable label for the node.
    pub fn label(&self) -> &str {
        match self {
            Node::Bus(bus) => &bus.name,
            Node::Gen(gen) => &gen.name,
            Node::Load(load) => &load.name,
        }
    }
}

impl Edge {
    pub fn label(&self) -> &str {
        match self {
            Edge::Line(line) => &line.name,
        }
    }
}

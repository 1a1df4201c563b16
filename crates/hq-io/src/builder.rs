//! Name-keyed construction of a [`Network`] from table records.
//!
//! The input tables refer to buses by name; the builder assigns sequential
//! ids, resolves the names and records every row it has to drop or default
//! in the attached [`ImportDiagnostics`].
//!
//! ```ignore
//! let mut diag = ImportDiagnostics::new();
//! let mut builder = NetworkBuilder::with_diagnostics(&mut diag);
//! builder.add_bus(BusRecord { name: "Montreal".into(), v_nom: Some(735.0), ..Default::default() });
//! builder.add_load(LoadRecord { name: "Montreal".into(), bus: "Montreal".into(), p_set: Some(800.0), q_set: None });
//! let network = builder.build();
//! ```

use std::collections::HashMap;

use hq_core::{
    Bus, BusId, Carrier, Dispatchability, GenControl, GenId, Generator, ImportDiagnostics,
    Kilometers, Kilovolts, Line, LineId, LineType, Load, LoadId, Megavars, MegavoltAmperes,
    Megawatts, Network, PerUnit,
};

use crate::records::{
    BusRecord, CarrierRecord, GeneratorRecord, LineRecord, LineTypeRecord, LoadRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    Added,
    /// Row dropped (duplicate name or unknown bus)
    Skipped,
}

pub struct NetworkBuilder<'a> {
    network: Network,
    bus_ids: HashMap<String, BusId>,
    generator_names: HashMap<String, GenId>,
    load_names: HashMap<String, LoadId>,
    diag: Option<&'a mut ImportDiagnostics>,
    next_line_id: usize,
}

impl<'a> Default for NetworkBuilder<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> NetworkBuilder<'a> {
    pub fn new() -> Self {
        Self {
            network: Network::new(),
            bus_ids: HashMap::new(),
            generator_names: HashMap::new(),
            load_names: HashMap::new(),
            diag: None,
            next_line_id: 0,
        }
    }

    pub fn with_diagnostics(diag: &'a mut ImportDiagnostics) -> Self {
        Self {
            diag: Some(diag),
            ..Self::new()
        }
    }

    fn warn(&mut self, category: &str, message: &str, entity: &str) {
        if let Some(diag) = self.diag.as_deref_mut() {
            diag.add_warning_with_entity(category, message, entity);
        }
    }

    fn defaulted(&mut self, entity: &str, message: &str) {
        if let Some(diag) = self.diag.as_deref_mut() {
            diag.add_defaulted(entity, message);
        }
    }

    fn skip(&mut self, category: &str, message: &str, entity: &str) -> AddResult {
        if let Some(diag) = self.diag.as_deref_mut() {
            diag.add_error_with_entity(category, message, entity);
        }
        AddResult::Skipped
    }

    pub fn has_bus(&self, name: &str) -> bool {
        self.bus_ids.contains_key(name)
    }

    pub fn bus_id(&self, name: &str) -> Option<BusId> {
        self.bus_ids.get(name).copied()
    }

    pub fn has_load(&self, name: &str) -> bool {
        self.load_names.contains_key(name)
    }

    pub fn add_bus(&mut self, record: BusRecord) -> AddResult {
        let entity = format!("Bus {}", record.name);
        if self.bus_ids.contains_key(&record.name) {
            return self.skip("duplicate", "bus name already defined", &entity);
        }
        let id = BusId::new(self.bus_ids.len());
        let v_nom = match record.v_nom {
            Some(v) => v,
            None => {
                self.defaulted(&entity, "v_nom missing, using 735 kV");
                735.0
            }
        };
        let mut bus = Bus::new(id, record.name.clone());
        bus.v_nom = Kilovolts(v_nom);
        bus.x = record.x.unwrap_or(0.0);
        bus.y = record.y.unwrap_or(0.0);
        bus.v_mag_pu_set = PerUnit(record.v_mag_pu_set.unwrap_or(1.0));
        if let Some(carrier) = record.carrier {
            bus.carrier = carrier;
        }
        self.network.add_bus(bus);
        self.bus_ids.insert(record.name, id);
        if let Some(diag) = self.diag.as_deref_mut() {
            diag.stats.buses += 1;
        }
        AddResult::Added
    }

    pub fn add_line_type(&mut self, record: LineTypeRecord) -> AddResult {
        let defaults = LineType::default();
        let line_type = LineType {
            name: record.name.clone(),
            f_nom: record.f_nom.unwrap_or(defaults.f_nom),
            r_per_length: record.r_per_length,
            x_per_length: record.x_per_length,
            c_per_length: record.c_per_length.unwrap_or(0.0),
            b_per_length: record.b_per_length,
            i_nom: record.i_nom.unwrap_or(0.0),
        };
        if self
            .network
            .line_types
            .insert(record.name.clone(), line_type)
            .is_some()
        {
            self.warn("duplicate", "line type redefined", &format!("LineType {}", record.name));
        } else if let Some(diag) = self.diag.as_deref_mut() {
            diag.stats.line_types += 1;
        }
        AddResult::Added
    }

    pub fn add_carrier(&mut self, record: CarrierRecord) -> AddResult {
        let carrier = Carrier {
            name: record.name.clone(),
            co2_emissions: record.co2_emissions.unwrap_or(0.0),
            nice_name: record.nice_name,
        };
        if self.network.carriers.insert(record.name, carrier).is_none() {
            if let Some(diag) = self.diag.as_deref_mut() {
                diag.stats.carriers += 1;
            }
        }
        AddResult::Added
    }

    pub fn add_line(&mut self, record: LineRecord) -> AddResult {
        let entity = format!("Line {}", record.name);
        let Some(bus0) = self.bus_id(&record.bus0) else {
            let message = format!("unknown bus0 '{}'", record.bus0);
            return self.skip("reference", &message, &entity);
        };
        let Some(bus1) = self.bus_id(&record.bus1) else {
            let message = format!("unknown bus1 '{}'", record.bus1);
            return self.skip("reference", &message, &entity);
        };
        if bus0 == bus1 {
            return self.skip("structure", "line connects a bus to itself", &entity);
        }

        let mut line = Line::new(LineId::new(self.next_line_id), record.name.clone(), bus0, bus1);
        line.line_type = record.line_type.filter(|t| !t.trim().is_empty());
        line.length = Kilometers(record.length.unwrap_or(0.0));
        line.r_ohm = record.r.unwrap_or(0.0);
        line.x_ohm = record.x.unwrap_or(0.0);
        line.b_siemens = record.b.unwrap_or(0.0);
        line.num_parallel = record.num_parallel.unwrap_or(1.0);
        line.capital_cost = record.capital_cost.unwrap_or(0.0);
        match record.s_nom {
            Some(s) => line.s_nom = MegavoltAmperes(s),
            None => self.defaulted(&entity, "s_nom missing, line is unrated"),
        }
        if line.line_type.is_none() && record.x.is_none() {
            self.warn("physical", "line has neither a type nor a reactance", &entity);
        }

        if self.network.add_line(line).is_err() {
            return self.skip("reference", "line endpoints not found in graph", &entity);
        }
        self.next_line_id += 1;
        if let Some(diag) = self.diag.as_deref_mut() {
            diag.stats.lines += 1;
        }
        AddResult::Added
    }

    pub fn add_generator(&mut self, record: GeneratorRecord) -> AddResult {
        let entity = format!("Generator {}", record.name);
        if self.generator_names.contains_key(&record.name) {
            return self.skip("duplicate", "generator name already defined", &entity);
        }
        let Some(bus) = self.bus_id(&record.bus) else {
            let message = format!("unknown bus '{}'", record.bus);
            return self.skip("reference", &message, &entity);
        };

        let id = GenId::new(self.generator_names.len());
        let carrier = record.carrier.unwrap_or_default();
        if !carrier.is_empty()
            && !self.network.carriers.is_empty()
            && !self.network.carriers.contains_key(&carrier)
        {
            self.warn("reference", &format!("carrier '{carrier}' is not defined"), &entity);
        }

        let mut gen = Generator::new(id, record.name.clone(), bus).with_carrier(carrier);
        if let Some(kind) = record.dispatchability.filter(|k| !k.trim().is_empty()) {
            match kind.parse::<Dispatchability>() {
                Ok(parsed) => gen.dispatchability = parsed,
                Err(err) => self.warn("parse", &err.to_string(), &entity),
            }
        }
        gen.control = match record.control.as_deref().map(str::parse::<GenControl>) {
            Some(Ok(control)) => control,
            Some(Err(err)) => {
                self.defaulted(&entity, &format!("{err}, using PQ"));
                GenControl::PQ
            }
            None => GenControl::PQ,
        };
        gen.p_nom = Megawatts(record.p_nom.unwrap_or(0.0));
        gen.p_min_pu = record.p_min_pu.unwrap_or(0.0);
        gen.p_max_pu = record.p_max_pu.unwrap_or(1.0);
        gen.p_set = Megawatts(record.p_set.unwrap_or(0.0));
        gen.q_set = Megavars(record.q_set.unwrap_or(0.0));
        gen.q_min = Megavars(record.q_min.unwrap_or(f64::NEG_INFINITY));
        gen.q_max = Megavars(record.q_max.unwrap_or(f64::INFINITY));
        gen.marginal_cost = record.marginal_cost.unwrap_or(0.0);
        if gen.p_nom.value() <= 0.0 {
            self.warn("physical", "generator has no capacity (p_nom <= 0)", &entity);
        }

        self.network.add_generator(gen);
        self.generator_names.insert(record.name, id);
        if let Some(diag) = self.diag.as_deref_mut() {
            diag.stats.generators += 1;
        }
        AddResult::Added
    }

    pub fn add_load(&mut self, record: LoadRecord) -> AddResult {
        let entity = format!("Load {}", record.name);
        if self.load_names.contains_key(&record.name) {
            return self.skip("duplicate", "load name already defined", &entity);
        }
        let Some(bus) = self.bus_id(&record.bus) else {
            let message = format!("unknown bus '{}'", record.bus);
            return self.skip("reference", &message, &entity);
        };
        let id = LoadId::new(self.load_names.len());
        let mut load = Load::new(id, record.name.clone(), bus, record.p_set.unwrap_or(0.0));
        load.q_set = Megavars(record.q_set.unwrap_or(0.0));
        self.network.add_load(load);
        self.load_names.insert(record.name, id);
        if let Some(diag) = self.diag.as_deref_mut() {
            diag.stats.loads += 1;
        }
        AddResult::Added
    }

    /// Finish the network: line types are applied to the lines that name one.
    pub fn build(mut self) -> Network {
        for name in self.network.apply_line_types() {
            self.warn(
                "reference",
                "line type not defined, keeping explicit impedance",
                &format!("Line {name}"),
            );
        }
        self.network
    }
}

use anyhow::Result;
use hq_algo::emissions::ENERGY_CO2_KG;
use hq_algo::{distribution_emissions, transport_emissions};

pub struct EmissionsOptions<'a> {
    pub types: &'a [String],
    pub transport_share: f64,
    pub length_km: f64,
    pub distribution_share: f64,
    pub kwh: f64,
}

pub fn handle(options: EmissionsOptions<'_>) -> Result<()> {
    let types: Vec<String> = if options.types.is_empty() {
        ENERGY_CO2_KG.keys().map(|t| t.to_string()).collect()
    } else {
        options.types.to_vec()
    };
    for unknown in types.iter().filter(|t| !ENERGY_CO2_KG.contains_key(t.as_str())) {
        tracing::warn!(energy_type = %unknown, "unknown energy type counts as zero");
    }

    let transport = transport_emissions(&types, options.transport_share, options.length_km);
    let distribution = distribution_emissions(&types, options.distribution_share, options.kwh);
    println!("Energy types: {}", types.join(", "));
    println!("Total yearly CO2 emissions for transport (kg/km): {transport:.2}");
    println!("Total yearly CO2 emissions for distribution (kg/kWh): {distribution:.2}");
    Ok(())
}

//! Pre-study validation of a loaded network and its time series.

use std::collections::HashSet;

use hq_core::{Diagnostics, Network, NetworkTimeSeries};

/// Run the structural checks of [`Network::validate_into`] plus the data
/// checks a study needs: at least one line, at least one snapshot, and
/// time-series columns that name known elements.
pub fn validate_network(network: &Network, series: Option<&NetworkTimeSeries>) -> Diagnostics {
    let mut diag = Diagnostics::new();
    network.validate_into(&mut diag);

    let stats = network.stats();
    if stats.num_lines == 0 && stats.num_buses <= 1 {
        diag.add_error("structure", "Network has no lines");
    }

    if let Some(series) = series {
        if series.snapshots().is_empty() {
            diag.add_error("timeseries", "No snapshots in the time series");
        }

        let loads: HashSet<&str> = network.loads().into_iter().map(|l| l.name.as_str()).collect();
        for column in &series.loads_p_set.columns {
            if !loads.contains(column.as_str()) {
                diag.add_warning_with_entity(
                    "timeseries",
                    "Load series column matches no load",
                    &format!("Load {column}"),
                );
            }
        }

        let gens: HashSet<&str> = network
            .generators()
            .into_iter()
            .map(|g| g.name.as_str())
            .collect();
        for table in [&series.generators_marginal_cost, &series.generators_p_max_pu] {
            for column in &table.columns {
                if !gens.contains(column.as_str()) {
                    diag.add_warning_with_entity(
                        "timeseries",
                        "Generator series column matches no generator",
                        &format!("Generator {column}"),
                    );
                }
            }
        }

        let cost_index = &series.generators_marginal_cost.index;
        if !cost_index.is_empty() && cost_index != &series.loads_p_set.index {
            diag.add_warning(
                "timeseries",
                "Marginal cost snapshots differ from load snapshots",
            );
        }
    }
    diag
}

use std::fs;
use std::path::Path;

use hq_algo::{
    check_feasibility, redistribute, DispatchMethod, Dispatcher, NetworkSummary,
    PowerFlowAnalyzer, PowerFlowMode, RedistributionSettings,
};
use hq_core::{Network, NetworkTimeSeries};
use hq_io::NetworkDataLoader;

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn load_study() -> (Network, NetworkTimeSeries) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "regions/buses.csv",
        "name,v_nom,x,y\n\
         Manic,735,-68.73,50.64\n\
         Levis,735,-71.18,46.80\n\
         Montreal,735,-73.5673,45.5017\n",
    );
    write(
        root,
        "topology/lines/line_types.csv",
        "name,f_nom,r_per_length,x_per_length,c_per_length,i_nom\n\
         735kV_line,60,0.01,0.3,13,3\n",
    );
    write(
        root,
        "topology/lines/lines.csv",
        "name,bus0,bus1,type,length,capital_cost,s_nom\n\
         L0001,Manic,Levis,735kV_line,450,450000,10000\n\
         L0002,Levis,Montreal,735kV_line,230,230000,4000\n",
    );
    write(
        root,
        "topology/centrales/carriers.csv",
        "name,co2_emissions,nice_name\n\
         hydro_reservoir,0,Hydro (reservoir)\n\
         hydro_fil,0,Hydro (run of river)\n\
         eolien,0,Wind\n",
    );
    write(
        root,
        "topology/centrales/generators.csv",
        "name,bus,carrier,control,p_nom,marginal_cost\n\
         Manic-5,Manic,hydro_reservoir,Slack,2500,5\n\
         Beauharnois,Montreal,hydro_fil,PQ,1900,1\n\
         Riviere-du-Loup,Levis,eolien,PQ,300,0\n",
    );
    write(
        root,
        "timeseries/2024/loads-p_set.csv",
        "snapshot,Levis,Montreal\n\
         2024-01-01 00:00:00,800,2000\n\
         2024-01-01 01:00:00,850,2100\n\
         2024-01-01 02:00:00,900,2200\n",
    );
    write(
        root,
        "timeseries/2024/generation/generators-marginal_cost.csv",
        "snapshot,Manic-5,Beauharnois,Riviere-du-Loup\n\
         2024-01-01 00:00:00,5,1,0\n\
         2024-01-01 01:00:00,6,1,0\n\
         2024-01-01 02:00:00,7,1,0\n",
    );

    let loader = NetworkDataLoader::new(root).unwrap();
    let (import, series) = loader.load_study("2024", None, None).unwrap();
    (import.into_network(), series)
}

#[test]
fn summary_of_loaded_study() {
    let (network, series) = load_study();
    let summary = NetworkSummary::new(&network, Some(&series));
    assert_eq!(summary.topology.islands, 1);
    assert_eq!(summary.total_capacity_mw, 4700.0);
    assert_eq!(summary.total_line_length_km, 680.0);
    let horizon = summary.horizon.unwrap();
    assert_eq!(horizon.snapshots, 3);
    assert_eq!(horizon.peak_load_mw, 3100.0);
}

#[test]
fn dc_power_flow_over_the_horizon() {
    let (network, series) = load_study();
    let mut analyzer = PowerFlowAnalyzer::new(&network)
        .with_time_series(&series)
        .with_mode(PowerFlowMode::Dc);
    assert!(analyzer.run_power_flow(None, None));
    assert_eq!(analyzer.results().len(), 3);

    // every MW comes from Manic while the other set-points are zero
    let loading = analyzer.get_line_loading().unwrap();
    let l1 = loading.iter().find(|l| l.line == "L0001").unwrap();
    let l2 = loading.iter().find(|l| l.line == "L0002").unwrap();
    assert!((l1.power_flow_mw - 3100.0).abs() < 1e-6);
    assert!((l2.loading_percent - 55.0).abs() < 1e-6);

    assert!(analyzer.get_critical_lines(50.0).unwrap().len() == 1);
    let losses = analyzer.analyze_network_losses().unwrap();
    assert!(losses.total_losses_mw.abs() < 1e-6);
    assert!(analyzer.get_voltage_profile().unwrap().is_none());
}

#[test]
fn merit_order_dispatch_of_the_horizon() {
    let (network, series) = load_study();
    let (feasible, message) = check_feasibility(&network, Some(&series));
    assert!(feasible, "{message}");

    let result = Dispatcher::new(DispatchMethod::MeritOrder)
        .run(&network, Some(&series))
        .unwrap();
    assert_eq!(result.snapshots.len(), 3);

    let first = &result.snapshots[0];
    assert_eq!(first.generator_p["Riviere-du-Loup"], 300.0);
    assert_eq!(first.generator_p["Beauharnois"], 1900.0);
    assert_eq!(first.generator_p["Manic-5"], 600.0);
    assert_eq!(first.total_cost, 600.0 * 5.0 + 1900.0);

    let balance = result.energy_balance();
    assert_eq!(balance.total_load, 2800.0 + 2950.0 + 3100.0);
    assert!((balance.total_generation - balance.total_load).abs() < 1e-6);
}

#[test]
fn redistribution_after_dispatch_reports_saturation() {
    let (mut network, series) = load_study();
    let result = Dispatcher::new(DispatchMethod::MeritOrder)
        .run(&network, Some(&series))
        .unwrap();
    series.apply_snapshot(&mut network, 0).unwrap();
    hq_algo::dispatch::apply_snapshot(&mut network, &result, 0).unwrap();

    // the only units besides the slack already run flat out
    let settings = RedistributionSettings::default()
        .with_mode(PowerFlowMode::Dc)
        .with_max_iterations(3);
    let report = redistribute(&mut network, &settings).unwrap();
    assert!(!report.converged);
    assert_eq!(report.iterations, 3);
    assert!((report.final_slack_mw - 600.0).abs() < 1e-6);
    assert_eq!(report.history.len(), 4);
}

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn study_dir() -> TempDir {
    let dir = tempdir().unwrap();
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
    dir
}

fn hq() -> Command {
    Command::cargo_bin("hq-cli").unwrap()
}

const RAW_HEADER: &str = "transmission_line_id,transmission_circuit_id,owner,province,\
operating_region,number_of_circuits,current_type,line_segment_length_km,\
line_segment_length_mi,line_length_km,line_length_mi,voltage,reactance,ttc_summer,\
ttc_winter,network_node_name_starting,network_node_code_starting,\
network_node_name_ending,network_node_code_ending,notes";

#[test]
fn help_lists_commands() {
    hq().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("redistribute"))
        .stdout(predicate::str::contains("emissions"));
}

#[test]
fn inspect_prints_summary() {
    let dir = study_dir();
    hq().args(["inspect", "--data-dir"])
        .arg(dir.path())
        .args(["--year", "2024"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Network Summary"));
}

#[test]
fn validate_accepts_consistent_study() {
    let dir = study_dir();
    hq().args(["validate", "--data-dir"])
        .arg(dir.path())
        .args(["--year", "2024"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Network is valid"));
}

#[test]
fn missing_data_dir_fails() {
    let dir = tempdir().unwrap();
    hq().args(["inspect", "--data-dir"])
        .arg(dir.path().join("nowhere"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn dc_power_flow_writes_loading() {
    let dir = study_dir();
    let out = dir.path().join("reports/loading.csv");
    hq().args(["pf", "--data-dir"])
        .arg(dir.path())
        .args(["--year", "2024", "--mode", "dc", "--threshold", "50", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("L0001"))
        .stdout(predicate::str::contains("Critical lines (> 50%)"));
    let csv = fs::read_to_string(out).unwrap();
    assert!(csv.starts_with("line,"));
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn snapshot_requires_year() {
    let dir = study_dir();
    hq().args(["pf", "--data-dir"])
        .arg(dir.path())
        .args(["--snapshot", "2024-01-01 00:00:00"])
        .assert()
        .failure();
}

#[test]
fn merit_dispatch_reports_cost() {
    let dir = study_dir();
    hq().args(["dispatch", "--data-dir"])
        .arg(dir.path())
        .args(["--year", "2024"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Feasibility:"))
        .stdout(predicate::str::contains("Total cost"));
}

#[test]
fn dc_redistribution_runs() {
    let dir = study_dir();
    hq().args(["redistribute", "--data-dir"])
        .arg(dir.path())
        .args(["--year", "2024", "--mode", "dc", "--max-iterations", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Number of iterations:"))
        .stdout(predicate::str::contains("Beauharnois"));
}

#[test]
fn ts_peaks_and_check() {
    let dir = study_dir();
    hq().args(["ts", "peaks", "--data-dir"])
        .arg(dir.path())
        .args(["--year", "2024"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-01-01 02:00:00"))
        .stdout(predicate::str::contains("3100.0"));
    hq().args(["ts", "check", "--data-dir"])
        .arg(dir.path())
        .args(["--year", "2024"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 days 01:00:00"));
}

#[test]
fn ts_without_year_is_an_error() {
    let dir = study_dir();
    hq().args(["ts", "seasonal", "--data-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs a time series"));
}

#[test]
fn geo_distance_montreal_quebec() {
    hq().args(["geo", "distance", "45.5017", "-73.5673", "46.8139", "-71.2080"])
        .assert()
        .success()
        .stdout(predicate::str::contains("233."));
}

#[test]
fn emissions_with_defaults() {
    hq().arg("emissions")
        .assert()
        .success()
        .stdout(predicate::str::contains("transport (kg/km): 0.43"))
        .stdout(predicate::str::contains("distribution (kg/kWh): 0.13"));
}

#[test]
fn raw_lines_pipeline() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "raw.csv",
        &format!(
            "{RAW_HEADER}\n\
             1,1a,HQ,QC,,1,AC,233,145,233,145,735,,,,Montreal,MTL,Quebec,QUE,\n\
             2,2a,HQ,QC,,1,AC,120,75,120,75,315,,,,Quebec,QUE,Saguenay,SAG,\n\
             3,3a,HONI,ON,,1,AC,80,50,80,50,230,,,,Ottawa,OTT,Hull,HUL,\n"
        ),
    );
    let qc = root.join("qc.csv");
    hq().args(["lines", "filter"])
        .arg(root.join("raw.csv"))
        .arg("-o")
        .arg(&qc)
        .assert()
        .success()
        .stdout(predicate::str::contains("Kept 2"));

    hq().args(["lines", "nodes"])
        .arg(&qc)
        .arg("-o")
        .arg(root.join("nodes.csv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("3 nodes (2 start, 2 end, 1 both)"));

    hq().args(["lines", "extract"])
        .arg(&qc)
        .arg("-o")
        .arg(root.join("lines.csv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Extracted 2 line(s)"))
        .stdout(predicate::str::contains("735kV_line"));

    write(
        root,
        "located.csv",
        "node_name,used_as_start,used_as_end,latitude,longitude\n\
         Montreal,true,false,45.5017,-73.5673\n\
         Quebec,true,true,46.8139,-71.2080\n\
         Saguenay,false,true,,\n",
    );
    let attached = root.join("attached.csv");
    hq().args(["lines", "attach", "--lines"])
        .arg(&qc)
        .arg("--nodes")
        .arg(root.join("located.csv"))
        .arg("-o")
        .arg(&attached)
        .assert()
        .success()
        .stdout(predicate::str::contains("1/2 line(s) located at both ends"));

    hq().args(["geo", "lengths"])
        .arg(&attached)
        .assert()
        .success()
        .stdout(predicate::str::contains("233"));
}

#[test]
fn geo_regions_counts_start_and_end_nodes() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "nodes.csv",
        "node_name,used_as_start,used_as_end,latitude,longitude\n\
         Montreal,true,false,45.5017,-73.5673\n\
         Levis,false,true,46.8033,-71.1779\n\
         Saguenay,false,true,,\n",
    );
    write(
        root,
        "mrc.geojson",
        r#"{"type": "FeatureCollection", "features": [{
            "type": "Feature",
            "properties": {"ID": "23", "CDNAME": "Sud"},
            "geometry": {"type": "Polygon", "coordinates": [
                [[-74.0, 45.0], [-71.0, 45.0], [-71.0, 47.0], [-74.0, 47.0], [-74.0, 45.0]]
            ]}
        }]}"#,
    );
    let out = root.join("node_regions.csv");
    hq().args(["geo", "regions", "--nodes"])
        .arg(root.join("nodes.csv"))
        .arg("--regions")
        .arg(root.join("mrc.geojson"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "2 node(s) in 1 of 1 region(s), 0 outside every region, 1 without coordinates",
        ))
        .stdout(predicate::str::contains("START"));

    let csv = fs::read_to_string(&out).unwrap();
    assert!(csv.contains("Montreal,45.5017,-73.5673,true,false,23,Sud"));
    assert!(csv.contains("Levis,46.8033,-71.1779,false,true,23,Sud"));
}

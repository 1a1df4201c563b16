//! Analyses over the study time series: demand peaks, seasonal means,
//! production patterns and index consistency.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use hq_core::{GridError, Network, NetworkTimeSeries, TimeSeriesTable, NON_PILOTABLE_CARRIERS, PILOTABLE_CARRIERS};
use serde::Serialize;

/// Number of peaks returned by [`find_peak_demand`].
pub const PEAK_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakDemand {
    pub snapshot: NaiveDateTime,
    pub total_load_mw: f64,
}

/// The largest total loads, optionally within a `YYYY` or `YYYY-MM` period.
pub fn find_peak_demand(
    series: &NetworkTimeSeries,
    period: Option<&str>,
) -> Result<Vec<PeakDemand>, GridError> {
    let format = match period.map(str::len) {
        None => None,
        Some(4) => Some("%Y"),
        Some(7) => Some("%Y-%m"),
        Some(_) => {
            return Err(GridError::Parse(format!(
                "period '{}' must be YYYY or YYYY-MM",
                period.unwrap_or_default()
            )))
        }
    };

    let mut peaks: Vec<PeakDemand> = series
        .snapshots()
        .iter()
        .enumerate()
        .filter(|(_, t)| match (period, format) {
            (Some(p), Some(f)) => t.format(f).to_string() == p,
            _ => true,
        })
        .map(|(row, t)| PeakDemand {
            snapshot: *t,
            total_load_mw: series.total_load_at(row),
        })
        .collect();
    peaks.sort_by(|a, b| b.total_load_mw.total_cmp(&a.total_load_mw));
    peaks.truncate(PEAK_COUNT);
    Ok(peaks)
}

/// Calendar quarter (1-4) of a timestamp.
pub fn quarter(t: &NaiveDateTime) -> u32 {
    (t.month() - 1) / 3 + 1
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeasonalStats {
    pub quarter: u32,
    /// Mean load per load column (MW)
    pub load: BTreeMap<String, f64>,
    /// Mean availability (p_max_pu) of run-of-river, wind and solar units
    pub non_pilotable_availability: BTreeMap<String, f64>,
    /// Mean marginal cost of reservoir and thermal units
    pub pilotable_marginal_cost: BTreeMap<String, f64>,
}

fn generator_columns<'a>(network: &'a Network, carriers: &[&str]) -> Vec<&'a str> {
    network
        .generators()
        .into_iter()
        .filter(|g| carriers.contains(&g.carrier.as_str()))
        .map(|g| g.name.as_str())
        .collect()
}

/// Mean of each selected column per quarter, missing cells skipped.
fn quarter_means(table: &TimeSeriesTable, columns: &[&str]) -> BTreeMap<u32, BTreeMap<String, f64>> {
    let mut sums: BTreeMap<u32, BTreeMap<String, (f64, usize)>> = BTreeMap::new();
    for (row, t) in table.index.iter().enumerate() {
        let q = quarter(t);
        for column in columns {
            let Some(value) = table.value(row, column).filter(|v| v.is_finite()) else {
                continue;
            };
            let entry = sums
                .entry(q)
                .or_default()
                .entry((*column).to_string())
                .or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(q, cols)| {
            let means = cols
                .into_iter()
                .map(|(name, (sum, n))| (name, sum / n as f64))
                .collect();
            (q, means)
        })
        .collect()
}

/// Quarterly means of loads, non-pilotable availability and pilotable costs.
pub fn seasonal_stats(network: &Network, series: &NetworkTimeSeries) -> Vec<SeasonalStats> {
    let load_columns: Vec<&str> = series.loads_p_set.columns.iter().map(String::as_str).collect();
    let loads = quarter_means(&series.loads_p_set, &load_columns);
    let availability = quarter_means(
        &series.generators_p_max_pu,
        &generator_columns(network, NON_PILOTABLE_CARRIERS),
    );
    let costs = quarter_means(
        &series.generators_marginal_cost,
        &generator_columns(network, PILOTABLE_CARRIERS),
    );

    let quarters: BTreeSet<u32> = loads
        .keys()
        .chain(availability.keys())
        .chain(costs.keys())
        .copied()
        .collect();
    quarters
        .into_iter()
        .map(|q| SeasonalStats {
            quarter: q,
            load: loads.get(&q).cloned().unwrap_or_default(),
            non_pilotable_availability: availability.get(&q).cloned().unwrap_or_default(),
            pilotable_marginal_cost: costs.get(&q).cloned().unwrap_or_default(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionPattern {
    pub snapshot: NaiveDateTime,
    pub hour: u32,
    pub month: u32,
    /// Monday = 0
    pub weekday: u32,
    pub value: f64,
}

/// Row means of the production data of one carrier, with calendar fields.
///
/// Non-pilotable carriers read their availability (p_max_pu), the others
/// their marginal cost. Without a carrier both tables are combined.
/// Snapshots with no value at all are left out.
pub fn production_patterns(
    network: &Network,
    series: &NetworkTimeSeries,
    carrier: Option<&str>,
) -> Vec<ProductionPattern> {
    let sources: Vec<(&TimeSeriesTable, Vec<usize>)> = match carrier {
        Some(c) => {
            let table = if NON_PILOTABLE_CARRIERS.contains(&c) {
                &series.generators_p_max_pu
            } else {
                &series.generators_marginal_cost
            };
            let cols = generator_columns(network, &[c])
                .into_iter()
                .filter_map(|name| table.column_index(name))
                .collect();
            vec![(table, cols)]
        }
        None => [&series.generators_p_max_pu, &series.generators_marginal_cost]
            .into_iter()
            .map(|t| (t, (0..t.columns.len()).collect()))
            .collect(),
    };

    let timestamps: BTreeSet<NaiveDateTime> = sources
        .iter()
        .flat_map(|(table, _)| table.index.iter().copied())
        .collect();

    timestamps
        .into_iter()
        .filter_map(|t| {
            let values: Vec<f64> = sources
                .iter()
                .filter_map(|(table, cols)| Some((table.row(table.position(&t)?)?, cols)))
                .flat_map(|(row, cols)| cols.iter().map(move |&c| row[c]))
                .filter(|v| v.is_finite())
                .collect();
            if values.is_empty() {
                return None;
            }
            Some(ProductionPattern {
                snapshot: t,
                hour: t.hour(),
                month: t.month(),
                weekday: t.weekday().num_days_from_monday(),
                value: values.iter().sum::<f64>() / values.len() as f64,
            })
        })
        .collect()
}

/// True when the load, availability and cost tables share one set of
/// timestamps. Generator tables that were not provided are ignored.
pub fn check_temporal_consistency(series: &NetworkTimeSeries) -> bool {
    let loads: BTreeSet<&NaiveDateTime> = series.loads_p_set.index.iter().collect();
    [&series.generators_p_max_pu, &series.generators_marginal_cost]
        .into_iter()
        .filter(|table| !table.is_empty())
        .all(|table| table.index.iter().collect::<BTreeSet<_>>() == loads)
}

/// Spacing of the first two snapshots.
pub fn time_resolution(series: &NetworkTimeSeries) -> Option<Duration> {
    match series.snapshots() {
        [first, second, ..] => Some(*second - *first),
        _ => None,
    }
}

/// `"0 days 01:00:00"` style label, `"N/A"` when unknown.
pub fn format_resolution(resolution: Option<Duration>) -> String {
    let Some(d) = resolution else {
        return "N/A".to_string();
    };
    let total = d.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    let days = total / 86_400;
    let rem = total % 86_400;
    format!(
        "{sign}{days} days {:02}:{:02}:{:02}",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hq_core::{Bus, BusId, GenId, Generator};

    fn ts(month: u32, day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn network() -> Network {
        let mut net = Network::new();
        net.add_bus(Bus::new(BusId::new(0), "Montreal"));
        net.add_generator(
            Generator::new(GenId::new(0), "Eole", BusId::new(0)).with_carrier("eolien"),
        );
        net.add_generator(
            Generator::new(GenId::new(1), "Manic", BusId::new(0)).with_carrier("hydro_reservoir"),
        );
        net
    }

    fn series() -> NetworkTimeSeries {
        let stamps = [ts(1, 15, 8), ts(1, 15, 9), ts(2, 1, 18), ts(7, 3, 12)];
        let mut loads = TimeSeriesTable::new(vec!["Montreal".into(), "Quebec".into()]);
        let mut pmax = TimeSeriesTable::new(vec!["Eole".into()]);
        let mut cost = TimeSeriesTable::new(vec!["Manic".into()]);
        let load_rows = [[100.0, 50.0], [120.0, 70.0], [200.0, 90.0], [80.0, 20.0]];
        for (i, t) in stamps.iter().enumerate() {
            loads.push_row(*t, load_rows[i].to_vec()).unwrap();
            pmax.push_row(*t, vec![0.2 * (i + 1) as f64]).unwrap();
            cost.push_row(*t, vec![10.0 + i as f64]).unwrap();
        }
        NetworkTimeSeries {
            loads_p_set: loads,
            generators_marginal_cost: cost,
            generators_p_max_pu: pmax,
        }
    }

    #[test]
    fn peaks_are_sorted_and_filtered_by_period() {
        let s = series();
        let all = find_peak_demand(&s, None).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].snapshot, ts(2, 1, 18));
        assert_eq!(all[0].total_load_mw, 290.0);

        let january = find_peak_demand(&s, Some("2024-01")).unwrap();
        assert_eq!(january.len(), 2);
        assert_eq!(january[0].total_load_mw, 190.0);

        assert_eq!(find_peak_demand(&s, Some("2024")).unwrap().len(), 4);
        assert!(find_peak_demand(&s, Some("01/2024")).is_err());
    }

    #[test]
    fn seasonal_means_per_quarter() {
        let stats = seasonal_stats(&network(), &series());
        assert_eq!(stats.iter().map(|s| s.quarter).collect::<Vec<_>>(), vec![1, 3]);
        let q1 = &stats[0];
        assert!((q1.load["Montreal"] - 140.0).abs() < 1e-9);
        assert!((q1.non_pilotable_availability["Eole"] - 0.4).abs() < 1e-9);
        assert!((q1.pilotable_marginal_cost["Manic"] - 11.0).abs() < 1e-9);
        assert!(!q1.pilotable_marginal_cost.contains_key("Eole"));
    }

    #[test]
    fn production_patterns_pick_the_right_table() {
        let net = network();
        let s = series();
        let wind = production_patterns(&net, &s, Some("eolien"));
        assert_eq!(wind.len(), 4);
        assert!((wind[0].value - 0.2).abs() < 1e-9);
        assert_eq!((wind[0].hour, wind[0].month), (8, 1));
        // 2024-01-15 is a Monday
        assert_eq!(wind[0].weekday, 0);

        let hydro = production_patterns(&net, &s, Some("hydro_reservoir"));
        assert_eq!(hydro[3].value, 13.0);

        let both = production_patterns(&net, &s, None);
        assert!((both[0].value - (0.2 + 10.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn consistency_and_resolution() {
        let mut s = series();
        assert!(check_temporal_consistency(&s));
        assert_eq!(time_resolution(&s), Some(Duration::hours(1)));
        assert_eq!(format_resolution(time_resolution(&s)), "0 days 01:00:00");

        s.generators_marginal_cost = s.generators_marginal_cost.restrict(None, Some(ts(1, 31, 0)));
        assert!(!check_temporal_consistency(&s));

        let empty = NetworkTimeSeries::default();
        assert_eq!(format_resolution(time_resolution(&empty)), "N/A");
    }
}

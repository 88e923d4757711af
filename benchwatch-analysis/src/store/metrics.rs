//! Sidecar metric files and derived metrics.
//!
//! A metrics file is a CSV whose header row names each column as
//! `<metric> (<unit>)`; the `time` column carries sample timestamps and
//! every other column becomes one [`Metric`]. Power and energy convert
//! into each other, and a performance-per-watt efficiency series is
//! synthesized when a throughput result coexists with a power metric.

use std::path::Path;

use regex::Regex;
use tracing::warn;

use crate::report::{BenchResult, Metric};

fn column_regex() -> Regex {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^(?P<name>.+?) \((?P<unit>.+)\)$").unwrap()
}

/// Parse one metrics CSV into its component time-series.
/// Files without a `time` column are rejected; rows with malformed cells
/// are logged and dropped whole, keeping all series the same length.
pub fn parse_metrics_file(path: &Path, contents: &str) -> Vec<Metric> {
    let mut lines = contents.lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };

    let regex = column_regex();
    let mut names: Vec<(String, String)> = Vec::new();
    for column in header.split(',') {
        let column = column.trim();
        match regex.captures(column) {
            Some(caps) => names.push((caps["name"].to_string(), caps["unit"].to_string())),
            None => names.push((column.to_string(), String::new())),
        }
    }

    let Some(time_col) = names.iter().position(|(name, _)| name == "time") else {
        warn!(file = %path.display(), "metrics file has no time column");
        return Vec::new();
    };

    let mut metrics: Vec<Metric> = names
        .iter()
        .map(|(name, unit)| Metric {
            name: name.clone(),
            unit: unit.clone(),
            times: Vec::new(),
            values: Vec::new(),
        })
        .collect();

    'row: for (line_no, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut row = Vec::with_capacity(names.len());
        for cell in line.split(',') {
            match cell.trim().parse::<f64>() {
                Ok(v) => row.push(v),
                Err(_) => {
                    warn!(
                        file = %path.display(),
                        line = line_no + 2,
                        "dropping metrics row with malformed cell"
                    );
                    continue 'row;
                }
            }
        }
        if row.len() != names.len() {
            warn!(
                file = %path.display(),
                line = line_no + 2,
                "dropping metrics row with wrong column count"
            );
            continue;
        }
        let time = row[time_col];
        for (idx, value) in row.into_iter().enumerate() {
            metrics[idx].times.push(time);
            metrics[idx].values.push(value);
        }
    }

    metrics.remove(time_col);
    metrics.retain(|m| !m.values.is_empty());
    metrics
}

/// Synthesize the metrics a result implies but the runner never wrote.
///
/// A power series (W) gains a matching total-energy scalar series (J);
/// an energy series (J) gains an average-power one (W). When the result
/// has throughput samples and an average power is known, an efficiency
/// metric in `<unit>/W` is added.
pub fn add_derived_metrics(result: &mut BenchResult) {
    let mut derived: Vec<Metric> = Vec::new();

    for metric in result.metrics.values() {
        match metric.unit.as_str() {
            "W" => {
                let duration = metric.duration();
                if duration > 0.0 {
                    derived.push(Metric {
                        name: format!("{}:energy", metric.name),
                        unit: "J".to_string(),
                        times: vec![*metric.times.last().unwrap_or(&0.0)],
                        values: vec![metric.average() * duration],
                    });
                }
            }
            "J" => {
                let duration = metric.duration();
                if duration > 0.0 {
                    derived.push(Metric {
                        name: format!("{}:power", metric.name),
                        unit: "W".to_string(),
                        times: vec![*metric.times.last().unwrap_or(&0.0)],
                        values: vec![metric.values.iter().sum::<f64>() / duration],
                    });
                }
            }
            _ => {}
        }
    }

    let avg_power = result
        .metrics
        .values()
        .chain(derived.iter())
        .find(|m| m.unit == "W")
        .map(Metric::average);
    if let Some(power) = avg_power {
        if power > 0.0 && !result.data.is_empty() {
            let mean = result.data.iter().sum::<f64>() / result.data.len() as f64;
            derived.push(Metric {
                name: "efficiency".to_string(),
                unit: format!("{}/W", result.unit_str),
                times: Vec::new(),
                values: vec![mean / power],
            });
        }
    }

    for metric in derived {
        result.metrics.entry(metric.name.clone()).or_insert(metric);
    }
}

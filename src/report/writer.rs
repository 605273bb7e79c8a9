use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use serde::Serialize;

use crate::engine::pipeline::Analysis;
use crate::error::{ClusterError, Result};
use crate::types::{ClusterAssignment, CorrelationMatrix};

#[derive(Serialize)]
struct AssignmentRow<'a> {
    #[serde(rename = "Coin")]
    coin: &'a str,
    #[serde(rename = "Cluster")]
    cluster: usize,
}

/// `Coin,Cluster` rows sorted by cluster label.
pub fn write_assignments(path: &Path, assignment: &ClusterAssignment) -> Result<()> {
    let file = File::create(path).map_err(|e| ClusterError::io(path, e))?;
    let mut w = csv::Writer::from_writer(file);
    for (coin, cluster) in assignment.sorted_by_cluster() {
        w.serialize(AssignmentRow { coin, cluster })
            .map_err(|e| ClusterError::csv(path, e))?;
    }
    w.flush().map_err(|e| ClusterError::io(path, e))?;
    Ok(())
}

/// Square CSV: blank corner cell, asset names across and down.
pub fn write_correlation(path: &Path, corr: &CorrelationMatrix) -> Result<()> {
    let file = File::create(path).map_err(|e| ClusterError::io(path, e))?;
    let mut w = csv::Writer::from_writer(file);

    let mut header = vec![String::new()];
    header.extend(corr.assets.iter().cloned());
    w.write_record(&header)
        .map_err(|e| ClusterError::csv(path, e))?;

    for (i, asset) in corr.assets.iter().enumerate() {
        let mut record = vec![asset.clone()];
        record.extend(corr.values.row(i).iter().map(|v| v.to_string()));
        w.write_record(&record)
            .map_err(|e| ClusterError::csv(path, e))?;
    }
    w.flush().map_err(|e| ClusterError::io(path, e))?;
    Ok(())
}

// ─── JSON summary ───

#[derive(Serialize)]
struct ClusterSummary<'a> {
    label: usize,
    members: Vec<&'a str>,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    assets: &'a [String],
    aligned_rows: usize,
    first_ts_ms: Option<i64>,
    last_ts_ms: Option<i64>,
    n_clusters: usize,
    seed: u64,
    n_init: usize,
    inertia: f64,
    steps: usize,
    clusters: Vec<ClusterSummary<'a>>,
    correlation: Vec<Vec<f64>>,
}

/// Pretty JSON: inputs, parameters, fit quality, cluster members and the correlation matrix.
pub fn write_summary(path: &Path, analysis: &Analysis) -> Result<()> {
    let p = &analysis.params;
    let clusters = analysis
        .assignment
        .members(p.n_clusters)
        .into_iter()
        .enumerate()
        .map(|(label, members)| ClusterSummary { label, members })
        .collect();
    let summary = RunSummary {
        assets: &analysis.correlation.assets,
        aligned_rows: analysis.aligned.timestamps.len(),
        first_ts_ms: analysis.aligned.timestamps.first().copied(),
        last_ts_ms: analysis.aligned.timestamps.last().copied(),
        n_clusters: p.n_clusters,
        seed: p.seed,
        n_init: p.n_init,
        inertia: analysis.inertia,
        steps: analysis.n_steps,
        clusters,
        correlation: analysis
            .correlation
            .values
            .outer_iter()
            .map(|r| r.to_vec())
            .collect(),
    };
    let file = File::create(path).map_err(|e| ClusterError::io(path, e))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, &summary).map_err(|e| ClusterError::json(path, e))?;
    w.flush().map_err(|e| ClusterError::io(path, e))?;
    Ok(())
}

// ─── Console tables ───

fn name_width(assets: &[String], min: usize) -> usize {
    assets.iter().map(|a| a.len()).max().unwrap_or(0).max(min)
}

pub fn format_correlation_table(corr: &CorrelationMatrix) -> String {
    let w = name_width(&corr.assets, 6);
    let mut out = String::new();
    let _ = write!(out, "{:w$}", "", w = w);
    for a in &corr.assets {
        let _ = write!(out, " {:>w$}", a, w = w);
    }
    out.push('\n');
    for (i, a) in corr.assets.iter().enumerate() {
        let _ = write!(out, "{:w$}", a, w = w);
        for v in corr.values.row(i) {
            let _ = write!(out, " {:>w$.4}", v, w = w);
        }
        out.push('\n');
    }
    out
}

pub fn format_assignment_table(assignment: &ClusterAssignment) -> String {
    let w = name_width(&assignment.assets, 4);
    let mut out = format!("{:>3}  {:w$}  {}\n", "", "Coin", "Cluster", w = w);
    for (i, (coin, cluster)) in assignment.sorted_by_cluster().into_iter().enumerate() {
        let _ = writeln!(out, "{:>3}  {:w$}  {:>7}", i, coin, cluster, w = w);
    }
    out
}

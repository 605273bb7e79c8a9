use std::fs;
use std::path::Path;

use chrono::{Duration, NaiveDate};

use cryptocluster::report::writer::write_assignments;
use cryptocluster::{run, ClusterError, Config};

/// Write `{symbol}_15m.csv` with one 15-minute bar per close, starting at `start_bar`.
fn write_asset(dir: &Path, symbol: &str, start_bar: i64, closes: &[f64]) {
    let t0 = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut body = String::from("timestamp,open,high,low,close,volume\n");
    for (i, c) in closes.iter().enumerate() {
        let ts = t0 + Duration::minutes(15 * (start_bar + i as i64));
        body.push_str(&format!(
            "{},{c},{c},{c},{c},1000\n",
            ts.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    fs::write(dir.join(format!("{}_15m.csv", symbol)), body).unwrap();
}

/// Closes whose log returns are `scale * returns[t]`.
fn closes(returns: &[f64], scale: f64) -> Vec<f64> {
    let mut c = vec![100.0];
    for r in returns {
        let last = *c.last().unwrap();
        c.push(last * (scale * r).exp());
    }
    c
}

const P: [f64; 12] = [0.01, -0.02, 0.015, 0.005, -0.01, 0.02, -0.005, 0.0, 0.012, -0.018, 0.004, -0.003];
const Q: [f64; 12] = [-0.01, 0.01, 0.02, -0.02, 0.005, -0.004, 0.01, -0.015, 0.0, 0.007, -0.006, 0.011];
const R: [f64; 12] = [0.003, 0.003, -0.02, -0.01, 0.02, 0.01, 0.0, 0.01, -0.02, 0.004, 0.009, -0.012];

/// A == B == 2*C in log-return space, plus two other independent groups.
fn market(dir: &Path) {
    write_asset(dir, "A", 0, &closes(&P, 2.0));
    write_asset(dir, "B", 0, &closes(&P, 2.0));
    write_asset(dir, "C", 0, &closes(&P, 1.0));
    write_asset(dir, "D", 0, &closes(&Q, 1.0));
    write_asset(dir, "E", 0, &closes(&Q, 0.7));
    write_asset(dir, "F", 0, &closes(&R, 1.0));
    write_asset(dir, "G", 0, &closes(&R, 1.3));
}

/// Scenario: A, B, C have perfectly correlated log returns (A == B == 2*C).
/// Expected: All three land in the same cluster.
#[test]
fn perfectly_correlated_assets_share_a_cluster() {
    let dir = tempfile::tempdir().unwrap();
    market(dir.path());

    let analysis = run(&Config::for_dir(dir.path())).unwrap();
    let a = &analysis.assignment;
    assert_eq!(a.label_of("A"), a.label_of("B"));
    assert_eq!(a.label_of("A"), a.label_of("C"));
    assert_eq!(a.label_of("D"), a.label_of("E"));
    assert_eq!(a.label_of("F"), a.label_of("G"));
    assert_ne!(a.label_of("A"), a.label_of("D"));
    assert_ne!(a.label_of("A"), a.label_of("F"));
}

#[test]
fn every_asset_labelled_once_within_range() {
    let dir = tempfile::tempdir().unwrap();
    market(dir.path());

    let config = Config::for_dir(dir.path());
    let analysis = run(&config).unwrap();
    let a = &analysis.assignment;
    assert_eq!(a.assets, vec!["A", "B", "C", "D", "E", "F", "G"]);
    assert_eq!(a.labels.len(), 7);
    assert!(a.labels.iter().all(|&l| l < config.clustering.n_clusters));

    // 13 bars per asset → 12 returns, all timestamps shared
    assert_eq!(analysis.aligned.shape(), (12, 7));
}

#[test]
fn correlation_matrix_properties() {
    let dir = tempfile::tempdir().unwrap();
    market(dir.path());

    let analysis = run(&Config::for_dir(dir.path())).unwrap();
    let c = &analysis.correlation;
    for i in 0..c.n_assets() {
        assert_eq!(c.get(i, i), 1.0);
        for j in 0..c.n_assets() {
            assert_eq!(c.get(i, j), c.get(j, i));
            assert!((-1.0..=1.0).contains(&c.get(i, j)));
            assert_eq!(analysis.distance.values[[i, j]], 1.0 - c.get(i, j));
        }
    }
    assert!((c.get(0, 2) - 1.0).abs() < 1e-9, "corr(A, C) = {}", c.get(0, 2));
}

#[test]
fn same_seed_same_assignment() {
    let dir = tempfile::tempdir().unwrap();
    market(dir.path());

    let config = Config::for_dir(dir.path());
    let first = run(&config).unwrap();
    let second = run(&config).unwrap();
    assert_eq!(first.assignment, second.assignment);

    let out = tempfile::tempdir().unwrap();
    let p1 = out.path().join("one.csv");
    let p2 = out.path().join("two.csv");
    write_assignments(&p1, &first.assignment).unwrap();
    write_assignments(&p2, &second.assignment).unwrap();
    assert_eq!(fs::read(&p1).unwrap(), fs::read(&p2).unwrap());
}

#[test]
fn assignment_file_sorted_by_cluster() {
    let dir = tempfile::tempdir().unwrap();
    market(dir.path());

    let config = Config::for_dir(dir.path());
    let analysis = run(&config).unwrap();
    let out = config.output_path();
    write_assignments(&out, &analysis.assignment).unwrap();

    let mut rdr = csv::Reader::from_path(&out).unwrap();
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, vec!["Coin", "Cluster"]);
    let rows: Vec<(String, usize)> = rdr
        .records()
        .map(|r| {
            let r = r.unwrap();
            (r[0].to_string(), r[1].parse().unwrap())
        })
        .collect();
    assert_eq!(rows.len(), 7);
    assert!(rows.windows(2).all(|w| w[0].1 <= w[1].1));
    let mut coins: Vec<&str> = rows.iter().map(|(c, _)| c.as_str()).collect();
    coins.sort();
    coins.dedup();
    assert_eq!(coins.len(), 7);
}

/// Scenario: One asset file has no `close` column.
/// Expected: The loader fails with an error naming that file.
#[test]
fn missing_close_column_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    market(dir.path());
    fs::write(
        dir.path().join("BAD_15m.csv"),
        "timestamp,open\n2024-03-01 00:00:00,1.0\n",
    )
    .unwrap();

    let err = run(&Config::for_dir(dir.path())).unwrap_err();
    match &err {
        ClusterError::MissingColumn { path, column } => {
            assert_eq!(*column, "close");
            assert!(path.ends_with("BAD_15m.csv"));
        }
        other => panic!("expected MissingColumn, got {:?}", other),
    }
    assert!(err.to_string().contains("BAD_15m.csv"));
}

/// Scenario: Two assets whose bars never share a timestamp.
/// Expected: Alignment fails fast instead of handing an empty matrix onward.
#[test]
fn disjoint_timestamps_fail_in_aligner() {
    let dir = tempfile::tempdir().unwrap();
    write_asset(dir.path(), "EARLY", 0, &closes(&P, 1.0));
    write_asset(dir.path(), "LATE", 100, &closes(&Q, 1.0));

    match run(&Config::for_dir(dir.path())) {
        Err(ClusterError::EmptyAlignment { assets }) => {
            assert_eq!(assets, vec!["EARLY", "LATE"]);
        }
        other => panic!("expected EmptyAlignment, got {:?}", other.map(|a| a.assignment)),
    }
}

#[test]
fn empty_directory_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("README.txt"), "not data").unwrap();
    assert!(matches!(
        run(&Config::for_dir(dir.path())),
        Err(ClusterError::NoInputFiles { .. })
    ));
}

#[test]
fn constant_price_asset_flagged() {
    let dir = tempfile::tempdir().unwrap();
    market(dir.path());
    write_asset(dir.path(), "STABLE", 0, &[1.0; 13]);

    match run(&Config::for_dir(dir.path())) {
        Err(ClusterError::DegenerateSeries { asset }) => assert_eq!(asset, "STABLE"),
        other => panic!("expected DegenerateSeries, got {:?}", other.map(|a| a.assignment)),
    }
}

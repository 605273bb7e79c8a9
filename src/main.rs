use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cryptocluster::config::{Args, Config};
use cryptocluster::report::heatmap;
use cryptocluster::report::writer::{
    format_assignment_table, format_correlation_table, write_assignments, write_correlation,
    write_summary,
};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from(Args::parse());
    let params = &config.clustering;
    info!(
        dir = %config.data_dir.display(),
        suffix = %config.file_suffix,
        clusters = params.n_clusters,
        seed = params.seed,
        n_init = params.n_init,
        "starting"
    );

    let analysis = cryptocluster::run(&config)
        .with_context(|| format!("analysis of {} failed", config.data_dir.display()))?;

    let (rows, cols) = analysis.aligned.shape();
    println!("Returns dataframe shape: ({}, {})", rows, cols);
    println!("\nCorrelation Matrix:\n{}", format_correlation_table(&analysis.correlation));
    println!("Cluster Assignments:\n{}", format_assignment_table(&analysis.assignment));

    let out = config.output_path();
    write_assignments(&out, &analysis.assignment)
        .with_context(|| format!("writing {}", out.display()))?;
    println!("Cluster assignments saved to: {}", out.display());

    if let Some(path) = &config.correlation_output {
        write_correlation(path, &analysis.correlation)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("correlation matrix saved to {}", path.display());
    }
    if let Some(path) = &config.summary_output {
        write_summary(path, &analysis).with_context(|| format!("writing {}", path.display()))?;
        info!("run summary saved to {}", path.display());
    }

    if config.show_heatmap {
        heatmap::show(&analysis.correlation).context("heatmap display failed")?;
    }
    Ok(())
}

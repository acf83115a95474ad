//! Datasource Settings - Main entry point.
//!
//! Binds datasource properties from the command line and environment,
//! resolves the effective settings of every datasource and prints them.

use clap::Parser;
use datasource_settings::config::Config;
use datasource_settings::db::DatasourcePools;
use datasource_settings::models::DatasourceSummary;
use datasource_settings::resolver::{CompiledDrivers, SettingsResolver};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Logs go to stderr so that stdout carries only the settings output
    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn print_summary(summary: &DatasourceSummary) {
    println!("{}", summary.name);
    println!("  driver:           {}", summary.driver_class_name);
    println!("  url:              {}", summary.url);
    println!("  username:         {}", summary.username);
    println!("  validation query: {}", summary.validation_query);
    if let Some(jndi_name) = &summary.jndi_name {
        println!("  jndi name:        {}", jndi_name);
    }
    for (key, value) in &summary.pool_properties {
        println!("  pool.{key}: {value}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        drivers = ?CompiledDrivers::names(),
        "Starting datasource-settings v{}",
        env!("CARGO_PKG_VERSION")
    );

    let resolver = SettingsResolver::default();
    let datasources = match config.bind_datasources(&resolver) {
        Ok(datasources) => datasources,
        Err(e) => {
            error!(error = %e, "Failed to configure datasources");
            return Err(e.into());
        }
    };

    let summaries: Vec<DatasourceSummary> = datasources.iter().map(|ds| ds.summary()).collect();
    if config.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            print_summary(summary);
        }
    }

    if config.build_pools {
        let pools = DatasourcePools::create(&datasources)?;
        info!(count = pools.len(), "Pools created");
        pools.close_all().await;
    }

    Ok(())
}

mod catalog;
mod config;
mod predict;
mod visibility;
mod web;

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;

use crate::config::Config;
use crate::predict::Coordinate;
use crate::visibility::{RangeQuery, VisibilityService};

#[derive(Parser)]
#[command(name = "gnss-overhead")]
#[command(about = "Navigation satellites passing near a ground reference point")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the visibility API
    Serve {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Compute visibility once and print it as JSON
    Scan {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
        /// Override the reference latitude (degrees)
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Override the reference longitude (degrees)
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Override the search radius (km)
        #[arg(long)]
        radius_km: Option<f64>,
    },
    /// Make sure today's element-set catalog is on disk
    Fetch {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(&config),
        Commands::Scan {
            config,
            lat,
            lon,
            radius_km,
        } => scan(&config, lat.zip(lon), radius_km),
        Commands::Fetch { config } => fetch(&config),
    }
}

fn load_service(path: &str) -> Option<(Config, VisibilityService)> {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config {}: {}", path, e);
            return None;
        }
    };

    match VisibilityService::from_config(&config) {
        Ok(service) => Some((config, service)),
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            None
        }
    }
}

fn serve(path: &str) -> ExitCode {
    let Some((config, service)) = load_service(path) else {
        return ExitCode::FAILURE;
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(web::run_server(config.web.clone(), Arc::new(service))) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn scan(path: &str, reference: Option<(f64, f64)>, radius_km: Option<f64>) -> ExitCode {
    let Some((_, service)) = load_service(path) else {
        return ExitCode::FAILURE;
    };

    let query = match scan_query(service.default_query(), reference, radius_km) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("Invalid scan parameters: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let visibility = match service.visibility(&query, Utc::now()) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Visibility scan failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&visibility) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to encode result: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn scan_query(
    default: RangeQuery,
    reference: Option<(f64, f64)>,
    radius_km: Option<f64>,
) -> Result<RangeQuery, String> {
    let query = RangeQuery {
        reference: reference
            .map(|(lat, lon)| Coordinate::new(lat, lon))
            .unwrap_or(default.reference),
        radius_km: radius_km.unwrap_or(default.radius_km),
    };
    query.validate()?;
    Ok(query)
}

fn fetch(path: &str) -> ExitCode {
    let Some((_, service)) = load_service(path) else {
        return ExitCode::FAILURE;
    };

    match service.element_sets(Utc::now()) {
        Ok(sets) => {
            println!("Catalog ready ({} satellites)", sets.len());
            for set in &sets {
                println!("  {} (NORAD {})", set.name, set.norad_id);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Catalog fetch failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

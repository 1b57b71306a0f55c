//! CLI argument parsing and command dispatch for the osrm-pipeline binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::defaults::{
    DEFAULT_DEPOT_ID_COLUMN, DEFAULT_LATITUDE_COLUMN, DEFAULT_LONGITUDE_COLUMN, DEFAULT_ROUTE_ID_COLUMN,
    DEFAULT_SLOW_DOWN, DEFAULT_VEHICLE_TYPE_COLUMN,
};
use crate::io::{read_stops_file, write_csv, write_feature_collection, write_file, write_json, StopColumns};
use crate::services::osrm::{
    get_time_dist_matrix, interstop_time_distance, OsrmTransport, RouteGenerator, TableOptions, TspSequencer,
};
use crate::types::{Diagnostic, TspRoutes};

pub const TRAVEL_LEG_INFO_FILE: &str = "travel_leg_info.geojson";
pub const STOP_SEQUENCE_INFO_FILE: &str = "stop_sequence_info.csv";
pub const ROUTE_SUMMARY_FILE: &str = "route_summary.geojson";

#[derive(Parser)]
#[command(name = "osrm-pipeline", about = "Route tables and TSP sequencing on OSRM")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub columns: ColumnArgs,
}

/// Names of the stop table columns
#[derive(Args, Debug, Clone)]
pub struct ColumnArgs {
    #[arg(long, global = true, default_value = DEFAULT_LONGITUDE_COLUMN)]
    pub lon_col: String,
    #[arg(long, global = true, default_value = DEFAULT_LATITUDE_COLUMN)]
    pub lat_col: String,
    #[arg(long, global = true, default_value = DEFAULT_ROUTE_ID_COLUMN)]
    pub route_id_col: String,
    #[arg(long, global = true, default_value = DEFAULT_VEHICLE_TYPE_COLUMN)]
    pub vehicle_type_col: String,
    #[arg(long, global = true, default_value = DEFAULT_DEPOT_ID_COLUMN)]
    pub depot_id_col: String,
}

impl From<&ColumnArgs> for StopColumns {
    fn from(args: &ColumnArgs) -> Self {
        StopColumns {
            longitude: args.lon_col.clone(),
            latitude: args.lat_col.clone(),
            route_id: args.route_id_col.clone(),
            vehicle_type: args.vehicle_type_col.clone(),
            depot_id: args.depot_id_col.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Time and distance matrices between all stops
    Table {
        #[arg(long)]
        stops: PathBuf,
        /// OSRM base URL (defaults to OSRM_URL, then the public server)
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        timeout_seconds: Option<u64>,
        /// Duration multiplier
        #[arg(long, default_value_t = DEFAULT_SLOW_DOWN)]
        slow_down: f64,
        #[arg(long)]
        output: PathBuf,
    },
    /// Leg, stop-sequence and summary tables for every route
    Routes {
        #[arg(long)]
        stops: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
    },
    /// Sequence every route from its depot and back
    Tsp {
        #[arg(long)]
        stops: PathBuf,
        #[arg(long)]
        depots: PathBuf,
        /// Sequence only this route
        #[arg(long)]
        route_id: Option<String>,
        #[arg(long)]
        stops_limit: Option<usize>,
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct TableOutput<'a> {
    time_matrix: &'a [Vec<f64>],
    distance_matrix: &'a [Vec<f64>],
    stepwise_time: Vec<f64>,
    stepwise_distance: Vec<f64>,
}

/// Run a parsed command against `transport`
pub async fn run(cli: Cli, config: &Config, transport: Arc<dyn OsrmTransport>) -> Result<()> {
    let columns = StopColumns::from(&cli.columns);

    match cli.command {
        Command::Table {
            stops,
            endpoint,
            timeout_seconds,
            slow_down,
            output,
        } => {
            let stops = read_stops_file(&stops, &columns)?;
            let options = TableOptions {
                endpoint: endpoint.or_else(|| config.osrm_url.clone()),
                timeout: timeout_seconds
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| config.table_timeout()),
                slow_down,
                public_stop_limit: config.public_stop_limit,
            };
            info!("Requesting {}x{} table", stops.len(), stops.len());

            let matrices = get_time_dist_matrix(transport.as_ref(), &stops, &options).await?;
            let (stepwise_time, stepwise_distance) = interstop_time_distance(&matrices);
            let table = TableOutput {
                time_matrix: &matrices.time_matrix,
                distance_matrix: &matrices.distance_matrix,
                stepwise_time,
                stepwise_distance,
            };
            write_file(&output, |w| write_json(w, &table))?;
            info!("Matrices written to {}", output.display());
        }
        Command::Routes { stops, output_dir } => {
            let stops = read_stops_file(&stops, &columns)?;
            let generator = RouteGenerator::new(transport, config.port_mapping())
                .with_timeout(config.request_timeout())
                .with_max_concurrent_requests(config.max_concurrent_requests);

            let info = generator.return_route_osrm_info(&stops).await?;
            write_file(&output_dir.join(TRAVEL_LEG_INFO_FILE), |w| {
                write_feature_collection(w, &info.travel_leg_info)
            })?;
            write_file(&output_dir.join(STOP_SEQUENCE_INFO_FILE), |w| {
                write_csv(w, &info.stop_sequence_info)
            })?;
            write_file(&output_dir.join(ROUTE_SUMMARY_FILE), |w| {
                write_feature_collection(w, &info.route_summary)
            })?;
            report(&info.diagnostics);
            info!(
                "{} routes written to {}",
                info.route_summary.len(),
                output_dir.display()
            );
        }
        Command::Tsp {
            stops,
            depots,
            route_id,
            stops_limit,
            output,
        } => {
            let stops = read_stops_file(&stops, &columns)?;
            let depots = read_stops_file(&depots, &columns)?;
            let sequencer = TspSequencer::new(transport, stops.clone(), depots)
                .with_base_url(config.base_url())
                .with_stops_limit(stops_limit.unwrap_or(config.tsp_stop_limit))
                .with_timeout(config.request_timeout())
                .with_max_concurrent_requests(config.max_concurrent_requests);

            let routes = match route_id {
                Some(id) => {
                    let route = sequencer.generate_tsp_route(&stops, Some(&id)).await?;
                    TspRoutes {
                        stops: route.stops,
                        diagnostics: route.diagnostics.into_vec(),
                    }
                }
                None => sequencer.generate_all_tsp_routes().await?,
            };
            write_tsp(&output, &routes)?;
        }
    }

    Ok(())
}

fn write_tsp(output: &Path, routes: &TspRoutes) -> Result<()> {
    write_file(output, |w| write_feature_collection(w, &routes.stops))?;
    report(&routes.diagnostics);
    info!("{} sequenced stops written to {}", routes.stops.len(), output.display());
    Ok(())
}

fn report(diagnostics: &[Diagnostic]) {
    if !diagnostics.is_empty() {
        warn!("Finished with {} diagnostics", diagnostics.len());
    }
}

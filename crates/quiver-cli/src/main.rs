//! Quiver command-line interface.
//!
//! Generate VTK animations of a solver's surface wavefield:
//! ```sh
//! quiver render -i axisem3d_surface.nc -o frames -s 100 -t 0 -d 20 -n 50 -p 4 -v
//! quiver run job.toml
//! quiver validate job.toml
//! quiver info axisem3d_surface.nc
//! ```
//! Open the resulting `surface_vtk_point.*.vtk` series in ParaView.

mod config;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use quiver_core::types::{AnimationConfig, SamplingParams, TimeWindow};
use quiver_io::vtk::VtkEncoding;

use crate::runner::RenderJob;

#[derive(Parser)]
#[command(name = "quiver")]
#[command(about = "Quiver: VTK animations of surface wavefield databases")]
#[command(version)]
struct Cli {
    /// Report progress and stage timings.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an animation from command-line options.
    Render {
        /// Surface database (NetCDF file or bundle directory).
        #[arg(short, long)]
        input: PathBuf,
        /// Directory to store the VTK files.
        #[arg(short, long)]
        output: PathBuf,
        /// Spatial sampling on the surface (km).
        #[arg(short = 's', long = "spatial-sampling")]
        spacing_km: f64,
        /// Minimum distance (deg).
        #[arg(short = 'm', long, default_value_t = 0.0)]
        min_dist: f64,
        /// Maximum distance (deg).
        #[arg(short = 'M', long, default_value_t = 180.0)]
        max_dist: f64,
        /// Start time of the animation (s).
        #[arg(short = 't', long, allow_negative_numbers = true)]
        tstart: f64,
        /// Time interval between snapshots (s).
        #[arg(short = 'd', long)]
        time_interval: f64,
        /// Number of snapshots.
        #[arg(short = 'n', long)]
        nsnapshots: usize,
        /// Number of parallel workers.
        #[arg(short = 'p', long, default_value_t = 1)]
        nproc: usize,
        /// Write ASCII instead of binary VTK.
        #[arg(long)]
        ascii: bool,
        /// Skip writing animation.json.
        #[arg(long)]
        no_manifest: bool,
    },
    /// Render an animation described by a TOML job file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a job file against its database without rendering.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// Print the global parameters of a surface database.
    Info {
        /// Surface database (NetCDF file or bundle directory).
        database: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Commands::Render {
            input,
            output,
            spacing_km,
            min_dist,
            max_dist,
            tstart,
            time_interval,
            nsnapshots,
            nproc,
            ascii,
            no_manifest,
        } => {
            let job = RenderJob {
                database: input,
                output,
                animation: AnimationConfig {
                    sampling: SamplingParams {
                        min_dist_deg: min_dist,
                        max_dist_deg: max_dist,
                        spacing: spacing_km * 1e3,
                    },
                    window: TimeWindow {
                        start_time: tstart,
                        interval: time_interval,
                        snapshots: nsnapshots,
                    },
                    workers: nproc.max(1),
                },
                encoding: if ascii { VtkEncoding::Ascii } else { VtkEncoding::Binary },
                manifest: !no_manifest,
                backend: "auto".into(),
            };
            render(&job)
        }
        Commands::Run { config, output } => {
            let job_config = config::load_config(&config)?;
            log::info!("Configuration: {}", config.display());
            let job = RenderJob {
                animation: job_config.animation(),
                database: job_config.input.database,
                output: output.unwrap_or(job_config.output.directory),
                encoding: job_config.output.encoding,
                manifest: job_config.output.manifest,
                backend: job_config.compute.backend,
            };
            render(&job)
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let setup = runner::run_validate(&job.input.database, &job.animation())?;
            println!("Configuration is valid: {}", config.display());
            println!("  Distances:  {}", setup.sampling.distance_count());
            println!("  Points:     {}", setup.sampling.station_count());
            println!("  Snapshots:  {}", setup.plan.len());
            Ok(())
        }
        Commands::Info { database } => {
            let params = runner::run_info(&database)?;
            println!("Surface database: {}", database.display());
            println!("  Outer radius:       {} m", params.outer_radius);
            println!(
                "  Source:             lat {} deg, lon {} deg, depth {} m",
                params.source.latitude, params.source.longitude, params.source.depth
            );
            println!(
                "  Flattening:         source {}, surface {}",
                params.source.flattening, params.source.surface_flattening
            );
            println!("  Elements:           {}", params.element_count());
            println!("  Nodes per edge:     {}", params.nodes_per_edge());
            println!(
                "  Time steps:         {} (t0 = {} s, dt = {} s)",
                params.time.step_count, params.time.initial_time, params.time.interval
            );
            Ok(())
        }
    }
}

fn render(job: &RenderJob) -> anyhow::Result<()> {
    let summary = runner::run_render(job)?;
    println!(
        "Wrote {} frames to {} ({} workers, {:.3} s)",
        summary.frames,
        job.output.display(),
        summary.workers,
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}

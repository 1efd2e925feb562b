use clap::{Parser, Subcommand};
use std::process::ExitCode;

use nav_o_mat::config::Config;
use nav_o_mat::replay::{self, DistanceFilter, ReplayStep};
use nav_o_mat::route::RouteModel;
use nav_o_mat::session::{NavigationSession, SessionUpdate};
use nav_o_mat::tracker::StartMode;
use nav_o_mat::web;

#[derive(Parser)]
#[command(name = "nav-o-mat")]
#[command(about = "Live route progress tracking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the navigation HTTP service
    Serve {
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Validate a route file and print its baseline
    Validate { route: String },
    /// Replay a recorded track against a route
    Replay {
        route: String,
        track: String,
        #[arg(short, long)]
        config: Option<String>,
        /// Stay in preview for this many delivered samples
        #[arg(long)]
        preview_until: Option<usize>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(config.as_deref()),
        Commands::Validate { route } => validate(&route),
        Commands::Replay {
            route,
            track,
            config,
            preview_until,
        } => run_replay(&route, &track, config.as_deref(), preview_until),
    }
}

fn load_config(path: Option<&str>) -> Result<Config, ExitCode> {
    match path {
        Some(path) => Config::from_file(path).map_err(|e| {
            eprintln!("Config error: {}", e);
            ExitCode::FAILURE
        }),
        None => Ok(Config::default()),
    }
}

fn serve(config_path: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(web::run_server(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn validate(path: &str) -> ExitCode {
    let route = match replay::load_route(path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error reading route: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match RouteModel::build(route) {
        Ok(model) => {
            println!("Route is valid ({} waypoints)", model.waypoints().len());
            println!("  distance: {:.2} km", model.total_route_km());
            match model.baseline_minutes() {
                Some(minutes) => println!("  baseline duration: {} min", minutes),
                None => println!("  baseline duration: unknown"),
            }
            println!(
                "  baseline speed: {:.1} km/h",
                model.baseline_average_speed_kmh()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_replay(
    route_path: &str,
    track_path: &str,
    config_path: Option<&str>,
    preview_until: Option<usize>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let options = match config.session_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let (route, samples) = match (replay::load_route(route_path), replay::load_track(track_path)) {
        (Ok(r), Ok(s)) => (r, s),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error reading input: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let start = StartMode::from_preview(preview_until.is_some_and(|n| n > 0));
    let mut session = match NavigationSession::open(route, start, &options) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut filter = DistanceFilter::new(config.location.min_distance_m);
    let steps = replay::replay(&mut session, &samples, &mut filter, preview_until);
    for (i, step) in steps.iter().enumerate() {
        match step {
            ReplayStep::Filtered => println!("{:>4}: filtered", i + 1),
            ReplayStep::Rejected(e) => println!("{:>4}: rejected ({})", i + 1, e),
            ReplayStep::Update(update) => println!("{:>4}: {}", i + 1, describe(update)),
        }
    }

    ExitCode::SUCCESS
}

fn describe(update: &SessionUpdate) -> String {
    let speed = format!("{} km/h", update.display.speed_kmh);
    match &update.local {
        Some(local) => {
            let eta = local
                .eta_minutes
                .map(|m| format!("{} min", m))
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "{}  wp {}  {:.2} km left  eta {}  {}",
                update.mode,
                local.nearest_waypoint_index,
                local.remaining_km(),
                eta,
                speed
            )
        }
        None => format!(
            "{}  ({:.5}, {:.5})  {}",
            update.mode, update.display.position.latitude, update.display.position.longitude, speed
        ),
    }
}

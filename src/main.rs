mod calendar;
mod config;
mod passes;
mod pipeline;
mod predict;

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::calendar::{
    CalendarService, DryRun, LocalCalendar, SyncAction, SyncReport, TimeWindow,
};
use crate::config::Config;
use crate::pipeline::{window_from_local_midnight, Pipeline};
use crate::predict::{SatelliteRecord, Sgp4EventSource, TleLoader};

#[derive(Parser)]
#[command(name = "pass-calendar")]
#[command(about = "Publish predicted satellite passes to a calendar")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate { config: String },
    /// Print predicted passes without touching the calendar
    Predict {
        config: String,
        /// Print passes as JSON
        #[arg(long)]
        json: bool,
    },
    /// Predict passes and bring the calendar up to date
    Sync {
        config: String,
        /// Log calendar changes instead of making them
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Predict { config, json } => predict(&config, json),
        Commands::Sync { config, dry_run } => sync(&config, dry_run),
    }
}

fn load_config(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Configuration error in {}: {}", path, e);
            None
        }
    }
}

fn load_source(config: &Config) -> Option<Sgp4EventSource> {
    let mut loader = TleLoader::new(config.tle.folder.clone());
    if let Err(e) = loader.load_all() {
        eprintln!("Failed to load TLEs: {}", e);
        return None;
    }
    Some(Sgp4EventSource::new(loader))
}

fn window(config: &Config) -> Option<TimeWindow> {
    let result = config
        .timezone()
        .and_then(|tz| config.window().map(|length| (tz, length)))
        .map_err(|e| e.to_string())
        .and_then(|(tz, length)| {
            window_from_local_midnight(Utc::now(), tz, length).map_err(|e| e.to_string())
        });

    match result {
        Ok(window) => Some(window),
        Err(e) => {
            eprintln!("{}", e);
            None
        }
    }
}

fn validate(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    println!(
        "Configuration is valid ({} satellites, {} ground stations)",
        config.satellites.len(),
        config.ground_stations.len()
    );
    for station in &config.ground_stations {
        println!(
            "  {}: {:.4}, {:.4} @ {} m",
            station.name, station.latitude, station.longitude, station.elevation_m
        );
    }
    ExitCode::SUCCESS
}

fn predict(path: &str, json: bool) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };
    let Some(source) = load_source(&config) else {
        return ExitCode::FAILURE;
    };
    let Some(window) = window(&config) else {
        return ExitCode::FAILURE;
    };
    let pipeline = match Pipeline::new(&config, &source) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let records = pipeline.predict(&window);

    if json {
        match serde_json::to_string_pretty(&records) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Failed to serialize passes: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        let tz = pipeline.timezone();
        for record in &records {
            print_record(record, &tz);
        }
    }
    ExitCode::SUCCESS
}

fn print_record(record: &SatelliteRecord, tz: &chrono_tz::Tz) {
    println!("{} (NORAD {})", record.name, record.norad_id);
    for (group, passes) in record.groups.iter() {
        for pass in passes {
            println!(
                "  {:>3}  {} - {}  {}  {}",
                pass.id,
                pass.start.with_timezone(tz).format("%Y-%m-%d %H:%M:%S"),
                pass.end.with_timezone(tz).format("%H:%M:%S"),
                group,
                calendar::event_intent(&record.name, pass, tz.name()).description
            );
        }
    }
}

fn sync(path: &str, dry_run: bool) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };
    let Some(source) = load_source(&config) else {
        return ExitCode::FAILURE;
    };
    let Some(window) = window(&config) else {
        return ExitCode::FAILURE;
    };

    let local = LocalCalendar::new(config.calendar.folder.clone());
    if dry_run {
        run_sync(&config, &source, &DryRun::new(local), &window)
    } else {
        run_sync(&config, &source, &local, &window)
    }
}

fn run_sync<C: CalendarService>(
    config: &Config,
    source: &Sgp4EventSource,
    calendar: &C,
    window: &TimeWindow,
) -> ExitCode {
    println!("Syncing passes from {} to {}", window.start, window.end);

    let result = Pipeline::new(config, source)
        .map_err(|e| e.to_string())
        .and_then(|pipeline| pipeline.sync(calendar, window).map_err(|e| e.to_string()));

    match result {
        Ok(reports) => {
            for report in &reports {
                print_report(report);
            }
            if reports.iter().any(|r| r.failed() > 0) {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Sync failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_report(report: &SyncReport) {
    println!(
        "{}: {} created, {} replaced, {} unchanged, {} failed",
        report.satellite,
        report.created(),
        report.replaced(),
        report.unchanged(),
        report.failed()
    );
    for action in &report.actions {
        if let SyncAction::Failed { summary, error } = action {
            eprintln!("  failed: {}: {}", summary, error);
        }
    }
}

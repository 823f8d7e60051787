use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process;
use clap::Parser;
use env_logger::{Env, Target};
use track_courier::{
    cli::commands::{Cli, Commands},
    utils::reporting::Reporter,
    Orchestrator, Service, Settings,
};

/// Ctrl-C and SIGTERM end the sleeping interval; a pass in flight finishes first.
fn install_stop_handler(service: &Service) {
    let stop = service.stop_handle();
    let installed = ctrlc::set_handler(move || {
        log::info!("Stop requested, finishing the current pass...");
        stop.stop();
    });
    if let Err(e) = installed {
        log::warn!("Cannot install stop handler: {}", e);
    }
}

fn init_logging(settings: &Settings) {
    let mut builder = env_logger::Builder::from_env(
        Env::default().default_filter_or(settings.log_level.as_str()),
    );

    if let Some(path) = &settings.log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let _ = fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {}: {}, logging to stderr", path.display(), e),
        }
    }

    builder.init();
}

fn load_settings(path: &Path) -> Settings {
    match Settings::load(path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Create one with: track-courier init --config {}", path.display());
            process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let settings = load_settings(&config);
            init_logging(&settings);

            let service = Service::new(Orchestrator::from_settings(settings));
            install_stop_handler(&service);
            if let Err(e) = service.run() {
                eprintln!("Fatal error: {}", e);
                process::exit(1);
            }
        }

        Commands::Once { config } => {
            let settings = load_settings(&config);
            init_logging(&settings);

            let service = Service::new(Orchestrator::from_settings(settings));
            install_stop_handler(&service);
            match service.run_once() {
                Ok(report) => {
                    println!("Discovered: {}", report.discovered);
                    println!("Relocated:  {}", report.relocated);
                    println!("Deferred:   {}", report.deferred);
                    println!("Incomplete: {}", report.incomplete);
                    println!("Failed:     {}", report.failed);
                }
                Err(e) => {
                    eprintln!("Fatal error: {}", e);
                    process::exit(1);
                }
            }
        }

        Commands::Init { config, force } => {
            if config.exists() && !force {
                eprintln!("Error: Configuration file already exists: {}", config.display());
                eprintln!("Use --force to overwrite");
                process::exit(1);
            }

            let written = Settings::default()
                .to_json()
                .and_then(|json| fs::write(&config, json).map_err(Into::into));
            match written {
                Ok(()) => {
                    println!("Created configuration file: {}", config.display());
                    println!("\nNext steps:");
                    println!("1. Edit {} to set your paths and tempo_tool", config.display());
                    println!("2. Run: track-courier validate --config {}", config.display());
                    println!("3. Run: track-courier preview --config {}", config.display());
                    println!("4. Run: track-courier run --config {}", config.display());
                }
                Err(e) => {
                    eprintln!("Error writing {}: {}", config.display(), e);
                    process::exit(1);
                }
            }
        }

        Commands::Validate { config } => {
            println!("Validating configuration: {}", config.display());
            let settings = match Settings::load(&config) {
                Ok(settings) => settings,
                Err(e) => {
                    println!("Invalid: {}", e);
                    process::exit(1);
                }
            };

            let warnings = settings.warnings();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration is valid, with warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
            }
        }

        Commands::Status { config } => {
            let settings = load_settings(&config);
            let status = Orchestrator::from_settings(settings.clone()).status();

            println!("track-courier status");
            println!("{}", "=".repeat(70));
            println!("Configuration File: {}", config.display());
            match &settings.log_file {
                Some(path) => println!("Log File: {}", path.display()),
                None => println!("Log File: (stderr)"),
            }
            println!("Log Level: {}", settings.log_level);

            println!("\nPaths:");
            for root in &status.paths {
                println!("  {}: {}", root.label, root.path.display());
                println!("    Status: {}", if root.exists { "Exists" } else { "Does not exist" });
            }

            println!("\nSettings:");
            println!("  Poll Interval: {} seconds", settings.poll_interval);
            println!(
                "  Network Share: {}",
                if settings.include_share { "Enabled" } else { "Disabled" }
            );
            println!("  BPM Range: {}-{}", settings.bpm_range.min, settings.bpm_range.max);
            println!("  Supported Formats: {}", settings.supported_extensions.join(", "));

            println!("\nFiles to Process: {}", status.pending);
            println!("Incomplete Downloads: {}", status.incomplete);
            if let Some(size) = status.log_file_size {
                println!("Log File Size: {} bytes", size);
            }
        }

        Commands::Preview { config, report } => {
            let settings = load_settings(&config);
            init_logging(&settings);

            let orchestrator = Orchestrator::from_settings(settings);
            let planned = orchestrator.plan();

            if planned.is_empty() {
                println!("No audio files found to process.");
                return;
            }

            println!("Found {} audio file(s):\n", planned.len());
            for (i, item) in planned.iter().enumerate() {
                println!("  {}. {}", i + 1, item.file.file_name);
                if let Some(parent) = item.file.path.parent() {
                    println!("     Location: {}", parent.display());
                }
                if let Some(tags) = &item.tags {
                    let bpm = if tags.bpm > 0 { tags.bpm.to_string() } else { "no BPM".to_string() };
                    println!(
                        "     Tags: {} - {} [{}]",
                        tags.first_performer().filter(|a| !a.is_empty()).unwrap_or("(none)"),
                        Some(tags.title_str()).filter(|t| !t.is_empty()).unwrap_or("(none)"),
                        bpm
                    );
                }
                println!("     Output: {}", item.output_filename);
            }

            if let Some(path) = report {
                if let Err(e) = Reporter::new().generate_preview_report(&planned, &path) {
                    eprintln!("Error generating report: {}", e);
                    process::exit(1);
                }
                println!("\nReport saved to: {}", path.display());
            }
        }
    }
}

//! slicebook - rebuild sliced web novels as PDF
//!
//! CLI entry point

use std::io::{BufRead, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use slicebook::{
    cli::TARGET_PROMPT, init_tracing, wait_for_shutdown_signal, Cli, Config, ConsoleProgress,
    ExitCode, NovelTarget, OutputMode, Pipeline, PipelineResult, ShutdownCoordinator,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(code) => code.into(),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::GeneralError.into()
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let start_time = Instant::now();
    let output_mode = cli.output_mode();

    let input = match &cli.target {
        Some(target) => target.clone(),
        None => prompt_target().context("failed to read the novel URL or id")?,
    };
    let target = match NovelTarget::parse(&input) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(ExitCode::Success);
        }
    };

    let config = match load_config(&cli) {
        Ok(config) => config.merge_with_cli(&cli.overrides()),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(ExitCode::GeneralError);
        }
    };
    if output_mode.should_show(OutputMode::Verbose) {
        print_plan(&cli, &target, &config);
    }

    let shutdown = ShutdownCoordinator::new();
    spawn_signal_handler(shutdown.clone());

    let progress = ConsoleProgress::new(output_mode);
    let pipeline = Pipeline::new(config).with_shutdown(shutdown);

    match pipeline.run(&target, cli.skip_fetch, &progress).await {
        Ok(result) => {
            log_summary(&result, start_time);
            Ok(ExitCode::Success)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(e.exit_code())
        }
    }
}

/// Ask for the target on stdin
fn prompt_target() -> Result<String> {
    print!("{}", TARGET_PROMPT);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("could not load config {}", path.display())),
        None => Config::load().context("could not load config"),
    }
}

/// First signal stops fetching after the current page; a second one aborts
fn spawn_signal_handler(shutdown: ShutdownCoordinator) {
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            warn!(error = %e, "could not listen for Ctrl-C");
            return;
        }
        warn!("interrupt received, finishing with the slices collected so far");
        eprintln!("\nStopping after the current page. Press Ctrl-C again to abort.");
        shutdown.trigger_shutdown();

        if wait_for_shutdown_signal().await.is_ok() {
            eprintln!("Aborted.");
            std::process::exit(ExitCode::Interrupted.code());
        }
    });
}

fn print_plan(cli: &Cli, target: &NovelTarget, config: &Config) {
    println!("=== Run Plan ===");
    println!("Novel: {}", target);
    println!(
        "First page: {}",
        target.page_url(&config.fetch.base_url, 1)
    );
    println!(
        "Slice folder: {}",
        target.folder_in(&config.output.output_dir).display()
    );
    println!(
        "Output: {}",
        target.output_path_in(&config.output.output_dir).display()
    );
    println!("Fetch: {}", if cli.skip_fetch { "SKIPPED" } else { "ENABLED" });
    match config.fetch.max_retries {
        Some(max) => println!("Retries per page: {}", max),
        None => println!("Retries per page: unlimited"),
    }
    println!(
        "Delays: {}ms between pages, {}ms before retry",
        config.fetch.politeness_delay_ms, config.fetch.retry_delay_ms
    );
    println!();
}

fn log_summary(result: &PipelineResult, start_time: Instant) {
    let (pages_fetched, stop) = match &result.fetch {
        Some(report) => (report.pages_fetched, format!("{:?}", report.stop)),
        None => (0, "skipped".to_string()),
    };
    info!(
        novel = %result.target,
        output = %result.output_path.display(),
        pages = result.page_count,
        slices = result.slice_count,
        dropped = result.dropped_slices,
        bytes = result.output_size,
        pages_fetched,
        stop = %stop,
        elapsed_secs = start_time.elapsed().as_secs_f64(),
        "run complete"
    );
}

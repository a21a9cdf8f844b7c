//! vpkg - install upstream .deb packages on Void Linux
//!
//! This is the main CLI application. It loads the configuration and the
//! package set, runs one operation from the ops crate and renders its
//! events and result.

mod cli;
mod display;
mod error;
mod events;
mod logging;
mod prompt;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::{EventHandler, EventPump, SharedPump};
use crate::logging::init_tracing;
use crate::prompt::TerminalPrompter;
use clap::Parser;
use console::Term;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tracing::{error, info};
use vpkg_config::{load_package_set, ColorChoice, Config, OutputFormat};
use vpkg_ops::{OperationResult, OpsContextBuilder, OpsCtx, SyncRequest, XbpsEngine};

/// How often queued events are rendered while a command runs
const REDRAW_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting vpkg v{}", env!("CARGO_PKG_VERSION"));

    // File config (or defaults), then environment, then CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global, &cli.command);

    let packages = load_package_set(&config.packages_path()?).await?;

    let json = cli.global.json || config.general.default_output == OutputFormat::Json;
    let colors = match config.general.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => Term::stdout().features().colors_supported(),
    };
    console::set_colors_enabled(colors);
    let interactive =
        !json && config.general.default_output == OutputFormat::Tty && Term::stdout().is_term();

    let (event_sender, event_receiver) = vpkg_events::channel();
    let pump = EventPump::shared(event_receiver, EventHandler::new(json, interactive, colors));

    let engine = XbpsEngine::new(&config);
    let prompter = TerminalPrompter::new(Arc::clone(&pump), config.general.assume_yes, !json);
    let mut ctx = OpsContextBuilder::new()
        .with_config(config)
        .with_packages(packages)
        .with_engine(engine)
        .with_prompter(prompter)
        .with_event_sender(event_sender)
        .build()?;

    let result = execute_command_with_events(cli.command, &mut ctx, &pump).await?;

    OutputRenderer::new(json, colors).render_result(&result)?;

    info!("Command completed successfully");
    Ok(())
}

/// Run the command while rendering its events in batches
async fn execute_command_with_events(
    command: Commands,
    ctx: &mut OpsCtx,
    pump: &SharedPump,
) -> Result<OperationResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, ctx));
    let mut ticker = tokio::time::interval(REDRAW_INTERVAL);

    loop {
        select! {
            result = &mut command_future => {
                events::drain(pump);
                return result;
            }
            _ = ticker.tick() => events::drain(pump),
        }
    }
}

/// Execute the specified command
async fn execute_command(command: Commands, ctx: &mut OpsCtx) -> Result<OperationResult, CliError> {
    match command {
        Commands::Install {
            packages,
            force,
            update,
            ..
        } => {
            if packages.is_empty() && !update {
                return Err(CliError::InvalidArguments(
                    "no packages given".to_string(),
                ));
            }
            let request = SyncRequest {
                packages,
                update,
                force,
            };
            let report = vpkg_ops::sync(ctx, &request).await?;
            Ok(OperationResult::SyncReport(report))
        }

        Commands::Update { force, .. } => {
            let report = vpkg_ops::sync(ctx, &SyncRequest::update(force)).await?;
            Ok(OperationResult::SyncReport(report))
        }

        Commands::List { repository: true } => {
            let entries = vpkg_ops::list_package_set(ctx).await?;
            Ok(OperationResult::PackageSet(entries))
        }

        Commands::List { repository: false } => {
            let entries = vpkg_ops::list_installed(ctx).await?;
            Ok(OperationResult::PackageList(entries))
        }
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &GlobalArgs, command: &Commands) {
    if let Some(color) = global.color {
        config.general.color = color;
    }
    if global.json {
        config.general.default_output = OutputFormat::Json;
    }
    if let Some(packages) = &global.packages {
        config.paths.packages = Some(packages.clone());
    }
    if command.assume_yes() {
        config.general.assume_yes = true;
    }
}

use crate::cli::args::{Args, Command, ConfigArgs, ConfigCommand};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::core::probe::{run_audit, run_login, run_principals};
use crate::core::runner::RunTotals;
use crate::domain::config::{ProbeConfig, ProbeSettings};
use crate::domain::error::{ProbeError, ProbeResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::http::http_transport_factory;
use crate::infrastructure::logging::init_logging;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Execute CLI command.
///
/// Returns `Ok(false)` when the command ran but something it checked did
/// not pass (a failed login, a non-compliant cluster, an invalid file).
pub async fn execute_command(args: Args) -> ProbeResult<bool> {
    let writer = ConsoleWriter::new(args.output);

    // Load configuration using ConfigManager
    let config_manager = ConfigManager::new()?;
    let mut config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(config_path.as_ref())?
    } else {
        config_manager.load_config()?
    };
    args.overrides.apply(&mut config);

    // Initialize logging
    if !args.quiet {
        init_logging(&config.logging.level, args.verbose)?;
    }

    let run_id = Uuid::new_v4().simple().to_string();

    match args.command {
        Command::Login => {
            let settings = settings(&config)?;
            let span = info_span!("run", run_id = %run_id, command = "login");
            let runs = run_login(Arc::clone(&settings), http_transport_factory(settings))
                .instrument(span)
                .await;
            writer.write_login_runs(&run_id, &runs)?;
            Ok(RunTotals::from_runs(&runs).all_succeeded())
        }
        Command::Audit => {
            let settings = settings(&config)?;
            let span = info_span!("run", run_id = %run_id, command = "audit");
            let runs = run_audit(Arc::clone(&settings), http_transport_factory(settings))
                .instrument(span)
                .await;
            writer.write_audit_runs(&run_id, &runs)?;
            Ok(RunTotals::from_runs(&runs).all_succeeded())
        }
        Command::Principals => {
            let settings = settings(&config)?;
            let span = info_span!("run", run_id = %run_id, command = "principals");
            let runs = run_principals(Arc::clone(&settings), http_transport_factory(settings))
                .instrument(span)
                .await;
            writer.write_principal_runs(&run_id, &runs)?;
            Ok(RunTotals::from_runs(&runs).all_succeeded())
        }
        Command::Config(config_args) => {
            execute_config_command(config_args, &writer, &config, &config_manager, &args.overrides)
        }
        Command::Version => {
            writer.write_message(&format!("rancher-probe {}", env!("CARGO_PKG_VERSION")))?;
            Ok(true)
        }
    }
}

fn settings(config: &ProbeConfig) -> ProbeResult<Arc<ProbeSettings>> {
    let settings = config.validate()?;
    info!(
        "Target {} as '{}' with {} user(s)",
        settings.base_url, settings.credentials.username, settings.users
    );
    Ok(Arc::new(settings))
}

fn execute_config_command(
    args: ConfigArgs,
    writer: &ConsoleWriter,
    config: &ProbeConfig,
    config_manager: &ConfigManager,
    overrides: &crate::cli::args::Overrides,
) -> ProbeResult<bool> {
    match args.command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
            Ok(true)
        }
        ConfigCommand::Validate { file } => {
            let checked = match &file {
                Some(config_path) => config_manager
                    .load_config_from_path(config_path.as_ref())
                    .and_then(|mut loaded| {
                        overrides.apply(&mut loaded);
                        loaded.validate()
                    }),
                None => config.validate(),
            };
            let name = file.as_deref().unwrap_or("Current configuration");
            match checked {
                Ok(_) => {
                    writer.write_message(&format!("{} is valid", name))?;
                    Ok(true)
                }
                Err(e) => {
                    writer.write_error(&format!("{}: validation failed: {}", name, e))?;
                    Ok(false)
                }
            }
        }
        ConfigCommand::Init { path, global } => {
            let target = if global {
                config_manager.get_global_config_path_ref().clone()
            } else if let Some(path) = path {
                PathBuf::from(path)
            } else {
                let current_dir = std::env::current_dir().map_err(|e| {
                    ProbeError::config(format!("Failed to get current directory: {}", e))
                })?;
                ConfigManager::project_config_file(&current_dir)
            };
            config_manager.init_config(&target)?;
            writer.write_message(&format!("Configuration initialized at '{}'", target.display()))?;
            Ok(true)
        }
    }
}

//! console-host binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use console_host::cli::{self, Args};
use console_host::config::Config;
use console_host::host::headless::{HeadlessBridge, HeadlessContainer, StdoutSurface};
use console_host::{
    logging, ActivationController, ConsoleError, ConsoleFactory, OutputSink, SessionState,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(&args)?;

    if logging::init_with_filter(config.log_filter()).is_err() {
        eprintln!("warning: logging already initialized");
    }
    info!("console-host v{}", env!("CARGO_PKG_VERSION"));

    let container = Arc::new(HeadlessContainer::with_surface_factory(|_| {
        Arc::new(StdoutSurface) as Arc<dyn OutputSink>
    }));
    container.set_visible(true);
    let bridge = Arc::new(HeadlessBridge::with_container(Arc::clone(&container)));

    let factory = ConsoleFactory::pty(config.launch_spec())
        .with_output_options(config.output_options());
    let controller =
        ActivationController::with_settings(bridge, Arc::new(factory), config.activation_settings());

    let session = controller.launch_new()?;
    info!(
        session = %session.id(),
        command = %session.launch_spec().command_line(),
        "console ready"
    );

    let mut state = session.watch_state();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let Some(current) = controller.selected_session() else {
                        eprintln!("{}", ConsoleError::ConsoleNotEnabled);
                        continue;
                    };
                    if let Err(e) = current.execute(&line) {
                        eprintln!("{e}");
                    }
                }
                Ok(None) => {
                    debug!("stdin closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    break;
                }
            },
            changed = state.changed() => {
                if changed.is_err() || *state.borrow() != SessionState::Running {
                    info!(session = %session.id(), "console exited");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    for session in controller.all_sessions() {
        if let Err(e) = session.terminate() {
            debug!(session = %session.id(), error = %e, "terminate on shutdown");
        }
    }
    let removed = controller.registry().remove_matching(|_| true)?;
    debug!(removed, "console-host shut down");

    Ok(())
}

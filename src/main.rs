//! script-glue binary entry point.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use script_glue::cli::{self, Args};
use script_glue::config::Config;
use script_glue::{logging, CmdObserver, Command, LineRecord, Mode, Output};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
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

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_with_filter(config.log_filter()) {
        eprintln!("warning: logging already initialized: {}", e);
    }

    match run(&args, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, config: &Config) -> script_glue::Result<()> {
    let Some((program, rest)) = args.command.split_first() else {
        cli::print_help();
        return Ok(());
    };

    let command = Command::new(program.as_str()).args(rest.iter().map(String::as_str));
    let observer = Arc::new(
        CmdObserver::new(command, config.mode()).with_kill_timeout(config.kill_timeout()),
    );
    info!(command = %observer, mode = ?observer.mode(), "observing");

    match observer.mode() {
        Mode::Batch => {
            observer.start().await?;
            for record in observer.get(config.poll_timeout()).await.into_records() {
                print_record(&record, args.json)?;
            }
        }
        Mode::Realtime => {
            observer.start().await?;
            let stopper = observer.clone();
            let interrupt = tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        debug!("interrupt received");
                        stopper.stop().await;
                    }
                    Err(e) => warn!("failed to listen for ctrl-c: {}", e),
                }
            });

            follow(&observer, config.poll_timeout(), args.json).await?;
            interrupt.abort();
        }
    }

    Ok(())
}

/// Print records until the run is over and the queue is empty.
async fn follow(observer: &CmdObserver, poll: Duration, json: bool) -> script_glue::Result<()> {
    loop {
        match observer.get(poll).await {
            Output::Line(record) => print_record(&record, json)?,
            Output::Batch(records) => {
                for record in records {
                    print_record(&record, json)?;
                }
            }
            Output::Unavailable => {
                if !observer.is_running() && observer.is_empty() {
                    return Ok(());
                }
            }
        }
    }
}

fn print_record(record: &LineRecord, json: bool) -> script_glue::Result<()> {
    if json {
        println!("{}", serde_json::to_string(record)?);
    } else {
        println!("{}", record);
    }
    Ok(())
}

mod cli;

use crate::cli::ProvisionCmd;
use std::process::ExitCode;

use clap::Parser;
use eyre::Report;
use tracing_subscriber::EnvFilter;
use vmprovision::provision::ProvisionError;

const CONFIG_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cmd = ProvisionCmd::parse();
    init_tracing(cmd.verbose);

    match cmd.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error(&err, cmd.verbose);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn,vmprovision=info",
        1 => "info,vmprovision=debug",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_code(err: &Report) -> u8 {
    err.downcast_ref::<ProvisionError>()
        .map(|err| err.stage.exit_code())
        .unwrap_or(CONFIG_ERROR)
}

fn print_error(err: &Report, verbose: u8) {
    eprintln!("\x1b[31merror:\x1b[0m {}", err);

    if verbose == 0 {
        if let Some(cause) = err.chain().nth(1) {
            eprintln!("  {}", cause);
            if err.chain().nth(2).is_some() {
                eprintln!("hint: run with -v to see the full error chain");
            }
        }
        return;
    }

    let mut last = err.to_string();
    let mut idx = 0usize;
    for cause in err.chain().skip(1) {
        let msg = cause.to_string();
        if msg == last {
            continue;
        }
        idx += 1;
        eprintln!("  {}. {}", idx, msg);
        last = msg;
    }
}

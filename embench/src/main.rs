use core::error::Error;

use clap::{error::ErrorKind, Parser};
use embench::{cfg::Config, cmd::Cmd, runtime::Runtime};
use tokio::runtime::Builder;

pub fn main() {
    let cmd = match Cmd::try_parse() {
        Ok(cmd) => cmd,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => err.exit(),
        Err(err) => {
            // Invalid arguments are configuration errors as well.
            _ = err.print();
            std::process::exit(1);
        }
    };

    if let Err(err) = embench::logging::init(cmd.verbose as usize) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }

    if let Err(err) = run(cmd) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

fn run(cmd: Cmd) -> Result<(), Box<dyn Error>> {
    let cfg: Config = cmd.try_into()?;

    let result = Builder::new_multi_thread()
        .worker_threads(cfg.threads.get())
        .enable_io()
        .enable_time()
        .thread_name("embench:w")
        .build()?
        .block_on(async { Runtime::new(cfg).run().await })?;

    if result.failed_requests > 0 {
        return Err(format!(
            "{} out of {} requests failed",
            result.failed_requests, result.total_requests
        )
        .into());
    }

    Ok(())
}

#![forbid(unsafe_code)]

use gtd_bot::config::{self, Invocation};
use gtd_bot::{entry, logging};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let invocation = config::parse_invocation(std::env::args().skip(1), |key| {
        std::env::var(key).ok()
    })?;

    match invocation {
        Invocation::Help => print!("{}", config::usage()),
        Invocation::Version => println!("{}", config::version_line()),
        Invocation::Run(config) => {
            logging::init();
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting gtd_bot");
            entry::run(&config)?;
        }
    }
    Ok(())
}

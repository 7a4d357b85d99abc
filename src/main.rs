//! tasksearch binary: thin CLI shell over the library crate.

use clap::Parser;
use console::style;

use tasksearch::cli::{run, Cli};
use tasksearch::observability::init_logging;

fn main() {
    init_logging();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{} failed to start runtime: {e}", style("error:").red().bold());
            std::process::exit(2);
        }
    };

    let code = match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("{} {e}", style("error:").red().bold());
            if e.is_client_error() {
                64
            } else {
                2
            }
        }
    };
    std::process::exit(code);
}

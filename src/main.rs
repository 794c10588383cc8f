use clap::Parser;
use routeforge::cli::{run_cli, Cli};
use routeforge::logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init_logging()?;
    run_cli(cli)
}

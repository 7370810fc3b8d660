mod cli;

use clap::Parser;
use cli::app::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli::init_tracing(cli.verbose);
    cli.run()
}

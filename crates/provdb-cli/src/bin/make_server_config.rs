use std::path::PathBuf;

use clap::Parser;
use provdb_layout::expand_config_file;

/// Expand a base Margo server config for a given number of databases.
///
/// The (pool, xstream) pair at index 1 of the base config's argobots section
/// is the template; it is replaced by one `pool_s<i>` / `stream_s<i>` pair
/// per database. The expanded config is written to stdout.
#[derive(Parser)]
#[command(name = "make-server-config", version)]
struct Cli {
    /// Path to the base Margo JSON config
    config_file: PathBuf,
    /// Number of databases the server will host
    num_dbs: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("provdb_layout=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let expanded = expand_config_file(&cli.config_file, cli.num_dbs)?;
    println!("{}", serde_json::to_string_pretty(&expanded)?);
    Ok(())
}

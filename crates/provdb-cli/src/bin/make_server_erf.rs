use clap::Parser;
use provdb_layout::RankLayout;

/// Generate an ERF rank file for provdb server ranks.
///
/// Server ranks occupy the first hosts of the allocation, numbered from 1,
/// each rank pinned to an equal slice of the host's logical CPUs.
#[derive(Parser)]
#[command(name = "make-server-erf", version)]
struct Cli {
    /// Number of server nodes
    num_nodes: u32,
    /// Server ranks per node
    servers_per_node: u32,
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
    let layout = RankLayout::server(cli.num_nodes, cli.servers_per_node)?;
    print!("{}", layout.render());
    Ok(())
}

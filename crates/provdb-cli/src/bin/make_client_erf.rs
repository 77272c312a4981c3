use clap::Parser;
use provdb_layout::RankLayout;

/// Generate an ERF rank file for provdb client ranks.
///
/// Client ranks are placed on the hosts after the server nodes, each rank
/// pinned to an equal slice of the host's logical CPUs. The rank file is
/// written to stdout for the job launcher to consume.
#[derive(Parser)]
#[command(name = "make-client-erf", version)]
struct Cli {
    /// Nodes reserved for servers; client hosts are numbered after these
    num_server_nodes: u32,
    /// Number of client nodes
    num_client_nodes: u32,
    /// Client ranks per node
    clients_per_node: u32,
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
    let layout =
        RankLayout::client(cli.num_server_nodes, cli.num_client_nodes, cli.clients_per_node)?;
    print!("{}", layout.render());
    Ok(())
}

//! Rank-to-host/CPU partitioning and ERF rank-file rendering.
//!
//! An ERF ("explicit rank file") tells the job launcher which host each rank
//! runs on and which logical CPUs it may use. Server ranks occupy the first
//! hosts of the allocation; client ranks are shifted past them so the two
//! roles never share a node.

use thiserror::Error;
use tracing::{debug, warn};

/// Logical CPUs per host on the target machines.
pub const CPUS_PER_HOST: u32 = 168;

/// One rank's placement: a host id plus an inclusive CPU affinity range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankPlacement {
    pub rank: u32,
    /// 1-based host id as the launcher expects it.
    pub host: u32,
    pub cpu_min: u32,
    pub cpu_max: u32,
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("ranks per host must be at least 1")]
    ZeroRanksPerHost,
}

/// How one role's ranks map onto the hosts of an allocation.
#[derive(Debug, Clone)]
pub struct RankLayout {
    num_hosts: u32,
    ranks_per_host: u32,
    /// Hosts reserved by another role ahead of this one.
    host_offset: u32,
}

impl RankLayout {
    /// Layout for server ranks: hosts numbered from 1, no offset.
    pub fn server(num_nodes: u32, servers_per_node: u32) -> Result<Self, LayoutError> {
        Self::new(num_nodes, servers_per_node, 0)
    }

    /// Layout for client ranks: hosts start after the server nodes.
    pub fn client(
        num_server_nodes: u32,
        num_client_nodes: u32,
        clients_per_node: u32,
    ) -> Result<Self, LayoutError> {
        Self::new(num_client_nodes, clients_per_node, num_server_nodes)
    }

    fn new(num_hosts: u32, ranks_per_host: u32, host_offset: u32) -> Result<Self, LayoutError> {
        if ranks_per_host == 0 {
            return Err(LayoutError::ZeroRanksPerHost);
        }
        if CPUS_PER_HOST % ranks_per_host != 0 {
            warn!(
                ranks_per_host,
                unused = CPUS_PER_HOST % ranks_per_host,
                "ranks per host does not divide {CPUS_PER_HOST}; trailing CPUs stay unassigned"
            );
        }
        let layout = RankLayout { num_hosts, ranks_per_host, host_offset };
        debug!(
            num_ranks = layout.num_ranks(),
            cpu_per_rank = layout.cpu_per_rank(),
            host_offset,
            "computed rank layout"
        );
        Ok(layout)
    }

    pub fn num_ranks(&self) -> u32 {
        self.num_hosts * self.ranks_per_host
    }

    pub fn cpu_per_rank(&self) -> u32 {
        CPUS_PER_HOST / self.ranks_per_host
    }

    /// Placements for all ranks of this role, in rank order.
    pub fn placements(&self) -> Vec<RankPlacement> {
        let cpu_per_rank = self.cpu_per_rank();
        (0..self.num_ranks())
            .map(|rank| {
                let host = rank / self.ranks_per_host;
                let local = rank - host * self.ranks_per_host;
                let cpu_min = local * cpu_per_rank;
                RankPlacement {
                    rank,
                    host: host + self.host_offset + 1,
                    cpu_min,
                    cpu_max: cpu_min + cpu_per_rank - 1,
                }
            })
            .collect()
    }

    /// Render the complete rank file, header line included.
    pub fn render(&self) -> String {
        let mut out = String::from("cpu_index_using: logical\n");
        for p in self.placements() {
            out.push_str(&format!(
                "rank: {}: {{ host: {}; cpu: {{ {}-{} }} }} : app 0\n",
                p.rank, p.host, p.cpu_min, p.cpu_max
            ));
        }
        out
    }
}

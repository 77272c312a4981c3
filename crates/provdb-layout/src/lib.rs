pub mod expand;
pub mod rankfile;

pub use expand::{ExpandError, expand_config, expand_config_file};
pub use rankfile::{CPUS_PER_HOST, LayoutError, RankLayout, RankPlacement};

pub mod config;
pub mod kmeans;
pub mod movement;

pub use config::ClusteringConfig;
pub use movement::{
    active_seconds, calculate_daily_stat, cluster_sizes, run_clustering, run_clustering_with,
    SAMPLE_PERIOD_SECS,
};

pub mod hdinsight_cluster;

pub use hdinsight_cluster::HdinsightClusterDataSource;

pub mod hadoop_cluster;
pub mod schema;
pub mod validate;

pub use hadoop_cluster::HadoopClusterResource;

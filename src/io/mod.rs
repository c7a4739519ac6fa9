pub mod bank;
pub mod graph_info;

mod admin_routes;
mod config;
mod graph_routes;
mod http_layers;
pub mod metrics;
#[allow(clippy::module_inception)]
mod server;
mod state;

pub use config::ServerConfig;
pub use graph_routes::CACHE_OUTCOME_HEADER;
pub use http_layers::*;
pub use server::{make_app, make_metrics_app, run_server};

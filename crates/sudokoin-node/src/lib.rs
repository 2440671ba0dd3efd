//! # sudokoin-node
//! Node composition for Sudokoin: the [`NodeApi`] façade serializing all
//! core access behind one lock, the wallet spend builder, and the axum HTTP
//! transport.

pub mod api;
pub mod config;
pub mod http;
pub mod wallet;

pub use api::NodeApi;
pub use config::NodeConfig;
pub use http::router;

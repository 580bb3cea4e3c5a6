//! # Verse Server
//! Hosts Verse connections on top of a verse-client runtime: answers
//! connection requests with an avatar node, keeps the server's own nodes and
//! announces them to peers subscribed to the node index.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

mod connection;
mod error;
mod host_id_store;
mod node_id_generator;
mod server;
mod server_config;

pub use connection::Connection;
pub use error::ServerError;
pub use host_id_store::load_or_create as load_or_create_host_id;
pub use node_id_generator::NodeIdGenerator;
pub use server::Server;
pub use server_config::ServerConfig;

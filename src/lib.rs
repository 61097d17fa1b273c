//! Mock interview backend library.
//!
//! Server side: streaming LLM proxy, question bank and contribution flow, assembled by
//! `routes::build_router`. Consumer side: `client::ProxyClient` reads a proxied stream,
//! `repair` turns the growing text into parse results and `reconcile` turns those into
//! render views, dropping anything from a superseded request.

pub mod telemetry;
pub mod util;
pub mod domain;
pub mod config;
pub mod error;
pub mod schema;
pub mod prompt;
pub mod repair;
pub mod openai;
pub mod protocol;
pub mod bank;
pub mod github;
pub mod state;
pub mod routes;
pub mod reconcile;
pub mod client;
#[cfg(test)]
mod test_support;

//! Active health probes against monitored endpoints.
//!
//! Each probe builds its own short-lived HTTP client with the configured
//! timeout; no connection pool is retained across sweeps.

mod http;
mod rpc;

pub use http::HttpProber;
pub use rpc::RpcProber;

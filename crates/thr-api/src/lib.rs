// thr-api: Async Rust client for the THR registry store (PostgREST wire format)

pub mod client;
pub mod error;
pub mod query;
pub mod transport;
pub mod types;

pub use client::RestClient;
pub use error::Error;
pub use query::{Direction, Nulls, Query};
pub use transport::{TlsMode, TransportConfig};

//! A Rust client for the GENESIS-Online RESTful/JSON API of the German
//! Federal Statistical Office (Destatis).
//!
//! The crate wraps the `data` service of the API. Every response is
//! normalized into a uniform [`Envelope`] of
//! `{Ident, Status, Parameter, Content, Copyright}`, and large-table
//! requests transparently follow the deferred-result protocol: when the
//! server moves the computation into a background batch job, the client
//! persists a placeholder under the job's result identifier and polls until
//! the job completes, on the calling thread or on a bounded worker pool so
//! the caller is not blocked.
//!
//! ## Quick start
//! - Configure credentials via environment variables (`GENESIS_USERNAME`,
//!   `GENESIS_PASSWORD`) or a `.genesisrc` file (supported in the current
//!   directory and in your home directory).
//! - Call the data service through [`Client::data`].
//!
//! ```no_run
//! use genesisonline::{Client, Result};
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env()?;
//!
//!     // Small table: returns synchronously.
//!     let small = client.data().table("51000-0012", true, &[("area", "all")])?;
//!     println!("{:?}", small.status);
//!
//!     // Large table, asynchronous: content is the bare result identifier;
//!     // a background worker polls and completes the stored envelope.
//!     let pending = client.data().table("51000-0013", false, &[])?;
//!     if let Some(result_id) = pending.content.as_text() {
//!         let stored = client.data().load(result_id)?;
//!         println!("{:?}", stored.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Logging uses the `log` facade; install any logger to see poll and store
//! activity.

#![forbid(unsafe_code)]

mod client;
mod config;
mod data;
mod endpoint;
mod envelope;
mod error;
mod jobs;
mod store;
mod transport;
mod util;

pub use client::{API_VERSION, Client};
pub use config::{BASE_URL, ClientConfig};
pub use data::DataService;
pub use endpoint::Endpoint;
pub use envelope::{BinaryContent, Content, Envelope, Ident, Status, StatusCode};
pub use error::{Error, Result};
pub use jobs::{CancellationToken, ResultIdExtractor, TrailingToken};
pub use store::{FileStore, MemoryStore, ResultStore};

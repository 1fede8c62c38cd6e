//! A small blocking client for the Airbus OneAtlas Data API.
//!
//! The flow is: exchange an API key for a bearer token, resolve the user's workspace, list
//! or look up delivered products, stream their archives to disk and optionally unzip them.
//!
//! ## Quick start
//! - Store your API key and download directory with `oneatlas configure`, or pass them
//!   directly as below.
//! - Build a [`Client`] and run a [`Workflow`].
//!
//! ```no_run
//! use oneatlas::{Client, Workflow};
//!
//! fn main() -> oneatlas::Result<()> {
//!     let client = Client::from_env()?.with_progress(true);
//!     let mut report = |msg: &str| eprintln!("{}", msg);
//!     Workflow::new(&client, "/data/oneatlas")
//!         .extract(true)
//!         .run_all("MY-API-KEY", &mut report)?;
//!     Ok(())
//! }
//! ```
//!
//! The validation layer in [`validation`] drives a GIS dialog through the [`Host`] trait.

#![forbid(unsafe_code)]

mod auth;
mod catalog;
mod client;
mod config;
mod download;
mod error;
mod extract;
pub mod geometry;
pub mod logging;
mod report;
pub mod transport;
mod util;
pub mod validation;
mod workflow;

pub use auth::{BearerToken, WorkspaceId, is_valid_api_key};
pub use catalog::{ProductDownloadInfo, ProductSummary, parse_product_id, summarize};
pub use client::Client;
pub use config::{ClientConfig, CredentialStore, Credentials, load_config};
pub use download::{DEFAULT_CHUNK_SIZE, DownloadOutcome};
pub use error::{Error, Result};
pub use extract::extract_product;
pub use report::Reporter;
pub use transport::{ReqwestTransport, Transport};
pub use validation::{DialogState, Host, Param, Validator};
pub use workflow::{BatchPolicy, RunSummary, Workflow};

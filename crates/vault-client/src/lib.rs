//! # Module overview
//! Client for the chunk-vault session program: persists byte payloads that
//! exceed a single transaction's data limit by splitting them into ordered
//! chunks, submitting each as its own transaction against an on-chain
//! session, and reconstructing the payload later from the service download
//! endpoint or straight from transaction history.
//!
//! Upload: [`encode::encode`] → [`upload::VaultUploader::store`] (session
//! gate, strategy-driven dispatch, batched confirmation with bounded
//! retries, finalize).
//! Download: [`retrieve::VaultRetriever::retrieve`] (metadata poll, pluggable
//! [`retrieve::ChunkSource`], index-sorted reassembly, digest check, marker
//! decode).
//!
//! External collaborators — ledger RPC, session service, wallet, metadata
//! index — enter only through the traits in [`boundary`]; `rpc` and
//! `service` provide the HTTP implementations.

pub mod boundary;
pub mod cache;
pub mod config;
pub mod confirm;
pub mod dispatch;
pub mod encode;
pub mod error;
pub mod retrieve;
pub mod rpc;
pub mod service;
pub mod types;
pub mod upload;

mod retry;
mod session;

pub use boundary::{LedgerRpc, MetadataSink, NullMetadataSink, SessionService, WalletSigner};
pub use cache::ChunkCache;
pub use config::VaultConfig;
pub use dispatch::DispatchStrategy;
pub use error::{Result, VaultClientError};
pub use retrieve::{ChunkSource, VaultRetriever};
pub use types::{RetrievalResult, StorageResult};
pub use upload::{StoreOptions, VaultUploader};

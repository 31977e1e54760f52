//! # gas-relay
//!
//! A gas relay node for Whisper-based transaction requests. Users
//! without ether publish signed meta-transaction requests over a
//! Whisper topic; the relay listens on both the shared symmetric
//! channel and its own asymmetric inbox, decodes each request, and
//! either answers an availability probe or hands the transaction to a
//! pluggable executor. Replies travel back encrypted to the sender's
//! public key on the original topic.
//!
//! ## Architecture
//!
//! - [`provider`]: the transport seam. [`provider::WhisperProvider`]
//!   abstracts the node RPC surface; [`provider::rpc::RpcProvider`]
//!   speaks JSON-RPC to a real node and [`provider::memory::MemoryProvider`]
//!   is an in-process loopback for tests.
//! - [`registry`]: topic → contract routing table, loaded from config.
//! - [`subscription`]: opens the two channels per registered topic.
//! - [`decoder`] / [`dispatch`]: payload parsing and action routing.
//! - [`guard`]: pre-flight relayer balance checks.
//! - [`reply`]: best-effort encrypted replies to the original sender.
//! - [`service`]: the orchestrator tying the above into a run loop.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gas_relay::config::RelayConfig;
//! use gas_relay::dispatch::NoopExecutor;
//! use gas_relay::provider::rpc::RpcProvider;
//! use gas_relay::service::{RelayService, ShutdownKind};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = RelayConfig::load("config.toml")?;
//! let provider = Arc::new(RpcProvider::new(&config.node));
//! let service = RelayService::new(config, provider, Arc::new(NoopExecutor));
//!
//! let _outcome = service
//!     .run(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!         ShutdownKind::Interrupt
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod guard;
pub mod provider;
pub mod registry;
pub mod reply;
pub mod service;
pub mod subscription;
pub mod types;

pub use error::{RelayError, Result};
pub use service::{RelayService, RunOutcome, ShutdownKind};

//! FEC-aware receive reordering and repair engine.
//!
//! Consumes a source stream and a repair stream of RTP-like packets,
//! aligns them onto a common block boundary, drives a pluggable block
//! erasure codec, and emits a contiguous, in-order sequence of source
//! packets — reconstructing lost ones from parity when possible.
//!
//! - [`reader::Reader`] is the entry point: the dual-queue state machine.
//! - [`codec`] provides the pluggable `BlockCodec` backends.
//! - [`config`] resolves a TOML-sourced configuration into a `ReaderConfig`.
//! - [`packet`] defines the packet shape the core reads.

pub mod codec;
pub mod config;
pub mod error;
pub mod packet;
pub mod queue;
pub mod reader;
pub mod seq16;
pub mod stats;
pub mod validate;
pub mod window;

pub use codec::{BlockCodec, CodecStats};
pub use config::{ReaderConfig, ReaderConfigInput, Scheme, SourceIdPolicy};
pub use error::FecError;
pub use packet::{FecHeader, Packet, PacketHandle, PacketParser, PacketReader, RtpHeader};
pub use reader::Reader;
pub use stats::ReaderStats;

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a process-wide `tracing` subscriber, once. A no-op if the
/// host application already installed one of its own.
pub fn init() {
    INIT.call_once(|| {
        if tracing::dispatcher::has_been_set() {
            return;
        }
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_target(true)
            .with_thread_names(true)
            .compact()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

//! Errors raised by the detection core.
//!
//! Everything outside the core uses `eyre`; the graph gets a typed error so a
//! caller can tell a corrupted venue graph apart from a network failure.

use thiserror::Error;

/// The graph handed to the detector violates its input contract.
///
/// Fatal for one venue's scan only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("edge {market} references asset {asset} which is not in the node set")]
    UnknownNode { asset: String, market: String },

    #[error("edge {market} ({from} -> {to}) has non-finite weight {weight}")]
    NonFiniteWeight {
        from: String,
        to: String,
        market: String,
        weight: f64,
    },
}

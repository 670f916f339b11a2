//! Phase 1: The Cartographer (Data Ingest)
//!
//! Venue REST snapshots in, log-weighted rate graph out.

mod fetcher;
mod graph;
mod market;
mod toplist;

pub use fetcher::{Venue, VenueFetcher, SUPPORTED_VENUES};
pub use graph::{to_log_edges, ConversionEdge, EdgeBuildReport, EdgeBuilder, RateGraph};
pub use market::{PricedPair, VenueSnapshot};
pub use toplist::fetch_top_symbols;

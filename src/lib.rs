//! Mirror resolution engine.
//!
//! Selects and orders mirror URLs for a requested content path or for a
//! legacy `repo`/`arch` pair, working from a read-only catalog snapshot.
//! The `generate-mirrorlist-cache` binary produces that snapshot from the
//! administration database and `mirrorlist-server` answers HTTP requests
//! from it.

pub mod catalog;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod geo;
pub mod legacy;
pub mod snapshot;
pub mod visibility;

/// Generated protobuf types for the catalog snapshot.
pub mod protos {
    include!(concat!(env!("OUT_DIR"), "/protos/mod.rs"));
}

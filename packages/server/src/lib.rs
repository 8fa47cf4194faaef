//! Realtime presence and message-relay server.
//!
//! Tracks which chat participants are connected, relays their messages to
//! every connected session in one total order, keeps a bounded history for
//! backfill and absorbs short reconnects through a grace period.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;

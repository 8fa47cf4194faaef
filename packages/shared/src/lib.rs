//! Helpers shared by the Parlor server and client binaries.

pub mod logger;
pub mod time;

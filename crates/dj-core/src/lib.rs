//! digital-journal/crates/dj-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Digital Journal.
//! Nothing in here knows about HTTP, SQL or the filesystem; adapters plug in
//! through the traits in [`traits`].

pub mod access;
pub mod document;
pub mod error;
pub mod gamification;
pub mod leaderboard;
pub mod models;
pub mod recents;
pub mod search;
pub mod seed;
pub mod services;
pub mod streak;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;

#![allow(clippy::doc_markdown)]

//! hearth-core - progression core for the hearth community platform
//!
//! This crate holds everything that does not need a runtime:
//!
//! - [`leveling`]: pure XP to level/progress mapping and cosmetic reward
//!   tiers
//! - [`config`]: `hearth.toml` parsing shared by the daemon and the CLI
//! - [`store`]: `SQLite`-backed access to the user progression columns
//! - [`recalc`]: one-shot recalculation of the cached `level` column

pub mod config;
pub mod leveling;
pub mod recalc;
pub mod store;

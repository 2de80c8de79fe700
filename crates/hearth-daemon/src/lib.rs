#![allow(clippy::doc_markdown)]

//! hearth-daemon - startup and read paths for the hearth community platform
//!
//! # Modules
//!
//! - [`schema`]: idempotent, additive schema reconciliation with a
//!   run-once guard
//! - [`state`]: shared handles passed to request handlers
//! - [`http`]: read-only progression API that decorates stored XP with
//!   derived level, progress, title, and color
//!
//! # Startup contract
//!
//! The daemon awaits [`schema::SchemaReconciler::reconcile`] before serving,
//! but never fails to start because of it. A missing column surfaces later
//! as a query error at the point of use.

pub mod http;
pub mod schema;
pub mod state;

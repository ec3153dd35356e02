//! Runtime for a single-page portfolio site: the static file server, the
//! per-language project data pipeline, preference stores, scroll reveal and
//! an offline bundle size report.

pub mod analyze;
pub mod core;
pub mod error;
pub mod server;
pub mod views;

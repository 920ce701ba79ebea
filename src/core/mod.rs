// FleetSleuth - core/mod.rs
//
// Core business logic layer.
// Dependencies: standard library, serde/serde_json, chrono, regex.
// Must NOT depend on: ui, platform, app, api, or any I/O directly.

pub mod export;
pub mod filter;
pub mod model;
pub mod normalize;
pub mod schema;

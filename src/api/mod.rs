// FleetSleuth - api/mod.rs
//
// Management-API client layer.
// Dependencies: core (record model), util. Blocking HTTP only; the app
// layer runs this on a background thread, never on the UI thread.

pub mod client;

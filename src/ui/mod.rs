// FleetSleuth - ui/mod.rs
//
// UI layer: presentation only.
// Dependencies: app (state), core (read-only models), egui.
// Must NOT depend on: platform, api, direct I/O.

pub mod charts;
pub mod panels;
pub mod table;
pub mod theme;

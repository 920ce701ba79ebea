// FleetSleuth - app/state.rs
//
// Application state management. Holds the auth session, the per-family
// tables with their filter state, tab selection, and fetch status.
// Owned by the eframe::App implementation.

use crate::api::client::AuthSession;
use crate::core::filter::FilterState;
use crate::core::model::{DeviceRecord, Family, FamilySchema, FetchSummary};
use crate::platform::config::AppConfig;
use crate::util::constants;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level tab selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Devices,
    M2m,
    Firmware,
}

/// Sub-tab inside the devices view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSubTab {
    #[default]
    Boards,
    Kiwi,
}

/// One family's table plus its view state.
#[derive(Debug, Default)]
pub struct FamilyTable {
    /// Normalised records from the last fetch (empty until loaded).
    pub records: Vec<DeviceRecord>,

    /// Indices of records matching the current filter (into `records`).
    pub filtered_indices: Vec<usize>,

    /// Current filter configuration.
    pub filter_state: FilterState,

    /// Index of the currently selected record in filtered_indices.
    pub selected_index: Option<usize>,

    /// Model selected by clicking a bar in the distribution chart.
    /// Narrows the status breakdowns and table below the chart.
    pub drilldown_model: Option<String>,

    /// Raw items skipped during normalisation of the last fetch.
    pub skipped: usize,
}

impl FamilyTable {
    /// Recompute filtered indices from current records and filter state.
    pub fn apply_filters(&mut self) {
        self.filtered_indices =
            crate::core::filter::apply_filters(&self.records, &self.filter_state);

        // Clear selection if it is out of range
        if let Some(idx) = self.selected_index {
            if idx >= self.filtered_indices.len() {
                self.selected_index = None;
            }
        }

        // Clear the drill-down if its model vanished from the filtered view
        if let Some(ref model) = self.drilldown_model {
            let still_visible = self
                .filtered_indices
                .iter()
                .any(|&i| self.records.get(i).is_some_and(|r| &r.model == model));
            if !still_visible {
                self.drilldown_model = None;
            }
        }
    }

    /// Replace the table contents after a fetch and re-apply filters.
    pub fn load(&mut self, records: Vec<DeviceRecord>, skipped: usize) {
        self.records = records;
        self.skipped = skipped;
        self.apply_filters();
    }

    /// Get the currently selected record, if any.
    pub fn selected_record(&self) -> Option<&DeviceRecord> {
        self.selected_index
            .and_then(|idx| self.filtered_indices.get(idx))
            .and_then(|&record_idx| self.records.get(record_idx))
    }

    /// Records visible after filtering AND the chart drill-down, in display order.
    pub fn context_records(&self) -> Vec<&DeviceRecord> {
        self.filtered_indices
            .iter()
            .filter_map(|&i| self.records.get(i))
            .filter(|r| match &self.drilldown_model {
                Some(model) => &r.model == model,
                None => true,
            })
            .collect()
    }

    /// Clear records and view state (keeps the filter configuration).
    pub fn clear(&mut self) {
        self.records.clear();
        self.filtered_indices.clear();
        self.selected_index = None;
        self.drilldown_model = None;
        self.skipped = 0;
    }
}

/// Top-level application state.
pub struct AppState {
    /// Currently loaded family schemas.
    pub schemas: Vec<FamilySchema>,

    /// Validated configuration.
    pub config: AppConfig,

    /// Active API session (None = logged out; login panel is shown).
    pub session: Option<AuthSession>,

    /// Per-family tables.
    pub boards: FamilyTable,
    pub kiwi: FamilyTable,
    pub m2m: FamilyTable,
    pub firmware: FamilyTable,

    /// Tab selection.
    pub active_tab: Tab,
    pub device_subtab: DeviceSubTab,

    /// Whether a fetch cycle is currently in progress.
    pub fetch_in_progress: bool,

    /// Summary from the most recent completed fetch cycle.
    pub fetch_summary: Option<FetchSummary>,

    /// Status message for the status bar.
    pub status_message: String,

    /// Non-fatal warnings accumulated during the current cycle.
    pub warnings: Vec<String>,

    /// Error shown on the login panel after a failed sign-in.
    pub login_error: Option<String>,

    /// Whether to show the fetch summary dialog.
    pub show_summary: bool,

    /// Whether to show the about dialog.
    pub show_about: bool,

    /// Set by panels to request a new fetch cycle on the next frame.
    pub pending_refresh: bool,

    /// Set by panels to request cancellation of the running cycle.
    pub request_cancel: bool,

    /// Set by panels to request sign-out on the next frame.
    pub pending_logout: bool,

    /// Whether debug mode is enabled.
    pub debug_mode: bool,

    /// Dark (true) or light (false) theme, from config.
    pub dark_mode: bool,

    /// Platform data directory (session file, raw dumps).
    pub data_dir: PathBuf,
}

impl AppState {
    /// Create initial state with loaded schemas and validated config.
    pub fn new(
        schemas: Vec<FamilySchema>,
        config: AppConfig,
        data_dir: PathBuf,
        debug_mode: bool,
    ) -> Self {
        let dark_mode = config.dark_mode;
        Self {
            schemas,
            config,
            session: None,
            boards: FamilyTable::default(),
            kiwi: FamilyTable::default(),
            m2m: FamilyTable::default(),
            firmware: FamilyTable::default(),
            active_tab: Tab::default(),
            device_subtab: DeviceSubTab::default(),
            fetch_in_progress: false,
            fetch_summary: None,
            status_message: "Sin sesión. Conecta para descargar la flota.".to_string(),
            warnings: Vec::new(),
            login_error: None,
            show_summary: false,
            show_about: false,
            pending_refresh: false,
            request_cancel: false,
            pending_logout: false,
            debug_mode,
            dark_mode,
            data_dir,
        }
    }

    /// The table for a family.
    pub fn table(&self, family: Family) -> &FamilyTable {
        match family {
            Family::Boards => &self.boards,
            Family::Kiwi => &self.kiwi,
            Family::M2m => &self.m2m,
            Family::Firmware => &self.firmware,
        }
    }

    /// The mutable table for a family.
    pub fn table_mut(&mut self, family: Family) -> &mut FamilyTable {
        match family {
            Family::Boards => &mut self.boards,
            Family::Kiwi => &mut self.kiwi,
            Family::M2m => &mut self.m2m,
            Family::Firmware => &mut self.firmware,
        }
    }

    /// The schema for a family, when one loaded.
    pub fn schema(&self, family: Family) -> Option<&FamilySchema> {
        self.schemas.iter().find(|s| s.family == family)
    }

    /// Total records across all family tables.
    pub fn total_records(&self) -> usize {
        Family::all()
            .iter()
            .map(|&f| self.table(f).records.len())
            .sum()
    }

    /// Append a non-fatal warning, bounded by MAX_WARNINGS.
    pub fn push_warning(&mut self, message: String) {
        if self.warnings.len() < constants::MAX_WARNINGS {
            self.warnings.push(message);
        }
    }

    /// Drop the session and all fetched data (sign-out teardown).
    pub fn logout(&mut self) {
        self.session = None;
        for family in Family::all() {
            self.table_mut(*family).clear();
        }
        self.fetch_summary = None;
        self.warnings.clear();
        self.login_error = None;
        self.status_message = "Sesión cerrada.".to_string();
        tracing::info!("Signed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Connectivity, Operability};

    fn make_record(id: u64, model: &str) -> DeviceRecord {
        DeviceRecord {
            id,
            family: Family::Boards,
            organization: "Acme".to_string(),
            model: model.to_string(),
            connectivity: Connectivity::Connected,
            operability: Operability::Enabled,
            m2m: None,
            firmware: None,
            raw: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_family_table_load_and_filter() {
        let mut table = FamilyTable::default();
        table.load(vec![make_record(0, "A"), make_record(1, "B")], 0);
        assert_eq!(table.filtered_indices, vec![0, 1]);

        table.filter_state.model = Some("B".to_string());
        table.apply_filters();
        assert_eq!(table.filtered_indices, vec![1]);
    }

    #[test]
    fn test_drilldown_cleared_when_model_filtered_out() {
        let mut table = FamilyTable::default();
        table.load(vec![make_record(0, "A"), make_record(1, "B")], 0);
        table.drilldown_model = Some("B".to_string());

        table.filter_state.model = Some("A".to_string());
        table.apply_filters();
        assert_eq!(table.drilldown_model, None);
    }

    #[test]
    fn test_context_records_respect_drilldown() {
        let mut table = FamilyTable::default();
        table.load(
            vec![make_record(0, "A"), make_record(1, "B"), make_record(2, "A")],
            0,
        );
        table.drilldown_model = Some("A".to_string());
        let context = table.context_records();
        assert_eq!(context.len(), 2);
        assert!(context.iter().all(|r| r.model == "A"));
    }

    #[test]
    fn test_selection_cleared_when_out_of_range() {
        let mut table = FamilyTable::default();
        table.load(vec![make_record(0, "A"), make_record(1, "B")], 0);
        table.selected_index = Some(1);

        table.filter_state.model = Some("A".to_string());
        table.apply_filters();
        assert_eq!(table.selected_index, None);
    }
}

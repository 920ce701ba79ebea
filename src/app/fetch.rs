// FleetSleuth - app/fetch.rs
//
// Fetch-cycle lifecycle management. Orchestrates sign-in, per-resource
// fetching, and normalisation on a background thread, sending progress
// messages to the UI thread via an mpsc channel.
//
// Architecture:
//   - `FetchManager` lives on the UI thread; `run_fetch` runs on a background thread.
//   - An `Arc<AtomicBool>` cancel flag allows the UI to stop the cycle cooperatively.
//   - All cross-thread communication is via `FetchProgress` channel messages.
//
// Degradation policy:
//   - A failed sign-in fails the whole cycle (nothing can be fetched).
//   - A failed resource is non-fatal; its table empties and the cycle
//     continues with the remaining resources.
//   - The normaliser itself never fails; bad payload shapes yield empty
//     tables and skipped-row counts.

use crate::api::client::{AuthSession, CoreClient, Credentials};
use crate::core::export;
use crate::core::model::{
    DeviceRecord, Family, FamilySchema, FetchSummary, ResourceSummary,
};
use crate::core::normalize;
use crate::util::constants;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

// =============================================================================
// Progress messages
// =============================================================================

/// Progress messages sent from the fetch thread to the UI thread.
#[derive(Debug, Clone)]
pub enum FetchProgress {
    /// The fetch cycle started (sign-in about to begin when needed).
    Started,

    /// Sign-in succeeded; the UI stores the session for later cycles.
    SignedIn { session: AuthSession },

    /// A resource fetch is in flight.
    ResourceStarted { family: Family },

    /// A resource was fetched and normalised. Replaces the family's table.
    TableLoaded {
        family: Family,
        records: Vec<DeviceRecord>,
        raw_count: usize,
        skipped: usize,
    },

    /// A resource fetch failed; the family's table becomes empty.
    /// Non-fatal: the cycle continues with the remaining resources.
    ResourceFailed { family: Family, error: String },

    /// A non-fatal warning occurred during the cycle.
    Warning { message: String },

    /// The whole cycle completed (some resources may still have failed).
    Completed { summary: FetchSummary },

    /// The cycle failed before any resource could be fetched
    /// (missing credentials, sign-in rejected, ...).
    Failed { error: String },

    /// The cycle was cancelled by the user before completion.
    Cancelled,
}

// =============================================================================
// Fetch parameters
// =============================================================================

/// Everything the background thread needs, captured before spawn so the
/// thread owns its inputs outright.
pub struct FetchParams {
    pub base_url: String,
    pub tenant_uuid: String,
    pub timeout: Duration,

    /// Existing session to reuse; `None` forces a fresh sign-in.
    pub session: Option<AuthSession>,

    /// Credentials for the sign-in when no session is supplied.
    pub credentials: Option<Credentials>,

    /// Family schemas to normalise with.
    pub schemas: Vec<FamilySchema>,

    /// Dump each raw resource to CSV in `dump_dir` for debugging.
    pub dump_raw: bool,
    pub dump_dir: PathBuf,
}

// =============================================================================
// FetchManager
// =============================================================================

/// Manages a fetch cycle on a background thread.
pub struct FetchManager {
    /// Channel receiver for the UI to poll progress messages.
    pub progress_rx: Option<mpsc::Receiver<FetchProgress>>,

    /// Cancel flag shared with the background thread.
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl FetchManager {
    pub fn new() -> Self {
        Self {
            progress_rx: None,
            cancel_flag: None,
        }
    }

    /// Start a fetch cycle with the given parameters.
    ///
    /// Spawns a background thread immediately; progress is sent over the
    /// channel. If a cycle is already running it is cancelled first.
    pub fn start_fetch(&mut self, params: FetchParams) {
        // Cancel any existing cycle.
        self.cancel_fetch();

        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        self.progress_rx = Some(rx);
        self.cancel_flag = Some(Arc::clone(&cancel));

        std::thread::spawn(move || {
            run_fetch(params, tx, cancel);
        });

        tracing::info!("Fetch cycle started");
    }

    /// Request cancellation of the running cycle.
    /// The background thread will send `FetchProgress::Cancelled` and exit.
    pub fn cancel_fetch(&mut self) {
        if let Some(flag) = &self.cancel_flag {
            flag.store(true, Ordering::SeqCst);
        }
        self.cancel_flag = None;
    }

    /// Poll for progress messages without blocking.
    ///
    /// Returns at most `MAX_FETCH_MESSAGES_PER_FRAME` messages; the rest
    /// stay queued for subsequent frames.
    pub fn poll_progress(&self) -> Vec<FetchProgress> {
        let mut messages = Vec::new();
        if let Some(ref rx) = self.progress_rx {
            while messages.len() < constants::MAX_FETCH_MESSAGES_PER_FRAME {
                match rx.try_recv() {
                    Ok(msg) => messages.push(msg),
                    Err(_) => break,
                }
            }
        }
        messages
    }
}

impl Default for FetchManager {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Background fetch pipeline
// =============================================================================

/// Full fetch pipeline: sign-in → per-resource fetch → normalise → summary.
///
/// Runs on a background thread. Sends `FetchProgress` messages to `tx`.
/// Checks `cancel` before each significant operation.
fn run_fetch(params: FetchParams, tx: mpsc::Sender<FetchProgress>, cancel: Arc<AtomicBool>) {
    macro_rules! send {
        ($msg:expr) => {
            if tx.send($msg).is_err() {
                return; // Receiver dropped (UI closed); exit quietly.
            }
        };
    }

    macro_rules! check_cancel {
        () => {
            if cancel.load(Ordering::SeqCst) {
                send!(FetchProgress::Cancelled);
                return;
            }
        };
    }

    send!(FetchProgress::Started);

    let client = match CoreClient::new(&params.base_url, &params.tenant_uuid, params.timeout) {
        Ok(c) => c,
        Err(e) => {
            send!(FetchProgress::Failed {
                error: e.to_string(),
            });
            return;
        }
    };

    // -------------------------------------------------------------------------
    // Phase 1: Session
    // -------------------------------------------------------------------------
    let session = match params.session {
        Some(session) => session,
        None => {
            let Some(credentials) = params.credentials else {
                send!(FetchProgress::Failed {
                    error: format!(
                        "No credentials: set {} and {} (or [api] username in config.toml).",
                        constants::ENV_USERNAME,
                        constants::ENV_PASSWORD,
                    ),
                });
                return;
            };

            check_cancel!();

            match client.login(&credentials) {
                Ok(session) => {
                    send!(FetchProgress::SignedIn {
                        session: session.clone(),
                    });
                    session
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Sign-in failed");
                    send!(FetchProgress::Failed {
                        error: e.to_string(),
                    });
                    return;
                }
            }
        }
    };

    check_cancel!();

    // -------------------------------------------------------------------------
    // Phase 2: Per-resource fetch + normalise
    // -------------------------------------------------------------------------
    let cycle_start = Instant::now();
    let mut record_id: u64 = 0;
    let mut total_records = 0usize;
    let mut skipped_records = 0usize;
    let mut resources_loaded = 0usize;
    let mut resources_failed = 0usize;
    let mut resource_summaries: Vec<ResourceSummary> = Vec::new();

    for &family in Family::all() {
        check_cancel!();

        let Some(schema) = params.schemas.iter().find(|s| s.family == family) else {
            // A family without a schema cannot be normalised at all.
            send!(FetchProgress::Warning {
                message: format!("No schema loaded for {family}; resource skipped"),
            });
            continue;
        };

        send!(FetchProgress::ResourceStarted { family });

        let mut items = match client.fetch(&session, family) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(%family, error = %e, "Resource fetch failed");
                resources_failed += 1;
                resource_summaries.push(ResourceSummary {
                    family,
                    record_count: 0,
                    skipped: 0,
                    failed: Some(e.to_string()),
                });
                send!(FetchProgress::ResourceFailed {
                    family,
                    error: e.to_string(),
                });
                continue;
            }
        };

        if items.len() > constants::MAX_RECORDS_PER_RESOURCE {
            let dropped = items.len() - constants::MAX_RECORDS_PER_RESOURCE;
            items.truncate(constants::MAX_RECORDS_PER_RESOURCE);
            send!(FetchProgress::Warning {
                message: format!(
                    "{family}: resource returned more than {} records; {dropped} dropped",
                    constants::MAX_RECORDS_PER_RESOURCE
                ),
            });
        }

        check_cancel!();

        // Optional raw dump for API debugging; failures are warnings only.
        if params.dump_raw {
            if let Some(message) = dump_raw_resource(&items, family, &params.dump_dir) {
                send!(FetchProgress::Warning { message });
            }
        }

        let raw_count = items.len();
        let payload = serde_json::Value::Array(items);
        let result = normalize::normalize_records(&payload, schema, record_id);

        record_id += result.records.len() as u64;
        total_records += result.records.len();
        skipped_records += result.skipped;
        resources_loaded += 1;

        resource_summaries.push(ResourceSummary {
            family,
            record_count: result.records.len(),
            skipped: result.skipped,
            failed: None,
        });

        tracing::debug!(
            %family,
            records = result.records.len(),
            skipped = result.skipped,
            "Resource normalised"
        );

        send!(FetchProgress::TableLoaded {
            family,
            records: result.records,
            raw_count,
            skipped: result.skipped,
        });
    }

    check_cancel!();

    let summary = FetchSummary {
        resources_attempted: Family::all().len(),
        resources_loaded,
        resources_failed,
        total_records,
        skipped_records,
        resource_summaries,
        duration: cycle_start.elapsed(),
    };

    send!(FetchProgress::Completed { summary });

    tracing::info!(
        resources = resources_loaded,
        failed = resources_failed,
        records = total_records,
        "Fetch cycle complete"
    );
}

/// Dump one resource's raw records to `<dump_dir>/<family>.csv`.
///
/// Returns a warning message on failure, `None` on success: the dump is
/// a debug aid and must never fail the cycle.
fn dump_raw_resource(
    items: &[serde_json::Value],
    family: Family,
    dump_dir: &PathBuf,
) -> Option<String> {
    let objects: Vec<crate::core::model::RawRecord> = items
        .iter()
        .filter_map(|v| match v {
            serde_json::Value::Object(map) => Some(map.clone()),
            _ => None,
        })
        .collect();

    let path = dump_dir.join(format!("{}.csv", family.schema_id()));

    if let Err(e) = std::fs::create_dir_all(dump_dir) {
        return Some(format!(
            "Cannot create dump directory '{}': {e}",
            dump_dir.display()
        ));
    }

    let file = match std::fs::File::create(&path) {
        Ok(f) => f,
        Err(e) => return Some(format!("Cannot create dump file '{}': {e}", path.display())),
    };

    match export::dump_raw_csv(&objects, file, &path) {
        Ok(count) => {
            tracing::debug!(%family, count, path = %path.display(), "Raw resource dumped");
            None
        }
        Err(e) => Some(format!("Raw dump failed: {e}")),
    }
}

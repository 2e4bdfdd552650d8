// Copyright 2024 the doorsync authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Sync orchestrator (C11, §4.11): drives one cycle end to end and exposes
//! an immutable status snapshot guarded by a mutex (§5 "Global state").

use crate::{
    applier, atomic_file, calendar_client::CalendarClient, config::Config,
    controller_client::ControllerClient,
    errors::{ErrorKind, ErrorRing}, model::{
        apply_state::ApplyState,
        mapping::Mapping,
        schedule::DisplayItem,
        snapshot::{StatusSnapshot, SyncCounts},
    }, schedule_builder, stores,
};
use chrono::{Duration, Utc};
use eyre::Report;
use log::{error, info};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};
use tokio::sync::Mutex as AsyncMutex;

pub struct Orchestrator {
    config: Config,
    calendar: CalendarClient,
    controller: ControllerClient,
    mapping_store: AsyncMutex<stores::mapping::MappingStore>,
    event_memory: AsyncMutex<crate::model::event_memory::EventMemory>,
    apply_state: AsyncMutex<ApplyState>,
    status: Mutex<StatusSnapshot>,
    running: AtomicBool,
}

impl Orchestrator {
    pub fn new(config: Config) -> Result<Self, Report> {
        let calendar = CalendarClient::new(
            config.pco_api_base_url.clone(),
            config.pco_api_token.clone(),
            std::time::Duration::from_secs(config.pco_events_cache_seconds),
            std::time::Duration::from_secs(config.pco_min_fetch_interval_seconds),
            config.pco_max_pages,
            config.pco_per_page,
            config.pco_location_must_contain.clone(),
        )?;
        let controller = ControllerClient::new(
            config.controller_api_base_url.clone(),
            config.controller_api_token.clone(),
        )?;
        let apply_state = stores::apply_state::load(&config.sync_state_file, config.apply_to_unifi)?;
        let event_memory = stores::event_memory::load(&config.event_memory_file)?;

        Ok(Self {
            config,
            calendar,
            controller,
            mapping_store: AsyncMutex::new(stores::mapping::MappingStore::default()),
            event_memory: AsyncMutex::new(event_memory),
            apply_state: AsyncMutex::new(apply_state),
            status: Mutex::new(StatusSnapshot::default()),
            running: AtomicBool::new(false),
        })
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.status.lock().unwrap().clone()
    }

    /// Persists the apply-mode flag atomically and updates the in-memory
    /// snapshot (§4.11: "Apply-mode toggle writes ApplyState atomically
    /// before returning success").
    pub async fn set_apply_mode(&self, apply_to_unifi: bool) -> Result<(), Report> {
        let state = ApplyState::new(apply_to_unifi);
        stores::apply_state::save(&self.config.sync_state_file, &state)?;
        *self.apply_state.lock().await = state;
        self.status.lock().unwrap().apply_to_unifi = apply_to_unifi;
        Ok(())
    }

    /// Runs one cycle, unless another is already in progress, in which case
    /// it returns immediately without touching any state (§5: "losers
    /// return busy rather than queueing").
    pub async fn run_once(&self) -> Result<(), Report> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(eyre::eyre!("busy"));
        }
        self.run_cycle().await;
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn run_cycle(&self) {
        let t0 = Utc::now();
        let mut errors = ErrorRing::default();

        let mapping = {
            let mut store = self.mapping_store.lock().await;
            match store.load(&self.config.mapping_file) {
                Ok(result) => {
                    for message in &result.validation_errors {
                        errors.push(ErrorKind::ConfigInvalid, message);
                    }
                    result.mapping
                }
                Err(error) => {
                    error!("cycle-fatal: {error}");
                    let mut status = self.status.lock().unwrap();
                    status.last_sync_at = Some(t0);
                    status.last_sync_result = format!("error: {error}");
                    status.errors = errors.to_vec();
                    return;
                }
            }
        };

        let (pco_ok, remote_ok) = tokio::join!(
            self.calendar.check_connectivity(),
            self.controller.check_connectivity(),
        );

        let from = t0 - Duration::hours(self.config.sync_lookbehind_hours);
        let to = t0 + Duration::hours(self.config.sync_lookahead_hours);

        let fetched = match self.calendar.get_events(from, to).await {
            Ok(events) => events,
            Err(error) => {
                errors.push(ErrorKind::UpstreamUnavailable, &error);
                let mut status = self.status.lock().unwrap();
                status.last_sync_at = Some(t0);
                status.last_sync_result = format!("error: {error}");
                status.errors = errors.to_vec();
                status.pco_status = pco_ok;
                status.remote_status = remote_ok;
                return;
            }
        };
        let fetched_count = fetched.len();

        let cancelled = match stores::cancellations::load(&self.config.cancelled_events_file) {
            Ok(c) => c,
            Err(error) => {
                errors.push(ErrorKind::StateWriteFailed, &error);
                Default::default()
            }
        };
        let not_cancelled: Vec<_> = fetched.into_iter().filter(|e| !cancelled.is_cancelled(&e.id)).collect();
        let cancelled_count = fetched_count - not_cancelled.len();

        let not_excluded: Vec<_> = not_cancelled
            .into_iter()
            .filter(|e| {
                !mapping
                    .rules
                    .exclude_events_by_room_contains
                    .iter()
                    .any(|substr| Mapping::contains_ci(&e.room, substr))
            })
            .collect();
        let excluded_count = fetched_count - cancelled_count - not_excluded.len();

        let safe_hours = stores::approval::load_safe_hours(&self.config.safe_hours_file).unwrap_or_default();
        let approved_names =
            stores::approval::load_approved_names(&self.config.approved_names_file).unwrap_or_default();
        let mut pending = stores::approval::load_pending(&self.config.pending_approvals_file).unwrap_or_default();

        let passed = stores::approval::gate(
            &not_excluded,
            &safe_hours,
            &approved_names,
            &mut pending,
            t0,
            self.config.display_timezone,
        );
        let held_count = not_excluded.len() - passed.len();
        pending.prune(t0);
        if let Err(error) = stores::approval::save_pending(&self.config.pending_approvals_file, &pending) {
            errors.push(ErrorKind::StateWriteFailed, &error);
        }

        {
            let mut memory = self.event_memory.lock().await;
            if let Err(error) =
                stores::event_memory::update_and_save(&self.config.event_memory_file, &mut memory, &not_excluded, t0)
            {
                errors.push(ErrorKind::StateWriteFailed, &error);
            }
        }

        let overrides = stores::overrides::load(&self.config.overrides_file).unwrap_or_default();
        let build_output = schedule_builder::build(&passed, &mapping, &overrides, self.config.display_timezone);

        let office_hours = stores::office_hours::load(&self.config.office_hours_file).unwrap_or_default();
        let office_hours_windows = stores::office_hours::expand(
            &office_hours,
            from.with_timezone(&self.config.display_timezone).date_naive(),
            to.with_timezone(&self.config.display_timezone).date_naive(),
            self.config.display_timezone,
        );
        let merged = applier::merge_office_hours(build_output.door_windows.clone(), office_hours_windows);
        let weekly_per_door = applier::project_all(&merged, self.config.display_timezone);

        let apply_to_unifi = self.apply_state.lock().await.apply_to_unifi;
        let apply_errors =
            applier::apply_remote(&mapping, &weekly_per_door, &self.controller, !apply_to_unifi).await;
        for (kind, detail) in &apply_errors {
            errors.push(kind.clone(), detail);
        }

        let mut status = self.status.lock().unwrap();
        status.last_sync_at = Some(t0);
        status.last_sync_result = if errors.is_empty() {
            "ok".to_string()
        } else {
            format!("ok with {} recorded error(s)", errors.to_vec().len())
        };
        status.counts = SyncCounts {
            fetched: fetched_count,
            cancelled: cancelled_count,
            excluded: excluded_count,
            passed: passed.len(),
            held: held_count,
        };
        status.errors = errors.to_vec();
        status.pco_status = pco_ok;
        status.remote_status = remote_ok;
        status.apply_to_unifi = apply_to_unifi;
        status.preview = build_output.items;

        info!(
            "sync cycle complete: fetched={} passed={} held={} errors={}",
            fetched_count,
            status.counts.passed,
            status.counts.held,
            status.errors.len()
        );
    }

    /// Read-only preview of upcoming items using a fixed 24-hour lookback,
    /// independent of the configured lookbehind. Never persists state or
    /// writes to the remote controller (§4.11).
    pub async fn get_upcoming_preview(&self) -> Result<Vec<DisplayItem>, Report> {
        let now = Utc::now();
        let mapping = {
            let mut store = self.mapping_store.lock().await;
            store.load(&self.config.mapping_file)?.mapping
        };
        let overrides = stores::overrides::load(&self.config.overrides_file).unwrap_or_default();
        let cancelled = stores::cancellations::load(&self.config.cancelled_events_file).unwrap_or_default();
        let safe_hours = stores::approval::load_safe_hours(&self.config.safe_hours_file).unwrap_or_default();
        let approved_names =
            stores::approval::load_approved_names(&self.config.approved_names_file).unwrap_or_default();
        let mut scratch_pending = stores::approval::load_pending(&self.config.pending_approvals_file).unwrap_or_default();

        let from = now - Duration::hours(24);
        let to = now + Duration::hours(self.config.sync_lookahead_hours);
        let events = self.calendar.get_events(from, to).await?;

        let not_cancelled: Vec<_> = events.into_iter().filter(|e| !cancelled.is_cancelled(&e.id)).collect();
        let not_excluded: Vec<_> = not_cancelled
            .into_iter()
            .filter(|e| {
                !mapping
                    .rules
                    .exclude_events_by_room_contains
                    .iter()
                    .any(|substr| Mapping::contains_ci(&e.room, substr))
            })
            .collect();
        let passed = stores::approval::gate(
            &not_excluded,
            &safe_hours,
            &approved_names,
            &mut scratch_pending,
            now,
            self.config.display_timezone,
        );

        let build_output = schedule_builder::build(&passed, &mapping, &overrides, self.config.display_timezone);
        let mut items: Vec<DisplayItem> = build_output.items.into_iter().filter(|i| i.end_at > now).collect();
        items.sort_by_key(|i| (i.start_at, i.door_key.clone()));
        Ok(items)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `getPreview` (§6): the preview computed by the most recent cycle,
    /// without triggering any I/O of its own.
    pub fn get_preview(&self) -> Vec<DisplayItem> {
        self.status.lock().unwrap().preview.clone()
    }

    /// `listPending` (§6).
    pub fn list_pending(&self) -> Result<Vec<crate::model::approval::PendingApproval>, Report> {
        let pending = stores::approval::load_pending(&self.config.pending_approvals_file)?;
        let mut entries: Vec<_> = pending.by_id.into_values().collect();
        entries.sort_by_key(|e| e.start_at);
        Ok(entries)
    }

    /// `approve(id)` (§6, §4.7).
    pub async fn approve(&self, event_id: &str) -> Result<bool, Report> {
        stores::approval::approve_and_save(
            &self.config.pending_approvals_file,
            &self.config.approved_names_file,
            event_id,
        )
    }

    /// `deny(id)` (§6, §4.7).
    pub async fn deny(&self, event_id: &str) -> Result<bool, Report> {
        stores::approval::deny_and_save(&self.config.pending_approvals_file, event_id)
    }

    /// `listCancelled` (§6).
    pub fn list_cancelled(&self) -> Result<Vec<crate::model::cancellations::CancelledEvent>, Report> {
        let cancellations = stores::cancellations::load(&self.config.cancelled_events_file)?;
        let mut entries: Vec<_> = cancellations.by_id.into_values().collect();
        entries.sort_by_key(|e| e.start_at);
        Ok(entries)
    }

    /// `cancel(event)` (§6, §4.6).
    pub fn cancel(&self, event: crate::model::cancellations::CancelledEvent) -> Result<(), Report> {
        stores::cancellations::cancel(&self.config.cancelled_events_file, event)
    }

    /// `restore(id)` (§6, §4.6).
    pub fn restore(&self, event_id: &str) -> Result<bool, Report> {
        stores::cancellations::restore(&self.config.cancelled_events_file, event_id)
    }

    pub fn get_mapping(&self) -> Result<Mapping, Report> {
        atomic_file::load_required(&self.config.mapping_file)
    }

    /// Validated write for `room-door-mapping.json` (§9: "an explicit
    /// validator in front of every write").
    pub fn save_mapping(&self, mapping: &Mapping) -> Result<Vec<crate::model::mapping::ValidationError>, Report> {
        stores::mapping::save_validated(&self.config.mapping_file, mapping)
    }

    pub fn get_office_hours(&self) -> Result<crate::model::office_hours::OfficeHours, Report> {
        stores::office_hours::load(&self.config.office_hours_file)
    }

    pub fn save_office_hours(&self, office_hours: &crate::model::office_hours::OfficeHours) -> Result<(), Report> {
        stores::office_hours::save(&self.config.office_hours_file, office_hours)
    }

    pub fn get_overrides(&self) -> Result<crate::model::overrides::Overrides, Report> {
        stores::overrides::load(&self.config.overrides_file)
    }

    pub fn save_overrides(&self, overrides: &crate::model::overrides::Overrides) -> Result<(), Report> {
        stores::overrides::save(&self.config.overrides_file, overrides)
    }

    pub fn get_safe_hours(&self) -> Result<crate::model::approval::SafeHours, Report> {
        stores::approval::load_safe_hours(&self.config.safe_hours_file)
    }

    pub fn save_safe_hours(&self, safe_hours: &crate::model::approval::SafeHours) -> Result<(), Report> {
        stores::approval::save_safe_hours(&self.config.safe_hours_file, safe_hours)
    }

    pub fn get_approved_names(&self) -> Result<crate::model::approval::ApprovedNames, Report> {
        stores::approval::load_approved_names(&self.config.approved_names_file)
    }

    pub fn save_approved_names(&self, approved: &crate::model::approval::ApprovedNames) -> Result<(), Report> {
        stores::approval::save_approved_names(&self.config.approved_names_file, approved)
    }
}

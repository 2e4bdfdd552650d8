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

//! Scheduler & entry points (C12, §4.12): a single in-process cron-like
//! trigger that runs [`Orchestrator::run_once`] at a configured cadence, a
//! manual trigger for the dashboard, and a delayed startup kick. Runs are
//! serialized by the orchestrator's own single-writer gate (§5); this module
//! only decides *when* to ask for a cycle, never whether one is allowed to
//! proceed.

use crate::{config::Config, orchestrator::Orchestrator};
use cron::Schedule;
use eyre::{Report, WrapErr};
use log::{info, warn};
use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration as StdDuration,
};

/// Delay before the startup kick fires, giving the HTTP listener time to
/// bind before the first cycle's logs interleave with it (§4.12: "On
/// startup, one delayed runOnce is kicked off").
const STARTUP_DELAY: StdDuration = StdDuration::from_secs(5);

pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    /// Count of triggers that found a cycle already in progress and were
    /// skipped rather than queued (§5: "losers return busy rather than
    /// queueing"; §4.12: "skipped and counted").
    skipped_ticks: AtomicU64,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            skipped_ticks: AtomicU64::new(0),
        }
    }

    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks.load(Ordering::Relaxed)
    }

    /// Spawns the periodic trigger task and the one-shot startup kick.
    /// Returns as soon as both tasks are scheduled; neither is awaited here.
    pub fn spawn(self: &Arc<Self>, config: &Config) -> Result<(), Report> {
        let cadence = Cadence::from_config(config)?;

        let startup = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(STARTUP_DELAY).await;
            startup.trigger("startup").await;
        });

        let periodic = Arc::clone(self);
        tokio::spawn(async move {
            periodic.run_forever(cadence).await;
        });

        Ok(())
    }

    async fn run_forever(&self, cadence: Cadence) {
        loop {
            tokio::time::sleep(cadence.time_until_next()).await;
            self.trigger("scheduled").await;
        }
    }

    async fn trigger(&self, origin: &str) {
        match self.orchestrator.run_once().await {
            Ok(()) => info!("{origin} sync cycle completed"),
            Err(error) if error.to_string() == "busy" => {
                self.skipped_ticks.fetch_add(1, Ordering::Relaxed);
                warn!("{origin} trigger skipped: a cycle is already in progress");
            }
            Err(error) => warn!("{origin} trigger failed: {error}"),
        }
    }

    /// The manual trigger exposed to the dashboard (§4.12, §6 `runOnce`):
    /// contends with the periodic trigger for the same gate and awaits
    /// completion before returning, rather than queueing behind it.
    pub async fn run_manual(&self) -> Result<(), Report> {
        self.orchestrator.run_once().await
    }
}

enum Cadence {
    Cron(Schedule),
    Interval(StdDuration),
}

impl Cadence {
    /// `SYNC_CRON` wins over `SYNC_INTERVAL_SECONDS` when non-empty (§6).
    fn from_config(config: &Config) -> Result<Self, Report> {
        match &config.sync_cron {
            Some(expr) => Ok(Self::Cron(parse_cron(expr)?)),
            None => Ok(Self::Interval(StdDuration::from_secs(
                config.sync_interval_seconds,
            ))),
        }
    }

    fn time_until_next(&self) -> StdDuration {
        match self {
            Self::Cron(schedule) => {
                let now = chrono::Utc::now();
                match schedule.upcoming(chrono::Utc).next() {
                    Some(next) => (next - now).to_std().unwrap_or_default(),
                    // No more matches (e.g. an expression pinned to a past
                    // year); fall back to checking again in an hour rather
                    // than busy-looping.
                    None => StdDuration::from_secs(3600),
                }
            }
            Self::Interval(duration) => *duration,
        }
    }
}

/// Parses a cron expression. Accepts the common 5-field crontab form
/// (minute hour day-of-month month day-of-week) by prepending a `0`
/// seconds field, since the `cron` crate otherwise expects Quartz-style
/// 6/7-field syntax.
fn parse_cron(expr: &str) -> Result<Schedule, Report> {
    let normalized = if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    };
    Schedule::from_str(&normalized).wrap_err_with(|| format!("parsing SYNC_CRON={expr:?}"))
}

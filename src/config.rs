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

//! Configuration (§6): environment-style key/value pairs. Loading `.env`
//! into the process environment before `Config::from_env()` runs is an
//! external collaborator's job (§1 Non-goals) — this module only reads
//! whatever is already in `std::env`.

use chrono_tz::Tz;
use eyre::{Report, WrapErr};
use std::{net::SocketAddr, path::PathBuf, str::FromStr};

#[derive(Clone, Debug)]
pub struct Config {
    pub display_timezone: Tz,

    /// Cron expression for cycle cadence; wins over `sync_interval_seconds`
    /// when non-empty (§6).
    pub sync_cron: Option<String>,
    pub sync_interval_seconds: u64,

    pub sync_lookahead_hours: i64,
    pub sync_lookbehind_hours: i64,

    pub pco_events_cache_seconds: u64,
    pub pco_min_fetch_interval_seconds: u64,
    pub pco_max_pages: u32,
    pub pco_per_page: u32,
    pub pco_location_must_contain: Option<String>,
    pub pco_api_base_url: String,
    pub pco_api_token: Option<String>,

    pub controller_api_base_url: String,
    pub controller_api_token: Option<String>,

    /// Initial apply mode, used only when no `sync-state.json` exists yet.
    pub apply_to_unifi: bool,

    pub mapping_file: PathBuf,
    pub office_hours_file: PathBuf,
    pub overrides_file: PathBuf,
    pub safe_hours_file: PathBuf,
    pub approved_names_file: PathBuf,
    pub event_memory_file: PathBuf,
    pub pending_approvals_file: PathBuf,
    pub cancelled_events_file: PathBuf,
    pub sync_state_file: PathBuf,

    pub dashboard_bind_address: SocketAddr,
    /// Shared secret the dashboard's mutating calls must present, the same
    /// pattern as the teacher's `reload_token`.
    pub dashboard_token: String,
}

impl Config {
    /// Reads every recognized option from the process environment,
    /// substituting the documented default for anything unset.
    pub fn from_env() -> Result<Config, Report> {
        let config = Self::from_env_unvalidated()?;
        url::Url::parse(&config.pco_api_base_url)
            .wrap_err_with(|| format!("PCO_API_BASE_URL={:?} is not a valid URL", config.pco_api_base_url))?;
        url::Url::parse(&config.controller_api_base_url).wrap_err_with(|| {
            format!(
                "UNIFI_API_BASE_URL={:?} is not a valid URL",
                config.controller_api_base_url
            )
        })?;
        Ok(config)
    }

    fn from_env_unvalidated() -> Result<Config, Report> {
        Ok(Config {
            display_timezone: env_parsed("DISPLAY_TIMEZONE", Tz::UTC)?,

            sync_cron: env_non_empty("SYNC_CRON"),
            sync_interval_seconds: env_parsed("SYNC_INTERVAL_SECONDS", 300)?,

            sync_lookahead_hours: env_parsed("SYNC_LOOKAHEAD_HOURS", 24 * 14)?,
            sync_lookbehind_hours: env_parsed("SYNC_LOOKBEHIND_HOURS", 24)?,

            pco_events_cache_seconds: env_parsed("PCO_EVENTS_CACHE_SECONDS", 300)?,
            pco_min_fetch_interval_seconds: env_parsed("PCO_MIN_FETCH_INTERVAL_SECONDS", 30)?,
            pco_max_pages: env_parsed("PCO_MAX_PAGES", 20)?,
            pco_per_page: env_parsed("PCO_PER_PAGE", 100)?,
            pco_location_must_contain: env_non_empty("PCO_LOCATION_MUST_CONTAIN"),
            pco_api_base_url: env_or_default(
                "PCO_API_BASE_URL",
                "https://api.planningcenteronline.com/calendar/v2",
            ),
            pco_api_token: env_non_empty("PCO_API_TOKEN"),

            controller_api_base_url: env_or_default(
                "UNIFI_API_BASE_URL",
                "https://127.0.0.1/proxy/access/api/v2",
            ),
            controller_api_token: env_non_empty("UNIFI_API_TOKEN"),

            apply_to_unifi: env_parsed("APPLY_TO_UNIFI", false)?,

            mapping_file: env_path("MAPPING_FILE", "room-door-mapping.json"),
            office_hours_file: env_path("OFFICE_HOURS_FILE", "office-hours.json"),
            overrides_file: env_path("OVERRIDES_FILE", "event-overrides.json"),
            safe_hours_file: env_path("SAFE_HOURS_FILE", "safe-hours.json"),
            approved_names_file: env_path("APPROVED_NAMES_FILE", "approved-event-names.json"),
            event_memory_file: env_path("EVENT_MEMORY_FILE", "event-memory.json"),
            pending_approvals_file: env_path("PENDING_APPROVALS_FILE", "pending-approvals.json"),
            cancelled_events_file: env_path("CANCELLED_EVENTS_FILE", "cancelled-events.json"),
            sync_state_file: env_path("SYNC_STATE_FILE", "sync-state.json"),

            dashboard_bind_address: env_parsed("DASHBOARD_BIND_ADDRESS", "0.0.0.0:3102".parse().unwrap())?,
            dashboard_token: env_or_default("DASHBOARD_TOKEN", ""),
        })
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_non_empty(key).unwrap_or_else(|| default.to_string())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    PathBuf::from(env_or_default(key, default))
}

fn env_parsed<T>(key: &str, default: T) -> Result<T, Report>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_non_empty(key) {
        Some(value) => value
            .parse()
            .wrap_err_with(|| format!("parsing {key}={value:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_uses_documented_defaults() {
        // SAFETY-free: just reads, doesn't mutate, so parallel test runs are fine as long
        // as nothing else in the suite sets these specific keys.
        let config = Config::from_env().unwrap();
        assert_eq!(config.sync_interval_seconds, 300);
        assert_eq!(config.pco_max_pages, 20);
        assert!(!config.apply_to_unifi);
    }

    #[test]
    fn invalid_numeric_env_is_an_error() {
        unsafe {
            std::env::set_var("PCO_MAX_PAGES", "not-a-number");
        }
        let result = Config::from_env();
        unsafe {
            std::env::remove_var("PCO_MAX_PAGES");
        }
        if result.is_ok() {
            bail_on_unexpected_ok();
        }
    }

    fn bail_on_unexpected_ok() {
        panic!("expected an error parsing an invalid PCO_MAX_PAGES value");
    }

    #[test]
    fn malformed_pco_base_url_is_an_error() {
        unsafe {
            std::env::set_var("PCO_API_BASE_URL", "not a url");
        }
        let result = Config::from_env();
        unsafe {
            std::env::remove_var("PCO_API_BASE_URL");
        }
        if result.is_ok() {
            bail_on_unexpected_ok();
        }
    }
}

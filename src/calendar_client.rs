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

//! Upstream calendar client (C8, §4.8, §6): fetches event instances and their
//! resource bookings for a time window, with minute-precision caching, a
//! minimum live-fetch interval, bounded pagination, and rate-limit fallback.
//!
//! The upstream contract (§6) is described only logically
//! (`listEventsInWindow`, `listResourceBookings`); there's no teacher
//! precedent for this exact shape, so the request/response DTOs below are a
//! direct, idiomatic `reqwest`+`serde` rendering of that contract rather than
//! an adaptation of an existing module (see `DESIGN.md`).

use crate::{errors::ErrorKind, model::event::Event};
use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use eyre::{Report, WrapErr};
use log::warn;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    sync::Mutex,
    time::{Duration as StdDuration, Instant},
};

type CacheKey = (DateTime<Utc>, DateTime<Utc>);

struct CacheEntry {
    events: Vec<Event>,
    fetched_at: Instant,
}

pub struct CalendarClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    cache: Mutex<HashMap<CacheKey, CacheEntry>>,
    cache_ttl: StdDuration,
    min_fetch_interval: StdDuration,
    max_pages: u32,
    per_page: u32,
    location_must_contain: Option<String>,
    fallback_returns: AtomicU64,
}

#[derive(Deserialize)]
struct EventPage {
    data: Vec<RawEventInstance>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Deserialize)]
struct RawEventInstance {
    id: String,
    name: String,
    #[serde(rename = "startAt")]
    start_at: DateTime<Utc>,
    #[serde(rename = "endAt")]
    end_at: DateTime<Utc>,
    location: String,
}

#[derive(Deserialize)]
struct ResourceBookings {
    #[serde(default)]
    rooms: Vec<String>,
}

impl CalendarClient {
    pub fn new(
        base_url: String,
        token: Option<String>,
        cache_ttl: StdDuration,
        min_fetch_interval: StdDuration,
        max_pages: u32,
        per_page: u32,
        location_must_contain: Option<String>,
    ) -> Result<Self, Report> {
        let http = Client::builder()
            .timeout(StdDuration::from_secs(15))
            .build()
            .wrap_err("building calendar HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token,
            cache: Mutex::new(HashMap::new()),
            cache_ttl,
            min_fetch_interval,
            max_pages,
            per_page,
            location_must_contain,
            fallback_returns: AtomicU64::new(0),
        })
    }

    /// Number of times a rate-limited fetch fell back to a cached window
    /// (§4.8). Exposed for the status snapshot.
    pub fn fallback_returns(&self) -> u64 {
        self.fallback_returns.load(Ordering::Relaxed)
    }

    /// A cheap reachability probe; never propagates an error, just reports
    /// whether the upstream looked reachable just now.
    pub async fn check_connectivity(&self) -> bool {
        match self.request(&format!("{}/ping", self.base_url)).await {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                warn!("calendar connectivity check failed: {error}");
                false
            }
        }
    }

    /// Fetches every event instance in `[from, to)`, truncated to minute
    /// precision for cache keying (§4.8).
    pub async fn get_events(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Event>, Report> {
        let key = (truncate_to_minute(from), truncate_to_minute(to));

        if let Some(cached) = self.fresh_cached(&key) {
            return Ok(cached);
        }

        match self.fetch_live(key.0, key.1).await {
            Ok(events) => {
                self.cache.lock().unwrap().insert(
                    key,
                    CacheEntry { events: events.clone(), fetched_at: Instant::now() },
                );
                Ok(events)
            }
            Err(error) if is_rate_limited(&error) => {
                if let Some(cache) = self.cache.lock().unwrap().get(&key) {
                    self.fallback_returns.fetch_add(1, Ordering::Relaxed);
                    Ok(cache.events.clone())
                } else {
                    Err(error).wrap_err(ErrorKind::RateLimited.to_string())
                }
            }
            Err(error) => Err(error),
        }
    }

    fn fresh_cached(&self, key: &CacheKey) -> Option<Vec<Event>> {
        let cache = self.cache.lock().unwrap();
        let entry = cache.get(key)?;
        let age = entry.fetched_at.elapsed();
        if age < self.cache_ttl || age < self.min_fetch_interval {
            Some(entry.events.clone())
        } else {
            None
        }
    }

    async fn fetch_live(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Event>, Report> {
        let mut instances = Vec::new();
        let mut page = 1;

        loop {
            if page > self.max_pages {
                warn!("calendar fetch exceeded PCO_MAX_PAGES ({}), truncating", self.max_pages);
                break;
            }

            let url = format!(
                "{}/events?from={}&to={}&page={}&per_page={}",
                self.base_url,
                from.to_rfc3339(),
                to.to_rfc3339(),
                page,
                self.per_page,
            );
            let response = self.request(&url).await?;
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                eyre::bail!("rate limited");
            }
            let page_body: EventPage = response
                .error_for_status()
                .wrap_err("calendar events request failed")?
                .json()
                .await
                .wrap_err("parsing calendar events page")?;

            let has_more = page_body.has_more;
            instances.extend(page_body.data);
            if !has_more {
                break;
            }
            page += 1;
        }

        let mut events = Vec::with_capacity(instances.len());
        for instance in instances {
            if let Some(needle) = &self.location_must_contain {
                if !instance.location.to_lowercase().contains(&needle.to_lowercase()) {
                    continue;
                }
            }
            let rooms = self.rooms_for(&instance).await;
            let rooms = if rooms.is_empty() { vec![instance.location.clone()] } else { rooms };
            for room in rooms {
                let event = Event {
                    id: instance.id.clone(),
                    name: instance.name.clone(),
                    room,
                    location_raw: instance.location.clone(),
                    start_at: instance.start_at,
                    end_at: instance.end_at,
                };
                if event.is_valid() {
                    events.push(event);
                }
            }
        }

        Ok(events)
    }

    /// Resolves the resource-booking room names for one instance. An empty
    /// result means the caller falls back to the location string; multiple
    /// rooms are expanded one-per-room at this boundary (§3, §4.8: "events
    /// have one room per mapped emission; if the event carries multiple
    /// rooms they are expanded one-per-room at the source boundary").
    async fn rooms_for(&self, instance: &RawEventInstance) -> Vec<String> {
        let url = format!("{}/events/{}/resource_bookings", self.base_url, instance.id);
        let Ok(response) = self.request(&url).await else { return Vec::new() };
        let Ok(bookings) = response.json::<ResourceBookings>().await else { return Vec::new() };
        bookings.rooms
    }

    async fn request(&self, url: &str) -> Result<reqwest::Response, Report> {
        let mut builder = self.http.get(url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder.send().await.wrap_err_with(|| format!("requesting {url}"))
    }
}

fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(instant)
}

fn is_rate_limited(error: &Report) -> bool {
    error.to_string().contains("rate limited")
        || error
            .downcast_ref::<reqwest::Error>()
            .and_then(|e| e.status())
            .is_some_and(|status| status == StatusCode::TOO_MANY_REQUESTS)
}

/// Minimum timeout floor for every network call this client makes (§5).
pub const MIN_TIMEOUT: StdDuration = StdDuration::from_secs(15);

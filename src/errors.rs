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

//! Error kinds (§7) and the bounded ring buffer the orchestrator surfaces
//! in its status snapshot, plus the thin `axum` boundary type used by the
//! dashboard-facing API (§6).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use eyre::Report;
use std::{
    collections::VecDeque,
    error::Error,
    fmt::{self, Debug, Display},
};

const RING_CAPACITY: usize = 20;

/// §7 error kinds. Every one is recorded, never propagated out of
/// `runOnce`: the orchestrator turns them into ring-buffer strings instead.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    ConfigInvalid,
    UpstreamUnavailable,
    RateLimited,
    RemoteScheduleMissing,
    RemoteWriteFailed,
    StateWriteFailed,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            Self::ConfigInvalid => "ConfigInvalid",
            Self::UpstreamUnavailable => "UpstreamUnavailable",
            Self::RateLimited => "RateLimited",
            Self::RemoteScheduleMissing => "RemoteScheduleMissing",
            Self::RemoteWriteFailed => "RemoteWriteFailed",
            Self::StateWriteFailed => "StateWriteFailed",
        };
        f.write_str(label)
    }
}

/// Fixed-capacity ring buffer of the most recent error strings (§7: "up to
/// 20 most-recent error strings"). Pushing past capacity drops the oldest.
#[derive(Clone, Debug, Default)]
pub struct ErrorRing {
    entries: VecDeque<String>,
}

impl ErrorRing {
    pub fn push(&mut self, kind: ErrorKind, detail: impl Display) {
        if self.entries.len() == RING_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(format!("{kind}: {detail}"));
    }

    /// Most-recent-first, for display.
    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().rev().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Newtype wrapper around `Report` which implements `IntoResponse`, for the
/// thin slice of the core API that is exposed over HTTP (§6).
#[derive(Debug)]
pub enum InternalError {
    Internal(Report),
    Unauthorised,
    NotFound,
    /// A cycle was already in progress (§5: "losers return busy").
    Busy,
    /// `PUT` of a mapping that failed `Mapping::validate` (§9).
    Validation(Vec<crate::model::mapping::ValidationError>),
}

impl<E: Error + Send + Sync + 'static> From<E> for InternalError {
    fn from(error: E) -> Self {
        Self::Internal(error.into())
    }
}

impl IntoResponse for InternalError {
    fn into_response(self) -> Response {
        match self {
            Self::Internal(report) => internal_error_response(report),
            Self::Unauthorised => StatusCode::UNAUTHORIZED.into_response(),
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Busy => (StatusCode::CONFLICT, "a sync cycle is already in progress").into_response(),
            Self::Validation(errors) => {
                let body = errors
                    .into_iter()
                    .map(|e| format!("{}: {}", e.field, e.reason))
                    .collect::<Vec<_>>()
                    .join("; ");
                (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
            }
        }
    }
}

/// Converts an error into an 'internal server error' response.
pub async fn internal_error<E: Display>(e: E) -> Response {
    internal_error_response(e)
}

fn internal_error_response<E: Display>(e: E) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Internal error: {e}"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_caps_at_twenty_and_keeps_most_recent_first() {
        let mut ring = ErrorRing::default();
        for i in 0..25 {
            ring.push(ErrorKind::StateWriteFailed, format!("failure {i}"));
        }
        let entries = ring.to_vec();
        assert_eq!(entries.len(), RING_CAPACITY);
        assert!(entries[0].contains("failure 24"));
        assert!(entries.last().unwrap().contains("failure 5"));
    }
}

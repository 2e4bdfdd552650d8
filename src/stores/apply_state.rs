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

//! Apply-mode state store (§3, §4.11): persisted flag controlling whether a
//! cycle issues remote writes. Missing file falls back to the configured
//! initial flag rather than a blind `Default`, per §4.11's startup rule.

use crate::model::apply_state::ApplyState;
use eyre::Report;
use std::path::Path;

pub fn load(path: &Path, initial_apply_to_unifi: bool) -> Result<ApplyState, Report> {
    if !path.exists() {
        return Ok(ApplyState::new(initial_apply_to_unifi));
    }
    crate::atomic_file::load_required(path)
}

pub fn save(path: &Path, state: &ApplyState) -> Result<(), Report> {
    crate::atomic_file::save_atomic(path, state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_configured_initial_flag() {
        let state = load(Path::new("/nonexistent/doorsync-apply-state.json"), true).unwrap();
        assert!(state.apply_to_unifi);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("doorsync-applystate-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sync-state.json");

        save(&path, &ApplyState::new(true)).unwrap();
        let reloaded = load(&path, false).unwrap();
        assert!(reloaded.apply_to_unifi);

        std::fs::remove_dir_all(&dir).ok();
    }
}

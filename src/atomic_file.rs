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

//! Shared atomic-JSON-file helpers used by every store in `stores/` (§5:
//! "Writers from both sides must use write-tmp + rename to keep readers
//! consistent").

use eyre::{Report, WrapErr};
use serde::{Serialize, de::DeserializeOwned};
use std::{
    fs::{self, File},
    path::Path,
};

/// Reads and parses a JSON file, returning `default()` if it doesn't exist
/// yet (every sync-managed file is created lazily on first write).
pub fn load_or_default<T: DeserializeOwned>(path: &Path) -> Result<T, Report>
where
    T: Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let contents = fs::read_to_string(path).wrap_err_with(|| format!("reading {path:?}"))?;
    serde_json::from_str(&contents).wrap_err_with(|| format!("parsing {path:?}"))
}

/// Reads and parses a JSON file, failing if it's missing. Used for
/// operator-facing files that a fresh install is expected to ship with a
/// starter copy of.
pub fn load_required<T: DeserializeOwned>(path: &Path) -> Result<T, Report> {
    let contents = fs::read_to_string(path).wrap_err_with(|| format!("reading {path:?}"))?;
    serde_json::from_str(&contents).wrap_err_with(|| format!("parsing {path:?}"))
}

/// Serializes `value` and writes it to `path` via write-temp-then-rename, so
/// a concurrent reader never observes a partially written file.
pub fn save_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), Report> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp_path = tmp_path_for(path);
    {
        use std::io::Write;
        let mut file = File::create(&tmp_path).wrap_err_with(|| format!("creating {tmp_path:?}"))?;
        file.write_all(json.as_bytes())
            .wrap_err_with(|| format!("writing {tmp_path:?}"))?;
        file.sync_all().wrap_err_with(|| format!("syncing {tmp_path:?}"))?;
    }
    fs::rename(&tmp_path, path)
        .wrap_err_with(|| format!("renaming {tmp_path:?} to {path:?}"))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let file_name = path
        .file_name()
        .map(|n| format!(".{}.tmp", n.to_string_lossy()))
        .unwrap_or_else(|| ".doorsync.tmp".to_string());
    path.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
    struct Example {
        value: u32,
    }

    #[test]
    fn round_trips_through_atomic_write() {
        let dir = std::env::temp_dir().join(format!("doorsync-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("example.json");

        let value = Example { value: 42 };
        save_atomic(&path, &value).unwrap();
        let loaded: Example = load_required(&path).unwrap();
        assert_eq!(loaded, value);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_loads_default() {
        let path = Path::new("/nonexistent/doorsync-missing.json");
        let loaded: Example = load_or_default(path).unwrap();
        assert_eq!(loaded, Example::default());
    }
}

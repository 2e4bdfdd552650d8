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

//! Door keys and doors (§3). `DoorKey` is a thin newtype over `String` so
//! it can be used as a map key while still reading clearly at call sites
//! (`mapping.rooms[room]` would otherwise just be `Vec<String>`).

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct DoorKey(pub String);

impl DoorKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DoorKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DoorKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DoorKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Door {
    pub door_key: DoorKey,
    pub label: String,
    pub remote_door_ids: Vec<String>,
}

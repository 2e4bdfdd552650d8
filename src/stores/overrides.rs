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

//! Override store (C4, §4.4): thin load wrapper around [`model::overrides`].

use crate::model::overrides::Overrides;
use eyre::Report;
use std::path::Path;

pub fn load(path: &Path) -> Result<Overrides, Report> {
    crate::atomic_file::load_or_default(path)
}

pub fn save(path: &Path, overrides: &Overrides) -> Result<(), Report> {
    crate::atomic_file::save_atomic(path, overrides)
}

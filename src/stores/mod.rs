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

//! Persistence wrappers (C2–C7) around the plain data types in `model::`.
//! Each submodule owns the load/save contract for one operator- or
//! sync-managed JSON file; `mapping` additionally owns the last-known-good
//! fallback required by §4.2.

pub mod apply_state;
pub mod approval;
pub mod cancellations;
pub mod event_memory;
pub mod mapping;
pub mod office_hours;
pub mod overrides;

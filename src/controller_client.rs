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

//! Remote access-controller client (§6): the thin HTTP shell around the
//! logical `listSchedules` / `updateSchedule` / `listPolicies` /
//! `createPolicy` / `deletePolicy` contract. Diffing and decision-making live
//! in [`crate::applier`]; this module only moves bytes.

use eyre::{Report, WrapErr};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

/// One `(start, end)` pair, `HH:MM:SS` in the display zone (§6).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RemoteRange {
    pub start: String,
    pub end: String,
}

/// `weekday → ranges`, keyed the same way as [`crate::weekday::to_key`].
pub type RemoteWeek = BTreeMap<String, Vec<RemoteRange>>;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RemoteSchedule {
    pub id: String,
    pub name: String,
    pub week: RemoteWeek,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RemotePolicy {
    pub id: String,
    pub name: String,
    pub schedule_id: String,
    pub resource_ids: Vec<String>,
}

pub struct ControllerClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ControllerClient {
    pub fn new(base_url: String, token: Option<String>) -> Result<Self, Report> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .wrap_err("building controller HTTP client")?;
        Ok(Self { http, base_url, token })
    }

    pub async fn check_connectivity(&self) -> bool {
        self.list_schedules().await.is_ok()
    }

    pub async fn list_schedules(&self) -> Result<Vec<RemoteSchedule>, Report> {
        self.get(&format!("{}/schedules", self.base_url)).await
    }

    pub async fn update_schedule(&self, id: &str, week: &RemoteWeek) -> Result<(), Report> {
        self.request(reqwest::Method::PUT, &format!("{}/schedules/{id}", self.base_url))
            .json(week)
            .send()
            .await
            .wrap_err_with(|| format!("updating schedule {id}"))?
            .error_for_status()
            .wrap_err_with(|| format!("updating schedule {id}"))?;
        Ok(())
    }

    pub async fn list_policies(&self) -> Result<Vec<RemotePolicy>, Report> {
        self.get(&format!("{}/policies", self.base_url)).await
    }

    pub async fn create_policy(
        &self,
        name: &str,
        schedule_id: &str,
        resource_ids: &[String],
    ) -> Result<(), Report> {
        #[derive(Serialize)]
        struct CreatePolicyRequest<'a> {
            name: &'a str,
            schedule_id: &'a str,
            resource_ids: &'a [String],
        }
        self.request(reqwest::Method::POST, &format!("{}/policies", self.base_url))
            .json(&CreatePolicyRequest { name, schedule_id, resource_ids })
            .send()
            .await
            .wrap_err_with(|| format!("creating policy {name}"))?
            .error_for_status()
            .wrap_err_with(|| format!("creating policy {name}"))?;
        Ok(())
    }

    pub async fn delete_policy(&self, id: &str) -> Result<(), Report> {
        self.request(reqwest::Method::DELETE, &format!("{}/policies/{id}", self.base_url))
            .send()
            .await
            .wrap_err_with(|| format!("deleting policy {id}"))?
            .error_for_status()
            .wrap_err_with(|| format!("deleting policy {id}"))?;
        Ok(())
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, Report> {
        self.request(reqwest::Method::GET, url)
            .send()
            .await
            .wrap_err_with(|| format!("requesting {url}"))?
            .error_for_status()
            .wrap_err_with(|| format!("requesting {url}"))?
            .json()
            .await
            .wrap_err_with(|| format!("parsing response from {url}"))
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

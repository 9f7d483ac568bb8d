//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per graph-server endpoint.
//! When API routes change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn get_home(&self) -> Response {
        self.get("/").await
    }

    pub async fn get_sync(&self) -> Response {
        self.get("/v1/graph/sync").await
    }

    /// GET /v1/graph/artists with the query string appended as-is
    pub async fn get_artists(&self, query: &str) -> Response {
        if query.is_empty() {
            self.get("/v1/graph/artists").await
        } else {
            self.get(&format!("/v1/graph/artists?{}", query)).await
        }
    }

    pub async fn get_related(&self, id: i64) -> Response {
        self.get(&format!("/v1/graph/artists/{}/related", id)).await
    }

    pub async fn get_related_raw(&self, id: &str) -> Response {
        self.get(&format!("/v1/graph/artists/{}/related", id)).await
    }

    pub async fn get_top_genres(&self) -> Response {
        self.get("/v1/graph/top-genres").await
    }

    pub async fn get_live_top_genres(&self, count: Option<usize>) -> Response {
        match count {
            Some(count) => {
                self.get(&format!("/v1/graph/top-genres/live?count={}", count))
                    .await
            }
            None => self.get("/v1/graph/top-genres/live").await,
        }
    }

    pub async fn list_jobs(&self) -> Response {
        self.get("/v1/admin/jobs").await
    }

    pub async fn trigger_job(&self, job_id: &str) -> Response {
        self.client
            .post(format!("{}/v1/admin/jobs/{}/trigger", self.base_url, job_id))
            .send()
            .await
            .expect("Request failed")
    }

    /// Current sync token reported by the server, if a graph is published
    pub async fn sync_token(&self) -> Option<String> {
        let body: Value = self.get_sync().await.json().await.expect("Invalid JSON");
        body["sync_token"].as_str().map(str::to_string)
    }

    /// Polls the job list until the job's last run is no longer running
    /// and returns its status.
    pub async fn wait_for_job(&self, job_id: &str) -> String {
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(JOB_COMPLETION_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!("Job {} did not finish within {:?}", job_id, timeout);
            }

            let jobs: Vec<Value> = self.list_jobs().await.json().await.expect("Invalid JSON");
            let job = jobs
                .iter()
                .find(|j| j["id"] == job_id)
                .unwrap_or_else(|| panic!("Job {} not listed", job_id));

            if let Some(status) = job["last_run"]["status"].as_str() {
                if !job["is_running"].as_bool().unwrap_or(false) && status != "running" {
                    return status.to_string();
                }
            }

            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

/// Reads the `x-cache` header of a graph response
pub fn cache_outcome(response: &Response) -> String {
    response
        .headers()
        .get("x-cache")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

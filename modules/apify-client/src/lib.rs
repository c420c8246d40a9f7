pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{ApiResponse, RunData};

use serde::de::DeserializeOwned;
use serde_json::Value;

const BASE_URL: &str = "https://api.apify.com/v2";

/// How many long-poll iterations to wait for a run before giving up.
/// Each iteration uses `waitForFinish=60`, so this bounds a run at ~5min.
const MAX_WAIT_POLLS: u32 = 5;

/// Client for running arbitrary marketplace scraper actors. Unlike a
/// per-actor SDK, actor ids are caller-supplied: the listing adapters own
/// which actors they call and how the dataset items are shaped.
pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_run(&self, actor_id: &str, input: &Value) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", BASE_URL, actor_id.replace('/', "~"));
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes. Uses `waitForFinish=60` for efficient
    /// long-polling, bounded by MAX_WAIT_POLLS.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        for _ in 0..MAX_WAIT_POLLS {
            let url = format!("{}/actor-runs/{}?waitForFinish=60", BASE_URL, run_id);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ApifyError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match api_resp.data.status.as_str() {
                "SUCCEEDED" => return Ok(api_resp.data),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ApifyError::RunFailed(api_resp.data.status));
                }
                _ => {
                    tracing::debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                    continue;
                }
            }
        }
        Err(ApifyError::WaitExpired {
            run_id: run_id.to_string(),
            waited_secs: MAX_WAIT_POLLS as u64 * 60,
        })
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", BASE_URL, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let items: Vec<T> = resp.json().await?;
        Ok(items)
    }

    /// Start an actor, wait for it, and return its dataset as raw JSON
    /// items. The single entry point the listing adapters use.
    pub async fn run_actor(&self, actor_id: &str, input: &Value) -> Result<Vec<Value>> {
        let run = self.start_run(actor_id, input).await?;
        tracing::debug!(actor_id, run_id = %run.id, "Actor run started");
        let finished = self.wait_for_run(&run.id).await?;
        self.get_dataset_items(&finished.default_dataset_id).await
    }
}

use super::DocumentConverter;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::CloudConvertConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const IMPORT_TASK: &str = "import-1";
const CONVERT_TASK: &str = "convert-1";
const EXPORT_TASK: &str = "export-1";

/// CloudConvert job API: upload, convert, export by URL, download
pub struct CloudConvertClient {
    client: reqwest::Client,
    config: CloudConvertConfig,
}

impl CloudConvertClient {
    pub fn new(config: CloudConvertConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::Config("Missing CLOUDCONVERT_API_KEY".to_string()))
    }

    fn jobs_url(&self) -> String {
        format!("{}/jobs", self.config.base_url.trim_end_matches('/'))
    }

    async fn create_job(&self, api_key: &str, output_format: &str) -> Result<Value> {
        let body = json!({
            "tasks": {
                IMPORT_TASK: { "operation": "import/upload" },
                CONVERT_TASK: {
                    "operation": "convert",
                    "input": IMPORT_TASK,
                    "output_format": output_format
                },
                EXPORT_TASK: { "operation": "export/url", "input": CONVERT_TASK }
            }
        });

        let response = self
            .client
            .post(self.jobs_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ConversionService(format!("Job creation request failed: {}", e)))?;

        Self::json_or_error(response, "Job creation failed").await
    }

    async fn upload(&self, job: &Value, filename: &str, bytes: Vec<u8>) -> Result<()> {
        let upload_form = &find_task(job, IMPORT_TASK)?["result"]["form"];
        let upload_url = upload_form["url"]
            .as_str()
            .ok_or_else(|| AppError::ConversionService("Upload task has no form url".to_string()))?;

        let mut form = reqwest::multipart::Form::new();
        if let Some(parameters) = upload_form["parameters"].as_object() {
            for (key, value) in parameters {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                form = form.text(key.clone(), text);
            }
        }
        form = form.part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string()),
        );

        let response = self
            .client
            .post(upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::ConversionService(format!("File upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ConversionService(format!(
                "File upload failed ({}): {}",
                status, text
            )));
        }
        Ok(())
    }

    /// Polls until the job finishes; gives up after `max_polls` checks
    async fn wait_for_job(&self, api_key: &str, job_id: &str) -> Result<Value> {
        let url = format!("{}/{}", self.jobs_url(), job_id);

        for attempt in 1..=self.config.max_polls {
            let response = self
                .client
                .get(&url)
                .bearer_auth(api_key)
                .send()
                .await
                .map_err(|e| AppError::ConversionService(format!("Status request failed: {}", e)))?;
            let job = Self::json_or_error(response, "Failed to check job status").await?;

            match job["data"]["status"].as_str() {
                Some("finished") => return Ok(job),
                Some("error") => {
                    return Err(AppError::ConversionService(format!(
                        "Job {} failed: {}",
                        job_id, job["data"]
                    )))
                }
                status => debug!(job_id, attempt, ?status, "conversion job still running"),
            }

            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }

        Err(AppError::ConversionService(format!(
            "Job {} did not finish after {} status checks",
            job_id, self.config.max_polls
        )))
    }

    async fn download(&self, job: &Value) -> Result<Vec<u8>> {
        let file_url = find_task(job, EXPORT_TASK)?["result"]["files"][0]["url"]
            .as_str()
            .ok_or_else(|| AppError::ConversionService("Export task has no file url".to_string()))?;

        let response = self
            .client
            .get(file_url)
            .send()
            .await
            .map_err(|e| AppError::ConversionService(format!("Download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ConversionService(format!(
                "Download failed ({})",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::ConversionService(format!("Download failed: {}", e)))?;
        Ok(bytes.to_vec())
    }

    async fn json_or_error(response: reqwest::Response, context: &str) -> Result<Value> {
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ConversionService(format!(
                "{} ({}): {}",
                context, status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ConversionService(format!("{}: invalid JSON: {}", context, e)))
    }
}

fn find_task<'a>(job: &'a Value, name: &str) -> Result<&'a Value> {
    job["data"]["tasks"]
        .as_array()
        .and_then(|tasks| tasks.iter().find(|t| t["name"] == name))
        .ok_or_else(|| AppError::ConversionService(format!("Job has no task named {}", name)))
}

#[async_trait]
impl DocumentConverter for CloudConvertClient {
    async fn convert(&self, filename: &str, bytes: Vec<u8>, output_format: &str) -> Result<Vec<u8>> {
        let api_key = self.api_key()?;

        let job = self.create_job(api_key, output_format).await?;
        let job_id = job["data"]["id"]
            .as_str()
            .ok_or_else(|| AppError::ConversionService("Job response has no id".to_string()))?
            .to_string();
        info!(job_id = %job_id, filename, output_format, "conversion job created");

        self.upload(&job, filename, bytes).await?;
        let finished = self.wait_for_job(api_key, &job_id).await?;
        let converted = self.download(&finished).await?;

        info!(job_id = %job_id, bytes = converted.len(), "conversion finished");
        Ok(converted)
    }
}

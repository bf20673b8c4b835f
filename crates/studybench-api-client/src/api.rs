//! Wire formats and service implementations for the Studybench API.
//!
//! The invoke and balance endpoints return typed errors the engine reacts
//! to (cooldown, insufficient credits); everything else is reported as an
//! opaque failure with the server's message where one exists.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use studybench_core::models::{
    CreditBalance, GeneratedQuestion, HistoryRecord, InvocationOutput, SourceFile, ToolKind,
    ToolOutput, ToolParams,
};
use studybench_core::{
    BalanceError, BalanceService, HistoryCommitter, InvokeError, MeteredInvoker, TextExtractor,
};

use crate::{api_prefix, ApiClient};

/// Error code the server uses for a credit rejection, regardless of status.
pub const INSUFFICIENT_CREDITS_CODE: &str = "INSUFFICIENT_CREDITS";

/// Cooldown applied when a 429 carries no usable retry hint.
pub const DEFAULT_COOLDOWN_SECS: u64 = 30;

/// Body of `POST /tools/{tool}/invoke`.
#[derive(Debug, Serialize)]
pub struct InvokeRequest<'a> {
    pub text: &'a str,
    pub parameters: &'a ToolParams,
}

/// Response of a successful invocation.
#[derive(Debug, Deserialize)]
pub struct InvokeResponse {
    #[serde(default)]
    pub output_text: Option<String>,
    #[serde(default)]
    pub questions: Option<Vec<GeneratedQuestion>>,
    #[serde(default)]
    pub credits_used: Option<i64>,
}

impl InvokeResponse {
    fn into_output(self) -> InvocationOutput {
        let output = match self.questions {
            Some(questions) if !questions.is_empty() => ToolOutput::Questions(questions),
            _ => ToolOutput::Text(self.output_text.unwrap_or_default()),
        };
        InvocationOutput {
            output,
            credits_used: self.credits_used,
        }
    }
}

/// Structured error body the API attaches to failed requests.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub remaining_seconds: Option<u64>,
    #[serde(default)]
    pub required: Option<i64>,
    #[serde(default)]
    pub available: Option<i64>,
}

/// Response of the extraction endpoints.
#[derive(Debug, Deserialize)]
pub struct ExtractResponse {
    pub text: String,
}

/// Map a failed invoke response onto the engine's error taxonomy.
///
/// `retry_after` is the parsed Retry-After header, used when the body gives
/// no cooldown of its own.
fn map_invoke_failure(
    status: StatusCode,
    retry_after: Option<u64>,
    body: ApiErrorBody,
) -> InvokeError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let remaining_seconds = body
            .remaining_seconds
            .or(retry_after)
            .unwrap_or(DEFAULT_COOLDOWN_SECS);
        return InvokeError::RateLimited { remaining_seconds };
    }
    if status == StatusCode::PAYMENT_REQUIRED
        || body.code.as_deref() == Some(INSUFFICIENT_CREDITS_CODE)
    {
        return InvokeError::InsufficientCredits {
            required: body.required.unwrap_or(0),
            available: body.available.unwrap_or(0),
        };
    }
    InvokeError::Other(
        body.message
            .unwrap_or_else(|| format!("API request failed with status {}", status)),
    )
}

fn retry_after_seconds(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[async_trait]
impl MeteredInvoker for ApiClient {
    async fn invoke(
        &self,
        tool: ToolKind,
        text: &str,
        params: &ToolParams,
    ) -> Result<InvocationOutput, InvokeError> {
        let url = self.build_url(&format!("{}/tools/{}/invoke", api_prefix(), tool.as_str()));
        let request = InvokeRequest {
            text,
            parameters: params,
        };
        let request = self.apply_auth(self.client().post(&url).json(&request));

        let response = request
            .send()
            .await
            .map_err(|e| InvokeError::Other(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_seconds(&response);
            let body: ApiErrorBody = response.json().await.unwrap_or_default();
            return Err(map_invoke_failure(status, retry_after, body));
        }

        let body: InvokeResponse = response
            .json()
            .await
            .map_err(|e| InvokeError::Other(format!("Failed to parse response as JSON: {}", e)))?;
        Ok(body.into_output())
    }
}

#[async_trait]
impl BalanceService for ApiClient {
    async fn get_balance(&self) -> Result<CreditBalance, BalanceError> {
        let url = self.build_url(&format!("{}/credits", api_prefix()));
        let request = self.apply_auth(self.client().get(&url));

        let response = request
            .send()
            .await
            .map_err(|e| BalanceError::Other(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BalanceError::Unauthorized);
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BalanceError::Other(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BalanceError::Other(format!("Failed to parse response as JSON: {}", e)))
    }
}

#[async_trait]
impl HistoryCommitter for ApiClient {
    async fn save(&self, record: &HistoryRecord) -> anyhow::Result<()> {
        let _: serde_json::Value = self
            .post_json(&format!("{}/history", api_prefix()), record)
            .await?;
        tracing::debug!(tool = %record.tool, "History entry saved");
        Ok(())
    }
}

#[async_trait]
impl TextExtractor for ApiClient {
    async fn extract_from_image(&self, file: &SourceFile) -> anyhow::Result<String> {
        self.extract(file, "image").await
    }

    async fn extract_from_document(&self, file: &SourceFile) -> anyhow::Result<String> {
        self.extract(file, "document").await
    }
}

impl ApiClient {
    async fn extract(&self, file: &SourceFile, endpoint: &str) -> anyhow::Result<String> {
        let part = reqwest::multipart::Part::bytes(file.data.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response: ExtractResponse = self
            .post_multipart(&format!("{}/extract/{}", api_prefix(), endpoint), form)
            .await?;
        Ok(response.text)
    }
}

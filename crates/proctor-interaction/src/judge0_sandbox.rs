//! Judge0 client.
//!
//! Sources and outputs travel base64-encoded. Submissions are created with
//! `wait=false` and then polled by token.

use crate::error::InteractionError;
use crate::sandbox::{CodeSandbox, PollStatus};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use proctor_core::config::SandboxConfig;
use proctor_core::execution::ExecutionResult;
use regex::Regex;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

const RAPIDAPI_HOST: &str = "judge0-ce.p.rapidapi.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

const STATUS_IN_QUEUE: u32 = 1;
const STATUS_PROCESSING: u32 = 2;
const STATUS_ACCEPTED: u32 = 3;

pub struct Judge0Sandbox {
    client: Client,
    endpoint: String,
    api_key: String,
    language_id: u32,
}

impl Judge0Sandbox {
    /// # Errors
    ///
    /// Returns `InteractionError::InvalidRequest` if the HTTP client cannot be built.
    pub fn from_config(config: &SandboxConfig) -> Result<Self, InteractionError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InteractionError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            language_id: config.language_id,
        })
    }

    /// Adds RapidAPI credentials when an api key is configured; a
    /// self-hosted Judge0 needs none.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            request
        } else {
            request
                .header("X-RapidAPI-Key", &self.api_key)
                .header("X-RapidAPI-Host", RAPIDAPI_HOST)
        }
    }
}

#[async_trait]
impl CodeSandbox for Judge0Sandbox {
    async fn submit(&self, source_code: &str) -> Result<String, InteractionError> {
        let body = SubmissionRequest {
            language_id: self.language_id,
            source_code: BASE64_STANDARD.encode(source_code),
            stdin: String::new(),
        };

        let response = self
            .authorize(self.client.post(format!("{}/submissions", self.endpoint)))
            .query(&[("base64_encoded", "true"), ("wait", "false")])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(http_error(status, text));
        }

        let created: SubmissionCreated = response.json().await.map_err(|e| {
            InteractionError::InvalidResponse(format!("submission response: {e}"))
        })?;
        created
            .token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| InteractionError::InvalidResponse("submission returned no token".into()))
    }

    async fn poll(&self, token: &str) -> Result<PollStatus, InteractionError> {
        let response = self
            .authorize(
                self.client
                    .get(format!("{}/submissions/{}", self.endpoint, token)),
            )
            .query(&[("base64_encoded", "true")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(http_error(status, text));
        }

        let submission: SubmissionResponse = response.json().await.map_err(|e| {
            InteractionError::InvalidResponse(format!("submission status: {e}"))
        })?;
        Ok(submission.into_poll_status())
    }

    async fn health(&self) -> Result<(), InteractionError> {
        let response = self
            .authorize(self.client.get(format!("{}/about", self.endpoint)))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(http_error(status, String::new()))
        }
    }
}

fn http_error(status: StatusCode, body: String) -> InteractionError {
    InteractionError::Http {
        status: status.as_u16(),
        message: if body.is_empty() {
            status.to_string()
        } else {
            body
        },
        retryable: status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
        retry_after: None,
    }
}

#[derive(Serialize)]
struct SubmissionRequest {
    language_id: u32,
    source_code: String,
    stdin: String,
}

#[derive(Deserialize)]
struct SubmissionCreated {
    token: Option<String>,
}

#[derive(Deserialize, Default)]
struct SubmissionResponse {
    #[serde(default)]
    status: Option<SubmissionStatus>,
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    /// Seconds, sent as a decimal string.
    time: Option<serde_json::Value>,
    memory: Option<u64>,
}

#[derive(Deserialize)]
struct SubmissionStatus {
    id: u32,
    #[serde(default)]
    description: String,
}

impl SubmissionResponse {
    fn into_poll_status(self) -> PollStatus {
        let (status_id, description) = match &self.status {
            Some(status) => (status.id, status.description.clone()),
            None => return PollStatus::Pending,
        };
        if matches!(status_id, STATUS_IN_QUEUE | STATUS_PROCESSING) {
            return PollStatus::Pending;
        }

        let stdout = decode_base64(self.stdout);
        let stderr = decode_base64(self.stderr);
        let compile_output = decode_base64(self.compile_output);

        let summary = stdout.as_deref().and_then(parse_test_summary);
        let all_tests_passed = summary.is_none_or(|(passed, total)| passed == total);
        let test_total = summary.map(|(_, total)| total).unwrap_or(0);

        PollStatus::Finished(ExecutionResult {
            stdout,
            stderr,
            compile_output,
            status: if description.is_empty() {
                "Unknown".to_string()
            } else {
                description
            },
            test_passed: status_id == STATUS_ACCEPTED && all_tests_passed,
            test_total,
            time: self.time.as_ref().and_then(parse_seconds),
            memory: self.memory,
        })
    }
}

/// Decodes a base64 field; text that is not valid base64 is returned as is.
fn decode_base64(value: Option<String>) -> Option<String> {
    let value = value.filter(|v| !v.is_empty())?;
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    match BASE64_STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(_) => Some(value),
    }
}

fn parse_seconds(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extracts `(passed, total)` from the harness's `"<passed>/<total> tests passed"`
/// line. The last such line wins.
pub fn parse_test_summary(stdout: &str) -> Option<(u32, u32)> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"(\d+)\s*/\s*(\d+)\s+tests passed").ok())
        .as_ref()?;

    pattern.captures_iter(stdout).last().and_then(|caps| {
        let passed = caps.get(1)?.as_str().parse().ok()?;
        let total = caps.get(2)?.as_str().parse().ok()?;
        Some((passed, total))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(text: &str) -> Option<String> {
        Some(BASE64_STANDARD.encode(text))
    }

    fn response(status_id: u32, description: &str) -> SubmissionResponse {
        SubmissionResponse {
            status: Some(SubmissionStatus {
                id: status_id,
                description: description.to_string(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_test_summary() {
        assert_eq!(
            parse_test_summary("✓ Test 1 passed\n✓ Test 2 passed\n\n2/5 tests passed\n"),
            Some((2, 5))
        );
        assert_eq!(parse_test_summary("nothing here"), None);
        assert_eq!(
            parse_test_summary("1/5 tests passed\n5/5 tests passed"),
            Some((5, 5))
        );
    }

    #[test]
    fn test_pending_statuses() {
        assert_eq!(
            response(STATUS_IN_QUEUE, "In Queue").into_poll_status(),
            PollStatus::Pending
        );
        assert_eq!(
            response(STATUS_PROCESSING, "Processing").into_poll_status(),
            PollStatus::Pending
        );
        assert_eq!(SubmissionResponse::default().into_poll_status(), PollStatus::Pending);
    }

    #[test]
    fn test_accepted_with_all_tests_passing() {
        let mut submission = response(STATUS_ACCEPTED, "Accepted");
        submission.stdout = encoded("✓ Test 1 passed\n\n5/5 tests passed\n");
        submission.time = Some(serde_json::json!("0.042"));
        submission.memory = Some(9120);

        let PollStatus::Finished(result) = submission.into_poll_status() else {
            panic!("expected finished");
        };
        assert!(result.test_passed);
        assert_eq!(result.test_total, 5);
        assert_eq!(result.status, "Accepted");
        assert_eq!(result.time, Some(0.042));
        assert_eq!(result.memory, Some(9120));
        assert!(!result.is_failure());
    }

    #[test]
    fn test_runtime_error_is_failure() {
        let mut submission = response(11, "Runtime Error (NZEC)");
        submission.stdout = encoded("\n3/5 tests passed\n");
        submission.stderr = encoded("✗ Test 4 failed: got null\n");

        let PollStatus::Finished(result) = submission.into_poll_status() else {
            panic!("expected finished");
        };
        assert!(!result.test_passed);
        assert_eq!(result.test_total, 5);
        assert_eq!(result.stderr.as_deref(), Some("✗ Test 4 failed: got null\n"));
        assert!(result.is_failure());
    }

    #[test]
    fn test_undecodable_output_is_kept_verbatim() {
        assert_eq!(
            decode_base64(Some("not base64!".into())),
            Some("not base64!".to_string())
        );
        assert_eq!(decode_base64(Some(String::new())), None);
        assert_eq!(decode_base64(None), None);
    }

    #[test]
    fn test_server_errors_are_retryable() {
        assert!(http_error(StatusCode::BAD_GATEWAY, String::new()).is_retryable());
        assert!(!http_error(StatusCode::UNPROCESSABLE_ENTITY, "bad".into()).is_retryable());
    }
}

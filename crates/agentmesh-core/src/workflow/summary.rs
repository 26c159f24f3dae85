//! Workflow summaries.
//!
//! A [`SummaryGenerator`] phrases a one-line summary of a finished run. When
//! none is configured, or it fails or returns nothing, a fixed sentence
//! built from the workflow name and result count is used instead.

use async_trait::async_trait;

use crate::config::SummaryConfig;
use crate::models::StepResult;

/// Summaries are cut to this many characters.
pub const MAX_SUMMARY_CHARS: usize = 100;

#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn generate(&self, workflow_name: &str, results: &[StepResult]) -> Result<String, String>;
}

/// Produce a summary of at most [`MAX_SUMMARY_CHARS`] characters. Never fails.
pub async fn summarize(
    generator: Option<&dyn SummaryGenerator>,
    workflow_name: &str,
    results: &[StepResult],
) -> String {
    if let Some(generator) = generator {
        match generator.generate(workflow_name, results).await {
            Ok(text) if !text.trim().is_empty() => return truncate(text.trim()),
            Ok(_) => tracing::warn!("[Summary] Empty summary for {}, using fallback", workflow_name),
            Err(e) => tracing::warn!("[Summary] Generation failed for {}: {}", workflow_name, e),
        }
    }
    fallback_summary(workflow_name, results.len())
}

pub fn fallback_summary(workflow_name: &str, result_count: usize) -> String {
    let text = match workflow_name {
        "customer_optimization" => {
            format!("Customer optimization completed with {} agent insights", result_count)
        }
        "fraud_detection" => format!(
            "Fraud assessment completed with risk analysis from {} agents",
            result_count
        ),
        "inventory_optimization" => {
            format!("Inventory optimized using {} intelligent agents", result_count)
        }
        "price_adjustment" => format!(
            "Dynamic pricing updated with insights from {} agents",
            result_count
        ),
        other => format!(
            "Workflow {} completed successfully with {} agent actions",
            other, result_count
        ),
    };
    truncate(&text)
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_SUMMARY_CHARS).collect()
}

// ─── Messages API ──────────────────────────────────────────────────────────

/// Summaries from an Anthropic-compatible Messages API.
///
/// POST {base_url}/v1/messages
/// Headers:
///   x-api-key: {api_key}
///   anthropic-version: 2023-06-01
pub struct MessagesApiSummarizer {
    client: reqwest::Client,
    config: SummaryConfig,
}

impl MessagesApiSummarizer {
    pub fn new(config: SummaryConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }

    fn prompt(workflow_name: &str, results: &[StepResult]) -> String {
        let mut rendered = serde_json::to_string_pretty(results).unwrap_or_default();
        if rendered.len() > 500 {
            let cut = (0..=500).rev().find(|i| rendered.is_char_boundary(*i)).unwrap_or(0);
            rendered.truncate(cut);
            rendered.push_str("...");
        }
        format!(
            "Summarize this workflow execution in one clear sentence.\n\
             Workflow: {}\nResults: {}\n\
             Focus on the key outcomes. Keep it under {} characters.",
            workflow_name, rendered, MAX_SUMMARY_CHARS
        )
    }
}

#[async_trait]
impl SummaryGenerator for MessagesApiSummarizer {
    async fn generate(&self, workflow_name: &str, results: &[StepResult]) -> Result<String, String> {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": 128,
            "messages": [
                { "role": "user", "content": Self::prompt(workflow_name, results) }
            ]
        });

        tracing::debug!("[Summary] Calling {} (model: {})", url, self.config.model);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("API returned {}", status));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response JSON: {}", e))?;

        let text = json
            .get("content")
            .and_then(|c| c.as_array())
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<String, String>);

    #[async_trait]
    impl SummaryGenerator for Fixed {
        async fn generate(&self, _: &str, _: &[StepResult]) -> Result<String, String> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_absent_generator_uses_fallback() {
        let summary = summarize(None, "fraud_detection", &[]).await;
        assert_eq!(summary, "Fraud assessment completed with risk analysis from 0 agents");
    }

    #[tokio::test]
    async fn test_failing_generator_uses_fallback() {
        let generator = Fixed(Err("quota exceeded".to_string()));
        let summary = summarize(Some(&generator), "inventory_optimization", &[]).await;
        assert_eq!(summary, "Inventory optimized using 0 intelligent agents");
    }

    #[tokio::test]
    async fn test_long_generated_summary_is_truncated() {
        let generator = Fixed(Ok("é".repeat(300)));
        let summary = summarize(Some(&generator), "x", &[]).await;
        assert_eq!(summary.chars().count(), MAX_SUMMARY_CHARS);
    }

    #[tokio::test]
    async fn test_blank_generated_summary_uses_fallback() {
        let generator = Fixed(Ok("   ".to_string()));
        let summary = summarize(Some(&generator), "price_adjustment", &[]).await;
        assert!(summary.starts_with("Dynamic pricing updated"));
    }

    #[test]
    fn test_fallback_for_unknown_workflow_is_bounded() {
        let name = "a".repeat(200);
        let summary = fallback_summary(&name, 3);
        assert!(summary.starts_with("Workflow aaa"));
        assert_eq!(summary.chars().count(), MAX_SUMMARY_CHARS);
    }

    #[tokio::test]
    async fn test_messages_api_unreachable_is_an_error() {
        let summarizer = MessagesApiSummarizer::new(SummaryConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "test".to_string(),
            model: "test-model".to_string(),
            timeout: std::time::Duration::from_millis(500),
        });
        assert!(summarizer.generate("fraud_detection", &[]).await.is_err());
        let summary = summarize(Some(&summarizer), "fraud_detection", &[]).await;
        assert!(summary.starts_with("Fraud assessment"));
    }
}

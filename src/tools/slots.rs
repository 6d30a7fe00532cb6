//! `get_available_slots_with_months`: proxy to the scheduling endpoint

use super::{decode_arguments, Tool, ToolError, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const MONTH_NOT_FOUND: &str = "ไม่พบเดือน";
const NOT_CONFIGURED: &str = "ระบบตรวจสอบคิวว่างยังไม่พร้อมใช้งาน";

#[derive(Debug, Deserialize)]
struct SlotsArgs {
    #[serde(default)]
    thai_month_year: String,
}

pub struct SlotsTool {
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl SlotsTool {
    pub fn new(endpoint: Option<String>, client: reqwest::Client) -> Self {
        Self { endpoint, client }
    }

    async fn fetch(&self, endpoint: &str, month: &str) -> Result<String, ToolError> {
        let upstream = |message: String| ToolError::Upstream {
            service: "scheduling endpoint",
            message,
        };

        let response = self
            .client
            .get(endpoint)
            .query(&[("sheet", month)])
            .send()
            .await
            .map_err(|e| upstream(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| upstream(e.to_string()))?;
        if !status.is_success() {
            return Err(upstream(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }
}

#[async_trait]
impl Tool for SlotsTool {
    fn name(&self) -> &'static str {
        "get_available_slots_with_months"
    }

    fn description(&self) -> &'static str {
        "List open booking slots for a month, given as Thai month name and Buddhist-era year."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["thai_month_year"],
            "properties": {
                "thai_month_year": {
                    "type": "string",
                    "description": "e.g. มกราคม 2568"
                }
            }
        })
    }

    async fn run(&self, arguments: &Value) -> ToolOutput {
        let args: SlotsArgs = match decode_arguments(arguments) {
            Ok(args) => args,
            Err(e) => return ToolOutput::error(e.to_string()),
        };
        let month = args.thai_month_year.trim();
        if month.is_empty() {
            return ToolOutput::success(MONTH_NOT_FOUND);
        }
        let Some(endpoint) = &self.endpoint else {
            return ToolOutput::error(NOT_CONFIGURED);
        };

        tracing::info!(month, "Fetching available slots");
        self.fetch(endpoint, month).await.into()
    }
}

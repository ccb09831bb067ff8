use std::convert::Infallible;

use chrono::{DateTime, Local};
use parley_types::{Tool, ToolContext, ToolDescriptor, ToolResult, ValidationError};
use serde::Deserialize;

use crate::schema::parameters_schema;

/// Registered name of [`SystemInfoTool`].
pub const SYSTEM_INFO_TOOL_NAME: &str = "system_info";

/// Arguments for [`SystemInfoTool`].
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SystemInfoArgs {
    /// Type of information to retrieve (time, location, all).
    #[serde(default = "default_info_type")]
    pub info_type: String,
}

fn default_info_type() -> String {
    "all".to_string()
}

/// Current time and timezone of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInfoTool;

impl Tool for SystemInfoTool {
    const NAME: &'static str = SYSTEM_INFO_TOOL_NAME;
    type Args = SystemInfoArgs;
    type Error = Infallible;

    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: Self::NAME.into(),
            description: "Get time and location information".into(),
            version: "1.0.0".into(),
            parameters_schema: parameters_schema::<SystemInfoArgs>(),
        }
    }

    fn validate(&self, args: &SystemInfoArgs) -> Result<(), ValidationError> {
        match args.info_type.to_ascii_lowercase().as_str() {
            "time" | "location" | "all" => Ok(()),
            other => Err(ValidationError::single(
                Self::NAME,
                "info_type",
                format!("expected time, location or all, got {other}"),
            )),
        }
    }

    async fn execute(
        &self,
        args: SystemInfoArgs,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, Infallible> {
        Ok(snapshot(&args.info_type.to_ascii_lowercase(), Local::now()))
    }
}

fn snapshot(info_type: &str, now: DateTime<Local>) -> ToolResult {
    let timezone = format!("UTC{}", now.offset());
    let local_time = now.format("%Y-%m-%d %H:%M:%S").to_string();

    let mut data = serde_json::Map::new();
    let mut lines = Vec::new();

    if matches!(info_type, "all" | "time") {
        data.insert(
            "time".into(),
            serde_json::json!({
                "current": now.to_utc().to_rfc3339(),
                "timestamp": now.timestamp_millis(),
                "timezone": timezone,
                "localTime": local_time,
            }),
        );
        lines.push(format!("The current local time is {local_time} ({timezone})."));
    }
    if matches!(info_type, "all" | "location") {
        data.insert("location".into(), serde_json::json!({ "timezone": timezone }));
        lines.push(format!("The system timezone is {timezone}."));
    }

    ToolResult::ok(serde_json::Value::Object(data), lines.join(" "))
}

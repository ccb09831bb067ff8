use std::convert::Infallible;

use parley_types::{Tool, ToolContext, ToolDescriptor, ToolResult, ValidationError};
use serde::Deserialize;

use crate::schema::parameters_schema;

/// Registered name of [`WeatherTool`].
pub const WEATHER_TOOL_NAME: &str = "weather";

/// Arguments for [`WeatherTool`].
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WeatherArgs {
    /// Location to get weather for (city name or coordinates).
    pub location: String,
    /// Units for temperature (celsius or fahrenheit).
    #[serde(default = "default_units")]
    pub units: String,
}

fn default_units() -> String {
    "celsius".to_string()
}

/// Mock weather lookup. Always reports 22°C and sunny.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherTool;

impl Tool for WeatherTool {
    const NAME: &'static str = WEATHER_TOOL_NAME;
    type Args = WeatherArgs;
    type Error = Infallible;

    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: Self::NAME.into(),
            description: "Get weather information for a location".into(),
            version: "1.0.0".into(),
            parameters_schema: parameters_schema::<WeatherArgs>(),
        }
    }

    fn validate(&self, args: &WeatherArgs) -> Result<(), ValidationError> {
        if args.location.trim().is_empty() {
            return Err(ValidationError::single(Self::NAME, "location", "must not be empty"));
        }
        match args.units.to_ascii_lowercase().as_str() {
            "celsius" | "fahrenheit" => Ok(()),
            other => Err(ValidationError::single(
                Self::NAME,
                "units",
                format!("expected celsius or fahrenheit, got {other}"),
            )),
        }
    }

    async fn execute(&self, args: WeatherArgs, _ctx: &ToolContext) -> Result<ToolResult, Infallible> {
        let units = args.units.to_ascii_lowercase();
        let (temperature, symbol) = if units == "fahrenheit" {
            (72, "°F")
        } else {
            (22, "°C")
        };
        let message = format!(
            "The weather in {} is sunny with a temperature of {temperature}{symbol}.",
            args.location
        );
        let data = serde_json::json!({
            "location": args.location,
            "temperature": temperature,
            "units": units,
            "conditions": "sunny",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        Ok(ToolResult::ok(data, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(location: &str, units: &str) -> WeatherArgs {
        WeatherArgs {
            location: location.into(),
            units: units.into(),
        }
    }

    #[tokio::test]
    async fn reports_sunny_in_celsius_by_default() {
        let parsed: WeatherArgs = serde_json::from_value(serde_json::json!({"location": "Paris"})).unwrap();
        assert_eq!(parsed.units, "celsius");

        let result = WeatherTool.execute(parsed, &ToolContext::default()).await.unwrap();
        assert!(result.success);
        assert_eq!(
            result.message,
            "The weather in Paris is sunny with a temperature of 22°C."
        );
        let data = result.data.unwrap();
        assert_eq!(data["temperature"], 22);
        assert_eq!(data["conditions"], "sunny");
    }

    #[tokio::test]
    async fn converts_to_fahrenheit() {
        let result = WeatherTool
            .execute(args("Austin", "Fahrenheit"), &ToolContext::default())
            .await
            .unwrap();
        assert!(result.message.contains("72°F"));
        assert_eq!(result.data.unwrap()["units"], "fahrenheit");
    }

    #[test]
    fn rejects_unknown_units() {
        let err = WeatherTool.validate(&args("Paris", "kelvin")).unwrap_err();
        assert_eq!(err.field_names(), vec!["units"]);
    }

    #[test]
    fn rejects_blank_location() {
        assert!(WeatherTool.validate(&args("  ", "celsius")).is_err());
    }
}

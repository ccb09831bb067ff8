use parley_types::ToolDescriptor;

/// The system instruction for a turn: the preamble, then one line per tool.
pub(crate) fn system_instruction(preamble: &str, tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return preamble.to_string();
    }
    let mut out = String::from(preamble);
    out.push_str("\n\nAvailable tools:");
    for tool in tools {
        out.push_str(&format!("\n- {}: {}", tool.name, tool.description));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, description: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.into(),
            description: description.into(),
            version: "1.0.0".into(),
            parameters_schema: serde_json::json!({"type": "object"}),
        }
    }

    #[test]
    fn lists_each_tool() {
        let text = system_instruction(
            "Be helpful.",
            &[
                descriptor("weather", "Get weather information for a location"),
                descriptor("system_info", "Get time and location information"),
            ],
        );
        assert!(text.starts_with("Be helpful."));
        assert!(text.contains("- weather: Get weather information for a location"));
        assert!(text.contains("- system_info: Get time and location information"));
    }

    #[test]
    fn no_tools_is_just_the_preamble() {
        assert_eq!(system_instruction("Be helpful.", &[]), "Be helpful.");
    }
}

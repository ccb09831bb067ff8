//! Built-in tools: weather, web search, and system information.

mod search;
mod system;
mod weather;

pub use search::*;
pub use system::*;
pub use weather::*;

use parley_types::RegistryError;

use crate::registry::ToolRegistry;

/// Names of every built-in tool, in the order [`register_builtin`] accepts them.
pub const BUILTIN_TOOLS: &[&str] = &[WEATHER_TOOL_NAME, SEARCH_TOOL_NAME, SYSTEM_INFO_TOOL_NAME];

/// Register the built-in tool called `name`, using `search` as the backend
/// for `google_search`.
///
/// Returns `Ok(false)` when `name` is not a built-in tool.
pub fn register_builtin<B: SearchBackend + 'static>(
    registry: &mut ToolRegistry,
    name: &str,
    search: B,
) -> Result<bool, RegistryError> {
    match name {
        WEATHER_TOOL_NAME => registry.register(WeatherTool)?,
        SEARCH_TOOL_NAME => registry.register(SearchTool::new(search))?,
        SYSTEM_INFO_TOOL_NAME => registry.register(SystemInfoTool)?,
        _ => return Ok(false),
    };
    Ok(true)
}

use parley_tool::*;
use parley_types::*;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn registry_with_builtins<B: SearchBackend + 'static>(search: B) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let mut backend = Some(search);
    for name in BUILTIN_TOOLS {
        // Only google_search consumes the backend; the others ignore it.
        let registered = if *name == SEARCH_TOOL_NAME {
            register_builtin(&mut registry, name, backend.take().unwrap()).unwrap()
        } else {
            register_builtin(&mut registry, name, StaticSearchBackend::default()).unwrap()
        };
        assert!(registered);
    }
    registry
}

#[test]
fn unknown_builtin_is_not_registered() {
    let mut registry = ToolRegistry::new();
    let registered = register_builtin(&mut registry, "calculator", StaticSearchBackend::default()).unwrap();
    assert!(!registered);
    assert!(registry.is_empty());
}

#[test]
fn builtin_manifest_has_versions_and_schemas() {
    let registry = registry_with_builtins(StaticSearchBackend::default());
    let manifest = registry.describe();
    assert_eq!(manifest.len(), 3);
    for descriptor in &manifest {
        assert_eq!(descriptor.version, "1.0.0");
        assert_eq!(descriptor.parameters_schema["type"], "object");
    }
    let weather = manifest.iter().find(|d| d.name == "weather").unwrap();
    assert_eq!(weather.parameters_schema["required"], serde_json::json!(["location"]));
}

#[tokio::test]
async fn weather_missing_location_is_validation_failure() {
    let registry = registry_with_builtins(StaticSearchBackend::default());
    let result = registry
        .dispatch(
            &ToolCallRequest::new("weather", serde_json::json!({ "units": "celsius" })),
            &ToolContext::default(),
        )
        .await;
    assert!(!result.success);
    assert_eq!(result.error_code(), Some("VALIDATION_ERROR"));
    assert!(result.message.contains("location"));
}

#[tokio::test]
async fn google_backend_parses_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("q", "rust async"))
        .and(query_param("num", "2"))
        .and(query_param("key", "k"))
        .and(query_param("cx", "cx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "searchInformation": { "totalResults": "1234" },
            "items": [
                { "title": "Tokio", "link": "https://tokio.rs", "snippet": "An async runtime", "displayLink": "tokio.rs" },
                { "title": "async-book", "link": "https://rust-lang.github.io/async-book", "snippet": "Async Rust", "displayLink": "rust-lang.github.io" }
            ]
        })))
        .mount(&server)
        .await;

    let backend = GoogleSearchBackend::new("k", "cx").base_url(server.uri());
    let registry = registry_with_builtins(backend);
    let result = registry
        .dispatch(
            &ToolCallRequest::new(
                "google_search",
                serde_json::json!({ "query": "rust async", "num_results": 2 }),
            ),
            &ToolContext::default(),
        )
        .await;

    assert!(result.success, "{result:?}");
    let data = result.data.unwrap();
    assert_eq!(data["total"], 1234);
    assert_eq!(data["results"][0]["displayLink"], "tokio.rs");
    assert!(result.message.contains("1. Tokio"));
    assert!(result.message.contains("2. async-book"));
}

#[tokio::test]
async fn google_backend_without_items_reports_no_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "searchInformation": { "totalResults": "0" }
        })))
        .mount(&server)
        .await;

    let backend = GoogleSearchBackend::new("k", "cx").base_url(server.uri());
    let tool = SearchTool::new(backend);
    let result = Tool::execute(
        &tool,
        SearchArgs {
            query: "zzzz".into(),
            num_results: 3,
        },
        &ToolContext::default(),
    )
    .await
    .unwrap();
    assert_eq!(result.message, "No results found");
}

#[tokio::test]
async fn google_backend_without_credentials_fails() {
    let registry = registry_with_builtins(GoogleSearchBackend::from_credentials(None, None));
    let result = registry
        .dispatch(
            &ToolCallRequest::new("google_search", serde_json::json!({ "query": "rust" })),
            &ToolContext::default(),
        )
        .await;
    assert!(!result.success);
    assert_eq!(result.error_code(), Some("GOOGLE_SEARCH_ERROR"));
    assert!(result.message.contains("Google API credentials not configured"));
}

#[tokio::test]
async fn google_backend_maps_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let backend = GoogleSearchBackend::new("k", "cx").base_url(server.uri());
    let registry = registry_with_builtins(backend);
    let result = registry
        .dispatch(
            &ToolCallRequest::new("google_search", serde_json::json!({ "query": "rust" })),
            &ToolContext::default(),
        )
        .await;
    assert!(!result.success);
    assert!(result.message.contains("403"));
}

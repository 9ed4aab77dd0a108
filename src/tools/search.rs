//! The search tool: the one concrete `Tool` implementation this crate ships,
//! wrapping the external "search provider" collaborator named in SPEC_FULL.md
//! §1. Grounded on the teacher's `tavily/mod.rs`.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ToolError;

use super::Tool;

/// The external collaborator interface: a search provider. Out of scope for
/// this spec beyond this interface; `TavilySearchProvider` is the one
/// concrete backend this crate wires up by default.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResultItem>, ToolError>;
}

#[derive(Debug, Clone)]
pub struct SearchResultItem {
    pub title: String,
    pub url: String,
    pub content: String,
}

pub struct TavilySearchProvider {
    api_key: String,
}

impl TavilySearchProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into() }
    }
}

#[async_trait]
impl SearchProvider for TavilySearchProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResultItem>, ToolError> {
        let request = tavily::SearchRequest {
            api_key: self.api_key.clone(),
            query: query.to_string(),
            search_depth: Some("basic".to_string()),
            include_answer: Some(false),
            include_images: Some(false),
            include_raw_content: Some(false),
            max_results: Some(max_results as i32),
            include_domains: None,
            exclude_domains: None,
        };

        let response = tavily::search(request)
            .await
            .map_err(|e| ToolError::ExecutionError(format!("search failed: {e}")))?;

        Ok(response
            .results
            .into_iter()
            .map(|r| SearchResultItem {
                title: r.title,
                url: r.url,
                content: r.content,
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

fn default_max_results() -> usize {
    5
}

/// The registered tool. Its schema is offered to the LLM Adaptor; `execute`
/// delegates to the configured `SearchProvider`.
pub struct SearchTool {
    provider: std::sync::Arc<dyn SearchProvider>,
}

impl SearchTool {
    pub fn new(provider: std::sync::Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Use this for anything that requires up-to-date or real-time facts."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "The search query" },
                "max_results": { "type": "integer", "description": "Maximum number of results to return", "default": 5 }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let args: SearchArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let results = self.provider.search(&args.query, args.max_results).await?;

        if results.is_empty() {
            return Ok("No results found.".to_string());
        }

        let formatted = results
            .iter()
            .map(|r| format!("- {} ({})\n  {}", r.title, r.url, r.content))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider(Vec<SearchResultItem>);

    #[async_trait]
    impl SearchProvider for StubProvider {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchResultItem>, ToolError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn execute_formats_results() {
        let provider = StubProvider(vec![SearchResultItem {
            title: "Weather in Paris".to_string(),
            url: "https://example.com".to_string(),
            content: "Sunny, 22C".to_string(),
        }]);
        let tool = SearchTool::new(std::sync::Arc::new(provider));
        let result = tool
            .execute(serde_json::json!({"query": "weather in paris"}))
            .await
            .unwrap();
        assert!(result.contains("Sunny, 22C"));
    }

    #[tokio::test]
    async fn execute_reports_no_results() {
        let provider = StubProvider(vec![]);
        let tool = SearchTool::new(std::sync::Arc::new(provider));
        let result = tool.execute(serde_json::json!({"query": "x"})).await.unwrap();
        assert_eq!(result, "No results found.");
    }

    #[tokio::test]
    async fn execute_rejects_missing_query() {
        let provider = StubProvider(vec![]);
        let tool = SearchTool::new(std::sync::Arc::new(provider));
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}

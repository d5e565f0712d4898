//! The `HTTP` node: issues one outbound request per invocation.
//!
//! `config` (already variable-resolved by `executeWithTimeout`): `url`
//! (required, enforced by validation), `method` (default `GET`), `headers`
//! (object of string→string), `body` (arbitrary JSON, sent as the request
//! body for methods that carry one).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use loom_core::{LoomError, NodeType};
use loom_execution::{ExecutionContext, NodeResult};
use loom_executor::Executor;
use loom_graph::{InDegreeMap, Node};
use reqwest::Method;
use serde_json::Value;

pub struct HttpExecutor {
    client: reqwest::Client,
}

impl Default for HttpExecutor {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    fn supported_type(&self) -> NodeType {
        NodeType::Http
    }

    async fn execute(&self, node: &Node, _context: &ExecutionContext) -> Result<NodeResult, LoomError> {
        let start = Utc::now();
        let url = node
            .config_str("url")
            .ok_or_else(|| LoomError::node_execution("HTTP node is missing a resolved 'url'").with_node(node.id.clone()))?;
        let method = node
            .config_str("method")
            .map(str::to_uppercase)
            .unwrap_or_else(|| "GET".to_string());
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| LoomError::node_execution(format!("invalid HTTP method: {e}")).with_node(node.id.clone()))?;

        let mut request = self.client.request(method, url).timeout(Duration::from_millis(node.effective_timeout_ms()));

        if let Some(Value::Object(headers)) = node.config_value("headers") {
            for (key, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(key.as_str(), value);
                }
            }
        }
        if let Some(body) = node.config_value("body") {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LoomError::node_execution(format!("HTTP request failed: {e}")).with_node(node.id.clone()))?;
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        let mut output = HashMap::new();
        output.insert("status".to_string(), Value::from(status));
        output.insert("body".to_string(), body);
        let end = Utc::now();
        Ok(NodeResult::success(node.id.clone(), output, start, end, 0))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as Map;

    use loom_core::{ExecutionId, NodeId, TenantId, WorkflowId};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(
            ExecutionId::new("wf-abcd1234").unwrap(),
            WorkflowId::new("wf").unwrap(),
            TenantId::new("acme").unwrap(),
            Map::new(),
            Map::new(),
            InDegreeMap::restore_from_snapshot(&HashMap::new()),
            Utc::now(),
        )
    }

    fn node(url: &str) -> Node {
        Node {
            id: NodeId::new("fetch").unwrap(),
            node_type: NodeType::Http,
            name: "fetch".to_string(),
            config: Map::from([("url".to_string(), Value::from(url))]),
            retry_count: 0,
            timeout_ms: 5_000,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn fetches_and_parses_a_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
            .mount(&server)
            .await;

        let url = format!("{}/users/1", server.uri());
        let result = HttpExecutor::default().execute(&node(&url), &ctx()).await.unwrap();
        assert_eq!(result.output["status"], Value::from(200));
        assert_eq!(result.output["body"]["id"], Value::from(1));
    }

    #[tokio::test]
    async fn missing_url_is_a_setup_error_not_a_failed_result() {
        let n = Node {
            config: Map::new(),
            ..node("unused")
        };
        assert!(HttpExecutor::default().execute(&n, &ctx()).await.is_err());
    }
}

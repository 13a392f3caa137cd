//! reqwest-backed [`CccApi`] implementation.

use super::routes::{Method, Route, RouteTable};
use super::CccApi;
use crate::error::{CccError, CccResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

const AUTH_PATH: &str = "/dna/system/api/v1/auth/token";
const AUTH_HEADER: &str = "X-Auth-Token";

/// Connection settings for [`HttpClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default = "default_verify")]
    pub verify: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    443
}

fn default_verify() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    60
}

impl ClientConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: username.into(),
            password: password.into(),
            verify: default_verify(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Base URL, e.g. `https://10.0.0.10:443`.
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }
}

/// HTTPS client that authenticates with a token and dispatches through a
/// [`RouteTable`].
pub struct HttpClient {
    config: ClientConfig,
    http: reqwest::Client,
    routes: RouteTable,
    token: RwLock<Option<String>>,
}

#[derive(Deserialize)]
struct TokenReply {
    #[serde(rename = "Token")]
    token: String,
}

impl HttpClient {
    /// Builds a client with the standard route table.
    pub fn new(config: ClientConfig) -> CccResult<Self> {
        Self::with_routes(config, RouteTable::standard())
    }

    pub fn with_routes(config: ClientConfig, routes: RouteTable) -> CccResult<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CccError::transport("client", "build", e.to_string()))?;
        Ok(Self {
            config,
            http,
            routes,
            token: RwLock::new(None),
        })
    }

    async fn authenticate(&self) -> CccResult<String> {
        let url = format!("{}{}", self.config.base_url(), AUTH_PATH);
        let reply = self
            .http
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(|e| CccError::Auth {
                message: e.to_string(),
            })?;
        if !reply.status().is_success() {
            return Err(CccError::Auth {
                message: format!("HTTP {}", reply.status().as_u16()),
            });
        }
        let token: TokenReply = reply.json().await.map_err(|e| CccError::Auth {
            message: e.to_string(),
        })?;
        *self.token.write().await = Some(token.token.clone());
        debug!(host = %self.config.host, "Obtained auth token");
        Ok(token.token)
    }

    async fn token(&self) -> CccResult<String> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }
        self.authenticate().await
    }

    async fn send(
        &self,
        family: &str,
        function: &str,
        route: &Route,
        params: &Value,
        token: &str,
    ) -> CccResult<reqwest::Response> {
        let request = build_request(route, params)?;
        let url = format!("{}{}", self.config.base_url(), request.path);
        let builder = match route.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Put => self.http.put(&url),
            Method::Delete => self.http.delete(&url),
        };
        let mut builder = builder.header(AUTH_HEADER, token).query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
            .send()
            .await
            .map_err(|e| CccError::transport(family, function, e.to_string()))
    }
}

#[async_trait]
impl CccApi for HttpClient {
    #[instrument(skip(self, params), fields(host = %self.config.host))]
    async fn invoke(
        &self,
        family: &str,
        function: &str,
        params: &Value,
        op_modifies: bool,
    ) -> CccResult<Value> {
        let route = self
            .routes
            .get(family, function)
            .ok_or_else(|| CccError::UnknownFunction {
                family: family.to_string(),
                function: function.to_string(),
            })?
            .clone();

        let token = self.token().await?;
        let mut reply = self.send(family, function, &route, params, &token).await?;

        if reply.status().as_u16() == 401 {
            warn!(family, function, "Token rejected, re-authenticating");
            let token = self.authenticate().await?;
            reply = self.send(family, function, &route, params, &token).await?;
        }

        let status = reply.status();
        let text = reply
            .text()
            .await
            .map_err(|e| CccError::transport(family, function, e.to_string()))?;
        if !status.is_success() {
            return Err(CccError::http(family, function, status.as_u16(), text));
        }

        debug!(family, function, op_modifies, status = status.as_u16(), "API call complete");
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| CccError::decode(format!("{}.{}", family, function), e.to_string()))
    }
}

/// A route with its placeholders filled and params split into query or body.
#[derive(Debug, PartialEq)]
struct PreparedRequest {
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

/// Fills path placeholders from `params` and places the rest.
///
/// For body-carrying verbs a `payload` member (if present) becomes the body
/// verbatim; otherwise the remaining params object is the body. For other
/// verbs the remaining scalar params become query parameters, with arrays
/// joined by commas.
fn build_request(route: &Route, params: &Value) -> CccResult<PreparedRequest> {
    let empty = Map::new();
    let obj = match params {
        Value::Object(obj) => obj,
        Value::Null => &empty,
        _ => return Err(CccError::invalid_parameter("params must be an object")),
    };

    let mut path = route.path.to_string();
    let placeholders = route.path_params();
    for name in &placeholders {
        let value = obj
            .get(*name)
            .and_then(scalar_to_string)
            .ok_or_else(|| CccError::invalid_parameter(format!("missing path parameter '{}'", name)))?;
        path = path.replace(&format!("{{{}}}", name), &value);
    }

    let rest = obj
        .iter()
        .filter(|(k, v)| !placeholders.iter().any(|p| *p == k.as_str()) && !v.is_null());

    if route.method.has_body() {
        let body = match obj.get("payload") {
            Some(payload) => payload.clone(),
            None => Value::Object(rest.map(|(k, v)| (k.clone(), v.clone())).collect()),
        };
        return Ok(PreparedRequest {
            path,
            query: Vec::new(),
            body: Some(body),
        });
    }

    let query = rest
        .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), s)))
        .collect();
    Ok(PreparedRequest {
        path,
        query,
        body: None,
    })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
            Some(parts.join(","))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_get_params_become_query() {
        let route = Route::new(Method::Get, "/dna/intent/api/v1/network-device");
        let req = build_request(
            &route,
            &json!({"managementIpAddress": ["10.0.0.1", "10.0.0.2"], "offset": 1, "hostname": null}),
        )
        .unwrap();
        assert_eq!(req.path, "/dna/intent/api/v1/network-device");
        assert_eq!(
            req.query,
            vec![
                ("managementIpAddress".to_string(), "10.0.0.1,10.0.0.2".to_string()),
                ("offset".to_string(), "1".to_string()),
            ]
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn test_path_placeholder_filled() {
        let route = Route::new(Method::Delete, "/dna/intent/api/v1/sda/anycastGateways/{id}");
        let req = build_request(&route, &json!({"id": "gw-1"})).unwrap();
        assert_eq!(req.path, "/dna/intent/api/v1/sda/anycastGateways/gw-1");
        assert!(req.query.is_empty());
    }

    #[test]
    fn test_missing_placeholder_is_error() {
        let route = Route::new(Method::Get, "/dna/intent/api/v1/task/{task_id}");
        assert!(matches!(
            build_request(&route, &json!({})),
            Err(CccError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_payload_becomes_body() {
        let route = Route::new(Method::Post, "/dna/intent/api/v1/sda/layer3VirtualNetworks");
        let req = build_request(&route, &json!({"payload": [{"virtualNetworkName": "VN1"}]})).unwrap();
        assert_eq!(req.body, Some(json!([{"virtualNetworkName": "VN1"}])));
    }

    #[test]
    fn test_body_without_payload_uses_params() {
        let route = Route::new(Method::Put, "/dna/intent/api/v1/authentication-policy-servers/{id}");
        let req = build_request(&route, &json!({"id": "s1", "port": 49})).unwrap();
        assert_eq!(req.path, "/dna/intent/api/v1/authentication-policy-servers/s1");
        assert_eq!(req.body, Some(json!({"port": 49})));
    }

    #[test]
    fn test_base_url() {
        let cfg = ClientConfig::new("ccc.example.com", "admin", "pw").with_port(8443);
        assert_eq!(cfg.base_url(), "https://ccc.example.com:8443");
    }
}

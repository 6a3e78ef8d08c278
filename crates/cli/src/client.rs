//! API client for communicating with the balancer

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use url::Url;

/// API client for the balancer HTTP API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        // Keep any path prefix when joining relative endpoints
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)
        } else {
            Url::parse(&format!("{}/", base_url))
        }
        .context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Build an endpoint URL; each segment is percent-encoded on its own
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            anyhow::bail!("Invalid path segment: {:?}", bad);
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn route(&self) -> Result<RouteResponse> {
        self.get(&["route"]).await
    }

    pub async fn predict(&self) -> Result<PredictResponse> {
        self.get(&["predict"]).await
    }

    pub async fn record_traffic(&self, value: f64) -> Result<TrafficResponse> {
        self.post(&["traffic"], &TrafficRequest { value }).await
    }

    pub async fn servers(&self) -> Result<ServerList> {
        self.get(&["servers"]).await
    }

    pub async fn server(&self, id: &str) -> Result<ServerMetrics> {
        self.get(&["servers", id]).await
    }

    pub async fn report_metrics(&self, id: &str, report: &MetricsReport) -> Result<ServerMetrics> {
        self.post(&["servers", id, "metrics"], report).await
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary> {
        self.get(&["dashboard_data"]).await
    }

    pub async fn simulate_spike(&self) -> Result<SpikeResponse> {
        self.post(&["simulate_spike"], &serde_json::json!({})).await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub server: String,
    pub strategy: String,
    pub mode: String,
    pub predicted_traffic: f64,
    pub current_traffic: f64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub current_traffic: f64,
    pub predicted_traffic: f64,
    pub traffic_spike_detected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficRequest {
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficResponse {
    pub recorded: f64,
    pub spike: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikeResponse {
    pub message: String,
    pub new_traffic: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerMetrics {
    pub server_id: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub response_time: f64,
    pub error_rate: f64,
    pub request_rate: f64,
    pub health_score: f64,
    pub last_update: i64,
}

/// Server snapshots in the order the balancer sent them
///
/// The wire format is a JSON object keyed by server id.
#[derive(Debug, Clone, Default)]
pub struct ServerList(pub Vec<ServerMetrics>);

impl ServerList {
    pub fn get(&self, server_id: &str) -> Option<&ServerMetrics> {
        self.0.iter().find(|m| m.server_id == server_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerMetrics> {
        self.0.iter()
    }
}

impl Serialize for ServerList {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for metrics in &self.0 {
            map.serialize_entry(&metrics.server_id, metrics)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ServerList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ServerListVisitor;

        impl<'de> Visitor<'de> for ServerListVisitor {
            type Value = ServerList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of server id to metrics")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<ServerList, A::Error> {
                let mut servers = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((_, metrics)) = access.next_entry::<String, ServerMetrics>()? {
                    servers.push(metrics);
                }
                Ok(ServerList(servers))
            }
        }

        deserializer.deserialize_map(ServerListVisitor)
    }
}

/// Metrics reported for one server; omitted fields count as zero
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsReport {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub response_time: f64,
    pub error_rate: f64,
    pub request_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub server_id: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub response_time: f64,
    pub error_rate: f64,
    pub request_rate: f64,
    pub health_score: f64,
    pub risk_level: String,
    pub overloaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub current_traffic: f64,
    pub predicted_traffic: f64,
    pub traffic_spike: bool,
    pub healthy_servers: usize,
    pub total_servers: usize,
    pub servers: Vec<ServerStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_A: &str = r#"{
        "server_id": "A",
        "cpu_usage": 0.1,
        "memory_usage": 0.2,
        "response_time": 0.1,
        "error_rate": 0.0,
        "request_rate": 100.0,
        "health_score": 92.25,
        "last_update": 1704283200
    }"#;

    #[test]
    fn test_invalid_api_url() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_route() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/route")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"server":"A","strategy":"predictive_load_balancing","mode":"predictive",
                    "predicted_traffic":120.0,"current_traffic":100.0,"message":"Request routed to A"}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let route = tokio_test::assert_ok!(client.route().await);

        assert_eq!(route.server, "A");
        assert_eq!(route.mode, "predictive");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_server_error_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/route")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"No healthy servers available"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = tokio_test::assert_err!(client.route().await).to_string();

        assert!(err.contains("503"));
        assert!(err.contains("No healthy servers available"));
    }

    #[tokio::test]
    async fn test_record_traffic_posts_value() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/traffic")
            .match_body(mockito::Matcher::Json(serde_json::json!({ "value": 250.0 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"recorded":250.0,"spike":true}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client.record_traffic(250.0).await.unwrap();

        assert!(response.spike);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_servers_and_single_server() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/servers")
            .with_status(200)
            .with_body(format!(r#"{{"A": {}}}"#, SERVER_A))
            .create_async()
            .await;
        server
            .mock("GET", "/servers/A")
            .with_status(200)
            .with_body(SERVER_A)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let servers = client.servers().await.unwrap();
        assert_eq!(servers.get("A").unwrap().health_score, 92.25);

        let a = client.server("A").await.unwrap();
        assert_eq!(a.request_rate, 100.0);
    }

    #[tokio::test]
    async fn test_servers_keep_balancer_order() {
        let mut server = mockito::Server::new_async().await;
        let entry = |id: &str| SERVER_A.replace(r#""A""#, &format!(r#""{}""#, id));
        server
            .mock("GET", "/servers")
            .with_status(200)
            .with_body(format!(
                r#"{{"server2": {}, "server10": {}, "server1": {}}}"#,
                entry("server2"),
                entry("server10"),
                entry("server1")
            ))
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let servers = client.servers().await.unwrap();
        let ids: Vec<&str> = servers.iter().map(|m| m.server_id.as_str()).collect();
        assert_eq!(ids, vec!["server2", "server10", "server1"]);

        let json = serde_json::to_string(&servers).unwrap();
        assert!(json.find("server2").unwrap() < json.find("server10").unwrap());
    }

    #[tokio::test]
    async fn test_server_id_is_a_single_path_segment() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/servers/a%2Fb%3Fx%23y")
            .with_status(200)
            .with_body(SERVER_A)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        tokio_test::assert_ok!(client.server("a/b?x#y").await);
        mock.assert_async().await;
    }

    #[test]
    fn test_dot_segments_are_rejected() {
        let client = ApiClient::new("http://localhost:5000").unwrap();
        assert!(client.endpoint(&["servers", ".."]).is_err());
        assert!(client.endpoint(&["servers", "."]).is_err());
        assert!(client.endpoint(&["servers", ""]).is_err());
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let client = ApiClient::new("http://localhost:5000/lb").unwrap();
        let url = client.endpoint(&["servers", "A", "metrics"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/lb/servers/A/metrics");
    }

    #[tokio::test]
    async fn test_report_metrics() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/servers/A/metrics")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({ "cpu_usage": 0.1, "request_rate": 100.0 }),
            ))
            .with_status(200)
            .with_body(SERVER_A)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let report = MetricsReport {
            cpu_usage: 0.1,
            memory_usage: 0.2,
            response_time: 0.1,
            error_rate: 0.0,
            request_rate: 100.0,
        };
        let stored = client.report_metrics("A", &report).await.unwrap();

        assert_eq!(stored.server_id, "A");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_dashboard_with_unreported_server() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/dashboard_data")
            .with_status(200)
            .with_body(
                r#"{"current_traffic":100.0,"predicted_traffic":130.0,"traffic_spike":false,
                    "healthy_servers":0,"total_servers":1,
                    "servers":[{"server_id":"C","cpu_usage":0.0,"memory_usage":0.0,
                        "response_time":0.0,"error_rate":0.0,"request_rate":0.0,
                        "health_score":0.0,"risk_level":"unknown","overloaded":true}]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let summary = client.dashboard().await.unwrap();

        assert_eq!(summary.total_servers, 1);
        assert_eq!(summary.servers[0].last_update, None);
        assert!(summary.servers[0].overloaded);
    }
}

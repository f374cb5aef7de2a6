//! Reqwest-backed implementation of [`TransitBackend`].
//!
//! Two clients with different timeouts: lookups stay snappy, routing is
//! allowed to take longer.  A timeout is a failure; nothing here retries.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use wf_dialogue::Coordinates;
use wf_domain::config::BackendConfig;
use wf_domain::error::{Error, Result};

use super::{
    CommutePlan, CommutePlanRequest, GeocodeHit, ServiceArrivals, SuggestedRoute, TransitBackend,
};

pub struct HttpTransitBackend {
    base_url: String,
    lookup: reqwest::Client,
    routing: reqwest::Client,
}

impl HttpTransitBackend {
    pub fn new(cfg: &BackendConfig) -> Result<Self> {
        let lookup = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.lookup_timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        let routing = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.routing_timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            lookup,
            routing,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn with_auth(builder: reqwest::RequestBuilder, auth_token: Option<&str>) -> reqwest::RequestBuilder {
    match auth_token {
        Some(token) => builder.header("Authorization", token),
        None => builder,
    }
}

fn map_err(endpoint: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("{endpoint}: {e}"))
    } else {
        Error::Backend {
            endpoint: endpoint.to_owned(),
            message: e.to_string(),
        }
    }
}

async fn check_status(endpoint: &str, resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::warn!(endpoint, %status, body = %body.chars().take(200).collect::<String>(), "backend returned an error");
    Err(Error::Backend {
        endpoint: endpoint.to_owned(),
        message: format!("HTTP {status}"),
    })
}

#[async_trait::async_trait]
impl TransitBackend for HttpTransitBackend {
    async fn geocode(
        &self,
        location_name: &str,
        auth_token: Option<&str>,
    ) -> Result<Vec<GeocodeHit>> {
        const ENDPOINT: &str = "/api/geocode";
        let req = self
            .lookup
            .get(self.url(ENDPOINT))
            .query(&[("locationName", location_name)]);
        let resp = with_auth(req, auth_token)
            .send()
            .await
            .map_err(|e| map_err(ENDPOINT, e))?;
        let resp = check_status(ENDPOINT, resp).await?;

        let body: Value = resp.json().await.map_err(|e| map_err(ENDPOINT, e))?;
        let hits = body
            .get("results")
            .cloned()
            .unwrap_or(Value::Array(vec![]));
        serde_json::from_value(hits).map_err(|e| Error::Backend {
            endpoint: ENDPOINT.into(),
            message: format!("malformed results: {e}"),
        })
    }

    async fn routes(
        &self,
        start: Coordinates,
        end: Coordinates,
        auth_token: Option<&str>,
    ) -> Result<Vec<SuggestedRoute>> {
        const ENDPOINT: &str = "/api/routing";
        let payload = serde_json::json!({
            "startCoordinates": format!("{},{}", start.latitude, start.longitude),
            "endCoordinates": format!("{},{}", end.latitude, end.longitude),
        });
        let req = self.routing.post(self.url(ENDPOINT)).json(&payload);
        let resp = with_auth(req, auth_token)
            .send()
            .await
            .map_err(|e| map_err(ENDPOINT, e))?;
        let resp = check_status(ENDPOINT, resp).await?;

        let body: Value = resp.json().await.map_err(|e| map_err(ENDPOINT, e))?;
        let routes = body
            .get("suggestedRoutes")
            .cloned()
            .unwrap_or(Value::Array(vec![]));
        serde_json::from_value(routes).map_err(|e| Error::Backend {
            endpoint: ENDPOINT.into(),
            message: format!("malformed suggestedRoutes: {e}"),
        })
    }

    async fn bus_arrivals(
        &self,
        stop_query: &str,
        service_no: Option<&str>,
        auth_token: Option<&str>,
    ) -> Result<Vec<ServiceArrivals>> {
        const ENDPOINT: &str = "/api/bus/arrivals";
        let mut query: Vec<(&str, &str)> = vec![("busStopQuery", stop_query)];
        if let Some(service) = service_no {
            query.push(("serviceNo", service));
        }
        let req = self.lookup.get(self.url(ENDPOINT)).query(&query);
        let resp = with_auth(req, auth_token)
            .send()
            .await
            .map_err(|e| map_err(ENDPOINT, e))?;
        let resp = check_status(ENDPOINT, resp).await?;

        resp.json().await.map_err(|e| map_err(ENDPOINT, e))
    }

    async fn saved_locations(&self, auth_token: Option<&str>) -> Result<HashMap<String, i64>> {
        const ENDPOINT: &str = "/api/user/saved-locations";
        let req = self.lookup.get(self.url(ENDPOINT));
        let resp = with_auth(req, auth_token)
            .send()
            .await
            .map_err(|e| map_err(ENDPOINT, e))?;
        let resp = check_status(ENDPOINT, resp).await?;

        let body: Value = resp.json().await.map_err(|e| map_err(ENDPOINT, e))?;
        let mut map = HashMap::new();
        if let Some(items) = body.as_array() {
            for item in items {
                let name = item.get("name").and_then(Value::as_str);
                let id = item.get("id").and_then(Value::as_i64);
                if let (Some(name), Some(id)) = (name, id) {
                    map.insert(name.to_owned(), id);
                }
            }
        }
        Ok(map)
    }

    async fn create_commute_plan(
        &self,
        plan: &CommutePlanRequest,
        auth_token: Option<&str>,
    ) -> Result<CommutePlan> {
        const ENDPOINT: &str = "/api/user/commute-plans";
        let req = self.lookup.post(self.url(ENDPOINT)).json(plan);
        let resp = with_auth(req, auth_token)
            .send()
            .await
            .map_err(|e| map_err(ENDPOINT, e))?;
        let resp = check_status(ENDPOINT, resp).await?;

        resp.json().await.map_err(|e| map_err(ENDPOINT, e))
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GeocoderConfig;
use crate::models::geo::GeoPoint;
use crate::upstream::{GeoResolver, UpstreamError};

const GEOCODE_PATH: &str = "/3.0/items/geocode";
const DISTANCE_MATRIX_PATH: &str = "/get_dist_matrix";

/// Catalog (geocoding) and routing (distance matrix) APIs of a 2GIS-style provider.
#[derive(Clone)]
pub struct HttpGeoResolver {
    client: reqwest::Client,
    config: GeocoderConfig,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    meta: GeocodeMeta,
    #[serde(default)]
    result: Option<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeMeta {
    code: u16,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    items: Vec<GeocodeItem>,
}

#[derive(Debug, Deserialize)]
struct GeocodeItem {
    address_name: Option<String>,
    full_name: Option<String>,
    point: Option<GeoPoint>,
}

#[derive(Debug, Serialize)]
struct DistanceRequest {
    points: [GeoPoint; 2],
    sources: [usize; 1],
    targets: [usize; 1],
    #[serde(rename = "type")]
    route_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct DistanceResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    distance: f64,
    #[serde(default)]
    status: Option<String>,
}

impl HttpGeoResolver {
    pub fn new(client: reqwest::Client, config: GeocoderConfig) -> Self {
        Self { client, config }
    }

    fn catalog_url(&self) -> String {
        format!(
            "{}{GEOCODE_PATH}",
            self.config.catalog_base_url.trim_end_matches('/')
        )
    }

    fn routing_url(&self) -> String {
        format!(
            "{}{DISTANCE_MATRIX_PATH}",
            self.config.routing_base_url.trim_end_matches('/')
        )
    }

    async fn first_geocode_item(
        &self,
        params: &[(&str, String)],
    ) -> Result<GeocodeItem, UpstreamError> {
        let response: GeocodeResponse = self
            .client
            .get(self.catalog_url())
            .query(params)
            .send()
            .await?
            .json()
            .await?;

        match response.meta.code {
            404 => return Err(UpstreamError::NotFound),
            code if code >= 400 => {
                return Err(UpstreamError::BadUpstream(format!(
                    "geocoder returned status {code}"
                )));
            }
            _ => {}
        }

        // only the best match is used
        response
            .result
            .and_then(|result| result.items.into_iter().next())
            .ok_or(UpstreamError::NotFound)
    }
}

#[async_trait]
impl GeoResolver for HttpGeoResolver {
    async fn resolve_address(&self, point: GeoPoint) -> Result<String, UpstreamError> {
        if point.has_zero_coordinate() {
            return Err(UpstreamError::ZeroCoordinate);
        }

        let item = self
            .first_geocode_item(&[
                ("lat", point.lat.to_string()),
                ("lon", point.lon.to_string()),
                ("key", self.config.catalog_api_key.clone()),
                ("fields", "items.point".to_string()),
            ])
            .await?;

        item.address_name
            .or(item.full_name)
            .ok_or(UpstreamError::NotFound)
    }

    async fn resolve_coordinates(&self, query: &str) -> Result<GeoPoint, UpstreamError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(UpstreamError::EmptyQuery);
        }

        let item = self
            .first_geocode_item(&[
                ("q", query.to_string()),
                ("key", self.config.catalog_api_key.clone()),
                ("fields", "items.point".to_string()),
            ])
            .await?;

        item.point.ok_or(UpstreamError::NotFound)
    }

    async fn distance(&self, from: GeoPoint, to: GeoPoint) -> Result<f64, UpstreamError> {
        if from.has_zero_coordinate() || to.has_zero_coordinate() {
            return Err(UpstreamError::ZeroCoordinate);
        }

        let body = DistanceRequest {
            points: [from, to],
            sources: [0],
            targets: [1],
            route_type: "jam",
        };

        let response = self
            .client
            .post(self.routing_url())
            .query(&[
                ("key", self.config.routing_api_key.as_str()),
                ("version", "2.0"),
            ])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::BadUpstream(format!(
                "routing returned status {}",
                response.status()
            )));
        }

        let response: DistanceResponse = response.json().await?;
        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::BadUpstream("routes not found".to_string()))?;

        if let Some(status) = route.status.as_deref() {
            if status != "OK" {
                return Err(UpstreamError::BadUpstream(format!("route status {status}")));
            }
        }

        if !route.distance.is_finite() || route.distance < 0.0 {
            return Err(UpstreamError::BadUpstream(format!(
                "invalid route distance {}",
                route.distance
            )));
        }

        Ok(route.distance)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{DistanceRequest, GeocodeResponse, HttpGeoResolver};
    use crate::config::GeocoderConfig;
    use crate::models::geo::GeoPoint;
    use crate::upstream::{GeoResolver, UpstreamError};

    fn resolver() -> HttpGeoResolver {
        HttpGeoResolver::new(
            reqwest::Client::new(),
            GeocoderConfig {
                catalog_base_url: "http://127.0.0.1:9/".to_string(),
                routing_base_url: "http://127.0.0.1:9".to_string(),
                catalog_api_key: "catalog".to_string(),
                routing_api_key: "routing".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn zero_coordinates_are_rejected_before_any_request() {
        let geo = resolver();

        let err = geo
            .resolve_address(GeoPoint::new(0.0, 37.5))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::ZeroCoordinate));

        let err = geo
            .distance(GeoPoint::new(55.7, 37.5), GeoPoint::new(55.6, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::ZeroCoordinate));
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let err = resolver().resolve_coordinates("   ").await.unwrap_err();
        assert!(matches!(err, UpstreamError::EmptyQuery));
    }

    #[test]
    fn urls_do_not_double_slashes() {
        let geo = resolver();
        assert_eq!(geo.catalog_url(), "http://127.0.0.1:9/3.0/items/geocode");
        assert_eq!(geo.routing_url(), "http://127.0.0.1:9/get_dist_matrix");
    }

    #[test]
    fn distance_request_matches_matrix_shape() {
        let body = DistanceRequest {
            points: [GeoPoint::new(55.696, 37.495), GeoPoint::new(55.662, 37.478)],
            sources: [0],
            targets: [1],
            route_type: "jam",
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["type"], "jam");
        assert_eq!(value["points"][1]["lat"], 55.662);
        assert_eq!(value["sources"], json!([0]));
    }

    #[test]
    fn geocode_response_without_result_decodes() {
        let response: GeocodeResponse =
            serde_json::from_value(json!({ "meta": { "code": 404 } })).unwrap();
        assert_eq!(response.meta.code, 404);
        assert!(response.result.is_none());
    }
}

use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use super::endpoint::{Endpoint, Extract, extract_result, into_list};
use super::options::{Query, RequestOptions, merge};
use super::xml::xml_to_json;
use super::GeonamesError;
use crate::config::ClientConfig;

/// Longest slice of an error body kept in `GeonamesError::Status`
const ERROR_BODY_LIMIT: usize = 512;

/// Async client for the Geonames web services
///
/// Holds only read-only configuration and a pooled HTTP client, so a single
/// instance can be shared across tasks. Every method issues exactly one GET
/// request and resolves once.
#[derive(Debug, Clone)]
pub struct GeonamesClient {
    http: Client,
    config: ClientConfig,
}

impl GeonamesClient {
    /// Create a client from the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: ClientConfig) -> Result<Self, GeonamesError> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(GeonamesError::Client)?;

        Ok(Self { http, config })
    }

    /// Create a client with default settings for the given account
    pub fn with_username(username: impl Into<String>) -> Result<Self, GeonamesError> {
        Self::new(ClientConfig {
            username: username.into(),
            ..Default::default()
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Full URL for an endpoint
    pub fn url_for(&self, endpoint: Endpoint) -> String {
        format!(
            "{}{}",
            self.config.endpoint.trim_end_matches('/'),
            endpoint.path()
        )
    }

    /// Query parameters sent for `endpoint`, with `today` as the date default
    pub fn build_query_on(
        &self,
        endpoint: Endpoint,
        options: &RequestOptions,
        today: NaiveDate,
    ) -> Query {
        let endpoint_defaults = endpoint.endpoint_defaults(today);
        let client_defaults = endpoint.client_defaults(&self.config);
        let caller = options.to_wire();
        merge(&[&endpoint_defaults, &client_defaults, &caller])
    }

    /// Query parameters sent for `endpoint` right now
    pub fn build_query(&self, endpoint: Endpoint, options: &RequestOptions) -> Query {
        self.build_query_on(endpoint, options, Utc::now().date_naive())
    }

    /// Issue the request and decode the body (XML is translated to JSON)
    async fn fetch(
        &self,
        endpoint: Endpoint,
        options: &RequestOptions,
    ) -> Result<Value, GeonamesError> {
        let url = self.url_for(endpoint);
        let query = self.build_query(endpoint, options);

        debug!(
            url = %url,
            params = ?query.names().collect::<Vec<_>>(),
            "Sending Geonames request"
        );

        let response = self.http.get(&url).query(query.pairs()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > ERROR_BODY_LIMIT {
                let mut cut = ERROR_BODY_LIMIT;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(GeonamesError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        match endpoint.extract() {
            Extract::XmlGeonames => xml_to_json(&text),
            _ => serde_json::from_str(&text)
                .map_err(|e| GeonamesError::Decode(format!("invalid JSON: {e}"))),
        }
    }

    /// Fetch and unwrap the part of the body the endpoint returns
    async fn fetch_result(
        &self,
        endpoint: Endpoint,
        options: &RequestOptions,
    ) -> Result<Value, GeonamesError> {
        let body = self.fetch(endpoint, options).await?;
        let result = extract_result(body, endpoint.extract());
        debug!(
            endpoint = endpoint.name(),
            count = result.as_array().map_or(1, Vec::len),
            "Geonames request finished"
        );
        Ok(result)
    }

    async fn fetch_list(
        &self,
        endpoint: Endpoint,
        options: &RequestOptions,
    ) -> Result<Vec<Value>, GeonamesError> {
        self.fetch_result(endpoint, options).await.map(into_list)
    }

    /// Call any endpoint and return its extracted result as a single value:
    /// an array for list endpoints, the raw body otherwise.
    #[instrument(skip(self, endpoint, options), fields(endpoint = endpoint.name()))]
    pub async fn call(
        &self,
        endpoint: Endpoint,
        options: &RequestOptions,
    ) -> Result<Value, GeonamesError> {
        self.fetch_result(endpoint, options).await
    }

    /// Postal codes near a coordinate (`lat`, `lng`, `radius`, `maxRows`).
    /// For Canada only the FSA is returned.
    #[instrument(skip(self, options))]
    pub async fn find_nearby_postal_codes_by_gps_coordinates(
        &self,
        options: &RequestOptions,
    ) -> Result<Vec<Value>, GeonamesError> {
        self.fetch_list(Endpoint::FindNearbyPostalCodesByGpsCoordinates, options)
            .await
    }

    /// Postal codes near another postal code (`postalCode`, `countryCode`,
    /// `radius`, `maxRows`)
    #[instrument(skip(self, options))]
    pub async fn find_nearby_postal_codes_by_post_code(
        &self,
        options: &RequestOptions,
    ) -> Result<Vec<Value>, GeonamesError> {
        self.fetch_list(Endpoint::FindNearbyPostalCodesByPostCode, options)
            .await
    }

    /// Places for a postal code (`postalCode`, `countryCode`, `maxRows`),
    /// sorted by postal code and place name
    #[instrument(skip(self, options))]
    pub async fn postal_code_lookup(
        &self,
        options: &RequestOptions,
    ) -> Result<Vec<Value>, GeonamesError> {
        self.fetch_list(Endpoint::PostalCodeLookup, options).await
    }

    /// Countries for which postal code data is available
    #[instrument(skip(self, options))]
    pub async fn postal_code_country_info(
        &self,
        options: &RequestOptions,
    ) -> Result<Vec<Value>, GeonamesError> {
        self.fetch_list(Endpoint::PostalCodeCountryInfo, options).await
    }

    /// Closest populated place (`lat`, `lng`, `radius`, `style`, `cities`,
    /// `localCountry`, `maxRows`)
    #[instrument(skip(self, options))]
    pub async fn find_nearby_place_name(
        &self,
        options: &RequestOptions,
    ) -> Result<Vec<Value>, GeonamesError> {
        self.fetch_list(Endpoint::FindNearbyPlaceName, options).await
    }

    /// Closest toponym of any kind (`lat`, `lng`, `featureClass`,
    /// `featureCode`, `radius`, `style`, `localCountry`, `maxRows`)
    #[instrument(skip(self, options))]
    pub async fn find_nearby(&self, options: &RequestOptions) -> Result<Vec<Value>, GeonamesError> {
        self.fetch_list(Endpoint::FindNearby, options).await
    }

    /// Hierarchy of places around a coordinate (`lat`, `lng`).
    ///
    /// This service only answers in XML. The result is always a list, even
    /// when the document holds a single `geoname`.
    #[instrument(skip(self, options))]
    pub async fn find_by_lat_long_extended(
        &self,
        options: &RequestOptions,
    ) -> Result<Vec<Value>, GeonamesError> {
        self.fetch_list(Endpoint::FindByLatLongExtended, options)
            .await
    }

    /// Full record of a feature (`geonameId`)
    #[instrument(skip(self, options))]
    pub async fn get_feature_by_geo_id(
        &self,
        options: &RequestOptions,
    ) -> Result<Value, GeonamesError> {
        self.fetch_result(Endpoint::GetFeatureByGeoId, options).await
    }

    /// Country information (`countryCode`; omit it to list every country)
    #[instrument(skip(self, options))]
    pub async fn get_country_info_by_country_code(
        &self,
        options: &RequestOptions,
    ) -> Result<Vec<Value>, GeonamesError> {
        self.fetch_list(Endpoint::GetCountryInfoByCountryCode, options)
            .await
    }

    /// ISO country code for a coordinate (`lat`, `lng`, `radius`)
    #[instrument(skip(self, options))]
    pub async fn get_country_code_by_lat_long(
        &self,
        options: &RequestOptions,
    ) -> Result<Value, GeonamesError> {
        self.fetch_result(Endpoint::GetCountryCodeByLatLong, options).await
    }

    /// Administrative subdivision for a coordinate (`lat`, `lng`,
    /// `admLevel`, `radius`)
    #[instrument(skip(self, options))]
    pub async fn get_country_subdevision_by_lat_long(
        &self,
        options: &RequestOptions,
    ) -> Result<Value, GeonamesError> {
        self.fetch_result(Endpoint::GetCountrySubdevisionByLatLong, options)
            .await
    }

    /// Timezone for a coordinate (`lat`, `lng`, `date`, `radius`).
    /// `date` defaults to today (UTC).
    #[instrument(skip(self, options))]
    pub async fn get_time_zone_by_lat_long(
        &self,
        options: &RequestOptions,
    ) -> Result<Value, GeonamesError> {
        self.fetch_result(Endpoint::GetTimeZoneByLatLong, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> GeonamesClient {
        GeonamesClient::new(ClientConfig {
            username: "demo".to_string(),
            endpoint: "http://localhost:8080/".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_for_trims_trailing_slash() {
        assert_eq!(
            client().url_for(Endpoint::PostalCodeLookup),
            "http://localhost:8080/postalCodeLookupJSON"
        );
    }

    #[test]
    fn test_caller_options_win() {
        let options = RequestOptions::new()
            .with("postalCode", "3580")
            .with("countryCode", "BE")
            .with("maxRows", 3)
            .with("username", "other");

        let query = client().build_query(Endpoint::PostalCodeLookup, &options);
        assert_eq!(query.get("postalcode"), Some("3580"));
        assert_eq!(query.get("country"), Some("BE"));
        assert_eq!(query.get("maxRows"), Some("3"));
        assert_eq!(query.get("username"), Some("other"));
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let options = RequestOptions::new()
            .with("lat", 51.05)
            .with("lng", 5.21)
            .with("isReduced", true);

        let query = client().build_query(Endpoint::FindNearby, &options);
        assert_eq!(query.get("isReduced"), Some("true"));
        assert_eq!(query.get("style"), Some("LONG"));
    }

    #[test]
    fn test_timezone_date_default_and_override() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let c = client();

        let query = c.build_query_on(Endpoint::GetTimeZoneByLatLong, &RequestOptions::new(), day);
        assert_eq!(query.get("date"), Some("2025-01-31"));

        let options = RequestOptions::new().with("date", "2020-06-01");
        let query = c.build_query_on(Endpoint::GetTimeZoneByLatLong, &options, day);
        assert_eq!(query.get("date"), Some("2020-06-01"));

        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let query = c.build_query(Endpoint::GetTimeZoneByLatLong, &RequestOptions::new());
        assert_eq!(query.get("date").map(str::to_string), Some(today));
    }

    #[test]
    fn test_adm_level_maps_to_adm() {
        let c = client();
        let query = c.build_query(Endpoint::GetCountrySubdevisionByLatLong, &RequestOptions::new());
        assert_eq!(query.get("adm"), Some("1"));

        let options = RequestOptions::new().with("admLevel", json!(3));
        let query = c.build_query(Endpoint::GetCountrySubdevisionByLatLong, &options);
        assert_eq!(query.get("adm"), Some("3"));
    }
}

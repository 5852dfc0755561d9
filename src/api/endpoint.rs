use chrono::NaiveDate;
use serde_json::Value;

use super::RequestOptions;
use crate::config::ClientConfig;
use crate::domain::{Cities, Style};

/// How the useful part of a response is pulled out of the body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// A top-level JSON field holding a list of records
    Field(&'static str),
    /// The whole JSON body
    Body,
    /// `geonames.geoname` nodes of an XML body
    XmlGeonames,
}

/// Every Geonames web service this client knows how to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    FindNearbyPostalCodesByGpsCoordinates,
    FindNearbyPostalCodesByPostCode,
    PostalCodeLookup,
    PostalCodeCountryInfo,
    FindNearbyPlaceName,
    FindNearby,
    FindByLatLongExtended,
    GetFeatureByGeoId,
    GetCountryInfoByCountryCode,
    GetCountryCodeByLatLong,
    GetCountrySubdevisionByLatLong,
    GetTimeZoneByLatLong,
}

impl Endpoint {
    pub const ALL: [Endpoint; 12] = [
        Endpoint::FindNearbyPostalCodesByGpsCoordinates,
        Endpoint::FindNearbyPostalCodesByPostCode,
        Endpoint::PostalCodeLookup,
        Endpoint::PostalCodeCountryInfo,
        Endpoint::FindNearbyPlaceName,
        Endpoint::FindNearby,
        Endpoint::FindByLatLongExtended,
        Endpoint::GetFeatureByGeoId,
        Endpoint::GetCountryInfoByCountryCode,
        Endpoint::GetCountryCodeByLatLong,
        Endpoint::GetCountrySubdevisionByLatLong,
        Endpoint::GetTimeZoneByLatLong,
    ];

    /// Service path, appended to the configured endpoint
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::FindNearbyPostalCodesByGpsCoordinates
            | Endpoint::FindNearbyPostalCodesByPostCode => "/findNearbyPostalCodesJSON",
            Endpoint::PostalCodeLookup => "/postalCodeLookupJSON",
            Endpoint::PostalCodeCountryInfo => "/postalCodeCountryInfoJSON",
            Endpoint::FindNearbyPlaceName => "/findNearbyPlaceNameJSON",
            Endpoint::FindNearby => "/findNearbyJSON",
            Endpoint::FindByLatLongExtended => "/extendedFindNearby",
            Endpoint::GetFeatureByGeoId => "/getJSON",
            Endpoint::GetCountryInfoByCountryCode => "/countryInfoJSON",
            Endpoint::GetCountryCodeByLatLong => "/countryCodeJSON",
            Endpoint::GetCountrySubdevisionByLatLong => "/countrySubdivisionJSON",
            Endpoint::GetTimeZoneByLatLong => "/timezoneJSON",
        }
    }

    pub fn extract(&self) -> Extract {
        match self {
            Endpoint::FindNearbyPostalCodesByGpsCoordinates
            | Endpoint::FindNearbyPostalCodesByPostCode => Extract::Field("postalCodes"),
            Endpoint::PostalCodeLookup => Extract::Field("postalcodes"),
            Endpoint::PostalCodeCountryInfo
            | Endpoint::FindNearbyPlaceName
            | Endpoint::FindNearby
            | Endpoint::GetCountryInfoByCountryCode => Extract::Field("geonames"),
            Endpoint::FindByLatLongExtended => Extract::XmlGeonames,
            Endpoint::GetFeatureByGeoId
            | Endpoint::GetCountryCodeByLatLong
            | Endpoint::GetCountrySubdevisionByLatLong
            | Endpoint::GetTimeZoneByLatLong => Extract::Body,
        }
    }

    /// Whether the client's default country is sent
    fn uses_default_country(&self) -> bool {
        matches!(
            self,
            Endpoint::FindNearbyPostalCodesByPostCode
                | Endpoint::PostalCodeLookup
                | Endpoint::FindNearbyPlaceName
                | Endpoint::FindNearby
        )
    }

    /// Whether the service localises names for this call
    fn uses_language(&self) -> bool {
        matches!(
            self,
            Endpoint::FindNearbyPlaceName
                | Endpoint::FindNearby
                | Endpoint::GetFeatureByGeoId
                | Endpoint::GetCountryInfoByCountryCode
                | Endpoint::GetCountryCodeByLatLong
                | Endpoint::GetCountrySubdevisionByLatLong
        )
    }

    /// Hardcoded per-endpoint parameters, the lowest precedence layer.
    ///
    /// `today` feeds the timezone lookup's `date` default.
    pub fn endpoint_defaults(&self, today: NaiveDate) -> RequestOptions {
        match self {
            Endpoint::FindNearbyPostalCodesByGpsCoordinates => RequestOptions::new()
                .with("maxRows", 5)
                .with("radius", 10),
            Endpoint::FindNearbyPostalCodesByPostCode => RequestOptions::new().with("maxRows", 5),
            Endpoint::PostalCodeLookup => RequestOptions::new().with("maxRows", 20),
            Endpoint::FindNearbyPlaceName | Endpoint::FindNearby => RequestOptions::new()
                .with("maxRows", 20)
                .with("style", Style::Long)
                .with("cities", Cities::Cities1000),
            Endpoint::GetCountrySubdevisionByLatLong => RequestOptions::new().with("adm", 1),
            Endpoint::GetTimeZoneByLatLong => {
                RequestOptions::new().with("date", today.format("%Y-%m-%d").to_string())
            }
            _ => RequestOptions::new(),
        }
    }

    /// Parameters taken from the client configuration
    pub fn client_defaults(&self, config: &ClientConfig) -> RequestOptions {
        let mut options = RequestOptions::new()
            .with("username", config.username.as_str())
            .with("charset", config.charset.as_str());
        if self.uses_default_country() {
            options.set("country", config.country.as_str());
        }
        if self.uses_language() {
            options.set("lang", config.language.as_str());
        }
        options
    }

    /// Name used on the command line and in log output
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::FindNearbyPostalCodesByGpsCoordinates => {
                "findNearbyPostalCodesByGpsCoordinates"
            }
            Endpoint::FindNearbyPostalCodesByPostCode => "findNearbyPostalCodesByPostCode",
            Endpoint::PostalCodeLookup => "postalCodeLookup",
            Endpoint::PostalCodeCountryInfo => "postalCodeCountryInfo",
            Endpoint::FindNearbyPlaceName => "findNearbyPlaceName",
            Endpoint::FindNearby => "findNearby",
            Endpoint::FindByLatLongExtended => "findByLatLongExtended",
            Endpoint::GetFeatureByGeoId => "getFeatureByGeoId",
            Endpoint::GetCountryInfoByCountryCode => "getCountryInfoByCountryCode",
            Endpoint::GetCountryCodeByLatLong => "getCountryCodeByLatLong",
            Endpoint::GetCountrySubdevisionByLatLong => "getCountrySubdevisionByLatLong",
            Endpoint::GetTimeZoneByLatLong => "getTimeZoneByLatLong",
        }
    }
}

/// Normalise a JSON value to a list: arrays as-is, null as empty, anything
/// else as a single element.
pub fn into_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Pull the result described by `extract` out of a decoded body.
///
/// List extractions always yield a `Value::Array`; `Body` hands the body
/// back untouched.
pub fn extract_result(body: Value, extract: Extract) -> Value {
    match extract {
        Extract::Field(field) => {
            let records = match body {
                Value::Object(mut map) => map.remove(field).map(into_list).unwrap_or_default(),
                _ => Vec::new(),
            };
            Value::Array(records)
        }
        Extract::XmlGeonames => {
            let mut body = body;
            let records = body
                .pointer_mut("/geonames/geoname")
                .map(Value::take)
                .map(into_list)
                .unwrap_or_default();
            Value::Array(records)
        }
        Extract::Body => body,
    }
}

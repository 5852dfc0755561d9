use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use geonames::config::FileConfig;
use geonames::{Cities, ClientConfig, Endpoint, GeonamesClient, RequestOptions, Style};

/// Query the Geonames web services from the command line
///
/// Examples:
///   # Places for a Belgian postal code
///   geonames -u demo postal-code-lookup 3580 --country-code BE
///
///   # Postal codes around a coordinate
///   geonames -u demo nearby-postal-codes --lat 51.05 --lng 5.21 --radius 10
///
///   # Timezone with an extra pass-through parameter
///   geonames -u demo timezone --lat 51.05 --lng 5.21 --param lang=nl
#[derive(Parser, Debug)]
#[command(name = "geonames")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches geonames.toml if not provided)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Geonames account name
    #[arg(short = 'u', long, env = "GEONAMES_USERNAME", global = true)]
    username: Option<String>,

    /// Service base URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Default language for place names
    #[arg(long, global = true)]
    lang: Option<String>,

    /// Default country code
    #[arg(long, global = true)]
    country: Option<String>,

    /// Extra query parameter passed through unchanged (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param, global = true)]
    params: Vec<(String, String)>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Places for a postal code
    PostalCodeLookup {
        postal_code: String,
        #[arg(long)]
        country_code: Option<String>,
        #[arg(long)]
        max_rows: Option<u32>,
    },
    /// Postal codes near a coordinate
    NearbyPostalCodes {
        #[command(flatten)]
        point: Point,
        #[arg(long)]
        radius: Option<u32>,
        #[arg(long)]
        max_rows: Option<u32>,
    },
    /// Postal codes near another postal code
    NearbyPostalCodesByCode {
        postal_code: String,
        #[arg(long)]
        country_code: Option<String>,
        #[arg(long)]
        radius: Option<u32>,
        #[arg(long)]
        max_rows: Option<u32>,
    },
    /// Countries with postal code data
    PostalCodeCountries,
    /// Closest populated place
    NearbyPlaceName {
        #[command(flatten)]
        point: Point,
        #[arg(long)]
        radius: Option<u32>,
        #[arg(long)]
        max_rows: Option<u32>,
        #[arg(long)]
        style: Option<Style>,
        #[arg(long)]
        cities: Option<Cities>,
        /// Only return places in the country of the coordinate
        #[arg(long)]
        local_country: bool,
    },
    /// Closest toponym of any feature class
    Nearby {
        #[command(flatten)]
        point: Point,
        #[arg(long)]
        radius: Option<u32>,
        #[arg(long)]
        max_rows: Option<u32>,
        #[arg(long)]
        style: Option<Style>,
        #[arg(long)]
        feature_class: Option<String>,
        /// Feature code filter (repeatable)
        #[arg(long)]
        feature_code: Vec<String>,
        #[arg(long)]
        local_country: bool,
    },
    /// Place hierarchy around a coordinate
    Extended {
        #[command(flatten)]
        point: Point,
    },
    /// Full record of a feature
    Feature { geoname_id: u64 },
    /// Country information (all countries when no code is given)
    CountryInfo { country_code: Option<String> },
    /// Country code of a coordinate
    CountryCode {
        #[command(flatten)]
        point: Point,
        #[arg(long)]
        radius: Option<u32>,
    },
    /// Administrative subdivision of a coordinate
    Subdivision {
        #[command(flatten)]
        point: Point,
        #[arg(long)]
        adm_level: Option<u8>,
        #[arg(long)]
        radius: Option<u32>,
    },
    /// Timezone of a coordinate
    Timezone {
        #[command(flatten)]
        point: Point,
        /// Date (YYYY-MM-DD) for sunrise/sunset, defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        radius: Option<u32>,
    },
}

#[derive(clap::Args, Debug)]
struct Point {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lng: f64,
}

impl Point {
    fn options(&self) -> RequestOptions {
        RequestOptions::new()
            .with("lat", self.lat)
            .with("lng", self.lng)
    }
}

fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

impl Command {
    /// Endpoint and typed options for the chosen subcommand
    fn into_request(self) -> (Endpoint, RequestOptions) {
        match self {
            Command::PostalCodeLookup {
                postal_code,
                country_code,
                max_rows,
            } => (
                Endpoint::PostalCodeLookup,
                RequestOptions::new()
                    .with("postalCode", postal_code)
                    .with("countryCode", country_code)
                    .with("maxRows", max_rows),
            ),
            Command::NearbyPostalCodes {
                point,
                radius,
                max_rows,
            } => (
                Endpoint::FindNearbyPostalCodesByGpsCoordinates,
                point
                    .options()
                    .with("radius", radius)
                    .with("maxRows", max_rows),
            ),
            Command::NearbyPostalCodesByCode {
                postal_code,
                country_code,
                radius,
                max_rows,
            } => (
                Endpoint::FindNearbyPostalCodesByPostCode,
                RequestOptions::new()
                    .with("postalCode", postal_code)
                    .with("countryCode", country_code)
                    .with("radius", radius)
                    .with("maxRows", max_rows),
            ),
            Command::PostalCodeCountries => (Endpoint::PostalCodeCountryInfo, RequestOptions::new()),
            Command::NearbyPlaceName {
                point,
                radius,
                max_rows,
                style,
                cities,
                local_country,
            } => (
                Endpoint::FindNearbyPlaceName,
                point
                    .options()
                    .with("radius", radius)
                    .with("maxRows", max_rows)
                    .with("style", style)
                    .with("cities", cities)
                    .with("localCountry", flag(local_country)),
            ),
            Command::Nearby {
                point,
                radius,
                max_rows,
                style,
                feature_class,
                feature_code,
                local_country,
            } => {
                let mut options = point
                    .options()
                    .with("radius", radius)
                    .with("maxRows", max_rows)
                    .with("style", style)
                    .with("featureClass", feature_class)
                    .with("localCountry", flag(local_country));
                if !feature_code.is_empty() {
                    options.set("featureCode", feature_code);
                }
                (Endpoint::FindNearby, options)
            }
            Command::Extended { point } => (Endpoint::FindByLatLongExtended, point.options()),
            Command::Feature { geoname_id } => (
                Endpoint::GetFeatureByGeoId,
                RequestOptions::new().with("geonameId", geoname_id),
            ),
            Command::CountryInfo { country_code } => (
                Endpoint::GetCountryInfoByCountryCode,
                RequestOptions::new().with("countryCode", country_code),
            ),
            Command::CountryCode { point, radius } => (
                Endpoint::GetCountryCodeByLatLong,
                point.options().with("radius", radius),
            ),
            Command::Subdivision {
                point,
                adm_level,
                radius,
            } => (
                Endpoint::GetCountrySubdevisionByLatLong,
                point
                    .options()
                    .with("admLevel", adm_level)
                    .with("radius", radius),
            ),
            Command::Timezone {
                point,
                date,
                radius,
            } => (
                Endpoint::GetTimeZoneByLatLong,
                point.options().with("date", date).with("radius", radius),
            ),
        }
    }
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file_config = if let Some(ref config_path) = args.config {
        if !config_path.exists() {
            bail!("Config file not found: {:?}", config_path);
        }
        Some(FileConfig::from_path(config_path)?)
    } else {
        FileConfig::load()
    };

    let verbose = args.verbose || file_config.as_ref().is_some_and(|c| c.verbose);
    init_logging(verbose);

    let mut config: ClientConfig = file_config.map(|c| c.client).unwrap_or_default();
    if let Some(username) = args.username {
        config.username = username;
    }
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(lang) = args.lang {
        config.language = lang;
    }
    if let Some(country) = args.country {
        config.country = country;
    }

    if config.username.is_empty() {
        bail!("A Geonames username is required: pass --username, set GEONAMES_USERNAME or add it to geonames.toml");
    }

    info!(
        endpoint = %config.endpoint,
        language = %config.language,
        country = %config.country,
        "Resolved configuration"
    );

    let (endpoint, mut options) = args.command.into_request();
    for (key, value) in args.params {
        options.set(key, value);
    }

    let client = GeonamesClient::new(config).context("Failed to create Geonames client")?;

    let spinner = create_spinner(&format!("Calling {}...", endpoint.name()));
    let start = Instant::now();
    let result = client.call(endpoint, &options).await;
    spinner.finish_and_clear();

    let result = result.with_context(|| format!("{} request failed", endpoint.name()))?;
    let records = match &result {
        Value::Array(items) => items.len(),
        _ => 1,
    };
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        records,
        "Request complete"
    );

    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("Failed to format result")?
    );

    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("lang=nl").unwrap(),
            ("lang".to_string(), "nl".to_string())
        );
        assert_eq!(
            parse_param("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_postal_code_lookup_command() {
        let args = Args::try_parse_from([
            "geonames",
            "-u",
            "demo",
            "postal-code-lookup",
            "3580",
            "--country-code",
            "BE",
        ])
        .unwrap();

        assert_eq!(args.username.as_deref(), Some("demo"));
        let (endpoint, options) = args.command.into_request();
        assert_eq!(endpoint, Endpoint::PostalCodeLookup);
        assert_eq!(options.get("postalCode"), Some(&json!("3580")));
        assert_eq!(options.get("countryCode"), Some(&json!("BE")));
        assert!(options.get("maxRows").is_none());
    }

    #[test]
    fn test_negative_coordinates_and_flags() {
        let args = Args::try_parse_from([
            "geonames",
            "nearby",
            "--lat",
            "-33.86",
            "--lng",
            "151.2",
            "--feature-code",
            "PPL",
            "--feature-code",
            "PPLA",
            "--local-country",
            "--style",
            "FULL",
        ])
        .unwrap();

        let (endpoint, options) = args.command.into_request();
        assert_eq!(endpoint, Endpoint::FindNearby);
        assert_eq!(options.get("lat"), Some(&json!(-33.86)));
        assert_eq!(options.get("featureCode"), Some(&json!(["PPL", "PPLA"])));
        assert_eq!(options.get("localCountry"), Some(&json!(true)));
        assert_eq!(options.get("style"), Some(&json!("FULL")));
    }

    #[test]
    fn test_radius_is_sent_as_integer() {
        let args = Args::try_parse_from([
            "geonames",
            "nearby-postal-codes",
            "--lat",
            "51.05",
            "--lng",
            "5.21",
            "--radius",
            "10",
        ])
        .unwrap();

        let (endpoint, options) = args.command.into_request();
        assert_eq!(endpoint, Endpoint::FindNearbyPostalCodesByGpsCoordinates);
        let query = geonames::api::options::merge(&[&options]);
        assert_eq!(query.get("radius"), Some("10"));
    }

    #[test]
    fn test_global_params_after_subcommand() {
        let args = Args::try_parse_from([
            "geonames",
            "timezone",
            "--lat",
            "51.05",
            "--lng",
            "5.21",
            "--param",
            "lang=nl",
        ])
        .unwrap();

        assert_eq!(args.params, vec![("lang".to_string(), "nl".to_string())]);
        let (endpoint, options) = args.command.into_request();
        assert_eq!(endpoint, Endpoint::GetTimeZoneByLatLong);
        assert!(options.get("date").is_none());
    }
}

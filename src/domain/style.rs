use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Verbosity of the returned toponym records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
#[value(rename_all = "UPPER")]
pub enum Style {
    Short,
    Medium,
    Long,
    Full,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Short => "SHORT",
            Style::Medium => "MEDIUM",
            Style::Long => "LONG",
            Style::Full => "FULL",
        }
    }
}

/// Minimum population class of the cities considered by place-name lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
pub enum Cities {
    #[serde(rename = "cities1000")]
    #[value(name = "cities1000")]
    Cities1000,
    #[serde(rename = "cities5000")]
    #[value(name = "cities5000")]
    Cities5000,
    #[serde(rename = "cities15000")]
    #[value(name = "cities15000")]
    Cities15000,
}

impl Cities {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cities::Cities1000 => "cities1000",
            Cities::Cities5000 => "cities5000",
            Cities::Cities15000 => "cities15000",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Cities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Style> for Value {
    fn from(style: Style) -> Self {
        Value::String(style.as_str().to_string())
    }
}

impl From<Cities> for Value {
    fn from(cities: Cities) -> Self {
        Value::String(cities.as_str().to_string())
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stored country record as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub id: u64,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: u64,
    /// Upper-case ISO 4217 code, e.g. "NGN"
    pub currency_code: Option<String>,
    /// Units of `currency_code` per one USD
    pub exchange_rate: Option<Decimal>,
    /// Always strictly positive when present
    pub estimated_gdp: Option<Decimal>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
}

/// Request body for creating a country directly
///
/// Every field is optional on the wire so that missing values can be
/// reported per field instead of failing deserialization as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCountry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub population: Option<i64>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub exchange_rate: Option<Decimal>,
    #[serde(default)]
    pub estimated_gdp: Option<Decimal>,
    #[serde(default)]
    pub flag_url: Option<String>,
}

/// Ordering applied to country listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortKey {
    #[default]
    #[serde(rename = "gdp_desc")]
    GdpDesc,
    #[serde(rename = "gdp_asc")]
    GdpAsc,
    #[serde(rename = "population_desc")]
    PopulationDesc,
    #[serde(rename = "population_asc")]
    PopulationAsc,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::GdpDesc => "gdp_desc",
            SortKey::GdpAsc => "gdp_asc",
            SortKey::PopulationDesc => "population_desc",
            SortKey::PopulationAsc => "population_asc",
        }
    }

    /// Parse a sort key, falling back to the default ordering for
    /// unrecognized values.
    pub fn parse_lossy(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gdp_desc" => Ok(SortKey::GdpDesc),
            "gdp_asc" => Ok(SortKey::GdpAsc),
            "population_desc" => Ok(SortKey::PopulationDesc),
            "population_asc" => Ok(SortKey::PopulationAsc),
            _ => Err(format!("Unknown sort key: {}", s)),
        }
    }
}

/// Query-string filters for the country listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryQuery {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

impl CountryQuery {
    pub fn sort_key(&self) -> SortKey {
        self.sort
            .as_deref()
            .map(SortKey::parse_lossy)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub total_countries: usize,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub message: String,
    pub total_countries: usize,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

/// JSON body of every non-2xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

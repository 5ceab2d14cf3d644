use country_common::NewCountry;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::store::CountryDraft;

/// Per-field validation messages, serialized as `{field: [messages]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

const NAME_MAX_CHARS: usize = 255;
const CAPITAL_MAX_CHARS: usize = 255;
const REGION_MAX_CHARS: usize = 100;

/// Decode a create request body field by field.
///
/// Type mismatches are collected per field instead of rejecting the whole
/// body, so they reach the client in the same shape as validation errors.
pub fn parse_new_country(body: &Value) -> Result<NewCountry, FieldErrors> {
    let Some(object) = body.as_object() else {
        return Err(FieldErrors::single(
            "non_field_errors",
            "Invalid data. Expected a JSON object",
        ));
    };

    let mut errors = FieldErrors::default();
    let input = NewCountry {
        name: field(object, "name", "Not a valid string.", &mut errors),
        capital: field(object, "capital", "Not a valid string.", &mut errors),
        region: field(object, "region", "Not a valid string.", &mut errors),
        population: integer_field(object, "population", &mut errors),
        currency_code: field(object, "currency_code", "Not a valid string.", &mut errors),
        exchange_rate: field(object, "exchange_rate", "A valid number is required.", &mut errors),
        estimated_gdp: field(object, "estimated_gdp", "A valid number is required.", &mut errors),
        flag_url: field(object, "flag_url", "Not a valid string.", &mut errors),
    };

    if errors.is_empty() { Ok(input) } else { Err(errors) }
}

fn field<T: DeserializeOwned>(
    object: &Map<String, Value>,
    name: &str,
    message: &str,
    errors: &mut FieldErrors,
) -> Option<T> {
    match object.get(name) {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                errors.add(name, message);
                None
            }
        },
    }
}

/// Integers may also arrive as numeric strings
fn integer_field(object: &Map<String, Value>, name: &str, errors: &mut FieldErrors) -> Option<i64> {
    let parsed = match object.get(name) {
        None | Some(Value::Null) => return None,
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    if parsed.is_none() {
        errors.add(name, "A valid integer is required.");
    }
    parsed
}

/// Check a create request and normalize it into a storable draft.
///
/// Empty optional strings are treated as absent and currency codes are
/// upper-cased. Name uniqueness is checked by the store.
pub fn validate_new_country(input: &NewCountry) -> Result<CountryDraft, FieldErrors> {
    let mut errors = FieldErrors::default();

    let name = input.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        errors.add("name", "name is required");
    }
    check_max_chars(&mut errors, "name", Some(name), NAME_MAX_CHARS);
    check_max_chars(&mut errors, "capital", non_empty(&input.capital), CAPITAL_MAX_CHARS);
    check_max_chars(&mut errors, "region", non_empty(&input.region), REGION_MAX_CHARS);

    let population = match input.population {
        None => {
            errors.add("population", "population is required");
            0
        }
        Some(p) if p < 0 => {
            errors.add("population", "population must not be negative");
            0
        }
        Some(p) => p as u64,
    };

    let currency_code = non_empty(&input.currency_code).map(str::to_uppercase);
    if let Some(code) = &currency_code {
        if code.chars().count() != 3 {
            errors.add("currency_code", "currency_code must be 3 characters");
        }
    }

    check_positive(&mut errors, "exchange_rate", input.exchange_rate);
    check_positive(&mut errors, "estimated_gdp", input.estimated_gdp);

    // A GDP only exists alongside the rate it was derived from
    if input.estimated_gdp.is_some() && (currency_code.is_none() || input.exchange_rate.is_none()) {
        errors.add(
            "estimated_gdp",
            "estimated_gdp requires currency_code and exchange_rate",
        );
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(CountryDraft {
        name: name.to_string(),
        capital: non_empty(&input.capital).map(str::to_string),
        region: non_empty(&input.region).map(str::to_string),
        population,
        currency_code,
        exchange_rate: input.exchange_rate.map(|r| r.round_dp(6)),
        estimated_gdp: input.estimated_gdp.map(|g| g.round_dp(2)),
        flag_url: non_empty(&input.flag_url).map(str::to_string),
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn check_max_chars(errors: &mut FieldErrors, field: &str, value: Option<&str>, max: usize) {
    if matches!(value, Some(v) if v.chars().count() > max) {
        errors.add(field, format!("{} must be at most {} characters", field, max));
    }
}

fn check_positive(errors: &mut FieldErrors, field: &str, value: Option<Decimal>) {
    if matches!(value, Some(v) if v <= Decimal::ZERO) {
        errors.add(field, format!("{} must be positive", field));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(name: &str, population: i64) -> NewCountry {
        NewCountry {
            name: Some(name.to_string()),
            population: Some(population),
            ..Default::default()
        }
    }

    #[test]
    fn test_accepts_zero_and_positive_population() {
        assert_eq!(validate_new_country(&request("Vatican", 0)).unwrap().population, 0);
        assert_eq!(validate_new_country(&request("France", 68_000_000)).unwrap().population, 68_000_000);
    }

    #[test]
    fn test_rejects_negative_population() {
        let errors = validate_new_country(&request("France", -1)).unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["population"]);
    }

    #[test]
    fn test_rejects_blank_name_and_missing_population() {
        let input = NewCountry {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        let errors = validate_new_country(&input).unwrap_err();
        assert_eq!(errors.get("name").unwrap(), ["name is required"]);
        assert_eq!(errors.get("population").unwrap(), ["population is required"]);
    }

    #[test]
    fn test_currency_code_length() {
        for bad in ["EU", "EURO", "E"] {
            let input = NewCountry {
                currency_code: Some(bad.to_string()),
                ..request("France", 1)
            };
            let errors = validate_new_country(&input).unwrap_err();
            assert!(errors.get("currency_code").is_some(), "{} should be rejected", bad);
        }

        let input = NewCountry {
            currency_code: Some("eur".to_string()),
            ..request("France", 1)
        };
        assert_eq!(validate_new_country(&input).unwrap().currency_code.as_deref(), Some("EUR"));

        let input = NewCountry {
            currency_code: Some(String::new()),
            ..request("France", 1)
        };
        assert!(validate_new_country(&input).unwrap().currency_code.is_none());
    }

    #[test]
    fn test_rejects_non_positive_gdp_and_rate() {
        let input = NewCountry {
            currency_code: Some("EUR".to_string()),
            exchange_rate: Some(dec!(0)),
            estimated_gdp: Some(dec!(-5.00)),
            ..request("France", 1)
        };
        let errors = validate_new_country(&input).unwrap_err();
        assert!(errors.get("exchange_rate").is_some());
        assert_eq!(errors.get("estimated_gdp").unwrap(), ["estimated_gdp must be positive"]);
        assert_eq!(
            errors.to_string(),
            "estimated_gdp: estimated_gdp must be positive; exchange_rate: exchange_rate must be positive"
        );
    }

    #[test]
    fn test_trims_name() {
        let draft = validate_new_country(&request("  France ", 1)).unwrap();
        assert_eq!(draft.name, "France");
    }

    #[test]
    fn test_gdp_requires_currency_and_rate() {
        let input = NewCountry {
            estimated_gdp: Some(dec!(123.45)),
            ..request("Zland", 5)
        };
        let errors = validate_new_country(&input).unwrap_err();
        assert_eq!(
            errors.get("estimated_gdp").unwrap(),
            ["estimated_gdp requires currency_code and exchange_rate"]
        );

        let input = NewCountry {
            currency_code: Some("ZZZ".to_string()),
            estimated_gdp: Some(dec!(123.45)),
            ..request("Zland", 5)
        };
        assert!(validate_new_country(&input).is_err());

        let input = NewCountry {
            currency_code: Some("ZZZ".to_string()),
            exchange_rate: Some(dec!(2.5)),
            estimated_gdp: Some(dec!(123.45)),
            ..request("Zland", 5)
        };
        let draft = validate_new_country(&input).unwrap();
        assert_eq!(draft.estimated_gdp, Some(dec!(123.45)));
    }

    #[test]
    fn test_text_length_limits() {
        let input = NewCountry {
            region: Some("r".repeat(101)),
            capital: Some("c".repeat(255)),
            ..request(&"n".repeat(256), 1)
        };
        let errors = validate_new_country(&input).unwrap_err();
        assert_eq!(errors.get("name").unwrap(), ["name must be at most 255 characters"]);
        assert_eq!(errors.get("region").unwrap(), ["region must be at most 100 characters"]);
        assert!(errors.get("capital").is_none());

        assert!(validate_new_country(&request(&"n".repeat(255), 1)).is_ok());
    }

    #[test]
    fn test_parse_reports_type_errors_per_field() {
        let body = serde_json::json!({
            "name": "X",
            "population": "abc",
            "currency_code": 840,
            "exchange_rate": "not a number"
        });
        let errors = parse_new_country(&body).unwrap_err();
        assert_eq!(errors.get("population").unwrap(), ["A valid integer is required."]);
        assert_eq!(errors.get("currency_code").unwrap(), ["Not a valid string."]);
        assert_eq!(errors.get("exchange_rate").unwrap(), ["A valid number is required."]);
        assert!(errors.get("name").is_none());

        let oversized: Value = serde_json::from_str(r#"{"name": "X", "population": 99999999999999999999}"#).unwrap();
        let errors = parse_new_country(&oversized).unwrap_err();
        assert!(errors.get("population").is_some());

        let errors = parse_new_country(&serde_json::json!(["France"])).unwrap_err();
        assert!(errors.get("non_field_errors").is_some());
    }

    #[test]
    fn test_parse_accepts_numbers_strings_and_nulls() {
        let body = serde_json::json!({
            "name": "France",
            "population": "68000000",
            "capital": null,
            "exchange_rate": "0.92",
            "estimated_gdp": 1234.5
        });
        let input = parse_new_country(&body).unwrap();
        assert_eq!(input.name.as_deref(), Some("France"));
        assert_eq!(input.population, Some(68_000_000));
        assert!(input.capital.is_none());
        assert_eq!(input.exchange_rate, Some(dec!(0.92)));
        assert_eq!(input.estimated_gdp, Some(dec!(1234.5)));
    }
}

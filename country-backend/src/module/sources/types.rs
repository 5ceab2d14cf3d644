use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// Currency code (upper-case) to units per one USD
pub type ExchangeRates = HashMap<String, Decimal>;

/// One entry of the country metadata feed
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteCountry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub population: u64,
    #[serde(default, rename = "flag")]
    pub flag_url: Option<String>,
    /// Absent or null for territories without a currency
    #[serde(default)]
    pub currencies: Option<Vec<RemoteCurrency>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteCurrency {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl RemoteCountry {
    /// Upper-cased code of the first listed currency, if it has one
    pub fn primary_currency_code(&self) -> Option<String> {
        self.currencies
            .as_ref()?
            .first()?
            .code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_uppercase)
    }
}

/// Body of the USD-based rate feed
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RatesPayload {
    #[serde(default)]
    pub rates: HashMap<String, Decimal>,
}

impl RatesPayload {
    pub fn into_rates(self) -> ExchangeRates {
        self.rates
            .into_iter()
            .map(|(code, rate)| (code.trim().to_uppercase(), rate))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_country_feed() {
        let json = r#"[
            {"name":"Nigeria","capital":"Abuja","region":"Africa","population":206139587,
             "flag":"https://flagcdn.com/ng.svg",
             "currencies":[{"code":"NGN","name":"Nigerian naira","symbol":"₦"}],"independent":false},
            {"name":"Antarctica","region":"Polar","population":1000}
        ]"#;
        let countries: Vec<RemoteCountry> = serde_json::from_str(json).unwrap();
        assert_eq!(countries.len(), 2);
        assert_eq!(countries[0].flag_url.as_deref(), Some("https://flagcdn.com/ng.svg"));
        assert_eq!(countries[0].primary_currency_code().as_deref(), Some("NGN"));
        assert!(countries[1].capital.is_none());
        assert!(countries[1].primary_currency_code().is_none());
    }

    #[test]
    fn test_primary_currency_uses_first_entry() {
        let country: RemoteCountry = serde_json::from_str(
            r#"{"name":"Testland","currencies":[{"code":"tst"},{"code":"USD"}]}"#,
        )
        .unwrap();
        assert_eq!(country.primary_currency_code().as_deref(), Some("TST"));

        let country: RemoteCountry =
            serde_json::from_str(r#"{"name":"Nowhere","currencies":[{"name":"Shell"}]}"#).unwrap();
        assert!(country.primary_currency_code().is_none());

        let country: RemoteCountry =
            serde_json::from_str(r#"{"name":"Void","currencies":null}"#).unwrap();
        assert!(country.primary_currency_code().is_none());
    }

    #[test]
    fn test_rates_payload_normalizes_codes() {
        let payload: RatesPayload = serde_json::from_str(
            r#"{"result":"success","base_code":"USD","rates":{"USD":1,"ngn":1600.5,"EUR":0.92}}"#,
        )
        .unwrap();
        let rates = payload.into_rates();
        assert_eq!(rates.len(), 3);
        assert_eq!(rates["NGN"], dec!(1600.5));
        assert_eq!(rates["EUR"], dec!(0.92));
        assert_eq!(rates["USD"], dec!(1));
    }
}

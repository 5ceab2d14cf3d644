//! External country and exchange-rate providers
//!
//! Both datasets are fetched in full on every refresh. Any failure is
//! terminal for the refresh that triggered it.

pub mod client;
pub mod types;

pub use client::{DataSource, HttpDataSource, SourceError};
pub use types::{ExchangeRates, RemoteCountry, RemoteCurrency};

pub mod types;

pub use types::{
    Country, CountryQuery, ErrorBody, NewCountry, RefreshResponse, SortKey, StatusResponse,
};

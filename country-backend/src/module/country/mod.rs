//! Country records: storage, validation, listing and refresh upserts

pub mod api;
pub mod query;
pub mod store;
pub mod upsert;
pub mod validation;

pub use store::{CountryDraft, CountryStore, StoreError};
pub use upsert::{GdpMultiplier, UpsertReport};
pub use validation::{parse_new_country, FieldErrors};

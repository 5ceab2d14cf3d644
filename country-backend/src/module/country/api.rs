//! Read and write operations exposed to the HTTP layer

use country_common::{Country, CountryQuery, NewCountry, StatusResponse};
use std::io::ErrorKind;
use std::path::Path;

use super::store::{CountryStore, StoreError};
use super::validation::{validate_new_country, FieldErrors};
use crate::error::{ServiceError, ServiceResult};

pub async fn list_countries(store: &CountryStore, query: &CountryQuery) -> Vec<Country> {
    store.list(query).await
}

pub async fn get_country(store: &CountryStore, name: &str) -> ServiceResult<Country> {
    store.get(name).await.ok_or(ServiceError::NotFound("Country"))
}

pub async fn create_country(store: &CountryStore, input: &NewCountry) -> ServiceResult<Country> {
    let draft = validate_new_country(input).map_err(ServiceError::Validation)?;
    store.insert(draft).await.map_err(|e| match e {
        StoreError::Duplicate(_) => ServiceError::Validation(FieldErrors::single(
            "name",
            "country with this name already exists",
        )),
        other => other.into(),
    })
}

pub async fn delete_country(store: &CountryStore, name: &str) -> ServiceResult<()> {
    if store.delete(name).await? {
        Ok(())
    } else {
        Err(ServiceError::NotFound("Country"))
    }
}

pub async fn status(store: &CountryStore) -> StatusResponse {
    StatusResponse {
        total_countries: store.count().await,
        last_refreshed_at: store.last_refreshed_at().await,
    }
}

/// Bytes of the rendered summary PNG
pub async fn summary_image(path: &Path) -> ServiceResult<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ServiceError::NotFound("Summary image")),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
        .into()),
    }
}

//! Nearby-store lookup and the `Store` record.

use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::errorlog::{ErrorLog, ErrorScope};
use crate::types::ExportError;

use super::FetchOutcome;

pub(crate) const NEARBY_STORES_PATH: &str = "sprinkles/v2/stock_locations/nearby";

/// A latitude/longitude pair, used both for store locations and for the
/// fixed query coordinate.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A store as carried through the pipeline. Immutable once fetched.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Store {
    pub id: i64,
    pub name: String,
    /// Single display string composed from the five wire address sub-fields.
    pub address: String,
    pub phone: String,
    pub location: GeoPoint,
    pub photo_url: String,
}

#[derive(Debug, Deserialize)]
struct NearbyStoresResponse {
    #[serde(default)]
    stock_locations: Vec<WireStore>,
}

#[derive(Debug, Deserialize)]
struct WireStore {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    address1: String,
    #[serde(default)]
    address2: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    country: WireCountry,
    #[serde(default)]
    zipcode: String,
    #[serde(default)]
    phone: String,
    location: GeoPoint,
    #[serde(default)]
    photo: WirePhoto,
}

#[derive(Debug, Default, Deserialize)]
struct WireCountry {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct WirePhoto {
    #[serde(default)]
    url: String,
}

impl From<WireStore> for Store {
    fn from(wire: WireStore) -> Self {
        let address = [
            wire.address1,
            wire.address2,
            wire.city,
            wire.country.name,
            wire.zipcode,
        ]
        .join(", ");
        Self {
            id: wire.id,
            name: wire.name,
            address,
            phone: wire.phone,
            location: wire.location,
            photo_url: wire.photo.url,
        }
    }
}

/// Fetches the stores near `origin`.
///
/// Any failure is appended to `errors` and reported as
/// [`FetchOutcome::Failed`]; this call never returns an error.
pub async fn fetch_stores(
    client: &ApiClient,
    origin: GeoPoint,
    errors: &ErrorLog,
) -> FetchOutcome<Store> {
    match fetch_stores_inner(client, origin).await {
        Ok(stores) => FetchOutcome::Fetched(stores),
        Err(error) => {
            tracing::warn!(error = %error, "nearby-store fetch failed");
            errors.record(ErrorScope::Stores, &error).await;
            FetchOutcome::Failed
        }
    }
}

async fn fetch_stores_inner(
    client: &ApiClient,
    origin: GeoPoint,
) -> Result<Vec<Store>, ExportError> {
    let response: NearbyStoresResponse = client
        .get(
            NEARBY_STORES_PATH,
            &[
                ("lat", origin.lat.to_string()),
                ("lon", origin.lon.to_string()),
            ],
        )
        .await?;
    Ok(response
        .stock_locations
        .into_iter()
        .map(Store::from)
        .collect())
}

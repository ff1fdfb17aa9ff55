mod client;
mod fake;
mod models;

pub use client::{CatalogClient, HttpCatalogClient};
pub use fake::{CatalogEndpoint, FakeCatalogClient};
pub use models::{CatalogArtist, CatalogTrack};

#[cfg(feature = "mock")]
pub use client::MockCatalogClient;

mod error;
mod loader;
mod source;
mod store;

pub use error::{CatalogError, FetchError};
pub use loader::{load_catalog, parse_catalog, ElementSet};
pub use source::{CatalogSource, HttpSource, DEFAULT_CATALOG_URL};
pub use store::{CatalogStore, StoreConfig};

/// Two GNSS element sets, one named and one bare.
#[cfg(test)]
pub(crate) const SAMPLE_CATALOG: &str = "\
GPS BIIR-2  (PRN 13)
1 24876U 97035A   24308.18587290  .00000048  00000+0  00000+0 0  9998
2 24876  55.6814 102.3506 0094281  58.1779 302.7530  2.00562576200764

1 40294U 14068A   24308.50000000 -.00000061  00000+0  00000+0 0  9996
2 40294  54.9868 223.4155 0033460 219.5046 140.2440  2.00564150 72698
";

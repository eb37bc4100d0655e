//! Data source module
//!
//! Resolves the pipeline's `data_url` locator and loads the raw table,
//! either the cached California housing archive or a CSV/tarball given by
//! URL or path.

pub mod california;
mod client;
mod locator;

pub use client::{read_archive_member, verify_checksum, DatasetClient};
pub use locator::{DataSource, CALIFORNIA_HOUSING};

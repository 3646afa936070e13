//! nwis_acquire: time series acquisition from the USGS NWIS daily values and
//! instantaneous values web services.
//!
//! # Module structure
//!
//! ```text
//! nwis_acquire
//! ├── model      - shared data types (SeriesIdentifier, TimeSeriesRecord, AcquisitionError, …)
//! ├── constraint - location filters: exactly one of sites, states, HUCs, bBox, counties
//! ├── codes      - parameter / statistic / site type code table
//! ├── variant    - daily vs instantaneous service policy
//! ├── config     - endpoint, timeout and format settings (nwis.toml + environment)
//! ├── logging    - tracing setup and failure classification
//! ├── ingest
//! │   ├── query    - deterministic query string construction
//! │   ├── fetch    - HTTP transport, error marker detection, response capture
//! │   ├── waterml  - WaterML JSON decoding into records
//! │   ├── interval - timestamp alignment against the series interval
//! │   └── fixtures (test only) - representative API response payloads
//! ├── service    - NwisClient: validate, build, fetch, decode
//! ├── locator    - single series reads from compact identifiers
//! └── verify     - discovery-only checks over lists of identifiers
//! ```

pub mod codes;
pub mod config;
pub mod constraint;
pub mod ingest;
pub mod locator;
pub mod logging;
pub mod model;
pub mod service;
pub mod variant;
pub mod verify;

pub use model::{AcquisitionError, AcquisitionMode, Result, SeriesIdentifier, TimeSeriesRecord};
pub use service::{AcquisitionParams, NwisClient};
pub use variant::ServiceVariant;

//! Request, retrieval and decoding for the NWIS web services.
//!
//! Submodules:
//! - `query`: `FetchRequest` and deterministic query string construction.
//! - `fetch`: HTTP GET, in-body error detection, optional raw capture.
//! - `waterml`: the decoder contract and the WaterML JSON decoder.
//! - `interval`: alignment of decoded timestamps to a declared interval.

pub mod fetch;
pub mod interval;
pub mod query;
pub mod waterml;

#[cfg(test)]
pub mod fixtures;

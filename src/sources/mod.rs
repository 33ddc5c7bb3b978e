//! Bulletin document sources.
//!
//! The pipeline consumes exactly one remote feed: the monthly CVRF bulletin
//! endpoint, implemented by [`msrc::MsrcSource`]. The source is a thin shell
//! around a single fetch-by-month request; everything with actual logic
//! lives in the parser, flattener, and aggregator.

pub mod msrc;

//! USGS Nonindigenous Aquatic Species (NAS) API access and source reconciliation.
pub mod client;
pub mod occurrence;

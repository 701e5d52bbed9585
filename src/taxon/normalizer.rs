use crate::error::{CrateError, Result};

/// Splits a binomial label into genus and specific epithet, ignoring any
/// trailing authorship.
pub fn split_binomial(name: &str) -> Result<(String, String)> {
    let mut words = name.split_whitespace();
    match (words.next(), words.next()) {
        (Some(genus), Some(species)) => Ok((genus.to_string(), species.to_string())),
        _ => Err(CrateError::InvalidBinomial(name.to_string())),
    }
}

use serde::Deserialize;

use crate::error::SeedError;

/// Picks the provider account that owns the row at `ordinal` (0-based,
/// counted within one category's file).
pub trait ProviderAssignment {
    fn provider_for(&self, ordinal: usize) -> u64;
}

impl<F> ProviderAssignment for F
where
    F: Fn(usize) -> u64,
{
    fn provider_for(&self, ordinal: usize) -> u64 {
        self(ordinal)
    }
}

/// Ordinals below `until` (and at or above the previous band's `until`)
/// belong to `provider_id`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct ProviderBand {
    pub until: usize,
    pub provider_id: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProviderBands {
    bands: Vec<ProviderBand>,
    fallback: u64,
}

impl ProviderBands {
    pub fn new(bands: Vec<ProviderBand>, fallback: u64) -> Self {
        Self { bands, fallback }
    }

    pub fn validate(&self) -> Result<(), SeedError> {
        for pair in self.bands.windows(2) {
            if pair[0].until >= pair[1].until {
                return Err(SeedError::Config(format!(
                    "provider bands must be ascending: {} then {}",
                    pair[0].until, pair[1].until
                )));
            }
        }
        Ok(())
    }
}

impl ProviderAssignment for ProviderBands {
    fn provider_for(&self, ordinal: usize) -> u64 {
        self.bands
            .iter()
            .find(|band| ordinal < band.until)
            .map_or(self.fallback, |band| band.provider_id)
    }
}

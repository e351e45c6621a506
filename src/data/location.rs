//! Station coordinates.
//!
//! Location is presentational only: statistics and forecasting never read it,
//! so a missing or malformed entry never fails a run. Resolution order:
//!
//! 1. caller-supplied override for the station
//! 2. the station map entry, if it parses
//! 3. the lookup's fallback coordinate (if any)

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse location {input:?}: {reason}")]
pub struct LocationError {
    pub input: String,
    pub reason: &'static str,
}

impl Coordinate {
    /// Parse `"(41.97, -87.66)"` (parentheses optional).
    pub fn parse(input: &str) -> Result<Coordinate, LocationError> {
        let err = |reason| LocationError {
            input: input.to_string(),
            reason,
        };

        let inner = input.trim().trim_start_matches('(').trim_end_matches(')');
        let (lat, long) = inner.split_once(',').ok_or_else(|| err("expected `lat,long`"))?;
        let latitude: f64 = lat.trim().parse().map_err(|_| err("latitude is not a number"))?;
        let longitude: f64 = long.trim().parse().map_err(|_| err("longitude is not a number"))?;

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(err("coordinate out of range"));
        }
        Ok(Coordinate { latitude, longitude })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationSource {
    Override,
    Map,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub coordinate: Coordinate,
    pub source: LocationSource,
}

/// Station name → raw location string, plus overrides and a fallback.
#[derive(Debug, Clone, Default)]
pub struct LocationLookup {
    entries: HashMap<String, String>,
    overrides: BTreeMap<String, Coordinate>,
    fallback: Option<Coordinate>,
}

impl LocationLookup {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn with_overrides(mut self, overrides: BTreeMap<String, Coordinate>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    pub fn with_fallback(mut self, fallback: Coordinate) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn resolve(&self, station: &str) -> Option<ResolvedLocation> {
        if let Some(&coordinate) = self.overrides.get(station) {
            return Some(ResolvedLocation {
                coordinate,
                source: LocationSource::Override,
            });
        }

        if let Some(raw) = self.entries.get(station) {
            match Coordinate::parse(raw) {
                Ok(coordinate) => {
                    return Some(ResolvedLocation {
                        coordinate,
                        source: LocationSource::Map,
                    });
                }
                Err(e) => log::warn!("{station}: {e}; using fallback location"),
            }
        }

        self.fallback.map(|coordinate| ResolvedLocation {
            coordinate,
            source: LocationSource::Fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parenthesized_pair() {
        let c = Coordinate::parse("(42.008362, -87.665909)").unwrap();
        assert!((c.latitude - 42.008362).abs() < 1e-9);
        assert!((c.longitude + 87.665909).abs() < 1e-9);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Coordinate::parse("").is_err());
        assert!(Coordinate::parse("(abc, 1.0)").is_err());
        assert!(Coordinate::parse("(95.0, 1.0)").is_err());
    }

    #[test]
    fn override_beats_map_and_bad_entry_falls_back() {
        let entries = HashMap::from([
            ("Morse".to_string(), "(42.008, -87.665)".to_string()),
            ("Loyola".to_string(), "not a location".to_string()),
        ]);
        let pin = Coordinate { latitude: 41.0, longitude: -87.0 };
        let fallback = Coordinate { latitude: 41.88, longitude: -87.63 };
        let lookup = LocationLookup::new(entries)
            .with_overrides(BTreeMap::from([("Morse".to_string(), pin)]))
            .with_fallback(fallback);

        let morse = lookup.resolve("Morse").unwrap();
        assert_eq!(morse.source, LocationSource::Override);
        assert_eq!(morse.coordinate, pin);

        let loyola = lookup.resolve("Loyola").unwrap();
        assert_eq!(loyola.source, LocationSource::Fallback);

        assert!(LocationLookup::default().resolve("Nowhere").is_none());
    }
}

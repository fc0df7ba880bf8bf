// Airport directory: station metadata and the connection graph behind the destination picker

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::fetcher::AirportMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airport {
    pub iata: String,
    pub short_name: String,
    pub country_code: String,
    pub country_name: String,
    pub currency_code: String,
    // Sorted IATA codes reachable directly from this airport
    pub connections: Vec<String>,
    pub is_fake_station: bool,
}

impl Airport {
    // "BUD - Budapest (HU)", or "BUD - Budapest" without the country suffix
    pub fn display_name(&self, with_country: bool) -> String {
        if with_country {
            format!("{} - {} ({})", self.iata, self.short_name, self.country_code)
        } else {
            format!("{} - {}", self.iata, self.short_name)
        }
    }
}

// Prices for a search are quoted in the currency of the departure airport
pub fn currency_for<'a>(airports: &'a AirportMap, origin: &str) -> Option<&'a str> {
    airports.get(origin).map(|a| a.currency_code.as_str())
}

// Groups the origin's real (non-fake) connections by country name, countries
// in alphabetical order and airports in connection order. Connections missing
// from the directory are skipped.
pub fn destinations_by_country(airports: &AirportMap, origin: &str) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();

    let Some(start) = airports.get(origin) else {
        return grouped;
    };

    for iata in &start.connections {
        match airports.get(iata) {
            Some(airport) if !airport.is_fake_station => grouped
                .entry(airport.country_name.clone())
                .or_default()
                .push(iata.clone()),
            _ => {}
        }
    }

    grouped
}

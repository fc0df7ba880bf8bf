// Airline wire format: timetable and airport-map JSON, plus normalization into the core model

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::directory::Airport;
use crate::fetcher::{AirportMap, FetchError, Timetable};
use crate::model::{FlightLeg, ADULT_COUNT, CHILD_COUNT, INFANT_COUNT};

// POST search/timetable body
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimetableRequest {
    pub flight_list: Vec<FlightListEntry>,
    pub price_type: String,
    pub adult_count: u32,
    pub child_count: u32,
    pub infant_count: u32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlightListEntry {
    pub departure_station: String,
    pub arrival_station: String,
    pub from: String,
    pub to: String,
}

impl TimetableRequest {
    // Both directions of the route over the same date window
    pub fn round_trip(origin: &str, destination: &str, date_from: NaiveDate, date_to: NaiveDate) -> Self {
        let from = date_from.format("%Y-%m-%d").to_string();
        let to = date_to.format("%Y-%m-%d").to_string();
        Self {
            flight_list: vec![
                FlightListEntry {
                    departure_station: origin.to_string(),
                    arrival_station: destination.to_string(),
                    from: from.clone(),
                    to: to.clone(),
                },
                FlightListEntry {
                    departure_station: destination.to_string(),
                    arrival_station: origin.to_string(),
                    from,
                    to,
                },
            ],
            price_type: "regular".to_string(),
            adult_count: ADULT_COUNT,
            child_count: CHILD_COUNT,
            infant_count: INFANT_COUNT,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierTimetable {
    pub outbound_flights: Vec<SupplierFlight>,
    pub return_flights: Vec<SupplierFlight>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierFlight {
    pub departure_station: String,
    pub arrival_station: String,
    pub departure_date: String,
    pub departure_dates: Vec<String>,
    pub price: SupplierPrice,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierPrice {
    pub amount: f64,
    pub currency_code: String,
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, FetchError> {
    raw.parse::<NaiveDateTime>()
        .map_err(|e| FetchError::InvalidTimestamp(format!("{}: {}", raw, e)))
}

impl SupplierFlight {
    // Zero-priced records mark sold-out or unpublished fares and are dropped
    pub fn into_leg(self) -> Result<Option<FlightLeg>, FetchError> {
        if self.price.amount == 0.0 {
            return Ok(None);
        }

        let departure_date = parse_timestamp(&self.departure_date)?.date();
        let departure_times = self
            .departure_dates
            .iter()
            .map(|raw| parse_timestamp(raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(FlightLeg {
            departure_station: self.departure_station,
            arrival_station: self.arrival_station,
            departure_date,
            departure_times,
            price: self.price.amount,
            currency: self.price.currency_code,
        }))
    }
}

fn normalize_legs(flights: Vec<SupplierFlight>) -> Result<Vec<FlightLeg>, FetchError> {
    let total = flights.len();
    let mut legs = Vec::with_capacity(total);
    for flight in flights {
        if let Some(leg) = flight.into_leg()? {
            legs.push(leg);
        }
    }
    if legs.len() < total {
        debug!("Dropped {} zero-price flights", total - legs.len());
    }
    Ok(legs)
}

impl TryFrom<SupplierTimetable> for Timetable {
    type Error = FetchError;

    fn try_from(item: SupplierTimetable) -> Result<Self, Self::Error> {
        Ok(Timetable {
            outbound: normalize_legs(item.outbound_flights)?,
            returns: normalize_legs(item.return_flights)?,
        })
    }
}

// GET asset/map body
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierAirportMap {
    pub cities: Vec<SupplierCity>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierCity {
    pub iata: String,
    pub short_name: String,
    pub country_code: String,
    pub country_name: String,
    pub currency_code: String,
    pub connections: Vec<SupplierConnection>,
    pub is_fake_station: bool,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierConnection {
    pub iata: String,
}

impl From<SupplierCity> for Airport {
    fn from(city: SupplierCity) -> Self {
        let mut connections: Vec<String> = city.connections.into_iter().map(|c| c.iata).collect();
        connections.sort();

        Airport {
            iata: city.iata,
            short_name: city.short_name.trim().to_string(),
            country_code: city.country_code,
            country_name: city.country_name,
            currency_code: city.currency_code,
            connections,
            is_fake_station: city.is_fake_station,
        }
    }
}

impl From<SupplierAirportMap> for AirportMap {
    fn from(item: SupplierAirportMap) -> Self {
        item.cities
            .into_iter()
            .map(Airport::from)
            .map(|airport| (airport.iata.clone(), airport))
            .collect()
    }
}

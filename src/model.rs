// Core data model shared by the pairing engine and the search orchestrator

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Longest date window a single search may cover
pub const MAX_SEARCH_SPAN_DAYS: i64 = 42;

// Upper bound of the stay-length slider
pub const MAX_NIGHTS: u32 = 41;

// Fixed passenger mix; fares are always quoted for one adult
pub const ADULT_COUNT: u32 = 1;
pub const CHILD_COUNT: u32 = 0;
pub const INFANT_COUNT: u32 = 0;

pub const BOOKING_BASE_URL: &str = "https://wizzair.com/en-gb/booking/select-flight";

// One scheduled flight instance as published in the airline timetable.
// `departure_date` is day-level and drives night counting, `departure_times`
// holds the concrete departures (origin-local) used for display and booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightLeg {
    pub departure_station: String,
    pub arrival_station: String,
    pub departure_date: NaiveDate,
    pub departure_times: Vec<NaiveDateTime>,
    pub price: f64,
    pub currency: String,
}

impl FlightLeg {
    pub fn first_departure(&self) -> NaiveDateTime {
        self.departure_times
            .first()
            .copied()
            .unwrap_or_else(|| self.departure_date.and_time(NaiveTime::MIN))
    }

    pub fn last_departure(&self) -> NaiveDateTime {
        self.departure_times
            .last()
            .copied()
            .unwrap_or_else(|| self.departure_date.and_time(NaiveTime::MIN))
    }

    // Whole days between this leg's departure date and `later`'s.
    // Negative when `later` departs first.
    pub fn nights_until(&self, later: &FlightLeg) -> i64 {
        (later.departure_date - self.departure_date).num_days()
    }
}

// The origin/destination pair that was searched. Leg stations may differ from it
// (alternate airports), so booking links are always built from this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

impl Route {
    pub fn new(origin: &str, destination: &str) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
        }
    }
}

// A priced trip: one outbound leg and, for round trips, one return leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub price: f64,
    pub outbound_departure: NaiveDateTime,
    pub return_departure: Option<NaiveDateTime>,
    // Station the return leg departs from; may differ from the destination
    pub return_from: Option<String>,
    pub nights: Option<i64>,
    pub booking_url: String,
}

impl Itinerary {
    pub fn one_way(route: &Route, outbound: &FlightLeg) -> Self {
        let outbound_departure = outbound.first_departure();
        Self {
            price: outbound.price,
            outbound_departure,
            return_departure: None,
            return_from: None,
            nights: None,
            booking_url: booking_link(
                &route.origin,
                &route.destination,
                outbound_departure.date(),
                None,
            ),
        }
    }

    pub fn round_trip(route: &Route, outbound: &FlightLeg, inbound: &FlightLeg) -> Self {
        let outbound_departure = outbound.first_departure();
        let return_departure = inbound.last_departure();
        Self {
            price: outbound.price + inbound.price,
            outbound_departure,
            return_departure: Some(return_departure),
            return_from: Some(inbound.departure_station.clone()),
            nights: Some(outbound.nights_until(inbound)),
            booking_url: booking_link(
                &route.origin,
                &route.destination,
                outbound_departure.date(),
                Some(return_departure.date()),
            ),
        }
    }

    pub fn is_round_trip(&self) -> bool {
        self.return_departure.is_some()
    }

    // True unless the return leg leaves from a station other than `destination`
    pub fn returns_from(&self, destination: &str) -> bool {
        self.return_from
            .as_deref()
            .map_or(true, |station| station == destination)
    }
}

// Best itinerary found for one destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationBest {
    pub destination: String,
    pub itinerary: Itinerary,
}

// Builds the airline's select-flight deep link. One-way trips carry a `null` return date.
pub fn booking_link(
    origin: &str,
    destination: &str,
    outbound: NaiveDate,
    inbound: Option<NaiveDate>,
) -> String {
    let inbound = inbound.map_or_else(|| "null".to_string(), |d| d.format("%Y-%m-%d").to_string());
    format!(
        "{}/{}/{}/{}/{}/{}/{}/{}",
        BOOKING_BASE_URL,
        origin,
        destination,
        outbound.format("%Y-%m-%d"),
        inbound,
        ADULT_COUNT,
        CHILD_COUNT,
        INFANT_COUNT
    )
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Please select a starting airport")]
    MissingOrigin,

    #[error("End date cannot be before start date")]
    EndBeforeStart,

    #[error("Date range cannot be longer than {max} days (got {days})")]
    RangeTooLong { days: i64, max: i64 },

    #[error("Min nights ({min_nights}) cannot be larger than the length of the date range ({range_days})")]
    MinNightsExceedRange { min_nights: u32, range_days: i64 },

    #[error("Min nights ({min_nights}) cannot be larger than max nights ({max_nights})")]
    NightsOutOfOrder { min_nights: u32, max_nights: u32 },

    #[error("Max nights cannot exceed {limit} (got {max_nights})")]
    NightsTooLong { max_nights: u32, limit: u32 },
}

// Inclusive stay-length window, in nights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayWindow {
    pub min_nights: u32,
    pub max_nights: u32,
}

impl Default for StayWindow {
    fn default() -> Self {
        Self {
            min_nights: 1,
            max_nights: 2,
        }
    }
}

impl StayWindow {
    pub fn contains(&self, nights: i64) -> bool {
        i64::from(self.min_nights) <= nights && nights <= i64::from(self.max_nights)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub origin: String,
    // Caller-supplied order is preserved in per-destination results
    pub destinations: Vec<String>,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub round_trip: bool,
    // Ignored for one-way searches
    pub stay: StayWindow,
}

impl SearchRequest {
    pub fn span_days(&self) -> i64 {
        (self.date_to - self.date_from).num_days()
    }

    // Mirrors the checks the search form performs before it lets a search run.
    // An empty destination list is not an error; it simply yields no results.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.origin.trim().is_empty() {
            return Err(RequestError::MissingOrigin);
        }

        let days = self.span_days();
        if days < 0 {
            return Err(RequestError::EndBeforeStart);
        }
        if days > MAX_SEARCH_SPAN_DAYS {
            return Err(RequestError::RangeTooLong {
                days,
                max: MAX_SEARCH_SPAN_DAYS,
            });
        }

        if self.round_trip {
            if self.stay.min_nights > self.stay.max_nights {
                return Err(RequestError::NightsOutOfOrder {
                    min_nights: self.stay.min_nights,
                    max_nights: self.stay.max_nights,
                });
            }
            if self.stay.max_nights > MAX_NIGHTS {
                return Err(RequestError::NightsTooLong {
                    max_nights: self.stay.max_nights,
                    limit: MAX_NIGHTS,
                });
            }
            if i64::from(self.stay.min_nights) > days {
                return Err(RequestError::MinNightsExceedRange {
                    min_nights: self.stay.min_nights,
                    range_days: days,
                });
            }
        }

        Ok(())
    }
}

// Pairing engine: turns outbound and return legs into priced, ranked itineraries

use crate::model::{FlightLeg, Itinerary, Route, StayWindow};

// Rows handed back per destination once ranked
pub const MAX_RESULT_ROWS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingConstraints {
    pub round_trip: bool,
    pub stay: StayWindow,
    pub max_rows: usize,
}

impl Default for PairingConstraints {
    fn default() -> Self {
        Self {
            round_trip: true,
            stay: StayWindow::default(),
            max_rows: MAX_RESULT_ROWS,
        }
    }
}

impl PairingConstraints {
    pub fn round_trip(min_nights: u32, max_nights: u32) -> Self {
        Self {
            round_trip: true,
            stay: StayWindow {
                min_nights,
                max_nights,
            },
            ..Self::default()
        }
    }

    pub fn one_way() -> Self {
        Self {
            round_trip: false,
            ..Self::default()
        }
    }
}

// Every itinerary allowed by `constraints`, cheapest first, capped at `max_rows`.
// One-way ignores `returns`. Round trips walk the full outbound x returns cross
// product; legs are not assumed sorted. Equal prices keep enumeration order.
// Booking links point at `route`, whatever stations the legs carry.
pub fn pair(
    route: &Route,
    outbound: &[FlightLeg],
    returns: &[FlightLeg],
    constraints: &PairingConstraints,
) -> Vec<Itinerary> {
    let mut trips: Vec<Itinerary> = if constraints.round_trip {
        let mut trips = Vec::new();
        for out in outbound {
            for ret in returns {
                if constraints.stay.contains(out.nights_until(ret)) {
                    trips.push(Itinerary::round_trip(route, out, ret));
                }
            }
        }
        trips
    } else {
        outbound.iter().map(|out| Itinerary::one_way(route, out)).collect()
    };

    rank(&mut trips, constraints.max_rows);
    trips
}

// Stable ascending price order, capped at `max_rows`
pub fn rank(trips: &mut Vec<Itinerary>, max_rows: usize) {
    trips.sort_by(|a, b| a.price.total_cmp(&b.price));
    trips.truncate(max_rows);
}

// Search orchestrator: runs the pairing engine per destination and ranks the winners

use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::fetcher::{TimetableFetcher, AIRPORTS_TTL, TIMETABLE_TTL};
use crate::model::{DestinationBest, Itinerary, Route, SearchRequest};
use crate::pairing::{pair, PairingConstraints, MAX_RESULT_ROWS};

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub max_rows: usize,
    // Destinations fetched at once. 1 reproduces the paced sequential behaviour;
    // raise it only together with the client's pacing delay.
    pub max_concurrency: usize,
    pub timetable_ttl: Duration,
    pub airports_ttl: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_rows: MAX_RESULT_ROWS,
            max_concurrency: 1,
            timetable_ttl: TIMETABLE_TTL,
            airports_ttl: AIRPORTS_TTL,
        }
    }
}

// Receives one tick per processed destination, successful or not
pub trait ProgressReporter: Send + Sync {
    fn advance(&self, completed: usize, total: usize);
}

impl<F> ProgressReporter for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn advance(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn advance(&self, _completed: usize, _total: usize) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum DestinationOutcome {
    Found(Vec<Itinerary>),
    // Upstream answered, nothing matched the dates or stay window
    NoFlights,
    // Upstream could not be reached or its answer could not be read
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DestinationTable {
    pub destination: String,
    pub outcome: DestinationOutcome,
}

impl DestinationTable {
    pub fn itineraries(&self) -> &[Itinerary] {
        match &self.outcome {
            DestinationOutcome::Found(trips) => trips,
            _ => &[],
        }
    }

    // Cheapest itinerary; tables are kept in ranked order
    pub fn best(&self) -> Option<&Itinerary> {
        self.itineraries().first()
    }

    pub fn is_empty(&self) -> bool {
        self.itineraries().is_empty()
    }

    // When true the "return from" column carries no information for this table
    pub fn returns_to_destination(&self) -> bool {
        self.itineraries()
            .iter()
            .all(|trip| trip.returns_from(&self.destination))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    // One entry per destination that produced anything, cheapest first
    pub best: Vec<DestinationBest>,
    // One entry per requested destination, in request order
    pub tables: Vec<DestinationTable>,
}

impl SearchOutcome {
    pub fn table(&self, destination: &str) -> Option<&DestinationTable> {
        self.tables.iter().find(|t| t.destination == destination)
    }

    pub fn all_return_to_destination(&self) -> bool {
        self.best
            .iter()
            .all(|b| b.itinerary.returns_from(&b.destination))
    }
}

// Stable ascending price order over each destination's cheapest itinerary
pub fn best_per_destination(tables: &[DestinationTable]) -> Vec<DestinationBest> {
    let mut best: Vec<DestinationBest> = tables
        .iter()
        .filter_map(|table| {
            table.best().map(|itinerary| DestinationBest {
                destination: table.destination.clone(),
                itinerary: itinerary.clone(),
            })
        })
        .collect();
    best.sort_by(|a, b| a.itinerary.price.total_cmp(&b.itinerary.price));
    best
}

pub struct SearchOrchestrator<F> {
    fetcher: F,
    config: SearchConfig,
}

impl<F: TimetableFetcher> SearchOrchestrator<F> {
    pub fn new(fetcher: F, config: SearchConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    // Never fails: a destination whose timetable cannot be fetched ends up as
    // `FetchFailed` and the others carry on. Tables come back in request order
    // whatever order the fetches finish in. Callers validate the request.
    pub async fn search(
        &self,
        request: &SearchRequest,
        progress: &dyn ProgressReporter,
    ) -> SearchOutcome {
        let total = request.destinations.len();
        let completed = AtomicUsize::new(0);
        let constraints = PairingConstraints {
            round_trip: request.round_trip,
            stay: request.stay,
            max_rows: self.config.max_rows,
        };

        let tables: Vec<DestinationTable> = stream::iter(&request.destinations)
            .map(|destination| {
                let completed = &completed;
                async move {
                    let table = self
                        .search_destination(request, destination, &constraints)
                        .await;
                    progress.advance(completed.fetch_add(1, Ordering::SeqCst) + 1, total);
                    table
                }
            })
            .buffered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let best = best_per_destination(&tables);
        info!(
            "Search from {} finished: {} of {} destinations with flights",
            request.origin,
            best.len(),
            total
        );

        SearchOutcome { best, tables }
    }

    async fn search_destination(
        &self,
        request: &SearchRequest,
        destination: &str,
        constraints: &PairingConstraints,
    ) -> DestinationTable {
        let outcome = match self
            .fetcher
            .fetch_timetable(&request.origin, destination, request.date_from, request.date_to)
            .await
        {
            Ok(timetable) => {
                let route = Route::new(&request.origin, destination);
                let trips = pair(&route, &timetable.outbound, &timetable.returns, constraints);
                debug!("{}-{}: {} itineraries", request.origin, destination, trips.len());
                if trips.is_empty() {
                    DestinationOutcome::NoFlights
                } else {
                    DestinationOutcome::Found(trips)
                }
            }
            Err(e) => {
                warn!("Skipping {}-{}: {}", request.origin, destination, e);
                DestinationOutcome::FetchFailed(e.to_string())
            }
        };

        DestinationTable {
            destination: destination.to_string(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::mock_fetcher::MockTimetableFetcher;
    use crate::fetcher::{FetchError, Timetable};
    use crate::model::{FlightLeg, StayWindow};
    use chrono::NaiveDate;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn june(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn leg(from: &str, to: &str, d: u32, price: f64) -> FlightLeg {
        FlightLeg {
            departure_station: from.to_string(),
            arrival_station: to.to_string(),
            departure_date: june(d),
            departure_times: vec![june(d).and_hms_opt(8, 0, 0).unwrap()],
            price,
            currency: "EUR".to_string(),
        }
    }

    // Round trip BUD <-> `dest`; cheapest pairing costs `outbound + ret`
    fn timetable(dest: &str, outbound: f64, ret: f64) -> Timetable {
        Timetable {
            outbound: vec![leg("BUD", dest, 1, outbound + 20.0), leg("BUD", dest, 3, outbound)],
            returns: vec![leg(dest, "BUD", 5, ret)],
        }
    }

    fn request(destinations: &[&str]) -> SearchRequest {
        SearchRequest {
            origin: "BUD".to_string(),
            destinations: destinations.iter().map(|d| d.to_string()).collect(),
            date_from: june(1),
            date_to: june(30),
            round_trip: true,
            stay: StayWindow {
                min_nights: 1,
                max_nights: 5,
            },
        }
    }

    fn best_summary(outcome: &SearchOutcome) -> Vec<(String, f64)> {
        outcome
            .best
            .iter()
            .map(|b| (b.destination.clone(), b.itinerary.price))
            .collect()
    }

    #[tokio::test]
    async fn test_best_of_all_destinations_sorted_by_price() {
        let mock = MockTimetableFetcher::new();
        mock.add_timetable("LTN", timetable("LTN", 80.0, 50.0));
        mock.add_timetable("BCN", timetable("BCN", 40.0, 50.0));
        let orchestrator = SearchOrchestrator::new(mock, SearchConfig::default());

        let outcome = orchestrator.search(&request(&["LTN", "BCN"]), &NoProgress).await;

        assert_eq!(
            best_summary(&outcome),
            vec![("BCN".to_string(), 90.0), ("LTN".to_string(), 130.0)]
        );
        let ltn: Vec<f64> = outcome.table("LTN").unwrap().itineraries().iter().map(|t| t.price).collect();
        assert_eq!(ltn, vec![130.0, 150.0]);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_destinations() {
        let mock = MockTimetableFetcher::new();
        mock.add_timetable("A", timetable("A", 100.0, 10.0));
        mock.fail_destination("B", FetchError::Network("connection reset".to_string()));
        mock.add_timetable("C", timetable("C", 60.0, 10.0));
        let orchestrator = SearchOrchestrator::new(mock, SearchConfig::default());

        let outcome = orchestrator.search(&request(&["A", "B", "C"]), &NoProgress).await;

        let order: Vec<&str> = outcome.tables.iter().map(|t| t.destination.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
        assert_eq!(
            outcome.table("B").unwrap().outcome,
            DestinationOutcome::FetchFailed("Network error: connection reset".to_string())
        );
        assert!(outcome.table("B").unwrap().is_empty());
        assert_eq!(
            best_summary(&outcome),
            vec![("C".to_string(), 70.0), ("A".to_string(), 110.0)]
        );
    }

    #[tokio::test]
    async fn test_no_flights_is_distinct_from_failure() {
        let mock = MockTimetableFetcher::new();
        mock.add_timetable("LTN", timetable("LTN", 80.0, 50.0));
        let orchestrator = SearchOrchestrator::new(mock, SearchConfig::default());

        let mut req = request(&["LTN", "BCN"]);
        req.stay = StayWindow {
            min_nights: 5,
            max_nights: 5,
        };
        let outcome = orchestrator.search(&req, &NoProgress).await;

        assert_eq!(outcome.table("LTN").unwrap().outcome, DestinationOutcome::NoFlights);
        assert_eq!(outcome.table("BCN").unwrap().outcome, DestinationOutcome::NoFlights);
        assert!(outcome.best.is_empty());
    }

    #[tokio::test]
    async fn test_empty_destination_set_yields_empty_outcome() {
        let mock = MockTimetableFetcher::new();
        let orchestrator = SearchOrchestrator::new(mock, SearchConfig::default());

        let outcome = orchestrator.search(&request(&[]), &NoProgress).await;

        assert_eq!(outcome, SearchOutcome::default());
        assert_eq!(orchestrator.fetcher().call_count(), 0);
    }

    #[tokio::test]
    async fn test_progress_ticks_once_per_destination() {
        let mock = MockTimetableFetcher::new();
        mock.add_timetable("A", timetable("A", 10.0, 10.0));
        mock.fail_destination("B", FetchError::Decode("unexpected end of input".to_string()));
        let orchestrator = SearchOrchestrator::new(mock, SearchConfig::default());

        let ticks = Mutex::new(Vec::new());
        let reporter = |completed: usize, total: usize| ticks.lock().push((completed, total));
        orchestrator.search(&request(&["A", "B", "C"]), &reporter).await;

        assert_eq!(ticks.into_inner(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_one_way_search() {
        let mock = MockTimetableFetcher::new();
        mock.add_timetable("LTN", timetable("LTN", 80.0, 50.0));
        let orchestrator = SearchOrchestrator::new(mock, SearchConfig::default());

        let mut req = request(&["LTN"]);
        req.round_trip = false;
        let outcome = orchestrator.search(&req, &NoProgress).await;

        let table = outcome.table("LTN").unwrap();
        assert_eq!(table.itineraries().len(), 2);
        assert_eq!(table.best().unwrap().price, 80.0);
        assert!(outcome.all_return_to_destination());
    }

    #[tokio::test]
    async fn test_booking_link_follows_requested_destination() {
        let mock = MockTimetableFetcher::new();
        mock.add_timetable(
            "LON",
            Timetable {
                outbound: vec![leg("BUD", "LTN", 1, 60.0)],
                returns: vec![leg("LGW", "BUD", 3, 40.0)],
            },
        );
        let orchestrator = SearchOrchestrator::new(mock, SearchConfig::default());

        let outcome = orchestrator.search(&request(&["LON"]), &NoProgress).await;

        let best = outcome.table("LON").unwrap().best().unwrap();
        assert_eq!(
            best.booking_url,
            "https://wizzair.com/en-gb/booking/select-flight/BUD/LON/2024-06-01/2024-06-03/1/0/0"
        );
        assert_eq!(best.return_from.as_deref(), Some("LGW"));
        assert!(!outcome.all_return_to_destination());
    }

    #[tokio::test]
    async fn test_zero_length_range_runs_without_error() {
        let mock = MockTimetableFetcher::new();
        mock.add_timetable(
            "LTN",
            Timetable {
                outbound: vec![leg("BUD", "LTN", 1, 30.0)],
                returns: vec![leg("LTN", "BUD", 1, 25.0)],
            },
        );
        mock.add_timetable("BCN", Timetable::default());
        let orchestrator = SearchOrchestrator::new(mock, SearchConfig::default());

        let mut req = request(&["LTN", "BCN"]);
        req.date_to = req.date_from;
        req.stay = StayWindow {
            min_nights: 0,
            max_nights: 0,
        };
        assert!(req.validate().is_ok());
        let outcome = orchestrator.search(&req, &NoProgress).await;

        assert_eq!(best_summary(&outcome), vec![("LTN".to_string(), 55.0)]);
        assert_eq!(outcome.table("LTN").unwrap().best().unwrap().nights, Some(0));
        assert_eq!(outcome.table("BCN").unwrap().outcome, DestinationOutcome::NoFlights);
        assert_eq!(orchestrator.fetcher().call_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_search_keeps_request_order() {
        let mock = MockTimetableFetcher::new();
        mock.set_delay(20);
        for (dest, price) in [("A", 50.0), ("B", 30.0), ("C", 40.0), ("D", 30.0)] {
            mock.add_timetable(dest, timetable(dest, price, 0.5));
        }
        let config = SearchConfig {
            max_concurrency: 3,
            ..SearchConfig::default()
        };
        let orchestrator = SearchOrchestrator::new(Arc::new(mock), config);

        let outcome = orchestrator.search(&request(&["A", "B", "C", "D"]), &NoProgress).await;

        let order: Vec<&str> = outcome.tables.iter().map(|t| t.destination.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C", "D"]);
        // B and D tie; request order decides
        let best: Vec<String> = outcome.best.iter().map(|b| b.destination.clone()).collect();
        assert_eq!(best, vec!["B", "D", "C", "A"]);
        assert_eq!(orchestrator.fetcher().call_count(), 4);
    }

    #[tokio::test]
    async fn test_row_cap_comes_from_config() {
        let mock = MockTimetableFetcher::new();
        mock.add_timetable("LTN", timetable("LTN", 80.0, 50.0));
        let config = SearchConfig {
            max_rows: 1,
            ..SearchConfig::default()
        };
        let orchestrator = SearchOrchestrator::new(mock, config);

        let outcome = orchestrator.search(&request(&["LTN"]), &NoProgress).await;
        assert_eq!(outcome.table("LTN").unwrap().itineraries().len(), 1);
    }

    #[test]
    fn test_return_from_column_detection() {
        let mut tt = timetable("LTN", 80.0, 50.0);
        tt.returns.push(leg("LGW", "BUD", 4, 10.0));
        let trips = pair(
            &Route::new("BUD", "LTN"),
            &tt.outbound,
            &tt.returns,
            &PairingConstraints::round_trip(1, 5),
        );

        let table = DestinationTable {
            destination: "LTN".to_string(),
            outcome: DestinationOutcome::Found(trips),
        };
        assert!(!table.returns_to_destination());
        assert_eq!(table.best().unwrap().return_from.as_deref(), Some("LGW"));

        let outcome = SearchOutcome {
            best: best_per_destination(std::slice::from_ref(&table)),
            tables: vec![table],
        };
        assert!(!outcome.all_return_to_destination());
    }
}

// Cheapest-fare finder for a single airline's published timetable

pub mod cache;
pub mod client;
pub mod directory;
pub mod fetcher;
pub mod finder;
pub mod model;
pub mod pairing;
pub mod search;
pub mod supplier;

// Re-export key types for convenience
pub use cache::{CacheConfig, CacheStatsReport, ExpiringCache, TtlCache};
pub use client::{AirlineApiClient, ClientConfig, ClientError};
pub use directory::{currency_for, destinations_by_country, Airport};
pub use fetcher::{
    AirportDirectory, AirportMap, CachedAirportDirectory, CachedTimetableFetcher, FetchError,
    Timetable, TimetableFetcher,
};
pub use finder::FareFinder;
pub use model::{
    booking_link, DestinationBest, FlightLeg, Itinerary, RequestError, Route, SearchRequest,
    StayWindow,
};
pub use pairing::{pair, PairingConstraints, MAX_RESULT_ROWS};
pub use search::{
    DestinationOutcome, DestinationTable, NoProgress, ProgressReporter, SearchConfig,
    SearchOrchestrator, SearchOutcome,
};

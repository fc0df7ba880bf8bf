// Entry point wiring: one cached directory, one cached timetable source, one orchestrator

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::client::{AirlineApiClient, ClientConfig, ClientError};
use crate::directory::{currency_for, destinations_by_country};
use crate::fetcher::{
    AirportDirectory, AirportMap, CachedAirportDirectory, CachedTimetableFetcher, FetchError,
    TimetableFetcher,
};
use crate::model::{RequestError, SearchRequest};
use crate::search::{ProgressReporter, SearchConfig, SearchOrchestrator, SearchOutcome};

// Owns the caches for the lifetime of the finder; searches started through
// the same finder share them.
pub struct FareFinder<T, D> {
    directory: CachedAirportDirectory<D>,
    orchestrator: SearchOrchestrator<CachedTimetableFetcher<T>>,
}

impl FareFinder<Arc<AirlineApiClient>, Arc<AirlineApiClient>> {
    pub fn connect(client: ClientConfig, search: SearchConfig) -> Result<Self, ClientError> {
        let client = Arc::new(AirlineApiClient::new(client)?);
        Ok(Self::new(Arc::clone(&client), client, search))
    }
}

impl<T: TimetableFetcher, D: AirportDirectory> FareFinder<T, D> {
    pub fn new(timetables: T, airports: D, config: SearchConfig) -> Self {
        let directory = CachedAirportDirectory::with_ttl(airports, config.airports_ttl);
        let fetcher = CachedTimetableFetcher::with_ttl(timetables, config.timetable_ttl);
        Self {
            directory,
            orchestrator: SearchOrchestrator::new(fetcher, config),
        }
    }

    pub async fn airports(&self) -> Result<Arc<AirportMap>, FetchError> {
        self.directory.fetch_airports().await
    }

    // Picker data for `origin`: reachable airports grouped by country
    pub async fn destinations(&self, origin: &str) -> Result<BTreeMap<String, Vec<String>>, FetchError> {
        let airports = self.airports().await?;
        Ok(destinations_by_country(&airports, origin))
    }

    pub async fn currency(&self, origin: &str) -> Result<Option<String>, FetchError> {
        let airports = self.airports().await?;
        Ok(currency_for(&airports, origin).map(str::to_string))
    }

    // Validates `request` and runs it. Invalid requests are rejected before
    // anything is fetched; upstream failures never surface here.
    pub async fn search(
        &self,
        request: &SearchRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<SearchOutcome, RequestError> {
        request.validate()?;
        info!(
            "Searching {} destinations from {} ({} to {})",
            request.destinations.len(),
            request.origin,
            request.date_from,
            request.date_to
        );
        Ok(self.orchestrator.search(request, progress).await)
    }

    pub fn orchestrator(&self) -> &SearchOrchestrator<CachedTimetableFetcher<T>> {
        &self.orchestrator
    }

    pub fn directory(&self) -> &CachedAirportDirectory<D> {
        &self.directory
    }
}

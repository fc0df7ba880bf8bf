// Upstream collaborator interfaces (timetables, airport directory) and their cached wrappers

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{CacheConfig, CacheStatsReport, ExpiringCache, TtlCache};
use crate::directory::Airport;
use crate::model::FlightLeg;

pub const TIMETABLE_TTL: Duration = Duration::from_secs(60 * 60);
pub const AIRPORTS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream error: {status_code} - {message}")]
    Status { status_code: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

// Both directions of one route over one date range, zero-price legs already dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timetable {
    pub outbound: Vec<FlightLeg>,
    pub returns: Vec<FlightLeg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimetableKey {
    pub origin: String,
    pub destination: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl TimetableKey {
    pub fn new(origin: &str, destination: &str, date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            date_from,
            date_to,
        }
    }
}

pub type AirportMap = BTreeMap<String, Airport>;

#[async_trait]
pub trait TimetableFetcher: Send + Sync + 'static {
    async fn fetch_timetable(
        &self,
        origin: &str,
        destination: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Arc<Timetable>, FetchError>;
}

#[async_trait]
pub trait AirportDirectory: Send + Sync + 'static {
    async fn fetch_airports(&self) -> Result<Arc<AirportMap>, FetchError>;
}

#[async_trait]
impl<T: TimetableFetcher + ?Sized> TimetableFetcher for Arc<T> {
    async fn fetch_timetable(
        &self,
        origin: &str,
        destination: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Arc<Timetable>, FetchError> {
        (**self)
            .fetch_timetable(origin, destination, date_from, date_to)
            .await
    }
}

#[async_trait]
impl<T: AirportDirectory + ?Sized> AirportDirectory for Arc<T> {
    async fn fetch_airports(&self) -> Result<Arc<AirportMap>, FetchError> {
        (**self).fetch_airports().await
    }
}

// Wraps a fetcher so each (origin, destination, from, to) key hits upstream
// at most once per validity window, even under concurrent requests.
pub struct CachedTimetableFetcher<F> {
    inner: F,
    cache: ExpiringCache<TimetableKey, Timetable>,
    ttl: Duration,
}

impl<F: TimetableFetcher> CachedTimetableFetcher<F> {
    pub fn new(inner: F) -> Self {
        Self::with_ttl(inner, TIMETABLE_TTL)
    }

    pub fn with_ttl(inner: F, ttl: Duration) -> Self {
        Self {
            inner,
            cache: ExpiringCache::new(CacheConfig::with_ttl(ttl)),
            ttl,
        }
    }

    pub fn cache_stats(&self) -> CacheStatsReport {
        self.cache.stats()
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: TimetableFetcher> TimetableFetcher for CachedTimetableFetcher<F> {
    async fn fetch_timetable(
        &self,
        origin: &str,
        destination: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Arc<Timetable>, FetchError> {
        let key = TimetableKey::new(origin, destination, date_from, date_to);
        self.cache
            .get_or_try_insert_with(key, Some(self.ttl), || async {
                let timetable = self
                    .inner
                    .fetch_timetable(origin, destination, date_from, date_to)
                    .await?;
                debug!(
                    "Caching timetable {}-{} ({} outbound, {} return)",
                    origin,
                    destination,
                    timetable.outbound.len(),
                    timetable.returns.len()
                );
                Ok::<_, FetchError>(Arc::unwrap_or_clone(timetable))
            })
            .await
    }
}

// Single-entry cache over the airport directory
pub struct CachedAirportDirectory<D> {
    inner: D,
    cache: ExpiringCache<(), AirportMap>,
    ttl: Duration,
}

impl<D: AirportDirectory> CachedAirportDirectory<D> {
    pub fn new(inner: D) -> Self {
        Self::with_ttl(inner, AIRPORTS_TTL)
    }

    pub fn with_ttl(inner: D, ttl: Duration) -> Self {
        Self {
            inner,
            cache: ExpiringCache::new(CacheConfig {
                max_entries: 1,
                ..CacheConfig::with_ttl(ttl)
            }),
            ttl,
        }
    }

    pub fn cache_stats(&self) -> CacheStatsReport {
        self.cache.stats()
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

#[async_trait]
impl<D: AirportDirectory> AirportDirectory for CachedAirportDirectory<D> {
    async fn fetch_airports(&self) -> Result<Arc<AirportMap>, FetchError> {
        self.cache
            .get_or_try_insert_with((), Some(self.ttl), || async {
                let airports = self.inner.fetch_airports().await?;
                info!("Loaded {} airports into directory cache", airports.len());
                Ok::<_, FetchError>(Arc::unwrap_or_clone(airports))
            })
            .await
    }
}

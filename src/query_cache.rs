// Query cache shared by every query handle of a session.
//
// Entries are keyed by resource plus parameters. At most one fetch per key is
// in flight; later callers join it. Entries live as long as some observer
// holds the key, and results that settle after the last observer went away,
// or after the cache was cleared, are dropped instead of applied.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::backend::ApiError;
use crate::config::{CacheConfig, RetryConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Profile,
    AdminFlag,
    Destinations,
    Packages,
    Flights,
    Bookings,
    Contacts,
    BlogPosts,
    Testimonials,
    FeaturedDestinations,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Profile => "profile",
            Resource::AdminFlag => "admin-flag",
            Resource::Destinations => "destinations",
            Resource::Packages => "packages",
            Resource::Flights => "flights",
            Resource::Bookings => "bookings",
            Resource::Contacts => "contacts",
            Resource::BlogPosts => "blogPosts",
            Resource::Testimonials => "testimonials",
            Resource::FeaturedDestinations => "featuredDestinations",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    resource: Resource,
    parts: Vec<String>,
}

impl QueryKey {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            parts: Vec::new(),
        }
    }

    pub fn with_part(mut self, part: impl Into<String>) -> Self {
        self.parts.push(part.into());
        self
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }
}

impl From<Resource> for QueryKey {
    fn from(resource: Resource) -> Self {
        QueryKey::new(resource)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource.as_str())?;
        for part in &self.parts {
            write!(f, "/{}", part)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Loading,
    Error,
    Success,
}

/// What a consumer of a query observes.
#[derive(Debug)]
pub enum QueryState<T> {
    // Enablement condition not met, nothing was fetched.
    Disabled,
    // Enabled but never fetched.
    Idle,
    Loading,
    Error(ApiError),
    Success(Arc<T>),
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        match self {
            QueryState::Disabled => QueryState::Disabled,
            QueryState::Idle => QueryState::Idle,
            QueryState::Loading => QueryState::Loading,
            QueryState::Error(error) => QueryState::Error(error.clone()),
            QueryState::Success(value) => QueryState::Success(Arc::clone(value)),
        }
    }
}

impl<T> QueryState<T> {
    pub fn status(&self) -> Option<FetchStatus> {
        match self {
            QueryState::Disabled => None,
            QueryState::Idle => Some(FetchStatus::Idle),
            QueryState::Loading => Some(FetchStatus::Loading),
            QueryState::Error(_) => Some(FetchStatus::Error),
            QueryState::Success(_) => Some(FetchStatus::Success),
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, QueryState::Disabled)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn data(&self) -> Option<&Arc<T>> {
        match self {
            QueryState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            QueryState::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<Result<Arc<T>, ApiError>> {
        match self {
            QueryState::Success(value) => Some(Ok(value)),
            QueryState::Error(error) => Some(Err(error)),
            _ => None,
        }
    }
}

// Per-fetch policy: request timeout plus optional bounded retry.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub retry: Option<RetryConfig>,
}

impl FetchOptions {
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            timeout,
            retry: None,
        }
    }

    pub fn with_retry(timeout: Duration, retry: RetryConfig) -> Self {
        Self {
            timeout,
            retry: Some(retry),
        }
    }
}

type AnyValue = Arc<dyn Any + Send + Sync>;
type FetchOutcome = Result<AnyValue, ApiError>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

struct CacheEntry {
    value: Option<AnyValue>,
    status: FetchStatus,
    error: Option<ApiError>,
    updated_at: Option<Instant>,
    stale: bool,
    // Sequence number of the last invalidation that touched this key.
    invalidated_at: u64,
}

impl CacheEntry {
    fn new() -> Self {
        Self {
            value: None,
            status: FetchStatus::Idle,
            error: None,
            updated_at: None,
            stale: false,
            invalidated_at: 0,
        }
    }

    fn fresh_value(&self, stale_time: Duration) -> Option<AnyValue> {
        if self.status != FetchStatus::Success || self.stale {
            return None;
        }
        match self.updated_at {
            Some(updated_at) if updated_at.elapsed() < stale_time => self.value.clone(),
            _ => None,
        }
    }
}

struct InFlight {
    fetch_id: u64,
    future: SharedFetch,
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub fetch_count: AtomicUsize,
    pub coalesced_count: AtomicUsize,
    pub error_count: AtomicUsize,
    pub retry_count: AtomicUsize,
    pub invalidation_count: AtomicUsize,
    pub discarded_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub in_flight_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub fetch_count: usize,
    pub coalesced_count: usize,
    pub error_count: usize,
    pub retry_count: usize,
    pub invalidation_count: usize,
    pub discarded_count: usize,
}

struct CacheInner {
    entries: DashMap<QueryKey, CacheEntry>,
    in_flight: DashMap<QueryKey, InFlight>,
    observers: DashMap<QueryKey, usize>,
    config: RwLock<CacheConfig>,
    stats: CacheStats,
    // Bumped by `clear`; fetches from an older generation are never applied.
    generation: AtomicU64,
    // Shared counter for fetch ids and invalidation stamps.
    sequence: AtomicU64,
}

#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                in_flight: DashMap::new(),
                observers: DashMap::new(),
                config: RwLock::new(config),
                stats: CacheStats::default(),
                generation: AtomicU64::new(0),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    /// Register interest in `key`. The entry is created on first observation
    /// and discarded once the last guard is dropped.
    pub fn observe(&self, key: QueryKey) -> ObserverGuard {
        // Lock order is observers then entries, here and in drop / settle.
        let mut count = self.inner.observers.entry(key.clone()).or_insert(0);
        *count += 1;
        self.inner
            .entries
            .entry(key.clone())
            .or_insert_with(CacheEntry::new);
        drop(count);
        ObserverGuard {
            inner: Arc::clone(&self.inner),
            key,
        }
    }

    pub fn observer_count(&self, key: &QueryKey) -> usize {
        self.inner.observers.get(key).map(|count| *count).unwrap_or(0)
    }

    /// Return the cached value when fresh, otherwise fetch it. A fetch already
    /// in flight for the key is joined rather than repeated. `force` skips the
    /// freshness check but still joins an in-flight fetch. A fetch overtaken
    /// by `clear` fails with `SessionUnavailable`.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: &QueryKey,
        options: FetchOptions,
        force: bool,
        fetcher: F,
    ) -> Result<Arc<T>, ApiError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        if !force {
            let stale_time = self.inner.config.read().stale_time();
            let fresh = self
                .inner
                .entries
                .get(key)
                .and_then(|entry| entry.fresh_value(stale_time));
            if let Some(value) = fresh {
                self.inner.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                debug!(key = %key, "query cache hit");
                return downcast(key, value);
            }
        }

        let erased = move || -> BoxFuture<'static, FetchOutcome> {
            let pending = fetcher();
            async move { pending.await.map(|value| Arc::new(value) as AnyValue) }.boxed()
        };

        let generation = self.generation();
        let value = self.join_or_start(key, options, erased).await?;
        // Cleared while waiting: the value belongs to a torn-down session.
        if self.generation() != generation {
            debug!(key = %key, "withholding result fetched before cache clear");
            return Err(ApiError::SessionUnavailable);
        }
        downcast(key, value)
    }

    /// Bumped on every `clear`.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    fn join_or_start<F>(&self, key: &QueryKey, options: FetchOptions, fetcher: F) -> SharedFetch
    where
        F: Fn() -> BoxFuture<'static, FetchOutcome> + Send + Sync + 'static,
    {
        match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(existing) => {
                self.inner.stats.coalesced_count.fetch_add(1, Ordering::SeqCst);
                debug!(key = %key, "joining in-flight fetch");
                existing.get().future.clone()
            }
            Entry::Vacant(slot) => {
                self.inner.stats.miss_count.fetch_add(1, Ordering::SeqCst);
                self.inner.stats.fetch_count.fetch_add(1, Ordering::SeqCst);
                debug!(key = %key, "starting fetch");

                let fetch_id = self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1;
                let generation = self.inner.generation.load(Ordering::SeqCst);
                self.mark_loading(key);

                let inner = Arc::clone(&self.inner);
                let task_key = key.clone();
                let task = tokio::spawn(async move {
                    let outcome = run_with_policy(&inner, &task_key, &options, fetcher).await;
                    inner.settle(&task_key, fetch_id, generation, &outcome);
                    outcome
                });

                let future = async move {
                    task.await.unwrap_or_else(|join_error| {
                        Err(ApiError::Other(format!("fetch task failed: {}", join_error)))
                    })
                }
                .boxed()
                .shared();

                slot.insert(InFlight {
                    fetch_id,
                    future: future.clone(),
                });
                future
            }
        }
    }

    fn mark_loading(&self, key: &QueryKey) {
        let mut entry = self
            .inner
            .entries
            .entry(key.clone())
            .or_insert_with(CacheEntry::new);
        entry.status = FetchStatus::Loading;
    }

    /// Current state of `key` without triggering a fetch.
    pub fn state<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        let entry = match self.inner.entries.get(key) {
            Some(entry) => entry,
            None => return QueryState::Idle,
        };
        match entry.status {
            FetchStatus::Idle => QueryState::Idle,
            FetchStatus::Loading => QueryState::Loading,
            FetchStatus::Error => QueryState::Error(
                entry
                    .error
                    .clone()
                    .unwrap_or_else(|| ApiError::Other("unknown error".to_string())),
            ),
            FetchStatus::Success => match entry.value.clone() {
                Some(value) => match downcast(key, value) {
                    Ok(value) => QueryState::Success(value),
                    Err(error) => QueryState::Error(error),
                },
                None => QueryState::Idle,
            },
        }
    }

    /// Last successfully fetched value, even if stale or being refetched.
    pub fn cached<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let value = self.inner.entries.get(key)?.value.clone()?;
        downcast(key, value).ok()
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.inner
            .entries
            .get(key)
            .map(|entry| entry.stale)
            .unwrap_or(false)
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.inner.in_flight.contains_key(key)
    }

    /// Mark every key of the given resources stale. A fetch already in flight
    /// for one of them will store its result as stale too.
    pub fn invalidate(&self, resources: &[Resource]) -> usize {
        if resources.is_empty() {
            return 0;
        }
        let stamp = self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let mut count = 0;
        for mut entry in self.inner.entries.iter_mut() {
            if resources.contains(&entry.key().resource) {
                entry.stale = true;
                entry.invalidated_at = stamp;
                count += 1;
            }
        }
        self.inner
            .stats
            .invalidation_count
            .fetch_add(count, Ordering::SeqCst);
        debug!(?resources, count, "invalidated query keys");
        count
    }

    /// Drop every entry and orphan in-flight fetches. Observers stay
    /// registered so mounted handles start again from idle.
    pub fn clear(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.in_flight.clear();
        self.inner.entries.clear();
        debug!("query cache cleared");
    }

    pub fn set_stale_time(&self, stale_time_seconds: u64) {
        self.inner.config.write().stale_time_seconds = stale_time_seconds;
    }

    pub fn stats(&self) -> CacheStatsReport {
        let stats = &self.inner.stats;
        CacheStatsReport {
            items_count: self.inner.entries.len(),
            in_flight_count: self.inner.in_flight.len(),
            hit_count: stats.hit_count.load(Ordering::SeqCst),
            miss_count: stats.miss_count.load(Ordering::SeqCst),
            fetch_count: stats.fetch_count.load(Ordering::SeqCst),
            coalesced_count: stats.coalesced_count.load(Ordering::SeqCst),
            error_count: stats.error_count.load(Ordering::SeqCst),
            retry_count: stats.retry_count.load(Ordering::SeqCst),
            invalidation_count: stats.invalidation_count.load(Ordering::SeqCst),
            discarded_count: stats.discarded_count.load(Ordering::SeqCst),
        }
    }
}

impl CacheInner {
    fn settle(&self, key: &QueryKey, fetch_id: u64, generation: u64, outcome: &FetchOutcome) {
        self.in_flight
            .remove_if(key, |_, in_flight| in_flight.fetch_id == fetch_id);

        if generation != self.generation.load(Ordering::SeqCst) {
            self.stats.discarded_count.fetch_add(1, Ordering::SeqCst);
            debug!(key = %key, "discarding result fetched before cache clear");
            return;
        }

        // The observer slot stays locked until the entry is written, so the
        // last guard cannot drop in between.
        match self.observers.entry(key.clone()) {
            Entry::Occupied(count) if *count.get() > 0 => self.apply(key, fetch_id, outcome),
            _ => {
                self.stats.discarded_count.fetch_add(1, Ordering::SeqCst);
                self.entries.remove(key);
                debug!(key = %key, "discarding result for unobserved key");
            }
        }
    }

    fn apply(&self, key: &QueryKey, fetch_id: u64, outcome: &FetchOutcome) {
        let mut entry = self.entries.entry(key.clone()).or_insert_with(CacheEntry::new);
        match outcome {
            Ok(value) => {
                entry.value = Some(Arc::clone(value));
                entry.status = FetchStatus::Success;
                entry.error = None;
                entry.updated_at = Some(Instant::now());
                entry.stale = entry.invalidated_at > fetch_id;
            }
            Err(error) => {
                self.stats.error_count.fetch_add(1, Ordering::SeqCst);
                warn!(key = %key, %error, "query fetch failed");
                entry.status = FetchStatus::Error;
                entry.error = Some(error.clone());
            }
        }
    }
}

async fn run_with_policy<F>(
    inner: &CacheInner,
    key: &QueryKey,
    options: &FetchOptions,
    fetcher: F,
) -> FetchOutcome
where
    F: Fn() -> BoxFuture<'static, FetchOutcome>,
{
    let timeout_ms = options.timeout.as_millis() as u64;
    let mut attempt = 0;
    loop {
        let outcome = match tokio::time::timeout(options.timeout, fetcher()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ApiError::Timeout(timeout_ms)),
        };

        let error = match outcome {
            Err(error) if error.is_retryable() => error,
            settled => return settled,
        };

        match &options.retry {
            Some(retry) if attempt < retry.max_retries => {
                let delay = retry.backoff(attempt);
                attempt += 1;
                inner.stats.retry_count.fetch_add(1, Ordering::SeqCst);
                debug!(key = %key, attempt, ?delay, %error, "retrying fetch");
                tokio::time::sleep(delay).await;
            }
            _ => return Err(error),
        }
    }
}

fn downcast<T: Send + Sync + 'static>(key: &QueryKey, value: AnyValue) -> Result<Arc<T>, ApiError> {
    value.downcast::<T>().map_err(|_| {
        ApiError::Other(format!(
            "cached value for {} has an unexpected type, expected {}",
            key,
            std::any::type_name::<T>()
        ))
    })
}

/// Keeps a cache key alive. Dropping the last guard for a key discards its entry.
pub struct ObserverGuard {
    inner: Arc<CacheInner>,
    key: QueryKey,
}

impl ObserverGuard {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        if let Entry::Occupied(mut count) = self.inner.observers.entry(self.key.clone()) {
            let remaining = count.get().saturating_sub(1);
            if remaining > 0 {
                *count.get_mut() = remaining;
                return;
            }
            // Removed while the observer slot is still locked, so a concurrent
            // `observe` sees either both or neither.
            self.inner.entries.remove(&self.key);
            count.remove();
            debug!(key = %self.key, "last observer dropped, entry discarded");
        }
    }
}

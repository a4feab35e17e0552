// Named query and mutation operations used by the portal views.
//
// A `Query<T>` handle is what a mounted view holds: it keeps its cache key
// alive, knows when it is allowed to fetch, and loads through the shared
// cache. Mutations go through the tracker so the invalidation table applies.

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{ApiError, TravelBackend};
use crate::config::ClientConfig;
use crate::models::*;
use crate::mutation::{MutationKind, MutationStatus, MutationTracker};
use crate::query_cache::{
    FetchOptions, ObserverGuard, QueryCache, QueryKey, QueryState, Resource,
};
use crate::session::{SessionProvider, SessionState};

// Number of testimonials shown on the home page.
pub const TESTIMONIAL_LIMIT: u64 = 4;

// The caller principal is passed through for per-caller reads.
type Fetcher<T> = Arc<
    dyn Fn(Arc<dyn TravelBackend>, Option<Principal>) -> BoxFuture<'static, Result<T, ApiError>>
        + Send
        + Sync,
>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    // Any established session.
    Session,
    // An established session with an authenticated caller. The caller is
    // read from the session on every use and becomes part of the key.
    Identity,
}

impl Gate {
    // Key to use under `state`, or None while the query is disabled.
    fn resolve(self, base: &QueryKey, state: &SessionState) -> Option<QueryKey> {
        if !state.is_ready() {
            return None;
        }
        match self {
            Gate::Session => Some(base.clone()),
            Gate::Identity => state
                .authenticated_identity()
                .map(|principal| base.clone().with_part(principal.to_string())),
        }
    }
}

pub struct Query<T> {
    cache: QueryCache,
    session: SessionProvider,
    base_key: QueryKey,
    gate: Gate,
    options: FetchOptions,
    fetcher: Fetcher<T>,
    // Follows the resolved key; per-caller keys change with the session.
    observer: Mutex<Option<ObserverGuard>>,
}

impl<T: Send + Sync + 'static> Query<T> {
    /// Key the query currently reads. Falls back to the unparameterised key
    /// while disabled.
    pub fn key(&self) -> QueryKey {
        self.current_key().unwrap_or_else(|| self.base_key.clone())
    }

    pub fn is_enabled(&self) -> bool {
        self.current_key().is_some()
    }

    /// Current state without fetching.
    pub fn state(&self) -> QueryState<T> {
        match self.current_key() {
            Some(key) => {
                self.observe(&key);
                self.cache.state(&key)
            }
            None => QueryState::Disabled,
        }
    }

    /// Last good value, kept while a refetch or an error is showing.
    pub fn cached(&self) -> Option<Arc<T>> {
        self.cache.cached(&self.key())
    }

    /// Serve from cache when fresh, otherwise fetch. Disabled queries return
    /// immediately without touching the backend.
    pub async fn load(&self) -> QueryState<T> {
        self.run(false).await
    }

    pub async fn refetch(&self) -> QueryState<T> {
        self.run(true).await
    }

    /// Wait for the session to come up, then load.
    pub async fn load_when_ready(&self) -> QueryState<T> {
        self.session.wait_until_ready().await;
        self.load().await
    }

    fn current_key(&self) -> Option<QueryKey> {
        self.gate.resolve(&self.base_key, &self.session.snapshot())
    }

    fn observe(&self, key: &QueryKey) {
        let mut observer = self.observer.lock();
        if observer.as_ref().map(|guard| guard.key()) != Some(key) {
            *observer = Some(self.cache.observe(key.clone()));
        }
    }

    async fn run(&self, force: bool) -> QueryState<T> {
        let snapshot = self.session.snapshot();
        let (key, handle) = match (
            self.gate.resolve(&self.base_key, &snapshot),
            snapshot.ready_handle(),
        ) {
            (Some(key), Some(handle)) => (key, handle),
            _ => return QueryState::Disabled,
        };
        self.observe(&key);

        let generation = self.cache.generation();
        let caller = snapshot.authenticated_identity().cloned();
        let fetcher = Arc::clone(&self.fetcher);
        let result = self
            .cache
            .fetch(&key, self.options.clone(), force, move || {
                fetcher(Arc::clone(&handle), caller.clone())
            })
            .await;

        // The session may have ended or changed hands while we waited.
        if self.cache.generation() != generation || self.current_key().as_ref() != Some(&key) {
            return QueryState::Disabled;
        }

        match result {
            Ok(value) => QueryState::Success(value),
            Err(error) => QueryState::Error(error),
        }
    }
}

#[derive(Clone)]
pub struct TravelClient {
    config: ClientConfig,
    session: SessionProvider,
    cache: QueryCache,
    mutations: MutationTracker,
}

impl TravelClient {
    pub fn new(config: ClientConfig, session: SessionProvider) -> Self {
        let cache = QueryCache::new(config.cache.clone());
        let mutations = MutationTracker::new(cache.clone());
        Self {
            config,
            session,
            cache,
            mutations,
        }
    }

    pub fn session(&self) -> &SessionProvider {
        &self.session
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn mutation_status(&self, kind: MutationKind) -> MutationStatus {
        self.mutations.status(kind)
    }

    pub fn is_pending(&self, kind: MutationKind) -> bool {
        self.mutations.is_pending(kind)
    }

    /// Tear the session down and forget everything cached or recorded under it.
    pub fn logout(&self) {
        self.session.tear_down();
        self.cache.clear();
        self.mutations.reset_all();
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    // Profile-shaped reads fail fast.
    fn single_read(&self) -> FetchOptions {
        FetchOptions::no_retry(self.timeout())
    }

    fn list_read(&self) -> FetchOptions {
        FetchOptions::with_retry(self.timeout(), self.config.retry_config.clone())
    }

    fn query<T, F, Fut>(
        &self,
        key: QueryKey,
        gate: Gate,
        options: FetchOptions,
        call: F,
    ) -> Query<T>
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<dyn TravelBackend>, Option<Principal>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let fetcher: Fetcher<T> = Arc::new(
            move |backend: Arc<dyn TravelBackend>, caller: Option<Principal>| {
                call(backend, caller).boxed()
            },
        );
        let query = Query {
            cache: self.cache.clone(),
            session: self.session.clone(),
            base_key: key,
            gate,
            options,
            fetcher,
            observer: Mutex::new(None),
        };
        if let Some(key) = query.current_key() {
            query.observe(&key);
        } else if gate == Gate::Session {
            query.observe(&query.base_key);
        }
        query
    }

    pub fn caller_user_profile(&self) -> Query<Option<UserProfile>> {
        self.query(
            Resource::Profile.into(),
            Gate::Session,
            self.single_read(),
            |backend, _| async move { backend.get_caller_user_profile().await },
        )
    }

    pub fn is_caller_admin(&self) -> Query<bool> {
        self.query(
            Resource::AdminFlag.into(),
            Gate::Session,
            self.single_read(),
            |backend, _| async move { backend.is_caller_admin().await },
        )
    }

    pub fn active_destinations(&self) -> Query<Vec<Destination>> {
        self.query(
            Resource::Destinations.into(),
            Gate::Session,
            self.list_read(),
            |backend, _| async move { backend.get_active_destinations().await },
        )
    }

    pub fn active_packages(&self) -> Query<Vec<TravelPackage>> {
        self.query(
            Resource::Packages.into(),
            Gate::Session,
            self.list_read(),
            |backend, _| async move { backend.get_active_packages().await },
        )
    }

    /// Bookings of the authenticated caller, keyed per caller. Without an
    /// identity the query stays disabled rather than asking for somebody
    /// else's bookings; it enables itself once a caller signs in.
    pub fn user_bookings(&self) -> Query<Vec<Booking>> {
        self.query(
            Resource::Bookings.into(),
            Gate::Identity,
            self.list_read(),
            |backend, caller| async move {
                match caller {
                    Some(user) => backend.get_user_bookings(&user).await,
                    None => Err(ApiError::SessionUnavailable),
                }
            },
        )
    }

    pub fn all_contacts(&self) -> Query<Vec<ContactSubmission>> {
        self.query(
            Resource::Contacts.into(),
            Gate::Session,
            self.list_read(),
            |backend, _| async move { backend.get_all_contacts().await },
        )
    }

    pub fn active_blog_posts(&self) -> Query<Vec<BlogPost>> {
        self.query(
            Resource::BlogPosts.into(),
            Gate::Session,
            self.list_read(),
            |backend, _| async move { backend.get_active_blog_posts().await },
        )
    }

    pub fn active_testimonials(&self) -> Query<Vec<Testimonial>> {
        self.query(
            Resource::Testimonials.into(),
            Gate::Session,
            self.list_read(),
            |backend, _| async move { backend.get_active_testimonials(TESTIMONIAL_LIMIT).await },
        )
    }

    pub fn featured_destinations(&self) -> Query<FeaturedDestinations> {
        self.query(
            Resource::FeaturedDestinations.into(),
            Gate::Session,
            self.list_read(),
            |backend, _| async move { backend.get_featured_destinations().await },
        )
    }

    async fn mutate<T, F, Fut>(&self, kind: MutationKind, call: F) -> Result<T, ApiError>
    where
        F: FnOnce(Arc<dyn TravelBackend>) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let handle = self.session.handle();
        let timeout = self.timeout();
        self.mutations
            .run(kind, async move {
                let backend = match handle {
                    Some(backend) => backend,
                    None => return Err(ApiError::SessionUnavailable),
                };
                match tokio::time::timeout(timeout, call(backend)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ApiError::Timeout(timeout.as_millis() as u64)),
                }
            })
            .await
    }

    pub async fn save_caller_user_profile(&self, profile: UserProfile) -> Result<(), ApiError> {
        self.mutate(MutationKind::SaveProfile, |backend| async move {
            backend.save_caller_user_profile(profile).await
        })
        .await
    }

    pub async fn add_destination(&self, destination: NewDestination) -> Result<(), ApiError> {
        self.mutate(MutationKind::AddDestination, |backend| async move {
            backend.add_destination(destination).await
        })
        .await
    }

    pub async fn update_destination(&self, update: DestinationUpdate) -> Result<(), ApiError> {
        self.mutate(MutationKind::UpdateDestination, |backend| async move {
            backend.update_destination(update).await
        })
        .await
    }

    pub async fn toggle_destination(&self, id: RecordId) -> Result<(), ApiError> {
        self.mutate(MutationKind::ToggleDestination, |backend| async move {
            backend.toggle_destination(id).await
        })
        .await
    }

    pub async fn add_travel_package(&self, package: NewTravelPackage) -> Result<(), ApiError> {
        self.mutate(MutationKind::AddPackage, |backend| async move {
            backend.add_travel_package(package).await
        })
        .await
    }

    pub async fn update_travel_package(&self, update: TravelPackageUpdate) -> Result<(), ApiError> {
        self.mutate(MutationKind::UpdatePackage, |backend| async move {
            backend.update_travel_package(update).await
        })
        .await
    }

    pub async fn toggle_travel_package(&self, id: RecordId) -> Result<(), ApiError> {
        self.mutate(MutationKind::TogglePackage, |backend| async move {
            backend.toggle_travel_package(id).await
        })
        .await
    }

    /// Explicit user-triggered flight search. Results depend on ad-hoc
    /// parameters, so they are returned to the caller and not cached.
    pub async fn search_flights(
        &self,
        departure: &str,
        arrival: &str,
    ) -> Result<Vec<Flight>, ApiError> {
        let departure = departure.to_string();
        let arrival = arrival.to_string();
        self.mutate(MutationKind::SearchFlights, |backend| async move {
            backend.search_flights(&departure, &arrival).await
        })
        .await
    }

    pub async fn add_flight(&self, flight: FlightDetails) -> Result<(), ApiError> {
        self.mutate(MutationKind::AddFlight, |backend| async move {
            backend.add_flight(flight).await
        })
        .await
    }

    pub async fn update_flight(&self, id: RecordId, flight: FlightDetails) -> Result<(), ApiError> {
        self.mutate(MutationKind::UpdateFlight, |backend| async move {
            backend.update_flight(id, flight).await
        })
        .await
    }

    pub async fn toggle_flight(&self, id: RecordId) -> Result<(), ApiError> {
        self.mutate(MutationKind::ToggleFlight, |backend| async move {
            backend.toggle_flight(id).await
        })
        .await
    }

    pub async fn create_booking(&self, booking: NewBooking) -> Result<RecordId, ApiError> {
        self.mutate(MutationKind::CreateBooking, |backend| async move {
            backend.create_booking(booking).await
        })
        .await
    }

    pub async fn update_booking_status(
        &self,
        booking_id: RecordId,
        status: BookingStatus,
    ) -> Result<(), ApiError> {
        self.mutate(MutationKind::UpdateBookingStatus, |backend| async move {
            backend.update_booking_status(booking_id, status).await
        })
        .await
    }

    pub async fn submit_contact_form(&self, form: ContactForm) -> Result<(), ApiError> {
        self.mutate(MutationKind::SubmitContactForm, |backend| async move {
            backend.submit_contact_form(form).await
        })
        .await
    }

    pub async fn add_blog_post(&self, post: NewBlogPost) -> Result<(), ApiError> {
        self.mutate(MutationKind::AddBlogPost, |backend| async move {
            backend.add_blog_post(post).await
        })
        .await
    }

    pub async fn update_blog_post(&self, update: BlogPostUpdate) -> Result<(), ApiError> {
        self.mutate(MutationKind::UpdateBlogPost, |backend| async move {
            backend.update_blog_post(update).await
        })
        .await
    }

    pub async fn toggle_blog_post(&self, id: RecordId) -> Result<(), ApiError> {
        self.mutate(MutationKind::ToggleBlogPost, |backend| async move {
            backend.toggle_blog_post(id).await
        })
        .await
    }

    pub async fn add_testimonial(&self, testimonial: NewTestimonial) -> Result<(), ApiError> {
        self.mutate(MutationKind::AddTestimonial, |backend| async move {
            backend.add_testimonial(testimonial).await
        })
        .await
    }

    pub async fn update_testimonial(&self, update: TestimonialUpdate) -> Result<(), ApiError> {
        self.mutate(MutationKind::UpdateTestimonial, |backend| async move {
            backend.update_testimonial(update).await
        })
        .await
    }

    pub async fn toggle_testimonial(&self, id: RecordId) -> Result<(), ApiError> {
        self.mutate(MutationKind::ToggleTestimonial, |backend| async move {
            backend.toggle_testimonial(id).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock_backend::MockBackend;
    use crate::config::RetryConfig;

    fn test_config() -> ClientConfig {
        ClientConfig {
            timeout_ms: 2_000,
            retry_config: RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 1,
                max_backoff_ms: 5,
                backoff_multiplier: 2.0,
                jitter_factor: 0.0,
            },
            ..ClientConfig::default()
        }
    }

    fn signed_in(user: &str) -> (TravelClient, Arc<MockBackend>) {
        let principal = Principal::new(user);
        let backend = Arc::new(MockBackend::new(principal.clone()));
        let session = SessionProvider::new();
        session.establish(backend.clone(), Some(principal));
        (TravelClient::new(test_config(), session), backend)
    }

    fn new_destination(name: &str) -> NewDestination {
        NewDestination {
            name: name.to_string(),
            description: format!("{} tours", name),
            image: ExternalBlob::from_url(format!("https://img.example/{}.jpg", name)),
        }
    }

    #[tokio::test]
    async fn test_queries_disabled_until_session_established() {
        let session = SessionProvider::new();
        let client = TravelClient::new(test_config(), session.clone());
        let backend = Arc::new(MockBackend::new(Principal::new("user-1")));

        let destinations = client.active_destinations();
        assert!(destinations.load().await.is_disabled());

        session.begin_establishing();
        assert!(destinations.load().await.is_disabled());
        assert!(destinations.state().is_disabled());

        session.establish(backend.clone(), None);
        assert_eq!(backend.calls("get_active_destinations"), 0);

        let loaded = destinations.load().await;
        assert!(loaded.data().unwrap().is_empty());
        assert_eq!(backend.calls("get_active_destinations"), 1);
    }

    #[tokio::test]
    async fn test_load_when_ready_waits_for_session() {
        let session = SessionProvider::new();
        session.begin_establishing();
        let client = TravelClient::new(test_config(), session.clone());
        let backend = Arc::new(MockBackend::new(Principal::new("user-1")));
        backend.seed_destination("Goa");

        let establish = {
            let session = session.clone();
            let backend = backend.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                session.establish(backend, None);
            })
        };

        let destinations = client.active_destinations();
        let loaded = destinations.load_when_ready().await;
        establish.await.unwrap();
        assert_eq!(loaded.data().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_two_views_share_one_fetch() {
        let (client, backend) = signed_in("user-1");
        backend.seed_destination("Goa");
        backend.set_delay(30);

        let hero = client.active_destinations();
        let footer = client.active_destinations();
        let (a, b) = tokio::join!(hero.load(), footer.load());

        assert_eq!(backend.calls("get_active_destinations"), 1);
        assert!(Arc::ptr_eq(a.data().unwrap(), b.data().unwrap()));
    }

    #[tokio::test]
    async fn test_create_then_read_reflects_new_item() {
        let (client, backend) = signed_in("admin");
        let destinations = client.active_destinations();
        assert!(destinations.load().await.data().unwrap().is_empty());

        client.add_destination(new_destination("Darjeeling")).await.unwrap();
        assert!(client.cache().is_stale(&destinations.key()));

        let refreshed = destinations.load().await;
        let names: Vec<&str> = refreshed
            .data()
            .unwrap()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, ["Darjeeling"]);
        assert_eq!(backend.calls("get_active_destinations"), 2);
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_active_flag() {
        let (client, backend) = signed_in("admin");
        let id = backend.seed_destination("Sikkim");

        client.toggle_destination(id).await.unwrap();
        assert_eq!(backend.destination_is_active(id), Some(false));
        client.toggle_destination(id).await.unwrap();
        assert_eq!(backend.destination_is_active(id), Some(true));
    }

    #[tokio::test]
    async fn test_profile_read_is_not_retried() {
        let (client, backend) = signed_in("user-1");
        backend.fail_next_requests(1, true);

        let profile = client.caller_user_profile();
        let state = profile.load().await;
        assert!(matches!(
            state,
            QueryState::Error(ApiError::ApiResponseError { status_code: 503, .. })
        ));
        assert_eq!(backend.calls("get_caller_user_profile"), 1);
    }

    #[tokio::test]
    async fn test_list_read_retries_then_settles() {
        let (client, backend) = signed_in("user-1");
        backend.fail_next_requests(1, true);
        let packages = client.active_packages();
        assert!(matches!(packages.load().await, QueryState::Success(_)));
        assert_eq!(backend.calls("get_active_packages"), 2);

        // More failures than the retry budget: ends in the error state.
        backend.fail_next_requests(10, true);
        let state = packages.refetch().await;
        assert!(state.error().is_some());
        assert_eq!(backend.calls("get_active_packages"), 5);
        assert!(matches!(packages.state(), QueryState::Error(_)));
        // The previous list is still there for the view.
        assert!(packages.cached().is_some());
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_cache_and_can_retry() {
        let (client, backend) = signed_in("admin");
        let posts = client.active_blog_posts();
        posts.load().await;

        backend.fail_next_requests(1, false);
        let post = NewBlogPost {
            title: "Monsoon in Kerala".to_string(),
            summary: "Backwaters".to_string(),
            content: "...".to_string(),
            image: ExternalBlob::from_url("https://img.example/kerala.jpg"),
        };
        assert!(client.add_blog_post(post.clone()).await.is_err());
        assert!(!client.cache().is_stale(&posts.key()));
        assert!(matches!(
            client.mutation_status(MutationKind::AddBlogPost),
            MutationStatus::Error(_)
        ));

        client.add_blog_post(post).await.unwrap();
        assert_eq!(posts.load().await.data().unwrap().len(), 1);
        assert_eq!(client.mutation_status(MutationKind::AddBlogPost), MutationStatus::Success);
    }

    #[tokio::test]
    async fn test_bookings_use_authenticated_caller() {
        let (client, _backend) = signed_in("user-7");
        let booking_id = client
            .create_booking(NewBooking {
                flight_id: 3,
                package_id: None,
                passenger_name: "Asha".to_string(),
            })
            .await
            .unwrap();

        let bookings = client.user_bookings();
        assert_eq!(bookings.key().to_string(), "bookings/user-7");
        let loaded = bookings.load().await;
        let list = loaded.data().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, booking_id);
        assert_eq!(list[0].user, Principal::new("user-7"));

        client
            .update_booking_status(booking_id, BookingStatus::Confirmed)
            .await
            .unwrap();
        assert!(client.cache().is_stale(&bookings.key()));
        let reloaded = bookings.load().await;
        assert_eq!(reloaded.data().unwrap()[0].status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_bookings_created_before_login_enable_after_login() {
        let session = SessionProvider::new();
        session.begin_establishing();
        let client = TravelClient::new(test_config(), session.clone());
        let bookings = client.user_bookings();
        assert!(bookings.load().await.is_disabled());
        assert!(bookings.state().is_disabled());

        let backend = Arc::new(MockBackend::new(Principal::new("user-9")));
        session.establish(backend.clone(), Some(Principal::new("user-9")));
        client
            .create_booking(NewBooking {
                flight_id: 1,
                package_id: None,
                passenger_name: "Ravi".to_string(),
            })
            .await
            .unwrap();

        assert!(bookings.is_enabled());
        assert_eq!(bookings.key().to_string(), "bookings/user-9");
        let loaded = bookings.load_when_ready().await;
        assert_eq!(loaded.data().unwrap().len(), 1);
        assert_eq!(backend.calls("get_user_bookings"), 1);
    }

    #[tokio::test]
    async fn test_bookings_follow_session_identity() {
        let session = SessionProvider::new();
        let client = TravelClient::new(test_config(), session.clone());
        let first = Arc::new(MockBackend::new(Principal::new("user-1")));
        session.establish(first.clone(), Some(Principal::new("user-1")));
        let bookings = client.user_bookings();
        assert!(bookings.load().await.data().unwrap().is_empty());

        client.logout();
        assert!(bookings.load().await.is_disabled());

        let second = Arc::new(MockBackend::new(Principal::new("user-2")));
        session.establish(second.clone(), Some(Principal::new("user-2")));
        assert_eq!(bookings.key().to_string(), "bookings/user-2");
        assert!(bookings.load().await.data().is_some());
        assert_eq!(second.calls("get_user_bookings"), 1);
        assert_eq!(client.cache().observer_count(&bookings.key()), 1);
    }

    #[tokio::test]
    async fn test_bookings_disabled_without_identity() {
        let backend = Arc::new(MockBackend::new(Principal::new(Principal::ANONYMOUS)));
        let session = SessionProvider::new();
        session.establish(backend.clone(), Some(Principal::new(Principal::ANONYMOUS)));
        let client = TravelClient::new(test_config(), session);

        let bookings = client.user_bookings();
        assert!(bookings.load().await.is_disabled());
        assert!(bookings.load_when_ready().await.is_disabled());
        assert_eq!(backend.calls("get_user_bookings"), 0);
    }

    #[tokio::test]
    async fn test_flight_search_only_runs_on_demand() {
        let (client, backend) = signed_in("user-1");
        backend.seed_flight("Kolkata", "Delhi");
        backend.seed_flight("Kolkata", "Mumbai");

        let _destinations = client.active_destinations();
        assert_eq!(backend.calls("search_flights"), 0);
        assert_eq!(client.mutation_status(MutationKind::SearchFlights), MutationStatus::Idle);

        let flights = client.search_flights("kolkata", "delhi").await.unwrap();
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].arrival, "Delhi");
        assert_eq!(client.mutation_status(MutationKind::SearchFlights), MutationStatus::Success);
    }

    #[tokio::test]
    async fn test_flight_search_reports_pending() {
        let (client, backend) = signed_in("user-1");
        backend.set_delay(40);

        let search = {
            let client = client.clone();
            tokio::spawn(async move { client.search_flights("Kolkata", "Goa").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(client.is_pending(MutationKind::SearchFlights));

        assert!(search.await.unwrap().unwrap().is_empty());
        assert!(!client.is_pending(MutationKind::SearchFlights));
    }

    #[tokio::test]
    async fn test_mutation_without_session_fails() {
        let client = TravelClient::new(test_config(), SessionProvider::new());
        let result = client
            .submit_contact_form(ContactForm {
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                message: "Hi".to_string(),
            })
            .await;
        assert_eq!(result, Err(ApiError::SessionUnavailable));
    }

    #[tokio::test]
    async fn test_logout_clears_cache_and_disables_queries() {
        let (client, backend) = signed_in("user-1");
        backend.set_admin(true);
        let admin = client.is_caller_admin();
        assert_eq!(admin.load().await.data().map(|v| **v), Some(true));

        client.logout();
        assert!(admin.state().is_disabled());
        assert!(admin.cached().is_none());
        assert!(admin.load().await.is_disabled());
        assert_eq!(backend.calls("is_caller_admin"), 1);
    }

    #[tokio::test]
    async fn test_logout_during_load_withholds_previous_session_data() {
        let (client, backend) = signed_in("user-1");
        backend.set_admin(true);
        backend.set_delay(40);
        let admin = client.is_caller_admin();

        let (state, _) = tokio::join!(admin.load(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            client.logout();
        });

        assert!(state.is_disabled());
        assert!(admin.cached().is_none());
        assert!(!client.session().is_ready());
    }

    #[tokio::test]
    async fn test_logout_resets_mutation_status() {
        let (client, _backend) = signed_in("admin");
        client.toggle_flight(99).await.unwrap_err();
        client.add_destination(new_destination("Ooty")).await.unwrap();
        assert!(matches!(
            client.mutation_status(MutationKind::ToggleFlight),
            MutationStatus::Error(_)
        ));

        client.logout();
        assert_eq!(client.mutation_status(MutationKind::ToggleFlight), MutationStatus::Idle);
        assert_eq!(client.mutation_status(MutationKind::AddDestination), MutationStatus::Idle);
    }

    #[tokio::test]
    async fn test_dropped_view_does_not_receive_late_result() {
        let (client, backend) = signed_in("user-1");
        backend.set_delay(40);

        let view = client.all_contacts();
        let key = view.key();
        let pending = tokio::spawn(async move { view.load().await.data().is_some() });
        tokio::time::sleep(Duration::from_millis(10)).await;
        pending.abort();
        let _ = pending.await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(client.cache().cached::<Vec<ContactSubmission>>(&key).is_none());
        assert_eq!(client.cache().stats().discarded_count, 1);
        assert_eq!(backend.calls("get_all_contacts"), 1);
    }

    #[tokio::test]
    async fn test_testimonials_and_featured_destinations() {
        let (client, backend) = signed_in("admin");
        for n in 0..6u64 {
            client
                .add_testimonial(NewTestimonial {
                    name: format!("Guest {}", n),
                    photo: None,
                    rating: 5,
                    review: "Great".to_string(),
                    display_order: Some(n),
                })
                .await
                .unwrap();
        }
        backend.seed_featured(FeaturedDestinations {
            domestic: vec![FeaturedDestination {
                name: "Andaman".to_string(),
                description: "Islands".to_string(),
                duration: "5N/6D".to_string(),
                category: FeaturedCategory::Domestic,
            }],
            international: Vec::new(),
            terms: TermsAndConditions {
                gst: "5% GST extra".to_string(),
                ..TermsAndConditions::default()
            },
        });

        let testimonials = client.active_testimonials().load().await;
        assert_eq!(testimonials.data().unwrap().len(), TESTIMONIAL_LIMIT as usize);

        let featured = client.featured_destinations().load().await;
        let featured = featured.data().unwrap();
        assert_eq!(featured.domestic.len(), 1);
        assert!(featured.international.is_empty());
        assert_eq!(featured.terms.gst, "5% GST extra");
    }
}

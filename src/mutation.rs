// Mutations: which cached resources each write makes stale, and the
// pending / settled status views use to disable duplicate submission.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::ApiError;
use crate::query_cache::{QueryCache, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    SaveProfile,
    AddDestination,
    UpdateDestination,
    ToggleDestination,
    AddPackage,
    UpdatePackage,
    TogglePackage,
    SearchFlights,
    AddFlight,
    UpdateFlight,
    ToggleFlight,
    CreateBooking,
    UpdateBookingStatus,
    SubmitContactForm,
    AddBlogPost,
    UpdateBlogPost,
    ToggleBlogPost,
    AddTestimonial,
    UpdateTestimonial,
    ToggleTestimonial,
}

impl MutationKind {
    pub const ALL: [MutationKind; 20] = [
        MutationKind::SaveProfile,
        MutationKind::AddDestination,
        MutationKind::UpdateDestination,
        MutationKind::ToggleDestination,
        MutationKind::AddPackage,
        MutationKind::UpdatePackage,
        MutationKind::TogglePackage,
        MutationKind::SearchFlights,
        MutationKind::AddFlight,
        MutationKind::UpdateFlight,
        MutationKind::ToggleFlight,
        MutationKind::CreateBooking,
        MutationKind::UpdateBookingStatus,
        MutationKind::SubmitContactForm,
        MutationKind::AddBlogPost,
        MutationKind::UpdateBlogPost,
        MutationKind::ToggleBlogPost,
        MutationKind::AddTestimonial,
        MutationKind::UpdateTestimonial,
        MutationKind::ToggleTestimonial,
    ];

    /// Resources marked stale after this mutation succeeds.
    pub fn invalidates(self) -> &'static [Resource] {
        use MutationKind::*;
        match self {
            SaveProfile => &[Resource::Profile],
            AddDestination | UpdateDestination | ToggleDestination => &[Resource::Destinations],
            AddPackage | UpdatePackage | TogglePackage => &[Resource::Packages],
            AddFlight | UpdateFlight | ToggleFlight => &[Resource::Flights],
            CreateBooking | UpdateBookingStatus => &[Resource::Bookings],
            AddBlogPost | UpdateBlogPost | ToggleBlogPost => &[Resource::BlogPosts],
            AddTestimonial | UpdateTestimonial | ToggleTestimonial => &[Resource::Testimonials],
            SearchFlights | SubmitContactForm => &[],
        }
    }

    pub fn name(self) -> &'static str {
        use MutationKind::*;
        match self {
            SaveProfile => "save_profile",
            AddDestination => "add_destination",
            UpdateDestination => "update_destination",
            ToggleDestination => "toggle_destination",
            AddPackage => "add_package",
            UpdatePackage => "update_package",
            TogglePackage => "toggle_package",
            SearchFlights => "search_flights",
            AddFlight => "add_flight",
            UpdateFlight => "update_flight",
            ToggleFlight => "toggle_flight",
            CreateBooking => "create_booking",
            UpdateBookingStatus => "update_booking_status",
            SubmitContactForm => "submit_contact_form",
            AddBlogPost => "add_blog_post",
            UpdateBlogPost => "update_blog_post",
            ToggleBlogPost => "toggle_blog_post",
            AddTestimonial => "add_testimonial",
            UpdateTestimonial => "update_testimonial",
            ToggleTestimonial => "toggle_testimonial",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationStatus {
    Idle,
    Pending,
    Error(ApiError),
    Success,
}

#[derive(Debug, Clone)]
struct MutationSlot {
    in_flight: usize,
    last: MutationStatus,
}

impl Default for MutationSlot {
    fn default() -> Self {
        Self {
            in_flight: 0,
            last: MutationStatus::Idle,
        }
    }
}

#[derive(Clone)]
pub struct MutationTracker {
    cache: QueryCache,
    slots: Arc<DashMap<MutationKind, MutationSlot>>,
}

impl MutationTracker {
    pub fn new(cache: QueryCache) -> Self {
        Self {
            cache,
            slots: Arc::new(DashMap::new()),
        }
    }

    pub fn status(&self, kind: MutationKind) -> MutationStatus {
        match self.slots.get(&kind) {
            Some(slot) if slot.in_flight > 0 => MutationStatus::Pending,
            Some(slot) => slot.last.clone(),
            None => MutationStatus::Idle,
        }
    }

    pub fn is_pending(&self, kind: MutationKind) -> bool {
        self.status(kind) == MutationStatus::Pending
    }

    /// Run one remote write. Invalidation happens only after the write has
    /// settled successfully; a failed write leaves the cache untouched.
    pub async fn run<T, Fut>(&self, kind: MutationKind, write: Fut) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.slots
            .entry(kind)
            .or_insert_with(MutationSlot::default)
            .in_flight += 1;

        let outcome = write.await;

        let status = match &outcome {
            Ok(_) => {
                let stale = self.cache.invalidate(kind.invalidates());
                info!(mutation = kind.name(), invalidated = stale, "mutation succeeded");
                MutationStatus::Success
            }
            Err(error) => {
                warn!(mutation = kind.name(), %error, "mutation failed");
                MutationStatus::Error(error.clone())
            }
        };

        let mut slot = self.slots.entry(kind).or_insert_with(MutationSlot::default);
        slot.in_flight = slot.in_flight.saturating_sub(1);
        slot.last = status;
        outcome
    }

    pub fn reset(&self, kind: MutationKind) {
        if let Some(mut slot) = self.slots.get_mut(&kind) {
            slot.last = MutationStatus::Idle;
        }
    }

    // Writes still in flight keep reporting pending until they settle.
    pub fn reset_all(&self) {
        for kind in MutationKind::ALL {
            self.reset(kind);
        }
    }
}

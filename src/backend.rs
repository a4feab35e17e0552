// Remote travel service boundary. Storage and validation live behind this
// trait; the query layer only calls through it.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::*;

// Clone is required because one in-flight fetch result is handed to every
// caller that joined it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Remote session is not available")]
    SessionUnavailable,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError {
        status_code: u16,
        message: String,
        is_retryable: bool,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::NetworkError(_) | ApiError::Timeout(_) => true,
            ApiError::ApiResponseError { is_retryable, .. } => *is_retryable,
            ApiError::SessionUnavailable | ApiError::Decode(_) | ApiError::Other(_) => false,
        }
    }
}

#[async_trait]
pub trait TravelBackend: Send + Sync + 'static {
    async fn get_caller_user_profile(&self) -> Result<Option<UserProfile>, ApiError>;
    async fn save_caller_user_profile(&self, profile: UserProfile) -> Result<(), ApiError>;
    async fn is_caller_admin(&self) -> Result<bool, ApiError>;

    async fn get_active_destinations(&self) -> Result<Vec<Destination>, ApiError>;
    async fn add_destination(&self, destination: NewDestination) -> Result<(), ApiError>;
    async fn update_destination(&self, update: DestinationUpdate) -> Result<(), ApiError>;
    async fn toggle_destination(&self, id: RecordId) -> Result<(), ApiError>;

    async fn get_active_packages(&self) -> Result<Vec<TravelPackage>, ApiError>;
    async fn add_travel_package(&self, package: NewTravelPackage) -> Result<(), ApiError>;
    async fn update_travel_package(&self, update: TravelPackageUpdate) -> Result<(), ApiError>;
    async fn toggle_travel_package(&self, id: RecordId) -> Result<(), ApiError>;

    async fn search_flights(&self, departure: &str, arrival: &str)
        -> Result<Vec<Flight>, ApiError>;
    async fn add_flight(&self, flight: FlightDetails) -> Result<(), ApiError>;
    async fn update_flight(&self, id: RecordId, flight: FlightDetails) -> Result<(), ApiError>;
    async fn toggle_flight(&self, id: RecordId) -> Result<(), ApiError>;

    // Returns the id of the new booking.
    async fn create_booking(&self, booking: NewBooking) -> Result<RecordId, ApiError>;
    async fn get_user_bookings(&self, user: &Principal) -> Result<Vec<Booking>, ApiError>;
    async fn update_booking_status(
        &self,
        booking_id: RecordId,
        status: BookingStatus,
    ) -> Result<(), ApiError>;

    async fn submit_contact_form(&self, form: ContactForm) -> Result<(), ApiError>;
    async fn get_all_contacts(&self) -> Result<Vec<ContactSubmission>, ApiError>;

    async fn get_active_blog_posts(&self) -> Result<Vec<BlogPost>, ApiError>;
    async fn add_blog_post(&self, post: NewBlogPost) -> Result<(), ApiError>;
    async fn update_blog_post(&self, update: BlogPostUpdate) -> Result<(), ApiError>;
    async fn toggle_blog_post(&self, id: RecordId) -> Result<(), ApiError>;

    async fn get_active_testimonials(&self, limit: u64) -> Result<Vec<Testimonial>, ApiError>;
    async fn add_testimonial(&self, testimonial: NewTestimonial) -> Result<(), ApiError>;
    async fn update_testimonial(&self, update: TestimonialUpdate) -> Result<(), ApiError>;
    async fn toggle_testimonial(&self, id: RecordId) -> Result<(), ApiError>;

    async fn get_featured_destinations(&self) -> Result<FeaturedDestinations, ApiError>;
}

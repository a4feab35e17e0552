// Data-synchronization and link-generation core for the travel portal

pub mod backend;
pub mod config;
pub mod http_backend;
pub mod models;
pub mod mutation;
pub mod queries;
pub mod query_cache;
pub mod session;
pub mod telemetry;
pub mod validation;
pub mod whatsapp_link;

// Re-export key types for convenience
pub use backend::{ApiError, TravelBackend};
pub use config::{CacheConfig, ClientConfig, ClientError, RetryConfig};
pub use http_backend::HttpBackend;
pub use mutation::{MutationKind, MutationStatus, MutationTracker};
pub use queries::{Query, TravelClient, TESTIMONIAL_LIMIT};
pub use query_cache::{
    CacheStatsReport, FetchOptions, FetchStatus, QueryCache, QueryKey, QueryState, Resource,
};
pub use session::{SessionProvider, SessionState};
pub use validation::{BookingForm, EnquiryForm, FlightSearchForm, ValidationError};
pub use whatsapp_link::{
    build_enquiry_link, build_flight_search_link, EnquiryData, FlightSearchData,
};

// Records exchanged with the travel backend. The core only shuttles and caches
// these, it never mutates them.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type RecordId = u64;

// Backend timestamps are nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(pub i64);

impl Time {
    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        Time(value.timestamp_nanos_opt().unwrap_or(i64::MAX))
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.0)
    }
}

// Opaque caller identity as understood by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(pub String);

impl Principal {
    pub const ANONYMOUS: &'static str = "2vxsx-fae";

    pub fn new(text: impl Into<String>) -> Self {
        Principal(text.into())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == Self::ANONYMOUS
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Stored image reference. Uploading is handled elsewhere; the core only
// carries the direct URL around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalBlob {
    pub direct_url: String,
}

impl ExternalBlob {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            direct_url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub image: ExternalBlob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelPackage {
    pub id: RecordId,
    pub destination_id: RecordId,
    pub title: String,
    pub details: String,
    pub price: u64,
    pub is_active: bool,
    pub image: ExternalBlob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: RecordId,
    pub airline: String,
    pub departure: String,
    pub arrival: String,
    pub date: Time,
    pub price: u64,
    pub available_seats: u64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: RecordId,
    pub user: Principal,
    pub flight_id: RecordId,
    pub package_id: Option<RecordId>,
    pub passenger_name: String,
    pub booking_date: Time,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub message: String,
    pub submission_time: Time,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: RecordId,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub publish_date: Time,
    pub is_active: bool,
    pub image: ExternalBlob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: RecordId,
    pub name: String,
    pub photo: Option<ExternalBlob>,
    pub rating: u8,
    pub review: String,
    pub display_order: Option<u64>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeaturedCategory {
    Domestic,
    International,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedDestination {
    pub name: String,
    pub description: String,
    pub duration: String,
    pub category: FeaturedCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsAndConditions {
    pub pricing: String,
    pub rate_changes: String,
    pub advance_payment: String,
    pub cancellation_policy: String,
    pub gst: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedDestinations {
    pub domestic: Vec<FeaturedDestination>,
    pub international: Vec<FeaturedDestination>,
    pub terms: TermsAndConditions,
}

// Write payloads. Field sets follow what each admin form submits.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDestination {
    pub name: String,
    pub description: String,
    pub image: ExternalBlob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationUpdate {
    pub id: RecordId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTravelPackage {
    pub destination_id: RecordId,
    pub title: String,
    pub details: String,
    pub price: u64,
    pub image: ExternalBlob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelPackageUpdate {
    pub id: RecordId,
    pub title: String,
    pub details: String,
    pub price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightDetails {
    pub airline: String,
    pub departure: String,
    pub arrival: String,
    pub date: Time,
    pub price: u64,
    pub seats: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub flight_id: RecordId,
    pub package_id: Option<RecordId>,
    pub passenger_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBlogPost {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub image: ExternalBlob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPostUpdate {
    pub id: RecordId,
    pub title: String,
    pub summary: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestimonial {
    pub name: String,
    pub photo: Option<ExternalBlob>,
    pub rating: u8,
    pub review: String,
    pub display_order: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialUpdate {
    pub id: RecordId,
    pub name: String,
    pub rating: u8,
    pub review: String,
    pub display_order: Option<u64>,
}

// JSON-over-HTTP implementation of the remote travel service.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::{ApiError, TravelBackend};
use crate::config::{ClientConfig, ClientError};
use crate::models::*;
use crate::whatsapp_link::encode_uri_component;

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    timeout_ms: u64,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::InitError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            timeout_ms: config.timeout_ms,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status().as_u16();
        debug!(status, url = %response.url(), "remote call returned");
        if response.status().is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = map_status(status, &body);
        warn!(%error, "remote call rejected");
        Err(error)
    }

    async fn json<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R, ApiError> {
        let response = self.execute(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.json(self.request(Method::GET, path)).await
    }

    // Writes only care about the status; the body, if any, is ignored.
    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request).await.map(|_| ())
    }

    async fn toggle(&self, collection: &str, id: RecordId) -> Result<(), ApiError> {
        self.send::<()>(Method::POST, &format!("{}/{}/toggle", collection, id), None)
            .await
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout_ms)
        } else if err.is_connect() {
            ApiError::NetworkError(format!("cannot connect to {}: {}", self.base_url, err))
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::NetworkError(err.to_string())
        }
    }
}

// 5xx and 429 are worth another attempt; any other rejection is final.
fn map_status(status: u16, body: &str) -> ApiError {
    let message = if body.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        body.trim().to_string()
    };
    ApiError::ApiResponseError {
        status_code: status,
        message,
        is_retryable: status >= 500 || status == 429,
    }
}

#[async_trait]
impl TravelBackend for HttpBackend {
    async fn get_caller_user_profile(&self) -> Result<Option<UserProfile>, ApiError> {
        self.get("profile").await
    }

    async fn save_caller_user_profile(&self, profile: UserProfile) -> Result<(), ApiError> {
        self.send(Method::PUT, "profile", Some(&profile)).await
    }

    async fn is_caller_admin(&self) -> Result<bool, ApiError> {
        self.get("admin").await
    }

    async fn get_active_destinations(&self) -> Result<Vec<Destination>, ApiError> {
        self.get("destinations").await
    }

    async fn add_destination(&self, destination: NewDestination) -> Result<(), ApiError> {
        self.send(Method::POST, "destinations", Some(&destination))
            .await
    }

    async fn update_destination(&self, update: DestinationUpdate) -> Result<(), ApiError> {
        let path = format!("destinations/{}", update.id);
        self.send(Method::PUT, &path, Some(&update)).await
    }

    async fn toggle_destination(&self, id: RecordId) -> Result<(), ApiError> {
        self.toggle("destinations", id).await
    }

    async fn get_active_packages(&self) -> Result<Vec<TravelPackage>, ApiError> {
        self.get("packages").await
    }

    async fn add_travel_package(&self, package: NewTravelPackage) -> Result<(), ApiError> {
        self.send(Method::POST, "packages", Some(&package)).await
    }

    async fn update_travel_package(&self, update: TravelPackageUpdate) -> Result<(), ApiError> {
        let path = format!("packages/{}", update.id);
        self.send(Method::PUT, &path, Some(&update)).await
    }

    async fn toggle_travel_package(&self, id: RecordId) -> Result<(), ApiError> {
        self.toggle("packages", id).await
    }

    async fn search_flights(
        &self,
        departure: &str,
        arrival: &str,
    ) -> Result<Vec<Flight>, ApiError> {
        let request = self
            .request(Method::GET, "flights/search")
            .query(&[("departure", departure), ("arrival", arrival)]);
        self.json(request).await
    }

    async fn add_flight(&self, flight: FlightDetails) -> Result<(), ApiError> {
        self.send(Method::POST, "flights", Some(&flight)).await
    }

    async fn update_flight(&self, id: RecordId, flight: FlightDetails) -> Result<(), ApiError> {
        self.send(Method::PUT, &format!("flights/{}", id), Some(&flight))
            .await
    }

    async fn toggle_flight(&self, id: RecordId) -> Result<(), ApiError> {
        self.toggle("flights", id).await
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<RecordId, ApiError> {
        self.json(self.request(Method::POST, "bookings").json(&booking))
            .await
    }

    async fn get_user_bookings(&self, user: &Principal) -> Result<Vec<Booking>, ApiError> {
        self.get(&format!("users/{}/bookings", encode_uri_component(&user.0)))
            .await
    }

    async fn update_booking_status(
        &self,
        booking_id: RecordId,
        status: BookingStatus,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({ "status": status });
        self.send(
            Method::PUT,
            &format!("bookings/{}/status", booking_id),
            Some(&body),
        )
        .await
    }

    async fn submit_contact_form(&self, form: ContactForm) -> Result<(), ApiError> {
        self.send(Method::POST, "contacts", Some(&form)).await
    }

    async fn get_all_contacts(&self) -> Result<Vec<ContactSubmission>, ApiError> {
        self.get("contacts").await
    }

    async fn get_active_blog_posts(&self) -> Result<Vec<BlogPost>, ApiError> {
        self.get("blog-posts").await
    }

    async fn add_blog_post(&self, post: NewBlogPost) -> Result<(), ApiError> {
        self.send(Method::POST, "blog-posts", Some(&post)).await
    }

    async fn update_blog_post(&self, update: BlogPostUpdate) -> Result<(), ApiError> {
        let path = format!("blog-posts/{}", update.id);
        self.send(Method::PUT, &path, Some(&update)).await
    }

    async fn toggle_blog_post(&self, id: RecordId) -> Result<(), ApiError> {
        self.toggle("blog-posts", id).await
    }

    async fn get_active_testimonials(&self, limit: u64) -> Result<Vec<Testimonial>, ApiError> {
        let request = self
            .request(Method::GET, "testimonials")
            .query(&[("limit", limit)]);
        self.json(request).await
    }

    async fn add_testimonial(&self, testimonial: NewTestimonial) -> Result<(), ApiError> {
        self.send(Method::POST, "testimonials", Some(&testimonial))
            .await
    }

    async fn update_testimonial(&self, update: TestimonialUpdate) -> Result<(), ApiError> {
        let path = format!("testimonials/{}", update.id);
        self.send(Method::PUT, &path, Some(&update)).await
    }

    async fn toggle_testimonial(&self, id: RecordId) -> Result<(), ApiError> {
        self.toggle("testimonials", id).await
    }

    async fn get_featured_destinations(&self) -> Result<FeaturedDestinations, ApiError> {
        self.get("featured-destinations").await
    }
}

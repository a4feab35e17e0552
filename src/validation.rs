// Required-field checks run before a link is built or a write is sent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ContactForm, NewBooking, RecordId};
use crate::whatsapp_link::{EnquiryData, FlightSearchData};

pub const DEFAULT_PASSENGERS: &str = "1";
pub const DEFAULT_CABIN_CLASS: &str = "Economy";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

impl ValidationError {
    /// Prompt shown next to the form.
    pub fn prompt(&self) -> &'static str {
        match self {
            ValidationError::MissingField("name") => "Please enter your name",
            ValidationError::MissingField("destination") => "Please enter a destination",
            ValidationError::MissingField("travelDate") => "Please select a travel date",
            ValidationError::MissingField("persons") => "Please enter the number of persons",
            ValidationError::MissingField("departure") => "Please enter the departure city",
            ValidationError::MissingField("arrival") => "Please enter the arrival city",
            ValidationError::MissingField("passengerName") => "Please enter the passenger name",
            ValidationError::MissingField("email") => "Please enter your email",
            ValidationError::MissingField("message") => "Please enter a message",
            ValidationError::MissingField(_) => "Please fill in all required fields",
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryForm {
    pub name: String,
    pub destination: String,
    pub travel_date: String,
    pub persons: String,
}

impl EnquiryForm {
    pub fn validate(&self) -> Result<EnquiryData, ValidationError> {
        Ok(EnquiryData {
            name: Some(required(&self.name, "name")?),
            destination: Some(required(&self.destination, "destination")?),
            travel_date: Some(required(&self.travel_date, "travelDate")?),
            persons: Some(required(&self.persons, "persons")?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSearchForm {
    pub departure: String,
    pub arrival: String,
    pub travel_date: String,
    pub passengers: String,
    pub cabin_class: String,
}

impl Default for FlightSearchForm {
    fn default() -> Self {
        Self {
            departure: String::new(),
            arrival: String::new(),
            travel_date: String::new(),
            passengers: DEFAULT_PASSENGERS.to_string(),
            cabin_class: DEFAULT_CABIN_CLASS.to_string(),
        }
    }
}

impl FlightSearchForm {
    // Blank passengers / cabin class fall back to the form defaults.
    pub fn validate(&self) -> Result<FlightSearchData, ValidationError> {
        Ok(FlightSearchData {
            departure: required(&self.departure, "departure")?,
            arrival: required(&self.arrival, "arrival")?,
            travel_date: optional(&self.travel_date),
            passengers: Some(
                optional(&self.passengers).unwrap_or_else(|| DEFAULT_PASSENGERS.to_string()),
            ),
            cabin_class: Some(
                optional(&self.cabin_class).unwrap_or_else(|| DEFAULT_CABIN_CLASS.to_string()),
            ),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingForm {
    pub flight_id: RecordId,
    pub package_id: Option<RecordId>,
    pub passenger_name: String,
}

impl BookingForm {
    pub fn validate(&self) -> Result<NewBooking, ValidationError> {
        Ok(NewBooking {
            flight_id: self.flight_id,
            package_id: self.package_id,
            passenger_name: required(&self.passenger_name, "passengerName")?,
        })
    }
}

pub fn validate_contact_form(form: &ContactForm) -> Result<ContactForm, ValidationError> {
    Ok(ContactForm {
        name: required(&form.name, "name")?,
        email: required(&form.email, "email")?,
        message: required(&form.message, "message")?,
    })
}

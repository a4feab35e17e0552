// WhatsApp deep-link builders used by the enquiry form, the flight search box
// and the floating chat button.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

pub const WHATSAPP_BASE_URL: &str = "https://wa.me";
pub const BUSINESS_PHONE_NUMBER: &str = "919531757771";

// Same reserved set as ECMAScript encodeURIComponent. The link is opened
// directly by the messaging app, so the output has to match byte for byte.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryData {
    pub name: Option<String>,
    pub destination: Option<String>,
    pub travel_date: Option<String>,
    pub persons: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSearchData {
    pub departure: String,
    pub arrival: String,
    pub travel_date: Option<String>,
    pub passengers: Option<String>,
    pub cabin_class: Option<String>,
}

/// Build the trip enquiry link. `None` behaves exactly like an empty
/// [`EnquiryData`]: every field is rendered blank.
pub fn build_enquiry_link(data: Option<&EnquiryData>) -> String {
    let empty = EnquiryData::default();
    let data = data.unwrap_or(&empty);

    let message = format!(
        "Hello, I would like to enquire about a trip.\n\
         Name: {}\n\
         Destination: {}\n\
         Travel Date: {}\n\
         Number of Persons: {}",
        field(&data.name),
        field(&data.destination),
        field(&data.travel_date),
        field(&data.persons),
    );

    whatsapp_link(&message)
}

/// Build the flight booking enquiry link. Departure and arrival are rendered
/// as given; the caller is expected to have validated them.
pub fn build_flight_search_link(data: &FlightSearchData) -> String {
    let message = format!(
        "Hello, I would like to enquire about a flight booking.\n\
         From: {}\n\
         To: {}\n\
         Travel Date: {}\n\
         Passengers: {}\n\
         Cabin Class: {}",
        data.departure,
        data.arrival,
        field(&data.travel_date),
        field(&data.passengers),
        field(&data.cabin_class),
    );

    whatsapp_link(&message)
}

pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

fn whatsapp_link(message: &str) -> String {
    format!(
        "{}/{}?text={}",
        WHATSAPP_BASE_URL,
        BUSINESS_PHONE_NUMBER,
        encode_uri_component(message)
    )
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

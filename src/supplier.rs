// Wire formats of the flight-offer supplier (Amadeus self-service API) and
// their conversion into the crate's booking model

use crate::models::{Endpoint, FlightOffer, Money, Segment};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

// Data structures for the token endpoint
#[derive(Debug, Deserialize, Serialize)]
pub struct SupplierTokenResponse {
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

// Data structures for the flight-offers search response. Entries stay raw
// until conversion so one malformed offer cannot sink the whole response.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SupplierOfferResponse {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierOffer {
    pub id: String,
    #[serde(default)]
    pub number_of_bookable_seats: Option<u32>,
    #[serde(default)]
    pub itineraries: Vec<SupplierItinerary>,
    pub price: SupplierPrice,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SupplierItinerary {
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub segments: Vec<SupplierSegment>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierSegment {
    pub carrier_code: String,
    pub number: String,
    pub departure: SupplierEndpoint,
    pub arrival: SupplierEndpoint,
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierEndpoint {
    pub iata_code: String,
    pub at: NaiveDateTime,
}

// Prices arrive either as `{ total, currency }` or, from older payloads, as a
// bare number that is already in the display currency.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SupplierPrice {
    Tagged {
        total: Decimal,
        #[serde(default)]
        currency: Option<String>,
    },
    Bare(Decimal),
}

impl SupplierPrice {
    pub fn into_money(self, display_currency: &str) -> Money {
        match self {
            SupplierPrice::Tagged {
                total,
                currency: Some(currency),
            } if !currency.trim().is_empty() => Money::new(total, currency),
            SupplierPrice::Tagged { total, .. } => Money::new(total, display_currency),
            SupplierPrice::Bare(amount) => Money::new(amount, display_currency),
        }
    }
}

// Error body returned by the supplier on non-2xx responses
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SupplierErrorBody {
    #[serde(default)]
    pub errors: Vec<SupplierErrorEntry>,
    // the token endpoint reports failures in OAuth form
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SupplierErrorEntry {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl SupplierErrorBody {
    /// Most specific human message the supplier gave, if any.
    pub fn message(&self) -> Option<String> {
        self.errors
            .first()
            .and_then(|entry| entry.detail.clone().or_else(|| entry.title.clone()))
            .or_else(|| self.error_description.clone())
            .filter(|message| !message.trim().is_empty())
    }

    pub fn parse(body: &str) -> Option<String> {
        serde_json::from_str::<SupplierErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.message())
    }
}

impl From<SupplierSegment> for Segment {
    fn from(item: SupplierSegment) -> Self {
        Segment {
            carrier_code: item.carrier_code,
            flight_number: item.number,
            departure: Endpoint {
                airport_code: item.departure.iata_code,
                at: item.departure.at,
            },
            arrival: Endpoint {
                airport_code: item.arrival.iata_code,
                at: item.arrival.at,
            },
            duration: item.duration,
        }
    }
}

impl SupplierOffer {
    // One-way searches carry a single itinerary; further itineraries are ignored
    pub fn into_offer(self, display_currency: &str) -> Result<FlightOffer, String> {
        let offer_id = self.id;
        let (duration, segments) = match self.itineraries.into_iter().next() {
            Some(itinerary) => (itinerary.duration, itinerary.segments),
            None => (None, Vec::new()),
        };

        FlightOffer::new(
            offer_id.clone(),
            segments.into_iter().map(Segment::from).collect(),
            duration,
            self.price.into_money(display_currency),
            self.number_of_bookable_seats,
        )
        .map_err(|rejection| format!("offer {}: {}", offer_id, rejection))
    }
}

impl SupplierOfferResponse {
    /// Converts every offer that parses and satisfies the model invariants,
    /// dropping the rest.
    pub fn into_offers(self, display_currency: &str) -> Vec<FlightOffer> {
        self.data
            .into_iter()
            .enumerate()
            .filter_map(|(index, raw)| {
                let converted = serde_json::from_value::<SupplierOffer>(raw)
                    .map_err(|e| format!("offer at position {}: {}", index, e))
                    .and_then(|offer| offer.into_offer(display_currency));
                match converted {
                    Ok(offer) => Some(offer),
                    Err(reason) => {
                        warn!(%reason, "dropping malformed flight offer");
                        None
                    }
                }
            })
            .collect()
    }
}

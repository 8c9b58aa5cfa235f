// Core booking data model shared by the client, the wizard and the stores

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// Tagged monetary value; the only price representation past the ingestion boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into().to_uppercase(),
        }
    }

    pub fn is_in(&self, currency: &str) -> bool {
        self.currency.eq_ignore_ascii_case(currency)
    }

    /// Multiplies the amount, keeping the currency. None when the product overflows.
    pub fn times(&self, factor: usize) -> Option<Money> {
        let amount = self.amount.checked_mul(Decimal::from(factor))?;
        Some(Money {
            amount,
            currency: self.currency.clone(),
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount.round_dp(2), self.currency)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub airport_code: String,
    pub at: NaiveDateTime,
}

// One non-stop flown leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub carrier_code: String,
    pub flight_number: String,
    pub departure: Endpoint,
    pub arrival: Endpoint,
    pub duration: String,
}

// A priced, bookable itinerary. `FlightOffer::new` rejects an empty itinerary
// and a negative price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOffer {
    pub id: String,
    pub itinerary: Vec<Segment>,
    pub duration: Option<String>,
    pub price: Money,
    pub available_seats: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferRejection {
    EmptyItinerary,
    NegativePrice,
}

impl fmt::Display for OfferRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferRejection::EmptyItinerary => write!(f, "itinerary has no segments"),
            OfferRejection::NegativePrice => write!(f, "price total is negative"),
        }
    }
}

impl FlightOffer {
    pub fn new(
        id: impl Into<String>,
        itinerary: Vec<Segment>,
        duration: Option<String>,
        price: Money,
        available_seats: Option<u32>,
    ) -> Result<Self, OfferRejection> {
        if itinerary.is_empty() {
            return Err(OfferRejection::EmptyItinerary);
        }
        if price.amount.is_sign_negative() && !price.amount.is_zero() {
            return Err(OfferRejection::NegativePrice);
        }

        Ok(Self {
            id: id.into(),
            itinerary,
            duration,
            price,
            available_seats,
        })
    }

    pub fn first_segment(&self) -> Option<&Segment> {
        self.itinerary.first()
    }

    pub fn last_segment(&self) -> Option<&Segment> {
        self.itinerary.last()
    }

    pub fn origin(&self) -> &str {
        self.first_segment()
            .map_or("", |segment| segment.departure.airport_code.as_str())
    }

    pub fn destination(&self) -> &str {
        self.last_segment()
            .map_or("", |segment| segment.arrival.airport_code.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassengerType {
    #[default]
    Adult,
}

// Editable passenger fields, addressed by the wizard's update operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassengerField {
    FirstName,
    LastName,
    DateOfBirth,
    PassportNumber,
    Email,
    Phone,
}

impl PassengerField {
    pub const ALL: [PassengerField; 6] = [
        PassengerField::FirstName,
        PassengerField::LastName,
        PassengerField::DateOfBirth,
        PassengerField::PassportNumber,
        PassengerField::Email,
        PassengerField::Phone,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PassengerField::FirstName => "first name",
            PassengerField::LastName => "last name",
            PassengerField::DateOfBirth => "date of birth",
            PassengerField::PassportNumber => "passport number",
            PassengerField::Email => "email",
            PassengerField::Phone => "phone",
        }
    }
}

impl fmt::Display for PassengerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    #[serde(rename = "type")]
    pub passenger_type: PassengerType,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub passport_number: String,
    pub email: String,
    pub phone: String,
}

impl Passenger {
    pub fn field(&self, field: PassengerField) -> &str {
        match field {
            PassengerField::FirstName => &self.first_name,
            PassengerField::LastName => &self.last_name,
            PassengerField::DateOfBirth => &self.date_of_birth,
            PassengerField::PassportNumber => &self.passport_number,
            PassengerField::Email => &self.email,
            PassengerField::Phone => &self.phone,
        }
    }

    pub fn set_field(&mut self, field: PassengerField, value: impl Into<String>) {
        let slot = match field {
            PassengerField::FirstName => &mut self.first_name,
            PassengerField::LastName => &mut self.last_name,
            PassengerField::DateOfBirth => &mut self.date_of_birth,
            PassengerField::PassportNumber => &mut self.passport_number,
            PassengerField::Email => &mut self.email,
            PassengerField::Phone => &mut self.phone,
        };
        *slot = value.into();
    }

    /// Required fields that are empty or whitespace only.
    pub fn missing_fields(&self) -> Vec<PassengerField> {
        PassengerField::ALL
            .into_iter()
            .filter(|field| self.field(*field).trim().is_empty())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Upi,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Upi => write!(f, "upi"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "Pending"),
            BookingStatus::Confirmed => write!(f, "Confirmed"),
        }
    }
}

// The persisted result of a completed wizard run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub booking_id: String,
    pub payment_id: String,
    pub user_id: String,
    pub flight: FlightOffer,
    pub passengers: Vec<Passenger>,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

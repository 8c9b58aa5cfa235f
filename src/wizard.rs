// Booking Wizard State Machine
// Carries one user's selection from search results through passenger entry and
// payment to a persisted booking. Owned by a single session; every step checks
// the state it is allowed from before touching anything.

use crate::config::BookingConfig;
use crate::models::{
    BookingRecord, BookingStatus, FlightOffer, Money, Passenger, PassengerField,
};
use crate::offer_client::{FlightOfferClient, OfferTransport, SearchError, SearchQuery};
use crate::offers::CurrencyConverter;
use crate::payment::{generate_booking_id, generate_payment_id, PaymentDetails, PaymentError};
use crate::store::{BookingStore, StoreError};
use crate::ticket::Ticket;
use chrono::Utc;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

pub const MIN_PASSENGERS: usize = 1;
pub const MAX_PASSENGERS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Searching,
    OfferSelected,
    PassengerEntry,
    PaymentInProgress,
    Confirmed,
    Failed,
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WizardState::Searching => "Searching",
            WizardState::OfferSelected => "OfferSelected",
            WizardState::PassengerEntry => "PassengerEntry",
            WizardState::PaymentInProgress => "PaymentInProgress",
            WizardState::Confirmed => "Confirmed",
            WizardState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

fn field_list(fields: &[PassengerField]) -> String {
    fields
        .iter()
        .map(|field| field.label())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("Please log in to search and book flights")]
    Unauthenticated,

    #[error("Invalid wizard transition from {from} to {to}")]
    InvalidTransition { from: WizardState, to: WizardState },

    #[error("No flight selected")]
    NoOfferSelected,

    #[error("Flight offer {0} is not among the current results")]
    UnknownOffer(String),

    #[error("The total price for this flight cannot be calculated")]
    PriceUnavailable,

    #[error("There is no passenger {0}")]
    UnknownPassenger(usize),

    #[error("Please fill in all details for passenger {passenger}: missing {}", field_list(.missing))]
    IncompletePassengerData {
        // 1-based, as shown to the user
        passenger: usize,
        missing: Vec<PassengerField>,
    },

    #[error(transparent)]
    InvalidPaymentDetails(#[from] PaymentError),

    #[error("Your booking may not have been recorded ({0}). Please check your booking history before paying again.")]
    BookingPersistence(StoreError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

pub struct BookingWizard {
    user_id: Option<String>,
    state: WizardState,
    results: Vec<FlightOffer>,
    selected: Option<FlightOffer>,
    passengers: Vec<Passenger>,
    converter: CurrencyConverter,
    payment_delay: Duration,
    record: Option<BookingRecord>,
}

impl BookingWizard {
    pub fn new(user_id: Option<String>, config: &BookingConfig) -> Self {
        Self {
            user_id,
            state: WizardState::Searching,
            results: Vec::new(),
            selected: None,
            passengers: Vec::new(),
            converter: CurrencyConverter::from_config(config),
            payment_delay: config.payment_delay,
            record: None,
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn results(&self) -> &[FlightOffer] {
        &self.results
    }

    pub fn selected_offer(&self) -> Option<&FlightOffer> {
        self.selected.as_ref()
    }

    pub fn passengers(&self) -> &[Passenger] {
        &self.passengers
    }

    pub fn converter(&self) -> &CurrencyConverter {
        &self.converter
    }

    fn require_user(&self) -> Result<&str, WizardError> {
        self.user_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(WizardError::Unauthenticated)
    }

    fn require_state(&self, allowed: &[WizardState], to: WizardState) -> Result<(), WizardError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(WizardError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }

    fn require_passenger_entry(&self) -> Result<(), WizardError> {
        self.require_state(&[WizardState::PassengerEntry], WizardState::PassengerEntry)
    }

    fn transition(&mut self, to: WizardState) {
        debug!(from = %self.state, to = %to, "wizard transition");
        self.state = to;
    }

    // Replaces the displayed results; the most recent call always wins
    pub fn record_results(&mut self, offers: Vec<FlightOffer>) -> Result<(), WizardError> {
        self.require_state(
            &[WizardState::Searching, WizardState::OfferSelected],
            WizardState::Searching,
        )?;
        debug!(count = offers.len(), "search results replaced");
        self.results = offers;
        Ok(())
    }

    /// Runs a search for the signed-in user and keeps its offers as the current
    /// results. The sign-in check happens before any network call; on error the
    /// previous results stay in place.
    pub async fn search<T: OfferTransport>(
        &mut self,
        client: &FlightOfferClient<T>,
        query: &SearchQuery,
    ) -> Result<&[FlightOffer], WizardError> {
        self.require_user()?;
        self.require_state(
            &[WizardState::Searching, WizardState::OfferSelected],
            WizardState::Searching,
        )?;

        let offers = client.search(query).await?;
        self.record_results(offers)?;
        Ok(&self.results)
    }

    pub fn select_offer(&mut self, offer_id: &str) -> Result<&FlightOffer, WizardError> {
        self.require_user()?;
        self.require_state(
            &[WizardState::Searching, WizardState::OfferSelected],
            WizardState::OfferSelected,
        )?;

        let offer = self
            .results
            .iter()
            .find(|offer| offer.id == offer_id)
            .cloned()
            .ok_or_else(|| WizardError::UnknownOffer(offer_id.to_string()))?;

        info!(offer_id, route = %format!("{}-{}", offer.origin(), offer.destination()), "flight selected");
        self.transition(WizardState::OfferSelected);
        Ok(self.selected.insert(offer))
    }

    pub fn enter_passenger_details(&mut self) -> Result<(), WizardError> {
        self.require_user()?;
        self.require_state(&[WizardState::OfferSelected], WizardState::PassengerEntry)?;
        if self.selected.is_none() {
            return Err(WizardError::NoOfferSelected);
        }

        self.passengers = vec![Passenger::default()];
        self.transition(WizardState::PassengerEntry);
        Ok(())
    }

    // Back to the results with the selection kept; passenger drafts are discarded
    pub fn back_to_selection(&mut self) -> Result<(), WizardError> {
        self.require_state(&[WizardState::PassengerEntry], WizardState::OfferSelected)?;
        self.passengers.clear();
        self.transition(WizardState::OfferSelected);
        Ok(())
    }

    // Returns the passenger count; adding past the maximum changes nothing
    pub fn add_passenger(&mut self) -> Result<usize, WizardError> {
        self.require_passenger_entry()?;
        if self.passengers.len() < MAX_PASSENGERS {
            self.passengers.push(Passenger::default());
        }
        Ok(self.passengers.len())
    }

    pub fn remove_last_passenger(&mut self) -> Result<usize, WizardError> {
        self.require_passenger_entry()?;
        if self.passengers.len() > MIN_PASSENGERS {
            self.passengers.pop();
        }
        Ok(self.passengers.len())
    }

    pub fn remove_passenger(&mut self, index: usize) -> Result<usize, WizardError> {
        self.require_passenger_entry()?;
        if index >= self.passengers.len() {
            return Err(WizardError::UnknownPassenger(index + 1));
        }
        if self.passengers.len() > MIN_PASSENGERS {
            self.passengers.remove(index);
        }
        Ok(self.passengers.len())
    }

    // Grows with empty passengers or truncates from the end, within [1, 6]
    pub fn set_passenger_count(&mut self, count: usize) -> Result<usize, WizardError> {
        self.require_passenger_entry()?;
        let count = count.clamp(MIN_PASSENGERS, MAX_PASSENGERS);
        self.passengers.resize_with(count, Passenger::default);
        Ok(count)
    }

    pub fn update_passenger(
        &mut self,
        index: usize,
        field: PassengerField,
        value: impl Into<String>,
    ) -> Result<(), WizardError> {
        self.require_passenger_entry()?;
        let passenger = self
            .passengers
            .get_mut(index)
            .ok_or(WizardError::UnknownPassenger(index + 1))?;
        passenger.set_field(field, value);
        Ok(())
    }

    /// Price of the selected offer in the display currency times the passenger
    /// count. Once confirmed, the amount frozen in the booking record. None
    /// without a selection or when the amount does not fit a decimal.
    pub fn total_price(&self) -> Option<Money> {
        if let Some(record) = &self.record {
            return Some(record.total_amount.clone());
        }
        let offer = self.selected.as_ref()?;
        let unit = self
            .converter
            .normalize(&offer.price)
            .unwrap_or_else(|_| offer.price.clone());
        unit.times(self.passengers.len().max(MIN_PASSENGERS))
    }

    pub fn submit_passengers(&mut self) -> Result<(), WizardError> {
        self.require_passenger_entry()?;

        if let Some((index, missing)) = self
            .passengers
            .iter()
            .map(Passenger::missing_fields)
            .enumerate()
            .find(|(_, missing)| !missing.is_empty())
        {
            return Err(WizardError::IncompletePassengerData {
                passenger: index + 1,
                missing,
            });
        }

        self.transition(WizardState::PaymentInProgress);
        Ok(())
    }

    /// Validates the payment details, simulates processing, then persists a
    /// confirmed booking. Invalid details leave the wizard where it was without
    /// waiting; a store failure moves it to `Failed`.
    pub async fn submit_payment<S>(
        &mut self,
        details: &PaymentDetails,
        store: &S,
    ) -> Result<&BookingRecord, WizardError>
    where
        S: BookingStore + ?Sized,
    {
        self.require_state(&[WizardState::PaymentInProgress], WizardState::Confirmed)?;
        let user_id = self.require_user()?.to_string();
        details.validate()?;
        let flight = self.selected.clone().ok_or(WizardError::NoOfferSelected)?;
        let total_amount = self.total_price().ok_or(WizardError::PriceUnavailable)?;

        info!(method = %details.method(), "processing payment");
        tokio::time::sleep(self.payment_delay).await;

        let record = BookingRecord {
            booking_id: generate_booking_id(),
            payment_id: generate_payment_id(),
            user_id,
            flight,
            passengers: self.passengers.clone(),
            total_amount,
            payment_method: details.method(),
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
        };
        let booking_id = record.booking_id.clone();

        match store.create(record).await {
            Ok(saved) => {
                info!(booking_id = %saved.booking_id, "booking confirmed");
                self.transition(WizardState::Confirmed);
                Ok(self.record.insert(saved))
            }
            Err(e) => {
                error!(booking_id = %booking_id, error = %e, "booking could not be persisted");
                self.transition(WizardState::Failed);
                Err(WizardError::BookingPersistence(e))
            }
        }
    }

    // Manual resubmission after a persistence failure
    pub fn retry_payment(&mut self) -> Result<(), WizardError> {
        self.require_state(&[WizardState::Failed], WizardState::PaymentInProgress)?;
        self.transition(WizardState::PaymentInProgress);
        Ok(())
    }

    // Leaves the flow. Nothing is persisted unless the booking was already confirmed.
    pub fn abandon(self) {
        info!(state = %self.state, "booking wizard abandoned");
    }

    pub fn confirmation(&self) -> Option<(&BookingRecord, Ticket)> {
        match (&self.state, &self.record) {
            (WizardState::Confirmed, Some(record)) => Some((record, Ticket::new(record))),
            _ => None,
        }
    }
}

// Flight booking core library

// Modules for each stage of a booking
pub mod config;
#[cfg(test)]
pub(crate) mod http_stub;
pub mod local_store;
pub mod locations;
pub mod models;
pub mod offer_client;
pub mod offers;
pub mod payment;
pub mod store;
pub mod supplier;
pub mod telemetry;
pub mod ticket;
pub mod token;
pub mod wizard;

// Re-export key types for convenience
pub use config::{AppConfig, BookingConfig, ConfigError, ProviderConfig, StoreConfig};
pub use local_store::{FileKeyValueStore, KeyValueStore, LocalBookingCache, MemoryKeyValueStore};
pub use models::{
    BookingRecord, BookingStatus, FlightOffer, Money, Passenger, PassengerField, PaymentMethod,
    Segment,
};
pub use offer_client::{
    ClientStats, FlightOfferClient, HttpOfferTransport, OfferTransport, SearchError, SearchQuery,
};
pub use offers::{
    format_duration, format_money, sort_offers, CurrencyConverter, FormatError, OfferSummary,
    SortKey, SortOrder, SortState,
};
pub use payment::{PaymentDetails, PaymentError};
pub use store::{BookingStore, FallbackBookingStore, RemoteBookingStore, StoreError};
pub use ticket::Ticket;
pub use wizard::{BookingWizard, WizardError, WizardState};

// Flight Offer Formatter/Sorter
// Pure helpers that rank offers and derive their display fields.

use crate::config::BookingConfig;
use crate::models::{FlightOffer, Money};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("No exchange rate from {from} to {to}")]
    UnknownCurrency { from: String, to: String },

    #[error("Amount {amount} {currency} is too large to convert")]
    Overflow { amount: String, currency: String },
}

// Converts prices into the display currency using fixed published rates
#[derive(Debug, Clone)]
pub struct CurrencyConverter {
    target: String,
    rates: HashMap<String, Decimal>,
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self::from_config(&BookingConfig::default())
    }
}

impl CurrencyConverter {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_uppercase(),
            rates: HashMap::new(),
        }
    }

    pub fn from_config(config: &BookingConfig) -> Self {
        let mut converter = Self::new(&config.display_currency);
        for (currency, rate) in &config.exchange_rates {
            converter = converter.with_rate(currency, *rate);
        }
        converter
    }

    // `rate` is the number of target units per unit of `currency`
    pub fn with_rate(mut self, currency: &str, rate: Decimal) -> Self {
        self.rates.insert(currency.to_uppercase(), rate);
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn normalize(&self, money: &Money) -> Result<Money, FormatError> {
        if money.is_in(&self.target) {
            return Ok(money.clone());
        }

        let rate = self
            .rates
            .get(&money.currency.to_uppercase())
            .ok_or_else(|| FormatError::UnknownCurrency {
                from: money.currency.clone(),
                to: self.target.clone(),
            })?;

        let amount = money
            .amount
            .checked_mul(*rate)
            .ok_or_else(|| FormatError::Overflow {
                amount: money.amount.to_string(),
                currency: money.currency.clone(),
            })?;
        Ok(Money::new(amount, self.target.clone()))
    }

    // Amount used for ordering; unknown-currency or overflowing prices compare by their raw amount
    fn sort_amount(&self, money: &Money) -> Decimal {
        self.normalize(money)
            .map(|normalized| normalized.amount)
            .unwrap_or(money.amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Price,
    Seats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortOrder::Ascending => "↑",
            SortOrder::Descending => "↓",
        }
    }
}

// Sort controls of the results list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub key: SortKey,
    pub order: SortOrder,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::Price,
            order: SortOrder::Ascending,
        }
    }
}

impl SortState {
    /// Re-selecting the active key flips the order; a new key starts ascending.
    pub fn toggle(self, key: SortKey) -> Self {
        if self.key == key {
            Self {
                key,
                order: self.order.reversed(),
            }
        } else {
            Self {
                key,
                order: SortOrder::Ascending,
            }
        }
    }
}

/// Stable sort: offers with equal keys keep their input order in both directions.
pub fn sort_offers(
    offers: &[FlightOffer],
    key: SortKey,
    order: SortOrder,
    converter: &CurrencyConverter,
) -> Vec<FlightOffer> {
    let mut sorted = offers.to_vec();
    sorted.sort_by(|a, b| {
        let ordering = compare_by(a, b, key, converter);
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
    sorted
}

fn compare_by(
    a: &FlightOffer,
    b: &FlightOffer,
    key: SortKey,
    converter: &CurrencyConverter,
) -> Ordering {
    match key {
        SortKey::Price => converter
            .sort_amount(&a.price)
            .cmp(&converter.sort_amount(&b.price)),
        // None < Some(_): unknown seat counts rank lowest
        SortKey::Seats => a.available_seats.cmp(&b.available_seats),
    }
}

/// `PT2H30M` becomes `2h 30m`; input that is not an hours/minutes duration comes back unchanged.
pub fn format_duration(duration: &str) -> String {
    parse_duration_minutes(duration)
        .map(|total| format!("{}h {}m", total / 60, total % 60))
        .unwrap_or_else(|| duration.to_string())
}

fn parse_duration_minutes(duration: &str) -> Option<u64> {
    let rest = duration.trim().strip_prefix('P')?;
    let (days_part, time_part) = match rest.split_once('T') {
        Some((days, time)) => (days, time),
        None => (rest, ""),
    };

    let mut total = 0u64;
    let mut seen_unit = false;

    if !days_part.is_empty() {
        let days = days_part.strip_suffix('D')?.parse::<u64>().ok()?;
        total = days.checked_mul(24 * 60)?;
        seen_unit = true;
    }

    let mut digits = String::new();
    for c in time_part.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'H' | 'M' if !digits.is_empty() => {
                let value = digits.parse::<u64>().ok()?;
                let minutes = if c == 'H' { value.checked_mul(60)? } else { value };
                total = total.checked_add(minutes)?;
                digits.clear();
                seen_unit = true;
            }
            _ => return None,
        }
    }

    if !digits.is_empty() || !seen_unit {
        return None;
    }
    Some(total)
}

fn currency_symbol(currency: &str) -> Option<&'static str> {
    match currency {
        "INR" => Some("₹"),
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        _ => None,
    }
}

/// Formats money for display: `₹1,00,000` for rupees, `$1,234.5` otherwise.
pub fn format_money(money: &Money) -> String {
    let rounded = money.amount.round_dp(2).normalize();
    let text = rounded.abs().to_string();
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole.to_string(), Some(fraction.to_string())),
        None => (text, None),
    };

    let grouped = if money.is_in("INR") {
        group_indian(&whole)
    } else {
        group_thousands(&whole)
    };

    let mut number = grouped;
    if let Some(fraction) = fraction {
        number.push('.');
        number.push_str(&fraction);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        number.insert(0, '-');
    }

    match currency_symbol(&money.currency.to_uppercase()) {
        Some(symbol) => format!("{}{}", symbol, number),
        None => format!("{} {}", money.currency, number),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// Last three digits, then groups of two: 12,34,567
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut out = String::new();
    for (i, c) in head.chars().enumerate() {
        if i > 0 && (head.len() - i) % 2 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out.push(',');
    out.push_str(tail);
    out
}

// Display fields of one result row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferSummary {
    pub offer_id: String,
    pub carrier: String,
    pub flight_number: String,
    pub route: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: String,
    pub stops: usize,
    pub price: String,
    pub seats: String,
}

impl OfferSummary {
    pub fn from_offer(offer: &FlightOffer, converter: &CurrencyConverter) -> Self {
        let first = offer.first_segment();
        let last = offer.last_segment();
        let time = |at: Option<chrono::NaiveDateTime>| {
            at.map(|at| at.format("%H:%M").to_string())
                .unwrap_or_else(|| "N/A".to_string())
        };

        let price = converter
            .normalize(&offer.price)
            .unwrap_or_else(|_| offer.price.clone());
        let duration = offer
            .duration
            .as_deref()
            .or_else(|| first.map(|segment| segment.duration.as_str()))
            .map(format_duration)
            .unwrap_or_else(|| "N/A".to_string());

        Self {
            offer_id: offer.id.clone(),
            carrier: first
                .map(|segment| segment.carrier_code.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            flight_number: first
                .map(|segment| segment.flight_number.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            route: format!("{} → {}", offer.origin(), offer.destination()),
            departure_time: time(first.map(|segment| segment.departure.at)),
            arrival_time: time(last.map(|segment| segment.arrival.at)),
            duration,
            stops: offer.itinerary.len().saturating_sub(1),
            price: format_money(&price),
            seats: match offer.available_seats {
                Some(seats) => format!("{} seats left", seats),
                None => "N/A seats left".to_string(),
            },
        }
    }
}

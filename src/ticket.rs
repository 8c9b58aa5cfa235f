// Plain-text e-ticket for a confirmed booking

use crate::models::{BookingRecord, Money};
use crate::offers::{format_duration, format_money};
use std::fmt::Write;

const RULE: &str = "----------------------------------------";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    record: BookingRecord,
}

impl Ticket {
    pub fn new(record: &BookingRecord) -> Self {
        Self {
            record: record.clone(),
        }
    }

    pub fn booking_id(&self) -> &str {
        &self.record.booking_id
    }

    fn price_per_passenger(&self) -> Money {
        let count = self.record.passengers.len().max(1);
        Money::new(
            self.record.total_amount.amount / rust_decimal::Decimal::from(count),
            self.record.total_amount.currency.clone(),
        )
    }

    pub fn render(&self) -> String {
        let record = &self.record;
        let flight = &record.flight;
        let mut out = String::new();

        // writing into a String cannot fail
        let _ = writeln!(out, "FLIGHT TICKET");
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "Booking ID:  {}", record.booking_id);
        let _ = writeln!(out, "Payment ID:  {}", record.payment_id);
        let _ = writeln!(out, "Issued:      {}", record.created_at.format("%Y-%m-%d"));
        let _ = writeln!(out, "Status:      {}", record.status);
        let _ = writeln!(out, "{}", RULE);

        if let Some(first) = flight.first_segment() {
            let _ = writeln!(out, "Flight:      {} {}", first.carrier_code, first.flight_number);
            let _ = writeln!(out, "Route:       {} → {}", flight.origin(), flight.destination());
            let _ = writeln!(out, "Departure:   {}", first.departure.at.format("%Y-%m-%d %H:%M"));
        }
        if let Some(last) = flight.last_segment() {
            let _ = writeln!(out, "Arrival:     {}", last.arrival.at.format("%Y-%m-%d %H:%M"));
        }
        if let Some(duration) = &flight.duration {
            let _ = writeln!(out, "Duration:    {}", format_duration(duration));
        }
        let _ = writeln!(out, "{}", RULE);

        let _ = writeln!(out, "Passengers");
        for (index, passenger) in record.passengers.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. {} (passport {})",
                index + 1,
                passenger.full_name(),
                passenger.passport_number.trim()
            );
        }
        let _ = writeln!(out, "{}", RULE);

        let _ = writeln!(out, "Price per passenger: {}", format_money(&self.price_per_passenger()));
        let _ = writeln!(out, "Passengers:          {}", record.passengers.len());
        let _ = writeln!(out, "Total paid:          {}", format_money(&record.total_amount));
        let _ = writeln!(out, "Paid by:             {}", record.payment_method);

        out
    }
}

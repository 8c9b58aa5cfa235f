// Simulated payment: method-specific field checks and booking/payment identifiers

use crate::models::PaymentMethod;
use rand::Rng;
use thiserror::Error;

const ID_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ID_SUFFIX_LEN: usize = 9;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Please fill in all {method} details: missing {}", .missing.join(", "))]
    MissingFields {
        method: PaymentMethod,
        missing: Vec<&'static str>,
    },
}

// Details entered on the payment step. Card data never leaves this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentDetails {
    Card {
        number: String,
        holder_name: String,
        expiry: String,
        cvv: String,
    },
    Upi {
        upi_id: String,
    },
}

impl PaymentDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::Card { .. } => PaymentMethod::Card,
            PaymentDetails::Upi { .. } => PaymentMethod::Upi,
        }
    }

    pub fn validate(&self) -> Result<(), PaymentError> {
        let missing: Vec<&'static str> = match self {
            PaymentDetails::Card {
                number,
                holder_name,
                expiry,
                cvv,
            } => [
                ("card number", number),
                ("cardholder name", holder_name),
                ("expiry date", expiry),
                ("CVV", cvv),
            ]
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(label, _)| label)
            .collect(),
            PaymentDetails::Upi { upi_id } => {
                if upi_id.trim().is_empty() {
                    vec!["UPI ID"]
                } else {
                    vec![]
                }
            }
        };

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PaymentError::MissingFields {
                method: self.method(),
                missing,
            })
        }
    }
}

/// Groups card digits in fours (`4111 1111 1111 1111`), dropping anything else, capped at 16 digits.
pub fn format_card_number(input: &str) -> String {
    let digits: Vec<char> = input
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(16)
        .collect();
    digits
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

// `1226` -> `12/26`, as typed into the expiry field
pub fn format_expiry(input: &str) -> String {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).take(4).collect();
    if digits.len() > 2 {
        format!("{}/{}", &digits[..2], &digits[2..])
    } else {
        digits
    }
}

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ID_SUFFIX_LEN)
        .map(|_| ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())] as char)
        .collect()
}

// `BK` followed by 9 uppercase alphanumerics
pub fn generate_booking_id() -> String {
    format!("BK{}", random_suffix(&mut rand::thread_rng()))
}

// `PAY` followed by 9 uppercase alphanumerics
pub fn generate_payment_id() -> String {
    format!("PAY{}", random_suffix(&mut rand::thread_rng()))
}

pub fn is_booking_id(value: &str) -> bool {
    has_id_shape(value, "BK")
}

pub fn is_payment_id(value: &str) -> bool {
    has_id_shape(value, "PAY")
}

fn has_id_shape(value: &str, prefix: &str) -> bool {
    value.strip_prefix(prefix).map_or(false, |suffix| {
        suffix.len() == ID_SUFFIX_LEN
            && suffix
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
    })
}

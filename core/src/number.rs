//! Order numbers and Luhn validation.
//!
//! Order numbers arrive from clients as free-form text and are accepted
//! only if they are non-empty ASCII digit strings passing the Luhn
//! checksum. The same rule guards both order submission and withdrawal
//! requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an order number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NumberError {
    /// The input is empty.
    #[error("order number is empty")]
    Empty,

    /// The input contains something other than ASCII digits.
    #[error("order number must consist of digits only")]
    NotNumeric,

    /// The digits fail the Luhn checksum.
    #[error("order number does not pass checksum validation")]
    BadChecksum,
}

/// A validated order number.
///
/// The wrapped string is guaranteed to be a non-empty ASCII digit string
/// with a valid Luhn checksum.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Parse and validate an order number.
    ///
    /// # Errors
    ///
    /// Returns a [`NumberError`] if the input is empty, contains
    /// non-digit characters, or fails the Luhn checksum.
    pub fn parse(input: &str) -> Result<Self, NumberError> {
        if input.is_empty() {
            return Err(NumberError::Empty);
        }
        if !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NumberError::NotNumeric);
        }
        if !luhn_valid(input) {
            return Err(NumberError::BadChecksum);
        }
        Ok(Self(input.to_string()))
    }

    /// Return the number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = NumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderNumber({})", self.0)
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check a digit string against the Luhn checksum.
///
/// Digits are scanned right to left, every second digit is doubled
/// (subtracting 9 when the result exceeds 9), and the total must be
/// divisible by 10. Empty or non-digit input fails validation.
#[must_use]
pub fn luhn_valid(number: &str) -> bool {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = number
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let mut digit = u32::from(b - b'0');
            if i % 2 == 1 {
                digit *= 2;
                if digit > 9 {
                    digit -= 9;
                }
            }
            digit
        })
        .sum();
    sum % 10 == 0
}

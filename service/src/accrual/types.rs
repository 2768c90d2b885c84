//! Accrual system response types.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Order status as reported by the accrual system.
///
/// `Registered` and `Processing` are non-terminal: the order should be
/// checked again later. Statuses outside the documented set arrive as
/// [`AccrualStatus::Unknown`] and are also treated as non-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    /// The order is registered but not yet evaluated.
    Registered,
    /// The order is being evaluated.
    Processing,
    /// The order earns no reward. Terminal.
    Invalid,
    /// The order has been evaluated and rewarded. Terminal.
    Processed,
    /// An undocumented status value.
    #[serde(other)]
    Unknown,
}

/// Wire shape of a 200 response from the accrual system.
///
/// The reward arrives as a JSON number; it is converted to a decimal at
/// the client boundary.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OrderAccrualBody {
    #[serde(rename = "order")]
    pub number: String,
    pub status: AccrualStatus,
    #[serde(default)]
    pub accrual: f64,
}

/// One order's state in the accrual system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAccrual {
    /// The order number the reply refers to.
    pub number: String,

    /// Reported status.
    pub status: AccrualStatus,

    /// Reported reward, non-negative; zero unless the order is
    /// processed.
    pub accrual: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_documented_values() {
        let body: OrderAccrualBody =
            serde_json::from_str(r#"{"order":"79927398713","status":"PROCESSED","accrual":100.5}"#)
                .unwrap();
        assert_eq!(body.status, AccrualStatus::Processed);
        assert!((body.accrual - 100.5).abs() < f64::EPSILON);
    }

    #[test]
    fn undocumented_status_maps_to_unknown() {
        let body: OrderAccrualBody =
            serde_json::from_str(r#"{"order":"79927398713","status":"QUEUED"}"#).unwrap();
        assert_eq!(body.status, AccrualStatus::Unknown);
        assert!((body.accrual).abs() < f64::EPSILON);
    }
}

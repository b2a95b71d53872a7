//! Shared types and constants for the Just Go Market backend.
//!
//! This crate holds the enum-like vocabulary used by transactions: the
//! payment method a customer chose, the gateway that processed the charge,
//! and the lifecycle status of the charge. Values are persisted as their
//! upper-case wire labels (`PIX`, `MERCADO_PAGO`, `PENDING`, ...), which is
//! also how they appear in JSON.
//!
//! The database does not constrain these columns. Validation happens when a
//! label is parsed into one of these types on the write path; rows read back
//! are wrapped in [`Label`] so a value written by another producer does not
//! make the row unreadable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a label does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    /// Which vocabulary was being parsed.
    pub kind: &'static str,
    /// The rejected label.
    pub value: String,
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Brazilian instant payment.
    Pix,
    /// Credit card charge.
    CreditCard,
    /// In-app wallet balance.
    Wallet,
}

impl PaymentMethod {
    /// Returns the persisted label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pix => "PIX",
            Self::CreditCard => "CREDIT_CARD",
            Self::Wallet => "WALLET",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PIX" => Ok(Self::Pix),
            "CREDIT_CARD" => Ok(Self::CreditCard),
            "WALLET" => Ok(Self::Wallet),
            other => Err(UnknownVariant {
                kind: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

/// Third-party payment processor that handled a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayProvider {
    MercadoPago,
    Pagarme,
}

impl GatewayProvider {
    /// Returns the persisted label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MercadoPago => "MERCADO_PAGO",
            Self::Pagarme => "PAGARME",
        }
    }
}

impl FromStr for GatewayProvider {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MERCADO_PAGO" => Ok(Self::MercadoPago),
            "PAGARME" => Ok(Self::Pagarme),
            other => Err(UnknownVariant {
                kind: "gateway provider",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle status of a transaction.
///
/// Transactions are created as `Pending`. The gateway later confirms them as
/// `Paid` or `Failed`, and a paid transaction may be `Refunded`. Those
/// transitions are driven by the gateway integration; nothing in this crate
/// enforces an order between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl TransactionStatus {
    /// Returns the persisted label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "FAILED" => Ok(Self::Failed),
            "REFUNDED" => Ok(Self::Refunded),
            other => Err(UnknownVariant {
                kind: "transaction status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for GatewayProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A label read from storage.
///
/// `Unrecognized` keeps the raw text of a label this build has no variant
/// for, such as a status introduced by a newer gateway integration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label<T> {
    Known(T),
    Unrecognized(String),
}

impl<T: FromStr> Label<T> {
    /// Wraps a stored label, keeping it verbatim when it does not parse.
    pub fn from_stored(raw: String) -> Self {
        match raw.parse() {
            Ok(value) => Self::Known(value),
            Err(_) => Self::Unrecognized(raw),
        }
    }
}

impl<T: Copy> Label<T> {
    /// Returns the known variant, if any.
    pub fn known(&self) -> Option<T> {
        match self {
            Self::Known(value) => Some(*value),
            Self::Unrecognized(_) => None,
        }
    }
}

impl<T> From<T> for Label<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

impl<T: fmt::Display> fmt::Display for Label<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(value) => value.fmt(f),
            Self::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

impl<T: Serialize> Serialize for Label<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(value) => value.serialize(serializer),
            Self::Unrecognized(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de, T: FromStr> Deserialize<'de> for Label<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from_stored)
    }
}

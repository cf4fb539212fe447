use serde_json::Value;

use crate::error::{CoreError, Result};

/// One-off credit top-ups offered alongside the subscription plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditPack {
    Five,
    Ten,
    Twenty,
}

impl CreditPack {
    pub fn dollars(self) -> u32 {
        match self {
            CreditPack::Five => 5,
            CreditPack::Ten => 10,
            CreditPack::Twenty => 20,
        }
    }

    /// Parse the `amount` field of a purchase request. Only the numbers 5,
    /// 10 and 20 are accepted, written as integers or as `10.0`.
    pub fn from_amount(amount: Option<&Value>) -> Result<Self> {
        let n = amount.and_then(|v| {
            v.as_i64().or_else(|| {
                v.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
        });
        match n {
            Some(5) => Ok(CreditPack::Five),
            Some(10) => Ok(CreditPack::Ten),
            Some(20) => Ok(CreditPack::Twenty),
            Some(other) => Err(CoreError::InvalidCreditAmount(other)),
            None => Err(CoreError::InvalidCreditAmount(0)),
        }
    }
}

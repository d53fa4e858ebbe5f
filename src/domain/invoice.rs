use super::money::Amount;
use crate::error::Result;
use rust_decimal::Decimal;

/// The amount handed to the gateway for one purchase. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Invoice {
    amount: Amount,
}

impl Invoice {
    pub fn new(amount: Decimal) -> Result<Self> {
        Ok(Self {
            amount: Amount::new(amount)?,
        })
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

impl From<Amount> for Invoice {
    fn from(amount: Amount) -> Self {
        Self { amount }
    }
}

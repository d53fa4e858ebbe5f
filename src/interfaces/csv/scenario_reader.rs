use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Request,
    Approve,
    Purchase,
    Pay,
    Decline,
    Verify,
}

/// One row of a replay scenario.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ScenarioStep {
    pub action: Action,
    pub membership: u64,
    pub actor: Option<u64>,
    pub amount: Option<Decimal>,
}

/// Reads scenario steps from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<ScenarioStep>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct ScenarioReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScenarioReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and deserializes steps, one per row.
    pub fn steps(self) -> impl Iterator<Item = Result<ScenarioStep>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}

use crate::domain::money::Amount;
use crate::domain::transaction::TransactionId;
use crate::error::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CALLBACK_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_VERIFY_PATH: &str = "/membership/purchase/verify";
const DEFAULT_ORGANIZATION: &str = "Club";
const ENV_PREFIX: &str = "MEMBERSHIP_PAY";

/// Settings for building callback URLs and purchase descriptions.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PaymentSettings {
    /// Public base URL the gateway redirects back to.
    pub callback_base_url: String,
    /// Route of the verification endpoint; the transaction id is appended.
    pub verify_path: String,
    /// Shown to the payer in the gateway's description field.
    pub organization: String,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            callback_base_url: DEFAULT_CALLBACK_BASE_URL.to_string(),
            verify_path: DEFAULT_VERIFY_PATH.to_string(),
            organization: DEFAULT_ORGANIZATION.to_string(),
        }
    }
}

impl PaymentSettings {
    /// Loads defaults, then the optional file, then `MEMBERSHIP_PAY__*` variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("callback_base_url", DEFAULT_CALLBACK_BASE_URL)?
            .set_default("verify_path", DEFAULT_VERIFY_PATH)?
            .set_default("organization", DEFAULT_ORGANIZATION)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn callback_url(&self, tx_id: TransactionId) -> String {
        format!(
            "{}/{}/{}",
            self.callback_base_url.trim_end_matches('/'),
            self.verify_path.trim_matches('/'),
            tx_id
        )
    }

    pub fn purchase_description(&self, amount: Amount) -> String {
        format!("{} membership fee payment of {}", self.organization, amount)
    }
}

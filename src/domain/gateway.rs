use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RedirectMethod {
    Get,
    Post,
}

/// Where the caller should send the user next.
///
/// Banks commonly expect an auto-submitted form, so a target carries the
/// HTTP method and any form inputs alongside the URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectTarget {
    pub url: String,
    pub method: RedirectMethod,
    pub inputs: Vec<(String, String)>,
}

impl RedirectTarget {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: RedirectMethod::Get,
            inputs: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>, inputs: Vec<(String, String)>) -> Self {
        Self {
            url: url.into(),
            method: RedirectMethod::Post,
            inputs,
        }
    }
}

/// Returned by the gateway once a purchase has been registered on its side.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseStart {
    pub gateway_transaction_id: String,
    pub redirect: RedirectTarget,
}

/// Gateway-issued proof of a settled payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub reference_id: String,
    pub driver: String,
}

/// Outcome of asking the gateway whether a payment went through.
///
/// `Invalid` is an expected business outcome, not a failure of the call.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Verified(Receipt),
    Invalid { reason: String },
}

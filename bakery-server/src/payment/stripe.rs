//! Stripe integration via REST API (no SDK dependency)

use std::time::Duration;

use async_trait::async_trait;

use super::{ChargeOutcome, ChargeStatus, PaymentError, PaymentProcessor};

/// Stripe payment intents client
///
/// Talks to the `/v1/payment_intents` endpoints with form-encoded
/// requests, authenticated with the account secret key.
pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            secret_key: secret_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
        receipt_email: &str,
    ) -> Result<String, PaymentError> {
        let amount = amount_minor_units.to_string();
        let resp: serde_json::Value = self
            .http
            .post(self.endpoint("/v1/payment_intents"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", currency),
                ("receipt_email", receipt_email),
                ("automatic_payment_methods[enabled]", "true"),
            ])
            .send()
            .await?
            .json()
            .await?;

        resp["client_secret"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| PaymentError::Rejected(format!("Stripe create_intent failed: {resp}")))
    }

    async fn confirm_charge(
        &self,
        client_secret: &str,
        payment_method: &str,
    ) -> Result<ChargeOutcome, PaymentError> {
        // The intent id is the client secret up to the "_secret_" marker
        let intent_id = client_secret
            .split("_secret_")
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PaymentError::Rejected("Malformed client secret".to_string()))?;

        let resp: serde_json::Value = self
            .http
            .post(self.endpoint(&format!("/v1/payment_intents/{intent_id}/confirm")))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[("payment_method", payment_method)])
            .send()
            .await?
            .json()
            .await?;

        let reference = resp["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| PaymentError::Rejected(format!("Stripe confirm failed: {resp}")))?;

        let status = match resp["status"].as_str() {
            Some("succeeded") => ChargeStatus::Succeeded,
            Some(other) => ChargeStatus::Failed(other.to_string()),
            None => ChargeStatus::Failed("unknown".to_string()),
        };

        Ok(ChargeOutcome {
            status,
            payment_reference: reference,
        })
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn intent_id_extracted_from_client_secret() {
        let secret = "pi_3Abc_secret_xyz";
        let id = secret.split("_secret_").next().unwrap();
        assert_eq!(id, "pi_3Abc");
    }
}

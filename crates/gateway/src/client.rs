//! Flutterwave HTTP client.
//!
//! One method per endpoint, each mapped onto the gateway port. Responses
//! are unwrapped from the `{status, message, data}` envelope; failures are
//! classified into timeouts, rejections and unavailability.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use storeledger_core::gateway::{
    ChargeRequest, GatewayError, PaymentGateway, TransferReceipt, TransferRequest,
    VerifiedTransaction,
};
use storeledger_shared::config::GatewayConfig;
use tracing::{debug, warn};

use crate::error::HttpError;
use crate::retry::{RetryConfig, RetryPolicy};
use crate::wire::{
    ChargeCustomer, ChargePayload, Envelope, PaymentLink, ResolveAccountPayload, ResolvedAccount,
    TransferData, TransferPayload, VerifyData, amount_value, id_string, parse_amount,
};

/// Client for the Flutterwave v3 REST API.
#[derive(Debug, Clone)]
pub struct FlutterwaveClient {
    base_url: String,
    secret_key: String,
    http: Client,
    retry: RetryConfig,
}

impl FlutterwaveClient {
    /// Creates a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Unavailable` if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            http,
            retry: RetryConfig::default(),
        })
    }

    /// Creates a client from the `gateway` configuration section.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Unavailable` if the HTTP client cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Self::new(
            &config.base_url,
            config.secret_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Replaces the retry configuration used for idempotent reads.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, retry: RetryPolicy) -> Result<T, HttpError> {
        self.request_with_retry(Method::GET, path, None::<&()>, retry)
            .await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        retry: RetryPolicy,
    ) -> Result<T, HttpError> {
        self.request_with_retry(Method::POST, path, Some(body), retry)
            .await
    }

    async fn request_with_retry<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        retry: RetryPolicy,
    ) -> Result<T, HttpError> {
        let config = match retry {
            RetryPolicy::None => return self.do_request(&method, path, body).await,
            RetryPolicy::Idempotent => self.retry.clone(),
            RetryPolicy::Custom(config) => config,
        };

        let mut last_error = None;
        for attempt in 0..=config.max_retries {
            match self.do_request::<T, B>(&method, path, body).await {
                Ok(data) => return Ok(data),
                Err(e) => {
                    let should_retry = match &e {
                        HttpError::ServerError { status, .. } => config.retries_status(*status),
                        HttpError::Transport(_) => true,
                        _ => false,
                    };

                    if !should_retry {
                        return Err(e);
                    }

                    if attempt < config.max_retries {
                        let delay = config.delay_for_attempt(attempt);
                        debug!(
                            path,
                            attempt = attempt + 1,
                            max = config.max_retries,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %e,
                            "Retrying gateway request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(HttpError::MaxRetriesExceeded {
            attempts: config.max_retries + 1,
            last_error: last_error.map_or_else(|| "unknown".to_string(), |e| e.to_string()),
        })
    }

    async fn do_request<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, HttpError> {
        let mut request = self
            .http
            .request(method.clone(), self.url(path))
            .bearer_auth(&self.secret_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            let envelope: Envelope<T> =
                serde_json::from_str(&text).map_err(|e| HttpError::Decode(e.to_string()))?;
            return envelope.into_data();
        }

        let message = serde_json::from_str::<Envelope<serde_json::Value>>(&text)
            .map(|envelope| envelope.message)
            .unwrap_or(text);
        let status = status.as_u16();
        warn!(path, status, message = %message, "Gateway request failed");

        if status >= 500 {
            Err(HttpError::ServerError {
                status,
                body: message,
            })
        } else {
            Err(HttpError::Rejected { status, message })
        }
    }
}

#[async_trait]
impl PaymentGateway for FlutterwaveClient {
    async fn initialize_charge(&self, request: &ChargeRequest) -> Result<String, GatewayError> {
        let payload = ChargePayload {
            tx_ref: &request.reference,
            amount: amount_value(request.amount),
            currency: request.currency.code(),
            redirect_url: &request.redirect_url,
            customer: ChargeCustomer {
                email: &request.customer.email,
                name: request.customer.name.as_deref(),
                phonenumber: request.customer.phone.as_deref(),
            },
            meta: &request.meta,
        };

        let link: PaymentLink = self
            .post("/v3/payments", &payload, RetryPolicy::None)
            .await?;
        Ok(link.link)
    }

    async fn verify_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<VerifiedTransaction, GatewayError> {
        let path = format!("/v3/transactions/{transaction_id}/verify");
        let data: VerifyData = self.get(&path, RetryPolicy::Idempotent).await?;

        Ok(VerifiedTransaction {
            id: id_string(&data.id),
            status: data.status,
            amount: parse_amount(&data.amount)?,
            currency: data.currency,
            tx_ref: data.tx_ref,
        })
    }

    async fn verify_bank_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<String, GatewayError> {
        let payload = ResolveAccountPayload {
            account_number,
            account_bank: bank_code,
        };
        let account: ResolvedAccount = self
            .post("/v3/accounts/resolve", &payload, RetryPolicy::Idempotent)
            .await?;
        Ok(account.account_name)
    }

    async fn initiate_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, GatewayError> {
        let payload = TransferPayload {
            account_bank: &request.bank_code,
            account_number: &request.account_number,
            amount: amount_value(request.amount),
            currency: request.currency.code(),
            debit_currency: request.currency.code(),
            narration: &request.narration,
            reference: &request.reference,
            callback_url: &request.callback_url,
        };

        let data: TransferData = self
            .post("/v3/transfers", &payload, RetryPolicy::None)
            .await?;
        Ok(TransferReceipt {
            transfer_id: id_string(&data.id),
            status: data.status,
        })
    }
}

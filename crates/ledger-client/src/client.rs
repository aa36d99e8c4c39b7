//! Ledger HTTP client implementation.

use std::time::Duration;

use ledger_core::{
    Account, AccountFilter, AccountId, Decimal, MultiBeneficiaryId, NewAccount, Page,
    RefundRequest, Transaction, TransactionId, TransferRequest,
};
use reqwest::{Client, RequestBuilder};

use crate::error::ClientError;
use crate::types::{ApiErrorResponse, BalanceResponse, TransactionsResponse};

/// Ledger API client.
///
/// Provides methods for managing accounts and moving money.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    client: Client,
    base_url: String,
}

impl LedgerClient {
    /// Create a new ledger client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the ledger service (e.g., `"http://ledger:8080"`)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new ledger client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Open an account.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::DuplicateOwner` if the owner already holds an
    /// account, or another error if the request fails.
    pub async fn create_account(
        &self,
        owner_id: impl Into<String>,
        balance: Decimal,
    ) -> Result<Account, ClientError> {
        let request = NewAccount {
            owner_id: owner_id.into(),
            balance,
        };

        self.send(self.client.post(self.url("/accounts")).json(&request))
            .await
    }

    /// Get an account.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccountNotFound` if the account doesn't exist.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, ClientError> {
        self.send(self.client.get(self.url(&format!("/accounts/{id}"))))
            .await
    }

    /// List accounts in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>, ClientError> {
        let mut query = vec![
            ("limit", filter.page.limit.to_string()),
            ("page", filter.page.page.to_string()),
        ];
        if let Some(owner_id) = &filter.owner_id {
            query.push(("owner_id", owner_id.clone()));
        }

        self.send(self.client.get(self.url("/accounts")).query(&query))
            .await
    }

    /// Current balance of an account.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccountNotFound` if the account doesn't exist.
    pub async fn get_balance(&self, id: AccountId) -> Result<Decimal, ClientError> {
        let response: BalanceResponse = self
            .send(self.client.get(self.url(&format!("/accounts/{id}/balance"))))
            .await?;
        Ok(response.balance)
    }

    /// Deposit into an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is rejected or the account doesn't exist.
    pub async fn deposit(&self, id: AccountId, amount: Decimal) -> Result<Transaction, ClientError> {
        self.move_money(&format!("/accounts/{id}/deposit"), amount)
            .await
    }

    /// Withdraw from an account.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InsufficientFunds` if the balance is too low.
    pub async fn withdraw(
        &self,
        id: AccountId,
        amount: Decimal,
    ) -> Result<Transaction, ClientError> {
        self.move_money(&format!("/accounts/{id}/withdraw"), amount)
            .await
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Transfer from `source` to the recipients of `request`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InsufficientFunds` if the source can't cover the
    /// total, or an API error for an invalid split or unknown recipient.
    pub async fn transfer(
        &self,
        source: AccountId,
        request: &TransferRequest,
    ) -> Result<Vec<Transaction>, ClientError> {
        let response: TransactionsResponse = self
            .send(
                self.client
                    .post(self.url(&format!("/accounts/{source}/transfer_money")))
                    .json(request),
            )
            .await?;
        Ok(response.transactions)
    }

    /// Ledger entries of an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn transaction_history(
        &self,
        id: AccountId,
        page: Page,
    ) -> Result<Vec<Transaction>, ClientError> {
        self.send(
            self.client
                .get(self.url(&format!("/accounts/{id}/transactions")))
                .query(&[("limit", page.limit), ("page", page.page)]),
        )
        .await
    }

    /// Refund a single entry. `account` names the route the request goes to.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::CannotRefundARefund` for a refund entry or one
    /// already refunded.
    pub async fn refund_transaction(
        &self,
        account: AccountId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, ClientError> {
        let mut entries = self
            .refund(account, &RefundRequest::transaction(transaction_id))
            .await?;

        entries.pop().ok_or_else(|| ClientError::Api {
            code: "empty_response".to_string(),
            message: "refund returned no transaction".to_string(),
            status: 200,
        })
    }

    /// Refund every leg of a multi-recipient transfer.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::CannotRefundARefund` if the group was already
    /// refunded.
    pub async fn refund_group(
        &self,
        account: AccountId,
        group: MultiBeneficiaryId,
    ) -> Result<Vec<Transaction>, ClientError> {
        self.refund(account, &RefundRequest::group(group)).await
    }

    async fn refund(
        &self,
        account: AccountId,
        request: &RefundRequest,
    ) -> Result<Vec<Transaction>, ClientError> {
        let response: TransactionsResponse = self
            .send(
                self.client
                    .post(self.url(&format!("/accounts/{account}/refund_money")))
                    .json(request),
            )
            .await?;
        Ok(response.transactions)
    }

    async fn move_money(&self, path: &str, amount: Decimal) -> Result<Transaction, ClientError> {
        let mut response: TransactionsResponse = self
            .send(
                self.client
                    .post(self.url(path))
                    .query(&[("amount", amount.to_string())]),
            )
            .await?;

        response.transactions.pop().ok_or_else(|| ClientError::Api {
            code: "empty_response".to_string(),
            message: format!("{path} returned no transaction"),
            status: 200,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        tracing::debug!(url = %response.url(), status = %response.status(), "Ledger response");
        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let code = api_error.error.code.as_str();
                let message = api_error.error.message;
                let details = api_error.error.details.as_ref();

                // Map specific error codes to typed errors
                match code {
                    "insufficient_funds" => Err(ClientError::InsufficientFunds {
                        account_id: details
                            .and_then(|d| d.get("account_id"))
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        balance: decimal_detail(details, "balance"),
                        required: decimal_detail(details, "required"),
                    }),
                    "duplicate_owner" => Err(ClientError::DuplicateOwner { message }),
                    "cannot_refund_a_refund" => Err(ClientError::CannotRefundARefund { message }),
                    "not_found" if message.starts_with("account not found") => {
                        Err(ClientError::AccountNotFound {
                            account_id: message.replace("account not found: ", ""),
                        })
                    }
                    _ => Err(ClientError::Api {
                        code: code.to_string(),
                        message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

fn decimal_detail(details: Option<&serde_json::Value>, key: &str) -> Decimal {
    details
        .and_then(|d| d.get(key))
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

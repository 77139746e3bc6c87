use std::fmt;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client for the Neto (Maropost Commerce) JSON API. Every call posts to
/// the same endpoint; the action is selected with the `NETOAPI_ACTION`
/// header.
#[derive(Clone)]
pub struct NetoClient {
    http: Client,
    base_url: Url,
    username: String,
    api_key: String,
}

impl fmt::Debug for NetoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetoClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerFilter {
    #[serde(rename = "Username", default, skip_serializing_if = "Vec::is_empty")]
    pub username: Vec<String>,
    #[serde(rename = "Active")]
    pub active: bool,
    #[serde(rename = "OutputSelector")]
    pub output_selector: Vec<String>,
}

impl CustomerFilter {
    fn with_usernames(username: Vec<String>) -> Self {
        CustomerFilter {
            username,
            active: true,
            output_selector: vec![
                "Username".to_string(),
                "EmailAddress".to_string(),
                "BillingAddress".to_string(),
            ],
        }
    }

    /// Filter matching every active customer.
    pub fn active_customers() -> Self {
        Self::with_usernames(Vec::new())
    }

    /// Filter matching a single customer by Maropost username.
    pub fn for_username(username: &str) -> Self {
        Self::with_usernames(vec![username.to_string()])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerLookupRequest {
    #[serde(rename = "Filter")]
    pub filter: CustomerFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingAddress {
    #[serde(rename = "BillFirstName", default)]
    pub bill_first_name: Option<String>,
    #[serde(rename = "BillLastName", default)]
    pub bill_last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetoCustomer {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "EmailAddress", default)]
    pub email_address: Option<String>,
    #[serde(rename = "BillingAddress", default)]
    pub billing_address: Option<BillingAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetCustomerResponse {
    #[serde(rename = "Customer", default)]
    pub customer: Vec<NetoCustomer>,
}

/// Flattened customer row handed to the staff UI.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerSummary {
    pub username: String,
    pub email_address: Option<String>,
    pub bill_firstname: Option<String>,
    pub bill_lastname: Option<String>,
}

impl From<NetoCustomer> for CustomerSummary {
    fn from(customer: NetoCustomer) -> Self {
        let billing = customer.billing_address.unwrap_or(BillingAddress {
            bill_first_name: None,
            bill_last_name: None,
        });
        CustomerSummary {
            username: customer.username,
            email_address: customer.email_address,
            bill_firstname: billing.bill_first_name,
            bill_lastname: billing.bill_last_name,
        }
    }
}

impl NetoClient {
    pub fn new(base_url: &str, username: &str, api_key: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).context("Invalid Neto API base URL")?;
        let http = Client::builder()
            .user_agent("stt-manager/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            username: username.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn build_request(&self, action: &str, body: &Value) -> Result<reqwest::Request> {
        self.http
            .post(self.base_url.clone())
            .header("NETOAPI_ACTION", action)
            .header("NETOAPI_USERNAME", &self.username)
            .header("NETOAPI_KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(body)
            .build()
            .context("Failed to build Neto API request")
    }

    async fn execute(&self, action: &str, body: &Value) -> Result<GetCustomerResponse> {
        let request = self.build_request(action, body)?;
        let res = self
            .http
            .execute(request)
            .await
            .context("Failed to reach the Neto API")?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            log::warn!("Neto API error {status}: {text}");
            return Err(anyhow!("Neto API error {status}: {text}"));
        }

        res.json::<GetCustomerResponse>()
            .await
            .context("Invalid Neto API response JSON")
    }

    pub async fn get_customers(&self, filter: CustomerFilter) -> Result<GetCustomerResponse> {
        let body = serde_json::to_value(CustomerLookupRequest { filter })
            .context("Failed to serialize customer filter")?;
        self.execute("GetCustomer", &body).await
    }

    /// The active customer directory, flattened for display.
    pub async fn get_active_customers(&self) -> Result<Vec<CustomerSummary>> {
        let response = self.get_customers(CustomerFilter::active_customers()).await?;
        Ok(response.customer.into_iter().map(CustomerSummary::from).collect())
    }
}

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach health endpoint")?;

        if !response.status().is_success() {
            anyhow::bail!("Health check failed: {}", response.status());
        }
        Ok(())
    }

    /// Creates a product and returns the `data` object of the response.
    pub async fn create_product(&self, name: &str, price: &str, description: &str) -> Result<Value> {
        let (status, body) = self
            .post_product(json!({
                "name": name,
                "price": price,
                "description": description,
            }))
            .await?;

        if status != StatusCode::CREATED {
            anyhow::bail!("Failed to create product: {} - Response: {}", status, body);
        }

        Ok(body["data"].clone())
    }

    /// Posts an arbitrary body and returns the status with the parsed response,
    /// without treating non-2xx responses as errors.
    pub async fn post_product(&self, body: Value) -> Result<(StatusCode, Value)> {
        let url = format!("{}/products/create/", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to create product")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok((status, body))
    }
}

//! SPARQL 1.1 protocol client over HTTP

use tracing::debug;

use crate::error::StoreError;
use crate::query::{Select, Solution, Update};
use crate::results::parse_solutions;
use crate::retry::RetryPolicy;
use crate::sparql::{render_select, render_update};
use crate::store::{GraphStore, Privilege};

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
const SUDO_HEADER: &str = "mu-auth-sudo";

pub struct SparqlClient {
    client: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl SparqlClient {
    pub fn new(endpoint: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            retry,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST a form with a single field and return the response body.
    async fn send(
        &self,
        field: &'static str,
        text: &str,
        privilege: Privilege,
    ) -> Result<String, StoreError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[(field, text)]);
        if privilege == Privilege::Sudo {
            request = request.header(SUDO_HEADER, "true");
        }

        let response = request.send().await.map_err(|source| StoreError::Transport {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| StoreError::Transport {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl GraphStore for SparqlClient {
    async fn select(
        &self,
        query: &Select,
        privilege: Privilege,
    ) -> Result<Vec<Solution>, StoreError> {
        let text = render_select(query)?;
        debug!("SPARQL query: {}", text);
        let body = self
            .retry
            .run("query", || self.send("query", &text, privilege))
            .await?;
        parse_solutions(&body)
    }

    async fn update(&self, update: &Update, privilege: Privilege) -> Result<(), StoreError> {
        let text = render_update(update)?;
        debug!("SPARQL update: {}", text);
        self.retry
            .run("update", || self.send("update", &text, privilege))
            .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "sparql"
    }
}

//! HTTP client for pg-meta, local or behind the Supabase platform API.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::PgMetaApi;
use super::queries;
use super::wire::{
    PgMetaBucket, PgMetaFunction, PgMetaMembership, PgMetaPolicy, PgMetaRole, PgMetaTable,
    PgMetaType,
};
use crate::error::{Error, Result};

/// Per-request timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Where pg-meta is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A pg-meta instance served directly, e.g. `http://localhost:8080`
    Local { base_url: String },
    /// pg-meta proxied by the platform API for a hosted project
    Cloud {
        api_url: String,
        project_id: String,
        access_token: String,
    },
}

impl Target {
    fn base(&self) -> String {
        match self {
            Self::Local { base_url } => base_url.trim_end_matches('/').to_string(),
            Self::Cloud {
                api_url,
                project_id,
                ..
            } => format!(
                "{}/platform/pg-meta/{}",
                api_url.trim_end_matches('/'),
                project_id
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgMetaClient {
    http: Client,
    target: Target,
}

impl PgMetaClient {
    pub fn new(target: Target) -> Result<Self> {
        Self::with_timeout(target, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(target: Target, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("supaform/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| Error::Transport {
                endpoint: target.base(),
                source,
            })?;
        Ok(Self { http, target })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.target.base(), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.target {
            Target::Cloud { access_token, .. } => builder.bearer_auth(access_token),
            Target::Local { .. } => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        debug!(endpoint, "pg-meta request");
        let response = request.send().await.map_err(|source| Error::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|source| Error::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(Error::Protocol {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        serde_json::from_slice(&body).map_err(|source| Error::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, schemas: Option<&[String]>) -> Result<T> {
        let mut query = vec![("include_columns", "true".to_string())];
        if let Some(schemas) = schemas {
            query.push(("included_schemas", schemas.join(",")));
        }
        let request = self.request(Method::GET, path).query(&query);
        self.send(path, request).await
    }

    async fn post_query<T: DeserializeOwned>(&self, sql: &str) -> Result<T> {
        let request = self
            .request(Method::POST, "/query")
            .json(&serde_json::json!({ "query": sql }));
        self.send("/query", request).await
    }
}

impl PgMetaApi for PgMetaClient {
    async fn tables(&self, schemas: &[String]) -> Result<Vec<PgMetaTable>> {
        self.get("/tables", Some(schemas)).await
    }

    async fn policies(&self, schemas: &[String]) -> Result<Vec<PgMetaPolicy>> {
        self.get("/policies", Some(schemas)).await
    }

    async fn roles(&self) -> Result<Vec<PgMetaRole>> {
        self.get("/roles", None).await
    }

    async fn role_memberships(&self) -> Result<Vec<PgMetaMembership>> {
        self.post_query(queries::ROLE_MEMBERSHIPS).await
    }

    async fn functions(&self, schemas: &[String]) -> Result<Vec<PgMetaFunction>> {
        self.get("/functions", Some(schemas)).await
    }

    async fn types(&self, schemas: &[String]) -> Result<Vec<PgMetaType>> {
        self.post_query(&queries::types_in(schemas)).await
    }

    async fn buckets(&self) -> Result<Vec<PgMetaBucket>> {
        self.post_query(queries::BUCKETS).await
    }

    async fn query(&self, sql: &str) -> Result<serde_json::Value> {
        self.post_query(sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls() {
        let local = PgMetaClient::new(Target::Local {
            base_url: "http://localhost:8080/".into(),
        })
        .unwrap();
        assert_eq!(local.url("/tables"), "http://localhost:8080/tables");

        let cloud = PgMetaClient::new(Target::Cloud {
            api_url: "https://api.supabase.com".into(),
            project_id: "abcd".into(),
            access_token: "sbp_token".into(),
        })
        .unwrap();
        assert_eq!(
            cloud.url("/query"),
            "https://api.supabase.com/platform/pg-meta/abcd/query"
        );
    }
}

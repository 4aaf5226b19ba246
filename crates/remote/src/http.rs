use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;
use vconnect_core_types::{Branch, Code, CodeMapping, Customer, EventRecord, User};

use crate::port::{RemoteError, RemotePort};

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://vconnect-alert.winzetech.com/api".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// reqwest-backed implementation of [`RemotePort`].
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRemote {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| RemoteError::Transport {
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    async fn get_rows<T>(&self, resource: &str) -> Result<Vec<T>, RemoteError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, resource);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|err| RemoteError::Transport {
            message: err.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                code: status.as_u16(),
            });
        }

        let payload: Value = response.json().await.map_err(|err| RemoteError::Decode {
            message: err.to_string(),
        })?;
        Ok(decode_rows(resource, payload))
    }
}

/// Accepts either a bare array or a `{ "data": [...] }` envelope; rows that
/// fail to decode are dropped with a warning rather than failing the batch.
fn decode_rows<T>(resource: &str, payload: Value) -> Vec<T>
where
    T: DeserializeOwned,
{
    let rows = match payload {
        Value::Array(rows) => rows,
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => {
                warn!(resource, "payload was neither an array nor a data envelope");
                Vec::new()
            }
        },
        _ => {
            warn!(resource, "payload was not a collection");
            Vec::new()
        }
    };

    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(resource, error = %err, "dropping undecodable row");
                None
            }
        })
        .collect()
}

#[async_trait]
impl RemotePort for HttpRemote {
    async fn users(&self) -> Result<Vec<User>, RemoteError> {
        self.get_rows("auth/users").await
    }

    async fn calls(&self) -> Result<Vec<EventRecord>, RemoteError> {
        self.get_rows("vconnect/user-audits").await
    }

    async fn codes(&self) -> Result<Vec<Code>, RemoteError> {
        self.get_rows("vconnect/codes").await
    }

    async fn branches(&self) -> Result<Vec<Branch>, RemoteError> {
        self.get_rows("vconnect/branches").await
    }

    async fn customers(&self) -> Result<Vec<Customer>, RemoteError> {
        self.get_rows("auth/customers").await
    }

    async fn code_mappings(&self) -> Result<Vec<CodeMapping>, RemoteError> {
        self.get_rows("vconnect/code-mapping").await
    }

    async fn branch_codes(&self, branch_id: &str) -> Result<Vec<Code>, RemoteError> {
        self.get_rows(&format!("vconnect/branch-codes/{branch_id}"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_rows_reads_bare_arrays() {
        let rows: Vec<User> = decode_rows(
            "auth/users",
            json!([{ "id": 1, "first_name": "Ada" }, { "id": "2" }]),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id.as_deref(), Some("1"));
    }

    #[test]
    fn decode_rows_unwraps_data_envelope() {
        let rows: Vec<Branch> = decode_rows(
            "vconnect/branches",
            json!({ "data": [{ "id": 5, "name": "Main" }] }),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name.as_deref(), Some("Main"));
    }

    #[test]
    fn decode_rows_drops_non_object_rows() {
        let rows: Vec<EventRecord> = decode_rows(
            "vconnect/user-audits",
            json!([{ "id": 1 }, "not a row", 42]),
        );
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn decode_rows_handles_scalar_payload() {
        let rows: Vec<Code> = decode_rows("vconnect/codes", json!("oops"));
        assert!(rows.is_empty());
    }

    #[test]
    fn not_found_is_distinguishable() {
        assert!(RemoteError::Status { code: 404 }.is_not_found());
        assert!(!RemoteError::Status { code: 500 }.is_not_found());
        assert!(!RemoteError::Transport {
            message: "reset".into()
        }
        .is_not_found());
    }
}

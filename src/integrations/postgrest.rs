use reqwest::{Client, RequestBuilder, Response, StatusCode};
use url::Url;

use crate::{
    constants::USERS_TABLE,
    error::StoreError,
    models::{IdentityPatch, IdentityRecord, NewIdentityRecord},
    services::identity_store::IdentityStore,
    utils::address_key,
};

/// Identity store backed by a PostgREST-style backend (`/users?wallet_address=eq.<addr>`).
#[derive(Clone, Debug)]
pub struct PostgrestStore {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl PostgrestStore {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            base_url,
            api_key,
            client: Client::new(),
        }
    }

    fn table_url(&self) -> Result<Url, StoreError> {
        let raw = format!("{}/{}", self.base_url.trim_end_matches('/'), USERS_TABLE);
        Url::parse(&raw).map_err(|err| StoreError::Connectivity(format!("invalid backend url: {err}")))
    }

    fn row_url(&self, address: &str) -> Result<Url, StoreError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("wallet_address", &format!("eq.{}", address_key(address)));
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("apikey", key).bearer_auth(key),
            None => req,
        }
    }

    /// Rows from a `return=representation` response.
    async fn rows(resp: Response, address: &str) -> Result<Vec<IdentityRecord>, StoreError> {
        let status = resp.status();
        if status == StatusCode::CONFLICT {
            return Err(StoreError::Duplicate(address.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Connectivity(format!("backend returned {status}: {body}")));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait::async_trait]
impl IdentityStore for PostgrestStore {
    async fn get(&self, address: &str) -> Result<Option<IdentityRecord>, StoreError> {
        let req = self.authorize(self.client.get(self.row_url(address)?));
        let rows = Self::rows(req.send().await?, address).await?;
        Ok(rows.into_iter().next())
    }

    async fn create(&self, record: NewIdentityRecord) -> Result<IdentityRecord, StoreError> {
        let record = record.keyed();
        let req = self
            .authorize(self.client.post(self.table_url()?))
            .header("Prefer", "return=representation")
            .json(&record);
        Self::rows(req.send().await?, &record.wallet_address)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Connectivity("backend returned no row for insert".into()))
    }

    async fn update(
        &self,
        address: &str,
        patch: IdentityPatch,
    ) -> Result<IdentityRecord, StoreError> {
        // unset fields are left out so the backend keeps those columns
        let mut body = serde_json::Map::new();
        if let Some(username) = patch.username {
            body.insert("username".into(), username.into());
        }
        if let Some(confirmed) = patch.on_chain_confirmed {
            body.insert("updated".into(), confirmed.into());
        }
        if let Some(tx) = patch.registration_tx {
            body.insert("registration_tx".into(), tx.into());
        }
        body.insert("updated_at".into(), chrono::Utc::now().to_rfc3339().into());

        let req = self
            .authorize(self.client.patch(self.row_url(address)?))
            .header("Prefer", "return=representation")
            .json(&body);
        Self::rows(req.send().await?, address)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::RecordMissing(address.to_string()))
    }

    async fn delete(&self, address: &str) -> Result<(), StoreError> {
        let req = self
            .authorize(self.client.delete(self.row_url(address)?))
            .header("Prefer", "return=representation");
        let rows = Self::rows(req.send().await?, address).await?;
        if rows.is_empty() {
            return Err(StoreError::RecordMissing(address.to_string()));
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "rest"
    }
}

//! HTTP client for the Tote document server.
//!
//! Endpoints, relative to the base URL:
//!
//! | Method   | Path                                   | Primitive        |
//! |----------|----------------------------------------|------------------|
//! | `GET`    | `collections/{root}/{user}/{sub}`        | `read_all`       |
//! | `GET`    | same, with `?field=…&value=…`          | `query_by_field` |
//! | `POST`   | `collections/{root}/{user}/{sub}`        | `insert`         |
//! | `PATCH`  | `collections/{root}/{user}/{sub}/{id}`   | `update_by_id`   |
//! | `DELETE` | `collections/{root}/{user}/{sub}/{id}`   | `delete_by_id`   |
//!
//! `value` is the JSON encoding of the value to match.

use crate::{
    document::Fields,
    error::{Error, Result},
    CollectionPath, Document, DocumentStore,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for insert and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldsBody {
    pub fields: Fields,
}

/// Query string of a collection read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// JSON-encoded value to compare against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// [`DocumentStore`] backed by the Tote server's REST API.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Backend(format!("invalid base url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Backend(format!("{base_url} cannot be a base url")));
        }

        Ok(Self {
            client: Client::new(),
            base_url,
            token: None,
        })
    }

    /// Send `token` as a bearer credential on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn collection_url(&self, path: &CollectionPath, document_id: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::Backend(format!("{} cannot be a base url", self.base_url)))?;
            segments
                .pop_if_empty()
                .push("collections")
                .push(&path.root)
                .push(&path.user_id)
                .push(&path.subcollection);
            if let Some(id) = document_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Backend(format!("server responded {status}: {body}")))
    }

    async fn fetch(&self, path: &CollectionPath, query: &FieldQuery) -> Result<Vec<Document>> {
        let url = self.collection_url(path, None)?;
        let response = Self::send(self.request(Method::GET, url).query(query)).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn query_by_field(
        &self,
        path: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        let query = FieldQuery {
            field: Some(field.to_string()),
            value: Some(serde_json::to_string(value)?),
        };
        self.fetch(path, &query).await
    }

    async fn insert(&self, path: &CollectionPath, fields: Fields) -> Result<Document> {
        let url = self.collection_url(path, None)?;
        let response =
            Self::send(self.request(Method::POST, url).json(&FieldsBody { fields })).await?;
        Ok(response.json().await?)
    }

    async fn update_by_id(&self, path: &CollectionPath, id: &str, fields: Fields) -> Result<()> {
        let url = self.collection_url(path, Some(id))?;
        Self::send(self.request(Method::PATCH, url).json(&FieldsBody { fields })).await?;
        Ok(())
    }

    async fn delete_by_id(&self, path: &CollectionPath, id: &str) -> Result<()> {
        let url = self.collection_url(path, Some(id))?;
        Self::send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn read_all(&self, path: &CollectionPath) -> Result<Vec<Document>> {
        self.fetch(path, &FieldQuery::default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> CollectionPath {
        CollectionPath::new("ecom users", "u/1", "cart")
    }

    #[test]
    fn collection_url_encodes_segments() {
        let store = HttpDocumentStore::new("http://localhost:3000").unwrap();
        let url = store.collection_url(&path(), None).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/collections/ecom%20users/u%2F1/cart"
        );
    }

    #[test]
    fn collection_url_keeps_base_prefix() {
        let store = HttpDocumentStore::new("https://api.example.com/tote/").unwrap();
        let url = store.collection_url(&path(), Some("doc-1")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/tote/collections/ecom%20users/u%2F1/cart/doc-1"
        );
    }

    #[test]
    fn rejects_bad_base_urls() {
        assert!(HttpDocumentStore::new("not a url").is_err());
        assert!(HttpDocumentStore::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn field_query_encoding() {
        let query = FieldQuery {
            field: Some("id".into()),
            value: Some(serde_json::to_string(&Value::from("A")).unwrap()),
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["value"], "\"A\"");

        let empty = serde_json::to_string(&FieldQuery::default()).unwrap();
        assert_eq!(empty, "{}");
    }
}

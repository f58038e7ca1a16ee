//! Appwrite Databases REST client
//!
//! API flow:
//! 1. List: `GET /databases/{db}/collections/{col}/documents?queries[]=...`
//! 2. Create: `POST .../documents` with `{"documentId": "unique()", "data": {...}}`
//! 3. Update: `PATCH .../documents/{id}` with `{"data": {...}}`
//! 4. Delete: `DELETE .../documents/{id}`
//!
//! Queries use Appwrite's JSON query syntax, one `queries[]` parameter each.

use crate::{
    error::{AppError, AppResult},
    models::{MovieId, NewWatchlistEntry, SearchTrendRecord, TrendDocument, WatchlistDocument},
    services::store::{TrendStore, WatchlistStore},
};
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

const UNIQUE_ID: &str = "unique()";

/// One Appwrite query clause
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Equal(String, Value),
    OrderDesc(String),
    Limit(u32),
}

impl Query {
    pub fn equal(attribute: &str, value: impl Into<Value>) -> Self {
        Query::Equal(attribute.to_string(), value.into())
    }

    pub fn order_desc(attribute: &str) -> Self {
        Query::OrderDesc(attribute.to_string())
    }

    /// JSON form sent as a `queries[]` parameter
    pub fn to_json(&self) -> String {
        let value = match self {
            Query::Equal(attribute, value) => json!({
                "method": "equal",
                "attribute": attribute,
                "values": [value],
            }),
            Query::OrderDesc(attribute) => json!({
                "method": "orderDesc",
                "attribute": attribute,
            }),
            Query::Limit(limit) => json!({
                "method": "limit",
                "values": [limit],
            }),
        };
        value.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct DocumentList<T> {
    documents: Vec<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDocument<'a, D> {
    document_id: &'a str,
    data: &'a D,
}

#[derive(Debug, Serialize)]
struct UpdateDocument<'a, D> {
    data: &'a D,
}

/// Generic document CRUD against one Appwrite database
#[derive(Clone)]
pub struct AppwriteClient {
    http_client: HttpClient,
    endpoint: String,
    project_id: String,
    database_id: String,
    api_key: Option<String>,
}

impl AppwriteClient {
    pub fn new(
        endpoint: String,
        project_id: String,
        database_id: String,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id,
            database_id,
            api_key,
        }
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.endpoint, self.database_id, collection
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .http_client
            .request(method, url)
            .header("X-Appwrite-Project", &self.project_id);
        match &self.api_key {
            Some(key) => builder.header("X-Appwrite-Key", key),
            None => builder,
        }
    }

    /// Maps non-success responses to [`AppError::Store`], preferring
    /// Appwrite's own `message` field
    async fn check(response: Response) -> AppResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);

        Err(AppError::Store(format!(
            "Appwrite returned status {}: {}",
            status, message
        )))
    }

    pub async fn list_documents<T: DeserializeOwned>(
        &self,
        collection: &str,
        queries: &[Query],
    ) -> AppResult<Vec<T>> {
        let params: Vec<(&str, String)> = queries.iter().map(|q| ("queries[]", q.to_json())).collect();

        let response = self
            .request(Method::GET, &self.documents_url(collection))
            .query(&params)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let list: DocumentList<T> = response.json().await.map_err(|e| {
            AppError::MalformedResponse(format!("Failed to parse Appwrite document list: {}", e))
        })?;

        tracing::debug!(
            collection = %collection,
            documents = list.documents.len(),
            "Appwrite documents listed"
        );

        Ok(list.documents)
    }

    pub async fn create_document<T: DeserializeOwned, D: Serialize + Sync>(
        &self,
        collection: &str,
        data: &D,
    ) -> AppResult<T> {
        let response = self
            .request(Method::POST, &self.documents_url(collection))
            .json(&CreateDocument {
                document_id: UNIQUE_ID,
                data,
            })
            .send()
            .await?;
        let response = Self::check(response).await?;

        response.json().await.map_err(|e| {
            AppError::MalformedResponse(format!("Failed to parse created Appwrite document: {}", e))
        })
    }

    pub async fn update_document<D: Serialize + Sync>(
        &self,
        collection: &str,
        id: &str,
        data: &D,
    ) -> AppResult<()> {
        let url = format!("{}/{}", self.documents_url(collection), id);
        let response = self
            .request(Method::PATCH, &url)
            .json(&UpdateDocument { data })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn delete_document(&self, collection: &str, id: &str) -> AppResult<()> {
        let url = format!("{}/{}", self.documents_url(collection), id);
        let response = self.request(Method::DELETE, &url).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Trend and watchlist collections on top of [`AppwriteClient`]
#[derive(Clone)]
pub struct AppwriteStore {
    client: AppwriteClient,
    trends_collection: String,
    watchlist_collection: String,
}

impl AppwriteStore {
    pub fn new(client: AppwriteClient, trends_collection: String, watchlist_collection: String) -> Self {
        Self {
            client,
            trends_collection,
            watchlist_collection,
        }
    }
}

#[async_trait::async_trait]
impl TrendStore for AppwriteStore {
    async fn find_trend(&self, term: &str) -> AppResult<Option<SearchTrendRecord>> {
        let docs: Vec<TrendDocument> = self
            .client
            .list_documents(
                &self.trends_collection,
                &[Query::equal("searchTerm", term), Query::Limit(1)],
            )
            .await?;
        Ok(docs.into_iter().next().map(SearchTrendRecord::from))
    }

    async fn create_trend(&self, trend: TrendDocument) -> AppResult<SearchTrendRecord> {
        let doc: TrendDocument = self
            .client
            .create_document(&self.trends_collection, &trend)
            .await?;
        Ok(doc.into())
    }

    async fn update_trend_count(&self, id: &str, count: u64) -> AppResult<()> {
        self.client
            .update_document(&self.trends_collection, id, &json!({ "count": count }))
            .await
    }

    async fn top_trends(&self, limit: u32) -> AppResult<Vec<SearchTrendRecord>> {
        let docs: Vec<TrendDocument> = self
            .client
            .list_documents(
                &self.trends_collection,
                &[Query::Limit(limit), Query::order_desc("count")],
            )
            .await?;
        Ok(docs.into_iter().map(SearchTrendRecord::from).collect())
    }
}

#[async_trait::async_trait]
impl WatchlistStore for AppwriteStore {
    async fn list_entries(&self, session_id: &str) -> AppResult<Vec<WatchlistDocument>> {
        self.client
            .list_documents(
                &self.watchlist_collection,
                &[Query::equal("user_id", session_id)],
            )
            .await
    }

    async fn find_entry(
        &self,
        session_id: &str,
        movie_id: MovieId,
    ) -> AppResult<Option<WatchlistDocument>> {
        let docs: Vec<WatchlistDocument> = self
            .client
            .list_documents(
                &self.watchlist_collection,
                &[
                    Query::equal("user_id", session_id),
                    Query::equal("movie_id", movie_id),
                    Query::Limit(1),
                ],
            )
            .await?;
        Ok(docs.into_iter().next())
    }

    async fn create_entry(&self, entry: NewWatchlistEntry) -> AppResult<WatchlistDocument> {
        let doc: WatchlistDocument = self
            .client
            .create_document(&self.watchlist_collection, &entry)
            .await?;

        tracing::info!(
            record_id = %doc.id,
            movie_id = doc.movie_id,
            "Watchlist entry created"
        );

        Ok(doc)
    }

    async fn delete_entry(&self, record_id: &str) -> AppResult<()> {
        self.client
            .delete_document(&self.watchlist_collection, record_id)
            .await?;

        tracing::info!(record_id = %record_id, "Watchlist entry deleted");

        Ok(())
    }
}

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::{ApiError, ApiResult, CatalogApi, CollectionApi};
use crate::core::models::{BookPage, BookUpdate, CatalogHit, NewBook, PageQuery};

/// Message used when a 409 arrives without an `error` body.
const DEFAULT_CONFLICT_MESSAGE: &str = "Book already exists in your library";

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct CreatedBody {
    #[serde(default)]
    id: Option<i64>,
}

#[derive(Deserialize)]
struct SearchBody {
    #[serde(default)]
    docs: Vec<CatalogHit>,
}

#[derive(Deserialize)]
struct WorkBody {
    #[serde(default)]
    description: Option<Description>,
}

/// Work descriptions come either as a bare string or as `{ "type": ..., "value": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Description {
    Text(String),
    Typed { value: String },
}

impl Description {
    fn into_text(self) -> String {
        match self {
            Description::Text(text) | Description::Typed { value: text } => text,
        }
    }
}

/// HTTP client for the collection backend and the public catalog.
pub struct HttpApi {
    client: Client,
    api_base: Url,
    catalog_base: Url,
}

impl HttpApi {
    pub fn new(api_base: &str, catalog_base: &str) -> ApiResult<Self> {
        Ok(Self {
            client: Client::new(),
            api_base: Url::parse(api_base)?,
            catalog_base: Url::parse(catalog_base)?,
        })
    }

    fn api_url(&self, segments: &[&str]) -> ApiResult<Url> {
        endpoint(&self.api_base, segments)
    }

    fn books_url(&self, id: i64) -> ApiResult<Url> {
        let id = id.to_string();
        self.api_url(&["api", "books", &id])
    }
}

/// Append path segments to a base URL, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Map non-2xx responses onto [`ApiError`].
async fn check(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .map(|b| b.error);

    log::debug!("Request failed with status {code}: {message:?}");

    Err(match (code, message) {
        (409, message) => {
            ApiError::Conflict(message.unwrap_or_else(|| DEFAULT_CONFLICT_MESSAGE.to_string()))
        }
        (_, Some(message)) => ApiError::rejected(code, message),
        (_, None) => ApiError::Status(code),
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl CollectionApi for HttpApi {
    async fn list_books(&self, query: &PageQuery) -> ApiResult<BookPage> {
        let url = self.api_url(&["api", "books"])?;
        log::debug!("GET {url} offset={} limit={}", query.offset, query.limit);

        let response = self.client.get(url).query(&query.params()).send().await?;
        decode(check(response).await?).await
    }

    #[instrument(skip(self))]
    async fn create_book(&self, book: &NewBook) -> ApiResult<Option<i64>> {
        let url = self.api_url(&["api", "books"])?;
        let response = self.client.post(url).json(book).send().await?;
        let response = check(response).await?;

        // A success without a parseable body still counts as created.
        let body = response.bytes().await?;
        Ok(serde_json::from_slice::<CreatedBody>(&body)
            .ok()
            .and_then(|b| b.id))
    }

    #[instrument(skip(self))]
    async fn update_book(&self, id: i64, update: &BookUpdate) -> ApiResult<()> {
        let url = self.books_url(id)?;
        let response = self.client.put(url).json(update).send().await?;
        check(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_book(&self, id: i64) -> ApiResult<()> {
        let url = self.books_url(id)?;
        let response = self.client.delete(url).send().await?;
        check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for HttpApi {
    async fn search(&self, query: &str) -> ApiResult<Vec<CatalogHit>> {
        let url = self.api_url(&["api", "search"])?;
        let response = self.client.get(url).query(&[("q", query)]).send().await?;
        let body: SearchBody = decode(check(response).await?).await?;
        Ok(body.docs)
    }

    #[instrument(skip(self))]
    async fn summary(&self, key: &str) -> ApiResult<Option<String>> {
        // "/works/OL45804W" -> "OL45804W"
        let work_id = key.trim_end_matches('/').rsplit('/').next().unwrap_or(key);
        let file = format!("{work_id}.json");
        let url = endpoint(&self.catalog_base, &["works", &file])?;

        let response = self.client.get(url).send().await?;
        let body: WorkBody = decode(check(response).await?).await?;
        Ok(body
            .description
            .map(Description::into_text)
            .filter(|text| !text.trim().is_empty()))
    }
}

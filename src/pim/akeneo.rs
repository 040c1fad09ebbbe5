//! Akeneo PIM REST API client for reference entities.
//!
//! See: <https://api.akeneo.com/api-reference-index.html>

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::auth::{TokenCache, TokenRequest, TokenResponse};
use super::{MediaFileApi, RecordStream, ReferenceEntityApi};
use crate::types::{Attribute, Record};
use crate::{HuginnError, Result};

/// Largest record list the API accepts in one PATCH.
pub const MAX_UPSERT_BATCH: usize = 100;

/// Everything but RFC 3986 unreserved characters is escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// API user credentials.
#[derive(Clone)]
pub struct AkeneoCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AkeneoCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AkeneoCredentials")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Client for the Akeneo reference entity API.
///
/// Implements both [`ReferenceEntityApi`] and [`MediaFileApi`].
pub struct AkeneoClient {
    http: Client,
    base_url: String,
    credentials: AkeneoCredentials,
    token: TokenCache,
}

impl fmt::Debug for AkeneoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AkeneoClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl AkeneoClient {
    /// Create a client for the PIM at `base_url` (e.g. `https://pim.example.com`).
    pub fn new(base_url: impl Into<String>, credentials: AkeneoCredentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| HuginnError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            token: TokenCache::default(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn records_url(&self, entity: &str) -> String {
        self.url(&format!(
            "/api/rest/v1/reference-entities/{}/records",
            encode_path(entity)
        ))
    }

    async fn request_token(&self) -> Result<TokenResponse> {
        let response = self
            .http
            .post(self.url("/api/oauth/v1/token"))
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .json(&TokenRequest {
                grant_type: "password",
                username: &self.credentials.username,
                password: &self.credentials.password,
            })
            .send()
            .await?;

        match response.status().as_u16() {
            400 | 401 | 422 => Err(HuginnError::AuthenticationFailed),
            _ => Ok(check_status(response, "oauth token").await?.json().await?),
        }
    }

    /// Attach a bearer token to `request`.
    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.token.bearer(|| self.request_token()).await?;
        Ok(request.bearer_auth(token))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.authorized(self.http.get(url)).await?.send().await?;
        Ok(check_status(response, url).await?.json().await?)
    }

    /// Fetch pages until a record is buffered or the collection is exhausted.
    async fn next_record(&self, mut cursor: PageCursor) -> Result<Option<(Record, PageCursor)>> {
        loop {
            if let Some(record) = cursor.buffered.pop_front() {
                return Ok(Some((record, cursor)));
            }
            let Some(url) = cursor.next.take() else {
                return Ok(None);
            };

            debug!(%url, "fetching record page");
            let page: RecordPage = self.get_json(&url).await?;
            cursor.next = page.links.next.map(|link| link.href);
            cursor.buffered.extend(page.embedded.items);
        }
    }

    async fn patch_records(&self, entity: &str, records: &[Record]) -> Result<()> {
        let url = self.records_url(entity);
        let response = self
            .authorized(self.http.patch(&url))
            .await?
            .json(records)
            .send()
            .await?;
        let body = check_status(response, &url).await?.text().await?;

        if body.trim().is_empty() {
            return Ok(());
        }
        match serde_json::from_str::<Vec<UpsertLine>>(&body) {
            Ok(lines) => {
                for line in lines.iter().filter(|l| l.status_code >= 400) {
                    warn!(
                        entity,
                        record = %line.code,
                        status = line.status_code,
                        message = line.message.as_deref().unwrap_or(""),
                        "record rejected by PIM"
                    );
                }
            }
            Err(e) => debug!(entity, error = %e, "unrecognised upsert response body"),
        }
        Ok(())
    }
}

/// Percent-encode each `/`-separated segment of `code`, keeping the separators.
fn encode_path(code: &str) -> String {
    code.split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Map non-2xx responses to errors, keeping the body as the message.
async fn check_status(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 => Err(HuginnError::AuthenticationFailed),
        404 => Err(HuginnError::NotFound(context.to_string())),
        code => Err(HuginnError::Api {
            status: code,
            message: if body.is_empty() {
                format!("{context}: {status}")
            } else {
                format!("{context}: {body}")
            },
        }),
    }
}

struct PageCursor {
    buffered: VecDeque<Record>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct RecordPage {
    #[serde(rename = "_links", default)]
    links: PageLinks,
    #[serde(rename = "_embedded", default)]
    embedded: EmbeddedRecords,
}

#[derive(Default, Deserialize)]
struct PageLinks {
    #[serde(default)]
    next: Option<Link>,
}

#[derive(Deserialize)]
struct Link {
    href: String,
}

#[derive(Default, Deserialize)]
struct EmbeddedRecords {
    #[serde(default)]
    items: Vec<Record>,
}

#[derive(Deserialize)]
struct UpsertLine {
    code: String,
    status_code: u16,
    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
impl ReferenceEntityApi for AkeneoClient {
    #[instrument(skip(self))]
    async fn list_attributes(&self, entity: &str) -> Result<Vec<Attribute>> {
        let url = self.url(&format!(
            "/api/rest/v1/reference-entities/{}/attributes",
            encode_path(entity)
        ));
        self.get_json(&url).await
    }

    fn list_records<'a>(&'a self, entity: &'a str) -> RecordStream<'a> {
        let cursor = PageCursor {
            buffered: VecDeque::new(),
            next: Some(self.records_url(entity)),
        };
        Box::pin(stream::try_unfold(cursor, move |cursor| {
            self.next_record(cursor)
        }))
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert_records(&self, entity: &str, records: &[Record]) -> Result<()> {
        for chunk in records.chunks(MAX_UPSERT_BATCH) {
            self.patch_records(entity, chunk).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MediaFileApi for AkeneoClient {
    #[instrument(skip(self))]
    async fn download(&self, code: &str) -> Result<Vec<u8>> {
        let url = self.url(&format!(
            "/api/rest/v1/reference-entities-media-files/{}",
            encode_path(code)
        ));
        let response = self.authorized(self.http.get(&url)).await?.send().await?;
        let bytes = check_status(response, &url).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> AkeneoCredentials {
        AkeneoCredentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn debug_hides_secrets() {
        let printed = format!("{:?}", credentials());
        assert!(printed.contains("admin"));
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("secret\""));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = AkeneoClient::new("https://pim.example.com/", credentials()).unwrap();
        assert_eq!(
            client.records_url("designers"),
            "https://pim.example.com/api/rest/v1/reference-entities/designers/records"
        );
    }

    #[test]
    fn path_segments_are_encoded_but_slashes_kept() {
        assert_eq!(encode_path("1/2/3/abc_photo.jpg"), "1/2/3/abc_photo.jpg");
        assert_eq!(encode_path("a b/c?d#e%f"), "a%20b/c%3Fd%23e%25f");
        assert_eq!(encode_path("caf\u{e9}~x-y"), "caf%C3%A9~x-y");
    }

    #[test]
    fn entity_code_is_encoded_in_records_url() {
        let client = AkeneoClient::new("https://pim.example.com", credentials()).unwrap();
        assert_eq!(
            client.records_url("odd?code"),
            "https://pim.example.com/api/rest/v1/reference-entities/odd%3Fcode/records"
        );
    }

    #[test]
    fn record_page_parses_without_next_link() {
        let page: RecordPage = serde_json::from_value(serde_json::json!({
            "_links": {"self": {"href": "https://pim/records"}},
            "_embedded": {"items": [{"code": "a", "values": {}, "_links": {}}]}
        }))
        .unwrap();
        assert!(page.links.next.is_none());
        assert_eq!(page.embedded.items.len(), 1);
    }
}

//! CivitAI REST client and the slices of its responses we consume.
//!
//! Only `modelVersions[0].files[0]` is ever consulted for downloads.

use std::collections::HashSet;
use std::time::Duration;

use comfypod_config::CivitaiSettings;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::naming::sanitize_file_name;
use crate::store::PendingAsset;

/// Queries combined by [`CivitaiClient::popular`].
pub const POPULAR_QUERIES: [&str; 5] = ["instagram", "portrait", "realistic", "photography", "woman"];
/// Hits requested per popular query.
pub const POPULAR_PER_QUERY: u32 = 5;
/// Size of the combined popular list.
pub const POPULAR_LIMIT: usize = 15;

/// Resolved lookup result for one identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    /// Requested identifier.
    pub id: String,
    /// Where to fetch the weights; absent is a valid outcome.
    pub download_url: Option<String>,
    /// Sanitised destination file name.
    pub file_name: String,
    /// Model display name.
    pub model_name: Option<String>,
    /// Model description (HTML as served).
    pub description: Option<String>,
    /// Model tags.
    pub tags: Vec<String>,
    /// Identifier of the consulted version.
    pub version_id: Option<u64>,
    /// Trigger words of the consulted version.
    pub trained_words: Vec<String>,
    /// Base model of the consulted version.
    pub base_model: Option<String>,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    /// Model identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Average rating, when reported.
    pub rating: Option<f64>,
    /// Download count, when reported.
    pub download_count: Option<u64>,
    /// Model tags.
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelResponse {
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    tags: Vec<Value>,
    #[serde(default)]
    model_versions: Vec<ModelVersion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelVersion {
    id: Option<u64>,
    base_model: Option<String>,
    #[serde(default)]
    trained_words: Vec<String>,
    #[serde(default)]
    files: Vec<ModelFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelFile {
    download_url: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: u64,
    name: String,
    #[serde(default)]
    tags: Vec<Value>,
    stats: Option<SearchStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchStats {
    rating: Option<f64>,
    download_count: Option<u64>,
}

// Tags arrive either as strings or as `{ "name": ... }` objects.
fn string_tags(tags: Vec<Value>) -> Vec<String> {
    tags.into_iter()
        .filter_map(|tag| match tag {
            Value::String(tag) => Some(tag),
            Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

impl ModelResponse {
    fn into_record(self, id: &str) -> AssetRecord {
        let mut versions = self.model_versions.into_iter();
        let version = versions.next();
        let (version_id, base_model, trained_words, file) = match version {
            Some(version) => (
                version.id,
                version.base_model,
                version.trained_words,
                version.files.into_iter().next(),
            ),
            None => (None, None, Vec::new(), None),
        };
        let (download_url, name) = file.map_or((None, None), |file| (file.download_url, file.name));

        AssetRecord {
            id: id.to_string(),
            download_url: download_url.filter(|url| !url.trim().is_empty()),
            file_name: sanitize_file_name(name.as_deref()),
            model_name: self.name,
            description: self.description,
            tags: string_tags(self.tags),
            version_id,
            trained_words,
            base_model,
        }
    }
}

/// Thin client over the CivitAI v1 API.
#[derive(Debug, Clone)]
pub struct CivitaiClient {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl CivitaiClient {
    /// Client rooted at `base_url` (which should end with `/`).
    ///
    /// `timeout` bounds connection setup, every metadata request, and each
    /// individual read. Weight downloads have no overall deadline, but a
    /// stalled transfer fails once no bytes arrive for `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(base_url: Url, timeout: Duration) -> FetchResult<Self> {
        let http = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .user_agent(concat!("comfypod/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| FetchError::http("client.build", &base_url, err))?;
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    /// Client built from pod configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn from_settings(settings: &CivitaiSettings) -> FetchResult<Self> {
        Self::new(
            settings.api_url.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    /// `GET models/{id}` and extract the first version's first file.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-success statuses, or
    /// undecodable bodies.
    pub async fn lookup(&self, id: &str, credential: &str) -> FetchResult<AssetRecord> {
        let url = self.endpoint(&["models", id])?;
        debug!(%url, "looking up model");
        let request = self.http.get(url.clone()).timeout(self.timeout);
        let response = send(bearer(request, Some(credential)), "civitai.lookup", &url).await?;
        let model = response
            .json::<ModelResponse>()
            .await
            .map_err(|err| FetchError::http("civitai.lookup.decode", &url, err))?;
        Ok(model.into_record(id))
    }

    /// Search LoRA models by free text, best rated this month first.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-success statuses, or
    /// undecodable bodies.
    pub async fn search(
        &self,
        query: &str,
        limit: u32,
        credential: Option<&str>,
    ) -> FetchResult<Vec<ModelSummary>> {
        let url = self.endpoint(&["models"])?;
        let limit = limit.to_string();
        let request = self
            .http
            .get(url.clone())
            .timeout(self.timeout)
            .query(&[
                ("limit", limit.as_str()),
                ("query", query),
                ("types", "LORA"),
                ("sort", "Highest Rated"),
                ("period", "Month"),
            ]);
        let response = send(bearer(request, credential), "civitai.search", &url).await?;
        let body = response
            .json::<SearchResponse>()
            .await
            .map_err(|err| FetchError::http("civitai.search.decode", &url, err))?;
        Ok(body
            .items
            .into_iter()
            .map(|item| ModelSummary {
                id: item.id,
                name: item.name,
                rating: item.stats.as_ref().and_then(|stats| stats.rating),
                download_count: item.stats.as_ref().and_then(|stats| stats.download_count),
                tags: string_tags(item.tags),
            })
            .collect())
    }

    /// Best rated portrait-style LoRAs across [`POPULAR_QUERIES`].
    ///
    /// Each query is searched in turn; repeated models keep their first
    /// appearance. The result is ordered by rating, highest first, with an
    /// unrated model counting as zero, and capped at [`POPULAR_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns the first search failure.
    pub async fn popular(&self, credential: Option<&str>) -> FetchResult<Vec<ModelSummary>> {
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for query in POPULAR_QUERIES {
            let hits = self.search(query, POPULAR_PER_QUERY, credential).await?;
            debug!(query, hits = hits.len(), "popular query answered");
            merged.extend(hits.into_iter().filter(|hit| seen.insert(hit.id)));
        }
        Ok(rank_popular(merged))
    }

    /// Stream `download_url` into `pending`; returns the byte count.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-success statuses, or
    /// write failures. `pending` is left uncommitted.
    pub async fn download(
        &self,
        download_url: &str,
        credential: &str,
        pending: &mut PendingAsset,
    ) -> FetchResult<u64> {
        let url = Url::parse(download_url).map_err(|_| FetchError::InvalidUrl {
            operation: "civitai.download",
            value: download_url.to_string(),
        })?;
        let request = self.http.get(url.clone());
        let response = send(bearer(request, Some(credential)), "civitai.download", &url).await?;

        let mut stream = response.bytes_stream();
        let mut written = 0_u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| FetchError::http("civitai.download.body", &url, err))?;
            pending.write_chunk(&chunk)?;
            written += chunk.len() as u64;
        }
        Ok(written)
    }

    fn endpoint(&self, segments: &[&str]) -> FetchResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidUrl {
                operation: "civitai.endpoint",
                value: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn rank_popular(mut hits: Vec<ModelSummary>) -> Vec<ModelSummary> {
    hits.sort_by(|a, b| {
        let rating = |hit: &ModelSummary| hit.rating.unwrap_or(0.0);
        rating(b).total_cmp(&rating(a))
    });
    hits.truncate(POPULAR_LIMIT);
    hits
}

fn bearer(request: RequestBuilder, credential: Option<&str>) -> RequestBuilder {
    match credential.map(str::trim).filter(|token| !token.is_empty()) {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

async fn send(
    request: RequestBuilder,
    operation: &'static str,
    url: &Url,
) -> FetchResult<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|err| FetchError::http(operation, url, err))?;
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(FetchError::HttpStatus {
            operation,
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use comfypod_test_support::civitai::{
        model_body, model_without_versions, rated_search_body, search_body,
    };
    use comfypod_test_support::fixtures::scratch_dir;
    use crate::store::AssetStore;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> Result<CivitaiClient> {
        let base = Url::parse(&format!("{}/api/v1/", server.base_url()))?;
        Ok(CivitaiClient::new(base, Duration::from_secs(5))?)
    }

    #[tokio::test]
    async fn lookup_reads_first_version_first_file() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/models/123")
                .header("authorization", "Bearer token-1");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(model_body(
                    123,
                    Some("https://cdn.example/123"),
                    Some("Portrait Style.safetensors"),
                ));
        });

        let record = client(&server)?.lookup("123", "token-1").await?;
        mock.assert();
        assert_eq!(record.id, "123");
        assert_eq!(record.download_url.as_deref(), Some("https://cdn.example/123"));
        assert_eq!(record.file_name, "PortraitStyle.safetensors");
        assert_eq!(record.model_name.as_deref(), Some("model-123"));
        assert_eq!(record.version_id, Some(1230));
        assert_eq!(record.trained_words, vec!["ohwx", "portrait"]);
        assert_eq!(record.base_model.as_deref(), Some("Flux.1 D"));
        assert_eq!(record.tags, vec!["portrait", "photography"]);
        Ok(())
    }

    #[tokio::test]
    async fn lookup_defaults_name_and_tolerates_missing_versions() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/models/1");
            then.status(200)
                .json_body(model_body(1, Some("https://cdn.example/1"), None));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/models/2");
            then.status(200).json_body(model_without_versions(2));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/models/3");
            then.status(200)
                .json_body(json!({"modelVersions": [{"files": [{"downloadUrl": ""}]}]}));
        });

        let client = client(&server)?;
        let first = client.lookup("1", "t").await?;
        assert_eq!(first.file_name, "model.safetensors");

        let second = client.lookup("2", "t").await?;
        assert_eq!(second.download_url, None);
        assert_eq!(second.file_name, "model.safetensors");

        let third = client.lookup("3", "t").await?;
        assert_eq!(third.download_url, None);
        Ok(())
    }

    #[tokio::test]
    async fn lookup_surfaces_status_errors() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/models/404");
            then.status(404).body("not found");
        });

        let err = client(&server)?
            .lookup("404", "t")
            .await
            .expect_err("404 should fail");
        assert!(matches!(
            err,
            FetchError::HttpStatus { status: 404, operation: "civitai.lookup", .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn search_sends_filters_and_maps_items() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/models")
                .query_param("query", "portrait")
                .query_param("limit", "2")
                .query_param("types", "LORA")
                .query_param("sort", "Highest Rated")
                .query_param("period", "Month");
            then.status(200)
                .json_body(search_body(&[(11, "Soft Light"), (12, "Film Grain")]));
        });

        let hits = client(&server)?.search("portrait", 2, None).await?;
        mock.assert();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 11);
        assert_eq!(hits[1].name, "Film Grain");
        assert_eq!(hits[0].rating, Some(4.5));
        assert_eq!(hits[0].download_count, Some(1200));
        assert_eq!(hits[0].tags, vec!["portrait"]);
        Ok(())
    }

    #[tokio::test]
    async fn popular_merges_queries_by_rating() -> Result<()> {
        let server = MockServer::start_async().await;
        let answers: [(&str, Vec<(u64, &str, Option<f64>)>); 5] = [
            ("instagram", vec![(1, "Feed", Some(4.1)), (2, "Story", None)]),
            ("portrait", vec![(3, "Soft Light", Some(4.9)), (1, "Feed again", Some(5.0))]),
            ("realistic", vec![(4, "Skin", Some(4.5))]),
            ("photography", vec![(5, "Lens", Some(3.0))]),
            ("woman", vec![]),
        ];
        let mut mocks = Vec::new();
        for (query, items) in answers {
            mocks.push(server.mock(move |when, then| {
                when.method(GET)
                    .path("/api/v1/models")
                    .query_param("query", query)
                    .query_param("limit", "5");
                then.status(200).json_body(rated_search_body(&items));
            }));
        }

        let hits = client(&server)?.popular(None).await?;
        for mock in &mocks {
            mock.assert();
        }
        let ids: Vec<u64> = hits.iter().map(|hit| hit.id).collect();
        assert_eq!(ids, [3, 4, 1, 5, 2]);
        assert_eq!(hits[2].name, "Feed");
        Ok(())
    }

    #[test]
    fn popular_ranking_keeps_the_best_fifteen() {
        let hits: Vec<ModelSummary> = (1..=20_u32)
            .map(|id| ModelSummary {
                id: u64::from(id),
                name: format!("m{id}"),
                rating: Some(f64::from(id) / 10.0),
                download_count: None,
                tags: Vec::new(),
            })
            .collect();
        let ranked = rank_popular(hits);
        assert_eq!(ranked.len(), POPULAR_LIMIT);
        assert_eq!(ranked[0].id, 20);
        assert_eq!(ranked[14].id, 6);
    }

    #[tokio::test]
    async fn stalled_download_times_out() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/files/slow");
            then.status(200)
                .delay(Duration::from_secs(3))
                .body("late");
        });
        let dir = scratch_dir("comfypod-civitai-")?;
        let store = AssetStore::new(dir.path());
        let base = Url::parse(&format!("{}/api/v1/", server.base_url()))?;
        let client = CivitaiClient::new(base, Duration::from_millis(300))?;

        let mut pending = store.begin("slow.safetensors")?;
        let err = client
            .download(&server.url("/files/slow"), "t", &mut pending)
            .await
            .expect_err("stalled transfer must fail");
        assert!(matches!(err, FetchError::Http { .. }));
        Ok(())
    }

    #[test]
    fn string_tags_accepts_strings_and_named_objects() {
        let tags = string_tags(vec![json!("a"), json!({"name": "b"}), json!(3)]);
        assert_eq!(tags, vec!["a", "b"]);
    }
}

//! Google Photos shared-album client
//!
//! There is no API for shared albums, so this scrapes what the web client
//! sees. The share page embeds its first page of items in an
//! `AF_initDataCallback` block; later pages come from the same RPC endpoint
//! the web client uses when scrolling.

use std::time::Duration;

use async_trait::async_trait;
use regex_lite::Regex;
use reqwest::{Client, Url};
use serde_json::Value;

use super::AlbumSource;
use crate::error::{Error, Result};
use crate::models::CandidateUrl;

/// RPC endpoint used by the web client to page through an album
const BATCH_EXECUTE_URL: &str = "https://photos.google.com/_/PhotosUi/data/batchexecute";

/// RPC id of the "next page of album items" call
const PAGE_RPC_ID: &str = "snAcKc";

/// Hard stop for the heavy scrape
const MAX_PAGES: usize = 200;

const USER_AGENT: &str = concat!("inkalbum/", env!("CARGO_PKG_VERSION"));

/// First page of a shared album as embedded in its share page
#[derive(Debug, Clone, PartialEq, Eq)]
struct SharePage {
    album_id: Option<String>,
    auth_key: Option<String>,
    items: Vec<CandidateUrl>,
    next_token: Option<String>,
}

/// Google Photos scraper
pub struct GooglePhotosClient {
    client: Client,
    download_size: u32,
}

impl GooglePhotosClient {
    /// Create a new client.
    ///
    /// `timeout` bounds every request; `download_size` is the longest edge
    /// requested when downloading an image.
    pub fn new(timeout: Duration, download_size: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            download_size,
        })
    }

    /// Fetch and parse the share page (following short-link redirects)
    async fn share_page(&self, album: &str) -> Result<SharePage> {
        let response = self.client.get(album).send().await?.error_for_status()?;
        let final_url = response.url().clone();
        let html = response.text().await?;

        let data = initial_data(&html)?;
        let (items, next_token) = parse_page(&data);
        let (album_id, auth_key) = share_ids(&final_url);

        Ok(SharePage {
            album_id,
            auth_key,
            items,
            next_token,
        })
    }

    /// Fetch one follow-up page through the paging RPC
    async fn next_page(
        &self,
        album_id: &str,
        token: &str,
        auth_key: Option<&str>,
    ) -> Result<(Vec<CandidateUrl>, Option<String>)> {
        let args = serde_json::json!([album_id, token, Value::Null, auth_key]).to_string();
        let request = serde_json::json!([[[PAGE_RPC_ID, args, Value::Null, "generic"]]]).to_string();

        let response = self
            .client
            .post(BATCH_EXECUTE_URL)
            .form(&[("f.req", request)])
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        let payload = batch_payload(&body, PAGE_RPC_ID)?;
        Ok(parse_page(&payload))
    }

    /// URL variant that serves the full-size image instead of a thumbnail
    fn sized_url(&self, url: &str) -> String {
        if is_google_content(url) && !url.contains('=') {
            format!("{url}=w{0}-h{0}", self.download_size)
        } else {
            url.to_string()
        }
    }
}

#[async_trait]
impl AlbumSource for GooglePhotosClient {
    async fn fetch_lightweight(&self, album: &str) -> Result<Vec<CandidateUrl>> {
        Ok(self.share_page(album).await?.items)
    }

    async fn fetch_heavy(&self, album: &str) -> Result<Vec<String>> {
        let page = self.share_page(album).await?;
        let mut urls: Vec<String> = page.items.into_iter().map(|c| c.url).collect();

        let Some(album_id) = page.album_id else {
            tracing::warn!("Share page has no album id, returning first page only");
            return Ok(urls);
        };

        let mut token = page.next_token;
        let mut pages = 1;
        while let Some(t) = token.take() {
            if pages >= MAX_PAGES {
                tracing::warn!(pages, "Stopping album scrape at page limit");
                break;
            }
            let (items, next) = self
                .next_page(&album_id, &t, page.auth_key.as_deref())
                .await?;
            tracing::debug!(page = pages, items = items.len(), "Fetched album page");
            if items.is_empty() {
                break;
            }
            urls.extend(items.into_iter().map(|c| c.url));
            token = next;
            pages += 1;
        }

        Ok(urls)
    }

    async fn probe_video(&self, url: &str) -> Result<bool> {
        if !is_google_content(url) {
            return Ok(false);
        }
        let response = self.client.head(format!("{url}=dv")).send().await?;
        Ok(response.status().is_success())
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("Downloading image: {url}");
        let response = self
            .client
            .get(self.sized_url(url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn is_google_content(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.ends_with("googleusercontent.com")))
        .unwrap_or(false)
}

/// Extract the `ds:1` data block from the share page
fn initial_data(html: &str) -> Result<Value> {
    let re = Regex::new(r"(?s)AF_initDataCallback\(\{key: 'ds:1'.*?data:(.*?), sideChannel:")
        .map_err(|e| Error::Discovery(format!("bad pattern: {e}")))?;
    let raw = re
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| Error::Discovery("album data block not found in page".to_string()))?;
    serde_json::from_str(raw.as_str())
        .map_err(|e| Error::Discovery(format!("album data block is not JSON: {e}")))
}

/// Items and next-page token from a page payload.
///
/// Layout: `[_, [[id, [url, width, height, ..], ..], ..], next_token, ..]`
fn parse_page(data: &Value) -> (Vec<CandidateUrl>, Option<String>) {
    let items = data
        .get(1)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_item).collect())
        .unwrap_or_default();
    let next_token = data
        .get(2)
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(String::from);
    (items, next_token)
}

fn parse_item(item: &Value) -> Option<CandidateUrl> {
    let media = item.get(1)?;
    let url = media.get(0)?.as_str()?;
    let dim = |i: usize| {
        media
            .get(i)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    };
    Some(CandidateUrl {
        url: url.to_string(),
        width: dim(1),
        height: dim(2),
    })
}

/// Album id and auth key from the resolved share URL
/// (`https://photos.google.com/share/<id>?key=<key>`)
fn share_ids(url: &Url) -> (Option<String>, Option<String>) {
    let album_id = url
        .path_segments()
        .and_then(|mut segs| {
            segs.by_ref().find(|s| *s == "share")?;
            segs.next()
        })
        .filter(|s| !s.is_empty())
        .map(String::from);
    let auth_key = url
        .query_pairs()
        .find(|(k, _)| k == "key")
        .map(|(_, v)| v.into_owned());
    (album_id, auth_key)
}

/// Find the payload of `rpc_id` in a batchexecute response.
///
/// The body starts with `)]}'` and holds length-prefixed JSON chunks; the
/// payload itself is a JSON document encoded as a string.
fn batch_payload(body: &str, rpc_id: &str) -> Result<Value> {
    for line in body.lines() {
        let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        for entry in &entries {
            if entry.get(0).and_then(Value::as_str) == Some("wrb.fr")
                && entry.get(1).and_then(Value::as_str) == Some(rpc_id)
                && let Some(payload) = entry.get(2).and_then(Value::as_str)
            {
                return serde_json::from_str(payload)
                    .map_err(|e| Error::Discovery(format!("bad page payload: {e}")));
            }
        }
    }
    Err(Error::Discovery(format!("no {rpc_id} payload in response")))
}

use std::collections::HashSet;
use std::sync::Arc;

use rentwatch_core::{ListingRef, SearchQuery};
use rentwatch_logging::watch_debug;
use serde::Deserialize;
use url::Url;

use crate::fetch::{Fetcher, HttpRequest};
use crate::settings::SearchApiSettings;
use crate::{FailureKind, FetchError};

/// Offset of the first page of every search.
pub const FIRST_OFFSET: &str = "0";

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub listings: Vec<ListingRef>,
    /// Offset of the following page; `None` on the last page.
    pub next_offset: Option<String>,
}

#[async_trait::async_trait]
pub trait SearchSource: Send + Sync {
    async fn fetch_page(&self, query: &SearchQuery, offset: &str) -> Result<SearchPage, FetchError>;
}

/// Search source backed by the site's JSON search endpoint.
pub struct ApiSearchSource {
    fetcher: Arc<dyn Fetcher>,
    endpoint: Url,
}

impl ApiSearchSource {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: &SearchApiSettings) -> Result<Self, FetchError> {
        let endpoint = Url::parse(&settings.endpoint)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        Ok(Self { fetcher, endpoint })
    }
}

#[async_trait::async_trait]
impl SearchSource for ApiSearchSource {
    async fn fetch_page(&self, query: &SearchQuery, offset: &str) -> Result<SearchPage, FetchError> {
        let url = query.page_url(&self.endpoint, offset);
        let output = self.fetcher.send(HttpRequest::get(url.as_str())).await?;
        let raw: RawSearchPage = output.json()?;
        Ok(raw.into_page())
    }
}

/// Walks every page of one source until the endpoint reports no next page.
///
/// Fails when any page fails, when an offset repeats, or when the source has
/// more than `max_pages` pages. A failed source contributes nothing.
pub async fn paginate(
    source: &dyn SearchSource,
    query: &SearchQuery,
    max_pages: usize,
) -> Result<Vec<ListingRef>, FetchError> {
    let mut listings = Vec::new();
    let mut requested = HashSet::new();
    let mut offset = FIRST_OFFSET.to_string();

    for _ in 0..max_pages {
        requested.insert(offset.clone());
        let page = source.fetch_page(query, &offset).await?;
        watch_debug!(
            "Search page offset={} listings={} next={:?} source={}",
            offset,
            page.listings.len(),
            page.next_offset,
            query.source_url()
        );
        listings.extend(page.listings);

        match page.next_offset {
            None => return Ok(listings),
            Some(next) if requested.contains(&next) => {
                return Err(FetchError::new(
                    FailureKind::Malformed,
                    format!("pagination repeated offset {next}"),
                ));
            }
            Some(next) => offset = next,
        }
    }

    Err(FetchError::new(
        FailureKind::Malformed,
        format!("pagination exceeded {max_pages} pages"),
    ))
}

#[derive(Debug, Deserialize)]
struct RawSearchPage {
    #[serde(default)]
    properties: Vec<RawListing>,
    #[serde(default)]
    pagination: RawPagination,
}

impl RawSearchPage {
    fn into_page(self) -> SearchPage {
        let next_offset = match self.pagination.next {
            Some(RawOffset::Text(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Some(RawOffset::Number(number)) => Some(number.to_string()),
            _ => None,
        };
        SearchPage {
            listings: self
                .properties
                .into_iter()
                .map(|p| ListingRef::new(p.id, p.location.latitude, p.location.longitude))
                .collect(),
            next_offset,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawPagination {
    #[serde(default)]
    next: Option<RawOffset>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOffset {
    Text(String),
    Number(u64),
}

#[derive(Debug, Deserialize)]
struct RawListing {
    #[serde(alias = "Id")]
    id: u64,
    #[serde(alias = "Location")]
    location: RawLocation,
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    #[serde(alias = "Latitude")]
    latitude: f64,
    #[serde(alias = "Longitude")]
    longitude: f64,
}

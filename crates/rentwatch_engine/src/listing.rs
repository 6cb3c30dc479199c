use std::sync::Arc;

use ego_tree::NodeRef;
use rentwatch_core::{ListingDetail, ListingId};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::decode::{decode_page, DecodeError};
use crate::fetch::{FetchSettings, Fetcher, HttpRequest};
use crate::settings::ListingSettings;
use crate::FetchError;

/// CSS selectors locating the fields of a listing page.
///
/// Every match of every description selector is appended, in selector order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSelectors {
    pub image: String,
    pub title: String,
    /// The rent is the text of the first child element of this node.
    pub rent: String,
    pub description: Vec<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            image: "._2uGNfP4v5SSYyfx3rZngKM img".to_string(),
            title: "._2uQQ3SV0eMHL1P6t5ZDo2q".to_string(),
            rent: "._1gfnqJ3Vtd1z40MlC0MzXu".to_string(),
            description: vec![
                "._21Dc_JVLfbrsoEkZYykXK5".to_string(),
                "._4hBezflLdgDMdFtURKTWh".to_string(),
                "article[data-testid=\"primary-layout\"]".to_string(),
                "._2CdMEPuAVXHxzb5evl1Rb8".to_string(),
            ],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("listing page fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("listing page has unsupported content type {0}")]
    UnsupportedContentType(String),
    #[error("listing page structure not recognized: no {missing}")]
    UnrecognizedPage { missing: &'static str },
    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
}

#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    /// Canonical page URL for a listing.
    fn listing_url(&self, listing_id: ListingId) -> String;

    async fn fetch_detail(&self, listing_id: ListingId) -> Result<ListingDetail, ScrapeError>;
}

/// Fetches the public listing page and extracts its fields with CSS selectors.
pub struct ScrapingListingSource {
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
    selectors: ListingSelectors,
    fetch: FetchSettings,
}

impl ScrapingListingSource {
    pub fn new(fetcher: Arc<dyn Fetcher>, listing: &ListingSettings, fetch: &FetchSettings) -> Self {
        Self {
            fetcher,
            base_url: listing.base_url.trim_end_matches('/').to_string(),
            selectors: listing.selectors.clone(),
            fetch: fetch.clone(),
        }
    }
}

#[async_trait::async_trait]
impl ListingSource for ScrapingListingSource {
    fn listing_url(&self, listing_id: ListingId) -> String {
        format!("{}/properties/{}", self.base_url, listing_id)
    }

    async fn fetch_detail(&self, listing_id: ListingId) -> Result<ListingDetail, ScrapeError> {
        let url = self.listing_url(listing_id);
        let output = self.fetcher.send(HttpRequest::get(url.clone())).await?;

        let content_type = output.metadata.content_type.as_deref();
        if let Some(ct) = content_type {
            if !self.fetch.is_page_type_allowed(ct) {
                return Err(ScrapeError::UnsupportedContentType(ct.to_string()));
            }
        }

        let page = decode_page(&output.bytes, content_type)?;
        extract_listing(&page.html, &url, &self.selectors)
    }
}

/// Pulls listing fields out of a decoded page.
///
/// A page without a title is treated as unrecognized (removed listings render
/// a generic landing page). Missing rent, image or description are left empty.
pub fn extract_listing(
    html: &str,
    url: &str,
    selectors: &ListingSelectors,
) -> Result<ListingDetail, ScrapeError> {
    let doc = Html::parse_document(html);

    let title = select_first(&doc, &selectors.title)?
        .map(collapsed_text)
        .filter(|t| !t.is_empty())
        .ok_or(ScrapeError::UnrecognizedPage { missing: "title" })?;

    let rent_text = select_first(&doc, &selectors.rent)?
        .and_then(first_child_element)
        .map(collapsed_text)
        .unwrap_or_default();

    let image_url = select_first(&doc, &selectors.image)?
        .and_then(|img| img.value().attr("src"))
        .map(|src| src.trim().to_string())
        .unwrap_or_default();

    let mut description = String::new();
    for css in &selectors.description {
        let selector = parse_selector(css)?;
        for section in doc.select(&selector) {
            let markdown = html2md::parse_html(&section.inner_html());
            let markdown = markdown.trim();
            if markdown.is_empty() {
                continue;
            }
            if !description.is_empty() {
                description.push_str("\n\n");
            }
            description.push_str(markdown);
        }
    }

    Ok(ListingDetail {
        title,
        url: url.to_string(),
        rent_text,
        description,
        image_url,
    })
}

fn parse_selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|err| ScrapeError::InvalidSelector {
        selector: css.to_string(),
        message: err.to_string(),
    })
}

fn select_first<'a>(doc: &'a Html, css: &str) -> Result<Option<ElementRef<'a>>, ScrapeError> {
    let selector = parse_selector(css)?;
    Ok(doc.select(&selector).next())
}

fn first_child_element(parent: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let node: NodeRef<'_, Node> = *parent;
    node.children().find_map(ElementRef::wrap)
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

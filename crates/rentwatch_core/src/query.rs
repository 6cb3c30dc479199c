use url::Url;

/// Query parameter carrying the pagination offset.
pub const OFFSET_PARAM: &str = "index";

/// Filters users may put in a browser search URL that the search API rejects or
/// that would hide listings we want to see.
pub const DISALLOWED_FILTERS: &[&str] = &["dontShow", "mustHave", "furnishTypes"];

const INJECTED_PARAMS: &[(&str, &str)] = &[
    ("sortType", "6"),
    ("viewType", "LIST"),
    ("channel", "RENT"),
    ("areaSizeUnit", "sqft"),
    ("currencyCode", "GBP"),
    ("isFetching", "false"),
];

/// Normalized query parameters of one configured search URL.
///
/// Disallowed filters are stripped and the sort/channel/view parameters are
/// forced, so every page request for a source differs only in its offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    source_url: String,
    params: Vec<(String, String)>,
}

impl SearchQuery {
    pub fn from_source_url(source_url: &str) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(source_url)?;
        let mut params: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| {
                let key = key.as_ref();
                key != OFFSET_PARAM
                    && !DISALLOWED_FILTERS.contains(&key)
                    && !INJECTED_PARAMS.iter().any(|(name, _)| *name == key)
            })
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        params.extend(
            INJECTED_PARAMS
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        );
        Ok(Self {
            source_url: source_url.to_string(),
            params,
        })
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Builds the request URL for one page: `endpoint` with the normalized
    /// parameters plus the offset, keys sorted for a stable encoding.
    pub fn page_url(&self, endpoint: &Url, offset: &str) -> Url {
        let mut pairs: Vec<(&str, &str)> = self
            .params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        pairs.push((OFFSET_PARAM, offset));
        // Stable: repeated keys keep their source order.
        pairs.sort_by(|a, b| a.0.cmp(b.0));

        let mut url = endpoint.clone();
        url.set_query(None);
        url.query_pairs_mut().extend_pairs(pairs);
        url
    }
}

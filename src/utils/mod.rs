//! Utility functions and helpers.

pub mod http;
pub mod log;

use url::Url;

use crate::error::Result;

/// Append `path` to a base URL and attach query parameters.
///
/// The base may or may not end with a slash; `path` segments are added
/// verbatim, so `models/gemini:generateContent` keeps its colon.
pub fn endpoint_url(base: &str, path: &str, query: &[(&str, &str)]) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined)?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

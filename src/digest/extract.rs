//! Paper extraction from Google Scholar alert HTML.
//!
//! Alert emails list each paper as an `h3` heading holding a link, followed
//! by an author/venue `div` and an abstract snippet `div`:
//!
//! ```html
//! <h3><a href="http://scholar.google.com/scholar_url?url=https://arxiv.org/abs/1&amp;hl=en">Title</a></h3>
//! <div>A Author, B Author - arXiv preprint, 2019</div>
//! <div>Abstract snippet ...</div>
//! ```

use scraper::{ElementRef, Html, Selector};

use crate::models::{Abstract, Paper};

/// Redirect prefix Scholar wraps around every paper link
pub const SCHOLAR_URL_PREFIX: &str = "http://scholar.google.com/scholar_url?url=";

/// Per-message extraction failures; the message is skipped and counted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The body could not be read as an HTML document
    #[error("failed to parse HTML body of {subject:?}: {reason}")]
    Parse { subject: String, reason: String },

    /// Title and URL queries disagree; the message layout is not understood
    #[error("titles {titles} != {urls} urls in {subject:?}")]
    StructureMismatch {
        subject: String,
        titles: usize,
        urls: usize,
    },
}

/// Per-entry URL failure; only the one paper is skipped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlDecodeError {
    #[error("invalid escape {0:?}")]
    InvalidEscape(String),

    #[error("decoded URL is not valid UTF-8")]
    InvalidUtf8,
}

/// Extract all papers from one alert message body.
///
/// Entries whose link cannot be decoded are logged and skipped; an empty
/// result is valid and means the message listed no papers.
pub fn extract_papers(body: &[u8], subject: &str) -> Result<Vec<Paper>, ExtractError> {
    let html = std::str::from_utf8(body).map_err(|e| ExtractError::Parse {
        subject: subject.to_string(),
        reason: format!("body is not UTF-8: {}", e),
    })?;
    if html.trim().is_empty() {
        return Err(ExtractError::Parse {
            subject: subject.to_string(),
            reason: "empty body".to_string(),
        });
    }

    let document = Html::parse_document(html);
    let headings = selector("h3", subject)?;

    let mut titles = 0;
    let mut entries = Vec::new();
    for heading in document.select(&headings) {
        let abstract_text = abstract_of(heading);
        for anchor in heading
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "a")
        {
            titles += 1;
            if let Some(href) = anchor.value().attr("href") {
                entries.push((text_of(anchor), href, abstract_text.clone()));
            }
        }
    }

    if titles != entries.len() {
        return Err(ExtractError::StructureMismatch {
            subject: subject.to_string(),
            titles,
            urls: entries.len(),
        });
    }

    let mut papers = Vec::with_capacity(entries.len());
    for (title, href, abstract_text) in entries {
        match normalize_url(href) {
            Ok(url) => papers.push(Paper::new(title, url, Abstract::new(abstract_text))),
            Err(e) => {
                tracing::warn!("Skipping paper {:?} in {:?}: {}", title, subject, e);
            }
        }
    }

    tracing::debug!("Extracted {} papers from {:?}", papers.len(), subject);
    Ok(papers)
}

/// Strip the Scholar redirect, cut tracking parameters at the first `&` and unescape.
pub fn normalize_url(href: &str) -> Result<String, UrlDecodeError> {
    let long_url = href.strip_prefix(SCHOLAR_URL_PREFIX).unwrap_or(href);
    let target = match long_url.find('&') {
        Some(idx) => &long_url[..idx],
        None => long_url,
    };
    query_unescape(target)
}

/// Query-string unescaping: `+` becomes a space, `%XX` a byte.
fn query_unescape(s: &str) -> Result<String, UrlDecodeError> {
    let bytes = s.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|e| e.iter().all(u8::is_ascii_hexdigit)) {
                let end = (i + 3).min(s.len());
                return Err(UrlDecodeError::InvalidEscape(
                    String::from_utf8_lossy(&bytes[i..end]).into_owned(),
                ));
            }
        }
    }

    urlencoding::decode(&s.replace('+', " "))
        .map(|decoded| decoded.into_owned())
        .map_err(|_| UrlDecodeError::InvalidUtf8)
}

/// Trimmed text of the second `div` sibling after the heading, empty when absent.
fn abstract_of(heading: ElementRef) -> String {
    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "div")
        .nth(1)
        .map(text_of)
        .unwrap_or_default()
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn selector(css: &str, subject: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Parse {
        subject: subject.to_string(),
        reason: format!("invalid selector {:?}: {}", css, e),
    })
}

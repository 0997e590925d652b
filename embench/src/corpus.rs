//! Text corpus used to build request payloads.
//!
//! The corpus is loaded once before the run, either from a local file or from
//! an HTTP(S) URL, stripped of markup and split into fragments of the same
//! number of cl100k BPE tokens.

use core::{
    fmt::{self, Display, Formatter},
    str::FromStr,
    time::Duration,
};
use std::{convert::Infallible, fs, path::PathBuf, sync::Arc};

use http::StatusCode;
use scraper::{Html, Node};
use tiktoken_rs::CoreBPE;

use crate::error::CorpusFetchError;

/// Article used when no corpus is given explicitly.
pub const DEFAULT_SOURCE: &str =
    "https://writings.stephenwolfram.com/2023/02/what-is-chatgpt-doing-and-why-does-it-work/";

/// Where to load the corpus from.
#[derive(Debug, Clone, PartialEq)]
pub enum CorpusSource {
    File(PathBuf),
    Http(String),
}

impl FromStr for CorpusSource {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let m = if s.starts_with("http://") || s.starts_with("https://") {
            Self::Http(s.to_string())
        } else {
            Self::File(PathBuf::from(s))
        };

        Ok(m)
    }
}

impl Display for CorpusSource {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Http(url) => f.write_str(url),
        }
    }
}

/// Loads the corpus and splits it into fragments of `tokens_per_fragment`
/// tokens each, the last one possibly shorter.
///
/// Remote sources must deliver the complete document within `timeout`.
///
/// The returned corpus is never empty.
pub async fn fetch(
    source: &CorpusSource,
    tokens_per_fragment: usize,
    timeout: Duration,
) -> Result<Arc<[String]>, CorpusFetchError> {
    log::debug!("loading corpus from '{source}' ...");

    let text = match source {
        CorpusSource::File(path) => fs::read_to_string(path).map_err(|source| CorpusFetchError::Io {
            path: path.clone(),
            source,
        })?,
        CorpusSource::Http(url) => tokio::time::timeout(timeout, fetch_http(url))
            .await
            .map_err(|_| CorpusFetchError::Timeout(timeout))??,
    };

    let text = if looks_like_html(&text) {
        extract_text(&text)
    } else {
        text
    };

    let bpe = tiktoken_rs::cl100k_base().map_err(CorpusFetchError::Tokenizer)?;
    let fragments = split(&bpe, &text, tokens_per_fragment);
    if fragments.is_empty() {
        return Err(CorpusFetchError::Empty);
    }
    log::info!(
        "loaded {} fragments of {} tokens from '{}'",
        fragments.len(),
        tokens_per_fragment,
        source
    );

    Ok(fragments.into())
}

async fn fetch_http(url: &str) -> Result<String, CorpusFetchError> {
    let url = reqwest::Url::parse(url).map_err(|err| CorpusFetchError::InvalidUrl(format!("{url}: {err}")))?;

    let resp = reqwest::get(url).await?;
    if resp.status() != StatusCode::OK {
        return Err(CorpusFetchError::Status(resp.status()));
    }

    Ok(resp.text().await?)
}

#[inline]
fn looks_like_html(text: &str) -> bool {
    let head = text.trim_start();
    let mut len = head.len().min(512);
    while !head.is_char_boundary(len) {
        len -= 1;
    }
    let head = head[..len].to_ascii_lowercase();

    head.starts_with("<!doctype html") || head.contains("<html") || head.contains("<body")
}

/// Extracts readable text from an HTML document.
///
/// Concatenates the text of the "body" element, except for "script" and
/// "style" contents, and collapses whitespace. Entities are decoded by the
/// parser.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut out = String::with_capacity(html.len() / 2);
    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|v| {
            v.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "head" | "script" | "style"))
        });
        if !hidden {
            out.push_str(text);
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits text into fragments of `tokens_per_fragment` tokens.
///
/// Token groups are decoded back to text. A group whose boundary would cut a
/// multi-byte character is shortened to the nearest boundary that decodes,
/// so fragments concatenate back to the original text.
///
/// # Panics
///
/// Panics if `tokens_per_fragment` is zero.
pub fn split(bpe: &CoreBPE, text: &str, tokens_per_fragment: usize) -> Vec<String> {
    assert!(tokens_per_fragment > 0, "tokens per fragment must be at least 1");

    let ids = bpe.encode_ordinary(text.trim());

    let mut out = Vec::with_capacity(ids.len().div_ceil(tokens_per_fragment));
    let mut start = 0;
    while start < ids.len() {
        let limit = (start + tokens_per_fragment).min(ids.len());
        let next = (start + 1..=limit)
            .rev()
            .chain(limit + 1..=ids.len())
            .find_map(|end| bpe.decode(ids[start..end].to_vec()).ok().map(|v| (v, end)));

        let Some((fragment, end)) = next else {
            break;
        };
        out.push(fragment);
        start = end;
    }

    out
}

use std::fmt::{Display, Formatter};

use reqwest::Url;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fetch::FetchError;

pub const NEWS_ENDPOINT: &str = "https://newsapi.org/v2/top-headlines";
pub const REGISTER_URL: &str = "https://newsapi.org/register";
pub const PLACEHOLDER_KEY: &str = "YOUR_NEWS_API_KEY";
const PAGE_SIZE: &str = "10";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    Business,
    Entertainment,
    #[default]
    General,
    Health,
    Science,
    Sports,
    Technology,
}

impl NewsCategory {
    pub const ALL: [NewsCategory; 7] = [
        NewsCategory::Business,
        NewsCategory::Entertainment,
        NewsCategory::General,
        NewsCategory::Health,
        NewsCategory::Science,
        NewsCategory::Sports,
        NewsCategory::Technology,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NewsCategory::Business => "business",
            NewsCategory::Entertainment => "entertainment",
            NewsCategory::General => "general",
            NewsCategory::Health => "health",
            NewsCategory::Science => "science",
            NewsCategory::Sports => "sports",
            NewsCategory::Technology => "technology",
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|item| *item == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl Display for NewsCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headline {
    pub title: String,
    pub source: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsView {
    Loading,
    SetupNeeded { register_url: &'static str },
    Empty,
    Ready(Vec<Headline>),
    Failed(String),
}

impl NewsView {
    pub fn from_result(result: Result<Vec<Headline>, FetchError>) -> Self {
        match result {
            Ok(headlines) if headlines.is_empty() => NewsView::Empty,
            Ok(headlines) => NewsView::Ready(headlines),
            Err(err) => NewsView::Failed(format!("Error loading news: {err}")),
        }
    }

    pub fn setup_needed() -> Self {
        NewsView::SetupNeeded {
            register_url: REGISTER_URL,
        }
    }
}

/// A usable key, or `None` when it is absent, blank or still the
/// placeholder.
pub fn credential(api_key: Option<&str>) -> Option<&str> {
    api_key
        .map(str::trim)
        .filter(|key| !key.is_empty() && *key != PLACEHOLDER_KEY)
}

pub fn headlines_url(category: NewsCategory, api_key: &str) -> Result<Url, FetchError> {
    Url::parse_with_params(
        NEWS_ENDPOINT,
        &[
            ("category", category.as_str()),
            ("language", "en"),
            ("country", "us"),
            ("pageSize", PAGE_SIZE),
            ("apiKey", api_key),
        ],
    )
    .map_err(|err| FetchError::Parse(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    status: Option<String>,
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    url: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

pub fn parse_headlines(http_ok: bool, body: &str) -> Result<Vec<Headline>, FetchError> {
    let response: HeadlinesResponse =
        serde_json::from_str(body).map_err(|err| FetchError::Parse(err.to_string()))?;

    if !http_ok || response.status.as_deref() != Some("ok") {
        let message = match response.code.as_deref() {
            Some("apiKeyInvalid") | Some("apiKeyMissing") => {
                "API key is invalid or missing.".to_string()
            }
            _ => response
                .message
                .unwrap_or_else(|| "Failed to fetch news. Check the API key.".to_string()),
        };
        return Err(FetchError::Api(message));
    }

    Ok(response
        .articles
        .into_iter()
        .filter_map(|article| {
            let title = article.title?;
            Some(Headline {
                title,
                source: article
                    .source
                    .and_then(|source| source.name)
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| "Unknown Source".to_string()),
                url: article.url.unwrap_or_default(),
            })
        })
        .collect())
}

pub struct NewsClient {
    client: Client,
}

impl NewsClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn fetch(&self, category: NewsCategory, api_key: &str) -> Result<Vec<Headline>, FetchError> {
        let url = headlines_url(category, api_key)?;
        debug!(%category, "fetching headlines");
        let response = self.client.get(url).send()?;
        let status = response.status();
        let body = response.text()?;

        match parse_headlines(status.is_success(), &body) {
            Err(FetchError::Parse(_)) if !status.is_success() => {
                warn!(status = status.as_u16(), "news request rejected");
                Err(FetchError::Status {
                    status: status.as_u16(),
                })
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{credential, headlines_url, parse_headlines, NewsCategory, NewsView, REGISTER_URL};
    use crate::fetch::FetchError;

    #[test]
    fn placeholder_or_blank_key_needs_setup() {
        assert_eq!(credential(None), None);
        assert_eq!(credential(Some("  ")), None);
        assert_eq!(credential(Some("YOUR_NEWS_API_KEY")), None);
        assert_eq!(credential(Some(" abc123 ")), Some("abc123"));
        assert_eq!(
            NewsView::setup_needed(),
            NewsView::SetupNeeded {
                register_url: REGISTER_URL
            }
        );
    }

    #[test]
    fn url_carries_category_and_key() {
        let url = headlines_url(NewsCategory::Science, "k3y").expect("url");
        let query = url.query().expect("query");
        assert!(query.contains("category=science"));
        assert!(query.contains("pageSize=10"));
        assert!(query.contains("apiKey=k3y"));
    }

    #[test]
    fn parses_articles_with_source_fallback() {
        let body = r#"{"status":"ok","totalResults":2,"articles":[
            {"source":{"id":null,"name":"Wire"},"title":"Rates hold","url":"https://example.com/a"},
            {"source":{"id":null,"name":null},"title":"Storm passes","url":"https://example.com/b"},
            {"source":{"name":"Skip"},"title":null,"url":"https://example.com/c"}
        ]}"#;
        let headlines = parse_headlines(true, body).expect("payload should parse");
        assert_eq!(headlines.len(), 2);
        assert_eq!(headlines[0].source, "Wire");
        assert_eq!(headlines[1].source, "Unknown Source");
    }

    #[test]
    fn invalid_key_is_a_fetch_failure_not_setup() {
        let body = r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid"}"#;
        let err = parse_headlines(false, body).expect_err("should fail");
        assert!(matches!(&err, FetchError::Api(message) if message == "API key is invalid or missing."));

        match NewsView::from_result(Err(err)) {
            NewsView::Failed(message) => assert!(message.contains("invalid or missing")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn empty_article_list_has_its_own_view() {
        let headlines = parse_headlines(true, r#"{"status":"ok","articles":[]}"#).expect("parse");
        assert_eq!(NewsView::from_result(Ok(headlines)), NewsView::Empty);
        assert_eq!(NewsCategory::Technology.next(), NewsCategory::Business);
    }
}

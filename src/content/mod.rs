//! External education content providers
//!
//! Five thin facades (Khan Academy, NASA, CK-12, OpenLibrary, WordsAPI) over
//! one generic cached client. Each facade only knows its endpoint table and
//! how to project its responses into [`NormalizedContentItem`].

pub mod ck12;
pub mod client;
pub mod khan;
pub mod nasa;
pub mod openlibrary;
pub mod words;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheManager, CacheStats};
use crate::config::ContentConfig;

pub use ck12::Ck12;
pub use client::{
    ApiRequest, AuthScheme, Call, ContentClient, ContentError, Endpoint, HttpTransport, ProviderSpec,
    Transport,
};
pub use khan::KhanAcademy;
pub use nasa::Nasa;
pub use openlibrary::OpenLibrary;
pub use words::{WordEntry, WordsApi};

/// Provider-agnostic projection of one piece of third-party content
///
/// This is the only shape lesson assembly and the rest of the application
/// consume, regardless of which provider produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedContentItem {
    /// Provider identifier (e.g. "nasa")
    pub provider: String,
    /// Provider-side identifier
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Content type, e.g. "video", "exercise", "book"
    pub category: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub grade_level: Option<u8>,
    /// Image, thumbnail or embeddable player
    #[serde(default)]
    pub media_url: Option<String>,
    /// Canonical page for the item
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// Running time of videos
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
}

impl NormalizedContentItem {
    /// Case-insensitive match against category
    pub fn category_contains(&self, needle: &str) -> bool {
        self.category.to_lowercase().contains(needle)
    }

    /// Case-insensitive match against title
    pub fn title_contains(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
    }
}

/// Serde helpers for loosely-typed provider fields
///
/// Providers disagree on whether ids and grades are numbers or strings and
/// sometimes send blanks or nulls. These are used with
/// `#[serde(deserialize_with = ...)]` on the wire structs, which also carry
/// `#[serde(default)]` so missing fields decode as empty.
pub(crate) mod wire {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Text from a string, a number, or an OpenLibrary
    /// `{"type": "/type/text", "value": ...}` wrapper; blank strings are absent
    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Object(mut map)) => match map.remove("value") {
                Some(Value::String(s)) => Some(s),
                _ => None,
            },
            _ => None,
        })
    }

    /// Grade level from a number or a numeric string; "K" is grade 0
    pub fn grade<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n.as_u64().and_then(|g| u8::try_from(g).ok()),
            Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("k") => Some(0),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// Whole seconds from an integer, a float or a numeric string
    pub fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        let secs = match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(secs
            .filter(|s| s.is_finite() && *s >= 0.0 && *s <= f64::from(u32::MAX))
            .map(|s| s.round() as u32))
    }

    /// A list of strings; null is empty and non-string entries are skipped
    pub fn strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        })
    }
}

/// Keeps the first item for each id, preserving order
pub fn dedupe_by_id(items: impl IntoIterator<Item = NormalizedContentItem>) -> Vec<NormalizedContentItem> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

/// Truncates a list to at most `limit` items
pub(crate) fn take<T>(mut items: Vec<T>, limit: usize) -> Vec<T> {
    items.truncate(limit);
    items
}

/// One client per provider, sharing a transport and a cache root
#[derive(Debug, Clone)]
pub struct Providers {
    pub khan: KhanAcademy,
    pub nasa: Nasa,
    pub ck12: Ck12,
    pub openlibrary: OpenLibrary,
    pub words: WordsApi,
}

impl Providers {
    /// Builds all providers over a real HTTP transport
    pub fn from_config(config: &ContentConfig) -> Result<Self, ContentError> {
        let transport = HttpTransport::new(config.timeout, &config.user_agent)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Builds all providers over the given transport
    pub fn with_transport(config: &ContentConfig, transport: Arc<dyn Transport>) -> Self {
        let root = config.cache_root.as_path();
        let client = |spec: ProviderSpec| {
            let cache = CacheManager::for_provider(root, spec.id);
            ContentClient::new(spec, transport.clone(), cache)
        };

        Self {
            khan: KhanAcademy::new(client(khan::spec(config.khan_api_key.clone()))),
            nasa: Nasa::new(client(nasa::spec(config.nasa_api_key.clone()))),
            ck12: Ck12::new(client(ck12::spec())),
            openlibrary: OpenLibrary::new(client(openlibrary::spec())),
            words: WordsApi::new(client(words::spec(config.words_api_key.clone()))),
        }
    }

    pub fn client(&self, provider: ProviderId) -> &ContentClient {
        match provider {
            ProviderId::Khan => self.khan.client(),
            ProviderId::Nasa => self.nasa.client(),
            ProviderId::Ck12 => self.ck12.client(),
            ProviderId::OpenLibrary => self.openlibrary.client(),
            ProviderId::Words => self.words.client(),
        }
    }

    pub fn clients(&self) -> [&ContentClient; 5] {
        ProviderId::ALL.map(|provider| self.client(provider))
    }

    /// Runs a provider's main search operation
    ///
    /// Filters a provider does not support are ignored. WordsAPI has no
    /// search; the query is looked up as a single word.
    pub async fn search(
        &self,
        provider: ProviderId,
        query: &str,
        subject: Option<&str>,
        grade_level: Option<u8>,
        limit: usize,
    ) -> Vec<NormalizedContentItem> {
        match provider {
            ProviderId::Khan => self.khan.search_videos(query, grade_level, limit).await,
            ProviderId::Nasa => self.nasa.search_images(query, limit).await,
            ProviderId::Ck12 => self.ck12.search_content(query, subject, grade_level, limit).await,
            ProviderId::OpenLibrary => self.openlibrary.search_books(query, limit, grade_level).await,
            ProviderId::Words => vec![self.words.definition(query).await.to_content_item()],
        }
    }

    /// Cache statistics for every provider
    pub fn cache_stats(&self) -> std::io::Result<Vec<(&'static str, CacheStats)>> {
        self.clients()
            .into_iter()
            .map(|client| Ok((client.id(), client.cache_stats()?)))
            .collect()
    }
}

/// The five supported providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderId {
    Khan,
    Nasa,
    Ck12,
    OpenLibrary,
    Words,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        ProviderId::Khan,
        ProviderId::Nasa,
        ProviderId::Ck12,
        ProviderId::OpenLibrary,
        ProviderId::Words,
    ];

    /// Identifier used in logs and as the cache subdirectory
    pub fn id(&self) -> &'static str {
        match self {
            ProviderId::Khan => khan::ID,
            ProviderId::Nasa => nasa::ID,
            ProviderId::Ck12 => ck12::ID,
            ProviderId::OpenLibrary => openlibrary::ID,
            ProviderId::Words => words::ID,
        }
    }

    /// Parses a provider name, accepting short aliases ("khan", "books", "words")
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<ProviderId> {
        match s.to_lowercase().trim() {
            "khan" | "khan_academy" | "khanacademy" => Some(ProviderId::Khan),
            "nasa" => Some(ProviderId::Nasa),
            "ck12" | "ck-12" => Some(ProviderId::Ck12),
            "openlibrary" | "open_library" | "books" => Some(ProviderId::OpenLibrary),
            "wordsapi" | "words" => Some(ProviderId::Words),
            _ => None,
        }
    }
}

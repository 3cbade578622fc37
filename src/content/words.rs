//! WordsAPI vocabulary client
//!
//! Definitions, related words and grade-level word lists. Without RapidAPI
//! credentials every lookup is answered from a small built-in dictionary and
//! nothing goes over the network.

use std::collections::BTreeSet;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::client::{AuthScheme, Call, ContentClient, ContentError, Endpoint, DAY, MONTH};
use super::{wire, NormalizedContentItem};

pub const ID: &str = "wordsapi";

const BASE_URL: &str = "https://wordsapiv1.p.rapidapi.com";
const RAPIDAPI_HOST: &str = "wordsapiv1.p.rapidapi.com";

const WORD: Endpoint = Endpoint::new("word", MONTH);
const WORD_OF_DAY_KEY: &str = "word_of_day";

const EDUCATIONAL_WORDS: [&str; 20] = [
    "serendipity",
    "ephemeral",
    "ubiquitous",
    "eloquent",
    "perseverance",
    "resilient",
    "innovative",
    "authentic",
    "diligent",
    "curious",
    "analytical",
    "creative",
    "logical",
    "systematic",
    "thorough",
    "precise",
    "concise",
    "articulate",
    "profound",
    "insightful",
];

const BASIC_DEFINITIONS: [(&str, &str); 10] = [
    ("happy", "feeling or showing pleasure or contentment"),
    ("big", "of considerable size or extent"),
    ("small", "of a size that is less than normal or usual"),
    ("fast", "moving or capable of moving at high speed"),
    ("slow", "moving or operating at a low speed"),
    ("good", "to be desired or approved of"),
    ("bad", "of poor quality or a low standard"),
    ("new", "not existing before; made, introduced, or discovered recently"),
    ("old", "having lived for a long time; no longer young"),
    ("hot", "having a high degree of heat or a high temperature"),
];

/// Provider description; credentials travel as RapidAPI headers
pub fn spec(api_key: Option<String>) -> super::ProviderSpec {
    super::ProviderSpec {
        id: ID,
        base_url: BASE_URL.to_string(),
        auth: match api_key {
            Some(key) => AuthScheme::Headers(vec![
                ("X-RapidAPI-Key", key),
                ("X-RapidAPI-Host", RAPIDAPI_HOST.to_string()),
            ]),
            None => AuthScheme::None,
        },
    }
}

/// One meaning of a word
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordSense {
    pub definition: String,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
    #[serde(default)]
    pub similar_to: Vec<String>,
    #[serde(default)]
    pub rhymes: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub etymology: Option<String>,
}

/// Normalized vocabulary lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    #[serde(default)]
    pub pronunciation: Option<String>,
    #[serde(default)]
    pub senses: Vec<WordSense>,
    /// Rhymes listed for the word as a whole
    #[serde(default)]
    pub rhymes: Vec<String>,
}

impl WordEntry {
    /// Entry with a single plain definition
    pub fn basic(word: &str, definition: impl Into<String>) -> Self {
        Self {
            word: word.to_string(),
            pronunciation: None,
            senses: vec![WordSense {
                definition: definition.into(),
                ..Default::default()
            }],
            rhymes: Vec::new(),
        }
    }

    pub fn first_definition(&self) -> Option<&str> {
        self.senses.first().map(|sense| sense.definition.as_str())
    }

    pub fn synonyms(&self) -> Vec<String> {
        unique_sorted(self.senses.iter().flat_map(|sense| sense.synonyms.iter()))
    }

    pub fn antonyms(&self) -> Vec<String> {
        unique_sorted(self.senses.iter().flat_map(|sense| sense.antonyms.iter()))
    }

    pub fn similar_words(&self) -> Vec<String> {
        unique_sorted(self.senses.iter().flat_map(|sense| sense.similar_to.iter()))
    }

    /// Word-level rhymes plus any listed on individual senses
    pub fn rhymes(&self) -> Vec<String> {
        unique_sorted(
            self.rhymes
                .iter()
                .chain(self.senses.iter().flat_map(|sense| sense.rhymes.iter())),
        )
    }

    /// First etymology found across senses
    pub fn etymology(&self) -> Option<&str> {
        self.senses.iter().find_map(|sense| sense.etymology.as_deref())
    }

    pub fn to_content_item(&self) -> NormalizedContentItem {
        NormalizedContentItem {
            provider: ID.to_string(),
            id: self.word.to_lowercase(),
            title: self.word.clone(),
            description: self.first_definition().unwrap_or_default().to_string(),
            category: "word".to_string(),
            subject: Some("vocabulary".to_string()),
            grade_level: None,
            media_url: None,
            url: None,
            keywords: self.synonyms(),
            duration_secs: None,
        }
    }
}

/// Synonyms, antonyms, rhymes and similar words for one word
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WordFamily {
    pub word: String,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
    pub rhymes: Vec<String>,
    pub similar_words: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    SynonymMatch,
    DefinitionMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameQuestion {
    pub kind: QuestionKind,
    pub question: String,
    pub correct_answer: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// A small vocabulary game built around one word
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordGame {
    pub word: String,
    pub kind: GameKind,
    pub questions: Vec<GameQuestion>,
}

/// Client for WordsAPI vocabulary data
#[derive(Debug, Clone)]
pub struct WordsApi {
    client: ContentClient,
}

impl WordsApi {
    pub fn new(client: ContentClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ContentClient {
        &self.client
    }

    /// Definition and related words; never fails
    ///
    /// Falls back to the built-in dictionary when no key is configured or
    /// the lookup fails.
    pub async fn definition(&self, word: &str) -> WordEntry {
        let word = word.trim().to_lowercase();
        if !self.client.has_credentials() {
            debug!(word = %word, "no WordsAPI key, using built-in dictionary");
            return basic_definition(&word);
        }

        let call = Call::new(&WORD, "/words").segment(word.as_str());
        let result = self.client.fetch(call, normalize_word).await;
        self.client
            .settle("definition", result)
            .unwrap_or_else(|| basic_definition(&word))
    }

    /// Today's featured word, stable for a day
    pub async fn word_of_the_day(&self) -> WordEntry {
        let cache = self.client.cache();
        if let Some(cached) = cache.read::<WordEntry>(WORD_OF_DAY_KEY, DAY) {
            return cached.data;
        }

        let day = Utc::now().date_naive().num_days_from_ce();
        let word = EDUCATIONAL_WORDS[day.unsigned_abs() as usize % EDUCATIONAL_WORDS.len()];
        let entry = self.definition(word).await;

        if let Err(e) = cache.write(WORD_OF_DAY_KEY, &entry) {
            warn!(error = %e, "failed to cache word of the day");
        }
        entry
    }

    pub async fn synonyms(&self, word: &str) -> Vec<String> {
        self.definition(word).await.synonyms()
    }

    pub async fn antonyms(&self, word: &str) -> Vec<String> {
        self.definition(word).await.antonyms()
    }

    pub async fn word_family(&self, word: &str) -> WordFamily {
        let entry = self.definition(word).await;
        WordFamily {
            word: word.to_string(),
            synonyms: entry.synonyms(),
            antonyms: entry.antonyms(),
            rhymes: entry.rhymes(),
            similar_words: entry.similar_words(),
        }
    }

    pub async fn pronunciation(&self, word: &str) -> Option<String> {
        self.definition(word).await.pronunciation
    }

    pub async fn etymology(&self, word: &str) -> Option<String> {
        self.definition(word).await.etymology().map(str::to_string)
    }

    /// Builds a one-question game; no questions when the word has no synonyms
    pub async fn word_game(&self, word: &str, kind: GameKind) -> WordGame {
        let entry = self.definition(word).await;
        let questions = match kind {
            GameKind::SynonymMatch => synonym_question(word, &entry.synonyms()).into_iter().collect(),
            GameKind::DefinitionMatch => entry
                .first_definition()
                .map(|definition| GameQuestion {
                    kind: QuestionKind::TrueFalse,
                    question: format!("True or False: '{}' means '{}'", word, definition),
                    correct_answer: "True".to_string(),
                    options: Vec::new(),
                })
                .into_iter()
                .collect(),
        };

        WordGame {
            word: word.to_string(),
            kind,
            questions,
        }
    }
}

/// Vocabulary list for a grade; unknown grades get the grade 5 list
pub fn grade_level_vocabulary(grade_level: u8, limit: usize) -> Vec<&'static str> {
    let words: &[&str] = match grade_level {
        1 => &["happy", "big", "small", "fast", "slow", "good", "bad", "new", "old", "hot"],
        2 => &[
            "beautiful", "careful", "helpful", "wonderful", "peaceful", "colorful", "powerful",
            "thoughtful", "cheerful", "graceful",
        ],
        3 => &[
            "adventure", "brave", "curious", "determined", "energetic", "friendly", "generous",
            "honest", "imaginative", "kind",
        ],
        4 => &[
            "accomplish", "brilliant", "courageous", "delightful", "excellent", "fascinating",
            "grateful", "harmonious", "incredible", "joyful",
        ],
        6 => &[
            "articulate", "comprehensive", "dedicated", "enthusiastic", "fortunate", "genuine",
            "influential", "magnificent", "optimistic", "remarkable",
        ],
        7 => &[
            "authentic", "confident", "determined", "enthusiastic", "fortunate", "genuine",
            "influential", "magnificent", "optimistic", "remarkable",
        ],
        8 => &[
            "accomplished", "brilliant", "charismatic", "determined", "eloquent", "fascinating",
            "generous", "inspiring", "knowledgeable", "passionate",
        ],
        9 => &[
            "analytical", "articulate", "comprehensive", "dedicated", "eloquent", "innovative",
            "logical", "persistent", "resilient", "systematic",
        ],
        11 => &[
            "accomplished", "analytical", "articulate", "comprehensive", "dedicated", "eloquent",
            "innovative", "logical", "persistent", "resilient",
        ],
        10 | 12 => &[
            "authentic", "charismatic", "determined", "eloquent", "fascinating", "generous",
            "inspiring", "knowledgeable", "passionate", "remarkable",
        ],
        _ => &[
            "analytical", "creative", "diligent", "eloquent", "innovative", "logical", "persistent",
            "resilient", "systematic", "thorough",
        ],
    };
    words.iter().take(limit).copied().collect()
}

/// Built-in definition used without credentials or when a lookup fails
pub fn basic_definition(word: &str) -> WordEntry {
    let lower = word.to_lowercase();
    BASIC_DEFINITIONS
        .iter()
        .find(|(known, _)| *known == lower)
        .map(|(known, definition)| WordEntry::basic(known, *definition))
        .unwrap_or_else(|| WordEntry::basic(word, format!("A word meaning related to {}", word)))
}

fn synonym_question(word: &str, synonyms: &[String]) -> Option<GameQuestion> {
    let correct = synonyms.first()?.clone();
    let options = if synonyms.len() >= 4 {
        synonyms[..4].to_vec()
    } else {
        let mut options = synonyms.to_vec();
        options.push("None of the above".to_string());
        options
    };

    Some(GameQuestion {
        kind: QuestionKind::MultipleChoice,
        question: format!("What is a synonym for '{}'?", word),
        correct_answer: correct,
        options,
    })
}

fn unique_sorted<'a>(words: impl Iterator<Item = &'a String>) -> Vec<String> {
    words.cloned().collect::<BTreeSet<_>>().into_iter().collect()
}

#[derive(Debug, Deserialize)]
struct WordResponse {
    word: String,
    #[serde(default)]
    pronunciation: Option<Pronunciation>,
    #[serde(default)]
    results: Vec<WordResult>,
    #[serde(default)]
    rhymes: Option<Rhymes>,
}

/// WordsAPI returns either a plain string or `{"all": "..."}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Pronunciation {
    Plain(String),
    Parts {
        #[serde(default, deserialize_with = "wire::text")]
        all: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Rhymes {
    #[serde(deserialize_with = "wire::strings")]
    all: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WordResult {
    #[serde(deserialize_with = "wire::text")]
    definition: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    part_of_speech: Option<String>,
    #[serde(deserialize_with = "wire::strings")]
    synonyms: Vec<String>,
    #[serde(deserialize_with = "wire::strings")]
    antonyms: Vec<String>,
    #[serde(deserialize_with = "wire::strings")]
    similar_to: Vec<String>,
    #[serde(deserialize_with = "wire::strings")]
    rhymes: Vec<String>,
    #[serde(deserialize_with = "wire::strings")]
    examples: Vec<String>,
    #[serde(deserialize_with = "wire::text")]
    etymology: Option<String>,
}

fn normalize_word(response: WordResponse) -> Result<WordEntry, ContentError> {
    let pronunciation = match response.pronunciation {
        Some(Pronunciation::Plain(text)) => Some(text),
        Some(Pronunciation::Parts { all }) => all,
        None => None,
    };

    let senses = response
        .results
        .into_iter()
        .map(|result| WordSense {
            definition: result.definition.unwrap_or_default(),
            part_of_speech: result.part_of_speech,
            synonyms: result.synonyms,
            antonyms: result.antonyms,
            similar_to: result.similar_to,
            rhymes: result.rhymes,
            examples: result.examples,
            etymology: result.etymology,
        })
        .collect();

    Ok(WordEntry {
        word: response.word,
        pronunciation,
        senses,
        rhymes: response.rhymes.map(|rhymes| rhymes.all).unwrap_or_default(),
    })
}

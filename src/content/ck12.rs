//! CK-12 content client
//!
//! Searchable STEM content (readings, simulations, practice problems),
//! subject and concept listings, embeddable players, practice problems as
//! quiz questions and offline snapshots.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::client::{AuthScheme, Call, ContentClient, ContentError, Endpoint, MONTH, WEEK};
use super::{take, wire, NormalizedContentItem};

pub const ID: &str = "ck12";

const BASE_URL: &str = "https://www.ck12.org/api/v1";

const SEARCH: Endpoint = Endpoint::new("search", WEEK);
const CONTENT: Endpoint = Endpoint::new("content", MONTH);
const PROBLEM: Endpoint = Endpoint::new("problem", MONTH);
const SNAPSHOT: Endpoint = Endpoint::new("snapshot", MONTH);
const SUBJECTS: Endpoint = Endpoint::new("subjects", MONTH);
const CONCEPTS: Endpoint = Endpoint::new("concepts", WEEK);

const DEFAULT_DIFFICULTY: &str = "medium";

pub fn spec() -> super::ProviderSpec {
    super::ProviderSpec {
        id: ID,
        base_url: BASE_URL.to_string(),
        auth: AuthScheme::None,
    }
}

/// A CK-12 practice problem with its answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PracticeProblem {
    pub id: String,
    pub title: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    pub difficulty: String,
}

/// One quiz question in the format lessons and games consume
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    pub difficulty: String,
    pub points: u32,
}

impl PracticeProblem {
    /// Quiz question worth one point
    pub fn to_quiz(&self) -> QuizQuestion {
        QuizQuestion {
            question: self.question.clone(),
            options: self.options.clone(),
            correct_answer: self.correct_answer.clone(),
            explanation: self.explanation.clone(),
            difficulty: self.difficulty.clone(),
            points: 1,
        }
    }
}

/// Self-contained copy of one piece of content for offline use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineContent {
    pub id: String,
    pub title: String,
    /// Body text or HTML
    pub content: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub subject: Option<String>,
    pub grade_level: Option<u8>,
    pub downloaded_at: DateTime<Utc>,
}

/// Client for CK-12 FlexBook content
#[derive(Debug, Clone)]
pub struct Ck12 {
    client: ContentClient,
}

impl Ck12 {
    pub fn new(client: ContentClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ContentClient {
        &self.client
    }

    /// Searches content by query with optional subject and grade filters
    pub async fn search_content(
        &self,
        query: &str,
        subject: Option<&str>,
        grade_level: Option<u8>,
        limit: usize,
    ) -> Vec<NormalizedContentItem> {
        let call = Call::new(&SEARCH, "/content")
            .param("q", query)
            .param("limit", limit)
            .param_opt("subject", subject)
            .param_opt("grade_level", grade_level);

        let result = self.client.fetch(call, normalize_content_list).await;
        self.client.settle("search_content", result).unwrap_or_default()
    }

    /// Full record for one piece of content
    pub async fn content_details(&self, content_id: &str) -> Option<NormalizedContentItem> {
        let call = Call::new(&CONTENT, "/content").segment(content_id);
        let result = self
            .client
            .fetch(call, |content: Ck12Content| Ok(content.into_item()))
            .await;
        self.client.settle("content_details", result)
    }

    /// Every subject CK-12 offers
    pub async fn subjects(&self) -> Vec<NormalizedContentItem> {
        let call = Call::new(&SUBJECTS, "/subjects").singleton("subjects");
        let result = self.client.fetch(call, normalize_subjects).await;
        self.client.settle("subjects", result).unwrap_or_default()
    }

    /// Concepts taught for a subject and grade
    pub async fn concepts(&self, subject: Option<&str>, grade_level: Option<u8>) -> Vec<NormalizedContentItem> {
        let call = Call::new(&CONCEPTS, "/concepts")
            .param_opt("subject", subject)
            .param_opt("grade_level", grade_level);

        let result = self.client.fetch(call, normalize_concepts).await;
        self.client.settle("concepts", result).unwrap_or_default()
    }

    /// Interactive simulations for a subject
    pub async fn simulations(
        &self,
        subject: &str,
        grade_level: Option<u8>,
        limit: usize,
    ) -> Vec<NormalizedContentItem> {
        let found = self
            .search_content("simulation", Some(subject), grade_level, limit)
            .await;
        take(
            found
                .into_iter()
                .filter(|item| item.category_contains("simulation") || item.title_contains("interactive"))
                .collect(),
            limit,
        )
    }

    /// Practice problems for a subject
    pub async fn practice_problems(
        &self,
        subject: &str,
        grade_level: Option<u8>,
        limit: usize,
    ) -> Vec<NormalizedContentItem> {
        let found = self
            .search_content("practice problem", Some(subject), grade_level, limit)
            .await;
        take(
            found
                .into_iter()
                .filter(|item| item.category_contains("problem") || item.title_contains("practice"))
                .collect(),
            limit,
        )
    }

    /// Question, options and answer of one practice problem
    ///
    /// Content without a question is reported as not found.
    pub async fn practice_problem(&self, content_id: &str) -> Option<PracticeProblem> {
        let call = Call::new(&PROBLEM, "/content").segment(content_id);
        let result = self.client.fetch(call, Ck12Content::into_problem).await;
        self.client.settle("practice_problem", result)
    }

    /// A practice problem converted to a one-point quiz question
    pub async fn convert_to_quiz(&self, content_id: &str) -> Option<QuizQuestion> {
        self.practice_problem(content_id)
            .await
            .map(|problem| problem.to_quiz())
    }

    /// HTML iframe snippet for embedding a piece of content
    pub async fn embed_code(&self, content_id: &str) -> Option<String> {
        let details = self.content_details(content_id).await?;
        details.media_url.map(|embed_url| iframe(&embed_url))
    }

    /// Saves a piece of content as `offline_<id>.json` in the CK-12 cache
    /// directory and returns the file's path
    pub async fn download_content(&self, content_id: &str) -> Option<PathBuf> {
        let call = Call::new(&SNAPSHOT, "/content").segment(content_id);
        let id = content_id.to_string();
        let result = self
            .client
            .fetch(call, move |content: Ck12Content| Ok(content.into_offline(id)))
            .await;
        let snapshot = self.client.settle("download_content", result)?;

        let cache = self.client.cache();
        let key = offline_key(content_id);
        if let Err(e) = cache.write(&key, &snapshot) {
            warn!(content_id, error = %e, "failed to save offline content");
            return None;
        }
        let path = cache.entry_path(&key);
        info!(content_id, path = %path.display(), "content saved for offline use");
        Some(path)
    }
}

/// iframe markup for an embeddable URL
pub fn iframe(embed_url: &str) -> String {
    format!(
        r#"<iframe src="{}" width="100%" height="600" frameborder="0"></iframe>"#,
        embed_url
    )
}

/// File-safe cache key for an offline snapshot
fn offline_key(content_id: &str) -> String {
    let safe: String = content_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("offline_{}", safe)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Ck12Content {
    #[serde(deserialize_with = "wire::text")]
    id: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    title: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    description: Option<String>,
    #[serde(rename = "type", deserialize_with = "wire::text")]
    kind: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    subject: Option<String>,
    #[serde(deserialize_with = "wire::grade")]
    grade_level: Option<u8>,
    #[serde(deserialize_with = "wire::text")]
    embed_url: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    url: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    difficulty: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    content: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    question: Option<String>,
    #[serde(deserialize_with = "wire::strings")]
    options: Vec<String>,
    #[serde(deserialize_with = "wire::text")]
    correct_answer: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    explanation: Option<String>,
}

impl Ck12Content {
    fn into_item(self) -> NormalizedContentItem {
        NormalizedContentItem {
            provider: ID.to_string(),
            id: self.id.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            category: self.kind.unwrap_or_else(|| "content".to_string()),
            subject: self.subject,
            grade_level: self.grade_level,
            media_url: self.embed_url,
            url: self.url,
            keywords: vec![self.difficulty.unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string())],
            duration_secs: None,
        }
    }

    fn into_problem(self) -> Result<PracticeProblem, ContentError> {
        let question = self.question.ok_or(ContentError::NotFound)?;
        Ok(PracticeProblem {
            id: self.id.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            question,
            options: self.options,
            correct_answer: self.correct_answer.unwrap_or_default(),
            explanation: self.explanation.unwrap_or_default(),
            difficulty: self.difficulty.unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
        })
    }

    fn into_offline(self, requested_id: String) -> OfflineContent {
        OfflineContent {
            id: self.id.unwrap_or(requested_id),
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            content_type: self.kind.unwrap_or_default(),
            subject: self.subject,
            grade_level: self.grade_level,
            downloaded_at: Utc::now(),
        }
    }
}

/// Search results; a search with no hits may omit "content" entirely
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentList {
    Bare(Vec<Ck12Content>),
    Wrapped {
        #[serde(default)]
        content: Vec<Ck12Content>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Ck12Subject {
    #[serde(deserialize_with = "wire::text")]
    id: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    name: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    title: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubjectEntry {
    Name(String),
    Subject(Ck12Subject),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubjectList {
    Bare(Vec<SubjectEntry>),
    Wrapped { subjects: Vec<SubjectEntry> },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Ck12Concept {
    #[serde(deserialize_with = "wire::text")]
    id: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    title: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    name: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    description: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    subject: Option<String>,
    #[serde(deserialize_with = "wire::grade")]
    grade_level: Option<u8>,
    #[serde(deserialize_with = "wire::text")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConceptList {
    Bare(Vec<Ck12Concept>),
    Wrapped { concepts: Vec<Ck12Concept> },
}

fn normalize_content_list(list: ContentList) -> Result<Vec<NormalizedContentItem>, ContentError> {
    let content = match list {
        ContentList::Bare(content) | ContentList::Wrapped { content } => content,
    };
    Ok(content.into_iter().map(Ck12Content::into_item).collect())
}

fn normalize_subjects(list: SubjectList) -> Result<Vec<NormalizedContentItem>, ContentError> {
    let entries = match list {
        SubjectList::Bare(entries) | SubjectList::Wrapped { subjects: entries } => entries,
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let subject = match entry {
                SubjectEntry::Name(name) if !name.trim().is_empty() => Ck12Subject {
                    name: Some(name),
                    ..Default::default()
                },
                SubjectEntry::Name(_) => return None,
                SubjectEntry::Subject(subject) => subject,
            };
            let name = subject.name.or(subject.title)?;
            Some(NormalizedContentItem {
                provider: ID.to_string(),
                id: subject.id.unwrap_or_else(|| name.to_lowercase()),
                description: subject.description.unwrap_or_default(),
                category: "subject".to_string(),
                subject: Some(name.clone()),
                title: name,
                ..Default::default()
            })
        })
        .collect())
}

fn normalize_concepts(list: ConceptList) -> Result<Vec<NormalizedContentItem>, ContentError> {
    let concepts = match list {
        ConceptList::Bare(concepts) | ConceptList::Wrapped { concepts } => concepts,
    };
    Ok(concepts
        .into_iter()
        .map(|concept| NormalizedContentItem {
            provider: ID.to_string(),
            id: concept.id.unwrap_or_default(),
            title: concept.title.or(concept.name).unwrap_or_default(),
            description: concept.description.unwrap_or_default(),
            category: "concept".to_string(),
            subject: concept.subject,
            grade_level: concept.grade_level,
            url: concept.url,
            ..Default::default()
        })
        .collect())
}

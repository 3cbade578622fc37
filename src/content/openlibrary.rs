//! OpenLibrary client
//!
//! Book search, work and author records, subject listings, plus the
//! grade-appropriateness heuristics used to build reading lists.

use serde::Deserialize;

use super::client::{AuthScheme, Call, ContentClient, ContentError, Endpoint, MONTH, WEEK};
use super::{dedupe_by_id, take, wire, NormalizedContentItem};

pub const ID: &str = "openlibrary";

const BASE_URL: &str = "https://openlibrary.org";
const COVERS_URL: &str = "https://covers.openlibrary.org/b/id";

const SEARCH: Endpoint = Endpoint::new("search", WEEK);
const WORK: Endpoint = Endpoint::new("book", MONTH);
const AUTHOR: Endpoint = Endpoint::new("author", MONTH);
const SUBJECT: Endpoint = Endpoint::new("subject", WEEK);

/// Words that make a title or subject unsuitable for grades 3 and below
const MATURE_KEYWORDS: [&str; 4] = ["adult", "mature", "teen", "young adult"];

const RECOMMENDATION_LIMIT: usize = 15;
const READING_LIST_LIMIT: usize = 10;

pub fn spec() -> super::ProviderSpec {
    super::ProviderSpec {
        id: ID,
        base_url: BASE_URL.to_string(),
        auth: AuthScheme::None,
    }
}

/// Cover image sizes served by the covers API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSize {
    Small,
    Medium,
    Large,
}

impl CoverSize {
    fn code(self) -> &'static str {
        match self {
            CoverSize::Small => "S",
            CoverSize::Medium => "M",
            CoverSize::Large => "L",
        }
    }
}

/// URL of a cover image by cover id
pub fn cover_url(cover_id: &str, size: CoverSize) -> String {
    format!("{}/{}-{}.jpg", COVERS_URL, cover_id, size.code())
}

/// Client for OpenLibrary books
#[derive(Debug, Clone)]
pub struct OpenLibrary {
    client: ContentClient,
}

impl OpenLibrary {
    pub fn new(client: ContentClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ContentClient {
        &self.client
    }

    /// Searches books by title, author or subject
    ///
    /// The grade filter runs over the cached result, so the same search at
    /// different grades shares one cache entry.
    pub async fn search_books(
        &self,
        query: &str,
        limit: usize,
        grade_level: Option<u8>,
    ) -> Vec<NormalizedContentItem> {
        let call = Call::new(&SEARCH, "/search.json")
            .param("q", query)
            .param("limit", limit);

        let result = self.client.fetch(call, normalize_search).await;
        let books = self.client.settle("search_books", result).unwrap_or_default();
        filter_by_grade_level(books, grade_level)
    }

    /// Work record, accepting either `OL45883W` or `/works/OL45883W`
    pub async fn book_details(&self, work_id: &str) -> Option<NormalizedContentItem> {
        let work_id = work_id.trim_start_matches("/works/");
        let call = Call::new(&WORK, "/works").segment(format!("{}.json", work_id));
        let result = self.client.fetch(call, normalize_work).await;
        self.client.settle("book_details", result)
    }

    /// Author record, accepting either `OL23919A` or `/authors/OL23919A`
    pub async fn author_details(&self, author_id: &str) -> Option<NormalizedContentItem> {
        let author_id = author_id.trim_start_matches("/authors/");
        let call = Call::new(&AUTHOR, "/authors").segment(format!("{}.json", author_id));
        let result = self.client.fetch(call, normalize_author).await;
        self.client.settle("author_details", result)
    }

    /// Works filed under a subject such as "science" or "history"
    pub async fn subject_books(
        &self,
        subject: &str,
        grade_level: Option<u8>,
        limit: usize,
    ) -> Vec<NormalizedContentItem> {
        let slug = subject.trim().to_lowercase().replace(' ', "_");
        let call = Call::new(&SUBJECT, "/subjects").segment(format!("{}.json", slug));

        let result = self.client.fetch(call, normalize_subject_works).await;
        let books = self.client.settle("subject_books", result).unwrap_or_default();
        take(filter_by_grade_level(books, grade_level), limit)
    }

    /// Books found by searching the reading-band keywords for a grade
    pub async fn grade_level_books(&self, grade_level: u8, limit: usize) -> Vec<NormalizedContentItem> {
        let keywords = grade_keywords(grade_level);
        let per_keyword = (limit / keywords.len()).max(1);

        let mut books = Vec::new();
        for keyword in keywords {
            books.extend(self.search_books(keyword, per_keyword, None).await);
        }
        take(dedupe_by_id(books), limit)
    }

    /// Books matching a reader's interests and grade
    pub async fn reading_recommendations(
        &self,
        interests: &[String],
        grade_level: Option<u8>,
    ) -> Vec<NormalizedContentItem> {
        let mut books = Vec::new();
        for interest in interests {
            books.extend(self.subject_books(interest, grade_level, 5).await);
        }
        if let Some(grade) = grade_level {
            books.extend(self.grade_level_books(grade, 10).await);
        }
        take(dedupe_by_id(books), RECOMMENDATION_LIMIT)
    }

    /// Curated list for a grade, from given subjects or the grade's defaults
    pub async fn reading_list(&self, grade_level: u8, subjects: Option<&[String]>) -> Vec<NormalizedContentItem> {
        let mut books = Vec::new();
        match subjects {
            Some(subjects) => {
                for subject in subjects {
                    books.extend(self.subject_books(subject, Some(grade_level), 5).await);
                }
            }
            None => {
                for subject in default_subjects(grade_level) {
                    books.extend(self.subject_books(subject, Some(grade_level), 3).await);
                }
            }
        }
        take(dedupe_by_id(books), READING_LIST_LIMIT)
    }
}

/// Estimated reading grade from a book's subject tags
pub fn reading_level(book: &NormalizedContentItem) -> u8 {
    let has = |needle: &str| {
        book.keywords
            .iter()
            .any(|subject| subject.to_lowercase().contains(needle))
    };

    if has("picture book") {
        1
    } else if has("early reader") {
        2
    } else if has("chapter book") {
        3
    } else if has("middle grade") {
        5
    } else if has("young adult") {
        8
    } else {
        5
    }
}

/// Drops books whose title or subjects are too mature for grades 3 and below
pub fn filter_by_grade_level(
    books: Vec<NormalizedContentItem>,
    grade_level: Option<u8>,
) -> Vec<NormalizedContentItem> {
    match grade_level {
        Some(grade) if grade <= 3 => books
            .into_iter()
            .filter(|book| {
                let title = book.title.to_lowercase();
                !MATURE_KEYWORDS.iter().any(|keyword| {
                    title.contains(keyword)
                        || book
                            .keywords
                            .iter()
                            .any(|subject| subject.to_lowercase().contains(keyword))
                })
            })
            .collect(),
        _ => books,
    }
}

fn grade_keywords(grade_level: u8) -> &'static [&'static str] {
    match grade_level {
        1 => &["beginner", "early reader", "picture book"],
        2 => &["early reader", "chapter book", "beginner"],
        3 => &["chapter book", "intermediate", "elementary"],
        4 => &["intermediate", "middle grade", "elementary"],
        5 => &["middle grade", "intermediate", "upper elementary"],
        6 => &["middle grade", "young adult", "intermediate"],
        7 => &["young adult", "middle grade", "teen"],
        8 => &["young adult", "teen", "adolescent"],
        9..=11 => &["young adult", "teen", "high school"],
        12 => &["young adult", "adult", "high school"],
        _ => &["young adult"],
    }
}

fn default_subjects(grade_level: u8) -> &'static [&'static str] {
    match grade_level {
        1 => &["animals", "nature", "family"],
        2 => &["science", "history", "adventure"],
        3 => &["mystery", "fantasy", "science"],
        4 => &["history", "science", "adventure"],
        5 => &["fantasy", "science", "history"],
        6 => &["mystery", "adventure", "science"],
        7 => &["fantasy", "history", "science"],
        8 => &["young adult", "science", "history"],
        9 | 11 => &["young adult", "classic", "science"],
        10 => &["young adult", "classic", "history"],
        12 => &["young adult", "classic", "literature"],
        _ => &["young adult"],
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchDoc {
    #[serde(deserialize_with = "wire::text")]
    key: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    title: Option<String>,
    #[serde(deserialize_with = "wire::strings")]
    author_name: Vec<String>,
    #[serde(deserialize_with = "wire::strings")]
    subject: Vec<String>,
    #[serde(deserialize_with = "wire::text")]
    cover_i: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubjectResponse {
    works: Vec<SubjectWork>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubjectWork {
    #[serde(deserialize_with = "wire::text")]
    key: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    title: Option<String>,
    authors: Vec<AuthorRef>,
    #[serde(deserialize_with = "wire::strings")]
    subject: Vec<String>,
    #[serde(deserialize_with = "wire::text")]
    cover_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuthorRef {
    #[serde(deserialize_with = "wire::text")]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Work {
    #[serde(deserialize_with = "wire::text")]
    key: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    title: Option<String>,
    /// Plain string or `{"type": "/type/text", "value": ...}`
    #[serde(deserialize_with = "wire::text")]
    description: Option<String>,
    #[serde(deserialize_with = "wire::strings")]
    subjects: Vec<String>,
    /// Cover ids; OpenLibrary uses -1 for a removed cover
    covers: Vec<Option<i64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Author {
    #[serde(deserialize_with = "wire::text")]
    key: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    name: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    bio: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    birth_date: Option<String>,
}

fn book_item(
    key: String,
    title: String,
    authors: &[String],
    subjects: Vec<String>,
    cover_id: Option<String>,
) -> NormalizedContentItem {
    let description = if authors.is_empty() {
        String::new()
    } else {
        format!("by {}", authors.join(", "))
    };

    NormalizedContentItem {
        provider: ID.to_string(),
        url: Some(format!("{}{}", BASE_URL, key)),
        id: key,
        title,
        description,
        category: "book".to_string(),
        subject: subjects.first().cloned(),
        grade_level: None,
        media_url: cover_id.map(|id| cover_url(&id, CoverSize::Medium)),
        keywords: subjects,
        duration_secs: None,
    }
}

fn normalize_search(response: SearchResponse) -> Result<Vec<NormalizedContentItem>, ContentError> {
    Ok(response
        .docs
        .into_iter()
        .map(|doc| {
            book_item(
                doc.key.unwrap_or_default(),
                doc.title.unwrap_or_default(),
                &doc.author_name,
                doc.subject,
                doc.cover_i,
            )
        })
        .collect())
}

fn normalize_subject_works(response: SubjectResponse) -> Result<Vec<NormalizedContentItem>, ContentError> {
    Ok(response
        .works
        .into_iter()
        .map(|work| {
            let authors: Vec<String> = work.authors.into_iter().filter_map(|a| a.name).collect();
            book_item(
                work.key.unwrap_or_default(),
                work.title.unwrap_or_default(),
                &authors,
                work.subject,
                work.cover_id,
            )
        })
        .collect())
}

fn normalize_work(work: Work) -> Result<NormalizedContentItem, ContentError> {
    let cover = work
        .covers
        .into_iter()
        .flatten()
        .find(|id| *id > 0)
        .map(|id| id.to_string());

    let mut item = book_item(
        work.key.unwrap_or_default(),
        work.title.unwrap_or_default(),
        &[],
        work.subjects,
        cover,
    );
    item.description = work.description.unwrap_or_default();
    Ok(item)
}

fn normalize_author(author: Author) -> Result<NormalizedContentItem, ContentError> {
    let key = author.key.unwrap_or_default();
    Ok(NormalizedContentItem {
        provider: ID.to_string(),
        url: Some(format!("{}{}", BASE_URL, key)),
        id: key,
        title: author.name.unwrap_or_default(),
        description: author.bio.unwrap_or_default(),
        category: "author".to_string(),
        keywords: author.birth_date.into_iter().collect(),
        ..Default::default()
    })
}

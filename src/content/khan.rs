//! Khan Academy content client
//!
//! Videos, exercises and subject topics from the Khan Academy API.

use serde::{Deserialize, Serialize};

use super::client::{AuthScheme, Call, ContentClient, ContentError, Endpoint, MONTH, WEEK};
use super::{wire, NormalizedContentItem};

pub const ID: &str = "khan_academy";

const BASE_URL: &str = "https://www.khanacademy.org/api/v1";

const VIDEO_SEARCH: Endpoint = Endpoint::new("videos", WEEK);
const VIDEO: Endpoint = Endpoint::new("video", WEEK);
const EXERCISES: Endpoint = Endpoint::new("exercises", WEEK);
const TOPICS: Endpoint = Endpoint::new("topics", MONTH);

/// Number of videos requested when gathering a whole subject
const SUBJECT_VIDEO_LIMIT: usize = 20;

/// Everything Khan Academy has for one subject
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubjectContent {
    pub videos: Vec<NormalizedContentItem>,
    pub exercises: Vec<NormalizedContentItem>,
    pub topics: Vec<NormalizedContentItem>,
}

/// Provider description; the API is public, an optional key is sent as `api_key`
pub fn spec(api_key: Option<String>) -> super::ProviderSpec {
    super::ProviderSpec {
        id: ID,
        base_url: BASE_URL.to_string(),
        auth: match api_key {
            Some(key) => AuthScheme::QueryKey {
                param: "api_key",
                key,
            },
            None => AuthScheme::None,
        },
    }
}

/// Client for Khan Academy videos and exercises
#[derive(Debug, Clone)]
pub struct KhanAcademy {
    client: ContentClient,
}

impl KhanAcademy {
    pub fn new(client: ContentClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ContentClient {
        &self.client
    }

    /// Searches videos by topic, optionally narrowed to a grade level
    pub async fn search_videos(
        &self,
        topic: &str,
        grade_level: Option<u8>,
        limit: usize,
    ) -> Vec<NormalizedContentItem> {
        let call = Call::new(&VIDEO_SEARCH, "/videos")
            .param("query", topic)
            .param("limit", limit)
            .param_opt("grade_level", grade_level);

        let result = self.client.fetch(call, normalize_videos).await;
        self.client.settle("search_videos", result).unwrap_or_default()
    }

    /// Fetches a single video's metadata
    pub async fn video(&self, video_id: &str) -> Option<NormalizedContentItem> {
        let call = Call::new(&VIDEO, "/videos").segment(video_id);
        let result = self
            .client
            .fetch(call, |video: KhanVideo| Ok(video.into_item()))
            .await;
        self.client.settle("video", result)
    }

    /// Interactive exercises for a subject
    pub async fn exercises(&self, subject: &str, grade_level: Option<u8>) -> Vec<NormalizedContentItem> {
        let call = Call::new(&EXERCISES, "/exercises")
            .param("subject", subject)
            .param_opt("grade_level", grade_level);

        let result = self.client.fetch(call, normalize_exercises).await;
        self.client.settle("exercises", result).unwrap_or_default()
    }

    /// Topic tree for a subject
    pub async fn subject_topics(&self, subject: &str) -> Vec<NormalizedContentItem> {
        let call = Call::new(&TOPICS, "/subjects")
            .segment(subject)
            .segment("topics");
        let subject = subject.to_string();

        let result = self
            .client
            .fetch(call, move |topics: TopicList| Ok(normalize_topics(topics, &subject)))
            .await;
        self.client.settle("subject_topics", result).unwrap_or_default()
    }

    /// Videos, exercises and topics for a subject, fetched concurrently
    pub async fn subject_content(&self, subject: &str, grade_level: Option<u8>) -> SubjectContent {
        let (videos, exercises, topics) = futures::join!(
            self.search_videos(subject, grade_level, SUBJECT_VIDEO_LIMIT),
            self.exercises(subject, grade_level),
            self.subject_topics(subject),
        );

        SubjectContent {
            videos,
            exercises,
            topics,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KhanVideo {
    #[serde(deserialize_with = "wire::text")]
    id: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    title: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    description: Option<String>,
    #[serde(deserialize_with = "wire::seconds")]
    duration: Option<u32>,
    #[serde(deserialize_with = "wire::text")]
    thumbnail_url: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    url: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    subject: Option<String>,
    #[serde(deserialize_with = "wire::grade")]
    grade_level: Option<u8>,
    #[serde(deserialize_with = "wire::strings")]
    keywords: Vec<String>,
}

impl KhanVideo {
    fn into_item(self) -> NormalizedContentItem {
        NormalizedContentItem {
            provider: ID.to_string(),
            id: self.id.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            category: "video".to_string(),
            subject: self.subject,
            grade_level: self.grade_level,
            media_url: self.thumbnail_url,
            url: self.url,
            keywords: self.keywords,
            duration_secs: self.duration,
        }
    }
}

/// Video search results, bare or wrapped
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VideoList {
    Bare(Vec<KhanVideo>),
    Wrapped {
        #[serde(alias = "items")]
        videos: Vec<KhanVideo>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KhanExercise {
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
    url: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    difficulty: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExerciseList {
    Bare(Vec<KhanExercise>),
    Wrapped {
        #[serde(alias = "items")]
        exercises: Vec<KhanExercise>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KhanTopic {
    #[serde(deserialize_with = "wire::text")]
    id: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    slug: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    title: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    description: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    url: Option<String>,
}

/// Topic trees list either plain names or topic records
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TopicEntry {
    Name(String),
    Topic(KhanTopic),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TopicList {
    Bare(Vec<TopicEntry>),
    Wrapped {
        #[serde(alias = "children")]
        topics: Vec<TopicEntry>,
    },
}

fn normalize_videos(list: VideoList) -> Result<Vec<NormalizedContentItem>, ContentError> {
    let videos = match list {
        VideoList::Bare(videos) | VideoList::Wrapped { videos } => videos,
    };
    Ok(videos.into_iter().map(KhanVideo::into_item).collect())
}

fn normalize_exercises(list: ExerciseList) -> Result<Vec<NormalizedContentItem>, ContentError> {
    let exercises = match list {
        ExerciseList::Bare(exercises) | ExerciseList::Wrapped { exercises } => exercises,
    };
    Ok(exercises
        .into_iter()
        .map(|exercise| NormalizedContentItem {
            provider: ID.to_string(),
            id: exercise.id.unwrap_or_default(),
            title: exercise.title.unwrap_or_default(),
            description: exercise.description.unwrap_or_default(),
            category: exercise.kind.unwrap_or_else(|| "exercise".to_string()),
            subject: exercise.subject,
            grade_level: exercise.grade_level,
            media_url: None,
            url: exercise.url,
            keywords: exercise.difficulty.into_iter().collect(),
            duration_secs: None,
        })
        .collect())
}

fn normalize_topics(list: TopicList, subject: &str) -> Vec<NormalizedContentItem> {
    let entries = match list {
        TopicList::Bare(entries) | TopicList::Wrapped { topics: entries } => entries,
    };
    entries
        .into_iter()
        .map(|entry| {
            let topic = match entry {
                TopicEntry::Name(name) => KhanTopic {
                    title: Some(name),
                    ..Default::default()
                },
                TopicEntry::Topic(topic) => topic,
            };
            let title = topic.title.unwrap_or_default();
            NormalizedContentItem {
                provider: ID.to_string(),
                id: topic.id.or(topic.slug).unwrap_or_else(|| title.clone()),
                title,
                description: topic.description.unwrap_or_default(),
                category: "topic".to_string(),
                subject: Some(subject.to_string()),
                url: topic.url,
                ..Default::default()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::testing::{client_for, FakeTransport};
    use serde_json::json;
    use std::sync::Arc;

    const VIDEOS: &str = r#"[
        {
            "id": "v1",
            "title": "Intro to fractions",
            "description": "Halves and quarters",
            "duration": 540,
            "thumbnail_url": "https://cdn.kastatic.org/v1.png",
            "url": "https://www.khanacademy.org/v/v1",
            "subject": "math",
            "grade_level": 3
        },
        {
            "id": "v2",
            "title": "Comparing fractions",
            "subject": "math",
            "grade_level": "3"
        }
    ]"#;

    fn khan(transport: &Arc<FakeTransport>) -> (KhanAcademy, tempfile::TempDir) {
        let (client, dir) = client_for(spec(None), transport);
        (KhanAcademy::new(client), dir)
    }

    #[test]
    fn test_normalize_videos() {
        let list: VideoList = serde_json::from_str(VIDEOS).unwrap();

        let videos = normalize_videos(list).expect("Should normalize");

        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].id, "v1");
        assert_eq!(videos[0].category, "video");
        assert_eq!(videos[0].grade_level, Some(3));
        assert_eq!(videos[0].media_url.as_deref(), Some("https://cdn.kastatic.org/v1.png"));
        assert_eq!(videos[0].duration_secs, Some(540));
        assert_eq!(videos[1].grade_level, Some(3));
        assert_eq!(videos[1].media_url, None);
        assert_eq!(videos[1].duration_secs, None);
    }

    #[test]
    fn test_wrapped_video_list_and_malformed_body() {
        let wrapped: VideoList = serde_json::from_value(json!({"items": [{"id": "v9"}]})).unwrap();
        assert_eq!(normalize_videos(wrapped).unwrap()[0].id, "v9");

        assert!(serde_json::from_value::<VideoList>(json!({"error": "nope"})).is_err());
    }

    #[test]
    fn test_normalize_topics_accepts_plain_strings() {
        let list: TopicList =
            serde_json::from_value(json!(["Arithmetic", {"id": "alg", "title": "Algebra"}])).unwrap();

        let topics = normalize_topics(list, "math");

        assert_eq!(topics[0].id, "Arithmetic");
        assert_eq!(topics[1].id, "alg");
        assert_eq!(topics[1].subject.as_deref(), Some("math"));
    }

    #[tokio::test]
    async fn test_search_videos_sends_query_and_caches() {
        let transport = Arc::new(FakeTransport::json(serde_json::from_str(VIDEOS).unwrap()));
        let (khan, _dir) = khan(&transport);

        let first = khan.search_videos("fractions", Some(3), 10).await;
        let second = khan.search_videos("fractions", Some(3), 10).await;

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "https://www.khanacademy.org/api/v1/videos");
        assert_eq!(calls[0].param("query"), Some("fractions"));
        assert_eq!(calls[0].param("grade_level"), Some("3"));
        assert_eq!(calls[0].param("api_key"), None);
    }

    #[tokio::test]
    async fn test_api_key_is_forwarded_when_configured() {
        let transport = Arc::new(FakeTransport::json(json!([])));
        let (client, _dir) = client_for(spec(Some("k".to_string())), &transport);

        KhanAcademy::new(client).exercises("math", None).await;

        assert_eq!(transport.calls()[0].param("api_key"), Some("k"));
    }

    #[tokio::test]
    async fn test_video_and_topic_paths_encode_caller_input() {
        let transport = Arc::new(FakeTransport::json(json!({"id": "x", "title": "X"})));
        let (khan, _dir) = khan(&transport);

        khan.video("a/b?c").await;
        khan.subject_topics("arts & humanities").await;

        let calls = transport.calls();
        assert_eq!(calls[0].url, "https://www.khanacademy.org/api/v1/videos/a%2Fb%3Fc");
        assert_eq!(
            calls[1].url,
            "https://www.khanacademy.org/api/v1/subjects/arts%20&%20humanities/topics"
        );
    }

    #[tokio::test]
    async fn test_video_not_found_is_none() {
        let transport = Arc::new(FakeTransport::failing(ContentError::NotFound));
        let (khan, _dir) = khan(&transport);

        assert!(khan.video("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_subject_content_survives_partial_failure() {
        let transport = Arc::new(FakeTransport::new(|request| {
            if request.url.ends_with("/exercises") {
                Ok(json!([{"id": "e1", "title": "Add fractions", "type": "exercise"}]))
            } else {
                Err(ContentError::Transport("connection refused".to_string()))
            }
        }));
        let (khan, _dir) = khan(&transport);

        let content = khan.subject_content("math", Some(4)).await;

        assert!(content.videos.is_empty());
        assert!(content.topics.is_empty());
        assert_eq!(content.exercises.len(), 1);
        assert_eq!(transport.call_count(), 3);
    }
}

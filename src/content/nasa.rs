//! NASA open API client
//!
//! Astronomy Picture of the Day, Mars rover photos, EPIC earth imagery,
//! image search, DONKI space weather notifications and TechPort missions.
//! Every request carries `api_key`; without one the public `DEMO_KEY` is used.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use super::client::{AuthScheme, Call, ContentClient, ContentError, Endpoint, DAY, HOUR, MONTH, WEEK};
use super::{take, wire, NormalizedContentItem};

pub const ID: &str = "nasa";

const BASE_URL: &str = "https://api.nasa.gov";

/// Shared rate-limited key NASA hands out for anonymous use
pub const DEMO_KEY: &str = "DEMO_KEY";

const APOD: Endpoint = Endpoint::new("apod", DAY);
const MARS_PHOTOS: Endpoint = Endpoint::new("mars_photos", WEEK);
const EARTH: Endpoint = Endpoint::new("earth", DAY);
const IMAGE_SEARCH: Endpoint = Endpoint::new("search", WEEK);
const SPACE_WEATHER: Endpoint = Endpoint::new("space_weather", SIX_HOURS);
const MISSION: Endpoint = Endpoint::new("mission", MONTH);

const SIX_HOURS: Duration = Duration::from_secs(6 * HOUR.as_secs());

/// Sol used when the caller does not ask for one
const DEFAULT_SOL: u32 = 1000;

const EPIC_ARCHIVE: &str = "https://epic.gsfc.nasa.gov/archive/natural";

pub fn spec(api_key: Option<String>) -> super::ProviderSpec {
    super::ProviderSpec {
        id: ID,
        base_url: BASE_URL.to_string(),
        auth: AuthScheme::QueryKey {
            param: "api_key",
            key: api_key.unwrap_or_else(|| DEMO_KEY.to_string()),
        },
    }
}

/// Client for NASA's public APIs
#[derive(Debug, Clone)]
pub struct Nasa {
    client: ContentClient,
}

impl Nasa {
    pub fn new(client: ContentClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ContentClient {
        &self.client
    }

    /// Astronomy Picture of the Day, for `date` or today
    pub async fn apod(&self, date: Option<NaiveDate>) -> Option<NormalizedContentItem> {
        let call = Call::new(&APOD, "/planetary/apod")
            .param_opt("date", date.map(|d| d.format("%Y-%m-%d").to_string()));

        let result = self.client.fetch(call, normalize_apod).await;
        self.client.settle("apod", result)
    }

    /// Curiosity rover photos for a sol and camera ("all" for every camera)
    pub async fn mars_photos(
        &self,
        sol: Option<u32>,
        camera: &str,
        limit: usize,
    ) -> Vec<NormalizedContentItem> {
        let call = Call::new(&MARS_PHOTOS, "/mars-photos/api/v1/rovers/curiosity/photos")
            .param("sol", sol.unwrap_or(DEFAULT_SOL))
            .param("camera", camera);

        let result = self.client.fetch(call, normalize_mars_photos).await;
        take(self.client.settle("mars_photos", result).unwrap_or_default(), limit)
    }

    /// Full-disc earth images from the EPIC camera, latest or for `date`
    pub async fn earth_imagery(&self, date: Option<NaiveDate>) -> Vec<NormalizedContentItem> {
        let call = match date {
            Some(date) => Call::new(&EARTH, "/EPIC/api/natural/date")
                .segment(date.format("%Y-%m-%d").to_string()),
            None => Call::new(&EARTH, "/EPIC/api/natural"),
        };

        let result = self.client.fetch(call, normalize_epic).await;
        self.client.settle("earth_imagery", result).unwrap_or_default()
    }

    /// Searches the NASA image library
    pub async fn search_images(&self, query: &str, limit: usize) -> Vec<NormalizedContentItem> {
        let call = Call::new(&IMAGE_SEARCH, "/search")
            .param("q", query)
            .param("media_type", "image");

        let result = self.client.fetch(call, normalize_image_search).await;
        take(self.client.settle("search_images", result).unwrap_or_default(), limit)
    }

    /// Recent space weather notifications
    pub async fn space_weather(&self) -> Vec<NormalizedContentItem> {
        let call = Call::new(&SPACE_WEATHER, "/DONKI/notifications")
            .param("type", "all")
            .singleton("space_weather");

        let result = self.client.fetch(call, normalize_notifications).await;
        self.client.settle("space_weather", result).unwrap_or_default()
    }

    /// First TechPort project whose title mentions `mission_name`
    pub async fn mission(&self, mission_name: &str) -> Option<NormalizedContentItem> {
        let needle = mission_name.to_lowercase();
        let call = Call::new(&MISSION, "/techport/api/projects").key_part("mission", &needle);

        let result = self
            .client
            .fetch(call, move |projects: ProjectList| find_mission(projects, &needle))
            .await;
        self.client.settle("mission", result)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Apod {
    #[serde(deserialize_with = "wire::text")]
    date: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    title: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    explanation: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    url: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    hdurl: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MarsPhotos {
    #[serde(alias = "latest_photos")]
    photos: Vec<MarsPhoto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MarsPhoto {
    #[serde(deserialize_with = "wire::text")]
    id: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    img_src: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    earth_date: Option<String>,
    camera: NamedThing,
    rover: NamedThing,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NamedThing {
    #[serde(deserialize_with = "wire::text")]
    name: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    full_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EpicFrame {
    #[serde(deserialize_with = "wire::text")]
    identifier: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    image: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    date: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageSearch {
    collection: ImageCollection,
}

#[derive(Debug, Deserialize)]
struct ImageCollection {
    items: Vec<ImageItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageItem {
    #[serde(deserialize_with = "wire::text")]
    href: Option<String>,
    data: Vec<ImageData>,
    links: Vec<ImageLink>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageData {
    #[serde(deserialize_with = "wire::text")]
    nasa_id: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    title: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    description: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    media_type: Option<String>,
    #[serde(deserialize_with = "wire::strings")]
    keywords: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageLink {
    #[serde(deserialize_with = "wire::text")]
    href: Option<String>,
}

/// DONKI answers an empty period with an empty body rather than `[]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Notifications {
    List(Vec<Notification>),
    Blank(Option<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Notification {
    #[serde(rename = "messageID", deserialize_with = "wire::text")]
    message_id: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    message_type: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    message_body: Option<String>,
    #[serde(rename = "messageURL", deserialize_with = "wire::text")]
    message_url: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    message_issue_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProjectList {
    Bare(Vec<Project>),
    Wrapped { projects: Vec<Project> },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Project {
    #[serde(rename = "projectId", deserialize_with = "wire::text")]
    project_id: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    id: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    title: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    description: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    benefits: Option<String>,
    #[serde(deserialize_with = "wire::text")]
    website: Option<String>,
}

fn science_item(id: String, title: String, category: String) -> NormalizedContentItem {
    NormalizedContentItem {
        provider: ID.to_string(),
        id,
        title,
        category,
        subject: Some("science".to_string()),
        ..Default::default()
    }
}

fn normalize_apod(apod: Apod) -> Result<NormalizedContentItem, ContentError> {
    let title = apod.title.ok_or(ContentError::NotFound)?;
    let mut item = science_item(
        apod.date.unwrap_or_else(|| title.clone()),
        title,
        apod.media_type.unwrap_or_else(|| "image".to_string()),
    );
    item.description = apod.explanation.unwrap_or_default();
    item.url = apod.hdurl.or_else(|| apod.url.clone());
    item.media_url = apod.url;
    Ok(item)
}

fn normalize_mars_photos(response: MarsPhotos) -> Result<Vec<NormalizedContentItem>, ContentError> {
    Ok(response
        .photos
        .into_iter()
        .map(|photo| {
            let camera = photo
                .camera
                .full_name
                .or(photo.camera.name)
                .unwrap_or_else(|| "Camera".to_string());
            let rover = photo.rover.name.unwrap_or_else(|| "Curiosity".to_string());

            let mut item = science_item(
                photo.id.unwrap_or_default(),
                format!("{} - {}", rover, camera),
                "photo".to_string(),
            );
            item.description = format!("Taken on {}", photo.earth_date.unwrap_or_default());
            item.media_url = photo.img_src;
            item.keywords = vec!["mars".to_string(), rover.to_lowercase()];
            item
        })
        .collect())
}

fn normalize_epic(frames: Vec<EpicFrame>) -> Result<Vec<NormalizedContentItem>, ContentError> {
    Ok(frames
        .into_iter()
        .map(|frame| {
            let image = frame.image.unwrap_or_default();
            let date = frame.date.unwrap_or_default();
            let mut item = science_item(
                frame.identifier.unwrap_or_else(|| image.clone()),
                format!("Earth from EPIC, {}", date),
                "image".to_string(),
            );
            item.description = frame.caption.unwrap_or_default();
            item.media_url = epic_image_url(&date, &image);
            item.keywords = vec!["earth".to_string()];
            item
        })
        .collect())
}

/// Archive URL for an EPIC frame, from its "YYYY-MM-DD hh:mm:ss" date
fn epic_image_url(date: &str, image: &str) -> Option<String> {
    if image.is_empty() {
        return None;
    }
    let day = date.split_whitespace().next()?;
    let parsed = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
    Some(format!(
        "{}/{}/png/{}.png",
        EPIC_ARCHIVE,
        parsed.format("%Y/%m/%d"),
        image
    ))
}

fn normalize_image_search(search: ImageSearch) -> Result<Vec<NormalizedContentItem>, ContentError> {
    Ok(search
        .collection
        .items
        .into_iter()
        .filter_map(|item| {
            let data = item.data.into_iter().next()?;
            let mut normalized = science_item(
                data.nasa_id.unwrap_or_default(),
                data.title.unwrap_or_else(|| "NASA Image".to_string()),
                data.media_type.unwrap_or_else(|| "image".to_string()),
            );
            normalized.description = data.description.unwrap_or_default();
            normalized.media_url = item.links.into_iter().next().and_then(|link| link.href);
            normalized.url = item.href;
            normalized.keywords = data.keywords;
            Some(normalized)
        })
        .collect())
}

fn normalize_notifications(body: Notifications) -> Result<Vec<NormalizedContentItem>, ContentError> {
    let notes = match body {
        Notifications::List(notes) => notes,
        Notifications::Blank(None) => Vec::new(),
        Notifications::Blank(Some(text)) if text.trim().is_empty() => Vec::new(),
        Notifications::Blank(Some(text)) => {
            return Err(ContentError::Parse(format!("unexpected notification body: {}", text)))
        }
    };

    Ok(notes
        .into_iter()
        .map(|note| {
            let kind = note.message_type.unwrap_or_else(|| "Report".to_string());
            let mut item = science_item(
                note.message_id.unwrap_or_default(),
                format!("{} notification", kind),
                kind,
            );
            item.description = note.message_body.unwrap_or_default();
            item.url = note.message_url;
            item.keywords = note.message_issue_time.into_iter().collect();
            item
        })
        .collect())
}

fn find_mission(projects: ProjectList, needle: &str) -> Result<NormalizedContentItem, ContentError> {
    let projects = match projects {
        ProjectList::Bare(projects) | ProjectList::Wrapped { projects } => projects,
    };
    let project = projects
        .into_iter()
        .find(|project| {
            project
                .title
                .as_deref()
                .map(|title| title.to_lowercase().contains(needle))
                .unwrap_or(false)
        })
        .ok_or(ContentError::NotFound)?;

    let mut item = science_item(
        project.project_id.or(project.id).unwrap_or_default(),
        project.title.unwrap_or_default(),
        "mission".to_string(),
    );
    item.description = project.description.or(project.benefits).unwrap_or_default();
    item.url = project.website;
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::testing::{client_for, FakeTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn nasa(transport: &Arc<FakeTransport>, key: Option<&str>) -> (Nasa, tempfile::TempDir) {
        let (client, dir) = client_for(spec(key.map(str::to_string)), transport);
        (Nasa::new(client), dir)
    }

    fn search_body() -> serde_json::Value {
        json!({
            "collection": {
                "items": [
                    {
                        "href": "https://images-assets.nasa.gov/image/PIA1/collection.json",
                        "data": [{"nasa_id": "PIA1", "title": "Mars surface", "description": "Red dust", "media_type": "image", "keywords": ["Mars"]}],
                        "links": [{"href": "https://images-assets.nasa.gov/image/PIA1/PIA1~thumb.jpg"}]
                    },
                    {
                        "data": [{"nasa_id": "PIA2", "title": "Olympus Mons"}],
                        "links": []
                    },
                    {"href": "no data"}
                ]
            }
        })
    }

    #[test]
    fn test_demo_key_used_without_credentials() {
        match spec(None).auth {
            AuthScheme::QueryKey { key, .. } => assert_eq!(key, DEMO_KEY),
            other => panic!("unexpected auth {:?}", other),
        }
    }

    #[test]
    fn test_normalize_image_search_skips_items_without_data() {
        let search: ImageSearch = serde_json::from_value(search_body()).unwrap();

        let items = normalize_image_search(search).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "PIA1");
        assert_eq!(
            items[0].media_url.as_deref(),
            Some("https://images-assets.nasa.gov/image/PIA1/PIA1~thumb.jpg")
        );
        assert_eq!(items[0].keywords, vec!["Mars"]);
        assert_eq!(items[1].media_url, None);
    }

    #[test]
    fn test_epic_image_url() {
        assert_eq!(
            epic_image_url("2015-10-31 00:36:33", "epic_1b_20151031003633").as_deref(),
            Some("https://epic.gsfc.nasa.gov/archive/natural/2015/10/31/png/epic_1b_20151031003633.png")
        );
        assert_eq!(epic_image_url("garbage", "x"), None);
        assert_eq!(epic_image_url("2015-10-31 00:36:33", ""), None);
    }

    #[test]
    fn test_space_weather_empty_string_body() {
        let blank: Notifications = serde_json::from_value(json!("")).unwrap();
        let null: Notifications = serde_json::from_value(json!(null)).unwrap();

        assert!(normalize_notifications(blank).unwrap().is_empty());
        assert!(normalize_notifications(null).unwrap().is_empty());
    }

    #[test]
    fn test_space_weather_notifications() {
        let body: Notifications = serde_json::from_value(json!([{
            "messageID": "20240501-AL-001",
            "messageType": "FLR",
            "messageBody": "An M-class flare was observed.",
            "messageURL": "https://kauai.ccmc.gsfc.nasa.gov/DONKI/view/Alert/1",
            "messageIssueTime": "2024-05-01T12:00Z"
        }]))
        .unwrap();

        let notes = normalize_notifications(body).unwrap();

        assert_eq!(notes[0].id, "20240501-AL-001");
        assert_eq!(notes[0].title, "FLR notification");
        assert_eq!(notes[0].keywords, vec!["2024-05-01T12:00Z"]);
    }

    #[test]
    fn test_apod_without_title_is_not_found() {
        let apod: Apod = serde_json::from_value(json!({"date": "2024-01-01"})).unwrap();
        assert_eq!(normalize_apod(apod), Err(ContentError::NotFound));
    }

    #[test]
    fn test_image_search_without_collection_is_parse_error() {
        assert!(serde_json::from_value::<ImageSearch>(json!({"reason": "rate limited"})).is_err());
    }

    #[tokio::test]
    async fn test_earth_imagery_for_date_path() {
        let transport = Arc::new(FakeTransport::json(json!([
            {"identifier": "20151031003633", "image": "epic_1b_20151031003633",
             "date": "2015-10-31 00:36:33", "caption": "Full disc"}
        ])));
        let (nasa, _dir) = nasa(&transport, None);

        let frames = nasa.earth_imagery(NaiveDate::from_ymd_opt(2015, 10, 31)).await;

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id, "20151031003633");
        assert_eq!(
            transport.calls()[0].url,
            "https://api.nasa.gov/EPIC/api/natural/date/2015-10-31"
        );
    }

    #[tokio::test]
    async fn test_search_images_limits_after_caching() {
        let transport = Arc::new(FakeTransport::json(search_body()));
        let (nasa, _dir) = nasa(&transport, Some("abc"));

        let one = nasa.search_images("mars", 1).await;
        let all = nasa.search_images("mars", 10).await;

        assert_eq!(one.len(), 1);
        assert_eq!(all.len(), 2);
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].param("api_key"), Some("abc"));
        assert_eq!(calls[0].param("q"), Some("mars"));
        assert_eq!(calls[0].param("media_type"), Some("image"));
    }

    #[tokio::test]
    async fn test_apod_for_date() {
        let transport = Arc::new(FakeTransport::json(json!({
            "date": "2024-07-15",
            "title": "Jupiter's Moons",
            "explanation": "Four Galilean moons",
            "url": "https://apod.nasa.gov/apod/image/jupiter.jpg",
            "media_type": "image"
        })));
        let (nasa, _dir) = nasa(&transport, None);

        let apod = nasa
            .apod(NaiveDate::from_ymd_opt(2024, 7, 15))
            .await
            .expect("Should return APOD");

        assert_eq!(apod.id, "2024-07-15");
        assert_eq!(apod.title, "Jupiter's Moons");
        assert_eq!(transport.calls()[0].param("date"), Some("2024-07-15"));
    }

    #[tokio::test]
    async fn test_mission_lookup_caches_only_matches() {
        let transport = Arc::new(FakeTransport::json(json!({
            "projects": [
                {"projectId": 1, "title": "Artemis Lander"},
                {"projectId": 2, "title": "Europa Clipper"}
            ]
        })));
        let (nasa, _dir) = nasa(&transport, None);

        let found = nasa.mission("Europa").await.expect("Should find mission");
        assert_eq!(found.id, "2");

        assert!(nasa.mission("Voyager").await.is_none());
        assert_eq!(nasa.client().cache_stats().unwrap().file_count, 1);

        nasa.mission("europa").await;
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mars_photos_default_sol() {
        let transport = Arc::new(FakeTransport::json(json!({
            "photos": [
                {"id": 10, "img_src": "https://mars.nasa.gov/1.jpg", "earth_date": "2015-05-30",
                 "camera": {"name": "FHAZ", "full_name": "Front Hazard Avoidance Camera"},
                 "rover": {"name": "Curiosity"}}
            ]
        })));
        let (nasa, _dir) = nasa(&transport, None);

        let photos = nasa.mars_photos(None, "all", 5).await;

        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].title, "Curiosity - Front Hazard Avoidance Camera");
        assert_eq!(transport.calls()[0].param("sol"), Some("1000"));
    }
}

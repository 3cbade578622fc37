//! Lesson draft assembly
//!
//! Each helper pulls a fixed number of items from one provider and wraps them
//! in a [`LessonDraft`] with that lesson type's time estimate and XP reward.
//! Provider failures surface as empty sections; the draft is still returned.
//! Only the reading and etymology lessons can come back empty-handed, since
//! without a book or a word origin there is nothing to teach.

use serde::Serialize;

use crate::content::{Ck12, KhanAcademy, Nasa, NormalizedContentItem, OpenLibrary, WordsApi};

/// Grade used for astronomy lessons, which are not grade-specific
const ASTRONOMY_GRADE: u8 = 5;

/// Items a CK-12 math or science lesson draws from search
const CK12_SEARCH_LIMIT: usize = 15;

/// A named group of content items within a lesson
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonSection {
    pub name: String,
    pub items: Vec<NormalizedContentItem>,
}

impl LessonSection {
    pub fn new(name: &str, items: Vec<NormalizedContentItem>) -> Self {
        Self {
            name: name.to_string(),
            items,
        }
    }
}

/// A lesson ready to be stored by the application
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonDraft {
    pub title: String,
    pub subject: String,
    pub grade_level: u8,
    /// Which provider helper built this draft, e.g. "ck12_math"
    pub content_type: String,
    pub text_content: String,
    pub sections: Vec<LessonSection>,
    pub estimated_minutes: u32,
    pub xp_value: u32,
}

impl LessonDraft {
    /// Items in the named section, or an empty slice
    pub fn section(&self, name: &str) -> &[NormalizedContentItem] {
        self.sections
            .iter()
            .find(|section| section.name == name)
            .map(|section| section.items.as_slice())
            .unwrap_or(&[])
    }

    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|section| section.items.len()).sum()
    }
}

/// Capitalizes the first letter of every word ("earth science" → "Earth Science")
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn first(items: Vec<NormalizedContentItem>, count: usize) -> Vec<NormalizedContentItem> {
    items.into_iter().take(count).collect()
}

/// Three topic videos and five subject exercises from Khan Academy
pub async fn khan_lesson(khan: &KhanAcademy, subject: &str, grade_level: u8, topic: &str) -> LessonDraft {
    let (videos, exercises) = futures::join!(
        khan.search_videos(topic, Some(grade_level), 3),
        khan.exercises(subject, Some(grade_level)),
    );

    LessonDraft {
        title: format!("Khan Academy - {} - {}", subject, topic),
        subject: subject.to_string(),
        grade_level,
        content_type: "khan_academy".to_string(),
        text_content: format!("Learn about {} with Khan Academy videos and practice exercises.", topic),
        sections: vec![
            LessonSection::new("videos", first(videos, 3)),
            LessonSection::new("exercises", first(exercises, 5)),
        ],
        estimated_minutes: 30,
        xp_value: 15,
    }
}

/// Five NASA images on a topic, plus today's APOD when its title mentions the topic
pub async fn nasa_science_lesson(nasa: &Nasa, topic: &str, grade_level: u8) -> LessonDraft {
    let (mut images, apod) = futures::join!(nasa.search_images(topic, 5), nasa.apod(None));

    let needle = topic.to_lowercase();
    if let Some(apod) = apod.filter(|apod| apod.title_contains(&needle)) {
        images.push(apod);
    }

    LessonDraft {
        title: format!("NASA Science - {}", topic),
        subject: "science".to_string(),
        grade_level,
        content_type: "nasa".to_string(),
        text_content: format!("Learn about {} through NASA's amazing discoveries and images.", topic),
        sections: vec![LessonSection::new("images", images)],
        estimated_minutes: 25,
        xp_value: 20,
    }
}

/// Ten NASA images of a planet, moon or other celestial object
pub async fn nasa_astronomy_lesson(nasa: &Nasa, celestial_object: &str) -> LessonDraft {
    let images = nasa.search_images(celestial_object, 10).await;

    LessonDraft {
        title: format!("Exploring {}", celestial_object),
        subject: "science".to_string(),
        grade_level: ASTRONOMY_GRADE,
        content_type: "nasa_astronomy".to_string(),
        text_content: format!(
            "Discover amazing facts about {} through NASA's observations.",
            celestial_object
        ),
        sections: vec![LessonSection::new("images", images)],
        estimated_minutes: 30,
        xp_value: 25,
    }
}

/// Simulations, practice problems and concept explanations from CK-12
pub async fn ck12_stem_lesson(ck12: &Ck12, subject: &str, topic: &str, grade_level: u8) -> LessonDraft {
    let (simulations, problems, concepts) = futures::join!(
        ck12.simulations(subject, Some(grade_level), 3),
        ck12.practice_problems(subject, Some(grade_level), 5),
        ck12.concepts(Some(subject), Some(grade_level)),
    );

    LessonDraft {
        title: format!("CK-12 {} - {}", title_case(subject), topic),
        subject: subject.to_string(),
        grade_level,
        content_type: "ck12".to_string(),
        text_content: format!("Learn about {} through CK-12's interactive content.", topic),
        sections: vec![
            LessonSection::new("simulations", simulations),
            LessonSection::new("practice_problems", problems),
            LessonSection::new("concepts", first(concepts, 3)),
        ],
        estimated_minutes: 30,
        xp_value: 20,
    }
}

/// CK-12 math search results split into interactive content and problems
pub async fn ck12_math_lesson(ck12: &Ck12, topic: &str, grade_level: u8) -> LessonDraft {
    let found = ck12
        .search_content(topic, Some("math"), Some(grade_level), CK12_SEARCH_LIMIT)
        .await;

    let mut interactive = Vec::new();
    let mut problems = Vec::new();
    for item in found {
        if item.category_contains("interactive") {
            interactive.push(item);
        } else if item.category_contains("problem") {
            problems.push(item);
        }
    }

    LessonDraft {
        title: format!("CK-12 Math - {}", topic),
        subject: "math".to_string(),
        grade_level,
        content_type: "ck12_math".to_string(),
        text_content: format!("Learn {} through CK-12's interactive math content.", topic),
        sections: vec![
            LessonSection::new("interactive_content", interactive),
            LessonSection::new("practice_problems", problems),
        ],
        estimated_minutes: 25,
        xp_value: 18,
    }
}

/// CK-12 science search results split into simulations, experiments and explanations
pub async fn ck12_science_lesson(ck12: &Ck12, topic: &str, grade_level: u8) -> LessonDraft {
    let found = ck12
        .search_content(topic, Some("science"), Some(grade_level), CK12_SEARCH_LIMIT)
        .await;

    let mut simulations = Vec::new();
    let mut experiments = Vec::new();
    let mut explanations = Vec::new();
    for item in found {
        if item.category_contains("simulation") {
            simulations.push(item);
        } else if item.category_contains("experiment") {
            experiments.push(item);
        } else {
            explanations.push(item);
        }
    }

    LessonDraft {
        title: format!("CK-12 Science - {}", topic),
        subject: "science".to_string(),
        grade_level,
        content_type: "ck12_science".to_string(),
        text_content: format!(
            "Explore {} through CK-12's science simulations and experiments.",
            topic
        ),
        sections: vec![
            LessonSection::new("simulations", simulations),
            LessonSection::new("experiments", experiments),
            LessonSection::new("explanations", explanations),
        ],
        estimated_minutes: 35,
        xp_value: 25,
    }
}

/// One word with its definition and related words
pub async fn vocabulary_lesson(words: &WordsApi, word: &str, grade_level: u8) -> LessonDraft {
    let entry = words.definition(word).await;

    LessonDraft {
        title: format!("Vocabulary: {}", title_case(word)),
        subject: "vocabulary".to_string(),
        grade_level,
        content_type: "wordsapi".to_string(),
        text_content: format!("Learn the meaning, synonyms, and usage of the word '{}'.", word),
        sections: vec![LessonSection::new("word", vec![entry.to_content_item()])],
        estimated_minutes: 15,
        xp_value: 10,
    }
}

/// A spelling list with a definition for every word
pub async fn spelling_lesson(words: &WordsApi, list: &[String], grade_level: u8) -> LessonDraft {
    let entries = futures::future::join_all(list.iter().map(|word| words.definition(word))).await;

    LessonDraft {
        title: format!("Spelling Practice - Grade {}", grade_level),
        subject: "spelling".to_string(),
        grade_level,
        content_type: "wordsapi".to_string(),
        text_content: format!(
            "Practice spelling {} words appropriate for grade {}.",
            list.len(),
            grade_level
        ),
        sections: vec![LessonSection::new(
            "words",
            entries.iter().map(|entry| entry.to_content_item()).collect(),
        )],
        estimated_minutes: 20,
        xp_value: 15,
    }
}

/// The origin of a word; `None` when no etymology is known
pub async fn etymology_lesson(words: &WordsApi, word: &str, grade_level: u8) -> Option<LessonDraft> {
    let entry = words.definition(word).await;
    let etymology = entry.etymology()?.to_string();

    let mut item = entry.to_content_item();
    item.category = "etymology".to_string();
    item.description = etymology;

    Some(LessonDraft {
        title: format!("Word Origins: {}", title_case(word)),
        subject: "vocabulary".to_string(),
        grade_level,
        content_type: "wordsapi_etymology".to_string(),
        text_content: format!("Learn about the origin and history of the word '{}'.", word),
        sections: vec![LessonSection::new("word", vec![item])],
        estimated_minutes: 10,
        xp_value: 8,
    })
}

/// A reading assignment built from the best search match for a title
///
/// Returns `None` when the search finds no book.
pub async fn reading_lesson(library: &OpenLibrary, book_title: &str, grade_level: u8) -> Option<LessonDraft> {
    let book = library.search_books(book_title, 1, None).await.into_iter().next()?;
    let details = library.book_details(&book.id).await;

    let author = book
        .description
        .strip_prefix("by ")
        .and_then(|authors| authors.split(", ").next())
        .unwrap_or("Unknown Author")
        .to_string();
    let title = if book.title.is_empty() {
        book_title.to_string()
    } else {
        book.title.clone()
    };

    let mut items = vec![book];
    items.extend(details);

    Some(LessonDraft {
        text_content: format!("Read and discuss {} by {}.", title, author),
        title: format!("Reading: {}", title),
        subject: "reading".to_string(),
        grade_level,
        content_type: "openlibrary".to_string(),
        sections: vec![LessonSection::new("book", items)],
        estimated_minutes: 45,
        xp_value: 30,
    })
}

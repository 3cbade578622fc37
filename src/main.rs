//! hscontent - cached education content and lesson drafts
//!
//! Queries Khan Academy, NASA, CK-12, OpenLibrary and WordsAPI through an
//! on-disk cache and prints the normalized results as JSON on stdout.
//! Logs go to stderr.

use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use hscontent::activity::{
    record_lesson_result, ActivitySink, JsonlActivitySink, LessonOutcome, TracingActivitySink,
};
use hscontent::cli::{
    parse_game_arg, parse_provider_arg, selected_providers, BooksCommand, CacheCommand, Cli, Command,
    LessonCommand, VocabCommand,
};
use hscontent::config::ContentConfig;
use hscontent::content::{words, Providers};
use hscontent::lesson::{self, LessonDraft};

const BYTES_PER_MB: u64 = 1024 * 1024;

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

async fn build_lesson(providers: &Providers, kind: LessonCommand) -> Result<LessonDraft> {
    let draft = match kind {
        LessonCommand::Khan {
            subject,
            topic,
            grade,
        } => lesson::khan_lesson(&providers.khan, &subject, grade, &topic).await,
        LessonCommand::NasaScience { topic, grade } => {
            lesson::nasa_science_lesson(&providers.nasa, &topic, grade).await
        }
        LessonCommand::NasaAstronomy { object } => {
            lesson::nasa_astronomy_lesson(&providers.nasa, &object).await
        }
        LessonCommand::Ck12Stem {
            subject,
            topic,
            grade,
        } => lesson::ck12_stem_lesson(&providers.ck12, &subject, &topic, grade).await,
        LessonCommand::Ck12Math { topic, grade } => {
            lesson::ck12_math_lesson(&providers.ck12, &topic, grade).await
        }
        LessonCommand::Ck12Science { topic, grade } => {
            lesson::ck12_science_lesson(&providers.ck12, &topic, grade).await
        }
        LessonCommand::Vocabulary { word, grade } => {
            lesson::vocabulary_lesson(&providers.words, &word, grade).await
        }
        LessonCommand::Spelling { words: list, grade } => {
            let list = if list.is_empty() {
                words::grade_level_vocabulary(grade, 10)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            } else {
                list
            };
            lesson::spelling_lesson(&providers.words, &list, grade).await
        }
        LessonCommand::Etymology { word, grade } => {
            match lesson::etymology_lesson(&providers.words, &word, grade).await {
                Some(draft) => draft,
                None => bail!("no etymology known for '{}'", word),
            }
        }
        LessonCommand::Reading { title, grade } => {
            match lesson::reading_lesson(&providers.openlibrary, &title, grade).await {
                Some(draft) => draft,
                None => bail!("no book found matching '{}'", title),
            }
        }
    };
    Ok(draft)
}

fn run_cache(providers: &Providers, action: CacheCommand) -> Result<Value> {
    let mut results = Vec::new();
    match action {
        CacheCommand::Stats { provider } => {
            for id in selected_providers(provider.as_deref())? {
                let stats = providers.client(id).cache_stats()?;
                results.push(json!({
                    "provider": id.id(),
                    "file_count": stats.file_count,
                    "total_size_bytes": stats.total_size_bytes,
                    "total_size_mb": stats.total_size_mb(),
                    "cache_dir": stats.cache_dir,
                }));
            }
        }
        CacheCommand::Clear { provider } => {
            for id in selected_providers(provider.as_deref())? {
                let removed = providers.client(id).clear_cache()?;
                results.push(json!({"provider": id.id(), "removed": removed}));
            }
        }
        CacheCommand::Prune { provider, max_mb } => {
            for id in selected_providers(provider.as_deref())? {
                let removed = providers.client(id).cache().prune(max_mb.saturating_mul(BYTES_PER_MB))?;
                results.push(json!({"provider": id.id(), "removed": removed}));
            }
        }
    }
    Ok(Value::Array(results))
}

fn record_result(
    user: &str,
    title: &str,
    xp: u32,
    score: f64,
    log: Option<std::path::PathBuf>,
) -> Value {
    let sink: Box<dyn ActivitySink> = match log {
        Some(path) => Box::new(JsonlActivitySink::new(path)),
        None => Box::new(TracingActivitySink),
    };
    let outcome = record_lesson_result(sink.as_ref(), user, title, xp, score);
    let awarded = if outcome == LessonOutcome::Completed { xp } else { 0 };
    json!({
        "user": user,
        "title": title,
        "score": score,
        "outcome": outcome,
        "xp_awarded": awarded,
    })
}

async fn run(command: Command, config: &ContentConfig) -> Result<Value> {
    let providers = Providers::from_config(config)?;

    match command {
        Command::Search {
            provider,
            query,
            subject,
            grade,
            limit,
        } => {
            let provider = parse_provider_arg(&provider)?;
            let items = providers
                .search(provider, &query, subject.as_deref(), grade, limit)
                .await;
            to_json(&items)
        }
        Command::Lesson { kind } => to_json(&build_lesson(&providers, kind).await?),
        Command::Word { word } => to_json(&providers.words.definition(&word).await),
        Command::WordOfDay => to_json(&providers.words.word_of_the_day().await),
        Command::Vocab { action } => match action {
            VocabCommand::Synonyms { word } => to_json(&providers.words.synonyms(&word).await),
            VocabCommand::Antonyms { word } => to_json(&providers.words.antonyms(&word).await),
            VocabCommand::Family { word } => to_json(&providers.words.word_family(&word).await),
            VocabCommand::Grade { grade, limit } => {
                to_json(&words::grade_level_vocabulary(grade, limit))
            }
            VocabCommand::Game { word, kind } => {
                let kind = parse_game_arg(&kind)?;
                to_json(&providers.words.word_game(&word, kind).await)
            }
        },
        Command::Books { action } => match action {
            BooksCommand::Grade { grade, limit } => {
                to_json(&providers.openlibrary.grade_level_books(grade, limit).await)
            }
            BooksCommand::Recommend { interests, grade } => to_json(
                &providers
                    .openlibrary
                    .reading_recommendations(&interests, grade)
                    .await,
            ),
            BooksCommand::List { grade, subjects } => {
                let subjects = (!subjects.is_empty()).then_some(subjects.as_slice());
                to_json(&providers.openlibrary.reading_list(grade, subjects).await)
            }
        },
        Command::Cache { action } => run_cache(&providers, action),
        Command::RecordResult {
            user,
            title,
            xp,
            score,
            log,
        } => Ok(record_result(&user, &title, xp, score, log)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = ContentConfig::from_cli(&cli)?;
    debug!(cache_root = %config.cache_root.display(), timeout = ?config.timeout, "configuration loaded");

    let output = run(cli.command, &config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

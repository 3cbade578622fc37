//! Command-line interface parsing for hscontent
//!
//! This module handles parsing of CLI arguments using clap and turning them
//! into a [`ContentConfig`]. Credentials can come from flags or the
//! environment; the binary prints JSON results to stdout and logs to stderr.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::config::ContentConfig;
use crate::content::words::GameKind;
use crate::content::ProviderId;

/// Error types for CLI argument handling
#[derive(Debug, Error, PartialEq)]
pub enum CliError {
    /// The specified provider name is not recognized
    #[error("Invalid provider: '{0}'. Valid providers: khan, nasa, ck12, openlibrary, wordsapi")]
    InvalidProvider(String),

    #[error("Invalid game: '{0}'. Valid games: synonym, definition")]
    InvalidGame(String),

    #[error("--timeout-secs must be at least 1")]
    InvalidTimeout,
}

/// hscontent - cached education content from Khan Academy, NASA, CK-12,
/// OpenLibrary and WordsAPI
#[derive(Parser, Debug)]
#[command(name = "hscontent")]
#[command(about = "Cached education content and lesson drafts from public APIs")]
#[command(version)]
pub struct Cli {
    /// Cache root directory (defaults to the platform cache directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, global = true, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// NASA API key (DEMO_KEY is used when unset)
    #[arg(long, global = true, env = "NASA_API_KEY", hide_env_values = true)]
    pub nasa_api_key: Option<String>,

    /// RapidAPI key for WordsAPI (built-in dictionary when unset)
    #[arg(long, global = true, env = "WORDS_API_KEY", hide_env_values = true)]
    pub words_api_key: Option<String>,

    /// Khan Academy API key
    #[arg(long, global = true, env = "KHAN_ACADEMY_API_KEY", hide_env_values = true)]
    pub khan_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search one provider
    ///
    /// Examples:
    ///   hscontent search ck12 fractions --subject math --grade 4
    ///   hscontent search nasa "jupiter moons" --limit 5
    Search {
        /// khan, nasa, ck12, openlibrary or wordsapi
        provider: String,
        query: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        grade: Option<u8>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Build a lesson draft
    Lesson {
        #[command(subcommand)]
        kind: LessonCommand,
    },

    /// Look up a word
    Word { word: String },

    /// Today's featured vocabulary word
    WordOfDay,

    /// Related-words helpers built on word lookups
    Vocab {
        #[command(subcommand)]
        action: VocabCommand,
    },

    /// Books for readers
    Books {
        #[command(subcommand)]
        action: BooksCommand,
    },

    /// Inspect or maintain the on-disk cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },

    /// Report a finished lesson and award XP when passed
    RecordResult {
        #[arg(long)]
        user: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        xp: u32,
        /// Percent score; 80 or more passes
        #[arg(long)]
        score: f64,
        /// Append to this JSON-lines file instead of only logging
        #[arg(long, value_name = "FILE")]
        log: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum LessonCommand {
    /// Khan Academy videos and exercises
    Khan {
        subject: String,
        topic: String,
        #[arg(long, default_value_t = 5)]
        grade: u8,
    },
    /// NASA images on a science topic
    NasaScience {
        topic: String,
        #[arg(long, default_value_t = 5)]
        grade: u8,
    },
    /// NASA images of a celestial object
    NasaAstronomy { object: String },
    /// CK-12 simulations, practice and concepts
    Ck12Stem {
        subject: String,
        topic: String,
        #[arg(long, default_value_t = 5)]
        grade: u8,
    },
    Ck12Math {
        topic: String,
        #[arg(long, default_value_t = 5)]
        grade: u8,
    },
    Ck12Science {
        topic: String,
        #[arg(long, default_value_t = 5)]
        grade: u8,
    },
    Vocabulary {
        word: String,
        #[arg(long, default_value_t = 5)]
        grade: u8,
    },
    /// Spelling list; uses the grade's vocabulary when no words are given
    Spelling {
        words: Vec<String>,
        #[arg(long, default_value_t = 5)]
        grade: u8,
    },
    Etymology {
        word: String,
        #[arg(long, default_value_t = 5)]
        grade: u8,
    },
    Reading {
        title: String,
        #[arg(long, default_value_t = 5)]
        grade: u8,
    },
}

#[derive(Subcommand, Debug)]
pub enum VocabCommand {
    Synonyms { word: String },
    Antonyms { word: String },
    Family { word: String },
    /// Word list for a grade
    Grade {
        grade: u8,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// A one-question game: synonym or definition
    Game {
        word: String,
        #[arg(long, default_value = "synonym")]
        kind: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum BooksCommand {
    /// Books for a grade's reading band
    Grade {
        grade: u8,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Recommendations from interests
    Recommend {
        interests: Vec<String>,
        #[arg(long)]
        grade: Option<u8>,
    },
    /// Curated reading list for a grade
    List {
        grade: u8,
        #[arg(long = "subject")]
        subjects: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// File counts and sizes
    Stats {
        #[arg(long)]
        provider: Option<String>,
    },
    /// Delete cached entries
    Clear {
        #[arg(long)]
        provider: Option<String>,
    },
    /// Delete the oldest entries until each provider is under the size cap
    Prune {
        #[arg(long)]
        provider: Option<String>,
        #[arg(long, value_name = "MB")]
        max_mb: u64,
    },
}

/// Parses a provider argument into a ProviderId.
///
/// # Arguments
/// * `s` - The provider string from CLI
///
/// # Returns
/// * `Ok(ProviderId)` if the string names a provider or one of its aliases
/// * `Err(CliError::InvalidProvider)` otherwise
pub fn parse_provider_arg(s: &str) -> Result<ProviderId, CliError> {
    ProviderId::from_str(s).ok_or_else(|| CliError::InvalidProvider(s.to_string()))
}

/// Resolves an optional `--provider` into the providers to act on
pub fn selected_providers(provider: Option<&str>) -> Result<Vec<ProviderId>, CliError> {
    match provider {
        Some(name) => Ok(vec![parse_provider_arg(name)?]),
        None => Ok(ProviderId::ALL.to_vec()),
    }
}

pub fn parse_game_arg(s: &str) -> Result<GameKind, CliError> {
    match s.to_lowercase().trim() {
        "synonym" | "synonyms" | "synonym_match" => Ok(GameKind::SynonymMatch),
        "definition" | "definition_match" => Ok(GameKind::DefinitionMatch),
        _ => Err(CliError::InvalidGame(s.to_string())),
    }
}

impl ContentConfig {
    /// Creates a ContentConfig from parsed CLI arguments.
    ///
    /// Unset values keep their defaults; `--timeout-secs 0` is rejected.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.timeout_secs == 0 {
            return Err(CliError::InvalidTimeout);
        }

        let mut config = match &cli.cache_dir {
            Some(dir) => ContentConfig::with_cache_root(dir),
            None => ContentConfig::default(),
        };
        config.timeout = Duration::from_secs(cli.timeout_secs);
        config.khan_api_key = non_empty(&cli.khan_api_key);
        config.nasa_api_key = non_empty(&cli.nasa_api_key);
        config.words_api_key = non_empty(&cli.words_api_key);
        Ok(config)
    }
}

// An exported-but-empty variable counts as unset.
fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_arg_aliases() {
        assert_eq!(parse_provider_arg("khan").unwrap(), ProviderId::Khan);
        assert_eq!(parse_provider_arg("NASA").unwrap(), ProviderId::Nasa);
        assert_eq!(parse_provider_arg("books").unwrap(), ProviderId::OpenLibrary);
    }

    #[test]
    fn test_parse_provider_arg_invalid() {
        let err = parse_provider_arg("youtube").unwrap_err();
        assert!(err.to_string().contains("Invalid provider"));
        assert!(err.to_string().contains("youtube"));
    }

    #[test]
    fn test_selected_providers() {
        assert_eq!(selected_providers(None).unwrap().len(), 5);
        assert_eq!(selected_providers(Some("ck12")).unwrap(), vec![ProviderId::Ck12]);
        assert!(selected_providers(Some("nope")).is_err());
    }

    #[test]
    fn test_parse_game_arg() {
        assert_eq!(parse_game_arg("synonym").unwrap(), GameKind::SynonymMatch);
        assert_eq!(parse_game_arg("Definition").unwrap(), GameKind::DefinitionMatch);
        assert_eq!(parse_game_arg("crossword"), Err(CliError::InvalidGame("crossword".to_string())));
    }

    #[test]
    fn test_cli_parse_search() {
        let cli = Cli::parse_from([
            "hscontent", "search", "ck12", "fractions", "--subject", "math", "--grade", "4",
        ]);
        match cli.command {
            Command::Search {
                provider,
                query,
                subject,
                grade,
                limit,
            } => {
                assert_eq!(provider, "ck12");
                assert_eq!(query, "fractions");
                assert_eq!(subject.as_deref(), Some("math"));
                assert_eq!(grade, Some(4));
                assert_eq!(limit, 10);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "hscontent", "cache", "stats", "--cache-dir", "/tmp/hs", "--timeout-secs", "3",
        ]);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/hs")));
        assert_eq!(cli.timeout_secs, 3);
        assert!(matches!(
            cli.command,
            Command::Cache {
                action: CacheCommand::Stats { provider: None }
            }
        ));
    }

    #[test]
    fn test_cli_parse_lesson_spelling_words() {
        let cli = Cli::parse_from(["hscontent", "lesson", "spelling", "cat", "dog", "--grade", "1"]);
        match cli.command {
            Command::Lesson {
                kind: LessonCommand::Spelling { words, grade },
            } => {
                assert_eq!(words, vec!["cat", "dog"]);
                assert_eq!(grade, 1);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_config_from_cli() {
        let cli = Cli::parse_from([
            "hscontent",
            "--cache-dir",
            "/tmp/hs",
            "--timeout-secs",
            "4",
            "--nasa-api-key",
            "abc",
            "--words-api-key",
            "  ",
            "word-of-day",
        ]);

        let config = ContentConfig::from_cli(&cli).unwrap();

        assert_eq!(config.cache_root, PathBuf::from("/tmp/hs"));
        assert_eq!(config.timeout, Duration::from_secs(4));
        assert_eq!(config.nasa_api_key.as_deref(), Some("abc"));
        assert_eq!(config.words_api_key, None);
    }

    #[test]
    fn test_config_from_cli_rejects_zero_timeout() {
        let cli = Cli::parse_from(["hscontent", "--timeout-secs", "0", "word-of-day"]);
        assert_eq!(ContentConfig::from_cli(&cli), Err(CliError::InvalidTimeout));
    }
}

//! Activity and XP reporting
//!
//! Lesson results are reported to an [`ActivitySink`]. Sinks are
//! fire-and-forget: a sink that cannot record something logs the failure
//! and carries on, so reporting never interrupts the caller.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Lowest score (percent) that counts as passing a lesson
pub const PASSING_SCORE: f64 = 80.0;

/// Kinds of learner activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    LessonStart,
    LessonComplete,
    LessonFailed,
    QuizAttempt,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::LessonStart => "lesson_start",
            ActivityKind::LessonComplete => "lesson_complete",
            ActivityKind::LessonFailed => "lesson_failed",
            ActivityKind::QuizAttempt => "quiz_attempt",
        }
    }
}

/// Receives XP awards and activity records
pub trait ActivitySink {
    fn award_xp(&self, user: &str, amount: u32, reason: &str);
    fn record_activity(&self, user: &str, kind: ActivityKind, description: &str);
}

/// Sink that only writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActivitySink;

impl ActivitySink for TracingActivitySink {
    fn award_xp(&self, user: &str, amount: u32, reason: &str) {
        info!(user, amount, reason, "xp awarded");
    }

    fn record_activity(&self, user: &str, kind: ActivityKind, description: &str) {
        info!(user, kind = kind.as_str(), description, "activity recorded");
    }
}

/// One line of the activity log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    #[serde(flatten)]
    pub event: ActivityEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityEvent {
    Xp { amount: u32, reason: String },
    Activity { kind: ActivityKind, description: String },
}

/// Appends every event as a JSON line to a file
#[derive(Debug, Clone)]
pub struct JsonlActivitySink {
    path: PathBuf,
}

impl JsonlActivitySink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads back every record in the log; unparseable lines are skipped
    pub fn records(&self) -> std::io::Result<Vec<ActivityRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }

    fn append(&self, user: &str, event: ActivityEvent) {
        let record = ActivityRecord {
            timestamp: Utc::now(),
            user: user.to_string(),
            event,
        };
        if let Err(e) = self.try_append(&record) {
            warn!(path = %self.path.display(), error = %e, "failed to append activity record");
        }
    }

    fn try_append(&self, record: &ActivityRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

impl ActivitySink for JsonlActivitySink {
    fn award_xp(&self, user: &str, amount: u32, reason: &str) {
        self.append(
            user,
            ActivityEvent::Xp {
                amount,
                reason: reason.to_string(),
            },
        );
    }

    fn record_activity(&self, user: &str, kind: ActivityKind, description: &str) {
        self.append(
            user,
            ActivityEvent::Activity {
                kind,
                description: description.to_string(),
            },
        );
    }
}

/// Whether a finished lesson passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonOutcome {
    Completed,
    Failed,
}

/// Reports a finished lesson to the sink
///
/// # Arguments
/// * `sink` - Where the award and activity are recorded
/// * `user` - Learner identifier
/// * `lesson_title` - Used in the activity descriptions
/// * `xp_value` - XP awarded when the lesson is passed
/// * `score` - Percent score, passing at [`PASSING_SCORE`] or above
///
/// # Returns
/// The outcome; XP is only awarded for `Completed`.
pub fn record_lesson_result(
    sink: &dyn ActivitySink,
    user: &str,
    lesson_title: &str,
    xp_value: u32,
    score: f64,
) -> LessonOutcome {
    if score >= PASSING_SCORE {
        sink.award_xp(user, xp_value, &format!("Completed lesson: {}", lesson_title));
        sink.record_activity(
            user,
            ActivityKind::LessonComplete,
            &format!("Completed lesson: {} with score {}", lesson_title, score),
        );
        LessonOutcome::Completed
    } else {
        sink.record_activity(
            user,
            ActivityKind::LessonFailed,
            &format!("Failed lesson: {} with score {}", lesson_title, score),
        );
        LessonOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemorySink {
        xp: Mutex<Vec<(String, u32)>>,
        activities: Mutex<Vec<(String, ActivityKind)>>,
    }

    impl ActivitySink for MemorySink {
        fn award_xp(&self, user: &str, amount: u32, _reason: &str) {
            self.xp.lock().unwrap().push((user.to_string(), amount));
        }

        fn record_activity(&self, user: &str, kind: ActivityKind, _description: &str) {
            self.activities.lock().unwrap().push((user.to_string(), kind));
        }
    }

    #[test]
    fn test_passing_score_awards_xp() {
        let sink = MemorySink::default();

        let outcome = record_lesson_result(&sink, "ada", "Fractions", 15, 80.0);

        assert_eq!(outcome, LessonOutcome::Completed);
        assert_eq!(*sink.xp.lock().unwrap(), vec![("ada".to_string(), 15)]);
        assert_eq!(
            *sink.activities.lock().unwrap(),
            vec![("ada".to_string(), ActivityKind::LessonComplete)]
        );
    }

    #[test]
    fn test_failing_score_records_failure_only() {
        let sink = MemorySink::default();

        let outcome = record_lesson_result(&sink, "ada", "Fractions", 15, 79.5);

        assert_eq!(outcome, LessonOutcome::Failed);
        assert!(sink.xp.lock().unwrap().is_empty());
        assert_eq!(sink.activities.lock().unwrap()[0].1, ActivityKind::LessonFailed);
    }

    #[test]
    fn test_jsonl_sink_appends_records() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let sink = JsonlActivitySink::new(temp_dir.path().join("logs").join("activity.jsonl"));

        record_lesson_result(&sink, "ada", "Mars", 20, 95.0);
        record_lesson_result(&sink, "bob", "Mars", 20, 10.0);

        let records = sink.records().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0].event,
            ActivityEvent::Xp {
                amount: 20,
                reason: "Completed lesson: Mars".to_string()
            }
        );
        assert_eq!(records[2].user, "bob");
        assert!(matches!(
            records[2].event,
            ActivityEvent::Activity {
                kind: ActivityKind::LessonFailed,
                ..
            }
        ));

        let raw = fs::read_to_string(sink.path()).unwrap();
        assert!(raw.lines().next().unwrap().contains("\"type\":\"xp\""));
    }

    #[test]
    fn test_jsonl_sink_missing_file_has_no_records() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let sink = JsonlActivitySink::new(temp_dir.path().join("none.jsonl"));

        assert!(sink.records().unwrap().is_empty());
    }

    #[test]
    fn test_unwritable_sink_does_not_panic() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        // A directory cannot be opened for appending.
        let sink = JsonlActivitySink::new(temp_dir.path());

        sink.award_xp("ada", 5, "test");
        TracingActivitySink.record_activity("ada", ActivityKind::LessonStart, "test");
    }
}

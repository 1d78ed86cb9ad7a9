use crate::error::{CompareError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author stamped on revisions when none is configured.
pub const DEFAULT_AUTHOR: &str = "Unknown";

/// Date stamped on revisions when no timestamp is configured. A fixed value
/// keeps repeated comparisons byte-identical.
pub const DEFAULT_DATE: &str = "1970-01-01T00:00:00Z";

/// Per-call comparison settings.
///
/// Settings are read-only during a comparison and can be shared between
/// threads running independent comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareSettings {
    /// Characters that separate words. Each separator is a token of its own.
    pub word_separators: Vec<char>,

    /// Upper bound on the unmatched share of a paired region (0.0-1.0).
    /// Regions with more unmatched content are reported as one deletion
    /// followed by one insertion instead of an interleaved fine-grained diff.
    pub detail_threshold: f64,

    /// Compare text without regard to letter case.
    pub case_insensitive: bool,

    /// Treat U+00A0 as an ordinary space when comparing.
    pub conflate_breaking_and_nonbreaking_spaces: bool,

    /// Reclassify matching deleted/inserted runs as moves.
    pub detect_moves: bool,

    /// Minimum word-set Jaccard similarity for a move (0.0-1.0).
    pub move_similarity_threshold: f64,

    /// Runs with fewer words never become moves. Must not be negative.
    pub move_minimum_word_count: i32,

    /// Reclassify matched content whose formatting differs.
    pub detect_format_changes: bool,

    /// Author for revision wrappers.
    pub author: Option<String>,

    /// Date for revision wrappers.
    pub timestamp: Option<DateTime<Utc>>,

    /// First id handed out to revision wrappers and range markers.
    pub first_revision_id: u32,
}

impl Default for CompareSettings {
    fn default() -> Self {
        Self {
            word_separators: vec![
                ' ', '-', ')', '(', ';', ',',
                // Currency symbols split "$100" into "$" and "100"
                '$', '€', '£', '¥', '¢', '₹', '₽', '₩', '₪', '฿',
                '（', '）', '，', '、', '；', '。', '：', '的',
            ],
            detail_threshold: 0.85,
            case_insensitive: false,
            conflate_breaking_and_nonbreaking_spaces: true,
            detect_moves: true,
            move_similarity_threshold: 0.8,
            move_minimum_word_count: 3,
            detect_format_changes: true,
            author: None,
            timestamp: None,
            first_revision_id: 1,
        }
    }
}

impl CompareSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    pub fn with_detail_threshold(mut self, threshold: f64) -> Self {
        self.detail_threshold = threshold;
        self
    }

    pub fn with_detect_moves(mut self, detect: bool) -> Self {
        self.detect_moves = detect;
        self
    }

    pub fn with_move_similarity_threshold(mut self, threshold: f64) -> Self {
        self.move_similarity_threshold = threshold;
        self
    }

    pub fn with_move_minimum_word_count(mut self, count: i32) -> Self {
        self.move_minimum_word_count = count;
        self
    }

    pub fn with_detect_format_changes(mut self, detect: bool) -> Self {
        self.detect_format_changes = detect;
        self
    }

    pub fn with_word_separators(mut self, separators: impl IntoIterator<Item = char>) -> Self {
        self.word_separators = separators.into_iter().collect();
        self
    }

    pub fn is_word_separator(&self, c: char) -> bool {
        self.word_separators.contains(&c)
    }

    pub fn author_name(&self) -> &str {
        self.author.as_deref().unwrap_or(DEFAULT_AUTHOR)
    }

    /// Revision date in the `YYYY-MM-DDThh:mm:ssZ` form word processors use.
    pub fn revision_date(&self) -> String {
        match self.timestamp {
            Some(ts) => ts.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            None => DEFAULT_DATE.to_string(),
        }
    }

    /// Rejects out-of-range values before any comparison work starts.
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("detail_threshold", self.detail_threshold)?;
        check_unit_interval("move_similarity_threshold", self.move_similarity_threshold)?;
        if self.move_minimum_word_count < 0 {
            return Err(CompareError::invalid_setting(
                "move_minimum_word_count",
                format!("must not be negative, got {}", self.move_minimum_word_count),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub(crate) fn min_move_words(&self) -> usize {
        self.move_minimum_word_count.max(0) as usize
    }
}

fn check_unit_interval(field: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CompareError::invalid_setting(
            field,
            format!("must be within [0, 1], got {value}"),
        ))
    }
}

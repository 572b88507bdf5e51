//! Work items and sample classification

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SharedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Basic,
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Basic => "basic",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Difficulty::Basic),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            "expert" => Ok(Difficulty::Expert),
            other => Err(SharedError::InvalidValue {
                field: "difficulty".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Kind of record a generation attempt should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleType {
    CaseAnalysis,
    Educational,
    ClientInteraction,
    StatutoryInterpretation,
}

impl SampleType {
    /// Fixed rotation used by the balanced filter
    pub const CYCLE: [SampleType; 4] = [
        SampleType::CaseAnalysis,
        SampleType::Educational,
        SampleType::ClientInteraction,
        SampleType::StatutoryInterpretation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SampleType::CaseAnalysis => "case_analysis",
            SampleType::Educational => "educational",
            SampleType::ClientInteraction => "client_interaction",
            SampleType::StatutoryInterpretation => "statutory_interpretation",
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SampleType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "case_analysis" => Ok(SampleType::CaseAnalysis),
            "educational" => Ok(SampleType::Educational),
            "client_interaction" => Ok(SampleType::ClientInteraction),
            "statutory_interpretation" => Ok(SampleType::StatutoryInterpretation),
            other => Err(SharedError::InvalidValue {
                field: "sample_type".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Job-level sample type selection: one fixed type, or rotate through all four
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SampleTypeFilter {
    #[default]
    Balance,
    Fixed(SampleType),
}

impl SampleTypeFilter {
    /// Sample type for the given zero-based iteration
    pub fn type_for(&self, iteration: usize) -> SampleType {
        match self {
            SampleTypeFilter::Fixed(sample_type) => *sample_type,
            SampleTypeFilter::Balance => SampleType::CYCLE[iteration % SampleType::CYCLE.len()],
        }
    }
}

impl fmt::Display for SampleTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleTypeFilter::Balance => write!(f, "balance"),
            SampleTypeFilter::Fixed(sample_type) => write!(f, "{sample_type}"),
        }
    }
}

impl FromStr for SampleTypeFilter {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("balance") {
            return Ok(SampleTypeFilter::Balance);
        }
        s.parse().map(SampleTypeFilter::Fixed)
    }
}

impl TryFrom<String> for SampleTypeFilter {
    type Error = SharedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SampleTypeFilter> for String {
    fn from(value: SampleTypeFilter) -> Self {
        value.to_string()
    }
}

/// Catalog entry: a topic with its default difficulty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEntry {
    pub category: String,
    pub subcategory: String,
    pub difficulty: Difficulty,
}

impl TopicEntry {
    pub fn new(category: &str, subcategory: &str, difficulty: Difficulty) -> Self {
        Self {
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            difficulty,
        }
    }

    pub fn key(&self) -> String {
        format!("{} - {}", self.category, self.subcategory)
    }
}

/// One generation target: a topic at a concrete difficulty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub category: String,
    pub subcategory: String,
    pub difficulty: Difficulty,
}

impl WorkItem {
    /// Circuit breaker key: `"Category - Subcategory"`
    pub fn key(&self) -> String {
        format!("{} - {}", self.category, self.subcategory)
    }
}

impl From<&TopicEntry> for WorkItem {
    fn from(entry: &TopicEntry) -> Self {
        Self {
            category: entry.category.clone(),
            subcategory: entry.subcategory.clone(),
            difficulty: entry.difficulty,
        }
    }
}

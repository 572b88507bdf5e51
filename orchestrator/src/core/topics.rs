//! Topic catalog and the per-job cyclic work sequence

use std::path::Path;

use shared::{Difficulty, SampleType, SampleTypeFilter, TopicEntry, WorkItem};

use crate::error::{OrchestratorError, OrchestratorResult};

const DEFAULT_TOPICS: &[(&str, &str, Difficulty)] = &[
    ("Contract Law", "Formation of Contracts", Difficulty::Intermediate),
    ("Contract Law", "Breach of Contract", Difficulty::Intermediate),
    ("Contract Law", "Remedies for Breach", Difficulty::Advanced),
    ("Contract Law", "Terms and Conditions", Difficulty::Basic),
    ("Contract Law", "Misrepresentation", Difficulty::Advanced),
    ("Tort Law", "Professional Negligence", Difficulty::Advanced),
    ("Tort Law", "Occupiers Liability", Difficulty::Intermediate),
    ("Tort Law", "Vicarious Liability", Difficulty::Intermediate),
    ("Tort Law", "Defamation", Difficulty::Advanced),
    ("Tort Law", "Nuisance", Difficulty::Intermediate),
    ("Company Law", "Directors Duties", Difficulty::Advanced),
    ("Company Law", "Shareholder Rights", Difficulty::Intermediate),
    ("Company Law", "Corporate Governance", Difficulty::Advanced),
    ("Company Law", "Insolvency", Difficulty::Expert),
    ("Company Law", "Company Formation", Difficulty::Basic),
    ("Employment Law", "Discrimination", Difficulty::Intermediate),
    ("Employment Law", "Wrongful Dismissal", Difficulty::Advanced),
    ("Employment Law", "Employment Contracts", Difficulty::Basic),
    ("Employment Law", "TUPE", Difficulty::Advanced),
    ("Employment Law", "Redundancy", Difficulty::Intermediate),
    ("Property Law", "Leasehold vs Freehold", Difficulty::Basic),
    ("Property Law", "Land Registration", Difficulty::Intermediate),
    ("Property Law", "Easements and Covenants", Difficulty::Advanced),
    ("Property Law", "Mortgages", Difficulty::Intermediate),
    ("Criminal Law", "Actus Reus and Mens Rea", Difficulty::Basic),
    ("Criminal Law", "Murder and Manslaughter", Difficulty::Intermediate),
    ("Criminal Law", "Criminal Defenses", Difficulty::Advanced),
    ("Criminal Law", "Fraud", Difficulty::Advanced),
    ("Trusts Law", "Constructive Trusts", Difficulty::Advanced),
    ("Trusts Law", "Charitable Trusts", Difficulty::Intermediate),
    ("Trusts Law", "Breach of Trust", Difficulty::Advanced),
    ("Family Law", "Divorce Proceedings", Difficulty::Intermediate),
    ("Family Law", "Child Custody", Difficulty::Intermediate),
    ("Family Law", "Financial Settlements", Difficulty::Advanced),
    ("Tax Law", "Capital Gains Tax", Difficulty::Advanced),
    ("Tax Law", "VAT", Difficulty::Intermediate),
    ("Tax Law", "Income Tax", Difficulty::Intermediate),
    ("Administrative Law", "Judicial Review", Difficulty::Advanced),
    ("Administrative Law", "Public Law Remedies", Difficulty::Expert),
    ("Legal Ethics", "Conflicts of Interest", Difficulty::Intermediate),
    ("Legal Ethics", "Client Confidentiality", Difficulty::Basic),
    ("Legal Ethics", "Money Laundering", Difficulty::Advanced),
];

/// Read-only ordered list of topics, loaded once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct TopicCatalog {
    entries: Vec<TopicEntry>,
}

impl TopicCatalog {
    pub fn new(entries: Vec<TopicEntry>) -> OrchestratorResult<Self> {
        if entries.is_empty() {
            return Err(OrchestratorError::CatalogError {
                message: "catalog has no topics".to_string(),
            });
        }
        Ok(Self { entries })
    }

    /// Load a JSON array of `{category, subcategory, difficulty}` objects
    pub async fn from_file(path: &Path) -> OrchestratorResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let entries: Vec<TopicEntry> = serde_json::from_str(&content).map_err(|e| OrchestratorError::CatalogError {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[TopicEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a job's work sequence
    ///
    /// A topic filter keeps entries whose full key or category equals it
    /// (case-insensitive). A difficulty filter replaces each entry's default
    /// difficulty.
    pub fn work_cycle(
        &self,
        topic_filter: Option<&str>,
        difficulty_filter: Option<Difficulty>,
        sample_types: SampleTypeFilter,
    ) -> OrchestratorResult<WorkCycle> {
        let selected: Vec<&TopicEntry> = match topic_filter.map(str::trim).filter(|t| !t.is_empty()) {
            Some(filter) => self
                .entries
                .iter()
                .filter(|entry| entry.key().eq_ignore_ascii_case(filter) || entry.category.eq_ignore_ascii_case(filter))
                .collect(),
            None => self.entries.iter().collect(),
        };

        if selected.is_empty() {
            return Err(OrchestratorError::invalid_request(format!(
                "topic filter '{}' matches no catalog entry",
                topic_filter.unwrap_or_default()
            )));
        }

        let items = selected
            .into_iter()
            .map(|entry| {
                let mut item = WorkItem::from(entry);
                if let Some(difficulty) = difficulty_filter {
                    item.difficulty = difficulty;
                }
                item
            })
            .collect();

        Ok(WorkCycle { items, sample_types })
    }
}

impl Default for TopicCatalog {
    fn default() -> Self {
        Self {
            entries: DEFAULT_TOPICS
                .iter()
                .map(|(category, subcategory, difficulty)| TopicEntry::new(category, subcategory, *difficulty))
                .collect(),
        }
    }
}

/// Cyclic work sequence for one job
#[derive(Debug, Clone, PartialEq)]
pub struct WorkCycle {
    items: Vec<WorkItem>,
    sample_types: SampleTypeFilter,
}

impl WorkCycle {
    /// Work item and sample type for a zero-based iteration
    pub fn at(&self, iteration: u64) -> (&WorkItem, SampleType) {
        let index = (iteration % self.items.len() as u64) as usize;
        (&self.items[index], self.sample_types.type_for(iteration as usize))
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

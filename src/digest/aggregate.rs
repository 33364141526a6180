//! Counting paper mentions across messages.

use std::collections::HashMap;

use crate::digest::extract::ExtractError;
use crate::models::Paper;

/// Paper mention counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    /// Messages whose extraction failed
    pub error_count: usize,

    /// Paper mentions in all successfully extracted messages
    pub total_titles: usize,

    /// Occurrences per distinct paper
    pub counts: HashMap<Paper, usize>,
}

impl Aggregate {
    /// Fold one message's extraction result into the counts.
    pub fn add(&mut self, result: Result<Vec<Paper>, ExtractError>) {
        match result {
            Ok(papers) => {
                self.total_titles += papers.len();
                for paper in papers {
                    *self.counts.entry(paper).or_insert(0) += 1;
                }
            }
            Err(_) => self.error_count += 1,
        }
    }

    /// Number of distinct papers
    pub fn unique_titles(&self) -> usize {
        self.counts.len()
    }

    /// Occurrences of a paper, zero when never seen
    pub fn count_of(&self, paper: &Paper) -> usize {
        self.counts.get(paper).copied().unwrap_or(0)
    }

    /// Papers by descending count; ties ordered by title, then URL.
    pub fn sorted(&self) -> Vec<(&Paper, usize)> {
        let mut entries: Vec<(&Paper, usize)> =
            self.counts.iter().map(|(paper, count)| (paper, *count)).collect();
        entries.sort_by(|(a, a_count), (b, b_count)| {
            b_count
                .cmp(a_count)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.url.cmp(&b.url))
        });
        entries
    }
}

/// Aggregate per-message extraction results.
pub fn aggregate<I>(results: I) -> Aggregate
where
    I: IntoIterator<Item = Result<Vec<Paper>, ExtractError>>,
{
    let mut aggregate = Aggregate::default();
    for result in results {
        aggregate.add(result);
    }
    aggregate
}

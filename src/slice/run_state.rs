//! Resume state derived from the slices already on disk

use std::collections::BTreeSet;

use super::types::GROUP_SIZE;

/// Where a run picks up, computed once from the stored slice indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    /// Number of slices already stored
    pub slice_count: usize,
    /// First web page not yet fully represented on disk (1-based)
    pub resume_page: u32,
    /// Indices missing below the highest stored index
    pub gaps: Vec<u32>,
}

impl RunState {
    /// Derive the run state from a set of stored slice indices
    ///
    /// The resume page only depends on how many slices exist, so a partially
    /// saved page is fetched again and its stored slices are skipped.
    pub fn from_indices(indices: &BTreeSet<u32>) -> Self {
        let slice_count = indices.len();
        let resume_page = (slice_count / GROUP_SIZE) as u32 + 1;

        let gaps = match indices.last() {
            Some(&highest) if highest as usize != slice_count => {
                (1..highest).filter(|i| !indices.contains(i)).collect()
            }
            _ => Vec::new(),
        };

        Self {
            slice_count,
            resume_page,
            gaps,
        }
    }

    /// Whether stored slices are numbered densely from 1
    pub fn is_dense(&self) -> bool {
        self.gaps.is_empty()
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::from_indices(&BTreeSet::new())
    }
}

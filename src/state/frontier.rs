use crate::url::CanonicalUrl;
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Discovery working set for one crawl
///
/// Holds the three URL sets of a breadth-first discovery run:
/// - `to_visit`: discovered but not yet fetched (the frontier)
/// - `visited`: handed out in a batch
/// - `discovered`: every URL ever added through [`Frontier::offer`]
///
/// A URL is in at most one of `to_visit` and `visited`, and insertion is
/// idempotent. The frontier is owned by exactly one discovery run.
#[derive(Debug, Clone)]
pub struct Frontier {
    to_visit: VecDeque<CanonicalUrl>,
    queued: HashSet<CanonicalUrl>,
    visited: HashSet<CanonicalUrl>,
    discovered: BTreeSet<CanonicalUrl>,
}

impl Frontier {
    /// Creates a frontier holding only the seed
    ///
    /// The seed is queued but is not part of `discovered`.
    pub fn new(seed: CanonicalUrl) -> Self {
        let mut queued = HashSet::new();
        queued.insert(seed.clone());

        Self {
            to_visit: VecDeque::from([seed]),
            queued,
            visited: HashSet::new(),
            discovered: BTreeSet::new(),
        }
    }

    /// Removes up to `batch_size` URLs from the frontier and marks them visited
    pub fn next_batch(&mut self, batch_size: usize) -> Vec<CanonicalUrl> {
        let take = batch_size.max(1).min(self.to_visit.len());
        let batch: Vec<CanonicalUrl> = self.to_visit.drain(..take).collect();

        for url in &batch {
            self.queued.remove(url);
            self.visited.insert(url.clone());
        }

        batch
    }

    /// Adds a newly found URL unless it is already known
    ///
    /// Returns true if the URL was new and is now queued.
    pub fn offer(&mut self, url: CanonicalUrl) -> bool {
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }

        self.queued.insert(url.clone());
        self.discovered.insert(url.clone());
        self.to_visit.push_back(url);
        true
    }

    /// Returns true when nothing is left to visit
    pub fn is_exhausted(&self) -> bool {
        self.to_visit.is_empty()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn pending_len(&self) -> usize {
        self.to_visit.len()
    }

    pub fn discovered(&self) -> &BTreeSet<CanonicalUrl> {
        &self.discovered
    }

    pub fn is_visited(&self, url: &CanonicalUrl) -> bool {
        self.visited.contains(url)
    }

    pub fn is_queued(&self, url: &CanonicalUrl) -> bool {
        self.queued.contains(url)
    }

    /// Raw discovery progress estimate: `floor(visited / (visited + to_visit) * 80)`
    ///
    /// This can move backwards when the frontier grows faster than it drains.
    pub fn progress_estimate(&self) -> u8 {
        let visited = self.visited.len();
        let total = visited + self.to_visit.len();
        if total == 0 {
            return 0;
        }
        ((visited * 80) / total) as u8
    }

    /// Consumes the frontier and returns the discovered set
    pub fn into_discovered(self) -> BTreeSet<CanonicalUrl> {
        self.discovered
    }
}

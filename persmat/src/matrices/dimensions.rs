/// Number of columns in each dimension, so that the extreme dimensions survive removals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimensionTracker {
    counts: Vec<usize>,
}

impl DimensionTracker {
    pub fn update_up(&mut self, dimension: usize) {
        if self.counts.len() <= dimension {
            self.counts.resize(dimension + 1, 0);
        }
        self.counts[dimension] += 1;
    }

    pub fn update_down(&mut self, dimension: usize) {
        if let Some(count) = self.counts.get_mut(dimension) {
            *count = count.saturating_sub(1);
        }
        while self.counts.last() == Some(&0) {
            self.counts.pop();
        }
    }

    pub fn count(&self, dimension: usize) -> usize {
        self.counts.get(dimension).copied().unwrap_or(0)
    }

    pub fn max(&self) -> Option<usize> {
        self.counts.len().checked_sub(1)
    }

    pub fn min(&self) -> Option<usize> {
        self.counts.iter().position(|&count| count > 0)
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }
}

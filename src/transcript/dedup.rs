use std::collections::VecDeque;

/// A flushed piece of transcript and its dedup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub raw: String,

    /// Lowercased, whitespace-collapsed form of `raw`
    pub normalized: String,
}

impl Chunk {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = Self::normalize(&raw);
        Self { raw, normalized }
    }

    pub fn normalize(text: &str) -> String {
        text.split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// At least `min_alnum` alphanumeric characters
    pub fn is_meaningful(&self, min_alnum: usize) -> bool {
        self.raw.chars().filter(|c| c.is_alphanumeric()).count() >= min_alnum
    }
}

/// Fixed-capacity FIFO of recently admitted chunk keys
#[derive(Debug)]
pub struct RecentChunkHistory {
    capacity: usize,
    keys: VecDeque<String>,
}

impl RecentChunkHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            keys: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Admit `chunk` unless its key is already in the history.
    ///
    /// Rejection leaves the history untouched; admission evicts the oldest
    /// key when full.
    pub fn admit(&mut self, chunk: &Chunk) -> bool {
        if self.contains(&chunk.normalized) {
            return false;
        }
        if self.keys.len() == self.capacity {
            self.keys.pop_front();
        }
        self.keys.push_back(chunk.normalized.clone());
        true
    }
}

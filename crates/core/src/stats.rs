use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing how event stream lines were handled.
///
/// Malformed `data: ` lines (keep-alives, the `[DONE]` sentinel, partial
/// frames) are skipped silently; these counters make them visible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DecodeStats {
    /// Number of `data: ` lines seen.
    pub data_lines: u64,
    /// Number of text fragments delivered.
    pub fragments: u64,
    /// Number of `data: ` lines skipped because they were not a JSON
    /// chunk.
    pub malformed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct DecodeCounters {
    data_lines: AtomicU64,
    fragments: AtomicU64,
    malformed: AtomicU64,
}

impl DecodeCounters {
    #[inline]
    pub fn add(&self, stats: DecodeStats) {
        self.data_lines.fetch_add(stats.data_lines, Ordering::Relaxed);
        self.fragments.fetch_add(stats.fragments, Ordering::Relaxed);
        self.malformed.fetch_add(stats.malformed, Ordering::Relaxed);
    }

    #[inline]
    pub fn snapshot(&self) -> DecodeStats {
        DecodeStats {
            data_lines: self.data_lines.load(Ordering::Relaxed),
            fragments: self.fragments.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

//! Sequence sets for message ranges.

use std::fmt;

/// Set of message sequence numbers or UIDs.
///
/// The same syntax addresses both; the command decides which one it means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceSet {
    /// Single number.
    Single(u32),
    /// Inclusive range.
    Range(u32, u32),
    /// Range from start to the last message (`n:*`).
    RangeFrom(u32),
    /// All messages (`1:*`).
    All,
    /// Several ranges or numbers joined by commas.
    Set(Vec<Self>),
}

/// UID-addressed set, serialized exactly like a [`SequenceSet`].
pub type UidSet = SequenceSet;

impl SequenceSet {
    /// Creates a set containing exactly the given numbers.
    ///
    /// Consecutive runs are collapsed into ranges. Returns `None` for an
    /// empty list or a zero entry.
    #[must_use]
    pub fn from_ids(ids: &[u32]) -> Option<Self> {
        if ids.is_empty() || ids.contains(&0) {
            return None;
        }
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut items = Vec::new();
        let mut start = sorted[0];
        let mut end = start;
        for &id in &sorted[1..] {
            if id == end + 1 {
                end = id;
            } else {
                items.push(Self::span(start, end));
                start = id;
                end = id;
            }
        }
        items.push(Self::span(start, end));

        Some(if items.len() == 1 {
            items.remove(0)
        } else {
            Self::Set(items)
        })
    }

    const fn span(start: u32, end: u32) -> Self {
        if start == end {
            Self::Single(start)
        } else {
            Self::Range(start, end)
        }
    }
}

impl From<u32> for SequenceSet {
    fn from(n: u32) -> Self {
        Self::Single(n)
    }
}

impl fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::All => f.write_str("1:*"),
            Self::Set(items) => {
                let s: Vec<_> = items.iter().map(ToString::to_string).collect();
                f.write_str(&s.join(","))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(SequenceSet::Single(5).to_string(), "5");
        assert_eq!(SequenceSet::Range(1, 10).to_string(), "1:10");
        assert_eq!(SequenceSet::RangeFrom(7).to_string(), "7:*");
        assert_eq!(SequenceSet::All.to_string(), "1:*");
        assert_eq!(
            SequenceSet::Set(vec![SequenceSet::Single(1), SequenceSet::Range(3, 4)]).to_string(),
            "1,3:4"
        );
    }

    #[test]
    fn from_ids_collapses_runs() {
        let set = SequenceSet::from_ids(&[9, 1, 2, 3, 5, 6, 9]).unwrap();
        assert_eq!(set.to_string(), "1:3,5:6,9");
        assert_eq!(SequenceSet::from_ids(&[42]).unwrap(), SequenceSet::Single(42));
    }

    #[test]
    fn from_ids_rejects_empty_and_zero() {
        assert!(SequenceSet::from_ids(&[]).is_none());
        assert!(SequenceSet::from_ids(&[0, 1]).is_none());
    }
}

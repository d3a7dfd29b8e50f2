//! IMAP command tag generator.
//!
//! Tags are used to match commands with their responses.

use std::sync::{Mutex, PoisonError};

/// Tag generator for IMAP commands.
///
/// Generates unique sequential tags in the format "A001", "A002", etc.
/// Numbering keeps growing past `A999` (`A1000`); a tag is never reissued on
/// the same generator.
#[derive(Debug)]
pub struct TagGenerator {
    counter: Mutex<u32>,
    prefix: char,
}

impl TagGenerator {
    /// Creates a new tag generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self {
            counter: Mutex::new(0),
            prefix,
        }
    }

    /// Generates the next tag.
    ///
    /// Returns `None` once the counter is exhausted.
    #[must_use]
    pub fn next(&self) -> Option<String> {
        let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        let n = counter.checked_add(1)?;
        *counter = n;
        Some(format!("{}{:03}", self.prefix, n))
    }

    /// Returns how many tags have been issued.
    #[must_use]
    pub fn issued(&self) -> u32 {
        *self.counter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn sequential_from_one() {
        let tags = TagGenerator::default();
        assert_eq!(tags.next().unwrap(), "A001");
        assert_eq!(tags.next().unwrap(), "A002");
        assert_eq!(tags.next().unwrap(), "A003");
        assert_eq!(tags.issued(), 3);
    }

    #[test]
    fn grows_past_three_digits() {
        let tags = TagGenerator::new('T');
        for _ in 0..999 {
            let _ = tags.next();
        }
        assert_eq!(tags.next().unwrap(), "T1000");
    }

    #[test]
    fn unique_across_threads() {
        let tags = Arc::new(TagGenerator::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tags = Arc::clone(&tags);
                std::thread::spawn(move || (0..250).map(|_| tags.next().unwrap()).collect::<Vec<_>>())
            })
            .collect();
        let all: HashSet<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), 1000);
    }
}

//! Overlapping-window document chunking
//!
//! Long documents are fed to the extraction oracle one window at a time.
//! Windows are `size` characters long at a constant stride of
//! `size - overlap`, so consecutive windows share exactly `overlap`
//! characters of the original text and the window sequence covers every
//! character with no gaps. The last window may be shorter.
//!
//! Window order is significant: it is the order in which chunks reach the
//! oracle, and therefore decides which window "discovers" a variable key
//! first. Splitting is a pure function of `(text, size, overlap)`: same
//! inputs, same windows.
//!
//! Offsets and lengths are measured in characters, not bytes, so multi-byte
//! UTF-8 text never splits mid-character.

use crate::error::ChunkConfigError;

/// Default window size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 8000;

/// Default overlap between consecutive windows in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 500;

/// One extraction window: the text plus its character offset in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub start: usize,
}

/// Validated chunking parameters
///
/// Construction is the only place where the `0 < overlap < size` invariant
/// is checked; a constructed config can always split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    size: usize,
    overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkConfigError> {
        if size == 0 {
            return Err(ChunkConfigError::ZeroSize);
        }
        if overlap == 0 {
            return Err(ChunkConfigError::ZeroOverlap);
        }
        if overlap >= size {
            return Err(ChunkConfigError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered overlapping windows.
    ///
    /// Empty input yields a single empty window, so an extraction run always
    /// makes at least one oracle call.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return vec![Chunk {
                text: String::new(),
                start: 0,
            }];
        }

        // Byte offset of every character position, for panic-free slicing
        let byte_offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let char_len = byte_offsets.len();
        let byte_at = |pos: usize| {
            if pos >= char_len {
                text.len()
            } else {
                byte_offsets[pos]
            }
        };

        let stride = self.size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < char_len {
            let end = (start + self.size).min(char_len);
            chunks.push(Chunk {
                text: text[byte_at(start)..byte_at(end)].to_string(),
                start,
            });
            start += stride;
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_invalid_config() {
        assert_eq!(ChunkConfig::new(0, 0), Err(ChunkConfigError::ZeroSize));
        assert_eq!(ChunkConfig::new(100, 0), Err(ChunkConfigError::ZeroOverlap));
        assert_eq!(
            ChunkConfig::new(100, 100),
            Err(ChunkConfigError::OverlapTooLarge {
                size: 100,
                overlap: 100
            })
        );
        assert_eq!(
            ChunkConfig::new(100, 150),
            Err(ChunkConfigError::OverlapTooLarge {
                size: 100,
                overlap: 150
            })
        );
    }

    #[test]
    fn test_nine_thousand_chars_three_windows() {
        let text = "a".repeat(9000);
        let config = ChunkConfig::new(4000, 400).unwrap();
        let chunks = config.split(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[1].start, 3600);
        assert_eq!(chunks[2].start, 7200);
        assert_eq!(chunks[0].text.len(), 4000);
        assert_eq!(chunks[1].text.len(), 4000);
        assert_eq!(chunks[2].text.len(), 1800);
    }

    #[test]
    fn test_short_text_single_window() {
        let config = ChunkConfig::new(4000, 400).unwrap();
        let chunks = config.split("short document");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].text, "short document");
    }

    #[test]
    fn test_empty_text_single_empty_window() {
        let config = ChunkConfig::default();
        let chunks = config.split("");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
        assert_eq!(chunks[0].start, 0);
    }

    #[test]
    fn test_overlap_region_is_shared() {
        let text: String = ('a'..='z').cycle().take(100).collect();
        let config = ChunkConfig::new(40, 10).unwrap();
        let chunks = config.split(&text);

        for pair in chunks.windows(2) {
            let head = &pair[0];
            let tail = &pair[1];
            assert_eq!(tail.start, head.start + 30);
            if head.text.len() == 40 {
                // last `overlap` chars of one window open the next
                assert_eq!(&head.text[30..], &tail.text[..10.min(tail.text.len())]);
            }
        }
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text = "é".repeat(25);
        let config = ChunkConfig::new(10, 3).unwrap();
        let chunks = config.split(&text);

        assert_eq!(chunks[0].text.chars().count(), 10);
        assert_eq!(chunks[1].start, 7);
        let total: usize = text.chars().count();
        let last = chunks.last().unwrap();
        assert!(last.start + last.text.chars().count() == total);
    }

    proptest! {
        #[test]
        fn prop_windows_cover_every_char(
            len in 1usize..600,
            size in 2usize..80,
            overlap_frac in 1usize..79,
        ) {
            let overlap = overlap_frac.min(size - 1).max(1);
            prop_assume!(overlap < size && size <= len);

            let text: String = ('a'..='z').cycle().take(len).collect();
            let config = ChunkConfig::new(size, overlap).unwrap();
            let chunks = config.split(&text);

            let mut covered = vec![false; len];
            for chunk in &chunks {
                for i in chunk.start..chunk.start + chunk.text.chars().count() {
                    covered[i] = true;
                }
            }
            prop_assert!(covered.iter().all(|&c| c));

            // constant stride between consecutive windows
            for pair in chunks.windows(2) {
                prop_assert_eq!(pair[1].start - pair[0].start, size - overlap);
            }
        }

        #[test]
        fn prop_split_is_deterministic(len in 0usize..300) {
            let text: String = ('a'..='z').cycle().take(len).collect();
            let config = ChunkConfig::new(50, 10).unwrap();
            prop_assert_eq!(config.split(&text), config.split(&text));
        }
    }
}

//! Incremental search for a fixed byte pattern.
//!
//! [`BoundaryScanner`] is fed one byte at a time and remembers how much of the pattern
//! the most recent bytes matched, so a pattern split across two arrivals is still
//! found. Restarting on the first pattern byte is exact only when that byte does not
//! occur again inside the pattern, which holds for `\r\n--<boundary>` once the boundary
//! is known to contain no CR or LF.

use bytes::Bytes;

/// What a single byte did to the match in progress.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScanStep {
    /// The byte extended the partial match and is withheld.
    Matched,
    /// The byte completed the pattern.
    Complete,
    /// The byte broke the partial match but starts a new one. The first `released`
    /// withheld bytes turned out to be ordinary data.
    Restarted { released: usize },
    /// The byte broke the partial match and is ordinary data, as are the `released`
    /// bytes withheld before it.
    Missed { released: usize },
}

/// Saved match cursor over a fixed pattern.
///
/// Withheld bytes are always a prefix of the pattern, so they can be re-emitted from
/// [`BoundaryScanner::pattern`] without keeping a copy of the input.
#[derive(Debug, Clone)]
pub struct BoundaryScanner {
    pattern: Bytes,
    cursor: usize,
}

impl BoundaryScanner {
    /// Creates a scanner for a non-empty pattern.
    pub fn new(pattern: impl Into<Bytes>) -> Self {
        let pattern = pattern.into();
        debug_assert!(!pattern.is_empty(), "scan pattern must not be empty");
        Self { pattern, cursor: 0 }
    }

    /// Creates a scanner that treats the first `cursor` pattern bytes as already matched.
    pub fn starting_at(pattern: impl Into<Bytes>, cursor: usize) -> Self {
        let mut scanner = Self::new(pattern);
        scanner.cursor = cursor.min(scanner.pattern.len());
        scanner
    }

    #[inline]
    pub fn pattern(&self) -> &Bytes {
        &self.pattern
    }

    /// Number of pattern bytes matched so far.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.cursor == self.pattern.len()
    }

    #[inline]
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Feeds one byte. A completed match is forgotten on the next call.
    #[inline]
    pub fn step(&mut self, byte: u8) -> ScanStep {
        if self.is_complete() {
            self.cursor = 0;
        }

        if self.pattern[self.cursor] == byte {
            self.cursor += 1;
            return if self.is_complete() { ScanStep::Complete } else { ScanStep::Matched };
        }

        let released = self.cursor;
        if byte == self.pattern[0] {
            self.cursor = 1;
            ScanStep::Restarted { released }
        } else {
            self.cursor = 0;
            ScanStep::Missed { released }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(scanner: &mut BoundaryScanner, input: &[u8]) -> Vec<ScanStep> {
        input.iter().map(|b| scanner.step(*b)).collect()
    }

    #[test]
    fn find_pattern_in_one_arrival() {
        let mut scanner = BoundaryScanner::new(&b"\r\n--xy"[..]);
        let steps = feed(&mut scanner, b"a\r\n--xy");
        assert_eq!(steps[0], ScanStep::Missed { released: 0 });
        assert_eq!(steps.last(), Some(&ScanStep::Complete));
        assert!(scanner.is_complete());
    }

    #[test]
    fn resume_across_arrivals() {
        let mut scanner = BoundaryScanner::new(&b"\r\n--xy"[..]);
        feed(&mut scanner, b"data\r\n-");
        assert_eq!(scanner.cursor(), 3);
        let steps = feed(&mut scanner, b"-xy");
        assert_eq!(steps, vec![ScanStep::Matched, ScanStep::Matched, ScanStep::Complete]);
    }

    #[test]
    fn release_withheld_bytes_on_mismatch() {
        let mut scanner = BoundaryScanner::new(&b"\r\n--xy"[..]);
        feed(&mut scanner, b"\r\n--x");
        assert_eq!(scanner.step(b'z'), ScanStep::Missed { released: 5 });
        assert_eq!(scanner.cursor(), 0);

        feed(&mut scanner, b"\r\n-");
        assert_eq!(scanner.step(b'\r'), ScanStep::Restarted { released: 3 });
        assert_eq!(scanner.cursor(), 1);
        assert_eq!(&scanner.pattern()[..3], b"\r\n-");
    }

    #[test]
    fn start_inside_pattern() {
        let mut scanner = BoundaryScanner::starting_at(&b"\r\n--xy"[..], 2);
        let steps = feed(&mut scanner, b"--xy");
        assert_eq!(steps.last(), Some(&ScanStep::Complete));
    }
}

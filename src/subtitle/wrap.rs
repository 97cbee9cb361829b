use crate::error::{Result, YtWhisperError};

/// Reflow caption text into lines no wider than `max_width` characters.
///
/// A `max_width` of zero disables wrapping and returns the text untouched.
/// Otherwise whitespace is normalized to single spaces and the line count is
/// taken from a greedy pack. The words are then redistributed into a
/// bottom-heavy pyramid: line lengths never decrease from top to bottom, the
/// longest line is as short as possible, and on ties earlier lines take fewer
/// words. Words are never split, so a word longer than `max_width` sits on a
/// line of its own. If no non-decreasing arrangement exists for the greedy line
/// count, the most balanced arrangement with the shortest possible top lines is
/// returned instead.
pub fn wrap_text(text: &str, max_width: usize) -> Result<Vec<String>> {
    if text.trim().is_empty() {
        return Err(YtWhisperError::EmptyCaption);
    }

    if max_width == 0 {
        return Ok(vec![text.to_string()]);
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let greedy = greedy_pack(&words, max_width);
    if greedy.len() == 1 {
        return Ok(greedy);
    }

    let layout = Layout::new(&words, max_width);
    let lines = layout
        .arrange(greedy.len(), true)
        .or_else(|| layout.arrange(greedy.len(), false))
        .unwrap_or(greedy);

    Ok(lines)
}

/// Pack words first-fit. Yields the minimum number of lines.
fn greedy_pack(words: &[&str], max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in words {
        let word_len = word.chars().count();
        if current_len == 0 {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Contiguous word partitions, searched by the length of their longest line.
struct Layout<'a> {
    words: &'a [&'a str],
    /// `prefix[i]` is the total character count of `words[..i]`.
    prefix: Vec<usize>,
    max_width: usize,
}

impl<'a> Layout<'a> {
    fn new(words: &'a [&'a str], max_width: usize) -> Self {
        let mut prefix = Vec::with_capacity(words.len() + 1);
        prefix.push(0);
        for word in words {
            let last = prefix[prefix.len() - 1];
            prefix.push(last + word.chars().count());
        }

        Self {
            words,
            prefix,
            max_width,
        }
    }

    /// Character length of the line holding `words[start..end]`.
    fn line_len(&self, start: usize, end: usize) -> usize {
        self.prefix[end] - self.prefix[start] + (end - start - 1)
    }

    fn line(&self, start: usize, end: usize) -> String {
        self.words[start..end].join(" ")
    }

    /// Find the arrangement into exactly `count` lines with the smallest
    /// longest line. Feasibility only grows with the limit, so the achievable
    /// line lengths are binary searched.
    fn arrange(&self, count: usize, monotone: bool) -> Option<Vec<String>> {
        let n = self.words.len();
        if count == 0 || count > n {
            return None;
        }

        let longest_word = (0..n).map(|i| self.line_len(i, i + 1)).max()?;

        let mut limits: Vec<usize> = Vec::new();
        for start in 0..n {
            for end in start + 1..=n {
                let len = self.line_len(start, end);
                if end - start > 1 && len > self.max_width {
                    break;
                }
                if len >= longest_word {
                    limits.push(len);
                }
            }
        }
        limits.sort_unstable();
        limits.dedup();

        let first_feasible = limits.partition_point(|&limit| {
            self.first_line_table(count, limit, monotone)[count][0].is_none()
        });
        let limit = *limits.get(first_feasible)?;

        self.build(count, limit, monotone)
    }

    /// `table[remaining][start]` is the longest first line with which
    /// `words[start..]` can fill exactly `remaining` lines within `limit`,
    /// or `None` if they cannot. With `monotone`, each line must be at least
    /// as long as the one above it.
    fn first_line_table(
        &self,
        count: usize,
        limit: usize,
        monotone: bool,
    ) -> Vec<Vec<Option<usize>>> {
        let n = self.words.len();
        let mut table = vec![vec![None; n + 1]; count + 1];

        for remaining in 1..=count {
            // Every line above needs at least one word.
            for start in count - remaining..=n - remaining {
                let mut best = None;
                for end in start + 1..=n + 1 - remaining {
                    if !self.fits(start, end, limit) {
                        break;
                    }
                    let len = self.line_len(start, end);
                    if self.can_follow(&table, remaining, end, len, monotone) {
                        best = Some(len);
                    }
                }
                table[remaining][start] = best;
            }
        }

        table
    }

    /// Can `words[end..]` fill the `remaining - 1` lines below a line of
    /// length `len`?
    fn can_follow(
        &self,
        table: &[Vec<Option<usize>>],
        remaining: usize,
        end: usize,
        len: usize,
        monotone: bool,
    ) -> bool {
        if remaining == 1 {
            return end == self.words.len();
        }
        matches!(table[remaining - 1][end], Some(next) if !monotone || next >= len)
    }

    /// Build the arrangement line by line, giving each line the fewest words
    /// that still allow the remaining words to be placed.
    fn build(&self, count: usize, limit: usize, monotone: bool) -> Option<Vec<String>> {
        let table = self.first_line_table(count, limit, monotone);
        table[count][0]?;

        let n = self.words.len();
        let mut lines = Vec::with_capacity(count);
        let mut start = 0;
        let mut floor = 0;

        for remaining in (1..=count).rev() {
            let mut chosen = None;
            for end in start + 1..=n + 1 - remaining {
                if !self.fits(start, end, limit) {
                    break;
                }
                let len = self.line_len(start, end);
                if len < floor {
                    continue;
                }
                if self.can_follow(&table, remaining, end, len, monotone) {
                    chosen = Some((end, len));
                    break;
                }
            }

            let (end, len) = chosen?;
            lines.push(self.line(start, end));
            start = end;
            floor = if monotone { len } else { 0 };
        }

        Some(lines)
    }

    fn fits(&self, start: usize, end: usize, limit: usize) -> bool {
        let len = self.line_len(start, end);
        len <= limit && (end - start == 1 || len <= self.max_width)
    }
}

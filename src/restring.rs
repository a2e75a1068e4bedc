//! Regex-aware string type.
//!
//! [`ReString`] is an owned string whose transforming operations return
//! `ReString` again, so regex and text operations chain:
//!
//! ```
//! use script_glue::ReString;
//!
//! let s = ReString::from("  Build 42 FAILED  ");
//! let cleaned = s.strip(None).lower().sub(r"\d+", "N", 0).unwrap();
//! assert_eq!(cleaned, "build N failed");
//! ```
//!
//! Patterns use `regex` crate syntax. Flags are written inline, e.g.
//! `(?i)` for case-insensitive or `(?m)` for multi-line.

use std::fmt;
use std::ops::{Add, Bound, Deref, RangeBounds};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Owned string with regex operations.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ReString(String);

impl ReString {
    /// Create a new ReString.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into a `String`.
    pub fn into_string(self) -> String {
        self.0
    }

    // Regex operations

    /// Check if `pattern` matches anywhere.
    pub fn is_match(&self, pattern: &str) -> Result<bool> {
        Ok(Regex::new(pattern)?.is_match(&self.0))
    }

    /// Match `pattern` at the start of the string.
    pub fn match_start(&self, pattern: &str) -> Result<Option<Captures<'_>>> {
        let re = Regex::new(pattern)?;
        Ok(re
            .captures(&self.0)
            .filter(|caps| caps.get(0).is_some_and(|m| m.start() == 0)))
    }

    /// Match `pattern` against the whole string.
    pub fn fullmatch(&self, pattern: &str) -> Result<Option<Captures<'_>>> {
        let re = Regex::new(&format!(r"\A(?:{})\z", pattern))?;
        Ok(re.captures(&self.0))
    }

    /// Find the first match of `pattern`.
    pub fn search(&self, pattern: &str) -> Result<Option<Captures<'_>>> {
        Ok(Regex::new(pattern)?.captures(&self.0))
    }

    /// All matches of `pattern`, in order.
    pub fn finditer(&self, pattern: &str) -> Result<Vec<Captures<'_>>> {
        Ok(Regex::new(pattern)?.captures_iter(&self.0).collect())
    }

    /// Matched text for every match: the whole match when `pattern` has no
    /// groups, otherwise the first group (empty if it did not participate).
    ///
    /// Use [`ReString::findall_groups`] for patterns with several groups.
    pub fn findall(&self, pattern: &str) -> Result<Vec<ReString>> {
        let re = Regex::new(pattern)?;
        let group = usize::from(re.captures_len() > 1);
        Ok(re
            .captures_iter(&self.0)
            .map(|caps| Self::group_text(&caps, group))
            .collect())
    }

    /// Every group of every match; the whole match when there are no groups.
    pub fn findall_groups(&self, pattern: &str) -> Result<Vec<Vec<ReString>>> {
        let re = Regex::new(pattern)?;
        let groups = re.captures_len();
        Ok(re
            .captures_iter(&self.0)
            .map(|caps| {
                if groups == 1 {
                    vec![Self::group_text(&caps, 0)]
                } else {
                    (1..groups).map(|i| Self::group_text(&caps, i)).collect()
                }
            })
            .collect())
    }

    fn group_text(caps: &Captures<'_>, index: usize) -> ReString {
        ReString::from(caps.get(index).map_or("", |m| m.as_str()))
    }

    /// Replace matches of `pattern` with `repl` (`$1`, `${name}` expand
    /// groups). `count` of 0 replaces all.
    pub fn sub(&self, pattern: &str, repl: &str, count: usize) -> Result<ReString> {
        Ok(self.subn(pattern, repl, count)?.0)
    }

    /// Like [`ReString::sub`], also returning the number of replacements.
    pub fn subn(&self, pattern: &str, repl: &str, count: usize) -> Result<(ReString, usize)> {
        let re = Regex::new(pattern)?;
        let found = re.find_iter(&self.0).count();
        let replaced = if count == 0 { found } else { found.min(count) };
        let result = re.replacen(&self.0, count, repl);
        Ok((ReString::from(result.into_owned()), replaced))
    }

    /// Split on matches of `pattern`. Text captured by groups in the
    /// pattern is kept between the pieces. `maxsplit` of 0 splits at
    /// every match.
    pub fn resplit(&self, pattern: &str, maxsplit: usize) -> Result<Vec<ReString>> {
        let re = Regex::new(pattern)?;
        let mut pieces = Vec::new();
        let mut last = 0;

        for (n, caps) in re.captures_iter(&self.0).enumerate() {
            if maxsplit != 0 && n >= maxsplit {
                break;
            }
            let Some(whole) = caps.get(0) else {
                continue;
            };
            pieces.push(ReString::from(&self.0[last..whole.start()]));
            pieces.extend(
                caps.iter()
                    .skip(1)
                    .flatten()
                    .map(|m| ReString::from(m.as_str())),
            );
            last = whole.end();
        }

        pieces.push(ReString::from(&self.0[last..]));
        Ok(pieces)
    }

    // String operations

    /// Lowercase.
    pub fn lower(&self) -> ReString {
        ReString(self.0.to_lowercase())
    }

    /// Uppercase.
    pub fn upper(&self) -> ReString {
        ReString(self.0.to_uppercase())
    }

    /// Full Unicode case folding approximation (lowercase).
    pub fn casefold(&self) -> ReString {
        self.lower()
    }

    /// First character uppercased, the rest lowercased.
    pub fn capitalize(&self) -> ReString {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => ReString(
                first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
            ),
            None => ReString::default(),
        }
    }

    /// Uppercase the first letter of every run of letters, lowercase the
    /// rest ("hello world's" -> "Hello World'S").
    pub fn title(&self) -> ReString {
        let mut out = String::with_capacity(self.0.len());
        let mut in_word = false;
        for c in self.0.chars() {
            if c.is_alphabetic() {
                if in_word {
                    out.extend(c.to_lowercase());
                } else {
                    out.extend(c.to_uppercase());
                }
                in_word = true;
            } else {
                out.push(c);
                in_word = false;
            }
        }
        ReString(out)
    }

    /// Swap the case of every character.
    pub fn swapcase(&self) -> ReString {
        let mut out = String::with_capacity(self.0.len());
        for c in self.0.chars() {
            if c.is_uppercase() {
                out.extend(c.to_lowercase());
            } else if c.is_lowercase() {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
        }
        ReString(out)
    }

    /// Trim both ends: whitespace, or any character in `chars`.
    pub fn strip(&self, chars: Option<&str>) -> ReString {
        match chars {
            Some(set) => ReString::from(self.0.trim_matches(|c: char| set.contains(c))),
            None => ReString::from(self.0.trim()),
        }
    }

    /// Trim the start: whitespace, or any character in `chars`.
    pub fn lstrip(&self, chars: Option<&str>) -> ReString {
        match chars {
            Some(set) => ReString::from(self.0.trim_start_matches(|c: char| set.contains(c))),
            None => ReString::from(self.0.trim_start()),
        }
    }

    /// Trim the end: whitespace, or any character in `chars`.
    pub fn rstrip(&self, chars: Option<&str>) -> ReString {
        match chars {
            Some(set) => ReString::from(self.0.trim_end_matches(|c: char| set.contains(c))),
            None => ReString::from(self.0.trim_end()),
        }
    }

    /// Replace occurrences of `old`; `None` replaces all.
    pub fn replace(&self, old: &str, new: &str, count: Option<usize>) -> ReString {
        match count {
            Some(n) => ReString(self.0.replacen(old, new, n)),
            None => ReString(self.0.replace(old, new)),
        }
    }

    /// Split on `sep`, or on runs of whitespace when `sep` is `None`.
    /// At most `maxsplit` splits are made when given. An empty `sep`
    /// does not split.
    pub fn split(&self, sep: Option<&str>, maxsplit: Option<usize>) -> Vec<ReString> {
        match sep {
            Some("") => vec![self.clone()],
            Some(sep) => match maxsplit {
                Some(n) => self.0.splitn(n + 1, sep).map(ReString::from).collect(),
                None => self.0.split(sep).map(ReString::from).collect(),
            },
            None => Self::split_whitespace_n(&self.0, maxsplit),
        }
    }

    fn split_whitespace_n(s: &str, maxsplit: Option<usize>) -> Vec<ReString> {
        let mut pieces = Vec::new();
        let mut rest = s.trim_start();

        while !rest.is_empty() {
            if maxsplit.is_some_and(|n| pieces.len() == n) {
                pieces.push(ReString::from(rest));
                break;
            }
            match rest.find(char::is_whitespace) {
                Some(end) => {
                    pieces.push(ReString::from(&rest[..end]));
                    rest = rest[end..].trim_start();
                }
                None => {
                    pieces.push(ReString::from(rest));
                    break;
                }
            }
        }
        pieces
    }

    /// Join `items` with this string as the separator.
    pub fn join<I, S>(&self, items: I) -> ReString
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = String::new();
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                out.push_str(&self.0);
            }
            out.push_str(item.as_ref());
        }
        ReString(out)
    }

    /// Left-pad with zeros to `width` characters, after any sign.
    pub fn zfill(&self, width: usize) -> ReString {
        let len = self.0.chars().count();
        if len >= width {
            return self.clone();
        }
        let zeros = "0".repeat(width - len);
        match self.0.chars().next() {
            Some(sign @ ('+' | '-')) => ReString(format!("{}{}{}", sign, zeros, &self.0[1..])),
            _ => ReString(format!("{}{}", zeros, self.0)),
        }
    }

    /// Substring by character positions.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> ReString {
        let start = match range.start_bound() {
            Bound::Included(&n) => n,
            Bound::Excluded(&n) => n.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&n) => Some(n.saturating_add(1)),
            Bound::Excluded(&n) => Some(n),
            Bound::Unbounded => None,
        };

        let chars = self.0.chars().skip(start);
        match end {
            Some(end) => ReString(chars.take(end.saturating_sub(start)).collect()),
            None => ReString(chars.collect()),
        }
    }
}

impl Deref for ReString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ReString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ReString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<ReString> for String {
    fn from(value: ReString) -> Self {
        value.0
    }
}

impl PartialEq<str> for ReString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ReString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Add<&str> for ReString {
    type Output = ReString;

    fn add(mut self, other: &str) -> ReString {
        self.0.push_str(other);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rs(s: &str) -> ReString {
        ReString::from(s)
    }

    #[test]
    fn test_match_start_is_anchored() {
        let s = rs("version 1.2.3");
        assert!(s.match_start(r"version").unwrap().is_some());
        assert!(s.match_start(r"\d+").unwrap().is_none());
        assert!(s.search(r"\d+").unwrap().is_some());
    }

    #[test]
    fn test_fullmatch() {
        let s = rs("abc123");
        assert!(s.fullmatch(r"[a-z]+\d+").unwrap().is_some());
        assert!(s.fullmatch(r"[a-z]+").unwrap().is_none());
        // Alternation must not escape the anchors
        assert!(s.fullmatch(r"abc|xyz").unwrap().is_none());
    }

    #[test]
    fn test_search_groups() {
        let s = rs("user=alice id=42");
        let caps = s.search(r"id=(\d+)").unwrap().unwrap();
        assert_eq!(&caps[1], "42");
    }

    #[test]
    fn test_invalid_pattern() {
        let s = rs("text");
        assert!(matches!(
            s.search("(unclosed"),
            Err(crate::GlueError::Regex(_))
        ));
    }

    #[test]
    fn test_sub_and_subn() {
        let s = rs("a1b22c333");
        assert_eq!(s.sub(r"\d+", "#", 0).unwrap(), "a#b#c#");
        assert_eq!(s.sub(r"\d+", "#", 2).unwrap(), "a#b#c333");

        let (result, n) = s.subn(r"\d+", "<$0>", 0).unwrap();
        assert_eq!(result, "a<1>b<22>c<333>");
        assert_eq!(n, 3);

        let (_, n) = s.subn(r"\d+", "", 1).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_resplit() {
        let s = rs("a, b;c ,d");
        assert_eq!(s.resplit(r"\s*[,;]\s*", 0).unwrap(), vec!["a", "b", "c", "d"]);
        assert_eq!(s.resplit(r"\s*[,;]\s*", 2).unwrap(), vec!["a", "b", "c ,d"]);
    }

    #[test]
    fn test_resplit_keeps_groups() {
        let s = rs("1+2-3");
        assert_eq!(
            s.resplit(r"([+-])", 0).unwrap(),
            vec!["1", "+", "2", "-", "3"]
        );
    }

    #[test]
    fn test_findall() {
        let s = rs("x=1 y=22 z=333");
        assert_eq!(s.findall(r"\d+").unwrap(), vec!["1", "22", "333"]);
        assert_eq!(s.findall(r"(\w)=").unwrap(), vec!["x", "y", "z"]);

        let groups = s.findall_groups(r"(\w)=(\d+)").unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[1], vec!["y", "22"]);
    }

    #[test]
    fn test_finditer() {
        let s = rs("ab12cd345");
        let spans: Vec<_> = s
            .finditer(r"\d+")
            .unwrap()
            .iter()
            .map(|c| c.get(0).unwrap().range())
            .collect();
        assert_eq!(spans, vec![2..4, 6..9]);
    }

    #[test]
    fn test_case_operations() {
        let s = rs("hello WORLD's test");
        assert_eq!(s.upper(), "HELLO WORLD'S TEST");
        assert_eq!(s.lower(), "hello world's test");
        assert_eq!(s.capitalize(), "Hello world's test");
        assert_eq!(s.title(), "Hello World'S Test");
        assert_eq!(s.swapcase(), "HELLO world'S TEST");
        assert_eq!(rs("").capitalize(), "");
    }

    #[test]
    fn test_strip() {
        let s = rs("  xxpaddedxx  ");
        assert_eq!(s.strip(None), "xxpaddedxx");
        assert_eq!(s.lstrip(None), "xxpaddedxx  ");
        assert_eq!(s.rstrip(None), "  xxpaddedxx");
        assert_eq!(s.strip(None).strip(Some("x")), "padded");
        assert_eq!(rs("--a--").lstrip(Some("-")), "a--");
    }

    #[test]
    fn test_replace() {
        let s = rs("a.b.c");
        assert_eq!(s.replace(".", "/", None), "a/b/c");
        assert_eq!(s.replace(".", "/", Some(1)), "a/b.c");
    }

    #[test]
    fn test_split() {
        let s = rs("  one two   three ");
        assert_eq!(s.split(None, None), vec!["one", "two", "three"]);
        assert_eq!(s.split(None, Some(1)), vec!["one", "two   three "]);

        let csv = rs("a,b,,c");
        assert_eq!(csv.split(Some(","), None), vec!["a", "b", "", "c"]);
        assert_eq!(csv.split(Some(","), Some(1)), vec!["a", "b,,c"]);
        assert!(rs("   ").split(None, None).is_empty());
    }

    #[test]
    fn test_join() {
        let sep = rs(", ");
        assert_eq!(sep.join(["a", "b", "c"]), "a, b, c");
        assert_eq!(sep.join(Vec::<String>::new()), "");
    }

    #[test]
    fn test_zfill() {
        assert_eq!(rs("42").zfill(5), "00042");
        assert_eq!(rs("-42").zfill(5), "-0042");
        assert_eq!(rs("12345").zfill(3), "12345");
    }

    #[test]
    fn test_slice() {
        let s = rs("日本語テキスト");
        assert_eq!(s.slice(0..3), "日本語");
        assert_eq!(s.slice(3..), "テキスト");
        assert_eq!(s.slice(..=0), "日");
        assert_eq!(s.slice(10..), "");
    }

    #[test]
    fn test_slice_extreme_bounds() {
        let s = rs("abc");
        assert_eq!(s.slice(..=usize::MAX), "abc");
        assert_eq!(s.slice(1..=usize::MAX), "bc");
        assert_eq!(s.slice((Bound::Excluded(usize::MAX), Bound::Unbounded)), "");
        assert_eq!(s.slice((Bound::Excluded(0), Bound::Included(usize::MAX))), "bc");
    }

    #[test]
    fn test_add_and_deref() {
        let s = rs("file") + ".txt";
        assert_eq!(s, "file.txt");
        assert!(s.ends_with(".txt"));
        assert_eq!(s.len(), 8);
        assert_eq!(String::from(s), "file.txt");
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&rs("quoted")).unwrap();
        assert_eq!(json, "\"quoted\"");
        let back: ReString = serde_json::from_str(&json).unwrap();
        assert_eq!(back, "quoted");
    }
}

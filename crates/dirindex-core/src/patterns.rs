//! Exclusion patterns.
//!
//! A small gitignore-like language. Each pattern is one of:
//!
//! - `*.txt`: no separator, matched against the final path component;
//! - `/tmp/*`: leading separator, matched component-wise from the root;
//! - `logs/*.txt`: interior separator, matched against any run of
//!   consecutive components;
//! - `.git/`: trailing separator, matches the directory and everything
//!   beneath it.
//!
//! Components are compared with shell-style globs (`*`, `?`, `[a-z]`).

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobMatcher};

use crate::error::IndexError;

/// One glob compared against exactly one path component.
#[derive(Debug, Clone)]
struct Segment(Option<GlobMatcher>);

impl Segment {
    fn new(glob: &str) -> Self {
        match Glob::new(glob) {
            Ok(glob) => Self(Some(glob.compile_matcher())),
            Err(err) => {
                tracing::warn!(pattern = glob, error = %err, "invalid glob, it will never match");
                Self(None)
            }
        }
    }

    fn is_match(&self, component: &str) -> bool {
        self.0.as_ref().is_some_and(|m| m.is_match(component))
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Basename(Segment),
    Anchored(Vec<Segment>),
    Floating(Vec<Segment>),
    /// The bare directory name, or anything below it.
    Directory(Box<Matcher>, Box<Matcher>),
}

impl Matcher {
    fn compile(pattern: &str) -> Self {
        if let Some(bare) = pattern.strip_suffix('/') {
            return Self::Directory(
                Box::new(Self::compile(bare)),
                Box::new(Self::compile(&format!("{pattern}*"))),
            );
        }

        if !pattern.contains('/') {
            return Self::Basename(Segment::new(pattern));
        }

        match pattern.strip_prefix('/') {
            Some(rest) => Self::Anchored(rest.split('/').map(Segment::new).collect()),
            None => Self::Floating(pattern.split('/').map(Segment::new).collect()),
        }
    }

    fn is_match(&self, path: &Path, components: &[Cow<'_, str>]) -> bool {
        match self {
            Self::Basename(segment) => segment.is_match(&base_name(path)),
            Self::Anchored(segments) => segments_match(segments, components),
            Self::Floating(segments) => components
                .windows(segments.len())
                .any(|window| segments_match(segments, window)),
            Self::Directory(bare, contents) => {
                bare.is_match(path, components) || contents.is_match(path, components)
            }
        }
    }
}

/// Positional match; the path may be longer than the pattern.
fn segments_match(segments: &[Segment], components: &[Cow<'_, str>]) -> bool {
    components.len() >= segments.len()
        && segments
            .iter()
            .zip(components)
            .all(|(segment, component)| segment.is_match(component))
}

fn base_name(path: &Path) -> Cow<'_, str> {
    match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => path.to_string_lossy(),
    }
}

fn components(path: &Path) -> Vec<Cow<'_, str>> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::CurDir => Some(Cow::Borrowed(".")),
            Component::ParentDir => Some(Cow::Borrowed("..")),
            Component::RootDir | Component::Prefix(_) => None,
        })
        .collect()
}

/// A single compiled exclusion pattern.
#[derive(Debug, Clone)]
pub struct ExclusionPattern {
    source: String,
    matcher: Matcher,
}

impl ExclusionPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        let source = pattern.into();
        let matcher = Matcher::compile(&source);
        Self { source, matcher }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.matcher.is_match(path, &components(path))
    }
}

/// Ordered list of exclusion patterns. The first match wins.
#[derive(Debug, Clone, Default)]
pub struct ExclusionPatterns {
    patterns: Vec<ExclusionPattern>,
}

impl ExclusionPatterns {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(ExclusionPattern::new).collect(),
        }
    }

    /// Parse pattern file contents: one pattern per line, `#` comments and
    /// blank lines ignored, surrounding whitespace trimmed.
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Load patterns from a pattern file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| IndexError::PatternFile {
            path: PathBuf::from(path),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    /// Append a pattern with the lowest priority.
    pub fn push(&mut self, pattern: impl Into<String>) {
        self.patterns.push(ExclusionPattern::new(pattern));
    }

    /// Return the first pattern matching `path`.
    pub fn first_match(&self, path: &Path) -> Option<&str> {
        let components = components(path);
        self.patterns
            .iter()
            .find(|p| p.matcher.is_match(path, &components))
            .map(ExclusionPattern::as_str)
    }

    /// Whether `path` is excluded, together with the pattern responsible.
    pub fn is_excluded(&self, path: &Path) -> (bool, Option<&str>) {
        let matched = self.first_match(path);
        (matched.is_some(), matched)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(ExclusionPattern::as_str)
    }
}

/// Match a single pattern against a path.
pub fn pattern_matches(pattern: &str, path: impl AsRef<Path>) -> bool {
    ExclusionPattern::new(pattern).matches(path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_table() {
        let cases = [
            ("*.txt", "file.txt", true),
            ("*.txt", "file.jpg", false),
            ("*.txt", "/tmp/file.txt", true),
            ("logs/*.txt", "logs/file.txt", true),
            ("logs/*.txt", "logs/file.jpg", false),
            ("logs/*.txt", "logs/a/b/cde", false),
            ("logs/*.txt", "/tmp/logs/file.txt", true),
            ("logs/*.txt", "/a/b/c/d", false),
            ("logs/*.txt", "/root/logs/a/b", false),
            ("/a/*/b/*", "/a/x/b/d", true),
            ("/a/*/b/*", "/a/b/c/d", false),
            ("/logs/*.txt", "/a/logs/file.txt", false),
        ];

        for (pattern, path, expected) in cases {
            assert_eq!(
                pattern_matches(pattern, path),
                expected,
                "pattern {pattern:?} against {path:?}"
            );
        }
    }

    #[test]
    fn test_anchored_pattern() {
        assert!(pattern_matches("/tmp/*", "/tmp/file.txt"));
        assert!(!pattern_matches("/tmp/*", "/usr/tmp/file.txt"));
    }

    #[test]
    fn test_directory_marker() {
        assert!(pattern_matches(".git/", "/repo/.git"));
        assert!(pattern_matches(".git/", "/repo/.git/HEAD"));
        assert!(!pattern_matches(".git/", "/repo/.gitignore"));
        assert!(pattern_matches("/var/cache/", "/var/cache"));
        assert!(pattern_matches("/var/cache/", "/var/cache/apt"));
    }

    #[test]
    fn test_character_classes() {
        assert!(pattern_matches("core.[0-9]*", "/tmp/core.1234"));
        assert!(pattern_matches("?.o", "/build/a.o"));
        assert!(!pattern_matches("?.o", "/build/ab.o"));
    }

    #[test]
    fn test_invalid_glob_never_matches() {
        assert!(!pattern_matches("[unclosed", "/tmp/[unclosed"));
    }

    #[test]
    fn test_first_match_wins() {
        let patterns = ExclusionPatterns::new(["/a/*/b/*", "*.txt", "/tmp/*", "logs/*.txt"]);

        assert_eq!(patterns.is_excluded(Path::new("/a/x/b/d")), (true, Some("/a/*/b/*")));
        assert_eq!(patterns.first_match(Path::new("/tmp/file.txt")), Some("*.txt"));
        assert_eq!(patterns.first_match(Path::new("/tmp/file.jpg")), Some("/tmp/*"));
        assert_eq!(patterns.is_excluded(Path::new("logs/a/b/cde")), (false, None));
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let patterns = ExclusionPatterns::parse("# build output\n\n  target/  \n*.o\n#*.rs\n");
        assert_eq!(patterns.iter().collect::<Vec<_>>(), vec!["target/", "*.o"]);
    }
}

//! # Validation Path
//!
//! Parent keys and indexes accumulated while matching nested data. The
//! path is only used to render the diagnostic name carried by a
//! [`ValidationError`](crate::ValidationError): the root name followed by
//! every segment in brackets, outermost first.

use std::fmt;

/// One step from a parent value into a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A mapping key, rendered as `['key']`.
    Key(String),
    /// A sequence index, rendered as `[3]`.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => {
                f.write_str("['")?;
                for ch in key.chars() {
                    match ch {
                        '\'' => f.write_str("\\'")?,
                        '\\' => f.write_str("\\\\")?,
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("']")
            }
            PathSegment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Ordered sequence of segments from the root to the value being matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationPath {
    segments: Vec<PathSegment>,
}

impl ValidationPath {
    /// An empty path (the root value).
    pub fn new() -> Self {
        Self::default()
    }

    /// Descend into a child.
    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    /// Return to the parent.
    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Render `name` qualified by this path, e.g. `variable['users'][2]`.
    pub fn qualify(&self, name: &str) -> String {
        let mut rendered = String::from(name);
        for segment in &self.segments {
            rendered.push_str(&segment.to_string());
        }
        rendered
    }
}

impl FromIterator<PathSegment> for ValidationPath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_renders_bare_name() {
        assert_eq!(ValidationPath::new().qualify("variable"), "variable");
    }

    #[test]
    fn segments_render_outermost_first() {
        let path: ValidationPath = [
            PathSegment::Key("users".to_string()),
            PathSegment::Index(2),
            PathSegment::Key("name".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(path.qualify("config"), "config['users'][2]['name']");
    }

    #[test]
    fn key_quotes_are_escaped() {
        let segment = PathSegment::Key("it's".to_string());
        assert_eq!(segment.to_string(), r"['it\'s']");
    }

    #[test]
    fn push_and_pop_restore_parent() {
        let mut path = ValidationPath::new();
        path.push(PathSegment::Index(0));
        assert_eq!(path.qualify("v"), "v[0]");
        assert_eq!(path.pop(), Some(PathSegment::Index(0)));
        assert!(path.is_empty());
    }
}

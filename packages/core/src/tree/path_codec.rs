//! Path Codec
//!
//! Pure functions for materialized paths. A path is the list of ancestor ids,
//! oldest first, followed by the node's own id, joined by a separator:
//!
//! ```text
//! adam                root
//! adam#carol          child of adam
//! adam#carol#dann     grandchild
//! ```
//!
//! Every strict descendant of `adam#carol` has a path starting with
//! `adam#carol#`, which is what makes subtree queries a prefix range scan.

/// Default separator joining identifier segments
pub const DEFAULT_PATH_SEPARATOR: &str = "#";

/// Encoder/decoder for materialized paths with a fixed separator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCodec {
    separator: String,
}

impl Default for PathCodec {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_SEPARATOR)
    }
}

impl PathCodec {
    /// Create a codec for the given separator
    ///
    /// The separator is validated by `TreeConfig::validate`; the codec itself
    /// assumes it is non-empty.
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// The separator this codec joins segments with
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Whether an identifier would corrupt paths built with this separator
    pub fn contains_separator(&self, id: &str) -> bool {
        id.contains(self.separator.as_str())
    }

    /// Path of a child given its parent's path
    ///
    /// An empty parent path is the root case and yields the bare id.
    ///
    /// ```rust
    /// # use pathtree_core::tree::PathCodec;
    /// let codec = PathCodec::default();
    /// assert_eq!(codec.encode_child("", "adam"), "adam");
    /// assert_eq!(codec.encode_child("adam#carol", "dann"), "adam#carol#dann");
    /// ```
    pub fn encode_child(&self, parent_path: &str, id: &str) -> String {
        if parent_path.is_empty() {
            return id.to_string();
        }

        let mut path = String::with_capacity(parent_path.len() + self.separator.len() + id.len());
        path.push_str(parent_path);
        path.push_str(&self.separator);
        path.push_str(id);
        path
    }

    /// Split a path into its identifiers, own id last
    pub fn decode<'p>(&self, path: &'p str) -> Vec<&'p str> {
        path.split(self.separator.as_str()).collect()
    }

    /// Identifiers of all ancestors, oldest first
    ///
    /// ```rust
    /// # use pathtree_core::tree::PathCodec;
    /// let codec = PathCodec::default();
    /// assert_eq!(codec.ancestor_ids(Some("adam#carol#dann")), vec!["adam", "carol"]);
    /// assert!(codec.ancestor_ids(Some("adam")).is_empty());
    /// assert!(codec.ancestor_ids(None).is_empty());
    /// ```
    pub fn ancestor_ids<'p>(&self, path: Option<&'p str>) -> Vec<&'p str> {
        let Some(path) = path else {
            return Vec::new();
        };

        let mut ids = self.decode(path);
        ids.pop();
        ids
    }

    /// Number of segments in the path, counting the node itself
    ///
    /// A root has depth 1; a node without a path has depth 0.
    pub fn depth(&self, path: Option<&str>) -> usize {
        match path {
            Some(path) => path.split(self.separator.as_str()).count(),
            None => 0,
        }
    }

    /// Prefix shared by the paths of every strict descendant
    pub fn subtree_prefix(&self, path: &str) -> String {
        let mut prefix = String::with_capacity(path.len() + self.separator.len());
        prefix.push_str(path);
        prefix.push_str(&self.separator);
        prefix
    }

    /// Whether `path` lies strictly inside the subtree rooted at `ancestor_path`
    pub fn is_ancestor_path(&self, ancestor_path: &str, path: &str) -> bool {
        path.len() > ancestor_path.len()
            && path.starts_with(ancestor_path)
            && path[ancestor_path.len()..].starts_with(self.separator.as_str())
    }

    /// Move a descendant's path from under `old_path` to under `new_path`
    ///
    /// Returns `None` when `descendant_path` is not inside `old_path`'s subtree.
    ///
    /// ```rust
    /// # use pathtree_core::tree::PathCodec;
    /// let codec = PathCodec::default();
    /// assert_eq!(
    ///     codec.rebase("adam#carol#dann", "adam#carol", "adam#bob#carol").as_deref(),
    ///     Some("adam#bob#carol#dann"),
    /// );
    /// assert_eq!(codec.rebase("adam#carolyn", "adam#carol", "bob#carol"), None);
    /// ```
    pub fn rebase(&self, descendant_path: &str, old_path: &str, new_path: &str) -> Option<String> {
        if !self.is_ancestor_path(old_path, descendant_path) {
            return None;
        }

        let suffix = &descendant_path[old_path.len()..];
        let mut rebased = String::with_capacity(new_path.len() + suffix.len());
        rebased.push_str(new_path);
        rebased.push_str(suffix);
        Some(rebased)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_root_and_child() {
        let codec = PathCodec::default();
        assert_eq!(codec.encode_child("", "adam"), "adam");
        assert_eq!(codec.encode_child("adam", "carol"), "adam#carol");
    }

    #[test]
    fn test_decode_keeps_own_id_last() {
        let codec = PathCodec::default();
        assert_eq!(codec.decode("a#b#c"), vec!["a", "b", "c"]);
        assert_eq!(codec.decode("a"), vec!["a"]);
    }

    #[test]
    fn test_depth_counts_segments() {
        let codec = PathCodec::default();
        assert_eq!(codec.depth(None), 0);
        assert_eq!(codec.depth(Some("adam")), 1);
        assert_eq!(codec.depth(Some("adam#carol#dann")), 3);
    }

    #[test]
    fn test_ancestor_path_requires_separator_boundary() {
        let codec = PathCodec::default();
        assert!(codec.is_ancestor_path("adam#carol", "adam#carol#dann"));
        assert!(!codec.is_ancestor_path("adam#carol", "adam#carol"));
        assert!(!codec.is_ancestor_path("adam#carol", "adam#carolyn"));
        assert!(!codec.is_ancestor_path("adam#carol#dann", "adam#carol"));
    }

    #[test]
    fn test_rebase_to_root() {
        let codec = PathCodec::default();
        assert_eq!(
            codec.rebase("adam#carol#dann#emily", "adam#carol", "carol"),
            Some("carol#dann#emily".to_string())
        );
    }

    #[test]
    fn test_multi_char_separator() {
        let codec = PathCodec::new("::");
        assert_eq!(codec.encode_child("a::b", "c"), "a::b::c");
        assert_eq!(codec.ancestor_ids(Some("a::b::c")), vec!["a", "b"]);
        assert_eq!(codec.subtree_prefix("a::b"), "a::b::");
        assert!(codec.contains_separator("x::y"));
        assert!(!codec.contains_separator("x:y"));
        assert_eq!(codec.rebase("a::b::c", "a::b", "z::b"), Some("z::b::c".to_string()));
    }
}

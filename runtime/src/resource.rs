//! Resource classification and per-path load requests.
//!
//! A path may carry an explicit kind prefix (`css!`, `img!`, `js!`). Without
//! one, the kind is inferred from the path suffix. Inference is only a
//! default: callers can force a kind through
//! [`LoadOptions::kind`](crate::options::LoadOptions::kind).

use serde::{Deserialize, Serialize};

/// Image suffixes recognised by [`ResourceKind::infer`].
const IMAGE_EXTENSIONS: &[&str] = &["png", "gif", "jpg", "jpeg", "svg", "webp", "avif"];

/// What a loader should do with a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Script,
    Stylesheet,
    Image,
}

impl ResourceKind {
    /// Infer the kind from the path suffix, ignoring any query or fragment.
    pub fn infer(path: &str) -> Self {
        let bare = path.split(['?', '#']).next().unwrap_or(path);
        let ext = bare
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        if ext == "css" {
            ResourceKind::Stylesheet
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            ResourceKind::Image
        } else {
            ResourceKind::Script
        }
    }

    /// Split an explicit `kind!` prefix off a path.
    ///
    /// Returns `None` for the kind when the path has no recognised prefix.
    pub fn strip_prefix(path: &str) -> (Option<Self>, &str) {
        if let Some(rest) = path.strip_prefix("css!") {
            (Some(ResourceKind::Stylesheet), rest)
        } else if let Some(rest) = path.strip_prefix("img!") {
            (Some(ResourceKind::Image), rest)
        } else if let Some(rest) = path.strip_prefix("js!") {
            (Some(ResourceKind::Script), rest)
        } else {
            (None, path)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Script => "script",
            ResourceKind::Stylesheet => "stylesheet",
            ResourceKind::Image => "image",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single resource handed to a [`ResourceLoader`](crate::loaders::ResourceLoader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// Location of the resource, with any kind prefix removed.
    pub path: String,
    pub kind: ResourceKind,
    /// Whether the host may execute the resource out of insertion order.
    pub async_load: bool,
}

impl ResourceRequest {
    /// Build a request from a caller-supplied path.
    ///
    /// Precedence for the kind: `forced`, then a path prefix, then suffix
    /// inference.
    pub fn new(path: &str, forced: Option<ResourceKind>, async_load: bool) -> Self {
        let (prefixed, bare) = ResourceKind::strip_prefix(path);
        let kind = forced
            .or(prefixed)
            .unwrap_or_else(|| ResourceKind::infer(bare));

        Self {
            path: bare.to_string(),
            kind,
            async_load,
        }
    }
}

/// Values accepted where the API takes "one or many" strings.
///
/// A single path or bundle id is treated as a one-element list.
pub trait OneOrMany {
    fn into_vec(self) -> Vec<String>;
}

impl OneOrMany for &str {
    fn into_vec(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl OneOrMany for String {
    fn into_vec(self) -> Vec<String> {
        vec![self]
    }
}

impl OneOrMany for &String {
    fn into_vec(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl<T: Into<String>> OneOrMany for Vec<T> {
    fn into_vec(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<String> + Clone> OneOrMany for &[T] {
    fn into_vec(self) -> Vec<String> {
        self.iter().cloned().map(Into::into).collect()
    }
}

impl<T: Into<String>, const N: usize> OneOrMany for [T; N] {
    fn into_vec(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

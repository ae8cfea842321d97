//! Keys, paths and the path normalizer

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::iter::Peekable;
use std::ops::Deref;
use std::str::CharIndices;
use std::sync::{Arc, LazyLock};

/// A single path segment. Integer keys address the same branch entry as
/// their decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    /// The branch-map key this segment looks up.
    pub fn as_map_key(&self) -> Cow<'_, str> {
        match self {
            Key::Str(s) => Cow::Borrowed(s.as_str()),
            Key::Int(i) => Cow::Owned(i.to_string()),
        }
    }

    /// Convert a JSON scalar found in a reference target or a wire path.
    pub fn from_json(value: &serde_json::Value) -> Option<Key> {
        match value {
            serde_json::Value::String(s) => Some(Key::Str(s.clone())),
            serde_json::Value::Number(n) => n.as_i64().map(Key::Int),
            serde_json::Value::Bool(b) => Some(Key::Str(b.to_string())),
            serde_json::Value::Null => Some(Key::Str("null".to_string())),
            _ => None,
        }
    }

    fn is_identifier(s: &str) -> bool {
        !s.is_empty()
            && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '-')
            && !s.starts_with(|c: char| c.is_ascii_digit() || c == '-')
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => f.write_str(s),
            Key::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Str(s.clone())
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i64::from(i))
    }
}

impl From<u32> for Key {
    fn from(i: u32) -> Self {
        Key::Int(i64::from(i))
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Int(i as i64)
    }
}

/// An immutable, ordered sequence of keys addressing a location in the graph.
///
/// Cloning is cheap; memoized parses hand out clones of the same allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Vec<Key>", into = "Vec<Key>")]
pub struct Path(Arc<[Key]>);

impl Path {
    pub fn new(keys: Vec<Key>) -> Self {
        Path(keys.into())
    }

    pub fn empty() -> Self {
        Path(Arc::from(Vec::new()))
    }

    /// Normalize positional arguments. Every argument is one opaque key, so
    /// a lone `"foo.bar"` stays a single key; only [`parse`] reads path syntax.
    pub fn from_args<I, K>(args: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Path::new(args.into_iter().map(Into::into).collect())
    }

    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    /// `keys` with every key in its map-key form, so `[7]` and `["7"]`
    /// compare equal.
    pub fn canonical(keys: &[Key]) -> Path {
        Path::from_args(keys.iter().map(|key| Key::Str(key.as_map_key().into_owned())))
    }

    /// This path followed by `rest`.
    pub fn concat(&self, rest: &[Key]) -> Path {
        let mut keys = Vec::with_capacity(self.len() + rest.len());
        keys.extend_from_slice(&self.0);
        keys.extend_from_slice(rest);
        Path::new(keys)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.0
                .iter()
                .map(|key| match key {
                    Key::Int(i) => serde_json::Value::from(*i),
                    Key::Str(s) => serde_json::Value::from(s.as_str()),
                })
                .collect(),
        )
    }
}

impl Deref for Path {
    type Target = [Key];

    fn deref(&self) -> &[Key] {
        &self.0
    }
}

impl From<Vec<Key>> for Path {
    fn from(keys: Vec<Key>) -> Self {
        Path::new(keys)
    }
}

impl From<Path> for Vec<Key> {
    fn from(path: Path) -> Self {
        path.0.to_vec()
    }
}

impl fmt::Display for Path {
    /// Renders path syntax that [`parse`] reads back.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            match key {
                Key::Int(n) => write!(f, "[{n}]")?,
                Key::Str(s) if Key::is_identifier(s) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(s)?;
                }
                Key::Str(s) => {
                    let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
                    write!(f, "[{quoted}]")?;
                }
            }
        }
        Ok(())
    }
}

/// Build a [`Path`] from positional keys: `path!["users", 0, "name"]`.
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::empty()
    };
    ($($key:expr),+ $(,)?) => {
        $crate::Path::new(vec![$($crate::Key::from($key)),+])
    };
}

/// Malformed path syntax.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("unexpected {found} at offset {offset} in path `{input}`")]
    Unexpected {
        input: String,
        offset: usize,
        found: String,
    },
    #[error("unterminated {what} at offset {offset} in path `{input}`")]
    Unterminated {
        input: String,
        offset: usize,
        what: &'static str,
    },
    #[error("{what} are not supported (offset {offset} in path `{input}`)")]
    Unsupported {
        input: String,
        offset: usize,
        what: &'static str,
    },
}

/// Parsed paths are memoized; the table is dropped wholesale when it fills.
const PARSE_CACHE_LIMIT: usize = 4096;

static PARSE_CACHE: LazyLock<DashMap<String, Path>> = LazyLock::new(DashMap::new);

/// Parse path syntax: `a.b`, `a[0]`, `a["b c"]`, `a['b']`.
///
/// Results are memoized, so identical input always yields the same keys.
pub fn parse(input: &str) -> Result<Path, PathError> {
    if let Some(path) = PARSE_CACHE.get(input) {
        return Ok(path.clone());
    }
    let path = parse_uncached(input)?;
    if PARSE_CACHE.len() >= PARSE_CACHE_LIMIT {
        PARSE_CACHE.clear();
    }
    PARSE_CACHE.insert(input.to_string(), path.clone());
    Ok(path)
}

fn parse_uncached(input: &str) -> Result<Path, PathError> {
    if input.trim().is_empty() {
        return Err(PathError::Empty);
    }
    let mut parser = PathParser {
        input,
        chars: input.char_indices().peekable(),
    };
    parser.run().map(Path::new)
}

struct PathParser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl PathParser<'_> {
    fn run(&mut self) -> Result<Vec<Key>, PathError> {
        let mut keys = Vec::new();
        match self.chars.peek().copied() {
            Some((_, '[')) => {}
            _ => keys.push(self.identifier()?),
        }
        while let Some((offset, c)) = self.chars.next() {
            match c {
                '.' => keys.push(self.identifier()?),
                '[' => keys.push(self.indexer(offset)?),
                other => return Err(self.unexpected(offset, other)),
            }
        }
        Ok(keys)
    }

    fn identifier(&mut self) -> Result<Key, PathError> {
        let start = self.chars.peek().map_or(self.input.len(), |(i, _)| *i);
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            match c {
                '.' | '[' => break,
                ']' | '"' | '\'' => return Err(self.unexpected(i, c)),
                c if c.is_whitespace() => return Err(self.unexpected(i, c)),
                _ => {
                    end = i + c.len_utf8();
                    self.chars.next();
                }
            }
        }
        if start == end {
            let found = match self.chars.peek() {
                Some(&(_, c)) => format!("`{c}`"),
                None => "end of input".to_string(),
            };
            return Err(PathError::Unexpected {
                input: self.input.to_string(),
                offset: start,
                found,
            });
        }
        Ok(Key::Str(self.input[start..end].to_string()))
    }

    fn indexer(&mut self, open: usize) -> Result<Key, PathError> {
        self.skip_whitespace();
        let key = match self.chars.peek().copied() {
            Some((_, quote @ ('"' | '\''))) => {
                self.chars.next();
                Key::Str(self.quoted(open, quote)?)
            }
            Some((_, c)) if c.is_ascii_digit() || c == '-' => self.integer()?,
            Some((offset, c)) => return Err(self.unexpected(offset, c)),
            None => return Err(self.unterminated(open, "indexer")),
        };
        self.skip_whitespace();
        match self.chars.next() {
            Some((_, ']')) => Ok(key),
            Some((offset, ',')) => Err(self.unsupported(offset, "key sets")),
            Some((offset, '.')) => Err(self.unsupported(offset, "ranges")),
            Some((offset, c)) => Err(self.unexpected(offset, c)),
            None => Err(self.unterminated(open, "indexer")),
        }
    }

    fn integer(&mut self) -> Result<Key, PathError> {
        let start = self.chars.peek().map_or(self.input.len(), |(i, _)| *i);
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_digit() || (c == '-' && i == start) {
                end = i + 1;
                self.chars.next();
            } else {
                break;
            }
        }
        self.input[start..end]
            .parse::<i64>()
            .map(Key::Int)
            .map_err(|_| PathError::Unexpected {
                input: self.input.to_string(),
                offset: start,
                found: format!("`{}`", &self.input[start..end]),
            })
    }

    fn quoted(&mut self, open: usize, quote: char) -> Result<String, PathError> {
        let mut out = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
        Err(self.unterminated(open, "string"))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn unexpected(&self, offset: usize, c: char) -> PathError {
        PathError::Unexpected {
            input: self.input.to_string(),
            offset,
            found: format!("`{c}`"),
        }
    }

    fn unterminated(&self, offset: usize, what: &'static str) -> PathError {
        PathError::Unterminated {
            input: self.input.to_string(),
            offset,
            what,
        }
    }

    fn unsupported(&self, offset: usize, what: &'static str) -> PathError {
        PathError::Unsupported {
            input: self.input.to_string(),
            offset,
            what,
        }
    }
}

/// Anything a caller may address a graph location with.
pub trait IntoPath {
    fn into_path(self) -> Result<Path, PathError>;
}

impl IntoPath for Path {
    fn into_path(self) -> Result<Path, PathError> {
        Ok(self)
    }
}

impl IntoPath for &Path {
    fn into_path(self) -> Result<Path, PathError> {
        Ok(self.clone())
    }
}

impl IntoPath for Vec<Key> {
    fn into_path(self) -> Result<Path, PathError> {
        Ok(Path::new(self))
    }
}

impl IntoPath for &[Key] {
    fn into_path(self) -> Result<Path, PathError> {
        Ok(Path::new(self.to_vec()))
    }
}

impl<K: Into<Key>, const N: usize> IntoPath for [K; N] {
    fn into_path(self) -> Result<Path, PathError> {
        Ok(Path::from_args(self))
    }
}

/// Strings are path syntax.
impl IntoPath for &str {
    fn into_path(self) -> Result<Path, PathError> {
        parse(self)
    }
}

impl IntoPath for String {
    fn into_path(self) -> Result<Path, PathError> {
        parse(&self)
    }
}

impl IntoPath for &String {
    fn into_path(self) -> Result<Path, PathError> {
        parse(self)
    }
}

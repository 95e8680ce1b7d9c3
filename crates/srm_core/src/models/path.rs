//! Structured, platform-neutral file paths.
//!
//! Paths arrive in whatever shape the originating platform produced:
//! a POSIX string, a Windows string with a drive letter, a list of
//! components, or a `path.parse`-style object. Intake (`PathInput`)
//! accepts any of these; `FilePath::normalize` is the separate step that
//! turns them into a root plus clean components, or fails with `PathError`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons a path input cannot be normalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path does not name a file")]
    NoFileName,

    #[error("unsupported path shape: {0}")]
    UnsupportedShape(String),

    #[error("path component {index} is not a string")]
    NonStringComponent { index: usize },

    #[error("path escapes its root via '..'")]
    EscapesRoot,

    #[error("path contains a NUL byte")]
    NulByte,
}

/// Where a path is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathRoot {
    /// No root; relative to whatever the consumer decides.
    Relative,
    /// POSIX root `/`.
    Posix,
    /// Drive root such as `C:`; letter stored uppercase.
    Drive(char),
}

impl PathRoot {
    fn as_prefix(&self) -> String {
        match self {
            Self::Relative => String::new(),
            Self::Posix => "/".to_string(),
            Self::Drive(letter) => format!("{}:/", letter),
        }
    }
}

/// Raw path as received at intake. Any JSON shape is held here unchecked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathInput(Value);

impl PathInput {
    /// Wrap an arbitrary value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The raw value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Run the normalization step.
    pub fn normalize(&self) -> Result<FilePath, PathError> {
        FilePath::normalize(self)
    }
}

impl From<&str> for PathInput {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<String> for PathInput {
    fn from(value: String) -> Self {
        Self(Value::String(value))
    }
}

impl From<&Path> for PathInput {
    fn from(value: &Path) -> Self {
        Self(Value::String(value.to_string_lossy().into_owned()))
    }
}

impl From<PathBuf> for PathInput {
    fn from(value: PathBuf) -> Self {
        Self::from(value.as_path())
    }
}

impl From<Value> for PathInput {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<&FilePath> for PathInput {
    fn from(value: &FilePath) -> Self {
        Self(Value::String(value.to_string()))
    }
}

/// A normalized path: a root plus clean components.
///
/// At least one component is present and the last one names the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePath {
    root: PathRoot,
    components: Vec<String>,
}

impl FilePath {
    /// Normalize any accepted intake shape.
    pub fn normalize(input: &PathInput) -> Result<Self, PathError> {
        match input.as_value() {
            Value::String(s) => Self::parse(s),
            Value::Array(parts) => {
                let mut joined = Vec::with_capacity(parts.len());
                for (index, part) in parts.iter().enumerate() {
                    match part {
                        Value::String(s) => joined.push(s.as_str()),
                        _ => return Err(PathError::NonStringComponent { index }),
                    }
                }
                Self::parse(&joined.join("/"))
            }
            Value::Object(map) => {
                let root = str_field(map, "root")?;
                let dir = str_field(map, "dir")?;
                let base = str_field(map, "base")?;
                let name = str_field(map, "name")?;
                let ext = str_field(map, "ext")?;

                let base = if base.is_empty() {
                    format!("{}{}", name, ext)
                } else {
                    base.to_string()
                };
                let dir = if dir.is_empty() { root } else { dir };

                if dir.is_empty() && base.is_empty() {
                    return Err(PathError::Empty);
                }
                if dir.is_empty() {
                    Self::parse(&base)
                } else {
                    Self::parse(&format!("{}/{}", dir, base))
                }
            }
            Value::Null => Err(PathError::Empty),
            Value::Bool(_) => Err(PathError::UnsupportedShape("boolean".to_string())),
            Value::Number(_) => Err(PathError::UnsupportedShape("number".to_string())),
        }
    }

    /// Parse a path string using either separator.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.contains('\0') {
            return Err(PathError::NulByte);
        }
        if raw.trim().is_empty() {
            return Err(PathError::Empty);
        }

        let unified = raw.replace('\\', "/");
        let (root, rest) = split_root(&unified);

        let mut components: Vec<String> = Vec::new();
        for segment in rest.split('/') {
            match segment {
                "" | "." => {}
                ".." => match (root, components.last().map(String::as_str)) {
                    (PathRoot::Relative, None) | (PathRoot::Relative, Some("..")) => {
                        components.push("..".to_string());
                    }
                    (_, Some(_)) => {
                        components.pop();
                    }
                    (_, None) => return Err(PathError::EscapesRoot),
                },
                other => components.push(other.to_string()),
            }
        }

        match components.last().map(String::as_str) {
            None | Some("..") => Err(PathError::NoFileName),
            Some(_) => Ok(Self { root, components }),
        }
    }

    pub fn root(&self) -> PathRoot {
        self.root
    }

    /// Clean components, the last one naming the file.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Final component (`a.csv`).
    pub fn file_name(&self) -> &str {
        self.components.last().map(String::as_str).unwrap_or_default()
    }

    /// Extension without the dot, if any (`csv`).
    pub fn extension(&self) -> Option<&str> {
        split_ext(self.file_name()).1.strip_prefix('.')
    }

    /// File name without its extension (`a`).
    pub fn stem(&self) -> &str {
        split_ext(self.file_name()).0
    }

    /// Directory part including the root (`/data`).
    pub fn dir(&self) -> String {
        let parents = &self.components[..self.components.len().saturating_sub(1)];
        let dir = format!("{}{}", self.prefix(), parents.join("/"));
        if dir == "./" {
            ".".to_string()
        } else {
            dir
        }
    }

    /// Root prefix for display. A relative path starting with a bare `X:`
    /// component gets `./` so it does not read back as a drive.
    fn prefix(&self) -> String {
        let drive_like = |c: &String| {
            let bytes = c.as_bytes();
            bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
        };
        match self.root {
            PathRoot::Relative if self.components.first().is_some_and(drive_like) => {
                "./".to_string()
            }
            root => root.as_prefix(),
        }
    }

    /// Native path for handing to the engine.
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(self.to_string())
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix(), self.components.join("/"))
    }
}

/// Serialized in the `path.parse` object shape with forward slashes.
impl Serialize for FilePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (name, ext) = split_ext(self.file_name());
        let mut state = serializer.serialize_struct("FilePath", 5)?;
        state.serialize_field("root", &self.root.as_prefix())?;
        state.serialize_field("dir", &self.dir())?;
        state.serialize_field("base", self.file_name())?;
        state.serialize_field("ext", ext)?;
        state.serialize_field("name", name)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for FilePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let input = PathInput::deserialize(deserializer)?;
        FilePath::normalize(&input).map_err(serde::de::Error::custom)
    }
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a str, PathError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(PathError::UnsupportedShape(format!(
            "object field '{}' is not a string",
            key
        ))),
    }
}

/// `X:` is a drive root only on its own or before a separator;
/// `c:x.csv` stays a relative component.
fn split_root(path: &str) -> (PathRoot, &str) {
    let bytes = path.as_bytes();
    if bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'/')
    {
        let letter = char::from(bytes[0]).to_ascii_uppercase();
        return (PathRoot::Drive(letter), &path[2..]);
    }
    if path.starts_with('/') {
        (PathRoot::Posix, path)
    } else {
        (PathRoot::Relative, path)
    }
}

/// Split a file name into (name, ext) the way `path.parse` does:
/// a leading dot does not start an extension.
fn split_ext(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(0) | None => (file_name, ""),
        Some(idx) => file_name.split_at(idx),
    }
}

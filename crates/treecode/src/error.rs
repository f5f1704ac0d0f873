/// One step of a coding path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// The location of a value inside the tree being decoded, root first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(pub Vec<Segment>);

impl Path {
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{}", key)?,
                Segment::Key(key) => write!(f, ".{}", key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Why a well-formed tree did not match the requested shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Corruption {
    /// A required key or element is absent.
    Missing,
    /// The node has the wrong kind, is out of range, or holds invalid text.
    Codec(treepack::Error),
    /// Rejected by a `Decode` implementation.
    Invalid(String),
}

impl std::fmt::Display for Corruption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Corruption::Missing => write!(f, "value is missing"),
            Corruption::Codec(e) => write!(f, "{}", e),
            Corruption::Invalid(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<treepack::Error> for Corruption {
    fn from(e: treepack::Error) -> Self {
        Corruption::Codec(e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The bytes could not be parsed into a tree.
    Parse(treepack::Error),
    /// The tree did not match the shape or type being decoded.
    DataCorrupted { path: Path, cause: Corruption },
    /// The writer rejected a write or could not be finalized.
    Encoding(treepack::Error),
    /// An `Encode` implementation refused its value.
    Custom(String),
}

impl Error {
    /// A decode failure raised by hand-written `Decode` code.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::DataCorrupted { path: Path::default(), cause: Corruption::Invalid(msg.into()) }
    }

    pub fn custom(msg: impl Into<String>) -> Self {
        Error::Custom(msg.into())
    }

    /// Path of the offending value, for `DataCorrupted` errors.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::DataCorrupted { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "parse error: {}", e),
            Error::DataCorrupted { path, cause } => write!(f, "data corrupted at {}: {}", path, cause),
            Error::Encoding(e) => write!(f, "encoding error: {}", e),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(e) | Error::Encoding(e) => Some(e),
            Error::DataCorrupted { cause: Corruption::Codec(e), .. } => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

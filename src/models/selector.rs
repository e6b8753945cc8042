use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// How to find processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// File holding a single PID
    PidFile(PathBuf),
    /// Regex over the process name
    Pattern(String),
    /// Owning user name
    User(String),
    /// Regex over the full command line
    FullPattern(String),
    /// Direct children of processes whose command line matches the regex
    ChildPattern(String),
}

impl Selector {
    /// Tag key the tracker attaches to processes found through this selector.
    pub fn tag_key(&self) -> &'static str {
        match self {
            Selector::PidFile(_) => "pidfile",
            Selector::Pattern(_) => "pattern",
            Selector::User(_) => "user",
            Selector::FullPattern(_) => "full_pattern",
            Selector::ChildPattern(_) => "child_pattern",
        }
    }

    pub fn tag_value(&self) -> String {
        match self {
            Selector::PidFile(path) => path.display().to_string(),
            Selector::Pattern(p)
            | Selector::User(p)
            | Selector::FullPattern(p)
            | Selector::ChildPattern(p) => p.clone(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.tag_key(), self.tag_value())
    }
}

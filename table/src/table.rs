//! Phrase table: input codes mapped to ordered phrase lists.
//!
//! Tables are TOML files of the form
//!
//! ```toml
//! name = "demo"
//!
//! [entries]
//! ni = ["你", "尼", "泥"]
//! nihao = ["你好"]
//! ```
//!
//! Phrases for one code are listed in preference order. Lookups return the
//! exact matches first, then completions of longer codes in code order.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the model directory.
pub const TABLE_FILE: &str = "table.toml";

/// Upper bound on completions gathered from longer codes.
const MAX_COMPLETIONS: usize = 40;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read table {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("table '{0}' has no entries")]
    Empty(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TableFile {
    #[serde(default)]
    name: String,
    entries: BTreeMap<String, Vec<String>>,
}

// Small pinyin sample used when no table file is installed.
static BUILTIN: &[(&str, &[&str])] = &[
    ("a", &["啊", "阿"]),
    ("ai", &["爱", "哎", "矮"]),
    ("de", &["的", "得", "地"]),
    ("guo", &["国", "过", "果"]),
    ("hao", &["好", "号", "浩"]),
    ("jie", &["界", "姐", "接", "节"]),
    ("men", &["们", "门"]),
    ("ni", &["你", "尼", "泥", "拟", "逆", "腻"]),
    ("nihao", &["你好"]),
    ("shi", &["是", "时", "事", "十", "市", "使", "世"]),
    ("shijie", &["世界"]),
    ("wo", &["我", "窝", "握"]),
    ("women", &["我们"]),
    ("zhong", &["中", "种", "重", "众"]),
    ("zhongguo", &["中国"]),
];

#[derive(Debug, Clone)]
pub struct PhraseTable {
    name: String,
    entries: AHashMap<String, Vec<String>>,
    codes: Vec<String>, // sorted, for prefix scans
}

impl PhraseTable {
    fn from_entries(name: String, entries: AHashMap<String, Vec<String>>) -> Self {
        let mut codes: Vec<String> = entries.keys().cloned().collect();
        codes.sort();
        Self {
            name,
            entries,
            codes,
        }
    }

    /// The built-in demo table.
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(code, phrases)| {
                (
                    code.to_string(),
                    phrases.iter().map(|p| p.to_string()).collect(),
                )
            })
            .collect();
        Self::from_entries("builtin".to_string(), entries)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, TableError> {
        let file: TableFile = toml::from_str(content)?;
        let entries: AHashMap<String, Vec<String>> = file
            .entries
            .into_iter()
            .filter(|(code, phrases)| !code.is_empty() && !phrases.is_empty())
            .collect();
        if entries.is_empty() {
            return Err(TableError::Empty(file.name));
        }
        Ok(Self::from_entries(file.name, entries))
    }

    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of distinct codes.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Phrases for exactly `code`.
    pub fn exact(&self, code: &str) -> &[String] {
        self.entries.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Candidates for `input`: exact matches, then completions, deduplicated.
    pub fn lookup(&self, input: &str) -> Vec<String> {
        fn push(phrase: &String, out: &mut Vec<String>) {
            if !out.contains(phrase) {
                out.push(phrase.clone());
            }
        }

        let mut out = Vec::new();
        for phrase in self.exact(input) {
            push(phrase, &mut out);
        }

        let start = self.codes.partition_point(|code| code.as_str() < input);
        let completions = self.codes[start..]
            .iter()
            .take_while(|code| code.starts_with(input))
            .filter(|code| code.len() > input.len());
        let mut gathered = 0;
        'codes: for code in completions {
            for phrase in self.exact(code) {
                if gathered >= MAX_COMPLETIONS {
                    break 'codes;
                }
                push(phrase, &mut out);
                gathered += 1;
            }
        }
        out
    }
}

impl Default for PhraseTable {
    fn default() -> Self {
        Self::builtin()
    }
}

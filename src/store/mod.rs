//! Flat-file store: commented JSON in, pretty JSON with a provenance header out.

mod format;

pub use format::format_groups;

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{BeegraphError, Result};

/// Remove `// line` and `/* block */` comments that are outside string literals.
/// Newlines inside block comments are kept so parser line numbers stay valid.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Read a whole file and deserialize it after stripping comments.
pub fn read_commented_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    parse_commented_json(&content)
}

/// Deserialize commented JSON text.
pub fn parse_commented_json<T: DeserializeOwned>(content: &str) -> Result<T> {
    Ok(serde_json::from_str(&strip_comments(content))?)
}

/// SHA-256 over every input consumed by a run, in consumption order.
#[derive(Clone, Default)]
pub struct InputFingerprint {
    hasher: Sha256,
    sources: Vec<String>,
}

impl InputFingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, content: &str) {
        self.hasher.update(name.as_bytes());
        self.hasher.update([0u8]);
        self.hasher.update(content.as_bytes());
        self.hasher.update([0u8]);
        self.sources.push(name.to_string());
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Build the header for output files.
    pub fn header(&self) -> OutputHeader {
        OutputHeader {
            sources: self.sources.clone(),
            digest: format!("{:x}", self.hasher.clone().finalize()),
        }
    }
}

/// Fixed comment block written at the top of every output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputHeader {
    pub sources: Vec<String>,
    pub digest: String,
}

impl OutputHeader {
    pub fn render(&self) -> String {
        format!(
            "// Generated by beegraph. Do not edit by hand.\n// Inputs: {}\n// Fingerprint: sha256:{}\n",
            self.sources.join(", "),
            self.digest
        )
    }
}

/// Write `body` to `path` behind the header, creating parent directories.
pub fn write_with_header(path: &Path, header: &OutputHeader, body: &str) -> Result<()> {
    let output_err = |source: std::io::Error| BeegraphError::Output {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(output_err)?;
    }
    let mut text = header.render();
    text.push_str(body);
    if !text.ends_with('\n') {
        text.push('\n');
    }
    fs::write(path, text).map_err(output_err)
}

/// Write a value with generic 2-space pretty printing.
pub fn write_pretty<T: Serialize + ?Sized>(path: &Path, header: &OutputHeader, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    write_with_header(path, header, &body)
}

//! Line-based import extraction for the supported languages.
//!
//! This is deliberately not a full AST front end: a line scanner with a few
//! anchored patterns per language is enough to recover import edges, and it
//! keeps the graph builder fast and dependency-light.

use regex::Regex;
use std::path::Path;

/// A language the scanner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// Rust (`use`, `mod`).
    Rust,
    /// TypeScript (`import`, `export ... from`, `require`).
    TypeScript,
    /// JavaScript (same forms as TypeScript).
    JavaScript,
    /// Python (`import`, `from ... import`).
    Python,
}

impl Language {
    /// Detects the language from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str())? {
            "rs" => Some(Self::Rust),
            "ts" | "tsx" | "mts" | "cts" => Some(Self::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "py" => Some(Self::Python),
            _ => None,
        }
    }
}

/// One raw import found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImport {
    /// The specifier as written in the source.
    pub specifier: String,
    /// Line number (1-indexed).
    pub line: usize,
}

/// Extracts import specifiers from source text, one language at a time.
pub struct ImportScanner {
    rust_use: Regex,
    rust_mod: Regex,
    es_from: Regex,
    es_require: Regex,
    py_import: Regex,
    py_from: Regex,
}

impl ImportScanner {
    /// Creates a scanner with its patterns compiled once.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rust_use: Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([\w:]+)")
                .expect("hard-coded pattern compiles"),
            rust_mod: Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(\w+)\s*;")
                .expect("hard-coded pattern compiles"),
            es_from: Regex::new(
                r#"^\s*(?:import|export)\s+(?:type\s+)?(?:[\w*\s{},$]+?\s+from\s+)?["']([^"']+)["']"#,
            )
            .expect("hard-coded pattern compiles"),
            es_require: Regex::new(r#"require\s*\(\s*["']([^"']+)["']\s*\)"#)
                .expect("hard-coded pattern compiles"),
            py_import: Regex::new(r"^\s*import\s+([\w.]+(?:\s*,\s*[\w.]+)*)")
                .expect("hard-coded pattern compiles"),
            py_from: Regex::new(r"^\s*from\s+([\w.]+|\.+)\s+import")
                .expect("hard-coded pattern compiles"),
        }
    }

    /// Scans source text, returning raw imports in line order.
    #[must_use]
    pub fn scan(&self, language: Language, content: &str) -> Vec<RawImport> {
        let mut imports = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line_no = index + 1;
            match language {
                Language::Rust => self.scan_rust_line(line, line_no, &mut imports),
                Language::TypeScript | Language::JavaScript => {
                    self.scan_es_line(line, line_no, &mut imports);
                }
                Language::Python => self.scan_python_line(line, line_no, &mut imports),
            }
        }
        imports
    }

    fn scan_rust_line(&self, line: &str, line_no: usize, out: &mut Vec<RawImport>) {
        if let Some(captures) = self.rust_use.captures(line) {
            if let Some(path) = captures.get(1) {
                let specifier = path.as_str().trim_end_matches(':').to_string();
                if !specifier.is_empty() {
                    out.push(RawImport {
                        specifier,
                        line: line_no,
                    });
                }
            }
        } else if let Some(captures) = self.rust_mod.captures(line) {
            if let Some(name) = captures.get(1) {
                out.push(RawImport {
                    specifier: name.as_str().to_string(),
                    line: line_no,
                });
            }
        }
    }

    fn scan_es_line(&self, line: &str, line_no: usize, out: &mut Vec<RawImport>) {
        if let Some(captures) = self.es_from.captures(line) {
            if let Some(specifier) = captures.get(1) {
                out.push(RawImport {
                    specifier: specifier.as_str().to_string(),
                    line: line_no,
                });
                return;
            }
        }
        for captures in self.es_require.captures_iter(line) {
            if let Some(specifier) = captures.get(1) {
                out.push(RawImport {
                    specifier: specifier.as_str().to_string(),
                    line: line_no,
                });
            }
        }
    }

    fn scan_python_line(&self, line: &str, line_no: usize, out: &mut Vec<RawImport>) {
        if let Some(captures) = self.py_from.captures(line) {
            if let Some(module) = captures.get(1) {
                out.push(RawImport {
                    specifier: module.as_str().to_string(),
                    line: line_no,
                });
                return;
            }
        }
        if let Some(captures) = self.py_import.captures(line) {
            if let Some(list) = captures.get(1) {
                for module in list.as_str().split(',') {
                    let module = module.trim();
                    if !module.is_empty() {
                        out.push(RawImport {
                            specifier: module.to_string(),
                            line: line_no,
                        });
                    }
                }
            }
        }
    }
}

impl Default for ImportScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(language: Language, content: &str) -> Vec<String> {
        ImportScanner::new()
            .scan(language, content)
            .into_iter()
            .map(|i| i.specifier)
            .collect()
    }

    #[test]
    fn detects_language_from_extension() {
        assert_eq!(Language::from_path(Path::new("a.rs")), Some(Language::Rust));
        assert_eq!(
            Language::from_path(Path::new("a.tsx")),
            Some(Language::TypeScript)
        );
        assert_eq!(
            Language::from_path(Path::new("a.mjs")),
            Some(Language::JavaScript)
        );
        assert_eq!(Language::from_path(Path::new("a.py")), Some(Language::Python));
        assert_eq!(Language::from_path(Path::new("a.go")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }

    // -- Rust --

    #[test]
    fn rust_use_paths() {
        let found = scan(
            Language::Rust,
            "use std::fs;\npub use crate::domain::User;\nuse serde::{Serialize, Deserialize};\n",
        );
        assert_eq!(found, vec!["std::fs", "crate::domain::User", "serde"]);
    }

    #[test]
    fn rust_mod_declarations() {
        let found = scan(Language::Rust, "mod config;\npub mod handlers;\nmod inline { }\n");
        assert_eq!(found, vec!["config", "handlers"]);
    }

    #[test]
    fn rust_use_with_rename() {
        let found = scan(Language::Rust, "use std::io::Result as IoResult;\n");
        assert_eq!(found, vec!["std::io::Result"]);
    }

    // -- TypeScript / JavaScript --

    #[test]
    fn es_import_forms() {
        let found = scan(
            Language::TypeScript,
            concat!(
                "import axios from 'axios';\n",
                "import { User } from './domain/user';\n",
                "import type { Config } from '../config';\n",
                "import 'reflect-metadata';\n",
                "export { helper } from './util';\n",
                "const fs = require('fs');\n",
            ),
        );
        assert_eq!(
            found,
            vec![
                "axios",
                "./domain/user",
                "../config",
                "reflect-metadata",
                "./util",
                "fs"
            ]
        );
    }

    #[test]
    fn es_ignores_plain_code() {
        let found = scan(Language::JavaScript, "const x = 1;\nfunction importantThing() {}\n");
        assert!(found.is_empty());
    }

    // -- Python --

    #[test]
    fn python_import_forms() {
        let found = scan(
            Language::Python,
            "import os\nimport json, sys\nfrom app.domain import user\nfrom . import base\nfrom ..shared import util\n",
        );
        assert_eq!(
            found,
            vec!["os", "json", "sys", "app.domain", ".", "..shared"]
        );
    }

    #[test]
    fn line_numbers_are_one_indexed() {
        let imports = ImportScanner::new().scan(Language::Python, "\nimport os\n");
        assert_eq!(imports[0].line, 2);
    }
}

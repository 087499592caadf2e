//! The default import graph builder.
//!
//! Discovers source files (gitignore-aware), scans their imports, resolves
//! project-local specifiers to files, classifies every file against the
//! registry, indexes reverse edges, and detects import cycles.

use crate::scanner::{ImportScanner, Language, RawImport};
use arch_warden_core::{
    CycleReport, GraphBuild, GraphBuilder, GraphError, GraphNode, ImportGraph, ImportRef, Registry,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Directories never worth scanning, applied on top of caller excludes.
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/target/**",
    "**/node_modules/**",
    "**/vendor/**",
    "**/__pycache__/**",
    "**/dist/**",
];

/// Candidate extensions probed when resolving extensionless specifiers.
const ES_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// The default [`GraphBuilder`] implementation.
#[derive(Default)]
pub struct DefaultGraphBuilder {
    scanner: ImportScanner,
}

impl DefaultGraphBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scanner: ImportScanner::new(),
        }
    }
}

impl GraphBuilder for DefaultGraphBuilder {
    fn build(
        &self,
        root: &Path,
        registry: &Registry,
        include: &[String],
        exclude: &[String],
    ) -> Result<GraphBuild, GraphError> {
        let started = Instant::now();

        let include_globs = compile_globs(include)?;
        let mut exclude_patterns: Vec<String> = exclude.to_vec();
        exclude_patterns.extend(DEFAULT_EXCLUDES.iter().map(|s| (*s).to_string()));
        let exclude_globs = compile_globs(&exclude_patterns)?;

        let files = discover(root, &include_globs, &exclude_globs)?;
        debug!(files = files.len(), "discovered source files");

        // First pass: scan and classify every file.
        let mut nodes: Vec<GraphNode> = Vec::with_capacity(files.len());
        let file_set: HashSet<PathBuf> = files.iter().cloned().collect();
        for file in &files {
            let relative = file.strip_prefix(root).unwrap_or(file);
            let arch_id = registry.classify(relative).map(str::to_string);
            let imports = match std::fs::read_to_string(file) {
                Ok(content) => self.extract(root, file, &content, &file_set),
                Err(e) => {
                    // Unreadable files stay in the graph with no edges; the
                    // validation phase degrades them per-file.
                    warn!(file = %file.display(), "could not read file for import scan: {e}");
                    Vec::new()
                }
            };
            nodes.push(GraphNode {
                file: file.clone(),
                arch_id,
                imports,
                imported_by: BTreeSet::new(),
            });
        }

        // Second pass: reverse edges.
        let mut reverse: HashMap<PathBuf, BTreeSet<PathBuf>> = HashMap::new();
        for node in &nodes {
            for import in &node.imports {
                if let Some(target) = &import.resolved {
                    reverse
                        .entry(target.clone())
                        .or_default()
                        .insert(node.file.clone());
                }
            }
        }
        for node in &mut nodes {
            if let Some(importers) = reverse.remove(&node.file) {
                node.imported_by = importers;
            }
        }

        let cycles = detect_cycles(&nodes);
        let graph = ImportGraph::from_nodes(nodes);
        let cycles = annotate_cycles(cycles, &graph);

        #[allow(clippy::cast_possible_truncation)]
        let build_time_ms = started.elapsed().as_millis() as u64;
        Ok(GraphBuild {
            graph,
            cycles,
            build_time_ms,
        })
    }

    fn scan_imports(&self, path: &Path, content: &str) -> Vec<ImportRef> {
        let Some(language) = Language::from_path(path) else {
            return Vec::new();
        };
        self.scanner
            .scan(language, content)
            .into_iter()
            .map(|raw| {
                let resolved = resolve_specifier(None, path, language, &raw.specifier)
                    .filter(|p| p.exists());
                ImportRef {
                    raw: raw.specifier,
                    resolved,
                    line: raw.line,
                }
            })
            .collect()
    }
}

impl DefaultGraphBuilder {
    fn extract(
        &self,
        root: &Path,
        file: &Path,
        content: &str,
        file_set: &HashSet<PathBuf>,
    ) -> Vec<ImportRef> {
        let Some(language) = Language::from_path(file) else {
            return Vec::new();
        };
        self.scanner
            .scan(language, content)
            .into_iter()
            .map(|raw: RawImport| {
                let resolved = resolve_specifier(Some(root), file, language, &raw.specifier)
                    .filter(|target| file_set.contains(target) && target != file);
                ImportRef {
                    raw: raw.specifier,
                    resolved,
                    line: raw.line,
                }
            })
            .collect()
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<glob::Pattern>, GraphError> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|e| GraphError::Pattern {
                pattern: p.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn discover(
    root: &Path,
    include: &[glob::Pattern],
    exclude: &[glob::Pattern],
) -> Result<Vec<PathBuf>, GraphError> {
    let mut files = Vec::new();
    for entry in ignore::WalkBuilder::new(root).build() {
        let entry = entry.map_err(|e| GraphError::Walk(e.to_string()))?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.into_path();
        if Language::from_path(&path).is_none() {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let relative_str = relative.to_string_lossy();
        if !include.is_empty() && !include.iter().any(|p| p.matches(&relative_str)) {
            continue;
        }
        if exclude.iter().any(|p| glob_hits(p, &relative_str)) {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Glob match with a substring fallback for `**/dir/**` style patterns,
/// which the glob crate does not always treat as directory prefixes.
fn glob_hits(pattern: &glob::Pattern, path: &str) -> bool {
    if pattern.matches(path) {
        return true;
    }
    let stripped = pattern.as_str().replace("**", "");
    !stripped.is_empty() && stripped != "/" && path.contains(&stripped)
}

/// Resolves a specifier to a project file, best effort per language.
fn resolve_specifier(
    root: Option<&Path>,
    file: &Path,
    language: Language,
    specifier: &str,
) -> Option<PathBuf> {
    match language {
        Language::TypeScript | Language::JavaScript => resolve_es(file, specifier),
        Language::Python => resolve_python(root, file, specifier),
        Language::Rust => resolve_rust(root, file, specifier),
    }
}

fn resolve_es(file: &Path, specifier: &str) -> Option<PathBuf> {
    if !specifier.starts_with("./") && !specifier.starts_with("../") {
        return None;
    }
    let base = normalize(&file.parent()?.join(specifier));
    if base.extension().is_some() {
        return Some(base);
    }
    for ext in ES_EXTENSIONS {
        let candidate = base.with_extension(ext);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    for ext in ES_EXTENSIONS {
        let candidate = base.join(format!("index.{ext}"));
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

fn resolve_python(root: Option<&Path>, file: &Path, specifier: &str) -> Option<PathBuf> {
    let dots = specifier.chars().take_while(|&c| c == '.').count();
    let rest = &specifier[dots..];

    let base = if dots > 0 {
        // `.x` is a sibling module, each extra dot climbs one package.
        let mut dir = file.parent()?.to_path_buf();
        for _ in 1..dots {
            dir = dir.parent()?.to_path_buf();
        }
        dir
    } else {
        root?.to_path_buf()
    };

    let module_path: PathBuf = rest.split('.').filter(|s| !s.is_empty()).collect();
    let candidate = if module_path.as_os_str().is_empty() {
        base.join("__init__.py")
    } else {
        let flat = base.join(&module_path);
        let as_file = flat.with_extension("py");
        if as_file.exists() {
            as_file
        } else {
            flat.join("__init__.py")
        }
    };
    candidate.exists().then_some(normalize(&candidate))
}

fn resolve_rust(root: Option<&Path>, file: &Path, specifier: &str) -> Option<PathBuf> {
    let segments: Vec<&str> = specifier.split("::").collect();
    match segments.first()? {
        &"crate" => {
            let crate_root = find_crate_root(root, file)?;
            probe_rust_module(&crate_root, &segments[1..])
        }
        &"self" | &"super" => {
            let mut dir = module_dir(file)?;
            let mut rest = &segments[1..];
            while rest.first() == Some(&"super") {
                dir = dir.parent()?.to_path_buf();
                rest = &rest[1..];
            }
            if segments[0] == "super" {
                dir = dir.parent().map_or(dir.clone(), Path::to_path_buf);
            }
            probe_rust_module(&dir, rest)
        }
        // A bare single segment is a `mod name;` declaration.
        _ if segments.len() == 1 => {
            let dir = module_dir(file)?;
            probe_rust_module(&dir, &segments)
        }
        // Multi-segment paths without a crate prefix are external.
        _ => None,
    }
}

/// The directory a file's child modules live in (`foo.rs` -> `foo/`,
/// `mod.rs`/`lib.rs`/`main.rs` -> own directory).
fn module_dir(file: &Path) -> Option<PathBuf> {
    let stem = file.file_stem()?.to_str()?;
    let parent = file.parent()?;
    if matches!(stem, "mod" | "lib" | "main") {
        Some(parent.to_path_buf())
    } else {
        Some(parent.join(stem))
    }
}

fn find_crate_root(root: Option<&Path>, file: &Path) -> Option<PathBuf> {
    let stop = root.unwrap_or_else(|| Path::new("/"));
    let mut dir = file.parent()?;
    loop {
        if dir.join("lib.rs").exists() || dir.join("main.rs").exists() {
            return Some(dir.to_path_buf());
        }
        if dir == stop {
            return None;
        }
        dir = dir.parent()?;
    }
}

/// Probes progressively shorter prefixes of a module path so
/// `crate::config::Settings` lands on `config.rs`.
fn probe_rust_module(base: &Path, segments: &[&str]) -> Option<PathBuf> {
    for take in (1..=segments.len()).rev() {
        let joined: PathBuf = segments[..take].iter().collect();
        let as_file = base.join(&joined).with_extension("rs");
        if as_file.exists() {
            return Some(normalize(&as_file));
        }
        let as_mod = base.join(&joined).join("mod.rs");
        if as_mod.exists() {
            return Some(normalize(&as_mod));
        }
    }
    None
}

/// Removes `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(parts.last(), Some(Component::Normal(_))) {
                    parts.pop();
                } else {
                    parts.push(component);
                }
            }
            other => parts.push(other),
        }
    }
    parts.iter().map(|c| c.as_os_str()).collect()
}

/// Finds import cycles via DFS back-edge detection, deduplicated by
/// canonical rotation. Each cycle's file list preserves discovery order.
fn detect_cycles(nodes: &[GraphNode]) -> Vec<Vec<PathBuf>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let edges: HashMap<&PathBuf, Vec<&PathBuf>> = nodes
        .iter()
        .map(|n| {
            (
                &n.file,
                n.imports.iter().filter_map(|i| i.resolved.as_ref()).collect(),
            )
        })
        .collect();

    let mut color: HashMap<&PathBuf, Color> =
        nodes.iter().map(|n| (&n.file, Color::White)).collect();
    let mut cycles: Vec<Vec<PathBuf>> = Vec::new();
    let mut seen_keys: HashSet<String> = HashSet::new();

    enum Step<'a> {
        Visit(&'a PathBuf),
        Finish(&'a PathBuf),
        Done,
    }

    for start in nodes.iter().map(|n| &n.file) {
        if color.get(start) != Some(&Color::White) {
            continue;
        }
        // Iterative DFS: (node, next child index).
        let mut stack: Vec<(&PathBuf, usize)> = vec![(start, 0)];
        color.insert(start, Color::Gray);

        loop {
            let step = match stack.last_mut() {
                None => Step::Done,
                Some(frame) => {
                    let node = frame.0;
                    let children = edges.get(node).map_or(&[][..], Vec::as_slice);
                    if frame.1 < children.len() {
                        let child = children[frame.1];
                        frame.1 += 1;
                        Step::Visit(child)
                    } else {
                        Step::Finish(node)
                    }
                }
            };
            match step {
                Step::Done => break,
                Step::Visit(child) => match color.get(child) {
                    Some(Color::White) => {
                        color.insert(child, Color::Gray);
                        stack.push((child, 0));
                    }
                    Some(Color::Gray) => {
                        if let Some(position) = stack.iter().position(|(n, _)| *n == child) {
                            let cycle: Vec<PathBuf> =
                                stack[position..].iter().map(|(n, _)| (*n).clone()).collect();
                            if seen_keys.insert(cycle_key(&cycle)) {
                                cycles.push(cycle);
                            }
                        }
                    }
                    _ => {}
                },
                Step::Finish(node) => {
                    color.insert(node, Color::Black);
                    stack.pop();
                }
            }
        }
    }

    cycles
}

/// Canonical key: the cycle rotated so its smallest path comes first.
fn cycle_key(cycle: &[PathBuf]) -> String {
    let Some(min_index) = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| *p)
        .map(|(i, _)| i)
    else {
        return String::new();
    };
    cycle[min_index..]
        .iter()
        .chain(cycle[..min_index].iter())
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join("\u{1}")
}

fn annotate_cycles(cycles: Vec<Vec<PathBuf>>, graph: &ImportGraph) -> Vec<CycleReport> {
    cycles
        .into_iter()
        .map(|files| {
            let architectures = files
                .iter()
                .map(|f| graph.node(f).and_then(|n| n.arch_id.clone()))
                .collect();
            CycleReport {
                files,
                architectures,
            }
        })
        .collect()
}

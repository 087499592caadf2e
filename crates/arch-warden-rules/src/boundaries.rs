//! Package and layer boundary validators over the import graph.
//!
//! Both are per-edge checks driven by the project-level phase of the
//! orchestrator, independent of per-file constraints.

use arch_warden_core::checks::BoundaryValidator;
use arch_warden_core::{EdgeViolation, ImportGraph, Registry};
use std::path::{Path, PathBuf};

/// File names that act as a package's public entry point.
const ENTRY_FILES: &[&str] = &[
    "mod.rs",
    "lib.rs",
    "main.rs",
    "index.ts",
    "index.tsx",
    "index.js",
    "index.jsx",
    "__init__.py",
];

/// Flags cross-package imports that bypass the target package's entry file.
///
/// A package is the first two directory levels of a file's relative path.
/// The check only fires when the target package declares an entry file:
/// packages without one have no import discipline to enforce.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageBoundary;

impl PackageBoundary {
    /// Creates the validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BoundaryValidator for PackageBoundary {
    fn name(&self) -> &'static str {
        "package"
    }

    fn validate(
        &self,
        root: &Path,
        graph: &ImportGraph,
        _registry: &Registry,
    ) -> Vec<EdgeViolation> {
        let mut violations = Vec::new();
        for node in graph.nodes() {
            let from_package = package_of(root, &node.file);
            for import in &node.imports {
                let Some(target) = &import.resolved else {
                    continue;
                };
                let to_package = package_of(root, target);
                if from_package == to_package || to_package.is_none() {
                    continue;
                }
                if is_entry_file(target) {
                    continue;
                }
                let Some(to_package) = to_package.as_ref() else {
                    continue;
                };
                if !has_entry_file(root, to_package) {
                    continue;
                }
                violations.push(EdgeViolation {
                    from: node.file.clone(),
                    to: target.clone(),
                    message: format!(
                        "deep import into package `{}`; import its entry file instead",
                        to_package.display(),
                    ),
                });
            }
        }
        violations
    }
}

/// Flags imports from one layer into a layer the source's architecture
/// does not allow. Files without an architecture or layer are ignored;
/// same-layer imports are always allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerBoundary;

impl LayerBoundary {
    /// Creates the validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BoundaryValidator for LayerBoundary {
    fn name(&self) -> &'static str {
        "layer"
    }

    fn validate(
        &self,
        _root: &Path,
        graph: &ImportGraph,
        registry: &Registry,
    ) -> Vec<EdgeViolation> {
        let mut violations = Vec::new();
        for node in graph.nodes() {
            let Some(from_arch) = node.arch_id.as_deref() else {
                continue;
            };
            let Some(from_layer) = registry.effective_layer(from_arch) else {
                continue;
            };
            let allowed = registry
                .effective_allowed_layers(from_arch)
                .unwrap_or_default();

            for import in &node.imports {
                let Some(target) = &import.resolved else {
                    continue;
                };
                let to_layer = graph
                    .node(target)
                    .and_then(|n| n.arch_id.as_deref())
                    .and_then(|arch| registry.effective_layer(arch));
                let Some(to_layer) = to_layer else {
                    continue;
                };
                if to_layer == from_layer {
                    continue;
                }
                if !allowed.iter().any(|l| l == to_layer) {
                    violations.push(EdgeViolation {
                        from: node.file.clone(),
                        to: target.clone(),
                        message: format!("{from_layer} -> {to_layer} dependency not allowed"),
                    });
                }
            }
        }
        violations
    }
}

/// The first two directory levels of a file's root-relative path.
fn package_of(root: &Path, file: &Path) -> Option<PathBuf> {
    let relative = file.strip_prefix(root).ok()?;
    let directories: Vec<_> = relative.parent()?.components().collect();
    if directories.is_empty() {
        return None;
    }
    Some(directories.iter().take(2).map(|c| c.as_os_str()).collect())
}

fn is_entry_file(file: &Path) -> bool {
    file.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| ENTRY_FILES.contains(&name))
}

fn has_entry_file(root: &Path, package: &Path) -> bool {
    let dir = root.join(package);
    ENTRY_FILES.iter().any(|entry| dir.join(entry).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch_warden_core::{GraphNode, ImportRef};
    use std::collections::BTreeSet;
    use std::fs;

    fn node_with_edge(from: &Path, to: &Path, arch: Option<&str>) -> GraphNode {
        GraphNode {
            file: from.to_path_buf(),
            arch_id: arch.map(str::to_string),
            imports: vec![ImportRef {
                raw: to.to_string_lossy().into_owned(),
                resolved: Some(to.to_path_buf()),
                line: 1,
            }],
            imported_by: BTreeSet::new(),
        }
    }

    fn plain_node(file: &Path, arch: Option<&str>) -> GraphNode {
        GraphNode {
            file: file.to_path_buf(),
            arch_id: arch.map(str::to_string),
            imports: vec![],
            imported_by: BTreeSet::new(),
        }
    }

    // -- PackageBoundary --

    #[test]
    fn deep_import_into_guarded_package_violates() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/domain")).unwrap();
        fs::write(root.join("src/domain/index.ts"), "").unwrap();
        fs::write(root.join("src/domain/user.ts"), "").unwrap();

        let graph = ImportGraph::from_nodes(vec![node_with_edge(
            &root.join("src/handlers/create.ts"),
            &root.join("src/domain/user.ts"),
            None,
        )]);
        let registry = Registry::default();

        let violations = PackageBoundary::new().validate(root, &graph, &registry);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("deep import"));
    }

    #[test]
    fn entry_file_import_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/domain")).unwrap();
        fs::write(root.join("src/domain/index.ts"), "").unwrap();

        let graph = ImportGraph::from_nodes(vec![node_with_edge(
            &root.join("src/handlers/create.ts"),
            &root.join("src/domain/index.ts"),
            None,
        )]);
        let violations = PackageBoundary::new().validate(root, &graph, &Registry::default());
        assert!(violations.is_empty());
    }

    #[test]
    fn unguarded_package_is_not_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/domain")).unwrap();
        fs::write(root.join("src/domain/user.ts"), "").unwrap();

        let graph = ImportGraph::from_nodes(vec![node_with_edge(
            &root.join("src/handlers/create.ts"),
            &root.join("src/domain/user.ts"),
            None,
        )]);
        let violations = PackageBoundary::new().validate(root, &graph, &Registry::default());
        assert!(violations.is_empty());
    }

    #[test]
    fn same_package_imports_are_free() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/domain")).unwrap();
        fs::write(root.join("src/domain/index.ts"), "").unwrap();

        let graph = ImportGraph::from_nodes(vec![node_with_edge(
            &root.join("src/domain/order.ts"),
            &root.join("src/domain/user.ts"),
            None,
        )]);
        let violations = PackageBoundary::new().validate(root, &graph, &Registry::default());
        assert!(violations.is_empty());
    }

    // -- LayerBoundary --

    fn layered_registry() -> Registry {
        Registry::from_toml_str(
            r#"
[[architectures]]
id = "domain"
paths = ["src/domain/**"]
layer = "domain"
allowed_layers = ["domain"]

[[architectures]]
id = "infra"
paths = ["src/infra/**"]
layer = "infra"
allowed_layers = ["infra", "domain"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn disallowed_layer_dependency_violates() {
        let root = Path::new("/p");
        let domain_file = root.join("src/domain/user.ts");
        let infra_file = root.join("src/infra/db.ts");
        let graph = ImportGraph::from_nodes(vec![
            node_with_edge(&domain_file, &infra_file, Some("domain")),
            plain_node(&infra_file, Some("infra")),
        ]);

        let violations = LayerBoundary::new().validate(root, &graph, &layered_registry());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("domain -> infra"));
    }

    #[test]
    fn allowed_layer_dependency_passes() {
        let root = Path::new("/p");
        let infra_file = root.join("src/infra/db.ts");
        let domain_file = root.join("src/domain/user.ts");
        let graph = ImportGraph::from_nodes(vec![
            node_with_edge(&infra_file, &domain_file, Some("infra")),
            plain_node(&domain_file, Some("domain")),
        ]);

        let violations = LayerBoundary::new().validate(root, &graph, &layered_registry());
        assert!(violations.is_empty());
    }

    #[test]
    fn unlayered_files_are_ignored() {
        let root = Path::new("/p");
        let a = root.join("src/scripts/a.ts");
        let b = root.join("src/scripts/b.ts");
        let graph = ImportGraph::from_nodes(vec![
            node_with_edge(&a, &b, None),
            plain_node(&b, None),
        ]);
        let violations = LayerBoundary::new().validate(root, &graph, &layered_registry());
        assert!(violations.is_empty());
    }
}

//! End-to-end validation over real fixture projects on disk: default
//! graph builder, standard validators, and all four project-level checks.

use arch_warden::{
    default_orchestrator, BatchReport, FileStatus, Registry, ValidateOptions,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

async fn validate(root: &Path, registry_toml: &str) -> BatchReport {
    let registry = Arc::new(Registry::from_toml_str(registry_toml).unwrap());
    let orchestrator = default_orchestrator(root, registry).unwrap();
    orchestrator
        .validate_project(&ValidateOptions::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn forbidden_import_is_reported_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "src/domain/user.ts",
        "import axios from 'axios';\nexport class User {}\n",
    );
    write(root, "src/domain/order.ts", "export class Order {}\n");

    let report = validate(
        root,
        r#"
[[architectures]]
id = "domain"
paths = ["src/domain/**"]

[[architectures.constraints]]
rule = "forbid_import"
value = ["axios"]
why = "domain stays transport-free"
alternative = "an injected gateway"
"#,
    )
    .await;

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.passed, 1);

    let failing = report
        .files
        .iter()
        .find(|f| f.file.ends_with("user.ts"))
        .unwrap();
    assert_eq!(failing.status, FileStatus::Fail);
    assert_eq!(failing.violations[0].line, Some(1));
    assert_eq!(
        failing.violations[0].why.as_deref(),
        Some("domain stays transport-free")
    );
    assert_eq!(
        failing.violations[0].alternatives,
        vec!["an injected gateway".to_string()]
    );
}

#[tokio::test]
async fn import_cycle_is_detected_and_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/domain/a.ts", "import { b } from './b';\nexport const a = 1;\n");
    write(root, "src/domain/b.ts", "import { a } from './a';\nexport const b = 2;\n");

    let report = validate(
        root,
        r#"
[[architectures]]
id = "domain"
paths = ["src/domain/**"]

[[architectures.constraints]]
rule = "forbid_circular_imports"
value = "self"
"#,
    )
    .await;

    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].files.len(), 2);
    assert_eq!(report.summary.failed, 2);
    assert!(report.files.iter().all(|f| f.status == FileStatus::Fail));
}

#[tokio::test]
async fn importable_by_restricts_cross_architecture_importers() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/domain/user.ts", "export class User {}\n");
    write(
        root,
        "src/cli/main.ts",
        "import { User } from '../domain/user';\n",
    );

    let report = validate(
        root,
        r#"
[[architectures]]
id = "domain"
paths = ["src/domain/**"]

[[architectures.constraints]]
rule = "importable_by"
value = ["handlers"]

[[architectures]]
id = "cli"
paths = ["src/cli/**"]
"#,
    )
    .await;

    let domain = report
        .files
        .iter()
        .find(|f| f.file.ends_with("user.ts"))
        .unwrap();
    assert_eq!(domain.status, FileStatus::Fail);
    assert!(domain.violations[0].message.contains("cli"));
}

#[tokio::test]
async fn layer_boundary_violations_are_per_edge() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "src/domain/user.ts",
        "import { Db } from '../infra/db';\nexport class User {}\n",
    );
    write(root, "src/infra/db.ts", "export class Db {}\n");

    let report = validate(
        root,
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
    .await;

    let layer = report.layer_violations.as_ref().unwrap();
    assert_eq!(layer.len(), 1);
    assert!(layer[0].message.contains("domain -> infra"));
    // Edge violations count as both an error and a failure.
    assert_eq!(report.summary.total_errors, 1);
    assert_eq!(report.summary.failed, 1);
}

#[tokio::test]
async fn coverage_gaps_are_summed_across_constraints() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "src/domain/user.ts",
        "export function createUser() {}\nexport function deleteUser() {}\n",
    );
    write(
        root,
        "tests/user.test.ts",
        "it('creates', () => createUser());\n",
    );

    let report = validate(
        root,
        r#"
[[architectures]]
id = "domain"
paths = ["src/domain/**"]

[[architectures.constraints]]
rule = "require_coverage"
value = { sources = "src/domain/**/*.ts", pattern = "export function (\\w+)", targets = "tests/**/*.ts" }
"#,
    )
    .await;

    let coverage = report.coverage.as_ref().unwrap();
    assert_eq!(coverage.total_sources, 2);
    assert_eq!(coverage.covered_sources, 1);
    assert_eq!(coverage.gaps.len(), 1);
    assert_eq!(coverage.gaps[0].source, "deleteUser");
    assert!((coverage.percent - 50.0).abs() < 0.01);
    assert_eq!(report.summary.total_errors, 1);
}

#[tokio::test]
async fn near_duplicate_files_are_reported_once_per_pair() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let body = "export function handle(req) {\n  const user = db.find(req.id);\n  return render(user);\n}\n";
    write(root, "src/handlers/get_user.ts", body);
    write(root, "src/handlers/get_order.ts", body);

    let report = validate(
        root,
        r#"
[[architectures]]
id = "handlers"
paths = ["src/handlers/**"]

[[architectures.constraints]]
rule = "max_similarity"
value = 0.9
severity = "warning"
"#,
    )
    .await;

    let similarity = report.similarity.as_ref().unwrap();
    assert_eq!(similarity.len(), 1);
    assert!(similarity[0].similarity >= 0.9);
    assert_eq!(report.summary.total_warnings, 1);
    assert_eq!(report.summary.total_errors, 0);
}

#[tokio::test]
async fn inherited_constraints_apply_to_child_architectures() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/domain/user.ts", "import axios from 'axios';\n");

    let report = validate(
        root,
        r#"
[[architectures]]
id = "base"

[[architectures.constraints]]
rule = "forbid_import"
value = ["axios"]

[[architectures]]
id = "domain"
inherits = "base"
paths = ["src/domain/**"]
"#,
    )
    .await;

    assert_eq!(report.summary.failed, 1);
    let file = &report.files[0];
    assert_eq!(file.arch_id.as_deref(), Some("domain"));
    assert_eq!(file.violations[0].source.as_deref(), Some("base"));
}

#[tokio::test]
async fn clean_project_passes_with_empty_sections() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/domain/user.ts", "export class User {}\n");

    let report = validate(
        root,
        r#"
[[architectures]]
id = "domain"
paths = ["src/domain/**"]

[[architectures.constraints]]
rule = "forbid_import"
value = ["axios"]
"#,
    )
    .await;

    assert!(!report.has_failures());
    assert!(report.package_violations.is_none());
    assert!(report.layer_violations.is_none());
    assert!(report.coverage.is_none());
    assert!(report.similarity.is_none());
    assert!(report.cycles.is_empty());
}

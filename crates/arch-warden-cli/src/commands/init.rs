//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const REGISTRY_FILE: &str = "arch-warden.toml";

const TEMPLATE: &str = r#"# arch-warden registry.
# Declare architectures, classify files into them with `paths` globs, and
# attach constraints. Run `arch-warden check` or add
# `arch_warden::enforce!();` to a test file.

[validate]
exclude = ["**/target/**", "**/node_modules/**"]

[[architectures]]
id = "base"
hints = ["Shared rules for every architecture."]

[[architectures.constraints]]
rule = "forbid_pattern"
value = "debugger"
pattern = "\\bdebugger\\b"
severity = "warning"

[[architectures]]
id = "domain"
inherits = "base"
paths = ["src/domain/**"]
layer = "domain"
allowed_layers = ["domain"]

[[architectures.constraints]]
rule = "forbid_import"
value = ["axios", "node-fetch"]
why = "The domain layer stays transport-free."
alternative = "an injected gateway interface"

[[architectures]]
id = "handlers"
inherits = "base"
paths = ["src/handlers/**"]
layer = "handlers"
allowed_layers = ["handlers", "domain"]
mixins = ["observable"]

[[mixins]]
id = "observable"

[[mixins.constraints]]
rule = "require_import"
value = ["tracing", "log"]
match = "any"
severity = "warning"
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    let path = Path::new(REGISTRY_FILE);
    if path.exists() && !force {
        bail!("{REGISTRY_FILE} already exists (use --force to overwrite)");
    }
    std::fs::write(path, TEMPLATE)?;
    println!("Wrote {REGISTRY_FILE}");
    Ok(())
}

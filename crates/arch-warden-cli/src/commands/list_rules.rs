//! List-rules command implementation.

use arch_warden_core::rules;
use arch_warden_rules::standard_registry;

/// Prints every built-in rule validator plus the resolver-level and
/// project-level rules with no dispatchable validator.
pub fn run() {
    let registry = standard_registry();

    println!("Dispatched rule validators:\n");
    for name in registry.rule_names() {
        let description = registry
            .get(name)
            .map(|validator| validator.description())
            .unwrap_or_default();
        let scope = if rules::is_graph_rule(name) {
            "project"
        } else {
            "file"
        };
        println!("  {name:<24} [{scope:<7}] {description}");
    }

    println!("\nResolver directives (consumed during resolution):\n");
    println!("  {:<24} suppresses forbid_import matches", rules::ALLOW_IMPORT);
    println!("  {:<24} removes a matching forbid_pattern", rules::ALLOW_PATTERN);

    println!("\nProject-level constraints (evaluated by dedicated checks):\n");
    println!("  {:<24} cross-file coverage requirement", rules::REQUIRE_COVERAGE);
    println!("  {:<24} near-duplicate ceiling per architecture", rules::MAX_SIMILARITY);
}

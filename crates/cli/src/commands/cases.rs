use std::path::Path;

use anyhow::{anyhow, Context, Result};
use equiv_core::inputs::InputGenerator;
use serde::Serialize;

use crate::commands::util::{load_config, load_registry, ConfigOverrides};

#[derive(Debug, Serialize)]
pub struct CaseInfo {
    pub name: String,
    pub category: String,
    pub signature: String,
    pub source: String,
    pub tags: Vec<String>,
    pub explicit_rows: usize,
}

/// List the cases registered by a corpus manifest.
pub fn list_cases_command(corpus: &Path, json: bool) -> Result<()> {
    let registry = load_registry(corpus)?;
    let cases: Vec<CaseInfo> = registry
        .all_cases()
        .map(|c| CaseInfo {
            name: c.name().to_string(),
            category: c.category.as_str().to_string(),
            signature: c.signature.to_string(),
            source: c.source.display().to_string(),
            tags: c.tags.iter().cloned().collect(),
            explicit_rows: c.explicit.len(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&cases)?);
        return Ok(());
    }

    if cases.is_empty() {
        println!("Cases: (none)");
        return Ok(());
    }

    println!("Cases:");
    for case in &cases {
        println!("- {} [{}] {}", case.name, case.category, case.signature);
    }
    println!();
    println!("Categories:");
    for (category, count) in registry.category_counts() {
        println!("- {category}: {count}");
    }
    Ok(())
}

/// Show the argument sets a run would feed to one case.
pub fn inputs_command(
    corpus: &Path,
    case_name: &str,
    seed: u64,
    count: usize,
    config: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config(config, &ConfigOverrides::default())?;
    let registry = load_registry(corpus)?;
    let case = registry.get(case_name).ok_or_else(|| {
        let known: Vec<&str> = registry.all_cases().map(|c| c.name()).collect();
        anyhow!("Unknown case '{}'. Known cases: {}", case_name, known.join(", "))
    })?;

    let sets = InputGenerator::new(config.generator.clone())
        .generate_for_case(case, seed, count)
        .with_context(|| format!("Failed to generate inputs for '{case_name}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sets)?);
        return Ok(());
    }

    println!("{}", case.signature);
    for set in &sets {
        println!("  {set}");
    }
    Ok(())
}

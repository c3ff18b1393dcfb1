use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::RuleError;
use crate::rule::Rule;

/// Loads and validates rules from a YAML/JSON file or a directory of them.
///
/// Rules without an id receive one after the highest explicit id, in file order.
pub fn load_rules(path: impl AsRef<Path>) -> Result<Vec<Rule>, RuleError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RuleError::MissingPath(path.display().to_string()));
    }

    let mut rules = if path.is_dir() {
        load_from_directory(path)?
    } else {
        load_from_file(path)?
    };

    deduplicate(&rules)?;
    assign_missing_ids(&mut rules)?;
    for rule in &rules {
        rule.validate()?;
    }
    rules.sort_by_key(|rule| rule.priority);

    Ok(rules)
}

fn load_from_directory(path: &Path) -> Result<Vec<Rule>, RuleError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path).map_err(|err| RuleError::from_io(path, err))? {
        let entry = entry.map_err(|err| RuleError::from_io(path, err))?;
        let file_type = entry
            .file_type()
            .map_err(|err| RuleError::from_io(entry.path(), err))?;
        if file_type.is_dir() {
            continue;
        }
        entries.push(entry.path());
    }
    entries.sort();

    let mut rules = Vec::new();
    for file in entries {
        if let Some(ext) = file.extension().and_then(|value| value.to_str()) {
            if matches!(ext, "json" | "yaml" | "yml") {
                let mut file_rules = load_from_file(&file)?;
                rules.append(&mut file_rules);
            }
        }
    }

    Ok(rules)
}

fn load_from_file(path: &Path) -> Result<Vec<Rule>, RuleError> {
    let raw = fs::read_to_string(path).map_err(|err| RuleError::from_io(path, err))?;
    parse_rules(&raw, path)
}

/// Parses a rules document: `{rules: [...]}`, a list, or a single rule.
pub fn parse_rules(raw: &str, path: &Path) -> Result<Vec<Rule>, RuleError> {
    let mut attempts = Vec::new();

    if let Ok(doc) = serde_yaml::from_str::<RuleDocument>(raw) {
        return Ok(doc.rules);
    }

    attempts.push("rules document".to_string());

    if let Ok(list) = serde_yaml::from_str::<Vec<Rule>>(raw) {
        return Ok(list);
    }

    attempts.push("list".to_string());

    match serde_yaml::from_str::<Rule>(raw) {
        Ok(rule) => Ok(vec![rule]),
        Err(err) => {
            attempts.push("single".to_string());
            let message = format!("unable to parse rules file using {:?} formats: {}", attempts, err);
            Err(RuleError::parse_error(path.to_path_buf(), message))
        }
    }
}

fn deduplicate(rules: &[Rule]) -> Result<(), RuleError> {
    let mut seen = HashSet::new();
    for rule in rules.iter().filter(|rule| rule.id != 0) {
        if !seen.insert(rule.id) {
            return Err(RuleError::DuplicateRule { id: rule.id });
        }
    }
    Ok(())
}

fn assign_missing_ids(rules: &mut [Rule]) -> Result<(), RuleError> {
    let mut last = rules.iter().map(|rule| rule.id).max().unwrap_or(0);
    for rule in rules.iter_mut().filter(|rule| rule.id == 0) {
        last = last
            .checked_add(1)
            .ok_or_else(|| RuleError::invalid(0, "no free rule id left after the highest explicit id"))?;
        rule.id = last;
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RuleDocument {
    rules: Vec<Rule>,
}

//! Production Code Enforcement
//!
//! Library and binary sources must not silence dead code warnings and must
//! propagate errors instead of panicking on them. Everything from the first
//! `#[cfg(test)]` of a file onward is test code and exempt, as are `tests.rs`
//! modules and comment lines.

use std::fs;
use std::path::{Path, PathBuf};

/// Crates whose `src/` trees are scanned.
const WORKSPACE_CRATES: [&str; 3] = ["eventide-core", "eventide-sim", "eventide-cli"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    DeadCodeAllowed,
    PanicOnError,
}

impl Rule {
    fn matching(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.starts_with("//") {
            return None;
        }
        if trimmed.contains("#[allow(") && trimmed.contains("dead_code") {
            return Some(Rule::DeadCodeAllowed);
        }
        if trimmed.contains(".unwrap()") || trimmed.contains(".expect(") {
            return Some(Rule::PanicOnError);
        }
        None
    }

    fn explanation(self) -> &'static str {
        match self {
            Rule::DeadCodeAllowed => "remove the unused code or use it",
            Rule::PanicOnError => "return the error with `?` instead",
        }
    }
}

#[derive(Debug)]
struct Violation {
    file_path: String,
    line_number: usize,
    context: String,
    rule: Rule,
}

struct ProductionCodeChecker {
    violations: Vec<Violation>,
    files_checked: usize,
}

impl ProductionCodeChecker {
    fn new() -> Self {
        Self {
            violations: Vec::new(),
            files_checked: 0,
        }
    }

    fn find_source_files(root: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        let mut files = Vec::new();
        for krate in WORKSPACE_CRATES {
            Self::collect_rust_files(&root.join(krate).join("src"), &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    fn collect_rust_files(
        dir: &Path,
        files: &mut Vec<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !dir.is_dir() {
            return Ok(());
        }
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect_rust_files(&path, files)?;
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
        Ok(())
    }

    fn is_test_module(path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name == "tests.rs" || name.to_string_lossy().ends_with("_tests.rs"))
    }

    fn check_source(&mut self, file_path: &str, content: &str) {
        self.files_checked += 1;
        for (index, line) in content.lines().enumerate() {
            if line.trim_start().starts_with("#[cfg(test)]") {
                break;
            }
            if let Some(rule) = Rule::matching(line) {
                self.violations.push(Violation {
                    file_path: file_path.to_string(),
                    line_number: index + 1,
                    context: line.trim().to_string(),
                    rule,
                });
            }
        }
    }

    fn check_workspace(&mut self, root: &Path) -> Result<(), Box<dyn std::error::Error>> {
        for file in Self::find_source_files(root)? {
            if Self::is_test_module(&file) {
                continue;
            }
            let content = fs::read_to_string(&file)?;
            self.check_source(&file.to_string_lossy(), &content);
        }
        Ok(())
    }

    fn report_violations(&self) -> bool {
        if self.violations.is_empty() {
            println!(
                "Production code check: {} files checked, no violations found",
                self.files_checked
            );
            return true;
        }

        for violation in &self.violations {
            println!("{}:{}", violation.file_path, violation.line_number);
            println!("  {}", violation.context);
            println!("  {:?}: {}", violation.rule, violation.rule.explanation());
            println!();
        }
        println!(
            "Found {} violation(s) in {} file(s) checked",
            self.violations.len(),
            self.files_checked
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_matching() {
        assert_eq!(Rule::matching("#[allow(dead_code)]"), Some(Rule::DeadCodeAllowed));
        assert_eq!(
            Rule::matching("    #[allow(clippy::too_many_arguments, dead_code)]"),
            Some(Rule::DeadCodeAllowed)
        );
        assert_eq!(Rule::matching("let x = y.unwrap();"), Some(Rule::PanicOnError));
        assert_eq!(Rule::matching("let x = y.expect(\"y\");"), Some(Rule::PanicOnError));
        assert_eq!(Rule::matching("/// let x = y.unwrap();"), None);
        assert_eq!(Rule::matching("let x = y.unwrap_or_default();"), None);
    }

    #[test]
    fn test_test_sections_are_exempt() {
        let source = r#"
pub fn parse(input: &str) -> Option<u32> {
    input.parse().ok()
}

#[allow(dead_code)]
fn helper() {}

#[cfg(test)]
mod tests {
    #[test]
    fn parses() {
        assert_eq!(super::parse("1").unwrap(), 1);
    }
}
"#;
        let mut checker = ProductionCodeChecker::new();
        checker.check_source("lib.rs", source);

        assert_eq!(checker.violations.len(), 1);
        assert_eq!(checker.violations[0].line_number, 6);
        assert_eq!(checker.violations[0].rule, Rule::DeadCodeAllowed);
    }

    #[test]
    fn test_is_test_module() {
        assert!(ProductionCodeChecker::is_test_module(Path::new("src/kernel/tests.rs")));
        assert!(ProductionCodeChecker::is_test_module(Path::new("src/chain_tests.rs")));
        assert!(!ProductionCodeChecker::is_test_module(Path::new("src/kernel/mod.rs")));
    }

    #[test]
    fn production_code_enforcement() {
        let mut checker = ProductionCodeChecker::new();
        checker
            .check_workspace(Path::new(".."))
            .expect("Failed to check workspace");

        assert!(checker.files_checked > 0, "no workspace sources found");
        assert!(
            checker.report_violations(),
            "Production code violations found - see output above"
        );
    }
}

//! `lognorm rules` command handler

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use lognorm_normalizer::pattern::MatchType;
use lognorm_normalizer::{
    NormalizerError, RuleSet, RuleSetLoader, RuleSetSummary, ScriptEngine, SharedLibrary,
};

use crate::cli::{RulesAction, RulesArgs};
use crate::commands::{ConfigSource, build_pool};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `rules` command.
pub async fn execute(
    args: RulesArgs,
    source: &ConfigSource,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        RulesAction::List { active, inactive } => {
            let filter = match (active, inactive) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            execute_list(source, filter, writer).await
        }
        RulesAction::Show { id, lang } => execute_show(source, &id, &lang, writer).await,
        RulesAction::Validate { path } => execute_validate(source, path, writer).await,
    }
}

async fn execute_list(
    source: &ConfigSource,
    active_filter: Option<bool>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = source.load().await?;
    let pool = build_pool(&config).await?;

    let activation = pool.active_rule_sets();
    let order = pool.ordered_active_ids();

    // 활성 룰셋은 적용 순서대로, 비활성 룰셋은 ID 순으로 뒤에 붙입니다.
    let mut rule_sets = pool.rule_sets();
    rule_sets.sort_by_key(|rs| {
        order
            .iter()
            .position(|id| id == rs.id())
            .unwrap_or(usize::MAX)
    });

    let entries: Vec<RuleSetEntry> = rule_sets
        .iter()
        .map(|rs| {
            let active = activation.get(rs.id()).copied().unwrap_or(false);
            RuleSetEntry::new(rs, active)
        })
        .filter(|entry| active_filter.is_none_or(|want| entry.active == want))
        .collect();

    let report = RuleSetListReport {
        total: entries.len(),
        rule_sets: entries,
    };
    writer.render(&report)?;

    Ok(())
}

async fn execute_show(
    source: &ConfigSource,
    id: &str,
    lang: &str,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = source.load().await?;
    let pool = build_pool(&config).await?;

    let report = RuleSetShowReport(pool.rule_set(id)?.summary(lang));
    writer.render(&report)?;

    Ok(())
}

/// Load every rule set file under the given directories and run its examples.
///
/// Unlike the pool, which skips broken files with a warning, this reports
/// one error per failing file.
async fn execute_validate(
    source: &ConfigSource,
    path: Option<PathBuf>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let (paths, max_operations) = match path {
        Some(path) => (vec![path], lognorm_core::config::DEFAULT_MAX_SCRIPT_OPERATIONS),
        None => {
            let config = source.load().await?;
            let paths = config.normalizer.paths.iter().map(PathBuf::from).collect();
            (paths, config.normalizer.max_script_operations)
        }
    };

    let report = validate_directories(&paths, max_operations).await?;
    writer.render(&report)?;

    if report.invalid > 0 {
        return Err(CliError::Validation(format!(
            "{} of {} rule set files are invalid",
            report.invalid, report.total_files
        )));
    }

    Ok(())
}

async fn validate_directories(
    paths: &[PathBuf],
    max_operations: u64,
) -> Result<RuleSetValidationReport, CliError> {
    info!(paths = ?paths, "validating rule sets");

    let engine = Arc::new(ScriptEngine::new(
        max_operations,
        Arc::new(lognorm_normalizer::NoopGeoLocator),
    ));
    let library = SharedLibrary::load(paths, &engine).await?;

    let mut report = RuleSetValidationReport {
        paths: paths.iter().map(|p| p.display().to_string()).collect(),
        ..RuleSetValidationReport::default()
    };

    for dir in paths {
        for file in RuleSetLoader::rule_files(dir).await? {
            report.total_files += 1;
            match validate_file(&file, &library, &engine).await {
                Ok(id) => {
                    report.valid += 1;
                    report.rule_sets.push(id);
                }
                Err(e) => {
                    report.invalid += 1;
                    report.errors.push(RuleSetError {
                        file: file.display().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    Ok(report)
}

async fn validate_file(
    file: &Path,
    library: &SharedLibrary,
    engine: &Arc<ScriptEngine>,
) -> Result<String, NormalizerError> {
    let loaded = RuleSetLoader::load_file(file).await?;
    let rule_set = RuleSet::compile(loaded.source, library, Arc::clone(engine))?;
    rule_set.validate_examples()?;
    Ok(rule_set.id().to_owned())
}

// ---- reports ----

#[derive(Serialize)]
pub struct RuleSetListReport {
    pub total: usize,
    pub rule_sets: Vec<RuleSetEntry>,
}

#[derive(Serialize)]
pub struct RuleSetEntry {
    pub id: String,
    pub applied_to: String,
    pub active: bool,
    pub patterns: usize,
    pub taxonomy: Option<String>,
    pub description: String,
}

impl RuleSetEntry {
    fn new(rule_set: &RuleSet, active: bool) -> Self {
        Self {
            id: rule_set.id().to_owned(),
            applied_to: rule_set.applied_to().to_owned(),
            active,
            patterns: rule_set.patterns().len(),
            taxonomy: rule_set.taxonomy().map(str::to_owned),
            description: rule_set.description("en").to_owned(),
        }
    }
}

impl Render for RuleSetListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Rule Sets ({} total)", self.total.to_string().bold())?;
        writeln!(w)?;
        writeln!(
            w,
            "{:<25} {:<10} {:<8} {:<8} Taxonomy",
            "ID", "Field", "Status", "Patterns"
        )?;
        writeln!(w, "{}", "-".repeat(70))?;

        for rs in &self.rule_sets {
            let status = if rs.active {
                "active".green()
            } else {
                "inactive".yellow()
            };
            writeln!(
                w,
                "{:<25} {:<10} {:<8} {:<8} {}",
                rs.id,
                rs.applied_to,
                status,
                rs.patterns,
                rs.taxonomy.as_deref().unwrap_or("-")
            )?;
        }

        Ok(())
    }
}

/// Long description of one rule set.
#[derive(Serialize)]
#[serde(transparent)]
pub struct RuleSetShowReport(pub RuleSetSummary);

impl Render for RuleSetShowReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let rs = &self.0;
        writeln!(w, "{} (version {})", rs.name.bold(), rs.version)?;
        if !rs.description.is_empty() {
            writeln!(w, "  {}", rs.description)?;
        }
        writeln!(w)?;
        writeln!(w, "  Applies to: {}", rs.applied_to)?;
        let match_type = match rs.match_type {
            MatchType::Match => "match",
            MatchType::Search => "search",
        };
        writeln!(w, "  Match type: {match_type}")?;
        if let Some(taxonomy) = &rs.taxonomy {
            writeln!(w, "  Taxonomy:   {taxonomy}")?;
        }
        if !rs.authors.is_empty() {
            writeln!(w, "  Authors:    {}", rs.authors.join(", "))?;
        }
        if let Some(path) = &rs.path {
            writeln!(w, "  File:       {path}")?;
        }
        for (field, re) in &rs.prerequisites {
            writeln!(w, "  Requires:   {field} =~ {re}")?;
        }
        for (key, value) in &rs.common_tags {
            writeln!(w, "  Adds:       {key} = {value}")?;
        }
        if !rs.final_callbacks.is_empty() {
            writeln!(w, "  Finally:    {}", rs.final_callbacks.join(", "))?;
        }

        for pattern in &rs.patterns {
            writeln!(w)?;
            writeln!(w, "  {} [{}]", pattern.name.bold(), pattern.kind)?;
            writeln!(w, "    {}", pattern.pattern)?;
            if !pattern.description.is_empty() {
                writeln!(w, "    {}", pattern.description)?;
            }
            for (substitute, tag) in &pattern.substitutes {
                let description = pattern.tags.get(tag).map(String::as_str).unwrap_or("");
                writeln!(w, "    {substitute:<12} -> {tag:<20} {description}")?;
            }
            for example in &pattern.examples {
                writeln!(w, "    Example: {}", example.sample.cyan())?;
                for (tag, value) in &example.normalization {
                    writeln!(w, "      {tag} = {value}")?;
                }
            }
        }

        Ok(())
    }
}

#[derive(Serialize, Default)]
pub struct RuleSetValidationReport {
    pub paths: Vec<String>,
    pub total_files: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Ids of rule sets that passed.
    pub rule_sets: Vec<String>,
    pub errors: Vec<RuleSetError>,
}

#[derive(Serialize)]
pub struct RuleSetError {
    pub file: String,
    pub error: String,
}

impl Render for RuleSetValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Rule Set Validation: {}", self.paths.join(", ").bold())?;
        writeln!(
            w,
            "  Files: {} total, {} valid, {} invalid",
            self.total_files,
            self.valid.to_string().green(),
            if self.invalid > 0 {
                self.invalid.to_string().red()
            } else {
                self.invalid.to_string().normal()
            }
        )?;

        if !self.errors.is_empty() {
            writeln!(w)?;
            writeln!(w, "Errors:")?;
            for e in &self.errors {
                writeln!(w, "  {}: {}", e.file.red(), e.error)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../crates/normalizer/normalizers");

    fn copy_library(dir: &Path) {
        for file in ["common_tag_types.yml", "common_callbacks.yml"] {
            std::fs::copy(Path::new(BUNDLED).join(file), dir.join(file)).unwrap();
        }
    }

    #[tokio::test]
    async fn bundled_rule_sets_validate() {
        let report = validate_directories(&[PathBuf::from(BUNDLED)], 100_000)
            .await
            .unwrap();
        assert_eq!(report.total_files, 4);
        let errors: Vec<&str> = report.errors.iter().map(|e| e.error.as_str()).collect();
        assert_eq!(report.invalid, 0, "errors: {errors:?}");
        assert!(report.rule_sets.contains(&"syslog-0.99".to_owned()));
    }

    #[tokio::test]
    async fn failing_example_is_reported_per_file() {
        let dir = tempfile::tempdir().unwrap();
        copy_library(dir.path());
        std::fs::write(
            dir.path().join("bad.yml"),
            r#"
name: bad
patterns:
  - name: bad-001
    text: 'WORD'
    tags:
      - { name: word, tag_type: Anything, substitute: WORD }
    examples:
      - { text: 'hello', expected_tags: { word: goodbye } }
"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.yml"), "name: [").unwrap();

        let report = validate_directories(&[dir.path().to_path_buf()], 100_000)
            .await
            .unwrap();
        assert_eq!(report.total_files, 2);
        assert_eq!(report.invalid, 2);
        assert!(
            report
                .errors
                .iter()
                .any(|e| e.file.ends_with("bad.yml") && e.error.contains("goodbye"))
        );
        assert!(report.errors.iter().any(|e| e.file.ends_with("broken.yml")));
    }

    #[test]
    fn validation_report_renders_errors() {
        let report = RuleSetValidationReport {
            paths: vec!["/rules".to_owned()],
            total_files: 1,
            valid: 0,
            invalid: 1,
            rule_sets: Vec::new(),
            errors: vec![RuleSetError {
                file: "/rules/bad.yml".to_owned(),
                error: "example mismatch".to_owned(),
            }],
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("Rule Set Validation"));
        assert!(output.contains("bad.yml"));
        assert!(output.contains("example mismatch"));
    }

    #[test]
    fn list_report_renders_status() {
        let report = RuleSetListReport {
            total: 2,
            rule_sets: vec![
                RuleSetEntry {
                    id: "syslog-0.99".to_owned(),
                    applied_to: "raw".to_owned(),
                    active: true,
                    patterns: 4,
                    taxonomy: None,
                    description: String::new(),
                },
                RuleSetEntry {
                    id: "sshd-0.99".to_owned(),
                    applied_to: "body".to_owned(),
                    active: false,
                    patterns: 1,
                    taxonomy: Some("access control".to_owned()),
                    description: String::new(),
                },
            ],
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("syslog-0.99"));
        assert!(output.contains("inactive"));
        assert!(output.contains("access control"));
    }

    #[tokio::test]
    async fn show_report_includes_patterns_and_examples() {
        let pool = lognorm_normalizer::NormalizerPool::new([BUNDLED]).await.unwrap();
        let report = RuleSetShowReport(pool.rule_set("sshd-0.99").unwrap().summary("fr"));

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("sshd-001"));
        assert!(output.contains("Normalise les messages"));
        assert!(output.contains("Failed password for bernat"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["id"], "sshd-0.99");
    }
}

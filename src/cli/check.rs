use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use reqif::{Config, codec, container, xml};
use serde::Serialize;
use tracing::instrument;
use walkdir::WalkDir;

use super::terminal::{Colorize, print_table};

#[derive(Debug, Parser)]
#[command(about = "Check that documents are written back unchanged")]
pub struct Check {
    /// Files, or directories to search for `.reqif` and `.reqifz` files
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Only report failures
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// How a document fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Outcome {
    /// Written back byte for byte.
    Identical,
    /// Written back differently, but stable: a second trip changes nothing.
    Normalised,
    /// Could not be loaded, or the output is not stable.
    Failed,
}

impl Outcome {
    const fn label(self) -> &'static str {
        match self {
            Self::Identical => "identical",
            Self::Normalised => "normalised",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Serialize)]
struct Report {
    path: PathBuf,
    outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl Check {
    #[instrument(level = "debug", skip(self, context))]
    pub fn run(self, context: &super::Context) -> anyhow::Result<()> {
        let files = collect_documents(&self.paths);
        if files.is_empty() {
            anyhow::bail!("no .reqif or .reqifz files found");
        }

        let progress = if self.quiet || matches!(self.output, OutputFormat::Json) {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(u64::try_from(files.len()).unwrap_or(u64::MAX)).with_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} {wide_msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        };

        let reports: Vec<Report> = files
            .par_iter()
            .map(|path| {
                let report = check_file(path, &context.config);
                progress.inc(1);
                report
            })
            .collect();
        progress.finish_and_clear();

        match self.output {
            OutputFormat::Table => self.output_table(&reports),
            OutputFormat::Json => {
                serde_json::to_writer_pretty(std::io::stdout(), &reports)
                    .context("failed to render json output")?;
                println!();
            }
        }

        if reports.iter().any(|report| report.outcome == Outcome::Failed) {
            std::process::exit(2);
        }
        Ok(())
    }

    fn output_table(&self, reports: &[Report]) {
        let shown: Vec<&Report> = reports
            .iter()
            .filter(|report| !self.quiet || report.outcome == Outcome::Failed)
            .collect();

        if !shown.is_empty() {
            let rows: Vec<Vec<String>> = shown
                .iter()
                .map(|report| {
                    vec![
                        report.path.display().to_string(),
                        report.outcome.label().to_owned(),
                        report.detail.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            print_table(&["FILE", "RESULT", "DETAIL"], &rows, |column, cell| {
                if column != 1 {
                    return cell.to_owned();
                }
                match cell.trim_end() {
                    "identical" => cell.success(),
                    "normalised" => cell.warning(),
                    _ => cell.failure(),
                }
            });
            println!();
        }

        let count = |outcome| reports.iter().filter(|r| r.outcome == outcome).count();
        println!(
            "{} identical, {} normalised, {} failed",
            count(Outcome::Identical),
            count(Outcome::Normalised),
            count(Outcome::Failed)
        );
    }
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|extension| {
            extension.eq_ignore_ascii_case("reqif") || extension.eq_ignore_ascii_case("reqifz")
        })
}

fn collect_documents(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = paths
        .iter()
        .flat_map(|root| {
            WalkDir::new(root)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| entry.depth() == 0 || is_document(entry.path()))
                .map(walkdir::DirEntry::into_path)
        })
        .collect();
    files.sort();
    files.dedup();
    files
}

fn check_file(path: &Path, config: &Config) -> Report {
    let (outcome, detail) = match round_trip(path, config) {
        Ok(outcome) => (outcome, None),
        Err(error) => (Outcome::Failed, Some(format!("{error:#}"))),
    };
    Report {
        path: path.to_path_buf(),
        outcome,
        detail,
    }
}

fn round_trip(path: &Path, config: &Config) -> anyhow::Result<Outcome> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let source = container::document_source(&bytes)?;

    let tree = xml::parse_with(&source, &config.parse_options())?;
    let document = codec::decode(&tree)?;
    let output = codec::to_bytes(&document);
    if output == *source {
        return Ok(Outcome::Identical);
    }

    let again = codec::round_trip(&output).context("the output does not load")?;
    if again == output {
        Ok(Outcome::Normalised)
    } else {
        anyhow::bail!("the output changes on a second round trip")
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const MINIMAL: &str = include_str!("../../tests/fixtures/minimal.reqif");

    #[test]
    fn documents_are_found_below_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("a.reqif"), "").unwrap();
        fs::write(dir.path().join("nested/b.REQIFZ"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        let explicit = dir.path().join("notes.txt");

        let files = collect_documents(&[dir.path().to_path_buf(), explicit.clone()]);
        assert_eq!(
            files,
            [
                dir.path().join("a.reqif"),
                dir.path().join("nested/b.REQIFZ"),
                explicit
            ]
        );
    }

    #[test]
    fn outcomes_distinguish_identical_normalised_and_failed() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();

        let identical = dir.path().join("identical.reqif");
        fs::write(&identical, MINIMAL).unwrap();
        assert_eq!(round_trip(&identical, &config).unwrap(), Outcome::Identical);

        let normalised = dir.path().join("normalised.reqif");
        fs::write(&normalised, MINIMAL.replace("<REQ-IF ", "<REQ-IF  ")).unwrap();
        assert_eq!(round_trip(&normalised, &config).unwrap(), Outcome::Normalised);

        let broken = dir.path().join("broken.reqif");
        fs::write(&broken, "<REQ-IF>").unwrap();
        let report = check_file(&broken, &config);
        assert_eq!(report.outcome, Outcome::Failed);
        assert!(report.detail.is_some());
    }
}

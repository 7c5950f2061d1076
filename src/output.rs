// Copyright 2023 - 2026 The Gauntlet Authors

//! The output directory: logs, the instrumented artifact, and the report.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::report::SessionReport;

/// Name of the directory created under the tree root.
pub const OUTPUT_DIR_NAME: &str = "gauntlet.out";

/// A session's output directory.
#[derive(Clone, Debug)]
pub struct OutputDir {
    path: Utf8PathBuf,
    log_dir: Utf8PathBuf,
}

impl OutputDir {
    /// Create (or reuse) the output directory and its log subdirectory.
    pub fn new(base: &Utf8Path) -> Result<OutputDir> {
        let path = base.join(OUTPUT_DIR_NAME);
        let log_dir = path.join("log");
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("create output directory {path:?}"))?;
        Ok(OutputDir { path, log_dir })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn log_dir(&self) -> &Utf8Path {
        &self.log_dir
    }

    /// Where the instrumented artifact is compiled to.
    pub fn artifact_path(&self) -> Utf8PathBuf {
        self.path.join("mutated.bin")
    }

    /// Write `report.json`.
    pub fn write_report(&self, report: &SessionReport) -> Result<Utf8PathBuf> {
        let path = self.path.join("report.json");
        let json = serde_json::to_string_pretty(report).context("serialize report")?;
        std::fs::write(&path, json).with_context(|| format!("write report {path:?}"))?;
        info!(%path, "report written");
        Ok(path)
    }
}

/// Copy the compiled artifact (and symbols, when present) next to each
/// test project, where the host loads it from.
pub fn inject_binary(
    binary: &Utf8Path,
    symbols: Option<&Utf8Path>,
    test_projects: &[Utf8PathBuf],
) -> Result<Vec<Utf8PathBuf>> {
    let mut injected = Vec::new();
    let file_name = binary
        .file_name()
        .context("artifact path has no file name")?;
    for project in test_projects {
        let dir = project.parent().unwrap_or(Utf8Path::new("."));
        let target = dir.join(file_name);
        std::fs::copy(binary, &target)
            .with_context(|| format!("inject {binary:?} into {dir:?}"))?;
        debug!(%target, "binary injected");
        if let Some(symbols) = symbols {
            let symbol_target = dir.join(
                symbols
                    .file_name()
                    .context("symbol path has no file name")?,
            );
            std::fs::copy(symbols, &symbol_target)
                .with_context(|| format!("inject symbols into {dir:?}"))?;
        }
        injected.push(target);
    }
    Ok(injected)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_owned()).unwrap()
    }

    #[test]
    fn creates_nested_dirs_and_report() {
        let tmp = tempfile::tempdir().unwrap();
        let out = OutputDir::new(&utf8(tmp.path())).unwrap();
        assert!(out.log_dir().is_dir());
        let report = SessionReport::new(&[], false);
        let path = out.write_report(&report).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["score"], serde_json::Value::Null);
    }

    #[test]
    fn inject_copies_next_to_each_test_project() {
        let tmp = tempfile::tempdir().unwrap();
        let base = utf8(tmp.path());
        let binary = base.join("mutated.bin");
        std::fs::write(&binary, b"artifact").unwrap();
        let proj_a = base.join("tests-a");
        let proj_b = base.join("tests-b");
        std::fs::create_dir_all(&proj_a).unwrap();
        std::fs::create_dir_all(&proj_b).unwrap();
        let projects = vec![proj_a.join("Tests.dll"), proj_b.join("Tests.dll")];
        let injected = inject_binary(&binary, None, &projects).unwrap();
        assert_eq!(
            injected,
            vec![proj_a.join("mutated.bin"), proj_b.join("mutated.bin")]
        );
        for path in injected {
            assert_eq!(std::fs::read(path).unwrap(), b"artifact");
        }
    }
}

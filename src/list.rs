// Copyright 2023 - 2026 The Gauntlet Authors

//! List the mutants that would be tested, without running anything.

use anyhow::Result;
use camino::Utf8PathBuf;
use itertools::Itertools;

use crate::ast::RenderOptions;
use crate::error::EngineError;
use crate::frontend::Frontend;
use crate::mutant::Mutant;
use crate::mutators::MutatorRegistry;
use crate::options::Options;
use crate::report::mutation_diff;
use crate::session::IdAllocator;
use crate::visit::mutate_unit;

/// A discovered mutant with an optional rendered diff.
#[derive(Debug)]
pub struct ListedMutant {
    pub mutant: Mutant,
    pub diff: Option<String>,
}

/// Discover every mutant in the given sources, in stable id order.
pub fn list_mutants(
    frontend: &dyn Frontend,
    options: &Options,
    sources: &[Utf8PathBuf],
    with_diffs: bool,
) -> Result<Vec<ListedMutant>> {
    let registry = MutatorRegistry::standard();
    let render_options = RenderOptions {
        helper_namespace: options.helper_namespace.clone(),
    };
    let mut alloc = IdAllocator::default();
    let mut listed = Vec::new();
    for path in sources {
        if !options.allows_source_file_path(path) {
            continue;
        }
        let unit = frontend.parse(path).map_err(|err| EngineError::Parse {
            path: path.to_string(),
            message: format!("{err:#}"),
        })?;
        let sem = frontend.semantics(&unit);
        let fm = mutate_unit(&unit, &sem, &registry, options, &mut alloc);
        for (mutant, mutation) in fm.mutants.into_iter().zip_eq(fm.mutations) {
            let diff = if with_diffs {
                mutation_diff(&unit, &mutation, &mutant.display, &render_options)
            } else {
                None
            };
            listed.push(ListedMutant { mutant, diff });
        }
    }
    Ok(listed)
}

/// Serialize the listed mutants as JSON.
pub fn list_json(listed: &[ListedMutant]) -> Result<String> {
    let mutants: Vec<&Mutant> = listed.iter().map(|l| &l.mutant).collect();
    Ok(serde_json::to_string_pretty(&mutants)?)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::parse::TextFrontend;

    use super::*;

    fn write_source(dir: &tempfile::TempDir, name: &str, code: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        std::fs::write(&path, code).unwrap();
        path
    }

    #[test]
    fn lists_mutants_across_files_with_stable_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_source(&tmp, "a.gx", "fn f(int x): int {\n    return x + 1;\n}\n");
        let b = write_source(&tmp, "b.gx", "fn g(int x): int {\n    return x * 2;\n}\n");
        let frontend = TextFrontend::new();
        let listed =
            list_mutants(&frontend, &Options::default(), &[a, b], false).unwrap();
        let ids: Vec<u32> = listed.iter().map(|l| l.mutant.id.0).collect();
        assert_eq!(ids, [0, 1]);
        assert!(listed[0].mutant.file.as_str().ends_with("a.gx"));
        assert!(listed[1].mutant.file.as_str().ends_with("b.gx"));
        assert!(listed[0].diff.is_none());
    }

    #[test]
    fn diffs_when_requested() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_source(&tmp, "a.gx", "fn f(int x): int {\n    return x + 1;\n}\n");
        let frontend = TextFrontend::new();
        let listed = list_mutants(&frontend, &Options::default(), &[a], true).unwrap();
        let diff = listed[0].diff.as_deref().unwrap();
        assert!(diff.contains("-    return x + 1;"));
        assert!(diff.contains("+    return x - 1;"));
    }

    #[test]
    fn json_listing_is_serializable() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_source(&tmp, "a.gx", "fn f(int x): int {\n    return x + 1;\n}\n");
        let frontend = TextFrontend::new();
        let listed = list_mutants(&frontend, &Options::default(), &[a], false).unwrap();
        let json: serde_json::Value = serde_json::from_str(&list_json(&listed).unwrap()).unwrap();
        assert_eq!(json[0]["display"], "replace + with -");
    }

    #[test]
    fn parse_failure_is_fatal_for_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = write_source(&tmp, "bad.gx", "fn broken( {\n");
        let frontend = TextFrontend::new();
        let err = list_mutants(&frontend, &Options::default(), &[bad], false).unwrap_err();
        let engine = err.downcast::<EngineError>().unwrap();
        assert!(matches!(engine, EngineError::Parse { .. }));
    }
}

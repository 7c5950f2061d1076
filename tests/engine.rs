// Copyright 2024 - 2026 The Gauntlet Authors

//! End-to-end runs of the whole pipeline: parse, mutate, compile with
//! rollback, coverage, dispatch, score, report.

mod common;

use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;

use common::{SimPlatform, SimTest};
use gauntlet::console::Console;
use gauntlet::exit_code;
use gauntlet::lab::Lab;
use gauntlet::options::Options;
use gauntlet::parse::TextFrontend;

struct TreeFixture {
    _tmp: tempfile::TempDir,
    base: Utf8PathBuf,
    sources: Vec<Utf8PathBuf>,
    test_projects: Vec<Utf8PathBuf>,
}

fn tree_with(source: &str) -> TreeFixture {
    let tmp = tempfile::tempdir().unwrap();
    let base = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();
    let src_dir = base.join("src");
    let test_dir = base.join("tests-bin");
    std::fs::create_dir_all(&src_dir).unwrap();
    std::fs::create_dir_all(&test_dir).unwrap();
    let source_path = src_dir.join("calc.gx");
    std::fs::write(&source_path, source).unwrap();
    TreeFixture {
        _tmp: tmp,
        sources: vec![source_path],
        test_projects: vec![test_dir.join("Tests.dll")],
        base,
    }
}

const CALC: &str = "fn add(int a, int b): int {\n    return a + b;\n}\n\nfn bump(int x): int {\n    x++;\n    return x;\n}\n\nfn unused(int x): int {\n    return x * 3;\n}\n";

#[test]
fn pipeline_kills_survives_and_flags_uncovered() {
    // Mutant 0: `+` -> `-` in add; mutant 1: `++` -> `--` in bump;
    // mutant 2: `*` -> `/` in unused, which no test reaches.
    let tree = tree_with(CALC);
    let platform = SimPlatform::new(vec![
        ("t_add", SimTest::new(&[0]).killing(&[0])),
        ("t_bump", SimTest::new(&[1])),
    ]);
    let frontend = TextFrontend::new();
    let console = Console::new();
    let lab = Lab {
        frontend: &frontend,
        platform: &platform,
        options: Options::default(),
        console: &console,
    };
    let outcome = lab
        .run(&tree.sources, &tree.test_projects, &tree.base)
        .unwrap();
    assert_eq!(outcome.score.killed, 1);
    assert_eq!(outcome.score.survived, 1);
    assert_eq!(outcome.score.no_coverage, 1);
    assert_eq!(outcome.score.value(), Some(0.5));
    assert_eq!(outcome.exit_code, exit_code::SUCCESS);

    // The report records the verdicts with killing tests.
    let report: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(tree.base.join("gauntlet.out/report.json")).unwrap(),
    )
    .unwrap();
    let mutants = report["mutants"].as_array().unwrap();
    assert_eq!(mutants.len(), 3);
    assert_eq!(mutants[0]["status"], "Killed");
    assert_eq!(mutants[0]["killing_tests"][0], "t_add");
    assert_eq!(mutants[1]["status"], "Survived");
    assert_eq!(mutants[2]["status"], "NoCoverage");
    assert_eq!(report["score"], 0.5);
}

#[test]
fn pipeline_honors_break_threshold() {
    let tree = tree_with(CALC);
    let platform = SimPlatform::new(vec![
        ("t_add", SimTest::new(&[0]).killing(&[0])),
        ("t_bump", SimTest::new(&[1])),
    ]);
    let frontend = TextFrontend::new();
    let console = Console::new();
    let lab = Lab {
        frontend: &frontend,
        platform: &platform,
        options: Options::from_arg_strs(["gauntlet", "--break-at", "80"]),
        console: &console,
    };
    let outcome = lab
        .run(&tree.sources, &tree.test_projects, &tree.base)
        .unwrap();
    // Score 0.5 < 80%.
    assert_eq!(outcome.exit_code, exit_code::BREAK_THRESHOLD_VIOLATED);
}

#[test]
fn pipeline_tests_static_mutant_against_every_test() {
    // Mutant 0 lives in a static initializer, first reached lazily during
    // t_first; t_other does not cover it but kills it when active.
    let source = "static int Base = 2 + 3;\n\nfn get(int x): int {\n    return x + Base;\n}\n";
    let tree = tree_with(source);
    let platform = SimPlatform::new(vec![
        ("t_first", SimTest::new(&[1]).with_static(&[0])),
        ("t_other", SimTest::new(&[1]).killing(&[0])),
    ]);
    let frontend = TextFrontend::new();
    let console = Console::new();
    let lab = Lab {
        frontend: &frontend,
        platform: &platform,
        options: Options::default(),
        console: &console,
    };
    let outcome = lab
        .run(&tree.sources, &tree.test_projects, &tree.base)
        .unwrap();
    assert_eq!(outcome.score.killed, 1);
    let report: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(tree.base.join("gauntlet.out/report.json")).unwrap(),
    )
    .unwrap();
    let killed = report["mutants"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["id"] == 0)
        .unwrap();
    assert_eq!(killed["status"], "Killed");
    assert_eq!(killed["killing_tests"][0], "t_other");
}

#[test]
fn pipeline_writes_instrumented_artifact_and_runner_logs() {
    let tree = tree_with(CALC);
    let platform = SimPlatform::new(vec![
        ("t_add", SimTest::new(&[0])),
        ("t_bump", SimTest::new(&[1])),
    ]);
    let frontend = TextFrontend::new();
    let console = Console::new();
    let lab = Lab {
        frontend: &frontend,
        platform: &platform,
        options: Options::default(),
        console: &console,
    };
    lab.run(&tree.sources, &tree.test_projects, &tree.base)
        .unwrap();
    // The single bundled artifact carries the runtime switches and was
    // injected next to the test project.
    let artifact = std::fs::read_to_string(tree.base.join("gauntlet.out/mutated.bin")).unwrap();
    assert!(artifact.contains("Gauntlet.MutantControl.IsActive(0)"));
    assert!(artifact.contains("Gauntlet.MutantControl.IsActive(1)"));
    assert!(tree.base.join("tests-bin/mutated.bin").is_file());
    // Worker logs are segregated by runner id.
    let logs: Vec<String> = std::fs::read_dir(tree.base.join("gauntlet.out/log").as_std_path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(logs.iter().any(|l| l.starts_with("runner-0")), "{logs:?}");
}

#[test]
fn pipeline_rejects_missing_test_projects() {
    let tree = tree_with(CALC);
    let platform = SimPlatform::new(vec![]);
    let frontend = TextFrontend::new();
    let console = Console::new();
    let lab = Lab {
        frontend: &frontend,
        platform: &platform,
        options: Options::default(),
        console: &console,
    };
    let err = lab.run(&tree.sources, &[], &tree.base).unwrap_err();
    let engine = err.downcast::<gauntlet::EngineError>().unwrap();
    assert!(matches!(
        engine,
        gauntlet::EngineError::ConfigurationInvalid(_)
    ));
}

// Copyright 2024 - 2026 The Gauntlet Authors

//! Focused acceptance scenarios for the core behaviors: update mutation
//! discovery, checked removal, single-test and static scheduling, timeout
//! attribution, and the break threshold.

mod common;

use std::time::Duration;

use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;

use common::{make_mutant, test_desc, SimPlatform, SimTest};
use gauntlet::ast::RenderOptions;
use gauntlet::coverage::CoverageMatrix;
use gauntlet::exit_code;
use gauntlet::list::list_mutants;
use gauntlet::mutant::{MutantId, MutantStatus};
use gauntlet::options::Options;
use gauntlet::parse::TextFrontend;
use gauntlet::platform::TestId;
use gauntlet::schedule::Scheduler;
use gauntlet::score::Score;
use gauntlet::session::Session;
use gauntlet::timeouts::Timeouts;

fn write_source(dir: &tempfile::TempDir, code: &str) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join("main.gx")).unwrap();
    std::fs::write(&path, code).unwrap();
    path
}

/// Postfix unary: `x++` yields exactly one mutation, `x++` to `x--`, with
/// id 0.
#[test]
fn postfix_update_mutation() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_source(&tmp, "fn main() {\n    int x = 0;\n    x++;\n}\n");
    let frontend = TextFrontend::new();
    let listed = list_mutants(&frontend, &Options::default(), &[path], false).unwrap();
    assert_eq!(listed.len(), 1);
    let mutant = &listed[0].mutant;
    assert_eq!(mutant.id, MutantId(0));
    assert_eq!(mutant.display, "replace ++ with --");
    assert_eq!(mutant.span.start.line, 3);
}

/// Checked removal: the wrapper goes, everything around it stays byte for
/// byte.
#[test]
fn checked_removal_preserves_surrounding_text() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_source(
        &tmp,
        "fn f(int a, int b) {\n    var y = checked(a + b);\n}\n",
    );
    let frontend = TextFrontend::new();
    let options = Options::from_arg_strs(["gauntlet", "--level", "advanced"]);
    let listed = list_mutants(&frontend, &options, &[path], true).unwrap();
    let removal = listed
        .iter()
        .find(|l| l.mutant.display == "remove checked")
        .expect("checked removal proposed");
    let diff = removal.diff.as_deref().unwrap();
    assert!(diff.contains("-    var y = checked(a + b);"));
    assert!(diff.contains("+    var y = a + b;"));
    // Exactly one line changed; the rest of the file is untouched.
    let removed: Vec<&str> = diff
        .lines()
        .filter(|l| l.starts_with('-') && !l.starts_with("---"))
        .collect();
    assert_eq!(removed, ["-    var y = checked(a + b);"]);
}

fn scheduler_scenario(
    tests: &[&str],
    mutants: &[u32],
) -> (Session, CoverageMatrix) {
    let mut session = Session::new(Options::default());
    session.tests = tests.iter().map(|t| test_desc(t)).collect();
    session.mutants = mutants.iter().map(|&id| make_mutant(id)).collect();
    (session, CoverageMatrix::default())
}

/// Single-test mutant: coverage {5: [t1]}; passing keeps it alive, failing
/// kills it with the killing test recorded.
#[test]
fn single_test_mutant_verdicts() {
    for (kills, expected) in [
        (vec![], MutantStatus::Survived),
        (vec![5], MutantStatus::Killed),
    ] {
        let (mut session, mut matrix) = scheduler_scenario(&["t1"], &[5]);
        matrix.record_normal(MutantId(5), &TestId::new("t1"));
        session.apply_coverage(&matrix);
        let platform = SimPlatform::new(vec![(
            "t1",
            SimTest::new(&[5]).killing(&kills),
        )]);
        let options = session.options.clone();
        let scheduler = Scheduler {
            platform: &platform,
            options: &options,
            sources: &[],
            log_dir: None,
        };
        scheduler
            .run_mutants(
                &mut session,
                &matrix,
                Timeouts {
                    test: Duration::from_millis(5000),
                },
            )
            .unwrap();
        let mutant = session.mutant(MutantId(5)).unwrap();
        assert_eq!(mutant.status, expected);
        if expected == MutantStatus::Killed {
            assert_eq!(mutant.killing_tests, [TestId::new("t1")]);
        }
    }
}

/// Static mutant: is_static means all of t1, t2, t3 run with it active,
/// and any failure kills it.
#[test]
fn static_mutant_runs_whole_suite() {
    let (mut session, mut matrix) = scheduler_scenario(&["t1", "t2", "t3"], &[7]);
    matrix.record_static(MutantId(7), &TestId::new("t1"));
    session.apply_coverage(&matrix);
    let platform = SimPlatform::new(vec![
        ("t1", SimTest::new(&[])),
        ("t2", SimTest::new(&[])),
        ("t3", SimTest::new(&[]).killing(&[7])),
    ]);
    let options = session.options.clone();
    let scheduler = Scheduler {
        platform: &platform,
        options: &options,
        sources: &[],
        log_dir: None,
    };
    scheduler
        .run_mutants(
            &mut session,
            &matrix,
            Timeouts {
                test: Duration::from_millis(5000),
            },
        )
        .unwrap();
    assert_eq!(
        session.mutant(MutantId(7)).unwrap().status,
        MutantStatus::Killed
    );
}

/// Timeout derivation and attribution: a 200 ms coverage ceiling still
/// floors at 5000 ms, and a test exceeding it times the mutant out.
#[test]
fn timeout_derivation_and_attribution() {
    let options = Options::default();
    let platform = SimPlatform::new(vec![(
        "t1",
        SimTest::new(&[3]).taking(Duration::from_millis(200)),
    )]);
    let (mut session, mut matrix) = scheduler_scenario(&["t1"], &[3]);
    matrix.record_normal(MutantId(3), &TestId::new("t1"));
    session.apply_coverage(&matrix);
    let sched_options = session.options.clone();
    let scheduler = Scheduler {
        platform: &platform,
        options: &sched_options,
        sources: &[],
        log_dir: None,
    };
    let coverage_results = scheduler.run_coverage(&session).unwrap();
    let timeouts = Timeouts::from_coverage_run(&coverage_results, &options);
    assert_eq!(timeouts.test, Duration::from_millis(5000));

    // Now the mutant makes the test spin past the timeout.
    let slow = SimPlatform::new(vec![(
        "t1",
        SimTest::new(&[3]).taking(Duration::from_millis(6000)),
    )]);
    let scheduler = Scheduler {
        platform: &slow,
        options: &sched_options,
        sources: &[],
        log_dir: None,
    };
    scheduler
        .run_mutants(&mut session, &matrix, timeouts)
        .unwrap();
    assert_eq!(
        session.mutant(MutantId(3)).unwrap().status,
        MutantStatus::Timeout
    );
}

/// Break threshold: a defined score below the threshold breaks the build;
/// an undefined score never does.
#[test]
fn break_threshold_verdicts() {
    let mut mutants = Vec::new();
    for id in 0..10 {
        let mut m = make_mutant(id);
        m.status = if id < 3 {
            MutantStatus::Killed
        } else {
            MutantStatus::Survived
        };
        mutants.push(m);
    }
    let score = Score::from_mutants(&mutants, false);
    assert_eq!(score.value(), Some(0.3));
    assert_eq!(
        score.exit_code(Some(40.0)),
        exit_code::BREAK_THRESHOLD_VIOLATED
    );

    let empty = Score::from_mutants(&[], false);
    assert_eq!(empty.value(), None);
    assert_eq!(empty.exit_code(Some(40.0)), exit_code::SUCCESS);
}

/// The instrumented rendering: a survivor scenario run end to end through
/// the real collector shows coverage strings in the expected wire format.
#[test]
fn coverage_wire_format_round_trip() {
    use gauntlet::mutators::MutatorRegistry;
    use gauntlet::parse::{infer_semantics, parse_source};
    use gauntlet::session::IdAllocator;
    use gauntlet::visit::mutate_unit;

    let unit = parse_source("fn main() {\n    int x = 0;\n    x++;\n}\n", "src/m.gx").unwrap();
    let sem = infer_semantics(&unit);
    let registry = MutatorRegistry::standard();
    let mut alloc = IdAllocator::default();
    let fm = mutate_unit(&unit, &sem, &registry, &Options::default(), &mut alloc);
    let rendered = gauntlet::ast::render_unit(&fm.file.mutated, &RenderOptions::default());
    // The probe and the selection guard both name mutant 0.
    assert!(rendered.text.contains("Gauntlet.MutantControl.IsActive(0)"));
    assert!(rendered.text.contains("Gauntlet.MutantControl.HitNormal(0,"));

    // A host that executes the original branch reports "0;" coverage.
    let platform = SimPlatform::new(vec![("t1", SimTest::new(&[0]))]);
    let request = gauntlet::platform::RunRequest {
        sources: vec![],
        settings: gauntlet::platform::PlatformSettings::new(
            &gauntlet::platform::CollectorSettings {
                capture_coverage: true,
                mutant_map: vec![],
                helper_namespace: "Gauntlet".to_owned(),
            },
        ),
        test_filter: None,
    };
    use gauntlet::platform::TestPlatform;
    let results = platform.run(&request).unwrap();
    assert_eq!(results[0].properties["Coverage"], "0;");
}

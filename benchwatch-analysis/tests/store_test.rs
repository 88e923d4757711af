//! End-to-end parse of a realistic log directory.

use std::fs;
use std::path::Path;

use benchwatch_analysis::report::TestType;
use benchwatch_analysis::store::ResultStore;
use benchwatch_core::status::RunnerStatus;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn seed_log_dir(dir: &Path) {
    write(dir, "commit_list", "abc1234 i965: tune the urb\ndef5678 i965: break the build\n");
    write(dir, "commit_labels", "abc1234 v1.0\n");
    write(dir, "notes", "nightly tracking of mesa master\n");

    write(
        dir,
        "abc1234_bench_glmark2",
        "# FPS (more is better) of 'glmark2' using commit abc1234\n60.1\n59.9\n60.4\n",
    );
    write(dir, "abc1234_bench_glmark2#0", "60.1\n");
    write(dir, "abc1234_bench_glmark2#1", "59.9\n");
    write(
        dir,
        "abc1234_bench_glmark2#0.metrics_power",
        "time (s), package (W)\n0.0, 10.0\n1.0, 12.0\n2.0, 14.0\n",
    );
    write(dir, "abc1234_bench_glmark2#0.env_dump", "DISPLAY=:0\n");
    write(dir, "abc1234_bench_glmark2#0.stderr", "noise\n");

    write(
        dir,
        "abc1234_unit_piglit",
        "tex-compress: pass\nshader-link: pass\n",
    );

    write(
        dir,
        "def5678_compile_log",
        "making all...\nld: cannot find -lgbm\nExiting with error code 50\n",
    );
    write(
        dir,
        "abc1234.patch",
        "commit abc1234\nAuthor: Ada <ada@example.org>\nAuthorDate: Mon Mar 7 2016\nCommit: Bob <bob@example.org>\nCommitDate: Tue Mar 8 2016\n\n    i965: tune the urb\n\n    Reviewed-by: Bob <bob@example.org>\n---\n",
    );
}

#[test]
fn parses_a_full_log_directory() {
    let dir = tempfile::tempdir().unwrap();
    seed_log_dir(dir.path());

    let report = ResultStore::new(dir.path()).parse(None).unwrap();

    assert_eq!(report.commits.len(), 2);
    assert_eq!(report.benchmarks.len(), 2);
    assert_eq!(report.notes, vec!["nightly tracking of mesa master"]);

    let abc = report.commit("abc1234").unwrap();
    assert_eq!(abc.label, "v1.0");
    assert_eq!(abc.compile_status, RunnerStatus::Unknown);
    assert_eq!(abc.meta.as_ref().unwrap().reviewed_by.len(), 1);

    let glmark_idx = report.benchmark_index("glmark2").unwrap();
    assert_eq!(report.benchmarks[glmark_idx].test_type, TestType::Bench);
    assert_eq!(report.benchmarks[glmark_idx].unit_str, "FPS");

    let result = abc.result_for(glmark_idx).unwrap();
    assert_eq!(result.data, vec![60.1, 59.9, 60.4]);
    assert_eq!(result.runs.len(), 2);
    assert!(result.metrics.contains_key("package"));
    assert!(result.metrics.contains_key("package:energy"));
    assert!(result.metrics.contains_key("efficiency"));
    assert_eq!(result.env_files[0].as_deref(), Some("abc1234_bench_glmark2#0.env_dump"));

    let piglit_idx = report.benchmark_index("piglit").unwrap();
    let unit = abc.result_for(piglit_idx).unwrap();
    assert_eq!(unit.test_type, TestType::Unit);
    assert_eq!(unit.stabilized_status("tex-compress"), Some("pass"));
}

#[test]
fn frametime_view_converts_rate_results() {
    let dir = tempfile::tempdir().unwrap();
    seed_log_dir(dir.path());
    write(
        dir.path(),
        "abc1234_bench_compile",
        "# s (less is better) of 'compile' using commit abc1234\n2.0\n2.5\n",
    );

    let report = ResultStore::new(dir.path())
        .with_frametime(true)
        .parse(None)
        .unwrap();
    let abc = report.commit("abc1234").unwrap();

    let glmark_idx = report.benchmark_index("glmark2").unwrap();
    assert_eq!(report.benchmarks[glmark_idx].unit_str, "ms");
    let result = abc.result_for(glmark_idx).unwrap();
    assert_eq!(result.unit_str, "ms");
    assert!(!result.more_is_better);
    assert!((result.data[0] - 1000.0 / 60.1).abs() < 1e-9);
    // Per-run samples convert too.
    match &result.runs[0] {
        benchwatch_analysis::report::RunData::Samples(samples) => {
            assert!((samples[0] - 1000.0 / 60.1).abs() < 1e-9);
        }
        other => panic!("unexpected run data: {other:?}"),
    }

    // Results outside the rate family are left alone.
    let compile_idx = report.benchmark_index("compile").unwrap();
    let compile = abc.result_for(compile_idx).unwrap();
    assert_eq!(compile.unit_str, "s");
    assert_eq!(compile.data, vec![2.0, 2.5]);
}

#[test]
fn commit_without_results_still_appears_with_its_build_status() {
    let dir = tempfile::tempdir().unwrap();
    seed_log_dir(dir.path());

    let report = ResultStore::new(dir.path()).parse(None).unwrap();
    let def = report.commit("def5678").unwrap();
    assert!(def.results.is_empty());
    assert_eq!(def.compile_status, RunnerStatus::CompilationFailed);
    assert!(def.build_broken());
}

#[test]
fn restrict_list_filters_by_hash_or_label() {
    let dir = tempfile::tempdir().unwrap();
    seed_log_dir(dir.path());
    let store = ResultStore::new(dir.path());

    let by_label = store.parse(Some(&["v1.0".to_string()])).unwrap();
    assert_eq!(by_label.commits.len(), 1);
    assert_eq!(by_label.commits[0].sha1, "abc1234");

    let by_hash = store.parse(Some(&["def5678".to_string()])).unwrap();
    assert_eq!(by_hash.commits.len(), 1);
    assert!(by_hash.commits[0].build_broken());
}

#[test]
fn missing_commit_list_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ResultStore::new(dir.path()).parse(None).unwrap_err();
    assert!(err.to_string().contains("commit_list"));
}

//! End-to-end tests for the transition pipeline against an in-memory board.

use chrono::NaiveDate;
use rstest::{fixture, rstest};
use shepherd::board::{InMemoryBoard, IssueSeed, Project};
use shepherd::domain::{IssueRef, RepoName};
use shepherd::error::Error;
use shepherd::executor::RetryPolicy;
use shepherd::fields::{BoardTrackers, FieldRequest, FieldTarget, TrackerLabels};
use shepherd::output::{OutputConfig, OutputMode};
use shepherd::prompt::ScriptedReader;
use shepherd::transition::{
    self, Console, RunOutcome, RunStatus, TransitionEngine, TransitionRequest, TransitionSettings,
};
use shepherd::workflow::Rule;
use std::time::Duration;

// ============================================================================
// Helpers
// ============================================================================

fn r(n: u64) -> IssueRef {
    IssueRef::new("acme", "widgets", n)
}

fn widgets() -> RepoName {
    RepoName::new("acme", "widgets")
}

fn settings() -> TransitionSettings {
    TransitionSettings {
        default_repo: Some(widgets()),
        retry: RetryPolicy::default().with_delay(Duration::ZERO),
        ..TransitionSettings::new("acme", 1)
    }
}

fn literal(value: &str) -> Option<FieldTarget> {
    Some(FieldTarget::Literal(value.to_string()))
}

fn status(value: &str) -> FieldRequest {
    FieldRequest {
        status: literal(value),
        ..Default::default()
    }
}

fn item_id(n: u64) -> String {
    format!("item-acme-widgets-{n}")
}

struct Run {
    outcome: RunOutcome,
    out: String,
    err: String,
}

fn console<'a>(
    out: &'a mut Vec<u8>,
    err: &'a mut Vec<u8>,
    input: &'a mut ScriptedReader,
    mode: OutputMode,
) -> Console<'a> {
    Console {
        out,
        err,
        input,
        mode,
        config: OutputConfig::new(120, true, false),
    }
}

async fn run_with(
    board: &InMemoryBoard,
    request: &TransitionRequest,
    answers: &[&str],
    mode: OutputMode,
) -> Run {
    let settings = settings();
    let engine = TransitionEngine::new(board, &settings);
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let mut input = ScriptedReader::new(answers.iter().copied());
    let outcome = transition::run(
        &engine,
        request,
        &mut console(&mut out, &mut err, &mut input, mode),
    )
    .await
    .unwrap();
    Run {
        outcome,
        out: String::from_utf8(out).unwrap(),
        err: String::from_utf8(err).unwrap(),
    }
}

async fn run(board: &InMemoryBoard, request: &TransitionRequest) -> Run {
    run_with(board, request, &[], OutputMode::Text).await
}

async fn field(board: &InMemoryBoard, n: u64, name: &str) -> Option<String> {
    board
        .field_values(&r(n))
        .await
        .and_then(|values| values.get(name).map(ToString::to_string))
}

// ============================================================================
// Fixtures
// ============================================================================

/// Epic #10 with children #11 and #12, all in backlog without a branch.
#[fixture]
fn release_tree() -> InMemoryBoard {
    InMemoryBoard::builder(Project::standard("acme", 1))
        .issue(
            IssueSeed::new(r(10), "Release 2.0")
                .body("Ship the 2.0 release")
                .on_board()
                .field("Status", "Backlog"),
        )
        .issue(
            IssueSeed::new(r(11), "Migrate config")
                .body("Move to the new format")
                .child_of(&r(10))
                .on_board()
                .field("Status", "Backlog"),
        )
        .issue(
            IssueSeed::new(r(12), "Update docs")
                .body("Rewrite the guide")
                .child_of(&r(10))
                .on_board()
                .field("Status", "Backlog"),
        )
        .build()
}

/// Three issues in review: #1 is complete, #2 has an open checklist item,
/// #3 has an empty body.
#[fixture]
fn review_batch() -> InMemoryBoard {
    InMemoryBoard::builder(Project::standard("acme", 1))
        .issue(
            IssueSeed::new(r(1), "Complete")
                .body("- [x] code\n- [x] tests")
                .on_board()
                .field("Status", "In Review"),
        )
        .issue(
            IssueSeed::new(r(2), "Checklist open")
                .body("- [x] code\n- [ ] tests")
                .on_board()
                .field("Status", "In Review"),
        )
        .issue(
            IssueSeed::new(r(3), "No description")
                .on_board()
                .field("Status", "In Progress"),
        )
        .build()
}

/// Trackers for sprints on 2026-03-08 and 2026-03-09 and an open `v2.0`
/// branch, plus one issue to move.
#[fixture]
fn tracked_board() -> InMemoryBoard {
    InMemoryBoard::builder(Project::standard("acme", 1))
        .issue(
            IssueSeed::new(r(20), "Feature")
                .body("Build it")
                .on_board()
                .field("Status", "Ready")
                .field("Branch", "v1.9")
                .field("Microsprint", "2026-03-08-a"),
        )
        .issue(IssueSeed::new(r(90), "Microsprint: 2026-03-08-a").label("microsprint"))
        .issue(IssueSeed::new(r(91), "Microsprint: 2026-03-09-a").label("microsprint"))
        .issue(IssueSeed::new(r(92), "Microsprint: 2026-03-09-b").label("microsprint"))
        .issue(
            IssueSeed::new(r(93), "Microsprint: 2026-03-09-c")
                .label("microsprint")
                .closed(),
        )
        .issue(IssueSeed::new(r(95), "Branch: v2.0").label("branch"))
        .build()
}

// ============================================================================
// Scenarios
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_recursive_move_assigns_branch_to_whole_tree(release_tree: InMemoryBoard) {
    let mut request = TransitionRequest::new(
        ["10"],
        FieldRequest {
            status: literal("ready"),
            branch: literal("v2.0"),
            ..Default::default()
        },
    );
    request.recursive = true;
    request.max_depth = 5;
    request.assume_yes = true;

    let result = run(&release_tree, &request).await;

    assert!(result.outcome.succeeded(), "stderr: {}", result.err);
    assert!(
        result.out.contains("3 updated, 0 skipped, 0 failed"),
        "got: {}",
        result.out
    );
    for n in [10, 11, 12] {
        assert_eq!(field(&release_tree, n, "Status").await.as_deref(), Some("Ready"));
        assert_eq!(field(&release_tree, n, "Branch").await.as_deref(), Some("v2.0"));
    }
    let calls = release_tree.calls().await;
    assert_eq!(calls.set_fields, 1);
    assert_eq!(calls.set_field, 0);
}

#[rstest]
#[tokio::test]
async fn test_starting_work_without_branch_is_rejected(release_tree: InMemoryBoard) {
    let mut request = TransitionRequest::new(["10"], status("in_progress"));
    request.recursive = true;
    request.assume_yes = true;

    let result = run(&release_tree, &request).await;

    match &result.outcome.status {
        RunStatus::Rejected(errors) => {
            assert_eq!(errors.len(), 3);
            assert!(errors.iter().all(|e| e.rule == Rule::BranchRequired));
        }
        other => panic!("unexpected status: {other:?}"),
    }
    assert!(result.err.contains("--branch"));
    assert_eq!(release_tree.calls().await.mutations(), 0);
}

#[tokio::test]
async fn test_single_issue_with_empty_body_cannot_be_done() {
    let board = InMemoryBoard::builder(Project::standard("acme", 1))
        .issue(
            IssueSeed::new(r(42), "Untitled work")
                .on_board()
                .field("Status", "In Progress"),
        )
        .build();

    let result = run(&board, &TransitionRequest::new(["42"], status("done"))).await;

    assert!(!result.outcome.succeeded());
    match &result.outcome.status {
        RunStatus::Rejected(errors) => {
            let error = errors.iter().next().unwrap();
            assert_eq!(errors.len(), 1);
            assert_eq!(error.rule, Rule::BodyRequired);
            assert_eq!(error.issue.number, 42);
        }
        other => panic!("unexpected status: {other:?}"),
    }
    assert!(result.err.contains("#42: cannot move to done with an empty body"));
    assert_eq!(board.calls().await.mutations(), 0);
    assert_eq!(field(&board, 42, "Status").await.as_deref(), Some("In Progress"));
}

#[rstest]
#[tokio::test]
async fn test_one_failure_blocks_the_whole_batch(review_batch: InMemoryBoard) {
    let mut request = TransitionRequest::new(["1", "2", "3"], status("done"));
    request.assume_yes = true;

    let result = run(&review_batch, &request).await;

    match &result.outcome.status {
        RunStatus::Rejected(errors) => {
            let numbers: Vec<u64> = errors.iter().map(|e| e.issue.number).collect();
            assert_eq!(numbers, vec![2, 3]);
        }
        other => panic!("unexpected status: {other:?}"),
    }
    assert_eq!(review_batch.calls().await.mutations(), 0);
    assert_eq!(field(&review_batch, 1, "Status").await.as_deref(), Some("In Review"));
}

#[rstest]
#[tokio::test]
async fn test_force_never_waives_empty_body(review_batch: InMemoryBoard) {
    let mut request = TransitionRequest::new(["1", "2", "3"], status("done"));
    request.assume_yes = true;
    request.force = true;

    let result = run_with(&review_batch, &request, &["y"], OutputMode::Text).await;

    match &result.outcome.status {
        RunStatus::Rejected(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors.iter().next().unwrap().rule, Rule::BodyRequired);
        }
        other => panic!("unexpected status: {other:?}"),
    }
    assert_eq!(review_batch.calls().await.mutations(), 0);
}

#[rstest]
#[tokio::test]
async fn test_force_waives_checklist_after_confirmation(review_batch: InMemoryBoard) {
    let mut request = TransitionRequest::new(["1", "2"], status("done"));
    request.force = true;

    let result = run_with(&review_batch, &request, &["y", "y"], OutputMode::Text).await;

    assert!(result.outcome.succeeded(), "stderr: {}", result.err);
    assert!(result.err.contains("--force waives 1 checklist violation(s)"));
    assert!(result.out.contains("2 updated, 0 skipped, 0 failed"));
    assert_eq!(field(&review_batch, 2, "Status").await.as_deref(), Some("Done"));
}

#[rstest]
#[tokio::test]
async fn test_checklist_inside_code_fence_is_ignored(
    #[values("```", "~~~", "````markdown")] fence: &str,
) {
    let closing = &fence[..fence.find(|c: char| c.is_alphanumeric()).unwrap_or(fence.len())];
    let body = format!("Template:\n{fence}\n- [ ] example\n{closing}\n- [x] real item");
    let board = InMemoryBoard::builder(Project::standard("acme", 1))
        .issue(
            IssueSeed::new(r(7), "Docs")
                .body(body)
                .on_board()
                .field("Status", "In Review"),
        )
        .build();

    let result = run(&board, &TransitionRequest::new(["7"], status("done"))).await;

    assert!(result.outcome.succeeded(), "stderr: {}", result.err);
    assert_eq!(field(&board, 7, "Status").await.as_deref(), Some("Done"));
}

#[rstest]
#[tokio::test]
async fn test_dry_run_matches_live_plan_without_mutating(review_batch: InMemoryBoard) {
    let settings = settings();
    let engine = TransitionEngine::new(&review_batch, &settings);
    let live = TransitionRequest::new(["1", "2", "3"], status("done"));
    let dry = TransitionRequest {
        dry_run: true,
        ..live.clone()
    };

    let live_plan = engine.plan(&live).await.unwrap();
    let dry_plan = engine.plan(&dry).await.unwrap();
    assert_eq!(dry_plan.candidates, live_plan.candidates);
    assert_eq!(dry_plan.validation, live_plan.validation);
    assert_eq!(dry_plan.updates, live_plan.updates);

    let result = run(&review_batch, &dry).await;

    assert_eq!(result.outcome.status, RunStatus::DryRun);
    assert!(result.outcome.succeeded());
    assert!(result.out.contains("Dry run: no changes were made."));
    assert!(result.out.contains("x fail acme/widgets#2"));
    assert!(result.out.contains("+ pass acme/widgets#1"));
    assert_eq!(review_batch.calls().await.mutations(), 0);
}

#[rstest]
#[tokio::test]
async fn test_dry_run_json_preview(release_tree: InMemoryBoard) {
    let mut request = TransitionRequest::new(
        ["10"],
        FieldRequest {
            status: literal("ready"),
            branch: literal("v2.0"),
            ..Default::default()
        },
    );
    request.recursive = true;
    request.dry_run = true;

    let result = run_with(&release_tree, &request, &[], OutputMode::Json).await;

    let preview: serde_json::Value = serde_json::from_str(&result.out).unwrap();
    assert_eq!(preview["dry_run"], true);
    assert_eq!(preview["blocked"], false);
    let candidates = preview["candidates"].as_array().unwrap();
    let numbers: Vec<_> = candidates.iter().map(|c| c["issue"]["number"].clone()).collect();
    assert_eq!(numbers, vec![10, 11, 12]);
    assert_eq!(candidates[1]["depth"], 1);
    assert_eq!(candidates[1]["verdict"], "pass");
    assert_eq!(preview["changes"][0]["field"], "Status");
    assert_eq!(preview["changes"][1]["value"], "v2.0");
    assert_eq!(release_tree.calls().await.mutations(), 0);
}

#[tokio::test]
async fn test_roots_are_listed_before_descendants() {
    let board = InMemoryBoard::builder(Project::standard("acme", 1))
        .issue(IssueSeed::new(r(10), "Epic").body("x").on_board().field("Status", "Backlog"))
        .issue(
            IssueSeed::new(r(11), "Part")
                .body("x")
                .child_of(&r(10))
                .on_board()
                .field("Status", "Backlog"),
        )
        .issue(IssueSeed::new(r(13), "Audit").body("x").on_board().field("Status", "Backlog"))
        .issue(
            IssueSeed::new(r(14), "Audit part")
                .body("x")
                .child_of(&r(13))
                .on_board()
                .field("Status", "Backlog"),
        )
        .build();
    let mut request = TransitionRequest::new(["10", "13"], status("ready"));
    request.recursive = true;
    request.dry_run = true;

    let result = run_with(&board, &request, &[], OutputMode::Json).await;

    let preview: serde_json::Value = serde_json::from_str(&result.out).unwrap();
    let order: Vec<(u64, u64)> = preview["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| {
            (
                c["issue"]["number"].as_u64().unwrap(),
                c["depth"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(order, vec![(10, 0), (13, 0), (11, 1), (14, 1)]);
}

#[rstest]
#[tokio::test]
async fn test_transport_error_on_untracked_root_aborts_the_run(release_tree: InMemoryBoard) {
    release_tree.fail_issue_fetch(&r(40)).await;
    let mut request = TransitionRequest::new(["10", "40"], status("ready"));
    request.assume_yes = true;
    let settings = settings();
    let engine = TransitionEngine::new(&release_tree, &settings);
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let mut input = ScriptedReader::new(Vec::<&str>::new());

    let result = transition::run(
        &engine,
        &request,
        &mut console(&mut out, &mut err, &mut input, OutputMode::Text),
    )
    .await;

    assert!(matches!(result, Err(Error::Transport(_))), "got: {result:?}");
    assert!(out.is_empty());
    assert_eq!(release_tree.calls().await.mutations(), 0);
    assert_eq!(field(&release_tree, 10, "Status").await.as_deref(), Some("Backlog"));
}

#[rstest]
#[tokio::test]
async fn test_fallback_reaches_same_state_as_batch(
    #[from(release_tree)] batched: InMemoryBoard,
    #[from(release_tree)] fallback: InMemoryBoard,
) {
    fallback.fail_batch_updates(true).await;
    let mut request = TransitionRequest::new(
        ["10"],
        FieldRequest {
            status: literal("ready"),
            priority: literal("p1"),
            branch: literal("v2.0"),
            ..Default::default()
        },
    );
    request.recursive = true;
    request.assume_yes = true;

    let batched_run = run(&batched, &request).await;
    let fallback_run = run(&fallback, &request).await;

    assert!(batched_run.outcome.succeeded());
    assert!(fallback_run.outcome.succeeded());
    match &fallback_run.outcome.status {
        RunStatus::Executed(report) => assert!(report.fell_back),
        other => panic!("unexpected status: {other:?}"),
    }
    for n in [10, 11, 12] {
        assert_eq!(
            batched.field_values(&r(n)).await,
            fallback.field_values(&r(n)).await
        );
    }
    assert_eq!(fallback.calls().await.set_field, 9);
}

#[rstest]
#[tokio::test]
async fn test_exhausted_retries_fail_one_issue_only(release_tree: InMemoryBoard) {
    release_tree.fail_batch_updates(true).await;
    release_tree
        .fail_field_updates(&item_id(11), "Status", 10)
        .await;
    let mut request = TransitionRequest::new(
        ["10"],
        FieldRequest {
            status: literal("ready"),
            branch: literal("v2.0"),
            ..Default::default()
        },
    );
    request.recursive = true;
    request.assume_yes = true;

    let result = run(&release_tree, &request).await;

    assert!(!result.outcome.succeeded());
    assert_eq!(
        result.outcome.failure_message().as_deref(),
        Some("1 of 3 issue(s) failed to update")
    );
    assert!(result.out.contains("2 updated, 0 skipped, 1 failed"));
    assert!(result.out.contains("acme/widgets#11 Status:"));
    assert_eq!(field(&release_tree, 12, "Status").await.as_deref(), Some("Ready"));
    assert_eq!(field(&release_tree, 11, "Status").await.as_deref(), Some("Backlog"));
    assert_eq!(field(&release_tree, 11, "Branch").await.as_deref(), Some("v2.0"));
}

#[rstest]
#[tokio::test]
async fn test_bad_references_are_reported_but_do_not_stop_the_rest(
    release_tree: InMemoryBoard,
) {
    let mut request =
        TransitionRequest::new(["10", "acme/widgets", "77"], FieldRequest {
            priority: literal("P1"),
            ..Default::default()
        });
    request.assume_yes = true;

    let result = run(&release_tree, &request).await;

    assert_eq!(result.outcome.reference_errors, 2);
    assert!(!result.outcome.succeeded());
    assert_eq!(
        result.outcome.failure_message().as_deref(),
        Some("2 reference(s) could not be resolved")
    );
    assert!(result.err.contains("invalid issue reference 'acme/widgets'"));
    assert!(result.err.contains("issue not found: acme/widgets#77"));
    assert_eq!(field(&release_tree, 10, "Priority").await.as_deref(), Some("P1"));
}

#[tokio::test]
async fn test_untracked_issues_are_skipped_not_failed() {
    let board = InMemoryBoard::builder(Project::standard("acme", 1))
        .issue(
            IssueSeed::new(r(1), "Tracked")
                .body("x")
                .on_board()
                .field("Status", "Ready"),
        )
        .issue(IssueSeed::new(r(2), "Not on the board").child_of(&r(1)))
        .build();
    let mut request = TransitionRequest::new(["1"], status("in_progress"));
    request.recursive = true;
    request.assume_yes = true;

    let result = run(&board, &request).await;

    assert!(result.outcome.succeeded(), "stderr: {}", result.err);
    assert!(result.out.contains("1 updated, 1 skipped, 0 failed"));
    assert!(result.out.contains("acme/widgets#2 not on the project board"));
}

#[rstest]
#[tokio::test]
async fn test_multi_issue_run_waits_for_confirmation(release_tree: InMemoryBoard) {
    let request = TransitionRequest::new(["11", "12"], FieldRequest {
        priority: literal("P2"),
        ..Default::default()
    });

    let declined = run_with(&release_tree, &request, &["no"], OutputMode::Text).await;
    assert_eq!(declined.outcome.status, RunStatus::Declined);
    assert!(declined.outcome.succeeded());
    assert!(declined.err.contains("Apply 2 field update(s) to 2 issue(s)? [y/N]"));
    assert_eq!(release_tree.calls().await.mutations(), 0);

    let accepted = run_with(&release_tree, &request, &["Y"], OutputMode::Text).await;
    assert!(matches!(accepted.outcome.status, RunStatus::Executed(_)));
    assert_eq!(field(&release_tree, 12, "Priority").await.as_deref(), Some("P2"));
}

#[rstest]
#[tokio::test]
async fn test_backlog_conflict_rejected_before_any_call(release_tree: InMemoryBoard) {
    let settings = settings();
    let engine = TransitionEngine::new(&release_tree, &settings);
    let request = TransitionRequest::new(
        ["10"],
        FieldRequest {
            backlog: true,
            sprint: literal("2026-03-09-a"),
            ..Default::default()
        },
    );

    let err = engine.plan(&request).await.unwrap_err();

    assert!(matches!(err, Error::ConflictingFields(_)));
    assert_eq!(release_tree.calls().await, Default::default());
}

// ============================================================================
// Tracker lookups
// ============================================================================

fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

async fn run_on_date(
    board: &InMemoryBoard,
    request: &TransitionRequest,
    today: NaiveDate,
) -> Result<Run, Error> {
    let settings = settings();
    let engine = TransitionEngine::new(board, &settings);
    let trackers = BoardTrackers::on_date(board, widgets(), TrackerLabels::default(), today);
    let plan = engine.plan_with_trackers(request, &trackers).await?;

    let (mut out, mut err) = (Vec::new(), Vec::new());
    let mut input = ScriptedReader::default();
    let outcome = transition::drive(
        &engine,
        request,
        &plan,
        &mut console(&mut out, &mut err, &mut input, OutputMode::Text),
    )
    .await?;
    Ok(Run {
        outcome,
        out: String::from_utf8(out).unwrap(),
        err: String::from_utf8(err).unwrap(),
    })
}

#[rstest]
#[tokio::test]
async fn test_current_sprint_picks_latest_active(tracked_board: InMemoryBoard) {
    let request = TransitionRequest::new(["20"], FieldRequest {
        sprint: Some(FieldTarget::Current),
        ..Default::default()
    });

    let result = run_on_date(&tracked_board, &request, march(9)).await.unwrap();

    assert!(result.outcome.succeeded(), "stderr: {}", result.err);
    assert_eq!(
        field(&tracked_board, 20, "Microsprint").await.as_deref(),
        Some("2026-03-09-b")
    );
    assert!(result.out.contains("Microsprint -> 2026-03-09-b"));
}

#[rstest]
#[tokio::test]
async fn test_no_active_sprint_is_fatal(tracked_board: InMemoryBoard) {
    let request = TransitionRequest::new(["20"], FieldRequest {
        sprint: Some(FieldTarget::Current),
        ..Default::default()
    });

    let err = run_on_date(&tracked_board, &request, march(20))
        .await
        .err()
        .unwrap();

    assert_eq!(err.to_string(), "no active microsprint found");
    assert_eq!(tracked_board.calls().await.mutations(), 0);
}

#[rstest]
#[case::current(FieldTarget::Current, true)]
#[case::active_literal(FieldTarget::Literal("V2.0".to_string()), true)]
#[case::inactive_literal(FieldTarget::Literal("v3.0".to_string()), false)]
#[tokio::test]
async fn test_branch_must_be_active(
    tracked_board: InMemoryBoard,
    #[case] branch: FieldTarget,
    #[case] accepted: bool,
) {
    let request = TransitionRequest::new(["20"], FieldRequest {
        branch: Some(branch),
        ..Default::default()
    });

    let result = run_on_date(&tracked_board, &request, march(9)).await.unwrap();

    assert_eq!(result.outcome.succeeded(), accepted, "stderr: {}", result.err);
    if accepted {
        assert!(field(&tracked_board, 20, "Branch").await.is_some_and(|b| b.eq_ignore_ascii_case("v2.0")));
    } else {
        assert!(result.err.contains("branch 'v3.0' is not an active branch"));
        assert!(result.err.contains("valid options: v2.0"));
        assert_eq!(tracked_board.calls().await.mutations(), 0);
    }
}

#[rstest]
#[tokio::test]
async fn test_backlog_clears_branch_and_sprint(tracked_board: InMemoryBoard) {
    let request = TransitionRequest::new(["20"], FieldRequest {
        status: literal("backlog"),
        backlog: true,
        ..Default::default()
    });

    let result = run_on_date(&tracked_board, &request, march(9)).await.unwrap();

    assert!(result.outcome.succeeded(), "stderr: {}", result.err);
    assert_eq!(field(&tracked_board, 20, "Status").await.as_deref(), Some("Backlog"));
    assert_eq!(field(&tracked_board, 20, "Branch").await, None);
    assert_eq!(field(&tracked_board, 20, "Microsprint").await, None);
    assert!(result.out.contains("Branch -> (clear)"));
    assert_eq!(tracked_board.calls().await.label_queries, 0);
}

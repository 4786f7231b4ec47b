use shared_types::{TaskStatus, TerminationReason, WorkerOutcome};
use std::sync::Arc;

use super::support::{
    finalize, request, request_tasks, test_config, test_orchestrator, ScriptedOracle,
    SupervisorFallback, WorkerScript,
};

#[tokio::test]
async fn test_two_iterations_then_finalize() {
    let oracle = Arc::new(ScriptedOracle::new(5).with_supervisor(
        vec![request_tasks(&[4]), finalize("redis pod is out of memory")],
        SupervisorFallback::Fail,
    ));
    let orchestrator = test_orchestrator(oracle.clone(), test_config());

    let report = orchestrator.investigate(request()).await.unwrap();

    assert_eq!(report.termination, TerminationReason::Finalized);
    assert_eq!(report.final_report.root_cause, "redis pod is out of memory");
    assert_eq!(report.iterations.len(), 2);
    assert_eq!(report.iterations[0].dispatched, vec![1, 2, 3]);
    assert_eq!(report.iterations[1].requested, vec![4]);
    assert_eq!(report.iterations[1].dispatched, vec![4]);

    let priorities: Vec<u32> = report.results.iter().map(|r| r.task_priority).collect();
    assert_eq!(priorities, vec![1, 2, 3, 4]);
    for task in &report.tasks {
        let expected = if task.priority == 5 {
            TaskStatus::Pending
        } else {
            TaskStatus::Completed
        };
        assert_eq!(task.status, expected, "task {}", task.priority);
    }
    assert_eq!(report.stats.iterations, 2);
    assert_eq!(report.stats.supervisor_rounds, 2);
    assert_eq!(oracle.supervisor_calls(), 2);
}

#[tokio::test]
async fn test_supervisor_sees_merged_results() {
    let oracle = Arc::new(ScriptedOracle::new(2));
    let orchestrator = test_orchestrator(oracle.clone(), test_config());

    orchestrator.investigate(request()).await.unwrap();

    let contexts = oracle.supervisor_contexts.lock().unwrap();
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].results.len(), 2);
    assert!(contexts[0]
        .results
        .iter()
        .all(|r| r.outcome == WorkerOutcome::Diagnosed));
    assert!(contexts[0].findings_summary.contains("pod-1"));
}

#[tokio::test]
async fn test_iteration_cap_terminates_always_continuing_supervisor() {
    let oracle = Arc::new(
        ScriptedOracle::new(6).with_supervisor(Vec::new(), SupervisorFallback::RequestOpenTasks),
    );
    let config = crate::config::InvestigationConfig {
        max_supervisor_iterations: 1,
        ..test_config()
    };
    let orchestrator = test_orchestrator(oracle.clone(), config);

    let report = orchestrator.investigate(request()).await.unwrap();

    assert_eq!(report.termination, TerminationReason::IterationCap);
    assert_eq!(oracle.supervisor_calls(), 1);
    assert!(report.final_report.inconclusive);
    assert!(report.final_report.root_cause.starts_with("Investigation inconclusive"));
    assert_eq!(report.results.len(), 3);
}

#[tokio::test]
async fn test_open_task_requests_drain_the_plan() {
    let oracle = Arc::new(
        ScriptedOracle::new(5).with_supervisor(Vec::new(), SupervisorFallback::RequestOpenTasks),
    );
    let orchestrator = test_orchestrator(oracle.clone(), test_config());

    let report = orchestrator.investigate(request()).await.unwrap();

    // second round has nothing left to request
    assert_eq!(report.termination, TerminationReason::NoValidRequest);
    assert_eq!(report.results.len(), 5);
    assert!(report.tasks.iter().all(|t| t.status == TaskStatus::Completed));
    assert!(report.stats.supervisor_rounds <= test_config().max_supervisor_iterations);
}

#[tokio::test]
async fn test_requesting_completed_tasks_degrades() {
    let oracle = Arc::new(
        ScriptedOracle::new(3).with_supervisor(Vec::new(), SupervisorFallback::RequestCompleted),
    );
    let orchestrator = test_orchestrator(oracle.clone(), test_config());

    let report = orchestrator.investigate(request()).await.unwrap();

    assert_eq!(report.termination, TerminationReason::NoValidRequest);
    assert_eq!(oracle.supervisor_calls(), 1);
    assert!(report.final_report.inconclusive);
}

#[tokio::test]
async fn test_unavailable_supervisor_still_produces_report() {
    let oracle = Arc::new(ScriptedOracle::new(2).with_supervisor(Vec::new(), SupervisorFallback::Fail));
    let orchestrator = test_orchestrator(oracle, test_config());

    let report = orchestrator.investigate(request()).await.unwrap();

    assert_eq!(report.termination, TerminationReason::SupervisorUnavailable);
    assert_eq!(report.results.len(), 2);
    assert!(report.final_report.detected);
    assert!(!report.final_report.localized_resources.is_empty());
}

#[tokio::test]
async fn test_no_symptoms_finishes_without_supervisor() {
    let oracle = Arc::new(ScriptedOracle::new(0));
    let orchestrator = test_orchestrator(oracle.clone(), test_config());

    let report = orchestrator.investigate(request()).await.unwrap();

    assert_eq!(report.termination, TerminationReason::NoData);
    assert_eq!(report.final_report.root_cause, "No analysis data available");
    assert_eq!(oracle.supervisor_calls(), 0);
    assert!(report.results.is_empty());
}

#[tokio::test]
async fn test_empty_plan_goes_to_supervisor() {
    let oracle = Arc::new(ScriptedOracle::new(2).with_plan(Vec::new()));
    let orchestrator = test_orchestrator(oracle.clone(), test_config());

    let report = orchestrator.investigate(request()).await.unwrap();

    assert_eq!(report.termination, TerminationReason::Finalized);
    assert!(report.tasks.is_empty());
    assert_eq!(report.stats.iterations, 0);
    assert_eq!(oracle.supervisor_calls(), 1);
}

#[tokio::test]
async fn test_worker_timeout_yields_placeholder_results() {
    let oracle = Arc::new(ScriptedOracle::new(2).with_worker(WorkerScript::Hang));
    let config = crate::config::InvestigationConfig {
        worker_timeout_ms: 200,
        oracle_call_timeout_ms: 5_000,
        ..test_config()
    };
    let orchestrator = test_orchestrator(oracle, config);

    let report = orchestrator.investigate(request()).await.unwrap();

    assert_eq!(report.termination, TerminationReason::Finalized);
    assert_eq!(report.results.len(), 2);
    assert!(report
        .results
        .iter()
        .all(|r| r.outcome == WorkerOutcome::TimedOut));
}

#[tokio::test]
async fn test_incident_deadline_cancels_workers() {
    let oracle = Arc::new(ScriptedOracle::new(3).with_worker(WorkerScript::Hang));
    let config = crate::config::InvestigationConfig {
        oracle_call_timeout_ms: 5_000,
        worker_timeout_ms: 5_000,
        incident_deadline_ms: 300,
        ..test_config()
    };
    let orchestrator = test_orchestrator(oracle.clone(), config);

    let started = std::time::Instant::now();
    let report = orchestrator.investigate(request()).await.unwrap();

    assert!(started.elapsed() < std::time::Duration::from_secs(3));
    assert_eq!(report.termination, TerminationReason::Deadline);
    assert_eq!(report.results.len(), 3);
    assert!(report
        .results
        .iter()
        .all(|r| r.outcome == WorkerOutcome::Cancelled));
    assert!(report.final_report.inconclusive);
    assert_eq!(oracle.supervisor_calls(), 0);
}

#[tokio::test]
async fn test_report_is_written_to_reports_dir() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = Arc::new(ScriptedOracle::new(1));
    let config = crate::config::InvestigationConfig {
        reports_dir: Some(dir.path().to_path_buf()),
        ..test_config()
    };
    let orchestrator = test_orchestrator(oracle, config);

    let report = orchestrator.investigate(request()).await.unwrap();

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().to_string_lossy().to_string();
    assert!(name.starts_with("hotel-reservation-"));

    let written: shared_types::IncidentReport =
        serde_json::from_str(&std::fs::read_to_string(files[0].path()).unwrap()).unwrap();
    assert_eq!(written.incident_id, report.incident_id);
}

#[tokio::test]
async fn test_back_to_back_reports_keep_separate_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = crate::config::InvestigationConfig {
        reports_dir: Some(dir.path().to_path_buf()),
        ..test_config()
    };
    let orchestrator = test_orchestrator(Arc::new(ScriptedOracle::new(1)), config);

    let first = orchestrator.investigate(request()).await.unwrap();
    let second = orchestrator.investigate(request()).await.unwrap();

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names.len(), 2);
    assert!(names.iter().any(|n| n.contains(&first.incident_id)));
    assert!(names.iter().any(|n| n.contains(&second.incident_id)));
}

#[tokio::test]
async fn test_report_records_configured_limits() {
    let config = crate::config::InvestigationConfig {
        max_tool_calls_per_task: 5,
        max_parallel_tasks_per_iteration: 2,
        ..test_config()
    };
    let orchestrator = test_orchestrator(Arc::new(ScriptedOracle::new(1)), config.clone());

    let report = orchestrator.investigate(request()).await.unwrap();

    assert_eq!(report.limits, config.limits());
    assert_eq!(report.limits.max_tool_calls_per_task, 5);
    assert_eq!(report.limits.max_parallel_tasks_per_iteration, 2);
}

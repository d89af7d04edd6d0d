use pcluster_reconciler::cluster::{Cluster, ClusterSpec};
use pcluster_reconciler::exec::{
    ExecError, ExecutionContext, ScriptedExecutor, ScriptedResponse, CLUSTER_CONFIG_FILE_NAME,
};
use pcluster_reconciler::config::Settings;
use pcluster_reconciler::logging::ReconcileLog;
use pcluster_reconciler::reconcile::{connect, ClusterClient, ExternalObservation, ReconcileError};
use pcluster_reconciler::status::{
    Availability, ErrorClassification, Operation, RemoteLifecycleStatus, StatusError,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

const CONFIG: &str = "Image:\n        Os: alinux2\n";

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    fs::read_to_string(&path).expect("read fixture")
}

fn describe_with_status(status: RemoteLifecycleStatus) -> String {
    fixture("describe.json").replace(
        "\"clusterStatus\": \"CREATE_COMPLETE\"",
        &format!("\"clusterStatus\": \"{}\"", status.as_str()),
    )
}

fn make_cluster() -> Cluster {
    Cluster::new(ClusterSpec {
        name: "test".to_string(),
        region: "us-eastish".to_string(),
        cluster_configuration: CONFIG.to_string(),
    })
}

struct Harness {
    client: ClusterClient<ScriptedExecutor>,
    workspace_root: TempDir,
}

impl Harness {
    fn new(responses: Vec<ScriptedResponse>) -> Self {
        let workspace_root = tempdir().expect("tempdir");
        let context = ExecutionContext::build(
            "pcluster",
            None,
            vec![("PATH".to_string(), "/usr/bin:/bin".to_string())],
        )
        .expect("context");
        let client = ClusterClient::new(context, ScriptedExecutor::new(responses))
            .with_workspace_root(Some(workspace_root.path().to_path_buf()));
        Self {
            client,
            workspace_root,
        }
    }

    fn workspace_entries(&self) -> usize {
        fs::read_dir(self.workspace_root.path())
            .expect("read workspace root")
            .count()
    }
}

fn assert_removed(dir: &Option<PathBuf>) {
    let dir = dir.as_ref().expect("workspace dir recorded");
    assert!(!Path::new(dir).exists(), "{} still exists", dir.display());
}

#[test]
fn observe_up_to_date_cluster() {
    let harness = Harness::new(vec![
        ScriptedResponse::success(fixture("describe.json")),
        ScriptedResponse::failure(fixture("up_to_date.json"), 1),
    ]);
    let mut cluster = make_cluster();

    let observation = harness.client.observe(&mut cluster).expect("observe");
    assert_eq!(
        observation,
        ExternalObservation {
            resource_exists: true,
            resource_up_to_date: true,
        }
    );
    assert_eq!(cluster.status.availability, Some(Availability::Available));
    let observed = &cluster.status.at_provider;
    assert_eq!(observed.cluster_name, "test");
    assert_eq!(
        observed.remote_status,
        Some(RemoteLifecycleStatus::CreateComplete)
    );
    assert_eq!(observed.scheduler_type, "slurm");
    assert!(observed.stack_arn.starts_with("arn:aws:cloudformation:"));
    assert!(observed.last_updated_time.is_some());
    assert!(observed.up_to_date);

    let calls = harness.client.executor().invocations();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].verb, "describe-cluster");
    assert_eq!(calls[0].args, vec!["--cluster-name", "test"]);
    assert!(calls[0].working_dir.is_none());
    assert_eq!(calls[1].verb, "update-cluster");
    assert_eq!(
        calls[1].args,
        vec![
            "--cluster-configuration",
            CLUSTER_CONFIG_FILE_NAME,
            "--cluster-name",
            "test",
            "--region",
            "us-eastish",
            "--dryrun",
            "true",
        ]
    );
    assert_eq!(calls[1].config_document.as_deref(), Some(CONFIG));
    assert_removed(&calls[1].working_dir);
    assert_eq!(harness.workspace_entries(), 0);
}

#[test]
fn observe_not_up_to_date_cluster() {
    let harness = Harness::new(vec![
        ScriptedResponse::success(fixture("describe.json")),
        ScriptedResponse::failure(fixture("not_up_to_date.json"), 1),
    ]);
    let mut cluster = make_cluster();

    let observation = harness.client.observe(&mut cluster).expect("observe");
    assert!(observation.resource_exists);
    assert!(!observation.resource_up_to_date);
    assert!(!cluster.status.at_provider.up_to_date);
}

#[test]
fn observe_missing_cluster_is_not_an_error() {
    let harness = Harness::new(vec![ScriptedResponse::failure(
        r#"{"message":"Cluster 'test' does not exist"}"#,
        1,
    )]);
    let mut cluster = make_cluster();

    let observation = harness.client.observe(&mut cluster).expect("observe");
    assert_eq!(observation, ExternalObservation::default());
    assert_eq!(cluster, make_cluster());
    assert_eq!(harness.client.executor().invocations().len(), 1);
}

#[test]
fn cluster_that_disappears_is_no_longer_up_to_date() {
    let harness = Harness::new(vec![
        ScriptedResponse::success(fixture("describe.json")),
        ScriptedResponse::failure(fixture("up_to_date.json"), 1),
        ScriptedResponse::failure(r#"{"message":"Cluster 'test' does not exist"}"#, 1),
    ]);
    let mut cluster = make_cluster();

    harness.client.observe(&mut cluster).expect("first observe");
    assert!(cluster.status.at_provider.up_to_date);

    let observation = harness.client.observe(&mut cluster).expect("second observe");
    assert_eq!(observation, ExternalObservation::default());
    assert!(!cluster.status.at_provider.up_to_date);
}

#[test]
fn observe_unrecognized_describe_failure_propagates() {
    let harness = Harness::new(vec![ScriptedResponse::failure(
        r#"{"message":"An error occurred (ExpiredToken) when calling the DescribeStacks operation"}"#,
        1,
    )]);
    let mut cluster = make_cluster();

    let err = harness.client.observe(&mut cluster).expect_err("should fail");
    match err {
        ReconcileError::UnclassifiedRemoteFailure {
            operation,
            cluster: name,
            classification,
            output,
            ..
        } => {
            assert_eq!(operation, Operation::Describe);
            assert_eq!(name, "test");
            assert_eq!(classification, ErrorClassification::EmptyOrUnclassified);
            assert!(output.contains("ExpiredToken"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(cluster, make_cluster());
}

#[test]
fn observe_non_json_describe_failure_is_malformed() {
    let harness = Harness::new(vec![ScriptedResponse::failure(
        "pcluster: error: unrecognized arguments",
        2,
    )]);
    let mut cluster = make_cluster();

    let err = harness.client.observe(&mut cluster).expect_err("should fail");
    assert!(matches!(
        err,
        ReconcileError::Status(StatusError::MalformedErrorPayload { .. })
    ));
}

#[test]
fn observe_spawn_failure_is_not_classified() {
    let harness = Harness::new(Vec::new());
    let mut cluster = make_cluster();

    let err = harness.client.observe(&mut cluster).expect_err("should fail");
    assert!(matches!(err, ReconcileError::Exec(ExecError::Spawn { .. })));
}

#[test]
fn observe_malformed_describe_payload_propagates() {
    let harness = Harness::new(vec![ScriptedResponse::success(
        r#"{"clusterName":"test","clusterStatus":"ROLLBACK_COMPLETE"}"#,
    )]);
    let mut cluster = make_cluster();

    let err = harness.client.observe(&mut cluster).expect_err("should fail");
    match err {
        ReconcileError::Status(StatusError::MalformedSuccessPayload { operation, .. }) => {
            assert_eq!(operation, Operation::Describe);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(harness.client.executor().invocations().len(), 1);
}

#[test]
fn observe_maps_every_lifecycle_status() {
    let table = [
        (RemoteLifecycleStatus::CreateInProgress, true, None),
        (RemoteLifecycleStatus::UpdateInProgress, true, None),
        (RemoteLifecycleStatus::DeleteInProgress, true, None),
        (
            RemoteLifecycleStatus::CreateComplete,
            true,
            Some(Availability::Available),
        ),
        (
            RemoteLifecycleStatus::UpdateComplete,
            true,
            Some(Availability::Available),
        ),
        (RemoteLifecycleStatus::CreateFailed, false, None),
        (RemoteLifecycleStatus::DeleteComplete, false, None),
        (
            RemoteLifecycleStatus::UpdateFailed,
            true,
            Some(Availability::Unavailable),
        ),
        (
            RemoteLifecycleStatus::DeleteFailed,
            true,
            Some(Availability::Unavailable),
        ),
    ];
    assert_eq!(table.len(), RemoteLifecycleStatus::ALL.len());

    for (status, exists, availability) in table {
        let mut responses = vec![ScriptedResponse::success(describe_with_status(status))];
        if exists {
            responses.push(ScriptedResponse::failure(fixture("up_to_date.json"), 1));
        }
        let harness = Harness::new(responses);
        let mut cluster = make_cluster();

        let observation = harness.client.observe(&mut cluster).expect("observe");
        assert_eq!(observation.resource_exists, exists, "{status}");
        assert_eq!(observation.resource_up_to_date, exists, "{status}");
        assert_eq!(cluster.status.availability, availability, "{status}");
        assert_eq!(cluster.status.remote_status(), Some(status));

        let probes = harness
            .client
            .executor()
            .invocations()
            .iter()
            .filter(|call| call.verb == "update-cluster")
            .count();
        assert_eq!(probes, usize::from(exists), "{status}");
        assert_eq!(harness.client.executor().remaining(), 0);
    }
}

#[test]
fn in_progress_status_keeps_previous_availability() {
    let harness = Harness::new(vec![
        ScriptedResponse::success(describe_with_status(
            RemoteLifecycleStatus::UpdateInProgress,
        )),
        ScriptedResponse::failure(
            r#"{"message":"Cannot execute update while stack is in UPDATE_IN_PROGRESS status."}"#,
            1,
        ),
    ]);
    let mut cluster = make_cluster();
    cluster.status.availability = Some(Availability::Available);

    let observation = harness.client.observe(&mut cluster).expect("observe");
    assert!(observation.resource_exists);
    assert!(observation.resource_up_to_date);
    assert_eq!(cluster.status.availability, Some(Availability::Available));
}

#[test]
fn repeated_observe_is_idempotent() {
    let harness = Harness::new(vec![
        ScriptedResponse::success(fixture("describe.json")),
        ScriptedResponse::failure(fixture("up_to_date.json"), 1),
        ScriptedResponse::success(fixture("describe.json")),
        ScriptedResponse::failure(fixture("up_to_date.json"), 1),
    ]);
    let mut cluster = make_cluster();

    let first = harness.client.observe(&mut cluster).expect("first");
    let after_first = cluster.clone();
    let second = harness.client.observe(&mut cluster).expect("second");
    assert_eq!(first, second);
    assert_eq!(cluster, after_first);
}

#[test]
fn dry_run_exit_zero_is_an_anomaly() {
    let harness = Harness::new(vec![
        ScriptedResponse::success(fixture("describe.json")),
        ScriptedResponse::success(fixture("update.json")),
    ]);
    let mut cluster = make_cluster();

    let err = harness.client.observe(&mut cluster).expect_err("should fail");
    assert!(matches!(err, ReconcileError::DryRunSucceeded { .. }));
    assert_eq!(cluster, make_cluster());
    assert_eq!(harness.workspace_entries(), 0);
}

#[test]
fn dry_run_unclassified_failure_is_not_treated_as_drift() {
    let harness = Harness::new(vec![
        ScriptedResponse::success(fixture("describe.json")),
        ScriptedResponse::failure(
            r#"{"message":"Bad Request: Unsupported update: HeadNode.InstanceType"}"#,
            1,
        ),
    ]);
    let mut cluster = make_cluster();

    let err = harness.client.observe(&mut cluster).expect_err("should fail");
    match err {
        ReconcileError::UnclassifiedRemoteFailure {
            operation,
            classification,
            ..
        } => {
            assert_eq!(operation, Operation::Update);
            assert_eq!(classification, ErrorClassification::EmptyOrUnclassified);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(cluster, make_cluster());
    assert_eq!(harness.workspace_entries(), 0);
}

#[test]
fn dry_run_not_found_is_a_failure() {
    let harness = Harness::new(vec![
        ScriptedResponse::success(fixture("describe.json")),
        ScriptedResponse::failure(fixture("not_found.json"), 1),
    ]);
    let mut cluster = make_cluster();

    let err = harness.client.observe(&mut cluster).expect_err("should fail");
    assert!(matches!(
        err,
        ReconcileError::UnclassifiedRemoteFailure {
            classification: ErrorClassification::NotFound,
            ..
        }
    ));
}

#[test]
fn create_writes_back_status_and_cleans_workspace() {
    let harness = Harness::new(vec![ScriptedResponse::success(fixture("create.json"))]);
    let mut cluster = make_cluster();

    harness.client.create(&mut cluster).expect("create");
    let observed = &cluster.status.at_provider;
    assert_eq!(
        observed.remote_status,
        Some(RemoteLifecycleStatus::CreateInProgress)
    );
    assert_eq!(observed.cluster_name, "test");
    assert_eq!(observed.scheduler_type, "slurm");

    let calls = harness.client.executor().invocations();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].verb, "create-cluster");
    assert_eq!(
        calls[0].args,
        vec![
            "--cluster-configuration",
            CLUSTER_CONFIG_FILE_NAME,
            "--cluster-name",
            "test",
            "--region",
            "us-eastish",
        ]
    );
    assert_eq!(calls[0].config_document.as_deref(), Some(CONFIG));
    assert_eq!(
        calls[0].environment,
        vec![("PATH".to_string(), "/usr/bin:/bin".to_string())]
    );
    assert_removed(&calls[0].working_dir);
}

#[test]
fn create_failure_propagates_raw_output_without_status_change() {
    let raw = r#"{"message":"Bad Request: Cluster 'test' already exists"}"#;
    let harness = Harness::new(vec![ScriptedResponse::failure(raw, 1)]);
    let mut cluster = make_cluster();

    let err = harness.client.create(&mut cluster).expect_err("should fail");
    match err {
        ReconcileError::CommandFailed {
            operation, output, ..
        } => {
            assert_eq!(operation, Operation::Create);
            assert_eq!(output, raw);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(cluster, make_cluster());
    assert_removed(&harness.client.executor().invocations()[0].working_dir);
}

#[test]
fn update_writes_back_status() {
    let harness = Harness::new(vec![ScriptedResponse::success(fixture("update.json"))]);
    let mut cluster = make_cluster();

    harness.client.update(&mut cluster).expect("update");
    assert_eq!(
        cluster.status.remote_status(),
        Some(RemoteLifecycleStatus::UpdateInProgress)
    );
    let calls = harness.client.executor().invocations();
    assert_eq!(calls[0].verb, "update-cluster");
    assert!(!calls[0].args.contains(&"--dryrun".to_string()));
    assert_removed(&calls[0].working_dir);
}

#[test]
fn update_with_malformed_output_leaves_status_untouched() {
    let harness = Harness::new(vec![ScriptedResponse::success("not json")]);
    let mut cluster = make_cluster();

    let err = harness.client.update(&mut cluster).expect_err("should fail");
    assert!(matches!(
        err,
        ReconcileError::Status(StatusError::MalformedSuccessPayload {
            operation: Operation::Update,
            ..
        })
    ));
    assert_eq!(cluster, make_cluster());
    assert_eq!(harness.workspace_entries(), 0);
}

#[test]
fn delete_writes_back_terminal_status() {
    let harness = Harness::new(vec![ScriptedResponse::success(fixture("delete.json"))]);
    let mut cluster = make_cluster();

    harness.client.delete(&mut cluster).expect("delete");
    assert_eq!(
        cluster.status.remote_status(),
        Some(RemoteLifecycleStatus::DeleteInProgress)
    );
    let calls = harness.client.executor().invocations();
    assert_eq!(calls[0].verb, "delete-cluster");
    assert_eq!(
        calls[0].args,
        vec!["--cluster-name", "test", "--region", "us-eastish"]
    );
    assert_removed(&calls[0].working_dir);
}

#[test]
fn workspace_failure_prevents_invocation() {
    let harness = Harness::new(vec![ScriptedResponse::success(fixture("create.json"))]);
    let context = harness.client.context().clone();
    let missing_root = harness.workspace_root.path().join("missing");
    let client = ClusterClient::new(context, ScriptedExecutor::default())
        .with_workspace_root(Some(missing_root));
    let mut cluster = make_cluster();

    let err = client.create(&mut cluster).expect_err("should fail");
    assert!(matches!(
        err,
        ReconcileError::Exec(ExecError::WorkspaceIo { .. })
    ));
    assert!(client.executor().invocations().is_empty());
}

#[test]
fn connect_surfaces_executor_construction_failure() {
    let settings = Settings::default();
    let err = connect(
        &settings,
        b"garbled",
        |_credentials: &[u8]| -> Result<ScriptedExecutor, ReconcileError> {
            Err(ReconcileError::Connect("credentials rejected".to_string()))
        },
        ReconcileLog::disabled(),
    )
    .expect_err("connect should fail");
    assert!(err.to_string().contains("credentials rejected"));
}

#[test]
fn connect_applies_settings_to_the_client() {
    let root = tempdir().expect("tempdir");
    fs::create_dir_all(root.path().join("venv/bin")).expect("bin dir");
    fs::write(root.path().join("venv/bin/pcluster"), "#!/bin/sh\n").expect("tool");
    let settings = Settings {
        tool_root: Some(root.path().join("venv")),
        workspace_root: Some(root.path().to_path_buf()),
        command_timeout_secs: 90,
        ..Settings::default()
    };

    let mut seen_credentials = Vec::new();
    let client = connect(
        &settings,
        b"blob",
        |credentials: &[u8]| -> Result<ScriptedExecutor, ReconcileError> {
            seen_credentials = credentials.to_vec();
            Ok(ScriptedExecutor::default())
        },
        ReconcileLog::disabled(),
    )
    .expect("connect");

    assert_eq!(seen_credentials, b"blob");
    assert_eq!(
        client.context().executable,
        root.path().join("venv/bin/pcluster")
    );
    assert_eq!(client.context().timeout, Some(Duration::from_secs(90)));
    assert_eq!(client.workspace_root(), Some(root.path()));
    let search_path = client.context().env_value("PATH").expect("PATH");
    let bin_dir = root.path().join("venv/bin").display().to_string();
    assert!(search_path.starts_with(&bin_dir), "{search_path}");
}

#[test]
fn connect_fails_when_tool_root_lacks_binary() {
    let root = tempdir().expect("tempdir");
    let settings = Settings {
        tool_root: Some(root.path().to_path_buf()),
        ..Settings::default()
    };
    let err = connect(
        &settings,
        b"",
        |_credentials: &[u8]| -> Result<ScriptedExecutor, ReconcileError> {
            Ok(ScriptedExecutor::default())
        },
        ReconcileLog::disabled(),
    )
    .expect_err("missing tool");
    assert!(matches!(
        err,
        ReconcileError::Exec(ExecError::ToolNotFound { .. })
    ));
}

#[cfg(unix)]
#[test]
fn cancellation_reaches_commands_of_a_connected_client() {
    use pcluster_reconciler::exec::CancellationToken;
    use pcluster_reconciler::reconcile::new_process_executor;
    use std::os::unix::fs::PermissionsExt;
    use std::thread;
    use std::time::Instant;

    let root = tempdir().expect("tempdir");
    let tool = root.path().join("venv/bin/pcluster");
    fs::create_dir_all(tool.parent().expect("parent")).expect("bin dir");
    fs::write(&tool, "#!/bin/sh\nsleep 5\n").expect("tool");
    let mut perms = fs::metadata(&tool).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&tool, perms).expect("chmod");
    let settings = Settings {
        tool_root: Some(root.path().join("venv")),
        ..Settings::default()
    };

    let cancel = CancellationToken::new();
    let client = connect(&settings, b"", new_process_executor, ReconcileLog::disabled())
        .expect("connect")
        .with_cancellation(cancel.clone());
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        cancel.cancel();
    });

    let start = Instant::now();
    let mut cluster = make_cluster();
    let err = client.observe(&mut cluster).expect_err("cancelled");
    trigger.join().expect("trigger thread");

    assert!(start.elapsed() < Duration::from_secs(3));
    assert!(matches!(
        err,
        ReconcileError::Exec(ExecError::Cancelled { .. })
    ));
    assert_eq!(cluster, make_cluster());
}

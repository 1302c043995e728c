use std::fs;
use tempfile::TempDir;
use vmsfab::remote::{AuthMethod, DryRunSession, TransferSource};
use vmsfab::vms::{
    Cluster, FileTransfer, QueueJob, RemotePath, ScriptRunner, SessionContext, VmsExecutor,
};
use vmsfab::Error;

fn executor() -> VmsExecutor<DryRunSession> {
    VmsExecutor::new(
        DryRunSession::new("alpha1", "SYSTEM"),
        SessionContext::default(),
    )
    .with_echo(false)
}

fn deletes(exec: &VmsExecutor<DryRunSession>) -> Vec<String> {
    exec.session()
        .commands()
        .into_iter()
        .filter(|c| c.contains("DELETE /NOLOG"))
        .collect()
}

#[test]
fn test_success_follows_severity_parity() {
    let exec = executor();
    for severity in 0..=7u8 {
        exec.session().reply("output", severity);
        let result = exec.run("SHOW TIME").unwrap();
        assert_eq!(result.succeeded(), severity % 2 == 1, "severity {}", severity);
        assert_eq!(result.stdout, vec!["output"]);
    }
}

#[test]
fn test_command_ends_with_severity_write() {
    let exec = executor();
    exec.run("SHOW TIME").unwrap();
    assert_eq!(
        exec.session().commands(),
        vec!["PIPE SHOW TIME; WRITE SYS$OUTPUT $SEVERITY"]
    );

    let options = &exec.session().exec_options()[0];
    assert!(options.suppress_output);
    assert!(options.force_success_return_code);
    assert!(!options.use_shell);
}

#[test]
fn test_missing_severity_is_a_protocol_error() {
    let exec = executor();
    exec.session().reply_raw("%DCL-W-IVVERB, unrecognized command verb\r\n");
    assert!(matches!(exec.run("SHOW TIEM"), Err(Error::Protocol(_))));
}

#[test]
fn test_transport_failure_is_a_connection_error() {
    let exec = executor();
    exec.session().drop_connection("channel closed");
    assert!(matches!(exec.run("SHOW TIME"), Err(Error::Connection(_))));
}

#[test]
fn test_key_authenticated_session_is_refused() {
    let exec = VmsExecutor::new(
        DryRunSession::new("alpha1", "SYSTEM").with_auth_method(AuthMethod::PublicKey),
        SessionContext::default(),
    )
    .with_echo(false);

    assert!(matches!(exec.run("SHOW TIME"), Err(Error::Connection(_))));
    assert!(exec.session().commands().is_empty());
}

#[test]
fn test_working_directory_scope() {
    let exec = executor();
    {
        let _cd = exec.context().with_directory("SYS$LOGIN");
        exec.run("DIR").unwrap();
        {
            let _cd = exec.context().with_directory("SYS$MANAGER");
            let _prefix = exec.context().with_prefix("SET VERIFY");
            exec.run("DIR").unwrap();
        }
        exec.run("DIR").unwrap();
    }
    exec.run("DIR").unwrap();

    let commands = exec.session().commands();
    assert!(commands[0].contains("SET DEFAULT SYS$LOGIN ; DIR"));
    assert!(commands[1].contains("SET DEFAULT SYS$MANAGER ; SET VERIFY ; DIR"));
    assert!(commands[2].contains("SET DEFAULT SYS$LOGIN ; DIR"));
    assert_eq!(commands[3], "PIPE DIR; WRITE SYS$OUTPUT $SEVERITY");
}

#[test]
fn test_scope_restored_after_error() {
    let exec = executor();
    exec.session().drop_connection("reset by peer");

    let outcome = exec
        .context()
        .in_directory("SYS$LOGIN", || exec.run("DIR"));
    assert!(outcome.is_err());
    assert_eq!(exec.context().working_directory(), None);
}

#[test]
fn test_put_sets_directory_and_passes_bare_name() {
    let exec = executor();
    FileTransfer::new(&exec)
        .put(b"$ SHOW TIME\n".to_vec(), "SYS$MANAGER:[BACKUP]JOB.COM", false)
        .unwrap();

    let upload = &exec.session().uploads()[0];
    assert_eq!(upload.remote_name, "JOB.COM");
    assert_eq!(
        upload.options.working_directory.as_deref(),
        Some("/SYS$MANAGER/BACKUP")
    );
    assert!(!upload.options.use_sudo);
    assert!(!upload.options.mirror_local_mode);
    assert_eq!(upload.options.mode, None);
    assert!(upload.options.temp_dir.is_empty());
    assert_eq!(exec.context().working_directory(), None);
}

#[test]
fn test_get_into_local_file() {
    let dir = TempDir::new().unwrap();
    let local = dir.path().join("OPERATOR.LOG");

    let exec = executor();
    exec.session().serve_file(b"line 1\nline 2\n");
    FileTransfer::new(&exec)
        .get(
            "SYS$MANAGER:OPERATOR.LOG",
            vmsfab::remote::LocalTarget::Path(local.clone()),
        )
        .unwrap();

    assert_eq!(fs::read_to_string(&local).unwrap(), "line 1\nline 2\n");
    assert_eq!(exec.session().downloads()[0].remote_name, "OPERATOR.LOG");
}

#[test]
fn test_dry_run_get_leaves_existing_file_alone() {
    let dir = TempDir::new().unwrap();
    let local = dir.path().join("OPERATOR.LOG");
    fs::write(&local, "kept across dry runs").unwrap();

    let exec = executor();
    FileTransfer::new(&exec)
        .get(
            "SYS$MANAGER:OPERATOR.LOG",
            vmsfab::remote::LocalTarget::Path(local.clone()),
        )
        .unwrap();

    assert_eq!(fs::read_to_string(&local).unwrap(), "kept across dry runs");
}

#[test]
fn test_script_from_file_runs_and_is_deleted_once() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("CLEANUP.COM");
    fs::write(&script, "$ PURGE SYS$LOGIN:\n").unwrap();

    let exec = executor();
    exec.session().reply("%DCL-E-FAIL", 2);

    let result = ScriptRunner::new(&exec)
        .run_script(script.clone(), None)
        .unwrap();
    assert!(result.failed());

    let commands = exec.session().commands();
    assert!(commands[0].contains("@TCPIP$SSH_HOME:CLEANUP.COM"));
    assert_eq!(
        deletes(&exec),
        vec!["PIPE DELETE /NOLOG TCPIP$SSH_HOME:CLEANUP.COM;*; WRITE SYS$OUTPUT $SEVERITY"]
    );
}

#[test]
fn test_script_deleted_when_run_loses_connection() {
    let exec = executor();
    exec.session().drop_connection("channel closed");

    let outcome =
        ScriptRunner::new(&exec).run_script(b"$ SHOW TIME\n".to_vec(), Some("MCR SYSMAN"));
    assert!(matches!(outcome, Err(Error::Connection(_))));
    assert_eq!(deletes(&exec).len(), 1);
}

#[test]
fn test_clusterwide_run_visits_every_member() {
    let exec = executor();
    exec.session().reply_ok(
        "| NODE1  | VMS V8.4  |   MEMBER   |\n\
         | NODE2  | VMS V8.4  |   MEMBER   |",
    );

    Cluster::new(&exec)
        .run_clusterwide(vec!["SHOW TIME", "SHOW SYSTEM /NOPROCESS"], false)
        .unwrap();

    let upload = &exec.session().uploads()[0];
    let TransferSource::Buffer(script) = &upload.source else {
        panic!("expected an in-memory script");
    };
    assert_eq!(
        String::from_utf8_lossy(script),
        "SET ENVIRONMENT /NODE=(NODE1)\n\
         DO SHOW TIME\n\
         DO SHOW SYSTEM /NOPROCESS\n\
         SET ENVIRONMENT /NODE=(NODE2)\n\
         DO SHOW TIME\n\
         DO SHOW SYSTEM /NOPROCESS\n\
         EXIT\n"
    );
    assert!(exec.session().commands()[1].contains("MCR SYSMAN @"));
    assert_eq!(deletes(&exec).len(), 1);
}

#[test]
fn test_queue_job_resubmit() {
    let exec = executor();
    exec.session()
        .reply_ok("   4821  NIGHTLY_BACKUP  SYSTEM   Holding until 02:00")
        .reply_ok(
            "   4821  NIGHTLY_BACKUP  SYSTEM   Holding\n\
             Submitted 19-OCT-2026 10:00:00.00 /KEEP /NOPRINTER\n\
             File: _DKA100:[SYSMGR]NIGHTLY_BACKUP.COM;1",
        );

    let job = QueueJob::load(&exec, "nightly_backup").unwrap();
    assert_eq!(job.to_string(), "Job name NIGHTLY_BACKUP, entry number(s) 4821");

    let results = job.resubmit(&exec, Some("4821")).unwrap();
    assert!(results[0].succeeded());
    assert!(exec.session().commands()[2]
        .contains("SUBMIT DKA100:[SYSMGR]NIGHTLY_BACKUP.COM;1 /KEEP/NOPRINTER"));

    assert!(matches!(
        job.stop(&exec, Some("9999")),
        Err(Error::UnknownEntry(_))
    ));
}

#[test]
fn test_remote_path_translation() {
    let path = RemotePath::parse("DKA0:[DIR1.DIR2]FILE.TXT;1");
    assert_eq!(path.posix_directory(), "/DKA0/DIR1.DIR2");
    assert_eq!(path.file_name, "FILE.TXT;1");
    assert_eq!(path.to_vms(), "DKA0:[DIR1.DIR2]FILE.TXT;1");

    let bare = RemotePath::parse("LOGIN.COM");
    assert_eq!(bare.posix_directory(), "");
    assert_eq!(bare.file_name, "LOGIN.COM");
}

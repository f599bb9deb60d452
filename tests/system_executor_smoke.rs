#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::tempdir;
use toolstash_check::engine::{CommandSpec, Executor, Step, SystemExecutor};
use toolstash_check::{AmbientEnv, CheckError, Options, run};

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(["-c", "user.name=toolstash", "-c", "user.email=toolstash@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(out.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&out.stderr));
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

#[test]
fn run_reports_child_exit_code() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("fail.sh");
    write_script(&script, "#!/bin/sh\nexit 3\n");

    let err = SystemExecutor::new()
        .run(&CommandSpec::new(Step::BuildBaseline, &script))
        .unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert!(matches!(err, CheckError::StepFailed { step: Step::BuildBaseline, .. }));
}

#[test]
fn run_passes_dir_and_env() {
    let dir = tempdir().unwrap();
    let work = dir.path().join("work");
    fs::create_dir(&work).unwrap();
    let script = dir.path().join("record.sh");
    write_script(&script, "#!/bin/sh\necho \"$GOROOT\" > where.txt\n");

    let cmd = CommandSpec {
        step: Step::SaveSnapshot,
        program: script.into_os_string(),
        args: Vec::new(),
        dir: Some(work.clone()),
        env: vec![("GOROOT".into(), "/fake/goroot".into())],
    };
    SystemExecutor::new().run(&cmd).unwrap();
    assert_eq!(fs::read_to_string(work.join("where.txt")).unwrap().trim(), "/fake/goroot");
}

#[test]
fn output_trims_stdout_and_reports_stderr() {
    let dir = tempdir().unwrap();
    let ok = dir.path().join("ok.sh");
    write_script(&ok, "#!/bin/sh\necho '  abc1234  '\n");
    let out = SystemExecutor::new()
        .output(&CommandSpec::new(Step::ResolveRevision, &ok))
        .unwrap();
    assert_eq!(out, "abc1234");

    let bad = dir.path().join("bad.sh");
    write_script(&bad, "#!/bin/sh\necho 'fatal: bad revision' >&2\nexit 128\n");
    let err = SystemExecutor::new()
        .output(&CommandSpec::new(Step::ResolveRevision, &bad))
        .unwrap_err();
    assert_eq!(err.exit_code(), 128);
    assert!(err.to_string().contains("fatal: bad revision"));
}

#[test]
fn missing_program_is_a_spawn_error() {
    let err = SystemExecutor::new()
        .run(&CommandSpec::new(Step::Compare, "/nonexistent/toolstash-check-go"))
        .unwrap_err();
    assert!(matches!(err, CheckError::Spawn { .. }));
    assert_eq!(err.exit_code(), 1);
}

/// A throwaway repository whose make.bash installs a fake `go` into `bin/`,
/// plus a fake `toolstash` on the search path. Both append to `log`.
struct FakeGoRepo {
    _dir: tempfile::TempDir,
    repo: PathBuf,
    bin: PathBuf,
    log: PathBuf,
}

impl FakeGoRepo {
    fn new(make_bash_exit: i32) -> Self {
        let dir = tempdir().unwrap();
        let repo = dir.path().join("go");
        let bin = dir.path().join("bin");
        let log = dir.path().join("log.txt");
        fs::create_dir_all(repo.join("src")).unwrap();
        fs::create_dir_all(&bin).unwrap();

        let make_bash = format!(
            r#"#!/bin/sh
set -e
echo "make.bash $(cat ../VERSION)" >> '{log}'
mkdir -p ../bin
cat > ../bin/go <<'EOF'
#!/bin/sh
echo "go $*" >> '{log}'
EOF
chmod +x ../bin/go
exit {make_bash_exit}
"#,
            log = log.display()
        );
        write_script(&repo.join("src/make.bash"), &make_bash);
        write_script(
            &bin.join("toolstash"),
            &format!("#!/bin/sh\necho \"toolstash $* GOROOT=$GOROOT\" >> '{}'\n", log.display()),
        );

        git(&repo, &["init", "-q"]);
        fs::write(repo.join("src/a.go"), "package a\n").unwrap();
        git(&repo, &["add", "."]);
        git(&repo, &["commit", "-q", "-m", "base"]);
        fs::write(repo.join("src/a.go"), "package a\n\nvar X = 1\n").unwrap();
        git(&repo, &["commit", "-q", "-am", "target"]);

        FakeGoRepo { _dir: dir, repo, bin, log }
    }

    fn ambient(&self) -> AmbientEnv {
        let mut entries = vec![self.bin.clone()];
        if let Some(path) = std::env::var_os("PATH") {
            entries.extend(std::env::split_paths(&path));
        }
        AmbientEnv { goroot: None, path: Some(std::env::join_paths(entries).unwrap()) }
    }

    fn log_lines(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[test]
fn full_run_against_fake_toolchain() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let fake = FakeGoRepo::new(0);
    let head = git(&fake.repo, &["rev-parse", "--short", "HEAD"]);

    let opts = Options::default().with_repo(&fake.repo);
    let outcome = run(&opts, &fake.ambient(), &SystemExecutor::new()).unwrap();
    assert_eq!(outcome.commit, head);
    assert_eq!(outcome.summary(), format!("toolstash-check passed for {head}"));

    let lines = fake.log_lines();
    assert_eq!(lines.len(), 4, "{lines:?}");
    assert_eq!(lines[0], "make.bash devel");
    assert!(lines[1].starts_with("toolstash save GOROOT="), "{lines:?}");
    assert_eq!(lines[2], "go install std cmd");
    assert_eq!(lines[3], "go build -a -toolexec toolstash -cmp std cmd");

    // GOROOT pointed into the working directory, which is gone now.
    let goroot = PathBuf::from(lines[1].trim_start_matches("toolstash save GOROOT="));
    assert!(goroot.ends_with("go"));
    assert!(!goroot.parent().unwrap().exists());
}

#[test]
fn failing_baseline_build_stops_run() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let fake = FakeGoRepo::new(3);

    let opts = Options::default().with_repo(&fake.repo);
    let err = run(&opts, &fake.ambient(), &SystemExecutor::new()).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert_eq!(fake.log_lines(), vec!["make.bash devel"]);
}

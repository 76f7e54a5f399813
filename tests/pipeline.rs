use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use jobsh::environment::Environment;
use jobsh::executor::{DefaultExecutor, EXEC_FAILED, Executor, PipelineStatus};
use jobsh::lexer;
use jobsh::parser::{self, Parsed};

// Pipelines fork; one at a time keeps group waits and descriptors from interleaving.
static SERIAL: Mutex<()> = Mutex::new(());

struct Scratch {
    dir: PathBuf,
}

impl Scratch {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("jobsh-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        Scratch { dir }
    }

    fn path(&self, file: &str) -> String {
        self.dir.join(file).display().to_string()
    }

    fn read(&self, file: &str) -> String {
        fs::read_to_string(self.dir.join(file)).unwrap_or_default()
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

fn parse(line: &str) -> Parsed {
    parser::parse(&lexer::tokenize(&lexer::sanitize(line))).unwrap()
}

fn run(line: &str) -> PipelineStatus {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let parsed = parse(line);
    DefaultExecutor::new(false)
        .exec(&parsed.plan, &Environment::new())
        .unwrap()
}

fn exists(path: &str) -> bool {
    Path::new(path).exists()
}

#[test]
fn test_two_stage_pipeline_into_file() {
    let s = Scratch::new("two-stage");
    let out = s.path("out.txt");
    let status = run(&format!("echo hello | tr l L > {}", out));
    assert!(status.success());
    assert_eq!(status.stages.len(), 2);
    assert_eq!(s.read("out.txt"), "heLLo\n");
}

#[test]
fn test_stderr_and_stdout_redirected_apart() {
    let s = Scratch::new("fd-split");
    let (err, out) = (s.path("err.txt"), s.path("out.txt"));
    let status = run(&format!("cat /nonexistent/jobsh/file 2>{} >{}", err, out));
    assert_ne!(status.code(), 0);
    assert_ne!(status.code(), EXEC_FAILED);
    assert!(!s.read("err.txt").is_empty());
    assert!(exists(&out));
    assert!(s.read("out.txt").is_empty());
}

#[test]
fn test_malformed_token_is_dropped() {
    let s = Scratch::new("malformed");
    let out = s.path("out.txt");
    let parsed = parse(&format!("@>badtoken echo hi > {}", out));
    assert_eq!(parsed.diagnostics.len(), 1);

    let status = run(&format!("@>badtoken echo hi > {}", out));
    assert!(status.success());
    assert_eq!(s.read("out.txt"), "hi\n");
}

#[test]
fn test_input_redirect_on_first_stage() {
    let s = Scratch::new("input");
    fs::write(s.dir.join("in.txt"), "abc\ndef\n").unwrap();
    let status = run(&format!(
        "cat <{} | tr a-z A-Z > {}",
        s.path("in.txt"),
        s.path("out.txt")
    ));
    assert!(status.success());
    assert_eq!(s.read("out.txt"), "ABC\nDEF\n");
}

#[test]
fn test_append_then_truncate() {
    let s = Scratch::new("append");
    let out = s.path("out.txt");
    run(&format!("echo one > {}", out));
    run(&format!("echo two >> {}", out));
    assert_eq!(s.read("out.txt"), "one\ntwo\n");

    run(&format!("echo x > {}", out));
    assert_eq!(s.read("out.txt"), "x\n");
}

#[test]
fn test_unknown_program_reports_exec_failure() {
    let status = run("jobsh-no-such-program-here");
    assert_eq!(status.code(), EXEC_FAILED);
    assert!(status.stages[0].1.is_exec_failure());
}

#[test]
fn test_unopenable_input_fails_the_stage() {
    let status = run("cat < /nonexistent/jobsh/input");
    assert_eq!(status.code(), EXEC_FAILED);
}

#[test]
fn test_output_redirect_before_pipe_is_ignored() {
    let s = Scratch::new("mid-redirect");
    let early = s.path("early.txt");
    let late = s.path("late.txt");
    let status = run(&format!("echo hi > {} | cat > {}", early, late));
    assert!(status.success());
    assert!(!exists(&early));
    assert_eq!(s.read("late.txt"), "hi\n");
}

#[test]
fn test_status_is_last_stage() {
    assert_eq!(run("false | true").code(), 0);
    assert_ne!(run("true | false").code(), 0);
}

#[test]
fn test_long_pipeline_delivers_everything() {
    let s = Scratch::new("long");
    let status = run(&format!("seq 1 2000 | cat | cat | wc -l > {}", s.path("count.txt")));
    assert!(status.success());
    assert_eq!(status.stages.len(), 4);
    assert_eq!(s.read("count.txt").trim(), "2000");
}

#[cfg(target_os = "linux")]
#[test]
fn test_stages_share_one_process_group() {
    let s = Scratch::new("pgid");
    // The second cat prints the first one's stat from stdin, then its own.
    let status = run(&format!(
        "cat /proc/self/stat | cat - /proc/self/stat > {}",
        s.path("stat.txt")
    ));
    assert!(status.success());

    let contents = s.read("stat.txt");
    let rows: Vec<Vec<&str>> = contents
        .lines()
        .map(|line| line.split(' ').collect())
        .collect();
    assert_eq!(rows.len(), 2);
    // Fields: pid, comm, state, ppid, pgrp.
    assert_eq!(rows[0][4], rows[1][4]);
    assert_eq!(rows[0][0], rows[0][4]);
    assert_ne!(rows[0][4], std::process::id().to_string());
}

#[cfg(target_os = "linux")]
#[test]
fn test_numbered_input_on_first_stage_of_pipeline() {
    let s = Scratch::new("numbered-input");
    fs::write(s.dir.join("in.txt"), "from file\n").unwrap();
    let input = s.path("in.txt");
    let out = s.path("out.txt");

    // The pipe ends land on low descriptors; every one of them must stay usable.
    for fd in 3..=12 {
        let status = run(&format!("echo hi {}<{} | cat > {}", fd, input, out));
        assert!(status.success(), "fd {}", fd);
        assert_eq!(s.read("out.txt"), "hi\n", "fd {}", fd);

        let status = run(&format!("cat /proc/self/fd/{} {}<{} | cat > {}", fd, fd, input, out));
        assert!(status.success(), "fd {}", fd);
        assert_eq!(s.read("out.txt"), "from file\n", "fd {}", fd);
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_numbered_input_binds_only_that_descriptor() {
    let s = Scratch::new("only-n");
    fs::write(s.dir.join("a.txt"), "a\n").unwrap();
    fs::write(s.dir.join("b.txt"), "b\n").unwrap();
    let status = run(&format!(
        "cat /proc/self/fd/5 - 5<{} <{} > {}",
        s.path("a.txt"),
        s.path("b.txt"),
        s.path("out.txt")
    ));
    assert!(status.success());
    assert_eq!(s.read("out.txt"), "a\nb\n");
}

#[cfg(target_os = "linux")]
#[test]
fn test_single_stage_keeps_standard_descriptors() {
    let shell = std::process::id();
    for fd in 0..=2 {
        let status = run(&format!("test /proc/self/fd/{} -ef /proc/{}/fd/{}", fd, shell, fd));
        assert_eq!(status.code(), 0, "fd {}", fd);
    }
}

#[test]
fn test_input_directive_after_pipe_has_no_effect() {
    let s = Scratch::new("late-input");
    fs::write(s.dir.join("in.txt"), "from file\n").unwrap();
    let status = run(&format!(
        "echo piped | cat < {} > {}",
        s.path("in.txt"),
        s.path("out.txt")
    ));
    assert!(status.success());
    assert_eq!(s.read("out.txt"), "piped\n");
}

#[test]
fn test_numbered_append_leaves_stdout_alone() {
    let s = Scratch::new("append-n");
    fs::write(s.dir.join("err.txt"), "old\n").unwrap();
    fs::write(s.dir.join("in.txt"), "data\n").unwrap();
    let status = run(&format!(
        "cat /nonexistent/jobsh/file {} 2>>{} > {}",
        s.path("in.txt"),
        s.path("err.txt"),
        s.path("out.txt")
    ));
    assert_ne!(status.code(), 0);
    assert_eq!(s.read("out.txt"), "data\n");
    let err = s.read("err.txt");
    assert!(err.starts_with("old\n"));
    assert!(err.len() > "old\n".len());
    assert!(!err.contains("data"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_numbered_append_does_not_touch_fd_one() {
    let s = Scratch::new("append-fd1");
    fs::write(s.dir.join("err.txt"), "old\n").unwrap();
    let shell = std::process::id();
    let status = run(&format!(
        "test /proc/self/fd/1 -ef /proc/{}/fd/1 2>>{}",
        shell,
        s.path("err.txt")
    ));
    assert_eq!(status.code(), 0);
    assert_eq!(s.read("err.txt"), "old\n");
}

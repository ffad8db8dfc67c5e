// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Filesystem commands and working-directory behaviour end to end.
// Author: Lukas Bower

use std::env;
use std::fs;
use std::io::Cursor;
use std::time::Duration;

use opsh::engine::{execute, CancelToken, Outcome};
use opsh::{parse_line, Console, EngineConfig};
use serial_test::serial;
use tempfile::tempdir;

fn run(line: &str) -> Outcome {
    execute(parse_line(1, line).unwrap(), &CancelToken::new()).outcome
}

fn output(line: &str) -> String {
    match run(line) {
        Outcome::Output(text) => text,
        other => panic!("{line:?} produced {other:?}"),
    }
}

#[test]
#[serial]
fn cd_and_relative_paths() {
    let original = env::current_dir().unwrap();
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("work")).unwrap();
    let root = dir.path().canonicalize().unwrap();

    let text = output(&format!("cd {}", root.display()));
    assert_eq!(text, format!("Changed directory to: {}", root.display()));
    output("chdir work");
    assert_eq!(
        output("pwd"),
        format!("Current directory: {}", root.join("work").display())
    );
    output("create notes/today.txt buy milk and eggs");
    assert_eq!(output("read notes/today.txt"), "buy milk and eggs");
    output("cd ..");
    assert_eq!(env::current_dir().unwrap(), root);

    match run("cd work/notes/today.txt") {
        Outcome::Refused(text) => assert!(text.ends_with("is not a directory"), "{text}"),
        other => panic!("unexpected {other:?}"),
    }
    match run("cd missing-dir") {
        Outcome::Failed(text) => assert!(text.contains("does not exist"), "{text}"),
        other => panic!("unexpected {other:?}"),
    }
    env::set_current_dir(original).unwrap();
}

#[test]
#[serial]
fn find_with_named_parameters() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.py"), "").unwrap();
    fs::create_dir(dir.path().join("pkg")).unwrap();
    fs::write(dir.path().join("pkg/b.py"), "").unwrap();
    let root = dir.path().display().to_string();

    let flat = output(&format!("find {root} *.py"));
    assert_eq!(flat.lines().count(), 1);
    let deep = output(&format!("search *.py {root} recursive=true"));
    assert_eq!(deep.lines().count(), 2);
    assert_eq!(
        output(&format!("find dir={root} pattern=*.md")),
        "No files matching '*.md' found"
    );
}

#[test]
#[serial]
fn audit_logs_stay_put_after_cd() {
    let original = env::current_dir().unwrap();
    let dir = tempdir().unwrap();
    let elsewhere = tempdir().unwrap();
    env::set_current_dir(dir.path()).unwrap();

    let config = EngineConfig {
        log_dir: "log".into(),
        ..EngineConfig::default()
    };
    let console = Console::new(config, Vec::new()).unwrap();
    let script = format!("cd {}\npwd\n", elsewhere.path().display());
    console.run_script(Cursor::new(script)).unwrap();
    assert!(console.scheduler().wait_idle(Duration::from_secs(5)).unwrap());

    let logs: Vec<_> = fs::read_dir(dir.path().join("log"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(!logs.is_empty());
    assert!(logs.iter().all(|name| name.starts_with("query_output")));
    assert!(!elsewhere.path().join("log").exists());
    env::set_current_dir(original).unwrap();
}

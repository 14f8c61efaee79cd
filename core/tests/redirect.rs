// core/tests/redirect.rs
//
// Redirection of the real stdout/stderr descriptors. Kept in its own test
// binary with a single test: installing is once per process and swaps fds 1
// and 2 for everything else running in it.

#![cfg(unix)]

use imebridge_core::{OutputRedirector, RedirectError};
use parking_lot::Mutex;
use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn wait_for_lines(lines: &Mutex<Vec<String>>, wanted: &[&str]) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        {
            let lines = lines.lock();
            if wanted.iter().all(|w| lines.iter().any(|l| l == w)) {
                return true;
            }
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_install_forwards_both_streams_once_per_process() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let lines = lines.clone();
        move |line: &str| lines.lock().push(line.to_string())
    };
    let redirector = OutputRedirector::install(sink).unwrap();
    assert!(redirector.is_forwarding());

    // Write through the handles; `println!` is captured by the test harness.
    let mut stdout = std::io::stdout();
    writeln!(stdout, "hello from stdout").unwrap();
    stdout.flush().unwrap();
    let mut stderr = std::io::stderr();
    writeln!(stderr, "\nhello from stderr  ").unwrap();

    let both = wait_for_lines(&lines, &["hello from stdout", "hello from stderr"]);

    let second = OutputRedirector::install(|_: &str| {});
    let already_installed = matches!(second, Err(RedirectError::AlreadyInstalled));

    // Put the terminal back before asserting so failures stay visible.
    let saved = redirector.into_saved();
    // SAFETY: the saved descriptors stay open while `saved` is alive.
    unsafe {
        libc::dup2(saved.stdout.as_raw_fd(), libc::STDOUT_FILENO);
        libc::dup2(saved.stderr.as_raw_fd(), libc::STDERR_FILENO);
    }

    assert!(both, "captured: {:?}", lines.lock());
    assert!(already_installed);
    assert!(lines.lock().iter().all(|l| !l.is_empty()));
}

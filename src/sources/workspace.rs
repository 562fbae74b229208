use crate::modules::logging::log_debug;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// How long a terminated query gets to exit before its group is killed.
const TERM_GRACE: Duration = Duration::from_secs(1);

/// Raw result of running the workspace command once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Trimmed, non-empty stdout of a successful run.
    Name(String),
    Empty,
    Failed(String),
}

impl QueryOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, QueryOutcome::Name(_))
    }
}

/// Label text for an outcome: the prefixed name, or the placeholder for
/// anything else.
pub fn workspace_label(outcome: &QueryOutcome, prefix: &str, placeholder: &str) -> String {
    match outcome {
        QueryOutcome::Name(name) => format!("{}{}", prefix, name),
        QueryOutcome::Empty | QueryOutcome::Failed(_) => placeholder.to_string(),
    }
}

/// Starts the command with stdout captured and stderr discarded. The child
/// leads its own process group so [`terminate_query`] reaches everything it
/// forks, and is killed if it is dropped before completion.
pub fn spawn_query(argv: &[String]) -> std::io::Result<Child> {
    let Some((program, args)) = argv.split_first() else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty workspace command",
        ));
    };

    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .process_group(0)
        .kill_on_drop(true)
        .spawn()
}

/// Waits for a spawned query and classifies its output. Dropping the
/// future before it resolves leaves the child unreaped.
pub async fn collect_query(child: &mut Child) -> QueryOutcome {
    let mut stdout = Vec::new();
    let mut pipe = child.stdout.take();
    let read = async {
        match pipe.as_mut() {
            Some(pipe) => pipe.read_to_end(&mut stdout).await.map(drop),
            None => Ok(()),
        }
    };
    let (status, read) = tokio::join!(child.wait(), read);

    let status = match status {
        Ok(status) => status,
        Err(e) => return QueryOutcome::Failed(e.to_string()),
    };
    if let Err(e) = read {
        return QueryOutcome::Failed(e.to_string());
    }
    if !status.success() {
        return QueryOutcome::Failed(format!("exited with {}", status));
    }

    match String::from_utf8(stdout) {
        Ok(stdout) => {
            let name = stdout.trim();
            if name.is_empty() {
                QueryOutcome::Empty
            } else {
                QueryOutcome::Name(name.to_string())
            }
        }
        Err(_) => QueryOutcome::Failed("non-UTF-8 output".to_string()),
    }
}

/// Sends SIGTERM to the query's process group, then SIGKILL if the leader
/// has not exited within [`TERM_GRACE`]. Does nothing once the child has
/// been reaped, since its pid may belong to someone else by then.
pub async fn terminate_query(child: &mut Child) {
    let Some(pid) = child.id() else {
        return;
    };
    let group = Pid::from_raw(pid as i32);

    if let Err(e) = signal::killpg(group, Signal::SIGTERM) {
        log_debug("POLL", &format!("SIGTERM to group {} failed: {}", pid, e));
    }
    if tokio::time::timeout(TERM_GRACE, child.wait()).await.is_err() {
        log_debug("POLL", &format!("Group {} ignored SIGTERM, killing", pid));
        let _ = signal::killpg(group, Signal::SIGKILL);
        let _ = child.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::{forking_script, process_alive, read_pid, wait_for_exit};

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    async fn run(parts: &[&str]) -> QueryOutcome {
        match spawn_query(&argv(parts)) {
            Ok(mut child) => collect_query(&mut child).await,
            Err(e) => QueryOutcome::Failed(e.to_string()),
        }
    }

    #[test]
    fn test_label_with_prefix() {
        let outcome = QueryOutcome::Name("1".to_string());
        assert_eq!(workspace_label(&outcome, "WS: ", "-"), "WS: 1");
        assert_eq!(workspace_label(&QueryOutcome::Empty, "WS: ", "-"), "-");
        assert_eq!(
            workspace_label(&QueryOutcome::Failed("x".into()), "WS: ", ""),
            ""
        );
    }

    #[tokio::test]
    async fn test_trims_stdout() {
        let outcome = run(&["sh", "-c", "printf '  3 \\n'"]).await;
        assert_eq!(outcome, QueryOutcome::Name("3".to_string()));
    }

    #[tokio::test]
    async fn test_stderr_ignored_and_empty_stdout() {
        let outcome = run(&["sh", "-c", "echo oops >&2"]).await;
        assert_eq!(outcome, QueryOutcome::Empty);
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let outcome = run(&["sh", "-c", "echo 2; exit 3"]).await;
        assert!(matches!(outcome, QueryOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let outcome = run(&["/nonexistent/ybar-workspace-tool"]).await;
        assert!(matches!(outcome, QueryOutcome::Failed(_)));
        assert!(matches!(run(&[]).await, QueryOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_terminate_reaches_forked_children() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("sleep.pid");
        let mut child = spawn_query(&forking_script(&pid_file)).unwrap();
        let sleeper = read_pid(&pid_file).await;
        assert!(process_alive(sleeper));

        terminate_query(&mut child).await;
        assert!(child.id().is_none());
        assert!(wait_for_exit(sleeper).await, "sleep {} outlived its shell", sleeper);
    }

    #[tokio::test]
    async fn test_terminate_after_reap_is_noop() {
        let mut child = spawn_query(&argv(&["true"])).unwrap();
        assert_eq!(collect_query(&mut child).await, QueryOutcome::Empty);
        terminate_query(&mut child).await;
        assert!(child.id().is_none());
    }
}

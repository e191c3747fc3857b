//! Pre-push checks: lint, type-check, test and a non-blocking security audit.
//!
//! Every stage runs even after an earlier one fails so the summary covers the whole tree.
//! Inside a stage, commands stop at the first failure.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum PrepushError {
    #[error("`{program}` is not installed or not on PATH")]
    ToolMissing { program: String },

    #[error("failed to run `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Lint,
    TypeCheck,
    Test,
    SecurityAudit,
}

impl StageKind {
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::Lint => "lint",
            StageKind::TypeCheck => "type-check",
            StageKind::Test => "test",
            StageKind::SecurityAudit => "security-audit",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Stage {
    pub kind: StageKind,
    pub commands: Vec<CommandSpec>,
    /// A failing non-blocking stage is reported but never changes the exit code.
    pub blocking: bool,
}

pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage {
            kind: StageKind::Lint,
            commands: vec![
                CommandSpec::new("cargo", &["fmt", "--all", "--", "--check"]),
                CommandSpec::new("cargo", &["clippy", "--all-targets", "--", "-D", "warnings"]),
            ],
            blocking: true,
        },
        Stage {
            kind: StageKind::TypeCheck,
            commands: vec![CommandSpec::new("cargo", &["check", "--all-targets"])],
            blocking: true,
        },
        Stage {
            kind: StageKind::Test,
            commands: vec![CommandSpec::new("cargo", &["test"])],
            blocking: true,
        },
        Stage {
            kind: StageKind::SecurityAudit,
            commands: vec![CommandSpec::new("cargo", &["audit"])],
            blocking: false,
        },
    ]
}

/// Seam over process spawning. Returns whether the command exited successfully.
pub trait CommandRunner {
    fn run(&self, command: &CommandSpec) -> Result<bool, PrepushError>;
}

/// Runs commands for real, streaming their output to the terminal.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner {
    pub workdir: Option<PathBuf>,
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandSpec) -> Result<bool, PrepushError> {
        let mut process = Command::new(&command.program);
        process.args(&command.args);
        if let Some(dir) = &self.workdir {
            process.current_dir(dir);
        }
        match process.status() {
            Ok(status) => Ok(status.success()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(PrepushError::ToolMissing {
                program: command.program.clone(),
            }),
            Err(source) => Err(PrepushError::Io {
                program: command.program.clone(),
                source,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub kind: StageKind,
    pub passed: bool,
    pub blocking: bool,
    /// The failing command, or why it could not run.
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub results: Vec<StageResult>,
}

impl Summary {
    pub fn blocking_failures(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.blocking && !r.passed)
            .count()
    }

    pub fn exit_code(&self) -> i32 {
        if self.blocking_failures() == 0 {
            0
        } else {
            1
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("Pre-push summary\n");
        for r in &self.results {
            let status = match (r.passed, r.blocking) {
                (true, _) => "PASS",
                (false, true) => "FAIL",
                (false, false) => "WARN",
            };
            out.push_str(&format!("  [{}] {}", status, r.kind));
            if let Some(detail) = &r.detail {
                out.push_str(&format!(" ({})", detail));
            }
            out.push('\n');
        }
        if self.exit_code() == 0 {
            out.push_str("All blocking checks passed.\n");
        } else {
            out.push_str(&format!(
                "{} blocking check(s) failed; push aborted.\n",
                self.blocking_failures()
            ));
        }
        out
    }
}

fn run_stage(runner: &dyn CommandRunner, stage: &Stage) -> StageResult {
    for command in &stage.commands {
        info!(stage = %stage.kind, command = %command, "running");
        let failure = match runner.run(command) {
            Ok(true) => None,
            Ok(false) => Some(format!("`{}` failed", command)),
            Err(e) => Some(e.to_string()),
        };
        if let Some(detail) = failure {
            if stage.blocking {
                warn!(stage = %stage.kind, %detail, "stage failed");
            } else {
                warn!(stage = %stage.kind, %detail, "non-blocking stage failed; continuing");
            }
            return StageResult {
                kind: stage.kind,
                passed: false,
                blocking: stage.blocking,
                detail: Some(detail),
            };
        }
    }
    StageResult {
        kind: stage.kind,
        passed: true,
        blocking: stage.blocking,
        detail: None,
    }
}

pub fn run_stages(runner: &dyn CommandRunner, stages: &[Stage]) -> Summary {
    Summary {
        results: stages.iter().map(|s| run_stage(runner, s)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Fails any command whose rendered form contains one of `failing`.
    struct ScriptedRunner {
        failing: Vec<&'static str>,
        missing: Vec<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedRunner {
        fn new(failing: Vec<&'static str>, missing: Vec<&'static str>) -> Self {
            Self {
                failing,
                missing,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, command: &CommandSpec) -> Result<bool, PrepushError> {
            let rendered = command.to_string();
            self.calls.borrow_mut().push(rendered.clone());
            if self.missing.iter().any(|m| rendered.contains(m)) {
                return Err(PrepushError::ToolMissing {
                    program: rendered,
                });
            }
            Ok(!self.failing.iter().any(|f| rendered.contains(f)))
        }
    }

    #[test]
    fn all_green_exits_zero() {
        let runner = ScriptedRunner::new(vec![], vec![]);
        let summary = run_stages(&runner, &default_stages());
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(runner.calls.borrow().len(), 5);
        assert!(summary.render().contains("All blocking checks passed"));
    }

    #[test]
    fn failing_blocking_stage_exits_one_but_later_stages_still_run() {
        let runner = ScriptedRunner::new(vec!["fmt"], vec![]);
        let summary = run_stages(&runner, &default_stages());
        assert_eq!(summary.exit_code(), 1);
        let calls = runner.calls.borrow();
        assert!(!calls.iter().any(|c| c.contains("clippy")));
        assert!(calls.iter().any(|c| c.contains("check --all-targets")));
        assert!(calls.iter().any(|c| c == "cargo test"));
        assert!(calls.iter().any(|c| c == "cargo audit"));
    }

    #[test]
    fn audit_failure_never_blocks() {
        let runner = ScriptedRunner::new(vec![], vec!["audit"]);
        let summary = run_stages(&runner, &default_stages());
        assert_eq!(summary.exit_code(), 0);
        let audit = summary
            .results
            .iter()
            .find(|r| r.kind == StageKind::SecurityAudit)
            .unwrap();
        assert!(!audit.passed);
        assert!(summary.render().contains("[WARN] security-audit"));
    }

    #[test]
    fn missing_tool_fails_its_stage() {
        let runner = ScriptedRunner::new(vec![], vec!["cargo test"]);
        let summary = run_stages(&runner, &default_stages());
        assert_eq!(summary.exit_code(), 1);
        assert_eq!(summary.blocking_failures(), 1);
        let test = &summary.results[2];
        assert_eq!(test.kind, StageKind::Test);
        assert!(test.detail.as_deref().unwrap().contains("not installed"));
    }
}

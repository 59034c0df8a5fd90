//! External command execution.
//!
//! Every build step runs through [`ExternalCommand`]: a program, its
//! arguments, a working directory, and an explicit environment map. The
//! child starts from a cleared environment (`PATH` and `HOME` pass
//! through so toolchains and git keep working), so nothing the pipeline
//! does can leak state between invocations and nothing from the host
//! leaks in. Process-global environment is never mutated.
//!
//! A non-zero exit is a typed [`CommandError`], fatal at the call site.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` failed in {}: {status}", dir.display())]
    Failed {
        program: String,
        dir: PathBuf,
        status: ExitStatus,
    },

    #[error("Missing required tools: {}", .0.join(", "))]
    MissingTools(Vec<String>),
}

/// One external invocation: program, args, cwd, environment.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
    dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl ExternalCommand {
    /// Start building an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: None,
            env: BTreeMap::new(),
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Merge an environment map into the invocation.
    pub fn envs(mut self, vars: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Run the command, streaming its output to the terminal.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Spawn`] if the program cannot be started
    /// and [`CommandError::Failed`] on a non-zero exit status.
    pub fn run(&self) -> Result<(), CommandError> {
        let dir = self.dir.clone().unwrap_or_else(|| PathBuf::from("."));

        tracing::debug!(
            program = %self.program,
            args = ?self.args,
            dir = %dir.display(),
            "running external command"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&dir);

        // Blank slate; PATH and HOME pass through, the map supplies the rest.
        cmd.env_clear();
        for key in ["PATH", "HOME"] {
            if let Some(value) = std::env::var_os(key) {
                cmd.env(key, value);
            }
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let status = cmd.status().map_err(|source| CommandError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !status.success() {
            return Err(CommandError::Failed {
                program: self.program.clone(),
                dir,
                status,
            });
        }
        Ok(())
    }
}

/// Check that every named tool resolves on `PATH`, reporting all the
/// missing ones at once.
///
/// # Errors
///
/// Returns [`CommandError::MissingTools`] naming each absent tool.
pub fn require_tools(tools: &[&str]) -> Result<(), CommandError> {
    let missing: Vec<String> = tools
        .iter()
        .filter(|tool| which::which(tool).is_err())
        .map(|tool| (*tool).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CommandError::MissingTools(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_exit_is_ok() {
        ExternalCommand::new("sh")
            .args(["-c", "exit 0"])
            .run()
            .unwrap();
    }

    #[test]
    fn nonzero_exit_is_typed() {
        let err = ExternalCommand::new("sh")
            .args(["-c", "exit 3"])
            .run()
            .unwrap_err();
        match err {
            CommandError::Failed { program, status, .. } => {
                assert_eq!(program, "sh");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn unknown_program_is_spawn_error() {
        let err = ExternalCommand::new("definitely-not-a-real-tool-7f3a")
            .run()
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[test]
    fn env_map_reaches_the_child() {
        let mut env = BTreeMap::new();
        env.insert("TRB_TEST_MARKER".to_string(), "yes".to_string());
        ExternalCommand::new("sh")
            .args(["-c", "test \"$TRB_TEST_MARKER\" = yes"])
            .envs(&env)
            .run()
            .unwrap();
    }

    #[test]
    fn cleared_env_does_not_leak_host_vars() {
        // cargo sets CARGO_MANIFEST_DIR for the test process; the child
        // must not see it.
        assert!(std::env::var("CARGO_MANIFEST_DIR").is_ok());
        ExternalCommand::new("sh")
            .args(["-c", "test -z \"$CARGO_MANIFEST_DIR\""])
            .run()
            .unwrap();
    }

    #[test]
    fn require_tools_reports_all_missing() {
        assert!(require_tools(&["sh"]).is_ok());
        let err = require_tools(&["sh", "no-such-tool-a", "no-such-tool-b"]).unwrap_err();
        match err {
            CommandError::MissingTools(names) => {
                assert_eq!(names, ["no-such-tool-a", "no-such-tool-b"]);
            }
            other => panic!("expected MissingTools, got {other:?}"),
        }
    }
}

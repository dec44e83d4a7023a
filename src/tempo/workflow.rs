use std::process::Command;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("failed to run `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program} {action}` failed: {stderr}")]
    Failed {
        program: String,
        action: &'static str,
        stderr: String,
    },
    #[error("workflow command is empty")]
    EmptyCommand,
}

/// Issue transitions needed to log time against a closed issue.
pub trait IssueWorkflow {
    fn resolution(&mut self, issue_key: &str) -> Result<String, WorkflowError>;
    fn reopen(&mut self, issue_key: &str) -> Result<(), WorkflowError>;
    fn close(&mut self, issue_key: &str, resolution: &str) -> Result<(), WorkflowError>;
}

/// Delegates transitions to an external program:
/// `<program> [args] resolution|reopen|close KEY [RESOLUTION]`.
#[derive(Debug, Clone)]
pub struct CommandWorkflow {
    program: String,
    args: Vec<String>,
}

impl CommandWorkflow {
    pub fn from_command_line(command: &str) -> Result<Self, WorkflowError> {
        let mut parts = command.split_whitespace().map(ToOwned::to_owned);
        let program = parts.next().ok_or(WorkflowError::EmptyCommand)?;

        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    fn run(&self, action: &'static str, operands: &[&str]) -> Result<String, WorkflowError> {
        debug!(program = %self.program, action, ?operands, "running issue workflow");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(action)
            .args(operands)
            .output()
            .map_err(|source| WorkflowError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(WorkflowError::Failed {
                program: self.program.clone(),
                action,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl IssueWorkflow for CommandWorkflow {
    fn resolution(&mut self, issue_key: &str) -> Result<String, WorkflowError> {
        self.run("resolution", &[issue_key])
    }

    fn reopen(&mut self, issue_key: &str) -> Result<(), WorkflowError> {
        self.run("reopen", &[issue_key]).map(|_| ())
    }

    fn close(&mut self, issue_key: &str, resolution: &str) -> Result<(), WorkflowError> {
        self.run("close", &[issue_key, resolution]).map(|_| ())
    }
}

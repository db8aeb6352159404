//! External script invocation.
//!
//! [`ScriptCommand`] describes how to launch a task's child process: the
//! script itself (or an interpreter followed by the script) and its
//! arguments. Both output streams are always piped for the supervisor;
//! stdin is closed, and the child is killed if its handle is dropped.
//!
//! ```rust
//! use taskdeck::execution::ScriptCommand;
//!
//! // Directly executable script
//! let cmd = ScriptCommand::builder("/opt/scripts/backup.sh")
//!     .args(["--full", "--verbose"])
//!     .build();
//! assert_eq!(cmd.program(), "/opt/scripts/backup.sh");
//!
//! // Script run through an interpreter
//! let cmd = ScriptCommand::builder("/opt/scripts/report.py")
//!     .interpreter("python3")
//!     .arg("--week")
//!     .build();
//! assert_eq!(cmd.program(), "python3");
//! assert_eq!(cmd.argv(), vec!["/opt/scripts/report.py", "--week"]);
//! ```

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};

use crate::core::task::Task;

/// A script invocation ready to be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCommand {
    /// Script to execute
    script: PathBuf,
    /// Program that runs the script, if any
    interpreter: Option<String>,
    /// Script arguments
    args: Vec<String>,
}

impl ScriptCommand {
    /// Create a new builder for a script command.
    pub fn builder(script: impl Into<PathBuf>) -> ScriptCommandBuilder {
        ScriptCommandBuilder::new(script)
    }

    /// Build the invocation recorded on a task.
    pub fn for_task(task: &Task) -> Self {
        let mut builder = Self::builder(&task.script_path).args(task.args.iter().cloned());
        if let Some(interpreter) = &task.interpreter {
            builder = builder.interpreter(interpreter.clone());
        }
        builder.build()
    }

    /// The program handed to the OS: the interpreter if set, else the script.
    pub fn program(&self) -> String {
        match &self.interpreter {
            Some(interpreter) => interpreter.clone(),
            None => self.script.to_string_lossy().into_owned(),
        }
    }

    /// Arguments handed to the OS after the program.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        if self.interpreter.is_some() {
            argv.push(self.script.to_string_lossy().into_owned());
        }
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Get the script path.
    pub fn script(&self) -> &PathBuf {
        &self.script
    }

    /// Get the script arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Launch the child process with both output streams piped.
    ///
    /// Dropping the returned [`Child`] kills the process.
    pub fn spawn(&self) -> std::io::Result<Child> {
        let mut cmd = Command::new(self.program());
        cmd.args(self.argv());
        cmd.kill_on_drop(true);

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        cmd.spawn()
    }
}

impl fmt::Display for ScriptCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program())?;
        for arg in self.argv() {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Builder for creating `ScriptCommand` instances.
#[derive(Debug, Clone)]
pub struct ScriptCommandBuilder {
    script: PathBuf,
    interpreter: Option<String>,
    args: Vec<String>,
}

impl ScriptCommandBuilder {
    /// Create a new builder for the given script.
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            interpreter: None,
            args: Vec::new(),
        }
    }

    /// Run the script through an interpreter.
    pub fn interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build the `ScriptCommand`.
    pub fn build(self) -> ScriptCommand {
        ScriptCommand {
            script: self.script,
            interpreter: self.interpreter,
            args: self.args,
        }
    }
}

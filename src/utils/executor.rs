//! Command execution abstraction for testability
//!
//! This module provides a trait-based abstraction for command execution,
//! enabling dependency injection and mocking for tests.

use super::command::{ProcessResult, ShellCommand};
use crate::errors::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Abstraction for command execution, enabling mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Run a shell command line and capture its output. Only spawn failures
    /// and timeouts are errors here; exit status is reported in the result.
    fn execute(&self, command: &ShellCommand, timeout: Option<Duration>) -> Result<ProcessResult>;

    /// Resolve a program name to an executable path
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealExecutor {
    fn execute(&self, command: &ShellCommand, timeout: Option<Duration>) -> Result<ProcessResult> {
        super::command::spawn_shell(command, timeout)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use crate::errors::BackupError;
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub line: String,
        pub masked: String,
        pub envs: Vec<(String, String)>,
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { output: String },
        Failure { output: String, exit_code: i32 },
        Timeout,
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                output: String::new(),
            }
        }
    }

    type LineHook = Arc<dyn Fn(&str) + Send + Sync>;

    #[derive(Clone, Debug)]
    struct FileEffect {
        needle: String,
        path: PathBuf,
        contents: Vec<u8>,
    }

    /// Mock executor for testing.
    ///
    /// Responses and file effects are matched by substring of the command line;
    /// the first registered match wins.
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Pre-configured responses: command substring -> response
        responses: Arc<Mutex<Vec<(String, MockResponse)>>>,
        /// Files written when a matching command runs
        effects: Arc<Mutex<Vec<FileEffect>>>,
        /// Callbacks run with the command line when a matching command succeeds
        hooks: Arc<Mutex<Vec<(String, LineHook)>>>,
        /// Programs that `locate` reports as absent
        missing_binaries: Arc<Mutex<HashSet<String>>>,
        /// Default response when no specific response is configured
        default_response: Arc<Mutex<MockResponse>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure a response for commands containing `needle`
        pub fn expect(self, needle: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push((needle.to_string(), response));
            self
        }

        /// Set the default response for unconfigured commands
        pub fn with_default_response(self, response: MockResponse) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        /// Write `contents` to `path` whenever a command containing `needle` succeeds
        pub fn creates_file(&self, needle: &str, path: &Path, contents: &[u8]) {
            self.effects.lock().unwrap().push(FileEffect {
                needle: needle.to_string(),
                path: path.to_path_buf(),
                contents: contents.to_vec(),
            });
        }

        /// Run `hook` with the command line whenever a command containing `needle`
        /// succeeds; for outputs whose path is only known at run time
        pub fn on_success<F>(&self, needle: &str, hook: F)
        where
            F: Fn(&str) + Send + Sync + 'static,
        {
            self.hooks
                .lock()
                .unwrap()
                .push((needle.to_string(), Arc::new(hook)));
        }

        /// Make `locate` fail for a program
        pub fn without_binary(self, program: &str) -> Self {
            self.missing_binaries
                .lock()
                .unwrap()
                .insert(program.to_string());
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Recorded command lines, in call order
        pub fn lines(&self) -> Vec<String> {
            self.get_calls().into_iter().map(|c| c.line).collect()
        }

        /// Check if a command containing `needle` was run
        pub fn was_called(&self, needle: &str) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .any(|c| c.line.contains(needle))
        }

        /// Number of commands containing `needle`
        pub fn call_count(&self, needle: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.line.contains(needle))
                .count()
        }

        fn record_call(&self, command: &ShellCommand) {
            self.calls.lock().unwrap().push(CommandCall {
                line: command.line().to_string(),
                masked: command.masked(),
                envs: command.envs().to_vec(),
            });
        }

        fn get_response(&self, line: &str) -> MockResponse {
            self.responses
                .lock()
                .unwrap()
                .iter()
                .find(|(needle, _)| line.contains(needle.as_str()))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone())
        }

        fn apply_effects(&self, line: &str) {
            let effects = self.effects.lock().unwrap().clone();
            for effect in effects.iter().filter(|e| line.contains(e.needle.as_str())) {
                if let Some(parent) = effect.path.parent() {
                    std::fs::create_dir_all(parent).unwrap();
                }
                std::fs::write(&effect.path, &effect.contents).unwrap();
            }

            let hooks = self.hooks.lock().unwrap().clone();
            for (_, hook) in hooks.iter().filter(|(needle, _)| line.contains(needle.as_str())) {
                hook(line);
            }
        }
    }

    impl CommandExecutor for MockExecutor {
        fn execute(
            &self,
            command: &ShellCommand,
            _timeout: Option<Duration>,
        ) -> Result<ProcessResult> {
            self.record_call(command);

            match self.get_response(command.line()) {
                MockResponse::Success { output } => {
                    self.apply_effects(command.line());
                    Ok(ProcessResult::new(output, Some(0)))
                }
                MockResponse::Failure { output, exit_code } => {
                    Ok(ProcessResult::new(output, Some(exit_code)))
                }
                MockResponse::Timeout => Err(BackupError::Execution {
                    command: command.masked(),
                    output: "Command timed out".to_string(),
                }),
            }
        }

        fn locate(&self, program: &str) -> Option<PathBuf> {
            if self.missing_binaries.lock().unwrap().contains(program) {
                None
            } else {
                Some(PathBuf::from("/usr/bin").join(program))
            }
        }
    }
}

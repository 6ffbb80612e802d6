//! External program execution with a testable seam.
//!
//! The audio converter and the voice-cloning CLI are both external programs.
//! The `CommandExecutor` trait lets tests stand in for them.

use crate::error::{Result, VoiceLoopError};
use std::process::Command;

/// Trait for executing system commands.
///
/// Object-safe, Send + Sync for use from blocking worker threads.
pub trait CommandExecutor: Send + Sync {
    /// Execute a program with arguments.
    ///
    /// Returns the stdout of the command on success.
    /// Returns an error if the command fails or is not found.
    fn execute(&self, program: &str, args: &[String]) -> Result<String>;
}

/// Production command executor using std::process::Command.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, program: &str, args: &[String]) -> Result<String> {
        let output = Command::new(program).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VoiceLoopError::ToolNotFound {
                    tool: program.to_string(),
                }
            } else {
                VoiceLoopError::ToolFailed {
                    tool: program.to_string(),
                    message: format!("could not start: {}", e),
                }
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceLoopError::ToolFailed {
                tool: program.to_string(),
                message: format!("exited with {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Substitute `{name}` placeholders in an argument template.
///
/// Each template entry stays a single argument, so substituted text never
/// needs shell quoting. Substituted values are not rescanned.
pub fn expand_args(template: &[String], values: &[(&str, &str)]) -> Vec<String> {
    template.iter().map(|arg| expand_one(arg, values)).collect()
}

fn expand_one(arg: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let placeholder = values.iter().find(|(name, _)| {
            after.starts_with(name) && after[name.len()..].starts_with('}')
        });
        match placeholder {
            Some((name, value)) => {
                out.push_str(value);
                rest = &after[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_tool_not_found() {
        let executor = SystemCommandExecutor::new();
        let result = executor.execute("voiceloop-definitely-not-installed", &[]);

        match result {
            Err(VoiceLoopError::ToolNotFound { tool }) => {
                assert_eq!(tool, "voiceloop-definitely-not-installed");
            }
            other => panic!("Expected ToolNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_successful_command_returns_stdout() {
        let executor = SystemCommandExecutor::new();
        let output = executor
            .execute("echo", &["hello".to_string()])
            .unwrap();
        assert_eq!(output.trim(), "hello");
    }

    #[test]
    fn test_failing_command_is_tool_failed() {
        let executor = SystemCommandExecutor::new();
        let result = executor.execute("false", &[]);
        assert!(matches!(result, Err(VoiceLoopError::ToolFailed { .. })));
    }

    #[test]
    fn test_expand_args_substitutes_placeholders() {
        let template: Vec<String> = ["--text", "{text}", "--lang={language}", "--fixed"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let args = expand_args(&template, &[("text", "Hello there."), ("language", "en")]);

        assert_eq!(args, vec!["--text", "Hello there.", "--lang=en", "--fixed"]);
    }

    #[test]
    fn test_expand_args_keeps_text_as_single_argument() {
        let template = vec!["{text}".to_string()];
        let args = expand_args(&template, &[("text", "two words; rm -rf /")]);
        assert_eq!(args.len(), 1);
        assert_eq!(args[0], "two words; rm -rf /");
    }

    #[test]
    fn test_expand_args_does_not_rescan_values() {
        let template = vec!["{text}".to_string(), "{language}".to_string()];
        let args = expand_args(&template, &[("text", "say {language}"), ("language", "en")]);
        assert_eq!(args, vec!["say {language}", "en"]);
    }

    #[test]
    fn test_expand_args_leaves_unknown_braces() {
        let template = vec!["{unknown} {".to_string()];
        let args = expand_args(&template, &[("text", "x")]);
        assert_eq!(args, vec!["{unknown} {"]);
    }
}

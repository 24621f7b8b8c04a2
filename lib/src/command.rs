//! Command construction and configuration thereof.

use tokio::process::Command as TokioCommand;
use tracing::trace;

use crate::{config, error::RuntimeError};

/// Shell to use to run commands.
///
/// `Powershell` is special-cased because it has a different calling
/// convention, and is available on unices too (provided the end-user has it
/// installed, of course).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shell {
	/// Use no shell, and execute the command directly.
	///
	/// The command line is split on whitespace and the resulting vec used as
	/// execvp(3) arguments. This is a very simplistic approach deliberately:
	/// it will not support quoted arguments. Use a shell if you want that.
	None,

	/// Use the given string as a unix shell invocation.
	///
	/// The string is split on whitespace: first is the shell program, rest
	/// are additional arguments, which come before the `-c` and the command
	/// line.
	Unix(String),

	/// Use Powershell, on Windows or elsewhere.
	///
	/// This is invoked with `-Command` followed by the command line.
	Powershell,
}

impl Default for Shell {
	#[cfg(windows)]
	fn default() -> Self {
		Self::Powershell
	}

	#[cfg(not(windows))]
	fn default() -> Self {
		Self::Unix("/bin/sh".into())
	}
}

impl Shell {
	/// Resolve the configuration `shell` value.
	///
	/// `none` and `powershell` are recognized specials; everything else is a
	/// unix shell invocation. An empty value means the platform default.
	pub fn from_config(s: &str) -> Self {
		let s = s.trim();
		if s.is_empty() {
			Self::default()
		} else if s.eq_ignore_ascii_case("none") {
			Self::None
		} else if s.eq_ignore_ascii_case("powershell") {
			Self::Powershell
		} else {
			Self::Unix(s.into())
		}
	}

	/// Obtain a [`Command`][TokioCommand] for one command line.
	///
	/// Behaves as described in the enum documentation.
	pub fn to_command(&self, exec: &str) -> Result<TokioCommand, RuntimeError> {
		if exec.trim().is_empty() {
			return Err(RuntimeError::EmptyCommand);
		}

		match self {
			Self::None => {
				let mut parts = exec.split_ascii_whitespace();
				// UNWRAP: non-emptiness checked above
				#[allow(clippy::unwrap_used)]
				let program = parts.next().unwrap();
				let mut c = TokioCommand::new(program);
				c.args(parts);
				Ok(c)
			}

			Self::Powershell if cfg!(windows) => {
				let mut c = TokioCommand::new("powershell.exe");
				c.arg("-Command").arg(exec);
				Ok(c)
			}

			Self::Powershell => {
				let mut c = TokioCommand::new("pwsh");
				c.arg("-Command").arg(exec);
				Ok(c)
			}

			Self::Unix(invocation) => {
				let mut sh = invocation.split_ascii_whitespace();
				let Some(program) = sh.next() else {
					return Err(RuntimeError::EmptyShell);
				};

				let mut c = TokioCommand::new(program);
				c.args(sh);
				c.arg("-c").arg(exec);
				Ok(c)
			}
		}
	}
}

/// Build the full spawnable for a watcher's command configuration: shell
/// resolution, working directory, environment overrides.
pub fn spawnable(cfg: &config::Command) -> Result<TokioCommand, RuntimeError> {
	let shell = Shell::from_config(&cfg.shell);
	trace!(?shell, exec=%cfg.exec, "resolved shell");

	let mut command = shell.to_command(&cfg.exec)?;
	command.current_dir(&cfg.path);
	command.envs(&cfg.env);
	Ok(command)
}

#[cfg(test)]
mod test {
	use std::ffi::OsStr;

	use command_group::AsyncCommandGroup;

	use super::*;

	fn parts(command: &TokioCommand) -> (String, Vec<String>) {
		let std = command.as_std();
		(
			std.get_program().to_string_lossy().into_owned(),
			std.get_args()
				.map(|arg| arg.to_string_lossy().into_owned())
				.collect(),
		)
	}

	#[test]
	fn none_splits_on_whitespace() {
		let c = Shell::None
			.to_command("echo hello world")
			.expect("command is non-empty");
		assert_eq!(
			parts(&c),
			("echo".to_string(), vec!["hello".into(), "world".into()])
		);
	}

	#[test]
	fn unix_invokes_with_dash_c() {
		let c = Shell::Unix("/bin/sh".into())
			.to_command("echo hi && echo ho")
			.expect("command is non-empty");
		assert_eq!(
			parts(&c),
			(
				"/bin/sh".to_string(),
				vec!["-c".into(), "echo hi && echo ho".into()]
			)
		);
	}

	#[test]
	fn unix_shell_options_come_before_dash_c() {
		let c = Shell::Unix("bash -o errexit".into())
			.to_command("echo hi")
			.expect("command is non-empty");
		assert_eq!(
			parts(&c),
			(
				"bash".to_string(),
				vec!["-o".into(), "errexit".into(), "-c".into(), "echo hi".into()]
			)
		);
	}

	#[test]
	fn empty_exec_is_an_error() {
		assert!(matches!(
			Shell::default().to_command("  "),
			Err(RuntimeError::EmptyCommand)
		));
	}

	#[test]
	fn empty_shell_program_is_an_error() {
		assert!(matches!(
			Shell::Unix(" ".into()).to_command("echo hi"),
			Err(RuntimeError::EmptyShell)
		));
	}

	#[test]
	fn config_specials_resolve() {
		assert_eq!(Shell::from_config("none"), Shell::None);
		assert_eq!(Shell::from_config("POWERSHELL"), Shell::Powershell);
		assert_eq!(Shell::from_config(""), Shell::default());
		assert_eq!(
			Shell::from_config("bash -o errexit"),
			Shell::Unix("bash -o errexit".into())
		);
	}

	#[test]
	fn spawnable_applies_cwd_and_env() {
		let cfg = config::Command {
			exec: "echo hi".into(),
			path: "/tmp".into(),
			env: [("ANSWER".to_string(), "42".to_string())].into(),
			..Default::default()
		};

		let c = spawnable(&cfg).expect("command is non-empty");
		let std = c.as_std();
		assert_eq!(std.get_current_dir(), Some(std::path::Path::new("/tmp")));
		assert!(std
			.get_envs()
			.any(|(k, v)| k == OsStr::new("ANSWER") && v == Some(OsStr::new("42"))));
	}

	#[tokio::test]
	#[cfg(unix)]
	async fn unix_shell_default_runs() -> Result<(), std::io::Error> {
		assert!(Shell::default()
			.to_command("echo hi")
			.expect("command is non-empty")
			.group_status()
			.await?
			.success());
		Ok(())
	}

	#[tokio::test]
	#[cfg(unix)]
	async fn shell_none_runs() -> Result<(), std::io::Error> {
		assert!(Shell::None
			.to_command("echo hi")
			.expect("command is non-empty")
			.group_status()
			.await?
			.success());
		Ok(())
	}
}

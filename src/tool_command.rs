use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::error::{ErrorLayer, KvizError, Result};

/// An external program invocation, kept as an argv vector so that paths we
/// append (like the run directory) never go through a shell.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
}

impl ToolCommand {
    /// Split a command line using POSIX shell quoting rules.
    pub fn parse(command_line: &str, current_dir: &Path) -> Result<ToolCommand> {
        let mut words = shell_words::split(command_line).map_err(|e| {
            KvizError::bad_input(format!("Unable to split command {:?}: {}", command_line, e))
        })?;
        if words.is_empty() {
            return Err(KvizError::bad_input("Empty command line".to_string()));
        }
        let program = words.remove(0);
        Ok(ToolCommand {
            program,
            args: words,
            current_dir: current_dir.to_path_buf(),
        })
    }

    pub fn with_arg<S: Into<String>>(&self, arg: S) -> ToolCommand {
        let mut cmd = self.clone();
        cmd.args.push(arg.into());
        cmd
    }

    pub fn display(&self) -> String {
        let mut words = vec![self.program.as_str()];
        words.extend(self.args.iter().map(|s| s.as_str()));
        shell_words::join(words)
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).current_dir(&self.current_dir);
        command
    }

    fn launch_failed(&self, err: std::io::Error) -> KvizError {
        KvizError::not_found(
            ErrorLayer::ToolLayer,
            format!("Failed to launch `{}`: {}", self.display(), err),
        )
    }

    /// Run the command with stdout and stderr merged into a single pipe and
    /// return the output lines in emission order.  The exit status is ignored.
    pub fn run_combined_lines(&self) -> Result<Vec<String>> {
        let (reader, writer) = std::io::pipe().map_err(|e| self.launch_failed(e))?;
        let writer_clone = writer.try_clone().map_err(|e| self.launch_failed(e))?;

        let mut command = self.command();
        command
            .stdin(Stdio::null())
            .stdout(writer_clone)
            .stderr(writer);
        let mut child = command.spawn().map_err(|e| self.launch_failed(e))?;
        // The command still holds the write ends; we would never see EOF.
        drop(command);

        let read_result = read_lines(BufReader::new(reader));
        let (lines, status) = reap_after_read(&mut child, read_result)?;
        debug!(command = %self.display(), ?status, lines = lines.len(), "tool finished");
        Ok(lines)
    }

    /// Run the command and return its stdout; stderr is captured and dropped.
    /// The exit status is ignored.
    pub fn run_stdout(&self) -> Result<String> {
        let mut child = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.launch_failed(e))?;

        let mut stdout = vec![];
        let read_result = match child.stdout.as_mut() {
            Some(out) => out.read_to_end(&mut stdout),
            None => Ok(0),
        };
        let (_, status) = reap_after_read(&mut child, read_result)?;
        debug!(command = %self.display(), ?status, bytes = stdout.len(), "tool finished");
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

fn read_lines<R: BufRead>(mut reader: R) -> io::Result<Vec<String>> {
    let mut lines = vec![];
    let mut buf = vec![];
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(lines);
        }
        let line = String::from_utf8_lossy(&buf);
        lines.push(line.trim_end_matches(&['\r', '\n'][..]).to_string());
    }
}

/// Wait on `child` whether or not draining its output worked, so a failed
/// read never leaves it unreaped.
fn reap_after_read<T>(child: &mut Child, read_result: io::Result<T>) -> Result<(T, ExitStatus)> {
    match read_result {
        Ok(value) => {
            let status = child.wait()?;
            Ok((value, status))
        }
        Err(e) => {
            let _ = child.wait();
            Err(e.into())
        }
    }
}

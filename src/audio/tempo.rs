//! External tools: tempo estimation and FLAC pre-processing
//!
//! Both run synchronously. The pipeline blocks until the child has printed its
//! first line and exited.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use crate::config::ToolCommand;
use crate::{AudioError, Result};

/// Tempo estimation backend
pub trait TempoEstimator {
    /// Estimate the tempo of the file at `path` in beats per minute
    fn estimate_tempo(&self, path: &Path) -> Result<f64>;

    /// Get the name of this estimator (for logging)
    fn name(&self) -> &str;
}

/// Spawns `program args.. <path>` and returns its first stdout line, after the
/// child has exited.
fn first_line_of(program: &Path, args: &[String], path: &Path) -> Result<Option<String>> {
    let mut command = Command::new(program);
    command
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    let mut child = command.spawn().map_err(|e| {
        AudioError::Tool(format!("cannot start {}: {}", program.display(), e))
    })?;

    let mut line = String::new();
    let read = match child.stdout.take() {
        Some(stdout) => BufReader::new(stdout).read_line(&mut line),
        None => Ok(0),
    };
    let status = child.wait()?;
    read?;

    if !status.success() {
        log::debug!("{} exited with {}", program.display(), status);
    }

    let line = line.trim();
    Ok(if line.is_empty() { None } else { Some(line.to_string()) })
}

/// Tempo estimation through an external program that prints one number.
pub struct CommandTempoEstimator {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandTempoEstimator {
    pub fn new(tool: &ToolCommand) -> Self {
        Self {
            program: tool.program.clone(),
            args: tool.args.clone(),
        }
    }
}

impl TempoEstimator for CommandTempoEstimator {
    fn estimate_tempo(&self, path: &Path) -> Result<f64> {
        let line = first_line_of(&self.program, &self.args, path)
            .map_err(|e| AudioError::Tempo(e.to_string()))?
            .ok_or_else(|| AudioError::Tempo(format!("no output for {}", path.display())))?;

        line.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| AudioError::Tempo(format!("unparseable tempo '{}' for {}", line, path.display())))
    }

    fn name(&self) -> &str {
        self.program.to_str().unwrap_or("tempo tool")
    }
}

/// Used when no tempo tool is configured.
pub struct DisabledTempoEstimator;

impl TempoEstimator for DisabledTempoEstimator {
    fn estimate_tempo(&self, _path: &Path) -> Result<f64> {
        Err(AudioError::Tempo("no tempo tool configured".into()))
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

/// FLAC pre-processing step run on each FLAC file before it is relocated.
pub struct FlacTool {
    program: PathBuf,
    args: Vec<String>,
}

impl FlacTool {
    pub fn new(tool: &ToolCommand) -> Self {
        Self {
            program: tool.program.clone(),
            args: tool.args.clone(),
        }
    }

    /// Runs the tool on `path` and returns the line it printed, if any.
    pub fn run(&self, path: &Path) -> Result<Option<String>> {
        first_line_of(&self.program, &self.args, path)
    }
}

/// Rounds a detected tempo to the nearest whole BPM, clamped to `u32`.
pub fn round_bpm(tempo: f64) -> u32 {
    if tempo.is_nan() || tempo <= 0.0 {
        0
    } else {
        tempo.round().min(u32::MAX as f64) as u32
    }
}

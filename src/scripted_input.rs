use anyhow::Context;
use deepdig_core::InputSnapshot;
use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Deserialize)]
struct ScriptedInputFile {
    steps: Vec<ScriptedStep>,
}

/// One held input, in seconds of simulated time.
#[derive(Debug, Clone, Deserialize, Default)]
struct ScriptedStep {
    duration: f32,
    #[serde(default)]
    horizontal: i8,
    #[serde(default)]
    vertical: i8,
    #[serde(default)]
    drill: bool,
    #[serde(default)]
    interact: bool,
}

/// Plays back a JSON input script one fixed step at a time.
///
/// `interact` fires only on the first step of the entry that sets it, so a
/// long entry does not place a ladder every tick.
pub struct ScriptedInputPlayer {
    steps: Vec<ScriptedStep>,
    index: usize,
    time_in_step: f32,
    interact_sent: bool,
    finished: bool,
}

impl ScriptedInputPlayer {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read input script {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Invalid input script {}", path.display()))
    }

    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let file: ScriptedInputFile = serde_json::from_str(contents)?;
        if file.steps.is_empty() {
            anyhow::bail!("scripted input file contains no steps");
        }
        if let Some(bad) = file.steps.iter().position(|s| !(s.duration > 0.0)) {
            anyhow::bail!("step {bad} has a non-positive duration");
        }
        Ok(Self {
            steps: file.steps,
            index: 0,
            time_in_step: 0.0,
            interact_sent: false,
            finished: false,
        })
    }

    /// The last step's duration has fully elapsed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Input for the next step of length `dt`. Past the end, the script
    /// keeps returning idle input.
    pub fn advance(&mut self, dt: f32) -> InputSnapshot {
        if self.finished {
            return InputSnapshot::default();
        }

        let step = self.steps[self.index].clone();
        let interact = step.interact && !self.interact_sent;
        self.interact_sent |= step.interact;

        self.time_in_step += dt;
        if self.time_in_step >= step.duration - dt * 0.5 {
            self.time_in_step = 0.0;
            self.interact_sent = false;
            if self.index + 1 < self.steps.len() {
                self.index += 1;
            } else {
                self.finished = true;
            }
        }

        InputSnapshot {
            horizontal: step.horizontal,
            vertical: step.vertical,
            drill: step.drill,
            interact,
        }
        .normalized()
    }
}

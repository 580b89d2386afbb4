use std::process::{Child, Command, Stdio};

use crate::alert::domain::alarm::Alarm;

/// Plays the alert by spawning an external player, e.g. `aplay alert.wav`.
///
/// The player runs in the background. A sound still playing from the last
/// alert is left alone; finished players are reaped on the next `play`.
pub struct CommandAlarm {
    program: String,
    args: Vec<String>,
    children: Vec<Child>,
}

impl CommandAlarm {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            children: Vec::new(),
        }
    }

    /// Splits a whitespace-separated command line into program and args.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    fn reap(&mut self) {
        self.children
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }
}

impl Alarm for CommandAlarm {
    fn play(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.reap();
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| format!("Failed to start alarm player {}: {e}", self.program))?;
        self.children.push(child);
        Ok(())
    }
}

impl Drop for CommandAlarm {
    fn drop(&mut self) {
        for child in &mut self.children {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

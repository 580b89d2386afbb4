use std::io::Write;

use crate::alert::domain::alarm::Alarm;

/// Rings the terminal bell (BEL) on the wrapped writer, stderr by default.
pub struct BellAlarm<W: Write + Send = std::io::Stderr> {
    out: W,
}

impl BellAlarm {
    pub fn new() -> Self {
        Self {
            out: std::io::stderr(),
        }
    }
}

impl Default for BellAlarm {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> BellAlarm<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> Alarm for BellAlarm<W> {
    fn play(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.out.write_all(b"\x07")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Audible alert played when an alert sequence starts.
///
/// Must not block the monitor loop for the length of the sound.
pub trait Alarm: Send {
    fn play(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}

use std::io::{self, BufRead, BufReader, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

const KEY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Background thread that sets `cancelled` when the user asks to quit.
///
/// On a terminal a single `q` keypress is enough; the terminal is put in raw
/// mode for the lifetime of the listener and restored on drop. When stdin is
/// a pipe or file, a line reading `q` is required instead.
pub struct QuitListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    raw_mode: bool,
}

impl QuitListener {
    pub fn for_stdin(cancelled: Arc<AtomicBool>) -> Self {
        if io::stdin().is_terminal() {
            match terminal::enable_raw_mode() {
                Ok(()) => return Self::keys(cancelled),
                Err(e) => log::warn!("Cannot read single keys ({e}); type q + Enter to quit"),
            }
        }
        Self::lines(BufReader::new(io::stdin()), cancelled)
    }

    /// Whether quitting takes a single keypress rather than a line.
    pub fn is_single_key(&self) -> bool {
        self.raw_mode
    }

    fn keys(cancelled: Arc<AtomicBool>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let handle = std::thread::spawn(move || {
            watch_keys(poll_terminal, &cancelled, &thread_stop);
        });
        Self {
            stop,
            handle: Some(handle),
            raw_mode: true,
        }
    }

    /// Line-based listener. The thread blocks on `reader`, so dropping the
    /// listener detaches it instead of joining.
    pub fn lines<R>(reader: R, cancelled: Arc<AtomicBool>) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let handle = std::thread::spawn(move || watch_lines(reader, &cancelled));
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            handle: Some(handle),
            raw_mode: false,
        }
    }
}

impl Drop for QuitListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if !self.raw_mode {
            return;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("Failed to restore terminal mode: {e}");
        }
    }
}

/// `q` pressed, or Ctrl-C, which raw mode delivers as a key instead of a signal.
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') | KeyCode::Char('C') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn poll_terminal() -> io::Result<Option<Event>> {
    if event::poll(KEY_POLL_INTERVAL)? {
        event::read().map(Some)
    } else {
        Ok(None)
    }
}

/// Pulls events from `next_event` until a quit key arrives, `stop` is set,
/// the monitor was cancelled elsewhere, or the event source fails.
fn watch_keys<F>(mut next_event: F, cancelled: &AtomicBool, stop: &AtomicBool)
where
    F: FnMut() -> io::Result<Option<Event>>,
{
    while !stop.load(Ordering::Relaxed) && !cancelled.load(Ordering::Relaxed) {
        match next_event() {
            Ok(Some(Event::Key(key))) if is_quit_key(&key) => {
                log::info!("Quit key received");
                cancelled.store(true, Ordering::Relaxed);
                return;
            }
            Ok(_) => {}
            Err(e) => {
                log::debug!("Quit listener stopped: {e}");
                return;
            }
        }
    }
}

/// EOF does not cancel, so a closed stdin leaves the monitor running.
fn watch_lines<R: BufRead>(reader: R, cancelled: &AtomicBool) {
    for line in reader.lines() {
        match line {
            Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                log::info!("Quit key received");
                cancelled.store(true, Ordering::Relaxed);
                return;
            }
            Ok(_) => {}
            Err(e) => {
                log::debug!("Quit listener stopped: {e}");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::VecDeque;
    use std::io::Cursor;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    /// Replays `events`, then reports EOF so the watcher returns.
    fn scripted(events: Vec<Event>) -> impl FnMut() -> io::Result<Option<Event>> {
        let mut events: VecDeque<Event> = events.into();
        move || match events.pop_front() {
            Some(event) => Ok(Some(event)),
            None => Err(io::ErrorKind::UnexpectedEof.into()),
        }
    }

    #[rstest]
    #[case::lower_q(press(KeyCode::Char('q'), KeyModifiers::NONE), true)]
    #[case::upper_q(press(KeyCode::Char('Q'), KeyModifiers::SHIFT), true)]
    #[case::ctrl_c(press(KeyCode::Char('c'), KeyModifiers::CONTROL), true)]
    #[case::plain_c(press(KeyCode::Char('c'), KeyModifiers::NONE), false)]
    #[case::other_letter(press(KeyCode::Char('x'), KeyModifiers::NONE), false)]
    #[case::enter(press(KeyCode::Enter, KeyModifiers::NONE), false)]
    fn test_is_quit_key(#[case] key: KeyEvent, #[case] expected: bool) {
        assert_eq!(is_quit_key(&key), expected);
    }

    #[test]
    fn test_key_release_is_ignored() {
        let mut key = press(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert!(!is_quit_key(&key));
    }

    #[test]
    fn test_single_q_keypress_cancels_without_enter() {
        let cancelled = AtomicBool::new(false);
        let stop = AtomicBool::new(false);
        let events = vec![
            Event::FocusGained,
            Event::Key(press(KeyCode::Char('a'), KeyModifiers::NONE)),
            Event::Key(press(KeyCode::Char('q'), KeyModifiers::NONE)),
        ];

        watch_keys(scripted(events), &cancelled, &stop);

        assert!(cancelled.load(Ordering::Relaxed));
    }

    #[test]
    fn test_key_watch_ends_on_stop_without_cancelling() {
        let cancelled = AtomicBool::new(false);
        let stop = AtomicBool::new(true);
        let mut calls = 0;

        watch_keys(
            || {
                calls += 1;
                Ok(None)
            },
            &cancelled,
            &stop,
        );

        assert_eq!(calls, 0);
        assert!(!cancelled.load(Ordering::Relaxed));
    }

    #[test]
    fn test_key_watch_ends_when_events_fail() {
        let cancelled = AtomicBool::new(false);
        let stop = AtomicBool::new(false);
        watch_keys(scripted(vec![]), &cancelled, &stop);
        assert!(!cancelled.load(Ordering::Relaxed));
    }

    #[rstest]
    #[case::lower("q\n", true)]
    #[case::upper_with_spaces("  Q  \n", true)]
    #[case::after_other_input("hello\nquit\nq\n", true)]
    #[case::word_not_key("quit\n", false)]
    #[case::eof("", false)]
    fn test_line_listener(#[case] input: &'static str, #[case] expected: bool) {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut listener = QuitListener::lines(Cursor::new(input), cancelled.clone());
        assert!(!listener.is_single_key());
        listener.handle.take().unwrap().join().unwrap();
        assert_eq!(cancelled.load(Ordering::Relaxed), expected);
    }
}

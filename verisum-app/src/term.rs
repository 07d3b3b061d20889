//! Terminal presentation and input backed by crossterm. The surface owns
//! the terminal for the whole session: raw mode plus the alternate screen
//! on creation, both restored on drop. Stimuli are drawn as centered text.

use std::io::{Stdout, Write, stdout};
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};
use crossterm::{execute, queue};

use verisum_core::{Error, InputSource, Key, Result, Stimulus, Surface};
use verisum_timing::{HighPrecisionTimer, Timer};

fn present_err(e: std::io::Error) -> Error {
    Error::Presentation(e.to_string())
}

/// Draws stimuli into the alternate screen buffer. `show` only stages
/// text; nothing reaches the terminal until `flip`.
pub struct TermSurface {
    out: Stdout,
    timer: HighPrecisionTimer,
    staged: Vec<String>,
}

impl TermSurface {
    pub fn new() -> Result<Self> {
        enable_raw_mode().map_err(present_err)?;
        let mut out = stdout();
        execute!(out, EnterAlternateScreen, Hide).map_err(present_err)?;
        Ok(Self {
            out,
            timer: HighPrecisionTimer::new(),
            staged: Vec::new(),
        })
    }
}

impl Surface for TermSurface {
    fn show(&mut self, stimulus: &Stimulus) -> Result<()> {
        self.staged = match stimulus {
            Stimulus::Fixation => vec!["+".into()],
            Stimulus::Problem { left, right } => {
                vec![format!("{left:2}"), format!("+{right}")]
            }
            Stimulus::Probe { value } => vec![value.to_string()],
            Stimulus::Message(text) => text.lines().map(str::to_owned).collect(),
        };
        Ok(())
    }

    fn flip(&mut self) -> Result<()> {
        let (cols, rows) = terminal::size().map_err(present_err)?;
        queue!(self.out, Clear(ClearType::All)).map_err(present_err)?;
        let top = rows.saturating_sub(self.staged.len() as u16) / 2;
        for (i, line) in self.staged.iter().enumerate() {
            let col = cols.saturating_sub(line.chars().count() as u16) / 2;
            queue!(self.out, MoveTo(col, top + i as u16), Print(line)).map_err(present_err)?;
        }
        self.out.flush().map_err(present_err)?;
        Ok(())
    }

    fn wait(&mut self, duration: Duration) -> Result<()> {
        self.timer.sleep(duration);
        Ok(())
    }
}

impl Drop for TermSurface {
    fn drop(&mut self) {
        let _ = execute!(self.out, LeaveAlternateScreen, Show);
        let _ = disable_raw_mode();
    }
}

/// Non-blocking keyboard reader for the raw-mode terminal.
#[derive(Debug, Default)]
pub struct TermInput;

impl TermInput {
    pub fn new() -> Self {
        Self
    }
}

impl InputSource for TermInput {
    fn poll_keys(&mut self) -> Result<Vec<Key>> {
        let mut keys = Vec::new();
        while event::poll(Duration::ZERO).map_err(present_err)? {
            if let Event::Key(key) = event::read().map_err(present_err)? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(mapped) = map_key(key.code, key.modifiers) {
                    keys.push(mapped);
                }
            }
        }
        Ok(keys)
    }
}

/// Maps a terminal key press into the experiment's key vocabulary.
/// Characters are lowercased so bindings are case-insensitive; Ctrl-C
/// behaves like ESC.
fn map_key(code: KeyCode, modifiers: KeyModifiers) -> Option<Key> {
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Some(Key::Escape),
            _ => None,
        };
    }
    match code {
        KeyCode::Char(' ') => Some(Key::Space),
        KeyCode::Char(c) => Some(Key::Char(c.to_ascii_lowercase())),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Escape),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn characters_are_lowercased() {
        assert_eq!(
            map_key(KeyCode::Char('J'), KeyModifiers::SHIFT),
            Some(Key::Char('j'))
        );
        assert_eq!(
            map_key(KeyCode::Char('f'), KeyModifiers::NONE),
            Some(Key::Char('f'))
        );
    }

    #[test]
    fn control_keys_map_to_the_session_vocabulary() {
        assert_eq!(map_key(KeyCode::Char(' '), KeyModifiers::NONE), Some(Key::Space));
        assert_eq!(map_key(KeyCode::Esc, KeyModifiers::NONE), Some(Key::Escape));
        assert_eq!(map_key(KeyCode::Enter, KeyModifiers::NONE), Some(Key::Enter));
        assert_eq!(
            map_key(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(Key::Escape)
        );
    }

    #[test]
    fn unmapped_keys_are_dropped() {
        assert_eq!(map_key(KeyCode::Up, KeyModifiers::NONE), None);
        assert_eq!(map_key(KeyCode::Char('x'), KeyModifiers::CONTROL), None);
    }
}

use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use log::warn;
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use crate::machine::KEY_COUNT;

/// physical keys for the sixteen pad keys, in pad order: the 1234 / qwer /
/// asdf / zxcv block of a qwerty keyboard
const KEYMAP: [(char, u8); KEY_COUNT] = [
    ('1', 0x0),
    ('2', 0x1),
    ('3', 0x2),
    ('4', 0x3),
    ('q', 0x4),
    ('w', 0x5),
    ('e', 0x6),
    ('r', 0x7),
    ('a', 0x8),
    ('s', 0x9),
    ('d', 0xa),
    ('f', 0xb),
    ('z', 0xc),
    ('x', 0xd),
    ('c', 0xe),
    ('v', 0xf),
];

/// how long a keypress counts as held. Terminals only report presses, never
/// releases, so each key decays after this window instead
const KEY_HOLD: Duration = Duration::from_millis(150);

/// a snapshot of the pad, plus whether the user asked to quit
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    pub keys: [bool; KEY_COUNT],
    pub quit: bool,
}

/// reads keypresses between cycles
pub trait Input {
    /// fresh snapshot of the sixteen-key latch
    fn poll(&mut self) -> Result<InputState, io::Error>;
}

/// crossterm has its own error enum; flatten it back onto std io
fn to_io(e: crossterm::ErrorKind) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

/// Input backed by crossterm's event stream. Puts the terminal in raw mode
/// for the lifetime of the value. Esc or ctrl-c turn into a quit request
/// rather than keypresses.
pub struct TermInput {
    pressed_at: [Option<Instant>; KEY_COUNT],
    keymap: HashMap<char, u8>,
}

impl TermInput {
    pub fn new() -> Result<TermInput, io::Error> {
        terminal::enable_raw_mode().map_err(to_io)?;
        Ok(TermInput {
            pressed_at: [None; KEY_COUNT],
            keymap: HashMap::from(KEYMAP),
        })
    }

    /// drain every pending terminal event without blocking; true means the
    /// user asked to quit
    fn read_events(&mut self) -> Result<bool, io::Error> {
        let mut quit = false;
        while poll(Duration::from_millis(0)).map_err(to_io)? {
            match read().map_err(to_io)? {
                Event::Key(evt) => {
                    if evt.code == KeyCode::Esc
                        || (evt.code == KeyCode::Char('c')
                            && evt.modifiers.contains(KeyModifiers::CONTROL))
                    {
                        quit = true;
                    } else if let KeyCode::Char(key) = evt.code {
                        match self.keymap.get(&key) {
                            Some(&mapped) => self.pressed_at[mapped as usize] = Some(Instant::now()),
                            None => warn!("can't map {:?} to a pad key", key),
                        }
                    }
                }
                _ => {} // resize and mouse events don't concern the pad
            }
        }
        Ok(quit)
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        // put the terminal back even when the run ends in an error
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for TermInput {
    fn poll(&mut self) -> Result<InputState, io::Error> {
        let quit = self.read_events()?;
        let mut state = InputState {
            keys: [false; KEY_COUNT],
            quit,
        };
        for (key, stamp) in state.keys.iter_mut().zip(self.pressed_at.iter_mut()) {
            match stamp {
                Some(t) if t.elapsed() < KEY_HOLD => *key = true,
                Some(_) => *stamp = None,
                None => {}
            }
        }
        Ok(state)
    }
}

/// dummy Input implementation for testing: a fixed set of held keys, and
/// optionally a quit request after so many polls
pub struct DummyInput {
    state: InputState,
    polls_left: Option<usize>,
}

impl DummyInput {
    pub fn new(down: &[u8]) -> Self {
        let mut state = InputState::default();
        for &key in down {
            state.keys[key as usize] = true;
        }
        DummyInput {
            state,
            polls_left: None,
        }
    }

    /// report a quit on the nth poll
    pub fn quit_after(polls: usize) -> Self {
        DummyInput {
            state: InputState::default(),
            polls_left: Some(polls),
        }
    }
}

impl Input for DummyInput {
    fn poll(&mut self) -> Result<InputState, io::Error> {
        let mut state = self.state;
        if let Some(left) = &mut self.polls_left {
            *left = left.saturating_sub(1);
            state.quit = *left == 0;
        }
        Ok(state)
    }
}

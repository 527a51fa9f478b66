use std::collections::VecDeque;
use std::io::{self, Read, Stdout, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEvent},
    terminal,
};
use log::debug;

use crate::console::{Console, Input};

/// Keeps the terminal in raw mode for as long as it is alive.
///
/// Raw mode is disabled again on drop, including when unwinding from a panic.
#[derive(Debug)]
pub struct RawMode {
    _private: (),
}

impl RawMode {
    /// Must only be called if terminal is NOT in raw mode.
    pub fn enable() -> io::Result<Self> {
        debug_assert!(
            !terminal::is_raw_mode_enabled().is_ok_and(|is| is),
            "terminal should not be in raw mode to enable raw mode",
        );
        terminal::enable_raw_mode()?;
        Ok(RawMode { _private: () })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(err) = terminal::disable_raw_mode() {
            eprintln!("failed to restore terminal: {}", err);
        }
    }
}

/// Similar to [`crossterm::event::KeyCode`] but only contains what a program can read.
#[derive(Debug, PartialEq, Eq)]
enum Key {
    Char(char),
    /// `Ctrl+D`
    EndOfInput,
    /// `Ctrl+C`
    Interrupt,
}

/// Interactive terminal console.
///
/// Keys are read unbuffered and without echo. Output is written to stdout.
pub struct Terminal {
    /// Bytes of a key which have not been read yet. Multi-byte characters are queued
    /// here as UTF-8.
    pending: VecDeque<u8>,
    /// Set once `Ctrl+C` has been seen, so every later read is interrupted too.
    interrupted: bool,
    ended: bool,
    stdout: Stdout,
    _raw: RawMode,
}

impl Terminal {
    /// Must only be called if stdin is a terminal, which is NOT in raw mode.
    pub fn new() -> io::Result<Self> {
        let raw = RawMode::enable()?;
        Ok(Terminal {
            pending: VecDeque::new(),
            interrupted: false,
            ended: false,
            stdout: io::stdout(),
            _raw: raw,
        })
    }

    /// Queue the result of a key press.
    fn accept(&mut self, key: Key) {
        match key {
            Key::Char(ch) => {
                let mut bytes = [0u8; 4];
                self.pending.extend(ch.encode_utf8(&mut bytes).bytes());
            }
            Key::EndOfInput => self.ended = true,
            Key::Interrupt => self.interrupted = true,
        }
    }

    /// Block for the next terminal event, keeping it if it is a key.
    ///
    /// A failed read is treated as the end of input.
    fn read_event(&mut self) {
        match event::read() {
            Ok(event) => {
                if let Ok(key) = event.try_into() {
                    self.accept(key);
                }
            }
            Err(err) => {
                debug!("terminal read failed: {}", err);
                self.ended = true;
            }
        }
    }

    fn has_input(&self) -> bool {
        self.interrupted || !self.pending.is_empty() || self.ended
    }

    fn take_input(&mut self) -> Option<Input> {
        if self.interrupted {
            return Some(Input::Interrupted);
        }
        if let Some(byte) = self.pending.pop_front() {
            return Some(Input::Char(byte));
        }
        if self.ended {
            return Some(Input::EndOfInput);
        }
        None
    }
}

impl Console for Terminal {
    fn poll_input_ready(&mut self) -> bool {
        while !self.has_input() {
            match event::poll(Duration::ZERO) {
                // Does not block, an event is already waiting
                Ok(true) => self.read_event(),
                Ok(false) => return false,
                Err(err) => {
                    debug!("terminal poll failed: {}", err);
                    self.ended = true;
                }
            }
        }
        true
    }

    fn read_char(&mut self) -> Input {
        loop {
            if let Some(input) = self.take_input() {
                return input;
            }
            self.read_event();
        }
    }

    /// Raw mode turns `Ctrl+C` into a key event, so pending events are drained here.
    /// Other keys stay queued for later reads.
    fn poll_interrupt(&mut self) -> bool {
        while !self.interrupted {
            match event::poll(Duration::ZERO) {
                Ok(true) => self.read_event(),
                Ok(false) => break,
                Err(err) => {
                    debug!("terminal poll failed: {}", err);
                    break;
                }
            }
        }
        self.interrupted
    }

    fn write_char(&mut self, ch: u8) {
        // Raw mode also disables output processing
        let _ = if ch == b'\n' {
            self.stdout.write_all(b"\r\n")
        } else {
            self.stdout.write_all(&[ch])
        };
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl TryFrom<Event> for Key {
    type Error = ();
    fn try_from(event: Event) -> Result<Self, Self::Error> {
        if let Event::Key(event) = event {
            if let Ok(key) = event.try_into() {
                return Ok(key);
            }
        }
        Err(())
    }
}

impl TryFrom<KeyEvent> for Key {
    type Error = ();
    fn try_from(event: KeyEvent) -> Result<Self, Self::Error> {
        use event::{KeyCode, KeyEventKind, KeyModifiers as Mod};

        if matches!(event.kind, KeyEventKind::Release) {
            return Err(());
        }

        let key = match (event.modifiers, event.code) {
            (Mod::CONTROL, KeyCode::Char('c')) => Key::Interrupt,
            (Mod::CONTROL, KeyCode::Char('d')) => Key::EndOfInput,

            (_, KeyCode::Enter) | (_, KeyCode::Char('\n')) => Key::Char('\n'),
            (_, KeyCode::Backspace) => Key::Char('\x08'),
            (_, KeyCode::Tab) => Key::Char('\t'),
            (_, KeyCode::Esc) => Key::Char('\x1b'),
            (_, KeyCode::Delete) => Key::Char('\x7f'),

            // Normal character
            (Mod::NONE | Mod::SHIFT, KeyCode::Char(ch)) => Key::Char(ch),

            _ => return Err(()),
        };

        Ok(key)
    }
}

/// Console for when stdin is not a terminal, eg. a pipe or a file.
///
/// Stdin is read on a separate thread so that polling never blocks.
pub struct Piped {
    receiver: Receiver<u8>,
    /// Byte received while polling, not yet read.
    peeked: Option<u8>,
    /// Stdin has ended (or failed), and every byte has been received.
    ended: bool,
    stdout: Stdout,
}

impl Piped {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buffer = [0; 1];
            loop {
                match stdin.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(_) => {
                        if sender.send(buffer[0]).is_err() {
                            break;
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        debug!("stdin read failed: {}", err);
                        break;
                    }
                }
            }
            // Dropping `sender` marks the end of input
        });
        Piped {
            receiver,
            peeked: None,
            ended: false,
            stdout: io::stdout(),
        }
    }
}

impl Default for Piped {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for Piped {
    fn poll_input_ready(&mut self) -> bool {
        if self.peeked.is_some() || self.ended {
            return true;
        }
        match self.receiver.try_recv() {
            Ok(byte) => {
                self.peeked = Some(byte);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.ended = true;
                true
            }
        }
    }

    fn read_char(&mut self) -> Input {
        if let Some(byte) = self.peeked.take() {
            return Input::Char(byte);
        }
        if self.ended {
            return Input::EndOfInput;
        }
        match self.receiver.recv() {
            Ok(byte) => Input::Char(byte),
            Err(_) => {
                self.ended = true;
                Input::EndOfInput
            }
        }
    }

    fn write_char(&mut self, ch: u8) {
        let _ = self.stdout.write_all(&[ch]);
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

use std::collections::VecDeque;
use std::io::Write;

/// Result of a blocking character read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Char(u8),
    /// Input has ended or failed. Programs observe this as [`EOF_SENTINEL`].
    EndOfInput,
    /// User requested the program stop (`Ctrl+C`).
    Interrupted,
}

/// Value stored in a register when [`Input::EndOfInput`] is read.
pub const EOF_SENTINEL: u16 = 0xFFFF;

/// Character device the machine reads keys from and writes output to.
///
/// Implementations own any host state they need (eg. raw terminal mode), and must
/// restore it when dropped.
pub trait Console {
    /// Whether [`Console::read_char`] would return without blocking.
    ///
    /// Must never block.
    fn poll_input_ready(&mut self) -> bool;

    /// Block until a character (or end of input, or an interrupt) is available.
    fn read_char(&mut self) -> Input;

    /// Whether the user has asked the program to stop, eg. with `Ctrl+C`.
    ///
    /// Checked every so often while running, so that a program which never reads
    /// input can still be stopped. Must never block.
    fn poll_interrupt(&mut self) -> bool {
        false
    }

    fn write_char(&mut self, ch: u8);

    fn flush(&mut self);

    fn write_str(&mut self, string: &str) {
        for byte in string.bytes() {
            self.write_char(byte);
        }
    }
}

impl<C: Console + ?Sized> Console for Box<C> {
    fn poll_input_ready(&mut self) -> bool {
        (**self).poll_input_ready()
    }
    fn read_char(&mut self) -> Input {
        (**self).read_char()
    }
    fn poll_interrupt(&mut self) -> bool {
        (**self).poll_interrupt()
    }
    fn write_char(&mut self, ch: u8) {
        (**self).write_char(ch)
    }
    fn flush(&mut self) {
        (**self).flush()
    }
}

/// Console with input taken from a fixed buffer.
///
/// Output is collected in memory by default, or written to any [`Write`]r. Once the
/// input is used up, every read returns [`Input::EndOfInput`] and polling reports it
/// as ready, the same as piped stdin.
#[derive(Debug)]
pub struct ScriptedConsole<W = Vec<u8>> {
    input: VecDeque<u8>,
    /// Input ends once the buffer is empty. Otherwise polls keep reporting that no
    /// key has been pressed yet.
    ends: bool,
    output: W,
    /// Amount of times `flush` was called.
    flushes: usize,
}

impl ScriptedConsole {
    pub fn new(input: impl AsRef<[u8]>) -> Self {
        Self::with_output(input, Vec::new())
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output decoded lossily as UTF-8.
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Take all output written so far.
    #[cfg(test)]
    pub(crate) fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl<W: Write> ScriptedConsole<W> {
    pub fn with_output(input: impl AsRef<[u8]>, output: W) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            ends: true,
            output,
            flushes: 0,
        }
    }

    /// Input which never ends: once it is used up, no further key is ever ready.
    #[cfg(test)]
    pub(crate) fn waiting(mut self) -> Self {
        self.ends = false;
        self
    }

    #[cfg(test)]
    pub(crate) fn push_input(&mut self, input: impl AsRef<[u8]>) {
        self.input.extend(input.as_ref());
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl<W: Write> Console for ScriptedConsole<W> {
    fn poll_input_ready(&mut self) -> bool {
        self.ends || !self.input.is_empty()
    }

    fn read_char(&mut self) -> Input {
        match self.input.pop_front() {
            Some(ch) => Input::Char(ch),
            None => Input::EndOfInput,
        }
    }

    fn write_char(&mut self, ch: u8) {
        let _ = self.output.write_all(&[ch]);
    }

    fn flush(&mut self) {
        let _ = self.output.flush();
        self.flushes += 1;
    }
}

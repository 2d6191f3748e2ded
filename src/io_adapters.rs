use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::cell::RefCell;
use std::io::{BufRead, BufReader, Result as IoResult, Stdin, Write};
use std::rc::Rc;

/// Line-oriented source of REPL input.
///
/// `Ok(None)` means the input is exhausted. The prompt is handed over so that
/// interactive sources can display it; scripted sources simply ignore it.
pub trait InputSource {
    fn read_line(&mut self, prompt: &str) -> IoResult<Option<String>>;
}

/// Input shared by reference between a session and its nested sessions.
pub type SharedInput = Rc<RefCell<dyn InputSource>>;

/// Output shared by reference between a session and its nested sessions.
pub type SharedOutput = Rc<RefCell<dyn Write>>;

/// Memory-backed input replaying a fixed list of lines.
///
/// Can be rewound to replay the same script for another session.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    lines: Vec<String>,
    position: usize,
}

impl ScriptedInput {
    /// Create a ScriptedInput that will hand out the provided lines in order.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            position: 0,
        }
    }

    /// Convenience: wrap into the shared form sessions expect.
    pub fn shared<I, S>(lines: I) -> Rc<RefCell<Self>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rc::new(RefCell::new(Self::new(lines)))
    }

    /// Start over from the first line.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Number of lines not read yet.
    pub fn remaining(&self) -> usize {
        self.lines.len() - self.position
    }
}

impl InputSource for ScriptedInput {
    fn read_line(&mut self, _prompt: &str) -> IoResult<Option<String>> {
        let line = self.lines.get(self.position).cloned();
        if line.is_some() {
            self.position += 1;
        }
        Ok(line)
    }
}

/// Input read from any buffered reader, one line at a time.
pub struct ReaderInput<R> {
    reader: R,
}

impl<R: BufRead> ReaderInput<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl ReaderInput<BufReader<Stdin>> {
    /// Input from the process standard input.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(std::io::stdin()))
    }
}

impl<R: BufRead> InputSource for ReaderInput<R> {
    fn read_line(&mut self, _prompt: &str) -> IoResult<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

/// Interactive terminal input backed by rustyline.
///
/// Every non-empty line is added to the editor's history. Both Ctrl-C and
/// Ctrl-D end the input.
pub struct EditorInput {
    editor: DefaultEditor,
}

impl EditorInput {
    pub fn new() -> rustyline::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl InputSource for EditorInput {
    fn read_line(&mut self, prompt: &str) -> IoResult<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    // a history failure should not lose the line itself
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(err) => Err(std::io::Error::other(err)),
        }
    }
}

/// Memory-backed writer for capturing session output.
pub struct CaptureOutput {
    buf: Rc<RefCell<Vec<u8>>>,
}

/// Read side of a [`CaptureOutput`], usable after the writer was handed to a session.
#[derive(Clone)]
pub struct CaptureHandle {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl CaptureOutput {
    /// Public constructor.
    pub fn new() -> Self {
        Self {
            buf: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Convenience: create writer and return (shared writer, handle).
    pub fn with_handle() -> (SharedOutput, CaptureHandle) {
        let writer = CaptureOutput::new();
        let handle = CaptureHandle {
            buf: writer.buf.clone(),
        };
        let shared: SharedOutput = Rc::new(RefCell::new(writer));
        (shared, handle)
    }
}

impl Default for CaptureOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for CaptureOutput {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl CaptureHandle {
    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.buf.borrow_mut().clear();
    }
}

/// Output that discards everything.
pub fn null_output() -> SharedOutput {
    Rc::new(RefCell::new(std::io::sink()))
}

/// Process standard output.
pub fn stdout_output() -> SharedOutput {
    Rc::new(RefCell::new(std::io::stdout()))
}

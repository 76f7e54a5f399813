use std::fs::File;
use std::io::{self, Read, Write};
use std::mem::ManuallyDrop;
use std::os::fd::FromRawFd;

use crate::interrupt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    Line(String),
    /// SIGINT arrived while waiting; whatever was typed so far is gone.
    Interrupted,
    Eof,
}

/// Reads standard input one byte at a time so that nothing past the newline
/// is consumed: the rest belongs to the commands the line starts.
pub struct InputHandler {
    stdin: ManuallyDrop<File>,
}

impl InputHandler {
    pub fn new() -> Self {
        // SAFETY: fd 0 stays open for the life of the process and is never
        // closed through this handle.
        let stdin = unsafe { File::from_raw_fd(libc::STDIN_FILENO) };
        Self {
            stdin: ManuallyDrop::new(stdin),
        }
    }

    pub fn read_line(&mut self, prompt: &str) -> io::Result<LineRead> {
        prompt_and_read(&mut *self.stdin, &mut io::stdout(), prompt)
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn prompt_and_read<R: Read, W: Write>(
    reader: &mut R,
    out: &mut W,
    prompt: &str,
) -> io::Result<LineRead> {
    // An interrupt that landed while a pipeline ran has already been echoed.
    interrupt::take_pending();

    out.write_all(prompt.as_bytes())?;
    out.flush()?;

    // One arriving from here on may miss the blocking read; the next one cannot.
    if interrupt::take_pending() {
        return Ok(LineRead::Interrupted);
    }
    read_line_from(reader)
}

/// The single suspension point of the read loop.
fn read_line_from<R: Read>(reader: &mut R) -> io::Result<LineRead> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) if buf.is_empty() => return Ok(LineRead::Eof),
            Ok(0) => break,
            Ok(_) if byte[0] == b'\n' => break,
            Ok(_) => buf.push(byte[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                if interrupt::take_pending() {
                    return Ok(LineRead::Interrupted);
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(LineRead::Line(String::from_utf8_lossy(&buf).into_owned()))
}

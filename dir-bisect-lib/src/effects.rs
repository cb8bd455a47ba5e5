//! Wrapper around side-effectful operations, i.e. console output. An
//! [`Effects`] value is constructed once at program startup and passed
//! explicitly down the call stack, so that library code never writes to
//! ambient stdout/stderr and tests can capture or suppress everything.

use std::fmt::Write;
use std::io::{self, Stderr, Stdout, Write as WriteIo};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
enum OutputDest {
    Console,
    Suppress,
    BufferForTest {
        stdout: Arc<Mutex<Vec<u8>>>,
        stderr: Arc<Mutex<Vec<u8>>>,
    },
}

/// Wrapper around side-effectful operations, such as output to the console.
#[derive(Clone)]
pub struct Effects {
    dest: OutputDest,
}

impl std::fmt::Debug for Effects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Effects dest={:?}>", self.dest)
    }
}

impl Effects {
    /// Constructor. Writes to stdout/stderr.
    pub fn new() -> Self {
        Effects {
            dest: OutputDest::Console,
        }
    }

    /// Constructor. Suppresses all output.
    pub fn new_suppress_for_test() -> Self {
        Effects {
            dest: OutputDest::Suppress,
        }
    }

    /// Constructor. Writes to the provided buffers.
    pub fn new_from_buffer_for_test(
        stdout: &Arc<Mutex<Vec<u8>>>,
        stderr: &Arc<Mutex<Vec<u8>>>,
    ) -> Self {
        Effects {
            dest: OutputDest::BufferForTest {
                stdout: Arc::clone(stdout),
                stderr: Arc::clone(stderr),
            },
        }
    }

    /// Create a stream that regular output can be written to.
    pub fn get_output_stream(&self) -> OutputStream {
        OutputStream {
            dest: self.dest.clone(),
        }
    }

    /// Create a stream that error output can be written to, rather than
    /// regular output.
    pub fn get_error_stream(&self) -> ErrorStream {
        ErrorStream {
            dest: self.dest.clone(),
        }
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle to stdout.
pub struct OutputStream {
    dest: OutputDest,
}

impl Write for OutputStream {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        match &self.dest {
            OutputDest::Console => {
                let mut stream: Stdout = io::stdout();
                write!(stream, "{s}").unwrap();
                stream.flush().unwrap();
            }

            OutputDest::Suppress => {
                // Do nothing.
            }

            OutputDest::BufferForTest { stdout, stderr: _ } => {
                let mut buffer = stdout.lock().unwrap();
                write!(buffer, "{s}").unwrap();
            }
        }
        Ok(())
    }
}

/// A handle to stderr.
pub struct ErrorStream {
    dest: OutputDest,
}

impl Write for ErrorStream {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        match &self.dest {
            OutputDest::Console => {
                let mut stream: Stderr = io::stderr();
                write!(stream, "{s}").unwrap();
                stream.flush().unwrap();
            }

            OutputDest::Suppress => {
                // Do nothing.
            }

            OutputDest::BufferForTest { stdout: _, stderr } => {
                let mut buffer = stderr.lock().unwrap();
                write!(buffer, "{s}").unwrap();
            }
        }
        Ok(())
    }
}

/// You probably don't want this. This implementation is only for `tracing`'s
/// `fmt_layer`, because it needs a writer of type `io::Write`, but `Effects`
/// normally uses its implementation of `fmt::Write`.
impl io::Write for ErrorStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.dest {
            OutputDest::Console => {
                let mut stream = io::stderr();
                stream.write_all(buf)?;
                Ok(buf.len())
            }
            OutputDest::Suppress => {
                // Do nothing.
                Ok(buf.len())
            }
            OutputDest::BufferForTest { stdout: _, stderr } => {
                let mut buffer = stderr.lock().unwrap();
                buffer.write(buf)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.dest {
            OutputDest::Console => io::stderr().flush(),
            OutputDest::Suppress | OutputDest::BufferForTest { .. } => Ok(()),
        }
    }
}

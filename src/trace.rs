use std::io::{self, Write};

/// Wire-level diagnostic streams.
///
/// Outgoing request lines are shown as `> ...` and incoming response lines as
/// `< ...` on the verbose sink. With `-I` the raw response head is also
/// echoed to the head sink (stdout).
pub struct Trace {
    verbose: Option<Box<dyn Write>>,
    head: Option<Box<dyn Write>>,
}

impl Trace {
    /// Trace to stderr when `verbose`, echo response heads to stdout when `head`.
    pub fn new(verbose: bool, head: bool) -> Self {
        Self {
            verbose: verbose.then(|| Box::new(io::stderr()) as Box<dyn Write>),
            head: head.then(|| Box::new(io::stdout()) as Box<dyn Write>),
        }
    }

    /// Discard everything.
    pub fn silent() -> Self {
        Self {
            verbose: None,
            head: None,
        }
    }

    pub fn with_sinks(verbose: Option<Box<dyn Write>>, head: Option<Box<dyn Write>>) -> Self {
        Self { verbose, head }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.is_some()
    }

    pub fn outgoing(&mut self, line: &str) {
        if let Some(w) = self.verbose.as_mut() {
            let _ = writeln!(w, "> {}", line);
        }
    }

    pub fn incoming(&mut self, line: &str) {
        if let Some(w) = self.verbose.as_mut() {
            let _ = writeln!(w, "< {}", line);
        }
        if let Some(w) = self.head.as_mut() {
            let _ = write!(w, "{}\r\n", line);
        }
    }

    pub fn flush(&mut self) {
        for w in [self.verbose.as_mut(), self.head.as_mut()].into_iter().flatten() {
            let _ = w.flush();
        }
    }
}

//! User-facing progress output
//!
//! Progress goes to stdout and errors to stderr, separate from the tracing
//! log stream. Errors are drawn bold white on red when stderr is a
//! terminal.

use std::io::{self, IsTerminal, Write};

const ERROR_STYLE: &str = "\x1b[1;37;41m";
const RESET_STYLE: &str = "\x1b[0m";

/// Progress and error sink for a run
pub struct Console {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    styled: bool,
    marks_pending: bool,
}

impl Console {
    /// Console writing to the process's stdout and stderr
    pub fn stdio() -> Self {
        let styled = io::stderr().is_terminal();
        Self::with_writers(Box::new(io::stdout()), Box::new(io::stderr()), styled)
    }

    /// Console that discards everything
    pub fn silent() -> Self {
        Self::with_writers(Box::new(io::sink()), Box::new(io::sink()), false)
    }

    pub fn with_writers(
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        styled: bool,
    ) -> Self {
        Self {
            out,
            err,
            styled,
            marks_pending: false,
        }
    }

    /// Prints one progress line
    pub fn info(&mut self, message: &str) {
        self.end_marks();
        let _ = writeln!(self.out, "{}", message);
    }

    /// Prints one error line
    pub fn error(&mut self, message: &str) {
        self.end_marks();
        let _ = self.out.flush();
        let _ = if self.styled {
            writeln!(self.err, "{}{}{}", ERROR_STYLE, message, RESET_STYLE)
        } else {
            writeln!(self.err, "{}", message)
        };
    }

    /// Prints a single progress character without a newline
    pub fn mark(&mut self, mark: char) {
        let _ = write!(self.out, "{}", mark);
        let _ = self.out.flush();
        self.marks_pending = true;
    }

    /// Terminates a row of marks, if one is open
    pub fn end_marks(&mut self) {
        if self.marks_pending {
            let _ = writeln!(self.out);
            self.marks_pending = false;
        }
    }

    /// Prints one row of the site listing
    pub fn site_row(&mut self, site_name: &str, cleaned: &str, site_url: &str) {
        self.info(&format_site_row(site_name, cleaned, site_url));
    }
}

/// Site name padded to 70 columns, cleaned name to 40, then the URL
pub fn format_site_row(site_name: &str, cleaned: &str, site_url: &str) -> String {
    format!("{:<70}{:<40}{}", site_name, cleaned, site_url)
}

//! Terminal output: styled status lines, JSON and streamed component output.

pub mod echo;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::{OwoColorize as _, Style};
pub use echo::ComponentEcho;
pub use reporter::TerminalReporter;
pub use styles::Styles;

/// Styling and terminal state shared by every command.
///
/// Status lines go to stdout and are dropped when `quiet`; errors go to
/// stderr and are always printed.
pub struct OutputContext {
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    pub quiet: bool,
}

impl OutputContext {
    /// Colors are used only on a TTY, and never when `no_color` or
    /// `NO_COLOR` is set.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let colored = is_tty && !no_color && std::env::var_os("NO_COLOR").is_none();
        Self {
            styles: if colored {
                Styles::colored()
            } else {
                Styles::default()
            },
            is_tty,
            quiet,
        }
    }

    /// Spinners only make sense on an interactive, non-quiet terminal.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    fn status(&self, mark: &str, style: Style, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", mark.style(style));
        }
    }

    pub fn success(&self, msg: &str) {
        self.status("✓", self.styles.success, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.status("⚠", self.styles.warning, msg);
    }

    pub fn info(&self, msg: &str) {
        self.status("ℹ", self.styles.info, msg);
    }

    /// Printed to stderr, even when `quiet`.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// `key` is dimmed; callers pad it for alignment.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }

    /// Line-prefixing echo for streamed component output.
    #[must_use]
    pub fn echo(&self) -> ComponentEcho {
        ComponentEcho::new(self.styles.clone())
    }
}

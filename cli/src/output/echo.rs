//! Prefixes streamed component output with `[kind]` at every line start.
//!
//! Output arrives in arbitrary chunks, so whether the next chunk begins a
//! new line is remembered per kind.

use owo_colors::OwoColorize as _;
use tilewall_common::ComponentKind;

use crate::output::Styles;

pub struct ComponentEcho {
    at_line_start: [bool; ComponentKind::ALL.len()],
    styles: Styles,
}

impl ComponentEcho {
    #[must_use]
    pub fn new(styles: Styles) -> Self {
        Self {
            at_line_start: [true; ComponentKind::ALL.len()],
            styles,
        }
    }

    /// Render one chunk of `kind`'s output for the terminal.
    pub fn render(&mut self, kind: ComponentKind, text: &str) -> String {
        let prefix = format!("[{kind}]");
        let at_start = &mut self.at_line_start[kind as usize];
        let mut out = String::with_capacity(text.len() + prefix.len() + 1);
        for piece in text.split_inclusive('\n') {
            if *at_start && piece != "\n" {
                out.push_str(&format!("{} ", prefix.style(self.styles.component)));
            }
            out.push_str(piece);
            *at_start = piece.ends_with('\n');
        }
        out
    }
}

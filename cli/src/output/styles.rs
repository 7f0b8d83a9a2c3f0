//! Stylesheet for terminal output.

use owo_colors::Style;

/// Colors used by the output context. `Styles::default()` is the plain
/// (uncolored) sheet.
#[derive(Default, Clone)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    pub dim: Style,
    /// Section titles such as a component's label in `config show`.
    pub header: Style,
    /// `[kind]` prefix of streamed component output.
    pub component: Style,
}

impl Styles {
    /// The colored sheet.
    #[must_use]
    pub fn colored() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red(),
            info: Style::new().blue(),
            dim: Style::new().dimmed(),
            header: Style::new().bold().cyan(),
            component: Style::new().magenta(),
        }
    }
}

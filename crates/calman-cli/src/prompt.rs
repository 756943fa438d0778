//! Interactive field input.
//!
//! [`TtyPrompt`] is the production [`FieldSource`]: one dialoguer prompt
//! per field definition. Required fields use dialoguer's own re-prompt on
//! empty input; fields with a default or keep-current blank policy accept
//! an empty answer and let the collector resolve it.

use dialoguer::{Input, theme::ColorfulTheme};

use calman_core::field::{BlankPolicy, FieldDef, FieldSource};

/// Prompts on the terminal, one field at a time.
pub struct TtyPrompt {
    theme: ColorfulTheme,
}

impl TtyPrompt {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TtyPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldSource for TtyPrompt {
    fn read(&mut self, def: &FieldDef) -> std::io::Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(def.label)
            .allow_empty(allows_blank(def))
            .interact_text()
    }
}

/// Whether an empty answer is meaningful for this field.
fn allows_blank(def: &FieldDef) -> bool {
    !matches!(def.blank, BlankPolicy::Required)
}

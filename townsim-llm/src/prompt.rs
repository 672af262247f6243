//! Prompt templates for conversation turns.
//!
//! One template per conversation phase. Built-in templates are compiled in;
//! a TOML file can override any of them:
//!
//! ```toml
//! [prompts]
//! start = "You are {speaker}. ..."
//! leave = "..."
//! ```
//!
//! Placeholders: `{speaker}`, `{identity}`, `{listener}`, `{history}`.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::LlmError;

/// Opening line.
pub const START_TEMPLATE: &str = r"You are {speaker}. {identity}
You just ran into {listener} while walking through town.
Say one short, natural opening line to {listener}. Stay in character.
Reply with the spoken line only.
{speaker}:";

/// A line in the middle of a conversation.
pub const CONTINUE_TEMPLATE: &str = r"You are {speaker}. {identity}
You are chatting with {listener}. The conversation so far:
{history}
Reply to {listener} with one short line that keeps the conversation going. Stay in character.
Reply with the spoken line only.
{speaker}:";

/// The final line.
pub const LEAVE_TEMPLATE: &str = r"You are {speaker}. {identity}
You are chatting with {listener}. The conversation so far:
{history}
It is time to go. Say one short, friendly goodbye to {listener}. Stay in character.
Reply with the spoken line only.
{speaker}:";

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value in a single left-to-right
/// pass. Substituted values are not scanned again, and unknown
/// placeholders are left intact.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        result.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (*value, close))
        });
        match hit {
            Some((value, close)) => {
                result.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                result.push('{');
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}

/// Which template a turn uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// Opening line.
    Start,
    /// Middle of the conversation.
    Continue,
    /// Farewell.
    Leave,
}

impl PromptKind {
    /// All prompt kinds.
    #[must_use]
    pub fn all() -> &'static [PromptKind] {
        &[Self::Start, Self::Continue, Self::Leave]
    }

    fn builtin(self) -> &'static str {
        match self {
            Self::Start => START_TEMPLATE,
            Self::Continue => CONTINUE_TEMPLATE,
            Self::Leave => LEAVE_TEMPLATE,
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Continue => "continue",
            Self::Leave => "leave",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PromptKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "continue" => Ok(Self::Continue),
            "leave" => Ok(Self::Leave),
            _ => Err(format!("unknown prompt kind: '{s}'")),
        }
    }
}

/// Values substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct PromptVars<'a> {
    /// Speaking agent's name.
    pub speaker: &'a str,
    /// Speaking agent's personality text.
    pub identity: &'a str,
    /// Listening agent's name.
    pub listener: &'a str,
    /// Recent messages as `Name: text` lines.
    pub history: &'a str,
}

#[derive(Debug, Deserialize)]
struct TomlPromptFile {
    #[serde(default)]
    prompts: TomlPrompts,
}

#[derive(Debug, Default, Deserialize)]
struct TomlPrompts {
    start: Option<String>,
    #[serde(rename = "continue")]
    continuing: Option<String>,
    leave: Option<String>,
}

/// The active set of templates.
#[derive(Debug, Clone)]
pub struct PromptSet {
    templates: HashMap<PromptKind, String>,
}

impl PromptSet {
    /// The compiled-in templates.
    #[must_use]
    pub fn builtin() -> Self {
        let templates = PromptKind::all()
            .iter()
            .map(|k| (*k, k.builtin().to_string()))
            .collect();
        Self { templates }
    }

    /// Built-ins overridden by whatever a TOML document provides.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the document does not parse.
    pub fn from_toml_str(content: &str) -> Result<Self, LlmError> {
        let parsed: TomlPromptFile =
            toml::from_str(content).map_err(|e| LlmError::ConfigError(e.to_string()))?;
        let mut set = Self::builtin();
        let overrides = [
            (PromptKind::Start, parsed.prompts.start),
            (PromptKind::Continue, parsed.prompts.continuing),
            (PromptKind::Leave, parsed.prompts.leave),
        ];
        for (kind, template) in overrides {
            if let Some(t) = template {
                set.templates.insert(kind, t);
            }
        }
        Ok(set)
    }

    /// Load overrides from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the file cannot be read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, LlmError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LlmError::ConfigError(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Template text for `kind`.
    #[must_use]
    pub fn get(&self, kind: PromptKind) -> &str {
        self.templates
            .get(&kind)
            .map_or_else(|| kind.builtin(), String::as_str)
    }

    /// Render the template for `kind`.
    #[must_use]
    pub fn render(&self, kind: PromptKind, vars: &PromptVars<'_>) -> String {
        render_template(
            self.get(kind),
            &[
                ("speaker", vars.speaker),
                ("identity", vars.identity),
                ("listener", vars.listener),
                ("history", vars.history),
            ],
        )
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> PromptVars<'static> {
        PromptVars {
            speaker: "Rosa",
            identity: "Rosa runs the bakery.",
            listener: "Finn",
            history: "Finn: Smells great in here!",
        }
    }

    #[test]
    fn template_rendering_works() {
        let rendered = render_template(
            "Hello {name}, you are a {role}.",
            &[("name", "Rosa"), ("role", "baker")],
        );
        assert_eq!(rendered, "Hello Rosa, you are a baker.");
    }

    #[test]
    fn template_handles_missing_vars() {
        let rendered = render_template("Hello {name}, {unknown}.", &[("name", "Rosa")]);
        assert_eq!(rendered, "Hello Rosa, {unknown}.");
    }

    #[test]
    fn substituted_values_are_not_rendered_again() {
        let rendered = render_template("{a} {b}", &[("a", "{b}"), ("b", "x")]);
        assert_eq!(rendered, "{b} x");
        let rendered = render_template("{{name}} {name", &[("name", "Rosa")]);
        assert_eq!(rendered, "{Rosa} {name");

        let set = PromptSet::builtin();
        let prompt = set.render(
            PromptKind::Start,
            &PromptVars {
                speaker: "Rosa",
                identity: "Rosa always greets {listener} by name.",
                listener: "Finn",
                history: "",
            },
        );
        assert!(prompt.contains("Rosa always greets {listener} by name."));
    }

    #[test]
    fn prompt_kind_from_str_round_trip() {
        for kind in PromptKind::all() {
            let parsed: PromptKind = kind.to_string().parse().expect("should parse");
            assert_eq!(*kind, parsed);
        }
        assert!("shout".parse::<PromptKind>().is_err());
    }

    #[test]
    fn builtin_renders_every_placeholder() {
        let set = PromptSet::builtin();
        for kind in PromptKind::all() {
            let prompt = set.render(*kind, &vars());
            assert!(prompt.contains("Rosa"));
            assert!(prompt.contains("Finn"));
            assert!(!prompt.contains('{'), "{kind} left a placeholder: {prompt}");
        }
    }

    #[test]
    fn start_prompt_has_no_history() {
        let prompt = PromptSet::builtin().render(PromptKind::Start, &vars());
        assert!(!prompt.contains("Smells great"));
        assert!(prompt.ends_with("Rosa:"));
    }

    #[test]
    fn toml_overrides_only_given_templates() {
        let set = PromptSet::from_toml_str(
            r#"
            [prompts]
            leave = "{speaker} waves goodbye to {listener}."
            "#,
        )
        .expect("parse");
        assert_eq!(set.render(PromptKind::Leave, &vars()), "Rosa waves goodbye to Finn.");
        assert_eq!(set.get(PromptKind::Start), START_TEMPLATE);
    }

    #[test]
    fn empty_toml_keeps_builtins() {
        let set = PromptSet::from_toml_str("").expect("parse");
        assert_eq!(set.get(PromptKind::Continue), CONTINUE_TEMPLATE);
    }

    #[test]
    fn bad_toml_is_config_error() {
        assert!(matches!(
            PromptSet::from_toml_str("[prompts\nstart = 1"),
            Err(LlmError::ConfigError(_))
        ));
        assert!(PromptSet::from_toml_file("/nonexistent/townsim/prompts.toml").is_err());
    }
}

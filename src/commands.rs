//! Shell commands bound to keys from the `[commands]` config table.
//!
//! A template may refer to the focused reminder through `{id}`, `{title}`,
//! `{list}` and `{notes}`. Substituted values are single-quoted for the shell.
//! Any other braces are passed through untouched.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::io::ErrorKind;
use std::process::{Command, Stdio};
use std::time::Duration;

use crossterm::event::KeyEvent;
use tracing::{debug, warn};

use crate::keybindings::{KeyBinding, Keybindings, parse_binding};
use crate::provider::wait_with_timeout;
use crate::types::Item;

const FALLBACK_SHELL: &str = "sh";
const PLACEHOLDERS: [&str; 4] = ["id", "title", "list", "notes"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The template refers to a reminder but nothing is focused.
    NoReminder,
    /// The shell could not be started.
    Spawn(String),
    /// The command exited unsuccessfully or ran past the timeout.
    Failed(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoReminder => write!(f, "command needs a selected reminder"),
            Self::Spawn(detail) => write!(f, "failed to start command: {detail}"),
            Self::Failed(detail) => write!(f, "command failed: {detail}"),
        }
    }
}

impl std::error::Error for CommandError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomCommand {
    pub binding: KeyBinding,
    pub template: String,
}

/// Parses the `[commands]` table. Entries with an unreadable key, an empty
/// template, or a key already taken by a built-in action are skipped.
pub fn parse_commands(
    raw: &BTreeMap<String, String>,
    keybindings: &Keybindings,
) -> Vec<CustomCommand> {
    let mut commands = Vec::with_capacity(raw.len());
    for (key, template) in raw {
        let Some(binding) = parse_binding(key) else {
            warn!("invalid key '{}' in [commands]; skipping", key);
            continue;
        };
        if template.trim().is_empty() {
            warn!("empty command for key '{}'; skipping", key);
            continue;
        }
        let event = KeyEvent::new(binding.code, binding.modifiers);
        if let Some(action) = keybindings.action_for_key(event) {
            warn!(
                "command key '{}' is already bound to {:?}; skipping",
                key, action
            );
            continue;
        }
        commands.push(CustomCommand {
            binding,
            template: template.clone(),
        });
    }
    commands
}

pub fn command_for_key(commands: &[CustomCommand], key: KeyEvent) -> Option<&CustomCommand> {
    commands.iter().find(|command| command.binding.matches(key))
}

/// Fills the reminder placeholders in `template`.
pub fn render_command(template: &str, item: Option<&Item>) -> Result<String, CommandError> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let name = after
            .find('}')
            .map(|close| &after[..close])
            .filter(|name| PLACEHOLDERS.contains(name));

        match name {
            Some(name) => {
                let item = item.ok_or(CommandError::NoReminder)?;
                let value = match name {
                    "id" => &item.external_ref,
                    "title" => &item.title,
                    "list" => &item.category,
                    _ => &item.notes,
                };
                rendered.push_str(&shell_quote(value));
                rest = &after[name.len() + 1..];
            }
            None => {
                rendered.push('{');
                rest = after;
            }
        }
    }
    rendered.push_str(rest);
    Ok(rendered)
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Runs `command` through `$SHELL -c`, falling back to `sh`. Returns the first
/// line the command printed, if any.
pub fn run_shell(command: &str, timeout: Duration) -> Result<Option<String>, CommandError> {
    let shell = env::var("SHELL")
        .ok()
        .filter(|shell| !shell.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_SHELL.to_string());
    debug!(%shell, command, "running custom command");

    let child = Command::new(&shell)
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|error| match error.kind() {
            ErrorKind::NotFound => CommandError::Spawn(format!("shell '{shell}' not found")),
            _ => CommandError::Spawn(error.to_string()),
        })?;

    let output = wait_with_timeout(child, timeout).map_err(CommandError::Failed)?;
    if !output.success {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            format!("exited with {}", output.code)
        } else {
            stderr
        };
        return Err(CommandError::Failed(detail));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn item() -> Item {
        Item {
            external_ref: "x-id-1".to_string(),
            title: "Call Bob's office".to_string(),
            notes: String::new(),
            category: "Work".to_string(),
            due: None,
            priority: 0,
            completed: false,
        }
    }

    #[test]
    fn placeholders_are_quoted_for_the_shell() {
        let rendered = render_command("open {id} --title {title} ({list})", Some(&item()))
            .expect("item is focused");
        assert_eq!(
            rendered,
            r#"open 'x-id-1' --title 'Call Bob'\''s office' ('Work')"#
        );
    }

    #[test]
    fn unknown_braces_pass_through() {
        let rendered = render_command("echo ${HOME} {} {nope", None).expect("no placeholders");
        assert_eq!(rendered, "echo ${HOME} {} {nope");
    }

    #[test]
    fn placeholder_without_focus_is_an_error() {
        assert_eq!(
            render_command("echo {title}", None),
            Err(CommandError::NoReminder)
        );
    }

    #[test]
    fn builtin_keys_and_bad_bindings_are_skipped() {
        let keybindings = Keybindings::from_overrides(&Default::default());
        let raw = BTreeMap::from([
            ("o".to_string(), "open {id}".to_string()),
            ("q".to_string(), "echo shadowed".to_string()),
            ("ctrl+".to_string(), "echo broken".to_string()),
            ("ctrl+y".to_string(), "  ".to_string()),
        ]);

        let commands = parse_commands(&raw, &keybindings);

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].template, "open {id}");
        let key = KeyEvent::new(KeyCode::Char('o'), KeyModifiers::NONE);
        assert!(command_for_key(&commands, key).is_some());
        let other = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::NONE);
        assert!(command_for_key(&commands, other).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn shell_output_and_failures_are_reported() {
        let timeout = Duration::from_secs(5);
        assert_eq!(
            run_shell("printf '\\nhello\\nworld'", timeout),
            Ok(Some("hello".to_string()))
        );
        assert_eq!(run_shell("true", timeout), Ok(None));

        let error = run_shell("echo nope >&2; exit 3", timeout).expect_err("exit 3 fails");
        assert_eq!(error, CommandError::Failed("nope".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn slow_command_times_out() {
        let error = run_shell("sleep 5", Duration::from_millis(100)).expect_err("too slow");
        assert!(matches!(error, CommandError::Failed(detail) if detail.contains("timed out")));
    }
}

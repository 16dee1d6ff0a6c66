//! Keyboard and pointer interpretation for the clipboard list.
//!
//! [`interpret`] is pure: it maps one key press in a given context onto at most
//! one [`NavCommand`] plus a prevent-default decision. Applying the command is
//! the session's job.

use crate::time::GroupSpan;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Space,
    Escape,
    Tab,
    Char(char),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    /// Ctrl on Windows/Linux, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
    /// An IME composition is in progress.
    pub composing: bool,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
            composing: false,
        }
    }

    pub fn with_command(mut self) -> Self {
        self.modifiers.ctrl = true;
        self
    }

    pub fn composing(mut self) -> Self {
        self.composing = true;
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized key: {0}")]
pub struct ParseKeyError(String);

impl FromStr for KeyInput {
    type Err = ParseKeyError;

    /// Accepts `down`, `space`, `ctrl+c`, `cmd+,` and similar.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::default();
        let mut parts: Vec<&str> = s.split('+').collect();
        // a trailing "+" leaves no key name
        let Some(name) = parts.pop().filter(|name| !name.is_empty()) else {
            return Err(ParseKeyError(s.to_string()));
        };

        for part in parts {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "cmd" | "meta" | "super" => modifiers.meta = true,
                "shift" => modifiers.shift = true,
                "alt" | "option" => modifiers.alt = true,
                _ => return Err(ParseKeyError(s.to_string())),
            }
        }

        let key = match name.to_ascii_lowercase().as_str() {
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            "enter" | "return" => Key::Enter,
            "space" => Key::Space,
            "esc" | "escape" => Key::Escape,
            "tab" => Key::Tab,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => return Err(ParseKeyError(s.to_string())),
                }
            }
        };

        Ok(Self {
            key,
            modifiers,
            composing: false,
        })
    }
}

/// Where keyboard focus currently sits.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    List,
    /// The search input is focused; typing goes to it.
    Input,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavCommand {
    Select(usize),
    FocusSearch,
    BlurSearch,
    Paste,
    Copy,
    TogglePreview,
    ClosePreview,
    HideWindow,
    OpenSettings,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyOutcome {
    /// Suppress the host's native handling of the key.
    pub prevent_default: bool,
    pub command: Option<NavCommand>,
}

impl KeyOutcome {
    fn pass() -> Self {
        Self {
            prevent_default: false,
            command: None,
        }
    }

    fn swallow() -> Self {
        Self {
            prevent_default: true,
            command: None,
        }
    }

    fn run(command: NavCommand) -> Self {
        Self {
            prevent_default: true,
            command: Some(command),
        }
    }
}

pub struct NavContext<'a> {
    pub focus: Focus,
    pub preview_open: bool,
    pub selected: usize,
    pub len: usize,
    pub groups: &'a [GroupSpan],
}

impl NavContext<'_> {
    fn current_group(&self) -> usize {
        self.groups
            .iter()
            .position(|span| span.contains(self.selected))
            .unwrap_or(0)
    }

    fn paste(&self) -> KeyOutcome {
        if self.preview_open || self.len == 0 {
            KeyOutcome::swallow()
        } else {
            KeyOutcome::run(NavCommand::Paste)
        }
    }
}

pub fn interpret(ctx: &NavContext<'_>, input: &KeyInput) -> KeyOutcome {
    if input.composing {
        return KeyOutcome::pass();
    }
    if input.key == Key::Tab {
        return KeyOutcome::swallow();
    }

    if input.modifiers.command() {
        match input.key {
            Key::Char('f') | Key::Char('F') => return KeyOutcome::run(NavCommand::FocusSearch),
            Key::Char(',') => return KeyOutcome::run(NavCommand::OpenSettings),
            Key::Char('c') | Key::Char('C') if ctx.focus == Focus::List => {
                return if ctx.len == 0 {
                    KeyOutcome::swallow()
                } else {
                    KeyOutcome::run(NavCommand::Copy)
                };
            }
            _ => {}
        }
    }

    match ctx.focus {
        Focus::Input => match input.key {
            Key::Down | Key::Escape => KeyOutcome::run(NavCommand::BlurSearch),
            Key::Enter => ctx.paste(),
            _ => KeyOutcome::pass(),
        },
        Focus::List => interpret_list(ctx, input.key),
    }
}

fn interpret_list(ctx: &NavContext<'_>, key: Key) -> KeyOutcome {
    match key {
        Key::Right => {
            if ctx.len == 0 {
                return KeyOutcome::swallow();
            }
            KeyOutcome::run(NavCommand::Select((ctx.selected + 1).min(ctx.len - 1)))
        }
        Key::Left => {
            if ctx.len == 0 {
                return KeyOutcome::swallow();
            }
            KeyOutcome::run(NavCommand::Select(ctx.selected.saturating_sub(1)))
        }
        Key::Down => match ctx.groups.get(ctx.current_group() + 1) {
            Some(next) => KeyOutcome::run(NavCommand::Select(next.start)),
            None => KeyOutcome::swallow(),
        },
        Key::Up => match ctx.current_group() {
            0 => KeyOutcome::run(NavCommand::FocusSearch),
            group => KeyOutcome::run(NavCommand::Select(ctx.groups[group - 1].start)),
        },
        Key::Enter => ctx.paste(),
        Key::Space => {
            if ctx.len == 0 && !ctx.preview_open {
                return KeyOutcome::swallow();
            }
            KeyOutcome::run(NavCommand::TogglePreview)
        }
        Key::Escape => {
            if ctx.preview_open {
                KeyOutcome::run(NavCommand::ClosePreview)
            } else {
                KeyOutcome::run(NavCommand::HideWindow)
            }
        }
        _ => KeyOutcome::pass(),
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

/// A pointer-down on a card.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerPress {
    pub is_primary: bool,
    pub kind: PointerKind,
    pub button: u8,
}

impl PointerPress {
    /// Secondary pointers never activate; mice only with the main button.
    pub fn activates(&self) -> bool {
        if !self.is_primary {
            return false;
        }
        match self.kind {
            PointerKind::Mouse => self.button == 0,
            PointerKind::Touch | PointerKind::Pen => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::DateGroup;

    // groups: [0, 1, 2] [3, 4] [5]
    fn spans() -> Vec<GroupSpan> {
        vec![
            GroupSpan {
                group: DateGroup::Today,
                start: 0,
                len: 3,
            },
            GroupSpan {
                group: DateGroup::Yesterday,
                start: 3,
                len: 2,
            },
            GroupSpan {
                group: DateGroup::ThisWeek,
                start: 5,
                len: 1,
            },
        ]
    }

    fn ctx(groups: &[GroupSpan], focus: Focus, selected: usize, preview_open: bool) -> NavContext<'_> {
        NavContext {
            focus,
            preview_open,
            selected,
            len: 6,
            groups,
        }
    }

    fn press(ctx: &NavContext<'_>, key: Key) -> KeyOutcome {
        interpret(ctx, &KeyInput::new(key))
    }

    #[test]
    fn horizontal_moves_are_clamped() {
        let groups = spans();
        assert_eq!(
            press(&ctx(&groups, Focus::List, 5, false), Key::Right).command,
            Some(NavCommand::Select(5))
        );
        assert_eq!(
            press(&ctx(&groups, Focus::List, 0, false), Key::Left).command,
            Some(NavCommand::Select(0))
        );
        assert_eq!(
            press(&ctx(&groups, Focus::List, 2, false), Key::Right).command,
            Some(NavCommand::Select(3))
        );
    }

    #[test]
    fn down_jumps_to_next_group_start() {
        let groups = spans();
        assert_eq!(
            press(&ctx(&groups, Focus::List, 2, false), Key::Down).command,
            Some(NavCommand::Select(3))
        );
        assert_eq!(
            press(&ctx(&groups, Focus::List, 4, false), Key::Down).command,
            Some(NavCommand::Select(5))
        );
        let last = press(&ctx(&groups, Focus::List, 5, false), Key::Down);
        assert!(last.prevent_default);
        assert_eq!(last.command, None);
    }

    #[test]
    fn up_from_first_group_focuses_search() {
        let groups = spans();
        assert_eq!(
            press(&ctx(&groups, Focus::List, 0, false), Key::Up).command,
            Some(NavCommand::FocusSearch)
        );
        assert_eq!(
            press(&ctx(&groups, Focus::List, 2, false), Key::Up).command,
            Some(NavCommand::FocusSearch)
        );
        assert_eq!(
            press(&ctx(&groups, Focus::List, 4, false), Key::Up).command,
            Some(NavCommand::Select(0))
        );
    }

    #[test]
    fn enter_pastes_only_while_preview_closed() {
        let groups = spans();
        assert_eq!(
            press(&ctx(&groups, Focus::List, 1, false), Key::Enter).command,
            Some(NavCommand::Paste)
        );
        let open = press(&ctx(&groups, Focus::List, 1, true), Key::Enter);
        assert!(open.prevent_default);
        assert_eq!(open.command, None);
    }

    #[test]
    fn space_and_escape_follow_preview_state() {
        let groups = spans();
        assert_eq!(
            press(&ctx(&groups, Focus::List, 0, false), Key::Space).command,
            Some(NavCommand::TogglePreview)
        );
        assert_eq!(
            press(&ctx(&groups, Focus::List, 0, true), Key::Escape).command,
            Some(NavCommand::ClosePreview)
        );
        assert_eq!(
            press(&ctx(&groups, Focus::List, 0, false), Key::Escape).command,
            Some(NavCommand::HideWindow)
        );
    }

    #[test]
    fn input_focus_intercepts_only_down_escape_enter() {
        let groups = spans();
        let input = ctx(&groups, Focus::Input, 0, false);
        assert_eq!(press(&input, Key::Down).command, Some(NavCommand::BlurSearch));
        assert_eq!(press(&input, Key::Escape).command, Some(NavCommand::BlurSearch));
        assert_eq!(press(&input, Key::Enter).command, Some(NavCommand::Paste));
        assert_eq!(press(&input, Key::Up), KeyOutcome::pass());
        assert_eq!(press(&input, Key::Space), KeyOutcome::pass());
        assert_eq!(press(&input, Key::Char('x')), KeyOutcome::pass());
        assert_eq!(
            interpret(&input, &KeyInput::new(Key::Char('c')).with_command()),
            KeyOutcome::pass()
        );
    }

    #[test]
    fn global_shortcuts() {
        let groups = spans();
        for focus in [Focus::List, Focus::Input] {
            let c = ctx(&groups, focus, 0, false);
            assert_eq!(press(&c, Key::Tab), KeyOutcome::swallow());
            assert_eq!(
                interpret(&c, &KeyInput::new(Key::Char('f')).with_command()).command,
                Some(NavCommand::FocusSearch)
            );
            assert_eq!(
                interpret(&c, &KeyInput::new(Key::Char(',')).with_command()).command,
                Some(NavCommand::OpenSettings)
            );
        }
        assert_eq!(
            interpret(
                &ctx(&groups, Focus::List, 0, false),
                &KeyInput::new(Key::Char('c')).with_command()
            )
            .command,
            Some(NavCommand::Copy)
        );
    }

    #[test]
    fn composition_suppresses_everything() {
        let groups = spans();
        for key in [Key::Enter, Key::Down, Key::Tab, Key::Escape, Key::Space] {
            let outcome = interpret(
                &ctx(&groups, Focus::List, 0, false),
                &KeyInput::new(key).composing(),
            );
            assert_eq!(outcome, KeyOutcome::pass());
        }
    }

    #[test]
    fn empty_list_never_selects() {
        let empty = NavContext {
            focus: Focus::List,
            preview_open: false,
            selected: 0,
            len: 0,
            groups: &[],
        };
        assert_eq!(press(&empty, Key::Right).command, None);
        assert_eq!(press(&empty, Key::Enter).command, None);
        assert_eq!(press(&empty, Key::Space).command, None);
        assert_eq!(press(&empty, Key::Up).command, Some(NavCommand::FocusSearch));
    }

    #[test]
    fn parses_key_names() {
        let copy: KeyInput = "ctrl+c".parse().unwrap();
        assert_eq!(copy.key, Key::Char('c'));
        assert!(copy.modifiers.command());

        let settings: KeyInput = "cmd+,".parse().unwrap();
        assert!(settings.modifiers.meta);
        assert_eq!(settings.key, Key::Char(','));

        assert_eq!("Down".parse::<KeyInput>().unwrap().key, Key::Down);
        assert!("hyper+x".parse::<KeyInput>().is_err());
        assert!("ctrl+".parse::<KeyInput>().is_err());
    }

    #[test]
    fn pointer_press_activation() {
        let mouse = |button| PointerPress {
            is_primary: true,
            kind: PointerKind::Mouse,
            button,
        };
        assert!(mouse(0).activates());
        assert!(!mouse(2).activates());
        assert!(PointerPress {
            is_primary: true,
            kind: PointerKind::Touch,
            button: 0,
        }
        .activates());
        assert!(!PointerPress {
            is_primary: false,
            kind: PointerKind::Pen,
            button: 0,
        }
        .activates());
    }
}

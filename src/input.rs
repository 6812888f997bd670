use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Browse,
    Filter,
    ExecInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Select,
    Back,
    ExecRequested,
    Down,
    Up,
    PageDown,
    PageUp,
    Top,
    Bottom,
    StartFilter,
    SubmitInput,
    CancelInput,
    Backspace,
    InputChar(char),
    ToggleTitle,
    ToggleStatusBar,
    TogglePagination,
    ToggleHelp,
}

/// Rebindable navigation keys, stored as normalized hotkey signatures.
#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: HashMap<String, Action>,
}

#[derive(Debug, Clone, Default)]
pub struct KeyOverrides {
    pub select: Option<Vec<String>>,
    pub back: Option<Vec<String>>,
    pub exec: Option<Vec<String>>,
    pub quit: Option<Vec<String>>,
    pub filter: Option<Vec<String>>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::from_overrides(&KeyOverrides::default())
    }
}

impl KeyMap {
    pub fn from_overrides(overrides: &KeyOverrides) -> Self {
        let mut bindings = HashMap::new();
        bind(&mut bindings, &overrides.select, &["enter"], Action::Select);
        bind(
            &mut bindings,
            &overrides.back,
            &["ctrl+h", "esc", "backspace"],
            Action::Back,
        );
        bind(&mut bindings, &overrides.exec, &["e"], Action::ExecRequested);
        bind(&mut bindings, &overrides.quit, &["q", "ctrl+c"], Action::Quit);
        bind(&mut bindings, &overrides.filter, &["/"], Action::StartFilter);

        Self { bindings }
    }

    fn lookup(&self, key: KeyEvent) -> Option<Action> {
        let signature = key_event_signature(key)?;
        self.bindings.get(&signature).cloned()
    }

    /// First key bound to `action`, for help text.
    pub fn label_for(&self, action: &Action) -> Option<String> {
        let mut labels = self
            .bindings
            .iter()
            .filter(|(_, bound)| *bound == action)
            .map(|(signature, _)| signature.clone())
            .collect::<Vec<_>>();
        labels.sort();
        labels.into_iter().next()
    }
}

fn bind(
    bindings: &mut HashMap<String, Action>,
    configured: &Option<Vec<String>>,
    fallback: &[&str],
    action: Action,
) {
    let specs = match configured {
        Some(specs) => specs.clone(),
        None => fallback.iter().map(|spec| spec.to_string()).collect(),
    };
    for spec in specs {
        match normalize_hotkey_spec(&spec) {
            Some(signature) => {
                bindings.insert(signature, action.clone());
            }
            None => warn!("ignoring invalid hotkey '{spec}' for {action:?}"),
        }
    }
}

pub fn map_key(mode: InputMode, keymap: &KeyMap, key: KeyEvent) -> Option<Action> {
    match mode {
        InputMode::Browse => map_browse_key(keymap, key),
        InputMode::Filter => map_filter_key(key),
        InputMode::ExecInput => map_exec_input_key(key),
    }
}

fn map_browse_key(keymap: &KeyMap, key: KeyEvent) -> Option<Action> {
    if let Some(action) = keymap.lookup(key) {
        return Some(action);
    }

    match key.code {
        KeyCode::Char('T') => Some(Action::ToggleTitle),
        KeyCode::Char('S') => Some(Action::ToggleStatusBar),
        KeyCode::Char('P') => Some(Action::TogglePagination),
        KeyCode::Char('H') => Some(Action::ToggleHelp),
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Up => Some(Action::Up),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Home => Some(Action::Top),
        KeyCode::Char('g') if key.modifiers.is_empty() => Some(Action::Top),
        KeyCode::End | KeyCode::Char('G') => Some(Action::Bottom),
        _ => None,
    }
}

fn map_filter_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::CancelInput),
        KeyCode::Enter => Some(Action::SubmitInput),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

/// The command prompt owns every printable key, so only fixed keys navigate.
fn map_exec_input_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Enter => Some(Action::Select),
        KeyCode::Esc => Some(Action::Back),
        KeyCode::Char('h') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Back),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

pub fn key_event_signature(key: KeyEvent) -> Option<String> {
    let key_name = match key.code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char('+') => "plus".to_string(),
        KeyCode::Char(c) => c.to_ascii_lowercase().to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::BackTab => "backtab".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Insert => "insert".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::PageUp => "pageup".to_string(),
        KeyCode::PageDown => "pagedown".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        _ => return None,
    };

    let mut parts = Vec::new();
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        parts.push("ctrl".to_string());
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        parts.push("alt".to_string());
    }
    // Some terminals report uppercase letters without the SHIFT flag.
    let uppercase = matches!(key.code, KeyCode::Char(c) if c.is_ascii_uppercase());
    if key.modifiers.contains(KeyModifiers::SHIFT) || uppercase {
        parts.push("shift".to_string());
    }
    parts.push(key_name);
    Some(parts.join("+"))
}

pub fn normalize_hotkey_spec(spec: &str) -> Option<String> {
    let mut ctrl = false;
    let mut alt = false;
    let mut shift = false;
    let mut key: Option<String> = None;

    for token in spec
        .split('+')
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
    {
        match token.as_str() {
            "ctrl" | "control" => ctrl = true,
            "alt" => alt = true,
            "shift" => shift = true,
            _ => {
                key = normalize_hotkey_key_token(&token);
            }
        }
    }

    let key = key?;
    let mut parts = Vec::new();
    if ctrl {
        parts.push("ctrl".to_string());
    }
    if alt {
        parts.push("alt".to_string());
    }
    if shift {
        parts.push("shift".to_string());
    }
    parts.push(key);
    Some(parts.join("+"))
}

fn normalize_hotkey_key_token(token: &str) -> Option<String> {
    match token {
        "esc" | "escape" => Some("esc".to_string()),
        "return" => Some("enter".to_string()),
        "pgup" => Some("pageup".to_string()),
        "pgdn" => Some("pagedown".to_string()),
        "del" => Some("delete".to_string()),
        "ins" => Some("insert".to_string()),
        "bs" => Some("backspace".to_string()),
        "space" | "plus" | "tab" | "backtab" | "enter" | "backspace" | "delete" | "insert"
        | "left" | "right" | "up" | "down" | "home" | "end" | "pageup" | "pagedown" => {
            Some(token.to_string())
        }
        _ if token.chars().count() == 1 => Some(token.to_string()),
        _ if token.starts_with('f') => {
            let number = token.trim_start_matches('f').parse::<u8>().ok()?;
            if (1..=24).contains(&number) {
                Some(format!("f{number}"))
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Action, InputMode, KeyMap, KeyOverrides, key_event_signature, map_key,
        normalize_hotkey_spec,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn browse(key: KeyEvent) -> Option<Action> {
        map_key(InputMode::Browse, &KeyMap::default(), key)
    }

    #[test]
    fn browse_mode_maps_enter_to_select() {
        let key = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(browse(key), Some(Action::Select));
    }

    #[test]
    fn browse_mode_maps_ctrl_h_and_esc_to_back() {
        let ctrl_h = KeyEvent::new(KeyCode::Char('h'), KeyModifiers::CONTROL);
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(browse(ctrl_h), Some(Action::Back));
        assert_eq!(browse(esc), Some(Action::Back));
    }

    #[test]
    fn browse_mode_maps_e_to_exec() {
        let key = KeyEvent::new(KeyCode::Char('e'), KeyModifiers::NONE);
        assert_eq!(browse(key), Some(Action::ExecRequested));
    }

    #[test]
    fn browse_mode_maps_uppercase_toggles() {
        let title = KeyEvent::new(KeyCode::Char('T'), KeyModifiers::SHIFT);
        let status = KeyEvent::new(KeyCode::Char('S'), KeyModifiers::SHIFT);
        let pages = KeyEvent::new(KeyCode::Char('P'), KeyModifiers::NONE);
        let help = KeyEvent::new(KeyCode::Char('H'), KeyModifiers::SHIFT);
        assert_eq!(browse(title), Some(Action::ToggleTitle));
        assert_eq!(browse(status), Some(Action::ToggleStatusBar));
        assert_eq!(browse(pages), Some(Action::TogglePagination));
        assert_eq!(browse(help), Some(Action::ToggleHelp));
    }

    #[test]
    fn exec_input_mode_treats_letters_as_text() {
        let keymap = KeyMap::default();
        let e = KeyEvent::new(KeyCode::Char('e'), KeyModifiers::NONE);
        let q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(
            map_key(InputMode::ExecInput, &keymap, e),
            Some(Action::InputChar('e'))
        );
        assert_eq!(
            map_key(InputMode::ExecInput, &keymap, q),
            Some(Action::InputChar('q'))
        );
    }

    #[test]
    fn exec_input_mode_keeps_run_and_back() {
        let keymap = KeyMap::default();
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        let ctrl_h = KeyEvent::new(KeyCode::Char('h'), KeyModifiers::CONTROL);
        let backspace = KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE);
        assert_eq!(
            map_key(InputMode::ExecInput, &keymap, enter),
            Some(Action::Select)
        );
        assert_eq!(
            map_key(InputMode::ExecInput, &keymap, ctrl_h),
            Some(Action::Back)
        );
        assert_eq!(
            map_key(InputMode::ExecInput, &keymap, backspace),
            Some(Action::Backspace)
        );
    }

    #[test]
    fn filter_mode_maps_esc_to_cancel() {
        let key = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(
            map_key(InputMode::Filter, &KeyMap::default(), key),
            Some(Action::CancelInput)
        );
    }

    #[test]
    fn overrides_replace_default_bindings() {
        let keymap = KeyMap::from_overrides(&KeyOverrides {
            exec: Some(vec!["x".to_string(), "not-a-key".to_string()]),
            ..KeyOverrides::default()
        });
        let x = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        let e = KeyEvent::new(KeyCode::Char('e'), KeyModifiers::NONE);
        assert_eq!(
            map_key(InputMode::Browse, &keymap, x),
            Some(Action::ExecRequested)
        );
        assert_eq!(map_key(InputMode::Browse, &keymap, e), None);
        assert_eq!(
            keymap.label_for(&Action::ExecRequested),
            Some("x".to_string())
        );
    }

    #[test]
    fn hotkey_signature_normalizes_modifiers() {
        let key = KeyEvent::new(
            KeyCode::Char('P'),
            KeyModifiers::CONTROL | KeyModifiers::SHIFT,
        );
        assert_eq!(key_event_signature(key), Some("ctrl+shift+p".to_string()));
    }

    #[test]
    fn uppercase_without_shift_flag_does_not_hit_lowercase_bindings() {
        let upper_e = KeyEvent::new(KeyCode::Char('E'), KeyModifiers::NONE);
        let upper_q = KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::NONE);
        assert_eq!(key_event_signature(upper_e), Some("shift+e".to_string()));
        assert_eq!(
            key_event_signature(KeyEvent::new(KeyCode::Char('E'), KeyModifiers::SHIFT)),
            Some("shift+e".to_string())
        );
        assert_eq!(browse(upper_e), None);
        assert_eq!(browse(upper_q), None);
    }

    #[test]
    fn shifted_binding_matches_uppercase_key() {
        let keymap = KeyMap::from_overrides(&KeyOverrides {
            quit: Some(vec!["shift+q".to_string()]),
            ..KeyOverrides::default()
        });
        let upper_q = KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::NONE);
        let lower_q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(
            map_key(InputMode::Browse, &keymap, upper_q),
            Some(Action::Quit)
        );
        assert_eq!(map_key(InputMode::Browse, &keymap, lower_q), None);
    }

    #[test]
    fn hotkey_spec_parses_common_tokens() {
        assert_eq!(
            normalize_hotkey_spec("shift+ctrl+F5"),
            Some("ctrl+shift+f5".to_string())
        );
        assert_eq!(normalize_hotkey_spec("Return"), Some("enter".to_string()));
        assert_eq!(
            normalize_hotkey_spec("ctrl+pgup"),
            Some("ctrl+pageup".to_string())
        );
        assert_eq!(normalize_hotkey_spec("ctrl+"), None);
    }
}

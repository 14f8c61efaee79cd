//! Table-driven input-method engine.
//!
//! Two input methods are available: `pinyin`, which converts letter sequences
//! through a [`PhraseTable`], and `keyboard-us`, which commits printable keys
//! as typed. Each input context has its own composer; the frontend receives a
//! full panel refresh (candidate list, preedit, aux text) after every change.
//!
//! Key handling for `pinyin` while composing:
//!
//! | Key                    | Effect                                  |
//! |------------------------|-----------------------------------------|
//! | `a`-`z`, `'`           | extend the input                        |
//! | `space`                | commit the highlighted candidate        |
//! | `Return`               | commit the raw input                    |
//! | `1`-`9`                | commit that slot of the current page    |
//! | `-` / `Page_Up`        | previous page                           |
//! | `=` / `Page_Down`      | next page                               |
//! | `Up` / `Down`          | move the highlight                      |
//! | `Left` `Right` `Home` `End` | move the input cursor              |
//! | `BackSpace` / `Delete` | edit the input                          |
//! | `Escape`               | discard the composition                 |

use crate::candidates::CandidatePager;
use crate::input_buffer::InputBuffer;
use crate::table::{PhraseTable, TABLE_FILE};
use ahash::AHashMap;
use anyhow::Context;
use imebridge_core::{
    EngineError, Environment, Frontend, InputContextId, InputMethodEngine, Key, KeySym, NamedKey,
};

/// Input methods this engine provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMethod {
    Pinyin,
    KeyboardUs,
}

impl InputMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pinyin" => Some(InputMethod::Pinyin),
            "keyboard-us" => Some(InputMethod::KeyboardUs),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InputMethod::Pinyin => "pinyin",
            InputMethod::KeyboardUs => "keyboard-us",
        }
    }

    /// Short label shown in the aux text.
    pub fn label(self) -> &'static str {
        match self {
            InputMethod::Pinyin => "拼",
            InputMethod::KeyboardUs => "En",
        }
    }
}

/// Per-context composition state.
#[derive(Debug, Default)]
struct Composer {
    input: InputBuffer,
    pager: CandidatePager,
}

impl Composer {
    fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    fn clear(&mut self) {
        self.input.clear();
        self.pager.clear();
    }
}

pub struct TableEngine {
    table: PhraseTable,
    methods: Vec<InputMethod>,
    active: InputMethod,
    frontend: Option<Frontend>,
    contexts: AHashMap<InputContextId, Composer>,
}

impl TableEngine {
    pub fn new(table: PhraseTable) -> Self {
        Self {
            table,
            methods: vec![InputMethod::Pinyin],
            active: InputMethod::Pinyin,
            frontend: None,
            contexts: AHashMap::new(),
        }
    }

    /// Build an engine from the bridge environment.
    ///
    /// Loads `table.toml` from the model directory when it exists and falls
    /// back to the built-in table otherwise. A table file that exists but
    /// cannot be loaded is an error.
    pub fn from_environment(env: &Environment) -> anyhow::Result<Self> {
        let path = env.model_dir().map(|dir| dir.join(TABLE_FILE));
        let table = match path {
            Some(path) if path.is_file() => PhraseTable::load_toml(&path)
                .with_context(|| format!("loading phrase table {}", path.display()))?,
            _ => {
                tracing::info!("no phrase table installed, using built-in table");
                PhraseTable::builtin()
            }
        };
        tracing::info!(table = table.name(), codes = table.len(), "phrase table ready");
        Ok(Self::new(table))
    }

    pub fn active_input_method(&self) -> InputMethod {
        self.active
    }

    pub fn input_methods(&self) -> &[InputMethod] {
        &self.methods
    }

    fn composer(&mut self, ic: InputContextId) -> Result<&mut Composer, EngineError> {
        self.contexts
            .get_mut(&ic)
            .ok_or_else(|| EngineError::fault(format!("unknown input context {}", ic)))
    }

    /// Recompute candidates for the current input and publish the panel.
    fn update(&mut self, ic: InputContextId) -> Result<(), EngineError> {
        let table = &self.table;
        let composer = self
            .contexts
            .get_mut(&ic)
            .ok_or_else(|| EngineError::fault(format!("unknown input context {}", ic)))?;
        if composer.is_empty() {
            composer.pager.clear();
        } else {
            let mut found = table.lookup(composer.input.text());
            if found.is_empty() {
                found.push(composer.input.text().to_string());
            }
            composer.pager.set_items(found);
        }
        self.publish(ic)
    }

    /// Send the panel as it stands, without recomputing candidates.
    fn publish(&self, ic: InputContextId) -> Result<(), EngineError> {
        let Some(frontend) = &self.frontend else {
            return Ok(());
        };
        let composer = self
            .contexts
            .get(&ic)
            .ok_or_else(|| EngineError::fault(format!("unknown input context {}", ic)))?;

        if composer.is_empty() {
            Self::publish_cleared(frontend);
            return Ok(());
        }

        frontend.candidate_list(composer.pager.items().to_vec());
        let client_view = composer
            .pager
            .highlighted()
            .unwrap_or(composer.input.text());
        frontend.preedit(&composer.input.display_with_cursor(), client_view);
        frontend.input_panel_aux(self.active.label(), &composer.pager.page_label());
        Ok(())
    }

    fn publish_cleared(frontend: &Frontend) {
        frontend.candidate_list(Vec::new());
        frontend.preedit("", "");
        frontend.input_panel_aux("", "");
    }

    /// Commit `text`, then clear the composition and the panel.
    fn commit(&mut self, ic: InputContextId, text: &str) -> Result<(), EngineError> {
        tracing::debug!(%ic, text, "commit");
        if let Some(frontend) = &self.frontend {
            frontend.commit_string(text);
        }
        self.composer(ic)?.clear();
        self.publish(ic)
    }

    fn commit_index(&mut self, ic: InputContextId, index: usize) -> Result<bool, EngineError> {
        let text = self.composer(ic)?.pager.get(index).map(str::to_string);
        match text {
            Some(text) => {
                self.commit(ic, &text)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn pinyin_key(&mut self, ic: InputContextId, key: &Key) -> Result<bool, EngineError> {
        let composing = !self.composer(ic)?.is_empty();

        if let KeySym::Char(ch) = key.sym {
            if ch.is_ascii_lowercase() || (composing && ch == '\'') {
                self.composer(ic)?.input.insert_char(ch);
                self.update(ic)?;
                return Ok(true);
            }
        }
        if !composing {
            return Ok(false);
        }

        match key.sym {
            KeySym::Char(' ') => {
                let composer = self.composer(ic)?;
                let text = composer
                    .pager
                    .highlighted()
                    .unwrap_or(composer.input.text())
                    .to_string();
                self.commit(ic, &text)?;
            }
            KeySym::Named(NamedKey::Return) => {
                let text = self.composer(ic)?.input.text().to_string();
                self.commit(ic, &text)?;
            }
            KeySym::Char(digit @ '1'..='9') => {
                let slot = digit as usize - '1' as usize;
                if let Some(index) = self.composer(ic)?.pager.index_on_page(slot) {
                    self.commit_index(ic, index)?;
                }
            }
            KeySym::Char('-') | KeySym::Named(NamedKey::PageUp) => {
                if self.composer(ic)?.pager.page_up() {
                    self.publish(ic)?;
                }
            }
            KeySym::Char('=') | KeySym::Named(NamedKey::PageDown) => {
                if self.composer(ic)?.pager.page_down() {
                    self.publish(ic)?;
                }
            }
            KeySym::Named(NamedKey::Up) => {
                if self.composer(ic)?.pager.cursor_up() {
                    self.publish(ic)?;
                }
            }
            KeySym::Named(NamedKey::Down) => {
                if self.composer(ic)?.pager.cursor_down() {
                    self.publish(ic)?;
                }
            }
            KeySym::Named(NamedKey::Left) => {
                if self.composer(ic)?.input.move_left() {
                    self.publish(ic)?;
                }
            }
            KeySym::Named(NamedKey::Right) => {
                if self.composer(ic)?.input.move_right() {
                    self.publish(ic)?;
                }
            }
            KeySym::Named(NamedKey::Home) => {
                self.composer(ic)?.input.move_to_start();
                self.publish(ic)?;
            }
            KeySym::Named(NamedKey::End) => {
                self.composer(ic)?.input.move_to_end();
                self.publish(ic)?;
            }
            KeySym::Named(NamedKey::BackSpace) => {
                if self.composer(ic)?.input.delete_before() {
                    self.update(ic)?;
                }
            }
            KeySym::Named(NamedKey::Delete) => {
                if self.composer(ic)?.input.delete_after() {
                    self.update(ic)?;
                }
            }
            KeySym::Named(NamedKey::Escape) => {
                self.reset_input_panel(ic)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn keyboard_key(&mut self, ic: InputContextId, key: &Key) -> Result<bool, EngineError> {
        match key.as_char() {
            Some(ch) if !ch.is_control() => {
                self.composer(ic)?;
                if let Some(frontend) = &self.frontend {
                    frontend.commit_string(ch.encode_utf8(&mut [0; 4]));
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl InputMethodEngine for TableEngine {
    fn set_input_methods(&mut self, methods: &[String], default: &str) -> Result<(), EngineError> {
        let parsed = methods
            .iter()
            .map(|name| {
                InputMethod::from_name(name)
                    .ok_or_else(|| EngineError::fault(format!("unknown input method '{}'", name)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let active = if default.is_empty() {
            parsed.first().copied()
        } else {
            InputMethod::from_name(default).filter(|m| parsed.contains(m))
        }
        .ok_or_else(|| EngineError::fault(format!("input method '{}' is not available", default)))?;

        tracing::info!(active = active.name(), count = parsed.len(), "input methods set");
        self.methods = parsed;
        self.active = active;
        Ok(())
    }

    fn set_frontend(&mut self, frontend: Frontend) {
        self.frontend = Some(frontend);
    }

    fn create_input_context(&mut self, program: &str) -> Result<InputContextId, EngineError> {
        let ic = InputContextId::generate();
        self.contexts.insert(ic, Composer::default());
        tracing::debug!(%ic, program, "input context created");
        Ok(ic)
    }

    fn key_event(
        &mut self,
        ic: InputContextId,
        key: &Key,
        is_release: bool,
    ) -> Result<bool, EngineError> {
        if is_release {
            return Ok(false);
        }
        let states = key.states;
        if states.ctrl || states.alt || states.super_key {
            return Ok(false);
        }
        match self.active {
            InputMethod::Pinyin => self.pinyin_key(ic, key),
            InputMethod::KeyboardUs => self.keyboard_key(ic, key),
        }
    }

    fn select_candidate(&mut self, ic: InputContextId, index: usize) -> Result<(), EngineError> {
        if !self.commit_index(ic, index)? {
            tracing::warn!(%ic, index, "no candidate at index");
        }
        Ok(())
    }

    fn is_input_panel_empty(&self, ic: InputContextId) -> bool {
        self.contexts.get(&ic).map_or(true, Composer::is_empty)
    }

    fn reset_input_panel(&mut self, ic: InputContextId) -> Result<(), EngineError> {
        self.composer(ic)?.clear();
        if let Some(frontend) = &self.frontend {
            Self::publish_cleared(frontend);
        }
        Ok(())
    }
}

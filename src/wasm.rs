//! WASM bindings for gridedit
//!
//! This module exposes the editor to JavaScript. Cells are addressed by the
//! `data-cell` handles that `renderMarkup()` writes into the markup.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "wasm")]
use crate::core::controller::{EditorController, EditorMode, EditorOptions};
#[cfg(feature = "wasm")]
use crate::core::edit::{BeginOutcome, Key, KeyDisposition, Modifiers};
#[cfg(feature = "wasm")]
use crate::core::markup::NodeId;
#[cfg(feature = "wasm")]
use crate::features::numeric::NumericOptions;

/// Editor options (exposed to WASM)
#[cfg(feature = "wasm")]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasmEditorOptions {
    /// Group plain numbers for display
    #[serde(default = "default_true")]
    pub auto_format: bool,
    /// Use `.` grouping and `,` decimals
    #[serde(default)]
    pub european: bool,
    /// Double-click window in milliseconds
    #[serde(default = "default_double_click_ms")]
    pub double_click_ms: u64,
}

#[cfg(feature = "wasm")]
impl Default for WasmEditorOptions {
    fn default() -> Self {
        Self {
            auto_format: true,
            european: false,
            double_click_ms: default_double_click_ms(),
        }
    }
}

#[cfg(feature = "wasm")]
fn default_true() -> bool {
    true
}

#[cfg(feature = "wasm")]
fn default_double_click_ms() -> u64 {
    400
}

#[cfg(feature = "wasm")]
impl From<WasmEditorOptions> for EditorOptions {
    fn from(opts: WasmEditorOptions) -> Self {
        EditorOptions {
            auto_format: opts.auto_format,
            numeric: if opts.european {
                NumericOptions::european()
            } else {
                NumericOptions::default()
            },
            double_activation_window: web_time::Duration::from_millis(opts.double_click_ms),
        }
    }
}

/// Operation result with an optional error message
#[cfg(feature = "wasm")]
#[derive(Serialize, Deserialize)]
pub struct OpResult {
    pub success: bool,
    pub error: Option<String>,
}

#[cfg(feature = "wasm")]
impl OpResult {
    fn from_result<T, E: std::fmt::Display>(result: Result<T, E>) -> JsValue {
        let op = match result {
            Ok(_) => OpResult {
                success: true,
                error: None,
            },
            Err(e) => OpResult {
                success: false,
                error: Some(e.to_string()),
            },
        };
        serde_wasm_bindgen::to_value(&op).unwrap_or(JsValue::NULL)
    }
}

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Table editor bound to one markup document
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct WasmEditor {
    inner: EditorController,
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl WasmEditor {
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> WasmEditor {
        let opts: WasmEditorOptions = serde_wasm_bindgen::from_value(options).unwrap_or_default();
        WasmEditor {
            inner: EditorController::new(opts.into()),
        }
    }

    /// Replace the document; returns `{ success, error }`
    pub fn load(&mut self, markup: &str) -> JsValue {
        OpResult::from_result(self.inner.load(markup))
    }

    /// Live markup in display form
    pub fn markup(&self) -> String {
        self.inner.markup()
    }

    /// Markup with `data-cell` handles and highlight classes
    #[wasm_bindgen(js_name = "renderMarkup")]
    pub fn render_markup(&self) -> String {
        self.inner.render_markup()
    }

    #[wasm_bindgen(js_name = "storedContent")]
    pub fn stored_content(&self) -> String {
        self.inner.stored_content().to_string()
    }

    #[wasm_bindgen(js_name = "enterEditMode")]
    pub fn enter_edit_mode(&mut self) {
        self.inner.enter_edit_mode();
    }

    #[wasm_bindgen(js_name = "isEditMode")]
    pub fn is_edit_mode(&self) -> bool {
        self.inner.mode() == EditorMode::Edit
    }

    #[wasm_bindgen(js_name = "pointerDown")]
    pub fn pointer_down(&mut self, cell_id: u32) -> bool {
        self.inner
            .pointer_down(NodeId::from_raw(cell_id), web_time::Instant::now())
    }

    #[wasm_bindgen(js_name = "pointerMove")]
    pub fn pointer_move(&mut self, cell_id: u32) -> bool {
        self.inner.pointer_move(NodeId::from_raw(cell_id))
    }

    #[wasm_bindgen(js_name = "pointerUp")]
    pub fn pointer_up(&mut self) {
        self.inner.pointer_up();
    }

    /// Start editing a cell; true when an edit started
    #[wasm_bindgen(js_name = "doubleClick")]
    pub fn double_click(&mut self, cell_id: u32) -> bool {
        matches!(
            self.inner.double_activate(NodeId::from_raw(cell_id)),
            BeginOutcome::Started { .. } | BeginOutcome::AlreadyEditing
        )
    }

    /// Handle a key press; true when the editor consumed it
    #[wasm_bindgen(js_name = "keyDown")]
    pub fn key_down(&mut self, key: &str, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        let modifiers = Modifiers {
            shift,
            ctrl,
            alt,
            meta,
        };
        self.inner.key_down(&Key::from_dom(key), modifiers) != KeyDisposition::PassThrough
    }

    pub fn blur(&mut self, cell_id: u32) -> bool {
        self.inner.blur(NodeId::from_raw(cell_id))
    }

    /// New inner markup of the cell being edited
    pub fn input(&mut self, inner_markup: &str) -> bool {
        match self.inner.editing_cell() {
            Some(cell) => self.inner.input(cell, inner_markup).unwrap_or(false),
            None => false,
        }
    }

    #[wasm_bindgen(js_name = "editingCell")]
    pub fn editing_cell(&self) -> Option<u32> {
        self.inner.editing_cell().map(NodeId::raw)
    }

    /// Merge the selection; returns `{ success, error }`
    #[wasm_bindgen(js_name = "mergeSelection")]
    pub fn merge_selection(&mut self) -> JsValue {
        OpResult::from_result(self.inner.merge_selection())
    }

    /// Markup ready for persistence
    pub fn save(&mut self) -> String {
        self.inner.save()
    }

    /// Discard changes since the last load; returns `{ success, error }`
    pub fn revert(&mut self) -> JsValue {
        OpResult::from_result(self.inner.revert_to_snapshot())
    }

    /// Number of distinct selected cells
    #[wasm_bindgen(js_name = "selectionSize")]
    pub fn selection_size(&self) -> usize {
        self.inner.selected_cells().len()
    }
}

/// Group a plain number for display
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = "formatForDisplay")]
pub fn format_for_display_wasm(input: &str) -> String {
    crate::format_for_display(input)
}

/// Remove grouping separators from a grouped number
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = "stripForStorage")]
pub fn strip_for_storage_wasm(input: &str) -> String {
    crate::strip_for_storage(input)
}

/// Get version information
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = "getVersion")]
pub fn get_version() -> String {
    crate::version().to_string()
}

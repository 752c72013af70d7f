//! WASM bindings for field extraction and mapping sessions.
//!
//! This crate provides WebAssembly bindings for use in browsers and Node.js.

use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use fieldmap_core::document::{FieldKey, LineItemColumn};
use fieldmap_core::models::config::{ExtractionConfig, StoreConfig};
use fieldmap_core::models::fragment::SourceFragment;
use fieldmap_core::models::layout::FieldRules;
use fieldmap_core::rules::{ExtractionOutcome, RuleEngine};
use fieldmap_core::store::{StoreAction, TransactionStore};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&message.to_string()).into()
}

/// Serialize maps as plain objects so results read naturally from JS.
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(js_error)
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(js_error)
}

/// Optional JS argument: `undefined`/`null` yields the default.
fn from_js_or_default<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        Ok(T::default())
    } else {
        from_js(value)
    }
}

/// Run field rules over fragments.
///
/// `fields` is a list of `{id, rules}`; `config` is an optional extraction config.
#[wasm_bindgen]
pub fn extract(fields: JsValue, fragments: JsValue, config: JsValue) -> Result<JsValue, JsValue> {
    let fields: Vec<FieldRules> = from_js(fields)?;
    let fragments: Vec<SourceFragment> = from_js(fragments)?;
    let config: ExtractionConfig = from_js_or_default(config)?;

    let outcome = RuleEngine::with_config(config).extract(&fields, &fragments);
    to_js(&outcome)
}

/// Encode a line-item key, e.g. `line_items.2.sku`.
#[wasm_bindgen]
pub fn encode_line_item_key(line_number: u32, column: &str) -> Result<String, JsValue> {
    let column = LineItemColumn::from_name(column)
        .ok_or_else(|| js_error(format!("unknown line item column {:?}", column)))?;
    let key = FieldKey::line_item(line_number, column).map_err(js_error)?;
    Ok(key.to_string())
}

/// Decode a line-item key into `{line_number, column}`, or `null`.
#[wasm_bindgen]
pub fn decode_line_item_key(key: &str) -> Result<JsValue, JsValue> {
    match fieldmap_core::decode_line_item_key(key) {
        Some(decoded) => to_js(&decoded),
        None => Ok(JsValue::NULL),
    }
}

/// Check if a key refers to a line-item column.
#[wasm_bindgen]
pub fn is_line_item_key(key: &str) -> bool {
    fieldmap_core::is_line_item_key(key)
}

/// An undoable mapping session for browser use.
#[wasm_bindgen]
pub struct MappingSession {
    store: TransactionStore,
}

#[wasm_bindgen]
impl MappingSession {
    /// Create a new session. `config` is an optional store config.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<MappingSession, JsValue> {
        let config: StoreConfig = from_js_or_default(config)?;
        Ok(Self {
            store: TransactionStore::with_config(config),
        })
    }

    /// Replace the fragment list and refresh cached geometry.
    #[wasm_bindgen]
    pub fn set_fragments(&mut self, fragments: JsValue) -> Result<(), JsValue> {
        let fragments: Vec<SourceFragment> = from_js(fragments)?;
        self.store.recompute_geometry(&fragments);
        Ok(())
    }

    /// Run a store action, e.g. `{action: "remove_line", line_number: 2}`.
    #[wasm_bindgen]
    pub fn dispatch(&mut self, action: JsValue) -> Result<JsValue, JsValue> {
        let action: StoreAction = from_js(action)?;
        to_js(&self.store.dispatch(action))
    }

    /// Write an extraction outcome into the session as one step.
    #[wasm_bindgen]
    pub fn apply_extraction(&mut self, outcome: JsValue) -> Result<JsValue, JsValue> {
        let outcome: ExtractionOutcome = from_js(outcome)?;
        to_js(&self.store.apply_extraction(&outcome))
    }

    /// Point a field at fragments.
    #[wasm_bindgen]
    pub fn link_fragments(&mut self, key: &str, source_ids: Vec<String>) -> Result<bool, JsValue> {
        let key = FieldKey::parse(key).map_err(js_error)?;
        Ok(self.store.link_fragments(key, source_ids).changed)
    }

    #[wasm_bindgen]
    pub fn remove_line_item(&mut self, line_number: u32) -> bool {
        self.store.remove_line_item(line_number).changed
    }

    #[wasm_bindgen]
    pub fn insert_line_after(&mut self, line_number: u32) -> bool {
        self.store.insert_line_after(line_number).changed
    }

    #[wasm_bindgen]
    pub fn add_line_item(&mut self, line_number: Option<u32>) -> bool {
        self.store.add_line_item(line_number).changed
    }

    #[wasm_bindgen]
    pub fn undo(&mut self) -> bool {
        self.store.undo()
    }

    #[wasm_bindgen]
    pub fn redo(&mut self) -> bool {
        self.store.redo()
    }

    #[wasm_bindgen]
    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    #[wasm_bindgen]
    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    /// Current field key → mapping entry object.
    #[wasm_bindgen]
    pub fn field_mapping_table(&self) -> Result<JsValue, JsValue> {
        to_js(self.store.field_mapping_table())
    }

    /// Current structured document.
    #[wasm_bindgen]
    pub fn structured_document(&self) -> Result<JsValue, JsValue> {
        to_js(self.store.structured_document())
    }

    /// Fragment id → field keys referencing it.
    #[wasm_bindgen]
    pub fn reverse_index(&self) -> Result<JsValue, JsValue> {
        to_js(&self.store.reverse_index())
    }

    /// Whole session state as a JSON string.
    #[wasm_bindgen]
    pub fn to_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.store.snapshot()).map_err(js_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_key_codec() {
        assert_eq!(encode_line_item_key(2, "sku").unwrap(), "line_items.2.sku");
        assert!(encode_line_item_key(0, "sku").is_err());
        assert!(encode_line_item_key(1, "price").is_err());
        assert!(decode_line_item_key("document_number").unwrap().is_null());
        assert!(is_line_item_key("line_items.7.unit_price"));
    }

    #[wasm_bindgen_test]
    fn test_session_undo() {
        let mut session = MappingSession::new(JsValue::UNDEFINED).unwrap();
        assert!(session.add_line_item(None));
        assert!(session.link_fragments("line_items.1.sku", vec!["f1".to_string()]).unwrap());
        assert!(session.remove_line_item(1));
        assert!(session.to_json().unwrap().contains("\"line_items\":[]"));

        assert!(session.undo());
        assert!(session.to_json().unwrap().contains("line_items.1.sku"));
        assert!(session.can_redo());
    }
}

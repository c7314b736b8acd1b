//! Context menu items
//!
//! Value objects contributed by block type extension hooks to the structure
//! board's context menus. The payload is JSON-encoded at construction time,
//! not at use time, so a menu item can be handed around as plain data.

use std::collections::HashMap;

use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

/// Client-side action triggered by a menu item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
	/// POST the item data to the URL
	Ajax,
	/// POST the item data and open the add-block dialog on success
	AjaxAdd,
	/// A custom action keyword understood by the editing surface
	Custom(String),
}

impl MenuAction {
	/// Wire keyword for the action
	pub fn as_str(&self) -> &str {
		match self {
			MenuAction::Ajax => "ajax",
			MenuAction::AjaxAdd => "ajax_add",
			MenuAction::Custom(keyword) => keyword,
		}
	}
}

impl Serialize for MenuAction {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

/// One entry in a block or region context menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
	/// Item label
	pub name: String,

	/// URL the item posts to
	pub url: String,

	/// JSON-encoded payload posted with the item, if any
	pub data: Option<String>,

	/// Confirmation text shown before the call, if any
	pub question: Option<String>,

	/// Client-side action
	pub action: MenuAction,

	/// Extra data-attributes attached to the rendered item
	pub attributes: HashMap<String, String>,
}

impl MenuItem {
	/// Create a menu item posting to `url` with the default `ajax` action
	pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			url: url.into(),
			data: None,
			question: None,
			action: MenuAction::Ajax,
			attributes: HashMap::new(),
		}
	}

	/// Attach a payload; serialized to a JSON string immediately
	pub fn with_data(mut self, data: JsonValue) -> Self {
		self.data = Some(data.to_string());
		self
	}

	/// Ask the operator `question` before posting
	pub fn with_question(mut self, question: impl Into<String>) -> Self {
		self.question = Some(question.into());
		self
	}

	/// Override the client-side action
	pub fn with_action(mut self, action: MenuAction) -> Self {
		self.action = action;
		self
	}

	/// Add a data-attribute to the rendered item
	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.insert(key.into(), value.into());
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_data_is_serialized_at_construction() {
		let item = MenuItem::new("Paste", "/admin/blocks/paste/").with_data(json!({"ids": [1, 2]}));

		assert_eq!(item.data.as_deref(), Some(r#"{"ids":[1,2]}"#));
	}

	#[test]
	fn test_default_action_is_ajax() {
		let item = MenuItem::new("Clear", "/admin/blocks/clear/");
		assert_eq!(item.action, MenuAction::Ajax);
		assert_eq!(item.action.as_str(), "ajax");
	}

	#[test]
	fn test_custom_action_keyword_passes_through() {
		let action = MenuAction::Custom("modal".to_string());
		assert_eq!(action.as_str(), "modal");
	}

	#[test]
	fn test_serializes_with_wire_keys() {
		let item = MenuItem::new("Add", "/admin/blocks/add/")
			.with_action(MenuAction::AjaxAdd)
			.with_attribute("cms-icon", "plus");
		let value = serde_json::to_value(&item).unwrap();

		assert_eq!(value["action"], "ajax_add");
		assert_eq!(value["attributes"]["cms-icon"], "plus");
		assert!(value["data"].is_null());
	}
}

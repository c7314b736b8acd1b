//! Block type registry
//!
//! Block types are declared as [`BlockTypeDescriptor`] values and registered
//! once at process start. Registration validates the declaration and fails
//! fast on configuration errors; after startup the registry is shared
//! immutably (wrap it in an [`std::sync::Arc`]) and only read.

use std::collections::HashMap;

use crate::config::CmsSettings;
use crate::error::{CmsError, CmsResult};
use crate::menu::MenuItem;
use crate::model::{Block, Region};

/// Hook contributing extra context-menu items for every region
pub type RegionMenuHook = fn(&Region) -> Vec<MenuItem>;

/// Hook contributing extra context-menu items for every block
pub type BlockMenuHook = fn(&Block) -> Vec<MenuItem>;

/// Filter narrowing the candidate types considered for a slot
///
/// Used by collaborating types to restrict candidacy, e.g. a rich-text type
/// admitting only text-enabled children.
pub type CandidateFilter =
	Box<dyn Fn(&BlockTypeDescriptor, &str, Option<&Region>) -> bool + Send + Sync>;

/// Declaration of one block type
///
/// Built with the `with_*` methods and handed to
/// [`TypeRegistry::register`]; immutable afterwards.
#[derive(Debug, Clone)]
pub struct BlockTypeDescriptor {
	/// Type tag blocks reference in their records
	pub type_tag: String,

	/// Display name shown to operators
	pub name: String,

	/// Grouping label collecting types of similar purpose
	pub module: String,

	/// Declared allowed child types; `None` means unrestricted
	pub child_types: Option<Vec<String>>,

	/// Declared allowed parent types; `None` means unrestricted
	pub parent_types: Option<Vec<String>>,

	/// Whether the type must be placed under a parent block
	pub require_parent: bool,

	/// Restrict the type to regions attached to CMS pages
	pub page_only: bool,

	/// Whether the type may be embedded inside rich-text content
	pub text_enabled: bool,

	/// Template the type renders with
	pub render_template: Option<String>,

	/// Whether the type renders at all
	pub renders: bool,

	/// Rendering is independent of parent context; resolved against
	/// [`CmsSettings::always_refresh_content`] at registration when unset
	pub is_local: Option<bool>,

	/// Participates in output caching; resolved against
	/// [`CmsSettings::plugin_cache`] at registration when unset
	pub cache_output: Option<bool>,

	/// Cache resolved child-type lists for this type
	pub cache_child_types: bool,

	/// Cache resolved parent-type lists for this type
	pub cache_parent_types: bool,

	/// Disable dragging of this type's children on the structure board
	pub disable_child_drag: bool,

	/// Disable opening the edit dialog for this type
	pub disable_edit: bool,

	/// Show the add-block dialog when the type is inserted
	pub show_add_form: bool,

	/// Hook contributing region context-menu items
	pub region_menu_hook: Option<RegionMenuHook>,

	/// Hook contributing block context-menu items
	pub block_menu_hook: Option<BlockMenuHook>,

	/// Set at registration when [`Self::region_menu_hook`] is present, so
	/// un-overridden hooks cost nothing per node
	pub has_region_menu_items: bool,

	/// Set at registration when [`Self::block_menu_hook`] is present
	pub has_block_menu_items: bool,
}

impl BlockTypeDescriptor {
	/// Declare a type with the given tag and display name
	pub fn new(type_tag: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			type_tag: type_tag.into(),
			name: name.into(),
			module: "Generic".to_string(),
			child_types: None,
			parent_types: None,
			require_parent: false,
			page_only: false,
			text_enabled: false,
			render_template: None,
			renders: true,
			is_local: None,
			cache_output: None,
			cache_child_types: true,
			cache_parent_types: true,
			disable_child_drag: false,
			disable_edit: false,
			show_add_form: true,
			region_menu_hook: None,
			block_menu_hook: None,
			has_region_menu_items: false,
			has_block_menu_items: false,
		}
	}

	/// Set the grouping label
	pub fn with_module(mut self, module: impl Into<String>) -> Self {
		self.module = module.into();
		self
	}

	/// Restrict the allowed child types
	pub fn with_child_types(mut self, child_types: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.child_types = Some(child_types.into_iter().map(Into::into).collect());
		self
	}

	/// Restrict the allowed parent types
	pub fn with_parent_types(
		mut self,
		parent_types: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		self.parent_types = Some(parent_types.into_iter().map(Into::into).collect());
		self
	}

	/// Require placement under a parent block
	pub fn require_parent(mut self) -> Self {
		self.require_parent = true;
		self
	}

	/// Restrict the type to page-attached regions
	pub fn page_only(mut self) -> Self {
		self.page_only = true;
		self
	}

	/// Allow embedding inside rich-text content
	pub fn text_enabled(mut self) -> Self {
		self.text_enabled = true;
		self
	}

	/// Set the render template
	pub fn with_render_template(mut self, template: impl Into<String>) -> Self {
		self.render_template = Some(template.into());
		self
	}

	/// Declare the type as non-rendering (structural only)
	pub fn without_rendering(mut self) -> Self {
		self.renders = false;
		self
	}

	/// Override context-independent rendering
	pub fn with_is_local(mut self, is_local: bool) -> Self {
		self.is_local = Some(is_local);
		self
	}

	/// Override output-cache participation
	pub fn with_cache_output(mut self, cache_output: bool) -> Self {
		self.cache_output = Some(cache_output);
		self
	}

	/// Disable caching of resolved child-type lists
	pub fn uncached_child_types(mut self) -> Self {
		self.cache_child_types = false;
		self
	}

	/// Disable caching of resolved parent-type lists
	pub fn uncached_parent_types(mut self) -> Self {
		self.cache_parent_types = false;
		self
	}

	/// Contribute region context-menu items
	pub fn with_region_menu_hook(mut self, hook: RegionMenuHook) -> Self {
		self.region_menu_hook = Some(hook);
		self
	}

	/// Contribute block context-menu items
	pub fn with_block_menu_hook(mut self, hook: BlockMenuHook) -> Self {
		self.block_menu_hook = Some(hook);
		self
	}

	/// Whether rendering is independent of parent context
	///
	/// Resolved at registration; defaults to `true` for unregistered
	/// descriptors.
	pub fn is_local(&self) -> bool {
		self.is_local.unwrap_or(true)
	}

	/// Whether the type participates in output caching
	pub fn cache_output(&self) -> bool {
		self.cache_output.unwrap_or(true)
	}
}

/// Process-wide registry of block type descriptors
///
/// Populated at process start and read-only thereafter. Throwaway
/// registries can be built the same way in tests.
pub struct TypeRegistry {
	settings: CmsSettings,
	types: HashMap<String, BlockTypeDescriptor>,
	candidate_filters: Vec<CandidateFilter>,
}

impl TypeRegistry {
	/// Create an empty registry using the given settings for descriptor
	/// defaults
	pub fn new(settings: CmsSettings) -> Self {
		Self {
			settings,
			types: HashMap::new(),
			candidate_filters: Vec::new(),
		}
	}

	/// The settings the registry resolves descriptor defaults against
	pub fn settings(&self) -> &CmsSettings {
		&self.settings
	}

	/// Register a block type, validating its declaration
	///
	/// Configuration errors are fatal: an empty or duplicate type tag, or a
	/// rendering type without a render template, is rejected here so
	/// misconfiguration never reaches request handling.
	pub fn register(&mut self, descriptor: BlockTypeDescriptor) -> CmsResult<()> {
		let mut descriptor = descriptor;

		if descriptor.type_tag.is_empty() {
			return Err(CmsError::Config("block type tag must not be empty".to_string()));
		}
		if self.types.contains_key(&descriptor.type_tag) {
			return Err(CmsError::Config(format!(
				"block type {} is already registered",
				descriptor.type_tag
			)));
		}
		if descriptor.renders && descriptor.render_template.is_none() {
			return Err(CmsError::Config(format!(
				"block type {} renders but declares no render template",
				descriptor.type_tag
			)));
		}

		if descriptor.is_local.is_none() {
			descriptor.is_local = Some(!self.settings.always_refresh_content);
		}
		if descriptor.cache_output.is_none() {
			descriptor.cache_output = Some(self.settings.plugin_cache);
		}
		descriptor.has_region_menu_items = descriptor.region_menu_hook.is_some();
		descriptor.has_block_menu_items = descriptor.block_menu_hook.is_some();

		self.types.insert(descriptor.type_tag.clone(), descriptor);
		Ok(())
	}

	/// Narrow the candidate types considered for slots
	pub fn add_candidate_filter(
		&mut self,
		filter: impl Fn(&BlockTypeDescriptor, &str, Option<&Region>) -> bool + Send + Sync + 'static,
	) {
		self.candidate_filters.push(Box::new(filter));
	}

	/// Look up a descriptor by type tag
	pub fn get(&self, type_tag: &str) -> Option<&BlockTypeDescriptor> {
		self.types.get(type_tag)
	}

	/// Look up a descriptor, raising for unregistered tags
	pub fn get_required(&self, type_tag: &str) -> CmsResult<&BlockTypeDescriptor> {
		self.types
			.get(type_tag)
			.ok_or_else(|| CmsError::UnknownBlockType(type_tag.to_string()))
	}

	/// Number of registered types
	pub fn len(&self) -> usize {
		self.types.len()
	}

	/// Whether no types are registered
	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}

	/// Every type eligible for the given slot, sorted by module then name
	///
	/// Excludes page-only types when the region is not page-attached and
	/// applies the registered candidate filters. The stable (module, name)
	/// order is what candidate enumeration downstream preserves.
	pub fn eligible_for_slot(&self, slot: &str, region: Option<&Region>) -> Vec<&BlockTypeDescriptor> {
		let mut eligible: Vec<&BlockTypeDescriptor> = self
			.types
			.values()
			.filter(|&descriptor| {
				if descriptor.page_only && !region.is_some_and(|r| r.page_attached) {
					return false;
				}
				self.candidate_filters
					.iter()
					.all(|filter| filter(descriptor, slot, region))
			})
			.collect();
		eligible.sort_by(|a, b| (&a.module, &a.name).cmp(&(&b.module, &b.name)));
		eligible
	}

	/// Collect extra region context-menu items from every type that
	/// declares the hook
	pub fn extra_region_menu_items(&self, region: &Region) -> Vec<MenuItem> {
		let mut items = Vec::new();
		for descriptor in self.sorted_types() {
			if !descriptor.has_region_menu_items {
				continue;
			}
			if let Some(hook) = descriptor.region_menu_hook {
				items.extend(hook(region));
			}
		}
		items
	}

	/// Collect extra block context-menu items from every type that declares
	/// the hook
	pub fn extra_block_menu_items(&self, block: &Block) -> Vec<MenuItem> {
		let mut items = Vec::new();
		for descriptor in self.sorted_types() {
			if !descriptor.has_block_menu_items {
				continue;
			}
			if let Some(hook) = descriptor.block_menu_hook {
				items.extend(hook(block));
			}
		}
		items
	}

	fn sorted_types(&self) -> Vec<&BlockTypeDescriptor> {
		let mut types: Vec<&BlockTypeDescriptor> = self.types.values().collect();
		types.sort_by(|a, b| (&a.module, &a.name).cmp(&(&b.module, &b.name)));
		types
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn text_type() -> BlockTypeDescriptor {
		BlockTypeDescriptor::new("TextBlock", "Text").with_render_template("blocks/text.html")
	}

	#[test]
	fn test_register_validates_empty_tag() {
		let mut registry = TypeRegistry::new(CmsSettings::default());
		let result = registry.register(BlockTypeDescriptor::new("", "Broken"));

		assert!(matches!(result, Err(CmsError::Config(_))));
	}

	#[test]
	fn test_register_rejects_duplicate_tag() {
		let mut registry = TypeRegistry::new(CmsSettings::default());
		registry.register(text_type()).unwrap();
		let result = registry.register(text_type());

		assert!(matches!(result, Err(CmsError::Config(_))));
		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn test_register_requires_template_for_rendering_types() {
		let mut registry = TypeRegistry::new(CmsSettings::default());
		let result = registry.register(BlockTypeDescriptor::new("BareBlock", "Bare"));

		assert!(matches!(result, Err(CmsError::Config(_))));
	}

	#[test]
	fn test_non_rendering_type_needs_no_template() {
		let mut registry = TypeRegistry::new(CmsSettings::default());
		registry
			.register(BlockTypeDescriptor::new("AnchorBlock", "Anchor").without_rendering())
			.unwrap();

		assert!(registry.get("AnchorBlock").is_some());
	}

	#[test]
	fn test_is_local_resolves_against_settings() {
		let settings = CmsSettings {
			always_refresh_content: true,
			..CmsSettings::default()
		};
		let mut registry = TypeRegistry::new(settings);
		registry.register(text_type()).unwrap();
		registry
			.register(
				BlockTypeDescriptor::new("ClockBlock", "Clock")
					.with_render_template("blocks/clock.html")
					.with_is_local(true),
			)
			.unwrap();

		assert!(!registry.get("TextBlock").unwrap().is_local());
		assert!(registry.get("ClockBlock").unwrap().is_local());
	}

	#[test]
	fn test_eligible_for_slot_sorts_by_module_then_name() {
		let mut registry = TypeRegistry::new(CmsSettings::default());
		registry
			.register(
				BlockTypeDescriptor::new("ZebraBlock", "Zebra")
					.with_module("Content")
					.with_render_template("blocks/zebra.html"),
			)
			.unwrap();
		registry
			.register(
				BlockTypeDescriptor::new("AlbumBlock", "Album")
					.with_module("Media")
					.with_render_template("blocks/album.html"),
			)
			.unwrap();
		registry.register(text_type()).unwrap();

		let tags: Vec<&str> = registry
			.eligible_for_slot("content", None)
			.iter()
			.map(|d| d.type_tag.as_str())
			.collect();
		// "Content" before "Generic" before "Media"
		assert_eq!(tags, vec!["ZebraBlock", "TextBlock", "AlbumBlock"]);
	}

	#[test]
	fn test_page_only_types_need_page_attached_region() {
		let mut registry = TypeRegistry::new(CmsSettings::default());
		registry
			.register(
				BlockTypeDescriptor::new("NavBlock", "Navigation")
					.page_only()
					.with_render_template("blocks/nav.html"),
			)
			.unwrap();

		let detached = Region::new(1, "content", "Content");
		let attached = Region::new(2, "content", "Content").attached_to_page();

		assert!(registry.eligible_for_slot("content", Some(&detached)).is_empty());
		assert!(registry.eligible_for_slot("content", None).is_empty());
		assert_eq!(registry.eligible_for_slot("content", Some(&attached)).len(), 1);
	}

	#[test]
	fn test_candidate_filter_narrows_eligibility() {
		let mut registry = TypeRegistry::new(CmsSettings::default());
		registry.register(text_type()).unwrap();
		registry
			.register(
				BlockTypeDescriptor::new("VideoBlock", "Video")
					.with_render_template("blocks/video.html"),
			)
			.unwrap();
		registry.add_candidate_filter(|descriptor, slot, _region| {
			slot != "teaser" || descriptor.text_enabled
		});

		assert_eq!(registry.eligible_for_slot("content", None).len(), 2);
		assert!(registry.eligible_for_slot("teaser", None).is_empty());
	}

	#[test]
	fn test_menu_hook_flags_set_at_registration() {
		fn hook(_block: &Block) -> Vec<MenuItem> {
			vec![MenuItem::new("Inspect", "/admin/blocks/inspect/")]
		}

		let mut registry = TypeRegistry::new(CmsSettings::default());
		registry.register(text_type()).unwrap();
		registry
			.register(
				BlockTypeDescriptor::new("AuditBlock", "Audit")
					.with_render_template("blocks/audit.html")
					.with_block_menu_hook(hook),
			)
			.unwrap();

		assert!(!registry.get("TextBlock").unwrap().has_block_menu_items);
		assert!(registry.get("AuditBlock").unwrap().has_block_menu_items);

		let block = Block::new(1, "TextBlock", 0, 1);
		let items = registry.extra_block_menu_items(&block);
		assert_eq!(items.len(), 1);
		assert_eq!(items[0].name, "Inspect");
	}
}

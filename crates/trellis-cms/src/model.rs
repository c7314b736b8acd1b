//! Block and region records
//!
//! Flat, persistence-shaped records for blocks (plugin instances) and the
//! regions (placeholders) that own them. The persistence layer creates and
//! mutates these; this crate only reads them and derives transient tree
//! structure per request.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CmsResult;

/// Identifier of a block, stable within its region
pub type BlockId = u64;

/// Identifier of a region
pub type RegionId = u64;

/// One content block placed within a region
///
/// `parent_id` is `None` for root-level blocks. Children are never stored on
/// the record; they are recomputed from the flat list on every assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
	/// Unique id within the containing region
	pub id: BlockId,

	/// Registered type tag, e.g. `"TextBlock"`
	pub type_tag: String,

	/// Ordering key within the sibling group
	pub position: i32,

	/// Owning region
	pub region_id: RegionId,

	/// Parent block, `None` at root level
	pub parent_id: Option<BlockId>,

	/// Language tag of the content
	pub language: String,
}

impl Block {
	/// Create a root-level block record
	pub fn new(id: BlockId, type_tag: impl Into<String>, position: i32, region_id: RegionId) -> Self {
		Self {
			id,
			type_tag: type_tag.into(),
			position,
			region_id,
			parent_id: None,
			language: "en".to_string(),
		}
	}

	/// Attach the block under a parent block
	pub fn with_parent(mut self, parent_id: BlockId) -> Self {
		self.parent_id = Some(parent_id);
		self
	}

	/// Set the content language
	pub fn with_language(mut self, language: impl Into<String>) -> Self {
		self.language = language.into();
		self
	}
}

/// Reference to the source object owning a region (a page or content object)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
	/// Id of the owning object
	pub object_id: u64,

	/// Content type id of the owning object, as registered with the admin
	pub content_type_id: u64,

	/// Template the object renders with, when it declares one
	pub template: Option<String>,

	/// Public URL of the object's live rendition, when routable
	pub live_url: Option<String>,

	/// Language of the object; trumps any language passed by callers
	pub language: Option<String>,
}

/// A named slot on a page or content object holding an ordered block tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
	/// Region identity
	pub id: RegionId,

	/// Slot name the region is declared under
	pub slot: String,

	/// Human-readable label shown to operators
	pub label: String,

	/// Owning source object, when the region is attached to one
	pub source: Option<SourceRef>,

	/// Configured template identifier; falls back to the source template
	pub template: Option<String>,

	/// Whether the region is attached to a CMS page (as opposed to an
	/// arbitrary content object)
	pub page_attached: bool,
}

impl Region {
	/// Create a detached region for the given slot
	pub fn new(id: RegionId, slot: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			id,
			slot: slot.into(),
			label: label.into(),
			source: None,
			template: None,
			page_attached: false,
		}
	}

	/// Attach the region to a source object
	pub fn with_source(mut self, source: SourceRef) -> Self {
		self.source = Some(source);
		self
	}

	/// Configure the template in effect for the region
	pub fn with_template(mut self, template: impl Into<String>) -> Self {
		self.template = Some(template.into());
		self
	}

	/// Mark the region as attached to a CMS page
	pub fn attached_to_page(mut self) -> Self {
		self.page_attached = true;
		self
	}

	/// The template identifier in effect: the configured one, else the
	/// source object's
	pub fn effective_template(&self) -> Option<&str> {
		self.template
			.as_deref()
			.or_else(|| self.source.as_ref().and_then(|s| s.template.as_deref()))
	}
}

/// Result of downcasting a flat record batch
#[derive(Debug, Clone, Default)]
pub struct DowncastOutcome {
	/// Concrete typed blocks, in the same order as the input
	pub blocks: Vec<Block>,

	/// Regions referenced by the blocks, keyed by id
	pub regions: HashMap<RegionId, Region>,
}

/// Converts generic flat block records into their concrete typed
/// representations, populating each with its owning region
///
/// Implemented by the persistence layer; the structure core never touches
/// storage itself.
pub trait BlockDowncaster {
	/// Downcast a batch of records, fetching the owning regions
	fn downcast(&self, blocks: Vec<Block>) -> CmsResult<DowncastOutcome>;
}

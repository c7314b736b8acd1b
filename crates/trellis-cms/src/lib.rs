//! # Trellis CMS structure core
//!
//! Server-side structure board for the Trellis CMS: assembles the block tree
//! of a region (placeholder), resolves which block types may be placed where,
//! and orchestrates edit-mode rendering of block content.
//!
//! ## Architecture
//!
//! ```text
//! trellis-cms
//! ├── model       - Block and region records, downcasting seam
//! ├── config      - Settings and per-region placement overrides
//! ├── registry    - Block type descriptors, validated at process start
//! ├── constraints - Cached child/parent type constraint resolution
//! ├── tree        - Flat record list -> ordered block forest
//! ├── render      - Edit-mode content rendering with fail-soft batches
//! ├── structure   - Structure board output (node list + drag markup)
//! ├── menu        - Context menu item value objects
//! └── urls        - Admin endpoint URL helpers
//! ```
//!
//! Persistence, form machinery, permissions, routing and the template engine
//! itself live outside this crate and are reached through the narrow traits
//! in [`model`], [`render`], [`structure`] and [`urls`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use trellis_cms::prelude::*;
//!
//! let mut registry = TypeRegistry::new(CmsSettings::default());
//! registry.register(
//!     BlockTypeDescriptor::new("TextBlock", "Text")
//!         .with_render_template("blocks/text.html"),
//! )?;
//!
//! let resolver = ConstraintResolver::new(Arc::new(registry), Arc::new(overrides));
//! let data = build_block_tree(&ctx, blocks, &mut RestrictionsCache::default(), None)?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

// Module declarations
pub mod config;
pub mod constraints;
pub mod menu;
pub mod model;
pub mod registry;
pub mod render;
pub mod structure;
pub mod tree;
pub mod urls;

// Prelude for convenient imports
pub mod prelude {
	//! Convenient re-exports of commonly used items

	// Records
	pub use crate::model::{Block, BlockDowncaster, BlockId, Region, RegionId, SourceRef};

	// Configuration
	pub use crate::config::{CmsSettings, PlacementOverrides, RegionConf};

	// Type registry
	pub use crate::registry::{BlockTypeDescriptor, TypeRegistry};

	// Constraint resolution
	pub use crate::constraints::{
		ConstraintResolver, PlacementContext, RestrictionsCache, TemplateSource,
	};

	// Tree assembly
	pub use crate::tree::{BlockNode, assemble};

	// Rendering
	pub use crate::render::{ContentRenderer, RenderContext, RenderedFragment, render_for_edit};

	// Structure board
	pub use crate::structure::{
		BlockNodeInfo, BlockTreeData, StructureContext, StructureRenderer, build_block_tree,
	};

	// Menus
	pub use crate::menu::{MenuAction, MenuItem};

	// Error handling
	pub use crate::error::{CmsError, CmsResult};
}

/// CMS error types
pub mod error {
	use thiserror::Error;

	/// Errors raised by the structure core
	#[derive(Error, Debug)]
	pub enum CmsError {
		/// Invalid block type declaration, caught at registration time
		#[error("invalid block type configuration: {0}")]
		Config(String),

		/// Block type not present in the registry
		#[error("block type not registered: {0}")]
		UnknownBlockType(String),

		/// A block references a region that was not supplied
		#[error("region {0} not found for block tree")]
		MissingRegion(u64),

		/// Template lookup for placement configuration failed
		#[error("template lookup failed: {0}")]
		Template(String),

		/// Structure markup rendering failed
		#[error("structure rendering failed: {0}")]
		Render(String),

		/// No reversible admin route
		#[error("no reversible route: {0}")]
		Route(String),

		/// Downcasting flat records to typed blocks failed
		#[error("block downcast failed: {0}")]
		Downcast(String),

		/// Output serialization error
		#[error("serialization failed: {0}")]
		Serialization(#[from] serde_json::Error),
	}

	/// Result type for structure core operations
	pub type CmsResult<T> = Result<T, CmsError>;
}

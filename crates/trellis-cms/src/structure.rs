//! Structure board output
//!
//! Combines tree assembly, constraint resolution and edit-mode rendering
//! into the structure the editing surface consumes: a flat node list in
//! document order, concatenated drag-item markup per root, and optionally
//! the rendered content of one target block.

use std::collections::HashMap;

use serde::Serialize;

use crate::constraints::{ConstraintResolver, RestrictionsCache};
use crate::error::{CmsError, CmsResult};
use crate::model::{Block, BlockDowncaster, BlockId, Region, RegionId};
use crate::render::{ContentRenderer, RenderedFragment, render_for_edit};
use crate::tree::{BlockNode, assemble, find_node};
use crate::urls::{
	AdminRouter, ROUTE_ADD_BLOCK, ROUTE_COPY_BLOCKS, ROUTE_DELETE_BLOCK, ROUTE_EDIT_BLOCK,
	ROUTE_MOVE_BLOCK,
};

/// Renders the structural drag-item markup for a root block and its
/// descendants
pub trait StructureRenderer {
	/// Render one root subtree's drag markup
	fn render_drag_item(
		&self,
		node: &BlockNode,
		region: &Region,
		clipboard: bool,
	) -> anyhow::Result<String>;
}

/// Collaborators needed to build a structure board
pub struct StructureContext<'a> {
	/// Constraint resolution
	pub resolver: &'a ConstraintResolver,

	/// Downcasts flat records and fetches their regions
	pub downcaster: &'a dyn BlockDowncaster,

	/// Edit-mode content rendering engine
	pub content_renderer: &'a dyn ContentRenderer,

	/// Drag-item markup rendering
	pub structure_renderer: &'a dyn StructureRenderer,

	/// Admin route reversal
	pub router: &'a dyn AdminRouter,

	/// Region currently acting as the operator's clipboard, if any
	pub clipboard_region: Option<RegionId>,
}

/// Action URLs embedded in a node descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeUrls {
	/// Edit dialog of the block
	#[serde(rename = "edit_plugin")]
	pub edit: String,

	/// Add a block to the region
	#[serde(rename = "add_plugin")]
	pub add: String,

	/// Delete the block
	#[serde(rename = "delete_plugin")]
	pub delete: String,

	/// Move the block
	#[serde(rename = "move_plugin")]
	pub move_to: String,

	/// Copy blocks into the region
	#[serde(rename = "copy_plugin")]
	pub copy: String,
}

/// Per-node descriptor delivered to the editing surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockNodeInfo {
	/// Always `"plugin"`; discriminates node entries from region entries
	#[serde(rename = "type")]
	pub kind: String,

	/// Block id
	#[serde(rename = "plugin_id")]
	pub id: BlockId,

	/// Owning region
	#[serde(rename = "placeholder_id")]
	pub region_id: RegionId,

	/// Registered type tag
	#[serde(rename = "plugin_type")]
	pub type_tag: String,

	/// Display name of the type
	#[serde(rename = "plugin_name")]
	pub name: String,

	/// Content language
	#[serde(rename = "plugin_language")]
	pub language: String,

	/// Parent block id, if nested
	#[serde(rename = "plugin_parent")]
	pub parent_id: Option<BlockId>,

	/// Types that may be inserted as children
	#[serde(rename = "plugin_restriction")]
	pub child_restriction: Vec<String>,

	/// Types that may act as the parent; empty means unrestricted
	#[serde(rename = "plugin_parent_restriction")]
	pub parent_restriction: Vec<String>,

	/// Help text for the add-block action
	#[serde(rename = "addPluginHelpTitle")]
	pub add_help: String,

	/// Ordering placeholder filled in by the client
	#[serde(rename = "plugin_order")]
	pub order: String,

	/// Whether the edit dialog closes itself after saving
	#[serde(rename = "onClose")]
	pub on_close: bool,

	/// Action URLs
	pub urls: NodeUrls,
}

/// Region entry for the add-block toolbar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionToolbarData {
	/// Always `"placeholder"`
	#[serde(rename = "type")]
	pub kind: String,

	/// Region label
	pub name: String,

	/// Region id
	#[serde(rename = "placeholder_id")]
	pub id: RegionId,

	/// Types that may be added at the region root
	#[serde(rename = "plugin_restriction")]
	pub restriction: Vec<String>,

	/// Help text for the add-block action
	#[serde(rename = "addPluginHelpTitle")]
	pub add_help: String,

	/// Add/copy URLs
	pub urls: RegionUrls,
}

/// Action URLs embedded in a region toolbar entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionUrls {
	/// Add a block to the region
	#[serde(rename = "add_plugin")]
	pub add: String,

	/// Copy blocks into the region
	#[serde(rename = "copy_plugin")]
	pub copy: String,
}

/// Combined structure board output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlockTreeData {
	/// Concatenated drag-item markup, one fragment per root
	pub html: String,

	/// Flat node descriptors in document order
	pub plugins: Vec<BlockNodeInfo>,

	/// Rendered content of the target block, when requested and every
	/// type in the batch renders independent of parent context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub content: Option<Vec<RenderedFragment>>,

	/// Ordering key of the target block
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target_position: Option<i32>,

	/// Region of the target block
	#[serde(rename = "target_placeholder_id", skip_serializing_if = "Option::is_none")]
	pub target_region_id: Option<RegionId>,
}

/// Build the structure board for one region's flat block list
///
/// Downcasts the records, assembles the forest, resolves the placement
/// restrictions of every node (sharing `restrictions` across the batch)
/// and renders the per-root drag markup. When `target` is given, its
/// position and region are reported, and its content is rendered through
/// the fail-soft edit pipeline provided every type in the batch is local.
pub fn build_block_tree(
	ctx: &StructureContext<'_>,
	blocks: Vec<Block>,
	restrictions: &mut RestrictionsCache,
	target: Option<BlockId>,
) -> CmsResult<BlockTreeData> {
	if blocks.is_empty() {
		return Ok(BlockTreeData::default());
	}

	let outcome = ctx.downcaster.downcast(blocks)?;
	let flat = outcome.blocks.clone();
	let regions = outcome.regions;
	let roots = assemble(outcome.blocks);

	let clipboard = flat
		.first()
		.is_some_and(|block| ctx.clipboard_region == Some(block.region_id));

	let mut node_list = Vec::new();
	let mut markup_parts = Vec::with_capacity(roots.len());
	for root in &roots {
		collect_node_data(ctx, root, &regions, restrictions, &mut node_list)?;
		let region = region_for(&regions, root.block.region_id)?;
		let markup = ctx
			.structure_renderer
			.render_drag_item(root, region, clipboard)
			.map_err(|error| CmsError::Render(error.to_string()))?;
		markup_parts.push(markup);
	}

	let mut data = BlockTreeData {
		html: markup_parts.join("\n"),
		plugins: node_list,
		..BlockTreeData::default()
	};

	if let Some(target_id) = target {
		if let Some(node) = find_node(&roots, target_id) {
			data.target_position = Some(node.block.position);
			data.target_region_id = Some(node.block.region_id);
			if all_local(ctx.resolver, &flat)? {
				let mut extra = HashMap::new();
				// Hand the parent block to the render context, if any.
				if let Some(parent) = node
					.block
					.parent_id
					.and_then(|id| flat.iter().find(|block| block.id == id))
				{
					extra.insert("parent".to_string(), serde_json::to_value(parent)?);
				}
				data.content = Some(render_for_edit(
					ctx.content_renderer,
					&[node],
					&regions,
					extra,
				));
			}
		}
	}

	Ok(data)
}

/// Toolbar entry for a region, offering the given root-level types
pub fn region_toolbar_data(
	router: &dyn AdminRouter,
	region: &Region,
	allowed: Vec<String>,
) -> CmsResult<RegionToolbarData> {
	Ok(RegionToolbarData {
		kind: "placeholder".to_string(),
		name: region.label.clone(),
		id: region.id,
		restriction: allowed,
		add_help: format!("Add block to region \"{}\"", region.label),
		urls: RegionUrls {
			add: router.reverse(ROUTE_ADD_BLOCK, &[], None)?,
			copy: router.reverse(ROUTE_COPY_BLOCKS, &[], None)?,
		},
	})
}

/// Script wrapper carrying a region toolbar entry to the client
pub fn region_toolbar_js(data: &RegionToolbarData) -> CmsResult<String> {
	let config = serde_json::to_string(data)?;
	Ok(format!(
		r#"<script data-cms id="cms-placeholder-{}" type="text/cms-template">{config}</script>"#,
		data.id
	))
}

/// Script wrapper carrying a node descriptor to the client
pub fn block_toolbar_js(info: &BlockNodeInfo) -> CmsResult<String> {
	let config = serde_json::to_string(info)?;
	Ok(format!(
		r#"<script data-cms id="cms-plugin-{}" type="text/cms-template">{config}</script>"#,
		info.id
	))
}

fn region_for(regions: &HashMap<RegionId, Region>, id: RegionId) -> CmsResult<&Region> {
	regions.get(&id).ok_or(CmsError::MissingRegion(id))
}

fn all_local(resolver: &ConstraintResolver, blocks: &[Block]) -> CmsResult<bool> {
	for block in blocks {
		if !resolver.registry().get_required(&block.type_tag)?.is_local() {
			return Ok(false);
		}
	}
	Ok(true)
}

fn collect_node_data(
	ctx: &StructureContext<'_>,
	node: &BlockNode,
	regions: &HashMap<RegionId, Region>,
	restrictions: &mut RestrictionsCache,
	out: &mut Vec<BlockNodeInfo>,
) -> CmsResult<()> {
	let region = region_for(regions, node.block.region_id)?;
	let (children, parents) = ctx.resolver.restrictions_for(&node.block, region, restrictions)?;
	out.push(block_node_info(ctx, &node.block, children, parents)?);
	for child in &node.children {
		collect_node_data(ctx, child, regions, restrictions, out)?;
	}
	Ok(())
}

fn block_node_info(
	ctx: &StructureContext<'_>,
	block: &Block,
	child_restriction: Vec<String>,
	parent_restriction: Option<Vec<String>>,
) -> CmsResult<BlockNodeInfo> {
	let descriptor = ctx.resolver.registry().get_required(&block.type_tag)?;
	let language = Some(block.language.as_str());
	let urls = NodeUrls {
		edit: ctx.router.reverse(ROUTE_EDIT_BLOCK, &[block.id], language)?,
		add: ctx.router.reverse(ROUTE_ADD_BLOCK, &[], language)?,
		delete: ctx.router.reverse(ROUTE_DELETE_BLOCK, &[block.id], language)?,
		move_to: ctx.router.reverse(ROUTE_MOVE_BLOCK, &[block.id], language)?,
		copy: ctx.router.reverse(ROUTE_COPY_BLOCKS, &[], language)?,
	};

	Ok(BlockNodeInfo {
		kind: "plugin".to_string(),
		id: block.id,
		region_id: block.region_id,
		type_tag: block.type_tag.clone(),
		name: descriptor.name.clone(),
		language: block.language.clone(),
		parent_id: block.parent_id,
		child_restriction,
		parent_restriction: parent_restriction.unwrap_or_default(),
		add_help: format!("Add block to {}", descriptor.name),
		order: String::new(),
		on_close: false,
		urls,
	})
}

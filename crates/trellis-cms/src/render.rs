//! Edit-mode content rendering
//!
//! Thin adapter over the external rendering engine. Rendering always runs
//! as if an edit session were active, whatever the ambient request looked
//! like, and collects injected script/style fragments on a side channel.
//!
//! Rendering is best-effort supplementary data: if anything in a batch
//! fails, the whole batch yields no content and the caller still delivers
//! the surrounding tree metadata. The all-or-nothing scope of that policy
//! is intentional, see [`render_for_edit`].

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::model::{Region, RegionId};
use crate::tree::BlockNode;

/// Side channel collecting script and style fragments injected while a
/// block renders
#[derive(Debug, Clone, Default)]
pub struct AssetCollector {
	js: Vec<String>,
	css: Vec<String>,
}

impl AssetCollector {
	/// Queue a script fragment
	pub fn add_js(&mut self, fragment: impl Into<String>) {
		self.js.push(fragment.into());
	}

	/// Queue a style fragment
	pub fn add_css(&mut self, fragment: impl Into<String>) {
		self.css.push(fragment.into());
	}

	/// All queued script fragments, concatenated
	pub fn js(&self) -> String {
		self.js.concat()
	}

	/// All queued style fragments, concatenated
	pub fn css(&self) -> String {
		self.css.concat()
	}
}

/// Context handed to the rendering engine for one block
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
	/// Edit session active; forced on by the adapter
	pub edit_mode: bool,

	/// Regions accept structure operations; forced on by the adapter
	pub editable: bool,

	/// Extra context values, e.g. the parent block of the render target
	pub extra: HashMap<String, JsonValue>,

	/// Injected asset side channel
	pub assets: AssetCollector,
}

impl RenderContext {
	/// Context with the edit flags forced on
	pub fn for_edit(extra: HashMap<String, JsonValue>) -> Self {
		Self {
			edit_mode: true,
			editable: true,
			extra,
			assets: AssetCollector::default(),
		}
	}
}

/// The external rendering engine
///
/// Implementations may perform blocking I/O (template loading, nested
/// lookups); errors are arbitrary and surface as [`anyhow::Error`] at this
/// seam.
pub trait ContentRenderer {
	/// Render one block subtree to markup
	fn render_block(
		&self,
		node: &BlockNode,
		region: &Region,
		context: &mut RenderContext,
	) -> anyhow::Result<String>;
}

/// Rendered output for one block subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedFragment {
	/// Primary markup
	pub html: String,

	/// Script fragments injected during the render
	pub js: String,

	/// Style fragments injected during the render
	pub css: String,

	/// Ordering key of the rendered block
	pub position: i32,

	/// Region the rendered block lives in
	#[serde(rename = "placeholder_id")]
	pub region_id: RegionId,

	/// Ids the fragment covers: the block and all its descendants
	#[serde(rename = "pluginIds")]
	pub block_ids: Vec<u64>,
}

/// Render a batch of block subtrees in edit mode
///
/// Returns one fragment per node, in input order. If any render fails the
/// whole batch is discarded and an empty list returned; the error is
/// logged so the degradation stays observable. Note the deliberate width
/// of this policy: one broken block also empties the fragments of its
/// unrelated siblings.
pub fn render_for_edit(
	renderer: &dyn ContentRenderer,
	nodes: &[&BlockNode],
	regions: &HashMap<RegionId, Region>,
	extra: HashMap<String, JsonValue>,
) -> Vec<RenderedFragment> {
	match try_render_batch(renderer, nodes, regions, extra) {
		Ok(fragments) => fragments,
		Err(error) => {
			tracing::warn!(%error, "edit-mode render failed, discarding batch content");
			Vec::new()
		}
	}
}

fn try_render_batch(
	renderer: &dyn ContentRenderer,
	nodes: &[&BlockNode],
	regions: &HashMap<RegionId, Region>,
	extra: HashMap<String, JsonValue>,
) -> anyhow::Result<Vec<RenderedFragment>> {
	let mut fragments = Vec::with_capacity(nodes.len());
	for node in nodes {
		let region = regions
			.get(&node.block.region_id)
			.ok_or_else(|| anyhow::anyhow!("region {} not supplied", node.block.region_id))?;
		let mut context = RenderContext::for_edit(extra.clone());
		let html = renderer.render_block(node, region, &mut context)?;
		fragments.push(RenderedFragment {
			html,
			js: context.assets.js(),
			css: context.assets.css(),
			position: node.block.position,
			region_id: node.block.region_id,
			block_ids: node.descendant_ids(),
		});
	}
	Ok(fragments)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::Block;

	struct StaticRenderer;

	impl ContentRenderer for StaticRenderer {
		fn render_block(
			&self,
			node: &BlockNode,
			_region: &Region,
			context: &mut RenderContext,
		) -> anyhow::Result<String> {
			context.assets.add_js("<script>init();</script>");
			Ok(format!("<div>block {}</div>", node.block.id))
		}
	}

	fn region_map() -> HashMap<RegionId, Region> {
		HashMap::from([(1, Region::new(1, "content", "Content"))])
	}

	#[test]
	fn test_renders_batch_with_assets_and_ids() {
		let mut node = BlockNode::leaf(Block::new(1, "TextBlock", 0, 1));
		node.children
			.push_back(BlockNode::leaf(Block::new(2, "TextBlock", 0, 1).with_parent(1)));

		let fragments = render_for_edit(&StaticRenderer, &[&node], &region_map(), HashMap::new());

		assert_eq!(fragments.len(), 1);
		assert_eq!(fragments[0].html, "<div>block 1</div>");
		assert_eq!(fragments[0].js, "<script>init();</script>");
		assert_eq!(fragments[0].block_ids, vec![1, 2]);
		assert_eq!(fragments[0].region_id, 1);
	}

	#[test]
	fn test_edit_flags_are_forced_on() {
		let context = RenderContext::for_edit(HashMap::new());
		assert!(context.edit_mode);
		assert!(context.editable);
	}

	#[test]
	fn test_missing_region_empties_the_batch() {
		let node = BlockNode::leaf(Block::new(1, "TextBlock", 0, 7));

		let fragments = render_for_edit(&StaticRenderer, &[&node], &region_map(), HashMap::new());

		assert!(fragments.is_empty());
	}
}

//! Tree assembly
//!
//! Converts the flat, parent-linked block list of one region into an
//! ordered forest in a single pass. The input is iterated in reverse and
//! every node is prepended to its parent's child collection, which restores
//! the original forward order without a separate sort; `VecDeque` keeps the
//! front insertion O(1).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::{Block, BlockId};

/// One block with its assembled children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNode {
	/// The block record
	pub block: Block,

	/// Direct children in sibling order
	pub children: VecDeque<BlockNode>,
}

impl BlockNode {
	/// Wrap a block with no children
	pub fn leaf(block: Block) -> Self {
		Self {
			block,
			children: VecDeque::new(),
		}
	}

	/// The node's id plus every id reachable through its children, in
	/// pre-order
	///
	/// Consumers use this to know which nodes a rendered fragment already
	/// covers.
	pub fn descendant_ids(&self) -> Vec<BlockId> {
		let mut ids = vec![self.block.id];
		for child in &self.children {
			ids.extend(child.descendant_ids());
		}
		ids
	}

	/// Total number of nodes in this subtree
	pub fn len(&self) -> usize {
		1 + self.children.iter().map(BlockNode::len).sum::<usize>()
	}

	/// Always false; a node contains at least itself
	pub fn is_empty(&self) -> bool {
		false
	}
}

/// Assemble the ordered forest from a flat block list
///
/// Blocks whose parent id is absent from the input are treated as roots;
/// a parent filtered out upstream degrades the subtree rather than failing
/// the assembly. The input is expected in position order with parents
/// before their children (the persistence contract); input violating that
/// contract keeps the stranded nodes visible as roots.
pub fn assemble(blocks: Vec<Block>) -> VecDeque<BlockNode> {
	let known_ids: HashSet<BlockId> = blocks.iter().map(|block| block.id).collect();
	let mut pending_children: HashMap<BlockId, VecDeque<BlockNode>> = HashMap::new();
	let mut roots: VecDeque<BlockNode> = VecDeque::new();

	for block in blocks.into_iter().rev() {
		let children = pending_children.remove(&block.id).unwrap_or_default();
		let parent_id = block.parent_id.filter(|id| known_ids.contains(id));
		let node = BlockNode { block, children };

		match parent_id {
			Some(parent_id) => pending_children
				.entry(parent_id)
				.or_default()
				.push_front(node),
			None => roots.push_front(node),
		}
	}

	// A child listed before its parent never gets drained above; surface
	// such strays as roots instead of dropping them.
	if !pending_children.is_empty() {
		let mut strays: Vec<BlockNode> = pending_children
			.into_values()
			.flatten()
			.collect();
		strays.sort_by_key(|node| (node.block.position, node.block.id));
		for node in strays.into_iter().rev() {
			roots.push_front(node);
		}
	}

	roots
}

/// Find the node with the given id in an assembled forest
pub fn find_node(roots: &VecDeque<BlockNode>, id: BlockId) -> Option<&BlockNode> {
	for root in roots {
		if root.block.id == id {
			return Some(root);
		}
		if let Some(found) = find_node(&root.children, id) {
			return Some(found);
		}
	}
	None
}

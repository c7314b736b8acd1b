//! Constraint resolution
//!
//! Answers, for a block type and a placement context, which types may be
//! inserted as its children and which types may act as its parent.
//! Placement configuration overrides take absolute precedence over the
//! structural rules derived from descriptor declarations.
//!
//! Results may require a template fetch to compute, and are requested once
//! per node while the structure board renders, so resolution is memoized
//! process-wide by the full input tuple. Template lookups are two-phase:
//! cheap key material goes into the cache key, the actual fetch only runs
//! when the cached path misses.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::PlacementOverrides;
use crate::error::CmsResult;
use crate::model::{Block, BlockId, Region};
use crate::registry::{BlockTypeDescriptor, TypeRegistry};

/// Template lookup split into cheap key material and the actual fetch
///
/// `cache_key_material` must not perform I/O; it only has to identify the
/// template source well enough to key a cache entry. `resolve` may hit the
/// database and is only called when a cached computation misses.
pub trait TemplateSource {
	/// Cheap identifying material for cache keys
	fn cache_key_material(&self) -> String;

	/// Fetch the template identifier in effect
	fn resolve(&self) -> CmsResult<Option<String>>;
}

/// A template known up front, no fetch involved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTemplate(pub String);

impl TemplateSource for StaticTemplate {
	fn cache_key_material(&self) -> String {
		self.0.clone()
	}

	fn resolve(&self) -> CmsResult<Option<String>> {
		Ok(Some(self.0.clone()))
	}
}

/// Template source backed by an in-memory region record
#[derive(Debug, Clone, Copy)]
pub struct RegionTemplate<'a>(pub &'a Region);

impl TemplateSource for RegionTemplate<'_> {
	fn cache_key_material(&self) -> String {
		match self.0.effective_template() {
			Some(template) => template.to_string(),
			None => format!("region:{}", self.0.id),
		}
	}

	fn resolve(&self) -> CmsResult<Option<String>> {
		Ok(self.0.effective_template().map(str::to_string))
	}
}

/// Where a block type is being placed
#[derive(Clone, Copy)]
pub struct PlacementContext<'a> {
	/// Slot name of the region
	pub slot: &'a str,

	/// The region itself, when available for eligibility filtering
	pub region: Option<&'a Region>,

	/// Template lookup for placement configuration
	pub template: Option<&'a dyn TemplateSource>,

	/// Block instance the lookup is made for, when template inheritance is
	/// instance-specific
	pub instance_id: Option<BlockId>,
}

impl<'a> PlacementContext<'a> {
	/// Context for a bare slot with no region, template or instance
	pub fn for_slot(slot: &'a str) -> Self {
		Self {
			slot,
			region: None,
			template: None,
			instance_id: None,
		}
	}

	/// Attach the region record
	pub fn with_region(mut self, region: &'a Region) -> Self {
		self.region = Some(region);
		self
	}

	/// Attach a template source
	pub fn with_template(mut self, template: &'a dyn TemplateSource) -> Self {
		self.template = Some(template);
		self
	}

	/// Attach the block instance identity
	pub fn with_instance(mut self, instance_id: BlockId) -> Self {
		self.instance_id = Some(instance_id);
		self
	}

	fn key_material(&self) -> Option<String> {
		self.template.map(|t| t.cache_key_material())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ResolveOp {
	ChildTypes,
	ParentTypes,
	RequireParent,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
	op: ResolveOp,
	type_tag: String,
	slot: String,
	template: Option<String>,
	instance: Option<BlockId>,
}

impl CacheKey {
	fn new(op: ResolveOp, type_tag: &str, ctx: &PlacementContext<'_>) -> Self {
		Self {
			op,
			type_tag: type_tag.to_string(),
			slot: ctx.slot.to_string(),
			template: ctx.key_material(),
			instance: ctx.instance_id,
		}
	}
}

#[derive(Debug, Clone)]
enum CachedValue {
	Types(Option<Vec<String>>),
	Flag(bool),
}

/// Template resolved at most once per resolver call
struct LazyTemplate<'a> {
	source: Option<&'a dyn TemplateSource>,
	resolved: RefCell<Option<Option<String>>>,
}

impl<'a> LazyTemplate<'a> {
	fn new(ctx: &PlacementContext<'a>) -> Self {
		Self {
			source: ctx.template,
			resolved: RefCell::new(None),
		}
	}

	fn get(&self) -> CmsResult<Option<String>> {
		if let Some(value) = self.resolved.borrow().clone() {
			return Ok(value);
		}
		let value = match self.source {
			Some(source) => source.resolve()?,
			None => None,
		};
		*self.resolved.borrow_mut() = Some(value.clone());
		Ok(value)
	}
}

/// Per-batch restriction cache shared across the nodes of one structure
/// board build
///
/// Entries are only stored for types whose descriptor opts into caching
/// the respective list.
#[derive(Debug, Default)]
pub struct RestrictionsCache {
	children: HashMap<String, Vec<String>>,
	parents: HashMap<String, Option<Vec<String>>>,
}

impl RestrictionsCache {
	/// Create an empty per-batch cache
	pub fn new() -> Self {
		Self::default()
	}
}

/// Resolves child/parent placement constraints with process-wide memoization
pub struct ConstraintResolver {
	registry: Arc<TypeRegistry>,
	overrides: Arc<PlacementOverrides>,
	cache: DashMap<CacheKey, CachedValue>,
}

impl ConstraintResolver {
	/// Create a resolver over the given registry and placement overrides
	pub fn new(registry: Arc<TypeRegistry>, overrides: Arc<PlacementOverrides>) -> Self {
		Self {
			registry,
			overrides,
			cache: DashMap::new(),
		}
	}

	/// The type registry the resolver reads from
	pub fn registry(&self) -> &TypeRegistry {
		&self.registry
	}

	/// Drop every memoized result
	///
	/// Invalidation hook for configuration reloads and tests.
	pub fn purge(&self) {
		self.cache.clear();
	}

	/// Number of memoized entries
	pub fn cache_size(&self) -> usize {
		self.cache.len()
	}

	/// Block types that may be inserted as children of `type_tag` in the
	/// given placement
	///
	/// A configured or declared child-type list takes absolute precedence:
	/// the result is its intersection with the slot's candidate types,
	/// preserving the list's own order. Otherwise every candidate is
	/// admitted whose own parent restriction is unset, empty, or names
	/// `type_tag`.
	pub fn resolve_child_types(
		&self,
		type_tag: &str,
		ctx: PlacementContext<'_>,
	) -> CmsResult<Vec<String>> {
		let descriptor = self.registry.get_required(type_tag)?;
		let key = CacheKey::new(ResolveOp::ChildTypes, type_tag, &ctx);
		if descriptor.cache_child_types {
			if let Some(entry) = self.cache.get(&key) {
				if let CachedValue::Types(Some(hit)) = entry.value().clone() {
					return Ok(hit);
				}
			}
		}

		let lazy = LazyTemplate::new(&ctx);
		let result = self.child_types_inner(descriptor, &ctx, &lazy)?;
		if descriptor.cache_child_types {
			self.cache.insert(key, CachedValue::Types(Some(result.clone())));
		}
		Ok(result)
	}

	/// Block types that may act as the parent of `type_tag` in the given
	/// placement; `None` means unrestricted
	pub fn resolve_parent_types(
		&self,
		type_tag: &str,
		ctx: PlacementContext<'_>,
	) -> CmsResult<Option<Vec<String>>> {
		let descriptor = self.registry.get_required(type_tag)?;
		let lazy = LazyTemplate::new(&ctx);
		self.parent_types_inner(descriptor, &ctx, &lazy)
	}

	/// Whether `type_tag` must be placed under a parent block in the given
	/// placement
	///
	/// True when the require-parent flag is set (or overridden by
	/// configuration for the region), or when the type declares a
	/// non-empty parent restriction.
	pub fn requires_parent(&self, type_tag: &str, ctx: PlacementContext<'_>) -> CmsResult<bool> {
		let descriptor = self.registry.get_required(type_tag)?;
		let lazy = LazyTemplate::new(&ctx);
		self.requires_parent_inner(descriptor, &ctx, &lazy)
	}

	/// Block types that may be inserted at the root of the region
	///
	/// Candidate types for the slot minus every type that requires a
	/// parent. This is what the region's add-block menu offers.
	pub fn resolve_region_types(&self, ctx: PlacementContext<'_>) -> CmsResult<Vec<String>> {
		let lazy = LazyTemplate::new(&ctx);
		let template = lazy.get()?;
		let mut allowed = Vec::new();
		for candidate in self.slot_candidates(&ctx, template.as_deref()) {
			if !self.requires_parent_inner(candidate, &ctx, &lazy)? {
				allowed.push(candidate.type_tag.clone());
			}
		}
		Ok(allowed)
	}

	/// Child and parent restrictions for one block, consulting the
	/// per-batch cache before the resolver
	///
	/// The batch cache is only written for types whose descriptor opts
	/// into caching the respective list, so uncached types are recomputed
	/// per node as declared.
	pub fn restrictions_for(
		&self,
		block: &Block,
		region: &Region,
		cache: &mut RestrictionsCache,
	) -> CmsResult<(Vec<String>, Option<Vec<String>>)> {
		let descriptor = self.registry.get_required(&block.type_tag)?;
		let template = RegionTemplate(region);
		let ctx = PlacementContext::for_slot(&region.slot)
			.with_region(region)
			.with_template(&template)
			.with_instance(block.id);

		let parents = match cache.parents.get(&block.type_tag) {
			Some(hit) => hit.clone(),
			None => {
				let parents = self.resolve_parent_types(&block.type_tag, ctx)?;
				if descriptor.cache_parent_types {
					cache.parents.insert(block.type_tag.clone(), parents.clone());
				}
				parents
			}
		};

		let children = match cache.children.get(&block.type_tag) {
			Some(hit) => hit.clone(),
			None => {
				let children = self.resolve_child_types(&block.type_tag, ctx)?;
				if descriptor.cache_child_types {
					cache.children.insert(block.type_tag.clone(), children.clone());
				}
				children
			}
		};

		Ok((children, parents))
	}

	/// Candidate types for the slot: registry eligibility intersected with
	/// the configured region type list
	fn slot_candidates(
		&self,
		ctx: &PlacementContext<'_>,
		template: Option<&str>,
	) -> Vec<&BlockTypeDescriptor> {
		let mut candidates = self.registry.eligible_for_slot(ctx.slot, ctx.region);
		if let Some(allowed) = self.overrides.region_types(ctx.slot, template) {
			candidates.retain(|candidate| allowed.contains(&candidate.type_tag));
		}
		candidates
	}

	fn child_types_inner(
		&self,
		descriptor: &BlockTypeDescriptor,
		ctx: &PlacementContext<'_>,
		lazy: &LazyTemplate<'_>,
	) -> CmsResult<Vec<String>> {
		let template = lazy.get()?;
		let declared = self
			.overrides
			.child_type_override(&descriptor.type_tag, ctx.slot, template.as_deref())
			.or_else(|| descriptor.child_types.clone())
			.filter(|list| !list.is_empty());
		let candidates = self.slot_candidates(ctx, template.as_deref());

		// Overrides win outright: intersect with the candidates, keeping
		// the override's own order.
		if let Some(allowed) = declared {
			let candidate_tags: HashSet<&str> =
				candidates.iter().map(|c| c.type_tag.as_str()).collect();
			return Ok(allowed
				.into_iter()
				.filter(|tag| candidate_tags.contains(tag.as_str()))
				.collect());
		}

		// Structural rule: a candidate is a valid child when it has no
		// parent restriction, or the restriction names this type.
		let mut children = Vec::new();
		for candidate in candidates {
			let allowed_parents = self.parent_types_inner(candidate, ctx, lazy)?;
			let admitted = match &allowed_parents {
				None => true,
				Some(parents) => parents.is_empty() || parents.contains(&descriptor.type_tag),
			};
			if admitted {
				children.push(candidate.type_tag.clone());
			}
		}
		Ok(children)
	}

	fn parent_types_inner(
		&self,
		descriptor: &BlockTypeDescriptor,
		ctx: &PlacementContext<'_>,
		lazy: &LazyTemplate<'_>,
	) -> CmsResult<Option<Vec<String>>> {
		let key = CacheKey::new(ResolveOp::ParentTypes, &descriptor.type_tag, ctx);
		if descriptor.cache_parent_types {
			if let Some(entry) = self.cache.get(&key) {
				if let CachedValue::Types(hit) = entry.value().clone() {
					return Ok(hit);
				}
			}
		}

		let template = lazy.get()?;
		let parents = self
			.overrides
			.parent_type_override(&descriptor.type_tag, ctx.slot, template.as_deref())
			.or_else(|| descriptor.parent_types.clone());
		if descriptor.cache_parent_types {
			self.cache.insert(key, CachedValue::Types(parents.clone()));
		}
		Ok(parents)
	}

	fn requires_parent_inner(
		&self,
		descriptor: &BlockTypeDescriptor,
		ctx: &PlacementContext<'_>,
		lazy: &LazyTemplate<'_>,
	) -> CmsResult<bool> {
		let key = CacheKey::new(ResolveOp::RequireParent, &descriptor.type_tag, ctx);
		let flag = if let Some(CachedValue::Flag(hit)) =
			self.cache.get(&key).map(|entry| entry.value().clone())
		{
			hit
		} else {
			let template = lazy.get()?;
			let flag = self
				.overrides
				.require_parent(ctx.slot, template.as_deref())
				.unwrap_or(descriptor.require_parent);
			self.cache.insert(key, CachedValue::Flag(flag));
			flag
		};

		if flag {
			return Ok(true);
		}
		let parents = self.parent_types_inner(descriptor, ctx, lazy)?;
		Ok(parents.is_some_and(|list| !list.is_empty()))
	}
}

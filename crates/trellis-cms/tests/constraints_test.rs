//! Constraint resolution tests: override precedence, structural rules and
//! memoization behavior

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rstest::rstest;
use trellis_cms::config::{CmsSettings, PlacementOverrides, RegionConf};
use trellis_cms::constraints::{
	ConstraintResolver, PlacementContext, RestrictionsCache, StaticTemplate, TemplateSource,
};
use trellis_cms::error::{CmsError, CmsResult};
use trellis_cms::model::{Block, Region};
use trellis_cms::registry::{BlockTypeDescriptor, TypeRegistry};

/// Template source instrumented to count how often the expensive fetch runs
struct CountingTemplate {
	name: String,
	resolves: Arc<AtomicUsize>,
}

impl CountingTemplate {
	fn new(name: &str) -> (Self, Arc<AtomicUsize>) {
		let resolves = Arc::new(AtomicUsize::new(0));
		(
			Self {
				name: name.to_string(),
				resolves: Arc::clone(&resolves),
			},
			resolves,
		)
	}
}

impl TemplateSource for CountingTemplate {
	fn cache_key_material(&self) -> String {
		self.name.clone()
	}

	fn resolve(&self) -> CmsResult<Option<String>> {
		self.resolves.fetch_add(1, Ordering::SeqCst);
		Ok(Some(self.name.clone()))
	}
}

fn registry() -> TypeRegistry {
	let mut registry = TypeRegistry::new(CmsSettings::default());
	registry
		.register(
			BlockTypeDescriptor::new("TextBlock", "Text").with_render_template("blocks/text.html"),
		)
		.unwrap();
	registry
		.register(
			BlockTypeDescriptor::new("LinkBlock", "Link").with_render_template("blocks/link.html"),
		)
		.unwrap();
	registry
		.register(
			BlockTypeDescriptor::new("ImageBlock", "Image")
				.with_module("Media")
				.with_render_template("blocks/image.html"),
		)
		.unwrap();
	// Captions only live under images.
	registry
		.register(
			BlockTypeDescriptor::new("CaptionBlock", "Caption")
				.with_module("Media")
				.with_parent_types(["ImageBlock"])
				.with_render_template("blocks/caption.html"),
		)
		.unwrap();
	registry
}

fn resolver_with(overrides: PlacementOverrides) -> ConstraintResolver {
	ConstraintResolver::new(Arc::new(registry()), Arc::new(overrides))
}

#[test]
fn test_structural_rule_admits_unrestricted_candidates() {
	// Arrange
	let resolver = resolver_with(PlacementOverrides::new());

	// Act
	let children = resolver
		.resolve_child_types("TextBlock", PlacementContext::for_slot("content"))
		.unwrap();

	// Assert - CaptionBlock is excluded: its parent restriction names
	// ImageBlock only. Order follows (module, name) enumeration.
	assert_eq!(children, vec!["LinkBlock", "TextBlock", "ImageBlock"]);
}

#[test]
fn test_structural_rule_admits_candidate_whose_parents_name_this_type() {
	let resolver = resolver_with(PlacementOverrides::new());

	let children = resolver
		.resolve_child_types("ImageBlock", PlacementContext::for_slot("content"))
		.unwrap();

	assert!(children.contains(&"CaptionBlock".to_string()));
}

#[test]
fn test_override_takes_precedence_over_structural_rule() {
	// Arrange - structurally TextBlock would allow Text/Link/Image; the
	// placement override narrows it to two.
	let mut conf = RegionConf::default();
	conf.child_types.insert(
		"TextBlock".to_string(),
		vec!["LinkBlock".to_string(), "ImageBlock".to_string()],
	);
	let mut overrides = PlacementOverrides::new();
	overrides.insert("content", conf);
	let resolver = resolver_with(overrides);

	// Act
	let children = resolver
		.resolve_child_types("TextBlock", PlacementContext::for_slot("content"))
		.unwrap();

	// Assert - the override intersected with valid candidates, not the
	// union; TextBlock itself stays out despite being structurally valid.
	assert_eq!(children, vec!["LinkBlock", "ImageBlock"]);
}

#[test]
fn test_override_entries_outside_candidates_are_dropped() {
	let mut conf = RegionConf::default();
	conf.child_types.insert(
		"TextBlock".to_string(),
		vec!["GhostBlock".to_string(), "LinkBlock".to_string()],
	);
	let mut overrides = PlacementOverrides::new();
	overrides.insert("content", conf);
	let resolver = resolver_with(overrides);

	let children = resolver
		.resolve_child_types("TextBlock", PlacementContext::for_slot("content"))
		.unwrap();

	assert_eq!(children, vec!["LinkBlock"]);
}

#[test]
fn test_declared_child_types_behave_like_overrides() {
	let mut registry = TypeRegistry::new(CmsSettings::default());
	registry
		.register(
			BlockTypeDescriptor::new("ColumnBlock", "Column")
				.with_child_types(["TextBlock"])
				.with_render_template("blocks/column.html"),
		)
		.unwrap();
	registry
		.register(
			BlockTypeDescriptor::new("TextBlock", "Text").with_render_template("blocks/text.html"),
		)
		.unwrap();
	registry
		.register(
			BlockTypeDescriptor::new("LinkBlock", "Link").with_render_template("blocks/link.html"),
		)
		.unwrap();
	let resolver =
		ConstraintResolver::new(Arc::new(registry), Arc::new(PlacementOverrides::new()));

	let children = resolver
		.resolve_child_types("ColumnBlock", PlacementContext::for_slot("content"))
		.unwrap();

	assert_eq!(children, vec!["TextBlock"]);
}

#[test]
fn test_region_type_conf_narrows_candidates() {
	let mut overrides = PlacementOverrides::new();
	overrides.insert(
		"sidebar",
		RegionConf {
			types: Some(vec!["LinkBlock".to_string()]),
			..RegionConf::default()
		},
	);
	let resolver = resolver_with(overrides);

	let children = resolver
		.resolve_child_types("TextBlock", PlacementContext::for_slot("sidebar"))
		.unwrap();

	assert_eq!(children, vec!["LinkBlock"]);
}

#[rstest]
#[case("TextBlock", false)]
#[case("CaptionBlock", true)]
fn test_parent_restriction_implies_requires_parent(#[case] type_tag: &str, #[case] expected: bool) {
	let resolver = resolver_with(PlacementOverrides::new());

	let requires = resolver
		.requires_parent(type_tag, PlacementContext::for_slot("content"))
		.unwrap();

	assert_eq!(requires, expected);
}

#[test]
fn test_require_parent_conf_overrides_flag() {
	let mut overrides = PlacementOverrides::new();
	overrides.insert(
		"content",
		RegionConf {
			require_parent: Some(true),
			..RegionConf::default()
		},
	);
	let resolver = resolver_with(overrides);

	assert!(resolver
		.requires_parent("TextBlock", PlacementContext::for_slot("content"))
		.unwrap());
}

#[test]
fn test_region_types_exclude_parent_requiring_types() {
	let resolver = resolver_with(PlacementOverrides::new());

	let allowed = resolver
		.resolve_region_types(PlacementContext::for_slot("content"))
		.unwrap();

	assert!(allowed.contains(&"TextBlock".to_string()));
	assert!(!allowed.contains(&"CaptionBlock".to_string()));
}

#[test]
fn test_unknown_type_is_an_error() {
	let resolver = resolver_with(PlacementOverrides::new());

	let result = resolver.resolve_child_types("GhostBlock", PlacementContext::for_slot("content"));

	assert!(matches!(result, Err(CmsError::UnknownBlockType(_))));
}

#[test]
fn test_second_resolution_does_not_hit_the_slow_path() {
	// Arrange
	let resolver = resolver_with(PlacementOverrides::new());
	let (template, resolves) = CountingTemplate::new("landing.html");
	let ctx = PlacementContext::for_slot("content").with_template(&template);

	// Act
	let first = resolver.resolve_child_types("TextBlock", ctx).unwrap();
	let second = resolver.resolve_child_types("TextBlock", ctx).unwrap();

	// Assert - identical results, and the template fetch ran exactly once.
	assert_eq!(first, second);
	assert_eq!(resolves.load(Ordering::SeqCst), 1);
}

#[test]
fn test_uncached_types_recompute_each_time() {
	let mut registry = TypeRegistry::new(CmsSettings::default());
	registry
		.register(
			BlockTypeDescriptor::new("FeedBlock", "Feed")
				.uncached_child_types()
				.uncached_parent_types()
				.with_render_template("blocks/feed.html"),
		)
		.unwrap();
	let resolver =
		ConstraintResolver::new(Arc::new(registry), Arc::new(PlacementOverrides::new()));
	let (template, resolves) = CountingTemplate::new("landing.html");
	let ctx = PlacementContext::for_slot("content").with_template(&template);

	resolver.resolve_child_types("FeedBlock", ctx).unwrap();
	resolver.resolve_child_types("FeedBlock", ctx).unwrap();

	assert_eq!(resolves.load(Ordering::SeqCst), 2);
}

#[test]
fn test_purge_empties_the_memo_cache() {
	let resolver = resolver_with(PlacementOverrides::new());
	let (template, resolves) = CountingTemplate::new("landing.html");
	let ctx = PlacementContext::for_slot("content").with_template(&template);

	resolver.resolve_child_types("TextBlock", ctx).unwrap();
	assert!(resolver.cache_size() > 0);

	resolver.purge();
	assert_eq!(resolver.cache_size(), 0);

	resolver.resolve_child_types("TextBlock", ctx).unwrap();
	assert_eq!(resolves.load(Ordering::SeqCst), 2);
}

#[test]
fn test_distinct_templates_cache_separately() {
	let mut overrides = PlacementOverrides::new();
	let mut conf = RegionConf::default();
	conf.child_types
		.insert("TextBlock".to_string(), vec!["LinkBlock".to_string()]);
	overrides.insert("landing.html content", conf);
	let resolver = resolver_with(overrides);

	let landing = StaticTemplate("landing.html".to_string());
	let article = StaticTemplate("article.html".to_string());

	let narrowed = resolver
		.resolve_child_types(
			"TextBlock",
			PlacementContext::for_slot("content").with_template(&landing),
		)
		.unwrap();
	let unrestricted = resolver
		.resolve_child_types(
			"TextBlock",
			PlacementContext::for_slot("content").with_template(&article),
		)
		.unwrap();

	assert_eq!(narrowed, vec!["LinkBlock"]);
	assert_eq!(unrestricted.len(), 3);
}

#[test]
fn test_restrictions_for_shares_the_batch_cache() {
	let resolver = resolver_with(PlacementOverrides::new());
	let region = Region::new(1, "content", "Content");
	let mut cache = RestrictionsCache::new();

	let first_block = Block::new(1, "CaptionBlock", 0, 1);
	let second_block = Block::new(2, "CaptionBlock", 1, 1);

	let (children_a, parents_a) = resolver
		.restrictions_for(&first_block, &region, &mut cache)
		.unwrap();
	let (children_b, parents_b) = resolver
		.restrictions_for(&second_block, &region, &mut cache)
		.unwrap();

	assert_eq!(children_a, children_b);
	assert_eq!(parents_a, parents_b);
	assert_eq!(parents_a, Some(vec!["ImageBlock".to_string()]));
}

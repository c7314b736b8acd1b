//! Settings and placement configuration
//!
//! [`CmsSettings`] carries the process-wide toggles consumed by the structure
//! core. [`PlacementOverrides`] is the per-region placement configuration: a
//! mapping from region keys to [`RegionConf`] entries that override the
//! static child/parent declarations of block types.
//!
//! Region keys are matched most-specific first: `"<template> <slot>"`, then
//! `"<slot>"`, then `"<template>"`, then the catch-all default entry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Process-wide settings for the structure core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsSettings {
	/// When set, block output is always recomputed and no block is treated
	/// as renderable independent of its parent context
	pub always_refresh_content: bool,

	/// Default output-cache participation for block types that do not
	/// declare their own
	pub plugin_cache: bool,

	/// Querystring parameter carrying the live URL on edit endpoints
	pub live_url_param: String,

	/// Whether edit endpoint URLs carry the live URL parameter at all
	pub live_url_param_enabled: bool,
}

impl Default for CmsSettings {
	fn default() -> Self {
		Self {
			always_refresh_content: false,
			plugin_cache: true,
			live_url_param: "live-url".to_string(),
			live_url_param_enabled: false,
		}
	}
}

/// Placement configuration for one region key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConf {
	/// Block types allowed in the region at all; unset means unrestricted
	pub types: Option<Vec<String>>,

	/// Allowed child types per block type, overriding static declarations
	pub child_types: HashMap<String, Vec<String>>,

	/// Allowed parent types per block type, overriding static declarations
	pub parent_types: HashMap<String, Vec<String>>,

	/// Overrides the require-parent flag for every type in the region
	pub require_parent: Option<bool>,
}

/// Per-region placement overrides, keyed by region slot and template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementOverrides {
	/// Keyed entries; keys are `"<slot>"`, `"<template> <slot>"` or
	/// `"<template>"`
	pub entries: HashMap<String, RegionConf>,

	/// Catch-all entry consulted when no keyed entry matches
	pub default: Option<RegionConf>,
}

impl PlacementOverrides {
	/// Create an empty configuration (every lookup falls through)
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a configuration entry under the given region key
	pub fn insert(&mut self, key: impl Into<String>, conf: RegionConf) -> &mut Self {
		self.entries.insert(key.into(), conf);
		self
	}

	/// Walk the key precedence chain and return the first hit `pick`
	/// produces
	fn lookup<T>(
		&self,
		slot: &str,
		template: Option<&str>,
		pick: impl Fn(&RegionConf) -> Option<T>,
	) -> Option<T> {
		let mut keys = Vec::with_capacity(3);
		if let Some(template) = template {
			keys.push(format!("{template} {slot}"));
		}
		keys.push(slot.to_string());
		if let Some(template) = template {
			keys.push(template.to_string());
		}

		for key in &keys {
			if let Some(value) = self.entries.get(key).and_then(&pick) {
				return Some(value);
			}
		}
		self.default.as_ref().and_then(&pick)
	}

	/// Allowed types for the region, when the configuration restricts them
	pub fn region_types(&self, slot: &str, template: Option<&str>) -> Option<Vec<String>> {
		self.lookup(slot, template, |conf| conf.types.clone())
	}

	/// Configured child-type override for one block type
	pub fn child_type_override(
		&self,
		type_tag: &str,
		slot: &str,
		template: Option<&str>,
	) -> Option<Vec<String>> {
		self.lookup(slot, template, |conf| conf.child_types.get(type_tag).cloned())
	}

	/// Configured parent-type override for one block type
	pub fn parent_type_override(
		&self,
		type_tag: &str,
		slot: &str,
		template: Option<&str>,
	) -> Option<Vec<String>> {
		self.lookup(slot, template, |conf| conf.parent_types.get(type_tag).cloned())
	}

	/// Configured require-parent override for the region
	pub fn require_parent(&self, slot: &str, template: Option<&str>) -> Option<bool> {
		self.lookup(slot, template, |conf| conf.require_parent)
	}
}

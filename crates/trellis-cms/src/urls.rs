//! Admin endpoint URLs
//!
//! Builds the URLs the editing surface posts to. Route reversal itself is
//! the URL-routing collaborator's job behind [`AdminRouter`]; this module
//! only knows route names and the live-URL querystring convention.

use crate::config::CmsSettings;
use crate::error::CmsResult;
use crate::model::SourceRef;

/// Route adding a block to a region
pub const ROUTE_ADD_BLOCK: &str = "cms_region_add_block";
/// Route copying blocks into a region
pub const ROUTE_COPY_BLOCKS: &str = "cms_region_copy_blocks";
/// Route opening the edit dialog of a block
pub const ROUTE_EDIT_BLOCK: &str = "cms_block_edit";
/// Route moving a block
pub const ROUTE_MOVE_BLOCK: &str = "cms_block_move";
/// Route deleting a block
pub const ROUTE_DELETE_BLOCK: &str = "cms_block_delete";
/// Edit endpoint of a frontend-editable source object
pub const ROUTE_OBJECT_EDIT: &str = "cms_region_object_edit";
/// Preview endpoint of a frontend-editable source object
pub const ROUTE_OBJECT_PREVIEW: &str = "cms_region_object_preview";
/// Structure endpoint of a frontend-editable source object
pub const ROUTE_OBJECT_STRUCTURE: &str = "cms_region_object_structure";

/// Reverses admin route names to URLs
///
/// Implemented by the URL-routing collaborator. `language` selects the
/// localized URL prefix where the router supports one.
pub trait AdminRouter {
	/// Reverse a named route with positional arguments
	fn reverse(&self, route: &str, args: &[u64], language: Option<&str>) -> CmsResult<String>;
}

/// Append the source object's live URL to `url` under the configured
/// querystring parameter
///
/// Degrades to the unmodified URL when the object has no routable live
/// rendition.
pub fn with_live_url_param(source: &SourceRef, url: &str, settings: &CmsSettings) -> String {
	let Some(live_url) = source.live_url.as_deref() else {
		return url.to_string();
	};
	let separator = if url.contains('?') { '&' } else { '?' };
	format!("{url}{separator}{}={live_url}", settings.live_url_param)
}

fn object_url(
	router: &dyn AdminRouter,
	route: &str,
	source: &SourceRef,
	language: Option<&str>,
	settings: &CmsSettings,
) -> CmsResult<String> {
	// The object's own language trumps the caller's.
	let language = source.language.as_deref().or(language);
	let url = router.reverse(route, &[source.content_type_id, source.object_id], language)?;
	if settings.live_url_param_enabled {
		return Ok(with_live_url_param(source, &url, settings));
	}
	Ok(url)
}

/// URL of the edit endpoint for a frontend-editable source object
pub fn object_edit_url(
	router: &dyn AdminRouter,
	source: &SourceRef,
	language: Option<&str>,
	settings: &CmsSettings,
) -> CmsResult<String> {
	object_url(router, ROUTE_OBJECT_EDIT, source, language, settings)
}

/// URL of the preview endpoint for a frontend-editable source object
pub fn object_preview_url(
	router: &dyn AdminRouter,
	source: &SourceRef,
	language: Option<&str>,
	settings: &CmsSettings,
) -> CmsResult<String> {
	object_url(router, ROUTE_OBJECT_PREVIEW, source, language, settings)
}

/// URL of the structure endpoint for a frontend-editable source object
pub fn object_structure_url(
	router: &dyn AdminRouter,
	source: &SourceRef,
	language: Option<&str>,
) -> CmsResult<String> {
	let language = source.language.as_deref().or(language);
	router.reverse(
		ROUTE_OBJECT_STRUCTURE,
		&[source.content_type_id, source.object_id],
		language,
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::CmsError;

	struct FixedRouter;

	impl AdminRouter for FixedRouter {
		fn reverse(&self, route: &str, args: &[u64], language: Option<&str>) -> CmsResult<String> {
			let prefix = language.unwrap_or("en");
			let args: Vec<String> = args.iter().map(u64::to_string).collect();
			Ok(format!("/{prefix}/admin/{route}/{}/", args.join("/")))
		}
	}

	struct BrokenRouter;

	impl AdminRouter for BrokenRouter {
		fn reverse(&self, route: &str, _args: &[u64], _language: Option<&str>) -> CmsResult<String> {
			Err(CmsError::Route(route.to_string()))
		}
	}

	fn source() -> SourceRef {
		SourceRef {
			object_id: 7,
			content_type_id: 3,
			template: None,
			live_url: Some("/about/".to_string()),
			language: None,
		}
	}

	#[test]
	fn test_live_url_param_appended_with_separator() {
		let settings = CmsSettings::default();

		assert_eq!(
			with_live_url_param(&source(), "/admin/edit/7/", &settings),
			"/admin/edit/7/?live-url=/about/"
		);
		assert_eq!(
			with_live_url_param(&source(), "/admin/edit/7/?step=2", &settings),
			"/admin/edit/7/?step=2&live-url=/about/"
		);
	}

	#[test]
	fn test_live_url_param_degrades_without_live_url() {
		let settings = CmsSettings::default();
		let mut source = source();
		source.live_url = None;

		assert_eq!(
			with_live_url_param(&source, "/admin/edit/7/", &settings),
			"/admin/edit/7/"
		);
	}

	#[test]
	fn test_object_language_trumps_parameter() {
		let mut source = source();
		source.language = Some("de".to_string());

		let url = object_edit_url(&FixedRouter, &source, Some("fr"), &CmsSettings::default())
			.unwrap();
		assert!(url.starts_with("/de/"));
	}

	#[test]
	fn test_edit_url_carries_live_param_when_enabled() {
		let settings = CmsSettings {
			live_url_param_enabled: true,
			..CmsSettings::default()
		};

		let url = object_edit_url(&FixedRouter, &source(), None, &settings).unwrap();
		assert_eq!(url, "/en/admin/cms_region_object_edit/3/7/?live-url=/about/");
	}

	#[test]
	fn test_router_errors_propagate() {
		let result = object_structure_url(&BrokenRouter, &source(), None);
		assert!(matches!(result, Err(CmsError::Route(_))));
	}
}

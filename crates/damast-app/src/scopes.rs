//! Which change scopes each view's projection depends on

use damast_core::{ChangeScope, ScopeSet, ViewKind};

use ChangeScope::*;

/// Scopes that, beyond filters and the active place set, invalidate `view`
fn settings_dependencies(view: ViewKind) -> &'static [ChangeScope] {
    match view {
        ViewKind::LocationList | ViewKind::Tags => &[],
        ViewKind::Map => &[DisplayMode, ConfidenceAspect, MapMode, ShowOnlyActive],
        ViewKind::Untimed => &[DisplayMode, ConfidenceAspect],
        ViewKind::Timeline => &[DisplayMode, ConfidenceAspect, TimelineMode],
        ViewKind::Hierarchy | ViewKind::Sources => &[DisplayMode, ConfidenceAspect, ShowOnlyActive],
        ViewKind::Confidence => &[ConfidenceAspect],
    }
}

/// Whether `view` has to recompute after a change notification
pub fn affects(scopes: &ScopeSet, view: ViewKind) -> bool {
    invalidates_brush(scopes) || scopes.touches(settings_dependencies(view))
}

/// Whether the current highlight no longer matches the dataset: any filter,
/// the active place set, or a reload changed
pub fn invalidates_brush(scopes: &ScopeSet) -> bool {
    scopes.touches_filters() || scopes.contains(PlaceSet)
}

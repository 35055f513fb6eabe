//! Pointer-driven interaction state and its transitions.
//!
//! The flags are orthogonal. Each transition reports which recomputation tier it
//! needs: hover, selection and zoom only restyle the scene, expanding or collapsing
//! a cluster changes the laid-out node set and re-runs placement.

use std::collections::BTreeSet;

use log::debug;

use super::placement::Layout;
use super::policy::LayoutConfig;
use super::types::Forest;

/// Raw interaction, already resolved to a node or the empty canvas by hit testing.
#[derive(Clone, Debug, PartialEq)]
pub enum InteractionEvent {
	/// Pointer moved onto a node.
	PointerEnter(String),
	/// Pointer left every node.
	PointerLeave,
	/// Click on a node body.
	ClickNode(String),
	/// Click on the cluster badge of a node.
	ClickClusterBadge(String),
	/// Click on empty canvas.
	ClickCanvas,
	/// Double click on empty canvas.
	DoubleClickCanvas,
	/// New zoom factor from the view transform.
	Zoom(f64),
	/// The "show all details" toggle.
	SetShowAllDetails(bool),
}

/// Outbound notifications for collaborators outside the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SceneEvent {
	/// A node was selected; the detail panel should show it.
	NodeActivated {
		/// The selected node.
		node_id: String,
	},
	/// The renderer should re-center and fit the view.
	Recenter,
}

/// How much of the pipeline a transition invalidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Recompute {
	/// Nothing changed.
	Nothing,
	/// Visibility and edge styling must be re-evaluated.
	Presentation,
	/// The laid-out node set changed; placement must re-run.
	Structure,
}

/// Result of applying one event.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
	/// Pipeline tier to re-run.
	pub recompute: Recompute,
	/// Notifications to forward.
	pub events: Vec<SceneEvent>,
}

impl Transition {
	fn quiet(recompute: Recompute) -> Self {
		Self {
			recompute,
			events: Vec::new(),
		}
	}
}

/// Selection, hover, cluster expansion, zoom and the detail toggle.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionState {
	/// Selected node.
	pub selected: Option<String>,
	/// Node under the pointer.
	pub hovered: Option<String>,
	/// Parents whose cluster the user opened.
	pub expanded: BTreeSet<String>,
	/// Current zoom factor.
	pub zoom: f64,
	/// Show every detail node regardless of hover or selection.
	pub show_all_details: bool,
}

impl InteractionState {
	/// Initial state: nothing selected, hovered or expanded, default zoom.
	pub fn new(config: &LayoutConfig) -> Self {
		Self {
			selected: None,
			hovered: None,
			expanded: BTreeSet::new(),
			zoom: config.default_zoom.clamp(config.min_zoom, config.max_zoom),
			show_all_details: false,
		}
	}

	/// Whether `id` is hovered or selected.
	pub fn is_focus(&self, id: &str) -> bool {
		self.hovered.as_deref() == Some(id) || self.selected.as_deref() == Some(id)
	}

	/// Applies one event.
	pub fn apply(&mut self, event: InteractionEvent, config: &LayoutConfig) -> Transition {
		match event {
			InteractionEvent::PointerEnter(id) => {
				if self.hovered.as_deref() == Some(id.as_str()) {
					return Transition::quiet(Recompute::Nothing);
				}
				self.hovered = Some(id);
				Transition::quiet(Recompute::Presentation)
			}
			InteractionEvent::PointerLeave => match self.hovered.take() {
				Some(_) => Transition::quiet(Recompute::Presentation),
				None => Transition::quiet(Recompute::Nothing),
			},
			InteractionEvent::ClickNode(id) => {
				if self.selected.as_deref() == Some(id.as_str()) {
					self.selected = None;
					return Transition::quiet(Recompute::Presentation);
				}
				self.selected = Some(id.clone());
				Transition {
					recompute: Recompute::Presentation,
					events: vec![SceneEvent::NodeActivated { node_id: id }],
				}
			}
			InteractionEvent::ClickClusterBadge(id) => {
				if !self.expanded.remove(&id) {
					self.expanded.insert(id);
				}
				Transition::quiet(Recompute::Structure)
			}
			InteractionEvent::ClickCanvas => match self.selected.take() {
				Some(_) => Transition::quiet(Recompute::Presentation),
				None => Transition::quiet(Recompute::Nothing),
			},
			InteractionEvent::DoubleClickCanvas => Transition {
				recompute: Recompute::Nothing,
				events: vec![SceneEvent::Recenter],
			},
			InteractionEvent::Zoom(zoom) => {
				let zoom = if zoom.is_finite() {
					zoom.clamp(config.min_zoom, config.max_zoom)
				} else {
					self.zoom
				};
				if zoom == self.zoom {
					return Transition::quiet(Recompute::Nothing);
				}
				self.zoom = zoom;
				Transition::quiet(Recompute::Presentation)
			}
			InteractionEvent::SetShowAllDetails(show) => {
				if show == self.show_all_details {
					return Transition::quiet(Recompute::Nothing);
				}
				self.show_all_details = show;
				Transition::quiet(Recompute::Presentation)
			}
		}
	}

	/// Drops references to nodes that no longer exist or are no longer laid out.
	/// Returns whether anything was cleared.
	pub fn prune(&mut self, forest: &Forest, layout: &Layout) -> bool {
		let before = self.expanded.len();
		self.expanded.retain(|id| forest.contains(id));
		let mut changed = self.expanded.len() != before;

		for (slot, kind) in [(&mut self.selected, "selection"), (&mut self.hovered, "hover")] {
			if slot.as_deref().is_some_and(|id| !layout.contains(id)) {
				debug!("clearing stale {kind} {:?}", slot);
				*slot = None;
				changed = true;
			}
		}
		changed
	}

	/// Clears hover and selection that point at a node no longer drawn.
	/// Returns whether anything was cleared.
	pub fn drop_hidden(&mut self, is_visible: impl Fn(&str) -> bool) -> bool {
		let mut changed = false;
		for (slot, kind) in [(&mut self.selected, "selection"), (&mut self.hovered, "hover")] {
			if slot.as_deref().is_some_and(|id| !is_visible(id)) {
				debug!("clearing {kind} {:?}: node is hidden", slot);
				*slot = None;
				changed = true;
			}
		}
		changed
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn state() -> (InteractionState, LayoutConfig) {
		let config = LayoutConfig::default();
		(InteractionState::new(&config), config)
	}

	#[test]
	fn test_initial_state() {
		let (s, config) = state();
		assert_eq!(s.selected, None);
		assert_eq!(s.hovered, None);
		assert!(s.expanded.is_empty());
		assert!(!s.show_all_details);
		assert_eq!(s.zoom, config.default_zoom);
	}

	#[test]
	fn test_hover_is_presentation_only() {
		let (mut s, config) = state();
		let t = s.apply(InteractionEvent::PointerEnter("a".into()), &config);
		assert_eq!(t.recompute, Recompute::Presentation);
		assert_eq!(s.hovered.as_deref(), Some("a"));
		let again = s.apply(InteractionEvent::PointerEnter("a".into()), &config);
		assert_eq!(again.recompute, Recompute::Nothing);
		let left = s.apply(InteractionEvent::PointerLeave, &config);
		assert_eq!(left.recompute, Recompute::Presentation);
		assert_eq!(s.hovered, None);
	}

	#[test]
	fn test_click_toggles_selection_and_activates() {
		let (mut s, config) = state();
		let t = s.apply(InteractionEvent::ClickNode("story".into()), &config);
		assert_eq!(
			t.events,
			vec![SceneEvent::NodeActivated {
				node_id: "story".into()
			}]
		);
		assert_eq!(s.selected.as_deref(), Some("story"));
		let t = s.apply(InteractionEvent::ClickNode("story".into()), &config);
		assert!(t.events.is_empty());
		assert_eq!(s.selected, None);
	}

	#[test]
	fn test_badge_click_toggles_expansion_structurally() {
		let (mut s, config) = state();
		let t = s.apply(InteractionEvent::ClickClusterBadge("angle".into()), &config);
		assert_eq!(t.recompute, Recompute::Structure);
		assert!(s.expanded.contains("angle"));
		s.apply(InteractionEvent::ClickClusterBadge("angle".into()), &config);
		assert!(s.expanded.is_empty());
	}

	#[test]
	fn test_canvas_clicks() {
		let (mut s, config) = state();
		s.apply(InteractionEvent::ClickNode("a".into()), &config);
		let t = s.apply(InteractionEvent::ClickCanvas, &config);
		assert_eq!(t.recompute, Recompute::Presentation);
		assert_eq!(s.selected, None);
		let t = s.apply(InteractionEvent::DoubleClickCanvas, &config);
		assert_eq!(t.recompute, Recompute::Nothing);
		assert_eq!(t.events, vec![SceneEvent::Recenter]);
	}

	#[test]
	fn test_zoom_is_clamped() {
		let (mut s, config) = state();
		s.apply(InteractionEvent::Zoom(100.0), &config);
		assert_eq!(s.zoom, config.max_zoom);
		s.apply(InteractionEvent::Zoom(0.0), &config);
		assert_eq!(s.zoom, config.min_zoom);
		let t = s.apply(InteractionEvent::Zoom(f64::NAN), &config);
		assert_eq!(t.recompute, Recompute::Nothing);
		assert_eq!(s.zoom, config.min_zoom);
	}

	#[test]
	fn test_drop_hidden_clears_focus() {
		let (mut s, config) = state();
		s.apply(InteractionEvent::PointerEnter("detail".into()), &config);
		s.apply(InteractionEvent::ClickNode("story".into()), &config);
		assert!(s.drop_hidden(|id| id != "detail"));
		assert_eq!(s.hovered, None);
		assert_eq!(s.selected.as_deref(), Some("story"));
		assert!(!s.drop_hidden(|_| true));
	}

	#[test]
	fn test_detail_toggle() {
		let (mut s, config) = state();
		let t = s.apply(InteractionEvent::SetShowAllDetails(true), &config);
		assert_eq!(t.recompute, Recompute::Presentation);
		let t = s.apply(InteractionEvent::SetShowAllDetails(true), &config);
		assert_eq!(t.recompute, Recompute::Nothing);
	}
}

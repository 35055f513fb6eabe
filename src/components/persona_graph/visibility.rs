//! Semantic zoom and contextual reveal.
//!
//! Runs on every hover, selection and zoom change, so it only reads the cached
//! layout and never moves a node.

use std::collections::BTreeMap;

use super::interaction::InteractionState;
use super::placement::Layout;
use super::policy::LayoutConfig;
use super::types::{Forest, GraphEdge, Layer};

/// How much of a node the renderer draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DetailLevel {
	/// Not drawn.
	Hidden,
	/// Glyph only: icon and color, no text.
	Macro,
	/// Card with title, tags and content.
	Full,
}

/// Presentation of one edge.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeStyle {
	/// 0.0 for suppressed edges, the baseline for quiet ones, 1.0 when highlighted.
	pub opacity: f64,
	/// Stroke color.
	pub color: String,
	/// Whether the renderer animates a flow along the edge.
	pub animated: bool,
	/// Whether an endpoint is hovered or selected.
	pub highlighted: bool,
	/// Whether the edge reacts to the pointer.
	pub interactive: bool,
}

/// Classification of every laid-out node and every edge between laid-out nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Visibility {
	/// Detail level per laid-out node.
	pub nodes: BTreeMap<String, DetailLevel>,
	/// Style per edge whose endpoints are both laid out.
	pub edges: BTreeMap<String, EdgeStyle>,
}

impl Visibility {
	/// Detail level of `id`; anything not laid out is hidden.
	pub fn level(&self, id: &str) -> DetailLevel {
		self.nodes.get(id).copied().unwrap_or(DetailLevel::Hidden)
	}

	/// Whether `id` is drawn at all.
	pub fn is_visible(&self, id: &str) -> bool {
		self.level(id) != DetailLevel::Hidden
	}
}

/// Classifies nodes by zoom, ancestry and focus, then styles the edges between them.
pub fn classify(
	forest: &Forest,
	edges: &[GraphEdge],
	layout: &Layout,
	interaction: &InteractionState,
	config: &LayoutConfig,
) -> Visibility {
	let zoomed_out = interaction.zoom < config.macro_zoom_threshold;
	let mut nodes = BTreeMap::new();

	for id in forest.breadth_first() {
		let Some(placed) = layout.nodes.get(id) else {
			continue;
		};
		let parent_hidden = forest.parent(id).is_some_and(|parent| {
			nodes
				.get(parent)
				.is_none_or(|level| *level == DetailLevel::Hidden)
		});
		let level = if parent_hidden {
			DetailLevel::Hidden
		} else {
			match placed.layer {
				Layer::Profile | Layer::Angle => DetailLevel::Full,
				Layer::Story if zoomed_out => DetailLevel::Macro,
				Layer::Story => DetailLevel::Full,
				Layer::Detail if zoomed_out => DetailLevel::Hidden,
				Layer::Detail => {
					// A focused detail keeps its whole family open, so the pointer can
					// move from the story onto the details it revealed.
					let revealed = interaction.show_all_details
						|| forest.parent(id).is_some_and(|story| {
							interaction.is_focus(story)
								|| forest.children(story).iter().any(|d| interaction.is_focus(d))
						});
					if revealed {
						DetailLevel::Full
					} else {
						DetailLevel::Hidden
					}
				}
			}
		};
		nodes.insert(id.clone(), level);
	}

	let mut styles = BTreeMap::new();
	for edge in edges {
		let (Some(source), Some(target)) = (nodes.get(&edge.source_id), nodes.get(&edge.target_id))
		else {
			continue;
		};
		let style = if *source == DetailLevel::Hidden || *target == DetailLevel::Hidden {
			EdgeStyle {
				opacity: 0.0,
				color: config.baseline_edge_color.clone(),
				animated: false,
				highlighted: false,
				interactive: false,
			}
		} else if interaction.is_focus(&edge.source_id) || interaction.is_focus(&edge.target_id) {
			let color = edge_track(forest, edge)
				.and_then(|track| config.track_color(track))
				.unwrap_or(&config.baseline_edge_color)
				.to_owned();
			EdgeStyle {
				opacity: 1.0,
				color,
				animated: config.animate_highlighted_edges,
				highlighted: true,
				interactive: true,
			}
		} else {
			EdgeStyle {
				opacity: config.baseline_edge_opacity,
				color: config.baseline_edge_color.clone(),
				animated: false,
				highlighted: false,
				interactive: true,
			}
		};
		styles.insert(edge.id.clone(), style);
	}

	Visibility {
		nodes,
		edges: styles,
	}
}

/// Track of the outer endpoint; the profile end of an angle edge has none.
fn edge_track(forest: &Forest, edge: &GraphEdge) -> Option<usize> {
	forest
		.track_index(&edge.target_id)
		.or_else(|| forest.track_index(&edge.source_id))
}

//! The positioned, visibility-resolved scene and the pipeline that keeps it current.
//!
//! Two recomputation tiers:
//! - structural: placement, re-run when the snapshot or the cluster expansion changes
//! - presentational: visibility and edge styling, re-run on hover, selection and zoom

use log::{debug, info, warn};

use super::error::GraphError;
use super::geometry::Point;
use super::interaction::{InteractionEvent, InteractionState, Recompute, SceneEvent};
use super::placement::{Layout, place};
use super::policy::{LayerPolicy, LayoutConfig, truncate_label};
use super::types::{Forest, GraphNode, Layer, PersonaGraph};
use super::visibility::{DetailLevel, Visibility, classify};

/// Badge drawn on a parent whose children form a cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClusterBadge {
	/// Number of children behind the badge.
	pub child_count: usize,
	/// Whether the children are currently shown.
	pub expanded: bool,
}

/// A drawable node.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
	/// Node id.
	pub id: String,
	/// Ring of the node.
	pub layer: Layer,
	/// Horizontal position relative to the center.
	pub x: f64,
	/// Vertical position relative to the center.
	pub y: f64,
	/// Macro glyph or full card.
	pub detail_level: DetailLevel,
	/// Whether the node is selected.
	pub is_selected: bool,
	/// Whether the pointer is over the node.
	pub is_hovered: bool,
	/// Visual diameter.
	pub diameter: f64,
	/// Fill color: the node's track color, or the layer default.
	pub color: String,
	/// Truncated title; absent for macro glyphs.
	pub label: Option<String>,
	/// Label font size in px.
	pub label_font_size: f64,
	/// Distance from node center to label baseline.
	pub label_offset: f64,
	/// Display confidence, 0.0..=1.0.
	pub confidence: f64,
	/// Cluster badge, if the node heads a cluster.
	pub cluster: Option<ClusterBadge>,
}

impl SceneNode {
	/// Center of the node.
	pub fn position(&self) -> Point {
		Point::new(self.x, self.y)
	}
}

/// A drawable edge.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneEdge {
	/// Edge id.
	pub id: String,
	/// Source node id.
	pub source_id: String,
	/// Target node id.
	pub target_id: String,
	/// Stroke opacity.
	pub opacity: f64,
	/// Stroke color.
	pub color: String,
	/// Whether to draw the flow animation.
	pub animated: bool,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
	/// Visible nodes, parents before children.
	pub nodes: Vec<SceneNode>,
	/// Visible edges in snapshot order.
	pub edges: Vec<SceneEdge>,
}

impl Scene {
	/// Looks up a visible node.
	pub fn node(&self, id: &str) -> Option<&SceneNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Bounding box of all visible nodes including their size, as (min, max).
	pub fn bounds(&self) -> Option<(Point, Point)> {
		self.nodes.iter().fold(None, |acc, node| {
			let r = node.diameter / 2.0;
			let (lo, hi) = (
				Point::new(node.x - r, node.y - r),
				Point::new(node.x + r, node.y + r),
			);
			Some(match acc {
				None => (lo, hi),
				Some((min, max)) => (
					Point::new(min.x.min(lo.x), min.y.min(lo.y)),
					Point::new(max.x.max(hi.x), max.y.max(hi.y)),
				),
			})
		})
	}
}

/// Owns the current snapshot, interaction state and cached layout, and emits scenes.
pub struct PersonaGraphEngine {
	graph: PersonaGraph,
	forest: Forest,
	policy: LayerPolicy,
	config: LayoutConfig,
	interaction: InteractionState,
	layout: Layout,
	visibility: Visibility,
	scene: Scene,
	layout_runs: usize,
}

impl Default for PersonaGraphEngine {
	fn default() -> Self {
		Self::build(LayerPolicy::default(), LayoutConfig::default())
	}
}

impl PersonaGraphEngine {
	/// Creates an engine showing only the placeholder profile.
	pub fn new(policy: LayerPolicy, config: LayoutConfig) -> Result<Self, GraphError> {
		policy.validate()?;
		Ok(Self::build(policy, config))
	}

	fn build(policy: LayerPolicy, config: LayoutConfig) -> Self {
		let graph = PersonaGraph::default().normalized();
		let forest = Forest::from_graph(&graph);
		let interaction = InteractionState::new(&config);
		let mut engine = Self {
			graph,
			forest,
			policy,
			config,
			interaction,
			layout: Layout::default(),
			visibility: Visibility::default(),
			scene: Scene::default(),
			layout_runs: 0,
		};
		engine.relayout();
		engine.restyle();
		engine
	}

	/// Replaces the snapshot. Invalid snapshots are rejected and the previous one stays.
	pub fn replace_graph(&mut self, graph: PersonaGraph) -> Result<(), GraphError> {
		let graph = graph.normalized();
		if let Err(err) = graph.validate() {
			warn!("rejecting persona graph snapshot: {err}");
			return Err(err);
		}
		info!(
			"persona graph replaced: {} nodes, {} edges",
			graph.nodes.len(),
			graph.edges.len()
		);
		self.forest = Forest::from_graph(&graph);
		self.graph = graph;
		self.relayout();
		self.restyle();
		Ok(())
	}

	/// Decodes a JSON snapshot and replaces the current one with it.
	pub fn replace_graph_json(&mut self, json: &str) -> Result<(), GraphError> {
		self.replace_graph(PersonaGraph::from_json(json)?)
	}

	/// Applies an interaction and returns the notifications it produced.
	pub fn dispatch(&mut self, event: InteractionEvent) -> Vec<SceneEvent> {
		let target = match &event {
			InteractionEvent::PointerEnter(id) | InteractionEvent::ClickNode(id) => {
				Some((id.as_str(), self.layout.contains(id)))
			}
			InteractionEvent::ClickClusterBadge(id) => {
				Some((id.as_str(), self.layout.clusters.contains_key(id)))
			}
			_ => None,
		};
		if let Some((id, false)) = target {
			debug!("ignoring {event:?}: `{id}` is not a laid-out target");
			return Vec::new();
		}

		let transition = self.interaction.apply(event, &self.config);
		match transition.recompute {
			Recompute::Nothing => {}
			Recompute::Presentation => self.restyle(),
			Recompute::Structure => {
				self.relayout();
				self.restyle();
			}
		}
		transition.events
	}

	fn relayout(&mut self) {
		let previous = (!self.layout.nodes.is_empty()).then_some(&self.layout);
		let layout = place(
			&self.forest,
			&self.policy,
			&self.config,
			&self.interaction.expanded,
			previous,
		);
		self.layout = layout;
		self.layout_runs += 1;
		self.interaction.prune(&self.forest, &self.layout);
	}

	fn restyle(&mut self) {
		self.visibility = self.classify();
		let visibility = &self.visibility;
		if self.interaction.drop_hidden(|id| visibility.is_visible(id)) {
			self.visibility = self.classify();
		}
		self.scene = self.emit();
	}

	fn classify(&self) -> Visibility {
		classify(
			&self.forest,
			&self.graph.edges,
			&self.layout,
			&self.interaction,
			&self.config,
		)
	}

	fn emit(&self) -> Scene {
		let nodes = self
			.forest
			.breadth_first()
			.iter()
			.filter_map(|id| {
				let detail_level = self.visibility.level(id);
				if detail_level == DetailLevel::Hidden {
					return None;
				}
				let node = self.forest.node(id)?;
				let position = self.layout.position(id)?;
				Some(self.scene_node(node, position, detail_level))
			})
			.collect();

		let edges = self
			.graph
			.edges
			.iter()
			.filter_map(|edge| {
				let style = self.visibility.edges.get(&edge.id)?;
				(style.opacity > 0.0).then(|| SceneEdge {
					id: edge.id.clone(),
					source_id: edge.source_id.clone(),
					target_id: edge.target_id.clone(),
					opacity: style.opacity,
					color: style.color.clone(),
					animated: style.animated,
				})
			})
			.collect();

		Scene { nodes, edges }
	}

	fn scene_node(&self, node: &GraphNode, position: Point, detail_level: DetailLevel) -> SceneNode {
		let style = self.policy.style(node.layer);
		let color = self
			.forest
			.track_index(&node.id)
			.and_then(|track| self.config.track_color(track))
			.unwrap_or(&style.fill)
			.to_owned();
		SceneNode {
			id: node.id.clone(),
			layer: node.layer,
			x: position.x,
			y: position.y,
			detail_level,
			is_selected: self.interaction.selected.as_deref() == Some(node.id.as_str()),
			is_hovered: self.interaction.hovered.as_deref() == Some(node.id.as_str()),
			diameter: style.diameter,
			color,
			label: (detail_level == DetailLevel::Full)
				.then(|| truncate_label(&node.title, style.label_max_chars)),
			label_font_size: style.label_font_size,
			label_offset: style.label_offset,
			confidence: node.confidence.clamp(0.0, 1.0),
			cluster: self.layout.clusters.get(&node.id).map(|c| ClusterBadge {
				child_count: c.child_count,
				expanded: c.expanded,
			}),
		}
	}

	/// The current scene.
	pub fn scene(&self) -> &Scene {
		&self.scene
	}

	/// The cached layout.
	pub fn layout(&self) -> &Layout {
		&self.layout
	}

	/// The current interaction state.
	pub fn interaction(&self) -> &InteractionState {
		&self.interaction
	}

	/// Full payload of a node, for the detail panel.
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.forest.node(id)
	}

	/// Layout tuning in use.
	pub fn config(&self) -> &LayoutConfig {
		&self.config
	}

	/// Number of structural layout passes run so far.
	pub fn layout_runs(&self) -> usize {
		self.layout_runs
	}
}

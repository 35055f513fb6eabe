use log::error;

use super::geometry::Point;
use super::interaction::{InteractionEvent, SceneEvent};
use super::scene::{PersonaGraphEngine, SceneNode};
use super::types::{GraphNode, PersonaGraph};

/// Extra world-space slack around a node for pointer hits.
pub const HIT_SLOP: f64 = 4.0;
/// Radius of the cluster badge disc.
pub const BADGE_RADIUS: f64 = 9.0;
/// Screen-space margin kept free when fitting the graph to the canvas.
pub const FIT_MARGIN: f64 = 40.0;

/// Screen transform: graph point `p` is drawn at `p * k + (x, y)`.
#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	/// Horizontal translation in px.
	pub x: f64,
	/// Vertical translation in px.
	pub y: f64,
	/// Scale, the zoom level.
	pub k: f64,
}

/// Background drag in progress.
#[derive(Clone, Debug, Default)]
pub struct PanState {
	/// A button is held down on the canvas.
	pub active: bool,
	/// The pointer moved far enough that release is not a click.
	pub moved: bool,
	/// Press position.
	pub start_x: f64,
	/// Press position.
	pub start_y: f64,
	/// Transform at press time.
	pub transform_start_x: f64,
	/// Transform at press time.
	pub transform_start_y: f64,
}

/// Eased hover highlight, 0.0 (none) to 1.0 (full).
#[derive(Clone, Debug, Default)]
pub struct HighlightFade {
	/// Current highlight strength.
	pub highlight_t: f64,
	delay_t: f64,
}

/// Canvas-side state: the engine plus everything the renderer needs between frames.
pub struct PersonaGraphState {
	/// Layout engine and interaction state.
	pub engine: PersonaGraphEngine,
	/// Pan and zoom.
	pub transform: ViewTransform,
	/// Background drag.
	pub pan: PanState,
	/// Hover highlight easing.
	pub fade: HighlightFade,
	/// Canvas width in px.
	pub width: f64,
	/// Canvas height in px.
	pub height: f64,
	/// Seconds elapsed, drives the edge flow animation.
	pub flow_time: f64,
}

/// Center of the cluster badge drawn on `node`.
pub fn badge_center(node: &SceneNode) -> Point {
	let r = node.diameter / 2.0;
	node.position() + Point::new(r * 0.75, -r * 0.75)
}

impl PersonaGraphState {
	/// Lays out `data` and fits it into a `width` x `height` canvas.
	pub fn new(data: &PersonaGraph, width: f64, height: f64) -> Self {
		let mut state = Self {
			engine: PersonaGraphEngine::default(),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			pan: PanState::default(),
			fade: HighlightFade::default(),
			width,
			height,
			flow_time: 0.0,
		};
		state.set_graph(data.clone());
		state.fit_to_view();
		state
	}

	/// Swaps in a new snapshot; a rejected snapshot leaves the current graph on screen.
	pub fn set_graph(&mut self, data: PersonaGraph) {
		if let Err(err) = self.engine.replace_graph(data) {
			error!("persona graph snapshot rejected: {err}");
		}
	}

	/// Converts canvas px to graph coordinates.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Point {
		Point::new(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Top-most visible node under the screen point.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<String> {
		let p = self.screen_to_graph(sx, sy);
		self.engine
			.scene()
			.nodes
			.iter()
			.rev()
			.find(|node| node.position().distance(p) <= node.diameter / 2.0 + HIT_SLOP)
			.map(|node| node.id.clone())
	}

	/// Node whose cluster badge is under the screen point.
	pub fn badge_at_position(&self, sx: f64, sy: f64) -> Option<String> {
		let p = self.screen_to_graph(sx, sy);
		self.engine
			.scene()
			.nodes
			.iter()
			.rev()
			.filter(|node| node.cluster.is_some())
			.find(|node| badge_center(node).distance(p) <= BADGE_RADIUS + HIT_SLOP / 2.0)
			.map(|node| node.id.clone())
	}

	/// Updates hover from the pointer position.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		let event = match self.node_at_position(sx, sy) {
			Some(id) => InteractionEvent::PointerEnter(id),
			None => InteractionEvent::PointerLeave,
		};
		let was_hovering = self.engine.interaction().hovered.is_some();
		self.engine.dispatch(event);
		if !was_hovering && self.engine.interaction().hovered.is_some() {
			self.fade.delay_t = 0.0;
		}
	}

	/// The pointer left the canvas.
	pub fn pointer_leave(&mut self) {
		self.pan.active = false;
		self.engine.dispatch(InteractionEvent::PointerLeave);
	}

	/// Resolves a click to a badge, a node or the canvas. Returns the events the host
	/// should see; a re-center intent is handled here.
	pub fn click(&mut self, sx: f64, sy: f64) -> Vec<SceneEvent> {
		let event = if let Some(id) = self.badge_at_position(sx, sy) {
			InteractionEvent::ClickClusterBadge(id)
		} else if let Some(id) = self.node_at_position(sx, sy) {
			InteractionEvent::ClickNode(id)
		} else {
			InteractionEvent::ClickCanvas
		};
		let events = self.engine.dispatch(event);
		self.handle(events)
	}

	/// A double click re-centers the view unless it lands on a node.
	pub fn double_click(&mut self, sx: f64, sy: f64) -> Vec<SceneEvent> {
		if self.node_at_position(sx, sy).is_some() {
			return Vec::new();
		}
		let events = self.engine.dispatch(InteractionEvent::DoubleClickCanvas);
		self.handle(events)
	}

	/// Full payload of every node activated by `events`, for the detail panel.
	pub fn activated(&self, events: &[SceneEvent]) -> Vec<GraphNode> {
		events
			.iter()
			.filter_map(|event| match event {
				SceneEvent::NodeActivated { node_id } => self.engine.node(node_id).cloned(),
				SceneEvent::Recenter => None,
			})
			.collect()
	}

	fn handle(&mut self, events: Vec<SceneEvent>) -> Vec<SceneEvent> {
		events
			.into_iter()
			.filter(|event| {
				if *event == SceneEvent::Recenter {
					self.fit_to_view();
					return false;
				}
				true
			})
			.collect()
	}

	/// Zooms by `factor` keeping the screen point under the pointer fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let config = self.engine.config();
		let new_k = (self.transform.k * factor).clamp(config.min_zoom, config.max_zoom);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
		self.engine.dispatch(InteractionEvent::Zoom(new_k));
	}

	/// Centers the visible scene and scales it to fit, never beyond the default zoom.
	pub fn fit_to_view(&mut self) {
		let Some((min, max)) = self.engine.scene().bounds() else {
			return;
		};
		let config = self.engine.config();
		let (w, h) = (
			(max.x - min.x).max(1.0),
			(max.y - min.y).max(1.0),
		);
		let k = ((self.width - 2.0 * FIT_MARGIN).max(1.0) / w)
			.min((self.height - 2.0 * FIT_MARGIN).max(1.0) / h)
			.min(config.default_zoom)
			.clamp(config.min_zoom, config.max_zoom);
		let (cx, cy) = ((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
		self.transform = ViewTransform {
			x: self.width / 2.0 - cx * k,
			y: self.height / 2.0 - cy * k,
			k,
		};
		self.engine.dispatch(InteractionEvent::Zoom(k));
	}

	/// Whether a hover highlight is showing or still fading out.
	pub fn has_active_highlight(&self) -> bool {
		self.engine.interaction().hovered.is_some() || self.fade.highlight_t > 0.0
	}

	/// Advances animations by `dt` seconds.
	pub fn tick(&mut self, dt: f64) {
		self.flow_time += dt;

		let hovering = self.engine.interaction().hovered.is_some();
		let (target, delay, speed) = if hovering {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if hovering {
			self.fade.delay_t = (self.fade.delay_t + dt).min(delay);
			if self.fade.delay_t >= delay {
				self.fade.highlight_t += (target - self.fade.highlight_t) * speed * dt;
			}
		} else {
			self.fade.highlight_t += (target - self.fade.highlight_t) * speed * dt;
			if self.fade.highlight_t < 0.01 {
				self.fade.highlight_t = 0.0;
			}
		}
	}

	/// The canvas changed size.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

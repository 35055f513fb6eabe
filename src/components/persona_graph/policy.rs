//! Per-layer sizing constants and layout tuning.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use super::error::GraphError;
use super::types::Layer;

const TRACK_COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Sizing and clustering constants for one ring.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerStyle {
	/// Target distance from the center.
	pub radius: f64,
	/// Visual diameter of a node.
	pub diameter: f64,
	/// Vertical distance from node center to label baseline.
	pub label_offset: f64,
	/// Label font size in px.
	pub label_font_size: f64,
	/// Longer titles are truncated with an ellipsis.
	pub label_max_chars: usize,
	/// A parent with at least this many children on this layer shows them as one badge.
	pub cluster_threshold: Option<usize>,
	/// Default fill for nodes not tinted by a track.
	pub fill: String,
}

/// Lookup table from layer to [`LayerStyle`].
///
/// Deserializes from `{ "styles": [ ... ] }` where each entry overrides only the
/// fields it names on the default style of that layer.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayerPolicy {
	/// Styles indexed by [`Layer::index`].
	#[serde(deserialize_with = "styles_over_defaults")]
	pub styles: [LayerStyle; 4],
}

/// Partial [`LayerStyle`]; absent fields keep the layer's default.
#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LayerStyleOverride {
	radius: Option<f64>,
	diameter: Option<f64>,
	label_offset: Option<f64>,
	label_font_size: Option<f64>,
	label_max_chars: Option<usize>,
	/// `null` disables clustering, absent keeps the default.
	#[serde(deserialize_with = "present")]
	cluster_threshold: Option<Option<usize>>,
	fill: Option<String>,
}

impl LayerStyleOverride {
	fn apply(self, style: &mut LayerStyle) {
		if let Some(radius) = self.radius {
			style.radius = radius;
		}
		if let Some(diameter) = self.diameter {
			style.diameter = diameter;
		}
		if let Some(offset) = self.label_offset {
			style.label_offset = offset;
		}
		if let Some(size) = self.label_font_size {
			style.label_font_size = size;
		}
		if let Some(max) = self.label_max_chars {
			style.label_max_chars = max;
		}
		if let Some(threshold) = self.cluster_threshold {
			style.cluster_threshold = threshold;
		}
		if let Some(fill) = self.fill {
			style.fill = fill;
		}
	}
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	T::deserialize(deserializer).map(Some)
}

fn styles_over_defaults<'de, D>(deserializer: D) -> Result<[LayerStyle; 4], D::Error>
where
	D: Deserializer<'de>,
{
	let overrides = Vec::<LayerStyleOverride>::deserialize(deserializer)?;
	if overrides.len() > Layer::ALL.len() {
		return Err(D::Error::invalid_length(
			overrides.len(),
			&"at most one style per layer",
		));
	}
	let mut styles = LayerPolicy::default().styles;
	for (style, patch) in styles.iter_mut().zip(overrides) {
		patch.apply(style);
	}
	Ok(styles)
}

impl Default for LayerPolicy {
	fn default() -> Self {
		let style = |(radius, diameter, label_offset, label_font_size): (f64, f64, f64, f64),
		             label_max_chars: usize,
		             cluster_threshold: Option<usize>,
		             fill: &str| {
			LayerStyle {
				radius,
				diameter,
				label_offset,
				label_font_size,
				label_max_chars,
				cluster_threshold,
				fill: fill.to_owned(),
			}
		};
		Self {
			styles: [
				style((0.0, 72.0, 50.0, 14.0), 28, None, "#f5f5ff"),
				style((180.0, 44.0, 34.0, 12.0), 24, None, "#64b4ff"),
				style((340.0, 30.0, 26.0, 11.0), 20, Some(5), "#9ad0ff"),
				style((480.0, 18.0, 18.0, 9.0), 16, Some(5), "#d7ebff"),
			],
		}
	}
}

impl LayerPolicy {
	/// Style of `layer`.
	pub fn style(&self, layer: Layer) -> &LayerStyle {
		&self.styles[layer.index()]
	}

	/// Target ring radius of `layer`.
	pub fn radius(&self, layer: Layer) -> f64 {
		self.style(layer).radius
	}

	/// Visual diameter of a node on `layer`.
	pub fn diameter(&self, layer: Layer) -> f64 {
		self.style(layer).diameter
	}

	/// Rejects tables whose rings could overlap: radii must strictly increase, adjacent
	/// rings must clear each other's nodes and the detail ring must be the smallest.
	pub fn validate(&self) -> Result<(), GraphError> {
		for pair in Layer::ALL.windows(2) {
			let (inner, outer) = (self.style(pair[0]), self.style(pair[1]));
			if outer.radius <= inner.radius {
				return Err(GraphError::InvalidPolicy(format!(
					"radius of {:?} ({}) must exceed {:?} ({})",
					pair[1], outer.radius, pair[0], inner.radius
				)));
			}
			if outer.radius - inner.radius < (outer.diameter + inner.diameter) / 2.0 {
				return Err(GraphError::InvalidPolicy(format!(
					"rings {:?} and {:?} are closer than their nodes are wide",
					pair[0], pair[1]
				)));
			}
		}
		let detail = self.diameter(Layer::Detail);
		if Layer::ALL[..3].iter().any(|&l| self.diameter(l) <= detail) {
			return Err(GraphError::InvalidPolicy(
				"detail nodes must have the smallest footprint".into(),
			));
		}
		Ok(())
	}
}

/// Relaxation, semantic zoom and edge styling constants.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	/// Upper bound on relaxation passes.
	pub max_passes: usize,
	/// Floor for the adaptive pass count on large graphs.
	pub min_passes: usize,
	/// A pass moving no node further than this ends relaxation.
	pub epsilon: f64,
	/// Largest displacement allowed in the first pass.
	pub initial_step: f64,
	/// Geometric factor applied to the step bound after each pass.
	pub cooling: f64,
	/// Spring constant pulling nodes onto their ring.
	pub radial_strength: f64,
	/// Strength of the push between overlapping nodes on the same ring.
	pub repulsion_strength: f64,
	/// Strength of the pull toward the parent's angle, divided among siblings.
	pub parent_pull: f64,
	/// Extra clearance between sibling nodes.
	pub sibling_gap: f64,
	/// Allowed radial deviation from the ring after relaxation.
	pub radial_band: f64,
	/// Node count above which the pass cap shrinks.
	pub frame_budget_nodes: usize,
	/// Angular offset (radians) between children seeded at a newly expanded cluster.
	pub expansion_jitter: f64,
	/// Zoom below which stories become glyphs and details disappear.
	pub macro_zoom_threshold: f64,
	/// Zoom before anything has been fitted.
	pub default_zoom: f64,
	/// Lower zoom clamp.
	pub min_zoom: f64,
	/// Upper zoom clamp.
	pub max_zoom: f64,
	/// Opacity of edges not touching the hovered or selected node.
	pub baseline_edge_opacity: f64,
	/// Color of edges not touching the hovered or selected node.
	pub baseline_edge_color: String,
	/// Whether highlighted edges carry the flow animation.
	pub animate_highlighted_edges: bool,
	/// Palette cycled over angles in insertion order.
	pub track_colors: Vec<String>,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			max_passes: 120,
			min_passes: 12,
			epsilon: 0.05,
			initial_step: 48.0,
			cooling: 0.92,
			radial_strength: 0.35,
			repulsion_strength: 0.5,
			parent_pull: 0.3,
			sibling_gap: 12.0,
			radial_band: 6.0,
			frame_budget_nodes: 60,
			expansion_jitter: 0.02,
			macro_zoom_threshold: 0.5,
			default_zoom: 1.0,
			min_zoom: 0.1,
			max_zoom: 4.0,
			baseline_edge_opacity: 0.15,
			baseline_edge_color: "#8a94a6".into(),
			animate_highlighted_edges: true,
			track_colors: TRACK_COLORS.iter().map(|c| (*c).to_owned()).collect(),
		}
	}
}

impl LayoutConfig {
	/// Palette color for the angle at `track_index`.
	pub fn track_color(&self, track_index: usize) -> Option<&str> {
		if self.track_colors.is_empty() {
			return None;
		}
		Some(&self.track_colors[track_index % self.track_colors.len()])
	}

	/// Pass cap for a relaxation over `node_count` positioned nodes. Repulsion is
	/// quadratic per ring, so the cap shrinks with the square of the overshoot.
	pub fn pass_budget(&self, node_count: usize) -> usize {
		if node_count <= self.frame_budget_nodes || node_count == 0 {
			return self.max_passes;
		}
		let ratio = self.frame_budget_nodes as f64 / node_count as f64;
		let scaled = (self.max_passes as f64 * ratio * ratio).round() as usize;
		scaled.clamp(self.min_passes.min(self.max_passes), self.max_passes)
	}
}

/// Shortens `title` to at most `max_chars` characters, ending in an ellipsis when cut.
pub fn truncate_label(title: &str, max_chars: usize) -> String {
	if title.chars().count() <= max_chars {
		return title.to_owned();
	}
	let kept: String = title.chars().take(max_chars.saturating_sub(1)).collect();
	format!("{}…", kept.trim_end())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_policy_is_valid() {
		let policy = LayerPolicy::default();
		policy.validate().unwrap();
		assert!(policy.radius(Layer::Profile) < policy.radius(Layer::Angle));
		assert!(policy.radius(Layer::Angle) < policy.radius(Layer::Story));
		assert!(policy.radius(Layer::Story) < policy.radius(Layer::Detail));
		assert_eq!(policy.style(Layer::Story).cluster_threshold, Some(5));
	}

	#[test]
	fn test_policy_rejects_shrinking_radius() {
		let mut policy = LayerPolicy::default();
		policy.styles[3].radius = 300.0;
		assert!(matches!(policy.validate(), Err(GraphError::InvalidPolicy(_))));
	}

	#[test]
	fn test_policy_rejects_large_details() {
		let mut policy = LayerPolicy::default();
		policy.styles[3].diameter = 40.0;
		assert!(policy.validate().is_err());
	}

	#[test]
	fn test_config_overrides_from_json() {
		let config: LayoutConfig =
			serde_json::from_str(r#"{ "max_passes": 10, "macro_zoom_threshold": 0.8 }"#).unwrap();
		assert_eq!(config.max_passes, 10);
		assert_eq!(config.macro_zoom_threshold, 0.8);
		assert_eq!(config.cooling, LayoutConfig::default().cooling);
	}

	#[test]
	fn test_policy_partial_override_from_json() {
		let policy: LayerPolicy = serde_json::from_str(
			r#"{ "styles": [ {}, { "radius": 200.0 }, { "cluster_threshold": null } ] }"#,
		)
		.unwrap();
		let defaults = LayerPolicy::default();
		assert_eq!(policy.radius(Layer::Angle), 200.0);
		assert_eq!(policy.diameter(Layer::Angle), defaults.diameter(Layer::Angle));
		assert_eq!(policy.style(Layer::Story).cluster_threshold, None);
		assert_eq!(policy.style(Layer::Story).radius, defaults.radius(Layer::Story));
		assert_eq!(policy.style(Layer::Detail), defaults.style(Layer::Detail));
		assert_eq!(policy.style(Layer::Profile), defaults.style(Layer::Profile));
		policy.validate().unwrap();

		let empty: LayerPolicy = serde_json::from_str("{}").unwrap();
		assert_eq!(empty, defaults);
	}

	#[test]
	fn test_policy_override_rejects_extra_layers_and_typos() {
		let five = r#"{ "styles": [ {}, {}, {}, {}, {} ] }"#;
		assert!(serde_json::from_str::<LayerPolicy>(five).is_err());
		let typo = r#"{ "styles": [ { "raduis": 10.0 } ] }"#;
		assert!(serde_json::from_str::<LayerPolicy>(typo).is_err());
	}

	#[test]
	fn test_pass_budget_degrades() {
		let config = LayoutConfig::default();
		assert_eq!(config.pass_budget(10), config.max_passes);
		assert_eq!(config.pass_budget(120), 30);
		assert_eq!(config.pass_budget(10_000), config.min_passes);
	}

	#[test]
	fn test_truncate_label() {
		assert_eq!(truncate_label("Short", 10), "Short");
		assert_eq!(truncate_label("Leadership under pressure", 12), "Leadership…");
		assert_eq!(truncate_label("Überraschung", 5), "Über…");
		assert_eq!(truncate_label("exact", 5), "exact");
	}

	#[test]
	fn test_track_colors_cycle() {
		let config = LayoutConfig::default();
		assert_eq!(config.track_color(0), config.track_color(10));
	}
}

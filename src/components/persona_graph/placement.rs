//! Concentric-constrained relaxation.
//!
//! Nodes are seeded on their layer's ring (angles evenly spaced around the center,
//! stories and details fanned around their parent), then relaxed for a bounded number
//! of cooling passes:
//! - a radial spring keeps each node on its ring
//! - overlapping nodes on the same ring push each other apart
//! - each node is pulled toward its parent's angle, harder in small families
//!
//! A final settling step clamps nodes into their ring band and sweeps each ring so
//! neighbours clear each other without changing their angular order.
//!
//! Children of a collapsed cluster are left out entirely and cost nothing.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::f64::consts::{FRAC_PI_2, TAU};

use log::{debug, warn};

use super::geometry::{Point, chord_angle, wrap_angle};
use super::policy::{LayerPolicy, LayoutConfig};
use super::types::{Forest, Layer};

/// A parent whose children reach the cluster threshold of their layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cluster {
	/// Number of direct children behind the badge.
	pub child_count: usize,
	/// Whether the user opened the cluster.
	pub expanded: bool,
}

/// A positioned node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placed {
	/// Final coordinate, relative to the center.
	pub position: Point,
	/// Ring the node was placed on.
	pub layer: Layer,
}

/// Output of one structural layout pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
	/// Every node that takes part in the layout. Collapsed cluster members are absent.
	pub nodes: BTreeMap<String, Placed>,
	/// Every cluster-capable parent among the positioned nodes.
	pub clusters: BTreeMap<String, Cluster>,
	/// Relaxation passes actually run.
	pub passes: usize,
	/// Whether relaxation stopped below the displacement epsilon.
	pub converged: bool,
}

impl Layout {
	/// Position of `id`, if it was laid out.
	pub fn position(&self, id: &str) -> Option<Point> {
		self.nodes.get(id).map(|p| p.position)
	}

	/// Whether `id` was laid out.
	pub fn contains(&self, id: &str) -> bool {
		self.nodes.contains_key(id)
	}

	/// Whether `id` carries a closed cluster badge.
	pub fn is_collapsed(&self, id: &str) -> bool {
		self.clusters.get(id).is_some_and(|c| !c.expanded)
	}
}

/// Nodes that take part in layout, parents first, plus the cluster table.
pub fn visible_structure(
	forest: &Forest,
	policy: &LayerPolicy,
	expanded: &BTreeSet<String>,
) -> (Vec<String>, BTreeMap<String, Cluster>) {
	let mut order = Vec::with_capacity(forest.len());
	let mut clusters = BTreeMap::new();
	let mut queue = VecDeque::from([forest.root().to_owned()]);

	while let Some(id) = queue.pop_front() {
		let children = forest.children(&id);
		let threshold = forest
			.layer(&id)
			.and_then(Layer::child)
			.and_then(|layer| policy.style(layer).cluster_threshold);
		let mut open = true;
		if let Some(threshold) = threshold
			&& !children.is_empty()
			&& children.len() >= threshold
		{
			open = expanded.contains(&id);
			clusters.insert(
				id.clone(),
				Cluster {
					child_count: children.len(),
					expanded: open,
				},
			);
		}
		if open {
			queue.extend(children.iter().cloned());
		}
		order.push(id);
	}
	(order, clusters)
}

struct Body {
	layer: Layer,
	parent: Option<usize>,
	/// Preferred angle for angles; stories and details follow their parent instead.
	anchor: f64,
	siblings: usize,
	radius: f64,
	diameter: f64,
}

/// Computes positions for every node that should be laid out.
///
/// `previous` seeds stable nodes at their last coordinate so a re-layout continues
/// from where the last one settled.
pub fn place(
	forest: &Forest,
	policy: &LayerPolicy,
	config: &LayoutConfig,
	expanded: &BTreeSet<String>,
	previous: Option<&Layout>,
) -> Layout {
	let (order, clusters) = visible_structure(forest, policy, expanded);
	let index: HashMap<&str, usize> = order
		.iter()
		.enumerate()
		.map(|(i, id)| (id.as_str(), i))
		.collect();

	let mut bodies: Vec<Body> = Vec::with_capacity(order.len());
	let mut positions: Vec<Point> = Vec::with_capacity(order.len());

	for id in &order {
		let layer = forest.layer(id).unwrap_or(Layer::Profile);
		let style = policy.style(layer);
		let parent = forest.parent(id).and_then(|p| index.get(p).copied());
		let siblings = forest.parent(id).map(|p| forest.children(p)).unwrap_or(&[]);
		let slot = siblings.iter().position(|s| s == id).unwrap_or(0);
		let count = siblings.len().max(1);
		let spread = slot as f64 - (count as f64 - 1.0) / 2.0;

		let (seed, anchor) = match (layer, parent) {
			(Layer::Profile, _) | (_, None) => (Point::ORIGIN, 0.0),
			(Layer::Angle, Some(_)) => {
				let anchor = -FRAC_PI_2 + TAU * slot as f64 / count as f64;
				let seed = previous
					.and_then(|l| l.nodes.get(id))
					.filter(|p| p.layer == layer)
					.map(|p| p.position)
					.unwrap_or_else(|| Point::polar(anchor, style.radius));
				(seed, anchor)
			}
			(_, Some(parent)) => {
				let parent_pos = positions[parent];
				let parent_angle = parent_pos.angle();
				let parent_id = order[parent].as_str();
				let newly_expanded = previous.is_some_and(|l| {
					l.is_collapsed(parent_id) && !l.nodes.contains_key(id.as_str())
				});
				let previous_pos = previous
					.and_then(|l| l.nodes.get(id))
					.filter(|p| p.layer == layer)
					.map(|p| p.position);
				let seed = match previous_pos {
					Some(pos) => pos,
					None if newly_expanded => Point::polar(
						parent_angle + spread * config.expansion_jitter,
						parent_pos.length().max(1.0),
					),
					None => {
						let step = (style.diameter + config.sibling_gap) / style.radius.max(1.0);
						Point::polar(parent_angle + spread * step, style.radius)
					}
				};
				(seed, parent_angle)
			}
		};

		bodies.push(Body {
			layer,
			parent,
			anchor,
			siblings: count,
			radius: style.radius,
			diameter: style.diameter,
		});
		positions.push(seed);
	}

	let mut rings: [Vec<usize>; 4] = Default::default();
	for (i, body) in bodies.iter().enumerate() {
		rings[body.layer.index()].push(i);
	}

	let budget = config.pass_budget(bodies.len());
	if budget < config.max_passes {
		debug!(
			"{} nodes exceed the frame budget of {}, relaxing with {} passes",
			bodies.len(),
			config.frame_budget_nodes,
			budget
		);
	}
	let (passes, converged) = relax(&bodies, &rings, &mut positions, config, budget);
	settle_rings(&bodies, &rings, &mut positions, config);

	debug!(
		"placed {} nodes ({} clusters) in {} passes, converged: {}",
		bodies.len(),
		clusters.len(),
		passes,
		converged
	);

	let nodes = order
		.into_iter()
		.zip(bodies.iter().zip(positions))
		.map(|(id, (body, position))| {
			(
				id,
				Placed {
					position,
					layer: body.layer,
				},
			)
		})
		.collect();

	Layout {
		nodes,
		clusters,
		passes,
		converged,
	}
}

fn relax(
	bodies: &[Body],
	rings: &[Vec<usize>; 4],
	positions: &mut [Point],
	config: &LayoutConfig,
	budget: usize,
) -> (usize, bool) {
	let mut step_bound = config.initial_step;
	let mut passes = 0;

	while passes < budget {
		let snapshot = positions.to_vec();
		let mut max_displacement: f64 = 0.0;

		for (i, body) in bodies.iter().enumerate() {
			if body.layer == Layer::Profile {
				continue;
			}
			let p = snapshot[i];
			let len = p.length();
			let outward = p
				.normalized()
				.unwrap_or_else(|| Point::polar(body.anchor, 1.0));

			let mut force = outward * (config.radial_strength * (body.radius - len));

			for &j in &rings[body.layer.index()] {
				if j == i {
					continue;
				}
				let delta = p - snapshot[j];
				let clearance = (body.diameter + bodies[j].diameter) / 2.0 + config.sibling_gap;
				let distance = delta.length();
				if distance >= clearance {
					continue;
				}
				// Coincident nodes split along the ring, lower index clockwise.
				let away = delta.normalized().unwrap_or_else(|| {
					let tangent = outward.perpendicular();
					if i < j { tangent * -1.0 } else { tangent }
				});
				force = force + away * (config.repulsion_strength * (clearance - distance));
			}

			let target = match body.parent {
				Some(parent) if body.layer != Layer::Angle => snapshot[parent].angle(),
				_ => body.anchor,
			};
			let drift = wrap_angle(target - p.angle());
			let weight = config.parent_pull / body.siblings as f64;
			force = force + outward.perpendicular() * (weight * drift * len.max(body.radius));

			let magnitude = force.length();
			if magnitude > step_bound {
				force = force * (step_bound / magnitude);
			}
			positions[i] = p + force;
			max_displacement = max_displacement.max(force.length());
		}

		passes += 1;
		step_bound *= config.cooling;
		if max_displacement < config.epsilon {
			return (passes, true);
		}
	}
	(passes, false)
}

fn settle_rings(
	bodies: &[Body],
	rings: &[Vec<usize>; 4],
	positions: &mut [Point],
	config: &LayoutConfig,
) {
	for ring in rings.iter().skip(1) {
		let Some(&first) = ring.first() else {
			continue;
		};
		let radius = bodies[first].radius;
		let inner = (radius - config.radial_band).max(1.0);
		let outer = radius + config.radial_band;

		let mut members: Vec<(f64, f64, usize)> = ring
			.iter()
			.map(|&i| {
				let p = positions[i];
				let angle = if p.length() > f64::EPSILON {
					p.angle()
				} else {
					bodies[i].anchor
				};
				(angle, p.length().clamp(inner, outer), i)
			})
			.collect();
		members.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.2.cmp(&b.2)));

		let mut angles: Vec<f64> = members.iter().map(|m| m.0).collect();
		let gaps: Vec<f64> = (0..members.len())
			.map(|k| {
				let a = bodies[members[k].2].diameter;
				let b = bodies[members[(k + 1) % members.len()].2].diameter;
				chord_angle((a + b) / 2.0 + config.sibling_gap, inner)
			})
			.collect();

		if !separate_ring(&mut angles, &gaps) {
			warn!(
				"ring {:?} holds {} nodes, more than fit without overlap; spreading evenly",
				bodies[first].layer,
				members.len()
			);
		}
		for ((_, len, i), angle) in members.into_iter().zip(angles) {
			positions[i] = Point::polar(angle, len);
		}
	}
}

/// Pushes sorted ring angles apart so consecutive entries are at least `gaps[k]`
/// apart (`gaps[n - 1]` wraps from last to first), preserving their cyclic order.
/// Returns `false` if the gaps exceed a full turn and the ring was spread evenly.
fn separate_ring(angles: &mut [f64], gaps: &[f64]) -> bool {
	let n = angles.len();
	if n < 2 {
		return true;
	}
	if gaps.iter().sum::<f64>() > TAU {
		let base = angles[0];
		for (k, angle) in angles.iter_mut().enumerate() {
			*angle = wrap_angle(base + TAU * k as f64 / n as f64);
		}
		return false;
	}

	// Open the circle at the gap with the most slack.
	let span = |k: usize| {
		let next = angles[(k + 1) % n] + if k + 1 == n { TAU } else { 0.0 };
		next - angles[k]
	};
	let cut = (0..n)
		.max_by(|&a, &b| (span(a) - gaps[a]).total_cmp(&(span(b) - gaps[b])))
		.unwrap_or(n - 1);
	let start = (cut + 1) % n;

	let mut phi: Vec<f64> = (0..n)
		.map(|k| angles[(start + k) % n] + if start + k >= n { TAU } else { 0.0 })
		.collect();
	let local_gap = |k: usize| gaps[(start + k) % n];

	for k in 1..n {
		phi[k] = phi[k].max(phi[k - 1] + local_gap(k - 1));
	}
	let limit = phi[0] + TAU - local_gap(n - 1);
	if phi[n - 1] > limit {
		phi[n - 1] = limit;
		for k in (0..n - 1).rev() {
			phi[k] = phi[k].min(phi[k + 1] - local_gap(k));
		}
	}

	for (k, value) in phi.into_iter().enumerate() {
		angles[(start + k) % n] = wrap_angle(value);
	}
	true
}

#[cfg(test)]
mod tests {
	use super::super::types::fixtures::persona;
	use super::super::types::{GraphEdge, GraphNode, PersonaGraph};
	use super::*;
	use proptest::prelude::*;

	const TOLERANCE: f64 = 1e-6;

	fn layout_of(graph: &PersonaGraph, expanded: &[&str]) -> (Forest, Layout) {
		let forest = Forest::from_graph(graph);
		let expanded = expanded.iter().map(|s| s.to_string()).collect();
		let layout = place(
			&forest,
			&LayerPolicy::default(),
			&LayoutConfig::default(),
			&expanded,
			None,
		);
		(forest, layout)
	}

	fn assert_no_sibling_overlap(forest: &Forest, layout: &Layout) {
		let policy = LayerPolicy::default();
		for id in layout.nodes.keys() {
			let kids: Vec<&String> = forest
				.children(id)
				.iter()
				.filter(|c| layout.contains(c))
				.collect();
			for (i, a) in kids.iter().enumerate() {
				for b in &kids[i + 1..] {
					let (pa, pb) = (layout.position(a).unwrap(), layout.position(b).unwrap());
					let min = policy.diameter(forest.layer(a).unwrap());
					assert!(
						pa.distance(pb) + TOLERANCE >= min,
						"{a} and {b} overlap: {} < {min}",
						pa.distance(pb)
					);
				}
			}
		}
	}

	fn assert_on_rings(layout: &Layout) {
		let policy = LayerPolicy::default();
		let band = LayoutConfig::default().radial_band;
		for (id, placed) in &layout.nodes {
			let r = policy.radius(placed.layer);
			let d = placed.position.length();
			assert!((d - r).abs() <= band + TOLERANCE, "{id} at {d}, ring {r}");
		}
	}

	fn sibling_order(forest: &Forest, layout: &Layout, parent: &str) -> Vec<String> {
		let anchor = layout.position(parent).unwrap().angle();
		let mut kids: Vec<(f64, String)> = forest
			.children(parent)
			.iter()
			.filter_map(|c| {
				let a = wrap_angle(layout.position(c)?.angle() - anchor);
				Some((a, c.clone()))
			})
			.collect();
		kids.sort_by(|a, b| a.0.total_cmp(&b.0));
		let mut ids: Vec<String> = kids.into_iter().map(|(_, id)| id).collect();
		// Cyclic order: start from the first child so a node crossing ±π does not reorder.
		if let Some(start) = ids.iter().position(|id| Some(id) == forest.children(parent).first()) {
			ids.rotate_left(start);
		}
		ids
	}

	/// Rotates and rescales every node by a small per-node offset.
	fn jittered(layout: &Layout, offsets: &[f64]) -> Layout {
		let mut out = layout.clone();
		for (k, placed) in out.nodes.values_mut().enumerate() {
			let offset = offsets[k % offsets.len()];
			let p = placed.position;
			if p.length() > f64::EPSILON {
				placed.position = Point::polar(p.angle() + offset, p.length() * (1.0 + offset));
			}
		}
		out
	}

	#[test]
	fn test_profile_alone_sits_at_center() {
		let graph = PersonaGraph::default().normalized();
		let (_, layout) = layout_of(&graph, &[]);
		assert_eq!(layout.nodes.len(), 1);
		let placed = layout.nodes.values().next().unwrap();
		assert_eq!(placed.position, Point::ORIGIN);
	}

	#[test]
	fn test_angles_spread_around_center() {
		let (forest, layout) = layout_of(&persona(4, 0, 0), &[]);
		assert_on_rings(&layout);
		assert_no_sibling_overlap(&forest, &layout);
		let first = layout.position("angle-0").unwrap();
		assert!(first.y < 0.0, "first angle starts at the top");
		let opposite = layout.position("angle-2").unwrap();
		assert!(first.distance(opposite) > 300.0);
	}

	#[test]
	fn test_large_family_collapses_into_cluster() {
		let (_, layout) = layout_of(&persona(1, 6, 0), &[]);
		assert_eq!(
			layout.clusters.get("angle-0"),
			Some(&Cluster {
				child_count: 6,
				expanded: false
			})
		);
		assert!(layout.is_collapsed("angle-0"));
		assert!(!layout.nodes.keys().any(|id| id.contains("story")));
		assert_eq!(layout.nodes.len(), 2);
	}

	#[test]
	fn test_expanded_cluster_places_children_on_ring() {
		let (forest, layout) = layout_of(&persona(1, 6, 0), &["angle-0"]);
		assert_eq!(layout.nodes.len(), 8);
		assert!(!layout.is_collapsed("angle-0"));
		assert_on_rings(&layout);
		assert_no_sibling_overlap(&forest, &layout);
	}

	#[test]
	fn test_small_family_is_not_clustered() {
		let (_, layout) = layout_of(&persona(1, 4, 0), &[]);
		assert!(layout.clusters.is_empty());
		assert_eq!(layout.nodes.len(), 6);
	}

	#[test]
	fn test_stories_fan_around_parent() {
		let (_, layout) = layout_of(&persona(3, 3, 0), &[]);
		for a in 0..3 {
			let angle = layout.position(&format!("angle-{a}")).unwrap().angle();
			for s in 0..3 {
				let story = layout.position(&format!("angle-{a}/story-{s}")).unwrap();
				assert!(wrap_angle(story.angle() - angle).abs() < 0.6);
			}
		}
	}

	#[test]
	fn test_collapse_then_expand_is_idempotent() {
		let forest = Forest::from_graph(&persona(2, 6, 2));
		let policy = LayerPolicy::default();
		let mut expanded = BTreeSet::from(["angle-1".to_string()]);
		let (before, _) = visible_structure(&forest, &policy, &expanded);
		expanded.remove("angle-1");
		let (collapsed, _) = visible_structure(&forest, &policy, &expanded);
		expanded.insert("angle-1".to_string());
		let (after, _) = visible_structure(&forest, &policy, &expanded);
		assert!(collapsed.len() < before.len());
		assert_eq!(before, after);
	}

	#[test]
	fn test_previous_layout_seeds_stable_nodes() {
		let graph = persona(3, 2, 0);
		let (forest, first) = layout_of(&graph, &[]);
		let again = place(
			&forest,
			&LayerPolicy::default(),
			&LayoutConfig::default(),
			&BTreeSet::new(),
			Some(&first),
		);
		for (id, placed) in &first.nodes {
			let moved = placed.position.distance(again.position(id).unwrap());
			assert!(moved < 10.0, "{id} jumped {moved}");
		}
	}

	#[test]
	fn test_new_node_enters_near_parent() {
		let mut graph = persona(2, 2, 0);
		let (_, first) = layout_of(&graph, &[]);
		graph
			.nodes
			.push(GraphNode::new("late", Layer::Story, Some("angle-1"), "Late"));
		graph.edges.push(GraphEdge::linking("angle-1", "late"));
		let forest = Forest::from_graph(&graph);
		let next = place(
			&forest,
			&LayerPolicy::default(),
			&LayoutConfig::default(),
			&BTreeSet::new(),
			Some(&first),
		);
		let parent = next.position("angle-1").unwrap().angle();
		let late = next.position("late").unwrap().angle();
		assert!(wrap_angle(late - parent).abs() < 0.6);
		assert_no_sibling_overlap(&forest, &next);
	}

	#[test]
	fn test_newly_expanded_children_leave_parent() {
		let graph = persona(1, 6, 0);
		let (forest, collapsed) = layout_of(&graph, &[]);
		let expanded = BTreeSet::from(["angle-0".to_string()]);
		let opened = place(
			&forest,
			&LayerPolicy::default(),
			&LayoutConfig::default(),
			&expanded,
			Some(&collapsed),
		);
		assert_eq!(opened.nodes.len(), 8);
		assert_on_rings(&opened);
		assert_no_sibling_overlap(&forest, &opened);

		let (_, fresh) = layout_of(&graph, &["angle-0"]);
		assert_eq!(
			sibling_order(&forest, &opened, "angle-0"),
			sibling_order(&forest, &fresh, "angle-0")
		);
	}

	#[test]
	fn test_relaxation_is_bounded() {
		let config = LayoutConfig {
			max_passes: 3,
			epsilon: 0.0,
			..LayoutConfig::default()
		};
		let forest = Forest::from_graph(&persona(8, 4, 0));
		let layout = place(&forest, &LayerPolicy::default(), &config, &BTreeSet::new(), None);
		assert_eq!(layout.passes, 3);
		assert!(!layout.converged);
		assert_on_rings(&layout);
	}

	#[test]
	fn test_separate_ring_preserves_order() {
		let mut angles = vec![0.0, 0.01, 0.02, 1.0];
		let gaps = vec![0.1; 4];
		assert!(separate_ring(&mut angles, &gaps));
		let unwrapped: Vec<f64> = angles.iter().map(|a| a.rem_euclid(TAU)).collect();
		for k in 0..3 {
			assert!(unwrapped[k + 1] - unwrapped[k] >= 0.1 - TOLERANCE);
		}
		assert!(unwrapped[0] + TAU - unwrapped[3] >= 0.1 - TOLERANCE);
	}

	#[test]
	fn test_separate_ring_wraps_across_cut() {
		let mut angles = vec![-3.1, -3.05, 3.1];
		let gaps = vec![0.2; 3];
		assert!(separate_ring(&mut angles, &gaps));
		for i in 0..3 {
			for j in 0..3 {
				if i != j {
					assert!(wrap_angle(angles[i] - angles[j]).abs() >= 0.2 - TOLERANCE);
				}
			}
		}
	}

	#[test]
	fn test_overfull_ring_spreads_evenly() {
		let mut angles = vec![0.0, 0.1, 0.2];
		let gaps = vec![3.0; 3];
		assert!(!separate_ring(&mut angles, &gaps));
		assert!((wrap_angle(angles[1] - angles[0]) - TAU / 3.0).abs() < TOLERANCE);
	}

	proptest! {
		#[test]
		fn prop_siblings_never_overlap(angles in 1usize..=4, stories in 2usize..=8, details in 0usize..=3) {
			let graph = persona(angles, stories, details);
			let all: Vec<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();
			let refs: Vec<&str> = all.iter().map(String::as_str).collect();
			let (forest, layout) = layout_of(&graph, &refs);
			assert_no_sibling_overlap(&forest, &layout);
		}

		#[test]
		fn prop_nodes_stay_on_their_ring(angles in 1usize..=6, stories in 0usize..=8) {
			let (_, layout) = layout_of(&persona(angles, stories, 2), &[]);
			assert_on_rings(&layout);
		}

		#[test]
		fn prop_differently_seeded_runs_agree_on_order(
			angles in 1usize..=5,
			stories in 2usize..=4,
			offsets in prop::collection::vec(-0.02f64..0.02, 1..16),
		) {
			let graph = persona(angles, stories, 0);
			let (forest, a) = layout_of(&graph, &[]);
			let seed = jittered(&a, &offsets);
			let b = place(
				&forest,
				&LayerPolicy::default(),
				&LayoutConfig::default(),
				&BTreeSet::new(),
				Some(&seed),
			);
			prop_assert_eq!(sibling_order(&forest, &a, "profile"), sibling_order(&forest, &b, "profile"));
			for k in 0..angles {
				let parent = format!("angle-{k}");
				prop_assert_eq!(sibling_order(&forest, &a, &parent), sibling_order(&forest, &b, &parent));
			}
		}
	}
}

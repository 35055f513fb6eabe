//! Persona graph records as delivered by the persona API, and the forest index built over them.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Deserialize;

use super::error::GraphError;

/// Id given to the synthesized center node when a snapshot has no profile.
pub const PLACEHOLDER_ID: &str = "profile:placeholder";

/// Semantic depth of a node. Fixed by the node's type, never by layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "u8")]
pub enum Layer {
	/// The single profile summary at the center.
	Profile,
	/// A narrative angle derived from the profile.
	Angle,
	/// A concrete story attached to one angle.
	Story,
	/// A granular fact or quote attached to one story.
	Detail,
}

impl Layer {
	/// All layers, center outwards.
	pub const ALL: [Layer; 4] = [Layer::Profile, Layer::Angle, Layer::Story, Layer::Detail];

	/// Ring index, 0 at the center.
	pub const fn index(self) -> usize {
		self as usize
	}

	/// The layer one step further out, if any.
	pub fn child(self) -> Option<Layer> {
		Layer::ALL.get(self.index() + 1).copied()
	}
}

impl TryFrom<u8> for Layer {
	type Error = GraphError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		Layer::ALL
			.get(value as usize)
			.copied()
			.ok_or(GraphError::UnknownLayer(value))
	}
}

impl From<Layer> for u8 {
	fn from(layer: Layer) -> u8 {
		layer.index() as u8
	}
}

/// A node of the persona graph. Title, content, tags and confidence are display payload only.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
	/// Unique id.
	pub id: String,
	/// Semantic layer.
	pub layer: Layer,
	/// The node one layer closer to the center; `None` only for the profile.
	#[serde(default)]
	pub parent_id: Option<String>,
	/// Display title.
	#[serde(default)]
	pub title: String,
	/// Display body.
	#[serde(default)]
	pub content: String,
	/// Display tags.
	#[serde(default)]
	pub tags: Vec<String>,
	/// 0.0..=1.0, shown as a progress indicator.
	#[serde(default)]
	pub confidence: f64,
}

impl GraphNode {
	/// Creates a node with empty content and tags.
	pub fn new(
		id: impl Into<String>,
		layer: Layer,
		parent_id: Option<&str>,
		title: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			layer,
			parent_id: parent_id.map(str::to_owned),
			title: title.into(),
			content: String::new(),
			tags: Vec::new(),
			confidence: 0.0,
		}
	}

	fn placeholder() -> Self {
		Self::new(PLACEHOLDER_ID, Layer::Profile, None, "Your profile")
	}
}

/// A link between a node and its parent.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
	/// Unique id.
	pub id: String,
	/// One endpoint, normally the parent.
	pub source_id: String,
	/// The other endpoint, normally the child.
	pub target_id: String,
}

impl GraphEdge {
	/// Edge from `parent` to `child` with a derived id.
	pub fn linking(parent: &str, child: &str) -> Self {
		Self {
			id: format!("edge:{parent}->{child}"),
			source_id: parent.to_owned(),
			target_id: child.to_owned(),
		}
	}
}

/// One snapshot from the persona API.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PersonaGraph {
	/// Nodes in insertion order.
	#[serde(default)]
	pub nodes: Vec<GraphNode>,
	/// Parent links.
	#[serde(default)]
	pub edges: Vec<GraphEdge>,
}

impl PersonaGraph {
	/// Decodes a `{ nodes, edges }` JSON snapshot.
	pub fn from_json(json: &str) -> Result<Self, GraphError> {
		Ok(serde_json::from_str(json)?)
	}

	/// Guarantees a center node and an edge for every parent link. When the snapshot
	/// has no profile, a placeholder is inserted and parentless angles are attached to it.
	pub fn normalized(mut self) -> Self {
		if !self.nodes.iter().any(|n| n.layer == Layer::Profile) {
			self.nodes.insert(0, GraphNode::placeholder());
			let known: HashSet<String> = self.nodes.iter().map(|n| n.id.clone()).collect();
			for node in self.nodes.iter_mut().filter(|n| n.layer == Layer::Angle) {
				let adopted = match node.parent_id.as_deref() {
					Some(parent) => !known.contains(parent),
					None => true,
				};
				if adopted {
					node.parent_id = Some(PLACEHOLDER_ID.to_owned());
				}
			}
		}

		let linked: HashSet<(&str, &str)> = self
			.edges
			.iter()
			.flat_map(|e| {
				[
					(e.source_id.as_str(), e.target_id.as_str()),
					(e.target_id.as_str(), e.source_id.as_str()),
				]
			})
			.collect();
		let missing: Vec<GraphEdge> = self
			.nodes
			.iter()
			.filter_map(|n| {
				let parent = n.parent_id.as_deref()?;
				(!linked.contains(&(parent, n.id.as_str()))).then(|| GraphEdge::linking(parent, &n.id))
			})
			.collect();
		self.edges.extend(missing);
		self
	}

	/// Checks the forest invariant: one profile, every other node one layer below a
	/// known parent, every edge a parent link.
	pub fn validate(&self) -> Result<(), GraphError> {
		let mut by_id: HashMap<&str, &GraphNode> = HashMap::with_capacity(self.nodes.len());
		for node in &self.nodes {
			if by_id.insert(node.id.as_str(), node).is_some() {
				return Err(GraphError::DuplicateNode(node.id.clone()));
			}
		}

		let roots: Vec<&GraphNode> = self
			.nodes
			.iter()
			.filter(|n| n.layer == Layer::Profile)
			.collect();
		if roots.len() != 1 {
			return Err(GraphError::MultipleRoots(roots.len()));
		}
		if roots[0].parent_id.is_some() {
			return Err(GraphError::RootWithParent(roots[0].id.clone()));
		}

		for node in self.nodes.iter().filter(|n| n.layer != Layer::Profile) {
			let parent = node
				.parent_id
				.as_deref()
				.and_then(|id| by_id.get(id))
				.ok_or_else(|| GraphError::MissingParent {
					node: node.id.clone(),
					parent: node.parent_id.clone(),
				})?;
			if parent.layer.child() != Some(node.layer) {
				return Err(GraphError::LayerMismatch {
					node: node.id.clone(),
					layer: node.layer,
					parent_layer: parent.layer,
				});
			}
		}

		let mut edge_ids = HashSet::with_capacity(self.edges.len());
		for edge in &self.edges {
			if !edge_ids.insert(edge.id.as_str()) {
				return Err(GraphError::DuplicateEdge(edge.id.clone()));
			}
			let is_parent_link = |child: &str, parent: &str| {
				by_id
					.get(child)
					.and_then(|n| n.parent_id.as_deref())
					.is_some_and(|p| p == parent)
			};
			if !is_parent_link(&edge.target_id, &edge.source_id)
				&& !is_parent_link(&edge.source_id, &edge.target_id)
			{
				return Err(GraphError::StrayEdge {
					edge: edge.id.clone(),
					source_id: edge.source_id.clone(),
					target_id: edge.target_id.clone(),
				});
			}
		}
		Ok(())
	}
}

#[derive(Clone, Debug)]
struct ForestEntry {
	node: GraphNode,
	children: Vec<String>,
	order: usize,
}

/// Parent/children index over a validated snapshot, rooted at the profile node.
#[derive(Clone, Debug)]
pub struct Forest {
	root: String,
	entries: HashMap<String, ForestEntry>,
	breadth_first: Vec<String>,
	tracks: Vec<String>,
}

impl Forest {
	/// Builds the index. Nodes unreachable from the profile are left out.
	pub fn from_graph(graph: &PersonaGraph) -> Self {
		let root = graph
			.nodes
			.iter()
			.find(|n| n.layer == Layer::Profile)
			.cloned()
			.unwrap_or_else(GraphNode::placeholder);

		let mut entries: HashMap<String, ForestEntry> = HashMap::with_capacity(graph.nodes.len());
		let mut insert = |node: GraphNode, order: usize| {
			entries.entry(node.id.clone()).or_insert(ForestEntry {
				node,
				children: Vec::new(),
				order,
			});
		};
		insert(root.clone(), 0);
		for (order, node) in graph.nodes.iter().enumerate() {
			if node.layer != Layer::Profile {
				insert(node.clone(), order + 1);
			}
		}

		let mut ordered: Vec<(usize, String, String)> = entries
			.values()
			.filter_map(|e| {
				let parent = e.node.parent_id.clone()?;
				Some((e.order, parent, e.node.id.clone()))
			})
			.collect();
		ordered.sort();
		for (_, parent, child) in ordered {
			if let Some(entry) = entries.get_mut(&parent) {
				entry.children.push(child);
			}
		}

		let mut breadth_first = Vec::with_capacity(entries.len());
		let mut queue = VecDeque::from([root.id.clone()]);
		while let Some(id) = queue.pop_front() {
			if let Some(entry) = entries.get(&id) {
				queue.extend(entry.children.iter().cloned());
			}
			breadth_first.push(id);
		}
		let reachable: HashSet<&String> = breadth_first.iter().collect();
		entries.retain(|id, _| reachable.contains(id));

		let tracks = entries
			.get(&root.id)
			.map(|e| e.children.clone())
			.unwrap_or_default();

		Self {
			root: root.id,
			entries,
			breadth_first,
			tracks,
		}
	}

	/// Id of the profile node.
	pub fn root(&self) -> &str {
		&self.root
	}

	/// Number of indexed nodes.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether the forest is empty. The profile is always indexed, so this is false in practice.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Whether `id` is part of the forest.
	pub fn contains(&self, id: &str) -> bool {
		self.entries.contains_key(id)
	}

	/// Node payload for `id`.
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.entries.get(id).map(|e| &e.node)
	}

	/// Layer of `id`.
	pub fn layer(&self, id: &str) -> Option<Layer> {
		self.node(id).map(|n| n.layer)
	}

	/// Parent of `id`; `None` for the profile.
	pub fn parent(&self, id: &str) -> Option<&str> {
		self.node(id).and_then(|n| n.parent_id.as_deref())
	}

	/// Children of `id` in insertion order.
	pub fn children(&self, id: &str) -> &[String] {
		self.entries
			.get(id)
			.map(|e| e.children.as_slice())
			.unwrap_or(&[])
	}

	/// All node ids, parents before children.
	pub fn breadth_first(&self) -> &[String] {
		&self.breadth_first
	}

	/// The angle a node belongs to, i.e. its layer-1 ancestor (or itself).
	pub fn track_of(&self, id: &str) -> Option<&str> {
		let mut current = self.node(id)?;
		loop {
			match current.layer {
				Layer::Profile => return None,
				Layer::Angle => return Some(current.id.as_str()),
				_ => current = self.node(current.parent_id.as_deref()?)?,
			}
		}
	}

	/// Index of the node's angle among the profile's children.
	pub fn track_index(&self, id: &str) -> Option<usize> {
		let track = self.track_of(id)?;
		self.tracks.iter().position(|t| t == track)
	}
}

#[cfg(test)]
pub(crate) mod fixtures {
	use super::*;

	/// Profile, `angles` angles, each with `stories` stories, each with `details` details.
	pub(crate) fn persona(angles: usize, stories: usize, details: usize) -> PersonaGraph {
		let mut graph = PersonaGraph::default();
		graph.nodes.push(GraphNode::new("profile", Layer::Profile, None, "Ada"));
		for a in 0..angles {
			let angle = format!("angle-{a}");
			graph
				.nodes
				.push(GraphNode::new(&angle, Layer::Angle, Some("profile"), format!("Angle {a}")));
			graph.edges.push(GraphEdge::linking("profile", &angle));
			for s in 0..stories {
				let story = format!("{angle}/story-{s}");
				graph
					.nodes
					.push(GraphNode::new(&story, Layer::Story, Some(angle.as_str()), format!("Story {s}")));
				graph.edges.push(GraphEdge::linking(&angle, &story));
				for d in 0..details {
					let detail = format!("{story}/detail-{d}");
					graph.nodes.push(GraphNode::new(
						&detail,
						Layer::Detail,
						Some(story.as_str()),
						format!("Detail {d}"),
					));
					graph.edges.push(GraphEdge::linking(&story, &detail));
				}
			}
		}
		graph
	}
}

#[cfg(test)]
mod tests {
	use super::fixtures::persona;
	use super::*;

	#[test]
	fn test_decode_camel_case_snapshot() {
		let json = r#"{
			"nodes": [
				{ "id": "p", "layer": 0, "parentId": null, "title": "Ada", "confidence": 0.8 },
				{ "id": "a", "layer": 1, "parentId": "p", "title": "Resilience", "tags": ["grit"] }
			],
			"edges": [ { "id": "e1", "sourceId": "p", "targetId": "a" } ]
		}"#;
		let graph = PersonaGraph::from_json(json).unwrap();
		assert_eq!(graph.nodes[1].layer, Layer::Angle);
		assert_eq!(graph.nodes[1].parent_id.as_deref(), Some("p"));
		assert_eq!(graph.nodes[1].tags, vec!["grit".to_string()]);
		assert_eq!(graph.edges[0].target_id, "a");
		graph.validate().unwrap();
	}

	#[test]
	fn test_decode_rejects_unknown_layer() {
		let json = r#"{ "nodes": [ { "id": "x", "layer": 7 } ], "edges": [] }"#;
		assert!(matches!(PersonaGraph::from_json(json), Err(GraphError::Decode(_))));
	}

	#[test]
	fn test_empty_snapshot_gets_placeholder() {
		let graph = PersonaGraph::default().normalized();
		assert_eq!(graph.nodes.len(), 1);
		assert_eq!(graph.nodes[0].id, PLACEHOLDER_ID);
		assert!(graph.edges.is_empty());
		graph.validate().unwrap();
	}

	#[test]
	fn test_placeholder_adopts_parentless_angles() {
		let graph = PersonaGraph {
			nodes: vec![
				GraphNode::new("a", Layer::Angle, None, "A"),
				GraphNode::new("b", Layer::Angle, Some("gone"), "B"),
			],
			edges: vec![],
		}
		.normalized();
		assert_eq!(graph.nodes[1].parent_id.as_deref(), Some(PLACEHOLDER_ID));
		assert_eq!(graph.nodes[2].parent_id.as_deref(), Some(PLACEHOLDER_ID));
		assert_eq!(graph.edges.len(), 2);
		graph.validate().unwrap();
	}

	#[test]
	fn test_missing_parent_edges_are_synthesized() {
		let mut graph = persona(1, 2, 0);
		graph.edges.retain(|e| e.target_id != "angle-0/story-1");
		let graph = graph.normalized();
		assert!(
			graph
				.edges
				.iter()
				.any(|e| e.source_id == "angle-0" && e.target_id == "angle-0/story-1")
		);
		assert_eq!(graph.edges.len(), 3);
		graph.validate().unwrap();
	}

	#[test]
	fn test_existing_profile_left_untouched() {
		let graph = persona(2, 1, 0);
		assert_eq!(graph.clone().normalized(), graph);
	}

	#[test]
	fn test_validate_rejects_layer_skip() {
		let mut graph = persona(1, 0, 0);
		graph
			.nodes
			.push(GraphNode::new("d", Layer::Detail, Some("angle-0"), "skips"));
		assert!(matches!(graph.validate(), Err(GraphError::LayerMismatch { .. })));
	}

	#[test]
	fn test_validate_rejects_two_profiles() {
		let mut graph = persona(1, 0, 0);
		graph.nodes.push(GraphNode::new("p2", Layer::Profile, None, "again"));
		assert!(matches!(graph.validate(), Err(GraphError::MultipleRoots(2))));
	}

	#[test]
	fn test_validate_rejects_stray_edge() {
		let mut graph = persona(2, 0, 0);
		graph.edges.push(GraphEdge::linking("angle-0", "angle-1"));
		assert!(matches!(graph.validate(), Err(GraphError::StrayEdge { .. })));
	}

	#[test]
	fn test_validate_rejects_unknown_parent() {
		let mut graph = persona(1, 0, 0);
		graph.nodes.push(GraphNode::new("s", Layer::Story, Some("nope"), "lost"));
		assert!(matches!(graph.validate(), Err(GraphError::MissingParent { .. })));
	}

	#[test]
	fn test_validate_rejects_duplicate_ids() {
		let mut graph = persona(1, 0, 0);
		graph.nodes.push(GraphNode::new("angle-0", Layer::Angle, Some("profile"), "dup"));
		assert!(matches!(graph.validate(), Err(GraphError::DuplicateNode(_))));
	}

	#[test]
	fn test_forest_order_and_tracks() {
		let forest = Forest::from_graph(&persona(2, 2, 1));
		assert_eq!(forest.root(), "profile");
		assert_eq!(forest.len(), 1 + 2 + 4 + 4);
		assert_eq!(forest.children("profile"), ["angle-0", "angle-1"]);
		assert_eq!(
			forest.children("angle-1"),
			["angle-1/story-0", "angle-1/story-1"]
		);
		assert_eq!(forest.track_of("angle-1/story-1/detail-0"), Some("angle-1"));
		assert_eq!(forest.track_index("angle-1/story-0"), Some(1));
		assert_eq!(forest.track_of("profile"), None);

		let bfs = forest.breadth_first();
		let pos = |id: &str| bfs.iter().position(|x| x == id).unwrap();
		for id in bfs {
			if let Some(parent) = forest.parent(id) {
				assert!(pos(parent) < pos(id));
				assert_eq!(forest.layer(parent).and_then(Layer::child), forest.layer(id));
			}
		}
	}

	#[test]
	fn test_layer_navigation() {
		assert_eq!(Layer::Profile.child(), Some(Layer::Angle));
		assert_eq!(Layer::Detail.child(), None);
		assert_eq!(u8::from(Layer::Story), 2);
		assert!(matches!(Layer::try_from(4), Err(GraphError::UnknownLayer(4))));
	}
}

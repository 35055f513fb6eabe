use thiserror::Error;

use super::types::Layer;

/// Reasons a persona graph snapshot or a layer policy is rejected.
#[derive(Debug, Error)]
pub enum GraphError {
	/// The snapshot was not valid persona-graph JSON.
	#[error("failed to decode persona graph: {0}")]
	Decode(#[from] serde_json::Error),

	/// A layer integer outside 0..=3.
	#[error("unknown layer {0}, expected 0..=3")]
	UnknownLayer(u8),

	/// Two nodes share an id.
	#[error("duplicate node id `{0}`")]
	DuplicateNode(String),

	/// Two edges share an id.
	#[error("duplicate edge id `{0}`")]
	DuplicateEdge(String),

	/// More than one profile node.
	#[error("expected exactly one profile node, found {0}")]
	MultipleRoots(usize),

	/// The profile node names a parent.
	#[error("profile node `{0}` must not have a parent")]
	RootWithParent(String),

	/// A non-profile node without a parent, or with a parent that is not in the snapshot.
	#[error("node `{node}` has missing or unknown parent {parent:?}")]
	MissingParent {
		/// The orphaned node.
		node: String,
		/// The parent id it referenced, if any.
		parent: Option<String>,
	},

	/// A node whose layer is not one deeper than its parent's.
	#[error("node `{node}` is on layer {layer:?} but its parent is on {parent_layer:?}")]
	LayerMismatch {
		/// The offending node.
		node: String,
		/// Its declared layer.
		layer: Layer,
		/// The layer of its parent.
		parent_layer: Layer,
	},

	/// An edge that does not join a node to its parent.
	#[error("edge `{edge}` ({source_id} -> {target_id}) does not join a node to its parent")]
	StrayEdge {
		/// The offending edge.
		edge: String,
		/// Its source endpoint.
		source_id: String,
		/// Its target endpoint.
		target_id: String,
	},

	/// Layer policy constants that would let rings overlap.
	#[error("invalid layer policy: {0}")]
	InvalidPolicy(String),
}

//! Persona knowledge-graph: concentric layout engine and its canvas component.
//!
//! Snapshots from the persona API go in through [`PersonaGraphEngine::replace_graph`],
//! pointer events through [`PersonaGraphEngine::dispatch`], and a positioned
//! [`Scene`] comes out for the renderer.

mod component;
mod error;
mod geometry;
mod interaction;
mod placement;
mod policy;
mod render;
mod scene;
mod state;
mod types;
mod visibility;

pub use component::PersonaGraphCanvas;
pub use error::GraphError;
pub use geometry::{Point, wrap_angle};
pub use interaction::{InteractionEvent, InteractionState, Recompute, SceneEvent, Transition};
pub use placement::{Cluster, Layout, Placed, place, visible_structure};
pub use policy::{LayerPolicy, LayerStyle, LayoutConfig, truncate_label};
pub use scene::{ClusterBadge, PersonaGraphEngine, Scene, SceneEdge, SceneNode};
pub use state::PersonaGraphState;
pub use types::{Forest, GraphEdge, GraphNode, Layer, PLACEHOLDER_ID, PersonaGraph};
pub use visibility::{DetailLevel, EdgeStyle, Visibility, classify};

//! UI components.

pub mod persona_graph;

// Graph Nodes

pub mod model;

pub use model::ModelNode;

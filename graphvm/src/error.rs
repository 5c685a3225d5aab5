//! Module containing the universal error type
use crate::types::TypeDesc;
use thiserror::Error;

/// Universal error type for `graphvm`
#[derive(Error, Debug)]
pub enum Error {
    /// Node is not present in this `NodeGraph`
    #[error("node is not present in this `NodeGraph`")]
    BadNode,

    /// A node with this name already exists
    #[error("a node named '{0}' already exists")]
    DuplicateNode(String),

    /// No node with this name exists
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// The node type has no socket with this name
    #[error("node '{node}' has no {dir} socket named '{socket}'")]
    UnknownSocket {
        node: String,
        socket: String,
        dir: &'static str,
    },

    /// The node type is not in the node catalog
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    /// Socket or value types do not match
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: TypeDesc, actual: TypeDesc },

    /// Constant inputs are baked into instructions and cannot be linked
    #[error("input '{socket}' of node '{node}' is constant and cannot be linked")]
    ConstantLink { node: String, socket: String },

    /// A literal could not be parsed as the given type
    #[error("could not parse '{1}' as {0}")]
    BadValue(TypeDesc, String),

    /// Unknown command in a text graph
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// A command in a text graph is missing an argument
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// A socket reference in a text graph is not of the form `node.socket`
    #[error("bad socket reference '{0}'; expected `node.socket`")]
    BadSocketRef(String),

    /// A value was requested from a socket that has no stack slot in the
    /// subgraph being generated
    #[error("socket '{socket}' of node '{node}' has no value in this scope")]
    UnresolvedSocket { node: String, socket: String },

    /// IO error; see inner code for details
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

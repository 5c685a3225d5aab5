//! Infrastructure for representing procedural computations as node graphs
mod indexed;
mod node;
mod text;

use indexed::{IndexVec, define_index};
pub use node::{InputKind, InputSocket, NodeType, OutputSocket};

use crate::{Error, types::Value};

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

define_index!(NodeId, "An index in the `NodeGraph::nodes` table");

/// Identifies a socket by node and socket name
///
/// Whether the key refers to an input or an output socket is determined by
/// context; socket names are unique within each direction of a node type.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SocketKey {
    pub node: NodeId,
    pub socket: String,
}

impl SocketKey {
    pub fn new(node: NodeId, socket: &str) -> Self {
        Self {
            node,
            socket: socket.to_owned(),
        }
    }
}

/// Value source for one input of a [`NodeInstance`]
#[derive(Clone, Debug, PartialEq)]
pub enum InputBinding {
    /// Use the socket's default value
    Unset,
    /// Connected to an output socket of another node
    Link(SocketKey),
    /// Literal value carried on this instance
    Value(Value),
}

/// A node in a [`NodeGraph`]
#[derive(Clone, Debug)]
pub struct NodeInstance {
    name: String,
    node_type: Arc<NodeType>,
    inputs: Vec<InputBinding>,
}

impl NodeInstance {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.node_type.outputs().len()
    }

    /// Returns the descriptor of input `i`
    pub fn input(&self, i: usize) -> &InputSocket {
        &self.node_type.inputs()[i]
    }

    /// Returns the descriptor of output `i`
    pub fn output(&self, i: usize) -> &OutputSocket {
        &self.node_type.outputs()[i]
    }

    /// Returns the binding of input `i`
    pub fn binding(&self, i: usize) -> &InputBinding {
        &self.inputs[i]
    }

    /// Returns the source socket of input `i`, if it is linked
    pub fn input_link(&self, i: usize) -> Option<&SocketKey> {
        match &self.inputs[i] {
            InputBinding::Link(k) => Some(k),
            _ => None,
        }
    }

    /// Checks whether input `i` is linked
    pub fn has_input_link(&self, i: usize) -> bool {
        self.input_link(i).is_some()
    }

    /// Returns the literal for input `i`: the instance value if one was set,
    /// otherwise the socket default
    pub fn input_value(&self, i: usize) -> &Value {
        match &self.inputs[i] {
            InputBinding::Value(v) => v,
            InputBinding::Unset | InputBinding::Link(..) => {
                &self.input(i).default_value
            }
        }
    }

    pub fn is_input_constant(&self, i: usize) -> bool {
        self.input(i).kind == InputKind::Constant
    }

    pub fn is_input_function(&self, i: usize) -> bool {
        self.input(i).kind == InputKind::Function
    }

    /// Iterates over the source sockets of all linked inputs
    pub fn links(&self) -> impl Iterator<Item = &SocketKey> {
        self.inputs.iter().filter_map(|b| match b {
            InputBinding::Link(k) => Some(k),
            _ => None,
        })
    }
}

/// Externally-visible input or output of a [`NodeGraph`]
///
/// Both refer to an output socket of a node in the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphSocket {
    pub name: String,
    pub key: SocketKey,
}

/// A `NodeGraph` owns a set of named node instances, plus its declared inputs
/// and outputs.
///
/// Nodes are never removed, so a [`NodeId`] stays valid for the lifetime of
/// the graph.  Iteration is in insertion order.
#[derive(Clone, Debug, Default)]
pub struct NodeGraph {
    nodes: IndexVec<NodeInstance, NodeId>,
    names: HashMap<String, NodeId>,
    inputs: Vec<GraphSocket>,
    outputs: Vec<GraphSocket>,
}

impl NodeGraph {
    /// Builds a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Checks whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a node, returning its handle
    ///
    /// All inputs start out unset (using their socket defaults).
    pub fn add_node(
        &mut self,
        name: &str,
        node_type: Arc<NodeType>,
    ) -> Result<NodeId, Error> {
        if self.names.contains_key(name) {
            return Err(Error::DuplicateNode(name.to_owned()));
        }
        let inputs = vec![InputBinding::Unset; node_type.inputs().len()];
        let id = self.nodes.push(NodeInstance {
            name: name.to_owned(),
            node_type,
            inputs,
        });
        self.names.insert(name.to_owned(), id);
        Ok(id)
    }

    /// Looks up a node by name
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Looks up a node by handle
    pub fn get(&self, node: NodeId) -> Option<&NodeInstance> {
        self.nodes.get(node)
    }

    /// Iterates over `(handle, node)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeInstance)> {
        self.nodes.enumerate()
    }

    /// Returns the declared graph inputs
    pub fn inputs(&self) -> &[GraphSocket] {
        &self.inputs
    }

    /// Returns the declared graph outputs
    pub fn outputs(&self) -> &[GraphSocket] {
        &self.outputs
    }

    /// Returns the descriptor for an output socket
    pub fn output_socket(&self, key: &SocketKey) -> Option<&OutputSocket> {
        self.get(key.node)?
            .node_type()
            .find_output(&key.socket)
            .map(|(_, s)| s)
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut NodeInstance, Error> {
        self.nodes.get_mut(node).ok_or(Error::BadNode)
    }

    fn find_input(
        &self,
        node: NodeId,
        socket: &str,
    ) -> Result<(usize, &InputSocket), Error> {
        let n = self.get(node).ok_or(Error::BadNode)?;
        n.node_type()
            .find_input(socket)
            .ok_or_else(|| Error::UnknownSocket {
                node: n.name.clone(),
                socket: socket.to_owned(),
                dir: "input",
            })
    }

    fn check_output(&self, node: NodeId, socket: &str) -> Result<(), Error> {
        let n = self.get(node).ok_or(Error::BadNode)?;
        match n.node_type().find_output(socket) {
            Some(..) => Ok(()),
            None => Err(Error::UnknownSocket {
                node: n.name.clone(),
                socket: socket.to_owned(),
                dir: "output",
            }),
        }
    }

    /// Sets a literal value on an input, replacing any link
    pub fn set_value<V: Into<Value>>(
        &mut self,
        node: NodeId,
        socket: &str,
        value: V,
    ) -> Result<(), Error> {
        let value = value.into();
        let (i, s) = self.find_input(node, socket)?;
        if s.typedesc != value.type_desc() {
            return Err(Error::TypeMismatch {
                expected: s.typedesc,
                actual: value.type_desc(),
            });
        }
        self.node_mut(node)?.inputs[i] = InputBinding::Value(value);
        Ok(())
    }

    /// Connects output `from.from_socket` to input `to.to_socket`
    ///
    /// Any previous binding of the input is replaced.  Cycles are not checked
    /// for here; the compiler tolerates them (see
    /// [`Compiler`](crate::compiler::Compiler)).
    pub fn link(
        &mut self,
        from: NodeId,
        from_socket: &str,
        to: NodeId,
        to_socket: &str,
    ) -> Result<(), Error> {
        self.check_output(from, from_socket)?;
        let key = SocketKey::new(from, from_socket);
        let src_ty = self.output_socket(&key).ok_or(Error::BadNode)?.typedesc;

        let (i, s) = self.find_input(to, to_socket)?;
        if s.kind == InputKind::Constant {
            return Err(Error::ConstantLink {
                node: self.nodes[to].name.clone(),
                socket: to_socket.to_owned(),
            });
        }
        if s.typedesc != src_ty {
            return Err(Error::TypeMismatch {
                expected: s.typedesc,
                actual: src_ty,
            });
        }
        self.node_mut(to)?.inputs[i] = InputBinding::Link(key);
        Ok(())
    }

    /// Declares an externally-supplied input, held live during evaluation
    pub fn add_input(
        &mut self,
        name: &str,
        node: NodeId,
        socket: &str,
    ) -> Result<(), Error> {
        self.check_output(node, socket)?;
        self.inputs.push(GraphSocket {
            name: name.to_owned(),
            key: SocketKey::new(node, socket),
        });
        Ok(())
    }

    /// Declares a graph output, which is returned to the caller
    pub fn add_output(
        &mut self,
        name: &str,
        node: NodeId,
        socket: &str,
    ) -> Result<(), Error> {
        self.check_output(node, socket)?;
        self.outputs.push(GraphSocket {
            name: name.to_owned(),
            key: SocketKey::new(node, socket),
        });
        Ok(())
    }

    /// Converts the entire graph into a GraphViz drawing
    pub fn dot(&self) -> String {
        let mut out = "digraph nodegraph {\n".to_owned();
        for (id, node) in self.iter() {
            let t = node.node_type();
            let color = if t.is_kernel_node() {
                "dodgerblue"
            } else if t.is_pass_node() {
                "gray"
            } else {
                "goldenrod"
            };
            writeln!(
                out,
                r#"n{id} [label = "{}\n{}" color="{color}" shape="box"]"#,
                node.name(),
                t.name()
            )
            .unwrap();
            for i in 0..node.num_inputs() {
                if let Some(k) = node.input_link(i) {
                    let style = if node.is_input_function(i) {
                        "dashed"
                    } else {
                        "solid"
                    };
                    writeln!(
                        out,
                        r#"n{} -> n{id} [label = "{} -> {}" style="{style}"]"#,
                        k.node,
                        k.socket,
                        node.input(i).name
                    )
                    .unwrap();
                }
            }
        }
        for (i, o) in self.outputs.iter().enumerate() {
            writeln!(out, r#"out{i} [label = "{}" shape="oval"]"#, o.name)
                .unwrap();
            writeln!(out, "n{} -> out{i}", o.key.node).unwrap();
        }
        out += "}\n";
        out
    }
}

impl std::ops::Index<NodeId> for NodeGraph {
    type Output = NodeInstance;
    fn index(&self, i: NodeId) -> &NodeInstance {
        &self.nodes[i]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{BaseType, TypeDesc};

    fn float_value() -> Arc<NodeType> {
        Arc::new(
            NodeType::new("VALUE_FLOAT")
                .constant_input("value", 0.0)
                .output("value", BaseType::Float),
        )
    }

    fn add_float() -> Arc<NodeType> {
        Arc::new(
            NodeType::new("ADD_FLOAT")
                .input("value_a", 0.0)
                .input("value_b", 0.0)
                .output("value", BaseType::Float),
        )
    }

    #[test]
    fn test_build_graph() {
        let mut g = NodeGraph::new();
        let a = g.add_node("a", float_value()).unwrap();
        let b = g.add_node("b", add_float()).unwrap();
        assert_eq!(g.len(), 2);
        assert_eq!(g.find_node("b"), Some(b));

        g.set_value(a, "value", 2.0).unwrap();
        g.link(a, "value", b, "value_a").unwrap();
        g.add_output("sum", b, "value").unwrap();

        assert_eq!(g[b].input_link(0), Some(&SocketKey::new(a, "value")));
        assert!(!g[b].has_input_link(1));
        assert_eq!(g[b].input_value(1), &Value::Float(0.0));
        assert_eq!(g[a].input_value(0), &Value::Float(2.0));
        assert_eq!(g.outputs()[0].name, "sum");
        assert_eq!(g[b].links().count(), 1);
    }

    #[test]
    fn test_errors() {
        let mut g = NodeGraph::new();
        let a = g.add_node("a", float_value()).unwrap();
        let b = g.add_node("b", add_float()).unwrap();
        assert!(matches!(
            g.add_node("a", float_value()),
            Err(Error::DuplicateNode(..))
        ));
        assert!(matches!(
            g.link(a, "nope", b, "value_a"),
            Err(Error::UnknownSocket { dir: "output", .. })
        ));
        assert!(matches!(
            g.link(a, "value", b, "nope"),
            Err(Error::UnknownSocket { dir: "input", .. })
        ));
        assert!(matches!(
            g.link(b, "value", a, "value"),
            Err(Error::ConstantLink { .. })
        ));
        assert!(matches!(
            g.set_value(b, "value_a", 1),
            Err(Error::TypeMismatch {
                expected: TypeDesc {
                    base_type: BaseType::Float
                },
                actual: TypeDesc {
                    base_type: BaseType::Int
                },
            })
        ));
        assert!(matches!(
            g.add_output("x", b, "value_a"),
            Err(Error::UnknownSocket { .. })
        ));
    }

    #[test]
    fn test_value_replaces_link() {
        let mut g = NodeGraph::new();
        let a = g.add_node("a", float_value()).unwrap();
        let b = g.add_node("b", add_float()).unwrap();
        g.link(a, "value", b, "value_a").unwrap();
        g.set_value(b, "value_a", 4.0).unwrap();
        assert!(!g[b].has_input_link(0));
        assert_eq!(g[b].input_value(0), &Value::Float(4.0));
    }

    #[test]
    fn test_dot() {
        let mut g = NodeGraph::new();
        let a = g.add_node("a", float_value()).unwrap();
        let b = g.add_node("b", add_float()).unwrap();
        g.link(a, "value", b, "value_b").unwrap();
        g.add_output("sum", b, "value").unwrap();
        let d = g.dot();
        assert!(d.starts_with("digraph"));
        assert!(d.contains(&format!("n{a} -> n{b}")));
        assert!(d.contains("-> out0"));
    }
}

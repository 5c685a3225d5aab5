//! `graphvm` compiles procedural node graphs into bytecode for a stack machine.
//!
//! A **node graph** describes a computation (for example, a mesh modifier or
//! a shader) as a set of nodes, each with typed input and output sockets.
//! Inputs are either linked to the output of another node or carry a literal
//! value.  The compiler lowers the graph into a flat list of `u32` words: an
//! opcode per node, followed by the stack slots (or inline constants) that it
//! reads and writes.
//!
//! # Graph construction
//! Graphs are built from node types, which are usually taken from the
//! [built-in catalog](crate::nodes::NodeLibrary::builtin):
//! ```
//! use graphvm::{graph::NodeGraph, nodes::NodeLibrary};
//!
//! let lib = NodeLibrary::builtin();
//! let mut g = NodeGraph::new();
//! let a = g.add_node("a", lib.get("VALUE_FLOAT").unwrap())?;
//! let b = g.add_node("b", lib.get("SINE").unwrap())?;
//! g.set_value(a, "value", 0.5)?;
//! g.link(a, "value", b, "value")?;
//! g.add_output("result", b, "value")?;
//! # Ok::<(), graphvm::Error>(())
//! ```
//!
//! Graphs can also be loaded from a simple line-oriented text format, using
//! [`NodeGraph::from_text`](crate::graph::NodeGraph::from_text).
//!
//! # Compilation
//! [`compile`] (or a reusable [`Compiler`](crate::compiler::Compiler)) turns a
//! graph into a [`Function`](crate::bytecode::Function):
//! ```
//! use graphvm::{bytecode::Opcode, graph::NodeGraph, nodes::NodeLibrary};
//!
//! let text = "
//! node a VALUE_FLOAT value=3.5
//! output result a.value
//! ";
//! let g = NodeGraph::from_text(text.as_bytes(), &NodeLibrary::builtin())?;
//! let f = graphvm::compile(&g)?;
//! assert_eq!(
//!     f.instructions(),
//!     &[Opcode::ValueFloat as u32, 0x40600000, 0, Opcode::End as u32]
//! );
//! assert_eq!(f.return_values()[0].name, "result");
//! # Ok::<(), graphvm::Error>(())
//! ```
//!
//! Values of managed types (meshes) are reference-counted by the
//! interpreter: the compiler initializes each mesh slot with its number of
//! consumers, and every consumer releases it once.
//!
//! **Kernel** nodes take function-typed inputs, which are compiled as
//! separate bodies: the kernel receives the body's entry point and the slot
//! in which it leaves its result, and may evaluate it any number of times.
pub mod bytecode;
pub mod compiler;
pub mod graph;
pub mod nodes;
pub mod types;

mod error;
pub use error::Error;
pub use types::Value;

/// Compiles a graph with a default [`Compiler`](compiler::Compiler)
pub fn compile(graph: &graph::NodeGraph) -> Result<bytecode::Function, Error> {
    compiler::Compiler::new().compile(graph)
}

//! Compiler infrastructure
//!
//! The compiler turns a [`NodeGraph`] into a [`Function`] in several stages:
//! - Every output socket is assigned a use count: the number of links,
//!   graph inputs, and graph outputs that consume it.  Managed values (meshes)
//!   are initialized with this count, and each consumer releases them once.
//! - The graph's nodes are sorted so that every link source precedes its
//!   consumer.  While sorting, each function-typed input is recorded.
//! - Each function-typed input is compiled as a separate body, starting from
//!   its link and walking backwards until reaching a kernel node.
//! - Finally, the main node list is compiled, and the graph outputs are bound
//!   to their slots as the function's return values.
//!
//! Function bodies are emitted before the main body, so kernel nodes only
//! ever refer backwards in the instruction stream.
use crate::{
    Error,
    bytecode::Function,
    graph::{NodeGraph, SocketKey},
};
use std::collections::BTreeMap;

mod codegen;
mod sort;
mod stack;

use codegen::SubgraphOutput;
pub use stack::{STACK_SIZE, StackAllocator, StackIndex};

/// Compiled body of a function-typed input
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FunctionInfo {
    /// Word offset of the body's first instruction
    pub entry_point: usize,
    /// Slot in which the body leaves its result
    pub return_index: StackIndex,
}

/// Graph-to-bytecode compiler
///
/// `N` is the capacity of the VM stack.  A compiler may be reused for
/// multiple graphs; each call to [`compile`](Self::compile) starts from a
/// clean state.
pub struct Compiler<const N: usize = STACK_SIZE> {
    stack: StackAllocator<N>,

    /// Bodies of function-typed inputs, keyed by input socket
    func_entries: BTreeMap<SocketKey, FunctionInfo>,

    /// Function under construction
    func: Function,
}

impl Compiler {
    /// Builds a compiler with the default [`STACK_SIZE`]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<const N: usize> Default for Compiler<N> {
    fn default() -> Self {
        Self {
            stack: StackAllocator::default(),
            func_entries: BTreeMap::new(),
            func: Function::new(),
        }
    }
}

impl<const N: usize> Compiler<N> {
    /// Compiles a graph into bytecode
    ///
    /// If the stack runs out of space, compilation continues (dropping the
    /// missing slots from the stream) and the result is flagged with
    /// [`Function::stack_exhausted`].
    pub fn compile(&mut self, graph: &NodeGraph) -> Result<Function, Error> {
        self.stack.reset();
        self.func_entries.clear();
        self.func = Function::new();

        let users = sort::count_output_users(graph);
        let main_nodes = sort::sort_graph_nodes(graph, &mut self.func_entries);
        log::debug!(
            "compiling {} nodes with {} function inputs",
            main_nodes.len(),
            self.func_entries.len()
        );

        // Bodies are compiled in socket order, so the output is deterministic
        let keys: Vec<SocketKey> = self.func_entries.keys().cloned().collect();
        for key in keys {
            let expr_nodes = sort::sort_expression_nodes(graph, &key);
            let node = &graph[key.node];
            let (i, _) = node.node_type().find_input(&key.socket).ok_or_else(
                || Error::UnknownSocket {
                    node: node.name().to_owned(),
                    socket: key.socket.clone(),
                    dir: "input",
                },
            )?;
            let mut outputs = [SubgraphOutput::new(
                node.input_link(i).cloned(),
                *node.input_value(i),
            )];
            let entry_point =
                self.codegen_subgraph(graph, &expr_nodes, &users, &mut outputs)?;
            log::trace!(
                "body for '{}.{}': {} nodes at {entry_point}, returns {}",
                node.name(),
                key.socket,
                expr_nodes.len(),
                outputs[0].stack_index,
            );
            self.func_entries.insert(
                key,
                FunctionInfo {
                    entry_point,
                    return_index: outputs[0].stack_index,
                },
            );
        }

        let mut outputs: Vec<SubgraphOutput> = graph
            .outputs()
            .iter()
            .map(|o| -> Result<SubgraphOutput, Error> {
                let value = graph
                    .output_socket(&o.key)
                    .map(|s| s.default_value)
                    .ok_or(Error::BadNode)?;
                Ok(SubgraphOutput::new(Some(o.key.clone()), value))
            })
            .collect::<Result<_, _>>()?;
        let entry_point =
            self.codegen_subgraph(graph, &main_nodes, &users, &mut outputs)?;
        log::trace!("main body at {entry_point}");
        self.func.set_entry_point(entry_point);

        for (o, out) in graph.outputs().iter().zip(&outputs) {
            let typedesc = graph
                .output_socket(&o.key)
                .ok_or(Error::BadNode)?
                .typedesc;
            self.func.add_return_value(typedesc, &o.name, out.stack_index);
        }

        if self.stack.is_exhausted() {
            self.func.set_stack_exhausted();
        }
        log::debug!("compiled {} words", self.func.len());
        Ok(std::mem::take(&mut self.func))
    }

    /// Returns the compiled body of a function-typed input
    ///
    /// This is only populated after a call to [`compile`](Self::compile).
    pub fn function_info(&self, key: &SocketKey) -> Option<&FunctionInfo> {
        self.func_entries.get(key)
    }

    /// Iterates over every function-typed input and its compiled body
    pub fn function_infos(
        &self,
    ) -> impl Iterator<Item = (&SocketKey, &FunctionInfo)> {
        self.func_entries.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{bytecode::Opcode, nodes::NodeLibrary};

    fn parse(s: &str) -> NodeGraph {
        NodeGraph::from_text(s.as_bytes(), &NodeLibrary::builtin()).unwrap()
    }

    #[test]
    fn test_compile_constant() {
        let g = parse(
            "node a VALUE_FLOAT value=3.5
            output result a.value",
        );
        let f = Compiler::new().compile(&g).unwrap();
        assert_eq!(
            f.instructions(),
            &[Opcode::ValueFloat as u32, 0x40600000, 0, Opcode::End as u32]
        );
        assert_eq!(f.entry_point(), 0);
        let r = f.return_value("result").unwrap();
        assert_eq!(r.stack_offset, StackIndex::new(0));
        assert!(!f.stack_exhausted());
    }

    #[test]
    fn test_compiler_reuse() {
        let g = parse(
            "node a VALUE_FLOAT value=3.5
            node b COPY_FLOAT
            link a.value b.value
            output result b.value",
        );
        let mut c = Compiler::new();
        let f1 = c.compile(&g).unwrap();
        let f2 = c.compile(&g).unwrap();
        assert_eq!(f1.instructions(), f2.instructions());
        assert_eq!(f1.return_values(), f2.return_values());
    }

    #[test]
    fn test_function_body() {
        let g = parse(
            "node mesh VALUE_MESH
            node t VALUE_MATRIX44
            node array MESH_ARRAY count=3
            link mesh.mesh array.mesh_in
            link t.value array.transform
            output result array.mesh_out",
        );
        let mut c = Compiler::new();
        let f = c.compile(&g).unwrap();
        let array = g.find_node("array").unwrap();
        let info = *c
            .function_info(&SocketKey::new(array, "transform"))
            .unwrap();

        // The body comes first, and is just the matrix literal
        assert_eq!(info.entry_point, 0);
        assert_eq!(info.return_index, StackIndex::new(0));
        assert_eq!(f.instructions()[0], Opcode::ValueMatrix44 as u32);
        assert_eq!(f.instructions()[18], Opcode::End as u32);
        assert_eq!(f.entry_point(), 19);

        // The kernel is given the body's address and return slot
        let (i, _) = f
            .iter_opcodes()
            .find(|(_, op)| *op == Opcode::MeshArray)
            .unwrap();
        let count_slot = f.instructions()[i + 2];
        assert_eq!(f.instructions()[i + 3], 0); // jump address
        assert_eq!(f.instructions()[i + 4], 0); // return slot
        assert_ne!(count_slot, 0);
    }
}

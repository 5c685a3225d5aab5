use crate::{
    Error,
    bytecode::Opcode,
    compiler::{Compiler, StackIndex},
    graph::{NodeGraph, NodeId, SocketKey},
    types::Value,
};
use std::collections::HashMap;

/// A value requested from a subgraph
///
/// If `key` is set, the result is the slot assigned to that output socket;
/// otherwise, `value` is loaded into a fresh slot after the subgraph's `End`.
#[derive(Clone, Debug)]
pub(crate) struct SubgraphOutput {
    pub key: Option<SocketKey>,
    pub value: Value,
    pub stack_index: StackIndex,
}

impl SubgraphOutput {
    pub fn new(key: Option<SocketKey>, value: Value) -> Self {
        Self {
            key,
            value,
            stack_index: StackIndex::INVALID,
        }
    }
}

/// Looks up the slot of an output socket that was generated in this scope
fn find_slot(
    graph: &NodeGraph,
    slots: &HashMap<SocketKey, StackIndex>,
    key: &SocketKey,
) -> Result<StackIndex, Error> {
    slots
        .get(key)
        .copied()
        .ok_or_else(|| Error::UnresolvedSocket {
            node: graph[key.node].name().to_owned(),
            socket: key.socket.clone(),
        })
}

impl<const N: usize> Compiler<N> {
    /// Loads a literal into a freshly assigned slot, returning the slot
    pub(crate) fn codegen_value(&mut self, v: &Value) -> StackIndex {
        let ty = v.type_desc();
        let offset = self.stack.assign(ty);
        self.func.push_opcode(ty.value_opcode());
        self.func.push_constant(v);
        self.func.push_stack_index(offset);
        offset
    }

    /// Generates code for an ordered list of nodes, followed by `End`
    ///
    /// Returns the offset of the first instruction; the slot of each
    /// requested output is written into `outputs`.
    pub(crate) fn codegen_subgraph(
        &mut self,
        graph: &NodeGraph,
        nodes: &[NodeId],
        users: &HashMap<SocketKey, u32>,
        outputs: &mut [SubgraphOutput],
    ) -> Result<usize, Error> {
        let entry_point = self.func.len();

        let mut output_index = HashMap::new();
        for &id in nodes {
            let node = &graph[id];
            let t = node.node_type();
            let op = t.opcode();
            if t.is_pass_node() || op == Opcode::Noop {
                continue;
            }

            // Constant and function inputs are written inline below
            let mut input_index = vec![StackIndex::INVALID; node.num_inputs()];
            for (i, slot) in input_index.iter_mut().enumerate() {
                if node.is_input_constant(i) || node.is_input_function(i) {
                    continue;
                }
                *slot = match node.input_link(i) {
                    Some(k) => find_slot(graph, &output_index, k)?,
                    None => self.codegen_value(node.input_value(i)),
                };
            }

            let mut out_index = Vec::with_capacity(node.num_outputs());
            for s in t.outputs() {
                let key = SocketKey::new(id, &s.name);
                let slot = self.stack.assign(s.typedesc);
                if let Some(init) = s.typedesc.init_opcode() {
                    let count = users.get(&key).copied().unwrap_or(0);
                    if count > 0 {
                        self.func.push_opcode(init);
                        self.func.push_stack_index(slot);
                        self.func.push_int(count as i32);
                    }
                }
                output_index.insert(key, slot);
                out_index.push(slot);
            }

            self.func.push_opcode(op);
            for (i, &slot) in input_index.iter().enumerate() {
                if node.is_input_constant(i) {
                    self.func.push_constant(node.input_value(i));
                } else if node.is_input_function(i) {
                    let key = SocketKey::new(id, &node.input(i).name);
                    let info =
                        self.func_entries.get(&key).copied().unwrap_or_default();
                    self.func.push_jump_address(info.entry_point);
                    self.func.push_stack_index(info.return_index);
                } else {
                    self.func.push_stack_index(slot);
                }
            }
            for &slot in &out_index {
                self.func.push_stack_index(slot);
            }

            // Each consumer drops one retainer of a managed input
            for (i, &slot) in input_index.iter().enumerate() {
                if node.is_input_constant(i)
                    || node.is_input_function(i)
                    || !node.has_input_link(i)
                {
                    continue;
                }
                if let Some(release) = node.input(i).typedesc.release_opcode() {
                    self.func.push_opcode(release);
                    self.func.push_stack_index(slot);
                }
            }
        }

        self.func.push_opcode(Opcode::End);

        for out in outputs.iter_mut() {
            out.stack_index = match &out.key {
                Some(k) => find_slot(graph, &output_index, k)?,
                None => self.codegen_value(&out.value),
            };
        }

        Ok(entry_point)
    }
}

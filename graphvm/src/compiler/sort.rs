use crate::{
    compiler::FunctionInfo,
    graph::{NodeGraph, NodeId, NodeInstance, SocketKey},
};
use std::collections::{BTreeMap, HashMap};

/// Traversal state of a node
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Mark {
    /// Children are still being visited
    Active,
    /// Node has been appended to the output list
    Done,
}

/// Appends `root` and its transitive dependencies to `out`, in post-order
///
/// `children` returns the nodes that must precede a given node, or `None` if
/// the node is not part of the traversal at all.  Each node is appended at
/// most once.  If the traversal reaches a node whose children are still being
/// visited, the graph contains a cycle; the back edge is logged and skipped.
fn append_nodes<F>(
    graph: &NodeGraph,
    root: NodeId,
    marks: &mut HashMap<NodeId, Mark>,
    out: &mut Vec<NodeId>,
    mut children: F,
) where
    F: FnMut(NodeId, &NodeInstance) -> Option<Vec<NodeId>>,
{
    enum Action {
        Down,
        Up,
    }

    // Manual recursion, to avoid blowing the stack on deep graphs
    let mut todo = vec![(Action::Down, root)];
    while let Some((a, node)) = todo.pop() {
        match a {
            Action::Down => match marks.get(&node) {
                Some(Mark::Done) => (),
                Some(Mark::Active) => {
                    log::warn!(
                        "cycle detected at node '{}'; ignoring back edge",
                        graph[node].name()
                    );
                }
                None => {
                    let Some(cs) = children(node, &graph[node]) else {
                        continue;
                    };
                    marks.insert(node, Mark::Active);
                    todo.push((Action::Up, node));
                    // Reversed, so that inputs are visited in socket order
                    for c in cs.into_iter().rev() {
                        todo.push((Action::Down, c));
                    }
                }
            },
            Action::Up => {
                marks.insert(node, Mark::Done);
                out.push(node);
            }
        }
    }
}

/// Sorts every node in the graph so that link sources precede their users
///
/// Function-typed inputs are not followed; instead, each one is registered in
/// `func_entries` with a placeholder [`FunctionInfo`], to be compiled as a
/// separate body.
pub(crate) fn sort_graph_nodes(
    graph: &NodeGraph,
    func_entries: &mut BTreeMap<SocketKey, FunctionInfo>,
) -> Vec<NodeId> {
    let mut marks = HashMap::new();
    let mut out = Vec::with_capacity(graph.len());
    for (id, _) in graph.iter() {
        append_nodes(graph, id, &mut marks, &mut out, |id, node| {
            let mut cs = vec![];
            for i in 0..node.num_inputs() {
                if node.is_input_function(i) {
                    let key = SocketKey::new(id, &node.input(i).name);
                    func_entries.insert(key, FunctionInfo::default());
                } else if let Some(k) = node.input_link(i) {
                    cs.push(k.node);
                }
            }
            Some(cs)
        });
    }
    debug_assert_eq!(out.len(), graph.len());
    out
}

/// Sorts the expression subgraph feeding a function-typed input
///
/// The traversal walks backwards from the input's link, and stops at kernel
/// nodes (which are excluded from the list).  An unlinked input produces an
/// empty list.
pub(crate) fn sort_expression_nodes(
    graph: &NodeGraph,
    key: &SocketKey,
) -> Vec<NodeId> {
    let mut out = vec![];
    let node = &graph[key.node];
    let Some((i, _)) = node.node_type().find_input(&key.socket) else {
        return out;
    };
    let Some(link) = node.input_link(i) else {
        return out;
    };
    let mut marks = HashMap::new();
    append_nodes(graph, link.node, &mut marks, &mut out, |_, node| {
        if node.node_type().is_kernel_node() {
            None
        } else {
            Some(node.links().map(|k| k.node).collect())
        }
    });
    out
}

/// Counts the consumers of every output socket in the graph
///
/// Each output starts at zero, then gains one user per link from a non-pass
/// node, and one per declared graph input or output referring to it.
pub(crate) fn count_output_users(graph: &NodeGraph) -> HashMap<SocketKey, u32> {
    let mut users = HashMap::new();
    for (id, node) in graph.iter() {
        for s in node.node_type().outputs() {
            users.insert(SocketKey::new(id, &s.name), 0);
        }
    }
    for (_, node) in graph.iter() {
        // Pass nodes emit no code, so they never consume their inputs
        if node.node_type().is_pass_node() {
            continue;
        }
        for k in node.links() {
            *users.entry(k.clone()).or_default() += 1;
        }
    }
    // Inputs are defined externally and must be retained during evaluation,
    // while outputs are handed to the caller, which frees them
    for s in graph.inputs().iter().chain(graph.outputs()) {
        *users.entry(s.key.clone()).or_default() += 1;
    }
    users
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nodes::NodeLibrary;

    fn parse(s: &str) -> NodeGraph {
        NodeGraph::from_text(s.as_bytes(), &NodeLibrary::builtin()).unwrap()
    }

    fn names(g: &NodeGraph, nodes: &[NodeId]) -> Vec<String> {
        nodes.iter().map(|&n| g[n].name().to_owned()).collect()
    }

    #[test]
    fn test_sort_graph_nodes() {
        // Insertion order is the reverse of dependency order
        let g = parse(
            "node c ADD_FLOAT
            node b COPY_FLOAT
            node a VALUE_FLOAT value=1
            link b.value c.value_a
            link a.value c.value_b
            link a.value b.value
            ",
        );
        let mut entries = BTreeMap::new();
        let order = sort_graph_nodes(&g, &mut entries);
        assert_eq!(names(&g, &order), vec!["a", "b", "c"]);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_sort_registers_functions() {
        let g = parse(
            "node m MESH_ARRAY
            node t VALUE_MATRIX44
            link t.value m.transform
            ",
        );
        let mut entries = BTreeMap::new();
        let order = sort_graph_nodes(&g, &mut entries);

        // The function link is not a dependency of the kernel
        assert_eq!(names(&g, &order), vec!["m", "t"]);
        let m = g.find_node("m").unwrap();
        let info = entries.get(&SocketKey::new(m, "transform")).unwrap();
        assert_eq!(info.entry_point, 0);
        assert!(!info.return_index.is_valid());
    }

    #[test]
    fn test_sort_expression_nodes() {
        let g = parse(
            "node outer MESH_DISPLACE
            node inner MESH_DISPLACE
            node a VALUE_MATRIX44
            node b MUL_MATRIX44_FLOAT3
            link a.value b.value_a
            link inner.element.location b.value_b
            link b.value outer.vector
            ",
        );
        let outer = g.find_node("outer").unwrap();
        let inner = g.find_node("inner").unwrap();
        let order = sort_expression_nodes(&g, &SocketKey::new(outer, "vector"));
        // `inner` is a kernel, so it bounds the expression
        assert_eq!(names(&g, &order), vec!["a", "b"]);

        let order = sort_expression_nodes(&g, &SocketKey::new(inner, "vector"));
        assert!(order.is_empty());
    }

    #[test]
    fn test_cycle() {
        let g = parse(
            "node a ADD_FLOAT
            node b ADD_FLOAT
            link a.value b.value_a
            link b.value a.value_a
            ",
        );
        let mut entries = BTreeMap::new();
        let order = sort_graph_nodes(&g, &mut entries);
        assert_eq!(names(&g, &order), vec!["b", "a"]);
    }

    #[test]
    fn test_count_output_users() {
        let g = parse(
            "node a VALUE_FLOAT
            node b ADD_FLOAT
            node p PASS_FLOAT
            link a.value b.value_a
            link a.value b.value_b
            link a.value p.value
            input x a.value
            output y b.value
            ",
        );
        let users = count_output_users(&g);
        let a = g.find_node("a").unwrap();
        let b = g.find_node("b").unwrap();
        let p = g.find_node("p").unwrap();
        assert_eq!(users[&SocketKey::new(a, "value")], 3);
        assert_eq!(users[&SocketKey::new(b, "value")], 1);
        assert_eq!(users[&SocketKey::new(p, "value")], 0);
        assert_eq!(users.len(), 3);
    }
}

use crate::{
    Error,
    graph::{NodeGraph, NodeId},
    nodes::NodeLibrary,
    types::Value,
};
use std::io::{BufRead, BufReader, Read};

impl NodeGraph {
    /// Parses a graph from a line-oriented text description
    ///
    /// Blank lines and lines starting with `#` are ignored.  Every other line
    /// is one of
    /// ```text
    /// node <name> <TYPE> [<input>=<value> ...]
    /// link <node>.<output> <node>.<input>
    /// input <name> <node>.<output>
    /// output <name> <node>.<output>
    /// ```
    /// Node types are looked up in the given library; values are parsed
    /// according to the socket type (see [`Value::parse`]).
    ///
    /// ```
    /// use graphvm::{graph::NodeGraph, nodes::NodeLibrary};
    ///
    /// let text = "
    /// node a VALUE_FLOAT value=3.5
    /// output result a.value
    /// ";
    /// let g = NodeGraph::from_text(text.as_bytes(), &NodeLibrary::builtin())?;
    /// assert_eq!(g.len(), 1);
    /// assert_eq!(g.outputs()[0].name, "result");
    /// # Ok::<(), graphvm::Error>(())
    /// ```
    pub fn from_text<R: Read>(
        r: R,
        library: &NodeLibrary,
    ) -> Result<Self, Error> {
        let reader = BufReader::new(r);
        let mut graph = Self::new();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut iter = line.split_whitespace();
            let Some(cmd) = iter.next() else {
                continue;
            };
            let mut arg = |name| iter.next().ok_or(Error::MissingArgument(name));
            match cmd {
                "node" => {
                    let name = arg("node name")?;
                    let ty = arg("node type")?;
                    let t = library
                        .get(ty)
                        .ok_or_else(|| Error::UnknownNodeType(ty.to_owned()))?;
                    let node = graph.add_node(name, t)?;
                    for assign in iter {
                        let (socket, text) = assign
                            .split_once('=')
                            .ok_or(Error::MissingArgument("input value"))?;
                        let (_, s) = graph.find_input(node, socket)?;
                        let v = Value::parse(s.typedesc, text)?;
                        graph.set_value(node, socket, v)?;
                    }
                }
                "link" => {
                    let from = arg("link source")?;
                    let to = arg("link target")?;
                    let (from, from_socket) = graph.socket_ref(from)?;
                    let (to, to_socket) = graph.socket_ref(to)?;
                    graph.link(from, from_socket, to, to_socket)?;
                }
                "input" | "output" => {
                    let name = arg("socket name")?;
                    let socket = arg("socket reference")?;
                    let (node, socket) = graph.socket_ref(socket)?;
                    if cmd == "input" {
                        graph.add_input(name, node, socket)?;
                    } else {
                        graph.add_output(name, node, socket)?;
                    }
                }
                c => return Err(Error::UnknownCommand(c.to_owned())),
            }
        }
        Ok(graph)
    }

    /// Splits a `node.socket` reference, looking up the node by name
    fn socket_ref<'a>(&self, s: &'a str) -> Result<(NodeId, &'a str), Error> {
        let (node, socket) = s
            .split_once('.')
            .ok_or_else(|| Error::BadSocketRef(s.to_owned()))?;
        let id = self
            .find_node(node)
            .ok_or_else(|| Error::UnknownNode(node.to_owned()))?;
        Ok((id, socket))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::SocketKey;

    fn parse(s: &str) -> Result<NodeGraph, Error> {
        NodeGraph::from_text(s.as_bytes(), &NodeLibrary::builtin())
    }

    #[test]
    fn test_from_text() {
        let g = parse(
            "# a comment
            node x VALUE_FLOAT value=1.5
            node y VALUE_FLOAT value=2
            node sum ADD_FLOAT
            link x.value sum.value_a
            link y.value sum.value_b

            output result sum.value
            ",
        )
        .unwrap();
        assert_eq!(g.len(), 3);
        let x = g.find_node("x").unwrap();
        let sum = g.find_node("sum").unwrap();
        assert_eq!(g[x].input_value(0), &Value::Float(1.5));
        assert_eq!(g[sum].input_link(0), Some(&SocketKey::new(x, "value")));
        assert_eq!(g.outputs().len(), 1);
        assert_eq!(g.outputs()[0].key, SocketKey::new(sum, "value"));
    }

    #[test]
    fn test_from_text_errors() {
        assert!(matches!(
            parse("frobnicate a b"),
            Err(Error::UnknownCommand(..))
        ));
        assert!(matches!(
            parse("node a NOT_A_TYPE"),
            Err(Error::UnknownNodeType(..))
        ));
        assert!(matches!(parse("node a"), Err(Error::MissingArgument(..))));
        assert!(matches!(
            parse("node a VALUE_FLOAT value=abc"),
            Err(Error::BadValue(..))
        ));
        assert!(matches!(
            parse("node a VALUE_FLOAT\noutput r a"),
            Err(Error::BadSocketRef(..))
        ));
        assert!(matches!(
            parse("node a VALUE_FLOAT\noutput r b.value"),
            Err(Error::UnknownNode(..))
        ));
    }
}

use crate::{
    bytecode::Opcode,
    types::{BaseType, TypeDesc, Value},
};

/// How an input socket receives its value
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum InputKind {
    /// Read from a stack slot, which is either linked or loaded from a literal
    Expression,
    /// Baked directly into the instruction stream; cannot be linked
    Constant,
    /// Deferred callable: the linked expression is compiled as a separate
    /// function body, and the node receives its entry point and return slot
    Function,
}

/// Descriptor for an input socket on a [`NodeType`]
#[derive(Clone, Debug, PartialEq)]
pub struct InputSocket {
    pub name: String,
    pub typedesc: TypeDesc,
    pub default_value: Value,
    pub kind: InputKind,
}

/// Descriptor for an output socket on a [`NodeType`]
#[derive(Clone, Debug, PartialEq)]
pub struct OutputSocket {
    pub name: String,
    pub typedesc: TypeDesc,
    pub default_value: Value,
}

/// Describes a type of node: its opcode, sockets, and classification
///
/// The opcode is resolved from the name once, when the type is built.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeType {
    name: String,
    opcode: Opcode,
    inputs: Vec<InputSocket>,
    outputs: Vec<OutputSocket>,
    kernel: bool,
    pass: bool,
}

impl NodeType {
    /// Builds a new node type with no sockets
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            opcode: Opcode::from_node_type(name),
            inputs: vec![],
            outputs: vec![],
            kernel: false,
            pass: false,
        }
    }

    fn with_input(mut self, name: &str, v: Value, kind: InputKind) -> Self {
        assert!(
            self.find_input(name).is_none(),
            "duplicate input socket '{name}' on '{}'",
            self.name
        );
        self.inputs.push(InputSocket {
            name: name.to_owned(),
            typedesc: v.type_desc(),
            default_value: v,
            kind,
        });
        self
    }

    /// Adds an input socket, whose type is given by its default value
    pub fn input<V: Into<Value>>(self, name: &str, default: V) -> Self {
        self.with_input(name, default.into(), InputKind::Expression)
    }

    /// Adds a constant input socket
    pub fn constant_input<V: Into<Value>>(self, name: &str, default: V) -> Self {
        self.with_input(name, default.into(), InputKind::Constant)
    }

    /// Adds a function-typed input socket
    ///
    /// The default value is returned by the function body when the socket is
    /// left unlinked.
    pub fn function_input<V: Into<Value>>(self, name: &str, default: V) -> Self {
        self.with_input(name, default.into(), InputKind::Function)
    }

    /// Adds an output socket
    pub fn output(mut self, name: &str, base_type: BaseType) -> Self {
        assert!(
            self.find_output(name).is_none(),
            "duplicate output socket '{name}' on '{}'",
            self.name
        );
        let typedesc = TypeDesc::new(base_type);
        self.outputs.push(OutputSocket {
            name: name.to_owned(),
            typedesc,
            default_value: Value::zero(typedesc),
        });
        self
    }

    /// Marks this as a kernel node, which bounds expression subgraphs
    pub fn kernel(mut self) -> Self {
        self.kernel = true;
        self
    }

    /// Marks this as a pass-through node, which emits no code
    pub fn pass(mut self) -> Self {
        self.pass = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn is_kernel_node(&self) -> bool {
        self.kernel
    }

    pub fn is_pass_node(&self) -> bool {
        self.pass
    }

    pub fn inputs(&self) -> &[InputSocket] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputSocket] {
        &self.outputs
    }

    /// Looks up an input socket by name, returning its index and descriptor
    pub fn find_input(&self, name: &str) -> Option<(usize, &InputSocket)> {
        self.inputs.iter().enumerate().find(|(_, s)| s.name == name)
    }

    /// Looks up an output socket by name, returning its index and descriptor
    pub fn find_output(&self, name: &str) -> Option<(usize, &OutputSocket)> {
        self.outputs.iter().enumerate().find(|(_, s)| s.name == name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_node_type() {
        let t = NodeType::new("ADD_FLOAT")
            .input("value_a", 0.0)
            .input("value_b", 0.0)
            .output("value", BaseType::Float);
        assert_eq!(t.opcode(), Opcode::AddFloat);
        assert_eq!(t.inputs().len(), 2);
        assert_eq!(t.find_input("value_b").unwrap().0, 1);
        assert!(t.find_input("value").is_none());
        let (i, out) = t.find_output("value").unwrap();
        assert_eq!(i, 0);
        assert_eq!(out.default_value, Value::Float(0.0));
        assert!(!t.is_kernel_node());
        assert!(!t.is_pass_node());
    }

    #[test]
    fn test_unknown_type() {
        let t = NodeType::new("SOMETHING_NEW").pass();
        assert_eq!(t.opcode(), Opcode::Noop);
        assert!(t.is_pass_node());
    }

    #[test]
    #[should_panic]
    fn test_duplicate_socket() {
        let _ = NodeType::new("ADD_FLOAT")
            .input("value", 0.0)
            .input("value", 1.0);
    }
}

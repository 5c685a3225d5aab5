//! Built-in node types
//!
//! [`NodeLibrary::builtin`] returns a fixed catalog of node descriptors, one
//! per lowered opcode plus pass-through nodes for every base type.  Each
//! node's sockets are listed in the order that the interpreter expects its
//! operands.
use crate::{
    graph::NodeType,
    types::{BaseType, PointerRef, Value},
};
use nalgebra::{Matrix4, Vector3, Vector4};
use std::{collections::BTreeMap, sync::Arc};

/// Name → node type table
#[derive(Clone, Debug, Default)]
pub struct NodeLibrary {
    types: BTreeMap<String, Arc<NodeType>>,
}

impl NodeLibrary {
    /// Builds an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node type, replacing any previous type with the same name
    pub fn insert(&mut self, t: NodeType) -> Arc<NodeType> {
        let t = Arc::new(t);
        self.types.insert(t.name().to_owned(), t.clone());
        t
    }

    /// Looks up a node type by name
    pub fn get(&self, name: &str) -> Option<Arc<NodeType>> {
        self.types.get(name).cloned()
    }

    /// Iterates over node types in name order
    pub fn iter(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values().map(|t| t.as_ref())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns the built-in node catalog
    pub fn builtin() -> Self {
        use BaseType::*;

        let zero3 = Vector3::<f32>::zeros();
        let zero4 = Vector4::<f32>::zeros();
        let identity = Matrix4::<f32>::identity();

        let mut lib = Self::new();
        let values: [(&str, BaseType, Value); 6] = [
            ("FLOAT", Float, 0.0.into()),
            ("FLOAT3", Float3, zero3.into()),
            ("FLOAT4", Float4, zero4.into()),
            ("INT", Int, 0.into()),
            ("MATRIX44", Matrix44, identity.into()),
            ("POINTER", Pointer, PointerRef::NULL.into()),
        ];
        for (suffix, ty, v) in values {
            lib.insert(
                NodeType::new(&format!("VALUE_{suffix}"))
                    .constant_input("value", v)
                    .output("value", ty),
            );
            lib.insert(
                NodeType::new(&format!("PASS_{suffix}"))
                    .input("value", v)
                    .output("value", ty)
                    .pass(),
            );
            if ty != Pointer {
                lib.insert(
                    NodeType::new(&format!("COPY_{suffix}"))
                        .input("value", v)
                        .output("value", ty),
                );
            }
        }
        lib.insert(NodeType::new("VALUE_MESH").output("mesh", Mesh));
        lib.insert(
            NodeType::new("PASS_MESH")
                .input("value", Value::Mesh)
                .output("value", Mesh)
                .pass(),
        );

        lib.insert(
            NodeType::new("FLOAT_TO_INT")
                .input("value", 0.0)
                .output("value", Int),
        );
        lib.insert(
            NodeType::new("INT_TO_FLOAT")
                .input("value", 0)
                .output("value", Float),
        );
        lib.insert(
            NodeType::new("SET_FLOAT3")
                .input("value_x", 0.0)
                .input("value_y", 0.0)
                .input("value_z", 0.0)
                .output("value", Float3),
        );
        lib.insert(
            NodeType::new("GET_ELEM_FLOAT3")
                .constant_input("index", 0)
                .input("value", zero3)
                .output("value", Float),
        );
        lib.insert(
            NodeType::new("SET_FLOAT4")
                .input("value_x", 0.0)
                .input("value_y", 0.0)
                .input("value_z", 0.0)
                .input("value_w", 0.0)
                .output("value", Float4),
        );
        lib.insert(
            NodeType::new("GET_ELEM_FLOAT4")
                .constant_input("index", 0)
                .input("value", zero4)
                .output("value", Float),
        );

        lib.insert(NodeType::new("POINT_POSITION").output("value", Float3));
        lib.insert(NodeType::new("POINT_VELOCITY").output("value", Float3));

        for name in [
            "ADD_FLOAT",
            "SUB_FLOAT",
            "MUL_FLOAT",
            "DIV_FLOAT",
            "POWER",
            "LOGARITHM",
            "MINIMUM",
            "MAXIMUM",
            "LESS_THAN",
            "GREATER_THAN",
            "MODULO",
        ] {
            lib.insert(
                NodeType::new(name)
                    .input("value_a", 0.0)
                    .input("value_b", 0.0)
                    .output("value", Float),
            );
        }
        for name in [
            "SINE",
            "COSINE",
            "TANGENT",
            "ARCSINE",
            "ARCCOSINE",
            "ARCTANGENT",
            "ROUND",
            "ABSOLUTE",
            "CLAMP",
            "SQRT",
        ] {
            lib.insert(
                NodeType::new(name)
                    .input("value", 0.0)
                    .output("value", Float),
            );
        }

        for name in ["ADD_FLOAT3", "SUB_FLOAT3", "MUL_FLOAT3", "DIV_FLOAT3"] {
            lib.insert(
                NodeType::new(name)
                    .input("value_a", zero3)
                    .input("value_b", zero3)
                    .output("value", Float3),
            );
        }
        lib.insert(
            NodeType::new("MUL_FLOAT3_FLOAT")
                .input("value_a", zero3)
                .input("value_b", 0.0)
                .output("value", Float3),
        );
        lib.insert(
            NodeType::new("AVERAGE_FLOAT3")
                .input("value_a", zero3)
                .input("value_b", zero3)
                .output("value", Float3),
        );
        lib.insert(
            NodeType::new("DOT_FLOAT3")
                .input("value_a", zero3)
                .input("value_b", zero3)
                .output("value", Float),
        );
        lib.insert(
            NodeType::new("CROSS_FLOAT3")
                .input("value_a", zero3)
                .input("value_b", zero3)
                .output("value", Float3),
        );
        lib.insert(
            NodeType::new("NORMALIZE_FLOAT3")
                .input("value", zero3)
                .output("vector", Float3)
                .output("value", Float),
        );

        lib.insert(
            NodeType::new("MIX_RGB")
                .constant_input("mode", 0)
                .input("factor", 0.0)
                .input("color1", zero4)
                .input("color2", zero4)
                .output("color", Float4),
        );
        lib.insert(
            NodeType::new("INT_TO_RANDOM")
                .constant_input("seed", 0)
                .input("value", 0)
                .output("irandom", Int)
                .output("frandom", Float),
        );
        lib.insert(
            NodeType::new("FLOAT_TO_RANDOM")
                .constant_input("seed", 0)
                .input("value", 0.0)
                .output("irandom", Int)
                .output("frandom", Float),
        );

        lib.insert(
            NodeType::new("MUL_MATRIX44")
                .input("value_a", identity)
                .input("value_b", identity)
                .output("value", Matrix44),
        );
        lib.insert(
            NodeType::new("MUL_MATRIX44_FLOAT3")
                .input("value_a", identity)
                .input("value_b", zero3)
                .output("value", Float3),
        );

        lib.insert(
            NodeType::new("MESH_LOAD")
                .input("base_mesh", PointerRef::NULL)
                .output("mesh", Mesh),
        );
        lib.insert(
            NodeType::new("MESH_COMBINE")
                .input("mesh_a", Value::Mesh)
                .input("mesh_b", Value::Mesh)
                .output("mesh_out", Mesh),
        );
        lib.insert(
            NodeType::new("MESH_ARRAY")
                .input("mesh_in", Value::Mesh)
                .input("count", 1)
                .function_input("transform", identity)
                .output("mesh_out", Mesh)
                .output("iteration", Int)
                .kernel(),
        );
        lib.insert(
            NodeType::new("MESH_DISPLACE")
                .input("mesh_in", Value::Mesh)
                .function_input("vector", zero3)
                .output("mesh_out", Mesh)
                .output("element.location", Float3)
                .kernel(),
        );
        lib
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bytecode::Opcode;

    #[test]
    fn test_builtin_opcodes() {
        let lib = NodeLibrary::builtin();
        for t in lib.iter() {
            // Everything except pass nodes must lower to a real opcode
            assert_eq!(
                t.is_pass_node(),
                t.opcode() == Opcode::Noop,
                "bad opcode for {}",
                t.name()
            );
        }
        assert!(lib.get("MESH_ARRAY").unwrap().is_kernel_node());
        assert!(!lib.get("ADD_FLOAT").unwrap().is_kernel_node());
        assert!(lib.get("NOT_A_NODE").is_none());
    }

    #[test]
    fn test_value_nodes() {
        let lib = NodeLibrary::builtin();
        let t = lib.get("VALUE_FLOAT3").unwrap();
        assert_eq!(t.opcode(), Opcode::ValueFloat3);
        assert_eq!(t.inputs().len(), 1);
        assert!(t.find_output("value").is_some());
    }
}

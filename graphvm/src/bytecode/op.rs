/// Operations understood by the stack-machine interpreter
///
/// Each opcode is stored as a single `u32` word (its discriminant), followed by
/// a fixed, opcode-determined sequence of operand words.  For node opcodes,
/// the operands are the node's inputs (constant payloads, function references,
/// or stack slots) in declaration order, then its output slots.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    strum::EnumIter,
    strum::IntoStaticStr,
    strum::FromRepr,
)]
#[repr(u32)]
pub enum Opcode {
    /// Does nothing; never emitted into a stream
    Noop = 0,

    /// Writes a `float` literal: `value, out`
    ValueFloat,
    /// Writes a `float3` literal: `x, y, z, out`
    ValueFloat3,
    /// Writes a `float4` literal: `x, y, z, w, out`
    ValueFloat4,
    /// Writes an `int` literal: `value, out`
    ValueInt,
    /// Writes a 4x4 matrix literal: 16 column-major words, then `out`
    ValueMatrix44,
    /// Writes a pointer bundle: six hi/lo words, then `out`
    ValuePointer,
    /// Creates an empty mesh: `out`
    ValueMesh,

    CopyFloat,
    CopyFloat3,
    CopyFloat4,
    CopyInt,
    CopyMatrix44,

    FloatToInt,
    IntToFloat,
    SetFloat3,
    GetElemFloat3,
    SetFloat4,
    GetElemFloat4,

    /// Initializes a mesh slot with a retainer count: `slot, count`
    InitMeshPtr,
    /// Drops one retainer from a mesh slot: `slot`
    ReleaseMeshPtr,

    PointPosition,
    PointVelocity,

    AddFloat,
    SubFloat,
    MulFloat,
    DivFloat,
    Sine,
    Cosine,
    Tangent,
    Arcsine,
    Arccosine,
    Arctangent,
    Power,
    Logarithm,
    Minimum,
    Maximum,
    Round,
    LessThan,
    GreaterThan,
    Modulo,
    Absolute,
    Clamp,
    Sqrt,

    AddFloat3,
    SubFloat3,
    MulFloat3,
    DivFloat3,
    MulFloat3Float,
    AverageFloat3,
    DotFloat3,
    CrossFloat3,
    NormalizeFloat3,

    MixRgb,
    IntToRandom,
    FloatToRandom,

    MulMatrix44,
    MulMatrix44Float3,

    MeshLoad,
    MeshCombine,
    MeshArray,
    MeshDisplace,

    /// Marks the end of a subgraph; returns to the caller
    End,
}

impl Opcode {
    /// Looks up the opcode that implements a node type
    ///
    /// This is a static table keyed by node type name.  Names without a
    /// lowering (including pass-through nodes) map to [`Opcode::Noop`], which
    /// causes the node to be skipped during code generation.
    pub fn from_node_type(name: &str) -> Self {
        match name {
            "VALUE_FLOAT" => Opcode::ValueFloat,
            "VALUE_FLOAT3" => Opcode::ValueFloat3,
            "VALUE_FLOAT4" => Opcode::ValueFloat4,
            "VALUE_INT" => Opcode::ValueInt,
            "VALUE_MATRIX44" => Opcode::ValueMatrix44,
            "VALUE_POINTER" => Opcode::ValuePointer,
            "VALUE_MESH" => Opcode::ValueMesh,

            "COPY_FLOAT" => Opcode::CopyFloat,
            "COPY_FLOAT3" => Opcode::CopyFloat3,
            "COPY_FLOAT4" => Opcode::CopyFloat4,
            "COPY_INT" => Opcode::CopyInt,
            "COPY_MATRIX44" => Opcode::CopyMatrix44,

            "FLOAT_TO_INT" => Opcode::FloatToInt,
            "INT_TO_FLOAT" => Opcode::IntToFloat,
            "SET_FLOAT3" => Opcode::SetFloat3,
            "GET_ELEM_FLOAT3" => Opcode::GetElemFloat3,
            "SET_FLOAT4" => Opcode::SetFloat4,
            "GET_ELEM_FLOAT4" => Opcode::GetElemFloat4,

            "POINT_POSITION" => Opcode::PointPosition,
            "POINT_VELOCITY" => Opcode::PointVelocity,

            "ADD_FLOAT" => Opcode::AddFloat,
            "SUB_FLOAT" => Opcode::SubFloat,
            "MUL_FLOAT" => Opcode::MulFloat,
            "DIV_FLOAT" => Opcode::DivFloat,
            "SINE" => Opcode::Sine,
            "COSINE" => Opcode::Cosine,
            "TANGENT" => Opcode::Tangent,
            "ARCSINE" => Opcode::Arcsine,
            "ARCCOSINE" => Opcode::Arccosine,
            "ARCTANGENT" => Opcode::Arctangent,
            "POWER" => Opcode::Power,
            "LOGARITHM" => Opcode::Logarithm,
            "MINIMUM" => Opcode::Minimum,
            "MAXIMUM" => Opcode::Maximum,
            "ROUND" => Opcode::Round,
            "LESS_THAN" => Opcode::LessThan,
            "GREATER_THAN" => Opcode::GreaterThan,
            "MODULO" => Opcode::Modulo,
            "ABSOLUTE" => Opcode::Absolute,
            "CLAMP" => Opcode::Clamp,
            "SQRT" => Opcode::Sqrt,

            "ADD_FLOAT3" => Opcode::AddFloat3,
            "SUB_FLOAT3" => Opcode::SubFloat3,
            "MUL_FLOAT3" => Opcode::MulFloat3,
            "DIV_FLOAT3" => Opcode::DivFloat3,
            "MUL_FLOAT3_FLOAT" => Opcode::MulFloat3Float,
            "AVERAGE_FLOAT3" => Opcode::AverageFloat3,
            "DOT_FLOAT3" => Opcode::DotFloat3,
            "CROSS_FLOAT3" => Opcode::CrossFloat3,
            "NORMALIZE_FLOAT3" => Opcode::NormalizeFloat3,

            "MIX_RGB" => Opcode::MixRgb,
            "INT_TO_RANDOM" => Opcode::IntToRandom,
            "FLOAT_TO_RANDOM" => Opcode::FloatToRandom,

            "MUL_MATRIX44" => Opcode::MulMatrix44,
            "MUL_MATRIX44_FLOAT3" => Opcode::MulMatrix44Float3,

            "MESH_LOAD" => Opcode::MeshLoad,
            "MESH_COMBINE" => Opcode::MeshCombine,
            "MESH_ARRAY" => Opcode::MeshArray,
            "MESH_DISPLACE" => Opcode::MeshDisplace,

            _ => Opcode::Noop,
        }
    }

    /// Decodes an opcode word
    pub fn from_word(w: u32) -> Option<Self> {
        Self::from_repr(w)
    }

    /// Returns the word used to encode this opcode
    pub fn to_word(self) -> u32 {
        self as u32
    }

    /// Returns the opcode name in `CamelCase`
    pub fn name(self) -> &'static str {
        self.into()
    }
}

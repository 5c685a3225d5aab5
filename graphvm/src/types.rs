//! Value types carried on sockets and stored on the VM stack
use crate::{Error, bytecode::Opcode};

use nalgebra::{Matrix4, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Base kind of a value
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum BaseType {
    Float,
    Float3,
    Float4,
    Int,
    Matrix44,
    /// Opaque bundle of three handles (identifier, type, data)
    Pointer,
    /// Reference-counted mesh, owned by the VM
    Mesh,
}

/// Describes the type of a socket, and how much stack it occupies
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct TypeDesc {
    pub base_type: BaseType,
}

impl From<BaseType> for TypeDesc {
    fn from(base_type: BaseType) -> Self {
        Self { base_type }
    }
}

impl std::fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base_type)
    }
}

impl TypeDesc {
    /// Builds a new type descriptor
    pub const fn new(base_type: BaseType) -> Self {
        Self { base_type }
    }

    /// Number of stack slots (32-bit words) occupied by a value of this type
    pub const fn stack_size(&self) -> usize {
        match self.base_type {
            BaseType::Float | BaseType::Int => 1,
            BaseType::Float3 => 3,
            BaseType::Float4 => 4,
            BaseType::Matrix44 => 16,
            BaseType::Pointer => 6,
            BaseType::Mesh => 2,
        }
    }

    /// Checks whether values of this type need explicit lifetime management
    ///
    /// Everything except meshes is trivially copyable on the stack.
    pub const fn is_managed(&self) -> bool {
        matches!(self.base_type, BaseType::Mesh)
    }

    /// Opcode used to initialize a managed value with a retainer count
    pub fn init_opcode(&self) -> Option<Opcode> {
        match self.base_type {
            BaseType::Mesh => Some(Opcode::InitMeshPtr),
            _ => None,
        }
    }

    /// Opcode used to release one retainer of a managed value
    pub fn release_opcode(&self) -> Option<Opcode> {
        match self.base_type {
            BaseType::Mesh => Some(Opcode::ReleaseMeshPtr),
            _ => None,
        }
    }

    /// Opcode which loads a literal of this type onto the stack
    pub fn value_opcode(&self) -> Opcode {
        match self.base_type {
            BaseType::Float => Opcode::ValueFloat,
            BaseType::Float3 => Opcode::ValueFloat3,
            BaseType::Float4 => Opcode::ValueFloat4,
            BaseType::Int => Opcode::ValueInt,
            BaseType::Matrix44 => Opcode::ValueMatrix44,
            BaseType::Pointer => Opcode::ValuePointer,
            BaseType::Mesh => Opcode::ValueMesh,
        }
    }
}

/// Handle bundle referring to data owned by the host application
///
/// The compiler never dereferences these; they are copied into the
/// instruction stream verbatim.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
pub struct PointerRef {
    pub id: u64,
    pub ty: u64,
    pub data: u64,
}

impl PointerRef {
    /// A pointer bundle with all handles zeroed
    pub const NULL: Self = Self {
        id: 0,
        ty: 0,
        data: 0,
    };
}

/// A literal value
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Float(f32),
    Float3(Vector3<f32>),
    Float4(Vector4<f32>),
    Int(i32),
    Matrix44(Matrix4<f32>),
    Pointer(PointerRef),
    /// An empty mesh; meshes have no literal payload
    Mesh,
}

impl Value {
    /// Returns the type of this value
    pub fn type_desc(&self) -> TypeDesc {
        let b = match self {
            Value::Float(..) => BaseType::Float,
            Value::Float3(..) => BaseType::Float3,
            Value::Float4(..) => BaseType::Float4,
            Value::Int(..) => BaseType::Int,
            Value::Matrix44(..) => BaseType::Matrix44,
            Value::Pointer(..) => BaseType::Pointer,
            Value::Mesh => BaseType::Mesh,
        };
        TypeDesc::new(b)
    }

    /// Returns the zero value for the given type
    ///
    /// Matrices default to the identity rather than all zeros.
    pub fn zero(ty: TypeDesc) -> Self {
        match ty.base_type {
            BaseType::Float => Value::Float(0.0),
            BaseType::Float3 => Value::Float3(Vector3::zeros()),
            BaseType::Float4 => Value::Float4(Vector4::zeros()),
            BaseType::Int => Value::Int(0),
            BaseType::Matrix44 => Value::Matrix44(Matrix4::identity()),
            BaseType::Pointer => Value::Pointer(PointerRef::NULL),
            BaseType::Mesh => Value::Mesh,
        }
    }

    /// Parses a literal of the given type
    ///
    /// Vector and matrix components are comma-separated (matrices in
    /// column-major order); `identity` is accepted for matrices, and `null`
    /// or `id,type,data` for pointers.
    pub fn parse(ty: TypeDesc, s: &str) -> Result<Self, Error> {
        let bad = || Error::BadValue(ty, s.to_owned());
        let floats = |n: usize| -> Result<Vec<f32>, Error> {
            let v = s
                .split(',')
                .map(|c| c.trim().parse::<f32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| bad())?;
            if v.len() == n { Ok(v) } else { Err(bad()) }
        };
        let v = match ty.base_type {
            BaseType::Float => Value::Float(s.parse().map_err(|_| bad())?),
            BaseType::Int => Value::Int(s.parse().map_err(|_| bad())?),
            BaseType::Float3 => Value::Float3(Vector3::from_vec(floats(3)?)),
            BaseType::Float4 => Value::Float4(Vector4::from_vec(floats(4)?)),
            BaseType::Matrix44 if s == "identity" => {
                Value::Matrix44(Matrix4::identity())
            }
            BaseType::Matrix44 => {
                Value::Matrix44(Matrix4::from_column_slice(&floats(16)?))
            }
            BaseType::Pointer if s == "null" => Value::Pointer(PointerRef::NULL),
            BaseType::Pointer => {
                let parts = s
                    .split(',')
                    .map(|c| {
                        let c = c.trim();
                        match c.strip_prefix("0x") {
                            Some(hex) => u64::from_str_radix(hex, 16),
                            None => c.parse(),
                        }
                    })
                    .collect::<Result<Vec<u64>, _>>()
                    .map_err(|_| bad())?;
                let [id, ty, data] = parts[..] else {
                    return Err(bad());
                };
                Value::Pointer(PointerRef { id, ty, data })
            }
            BaseType::Mesh if s == "empty" => Value::Mesh,
            BaseType::Mesh => return Err(bad()),
        };
        Ok(v)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f as f32)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<Vector3<f32>> for Value {
    fn from(v: Vector3<f32>) -> Self {
        Value::Float3(v)
    }
}

impl From<Vector4<f32>> for Value {
    fn from(v: Vector4<f32>) -> Self {
        Value::Float4(v)
    }
}

impl From<Matrix4<f32>> for Value {
    fn from(m: Matrix4<f32>) -> Self {
        Value::Matrix44(m)
    }
}

impl From<PointerRef> for Value {
    fn from(p: PointerRef) -> Self {
        Value::Pointer(p)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stack_sizes() {
        use strum::IntoEnumIterator;
        for b in BaseType::iter() {
            let ty = TypeDesc::new(b);
            assert!(ty.stack_size() > 0);
            assert_eq!(ty.is_managed(), ty.init_opcode().is_some());
            assert_eq!(ty.is_managed(), ty.release_opcode().is_some());
            assert_eq!(Value::zero(ty).type_desc(), ty);
        }
    }

    #[test]
    fn test_parse() {
        let f = TypeDesc::new(BaseType::Float);
        assert_eq!(Value::parse(f, "3.5").unwrap(), Value::Float(3.5));
        assert!(Value::parse(f, "three").is_err());

        let v = TypeDesc::new(BaseType::Float3);
        assert_eq!(
            Value::parse(v, "1, 2,3").unwrap(),
            Value::Float3(Vector3::new(1.0, 2.0, 3.0))
        );
        assert!(Value::parse(v, "1,2").is_err());

        let m = TypeDesc::new(BaseType::Matrix44);
        assert_eq!(
            Value::parse(m, "identity").unwrap(),
            Value::Matrix44(Matrix4::identity())
        );

        let p = TypeDesc::new(BaseType::Pointer);
        assert_eq!(
            Value::parse(p, "0x10,2,0xff").unwrap(),
            Value::Pointer(PointerRef {
                id: 16,
                ty: 2,
                data: 255
            })
        );
        assert!(Value::parse(p, "1,2").is_err());

        let mesh = TypeDesc::new(BaseType::Mesh);
        assert_eq!(Value::parse(mesh, "empty").unwrap(), Value::Mesh);
        assert!(Value::parse(mesh, "1.0").is_err());
    }
}

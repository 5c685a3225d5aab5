//! Function bytecode format
//!
//! A compiled [`Function`] is a flat list of `u32` words, consumed by a
//! stack-machine interpreter.  The format is **not stable**; users are
//! recommended to generate their interpreter's opcode constants with
//! [`iter_ops`], which associates opcode integers with their names.
//!
//! Each instruction is one opcode word followed by a fixed,
//! opcode-determined number of operand words:
//!
//! | Operand            | Encoding                                        |
//! |--------------------|-------------------------------------------------|
//! | `float`            | one word, the `f32` reinterpreted as a `u32`     |
//! | `int`              | one word, the `i32` reinterpreted as a `u32`     |
//! | `float3`, `float4` | one `float` word per component                  |
//! | 4x4 matrix         | 16 `float` words, column-major                  |
//! | pointer bundle     | six words: `id`, `type`, `data`, each as hi, lo |
//! | jump address       | one word, an absolute word offset               |
//! | stack slot         | one word, omitted if the slot is invalid        |
//!
//! Omitting invalid slots means that a function compiled after stack
//! exhaustion is not decodable by the interpreter; check
//! [`Function::stack_exhausted`] before using it.
//!
//! Function-typed inputs are encoded as a `(jump address, return slot)` pair:
//! the interpreter jumps to the address, runs until [`Opcode::End`], then
//! reads the result from the return slot.
mod op;
pub use op::Opcode;

use crate::{compiler::StackIndex, types::PointerRef, types::TypeDesc, Value};

use nalgebra::{Matrix4, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use zerocopy::IntoBytes;

/// A single instruction word
pub type Instruction = u32;

/// Named result of a [`Function`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnValue {
    pub typedesc: TypeDesc,
    pub name: String,
    pub stack_offset: StackIndex,
}

/// Compiled bytecode, with its entry point and return bindings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Function {
    instructions: Vec<Instruction>,
    entry_point: usize,
    return_values: Vec<ReturnValue>,

    /// Offset of every opcode word in `instructions`, in emission order
    opcodes: Vec<usize>,

    /// Set if any stack allocation failed while building this function
    stack_exhausted: bool,
}

impl Function {
    /// Builds a new empty function
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw instruction stream
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns the number of words in the instruction stream
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Checks whether the instruction stream is empty
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns a view of the instruction stream as (native-endian) bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.instructions.as_bytes()
    }

    /// Word offset at which evaluation of the main subgraph begins
    pub fn entry_point(&self) -> usize {
        self.entry_point
    }

    /// Returns the list of return bindings, in graph output order
    pub fn return_values(&self) -> &[ReturnValue] {
        &self.return_values
    }

    /// Looks up a return binding by name
    pub fn return_value(&self, name: &str) -> Option<&ReturnValue> {
        self.return_values.iter().find(|r| r.name == name)
    }

    /// Checks whether the stack overflowed during compilation
    ///
    /// If this is `true`, some slot operands were dropped from the stream and
    /// the function must not be evaluated.
    pub fn stack_exhausted(&self) -> bool {
        self.stack_exhausted
    }

    /// Iterates over `(offset, opcode)` pairs in stream order
    pub fn iter_opcodes(&self) -> impl Iterator<Item = (usize, Opcode)> + '_ {
        self.opcodes.iter().filter_map(|&i| {
            Opcode::from_word(self.instructions[i]).map(|op| (i, op))
        })
    }

    /// Returns a human-readable listing of the instruction stream
    ///
    /// Each line shows the word offset, the opcode, and its operand words (in
    /// hex); the entry point is marked with `>`.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let ops: Vec<_> = self.iter_opcodes().collect();
        for (n, &(i, op)) in ops.iter().enumerate() {
            let end = ops.get(n + 1).map(|o| o.0).unwrap_or(self.len());
            let mark = if i == self.entry_point { '>' } else { ' ' };
            write!(out, "{mark}{i:>5}  {:<18}", op.name()).unwrap();
            for w in &self.instructions[i + 1..end] {
                write!(out, " {w:#x}").unwrap();
            }
            out.push('\n');
        }
        out
    }

    pub(crate) fn set_entry_point(&mut self, entry_point: usize) {
        self.entry_point = entry_point;
    }

    pub(crate) fn add_return_value(
        &mut self,
        typedesc: TypeDesc,
        name: &str,
        stack_offset: StackIndex,
    ) {
        self.return_values.push(ReturnValue {
            typedesc,
            name: name.to_owned(),
            stack_offset,
        });
    }

    pub(crate) fn set_stack_exhausted(&mut self) {
        self.stack_exhausted = true;
    }

    ////////////////////////////////////////////////////////////////////////////
    // Emitter

    fn add_instruction(&mut self, w: Instruction) {
        self.instructions.push(w);
    }

    pub(crate) fn push_opcode(&mut self, op: Opcode) {
        debug_assert_ne!(op, Opcode::Noop);
        self.opcodes.push(self.instructions.len());
        self.add_instruction(op.to_word());
    }

    /// Pushes a slot operand, skipping it entirely if it is invalid
    pub(crate) fn push_stack_index(&mut self, i: StackIndex) {
        if i.is_valid() {
            self.add_instruction(i.get());
        }
    }

    pub(crate) fn push_jump_address(&mut self, address: usize) {
        self.add_instruction(address as u32);
    }

    pub(crate) fn push_float(&mut self, f: f32) {
        self.add_instruction(f.to_bits());
    }

    pub(crate) fn push_float3(&mut self, v: &Vector3<f32>) {
        for &f in v.iter() {
            self.push_float(f);
        }
    }

    pub(crate) fn push_float4(&mut self, v: &Vector4<f32>) {
        for &f in v.iter() {
            self.push_float(f);
        }
    }

    pub(crate) fn push_int(&mut self, i: i32) {
        self.add_instruction(i as u32);
    }

    pub(crate) fn push_matrix44(&mut self, m: &Matrix4<f32>) {
        // nalgebra storage is column-major
        for &f in m.as_slice() {
            self.push_float(f);
        }
    }

    pub(crate) fn push_pointer(&mut self, p: &PointerRef) {
        for h in [p.id, p.ty, p.data] {
            self.add_instruction((h >> 32) as u32);
            self.add_instruction(h as u32);
        }
    }

    /// Pushes the raw payload of a literal (without an opcode or slot)
    ///
    /// Meshes have no payload, so nothing is written for them.
    pub(crate) fn push_constant(&mut self, v: &Value) {
        match v {
            Value::Float(f) => self.push_float(*f),
            Value::Float3(v) => self.push_float3(v),
            Value::Float4(v) => self.push_float4(v),
            Value::Int(i) => self.push_int(*i),
            Value::Matrix44(m) => self.push_matrix44(m),
            Value::Pointer(p) => self.push_pointer(p),
            Value::Mesh => (),
        }
    }
}

impl<'a> IntoIterator for &'a Function {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;
    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

/// Iterates over opcode `(names, value)` tuples, with names in `CamelCase`
///
/// This is a helper function for defining constants in a VM interpreter
pub fn iter_ops<'a>() -> impl Iterator<Item = (&'a str, u32)> {
    use strum::IntoEnumIterator;

    Opcode::iter().map(|op| (op.name(), op.to_word()))
}

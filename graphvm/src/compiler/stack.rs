use crate::types::TypeDesc;
use serde::{Deserialize, Serialize};

/// Capacity of the VM stack, in 32-bit slots
pub const STACK_SIZE: usize = 255;

static_assertions::const_assert!(STACK_SIZE < u32::MAX as usize);

/// Offset into the VM stack
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct StackIndex(u32);

impl StackIndex {
    /// Sentinel for "no slot"; never written into an instruction stream
    pub const INVALID: Self = Self(u32::MAX);

    /// Builds a new stack index
    pub const fn new(i: u32) -> Self {
        Self(i)
    }

    /// Returns the raw slot offset
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Checks whether this is a real slot (i.e. not [`StackIndex::INVALID`])
    pub const fn is_valid(&self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl Default for StackIndex {
    fn default() -> Self {
        Self::INVALID
    }
}

impl std::fmt::Display for StackIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "${}", self.0)
        } else {
            write!(f, "$INVALID")
        }
    }
}

/// First-fit allocator over a fixed-size stack
///
/// Each slot has a usage counter; a slot is free while its counter is zero.
///
/// Slots are never released: every assignment claims fresh slots, so a
/// compiled function occupies a single monotonically filled region.  Values
/// with managed lifetimes are tracked separately, through retainer counts
/// emitted into the bytecode, and the allocator never reuses their slots.
pub struct StackAllocator<const N: usize = STACK_SIZE> {
    users: [u32; N],

    /// Set after the first failed allocation
    exhausted: bool,
}

impl StackAllocator {
    /// Builds an allocator with the default [`STACK_SIZE`] capacity
    pub fn new() -> Self {
        Self::default()
    }
}

impl<const N: usize> Default for StackAllocator<N> {
    fn default() -> Self {
        Self {
            users: [0; N],
            exhausted: false,
        }
    }
}

impl<const N: usize> StackAllocator<N> {
    /// Clears all usage counters
    pub fn reset(&mut self) {
        self.users.fill(0);
        self.exhausted = false;
    }

    /// Returns the stack capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Checks whether any allocation has failed since the last reset
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Returns the usage counter of the given slot
    pub fn users(&self, i: StackIndex) -> u32 {
        self.users.get(i.get() as usize).copied().unwrap_or(0)
    }

    /// Finds the first run of `size` free slots
    ///
    /// Returns [`StackIndex::INVALID`] (after logging an error) if there is
    /// no such run.
    pub fn find(&self, size: usize) -> StackIndex {
        debug_assert!(size > 0);
        let mut unused = 0;
        for (i, &u) in self.users.iter().enumerate() {
            if u == 0 {
                unused += 1;
                if unused == size {
                    return StackIndex::new((i + 1 - size) as u32);
                }
            } else {
                unused = 0;
            }
        }
        log::error!(
            "out of stack space: no run of {size} free slots \
             (capacity {N})"
        );
        StackIndex::INVALID
    }

    /// Claims slots for a value of the given type
    ///
    /// On failure, no counters are modified and [`StackIndex::INVALID`] is
    /// returned.
    pub fn assign(&mut self, ty: TypeDesc) -> StackIndex {
        let size = ty.stack_size();
        let offset = self.find(size);
        if !offset.is_valid() {
            self.exhausted = true;
            return offset;
        }
        let start = offset.get() as usize;
        for u in &mut self.users[start..start + size] {
            *u += 1;
        }
        offset
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::BaseType;

    const FLOAT: TypeDesc = TypeDesc::new(BaseType::Float);
    const FLOAT3: TypeDesc = TypeDesc::new(BaseType::Float3);
    const MATRIX: TypeDesc = TypeDesc::new(BaseType::Matrix44);

    #[test]
    fn test_first_fit() {
        let mut s = StackAllocator::new();
        assert_eq!(s.capacity(), STACK_SIZE);
        assert_eq!(s.find(1), StackIndex::new(0));
        assert_eq!(s.assign(FLOAT), StackIndex::new(0));
        assert_eq!(s.assign(FLOAT3), StackIndex::new(1));
        assert_eq!(s.assign(FLOAT), StackIndex::new(4));
        assert_eq!(s.users(StackIndex::new(2)), 1);
        assert_eq!(s.users(StackIndex::new(5)), 0);
        assert!(!s.is_exhausted());
    }

    #[test]
    fn test_no_reuse() {
        let mut s: StackAllocator<8> = StackAllocator::default();
        let a = s.assign(FLOAT);
        let b = s.assign(FLOAT);
        assert_ne!(a, b);
        assert_eq!(b, StackIndex::new(1));
    }

    #[test]
    fn test_exhaustion() {
        let mut s: StackAllocator<8> = StackAllocator::default();
        assert_eq!(s.assign(FLOAT3), StackIndex::new(0));
        assert_eq!(s.assign(FLOAT3), StackIndex::new(3));
        assert!(!s.is_exhausted());

        // Only two slots remain, so this must fail without touching them
        assert_eq!(s.assign(FLOAT3), StackIndex::INVALID);
        assert!(s.is_exhausted());
        assert_eq!(s.users(StackIndex::new(6)), 0);
        assert_eq!(s.users(StackIndex::new(7)), 0);

        // Smaller values still fit in the tail
        assert_eq!(s.assign(FLOAT), StackIndex::new(6));
        assert_eq!(s.assign(MATRIX), StackIndex::INVALID);

        s.reset();
        assert!(!s.is_exhausted());
        assert_eq!(s.assign(FLOAT3), StackIndex::new(0));
    }

    #[test]
    fn test_too_large() {
        let s: StackAllocator<4> = StackAllocator::default();
        assert_eq!(s.find(16), StackIndex::INVALID);
        assert_eq!(s.find(4), StackIndex::new(0));
    }

    #[test]
    fn test_stack_index() {
        assert!(!StackIndex::INVALID.is_valid());
        assert!(StackIndex::new(0).is_valid());
        assert_eq!(StackIndex::default(), StackIndex::INVALID);
        assert_eq!(format!("{}", StackIndex::new(3)), "$3");
    }
}

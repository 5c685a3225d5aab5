//! Container types with strongly-typed indexes.

pub(crate) trait Index {
    fn new(i: usize) -> Self;
    fn get(&self) -> usize;
}

/// A `Vec<V>` with strongly-typed indexes, used to improve the type-safety
/// of node storage.
///
/// Entries are never removed, so an index stays valid for the lifetime of the
/// container that produced it.  A suitable index type can be constructed with
/// [define_index].
#[derive(Clone, Debug)]
pub(crate) struct IndexVec<V, I> {
    data: Vec<V>,
    _phantom: std::marker::PhantomData<fn() -> I>,
}

impl<V, I> Default for IndexVec<V, I> {
    fn default() -> Self {
        Self {
            data: vec![],
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<V, I: Index> IndexVec<V, I> {
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn get(&self, i: I) -> Option<&V> {
        self.data.get(i.get())
    }
    pub fn get_mut(&mut self, i: I) -> Option<&mut V> {
        self.data.get_mut(i.get())
    }
    /// Appends a value, returning its index
    pub fn push(&mut self, v: V) -> I {
        let i = I::new(self.data.len());
        self.data.push(v);
        i
    }
    /// Iterates over `(index, value)` pairs in insertion order
    pub fn enumerate(&self) -> impl Iterator<Item = (I, &V)> {
        self.data.iter().enumerate().map(|(i, v)| (I::new(i), v))
    }
}

impl<V, I> std::ops::Index<I> for IndexVec<V, I>
where
    I: Index,
{
    type Output = V;
    fn index(&self, i: I) -> &V {
        &self.data[i.get()]
    }
}

impl<V, I> std::ops::IndexMut<I> for IndexVec<V, I>
where
    I: Index,
{
    fn index_mut(&mut self, i: I) -> &mut V {
        &mut self.data[i.get()]
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Defines an index type suitable for use in an [`IndexVec`].
macro_rules! define_index {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Copy,
            Clone,
            Default,
            Debug,
            Eq,
            PartialEq,
            Hash,
            Ord,
            PartialOrd,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(usize);
        impl crate::graph::indexed::Index for $name {
            fn new(i: usize) -> Self {
                Self(i)
            }
            fn get(&self) -> usize {
                self.0
            }
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}
pub(crate) use define_index;

#[cfg(test)]
mod test {
    use super::*;

    define_index!(TestIndex, "Index used in unit tests");

    #[test]
    fn test_index_vec() {
        let mut v: IndexVec<&str, TestIndex> = IndexVec::default();
        assert!(v.is_empty());
        let a = v.push("a");
        let b = v.push("b");
        assert_ne!(a, b);
        assert_eq!(v[a], "a");
        assert_eq!(v.get(b), Some(&"b"));
        assert_eq!(v.len(), 2);
        v[a] = "c";
        assert_eq!(v.enumerate().next(), Some((a, &"c")));
        assert_eq!(v.get(TestIndex::new(5)), None);
    }
}

/*!
Arena indices for the vertices and edges of a
[`Genealogy`](crate::genealogy::Genealogy).

An index is only meaningful for the genealogy that produced it. The
external label of a vertex is separate from its index and may change
over the lifetime of the graph.
*/

/// Newtype that represents a vertex in the arena of a genealogy
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VertexIx(pub u32);

/// Newtype that represents an edge in the arena of a genealogy
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EdgeIx(pub u32);

macro_rules! impl_arena_index {
    ($ix:ident) => {
        impl $ix {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $ix {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<usize> for $ix {
            #[inline]
            fn from(num: usize) -> Self {
                $ix(num as u32)
            }
        }

        impl From<$ix> for usize {
            #[inline]
            fn from(ix: $ix) -> Self {
                ix.0 as usize
            }
        }
    };
}

impl_arena_index!(VertexIx);
impl_arena_index!(EdgeIx);

//! N-dimensional coordinates tagged by coordinate space.
//!
//! The same list of integers means different things depending on the space it
//! lives in: a position in the whole array, in one part, in the chunk grid, or
//! inside one chunk. [`NdCoord`] carries the space as a type parameter so that
//! those cannot be mixed up; [`Region`] is a half-open box in one space.

use std::fmt;
use std::marker::PhantomData;

/// Coordinate space markers.
pub mod space {
    /// A coordinate space.
    pub trait Space {
        const NAME: &'static str;
    }

    macro_rules! define_space {
        ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
            $(
                $(#[$meta])*
                #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
                pub struct $name;

                impl Space for $name {
                    const NAME: &'static str = stringify!($name);
                }
            )*
        };
    }

    define_space!(
        /// Positions in the full array.
        Global,
        /// Positions within one part.
        Part,
        /// Positions in the chunk grid.
        Chunk,
        /// Positions within one chunk.
        Local,
        /// Dimensional extents.
        Shape,
        /// Displacements.
        Offset,
        /// Positions relative to a reference region.
        Region,
    );
}

use space::Space;

/// An N-dimensional coordinate in space `S`.
pub struct NdCoord<S> {
    data: Vec<i64>,
    _space: PhantomData<S>,
}

pub type GlobalIndex = NdCoord<space::Global>;
pub type PartIndex = NdCoord<space::Part>;
pub type ChunkIndex = NdCoord<space::Chunk>;
pub type LocalIndex = NdCoord<space::Local>;
pub type RegionIndex = NdCoord<space::Region>;
pub type Shape = NdCoord<space::Shape>;
pub type Offset = NdCoord<space::Offset>;

impl<S> NdCoord<S> {
    /// Zero coordinate with `ndim` dimensions.
    pub fn zeros(ndim: usize) -> Self {
        Self::from_vec(vec![0; ndim])
    }

    pub fn from_vec(data: Vec<i64>) -> Self {
        Self {
            data,
            _space: PhantomData,
        }
    }

    pub fn from_usizes(values: &[usize]) -> Self {
        Self::from_vec(values.iter().map(|&v| v as i64).collect())
    }

    pub fn ndim(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.data
    }

    /// Components as `usize`, negative values clamped to 0.
    pub fn to_usizes(&self) -> Vec<usize> {
        self.data.iter().map(|&v| v.max(0) as usize).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &i64> {
        self.data.iter()
    }
}

impl<S> Clone for NdCoord<S> {
    fn clone(&self) -> Self {
        Self::from_vec(self.data.clone())
    }
}

impl<S> PartialEq for NdCoord<S> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<S> Eq for NdCoord<S> {}

impl<S> std::ops::Index<usize> for NdCoord<S> {
    type Output = i64;

    fn index(&self, i: usize) -> &i64 {
        &self.data[i]
    }
}

impl<S> std::ops::IndexMut<usize> for NdCoord<S> {
    fn index_mut(&mut self, i: usize) -> &mut i64 {
        &mut self.data[i]
    }
}

impl<S> From<Vec<i64>> for NdCoord<S> {
    fn from(data: Vec<i64>) -> Self {
        Self::from_vec(data)
    }
}

impl<S: Space> fmt::Debug for NdCoord<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<S: Space> fmt::Display for NdCoord<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NdCoord<{}>[", S::NAME)?;
        for (i, v) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

/// Product of all extents of a shape.
pub fn volume(shape: &Shape) -> i64 {
    shape.iter().product()
}

/// Axis-aligned box `[start, end)` in space `S`.
pub struct Region<S> {
    pub start: NdCoord<S>,
    pub end: NdCoord<S>,
}

pub type GlobalRegion = Region<space::Global>;
pub type PartRegion = Region<space::Part>;
pub type LocalRegion = Region<space::Region>;

impl<S> Region<S> {
    pub fn new(start: NdCoord<S>, end: NdCoord<S>) -> Self {
        debug_assert_eq!(start.ndim(), end.ndim());
        Self { start, end }
    }

    pub fn ndim(&self) -> usize {
        self.start.ndim()
    }

    pub fn shape(&self) -> Shape {
        Shape::from_vec(
            (0..self.ndim())
                .map(|d| self.end[d] - self.start[d])
                .collect(),
        )
    }

    /// True if any extent is zero or negative.
    pub fn is_empty(&self) -> bool {
        (0..self.ndim()).any(|d| self.end[d] <= self.start[d])
    }

    /// Number of elements, 0 for empty regions.
    pub fn volume(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            volume(&self.shape())
        }
    }

    /// Overlap of two regions, `None` if they do not overlap.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        debug_assert_eq!(self.ndim(), other.ndim());
        let mut start = Vec::with_capacity(self.ndim());
        let mut end = Vec::with_capacity(self.ndim());

        for d in 0..self.ndim() {
            let s = self.start[d].max(other.start[d]);
            let e = self.end[d].min(other.end[d]);
            if s >= e {
                return None;
            }
            start.push(s);
            end.push(e);
        }
        Some(Self::new(start.into(), end.into()))
    }

    /// This region relative to the start of `reference`.
    pub fn to_local(&self, reference: &Self) -> LocalRegion {
        debug_assert_eq!(self.ndim(), reference.ndim());
        let shift = |c: &NdCoord<S>| -> RegionIndex {
            (0..self.ndim())
                .map(|d| c[d] - reference.start[d])
                .collect::<Vec<_>>()
                .into()
        };
        Region::new(shift(&self.start), shift(&self.end))
    }

    /// The part of this region inside `reference`, relative to its start.
    pub fn to_local_clipped(&self, reference: &Self) -> Option<LocalRegion> {
        self.intersection(reference).map(|r| r.to_local(reference))
    }
}

impl GlobalRegion {
    /// The global region covered by one chunk.
    pub fn from_chunk(chunk: &ChunkIndex, chunk_shape: &Shape) -> Self {
        let start: Vec<i64> = (0..chunk.ndim()).map(|d| chunk[d] * chunk_shape[d]).collect();
        let end: Vec<i64> = (0..chunk.ndim()).map(|d| start[d] + chunk_shape[d]).collect();
        Region::new(start.into(), end.into())
    }

    /// The part of `query` inside `part_extent`, in part-local coordinates.
    ///
    /// Empty (not `None`) when they do not overlap; check with `is_empty`.
    pub fn part_local(query: &GlobalRegion, part_extent: &GlobalRegion) -> PartRegion {
        let ndim = query.ndim();
        let mut start = Vec::with_capacity(ndim);
        let mut end = Vec::with_capacity(ndim);
        for d in 0..ndim {
            let s = query.start[d].max(part_extent.start[d]);
            let e = query.end[d].min(part_extent.end[d]);
            start.push(s - part_extent.start[d]);
            end.push(e - part_extent.start[d]);
        }
        Region::new(start.into(), end.into())
    }
}

impl<S> Clone for Region<S> {
    fn clone(&self) -> Self {
        Self::new(self.start.clone(), self.end.clone())
    }
}

impl<S> PartialEq for Region<S> {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end
    }
}

impl<S: Space> fmt::Debug for Region<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Region[{} .. {})", self.start, self.end)
    }
}

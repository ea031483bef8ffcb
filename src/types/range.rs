//! Index ranges
//!
//! Half-open ranges of array indices in one, two and three dimensions. These are used to
//! partition work for parallel loops and to address sub-regions of image geometries.

use thiserror::Error;

/// Out of range access on a fixed size container.
///
/// This signals a programming defect rather than a recoverable condition.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("index {index} out of range for container of size {size}")]
pub struct RangeError {
    /// Index that was requested
    pub index: usize,
    /// Number of addressable elements
    pub size: usize,
}

impl RangeError {
    /// Return a new RangeError.
    pub fn new(index: usize, size: usize) -> Self {
        RangeError { index, size }
    }
}

/// A half-open range `[min, max)` of indices.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Range {
    min: usize,
    max: usize,
}

impl Range {
    /// Return a new Range.
    ///
    /// # Arguments
    ///
    /// * `min`: First index in the range
    /// * `max`: One past the last index in the range. Must not be smaller than `min`.
    pub fn new(min: usize, max: usize) -> Result<Self, RangeError> {
        if max < min {
            return Err(RangeError::new(min, max));
        }
        Ok(Range { min, max })
    }

    /// First index in the range.
    pub fn min(&self) -> usize {
        self.min
    }

    /// One past the last index in the range.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Number of indices in the range.
    pub fn size(&self) -> usize {
        self.max - self.min
    }

    /// Whether the range contains no indices.
    pub fn empty(&self) -> bool {
        self.min == self.max
    }

    /// Returns `min` for `i == 0` and `max` for `i == 1`.
    pub fn get(&self, i: usize) -> Result<usize, RangeError> {
        match i {
            0 => Ok(self.min),
            1 => Ok(self.max),
            _ => Err(RangeError::new(i, 2)),
        }
    }

    /// Iterate over the indices in the range.
    pub fn iter(&self) -> std::ops::Range<usize> {
        self.min..self.max
    }

    /// Split the range into at most `parts` contiguous, non-overlapping sub-ranges.
    ///
    /// Earlier sub-ranges receive the remainder, so sizes differ by at most one. Empty
    /// sub-ranges are never returned.
    pub fn split(&self, parts: usize) -> Vec<Range> {
        let parts = parts.max(1).min(self.size().max(1));
        let chunk = self.size() / parts;
        let remainder = self.size() % parts;
        let mut result = Vec::with_capacity(parts);
        let mut start = self.min;
        for part in 0..parts {
            let len = chunk + usize::from(part < remainder);
            if len == 0 {
                continue;
            }
            result.push(Range {
                min: start,
                max: start + len,
            });
            start += len;
        }
        result
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(range: std::ops::Range<usize>) -> Self {
        Range {
            min: range.start,
            max: range.end.max(range.start),
        }
    }
}

/// A half-open range over rows and columns.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Range2D {
    row_min: usize,
    row_max: usize,
    col_min: usize,
    col_max: usize,
}

impl Range2D {
    /// Return a new Range2D. Each maximum must not be smaller than its minimum.
    pub fn new(
        row_min: usize,
        row_max: usize,
        col_min: usize,
        col_max: usize,
    ) -> Result<Self, RangeError> {
        if row_max < row_min {
            return Err(RangeError::new(row_min, row_max));
        }
        if col_max < col_min {
            return Err(RangeError::new(col_min, col_max));
        }
        Ok(Range2D {
            row_min,
            row_max,
            col_min,
            col_max,
        })
    }

    pub fn min_row(&self) -> usize {
        self.row_min
    }

    pub fn max_row(&self) -> usize {
        self.row_max
    }

    pub fn min_col(&self) -> usize {
        self.col_min
    }

    pub fn max_col(&self) -> usize {
        self.col_max
    }

    pub fn num_rows(&self) -> usize {
        self.row_max - self.row_min
    }

    pub fn num_cols(&self) -> usize {
        self.col_max - self.col_min
    }

    /// Number of (row, column) cells covered.
    pub fn size(&self) -> usize {
        self.num_rows() * self.num_cols()
    }

    /// Whether the range covers no cells.
    pub fn empty(&self) -> bool {
        self.size() == 0
    }

    /// Whether every bound is zero.
    pub fn is_zeroed(&self) -> bool {
        self.row_min == 0 && self.row_max == 0 && self.col_min == 0 && self.col_max == 0
    }

    /// Returns the bounds in the order row min, row max, column min, column max.
    pub fn get(&self, i: usize) -> Result<usize, RangeError> {
        match i {
            0 => Ok(self.row_min),
            1 => Ok(self.row_max),
            2 => Ok(self.col_min),
            3 => Ok(self.col_max),
            _ => Err(RangeError::new(i, 4)),
        }
    }
}

/// A half-open range over x, y and z.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Range3D {
    x_min: usize,
    x_max: usize,
    y_min: usize,
    y_max: usize,
    z_min: usize,
    z_max: usize,
}

impl Range3D {
    /// Return a new Range3D. Each maximum must not be smaller than its minimum.
    pub fn new(
        x_min: usize,
        x_max: usize,
        y_min: usize,
        y_max: usize,
        z_min: usize,
        z_max: usize,
    ) -> Result<Self, RangeError> {
        for (min, max) in [(x_min, x_max), (y_min, y_max), (z_min, z_max)] {
            if max < min {
                return Err(RangeError::new(min, max));
            }
        }
        Ok(Range3D {
            x_min,
            x_max,
            y_min,
            y_max,
            z_min,
            z_max,
        })
    }

    /// Range covering a whole `[x, y, z]` volume starting at the origin.
    pub fn from_dims(dims: [usize; 3]) -> Self {
        Range3D {
            x_min: 0,
            x_max: dims[0],
            y_min: 0,
            y_max: dims[1],
            z_min: 0,
            z_max: dims[2],
        }
    }

    pub fn x_range(&self) -> Range {
        Range {
            min: self.x_min,
            max: self.x_max,
        }
    }

    pub fn y_range(&self) -> Range {
        Range {
            min: self.y_min,
            max: self.y_max,
        }
    }

    pub fn z_range(&self) -> Range {
        Range {
            min: self.z_min,
            max: self.z_max,
        }
    }

    /// Number of voxels covered.
    pub fn size(&self) -> usize {
        self.x_range().size() * self.y_range().size() * self.z_range().size()
    }

    /// Whether the range covers no voxels.
    pub fn empty(&self) -> bool {
        self.size() == 0
    }

    /// Whether every bound is zero.
    pub fn is_zeroed(&self) -> bool {
        [
            self.x_min, self.x_max, self.y_min, self.y_max, self.z_min, self.z_max,
        ]
        .iter()
        .all(|v| *v == 0)
    }

    /// Returns the bounds in the order x min, x max, y min, y max, z min, z max.
    pub fn get(&self, i: usize) -> Result<usize, RangeError> {
        match i {
            0 => Ok(self.x_min),
            1 => Ok(self.x_max),
            2 => Ok(self.y_min),
            3 => Ok(self.y_max),
            4 => Ok(self.z_min),
            5 => Ok(self.z_max),
            _ => Err(RangeError::new(i, 6)),
        }
    }

    /// Whether the point `(x, y, z)` lies inside the range.
    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        (self.x_min..self.x_max).contains(&x)
            && (self.y_min..self.y_max).contains(&y)
            && (self.z_min..self.z_max).contains(&z)
    }
}

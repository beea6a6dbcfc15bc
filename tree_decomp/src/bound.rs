//! Axis-aligned hyper-rectangles carved out by decision tree leaves
//!
//! A [`Bound`] holds one `(min, max)` interval per feature. Intervals are half-open in the
//! direction the trees split: a point is inside when `min < x <= max` on every axis, so two
//! bounds that only share a face do not overlap.

use crate::error::{Error, Result};
use crate::path::{Direction, Path};
use byteorder::{ByteOrder, BigEndian};
use std::fmt;
use std::fs::File;
use std::io::prelude::*;
use std::io::{self, BufRead};
use std::str::FromStr;

pub const RANGE_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub ranges: Vec<(f64, f64)>,
}

impl Bound {

    /// Every axis set to `[-sentinel, sentinel]`
    pub fn unbounded(num_features: usize, sentinel: f64) -> Self {

        return Self { ranges: vec![(-sentinel, sentinel); num_features] };
    }

    pub fn from_ranges(ranges: Vec<(f64, f64)>) -> Self {

        return Self { ranges };
    }

    /// Converts a path into the region of its leaf
    ///
    /// Left steps tighten the max of their feature, right steps tighten the min. The result is
    /// not checked for degeneracy here.
    pub fn from_path(path: &Path, num_features: usize, sentinel: f64) -> Result<Self> {

        let mut bound = Self::unbounded(num_features, sentinel);

        for step in path.steps.iter() {

            let range = match bound.ranges.get_mut(step.feature_id) {
                None => return Err(Error::DimensionMismatch { expected: num_features, found: step.feature_id + 1 }),
                Some(x) => x,
            };

            match step.direction {
                Direction::Left => range.1 = range.1.min(step.threshold),
                Direction::Right => range.0 = range.0.max(step.threshold),
            }
        }

        return Ok(bound);
    }

    pub fn num_features(&self) -> usize {
        return self.ranges.len();
    }

    /// True when some axis has `min >= max`, i.e. the region is empty
    pub fn is_degenerate(&self) -> bool {

        return self.ranges.iter().any(|(min, max)| min >= max);
    }

    pub fn volume(&self) -> f64 {

        let mut volume = 1.0;
        for (min, max) in self.ranges.iter() {
            volume *= (max - min).max(0.0);
        }

        return volume;
    }

    pub fn contains(&self, point: &[f64]) -> Result<bool> {

        if point.len() != self.num_features() {
            return Err(Error::DimensionMismatch { expected: self.num_features(), found: point.len() });
        }

        for (x, (min, max)) in point.iter().zip(self.ranges.iter()) {
            if x <= min || x > max {
                return Ok(false);
            }
        }

        return Ok(true);
    }

    pub fn get_record_size(&self) -> usize {
        return self.num_features() * RANGE_SIZE;
    }

    /// Big endian `(min, max)` pairs, 16 bytes per feature
    pub fn to_vec(&self) -> Vec<u8> {

        let mut vec: Vec<u8> = Vec::with_capacity(self.get_record_size());

        for (min, max) in self.ranges.iter() {

            let mut slice = [0u8; RANGE_SIZE];
            BigEndian::write_f64(&mut slice[0..8], *min);
            BigEndian::write_f64(&mut slice[8..16], *max);
            vec.extend_from_slice(&slice);
        }

        return vec;
    }

    pub fn from_slice(data: &[u8], num_features: usize) -> Result<Self> {

        let expected = num_features * RANGE_SIZE;
        if data.len() < expected {
            return Err(Error::Parse(format!("bound needs {} bytes, got {}", expected, data.len())));
        }

        let mut ranges: Vec<(f64, f64)> = Vec::with_capacity(num_features);
        let mut offset = 0;
        for _ in 0..num_features {
            let min = BigEndian::read_f64(&data[offset..offset + 8]);
            let max = BigEndian::read_f64(&data[offset + 8..offset + 16]);
            ranges.push((min, max));
            offset += RANGE_SIZE;
        }

        return Ok(Self { ranges });
    }
}

/// Space separated `min,max` pairs, one per feature
impl fmt::Display for Bound {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {

        for (i, (min, max)) in self.ranges.iter().enumerate() {
            if i != 0 {
                write!(f, " ")?;
            }
            write!(f, "{},{}", min, max)?;
        }

        Ok(())
    }
}

impl FromStr for Bound {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {

        let mut ranges: Vec<(f64, f64)> = Vec::new();

        for chunk in s.split_whitespace() {

            let fields = chunk.split(",").collect::<Vec<&str>>();
            if fields.len() != 2 {
                return Err(Error::Parse(format!("expected min,max but got {:?}", chunk)));
            }

            let min = fields[0].parse::<f64>().map_err(|e| Error::Parse(format!("{:?}: {}", fields[0], e)))?;
            let max = fields[1].parse::<f64>().map_err(|e| Error::Parse(format!("{:?}: {}", fields[1], e)))?;
            ranges.push((min, max));
        }

        if ranges.is_empty() {
            return Err(Error::Parse("empty bound".to_string()));
        }

        return Ok(Self { ranges });
    }
}

/// Intersects two bounds
///
/// Returns `None` if any axis fails to overlap. Touching intervals (`a.max == b.min`) do not
/// overlap because the intervals are half-open. Bounds over different feature counts are an
/// error.
pub fn merge_bounds(a: &Bound, b: &Bound) -> Result<Option<Bound>> {

    if a.num_features() != b.num_features() {
        return Err(Error::DimensionMismatch { expected: a.num_features(), found: b.num_features() });
    }

    let mut ranges: Vec<(f64, f64)> = Vec::with_capacity(a.num_features());

    for ((a_min, a_max), (b_min, b_max)) in a.ranges.iter().zip(b.ranges.iter()) {

        if a_max <= b_min || b_max <= a_min {
            return Ok(None);
        }

        ranges.push((a_min.max(*b_min), a_max.min(*b_max)));
    }

    return Ok(Some(Bound { ranges }));
}

pub fn write_bounds_to_file<'a, I>(bounds: I, filename: &str) -> Result<()>
where I: IntoIterator<Item = &'a Bound>, {

    let mut file = io::BufWriter::new(File::create(filename)?);

    for bound in bounds {
        writeln!(file, "{}", bound)?;
    }
    file.flush()?;

    Ok(())
}

pub fn read_bounds_from_file(filename: &str) -> Result<Vec<Bound>> {

    let file = File::open(filename)?;

    let mut bounds: Vec<Bound> = Vec::new();
    for line in io::BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        bounds.push(line.parse::<Bound>()?);
    }

    return Ok(bounds);
}

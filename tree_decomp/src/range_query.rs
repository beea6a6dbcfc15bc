//! Range queries handed to the nearest neighbor index
//!
//! A [`RangeQuery`] keeps only the axes a bound actually constrains. Axes left at the sentinel
//! range are dropped, so the index can skip them when walking its splits.

use crate::bound::Bound;
use crate::error::{Error, Result};
use crate::merge::Decomposition;
use serde::{Serialize, Deserialize};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::prelude::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySet {
    pub queries: Vec<(RangeQuery, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub map: BTreeMap<usize, RangeNode>,
    pub num_axes: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Half-open `(lower_bound, upper_bound]` on one axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeNode {
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl RangeNode {

    pub fn to_string(&self) -> String {
        return format!("{},{}", self.lower_bound, self.upper_bound);
    }

    pub fn contains(&self, value: f64) -> bool {
        return value > self.lower_bound && value <= self.upper_bound;
    }
}

impl RangeQuery {

    /// Keeps the axes of `bound` that are narrower than `[-sentinel, sentinel]`
    pub fn from_bound(bound: &Bound, sentinel: f64) -> Self {

        let mut map: BTreeMap<usize, RangeNode> = BTreeMap::new();

        for (axis, (min, max)) in bound.ranges.iter().enumerate() {

            if *min <= -sentinel && *max >= sentinel {
                continue;
            }

            map.insert(axis, RangeNode { lower_bound: *min, upper_bound: *max });
        }

        return RangeQuery {
            map,
            num_axes: bound.num_features(),
            lower_bound: -sentinel,
            upper_bound: sentinel,
        };
    }

    /// Inverse of [`RangeQuery::from_bound`]
    pub fn to_bound(&self) -> Bound {

        let mut bound = Bound::unbounded(self.num_axes, self.upper_bound);
        for (axis, node) in self.map.iter() {
            bound.ranges[*axis] = (node.lower_bound, node.upper_bound);
        }

        return bound;
    }

    pub fn to_string(&self) -> String {

        let mut s = "".to_string();
        for (axis, node) in self.map.iter() {
            s += &format!("{},{}|", axis, node.to_string());
        }

        return s;
    }

    pub fn from_string(s: &str, num_axes: usize, sentinel: f64) -> Result<Self> {

        let mut map: BTreeMap<usize, RangeNode> = BTreeMap::new();

        for chunk in s.split("|") {

            if chunk.is_empty() {
                continue;
            }

            let fields = chunk.split(",").collect::<Vec<&str>>();
            if fields.len() != 3 {
                return Err(Error::Parse(format!("expected axis,lb,ub but got {:?}", chunk)));
            }

            let axis = fields[0].parse::<usize>().map_err(|e| Error::Parse(format!("{:?}: {}", fields[0], e)))?;
            let lb = fields[1].parse::<f64>().map_err(|e| Error::Parse(format!("{:?}: {}", fields[1], e)))?;
            let ub = fields[2].parse::<f64>().map_err(|e| Error::Parse(format!("{:?}: {}", fields[2], e)))?;

            if axis >= num_axes {
                return Err(Error::DimensionMismatch { expected: num_axes, found: axis + 1 });
            }

            map.insert(axis, RangeNode { lower_bound: lb, upper_bound: ub });
        }

        return Ok(RangeQuery {
            map,
            num_axes,
            lower_bound: -sentinel,
            upper_bound: sentinel,
        });
    }

    pub fn check_point(&self, point: &[f64]) -> Result<bool> {

        if point.len() != self.num_axes {
            return Err(Error::DimensionMismatch { expected: self.num_axes, found: point.len() });
        }

        for (axis, node) in self.map.iter() {
            if !node.contains(point[*axis]) {
                return Ok(false);
            }
        }

        return Ok(true);
    }

    pub fn area(&self) -> f64 {

        let mut area = 1.0;
        for i in 0..self.num_axes {

            let this_length = match self.map.get(&i) {
                None => self.upper_bound - self.lower_bound,
                Some(x) => x.upper_bound - x.lower_bound,
            };

            area *= this_length;
        }

        return area;
    }

    /// Fraction of the whole space covered by the query
    pub fn proportion(&self) -> f64 {

        let space_area = (self.upper_bound - self.lower_bound).powi(self.num_axes as i32);

        return self.area() / space_area;
    }
}

impl QuerySet {

    /// One query per derived bound, scored by the weight of its region set
    pub fn from_decomposition(decomposition: &Decomposition, sentinel: f64) -> Self {

        let mut queries: Vec<(RangeQuery, f64)> = Vec::new();

        for set in decomposition.derived() {
            for bound in set.bounds.iter() {
                queries.push((RangeQuery::from_bound(bound, sentinel), set.weight));
            }
        }

        let mut qs = QuerySet { queries };
        qs.sort();
        return qs;
    }

    pub fn len(&self) -> usize {
        return self.queries.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.queries.is_empty();
    }

    /// Highest weight first
    pub fn sort(&mut self) {
        self.queries.sort_by(|a, b| b.1.total_cmp(&a.1));
    }

    pub fn to_string(&self) -> Result<String> {
        return Ok(serde_json::to_string(&self)?);
    }

    pub fn from_string(s: &str) -> Result<Self> {
        return Ok(serde_json::from_str(s)?);
    }

    pub fn to_file(&self, filename: &str) -> Result<()> {

        let mut file = File::create(filename)?;
        let s = self.to_string()?;
        file.write_all(s.as_bytes())?;

        Ok(())
    }

    pub fn from_file(filename: &str) -> Result<Self> {

        let s = std::fs::read_to_string(filename)?;
        return Self::from_string(&s);
    }
}

//! Cross-tree intersection of positive regions
//!
//! Region sets live in a growing arena indexed by id. Ids `0..T` are the base sets, one per
//! tree, holding that tree's positive leaf bounds. Every successful merge of two sets appends a
//! new set holding all non-empty pairwise intersections of their bounds.
//!
//! Two side tables drive the pruning of candidate pairs:
//! - `lineage[id]`: ids of every set that went into `id`, including itself. A set is never
//!   merged with a member of its own lineage.
//! - `reachable[id]`: ids known to overlap `id`, seeded with its lineage. A pair is only tried
//!   when their reachable sets share an id, since an overlap needs a chain of pairwise overlaps
//!   that has already been observed.
//!
//! Rounds repeat until one creates no new set. Pair merges within a round run in parallel, then
//! the results are applied in candidate order so ids come out the same as a sequential run.

use crate::bound::{merge_bounds, Bound};
use crate::config::DecompConfig;
use crate::error::{Error, Result};
use crate::forest::{decompose_trees, DegenerateBound, Forest};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub const MAX_EXHAUSTIVE_TREES: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct RegionSet {
    /// Sum of the weights of the sets merged into this one
    pub weight: f64,
    pub bounds: Vec<Bound>,
    /// Region set ids this set was built from, itself included
    pub lineage: BTreeSet<usize>,
    /// Forest trees this set was built from
    pub provenance: BTreeSet<usize>,
}

impl RegionSet {

    pub fn base(tree_index: usize, weight: f64, bounds: Vec<Bound>) -> Self {

        let ids: BTreeSet<usize> = [tree_index].into_iter().collect();

        return Self {
            weight,
            bounds,
            lineage: ids.clone(),
            provenance: ids,
        }
    }

    pub fn is_derived(&self) -> bool {
        return self.provenance.len() > 1;
    }
}

/// All non-empty intersections between a bound of `a` and a bound of `b`
pub fn merge_tree_bounds(a: &[Bound], b: &[Bound]) -> Result<Vec<Bound>> {

    let mut merged: Vec<Bound> = Vec::new();

    for bound_a in a.iter() {
        for bound_b in b.iter() {
            if let Some(bound) = merge_bounds(bound_a, bound_b)? {
                merged.push(bound);
            }
        }
    }

    return Ok(merged);
}

#[derive(Debug)]
pub struct BoundMerger {
    sets: Vec<RegionSet>,
    reachable: Vec<BTreeSet<usize>>,
    by_provenance: HashMap<BTreeSet<usize>, usize>,
    num_trees: usize,
    collapse_duplicates: bool,
    max_rounds: Option<usize>,
    max_region_sets: Option<usize>,
}

impl BoundMerger {

    /// `base` must hold one set per tree, in tree order
    pub fn new(base: Vec<RegionSet>, config: &DecompConfig) -> Result<Self> {

        let num_trees = base.len();
        let mut num_features: Option<usize> = None;

        let mut by_provenance: HashMap<BTreeSet<usize>, usize> = HashMap::new();
        let mut reachable: Vec<BTreeSet<usize>> = Vec::with_capacity(num_trees);

        for (i, set) in base.iter().enumerate() {

            if set.lineage.len() != 1 || !set.lineage.contains(&i) {
                return Err(Error::InvalidConfig(format!("base region set {} is not a single tree", i)));
            }

            for bound in set.bounds.iter() {
                let n = *num_features.get_or_insert(bound.num_features());
                if bound.num_features() != n {
                    return Err(Error::DimensionMismatch { expected: n, found: bound.num_features() });
                }
            }

            by_provenance.insert(set.provenance.clone(), i);
            reachable.push(set.lineage.clone());
        }

        return Ok(Self {
            sets: base,
            reachable,
            by_provenance,
            num_trees,
            collapse_duplicates: config.collapse_duplicates,
            max_rounds: config.max_rounds,
            max_region_sets: config.max_region_sets,
        });
    }

    pub fn num_trees(&self) -> usize {
        return self.num_trees;
    }

    pub fn num_sets(&self) -> usize {
        return self.sets.len();
    }

    pub fn sets(&self) -> &[RegionSet] {
        return &self.sets;
    }

    pub fn lineage(&self, id: usize) -> &BTreeSet<usize> {
        return &self.sets[id].lineage;
    }

    pub fn reachable(&self, id: usize) -> &BTreeSet<usize> {
        return &self.reachable[id];
    }

    /// Every pair of base sets
    pub fn initial_candidates(&self) -> Vec<(usize, usize)> {

        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for i in 0..self.num_trees {
            for j in i + 1..self.num_trees {
                pairs.push((i, j));
            }
        }

        return pairs;
    }

    /// Tries every candidate pair and returns the ids of the sets created
    pub fn round(&mut self, candidates: &[(usize, usize)]) -> Result<Vec<usize>> {

        let sets = &self.sets;
        let merged: Vec<Vec<Bound>> = candidates
            .par_iter()
            .map(|(i, j)| merge_tree_bounds(&sets[*i].bounds, &sets[*j].bounds))
            .collect::<Result<Vec<Vec<Bound>>>>()?;

        let mut new_ids: Vec<usize> = Vec::new();

        for ((i, j), bounds) in candidates.iter().zip(merged.into_iter()) {

            if bounds.is_empty() {
                continue;
            }

            self.reachable[*i].insert(*j);
            self.reachable[*j].insert(*i);

            let provenance: BTreeSet<usize> = self.sets[*i].provenance.union(&self.sets[*j].provenance).cloned().collect();

            if self.collapse_duplicates && self.by_provenance.contains_key(&provenance) {
                continue;
            }

            let new_id = self.sets.len();

            let mut lineage: BTreeSet<usize> = self.sets[*i].lineage.union(&self.sets[*j].lineage).cloned().collect();
            lineage.insert(new_id);

            debug!("set {} = {} x {}: {} bounds, trees {:?}", new_id, i, j, bounds.len(), provenance);

            let weight = self.sets[*i].weight + self.sets[*j].weight;

            self.by_provenance.entry(provenance.clone()).or_insert(new_id);
            self.reachable.push(lineage.clone());
            self.sets.push(RegionSet {
                weight,
                bounds,
                lineage,
                provenance,
            });
            new_ids.push(new_id);

            if let Some(max) = self.max_region_sets {
                if self.sets.len() > max {
                    return Err(Error::NonConvergence { rounds: 0, region_sets: self.sets.len() });
                }
            }
        }

        return Ok(new_ids);
    }

    /// Pairs to try in the next round, given the sets created in this one
    ///
    /// Each new set is paired with every existing set outside its lineage whose reachable ids
    /// share at least one id with the new set's.
    pub fn next_candidates(&self, new_ids: &[usize]) -> Vec<(usize, usize)> {

        let mut pairs: Vec<(usize, usize)> = Vec::new();
        let mut seen: HashSet<(usize, usize)> = HashSet::new();

        for new_id in new_ids.iter() {

            let lineage = &self.sets[*new_id].lineage;
            let reachable = &self.reachable[*new_id];

            for other in 0..self.sets.len() {

                if lineage.contains(&other) {
                    continue;
                }

                if self.reachable[other].is_disjoint(reachable) {
                    continue;
                }

                if self.collapse_duplicates && !seen.insert((other.min(*new_id), other.max(*new_id))) {
                    continue;
                }

                pairs.push((other, *new_id));
            }
        }

        return pairs;
    }

    /// Runs rounds to the fixed point. Returns every set, base sets first, and the round count.
    pub fn run(mut self) -> Result<(Vec<RegionSet>, usize)> {

        let mut candidates = self.initial_candidates();
        let mut rounds: usize = 0;

        loop {

            if let Some(max) = self.max_rounds {
                if rounds >= max {
                    return Err(Error::NonConvergence { rounds, region_sets: self.num_sets() });
                }
            }

            info!("round {}: {} candidate pairs, {} region sets over {} trees", rounds, candidates.len(), self.num_sets(), self.num_trees());

            let new_ids = match self.round(&candidates) {
                Ok(x) => x,
                Err(Error::NonConvergence { region_sets, .. }) => {
                    return Err(Error::NonConvergence { rounds: rounds + 1, region_sets });
                },
                Err(e) => return Err(e),
            };
            rounds += 1;

            info!("round {} created {} region sets", rounds - 1, new_ids.len());

            if new_ids.is_empty() {
                break;
            }

            candidates = self.next_candidates(&new_ids);
        }

        return Ok((self.sets, rounds));
    }
}

/// Runs the merge to its fixed point over the base region sets of a forest
pub fn merge_forest_bounds(base: Vec<RegionSet>, config: &DecompConfig) -> Result<(Vec<RegionSet>, usize)> {

    let merger = BoundMerger::new(base, config)?;
    return merger.run();
}

/// Every region where two or more trees overlap, keyed by the trees involved
///
/// Tries every subset of trees, so only usable on small forests. Serves as the reference the
/// pruned merge is checked against.
pub fn exhaustive_merge(base: &[RegionSet]) -> Result<BTreeMap<BTreeSet<usize>, Vec<Bound>>> {

    let num_trees = base.len();
    if num_trees > MAX_EXHAUSTIVE_TREES {
        return Err(Error::InvalidConfig(format!("exhaustive merge supports at most {} trees, got {}", MAX_EXHAUSTIVE_TREES, num_trees)));
    }

    let mut num_features: Option<usize> = None;
    for bound in base.iter().flat_map(|s| s.bounds.iter()) {
        let n = *num_features.get_or_insert(bound.num_features());
        if bound.num_features() != n {
            return Err(Error::DimensionMismatch { expected: n, found: bound.num_features() });
        }
    }

    // non-empty intersections per subset mask, built from the mask without its top tree
    let mut by_mask: HashMap<u32, Vec<Bound>> = HashMap::new();
    for (i, set) in base.iter().enumerate() {
        if !set.bounds.is_empty() {
            by_mask.insert(1 << i, set.bounds.clone());
        }
    }

    let mut found: BTreeMap<BTreeSet<usize>, Vec<Bound>> = BTreeMap::new();

    for mask in 1u32..(1u32 << num_trees) {

        if mask.count_ones() < 2 {
            continue;
        }

        let top = 31 - mask.leading_zeros();
        let rest = mask & !(1 << top);

        let merged = match by_mask.get(&rest) {
            None => continue,
            Some(bounds) => merge_tree_bounds(bounds, &base[top as usize].bounds)?,
        };

        if merged.is_empty() {
            continue;
        }

        let provenance: BTreeSet<usize> = (0..num_trees).filter(|t| mask & (1 << t) != 0).collect();
        found.insert(provenance, merged.clone());
        by_mask.insert(mask, merged);
    }

    return Ok(found);
}

/// Tree sets found by only one of the pruned merge and the exhaustive merge
///
/// Returns `(missed, extra)`: sets the exhaustive merge found that `region_sets` lacks, and sets
/// in `region_sets` the exhaustive merge did not find.
pub fn compare_with_exhaustive(region_sets: &[RegionSet], exhaustive: &BTreeMap<BTreeSet<usize>, Vec<Bound>>) -> (Vec<BTreeSet<usize>>, Vec<BTreeSet<usize>>) {

    let pruned: BTreeSet<BTreeSet<usize>> = region_sets.iter()
        .filter(|s| s.is_derived())
        .map(|s| s.provenance.clone())
        .collect();

    let missed = exhaustive.keys().filter(|k| !pruned.contains(*k)).cloned().collect();
    let extra = pruned.iter().filter(|k| !exhaustive.contains_key(*k)).cloned().collect();

    return (missed, extra);
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegionSetSummary {
    pub id: usize,
    pub weight: f64,
    pub trees: Vec<usize>,
    pub num_bounds: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DecompositionSummary {
    pub num_trees: usize,
    pub rounds: usize,
    pub region_sets: Vec<RegionSetSummary>,
    pub degenerate: Vec<DegenerateBound>,
}

/// Result of decomposing a forest: base sets, one per tree, followed by derived sets in
/// creation order
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub num_trees: usize,
    pub rounds: usize,
    pub region_sets: Vec<RegionSet>,
    pub degenerate: Vec<DegenerateBound>,
}

impl Decomposition {

    pub fn base(&self) -> &[RegionSet] {
        return &self.region_sets[..self.num_trees];
    }

    pub fn derived(&self) -> &[RegionSet] {
        return &self.region_sets[self.num_trees..];
    }

    /// `(weight, bounds)` per region set, the plain output form
    pub fn weighted_regions(&self) -> Vec<(f64, &[Bound])> {

        return self.region_sets.iter().map(|s| (s.weight, s.bounds.as_slice())).collect();
    }

    pub fn summary(&self) -> DecompositionSummary {

        let region_sets = self.region_sets.iter().enumerate().map(|(id, s)| RegionSetSummary {
            id,
            weight: s.weight,
            trees: s.provenance.iter().cloned().collect(),
            num_bounds: s.bounds.len(),
        }).collect();

        return DecompositionSummary {
            num_trees: self.num_trees,
            rounds: self.rounds,
            region_sets,
            degenerate: self.degenerate.clone(),
        };
    }
}

/// Extracts every tree's positive regions and merges them to the fixed point
pub fn decompose_random_forest(forest: &Forest, config: &DecompConfig) -> Result<Decomposition> {

    config.validate()?;

    let (base, degenerate) = decompose_trees(forest, config)?;
    let num_trees = base.len();

    let (region_sets, rounds) = merge_forest_bounds(base, config)?;

    info!("decomposed {} trees into {} region sets in {} rounds ({} degenerate leaves skipped)",
        num_trees, region_sets.len(), rounds, degenerate.len());

    return Ok(Decomposition {
        num_trees,
        rounds,
        region_sets,
        degenerate,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::tests::{interval_tree, two_level_tree};
    use assert_approx_eq::assert_approx_eq;
    use rand::{SeedableRng, rngs::StdRng};

    fn b(ranges: &[(f64, f64)]) -> Bound {
        return Bound::from_ranges(ranges.to_vec());
    }

    fn ids(v: &[usize]) -> BTreeSet<usize> {
        return v.iter().cloned().collect();
    }

    fn base_sets(bounds: Vec<Vec<Bound>>) -> Vec<RegionSet> {
        return bounds.into_iter().enumerate().map(|(i, b)| RegionSet::base(i, 1.0, b)).collect();
    }

    fn sorted_strings(bounds: &[Bound]) -> Vec<String> {
        let mut v: Vec<String> = bounds.iter().map(|b| b.to_string()).collect();
        v.sort();
        return v;
    }

    #[test]
    fn tree_bounds_cross_product() {

        let a = vec![b(&[(0.0, 2.0)]), b(&[(5.0, 6.0)])];
        let c = vec![b(&[(1.0, 5.5)]), b(&[(10.0, 11.0)])];

        let merged = merge_tree_bounds(&a, &c).unwrap();
        assert_eq!(merged, vec![b(&[(1.0, 2.0)]), b(&[(5.0, 5.5)])]);

        assert!(merge_tree_bounds(&a, &[b(&[(20.0, 21.0)])]).unwrap().is_empty());
        assert!(merge_tree_bounds(&a, &[]).unwrap().is_empty());
        assert!(merge_tree_bounds(&a, &[b(&[(1.0, 5.5), (0.0, 1.0)])]).is_err());
    }

    #[test]
    fn two_trees_one_overlap() {

        let base = base_sets(vec![vec![b(&[(0.0, 5.0)])], vec![b(&[(3.0, 8.0)])]]);

        let (sets, rounds) = merge_forest_bounds(base, &DecompConfig::default()).unwrap();

        assert_eq!(sets.len(), 3);
        assert_eq!(rounds, 2);

        let derived = &sets[2];
        assert_eq!(derived.bounds, vec![b(&[(3.0, 5.0)])]);
        assert_eq!(derived.provenance, ids(&[0, 1]));
        assert_eq!(derived.lineage, ids(&[0, 1, 2]));
        assert_approx_eq!(derived.weight, 2.0);
    }

    #[test]
    fn two_tree_forest_end_to_end() {

        let forest = Forest {
            n_features: 1,
            trees: vec![interval_tree(0.0, 5.0), interval_tree(3.0, 8.0)],
        };

        let decomp = decompose_random_forest(&forest, &DecompConfig::default()).unwrap();

        assert_eq!(decomp.base().len(), 2);
        assert_eq!(decomp.base()[0].bounds, vec![b(&[(0.0, 5.0)])]);
        assert_eq!(decomp.base()[1].bounds, vec![b(&[(3.0, 8.0)])]);

        assert_eq!(decomp.derived().len(), 1);
        assert_eq!(decomp.derived()[0].bounds, vec![b(&[(3.0, 5.0)])]);
        assert_eq!(decomp.derived()[0].provenance, ids(&[0, 1]));
        assert_eq!(decomp.rounds, 2);

        let regions = decomp.weighted_regions();
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[2].0, 2.0);
    }

    #[test]
    fn two_tree_forest_without_collapsing() {

        let forest = Forest {
            n_features: 1,
            trees: vec![interval_tree(0.0, 5.0), interval_tree(3.0, 8.0)],
        };

        let mut config = DecompConfig::default();
        config.collapse_duplicates = false;

        let decomp = decompose_random_forest(&forest, &config).unwrap();

        assert_eq!(decomp.region_sets.len(), 3);
        assert_eq!(decomp.rounds, 2);
        assert_eq!(decomp.derived()[0].bounds, vec![b(&[(3.0, 5.0)])]);
        assert_eq!(decomp.derived()[0].provenance, ids(&[0, 1]));
        assert_approx_eq!(decomp.derived()[0].weight, 2.0);
    }

    #[test]
    fn misaligned_tree_weights_rejected() {

        let forest = Forest {
            n_features: 1,
            trees: vec![interval_tree(0.0, 5.0), interval_tree(3.0, 8.0)],
        };

        let mut config = DecompConfig::default();
        config.tree_weights = Some(vec![3.0]);
        assert!(matches!(decompose_random_forest(&forest, &config), Err(Error::InvalidConfig(_))));

        config.tree_weights = Some(vec![3.0, 1.0, 2.0]);
        assert!(matches!(decompose_random_forest(&forest, &config), Err(Error::InvalidConfig(_))));

        config.tree_weights = Some(vec![3.0, 0.5]);
        let decomp = decompose_random_forest(&forest, &config).unwrap();
        let weights: Vec<f64> = decomp.region_sets.iter().map(|s| s.weight).collect();
        assert_eq!(weights, vec![3.0, 0.5, 3.5]);
    }

    #[test]
    fn disjoint_trees_converge_after_one_round() {

        let base = base_sets(vec![
            vec![b(&[(0.0, 1.0)])],
            vec![b(&[(1.0, 2.0)])],
            vec![b(&[(2.0, 3.0)])],
        ]);

        let (sets, rounds) = merge_forest_bounds(base, &DecompConfig::default()).unwrap();
        assert_eq!(sets.len(), 3);
        assert_eq!(rounds, 1);
    }

    #[test]
    fn three_way_overlap_represented_once() {

        let base = base_sets(vec![
            vec![b(&[(0.0, 4.0)])],
            vec![b(&[(1.0, 5.0)])],
            vec![b(&[(2.0, 6.0)])],
        ]);

        let (sets, _) = merge_forest_bounds(base, &DecompConfig::default()).unwrap();

        let provenances: Vec<BTreeSet<usize>> = sets.iter().map(|s| s.provenance.clone()).collect();
        assert_eq!(provenances, vec![
            ids(&[0]), ids(&[1]), ids(&[2]),
            ids(&[0, 1]), ids(&[0, 2]), ids(&[1, 2]),
            ids(&[0, 1, 2]),
        ]);

        assert_eq!(sets[6].bounds, vec![b(&[(2.0, 4.0)])]);
        assert_approx_eq!(sets[6].weight, 3.0);
    }

    #[test]
    fn uncollapsed_merge_blows_up() {

        // without collapsing, every re-derivation of trees {0, 1, 2} becomes a new set that
        // can be paired again
        let base = base_sets(vec![
            vec![b(&[(0.0, 4.0)])],
            vec![b(&[(1.0, 5.0)])],
            vec![b(&[(2.0, 6.0)])],
        ]);

        let mut config = DecompConfig::default();
        config.collapse_duplicates = false;
        config.max_region_sets = Some(50);

        let mut merger = BoundMerger::new(base, &config).unwrap();
        let candidates = merger.initial_candidates();
        let new_ids = merger.round(&candidates).unwrap();
        let candidates = merger.next_candidates(&new_ids);
        let new_ids = merger.round(&candidates).unwrap();

        assert_eq!(new_ids.len(), 9);
        for id in new_ids.iter() {
            assert_eq!(merger.sets()[*id].provenance, ids(&[0, 1, 2]));
            assert_eq!(merger.sets()[*id].bounds, vec![b(&[(2.0, 4.0)])]);
        }

        let base = merger.sets()[..3].to_vec();
        assert!(matches!(merge_forest_bounds(base, &config), Err(Error::NonConvergence { .. })));
    }

    #[test]
    fn lineage_never_paired() {

        let mut rng = StdRng::seed_from_u64(17);
        let config = DecompConfig::default();

        for _ in 0..20 {

            let forest = Forest::random(&mut rng, 6, 3, 2);
            let (base, _) = decompose_trees(&forest, &config).unwrap();

            let mut merger = BoundMerger::new(base, &config).unwrap();
            let mut candidates = merger.initial_candidates();

            loop {
                let new_ids = merger.round(&candidates).unwrap();
                if new_ids.is_empty() {
                    break;
                }

                candidates = merger.next_candidates(&new_ids);
                for (other, new_id) in candidates.iter() {
                    assert!(!merger.lineage(*new_id).contains(other));
                    assert!(!merger.reachable(*other).is_disjoint(merger.reachable(*new_id)));
                }
            }
        }
    }

    #[test]
    fn reachable_records_successful_pairs() {

        let base = base_sets(vec![
            vec![b(&[(0.0, 2.0)])],
            vec![b(&[(1.0, 3.0)])],
            vec![b(&[(5.0, 6.0)])],
        ]);

        let mut merger = BoundMerger::new(base, &DecompConfig::default()).unwrap();
        let candidates = merger.initial_candidates();
        assert_eq!(candidates, vec![(0, 1), (0, 2), (1, 2)]);

        let new_ids = merger.round(&candidates).unwrap();
        assert_eq!(new_ids, vec![3]);

        assert_eq!(merger.reachable(0), &ids(&[0, 1]));
        assert_eq!(merger.reachable(1), &ids(&[0, 1]));
        assert_eq!(merger.reachable(2), &ids(&[2]));
        assert_eq!(merger.reachable(3), &ids(&[0, 1, 3]));

        // tree 2 overlaps nothing, so it is pruned
        assert!(merger.next_candidates(&new_ids).is_empty());
    }

    #[test]
    fn matches_exhaustive_merge() {

        let mut rng = StdRng::seed_from_u64(42);
        let config = DecompConfig::default();

        for num_features in [1, 2, 3] {
            for _ in 0..15 {

                let forest = Forest::random(&mut rng, 6, 3, num_features);
                let (base, _) = decompose_trees(&forest, &config).unwrap();

                let exhaustive = exhaustive_merge(&base).unwrap();
                let (sets, _) = merge_forest_bounds(base, &config).unwrap();

                let (missed, extra) = compare_with_exhaustive(&sets, &exhaustive);
                assert!(missed.is_empty(), "missed {:?}", missed);
                assert!(extra.is_empty(), "extra {:?}", extra);

                for set in sets.iter().filter(|s| s.is_derived()) {
                    let expected = exhaustive.get(&set.provenance).unwrap();
                    assert_eq!(sorted_strings(&set.bounds), sorted_strings(expected));
                }
            }
        }
    }

    #[test]
    fn exhaustive_merge_of_three_intervals() {

        let base = base_sets(vec![
            vec![b(&[(0.0, 4.0)])],
            vec![b(&[(1.0, 5.0)])],
            vec![b(&[(4.0, 6.0)])],
        ]);

        let found = exhaustive_merge(&base).unwrap();
        let keys: Vec<BTreeSet<usize>> = found.keys().cloned().collect();
        assert_eq!(keys, vec![ids(&[0, 1]), ids(&[1, 2])]);
        assert_eq!(found[&ids(&[1, 2])], vec![b(&[(4.0, 5.0)])]);
    }

    #[test]
    fn exhaustive_merge_refuses_large_forests() {

        let base = base_sets((0..MAX_EXHAUSTIVE_TREES + 1).map(|_| vec![b(&[(0.0, 1.0)])]).collect());
        assert!(exhaustive_merge(&base).is_err());
    }

    #[test]
    fn round_limit_reports_non_convergence() {

        let base = base_sets(vec![vec![b(&[(0.0, 5.0)])], vec![b(&[(3.0, 8.0)])]]);

        let mut config = DecompConfig::default();
        config.max_rounds = Some(1);

        match merge_forest_bounds(base, &config) {
            Err(Error::NonConvergence { rounds, .. }) => assert_eq!(rounds, 1),
            other => panic!("expected non-convergence, got {:?}", other),
        }
    }

    #[test]
    fn region_set_limit_reports_non_convergence() {

        let base = base_sets(vec![
            vec![b(&[(0.0, 4.0)])],
            vec![b(&[(1.0, 5.0)])],
            vec![b(&[(2.0, 6.0)])],
        ]);

        let mut config = DecompConfig::default();
        config.max_region_sets = Some(4);

        assert!(matches!(merge_forest_bounds(base, &config), Err(Error::NonConvergence { .. })));
    }

    #[test]
    fn mixed_dimensions_rejected() {

        let base = base_sets(vec![vec![b(&[(0.0, 4.0)])], vec![b(&[(0.0, 4.0), (0.0, 1.0)])]]);
        assert!(BoundMerger::new(base.clone(), &DecompConfig::default()).is_err());

        // the lower-dimensional overlap must not pass for a real one
        let base = base_sets(vec![vec![b(&[(0.0, 2.0), (0.0, 1.0)])], vec![b(&[(1.0, 3.0)])]]);
        assert!(matches!(exhaustive_merge(&base), Err(Error::DimensionMismatch { expected: 2, found: 1 })));
    }

    #[test]
    fn merger_counts() {

        let base = base_sets(vec![vec![b(&[(0.0, 5.0)])], vec![b(&[(3.0, 8.0)])]]);

        let mut merger = BoundMerger::new(base, &DecompConfig::default()).unwrap();
        assert_eq!(merger.num_trees(), 2);
        assert_eq!(merger.num_sets(), 2);

        let candidates = merger.initial_candidates();
        merger.round(&candidates).unwrap();
        assert_eq!(merger.num_trees(), 2);
        assert_eq!(merger.num_sets(), 3);
    }

    #[test]
    fn two_level_trees_summary() {

        let forest = Forest {
            n_features: 2,
            trees: vec![two_level_tree(), interval_tree(-0.5, 0.5)],
        };

        let decomp = decompose_random_forest(&forest, &DecompConfig::default()).unwrap();
        dbg!(&decomp.derived());

        // tree 1 only splits f0, so both of tree 0's positive corners are cut by (-0.5, 0.5]
        assert_eq!(decomp.derived().len(), 1);
        assert_eq!(decomp.derived()[0].bounds, vec![
            b(&[(-0.5, 0.0), (-1000.0, 0.5)]),
            b(&[(0.0, 0.5), (0.5, 1000.0)]),
        ]);

        let summary = decomp.summary();
        assert_eq!(summary.region_sets.len(), 3);
        assert_eq!(summary.region_sets[2].trees, vec![0, 1]);
        assert_eq!(summary.region_sets[2].num_bounds, 2);
    }
}

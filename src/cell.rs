//! A single agent: its bounded belief set and fixed charisma, plus the
//! pairwise influence rule.

use crate::random::RandomSource;
use anyhow::Result;
use idea_flow_common::SimParams;
use rand_distr::Normal;
use std::fmt;

pub use idea_flow_common::BeliefRecord as Belief;

/// Strength given to a label a cell adopts from a neighbor.
pub const ADOPTED_STRENGTH: f64 = 1.0;

/// Insertion-ordered set of (label, strength) pairs with unique labels.
///
/// Bounded to `max_labels` entries after every influence; a handful of
/// entries at most, so a flat vector beats any hashed map here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Beliefs {
    entries: Vec<Belief>,
}

impl Beliefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Belief> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Belief] {
        &self.entries
    }

    pub fn contains(&self, label: char) -> bool {
        self.position(label).is_some()
    }

    pub fn strength_of(&self, label: char) -> Option<f64> {
        self.position(label).map(|i| self.entries[i].strength)
    }

    pub fn total_strength(&self) -> f64 {
        self.entries.iter().map(|b| b.strength).sum()
    }

    /// Sets `label` to `strength`, inserting it at the end if absent.
    pub fn set(&mut self, label: char, strength: f64) {
        match self.position(label) {
            Some(i) => self.entries[i].strength = strength,
            None => self.entries.push(Belief { label, strength }),
        }
    }

    /// Label with the greatest strength. Ties go to the earliest entry.
    pub fn dominant(&self) -> Option<char> {
        let mut best: Option<&Belief> = None;
        for belief in &self.entries {
            match best {
                Some(b) if belief.strength <= b.strength => {}
                _ => best = Some(belief),
            }
        }
        best.map(|b| b.label)
    }

    /// Rescales every strength by `cap / total` when the total exceeds `cap`.
    pub fn normalize(&mut self, cap: f64) {
        let total = self.total_strength();
        if total > cap {
            let scale = cap / total;
            for belief in &mut self.entries {
                belief.strength *= scale;
            }
        }
    }

    /// Keeps the `max_labels` strongest entries, strongest first. Stable, so
    /// equal strengths keep their relative order. Dropped strength is lost.
    pub fn limit(&mut self, max_labels: usize) {
        if self.entries.len() > max_labels {
            self.entries.sort_by(|a, b| b.strength.total_cmp(&a.strength));
            self.entries.truncate(max_labels);
        }
    }

    fn position(&self, label: char) -> Option<usize> {
        self.entries.iter().position(|b| b.label == label)
    }
}

// Tooltip-style rendering, one "label: strength" line per belief.
impl fmt::Display for Beliefs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, belief) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {:.1}", belief.label, belief.strength)?;
        }
        Ok(())
    }
}

/// Normal distribution of charisma clamped to `[min, max]`.
#[derive(Debug, Clone)]
pub struct CharismaDistribution {
    normal: Normal<f64>,
    min: f64,
    max: f64,
}

impl CharismaDistribution {
    pub fn from_params(params: &SimParams) -> Result<Self> {
        if !(params.charisma_min <= params.charisma_max) {
            anyhow::bail!(
                "Charisma range [{}, {}] is empty.",
                params.charisma_min,
                params.charisma_max
            );
        }
        let normal = Normal::new(params.charisma_mean, params.charisma_std_dev)
            .map_err(|e| anyhow::anyhow!("Invalid charisma distribution: {}", e))?;
        Ok(Self {
            normal,
            min: params.charisma_min,
            max: params.charisma_max,
        })
    }

    pub fn sample<S: RandomSource + ?Sized>(&self, source: &mut S) -> f64 {
        source.next_normal(&self.normal).clamp(self.min, self.max)
    }
}

/// One agent on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    beliefs: Beliefs,
    charisma: f64,
}

impl Cell {
    /// Fresh cell with no beliefs and a newly sampled charisma.
    pub fn new<S: RandomSource + ?Sized>(charisma: &CharismaDistribution, source: &mut S) -> Self {
        Self::with_charisma(charisma.sample(source))
    }

    pub fn with_charisma(charisma: f64) -> Self {
        Self {
            beliefs: Beliefs::new(),
            charisma,
        }
    }

    pub fn beliefs(&self) -> &Beliefs {
        &self.beliefs
    }

    pub fn charisma(&self) -> f64 {
        self.charisma
    }

    pub fn total_strength(&self) -> f64 {
        self.beliefs.total_strength()
    }

    pub fn dominant_belief(&self) -> Option<char> {
        self.beliefs.dominant()
    }

    /// Writes a belief directly, bypassing normalization and the label cap.
    /// Used for idea injection.
    pub fn set_belief(&mut self, label: char, strength: f64) {
        self.beliefs.set(label, strength);
    }

    /// Strength with which a belief of `strength` held by this cell pushes on
    /// a neighbor: `(strength / S) * (charisma / C)^2`, with `S` and `C` the
    /// influence scales (both 10 by default).
    pub fn influence_strength(&self, strength: f64, params: &SimParams) -> f64 {
        let c = self.charisma / params.influence_charisma_scale;
        (strength / params.influence_strength_scale) * c * c
    }

    /// Applies this cell's beliefs onto `target`, then normalizes and limits
    /// the target's belief set.
    ///
    /// A label the target lacks is adopted at [`ADOPTED_STRENGTH`] when a unit
    /// draw falls below the influence strength (one draw per such label). A
    /// label the target already holds gains the influence strength.
    /// `self` is borrowed immutably, so the traversal always sees the
    /// source's beliefs as they were when the call began.
    pub fn influence<S: RandomSource + ?Sized>(
        &self,
        target: &mut Cell,
        params: &SimParams,
        source: &mut S,
    ) {
        for belief in self.beliefs.iter() {
            let push = self.influence_strength(belief.strength, params);
            match target.beliefs.strength_of(belief.label) {
                Some(existing) => target.beliefs.set(belief.label, existing + push),
                None => {
                    if source.next_unit() < push {
                        target.beliefs.set(belief.label, ADOPTED_STRENGTH);
                    }
                }
            }
        }
        target.beliefs.normalize(params.max_total_strength);
        target.beliefs.limit(params.max_labels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{RngSource, SequenceSource};

    const EPS: f64 = 1e-9;

    fn cell(charisma: f64, beliefs: &[(char, f64)]) -> Cell {
        let mut c = Cell::with_charisma(charisma);
        for &(label, strength) in beliefs {
            c.set_belief(label, strength);
        }
        c
    }

    fn pairs(c: &Cell) -> Vec<(char, f64)> {
        c.beliefs().iter().map(|b| (b.label, b.strength)).collect()
    }

    #[test]
    fn dominant_of_empty_cell_is_none() {
        assert_eq!(Cell::with_charisma(5.0).dominant_belief(), None);
    }

    #[test]
    fn dominant_picks_strongest_and_first_on_ties() {
        assert_eq!(cell(5.0, &[('A', 1.0), ('B', 3.0), ('C', 2.0)]).dominant_belief(), Some('B'));
        assert_eq!(cell(5.0, &[('C', 2.0), ('A', 2.0)]).dominant_belief(), Some('C'));
    }

    #[test]
    fn influence_strength_follows_formula() {
        let params = SimParams::default();
        let src = cell(10.0, &[('A', 5.0)]);
        assert!((src.influence_strength(5.0, &params) - 0.5).abs() < EPS);
        let weak = cell(5.0, &[]);
        assert!((weak.influence_strength(10.0, &params) - 0.25).abs() < EPS);
    }

    #[test]
    fn influence_strength_ignores_caps() {
        let src = cell(10.0, &[('A', 5.0)]);
        let mut params = SimParams::default();
        params.charisma_max = 20.0;
        assert!((src.influence_strength(5.0, &params) - 0.5).abs() < EPS);
        let mut params = SimParams::default();
        params.max_total_strength = 20.0;
        assert!((src.influence_strength(5.0, &params) - 0.5).abs() < EPS);
        let mut params = SimParams::default();
        params.influence_charisma_scale = 20.0;
        assert!((src.influence_strength(5.0, &params) - 0.125).abs() < EPS);
    }

    #[test]
    fn successful_draw_adopts_label_at_unit_strength() {
        let params = SimParams::default();
        let src = cell(10.0, &[('A', 5.0)]);
        let mut target = Cell::with_charisma(3.0);
        let mut draws = SequenceSource::new().with_units([0.49]);
        src.influence(&mut target, &params, &mut draws);
        assert_eq!(pairs(&target), vec![('A', 1.0)]);
        assert_eq!(draws.remaining(), 0);
    }

    #[test]
    fn failed_draw_leaves_target_untouched() {
        let params = SimParams::default();
        let src = cell(10.0, &[('A', 5.0)]);
        let mut target = cell(3.0, &[('B', 2.0)]);
        let mut draws = SequenceSource::new().with_units([0.5]);
        src.influence(&mut target, &params, &mut draws);
        assert_eq!(pairs(&target), vec![('B', 2.0)]);
    }

    #[test]
    fn influence_above_one_always_adopts() {
        // Strength beyond the cap gives a push greater than 1.
        let params = SimParams::default();
        let src = cell(10.0, &[('A', 25.0)]);
        let mut target = Cell::with_charisma(3.0);
        let mut draws = SequenceSource::new().with_units([0.999_999]);
        src.influence(&mut target, &params, &mut draws);
        assert_eq!(target.beliefs().strength_of('A'), Some(1.0));
    }

    #[test]
    fn held_label_is_reinforced_without_a_draw() {
        let params = SimParams::default();
        let src = cell(10.0, &[('A', 5.0)]);
        let mut target = cell(3.0, &[('A', 2.0)]);
        // No scripted draws: consuming one would panic.
        let mut draws = SequenceSource::new();
        src.influence(&mut target, &params, &mut draws);
        assert!((target.beliefs().strength_of('A').unwrap() - 2.5).abs() < EPS);
    }

    #[test]
    fn source_is_not_mutated() {
        let params = SimParams::default();
        let src = cell(8.0, &[('A', 4.0), ('B', 6.0)]);
        let before = src.clone();
        let mut target = cell(3.0, &[('A', 9.0)]);
        let mut draws = SequenceSource::new().with_units([0.0]);
        src.influence(&mut target, &params, &mut draws);
        assert_eq!(src, before);
    }

    #[test]
    fn normalization_rescales_to_cap_preserving_proportions() {
        let mut beliefs = Beliefs::new();
        beliefs.set('A', 3.0);
        beliefs.set('B', 4.5);
        beliefs.set('C', 7.5);
        beliefs.normalize(10.0);
        assert!((beliefs.total_strength() - 10.0).abs() < EPS);
        assert!((beliefs.strength_of('A').unwrap() - 2.0).abs() < EPS);
        assert!((beliefs.strength_of('B').unwrap() - 3.0).abs() < EPS);
        assert!((beliefs.strength_of('C').unwrap() - 5.0).abs() < EPS);
    }

    #[test]
    fn normalization_leaves_small_totals_alone() {
        let mut beliefs = Beliefs::new();
        beliefs.set('A', 4.0);
        beliefs.set('B', 6.0);
        beliefs.normalize(10.0);
        assert_eq!(beliefs.strength_of('A'), Some(4.0));
        assert_eq!(beliefs.strength_of('B'), Some(6.0));
    }

    #[test]
    fn limit_keeps_three_strongest_and_drops_the_rest() {
        let mut beliefs = Beliefs::new();
        for (label, strength) in [('A', 0.5), ('B', 2.0), ('C', 1.0), ('D', 3.0), ('E', 1.5)] {
            beliefs.set(label, strength);
        }
        beliefs.limit(3);
        let kept: Vec<(char, f64)> = beliefs.iter().map(|b| (b.label, b.strength)).collect();
        assert_eq!(kept, vec![('D', 3.0), ('B', 2.0), ('E', 1.5)]);
        assert!(!beliefs.contains('A'));
        assert!(!beliefs.contains('C'));
    }

    #[test]
    fn limit_is_stable_on_ties() {
        let mut beliefs = Beliefs::new();
        for label in ['A', 'B', 'C', 'D'] {
            beliefs.set(label, 1.0);
        }
        beliefs.limit(3);
        let kept: Vec<char> = beliefs.iter().map(|b| b.label).collect();
        assert_eq!(kept, vec!['A', 'B', 'C']);
    }

    #[test]
    fn influence_normalizes_then_limits() {
        let params = SimParams::default();
        // Push per label: (s / 10) * 1.0 at charisma 10.
        let src = cell(10.0, &[('A', 4.0), ('B', 3.0), ('C', 3.0)]);
        let mut target = cell(5.0, &[('D', 6.0), ('E', 5.0), ('A', 1.0)]);
        // B and C are missing from the target: both draws succeed.
        let mut draws = SequenceSource::new().with_units([0.0, 0.0]);
        src.influence(&mut target, &params, &mut draws);

        // Before cleanup: D 6, E 5, A 1.4, B 1, C 1 -> total 14.4.
        let scale = 10.0 / 14.4;
        let kept = pairs(&target);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].0, 'D');
        assert_eq!(kept[1].0, 'E');
        assert_eq!(kept[2].0, 'A');
        assert!((kept[0].1 - 6.0 * scale).abs() < EPS);
        assert!((kept[1].1 - 5.0 * scale).abs() < EPS);
        assert!((kept[2].1 - 1.4 * scale).abs() < EPS);
        // Strength of the discarded labels is not redistributed.
        assert!(target.total_strength() < 10.0);
    }

    #[test]
    fn caps_hold_under_repeated_random_influence() {
        let params = SimParams::default();
        let mut rng = RngSource::seeded(11);
        let src = cell(9.0, &[('A', 3.0), ('B', 3.0), ('C', 4.0)]);
        let other = cell(7.0, &[('D', 5.0), ('E', 5.0)]);
        let mut target = Cell::with_charisma(2.0);
        for _ in 0..200 {
            src.influence(&mut target, &params, &mut rng);
            other.influence(&mut target, &params, &mut rng);
            assert!(target.beliefs().len() <= params.max_labels);
            assert!(target.total_strength() <= params.max_total_strength + 1e-9);
        }
    }

    #[test]
    fn charisma_is_clamped() {
        let params = SimParams::default();
        let dist = CharismaDistribution::from_params(&params).unwrap();
        let mut draws = SequenceSource::new().with_normals([-3.0, 14.0, 6.5]);
        assert_eq!(Cell::new(&dist, &mut draws).charisma(), 1.0);
        assert_eq!(Cell::new(&dist, &mut draws).charisma(), 10.0);
        assert_eq!(Cell::new(&dist, &mut draws).charisma(), 6.5);
    }

    #[test]
    fn sampled_charisma_stays_in_range() {
        let params = SimParams::default();
        let dist = CharismaDistribution::from_params(&params).unwrap();
        let mut rng = RngSource::seeded(5);
        for _ in 0..1000 {
            let c = dist.sample(&mut rng);
            assert!((1.0..=10.0).contains(&c));
        }
    }

    #[test]
    fn invalid_charisma_distribution_is_rejected() {
        let mut params = SimParams::default();
        params.charisma_std_dev = f64::NAN;
        assert!(CharismaDistribution::from_params(&params).is_err());
    }

    #[test]
    fn display_lists_beliefs_one_per_line() {
        let c = cell(5.0, &[('A', 1.0), ('B', 2.345)]);
        assert_eq!(c.beliefs().to_string(), "A: 1.0\nB: 2.3");
    }
}

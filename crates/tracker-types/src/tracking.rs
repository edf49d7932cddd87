//! Stage sequence state machine and tracking record types.
//!
//! The sequence keeps one `active` flag per stage. Active stages are expected
//! to form a contiguous prefix; the transitions below always produce such a
//! prefix, while records received from the tracking service are applied as
//! they are and may break it.

use crate::stage::{Stage, StageKey, StageLayout};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of the last active stage, `None` when no stage is active.
pub type Frontier = Option<usize>;

/// Remote representation of an order's progress: stage key to completion flag.
///
/// Keys absent from the record are treated as not completed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingRecord(BTreeMap<String, bool>);

impl TrackingRecord {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the flag stored for `key`, `false` when absent.
	pub fn get(&self, key: &str) -> bool {
		self.0.get(key).copied().unwrap_or(false)
	}

	pub fn insert(&mut self, key: impl Into<String>, active: bool) {
		self.0.insert(key.into(), active);
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
		self.0.iter().map(|(k, v)| (k.as_str(), *v))
	}
}

impl<K: Into<String>> FromIterator<(K, bool)> for TrackingRecord {
	fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
	}
}

/// Outcome of a single step of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
	/// The frontier moved forward.
	Advanced { from: Frontier, to: Frontier },
	/// The frontier moved back.
	Retreated { from: Frontier, to: Frontier },
	/// Nothing changed.
	Unchanged,
}

impl Transition {
	/// Returns true when the flags were rewritten.
	pub fn is_changed(&self) -> bool {
		!matches!(self, Transition::Unchanged)
	}
}

/// Ordered, fixed-length list of production stages for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSequence {
	layout: StageLayout,
	stages: Vec<Stage>,
}

impl StageSequence {
	/// Creates a sequence with every stage inactive.
	pub fn new(layout: StageLayout) -> Self {
		Self {
			layout,
			stages: layout.keys().into_iter().map(Stage::new).collect(),
		}
	}

	/// Creates a sequence whose first `frontier + 1` stages are active.
	///
	/// A frontier past the end is clamped to the last stage.
	pub fn at_frontier(layout: StageLayout, frontier: Frontier) -> Self {
		let mut sequence = Self::new(layout);
		let last = sequence.stages.len() - 1;
		sequence.set_frontier(frontier.map(|f| f.min(last)));
		sequence
	}

	/// Creates a sequence from a remote record.
	pub fn from_record(layout: StageLayout, record: &TrackingRecord) -> Self {
		let mut sequence = Self::new(layout);
		sequence.apply_record(record);
		sequence
	}

	pub fn layout(&self) -> StageLayout {
		self.layout
	}

	pub fn stages(&self) -> &[Stage] {
		&self.stages
	}

	pub fn len(&self) -> usize {
		self.stages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}

	/// Position of the stage with `key`, if the layout contains it.
	pub fn position(&self, key: StageKey) -> Option<usize> {
		self.stages.iter().position(|stage| stage.key == key)
	}

	/// Highest index whose stage is active.
	///
	/// On a sequence that is not prefix-closed this is still the highest
	/// active index, so the stages after a gap define the frontier.
	pub fn last_active(&self) -> Frontier {
		self.stages.iter().rposition(|stage| stage.active)
	}

	/// Moves the frontier one stage forward.
	///
	/// Every stage up to the new frontier becomes active and every later
	/// stage inactive. At the terminal stage this is a no-op.
	pub fn advance(&mut self) -> Transition {
		let from = self.last_active();
		let to = match from {
			Some(index) if index + 1 >= self.stages.len() => return Transition::Unchanged,
			Some(index) => index + 1,
			None => 0,
		};

		self.set_frontier(Some(to));
		Transition::Advanced { from, to: Some(to) }
	}

	/// Moves the frontier one stage back.
	///
	/// No-op when nothing or only the first stage is active.
	pub fn retreat(&mut self) -> Transition {
		let from = self.last_active();
		match from {
			Some(index) if index > 0 => {
				let to = Some(index - 1);
				self.set_frontier(to);
				Transition::Retreated { from, to }
			},
			_ => Transition::Unchanged,
		}
	}

	/// Replaces every flag with the value stored in `record`.
	pub fn apply_record(&mut self, record: &TrackingRecord) {
		for stage in &mut self.stages {
			stage.active = record.get(stage.key.as_str());
		}

		for (key, _) in record.iter() {
			if key.parse::<StageKey>().map_or(true, |k| self.position(k).is_none()) {
				tracing::debug!("Ignoring unknown tracking key '{}'", key);
			}
		}
	}

	/// Builds the flat record uploaded to the tracking service.
	pub fn to_record(&self) -> TrackingRecord {
		self.stages
			.iter()
			.map(|stage| (stage.key.as_str(), stage.active))
			.collect()
	}

	pub fn active_count(&self) -> usize {
		self.stages.iter().filter(|stage| stage.active).count()
	}

	/// Share of active stages, from 0 to 100.
	pub fn progress_percent(&self) -> f64 {
		if self.stages.is_empty() {
			return 0.0;
		}
		self.active_count() as f64 / self.stages.len() as f64 * 100.0
	}

	/// True when the stage at `index` is the last element of the active run.
	pub fn is_current(&self, index: usize) -> bool {
		match self.stages.get(index) {
			Some(stage) if stage.active => self.stages[index + 1..].iter().all(|s| !s.active),
			_ => false,
		}
	}

	/// The stage at the frontier.
	pub fn current_stage(&self) -> Option<&Stage> {
		self.last_active().map(|index| &self.stages[index])
	}

	/// True once the terminal stage is active.
	pub fn is_complete(&self) -> bool {
		self.stages.last().is_some_and(|stage| stage.active)
	}

	/// True when the active stages form a contiguous run from the start.
	pub fn is_prefix_closed(&self) -> bool {
		match self.last_active() {
			Some(index) => self.stages[..=index].iter().all(|stage| stage.active),
			None => true,
		}
	}

	fn set_frontier(&mut self, frontier: Frontier) {
		for (index, stage) in self.stages.iter_mut().enumerate() {
			stage.active = frontier.is_some_and(|f| index <= f);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn flags(sequence: &StageSequence) -> Vec<bool> {
		sequence.stages().iter().map(|s| s.active).collect()
	}

	#[test]
	fn test_new_sequence_is_inactive() {
		let sequence = StageSequence::new(StageLayout::Standard);
		assert_eq!(sequence.len(), 9);
		assert_eq!(sequence.last_active(), None);
		assert_eq!(sequence.progress_percent(), 0.0);
		assert!(sequence.current_stage().is_none());
	}

	#[test]
	fn test_first_advance_activates_order_slip() {
		let mut sequence = StageSequence::new(StageLayout::Standard);

		let transition = sequence.advance();

		assert_eq!(transition, Transition::Advanced { from: None, to: Some(0) });
		assert_eq!(flags(&sequence), vec![true, false, false, false, false, false, false, false, false]);
		assert!((sequence.progress_percent() - 100.0 / 9.0).abs() < 1e-9);
		assert_eq!(sequence.current_stage().map(|s| s.key), Some(StageKey::OrderSlip));
	}

	#[test]
	fn test_advance_then_retreat_from_job_card() {
		let mut sequence = StageSequence::at_frontier(StageLayout::Standard, Some(1));

		sequence.advance();
		assert_eq!(sequence.last_active(), Some(2));
		assert_eq!(sequence.current_stage().map(|s| s.key), Some(StageKey::PaperCutting));

		let transition = sequence.retreat();
		assert_eq!(transition, Transition::Retreated { from: Some(2), to: Some(1) });
		assert_eq!(sequence.current_stage().map(|s| s.key), Some(StageKey::JobCard));
	}

	#[test]
	fn test_advance_is_idempotent_at_terminal() {
		let mut sequence = StageSequence::at_frontier(StageLayout::Standard, Some(8));
		let before = sequence.clone();

		assert_eq!(sequence.advance(), Transition::Unchanged);
		assert_eq!(sequence, before);
		assert_eq!(sequence.progress_percent(), 100.0);
		assert!(sequence.is_complete());
	}

	#[test]
	fn test_retreat_is_idempotent_at_initial() {
		let mut sequence = StageSequence::new(StageLayout::Standard);
		assert_eq!(sequence.retreat(), Transition::Unchanged);
		assert_eq!(sequence, StageSequence::new(StageLayout::Standard));
	}

	#[test]
	fn test_retreat_keeps_first_stage() {
		let mut sequence = StageSequence::at_frontier(StageLayout::Standard, Some(0));
		assert_eq!(sequence.retreat(), Transition::Unchanged);
		assert_eq!(sequence.last_active(), Some(0));
	}

	#[test]
	fn test_single_step_frontier_moves() {
		for start in 0..9usize {
			let mut forward = StageSequence::at_frontier(StageLayout::Standard, Some(start));
			forward.advance();
			assert_eq!(forward.last_active(), Some((start + 1).min(8)));

			let mut backward = StageSequence::at_frontier(StageLayout::Standard, Some(start));
			backward.retreat();
			let expected = if start == 0 { 0 } else { start - 1 };
			assert_eq!(backward.last_active(), Some(expected));
		}
	}

	#[test]
	fn test_non_prefix_record_is_corrected_by_advance() {
		let record: TrackingRecord = [("jobCard", true), ("printing", true)].into_iter().collect();
		let mut sequence = StageSequence::from_record(StageLayout::Standard, &record);
		assert!(!sequence.is_prefix_closed());
		assert_eq!(sequence.last_active(), Some(4));

		sequence.advance();

		// Highest active stage (printing) defines the frontier.
		assert!(sequence.is_prefix_closed());
		assert_eq!(sequence.last_active(), Some(5));
		assert_eq!(flags(&sequence), vec![true, true, true, true, true, true, false, false, false]);
	}

	#[test]
	fn test_non_prefix_record_is_corrected_by_retreat() {
		let record: TrackingRecord = [("orderSlip", true), ("delivery", true)].into_iter().collect();
		let mut sequence = StageSequence::from_record(StageLayout::Standard, &record);

		sequence.retreat();

		assert!(sequence.is_prefix_closed());
		assert_eq!(sequence.last_active(), Some(5));
	}

	#[test]
	fn test_transitions_always_produce_prefix() {
		// Every non-terminal flag combination of the standard layout.
		for mask in 0u32..(1 << 8) {
			let record: TrackingRecord = StageKey::all()
				.take(8)
				.enumerate()
				.map(|(i, key)| (key.as_str(), mask & (1 << i) != 0))
				.collect();

			let mut forward = StageSequence::from_record(StageLayout::Standard, &record);
			forward.advance();
			assert!(forward.is_prefix_closed(), "advance from mask {:#b}", mask);

			let mut backward = StageSequence::from_record(StageLayout::Standard, &record);
			backward.retreat();
			assert!(backward.is_prefix_closed(), "retreat from mask {:#b}", mask);
		}
	}

	#[test]
	fn test_record_round_trip() {
		let sequence = StageSequence::at_frontier(StageLayout::Standard, Some(3));
		let record = sequence.to_record();

		assert_eq!(record.len(), 9);
		assert!(record.get("platePreparation"));
		assert!(!record.get("printing"));
		assert_eq!(StageSequence::from_record(StageLayout::Standard, &record), sequence);
	}

	#[test]
	fn test_missing_keys_default_to_inactive() {
		let record: TrackingRecord = [("orderSlip", true), ("unknownStage", true)].into_iter().collect();
		let sequence = StageSequence::from_record(StageLayout::Standard, &record);
		assert_eq!(sequence.active_count(), 1);
	}

	#[test]
	fn test_is_current_marks_last_of_prefix() {
		let sequence = StageSequence::at_frontier(StageLayout::Standard, Some(2));
		let current: Vec<usize> = (0..sequence.len()).filter(|i| sequence.is_current(*i)).collect();
		assert_eq!(current, vec![2]);
		assert!(!sequence.is_current(42));
	}

	#[test]
	fn test_without_invoice_layout_never_writes_invoice() {
		let mut sequence = StageSequence::new(StageLayout::WithoutInvoice);
		for _ in 0..20 {
			sequence.advance();
		}
		let record = sequence.to_record();

		assert_eq!(record.len(), 8);
		assert!(!record.contains_key("invoice"));
		assert!(sequence.is_complete());
		assert_eq!(sequence.position(StageKey::Invoice), None);
	}

	#[test]
	fn test_record_json_shape() {
		let record: TrackingRecord = [("orderSlip", true), ("jobCard", false)].into_iter().collect();
		let json = serde_json::to_value(&record).unwrap();
		assert_eq!(json, serde_json::json!({ "orderSlip": true, "jobCard": false }));
	}
}

//! Production stage types.
//!
//! A print order moves through a fixed list of production stages. The key of
//! each stage is what the tracking service stores, so the strings here must
//! match the existing backend records exactly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a single production stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageKey {
	OrderSlip,
	JobCard,
	PaperCutting,
	PlatePreparation,
	Printing,
	PostPress,
	Delivery,
	Invoice,
	End,
}

impl StageKey {
	/// Returns the wire key used by the tracking service.
	pub fn as_str(&self) -> &'static str {
		match self {
			StageKey::OrderSlip => "orderSlip",
			StageKey::JobCard => "jobCard",
			StageKey::PaperCutting => "paperCutting",
			StageKey::PlatePreparation => "platePreparation",
			StageKey::Printing => "printing",
			StageKey::PostPress => "postPress",
			StageKey::Delivery => "delivery",
			StageKey::Invoice => "invoice",
			StageKey::End => "end",
		}
	}

	/// Returns the human readable label shown in the progress view.
	pub fn display_name(&self) -> &'static str {
		match self {
			StageKey::OrderSlip => "Order Slip",
			StageKey::JobCard => "Job Card",
			StageKey::PaperCutting => "Paper Cutting",
			StageKey::PlatePreparation => "Plate Preparation",
			StageKey::Printing => "Printing",
			StageKey::PostPress => "Post Press",
			StageKey::Delivery => "Delivery",
			StageKey::Invoice => "Invoice",
			StageKey::End => "End",
		}
	}

	/// Returns an iterator over all stage keys in production order.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::OrderSlip,
			Self::JobCard,
			Self::PaperCutting,
			Self::PlatePreparation,
			Self::Printing,
			Self::PostPress,
			Self::Delivery,
			Self::Invoice,
			Self::End,
		]
		.into_iter()
	}
}

impl fmt::Display for StageKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for StageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|key| key.as_str() == s).ok_or(())
	}
}

/// Which stage table a sequence is built from.
///
/// `Standard` is the canonical nine-stage table. `WithoutInvoice` is the
/// older eight-stage table that one screen of the ERP still used; it is kept
/// for compatibility with records written by that screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageLayout {
	#[default]
	Standard,
	WithoutInvoice,
}

impl StageLayout {
	/// Returns the stage keys of this layout in production order.
	pub fn keys(&self) -> Vec<StageKey> {
		match self {
			StageLayout::Standard => StageKey::all().collect(),
			StageLayout::WithoutInvoice => StageKey::all()
				.filter(|key| *key != StageKey::Invoice)
				.collect(),
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			StageLayout::Standard => "standard",
			StageLayout::WithoutInvoice => "without_invoice",
		}
	}
}

impl FromStr for StageLayout {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"standard" => Ok(Self::Standard),
			"without_invoice" => Ok(Self::WithoutInvoice),
			other => Err(format!("unknown stage layout '{}'", other)),
		}
	}
}

/// One production checkpoint and whether it has been passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
	/// Display label.
	pub name: String,
	/// Stable identifier used on the wire.
	pub key: StageKey,
	/// Whether the stage has been completed.
	pub active: bool,
}

impl Stage {
	/// Creates an inactive stage for the given key.
	pub fn new(key: StageKey) -> Self {
		Self {
			name: key.display_name().to_string(),
			key,
			active: false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_stage_table_order_and_names() {
		let table: Vec<(&str, &str)> = StageKey::all()
			.map(|k| (k.as_str(), k.display_name()))
			.collect();

		assert_eq!(
			table,
			vec![
				("orderSlip", "Order Slip"),
				("jobCard", "Job Card"),
				("paperCutting", "Paper Cutting"),
				("platePreparation", "Plate Preparation"),
				("printing", "Printing"),
				("postPress", "Post Press"),
				("delivery", "Delivery"),
				("invoice", "Invoice"),
				("end", "End"),
			]
		);
	}

	#[test]
	fn test_key_parsing() {
		for key in StageKey::all() {
			assert_eq!(key.as_str().parse::<StageKey>(), Ok(key));
		}
		assert!("OrderSlip".parse::<StageKey>().is_err());
	}

	#[test]
	fn test_serde_uses_wire_keys() {
		let json = serde_json::to_string(&StageKey::PlatePreparation).unwrap();
		assert_eq!(json, "\"platePreparation\"");
	}

	#[test]
	fn test_layouts() {
		assert_eq!(StageLayout::Standard.keys().len(), 9);

		let short = StageLayout::WithoutInvoice.keys();
		assert_eq!(short.len(), 8);
		assert!(!short.contains(&StageKey::Invoice));
		assert_eq!(short.last(), Some(&StageKey::End));

		assert_eq!(
			"without_invoice".parse::<StageLayout>(),
			Ok(StageLayout::WithoutInvoice)
		);
		assert!("short".parse::<StageLayout>().is_err());
	}
}

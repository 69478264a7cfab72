//! Confidence-tier labels.
//!
//! Two concerns live here: the textual rename of the four legacy label
//! tokens to their current names, and the ordered [`Confidence`] tier
//! used by the reclassifier. Tier moves are explicit clamped steps on the
//! enum rather than chained text substitutions, so the net effect is the
//! same for every starting label.

use std::fmt;

/// Legacy label tokens and their current names, in rewrite order.
const RENAMES: [(&str, &str); 4] = [
    ("StrongEvidence", "HighConf"),
    ("WeakEvidence", "MedConf"),
    ("NeutralEvidence", "LowConf"),
    ("LikelyFalsePositive", "Unclassified"),
];

/// Rename the four legacy confidence tokens wherever they appear in a
/// line (header or data). Idempotent: the renamed tokens no longer match
/// any legacy token, so a second application is a no-op.
pub fn rename_legacy_labels(line: &str) -> String {
    let mut out = line.to_string();
    for (legacy, current) in RENAMES {
        if out.contains(legacy) {
            out = out.replace(legacy, current);
        }
    }
    out
}

/// Confidence tier of a variant call, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Unclassified,
    LowConf,
    MedConf,
    HighConf,
}

impl Confidence {
    const LADDER: [Confidence; 4] = [
        Confidence::Unclassified,
        Confidence::LowConf,
        Confidence::MedConf,
        Confidence::HighConf,
    ];

    /// The label token written into the FILTER field.
    pub fn token(self) -> &'static str {
        match self {
            Confidence::Unclassified => "Unclassified",
            Confidence::LowConf => "LowConf",
            Confidence::MedConf => "MedConf",
            Confidence::HighConf => "HighConf",
        }
    }

    /// Parse a single label token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::LADDER.into_iter().find(|t| t.token() == token)
    }

    /// Find the tier token attached to a FILTER field
    /// (tokens are `;`- or space-joined).
    pub fn from_filters(filters: &str) -> Option<Self> {
        filters
            .split(|c| c == ';' || c == ' ')
            .find_map(Self::from_token)
    }

    /// Move up `tiers` steps, clamped at HighConf.
    pub fn promote(self, tiers: usize) -> Self {
        let idx = (self as usize + tiers).min(Self::LADDER.len() - 1);
        Self::LADDER[idx]
    }

    /// Move down `tiers` steps, clamped at Unclassified.
    pub fn demote(self, tiers: usize) -> Self {
        let idx = (self as usize).saturating_sub(tiers);
        Self::LADDER[idx]
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

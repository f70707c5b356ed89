//! Diagnostic output types: RMS readings, rules, diagnosis text, severity

use serde::{Serialize, Serializer};

use super::{Axis, Sample};

/// Diagnosis text for a row where no rule fired.
pub const NORMAL_LABEL: &str = "Normal";

/// Separator between triggered rule messages.
pub const RULE_SEPARATOR: &str = "; ";

/// Trailing-window RMS of each axis at one sample.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Default)]
pub struct RmsReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl RmsReading {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

// ============================================================================
// Rules
// ============================================================================

/// The fixed diagnostic heuristics, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// X or Y RMS above its warning threshold
    RadialOverWarning,
    /// Z RMS above its warning threshold
    AxialOverWarning,
    /// |X RMS - Y RMS| above the asymmetry limit
    RadialAsymmetry,
}

impl Rule {
    pub const ORDERED: [Rule; 3] = [
        Rule::RadialOverWarning,
        Rule::AxialOverWarning,
        Rule::RadialAsymmetry,
    ];

    pub fn message(self) -> &'static str {
        match self {
            Rule::RadialOverWarning => "radial RMS over warning — possible unbalance/misalignment",
            Rule::AxialOverWarning => "axial RMS over warning — possible axial load/misalignment",
            Rule::RadialAsymmetry => "radial asymmetry — possible looseness",
        }
    }

    /// Human-readable condition, as printed in the report rule block
    pub fn condition(self) -> &'static str {
        match self {
            Rule::RadialOverWarning => "X RMS or Y RMS > 85% warning threshold",
            Rule::AxialOverWarning => "Z RMS > 85% warning threshold",
            Rule::RadialAsymmetry => "|X RMS − Y RMS| > 0.2",
        }
    }
}

/// The four lines of rule text reproduced in every report.
pub fn rule_text() -> Vec<String> {
    let mut lines: Vec<String> = Rule::ORDERED
        .iter()
        .map(|rule| format!("{} → {}", rule.condition(), rule.message()))
        .collect();
    lines.push(format!("No rule triggered → {NORMAL_LABEL}"));
    lines
}

// ============================================================================
// Diagnosis
// ============================================================================

/// Ordered list of triggered rules for one sample.
///
/// Renders as "Normal" when empty, otherwise the rule messages joined by "; ".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diagnosis {
    triggered: Vec<Rule>,
}

impl Diagnosis {
    pub fn normal() -> Self {
        Self::default()
    }

    /// Build from triggered rules. Rules are kept in canonical order.
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        let fired: Vec<Rule> = rules.into_iter().collect();
        let triggered = Rule::ORDERED
            .iter()
            .copied()
            .filter(|r| fired.contains(r))
            .collect();
        Self { triggered }
    }

    pub fn is_normal(&self) -> bool {
        self.triggered.is_empty()
    }

    pub fn triggered(&self) -> &[Rule] {
        &self.triggered
    }

    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.triggered.is_empty() {
            return f.write_str(NORMAL_LABEL);
        }
        let joined = self
            .triggered
            .iter()
            .map(|r| r.message())
            .collect::<Vec<_>>()
            .join(RULE_SEPARATOR);
        f.write_str(&joined)
    }
}

impl Serialize for Diagnosis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Display tier derived from both thresholds. Never changes the diagnosis text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
pub enum Severity {
    #[default]
    Normal,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Normal => "Normal",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sample with its RMS reading, diagnosis and severity attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosedSample {
    pub sample: Sample,
    pub rms: RmsReading,
    pub diagnosis: Diagnosis,
    pub severity: Severity,
}

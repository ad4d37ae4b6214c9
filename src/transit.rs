use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Minor,
    Significant,
}

impl Severity {
    pub fn hex_color(self) -> &'static str {
        match self {
            Severity::Normal => "#10b981",
            Severity::Minor => "#f59e0b",
            Severity::Significant => "#ef4444",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct TransitStatus {
    pub label: &'static str,
    pub severity: Severity,
    pub alerts: &'static [&'static str],
}

pub const STATUSES: [TransitStatus; 3] = [
    TransitStatus {
        label: "All Lines Operating Normally",
        severity: Severity::Normal,
        alerts: &["No major delays reported."],
    },
    TransitStatus {
        label: "Minor Delays on Central Line",
        severity: Severity::Minor,
        alerts: &[
            "Central Line: 5-10 minute delays due to signal work.",
            "Metro North: Running on schedule.",
        ],
    },
    TransitStatus {
        label: "Significant Delays on Express Line",
        severity: Severity::Significant,
        alerts: &[
            "Express Line: Major disruption due to switch failure.",
            "Bus Route 42: Detoured due to road closure.",
        ],
    },
];

/// Simulated feed: each refresh picks a status uniformly at random.
pub fn refresh<R: Rng + ?Sized>(rng: &mut R) -> &'static TransitStatus {
    &STATUSES[rng.gen_range(0..STATUSES.len())]
}

use serde::Serialize;

/// Badge tier derived from a cumulative green score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Badge {
    EcoLeader,
    EcoWarrior,
    SustainabilityChampion,
    GreenEnthusiast,
    EcoBeginner,
}

impl Badge {
    /// Thresholds are checked top-down; the first match wins.
    pub fn for_score(score: u64) -> Self {
        match score {
            s if s >= 150 => Badge::EcoLeader,
            s if s > 100 => Badge::EcoWarrior,
            s if s > 50 => Badge::SustainabilityChampion,
            s if s > 20 => Badge::GreenEnthusiast,
            _ => Badge::EcoBeginner,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Badge::EcoLeader => "Eco leader",
            Badge::EcoWarrior => "♻ Eco Warrior",
            Badge::SustainabilityChampion => "🌎 Sustainability Champion",
            Badge::GreenEnthusiast => "🌿 Green Enthusiast",
            Badge::EcoBeginner => "🌱 Eco Beginner",
        }
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubjectCategory {
    Core,
    Arts,
    Sciences,
    Commercial,
    Vocational,
}

impl SubjectCategory {
    pub const ALL: [SubjectCategory; 5] = [
        Self::Core,
        Self::Arts,
        Self::Sciences,
        Self::Commercial,
        Self::Vocational,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Core => "Core",
            Self::Arts => "Arts",
            Self::Sciences => "Sciences",
            Self::Commercial => "Commercial",
            Self::Vocational => "Vocational",
        }
    }
}

impl fmt::Display for SubjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const SUBJECTS: &[(&str, SubjectCategory)] = &[
    ("English Language", SubjectCategory::Core),
    ("Mathematics", SubjectCategory::Core),
    ("Civic Education", SubjectCategory::Core),
    ("Basic Science", SubjectCategory::Core),
    ("Basic Technology", SubjectCategory::Core),
    ("Social Studies", SubjectCategory::Core),
    ("Computer Studies", SubjectCategory::Core),
    ("Physical and Health Education", SubjectCategory::Core),
    ("Literature in English", SubjectCategory::Arts),
    ("Government", SubjectCategory::Arts),
    ("History", SubjectCategory::Arts),
    ("Christian Religious Studies", SubjectCategory::Arts),
    ("Islamic Religious Studies", SubjectCategory::Arts),
    ("Yoruba", SubjectCategory::Arts),
    ("Igbo", SubjectCategory::Arts),
    ("Hausa", SubjectCategory::Arts),
    ("French", SubjectCategory::Arts),
    ("Fine Arts", SubjectCategory::Arts),
    ("Music", SubjectCategory::Arts),
    ("Physics", SubjectCategory::Sciences),
    ("Chemistry", SubjectCategory::Sciences),
    ("Biology", SubjectCategory::Sciences),
    ("Further Mathematics", SubjectCategory::Sciences),
    ("Geography", SubjectCategory::Sciences),
    ("Agricultural Science", SubjectCategory::Sciences),
    ("Technical Drawing", SubjectCategory::Sciences),
    ("Economics", SubjectCategory::Commercial),
    ("Commerce", SubjectCategory::Commercial),
    ("Financial Accounting", SubjectCategory::Commercial),
    ("Business Studies", SubjectCategory::Commercial),
    ("Office Practice", SubjectCategory::Commercial),
    ("Home Economics", SubjectCategory::Vocational),
    ("Food and Nutrition", SubjectCategory::Vocational),
    ("Catering Craft", SubjectCategory::Vocational),
    ("Garment Making", SubjectCategory::Vocational),
    ("Data Processing", SubjectCategory::Vocational),
    ("Marketing", SubjectCategory::Vocational),
];

pub fn known_subjects() -> impl Iterator<Item = &'static str> {
    SUBJECTS.iter().map(|(name, _)| *name)
}

/// Case- and whitespace-insensitive lookup of a subject's reporting bucket.
pub fn categorize_subject(name: &str) -> Option<SubjectCategory> {
    let wanted = normalize(name);
    SUBJECTS
        .iter()
        .find(|(subject, _)| normalize(subject) == wanted)
        .map(|(_, category)| *category)
}

pub fn subjects_in(category: SubjectCategory) -> Vec<&'static str> {
    SUBJECTS
        .iter()
        .filter(|(_, c)| *c == category)
        .map(|(name, _)| *name)
        .collect()
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

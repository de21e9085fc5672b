use once_cell::sync::Lazy;
use regex::Regex;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+234|0)[789][01]\d{8}$").expect("valid phone regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static ACADEMIC_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})/(\d{4})$").expect("valid academic year regex"));
static ADMISSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{2,5}/\d{4}/\d{3,4}$").expect("valid admission number regex")
});

pub const NIGERIAN_STATES: [&str; 37] = [
    "Abia",
    "Adamawa",
    "Akwa Ibom",
    "Anambra",
    "Bauchi",
    "Bayelsa",
    "Benue",
    "Borno",
    "Cross River",
    "Delta",
    "Ebonyi",
    "Edo",
    "Ekiti",
    "Enugu",
    "FCT",
    "Gombe",
    "Imo",
    "Jigawa",
    "Kaduna",
    "Kano",
    "Katsina",
    "Kebbi",
    "Kogi",
    "Kwara",
    "Lagos",
    "Nasarawa",
    "Niger",
    "Ogun",
    "Ondo",
    "Osun",
    "Oyo",
    "Plateau",
    "Rivers",
    "Sokoto",
    "Taraba",
    "Yobe",
    "Zamfara",
];

pub const CLASS_LEVELS: [&str; 6] = ["JSS1", "JSS2", "JSS3", "SSS1", "SSS2", "SSS3"];

pub const TERM_NAMES: [&str; 3] = ["First Term", "Second Term", "Third Term"];

/// Accepts `+234` or `0` followed by a 7/8/9 network digit, 0/1, and 8 more digits.
/// Spaces and dashes are ignored.
pub fn validate_phone(phone: &str) -> bool {
    let compact: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    PHONE_RE.is_match(&compact)
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// School prefix, intake year and serial, e.g. `GSS/2024/017`.
pub fn validate_admission_number(admission_number: &str) -> bool {
    ADMISSION_RE.is_match(admission_number.trim())
}

/// `2024/2025` style labels where the second year follows the first.
pub fn validate_academic_year(label: &str) -> bool {
    let Some(caps) = ACADEMIC_YEAR_RE.captures(label.trim()) else {
        return false;
    };
    match (caps[1].parse::<i32>(), caps[2].parse::<i32>()) {
        (Ok(start), Ok(end)) => end == start + 1,
        _ => false,
    }
}

pub fn is_valid_state(state: &str) -> bool {
    let state = state.trim();
    NIGERIAN_STATES.iter().any(|s| s.eq_ignore_ascii_case(state))
}

/// Normalizes `jss 1`, `Jss1` and similar spellings to the canonical level.
pub fn normalize_class_level(class_level: &str) -> Option<&'static str> {
    let compact: String = class_level
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    CLASS_LEVELS.iter().copied().find(|level| *level == compact)
}

pub fn is_valid_class_level(class_level: &str) -> bool {
    normalize_class_level(class_level).is_some()
}

pub fn is_valid_term_name(term: &str) -> bool {
    let term = term.trim();
    TERM_NAMES.iter().any(|t| t.eq_ignore_ascii_case(term))
}

//! Per-value recoding rules for individual EPC fields.
//!
//! Each rule maps one raw, non-missing cell to a [`CellOutcome`]. Whether an
//! unparsed cell is kept or blanked is decided by the column's
//! [`UnparsedPolicy`], never by the rule itself.

/// Result of recoding a single cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellOutcome {
    /// The cell was recognized and has this canonical form.
    Value(String),
    /// The cell is explicitly absent.
    Missing,
    /// The cell could not be coerced; carries the value as seen by the rule.
    Unparsed(String),
}

/// What to do with a cell the rule could not coerce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnparsedPolicy {
    /// Keep the value the rule saw.
    PassThrough,
    /// Replace the value with a missing marker.
    Substitute,
}

impl CellOutcome {
    /// Resolve the outcome into a cell value under `policy`.
    pub fn resolve(self, policy: UnparsedPolicy) -> Option<String> {
        match (self, policy) {
            (CellOutcome::Value(v), _) => Some(v),
            (CellOutcome::Missing, _) => None,
            (CellOutcome::Unparsed(v), UnparsedPolicy::PassThrough) => Some(v),
            (CellOutcome::Unparsed(_), UnparsedPolicy::Substitute) => None,
        }
    }

    pub fn is_unparsed(&self) -> bool {
        matches!(self, CellOutcome::Unparsed(_))
    }
}

// =============================================================================
// Construction age band
// =============================================================================

/// Locale prefix carried by some age-band exports.
pub const AGE_BAND_LOCALE_PREFIX: &str = "England and Wales: ";

/// Label for every year from 2007, including the post-2007 bands the source
/// publishes inconsistently.
pub const RECENT_AGE_BAND: &str = "2007 onwards";

/// Label for years before 1900.
pub const EARLIEST_AGE_BAND: &str = "before 1900";

/// Inclusive upper year of each band, in ascending order.
const AGE_BANDS: [(i64, &str); 10] = [
    (1899, EARLIEST_AGE_BAND),
    (1929, "1900-1929"),
    (1949, "1930-1949"),
    (1966, "1950-1966"),
    (1975, "1967-1975"),
    (1982, "1976-1982"),
    (1990, "1983-1990"),
    (1995, "1991-1995"),
    (2002, "1996-2002"),
    (2006, "2003-2006"),
];

/// Free-text bands folded into [`RECENT_AGE_BAND`].
const RECENT_ALIASES: [&str; 2] = ["2012 onwards", "2007-2011"];

/// Band label for a construction year.
pub fn age_band_for_year(year: i64) -> &'static str {
    AGE_BANDS
        .iter()
        .find(|(upper, _)| year <= *upper)
        .map(|(_, label)| *label)
        .unwrap_or(RECENT_AGE_BAND)
}

/// Check if a string is already one of the canonical band labels.
pub fn is_canonical_age_band(value: &str) -> bool {
    value == RECENT_AGE_BAND || AGE_BANDS.iter().any(|(_, label)| *label == value)
}

/// Recode a construction age band or year into one of the fixed bands.
///
/// ```rust,ignore
/// assert_eq!(clean_age_band("1925"), CellOutcome::Value("1900-1929".into()));
/// assert_eq!(clean_age_band("England and Wales: 2012 onwards"),
///            CellOutcome::Value("2007 onwards".into()));
/// ```
pub fn clean_age_band(raw: &str) -> CellOutcome {
    let value = raw.replace(AGE_BAND_LOCALE_PREFIX, "");

    if RECENT_ALIASES.contains(&value.as_str()) {
        return CellOutcome::Value(RECENT_AGE_BAND.to_string());
    }

    match parse_year(&value) {
        Some(year) => CellOutcome::Value(age_band_for_year(year).to_string()),
        None if is_canonical_age_band(&value) => CellOutcome::Value(value),
        None => CellOutcome::Unparsed(value),
    }
}

/// Integer years, also accepting the `"1925.0"` form numeric columns print as.
fn parse_year(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if let Ok(year) = trimmed.parse::<i64>() {
        return Some(year);
    }
    match trimmed.parse::<f64>() {
        Ok(year) if year.is_finite() && year.fract() == 0.0 => Some(year as i64),
        _ => None,
    }
}

// =============================================================================
// Floor level
// =============================================================================

pub const GROUND_FLOOR: &str = "0";
pub const BASEMENT: &str = "basement";
pub const TOP_FLOOR_BAND: &str = "above 20th";

/// English ordinal for a floor number; ground (0) and -1 stay plain digits.
pub fn floor_ordinal(level: i64) -> String {
    if level == 0 || level == -1 {
        return level.to_string();
    }
    let magnitude = level.unsigned_abs();
    let suffix = if (11..=13).contains(&(magnitude % 100)) {
        "th"
    } else {
        match magnitude % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    };
    format!("{level}{suffix}")
}

fn is_canonical_floor(value: &str) -> bool {
    if value == BASEMENT || value == TOP_FLOOR_BAND {
        return true;
    }
    let digits = value.trim_end_matches(['s', 't', 'n', 'd', 'r', 'h']);
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && digits
            .parse::<i64>()
            .map(|level| floor_ordinal(level) == value)
            .unwrap_or(false)
}

/// Canonicalize a floor level to `"0"`, `"basement"`, `"above 20th"` or an ordinal.
///
/// Only the first two characters are read as the floor number, so `"3"`,
/// `"03"` and `"3 "` all become `"3rd"`.
pub fn clean_floor_level(raw: &str) -> CellOutcome {
    let value = raw.trim().to_lowercase();

    match value.as_str() {
        "ground" | "ground floor" => return CellOutcome::Value(GROUND_FLOOR.to_string()),
        "-1" => return CellOutcome::Value(BASEMENT.to_string()),
        "21st or above" => return CellOutcome::Value(TOP_FLOOR_BAND.to_string()),
        _ => {}
    }

    let prefix: String = value.chars().take(2).collect();
    match prefix.trim().parse::<i64>() {
        Ok(level) => CellOutcome::Value(floor_ordinal(level)),
        Err(_) if is_canonical_floor(&value) => CellOutcome::Value(value),
        Err(_) => CellOutcome::Unparsed(value),
    }
}

// =============================================================================
// Heating controls
// =============================================================================

/// Coerce a heating-controls code to the string form of its integer value.
///
/// Blank cells carry no code and are missing rather than unparsed.
pub fn clean_heating_controls(raw: &str) -> CellOutcome {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellOutcome::Missing;
    }
    if let Ok(code) = trimmed.parse::<i64>() {
        return CellOutcome::Value(code.to_string());
    }
    match trimmed.parse::<f64>() {
        Ok(code) if code.is_finite() => CellOutcome::Value((code.trunc() as i64).to_string()),
        _ => CellOutcome::Unparsed(raw.to_string()),
    }
}

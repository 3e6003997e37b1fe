//! Date Resolver: relative words and numeric date tokens to calendar dates.

use chrono::{Datelike, Duration, NaiveDate};

/// Two-digit-year formats come first: chrono rejects a four-digit year under
/// `%y` (trailing input), so every token reaches the right format.
const DEFAULT_FORMATS: &[&str] = &[
    "%d/%m/%y", "%d-%m-%y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d",
];

#[derive(Debug, Clone)]
pub struct DateResolver {
    formats: Vec<String>,
}

impl DateResolver {
    pub fn new() -> Self {
        Self {
            formats: DEFAULT_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Replace the ordered list of chrono formats tried for absolute tokens
    pub fn with_formats(formats: Vec<String>) -> Self {
        Self { formats }
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Resolve a token against `today`. `None` means unresolved; the caller
    /// supplies the default.
    pub fn resolve(&self, token: &str, today: NaiveDate) -> Option<NaiveDate> {
        let token = token.trim();
        match token {
            "hoje" => return Some(today),
            "ontem" => return today.checked_sub_signed(Duration::days(1)),
            "anteontem" => return today.checked_sub_signed(Duration::days(2)),
            _ => {}
        }

        if let Some(date) = resolve_day_month(token, today.year()) {
            return Some(date);
        }

        self.formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
    }
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// `DD/MM` with no year: that day in the current year
fn resolve_day_month(token: &str, year: i32) -> Option<NaiveDate> {
    let (d, m) = token.split_once('/')?;
    if m.contains('/') {
        return None;
    }
    let d: u32 = d.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    NaiveDate::from_ymd_opt(year, m, d)
}

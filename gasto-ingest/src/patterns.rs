//! Extraction pattern groups.
//!
//! A field (amount, date, ...) owns an ordered list of named groups, each an
//! ordered list of regexes. Probing stops at the first pattern that matches:
//! there is no scoring, order alone decides.

use regex::Regex;

/// One candidate matcher. `group` is the capture holding the field value.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    pub name: String,
    pub regex: Regex,
    pub group: usize,
}

impl FieldPattern {
    pub fn new(name: &str, pattern: &str, group: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            regex: Regex::new(pattern)?,
            group,
        })
    }

    /// Captured value of the first match, if any
    pub fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(self.group))
            .map(|m| m.as_str())
    }
}

/// Named, ordered set of matchers for one field
#[derive(Debug, Clone)]
pub struct PatternGroup {
    pub name: String,
    pub patterns: Vec<FieldPattern>,
}

impl PatternGroup {
    pub fn new(name: &str, patterns: Vec<FieldPattern>) -> Self {
        Self {
            name: name.to_string(),
            patterns,
        }
    }
}

/// A successful probe: which group/pattern matched and what it captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch<'t> {
    pub group: &'t str,
    pub pattern: &'t str,
    pub value: &'t str,
}

/// Ordered groups for one field
#[derive(Debug, Clone, Default)]
pub struct FieldPatterns {
    groups: Vec<PatternGroup>,
}

impl FieldPatterns {
    pub fn new(groups: Vec<PatternGroup>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[PatternGroup] {
        &self.groups
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    pub fn push(&mut self, group: PatternGroup) {
        self.groups.push(group);
    }

    /// Put the named groups first, in the given order. Unknown names are
    /// ignored; unnamed groups keep their relative order after them.
    pub fn reorder(&mut self, order: &[&str]) {
        self.groups.sort_by_key(|g| {
            order
                .iter()
                .position(|name| *name == g.name)
                .unwrap_or(order.len())
        });
    }

    /// First capture across all groups, probed in order
    pub fn first_match<'s, 't>(&'s self, text: &'t str) -> Option<PatternMatch<'t>>
    where
        's: 't,
    {
        self.iter().find_map(|(group, pattern)| {
            pattern.capture(text).map(|value| PatternMatch {
                group: group.name.as_str(),
                pattern: pattern.name.as_str(),
                value,
            })
        })
    }

    /// Every (group, pattern) pair in probe order
    pub fn iter(&self) -> impl Iterator<Item = (&PatternGroup, &FieldPattern)> {
        self.groups
            .iter()
            .flat_map(|g| g.patterns.iter().map(move |p| (g, p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> FieldPatterns {
        FieldPatterns::new(vec![
            PatternGroup::new(
                "letters",
                vec![FieldPattern::new("abc", r"\b(abc)\b", 1).unwrap()],
            ),
            PatternGroup::new(
                "digits",
                vec![
                    FieldPattern::new("three", r"\b(\d{3})\b", 1).unwrap(),
                    FieldPattern::new("any", r"(\d+)", 1).unwrap(),
                ],
            ),
        ])
    }

    #[test]
    fn test_first_group_wins() {
        let p = patterns();
        let m = p.first_match("123 abc").unwrap();
        assert_eq!(m.group, "letters");
        assert_eq!(m.value, "abc");
    }

    #[test]
    fn test_first_pattern_in_group_wins() {
        let p = patterns();
        let m = p.first_match("12345 678").unwrap();
        assert_eq!(m.pattern, "three");
        assert_eq!(m.value, "678");
    }

    #[test]
    fn test_reorder() {
        let mut p = patterns();
        p.reorder(&["digits"]);
        assert_eq!(p.group_names(), vec!["digits", "letters"]);
        let m = p.first_match("123 abc").unwrap();
        assert_eq!(m.value, "123");

        p.reorder(&["nope", "letters"]);
        assert_eq!(p.group_names(), vec!["letters", "digits"]);
    }

    #[test]
    fn test_push_appends_last() {
        let mut p = patterns();
        p.push(PatternGroup::new(
            "words",
            vec![FieldPattern::new("xyz", r"\b(xyz)\b", 1).unwrap()],
        ));
        assert_eq!(p.groups().len(), 3);
        assert_eq!(p.groups()[2].patterns.len(), 1);
        assert_eq!(p.first_match("xyz 123").unwrap().group, "digits");
        assert_eq!(p.first_match("só xyz").unwrap().group, "words");
    }

    #[test]
    fn test_no_match() {
        assert!(patterns().first_match("nothing here").is_none());
    }
}

use std::{collections::HashMap, sync::LazyLock};

use regex::{Captures, Regex, Replacer};

// `$<Identifier>$` or `$<Identifier>%0<width>d$`, and `$$` for a literal `$`.
// Only the `%0<width>d` format tag is allowed by DASH-IF IOP.
static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(RepresentationID|Number|Time|Bandwidth)(?:%0(\d+)d)?)?\$").unwrap()
});

/// Values for the identifiers of `@media` and `@initialization` patterns.
#[derive(Debug, Clone, Default)]
pub struct Template {
    values: HashMap<&'static str, String>,
}

impl Template {
    pub const REPRESENTATION_ID: &'static str = "RepresentationID";
    pub const NUMBER: &'static str = "Number";
    pub const TIME: &'static str = "Time";
    pub const BANDWIDTH: &'static str = "Bandwidth";

    pub fn new() -> Self {
        Self::default()
    }

    /// Identifiers shared by every segment of one representation.
    pub fn for_representation(id: &str, bandwidth: u64) -> Self {
        let mut template = Self::new();
        template.insert(Self::REPRESENTATION_ID, id);
        template.insert(Self::BANDWIDTH, bandwidth);
        template
    }

    pub fn insert(&mut self, identifier: &'static str, value: impl ToString) {
        self.values.insert(identifier, value.to_string());
    }

    /// Substitute identifiers in `pattern`. Identifiers without a value are
    /// left as written.
    pub fn resolve(&self, pattern: &str) -> String {
        IDENTIFIER_REGEX
            .replace_all(pattern, Substitution(&self.values))
            .into_owned()
    }
}

struct Substitution<'a>(&'a HashMap<&'static str, String>);

impl Replacer for Substitution<'_> {
    fn replace_append(&mut self, caps: &Captures<'_>, dst: &mut String) {
        let Some(identifier) = caps.get(1) else {
            dst.push('$');
            return;
        };
        let Some(value) = self.0.get(identifier.as_str()) else {
            dst.push_str(&caps[0]);
            return;
        };

        match caps.get(2).and_then(|width| width.as_str().parse::<usize>().ok()) {
            Some(width) => dst.push_str(&format!("{value:0>width$}")),
            None => dst.push_str(value),
        }
    }
}

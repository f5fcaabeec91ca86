//! Formatting of function readings
//!
//! A function's metadata decides how a raw sample is shown to a person.
//! Five strategies compete and the first applicable one wins:
//!
//! 1. `format_<topic>` for the topic of the sample (requires `topic_<topic>`)
//! 2. `format`
//! 3. value followed by `unit`
//! 4. the name of the `state_<name>` whose value equals the sample, or its
//!    `text_<name>` override
//! 5. the plain value
//!
//! [`FormatRules`] is the metadata parsed once into those strategies.

pub mod printf;

use crate::meta::Meta;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Topic assumed when a sample carries none
pub const DEFAULT_TOPIC: &str = "read";

const TOPIC_PREFIX: &str = "topic_";
const FORMAT_PREFIX: &str = "format_";
const STATE_PREFIX: &str = "state_";
const TEXT_PREFIX: &str = "text_";

/// Template used for unit suffixes and the plain fallback
const DEFAULT_NUMBER_FORMAT: &str = "%f";

/// A named discrete value, e.g. `on = 1`
#[derive(Debug, Clone, PartialEq)]
pub struct StateRule {
    /// State label (`on` for `state_on`)
    pub name: String,

    /// Reading that selects this state
    pub value: f64,

    /// Display override from `text_<name>`
    pub text: Option<String>,
}

impl StateRule {
    /// Text shown for this state
    pub fn display(&self) -> &str {
        self.text.as_deref().unwrap_or(&self.name)
    }
}

/// Formatting rules of one function
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatRules {
    /// Templates per declared topic
    pub topic_formats: HashMap<String, String>,

    /// Template used regardless of topic
    pub generic_format: Option<String>,

    /// Unit appended to the plain value
    pub unit: Option<String>,

    /// Discrete states, ordered by name
    pub states: Vec<StateRule>,
}

/// The strategy picked for one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy<'a> {
    /// Topic specific template
    TopicFormat(&'a str),

    /// Generic template
    GenericFormat(&'a str),

    /// Plain value plus unit
    Unit(&'a str),

    /// Matching discrete state
    State(&'a StateRule),

    /// Plain value
    Plain,
}

impl FormatRules {
    /// Parse the formatting conventions out of a metadata map
    pub fn from_meta(meta: &Meta) -> Self {
        let declared: HashSet<&str> = meta
            .with_prefix(TOPIC_PREFIX)
            .map(|(name, _)| name)
            .collect();

        let mut topic_formats = HashMap::new();
        for (name, template) in meta.with_prefix(FORMAT_PREFIX) {
            if declared.contains(name) {
                topic_formats.insert(name.to_string(), template.to_string());
            } else {
                trace!("Ignoring format_{} without topic_{}", name, name);
            }
        }

        let mut states: Vec<StateRule> = meta
            .with_prefix(STATE_PREFIX)
            .map(|(name, raw)| StateRule {
                name: name.to_string(),
                // Malformed states still render; they just map to zero
                value: raw.parse().unwrap_or(0.0),
                text: meta
                    .get(&format!("{TEXT_PREFIX}{name}"))
                    .filter(|text| !text.is_empty())
                    .map(str::to_string),
            })
            .collect();
        states.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            topic_formats,
            generic_format: meta
                .get("format")
                .filter(|template| !template.is_empty())
                .map(str::to_string),
            unit: meta.get("unit").map(str::to_string),
            states,
        }
    }

    /// Pick the strategy for a sample
    pub fn select(&self, value: f64, topic_key: &str) -> Strategy<'_> {
        let topic = if topic_key.is_empty() {
            DEFAULT_TOPIC
        } else {
            topic_key
        };

        if let Some(template) = self
            .topic_formats
            .get(topic)
            .filter(|template| !template.is_empty())
        {
            return Strategy::TopicFormat(template);
        }
        if let Some(template) = &self.generic_format {
            return Strategy::GenericFormat(template);
        }
        if let Some(unit) = &self.unit {
            return Strategy::Unit(unit);
        }
        // Exact comparison: states are small integers written by hand
        match self.states.iter().find(|state| state.value == value) {
            Some(state) => Strategy::State(state),
            None => Strategy::Plain,
        }
    }

    /// Format a sample
    pub fn format(&self, value: f64, topic_key: &str) -> String {
        match self.select(value, topic_key) {
            Strategy::TopicFormat(template) | Strategy::GenericFormat(template) => {
                printf::render(template, value)
            }
            Strategy::Unit(unit) => {
                let mut out = printf::render(DEFAULT_NUMBER_FORMAT, value);
                out.push_str(unit);
                out
            }
            Strategy::State(state) => state.display().to_string(),
            Strategy::Plain => printf::render(DEFAULT_NUMBER_FORMAT, value),
        }
    }

    /// Parsed state values by name
    pub fn state_values(&self) -> HashMap<String, f64> {
        self.states
            .iter()
            .map(|state| (state.name.clone(), state.value))
            .collect()
    }
}

/// Format a sample straight from a metadata map
///
/// Parses the rules on every call; hold a [`FormatRules`] when formatting
/// many samples of the same function.
pub fn format_value(meta: &Meta, value: f64, topic_key: &str) -> String {
    FormatRules::from_meta(meta).format(value, topic_key)
}

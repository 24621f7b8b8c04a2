//! Deciding whether a change event should be forwarded.

use std::collections::HashSet;

use regex::Regex;
use tracing::trace;

use crate::{
	config::{FilterKind, FilterScope, FilterSpec},
	error::ConfigError,
	event::Event,
};

/// A compiled chain of accept/reject rules for one watcher.
///
/// Rules are applied in configuration order and conjunctively: an event is
/// forwarded only if every rule accepts it. An empty chain accepts
/// everything.
#[derive(Debug, Default)]
pub struct ChangeFilter {
	rules: Vec<Rule>,
}

#[derive(Debug)]
struct Rule {
	scope: FilterScope,
	include: bool,
	matcher: Matcher,
}

#[derive(Debug)]
enum Matcher {
	Regex(Vec<Regex>),
	List(HashSet<String>),
}

impl ChangeFilter {
	/// Compile the configured filter specs.
	///
	/// Fails on the first pattern that is not a valid regex.
	pub fn compile(specs: &[FilterSpec]) -> Result<Self, ConfigError> {
		let mut rules = Vec::with_capacity(specs.len());
		for spec in specs {
			let matcher = match spec.kind {
				FilterKind::Regex => Matcher::Regex(
					spec.patterns
						.iter()
						.map(|pattern| {
							Regex::new(pattern).map_err(|err| ConfigError::FilterPattern {
								pattern: pattern.clone(),
								err,
							})
						})
						.collect::<Result<_, _>>()?,
				),
				FilterKind::List => Matcher::List(spec.patterns.iter().cloned().collect()),
			};

			rules.push(Rule {
				scope: spec.scope,
				include: spec.include,
				matcher,
			});
		}

		Ok(Self { rules })
	}

	/// Whether the event passes every rule.
	pub fn accepts(&self, event: &Event) -> bool {
		self.rules.iter().all(|rule| {
			let pass = rule.accepts(event);
			if !pass {
				trace!(%event, ?rule, "rule rejected event");
			}
			pass
		})
	}
}

impl Rule {
	fn accepts(&self, event: &Event) -> bool {
		let candidate = match self.scope {
			FilterScope::Filename => event.file_name(),
			FilterScope::Operation => event.op.name(),
		};

		let matched = match &self.matcher {
			Matcher::Regex(patterns) => patterns.iter().any(|re| re.is_match(candidate)),
			Matcher::List(names) => names.contains(candidate),
		};

		if self.include {
			matched
		} else {
			!matched
		}
	}
}

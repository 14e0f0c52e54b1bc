//! Rule templates.

use std::collections::HashMap;

use kiln_common::ContentHash;

/// Name of the built-in rule that performs no work.
pub const PHONY_RULE: &str = "phony";

/// Parameter names a rule may carry.
pub const RULE_PARAMETERS: &[&str] = &[
    "command",
    "depfile",
    "deps",
    "description",
    "generator",
    "msvc_deps_prefix",
    "pool",
    "restat",
    "rspfile",
    "rspfile_content",
];

/// A named template which, combined with bindings, describes one command.
///
/// Parameter values are unexpanded string expressions; `$var` references in
/// them are left for the executor to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    name: String,
    parameters: HashMap<String, String>,
}

impl Rule {
    /// Creates a rule with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: HashMap::new(),
        }
    }

    /// The rule's name, which is also its key in the result store.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter expressions, keyed by parameter name.
    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    /// Mutable access to the parameter expressions.
    pub fn parameters_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.parameters
    }

    /// Returns a single parameter expression.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Sets a parameter expression, replacing any previous one.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(name.into(), value.into());
    }

    /// Checks whether `name` is a recognized rule parameter.
    pub fn is_valid_parameter_name(name: &str) -> bool {
        RULE_PARAMETERS.contains(&name)
    }

    /// Returns the first parameter not in [`RULE_PARAMETERS`], in name order.
    pub fn first_invalid_parameter(&self) -> Option<&str> {
        let mut invalid: Vec<&str> = self
            .parameters
            .keys()
            .map(String::as_str)
            .filter(|name| !Self::is_valid_parameter_name(name))
            .collect();
        invalid.sort_unstable();
        invalid.first().copied()
    }

    /// Hash of the rule's name and parameters, independent of insertion order.
    ///
    /// A scheduler can store this as a result's signature to notice when a
    /// rule's template changed between builds.
    pub fn signature(&self) -> ContentHash {
        let mut params: Vec<(&String, &String)> = self.parameters.iter().collect();
        params.sort();
        let fields = std::iter::once(self.name.as_str())
            .chain(params.into_iter().flat_map(|(k, v)| [k.as_str(), v.as_str()]));
        ContentHash::from_fields(fields)
    }
}

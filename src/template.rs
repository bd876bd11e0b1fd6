//! URI Template Engine
//!
//! Compiles URI templates into a matcher that checks concrete URIs,
//! extracts typed parameter values, and expands templates back into URIs.
//!
//! Supported placeholder forms:
//! - `{name}`: required string parameter
//! - `{name?}`: optional parameter (matches an empty or omitted segment)
//! - `{name=default}`: optional with a default substituted when absent
//! - `{name:int}` / `{name:float}` / `{name:bool}`: type-constrained
//! - `{name:pattern:expr}`: captured text must satisfy a glob pattern
//!   where `*` matches any run of characters
//! - `{name:type=default}` / `{name:type?}`: combined forms
//!
//! Matching proceeds left to right with leftmost-first capture and no
//! backtracking: a parameter captures up to the first occurrence of the
//! next literal delimiter (or the end of the URI). Template authors must
//! avoid overlapping optional segments that could match ambiguously.

use {
    crate::error::{McpError, McpResult},
    serde_json::Value,
    std::collections::HashMap,
};

/// Extracted parameter values, keyed by parameter name. Values are typed:
/// strings for `string`/`pattern` parameters, numbers for `int`/`float`,
/// booleans for `bool`.
pub type ParamMap = HashMap<String, Value>;

/// Parameter type constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    String,
    Int,
    Float,
    Bool,
    /// Glob pattern with `*` wildcards
    Pattern(String),
}

/// One parameter slot in a compiled template.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub default_value: Option<String>,
}

impl ParamSpec {
    /// Parse a parameter specification like `name:type=default` into its
    /// components.
    fn parse(spec: &str) -> McpResult<Self> {
        let name_end = spec
            .find(|c| c == ':' || c == '=' || c == '?')
            .unwrap_or(spec.len());
        let name = &spec[..name_end];
        if name.is_empty() {
            return Err(McpError::InvalidTemplate(format!(
                "empty parameter name in '{{{spec}}}'"
            )));
        }

        let mut param = Self {
            name: name.to_string(),
            param_type: ParamType::String,
            required: true,
            default_value: None,
        };

        let mut rest = &spec[name_end..];

        if let Some(after) = rest.strip_prefix('?') {
            param.required = false;
            rest = after;
            if !rest.is_empty() && !rest.starts_with(':') && !rest.starts_with('=') {
                return Err(McpError::InvalidTemplate(format!(
                    "unexpected text after '?' in '{{{spec}}}'"
                )));
            }
        }

        if let Some(after) = rest.strip_prefix(':') {
            let type_end = after
                .find(|c| c == '=' || c == '?')
                .unwrap_or(after.len());
            let type_str = &after[..type_end];
            param.param_type = match type_str {
                "int" => ParamType::Int,
                "float" => ParamType::Float,
                "bool" => ParamType::Bool,
                _ => match type_str.strip_prefix("pattern:") {
                    Some(expr) => ParamType::Pattern(expr.to_string()),
                    // Unknown type names fall back to string
                    None => ParamType::String,
                },
            };
            rest = &after[type_end..];
            if let Some(after) = rest.strip_prefix('?') {
                param.required = false;
                rest = after;
            }
        }

        if let Some(default) = rest.strip_prefix('=') {
            param.default_value = Some(default.to_string());
            // A parameter with a default is never required
            param.required = false;
        }

        Ok(param)
    }

    /// Check a captured value against this parameter's type constraint.
    fn validate(&self, value: &str) -> bool {
        match &self.param_type {
            ParamType::String => true,
            ParamType::Int => value.parse::<i64>().is_ok(),
            ParamType::Float => value.parse::<f64>().is_ok(),
            ParamType::Bool => matches!(value, "true" | "false" | "1" | "0"),
            ParamType::Pattern(pattern) => glob_match(pattern, value),
        }
    }

    /// Convert a validated capture into its typed JSON value.
    fn typed_value(&self, value: &str) -> Value {
        match &self.param_type {
            ParamType::Int => value
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(value.to_string())),
            ParamType::Float => value
                .parse::<f64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(value.to_string())),
            ParamType::Bool => Value::Bool(value == "true" || value == "1"),
            ParamType::String | ParamType::Pattern(_) => Value::String(value.to_string()),
        }
    }
}

/// A compiled URI template: alternating literal runs and parameter slots.
/// `static_parts` always holds exactly `params.len() + 1` entries.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    source: String,
    static_parts: Vec<String>,
    params: Vec<ParamSpec>,
}

impl CompiledTemplate {
    /// Compile a template string into its matcher form.
    pub fn compile(template: &str) -> McpResult<Self> {
        let mut static_parts = Vec::new();
        let mut params = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            rest = &rest[open + 1..];
            let close = rest.find('}').ok_or_else(|| {
                McpError::InvalidTemplate(format!("missing closing brace in '{template}'"))
            })?;
            params.push(ParamSpec::parse(&rest[..close])?);
            static_parts.push(std::mem::take(&mut literal));
            rest = &rest[close + 1..];
        }
        literal.push_str(rest);
        static_parts.push(literal);

        Ok(Self {
            source: template.to_string(),
            static_parts,
            params,
        })
    }

    /// The template string this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether `uri` could have been generated from this template.
    pub fn matches(&self, uri: &str) -> bool {
        self.match_uri(uri).is_some()
    }

    /// Extract parameter values from a matching URI. Returns `None` when
    /// the URI does not match. Optional parameters that are absent do not
    /// appear in the map; defaulted parameters extract as their default.
    pub fn extract(&self, uri: &str) -> Option<ParamMap> {
        self.match_uri(uri)
    }

    /// Expand the template into a concrete URI using `params`. Values may
    /// be strings, numbers, or booleans; missing optional parameters render
    /// as their default or as the empty string. Fails when a required
    /// parameter is missing or a value violates its constraint.
    pub fn expand(&self, params: &ParamMap) -> Option<String> {
        let mut out = String::new();
        for (i, param) in self.params.iter().enumerate() {
            out.push_str(&self.static_parts[i]);
            let provided = params.get(&param.name).map(value_to_string);
            let value = match provided {
                Some(v) => v,
                None => {
                    if param.required {
                        return None;
                    }
                    param.default_value.clone().unwrap_or_default()
                }
            };
            if !value.is_empty() && !param.validate(&value) {
                return None;
            }
            out.push_str(&value);
        }
        out.push_str(self.static_parts.last()?);
        Some(out)
    }

    /// Core matcher: leftmost-first, segment-by-segment, no backtracking.
    fn match_uri(&self, uri: &str) -> Option<ParamMap> {
        let mut u = uri.strip_prefix(self.static_parts[0].as_str())?;
        let mut map = ParamMap::new();

        for (i, param) in self.params.iter().enumerate() {
            let literal = &self.static_parts[i + 1];
            if literal.is_empty() {
                // Parameter at the end of the template captures the rest
                self.capture(&mut map, param, u)?;
                u = "";
            } else {
                let Some(delimiter) = literal.chars().next() else {
                    return None;
                };
                match u.find(delimiter) {
                    Some(pos) => {
                        self.capture(&mut map, param, &u[..pos])?;
                        u = u[pos..].strip_prefix(literal.as_str())?;
                    }
                    None => {
                        // Delimiter absent: an optional parameter is skipped
                        // without consuming input, a required one fails
                        if param.required {
                            return None;
                        }
                        if let Some(default) = &param.default_value {
                            map.insert(param.name.clone(), param.typed_value(default));
                        }
                        u = u.strip_prefix(literal.as_str())?;
                    }
                }
            }
        }

        if u.is_empty() {
            Some(map)
        } else {
            None
        }
    }

    /// Record one captured value, applying optionality and default rules.
    /// Returns `None` to signal a failed match.
    fn capture(&self, map: &mut ParamMap, param: &ParamSpec, value: &str) -> Option<()> {
        if value.is_empty() {
            if let Some(default) = &param.default_value {
                map.insert(param.name.clone(), param.typed_value(default));
                return Some(());
            }
            if !param.required {
                // Absent optional: no entry in the map
                return Some(());
            }
        }
        if !param.validate(value) {
            return None;
        }
        map.insert(param.name.clone(), param.typed_value(value));
        Some(())
    }
}

/// Render a JSON parameter value as URI text.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Glob match with `*` wildcards only. Iterative with single-star
/// backtracking; no character classes.
fn glob_match(pattern: &str, value: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let v: Vec<char> = value.chars().collect();
    let (mut pi, mut vi) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_vi = 0usize;

    while vi < v.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            star_vi = vi;
            pi += 1;
        } else if pi < p.len() && p[pi] == v[vi] {
            pi += 1;
            vi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            star_vi += 1;
            vi = star_vi;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Check whether a URI matches a template, compiling on the fly.
/// Use [`crate::template_cache::TemplateCache`] on hot paths.
pub fn matches(uri: &str, template: &str) -> bool {
    CompiledTemplate::compile(template)
        .map(|t| t.matches(uri))
        .unwrap_or(false)
}

/// Extract parameters from a URI, compiling the template on the fly.
pub fn extract(uri: &str, template: &str) -> Option<ParamMap> {
    CompiledTemplate::compile(template).ok()?.extract(uri)
}

/// Expand a template with parameter values, compiling on the fly.
pub fn expand(template: &str, params: &ParamMap) -> Option<String> {
    CompiledTemplate::compile(template).ok()?.expand(params)
}

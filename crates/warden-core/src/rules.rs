//! Ordered endpoint rules.
//!
//! A [`RuleTable`] is evaluated top to bottom and the first matching rule
//! wins. Order is the whole security model: a narrow public rule must come
//! before a broader protected one for the same path. When nothing matches,
//! an implicit deny-all rule applies.
//!
//! # Rule Lines
//!
//! Rules can be parsed from `"<METHOD|*> <pattern> <requirement>"`:
//!
//! ```text
//! GET /auth/hello public
//! GET /auth/hello-secured authority:CREATE
//! POST /reports/** any-authority:ADMIN,AUDITOR
//! * /account/* authenticated
//! * /** deny
//! ```
//!
//! Patterns are exact paths or Ant-style globs: `?` matches one character,
//! `*` matches within one path segment and `**` spans segments. A trailing
//! `/**` also matches the bare prefix (`/api/**` matches `/api`).

use std::fmt;
use std::str::FromStr;

use globset::{GlobBuilder, GlobMatcher};

use super::error::{SecurityError, SecurityResult};

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Trace,
    Connect,
}

impl HttpMethod {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = SecurityError;

    /// Method tokens are case-sensitive; only the canonical upper-case
    /// names parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "OPTIONS" => Ok(HttpMethod::Options),
            "TRACE" => Ok(HttpMethod::Trace),
            "CONNECT" => Ok(HttpMethod::Connect),
            other => Err(SecurityError::InvalidRule(format!(
                "unknown HTTP method: {}",
                other
            ))),
        }
    }
}

/// Which methods a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodMatcher {
    /// Any method.
    Any,
    /// One specific method.
    Only(HttpMethod),
}

impl MethodMatcher {
    /// Check if the method is covered.
    pub fn matches(&self, method: HttpMethod) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::Only(m) => *m == method,
        }
    }
}

impl From<HttpMethod> for MethodMatcher {
    fn from(method: HttpMethod) -> Self {
        MethodMatcher::Only(method)
    }
}

impl fmt::Display for MethodMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodMatcher::Any => f.write_str("*"),
            MethodMatcher::Only(m) => m.fmt(f),
        }
    }
}

impl FromStr for MethodMatcher {
    type Err = SecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "*" | "ANY" | "any" => Ok(MethodMatcher::Any),
            other => other.to_ascii_uppercase().parse().map(MethodMatcher::Only),
        }
    }
}

/// Path matching strategy for a rule.
#[derive(Debug, Clone)]
pub enum PathPattern {
    /// Every path.
    Any,
    /// Exact, case-sensitive path equality.
    Exact(String),
    /// Ant-style glob.
    Glob {
        /// Pattern as written.
        source: String,
        /// Compiled matcher.
        matcher: GlobMatcher,
    },
}

impl PathPattern {
    /// Compile a pattern. Plain paths become exact matches.
    pub fn parse(pattern: &str) -> SecurityResult<Self> {
        if pattern == "**" || pattern == "/**" {
            return Ok(PathPattern::Any);
        }
        if !pattern.starts_with('/') {
            return Err(SecurityError::InvalidRule(format!(
                "path pattern must start with '/': {}",
                pattern
            )));
        }
        if !pattern.contains(['*', '?']) {
            return Ok(PathPattern::Exact(pattern.to_string()));
        }

        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .backslash_escape(false)
            .build()
            .map_err(|e| SecurityError::InvalidRule(format!("{}: {}", pattern, e)))?;

        Ok(PathPattern::Glob {
            source: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    /// Check whether `path` matches.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Any => true,
            PathPattern::Exact(expected) => expected == path,
            PathPattern::Glob { source, matcher } => {
                matcher.is_match(path)
                    || source
                        .strip_suffix("/**")
                        .is_some_and(|prefix| prefix == path)
            }
        }
    }

    /// Pattern as written.
    pub fn as_str(&self) -> &str {
        match self {
            PathPattern::Any => "/**",
            PathPattern::Exact(path) => path,
            PathPattern::Glob { source, .. } => source,
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a matched request must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// No authentication needed.
    Public,
    /// Any authenticated identity.
    Authenticated,
    /// Authenticated and holding this exact authority.
    RequiresAuthority(String),
    /// Authenticated and holding at least one of these authorities.
    RequiresAnyAuthority(Vec<String>),
    /// Always rejected, even when authenticated.
    DenyAll,
}

impl Requirement {
    /// Whether a credential challenge is needed before deciding.
    pub fn requires_authentication(&self) -> bool {
        !matches!(self, Requirement::Public)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Public => f.write_str("public"),
            Requirement::Authenticated => f.write_str("authenticated"),
            Requirement::RequiresAuthority(a) => write!(f, "authority:{}", a),
            Requirement::RequiresAnyAuthority(list) => write!(f, "any-authority:{}", list.join(",")),
            Requirement::DenyAll => f.write_str("deny"),
        }
    }
}

impl FromStr for Requirement {
    type Err = SecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (s, None),
        };

        match (kind, arg) {
            ("public" | "permit-all", None) => Ok(Requirement::Public),
            ("authenticated", None) => Ok(Requirement::Authenticated),
            ("deny" | "deny-all", None) => Ok(Requirement::DenyAll),
            ("authority", Some(authority)) if !authority.is_empty() => {
                Ok(Requirement::RequiresAuthority(authority.to_string()))
            }
            ("any-authority", Some(list)) => {
                let authorities: Vec<String> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                if authorities.is_empty() {
                    return Err(SecurityError::InvalidRule(
                        "any-authority requires at least one authority".to_string(),
                    ));
                }
                Ok(Requirement::RequiresAnyAuthority(authorities))
            }
            _ => Err(SecurityError::InvalidRule(format!(
                "unknown requirement: {}",
                s
            ))),
        }
    }
}

/// A single method + path rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Methods covered.
    pub method: MethodMatcher,
    /// Paths covered.
    pub pattern: PathPattern,
    /// What a matching request must satisfy.
    pub requirement: Requirement,
}

impl Rule {
    /// Create a rule, compiling the path pattern.
    pub fn new(
        method: impl Into<MethodMatcher>,
        pattern: &str,
        requirement: Requirement,
    ) -> SecurityResult<Self> {
        Ok(Self {
            method: method.into(),
            pattern: PathPattern::parse(pattern)?,
            requirement,
        })
    }

    /// The terminal rule applied when nothing else matches.
    pub fn implicit_deny() -> Self {
        Self {
            method: MethodMatcher::Any,
            pattern: PathPattern::Any,
            requirement: Requirement::DenyAll,
        }
    }

    /// Parse a rule line: `"<METHOD|*> <pattern> <requirement>"`.
    pub fn parse(line: &str) -> SecurityResult<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [method, pattern, requirement] = parts.as_slice() else {
            return Err(SecurityError::InvalidRule(format!(
                "expected '<method> <pattern> <requirement>', got '{}'",
                line.trim()
            )));
        };

        Rule::new(
            method.parse::<MethodMatcher>()?,
            pattern,
            requirement.parse::<Requirement>()?,
        )
    }

    /// Check whether this rule covers the request.
    pub fn matches(&self, method: HttpMethod, path: &str) -> bool {
        self.method.matches(method) && self.pattern.matches(path)
    }

    /// Whether this rule matches every request.
    pub fn is_catch_all(&self) -> bool {
        self.method == MethodMatcher::Any && matches!(self.pattern, PathPattern::Any)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.method, self.pattern, self.requirement)
    }
}

/// Ordered list of rules with an implicit deny-all fallback.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
    fallback: Rule,
}

impl RuleTable {
    /// Create a table from rules in declaration order.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            fallback: Rule::implicit_deny(),
        }
    }

    /// Start building a table.
    pub fn builder() -> RuleTableBuilder {
        RuleTableBuilder::default()
    }

    /// Parse one rule per line. Blank lines and `#` comments are skipped.
    pub fn parse_lines<I, S>(lines: I) -> SecurityResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            rules.push(Rule::parse(line)?);
        }
        Ok(Self::new(rules))
    }

    /// First rule covering the request, or the implicit deny-all rule.
    pub fn match_request(&self, method: HttpMethod, path: &str) -> &Rule {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .unwrap_or(&self.fallback)
    }

    /// Configured rules in declaration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of configured rules, not counting the implicit fallback.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rule is configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether the configured rules already end with an explicit catch-all.
    pub fn has_explicit_catch_all(&self) -> bool {
        self.rules.last().is_some_and(Rule::is_catch_all)
    }
}

/// Fluent builder mirroring the usual `request(..).requirement()` style.
///
/// Each `request` or `any_request` call must be followed by exactly one
/// requirement call.
#[derive(Debug, Default)]
pub struct RuleTableBuilder {
    rules: Vec<Rule>,
    pending: Option<(MethodMatcher, String)>,
    error: Option<SecurityError>,
}

impl RuleTableBuilder {
    /// Select requests by method and path pattern.
    pub fn request(mut self, method: impl Into<MethodMatcher>, pattern: &str) -> Self {
        self.select(method.into(), pattern.to_string());
        self
    }

    /// Select every request.
    pub fn any_request(mut self) -> Self {
        self.select(MethodMatcher::Any, "/**".to_string());
        self
    }

    /// Selected requests need no authentication.
    pub fn permit_all(self) -> Self {
        self.require(Requirement::Public)
    }

    /// Selected requests need any authenticated identity.
    pub fn authenticated(self) -> Self {
        self.require(Requirement::Authenticated)
    }

    /// Selected requests need the given authority.
    pub fn has_authority(self, authority: &str) -> Self {
        self.require(Requirement::RequiresAuthority(authority.to_string()))
    }

    /// Selected requests need one of the given authorities.
    pub fn has_any_authority(self, authorities: &[&str]) -> Self {
        self.require(Requirement::RequiresAnyAuthority(
            authorities.iter().map(|a| a.to_string()).collect(),
        ))
    }

    /// Selected requests are always rejected.
    pub fn deny_all(self) -> Self {
        self.require(Requirement::DenyAll)
    }

    /// Append an already-built rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        if self.pending.is_some() {
            self.fail("rule appended while a request selection has no requirement");
        } else {
            self.rules.push(rule);
        }
        self
    }

    /// Finish the table.
    pub fn build(self) -> SecurityResult<RuleTable> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if let Some((method, pattern)) = self.pending {
            return Err(SecurityError::InvalidRule(format!(
                "'{} {}' has no requirement",
                method, pattern
            )));
        }
        Ok(RuleTable::new(self.rules))
    }

    fn select(&mut self, method: MethodMatcher, pattern: String) {
        if let Some((prev_method, prev_pattern)) = self.pending.take() {
            self.fail(&format!("'{} {}' has no requirement", prev_method, prev_pattern));
        }
        self.pending = Some((method, pattern));
    }

    fn require(mut self, requirement: Requirement) -> Self {
        match self.pending.take() {
            Some((method, pattern)) => match Rule::new(method, &pattern, requirement) {
                Ok(rule) => self.rules.push(rule),
                Err(e) => {
                    self.error.get_or_insert(e);
                }
            },
            None => self.fail(&format!("requirement '{}' without a request selection", requirement)),
        }
        self
    }

    fn fail(&mut self, message: &str) {
        self.error
            .get_or_insert_with(|| SecurityError::InvalidRule(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_table() -> RuleTable {
        RuleTable::builder()
            .request(HttpMethod::Get, "/auth/hello")
            .permit_all()
            .request(HttpMethod::Get, "/auth/hello-secured")
            .has_authority("CREATE")
            .any_request()
            .deny_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("GET".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("DELETE".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert!("FETCH".parse::<HttpMethod>().is_err());
        assert_eq!("*".parse::<MethodMatcher>().unwrap(), MethodMatcher::Any);
    }

    #[test]
    fn test_request_method_is_case_sensitive() {
        assert!("get".parse::<HttpMethod>().is_err());
        assert!("Post".parse::<HttpMethod>().is_err());

        // Rule lines stay lenient.
        assert_eq!(
            "get".parse::<MethodMatcher>().unwrap(),
            MethodMatcher::Only(HttpMethod::Get)
        );
        let rule = Rule::parse("post /api/** authenticated").unwrap();
        assert!(rule.matches(HttpMethod::Post, "/api/items"));
    }

    #[test]
    fn test_exact_pattern() {
        let pattern = PathPattern::parse("/auth/hello").unwrap();
        assert!(matches!(pattern, PathPattern::Exact(_)));
        assert!(pattern.matches("/auth/hello"));
        assert!(!pattern.matches("/auth/hello-secured"));
        assert!(!pattern.matches("/auth/hello/"));
        assert!(!pattern.matches("/AUTH/hello"));
    }

    #[test]
    fn test_single_segment_wildcard() {
        let pattern = PathPattern::parse("/users/*").unwrap();
        assert!(pattern.matches("/users/42"));
        assert!(!pattern.matches("/users/42/posts"));
    }

    #[test]
    fn test_multi_segment_wildcard() {
        let pattern = PathPattern::parse("/api/**").unwrap();
        assert!(pattern.matches("/api"));
        assert!(pattern.matches("/api/v1"));
        assert!(pattern.matches("/api/v1/users/42"));
        assert!(!pattern.matches("/apix"));
        assert!(!pattern.matches("/other/api"));
    }

    #[test]
    fn test_question_mark() {
        let pattern = PathPattern::parse("/v?/status").unwrap();
        assert!(pattern.matches("/v1/status"));
        assert!(!pattern.matches("/v10/status"));
    }

    #[test]
    fn test_catch_all_pattern() {
        let pattern = PathPattern::parse("/**").unwrap();
        assert!(matches!(pattern, PathPattern::Any));
        assert!(pattern.matches("/"));
        assert!(pattern.matches("/anything/at/all"));
    }

    #[test]
    fn test_relative_pattern_rejected() {
        assert!(PathPattern::parse("auth/hello").is_err());
    }

    #[test]
    fn test_requirement_parse() {
        assert_eq!("public".parse::<Requirement>().unwrap(), Requirement::Public);
        assert_eq!("authenticated".parse::<Requirement>().unwrap(), Requirement::Authenticated);
        assert_eq!(
            "authority:CREATE".parse::<Requirement>().unwrap(),
            Requirement::RequiresAuthority("CREATE".to_string())
        );
        assert_eq!(
            "any-authority:ADMIN, AUDITOR".parse::<Requirement>().unwrap(),
            Requirement::RequiresAnyAuthority(vec!["ADMIN".to_string(), "AUDITOR".to_string()])
        );
        assert_eq!("deny".parse::<Requirement>().unwrap(), Requirement::DenyAll);
        assert!("authority:".parse::<Requirement>().is_err());
        assert!("any-authority:".parse::<Requirement>().is_err());
        assert!("admin".parse::<Requirement>().is_err());
    }

    #[test]
    fn test_rule_parse_and_display() {
        let rule = Rule::parse("GET /auth/hello-secured authority:CREATE").unwrap();
        assert_eq!(rule.method, MethodMatcher::Only(HttpMethod::Get));
        assert_eq!(rule.to_string(), "GET /auth/hello-secured authority:CREATE");

        let rule = Rule::parse("  *   /**   deny ").unwrap();
        assert!(rule.is_catch_all());

        assert!(Rule::parse("GET /auth/hello").is_err());
        assert!(Rule::parse("GET /a public extra").is_err());
    }

    #[test]
    fn test_first_match_wins() {
        let table = demo_table();
        assert_eq!(
            table.match_request(HttpMethod::Get, "/auth/hello").requirement,
            Requirement::Public
        );
        assert_eq!(
            table.match_request(HttpMethod::Get, "/auth/hello-secured").requirement,
            Requirement::RequiresAuthority("CREATE".to_string())
        );
        assert_eq!(
            table.match_request(HttpMethod::Post, "/auth/hello").requirement,
            Requirement::DenyAll
        );
        assert!(table.has_explicit_catch_all());
    }

    #[test]
    fn test_implicit_deny_when_nothing_matches() {
        let table = RuleTable::builder()
            .request(HttpMethod::Get, "/auth/hello")
            .permit_all()
            .build()
            .unwrap();

        let rule = table.match_request(HttpMethod::Post, "/unknown-path");
        assert_eq!(rule.requirement, Requirement::DenyAll);
        assert!(rule.is_catch_all());
        assert!(!table.has_explicit_catch_all());
    }

    #[test]
    fn test_empty_table_denies_everything() {
        let table = RuleTable::new(Vec::new());
        assert!(table.is_empty());
        assert_eq!(
            table.match_request(HttpMethod::Get, "/").requirement,
            Requirement::DenyAll
        );
    }

    #[test]
    fn test_declaration_order_is_preserved() {
        let public_first = RuleTable::parse_lines([
            "GET /docs/** public",
            "GET /docs/internal authority:STAFF",
        ])
        .unwrap();
        let protected_first = RuleTable::parse_lines([
            "GET /docs/internal authority:STAFF",
            "GET /docs/** public",
        ])
        .unwrap();

        assert_eq!(
            public_first.match_request(HttpMethod::Get, "/docs/internal").requirement,
            Requirement::Public
        );
        assert_eq!(
            protected_first.match_request(HttpMethod::Get, "/docs/internal").requirement,
            Requirement::RequiresAuthority("STAFF".to_string())
        );
    }

    #[test]
    fn test_parse_lines_skips_comments() {
        let table = RuleTable::parse_lines(["# public", "", "GET /auth/hello public"]).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_builder_rejects_dangling_selection() {
        assert!(RuleTable::builder()
            .request(HttpMethod::Get, "/a")
            .build()
            .is_err());
        assert!(RuleTable::builder()
            .request(HttpMethod::Get, "/a")
            .request(HttpMethod::Get, "/b")
            .permit_all()
            .build()
            .is_err());
        assert!(RuleTable::builder().permit_all().build().is_err());
    }

    #[test]
    fn test_builder_reports_bad_pattern() {
        assert!(matches!(
            RuleTable::builder()
                .request(HttpMethod::Get, "no-slash")
                .permit_all()
                .build(),
            Err(SecurityError::InvalidRule(_))
        ));
    }

    #[test]
    fn test_any_authority_builder() {
        let table = RuleTable::builder()
            .request(MethodMatcher::Any, "/reports/**")
            .has_any_authority(&["ADMIN", "AUDITOR"])
            .build()
            .unwrap();
        assert_eq!(
            table.match_request(HttpMethod::Delete, "/reports/q3").requirement,
            Requirement::RequiresAnyAuthority(vec!["ADMIN".into(), "AUDITOR".into()])
        );
    }
}

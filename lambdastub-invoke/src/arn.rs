//! Function identifier parsing and resolution
//!
//! Accepts every form the Invoke API takes for `FunctionName`:
//!
//! - bare name: `my-function`
//! - name with qualifier: `my-function:v1`
//! - partial ARN: `123456789012:function:my-function`
//! - full ARN: `arn:aws:lambda:us-west-2:123456789012:function:my-function:5`
//!
//! Missing components are filled in from the resolver's defaults.

use std::fmt;
use thiserror::Error;

pub const DEFAULT_PARTITION: &str = "aws";
pub const DEFAULT_ACCOUNT_ID: &str = "123456789012";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const LATEST: &str = "$LATEST";

/// Environment variable consulted for the default region
pub const REGION_ENV_VAR: &str = "AWS_DEFAULT_REGION";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArnError {
    #[error("FunctionName is invalid: {0}")]
    InvalidFunctionName(String),

    #[error("Qualifier is invalid: {0}")]
    InvalidQualifier(String),
}

/// A function reference exactly as the caller wrote it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionReference<'a> {
    pub partition: Option<&'a str>,
    pub region: Option<&'a str>,
    pub account_id: Option<&'a str>,
    pub function_name: &'a str,
    pub qualifier: Option<&'a str>,
}

impl<'a> FunctionReference<'a> {
    /// Parse `[arn:(partition):lambda:]? [region:]? [account:]? [function:]? name [:qualifier]?`
    pub fn parse(input: &'a str) -> Result<Self, ArnError> {
        let segments: Vec<&'a str> = input.split(':').collect();
        let mut reference = FunctionReference::default();
        let mut rest = segments.as_slice();

        if let ["arn", partition, "lambda", tail @ ..] = rest {
            if !is_partition(partition) {
                return Err(ArnError::InvalidFunctionName(input.to_string()));
            }
            reference.partition = Some(*partition);
            rest = tail;
        }

        parse_prefixes(reference, rest, Some(Prefix::Region))
            .ok_or_else(|| ArnError::InvalidFunctionName(input.to_string()))
    }
}

/// Optional segments between the `arn:` header and the function name, in order
#[derive(Debug, Clone, Copy)]
enum Prefix {
    Region,
    Account,
    Function,
}

impl Prefix {
    fn matches(self, segment: &str) -> bool {
        match self {
            Self::Region => is_region(segment),
            Self::Account => is_account_id(segment),
            Self::Function => segment == "function",
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            Self::Region => Some(Self::Account),
            Self::Account => Some(Self::Function),
            Self::Function => None,
        }
    }

    fn assign<'a>(self, reference: &mut FunctionReference<'a>, segment: &'a str) {
        match self {
            Self::Region => reference.region = Some(segment),
            Self::Account => reference.account_id = Some(segment),
            Self::Function => {}
        }
    }
}

// A prefix is only taken when something follows it, and the parse backtracks
// when taking it leaves an invalid remainder (`us-east-1:$LATEST` is a name
// with a qualifier, not a region).
fn parse_prefixes<'a>(
    reference: FunctionReference<'a>,
    segments: &[&'a str],
    prefix: Option<Prefix>,
) -> Option<FunctionReference<'a>> {
    let Some(prefix) = prefix else {
        return parse_name(reference, segments);
    };

    if let [segment, tail @ ..] = segments {
        if !tail.is_empty() && prefix.matches(segment) {
            let mut consumed = reference.clone();
            prefix.assign(&mut consumed, *segment);
            if let Some(parsed) = parse_prefixes(consumed, tail, prefix.next()) {
                return Some(parsed);
            }
        }
    }

    parse_prefixes(reference, segments, prefix.next())
}

fn parse_name<'a>(
    mut reference: FunctionReference<'a>,
    segments: &[&'a str],
) -> Option<FunctionReference<'a>> {
    match segments {
        [name] if is_function_name(name) => {
            reference.function_name = *name;
            Some(reference)
        }
        [name, qualifier] if is_function_name(name) && is_qualifier(qualifier) => {
            reference.function_name = *name;
            reference.qualifier = Some(*qualifier);
            Some(reference)
        }
        _ => None,
    }
}

fn is_partition(segment: &str) -> bool {
    segment.is_empty()
        || segment
            .strip_prefix("aws")
            .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_alphabetic() || c == '-'))
}

fn is_region(segment: &str) -> bool {
    fn lower(s: &str) -> bool {
        !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase())
    }
    fn digit(s: &str) -> bool {
        s.len() == 1 && s.chars().all(|c| c.is_ascii_digit())
    }

    let parts: Vec<&str> = segment.split('-').collect();
    match parts.as_slice() {
        [country, area, number] => country.len() == 2 && lower(country) && lower(area) && digit(number),
        [country, "gov", area, number] => {
            country.len() == 2 && lower(country) && lower(area) && digit(number)
        }
        _ => false,
    }
}

fn is_account_id(segment: &str) -> bool {
    segment.len() == 12 && segment.chars().all(|c| c.is_ascii_digit())
}

/// Whether `name` is a valid bare function name
pub fn is_function_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Whether `qualifier` is `$LATEST`, a version number or an alias name
pub fn is_qualifier(qualifier: &str) -> bool {
    qualifier == LATEST
        || (!qualifier.is_empty()
            && qualifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_')))
}

/// Canonical function ARN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionArn {
    pub partition: String,
    pub region: String,
    pub account_id: String,
    pub function_name: String,
    pub qualifier: Option<String>,
}

impl FunctionArn {
    pub const SERVICE: &'static str = "lambda";
}

impl fmt::Display for FunctionArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:function:{}",
            self.partition,
            Self::SERVICE,
            self.region,
            self.account_id,
            self.function_name
        )?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, ":{}", qualifier)?;
        }
        Ok(())
    }
}

/// Outcome of resolving a `FunctionName` path segment plus `Qualifier` query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFunction {
    pub arn: FunctionArn,
    /// Bare function name, used for the first registry lookup
    pub function_name: String,
    /// Qualifier as reported in logs; `$LATEST` when none was given
    pub qualifier: String,
    /// Value of the `X-Amz-Executed-Version` header
    pub executed_version: String,
}

/// Map a qualifier to `(executed version, reported qualifier)`
pub fn executed_version(qualifier: &str) -> (String, String) {
    if qualifier == LATEST {
        return (LATEST.to_string(), LATEST.to_string());
    }
    if let Ok(version) = qualifier.parse::<u64>() {
        return (version.to_string(), qualifier.to_string());
    }
    // Aliases always report version 1
    let reported = if qualifier.is_empty() { LATEST } else { qualifier };
    ("1".to_string(), reported.to_string())
}

/// Resolves raw identifiers against a default partition, region and account
#[derive(Debug, Clone)]
pub struct IdentifierResolver {
    partition: String,
    region: String,
    account_id: String,
}

impl Default for IdentifierResolver {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

impl IdentifierResolver {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            partition: DEFAULT_PARTITION.to_string(),
            region: region.into(),
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
        }
    }

    /// Default region from `AWS_DEFAULT_REGION`, falling back to `us-east-1`
    pub fn from_env() -> Self {
        let region = std::env::var(REGION_ENV_VAR)
            .ok()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        Self::new(region)
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn resolve(
        &self,
        identifier: &str,
        qualifier: Option<&str>,
    ) -> Result<ResolvedFunction, ArnError> {
        let reference = FunctionReference::parse(identifier)?;

        let query_qualifier = qualifier.filter(|q| !q.is_empty());
        if let Some(q) = query_qualifier {
            if !is_qualifier(q) {
                return Err(ArnError::InvalidQualifier(q.to_string()));
            }
        }
        // A qualifier embedded in the ARN takes precedence over the query parameter
        let qualifier = reference.qualifier.or(query_qualifier);

        let arn = FunctionArn {
            partition: reference
                .partition
                .filter(|p| !p.is_empty())
                .unwrap_or(self.partition.as_str())
                .to_string(),
            region: reference.region.unwrap_or(self.region.as_str()).to_string(),
            account_id: reference.account_id.unwrap_or(self.account_id.as_str()).to_string(),
            function_name: reference.function_name.to_string(),
            qualifier: qualifier.map(str::to_string),
        };

        let (executed_version, reported) = executed_version(qualifier.unwrap_or_default());

        Ok(ResolvedFunction {
            function_name: reference.function_name.to_string(),
            arn,
            qualifier: reported,
            executed_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_name() {
        let reference = FunctionReference::parse("my-function").unwrap();
        assert_eq!(reference.function_name, "my-function");
        assert_eq!(reference.qualifier, None);
        assert_eq!(reference.region, None);
    }

    #[test]
    fn test_parse_name_with_qualifier() {
        let reference = FunctionReference::parse("my-function:prod").unwrap();
        assert_eq!(reference.function_name, "my-function");
        assert_eq!(reference.qualifier, Some("prod"));
    }

    #[test]
    fn test_parse_full_arn() {
        let reference =
            FunctionReference::parse("arn:aws:lambda:us-west-2:210987654321:function:my-function:7")
                .unwrap();
        assert_eq!(
            reference,
            FunctionReference {
                partition: Some("aws"),
                region: Some("us-west-2"),
                account_id: Some("210987654321"),
                function_name: "my-function",
                qualifier: Some("7"),
            }
        );
    }

    #[test]
    fn test_parse_partial_arns() {
        let reference = FunctionReference::parse("210987654321:function:my-function").unwrap();
        assert_eq!(reference.account_id, Some("210987654321"));
        assert_eq!(reference.function_name, "my-function");

        let reference = FunctionReference::parse("function:my-function:$LATEST").unwrap();
        assert_eq!(reference.function_name, "my-function");
        assert_eq!(reference.qualifier, Some("$LATEST"));

        let reference = FunctionReference::parse("us-gov-west-1:function:my-function").unwrap();
        assert_eq!(reference.region, Some("us-gov-west-1"));
    }

    #[test]
    fn test_parse_prefix_lookalikes_as_names() {
        // Nothing follows, so these are names rather than prefixes
        assert_eq!(FunctionReference::parse("function").unwrap().function_name, "function");
        assert_eq!(FunctionReference::parse("us-east-1").unwrap().function_name, "us-east-1");

        let reference = FunctionReference::parse("us-east-1:$LATEST").unwrap();
        assert_eq!(reference.region, None);
        assert_eq!(reference.function_name, "us-east-1");
        assert_eq!(reference.qualifier, Some("$LATEST"));
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for input in [
            "",
            "bad name",
            "name:with:too:many:parts:x:y",
            "my-function:$latest",
            "my-function:",
            "arn:gcp:lambda:us-east-1:123456789012:function:f",
            "arn:aws:lambda",
            "arn:aws:s3:::bucket",
        ] {
            assert!(
                FunctionReference::parse(input).is_err(),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_bare_name_defaults_to_latest() {
        let resolver = IdentifierResolver::new("eu-west-1");
        for name in ["Greeter", "a", "my.func_1-x"] {
            let resolved = resolver.resolve(name, None).unwrap();
            assert_eq!(resolved.qualifier, LATEST);
            assert_eq!(resolved.executed_version, "1");
            assert_eq!(resolved.function_name, name);
            assert_eq!(
                resolved.arn.to_string(),
                format!("arn:aws:lambda:eu-west-1:123456789012:function:{name}")
            );
        }
    }

    #[test]
    fn test_numeric_qualifier_is_canonicalised() {
        let resolver = IdentifierResolver::default();
        for (qualifier, version) in [("5", "5"), ("05", "5"), ("0", "0"), ("1234", "1234")] {
            let resolved = resolver.resolve("Echo", Some(qualifier)).unwrap();
            assert_eq!(resolved.executed_version, version);
            assert_eq!(resolved.qualifier, qualifier);
            assert_eq!(
                resolved.arn.to_string(),
                format!("arn:aws:lambda:us-east-1:123456789012:function:Echo:{qualifier}")
            );
        }
    }

    #[test]
    fn test_latest_and_alias_qualifiers() {
        let resolver = IdentifierResolver::default();

        let resolved = resolver.resolve("Echo", Some("$LATEST")).unwrap();
        assert_eq!(resolved.executed_version, "$LATEST");
        assert_eq!(resolved.qualifier, "$LATEST");

        let resolved = resolver.resolve("Echo", Some("prod")).unwrap();
        assert_eq!(resolved.executed_version, "1");
        assert_eq!(resolved.qualifier, "prod");

        let resolved = resolver.resolve("Echo", Some("")).unwrap();
        assert_eq!(resolved.qualifier, "$LATEST");
        assert_eq!(resolved.arn.qualifier, None);
    }

    #[test]
    fn test_bare_name_with_qualifier_is_split() {
        let resolver = IdentifierResolver::default();
        let resolved = resolver.resolve("Echo:5", None).unwrap();
        assert_eq!(resolved.function_name, "Echo");
        assert_eq!(resolved.qualifier, "5");
        assert_eq!(resolved.executed_version, "5");
        assert_eq!(
            resolved.arn.to_string(),
            "arn:aws:lambda:us-east-1:123456789012:function:Echo:5"
        );
    }

    #[test]
    fn test_embedded_qualifier_wins() {
        let resolver = IdentifierResolver::default();
        let resolved = resolver
            .resolve("arn:aws:lambda:ap-northeast-1:210987654321:function:Echo:3", Some("9"))
            .unwrap();
        assert_eq!(resolved.function_name, "Echo");
        assert_eq!(resolved.executed_version, "3");
        assert_eq!(resolved.arn.region, "ap-northeast-1");
        assert_eq!(resolved.arn.account_id, "210987654321");
    }

    #[test]
    fn test_partial_arn_is_completed_from_defaults() {
        let resolver = IdentifierResolver::new("sa-east-1").with_account_id("000000000000");
        let resolved = resolver.resolve("function:Echo", None).unwrap();
        assert_eq!(
            resolved.arn.to_string(),
            "arn:aws:lambda:sa-east-1:000000000000:function:Echo"
        );
    }

    #[test]
    fn test_invalid_query_qualifier() {
        let resolver = IdentifierResolver::default();
        assert_eq!(
            resolver.resolve("Echo", Some("not valid")),
            Err(ArnError::InvalidQualifier("not valid".to_string()))
        );
    }

    #[test]
    fn test_executed_version() {
        assert_eq!(executed_version(""), ("1".to_string(), "$LATEST".to_string()));
        assert_eq!(executed_version("live"), ("1".to_string(), "live".to_string()));
        assert_eq!(executed_version("007"), ("7".to_string(), "007".to_string()));
    }
}

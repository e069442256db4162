//! Function registry
//!
//! Built once before the server starts and read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::arn::{FunctionArn, FunctionReference, ResolvedFunction, DEFAULT_PARTITION};
use crate::function::{Handler, RegisteredFunction};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Invalid function name: {0:?}")]
    InvalidFunctionName(String),

    #[error("Function {0:?} must be registered as a bare name or a full ARN")]
    PartialIdentifier(String),
}

/// Registered functions keyed by the name they were registered under
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<RegisteredFunction>>,
}

impl FunctionRegistry {
    pub fn builder() -> FunctionRegistryBuilder {
        FunctionRegistryBuilder::default()
    }

    /// Look up by bare name first, then by the canonical ARN string
    pub fn lookup(&self, target: &ResolvedFunction) -> Option<Arc<RegisteredFunction>> {
        self.get(&target.function_name)
            .or_else(|| self.get(&target.arn.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredFunction>> {
        self.functions.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Collects registrations; validation happens in [`FunctionRegistryBuilder::build`]
#[derive(Debug, Default)]
pub struct FunctionRegistryBuilder {
    entries: Vec<(String, Handler)>,
}

impl FunctionRegistryBuilder {
    /// Register a handler under a bare name or a full ARN
    ///
    /// Full ARNs may carry a qualifier; they are then only reachable with that
    /// qualifier. Partial ARNs and `name:qualifier` are rejected by `build`.
    pub fn register(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.entries.push((name.into(), handler));
        self
    }

    pub fn build(self) -> Result<FunctionRegistry, RegistrationError> {
        let mut functions = HashMap::with_capacity(self.entries.len());

        for (name, handler) in self.entries {
            let key = registration_key(&name)?;

            info!(function_name = %key, shape = handler.shape().as_str(), "Registered function");
            let function = Arc::new(RegisteredFunction::new(key.clone(), handler));
            if functions.insert(key.clone(), function).is_some() {
                warn!(function_name = %key, "Duplicate registration replaced the earlier handler");
            }
        }

        Ok(FunctionRegistry { functions })
    }
}

/// Key a registration the way `lookup` searches: the bare name, or the
/// canonical ARN string
fn registration_key(name: &str) -> Result<String, RegistrationError> {
    let reference = FunctionReference::parse(name)
        .map_err(|_| RegistrationError::InvalidFunctionName(name.to_string()))?;

    match reference {
        FunctionReference {
            partition: None,
            region: None,
            account_id: None,
            function_name,
            qualifier: None,
        } => Ok(function_name.to_string()),
        FunctionReference {
            partition: Some(partition),
            region: Some(region),
            account_id: Some(account_id),
            function_name,
            qualifier,
        } => {
            let partition = if partition.is_empty() { DEFAULT_PARTITION } else { partition };
            let arn = FunctionArn {
                partition: partition.to_string(),
                region: region.to_string(),
                account_id: account_id.to_string(),
                function_name: function_name.to_string(),
                qualifier: qualifier.map(str::to_string),
            };
            Ok(arn.to_string())
        }
        _ => Err(RegistrationError::PartialIdentifier(name.to_string())),
    }
}

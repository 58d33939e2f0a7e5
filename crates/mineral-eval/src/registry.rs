use crate::evaluator::{check_arity, RecursiveFunction};
use dashmap::DashMap;
use mineral_core::{MineralError, Result, Term};
use std::sync::Arc;
use tracing::info;

/// Host-side lookup of extension functions by IRI.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: DashMap<String, Arc<RecursiveFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, function: Arc<RecursiveFunction>) {
        info!("Registering function {}", function.iri());
        self.functions.insert(function.iri().to_string(), function);
    }

    pub fn get(&self, iri: &str) -> Option<Arc<RecursiveFunction>> {
        self.functions.get(iri).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, iri: &str) -> bool {
        self.functions.contains_key(iri)
    }

    /// Query build time check: the function exists and gets at least a snippet.
    pub fn check_build(&self, iri: &str, arg_count: usize) -> Result<()> {
        if !self.contains(iri) {
            return Err(MineralError::Usage(format!("unknown function <{}>", iri)));
        }
        check_arity(arg_count)
    }

    /// Evaluation entry point used by the host. `None` models a host that breaks the calling
    /// contract by passing no argument list at all.
    pub async fn call(&self, iri: &str, args: Option<&[Term]>) -> Result<Term> {
        let function = self
            .get(iri)
            .ok_or_else(|| MineralError::Usage(format!("unknown function <{}>", iri)))?;
        let args = args.ok_or_else(|| MineralError::NullArguments(iri.to_string()))?;
        function.exec_term(args).await
    }
}

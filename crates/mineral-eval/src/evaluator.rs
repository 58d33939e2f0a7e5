use crate::oracle::{Oracle, SparqlHttpOracle};
use crate::outcome::Outcome;
use crate::template::QueryTemplate;
use mineral_cache::{BestSoFar, CacheKey, CacheStats, Claim, VisitationCache};
use mineral_core::{MineralConfig, MineralError, OptimizationStrategy, Result, Term};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-function settings taken from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSettings {
    pub iri: String,
    pub strategy: OptimizationStrategy,
    pub result_variable: String,
}

impl FunctionSettings {
    pub fn from_config(config: &MineralConfig) -> Self {
        Self {
            iri: config.function.iri.clone(),
            strategy: config.function.strategy,
            result_variable: config.oracle.result_variable.clone(),
        }
    }
}

impl Default for FunctionSettings {
    fn default() -> Self {
        Self::from_config(&MineralConfig::default())
    }
}

/// Fail fast when the host passes no snippet.
pub fn check_arity(arg_count: usize) -> Result<()> {
    if arg_count < 1 {
        return Err(MineralError::Usage(format!(
            "function takes at least one argument (a query snippet), got {}",
            arg_count
        )));
    }
    Ok(())
}

fn render(args: &[Term]) -> String {
    let rendered: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    format!("[{}]", rendered.join(", "))
}

/// The recursive, memoized function.
///
/// The visitation cache and the best-so-far register are injected so several functions (or
/// tests) can share or isolate them. Every call runs straight through: it never waits for
/// another call's result, it only sees whatever the cache holds when it claims its key.
pub struct RecursiveFunction {
    settings: FunctionSettings,
    cache: Arc<VisitationCache<Outcome>>,
    best: Arc<BestSoFar<Term>>,
    oracle: Arc<dyn Oracle>,
    template: Arc<QueryTemplate>,
    calls: AtomicU64,
}

impl RecursiveFunction {
    pub fn new(
        settings: FunctionSettings,
        cache: Arc<VisitationCache<Outcome>>,
        best: Arc<BestSoFar<Term>>,
        oracle: Arc<dyn Oracle>,
        template: Arc<QueryTemplate>,
    ) -> Self {
        Self {
            settings,
            cache,
            best,
            oracle,
            template,
            calls: AtomicU64::new(0),
        }
    }

    /// Wire a function with fresh shared state, the configured template and an HTTP oracle.
    pub fn from_config(config: &MineralConfig) -> Result<Self> {
        let oracle = SparqlHttpOracle::from_config(&config.oracle)?;
        Self::with_oracle(config, Arc::new(oracle))
    }

    pub fn with_oracle(config: &MineralConfig, oracle: Arc<dyn Oracle>) -> Result<Self> {
        let path = config
            .template
            .path
            .as_deref()
            .ok_or_else(|| MineralError::Config("No sparql template specified".to_string()))?;
        let template = QueryTemplate::load(path)?;

        Ok(Self::new(
            FunctionSettings::from_config(config),
            Arc::new(VisitationCache::new()),
            Arc::new(BestSoFar::new(config.function.order)),
            oracle,
            Arc::new(template),
        ))
    }

    pub fn iri(&self) -> &str {
        &self.settings.iri
    }

    pub fn strategy(&self) -> OptimizationStrategy {
        self.settings.strategy
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn current_best(&self) -> Option<Term> {
        self.best.current_best()
    }

    pub fn build_query(&self, args: &[Term]) -> Result<String> {
        check_arity(args.len())?;
        self.template.build(args)
    }

    /// Evaluate one call. `args[0]` is the query snippet, `args[1]` (if any) the accumulator.
    ///
    /// An oracle failure is returned as is and leaves the key claimed: later calls with the
    /// same arguments see it as in progress.
    pub async fn exec(&self, args: &[Term]) -> Result<Outcome> {
        check_arity(args.len())?;

        let call_id = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        let fn_args = &args[1..];
        info!("Calling mr#{} with {}", call_id, render(fn_args));

        let query = self.template.build(args)?;
        let strategy = self.settings.strategy;
        let key = CacheKey::encode(args);

        if strategy.caches() {
            match self.cache.claim(&key) {
                Claim::Resolved(outcome) => {
                    debug!("mr#{} answered from cache for {}: {}", call_id, render(fn_args), outcome);
                    return Ok(outcome);
                }
                Claim::InProgress => {
                    warn!("Loop found for mr#{} with {}", call_id, render(fn_args));
                    return Ok(Outcome::CycleDetected);
                }
                Claim::Claimed => {}
            }
        }

        if strategy.prunes() {
            if let Some(accumulator) = args.get(1) {
                if self.best.should_prune(accumulator) {
                    info!("Branch of mr#{} was cut by fast optimization", call_id);
                    self.cache.resolve(&key, Outcome::Pruned);
                    return Ok(Outcome::Pruned);
                }
            }
        }

        debug!("mr#{} query:\n{}", call_id, query);
        let solutions = self.oracle.select(&query).await?;

        let outcome = match solutions.first() {
            Some(row) => Outcome::from(row.get(&self.settings.result_variable).cloned()),
            None => {
                warn!("Resultset was empty for mr#{}", call_id);
                Outcome::NoMatch
            }
        };
        info!(
            "Result of mr#{} for {} was {}, solutions={}",
            call_id,
            render(fn_args),
            outcome,
            solutions.len()
        );

        if strategy.caches() {
            self.cache.resolve(&key, outcome.clone());
        }

        if strategy.prunes() {
            if let Outcome::Value(value) = &outcome {
                if self.best.offer(value.clone()) {
                    info!("From mr#{} new best solution so far {}", call_id, value);
                }
            }
        }

        Ok(outcome)
    }

    /// Evaluate and collapse to the term handed back to the host query.
    pub async fn exec_term(&self, args: &[Term]) -> Result<Term> {
        Ok(self.exec(args).await?.into_term())
    }
}

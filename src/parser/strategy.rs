//! Detection strategy chain.
//!
//! Strategies run in a fixed priority order; the first one to return at
//! least one table wins. A strategy error is recorded as a diagnostic and
//! the chain moves on, so an exotic content stream that breaks one
//! detector never takes down the whole extraction. Only when the chain
//! exhausts do the recorded errors surface to the caller.

use crate::error::{Error, Result};
use crate::model::RawTable;

use super::lattice::LatticeDetector;
use super::stream::StreamDetector;
use super::textgrid::TextGridDetector;
use super::PdfSource;

/// A table detection strategy.
pub trait DetectStrategy: Send + Sync {
    /// Short identifier recorded in the extraction outcome.
    fn name(&self) -> &str;

    /// Detect tables in the document, in page order.
    fn detect(&self, source: &PdfSource) -> Result<Vec<RawTable>>;
}

/// Result of running a strategy chain.
#[derive(Debug)]
pub struct ChainOutcome {
    /// Detected tables, page order preserved.
    pub tables: Vec<RawTable>,
    /// Name of the strategy that produced the tables.
    pub strategy: String,
    /// Notes from strategies that failed or found nothing.
    pub diagnostics: Vec<String>,
}

/// Ordered sequence of detection strategies.
pub struct StrategyChain {
    strategies: Vec<Box<dyn DetectStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn DetectStrategy>>) -> Self {
        Self { strategies }
    }

    /// Run strategies in order until one yields tables.
    ///
    /// Returns `Error::NoTablesFound` if every strategy comes up empty.
    /// If at least one strategy raised an error, the chain instead
    /// returns `Error::Detection` carrying every per-strategy note, so
    /// the caller can persist the full failure trail.
    pub fn run(&self, source: &PdfSource) -> Result<ChainOutcome> {
        let mut diagnostics = Vec::new();
        let mut raised = false;

        for strategy in &self.strategies {
            match strategy.detect(source) {
                Ok(tables) if !tables.is_empty() => {
                    log::debug!(
                        "strategy '{}' found {} table(s)",
                        strategy.name(),
                        tables.len()
                    );
                    return Ok(ChainOutcome {
                        tables,
                        strategy: strategy.name().to_string(),
                        diagnostics,
                    });
                }
                Ok(_) => {
                    diagnostics.push(format!("{}: no tables", strategy.name()));
                }
                Err(err) => {
                    log::warn!("strategy '{}' failed: {}", strategy.name(), err);
                    diagnostics.push(format!("{}: {}", strategy.name(), err));
                    raised = true;
                }
            }
        }

        for note in &diagnostics {
            log::debug!("detection diagnostic: {}", note);
        }
        if raised {
            return Err(Error::Detection(diagnostics.join("; ")));
        }
        Err(Error::NoTablesFound)
    }
}

impl Default for StrategyChain {
    fn default() -> Self {
        Self::new(default_strategies())
    }
}

/// The standard strategy order: ruling lines first, then strict span
/// alignment, then relaxed alignment, then the plain-text grid fallback.
pub fn default_strategies() -> Vec<Box<dyn DetectStrategy>> {
    vec![
        Box::new(LatticeDetector::new()),
        Box::new(StreamDetector::strict()),
        Box::new(StreamDetector::relaxed()),
        Box::new(TextGridDetector::new()),
    ]
}

//! Orchestrator module for the movies ETL pipeline.
//!
//! Drives extractor, transformer and loader through refresh cycles.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::backoff::Sleeper;
use crate::errors::PipelineError;
use crate::extractor::Extractor;
use crate::loader::SearchLoader;
use crate::state::{ResumePoint, State};
use crate::transformer;
use movies_etl_shared::{FamilyKind, Watermark};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause between two cycles.
    pub interval: Duration,
    /// Families drained by each cycle, in order.
    pub families: Vec<FamilyKind>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            families: FamilyKind::ALL.to_vec(),
        }
    }
}

/// Counters of one family's pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyReport {
    pub family: FamilyKind,
    /// Non-empty pages processed.
    pub batches: usize,
    /// Rows returned by the extractor.
    pub extracted: usize,
    /// Documents acknowledged by the search engine.
    pub loaded: usize,
}

impl FamilyReport {
    fn new(family: FamilyKind) -> Self {
        Self {
            family,
            batches: 0,
            extracted: 0,
            loaded: 0,
        }
    }
}

/// Outcome of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Watermark the cycle extracted from.
    pub watermark: Watermark,
    /// Watermark the next cycle will extract from.
    pub candidate: Watermark,
    /// Whether the cycle continued an interrupted one.
    pub resumed: bool,
    pub families: Vec<FamilyReport>,
}

impl CycleReport {
    /// Documents loaded across all families.
    pub fn loaded(&self) -> usize {
        self.families.iter().map(|f| f.loaded).sum()
    }

    /// Report of one family, if it was drained in this cycle.
    pub fn family(&self, family: FamilyKind) -> Option<&FamilyReport> {
        self.families.iter().find(|f| f.family == family)
    }
}

/// Orchestrator that runs refresh cycles until a stop is requested.
///
/// A cycle captures a candidate watermark, drains every family changed
/// since the current watermark, then sleeps. After the sleep the watermark
/// moves to the candidate. The quit flag is checked once per cycle, so an
/// in-flight cycle always completes.
pub struct Orchestrator {
    extractor: Extractor,
    loader: SearchLoader,
    state: State,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        extractor: Extractor,
        loader: SearchLoader,
        state: State,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            extractor,
            loader,
            state,
            clock,
            sleeper,
            config,
        }
    }

    /// Cursor the orchestrator persists its progress in.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Run cycles until the quit flag is set.
    ///
    /// The search indices are bootstrapped before the first cycle.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), PipelineError> {
        info!(
            interval_secs = self.config.interval.as_secs_f64(),
            families = ?self.config.families,
            "Starting movies ETL orchestrator"
        );

        self.loader.ensure_indices(&self.config.families).await?;

        loop {
            if self.state.quit_requested().await? {
                info!("Quit flag set, stopping");
                break;
            }

            let report = self.run_cycle().await?;

            debug!(interval_secs = self.config.interval.as_secs_f64(), "Sleeping until next cycle");
            self.sleeper.sleep(self.config.interval).await;
            self.state.advance_watermark(report.candidate).await?;
        }

        info!("Orchestrator shutdown complete");
        Ok(())
    }

    /// Drain every configured family once.
    ///
    /// The watermark is not advanced; [`Orchestrator::run`] does that after
    /// the inter-cycle sleep.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, PipelineError> {
        let watermark = self.state.watermark().await?;
        let batch_size = self.state.batch_size().await?;
        let resume = self.resume_point().await?;
        let candidate = resume
            .map(|r| r.candidate)
            .unwrap_or_else(|| Watermark::from_utc(self.clock.now()));

        info!(
            watermark = %watermark,
            candidate = %candidate,
            resumed = resume.is_some(),
            "Cycle started"
        );

        let families = self.config.families.clone();
        let skip = resume
            .and_then(|r| families.iter().position(|&kind| kind == r.family))
            .unwrap_or(0);

        let mut reports = Vec::with_capacity(families.len());
        for (position, &kind) in families.iter().enumerate().skip(skip) {
            let offset = match resume {
                Some(r) if position == skip => r.offset,
                _ => 0,
            };
            self.state.begin_family(kind, candidate, offset).await?;
            reports.push(self.drain_family(kind, watermark, batch_size, offset).await?);
        }

        let report = CycleReport {
            watermark,
            candidate,
            resumed: resume.is_some(),
            families: reports,
        };

        for family in &report.families {
            info!(
                family = %family.family,
                batches = family.batches,
                extracted = family.extracted,
                loaded = family.loaded,
                "Family drained"
            );
        }
        info!(watermark = %watermark, loaded = report.loaded(), "Cycle finished");

        Ok(report)
    }

    async fn resume_point(&self) -> Result<Option<ResumePoint>, PipelineError> {
        let resume = self.state.resume_point().await?;
        Ok(resume.filter(|r| self.config.families.contains(&r.family)))
    }

    #[instrument(skip(self), fields(family = %kind))]
    async fn drain_family(
        &mut self,
        kind: FamilyKind,
        watermark: Watermark,
        batch_size: i64,
        start: i64,
    ) -> Result<FamilyReport, PipelineError> {
        let mut report = FamilyReport::new(kind);
        let mut offset = start;

        loop {
            let records = self
                .extractor
                .next_batch(kind, watermark, batch_size, offset)
                .await?;
            if records.is_empty() {
                break;
            }

            report.extracted += records.len();
            let documents = transformer::transform_batch(kind, records)?;
            let summary = self.loader.load_batch(kind, &documents).await?;
            report.loaded += summary.succeeded;
            report.batches += 1;

            offset += batch_size;
            self.state.set_offset(offset).await?;
            debug!(family = %kind, offset, loaded = summary.succeeded, "Batch loaded");
        }

        Ok(report)
    }
}

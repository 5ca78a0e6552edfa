//! ReportBuilder - facade producing the summary and scatter reports
//!
//! Converts enriched observations into aggregation records (tagging
//! quarter and event proximity on the way) and dispatches to the
//! Aggregator or the stratified sampler.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::core::AnalysisError;
use crate::pipeline::EnrichedObservation;

use super::{
    stratified_sample, AggregateCell, Aggregator, Dimension, EventCalendar, Quarter, ReturnRecord,
    ScatterPoint, ScatterRow,
};

/// The reports the builder knows how to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Side x DTE bucket x log-moneyness bucket
    ReturnsByBucket,
    /// Same grouping, liquid quotes with a resolved expiration only
    RiskAdjusted,
    /// Side x quarter x DTE bucket x log-moneyness bucket
    ByQuarter,
    /// Stratified delta sample, unaggregated
    DeltaScatter,
    /// Side x near-event flag x DTE bucket x log-moneyness bucket
    ByEvent,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::ReturnsByBucket,
        ReportKind::RiskAdjusted,
        ReportKind::ByQuarter,
        ReportKind::DeltaScatter,
        ReportKind::ByEvent,
    ];

    /// File-friendly name, e.g. `returns_by_bucket`
    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::ReturnsByBucket => "returns_by_bucket",
            ReportKind::RiskAdjusted => "risk_adjusted",
            ReportKind::ByQuarter => "by_quarter",
            ReportKind::DeltaScatter => "delta_scatter",
            ReportKind::ByEvent => "by_event",
        }
    }

    /// Grouping dimensions; `None` for the scatter sample
    pub fn dimensions(&self) -> Option<Vec<Dimension>> {
        let extra = match self {
            ReportKind::ReturnsByBucket | ReportKind::RiskAdjusted => None,
            ReportKind::ByQuarter => Some(Dimension::Quarter),
            ReportKind::ByEvent => Some(Dimension::NearEvent),
            ReportKind::DeltaScatter => return None,
        };

        let mut dims = vec![Dimension::OptionSide];
        dims.extend(extra);
        dims.extend([Dimension::DteBucket, Dimension::LogMoneynessBucket]);
        Some(dims)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportKind {
    type Err = AnalysisError;

    /// Accepts `returns-by-bucket` as well as `returns_by_bucket`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        ReportKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| AnalysisError::invalid_input(format!("Unknown report kind: {}", s)))
    }
}

/// A finished report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Report {
    Aggregate {
        kind: ReportKind,
        dimensions: Vec<Dimension>,
        cells: Vec<AggregateCell>,
    },
    Scatter(Vec<ScatterRow>),
}

impl Report {
    pub fn kind(&self) -> ReportKind {
        match self {
            Report::Aggregate { kind, .. } => *kind,
            Report::Scatter(_) => ReportKind::DeltaScatter,
        }
    }

    /// Number of output rows
    pub fn len(&self) -> usize {
        match self {
            Report::Aggregate { cells, .. } => cells.len(),
            Report::Scatter(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReturnRecord {
    /// Aggregation record of one enriched observation
    pub fn from_enriched(enriched: &EnrichedObservation, calendar: &EventCalendar) -> Self {
        let quote_date = enriched.observation.quote_date;
        Self {
            option_side: enriched.observation.option_side,
            dte_bucket: enriched.features.dte_bucket.clone(),
            log_m_bucket: enriched.features.log_moneyness_bucket.clone(),
            quarter: quote_date.map(Quarter::from_timestamp),
            near_event: quote_date
                .and_then(|d| calendar.tag(d))
                .map(|p| p.near_event),
            return_exp: enriched.outcome.return_exp,
        }
    }
}

/// Builds reports from enriched observations
pub struct ReportBuilder {
    config: PipelineConfig,
    calendar: EventCalendar,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let calendar = EventCalendar::from_config(&config.events);
        Self { config, calendar }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn calendar(&self) -> &EventCalendar {
        &self.calendar
    }

    /// Build one report
    pub fn build(&self, kind: ReportKind, enriched: &[EnrichedObservation]) -> Report {
        let report = match kind {
            ReportKind::ReturnsByBucket => self.returns_by_bucket(enriched),
            ReportKind::RiskAdjusted => self.risk_adjusted(enriched),
            ReportKind::ByQuarter => self.by_quarter(enriched),
            ReportKind::DeltaScatter => self.delta_scatter(enriched),
            ReportKind::ByEvent => self.by_event(enriched),
        };
        tracing::info!("Built {} report with {} rows", kind, report.len());
        report
    }

    /// Build every report in [`ReportKind::ALL`] order
    pub fn build_all(&self, enriched: &[EnrichedObservation]) -> Vec<Report> {
        ReportKind::ALL
            .iter()
            .map(|kind| self.build(*kind, enriched))
            .collect()
    }

    pub fn returns_by_bucket(&self, enriched: &[EnrichedObservation]) -> Report {
        self.aggregate(ReportKind::ReturnsByBucket, enriched.iter())
    }

    /// Restricted to `mid > risk_min_mid` and a resolved S_exp
    pub fn risk_adjusted(&self, enriched: &[EnrichedObservation]) -> Report {
        let min_mid = self.config.aggregation.risk_min_mid;
        let liquid = enriched.iter().filter(|e| {
            e.outcome.s_exp.is_some() && e.observation.mid.is_some_and(|m| m > min_mid)
        });
        self.aggregate(ReportKind::RiskAdjusted, liquid)
    }

    pub fn by_quarter(&self, enriched: &[EnrichedObservation]) -> Report {
        self.aggregate(ReportKind::ByQuarter, enriched.iter())
    }

    pub fn by_event(&self, enriched: &[EnrichedObservation]) -> Report {
        self.aggregate(ReportKind::ByEvent, enriched.iter())
    }

    /// Seeded stratified sample of delta against clamped return
    pub fn delta_scatter(&self, enriched: &[EnrichedObservation]) -> Report {
        let clamp = &self.config.aggregation;
        let points: Vec<ScatterPoint> = enriched
            .iter()
            .filter_map(|e| {
                let ret = e.return_exp().filter(|r| !r.is_nan())?;
                Some(ScatterPoint {
                    option_side: e.observation.option_side,
                    greeks: e.observation.greeks,
                    return_exp: clamp.clamp(ret),
                })
            })
            .collect();

        Report::Scatter(stratified_sample(&points, &self.config.sampling))
    }

    fn aggregate<'a>(
        &self,
        kind: ReportKind,
        enriched: impl Iterator<Item = &'a EnrichedObservation>,
    ) -> Report {
        let dimensions = kind.dimensions().unwrap_or_default();
        let records: Vec<ReturnRecord> = enriched
            .map(|e| ReturnRecord::from_enriched(e, &self.calendar))
            .collect();

        let aggregator = Aggregator::with_config(dimensions.clone(), self.config.aggregation.clone());
        Report::Aggregate {
            kind,
            dimensions,
            cells: aggregator.aggregate(&records),
        }
    }
}

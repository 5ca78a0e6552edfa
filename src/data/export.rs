//! CSV export and import
//!
//! The enriched observation table is the hand-off artifact between
//! preprocessing and reporting; its column set is fixed by [`ExportRow`].
//! Reports are written one CSV per report.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{AggregateCell, Dimension, Report, ReportBuilder};
use crate::config::{BinConfig, PipelineConfig};
use crate::core::{AnalysisError, AnalysisResult, ContractObservation, GreekSnapshot, OptionSide};
use crate::pipeline::{
    mirrored_log_moneyness, ContractFeatures, EnrichedObservation, ExpirationOutcome, Preprocessor,
};

use super::source::RawTable;

/// One flat row of the enriched table. Missing values are empty fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub quote_date: Option<DateTime<Utc>>,
    pub expire_date: Option<DateTime<Utc>>,
    pub dte: Option<f64>,
    pub dte_int: Option<i64>,
    pub underlying_price: Option<f64>,
    pub strike: Option<f64>,
    pub option_side: OptionSide,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub mid: Option<f64>,
    pub volume: Option<u64>,
    pub open_interest: Option<u64>,
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
    pub iv: Option<f64>,
    pub moneyness: Option<f64>,
    pub log_moneyness: Option<f64>,
    pub dte_bucket: Option<String>,
    pub moneyness_bucket: Option<String>,
    pub log_m_bucket: Option<String>,
    pub s_exp: Option<f64>,
    pub payoff: Option<f64>,
    pub return_exp: Option<f64>,
}

impl From<&EnrichedObservation> for ExportRow {
    fn from(e: &EnrichedObservation) -> Self {
        let obs = &e.observation;
        Self {
            quote_date: obs.quote_date,
            expire_date: obs.expire_date,
            dte: obs.dte,
            dte_int: e.features.dte_int,
            underlying_price: obs.underlying_price,
            strike: obs.strike,
            option_side: obs.option_side,
            bid: obs.bid,
            ask: obs.ask,
            last: obs.last,
            mid: obs.mid,
            volume: obs.volume,
            open_interest: obs.open_interest,
            delta: obs.greeks.delta,
            gamma: obs.greeks.gamma,
            theta: obs.greeks.theta,
            vega: obs.greeks.vega,
            iv: obs.greeks.iv,
            moneyness: e.features.moneyness,
            log_moneyness: e.features.log_moneyness,
            dte_bucket: e.features.dte_bucket.as_ref().map(|b| b.label.clone()),
            moneyness_bucket: e.features.moneyness_bucket.as_ref().map(|b| b.label.clone()),
            log_m_bucket: e.features.log_moneyness_bucket.as_ref().map(|b| b.label.clone()),
            s_exp: e.outcome.s_exp,
            payoff: e.outcome.payoff,
            return_exp: e.outcome.return_exp,
        }
    }
}

impl ExportRow {
    /// Rebuild the enriched observation, re-bucketing with `bins`
    pub fn into_enriched(self, bins: &BinConfig) -> EnrichedObservation {
        let observation = ContractObservation {
            quote_date: self.quote_date,
            expire_date: self.expire_date,
            dte: self.dte,
            underlying_price: self.underlying_price,
            strike: self.strike,
            option_side: self.option_side,
            bid: self.bid,
            ask: self.ask,
            last: self.last,
            mid: self.mid,
            volume: self.volume,
            open_interest: self.open_interest,
            greeks: GreekSnapshot::new(self.delta, self.gamma, self.theta, self.vega, self.iv),
        };

        // older exports may lack log_moneyness; derive it from moneyness
        let log_moneyness = self
            .log_moneyness
            .or_else(|| mirrored_log_moneyness(self.moneyness, self.option_side));

        let features = ContractFeatures {
            dte_int: self.dte_int,
            moneyness: self.moneyness,
            log_moneyness,
            dte_bucket: self.dte_int.and_then(|d| bins.dte.bucket(d as f64)),
            moneyness_bucket: self.moneyness.and_then(|m| bins.moneyness.bucket(m)),
            log_moneyness_bucket: log_moneyness.and_then(|l| bins.log_moneyness.bucket(l)),
        };

        EnrichedObservation {
            observation,
            features,
            outcome: ExpirationOutcome {
                s_exp: self.s_exp,
                payoff: self.payoff,
                return_exp: self.return_exp,
            },
        }
    }
}

fn csv_error(e: csv::Error) -> AnalysisError {
    AnalysisError::Serialization(e.to_string())
}

/// Write the enriched table to any byte sink
pub fn write_enriched<W: Write>(writer: W, enriched: &[EnrichedObservation]) -> AnalysisResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for e in enriched {
        wtr.serialize(ExportRow::from(e)).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the enriched table to a CSV file
pub fn write_enriched_csv(path: impl AsRef<Path>, enriched: &[EnrichedObservation]) -> AnalysisResult<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    write_enriched(File::create(path)?, enriched)?;
    tracing::info!("Wrote {} enriched rows to {:?}", enriched.len(), path);
    Ok(())
}

/// Columns reports cannot be built without
const REQUIRED_IMPORT_COLUMNS: [&str; 4] = ["quote_date", "option_side", "dte_int", "return_exp"];

/// Fail with a schema error naming every absent column the reports need.
/// `log_moneyness` may be absent when `moneyness` is present.
fn check_import_header(headers: &csv::StringRecord) -> AnalysisResult<()> {
    let has = |name: &str| headers.iter().any(|h| h.trim() == name);

    let mut missing: Vec<String> = REQUIRED_IMPORT_COLUMNS
        .iter()
        .filter(|c| !has(**c))
        .map(|c| c.to_string())
        .collect();
    if !has("log_moneyness") && !has("moneyness") {
        missing.push("log_moneyness (or moneyness)".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AnalysisError::schema("enriched import", missing))
    }
}

/// Read an enriched table from any byte stream
pub fn read_enriched<R: Read>(reader: R, bins: &BinConfig) -> AnalysisResult<Vec<EnrichedObservation>> {
    let mut rdr = csv::Reader::from_reader(reader);
    check_import_header(rdr.headers().map_err(csv_error)?)?;
    rdr.deserialize::<ExportRow>()
        .map(|row| row.map(|r| r.into_enriched(bins)).map_err(csv_error))
        .collect()
}

/// Read a previously exported enriched table
pub fn read_enriched_csv(path: impl AsRef<Path>, bins: &BinConfig) -> AnalysisResult<Vec<EnrichedObservation>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AnalysisError::MissingInput(path.display().to_string()));
    }
    let enriched = read_enriched(File::open(path)?, bins)?;
    tracing::info!("Read {} enriched rows from {:?}", enriched.len(), path);
    Ok(enriched)
}

const STAT_COLUMNS: [&str; 6] = ["n", "mean_return", "std_return", "downside_std", "sharpe", "sortino"];

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn cell_record(cell: &AggregateCell) -> Vec<String> {
    let mut record: Vec<String> = cell.key.iter().map(|k| k.to_string()).collect();
    record.push(cell.stats.n.to_string());
    record.push(cell.stats.mean_return.to_string());
    record.push(optional(cell.stats.std_return));
    record.push(optional(cell.stats.downside_std));
    record.push(optional(cell.stats.sharpe));
    record.push(optional(cell.stats.sortino));
    record
}

/// Write one report to any byte sink
pub fn write_report_to<W: Write>(writer: W, report: &Report) -> AnalysisResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    match report {
        Report::Aggregate { dimensions, cells, .. } => {
            let header: Vec<&str> = dimensions
                .iter()
                .map(Dimension::column)
                .chain(STAT_COLUMNS)
                .collect();
            wtr.write_record(&header).map_err(csv_error)?;
            for cell in cells {
                wtr.write_record(cell_record(cell)).map_err(csv_error)?;
            }
        }
        Report::Scatter(rows) => {
            for row in rows {
                wtr.serialize(row).map_err(csv_error)?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Write one report to a CSV file
pub fn write_report(path: impl AsRef<Path>, report: &Report) -> AnalysisResult<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    write_report_to(File::create(path)?, report)?;
    tracing::info!("Wrote {} report ({} rows) to {:?}", report.kind(), report.len(), path);
    Ok(())
}

/// Preprocess `input` and write `enriched.csv` plus one CSV per report
/// into `out_dir`. Nothing is written unless every stage succeeds.
pub fn run_to_dir(
    input: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    config: &PipelineConfig,
) -> AnalysisResult<Vec<PathBuf>> {
    let out_dir = out_dir.as_ref();
    let raw = RawTable::from_path(input)?;
    let enriched = Preprocessor::with_config(config.clone()).run_raw(&raw)?;
    let reports = ReportBuilder::with_config(config.clone()).build_all(&enriched);

    let mut written = vec![out_dir.join("enriched.csv")];
    write_enriched_csv(&written[0], &enriched)?;
    for report in &reports {
        let path = out_dir.join(format!("{}.csv", report.kind().name()));
        write_report(&path, report)?;
        written.push(path);
    }

    tracing::info!("Wrote {} reports to {:?}", reports.len(), out_dir);
    Ok(written)
}

fn ensure_parent(path: &Path) -> AnalysisResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Bucket, GroupStats, KeyValue, ReportKind, ScatterRow};
    use tempfile::tempdir;

    fn enriched() -> Vec<EnrichedObservation> {
        let text = "QUOTE_DATE,EXPIRE_DATE,DTE,UNDERLYING_LAST,STRIKE,C_BID,C_ASK,C_DELTA,C_VOLUME,P_BID,P_ASK,P_DELTA\n\
                    2021-01-04,2021-01-08,4,130,120,11,13,0.8,15,0.5,0.7,-0.2\n\
                    2021-01-08,2021-01-08,0,135,120,14.9,15.1,1.0,,,,\n";
        let raw = RawTable::from_reader(text.as_bytes()).unwrap();
        Preprocessor::new().run_raw(&raw).unwrap()
    }

    #[test]
    fn test_export_header_and_missing_fields() {
        let mut buf = Vec::new();
        write_enriched(&mut buf, &enriched()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "quote_date,expire_date,dte,dte_int,underlying_price,strike,option_side,bid,ask,last,mid,\
             volume,open_interest,delta,gamma,theta,vega,iv,moneyness,log_moneyness,dte_bucket,\
             moneyness_bucket,log_m_bucket,s_exp,payoff,return_exp"
        );
        let first = lines.next().unwrap();
        assert!(first.starts_with("2021-01-04T00:00:00Z,2021-01-08T00:00:00Z,"));
        assert!(first.contains(",CALL,"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn test_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("enriched.csv");
        let original = enriched();

        write_enriched_csv(&path, &original).unwrap();
        let restored = read_enriched_csv(&path, &BinConfig::default()).unwrap();

        assert_eq!(restored.len(), original.len());
        assert_eq!(restored[0].observation.volume, Some(15));
        assert_eq!(restored[0].features.dte_bucket, original[0].features.dte_bucket);
        assert_eq!(restored[0].outcome, original[0].outcome);
        assert_eq!(restored[3].observation.mid, None);
    }

    #[test]
    fn test_export_bytes_stable() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        write_enriched(&mut a, &enriched()).unwrap();
        write_enriched(&mut b, &enriched()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_input() {
        let err = read_enriched_csv("/nonexistent/enriched.csv", &BinConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingInput(_)));
    }

    #[test]
    fn test_import_missing_return_column() {
        let text = "quote_date,expire_date,dte_int,strike,underlying_price,option_side,mid,moneyness\n\
                    2021-01-04T00:00:00Z,2021-01-08T00:00:00Z,4,120,130,CALL,12,1.0833\n\
                    2021-01-04T00:00:00Z,2021-01-08T00:00:00Z,4,120,130,PUT,0.6,1.0833\n";
        let err = read_enriched(text.as_bytes(), &BinConfig::default()).unwrap_err();
        match err {
            AnalysisError::Schema { missing, .. } => {
                assert_eq!(missing, vec!["return_exp".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_import_needs_some_moneyness() {
        let text = "quote_date,dte_int,option_side,return_exp\n2021-01-04T00:00:00Z,4,CALL,0.25\n";
        let err = read_enriched(text.as_bytes(), &BinConfig::default()).unwrap_err();
        assert!(err.to_string().contains("log_moneyness (or moneyness)"));

        // moneyness alone is enough; log-moneyness is derived
        let text = "quote_date,dte_int,option_side,moneyness,return_exp\n2021-01-04T00:00:00Z,4,PUT,1.3,0.25\n";
        let restored = read_enriched(text.as_bytes(), &BinConfig::default()).unwrap();
        assert!((restored[0].features.log_moneyness.unwrap() + 1.3_f64.ln()).abs() < 1e-12);
        assert_eq!(restored[0].features.log_moneyness_bucket.as_ref().unwrap().label, "-0.3 – -0.1");
    }

    #[test]
    fn test_run_to_dir_writes_all_outputs() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("quotes.csv");
        fs::write(
            &input,
            "QUOTE_DATE,EXPIRE_DATE,DTE,UNDERLYING_LAST,STRIKE,C_BID,C_ASK,C_DELTA,P_BID,P_ASK,P_DELTA\n\
             2021-01-04,2021-01-08,4,130,120,11,13,0.8,0.5,0.7,-0.2\n\
             2021-01-08,2021-01-08,0,135,120,14.9,15.1,1.0,0.01,0.03,0.0\n",
        )
        .unwrap();

        let out_dir = dir.path().join("out");
        let written = run_to_dir(&input, &out_dir, &PipelineConfig::default()).unwrap();
        assert_eq!(written.len(), 6);
        assert!(written.iter().all(|p| p.exists()));
        assert!(out_dir.join("returns_by_bucket.csv").exists());
    }

    #[test]
    fn test_run_to_dir_writes_nothing_on_failure() {
        let dir = tempdir().unwrap();
        let out_dir = dir.path().join("out");

        // missing input artifact
        let err = run_to_dir(dir.path().join("absent.csv"), &out_dir, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingInput(_)));
        assert!(!out_dir.exists());

        // required column absent
        let input = dir.path().join("quotes.csv");
        fs::write(&input, "QUOTE_DATE,EXPIRE_DATE,DTE,STRIKE\n2021-01-04,2021-01-08,4,120\n").unwrap();
        let err = run_to_dir(&input, &out_dir, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Schema { .. }));
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_aggregate_report_csv() {
        let report = Report::Aggregate {
            kind: ReportKind::ReturnsByBucket,
            dimensions: vec![Dimension::OptionSide, Dimension::DteBucket],
            cells: vec![AggregateCell {
                key: vec![KeyValue::Side(OptionSide::Put), KeyValue::Bucket(Bucket::new(0, "0-7"))],
                stats: GroupStats {
                    n: 1,
                    mean_return: -1.0,
                    std_return: None,
                    downside_std: None,
                    sharpe: None,
                    sortino: None,
                },
            }],
        };

        let mut buf = Vec::new();
        write_report_to(&mut buf, &report).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "option_side,dte_bucket,n,mean_return,std_return,downside_std,sharpe,sortino\nPUT,0-7,1,-1,,,,\n"
        );
    }

    #[test]
    fn test_scatter_report_csv() {
        let report = Report::Scatter(vec![ScatterRow {
            option_side: OptionSide::Call,
            delta: 0.5,
            gamma: None,
            theta: None,
            vega: None,
            iv: Some(0.3),
            return_exp: 0.25,
            delta_bin: 3,
        }]);

        let dir = tempdir().unwrap();
        let path = dir.path().join("delta_scatter.csv");
        write_report(&path, &report).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "option_side,delta,gamma,theta,vega,iv,return_exp,delta_bin\nCALL,0.5,,,,0.3,0.25,3\n"
        );
    }
}

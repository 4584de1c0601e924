//! 분석 오케스트레이터
//!
//! [`Analyzer`]는 파일 하나를 다음 단계로 처리합니다:
//!
//! ```text
//! DetectingFormat -> Parsing -> Detecting -> Enriching -> Aggregating -> Done
//!                                                  (실패 시 어느 단계에서든 Failed)
//! ```
//!
//! 파이프라인은 동기식이며 재시도하지 않습니다. 같은 `Analyzer`는 여러 분석을
//! 동시에 처리할 수 있습니다 (`Send + Sync`, 규칙 집합은 `Arc`로 공유).

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use ironscope_core::metrics as m;

use crate::aggregate;
use crate::config::EngineConfig;
use crate::detect::{FormatDetector, FormatReport, LogFormat};
use crate::enrich;
use crate::error::AnalysisError;
use crate::parser::{BlockParser, ParseLimits, ParseOutput, TabularParser};
use crate::progress::{AnalysisStage, ProgressSender};
use crate::result::AnalysisResult;
use crate::rule::{RuleEngine, RuleSet};

/// UTF-8 BOM 바이트
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 형식 판정 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatDecision {
    /// 표 형식으로 파싱 가능
    Tabular(FormatReport),
    /// 블록 형식 (마커 수)
    Block { markers: usize },
    /// 어떤 형식으로도 인식되지 않음
    Rejected(FormatReport),
}

impl FormatDecision {
    /// 판정된 형식 레이블
    pub fn format(&self) -> LogFormat {
        match self {
            Self::Tabular(report) | Self::Rejected(report) => report.format,
            Self::Block { .. } => LogFormat::SysmonText,
        }
    }
}

/// 분석 한 번에 적용되는 옵션
///
/// `None`인 항목은 엔진 설정값을 사용합니다.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// 진행 상황 송신기
    pub progress: ProgressSender,
    /// 최대 레코드 수
    pub row_budget: Option<usize>,
    /// strict 모드
    pub strict: Option<bool>,
    /// 잘못된 레코드 기록 생략
    pub skip_invalid_silently: Option<bool>,
}

/// 분석기
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: EngineConfig,
    rules: Arc<RuleSet>,
    detector: FormatDetector,
}

impl Analyzer {
    /// 내장 규칙으로 분석기를 생성합니다.
    ///
    /// 설정이 잘못되었거나 내장 규칙 컴파일에 실패하면 에러를 반환합니다.
    pub fn new(config: EngineConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let rules = Arc::new(RuleSet::builtin()?);
        Ok(Self::with_rules(config, rules))
    }

    /// 주어진 규칙 집합으로 분석기를 생성합니다.
    pub fn with_rules(config: EngineConfig, rules: Arc<RuleSet>) -> Self {
        let detector = FormatDetector::new(config.sniff_bytes, config.min_confidence);
        Self {
            config,
            rules,
            detector,
        }
    }

    /// 엔진 설정
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 규칙 집합
    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    /// 입력 형식을 판정합니다.
    ///
    /// 표 형식 보고서가 사용 가능하면 표 형식, 아니면 블록 마커를 세어
    /// 임계값 이상이면 블록 형식, 둘 다 아니면 거부입니다.
    pub fn detect_format(&self, input: &[u8]) -> FormatDecision {
        let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
        let report = self.detector.detect(input);
        if report.is_usable(self.config.min_confidence) {
            return FormatDecision::Tabular(report);
        }

        let text = String::from_utf8_lossy(input);
        let markers = BlockParser::count_markers(&text);
        if markers >= self.config.block_marker_threshold {
            return FormatDecision::Block { markers };
        }
        debug!(
            markers,
            threshold = self.config.block_marker_threshold,
            "block markers below threshold"
        );
        FormatDecision::Rejected(report)
    }

    /// 파일을 분석합니다.
    pub fn analyze_path(
        &self,
        path: impl AsRef<Path>,
        options: &AnalysisOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| display.clone());

        let loaded = std::fs::metadata(path)
            .and_then(|meta| {
                if meta.len() > self.config.max_input_bytes {
                    Ok(Err(meta.len()))
                } else {
                    std::fs::read(path).map(Ok)
                }
            })
            .map_err(|source| AnalysisError::Io {
                path: display.clone(),
                source,
            });

        let bytes = match loaded {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(size)) => {
                return Err(self.fail(
                    AnalysisError::InputTooLarge {
                        size,
                        max: self.config.max_input_bytes,
                    },
                    options,
                ));
            }
            Err(e) => return Err(self.fail(e, options)),
        };

        self.analyze_bytes(&file_name, &bytes, options)
    }

    /// 메모리의 입력을 분석합니다.
    pub fn analyze_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
        options: &AnalysisOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        match self.run(file_name, bytes, options, started) {
            Ok(result) => {
                options.progress.report(AnalysisStage::Done, 100);
                metrics::counter!(m::ANALYSES_TOTAL, m::LABEL_RESULT => "success").increment(1);
                metrics::histogram!(
                    m::ANALYSIS_DURATION_SECONDS,
                    m::LABEL_FORMAT => result.format.label()
                )
                .record(started.elapsed().as_secs_f64());
                info!(
                    file = file_name,
                    format = result.format.label(),
                    valid = result.valid_events,
                    invalid = result.invalid_events,
                    detections = result.detections.len(),
                    elapsed_ms = result.elapsed_ms,
                    "analysis complete"
                );
                Ok(result)
            }
            Err(e) => Err(self.fail(e, options)),
        }
    }

    /// 실패 진행 상황과 메트릭을 기록하고 에러를 돌려줍니다.
    fn fail(&self, err: AnalysisError, options: &AnalysisOptions) -> AnalysisError {
        options.progress.report(AnalysisStage::Failed, 100);
        metrics::counter!(m::ANALYSES_TOTAL, m::LABEL_RESULT => err.kind()).increment(1);
        warn!(kind = err.kind(), error = %err, "analysis failed");
        err
    }

    fn limits(&self, options: &AnalysisOptions) -> ParseLimits {
        let mut limits = ParseLimits::from(&self.config);
        if let Some(budget) = options.row_budget {
            limits.row_budget = budget;
        }
        if let Some(strict) = options.strict {
            limits.strict = strict;
        }
        if let Some(silent) = options.skip_invalid_silently {
            limits.skip_invalid_silently = silent;
        }
        limits
    }

    fn run(
        &self,
        file_name: &str,
        bytes: &[u8],
        options: &AnalysisOptions,
        started: Instant,
    ) -> Result<AnalysisResult, AnalysisError> {
        let progress = &options.progress;
        let size = bytes.len() as u64;
        if size > self.config.max_input_bytes {
            return Err(AnalysisError::InputTooLarge {
                size,
                max: self.config.max_input_bytes,
            });
        }

        // --- 형식 탐지 ---
        progress.report(AnalysisStage::DetectingFormat, 0);
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let decision = self.detect_format(body);
        let format = decision.format();
        progress.report(AnalysisStage::DetectingFormat, 100);

        // --- 파싱 ---
        let limits = self.limits(options);
        let output = match decision {
            FormatDecision::Tabular(report) => {
                info!(
                    file = file_name,
                    format = format.label(),
                    confidence = report.confidence,
                    delimiter = %report.delimiter.escape_debug(),
                    "tabular format accepted"
                );
                TabularParser::new(report.delimiter_byte(), limits).parse(
                    file_name,
                    body,
                    body.len() as u64,
                    progress,
                )?
            }
            FormatDecision::Block { markers } => {
                info!(file = file_name, markers, "block format accepted");
                let text = String::from_utf8_lossy(body);
                BlockParser::new(limits).parse(&text, progress)?
            }
            FormatDecision::Rejected(report) => {
                metrics::counter!(m::FORMAT_REJECTIONS_TOTAL, m::LABEL_FORMAT => format.label())
                    .increment(1);
                return Err(AnalysisError::FormatValidation {
                    format: format.label().to_owned(),
                    confidence: report.confidence,
                    missing: report.missing_labels(),
                    suggestions: report.suggestions,
                });
            }
        };

        metrics::counter!(m::EVENTS_PARSED_TOTAL, m::LABEL_FORMAT => format.label())
            .increment(output.stats.valid as u64);
        metrics::counter!(m::EVENTS_INVALID_TOTAL, m::LABEL_FORMAT => format.label())
            .increment(output.stats.invalid as u64);

        if output.stats.valid == 0 {
            return Err(AnalysisError::EmptyResult {
                total: output.stats.total,
                invalid: output.stats.invalid,
            });
        }

        self.finish(file_name, format, output, progress, started)
    }

    /// 탐지, 보강, 집계 단계
    fn finish(
        &self,
        file_name: &str,
        format: LogFormat,
        output: ParseOutput,
        progress: &ProgressSender,
        started: Instant,
    ) -> Result<AnalysisResult, AnalysisError> {
        let ParseOutput {
            events,
            errors,
            stats,
            truncated,
        } = output;

        // --- 탐지 ---
        progress.report(AnalysisStage::Detecting, 0);
        let engine = RuleEngine::new(Arc::clone(&self.rules), self.config.max_samples);
        let detections = engine.evaluate(&events);
        for detection in &detections {
            metrics::counter!(
                m::DETECTIONS_TOTAL,
                m::LABEL_SEVERITY => detection.severity.as_str()
            )
            .increment(1);
        }
        progress.report(AnalysisStage::Detecting, 100);

        // --- 보강 ---
        progress.report(AnalysisStage::Enriching, 0);
        let detections = enrich::enrich_all(detections);
        progress.report(AnalysisStage::Enriching, 100);

        // --- 집계 ---
        progress.report(AnalysisStage::Aggregating, 0);
        let severity_totals = aggregate::severity_totals(&detections);
        let top_tactics = aggregate::top_tactics(&detections, self.config.top_tactics);
        let event_types = aggregate::event_type_histogram(&events);
        let categories = aggregate::category_counts(&events);
        let (first_timestamp, last_timestamp) = aggregate::timestamp_bounds(&events);
        progress.report(AnalysisStage::Aggregating, 100);

        debug!(
            high = severity_totals.high,
            medium = severity_totals.medium,
            low = severity_totals.low,
            "aggregation complete"
        );

        Ok(AnalysisResult {
            file_name: file_name.to_owned(),
            format,
            total_events: stats.total,
            valid_events: stats.valid,
            invalid_events: stats.invalid,
            parse_errors: errors.iter().map(ToString::to_string).collect(),
            truncated,
            analyzed_at: Utc::now(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            first_timestamp,
            last_timestamp,
            network_events: categories.network,
            file_events: categories.file,
            registry_events: categories.registry,
            detections,
            severity_totals,
            top_tactics,
            event_types,
        })
    }
}

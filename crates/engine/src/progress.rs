//! 진행 상황 보고
//!
//! 엔진은 동기식으로 동작하며, 진행 상황은 bounded `tokio::sync::mpsc` 채널로
//! 전달됩니다. [`ProgressSender`]는 `try_send`만 사용하므로 소비자가 느려도
//! 파싱이 차단되지 않습니다 (채널이 가득 차면 해당 업데이트는 버려짐).
//!
//! 채널의 마지막 슬롯은 종료 단계(`Done`, `Failed`)용으로 남겨 두므로
//! 소비자는 항상 종료 업데이트를 받습니다.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::trace;

/// 분석 단계
///
/// `DetectingFormat → Parsing → Detecting → Enriching → Aggregating → Done`
/// 순서로 진행되며, 실패 시 `Failed`로 종료됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    DetectingFormat,
    Parsing,
    Detecting,
    Enriching,
    Aggregating,
    Done,
    Failed,
}

impl AnalysisStage {
    /// 사람이 읽을 수 있는 단계 이름
    pub fn label(self) -> &'static str {
        match self {
            Self::DetectingFormat => "Detecting format",
            Self::Parsing => "Parsing",
            Self::Detecting => "Detecting threats",
            Self::Enriching => "Enriching",
            Self::Aggregating => "Aggregating",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }

    /// 분석이 끝났음을 나타내는 단계인지 여부
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// 전체 진행률에서 이 단계가 차지하는 구간 (시작, 끝)
    fn span(self) -> (u8, u8) {
        match self {
            Self::DetectingFormat => (0, 5),
            Self::Parsing => (5, 80),
            Self::Detecting => (80, 90),
            Self::Enriching => (90, 95),
            Self::Aggregating => (95, 99),
            Self::Done | Self::Failed => (100, 100),
        }
    }

    /// 단계 내부 진행률(0-100)을 전체 진행률로 환산합니다.
    pub fn overall_percent(self, within: u8) -> u8 {
        let (start, end) = self.span();
        let within = u16::from(within.min(100));
        let width = u16::from(end - start);
        // 결과는 항상 end 이하이므로 u8 범위를 벗어나지 않음
        (u16::from(start) + width * within / 100) as u8
    }
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 진행 상황 업데이트
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// 현재 단계
    pub stage: AnalysisStage,
    /// 전체 진행률 (0-100)
    pub percent: u8,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}%)", self.stage, self.percent)
    }
}

/// 비차단 진행 상황 송신기
///
/// 수신자가 없거나 채널이 가득 찬 경우 업데이트를 조용히 버립니다.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender {
    tx: Option<mpsc::Sender<Progress>>,
}

impl ProgressSender {
    /// 채널 송신자를 감쌉니다.
    pub fn new(tx: mpsc::Sender<Progress>) -> Self {
        Self { tx: Some(tx) }
    }

    /// 아무것도 보내지 않는 송신기
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// 단계 내부 진행률을 전체 진행률로 환산하여 보고합니다.
    pub fn report(&self, stage: AnalysisStage, within: u8) {
        self.send(Progress {
            stage,
            percent: stage.overall_percent(within),
        });
    }

    /// 업데이트를 전송합니다 (비차단).
    ///
    /// 종료 단계가 아닌 업데이트는 남은 슬롯이 하나뿐이면 버려집니다.
    pub fn send(&self, progress: Progress) {
        let Some(tx) = &self.tx else {
            return;
        };
        if !progress.stage.is_terminal() && tx.capacity() <= 1 {
            trace!(progress = %progress, "progress slot reserved for final update, dropping");
            return;
        }
        match tx.try_send(progress) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                trace!(progress = %dropped, "progress channel full, dropping update");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// 진행 상황 채널을 생성합니다.
///
/// 종료 업데이트용 슬롯을 포함해 용량은 최소 2입니다.
pub fn channel(capacity: usize) -> (ProgressSender, mpsc::Receiver<Progress>) {
    let (tx, rx) = mpsc::channel(capacity.max(2));
    (ProgressSender::new(tx), rx)
}

//! Size and duration policy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use vavatar_common::config::{IngestConfig, DEFAULT_MAX_CLIP_BYTES, DEFAULT_MAX_CLIP_SECONDS};

use super::acquirer::StagedAsset;
use super::duration_probe::ProbeResult;

/// Largest accepted clip
pub const MAX_CLIP_BYTES: u64 = DEFAULT_MAX_CLIP_BYTES;

/// Longest accepted clip
pub const MAX_CLIP_DURATION: Duration = Duration::from_secs(DEFAULT_MAX_CLIP_SECONDS);

/// Why a descriptor did not become an entry
///
/// Listed in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    TooLarge,
    DurationUnavailable,
    TooLong,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::TooLarge => "too_large",
            RejectReason::DurationUnavailable => "duration_unavailable",
            RejectReason::TooLong => "too_long",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one probed asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept(Duration),
    Reject(RejectReason),
}

/// Size and duration ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub max_bytes: u64,
    pub max_duration: Duration,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_CLIP_BYTES,
            max_duration: MAX_CLIP_DURATION,
        }
    }
}

impl ValidationPolicy {
    /// Policy from config, clamped so it can only tighten the defaults
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            max_bytes: config.max_clip_bytes.min(MAX_CLIP_BYTES),
            max_duration: Duration::from_secs(config.max_clip_seconds).min(MAX_CLIP_DURATION),
        }
    }

    /// Classify a probed asset; never fails
    pub fn validate(&self, asset: &StagedAsset, probe: &ProbeResult) -> Verdict {
        let size = asset.descriptor.size_bytes.max(asset.content.len() as u64);
        if size > self.max_bytes {
            return Verdict::Reject(RejectReason::TooLarge);
        }
        if !probe.succeeded || probe.duration.is_zero() {
            return Verdict::Reject(RejectReason::DurationUnavailable);
        }
        if probe.duration > self.max_duration {
            return Verdict::Reject(RejectReason::TooLong);
        }
        Verdict::Accept(probe.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SelectionDescriptor;
    use crate::services::duration_probe::DurationSource;

    fn asset(size_bytes: u64) -> StagedAsset {
        let mut descriptor = SelectionDescriptor::from_bytes("clip.wav", vec![0u8; 4]);
        descriptor.size_bytes = size_bytes;
        StagedAsset {
            content: descriptor.raw_bytes.clone().unwrap(),
            descriptor,
            transient: None,
        }
    }

    fn probed(secs: u64) -> ProbeResult {
        ProbeResult::resolved(Duration::from_secs(secs), DurationSource::Signal)
    }

    #[test]
    fn test_accepts_within_limits() {
        let policy = ValidationPolicy::default();
        assert_eq!(
            policy.validate(&asset(2 * 1024 * 1024), &probed(90)),
            Verdict::Accept(Duration::from_secs(90))
        );
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let policy = ValidationPolicy::default();
        assert_eq!(
            policy.validate(&asset(MAX_CLIP_BYTES), &probed(300)),
            Verdict::Accept(MAX_CLIP_DURATION)
        );
        assert_eq!(
            policy.validate(&asset(MAX_CLIP_BYTES + 1), &probed(10)),
            Verdict::Reject(RejectReason::TooLarge)
        );
        assert_eq!(
            policy.validate(&asset(10), &probed(301)),
            Verdict::Reject(RejectReason::TooLong)
        );
    }

    #[test]
    fn test_reason_priority() {
        let policy = ValidationPolicy::default();
        // Too large wins over a failed probe
        assert_eq!(
            policy.validate(&asset(MAX_CLIP_BYTES + 1), &ProbeResult::unavailable()),
            Verdict::Reject(RejectReason::TooLarge)
        );
        assert_eq!(
            policy.validate(&asset(10), &ProbeResult::unavailable()),
            Verdict::Reject(RejectReason::DurationUnavailable)
        );
    }

    #[test]
    fn test_config_cannot_loosen_policy() {
        let config = IngestConfig {
            max_clip_bytes: MAX_CLIP_BYTES * 4,
            max_clip_seconds: 60,
            ..IngestConfig::default()
        };
        let policy = ValidationPolicy::from_config(&config);
        assert_eq!(policy.max_bytes, MAX_CLIP_BYTES);
        assert_eq!(policy.max_duration, Duration::from_secs(60));
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(RejectReason::DurationUnavailable.to_string(), "duration_unavailable");
        assert_eq!(
            serde_json::to_string(&RejectReason::TooLong).unwrap(),
            "\"too_long\""
        );
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loader configuration.

use std::time::Duration;

/// Loader configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoaderConfig {
    /// Queue length at which the transport is asked to pause (unbounded when unset).
    pub max_queued_frames: Option<usize>,
    /// Maximum frames processed per `drain()` call (all queued frames when unset).
    pub frames_per_drain: Option<usize>,
    /// Fail the session when no frame arrives for this many seconds.
    pub session_timeout_secs: Option<u64>,
    /// Object count reported in progress events (translation table size when unset).
    pub nr_objects_total: Option<usize>,
}

impl LoaderConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables leave the default in place.
    pub fn from_env() -> Self {
        Self {
            max_queued_frames: env_parse("IFC_STREAM_MAX_QUEUED_FRAMES"),
            frames_per_drain: env_parse("IFC_STREAM_FRAMES_PER_DRAIN"),
            session_timeout_secs: env_parse("IFC_STREAM_SESSION_TIMEOUT_SECS"),
            nr_objects_total: env_parse("IFC_STREAM_OBJECTS_TOTAL"),
        }
    }

    pub fn session_timeout(&self) -> Option<Duration> {
        self.session_timeout_secs.map(Duration::from_secs)
    }

    pub fn with_max_queued_frames(mut self, frames: usize) -> Self {
        self.max_queued_frames = Some(frames);
        self
    }

    pub fn with_frames_per_drain(mut self, frames: usize) -> Self {
        self.frames_per_drain = Some(frames);
        self
    }

    pub fn with_session_timeout_secs(mut self, secs: u64) -> Self {
        self.session_timeout_secs = Some(secs);
        self
    }

    pub fn with_nr_objects_total(mut self, total: usize) -> Self {
        self.nr_objects_total = Some(total);
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded() {
        let config = LoaderConfig::default();
        assert_eq!(config.max_queued_frames, None);
        assert_eq!(config.session_timeout(), None);
    }

    #[test]
    fn test_builder_methods() {
        let config = LoaderConfig::default()
            .with_max_queued_frames(64)
            .with_frames_per_drain(1)
            .with_session_timeout_secs(30)
            .with_nr_objects_total(10);
        assert_eq!(config.max_queued_frames, Some(64));
        assert_eq!(config.frames_per_drain, Some(1));
        assert_eq!(config.session_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.nr_objects_total, Some(10));
    }

    #[test]
    fn test_env_parse_ignores_garbage() {
        std::env::set_var("IFC_STREAM_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_parse::<usize>("IFC_STREAM_TEST_GARBAGE"), None);
        std::env::set_var("IFC_STREAM_TEST_NUMBER", " 12 ");
        assert_eq!(env_parse::<usize>("IFC_STREAM_TEST_NUMBER"), Some(12));
        assert_eq!(env_parse::<usize>("IFC_STREAM_TEST_UNSET_VARIABLE"), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_partial() {
        let config: LoaderConfig = serde_json::from_str(r#"{ "session_timeout_secs": 90 }"#).unwrap();
        assert_eq!(config.session_timeout_secs, Some(90));
        assert_eq!(config.max_queued_frames, None);
    }
}

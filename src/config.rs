//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::job::JobKind;

/// HTTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the API server (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable permissive CORS (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
        }
    }
}

/// External tool paths
///
/// Both tools are looked up on PATH when not set explicitly; see
/// [`ToolsConfig::resolve`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the acquisition binary (default: discover `yt-dlp` on PATH)
    #[serde(default)]
    pub acquisition_path: Option<PathBuf>,

    /// Path to the transcoding binary (default: discover `ffmpeg` on PATH)
    #[serde(default)]
    pub transcode_path: Option<PathBuf>,
}

impl ToolsConfig {
    /// Resolve a configured tool path, falling back to PATH discovery
    pub fn resolve(configured: &Option<PathBuf>, name: &str) -> Option<PathBuf> {
        match configured {
            Some(path) => Some(path.clone()),
            None => which::which(name).ok(),
        }
    }
}

/// Wall-clock limits for external processes
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Timeout for single-video acquisition (default: 5 min)
    #[serde(default = "default_single_timeout")]
    pub video_timeout: Duration,

    /// Timeout for single-audio acquisition (default: 5 min)
    #[serde(default = "default_single_timeout")]
    pub audio_timeout: Duration,

    /// Timeout for playlist acquisition (default: 20 min)
    #[serde(default = "default_playlist_timeout")]
    pub playlist_timeout: Duration,

    /// Timeout for the transcoding pass (default: 5 min)
    #[serde(default = "default_single_timeout")]
    pub transcode_timeout: Duration,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            video_timeout: default_single_timeout(),
            audio_timeout: default_single_timeout(),
            playlist_timeout: default_playlist_timeout(),
            transcode_timeout: default_single_timeout(),
        }
    }
}

impl LimitsConfig {
    /// Acquisition timeout for a given job kind
    pub fn acquisition_timeout(&self, kind: JobKind) -> Duration {
        match kind {
            JobKind::SingleVideo => self.video_timeout,
            JobKind::SingleAudio => self.audio_timeout,
            JobKind::Playlist => self.playlist_timeout,
        }
    }
}

/// Default quality values applied when the caller omits `quality`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default video resolution ceiling in pixels (default: "720")
    #[serde(default = "default_video_quality")]
    pub video_quality: String,

    /// Default audio bitrate in kbit/s (default: "192")
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            video_quality: default_video_quality(),
            audio_quality: default_audio_quality(),
        }
    }
}

/// Main configuration for media-dl
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Process timeouts
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Default quality values
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Root directory under which per-job workspaces are created
    /// (default: `<system temp dir>/media-dl`)
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            tools: ToolsConfig::default(),
            limits: LimitsConfig::default(),
            defaults: DefaultsConfig::default(),
            workspace_root: default_workspace_root(),
        }
    }
}

impl Config {
    /// Build a config from the environment
    ///
    /// Reads `PORT` for the listening port, falling back to 3000 when unset
    /// or unparsable. All other fields take their defaults.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.server.bind_address = SocketAddr::from(([0, 0, 0, 0], port));
            } else {
                tracing::warn!(value = %port, "ignoring unparsable PORT variable");
            }
        }
        config
    }
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_true() -> bool {
    true
}

fn default_single_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_playlist_timeout() -> Duration {
    Duration::from_secs(20 * 60)
}

fn default_video_quality() -> String {
    "720".to_string()
}

fn default_audio_quality() -> String {
    "192".to_string()
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("media-dl")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sensible() {
        let config = Config::default();
        assert_eq!(config.server.bind_address.port(), 3000);
        assert_eq!(config.defaults.video_quality, "720");
        assert_eq!(config.defaults.audio_quality, "192");
        assert_eq!(
            config.limits.acquisition_timeout(JobKind::SingleVideo),
            Duration::from_secs(300)
        );
        assert_eq!(
            config.limits.acquisition_timeout(JobKind::Playlist),
            Duration::from_secs(1200)
        );
        assert!(config.workspace_root.ends_with("media-dl"));
    }

    #[test]
    fn config_deserializes_with_partial_fields() {
        let config: Config = serde_json::from_str(r#"{"defaults":{"video_quality":"1080"}}"#)
            .expect("partial config should deserialize");
        assert_eq!(config.defaults.video_quality, "1080");
        assert_eq!(config.defaults.audio_quality, "192");
    }

    #[test]
    fn resolve_prefers_explicit_path() {
        let explicit = Some(PathBuf::from("/opt/tools/yt-dlp"));
        let resolved = ToolsConfig::resolve(&explicit, "yt-dlp");
        assert_eq!(resolved, Some(PathBuf::from("/opt/tools/yt-dlp")));
    }

    #[test]
    fn resolve_returns_none_for_missing_binary() {
        let resolved = ToolsConfig::resolve(&None, "nonexistent-acquisition-tool-xyz");
        assert!(resolved.is_none());
    }
}

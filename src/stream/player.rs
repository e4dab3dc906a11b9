//! Local Player - mpv/VLC playback support
//!
//! Hands a resolved episode to an external player: the stream URL, every
//! subtitle track (default first), and the segment headers where the player
//! can take them.

use std::process::Stdio;
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::models::ResolvedPlayback;
use crate::playback::HeaderInjector;

/// Supported local players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerType {
    /// mpv media player (default, supports HLS headers)
    #[default]
    Mpv,
    /// VLC media player
    Vlc,
}

impl PlayerType {
    /// Parse a configured player name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "mpv" => Some(PlayerType::Mpv),
            "vlc" => Some(PlayerType::Vlc),
            _ => None,
        }
    }

    /// Get the command name for this player
    pub fn command(&self) -> &'static str {
        match self {
            PlayerType::Vlc => {
                // On macOS, VLC is an app bundle - check for it
                #[cfg(target_os = "macos")]
                if std::path::Path::new("/Applications/VLC.app").exists() {
                    return "/Applications/VLC.app/Contents/MacOS/VLC";
                }
                "vlc"
            }
            PlayerType::Mpv => "mpv",
        }
    }

    /// Get a display name for this player
    pub fn display_name(&self) -> &'static str {
        match self {
            PlayerType::Vlc => "VLC",
            PlayerType::Mpv => "mpv",
        }
    }
}

impl std::fmt::Display for PlayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Errors from local player operations
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player '{0}' not found. Install it first.")]
    NotFound(String),
    #[error("Failed to start player: {0}")]
    StartFailed(#[from] std::io::Error),
}

/// Local player for resolved episodes
pub struct LocalPlayer {
    player_type: PlayerType,
}

impl LocalPlayer {
    pub fn new(player_type: PlayerType) -> Self {
        Self { player_type }
    }

    pub fn player_type(&self) -> PlayerType {
        self.player_type
    }

    /// Check if the player is available on the system
    pub async fn is_available(&self) -> bool {
        let cmd = self.player_type.command();

        if cmd.starts_with('/') {
            return std::path::Path::new(cmd).exists();
        }

        Command::new("which")
            .arg(cmd)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Command-line arguments for a resolved episode
    pub fn build_args(
        &self,
        playback: &ResolvedPlayback,
        interceptor: Option<&HeaderInjector>,
    ) -> Vec<String> {
        let mut args = vec![playback.source.url.clone()];

        // Default track first so players that pick the first one agree with us
        let mut tracks: Vec<_> = playback.subtitles.iter().collect();
        tracks.sort_by_key(|t| !t.is_default);

        match self.player_type {
            PlayerType::Mpv => {
                for track in &tracks {
                    args.push(format!("--sub-file={}", track.url));
                }
                if let Some(injector) = interceptor {
                    let fields: Vec<String> = injector
                        .pairs()
                        .into_iter()
                        // mpv splits the list on commas
                        .filter(|(_, v)| !v.contains(','))
                        .map(|(n, v)| format!("{}: {}", n, v))
                        .collect();
                    if !fields.is_empty() {
                        args.push(format!("--http-header-fields={}", fields.join(",")));
                    }
                }
                args.push(format!("--force-media-title={}", playback.episode));
                args.push("--force-window=immediate".to_string());
            }
            PlayerType::Vlc => {
                if let Some(track) = tracks.first() {
                    args.push("--sub-file".to_string());
                    args.push(track.url.clone());
                }
                if interceptor.is_some_and(|i| !i.is_empty()) {
                    warn!("VLC cannot send custom stream headers; playback may fail");
                }
                args.push("--no-video-title-show".to_string());
            }
        }

        args
    }

    /// Launch the player for a resolved episode
    pub async fn play(
        &self,
        playback: &ResolvedPlayback,
        interceptor: Option<&HeaderInjector>,
    ) -> Result<Child, PlayerError> {
        let args = self.build_args(playback, interceptor);
        debug!(player = %self.player_type, ?args, "launching player");

        let mut cmd = Command::new(self.player_type.command());
        cmd.args(&args);
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlayerError::NotFound(self.player_type.command().to_string())
            } else {
                PlayerError::StartFailed(e)
            }
        })
    }

    /// Play and wait for the player to close
    pub async fn play_and_wait(
        &self,
        playback: &ResolvedPlayback,
        interceptor: Option<&HeaderInjector>,
    ) -> Result<(), PlayerError> {
        let mut child = self.play(playback, interceptor).await?;
        let _ = child.wait().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EpisodeReference, PlayerTrack, StreamingHeaders, StreamingSource};

    fn playback() -> ResolvedPlayback {
        ResolvedPlayback {
            episode: EpisodeReference::new("frieren$episode$1", "frieren", 1),
            server: "vidcloud".into(),
            source: StreamingSource {
                url: "https://relay.example/https://cdn.example/master.m3u8".into(),
                quality: Some("auto".into()),
                is_segmented: true,
            },
            media_type: "application/x-mpegURL".into(),
            headers: StreamingHeaders::new(),
            subtitles: vec![
                PlayerTrack {
                    label: "Spanish".into(),
                    url: "https://subs.example/es.vtt".into(),
                    language: "es".into(),
                    is_default: false,
                },
                PlayerTrack {
                    label: "English".into(),
                    url: "https://subs.example/en.vtt".into(),
                    language: "en".into(),
                    is_default: true,
                },
            ],
            available_qualities: vec!["auto".into()],
        }
    }

    fn injector() -> HeaderInjector {
        let headers: StreamingHeaders = [
            ("Origin".to_string(), "https://provider.to".to_string()),
            ("Referer".to_string(), "https://provider.to/".to_string()),
        ]
        .into_iter()
        .collect();
        HeaderInjector::from_headers(&headers)
    }

    #[test]
    fn test_player_type_command() {
        let vlc_cmd = PlayerType::Vlc.command();
        assert!(vlc_cmd == "vlc" || vlc_cmd == "/Applications/VLC.app/Contents/MacOS/VLC");
        assert_eq!(PlayerType::Mpv.command(), "mpv");
    }

    #[test]
    fn test_from_name() {
        assert_eq!(PlayerType::from_name(" MPV "), Some(PlayerType::Mpv));
        assert_eq!(PlayerType::from_name("vlc"), Some(PlayerType::Vlc));
        assert_eq!(PlayerType::from_name("iina"), None);
    }

    #[test]
    fn test_mpv_args() {
        let player = LocalPlayer::new(PlayerType::Mpv);
        let inj = injector();
        let args = player.build_args(&playback(), Some(&inj));
        assert_eq!(args[0], "https://relay.example/https://cdn.example/master.m3u8");
        assert_eq!(args[1], "--sub-file=https://subs.example/en.vtt");
        assert_eq!(args[2], "--sub-file=https://subs.example/es.vtt");
        assert!(args.contains(&"--http-header-fields=origin: https://provider.to".to_string()));
        assert!(!args.iter().any(|a| a.to_lowercase().contains("referer")));
    }

    #[test]
    fn test_vlc_args_default_subtitle_only() {
        let player = LocalPlayer::new(PlayerType::Vlc);
        let args = player.build_args(&playback(), None);
        assert_eq!(
            args,
            vec![
                "https://relay.example/https://cdn.example/master.m3u8",
                "--sub-file",
                "https://subs.example/en.vtt",
                "--no-video-title-show",
            ]
        );
    }
}

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{MediaInfo, ResolverBackend};
use crate::error::ResolutionError;

/// Backend que llama al binario `yt-dlp` y parsea su salida `-j`.
///
/// Cada llamada es bloqueante, así que corre en `spawn_blocking` para no
/// frenar el resto de comandos.
#[derive(Debug, Clone)]
pub struct YtDlpBackend {
    binary: String,
}

impl YtDlpBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Argumentos comunes: mejor audio, sin playlist, solo metadata
    fn base_args() -> [&'static str; 11] {
        [
            "-j",
            "--format",
            "bestaudio/best",
            "--no-playlist",
            "--playlist-items",
            "1",
            "--no-check-certificates",
            "--quiet",
            "--no-warnings",
            "--source-address",
            "0.0.0.0",
        ]
    }

    async fn run(&self, target: String) -> Result<Vec<MediaInfo>, ResolutionError> {
        let binary = self.binary.clone();

        let output = tokio::task::spawn_blocking(move || {
            std::process::Command::new(&binary)
                .args(Self::base_args())
                .arg(&target)
                .output()
        })
        .await;

        let output = match output {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ResolutionError::ExtractionFailed(format!(
                    "yt-dlp process error: {}",
                    e
                )))
            }
            Err(_) => {
                return Err(ResolutionError::ExtractionFailed(
                    "yt-dlp task join error".to_string(),
                ))
            }
        };

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            warn!("yt-dlp failed: {}", error.trim());
            return Err(ResolutionError::ExtractionFailed(error.trim().to_string()));
        }

        parse_entries(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl ResolverBackend for YtDlpBackend {
    async fn extract(&self, uri: &str) -> Result<MediaInfo, ResolutionError> {
        let mut entries = self.run(uri.to_string()).await?;

        // Una línea por entrada; varias líneas significan que expandió una playlist
        match entries.len() {
            0 => Err(ResolutionError::ExtractionFailed(
                "yt-dlp returned no data".to_string(),
            )),
            1 => Ok(entries.remove(0)),
            _ => Ok(MediaInfo {
                entries: Some(entries),
                ..MediaInfo::default()
            }),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MediaInfo>, ResolutionError> {
        let target = format!("ytsearch{}:{}", limit.max(1), query);
        debug!("yt-dlp search: {}", target);
        self.run(target).await
    }
}

/// Parsea la salida de `yt-dlp -j`: un objeto JSON por línea
fn parse_entries(stdout: &str) -> Result<Vec<MediaInfo>, ResolutionError> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str::<MediaInfo>(line).map_err(|e| {
                ResolutionError::ExtractionFailed(format!("invalid yt-dlp output: {}", e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_single_entry() {
        let stdout = r#"{"id": "abc", "title": "Song", "url": "https://cdn.example.com/a", "duration": 212}"#;
        let entries = parse_entries(stdout).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title.as_deref(), Some("Song"));
        assert_eq!(entries[0].url.as_deref(), Some("https://cdn.example.com/a"));
        assert!(entries[0].entries.is_none());
    }

    #[test]
    fn test_parse_one_entry_per_line() {
        let stdout = "{\"title\": \"A\", \"url\": \"https://a\"}\n\n{\"title\": \"B\", \"url\": \"https://b\"}\n";
        let entries = parse_entries(stdout).unwrap();

        let titles: Vec<_> = entries.iter().filter_map(|e| e.title.as_deref()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_entries("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_fails_extraction() {
        let err = parse_entries("ERROR: something").unwrap_err();
        assert!(matches!(err, ResolutionError::ExtractionFailed(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_extraction() {
        let backend = YtDlpBackend::new("definitely-not-a-real-yt-dlp-binary");
        let err = backend.extract("https://example.com/a").await.unwrap_err();
        assert!(matches!(err, ResolutionError::ExtractionFailed(_)));
    }
}

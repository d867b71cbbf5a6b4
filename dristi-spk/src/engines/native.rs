//! Native platform TTS engine
//!
//! Speech is rendered by a platform command run as a child process. The
//! child is killed if the render future is dropped, which is how a newer
//! utterance cuts off an older one.

use crate::config::{VoiceConfig, VoiceGender};
use crate::engines::{sanitize, TtsEngine};
use crate::error::SpeechError;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Native TTS engine (platform-specific)
pub struct NativeTtsEngine {
    program: Option<&'static str>,
    rate: u32,
    volume: f32,
}

impl NativeTtsEngine {
    pub fn new() -> Self {
        Self::new_with_config(150, 1.0)
    }

    pub fn new_with_config(rate: u32, volume: f32) -> Self {
        let program = detect_program();
        match program {
            Some(p) => info!("Native TTS engine initialized ({})", p),
            None => warn!("No native TTS program found"),
        }

        Self {
            program,
            rate,
            volume: volume.clamp(0.0, 1.0),
        }
    }

    fn build_command(&self, program: &str, text: &str, voice: &VoiceConfig) -> Command {
        let mut cmd = Command::new(program);

        if program == "say" {
            cmd.arg("-r").arg(self.rate.to_string());
            if let Some(name) = &voice.name {
                cmd.arg("-v").arg(name);
            }
        } else {
            cmd.arg("-s").arg(self.rate.to_string());
            // espeak amplitude runs 0-200 with 100 as normal
            let amplitude = (self.volume * 100.0).round() as u32;
            cmd.arg("-a").arg(amplitude.to_string());
            cmd.arg("-v").arg(espeak_voice(voice));
            // End of options; text that starts with '-' stays text
            cmd.arg("--");
        }

        cmd.arg(text);
        cmd.kill_on_drop(true);
        cmd
    }
}

impl Default for NativeTtsEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsEngine for NativeTtsEngine {
    async fn speak(&self, text: &str, voice: &VoiceConfig) -> Result<(), SpeechError> {
        let program = self
            .program
            .ok_or_else(|| SpeechError::Engine("Native TTS engine not available".to_string()))?;
        let text = sanitize(text)?;

        let status = self.build_command(program, &text, voice).status().await?;
        if !status.success() {
            return Err(SpeechError::Engine(format!("{} exited with {}", program, status)));
        }

        debug!("{} finished speaking", program);
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    fn name(&self) -> &str {
        "native"
    }
}

#[cfg(target_os = "macos")]
fn detect_program() -> Option<&'static str> {
    Some("say")
}

#[cfg(target_os = "linux")]
fn detect_program() -> Option<&'static str> {
    std::process::Command::new("espeak-ng")
        .arg("--version")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|_| "espeak-ng")
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn detect_program() -> Option<&'static str> {
    None
}

/// espeak-ng voice id, e.g. "en-us+f3" for a female US English voice
fn espeak_voice(voice: &VoiceConfig) -> String {
    if let Some(name) = &voice.name {
        return name.clone();
    }

    let base = voice.language.to_ascii_lowercase();
    match voice.gender {
        Some(VoiceGender::Female) => format!("{}+f3", base),
        Some(VoiceGender::Male) => format!("{}+m3", base),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_espeak_voice_mapping() {
        let voice = VoiceConfig::default();
        assert_eq!(espeak_voice(&voice), "en-us+f3");

        let voice = VoiceConfig {
            name: None,
            language: "en-GB".to_string(),
            gender: None,
        };
        assert_eq!(espeak_voice(&voice), "en-gb");

        let voice = VoiceConfig {
            name: Some("mb-us1".to_string()),
            ..VoiceConfig::default()
        };
        assert_eq!(espeak_voice(&voice), "mb-us1");
    }

    #[test]
    fn test_espeak_command_args() {
        let engine = NativeTtsEngine {
            program: Some("espeak-ng"),
            rate: 150,
            volume: 1.0,
        };
        let cmd = engine.build_command("espeak-ng", "-rf /", &VoiceConfig::default());
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, ["-s", "150", "-a", "100", "-v", "en-us+f3", "--", "-rf /"]);
    }

    #[tokio::test]
    async fn test_unavailable_engine_errors() {
        let engine = NativeTtsEngine {
            program: None,
            rate: 150,
            volume: 1.0,
        };
        assert!(!engine.is_available());
        assert!(matches!(
            engine.speak("hello", &VoiceConfig::default()).await,
            Err(SpeechError::Engine(_))
        ));
    }
}

//! Voice/text feedback with repeat suppression.

use crate::config::FeedbackConfig;

/// 発話要求
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// 音声出力先。実装側は同時に1つの発話だけを扱う
pub trait Speaker {
    fn speak(&mut self, utterance: &Utterance);
    /// 再生中・待機中の発話を取り消す
    fn cancel(&mut self);
}

/// 発話内容をログに出すだけのスピーカー（音声環境なし用）
#[derive(Debug, Default)]
pub struct LogSpeaker;

impl Speaker for LogSpeaker {
    fn speak(&mut self, utterance: &Utterance) {
        log::info!("[voice] {}", utterance.text);
    }

    fn cancel(&mut self) {}
}

/// 直前と同じメッセージを繰り返さないフィードバック送出
pub struct FeedbackDispatcher {
    speaker: Box<dyn Speaker>,
    config: FeedbackConfig,
    last_message: Option<String>,
}

impl FeedbackDispatcher {
    pub fn new(speaker: Box<dyn Speaker>, config: FeedbackConfig) -> Self {
        Self {
            speaker,
            config,
            last_message: None,
        }
    }

    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    /// 新しいメッセージなら発話して true、直前と同じなら何もせず false
    pub fn dispatch(&mut self, message: &str) -> bool {
        if message.is_empty() || self.last_message.as_deref() == Some(message) {
            return false;
        }
        self.last_message = Some(message.to_string());

        if self.config.enabled {
            self.speaker.cancel();
            self.speaker.speak(&Utterance {
                text: message.to_string(),
                rate: self.config.rate,
                pitch: self.config.pitch,
                volume: self.config.volume,
            });
        }
        true
    }

    /// セッション終了時: 発話を止め、直前メッセージを忘れる
    pub fn reset(&mut self) {
        self.speaker.cancel();
        self.last_message = None;
    }
}

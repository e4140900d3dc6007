//! PlaySound：向输出汇追加语音文本或音频引用
//!
//! 负载：1 字节声音类型（0 文本 / 1 音频 URL）+ 原始 UTF-8，直到记录结束。
//! 文本中的 `{{name}}` 占位符在执行时替换为变量 name 的字符串渲染。

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::actions::{Action, ActionId, Followup};
use crate::codec::utf8;
use crate::core::{DecodeError, EncodeError, RuntimeError};
use crate::session::{MutableState, SessionState};

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid"))
}

/// 声音类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundType {
    /// 语音合成文本
    Text,
    /// 音频文件 URL
    Audio,
}

impl SoundType {
    pub fn as_byte(self) -> u8 {
        match self {
            SoundType::Text => 0,
            SoundType::Audio => 1,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self, DecodeError> {
        match b {
            0 => Ok(SoundType::Text),
            1 => Ok(SoundType::Audio),
            other => Err(DecodeError::InvalidSoundType(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaySound {
    pub sound_type: SoundType,
    pub value: String,
}

impl PlaySound {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            sound_type: SoundType::Text,
            value: text.into(),
        }
    }

    pub fn audio(url: impl Into<String>) -> Self {
        Self {
            sound_type: SoundType::Audio,
            value: url.into(),
        }
    }
}

/// 仅接受带主机名的 http / https 绝对 URL；原始字符串原样保留
fn validate_url(raw: &str) -> Result<(), DecodeError> {
    let invalid = || DecodeError::InvalidUrl(raw.to_string());
    let url = Url::parse(raw).map_err(|_| invalid())?;
    let has_host = url.host_str().is_some_and(|h| !h.is_empty());
    if !matches!(url.scheme(), "http" | "https") || !has_host {
        return Err(invalid());
    }
    Ok(())
}

/// 替换全部 `{{name}}` 占位符；任一变量未声明则整体失败
pub fn substitute_placeholders(text: &str, state: &MutableState) -> Result<String, RuntimeError> {
    let re = placeholder_re();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&state.variable(name.as_str())?.to_string());
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

impl Action for PlaySound {
    const ID: ActionId = ActionId::PlaySound;

    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::with_capacity(1 + self.value.len());
        out.push(self.sound_type.as_byte());
        out.extend_from_slice(self.value.as_bytes());
        Ok(out)
    }

    fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let (&first, rest) = payload.split_first().ok_or(DecodeError::Truncated {
            what: "sound type",
            needed: 1,
            remaining: 0,
        })?;
        let sound_type = SoundType::from_byte(first)?;
        let value = utf8(rest, "sound value")?;
        if sound_type == SoundType::Audio {
            validate_url(&value)?;
        }
        Ok(Self { sound_type, value })
    }

    fn execute(&self, session: &mut SessionState) -> Result<Followup, RuntimeError> {
        match self.sound_type {
            SoundType::Text => {
                let text = substitute_placeholders(&self.value, &session.state)?;
                session.output.paragraph(&text);
            }
            SoundType::Audio => session.output.audio(&self.value),
        }
        Ok(Followup::None)
    }
}

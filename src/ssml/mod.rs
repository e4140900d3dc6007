//! 输出汇：语音合成标记（SSML）
//!
//! PlaySound 动作向 OutputSink 追加段落文本或音频引用，请求结束时 render() 得到完整的 `<speak>…</speak>`。

use std::fmt;

/// 输出汇 trait：追加段落、追加音频、渲染
pub trait OutputSink: Send + fmt::Debug {
    fn paragraph(&mut self, text: &str);

    fn audio(&mut self, url: &str);

    fn render(&self) -> String;
}

/// SSML 构建器
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsmlBuilder {
    body: String,
}

impl SsmlBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for SsmlBuilder {
    fn paragraph(&mut self, text: &str) {
        escape_into(&mut self.body, text);
    }

    fn audio(&mut self, url: &str) {
        self.body.push_str("<audio src=\"");
        escape_into(&mut self.body, url);
        self.body.push_str("\" />");
    }

    fn render(&self) -> String {
        format!("<speak>{}</speak>", self.body)
    }
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_render() {
        assert_eq!(SsmlBuilder::new().render(), "<speak></speak>");
    }

    #[test]
    fn test_paragraph_and_audio() {
        let mut b = SsmlBuilder::new();
        b.paragraph("Hello world");
        b.audio("https://example.com/a.wav");
        assert_eq!(
            b.render(),
            r#"<speak>Hello world<audio src="https://example.com/a.wav" /></speak>"#
        );
    }

    #[test]
    fn test_escaping() {
        let mut b = SsmlBuilder::new();
        b.paragraph("salt & <pepper>");
        assert_eq!(b.render(), "<speak>salt &amp; &lt;pepper&gt;</speak>");
    }
}

//! Rendering of bridge events on the host's output.

use imebridge_core::Event;

/// How events are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

pub fn render(event: &Event, format: Format) -> anyhow::Result<String> {
    Ok(match format {
        Format::Json => serde_json::to_string(event)?,
        Format::Text => render_text(event),
    })
}

fn render_text(event: &Event) -> String {
    match event {
        Event::CandidateList { items } if items.is_empty() => "candidates: (none)".to_string(),
        Event::CandidateList { items } => {
            let numbered: Vec<String> = items
                .iter()
                .enumerate()
                .map(|(i, item)| format!("{}.{}", i, item))
                .collect();
            format!("candidates: {}", numbered.join(" "))
        }
        Event::Commit { text } => format!("commit: {}", text),
        Event::Preedit {
            display,
            client_view,
        } => format!("preedit: {} [{}]", display, client_view),
        Event::AuxText { before, after } => format!("aux: {} | {}", before, after),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_rendering() {
        let list = Event::CandidateList {
            items: vec!["你".into(), "尼".into()],
        };
        assert_eq!(render(&list, Format::Text).unwrap(), "candidates: 0.你 1.尼");
        assert_eq!(
            render(&Event::CandidateList { items: vec![] }, Format::Text).unwrap(),
            "candidates: (none)"
        );
        assert_eq!(
            render(
                &Event::Preedit {
                    display: "ni".into(),
                    client_view: "你".into()
                },
                Format::Text
            )
            .unwrap(),
            "preedit: ni [你]"
        );
    }

    #[test]
    fn test_json_rendering() {
        let commit = Event::Commit { text: "你好".into() };
        assert_eq!(
            render(&commit, Format::Json).unwrap(),
            r#"{"type":"commit","text":"你好"}"#
        );
        let aux = Event::AuxText {
            before: "拼".into(),
            after: "1/2".into(),
        };
        assert_eq!(
            render(&aux, Format::Json).unwrap(),
            r#"{"type":"aux_text","before":"拼","after":"1/2"}"#
        );
    }
}

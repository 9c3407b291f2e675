//! Slide Deck Rendering
//!
//! Renders a set list into an XML slide deck:
//!
//! ```xml
//! <slideshow title="easter">
//!   <slide kind="leader"><text>Welcome</text></slide>
//!   <slide kind="blank"/>
//!   <slide kind="stanza" song="Amazing Grace" stanza="v1">
//!     <line size="28">Amazing grace! How sweet the sound</line>
//!   </slide>
//!   <slide kind="trailer"><text>Thank you</text></slide>
//! </slideshow>
//! ```
//!
//! Each song opens with a blank slide followed by one slide per stanza
//! in the song's lyric order.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::catalog::Song;

/// Media type of a rendered deck.
pub const SLIDE_SHOW_CONTENT_TYPE: &str = "application/xml";

/// Deck layout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideShowConfig {
    /// Font size of lyric lines, in points.
    pub font_size: f64,

    /// Title slides placed before the first song.
    pub leader_slides: Vec<String>,

    /// Slides placed after the last song.
    pub trailer_slides: Vec<String>,
}

impl Default for SlideShowConfig {
    fn default() -> Self {
        Self {
            font_size: 28.0,
            leader_slides: Vec::new(),
            trailer_slides: Vec::new(),
        }
    }
}

/// Renders `songs` in order into an XML deck titled `title`.
pub fn render_slide_show<'a, I>(config: &SlideShowConfig, title: &str, songs: I) -> String
where
    I: IntoIterator<Item = &'a Song>,
{
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    // Writing into a String cannot fail
    let _ = writeln!(xml, "<slideshow title=\"{}\">", escape(title));

    for text in &config.leader_slides {
        push_text_slide(&mut xml, "leader", text);
    }

    for song in songs {
        xml.push_str("  <slide kind=\"blank\"/>\n");
        for (stanza, lines) in song.stanzas() {
            let _ = writeln!(
                xml,
                "  <slide kind=\"stanza\" song=\"{}\" stanza=\"{}\">",
                escape(&song.title),
                escape(stanza)
            );
            for line in lines {
                let _ = writeln!(
                    xml,
                    "    <line size=\"{}\">{}</line>",
                    config.font_size,
                    escape(line)
                );
            }
            xml.push_str("  </slide>\n");
        }
    }

    for text in &config.trailer_slides {
        push_text_slide(&mut xml, "trailer", text);
    }

    xml.push_str("</slideshow>\n");
    xml
}

fn push_text_slide(xml: &mut String, kind: &str, text: &str) {
    let _ = writeln!(
        xml,
        "  <slide kind=\"{}\"><text>{}</text></slide>",
        kind,
        escape(text)
    );
}

/// Escapes XML special characters.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn song(title: &str, order: &[&str]) -> Song {
        let mut lyrics = BTreeMap::new();
        lyrics.insert("v1".to_string(), vec![format!("{} verse", title)]);
        lyrics.insert("c".to_string(), vec!["chorus line".to_string()]);
        Song {
            title: title.to_string(),
            authors: Vec::new(),
            lyrics,
            lyric_order: order.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("Rock & <Roll> \"x\""), "Rock &amp; &lt;Roll&gt; &quot;x&quot;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_slide_order() {
        let config = SlideShowConfig {
            font_size: 30.0,
            leader_slides: vec!["Welcome".to_string()],
            trailer_slides: vec!["Thank you".to_string()],
        };
        let songs = vec![song("First", &["v1", "c", "v1"]), song("Second", &["c"])];

        let xml = render_slide_show(&config, "easter", &songs);

        let kinds: Vec<&str> = xml
            .lines()
            .filter_map(|line| line.split("kind=\"").nth(1))
            .filter_map(|rest| rest.split('"').next())
            .collect();
        assert_eq!(
            kinds,
            vec!["leader", "blank", "stanza", "stanza", "stanza", "blank", "stanza", "trailer"]
        );
        assert!(xml.contains("<slideshow title=\"easter\">"));
        assert!(xml.contains("<line size=\"30\">First verse</line>"));
        assert!(xml.ends_with("</slideshow>\n"));
    }

    #[test]
    fn test_empty_deck() {
        let xml = render_slide_show(&SlideShowConfig::default(), "empty", std::iter::empty::<&Song>());
        assert!(!xml.contains("<slide "));
    }
}

//! Markdown rendering with syntax highlighting and derived metadata

use indexmap::IndexSet;
use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::HashMap;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::frontmatter::BlogFrontmatter;
use super::post::{Heading, RenderMetadata, RenderedContent};
use crate::config::HighlightConfig;

lazy_static! {
    /// A URL scheme (`https:`) or a protocol-relative prefix (`//`)
    static ref REMOTE_URL: Regex = Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9+.-]*:)?//").unwrap();
    static ref URL_SCHEME: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").unwrap();
}

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    highlight: bool,
    line_numbers: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_config(&HighlightConfig::default())
    }

    /// Create with the site's highlight settings
    pub fn with_config(config: &HighlightConfig) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: config.theme.clone(),
            highlight: config.enable,
            line_numbers: config.line_number,
        }
    }

    /// Render a post body to HTML and collect its outline and image references
    pub fn render(&self, markdown: &str, frontmatter: &BlogFrontmatter) -> RenderedContent {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_GFM;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        let mut code_block: Option<(Option<String>, String)> = None;
        let mut open_heading: Option<(usize, String)> = None;
        let mut slugger = Slugger::default();
        let mut headings = Vec::new();
        let mut local_images: IndexSet<String> = IndexSet::new();
        let mut remote_images: IndexSet<String> = IndexSet::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) if self.highlight => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => {
                            // Info strings may carry extra words after the language
                            lang.split_whitespace().next().map(str::to_string)
                        }
                        _ => None,
                    };
                    code_block = Some((lang, String::new()));
                }
                Event::End(TagEnd::CodeBlock) if code_block.is_some() => {
                    if let Some((lang, code)) = code_block.take() {
                        let highlighted = self.highlight_code(&code, lang.as_deref());
                        events.push(Event::Html(CowStr::from(highlighted)));
                    }
                }
                Event::Text(text) if code_block.is_some() => {
                    if let Some((_, code)) = code_block.as_mut() {
                        code.push_str(&text);
                    }
                }
                Event::Start(Tag::Heading { .. }) => {
                    open_heading = Some((events.len(), String::new()));
                    events.push(event);
                }
                Event::End(TagEnd::Heading(level)) => {
                    if let Some((start, text)) = open_heading.take() {
                        let text = text.trim().to_string();
                        if let Event::Start(Tag::Heading { id, .. }) = &mut events[start] {
                            let slug = match id.as_deref() {
                                Some(custom) => slugger.claim(custom),
                                None => slugger.slug(&text),
                            };
                            *id = Some(CowStr::from(slug.clone()));
                            headings.push(Heading {
                                depth: level as u8,
                                slug,
                                text,
                            });
                        }
                    }
                    events.push(event);
                }
                Event::Start(Tag::Image { ref dest_url, .. }) => {
                    classify_image(dest_url, &mut local_images, &mut remote_images);
                    events.push(event);
                }
                Event::Text(ref text) | Event::Code(ref text) => {
                    if let Some((_, heading_text)) = open_heading.as_mut() {
                        heading_text.push_str(text);
                    }
                    events.push(event);
                }
                _ => events.push(event),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        let local_image_paths: Vec<String> = local_images.into_iter().collect();
        let remote_image_paths: Vec<String> = remote_images.into_iter().collect();
        let image_paths = local_image_paths
            .iter()
            .chain(remote_image_paths.iter())
            .cloned()
            .collect();

        RenderedContent {
            html: html_output,
            metadata: RenderMetadata {
                headings,
                local_image_paths,
                remote_image_paths,
                frontmatter: frontmatter.clone(),
                image_paths,
            },
        }
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        let highlighted = theme.and_then(|theme| {
            highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
        });

        match highlighted {
            Some(highlighted) if self.line_numbers => self.add_line_numbers(&highlighted, lang),
            Some(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                lang, highlighted
            ),
            None => format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                lang,
                html_escape(code)
            ),
        }
    }

    /// Add line numbers to highlighted code
    fn add_line_numbers(&self, code: &str, lang: &str) -> String {
        let lines: Vec<&str> = code.lines().collect();

        let gutter = (1..=lines.len())
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");
        let code_lines = lines.join("\n");

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}</td></tr></table></figure>"#,
            lang, gutter, code_lines
        )
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Produces heading slugs that are unique within one document
#[derive(Default)]
struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    fn slug(&mut self, text: &str) -> String {
        let base = slug::slugify(text);
        let base = if base.is_empty() {
            "heading".to_string()
        } else {
            base
        };
        self.claim(&base)
    }

    /// Reserve `base`, appending `-1`, `-2`, ... when it was already used
    fn claim(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        while let Some(count) = self.seen.get_mut(&candidate) {
            *count += 1;
            candidate = format!("{}-{}", base, count);
        }
        self.seen.insert(candidate.clone(), 0);
        candidate
    }
}

fn classify_image(url: &str, local: &mut IndexSet<String>, remote: &mut IndexSet<String>) {
    let url = url.trim();
    if url.is_empty() {
        return;
    }

    if REMOTE_URL.is_match(url) {
        remote.insert(url.to_string());
    } else if URL_SCHEME.is_match(url) {
        // data: and other inline schemes are neither files nor fetchable images
        tracing::trace!("Skipping image with inline scheme: {}", url);
    } else {
        local.insert(percent_decode_str(url).decode_utf8_lossy().into_owned());
    }
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn frontmatter() -> BlogFrontmatter {
        BlogFrontmatter {
            title: "Test".to_string(),
            pub_date: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            description: String::new(),
            author: "Tester".to_string(),
            tags: vec![],
            image: None,
        }
    }

    #[test]
    fn test_render_basic_markdown() {
        let renderer = MarkdownRenderer::new();
        let rendered = renderer.render("# Hello World\n\nThis is a test.", &frontmatter());
        assert!(rendered.html.contains(r#"<h1 id="hello-world">Hello World</h1>"#));
        assert!(rendered.html.contains("<p>This is a test.</p>"));
        assert_eq!(rendered.metadata.frontmatter.title, "Test");
    }

    #[test]
    fn test_render_code_block() {
        let renderer = MarkdownRenderer::new();
        let rendered = renderer.render("```rust\nfn main() {}\n```", &frontmatter());
        assert!(rendered.html.contains("highlight rust"));
    }

    #[test]
    fn test_render_code_block_without_highlighting() {
        let config = HighlightConfig {
            enable: false,
            ..Default::default()
        };
        let renderer = MarkdownRenderer::with_config(&config);
        let rendered = renderer.render("```rust\nfn main() {}\n```", &frontmatter());
        assert!(rendered.html.contains(r#"<code class="language-rust">"#));
        assert!(!rendered.html.contains("highlight"));
    }

    #[test]
    fn test_headings_outline() {
        let renderer = MarkdownRenderer::new();
        let markdown = "# Intro\n\n## Setup `cargo`\n\ntext\n\n## Intro\n\n### Custom {#my-anchor}\n";
        let rendered = renderer.render(markdown, &frontmatter());
        let headings = &rendered.metadata.headings;

        assert_eq!(headings.len(), 4);
        assert_eq!(headings[0].depth, 1);
        assert_eq!(headings[0].slug, "intro");
        assert_eq!(headings[1].text, "Setup cargo");
        assert_eq!(headings[1].slug, "setup-cargo");
        assert_eq!(headings[2].slug, "intro-1");
        assert_eq!(headings[3].depth, 3);
        assert_eq!(headings[3].slug, "my-anchor");
        assert!(rendered.html.contains(r#"<h2 id="intro-1">Intro</h2>"#));
    }

    #[test]
    fn test_image_paths() {
        let renderer = MarkdownRenderer::new();
        let markdown = "![a](./img/a%20b.png)\n\n![b](https://cdn.example.com/b.jpg)\n\n\
                        ![c](//example.com/c.gif)\n\n![d](data:image/png;base64,AAAA)\n\n\
                        ![again](./img/a%20b.png)\n";
        let rendered = renderer.render(markdown, &frontmatter());
        let meta = &rendered.metadata;

        assert_eq!(meta.local_image_paths, vec!["./img/a b.png"]);
        assert_eq!(
            meta.remote_image_paths,
            vec!["https://cdn.example.com/b.jpg", "//example.com/c.gif"]
        );
        assert_eq!(
            meta.image_paths,
            vec![
                "./img/a b.png",
                "https://cdn.example.com/b.jpg",
                "//example.com/c.gif"
            ]
        );
    }

    #[test]
    fn test_slugger_empty_text() {
        let mut slugger = Slugger::default();
        assert_eq!(slugger.slug("!!!"), "heading");
        assert_eq!(slugger.slug("???"), "heading-1");
    }
}

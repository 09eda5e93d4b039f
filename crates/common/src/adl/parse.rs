// ADL parser: a single left-to-right scan over lines.
//
// Three states: front-matter, block body, fenced machine payload. Block
// boundaries are heading-with-anchor lines only; plain headings stay body
// text. The parser is total: malformed input degrades, it never errors.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::types::{Block, Document};

use super::machine;

/// `#{1..6} <text> {#<anchor>}`: the only line shape that opens a block.
fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(#{1,6})\s+(.*?)\s*\{#([A-Za-z0-9_-]+)\}\s*$")
            .expect("heading pattern should compile")
    })
}

struct BlockDraft {
    anchor: String,
    heading: String,
    level: u8,
    start_line: u32,
    body_lines: Vec<String>,
    payload: Option<String>,
    saw_fence: bool,
}

/// Parse raw document text. Never fails; see module notes on degradation.
pub fn parse(text: &str, path: &str) -> Document {
    let lines: Vec<&str> = text.lines().collect();

    // Front-matter: only an opening `---` on the first line counts, and it
    // must be terminated. An unterminated opener is ordinary content.
    let mut cursor = 0usize;
    let mut front_matter = Map::new();
    if lines.first().map(|line| line.trim_end()) == Some("---") {
        if let Some(offset) = lines[1..].iter().position(|line| line.trim_end() == "---") {
            front_matter = parse_mapping(&lines[1..1 + offset].join("\n"));
            cursor = offset + 2;
        }
    }

    let mut preamble_lines: Vec<&str> = Vec::new();
    let mut drafts: Vec<BlockDraft> = Vec::new();
    let mut ends: Vec<u32> = Vec::new();

    let mut index = cursor;
    while index < lines.len() {
        let line = lines[index];

        if let Some(caps) = heading_regex().captures(line) {
            if !drafts.is_empty() {
                ends.push((index + 1) as u32);
            }
            drafts.push(BlockDraft {
                anchor: caps[3].to_string(),
                heading: caps[2].trim().to_string(),
                level: caps[1].len() as u8,
                start_line: (index + 1) as u32,
                body_lines: Vec::new(),
                payload: None,
                saw_fence: false,
            });
            index += 1;
            continue;
        }

        match drafts.last_mut() {
            None => preamble_lines.push(line),
            Some(draft) => {
                if machine::is_fence_open(line) && !draft.saw_fence {
                    draft.saw_fence = true;
                    let mut scan = index + 1;
                    let mut payload_lines: Vec<&str> = Vec::new();
                    let mut closed = false;
                    while scan < lines.len() {
                        if machine::is_fence_close(lines[scan]) {
                            closed = true;
                            break;
                        }
                        payload_lines.push(lines[scan]);
                        scan += 1;
                    }
                    if closed {
                        draft.payload = Some(payload_lines.join("\n"));
                        index = scan + 1;
                    } else {
                        // Unterminated fence swallows the rest of the file;
                        // the partial payload is discarded.
                        index = lines.len();
                    }
                    continue;
                }
                draft.body_lines.push(line.to_string());
            }
        }
        index += 1;
    }
    while ends.len() < drafts.len() {
        ends.push((lines.len() + 1) as u32);
    }

    let blocks = drafts
        .into_iter()
        .zip(ends)
        .map(|(draft, end_line)| {
            let payload_value =
                draft.payload.as_deref().and_then(|raw| serde_yaml::from_str::<Value>(raw).ok());
            Block {
                anchor: draft.anchor,
                heading: draft.heading,
                level: draft.level,
                machine: machine::overlay_defaults(payload_value.as_ref()),
                body: clean_body(&draft.body_lines),
                start_line: draft.start_line,
                end_line,
            }
        })
        .collect();

    Document {
        path: path.to_string(),
        front_matter,
        preamble: trim_blank_edges(&preamble_lines.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .join("\n"),
        blocks,
    }
}

fn parse_mapping(raw: &str) -> Map<String, Value> {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Remove literal `---` separator lines, then trim blank edges.
fn clean_body(lines: &[String]) -> String {
    let kept: Vec<String> =
        lines.iter().filter(|line| line.trim_end() != "---").cloned().collect();
    trim_blank_edges(&kept).join("\n")
}

fn trim_blank_edges(lines: &[String]) -> Vec<String> {
    let start = lines.iter().position(|line| !line.trim().is_empty());
    let Some(start) = start else {
        return Vec::new();
    };
    let end = lines.iter().rposition(|line| !line.trim().is_empty()).unwrap_or(start);
    lines[start..=end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "---\ntype: log\nowner: ops\n---\n\nIntro paragraph.\n\n## Setup {#setup}\n\n```adl\ntype: task\nid: t-1\nstatus: active\ntitle: Setup\npriority: 3\n```\n\nFirst body line.\n\n---\n\nSecond body line.\n\n### Notes {#notes}\n\nJust text, no fence.\n";

    #[test]
    fn parses_front_matter_blocks_and_bodies() {
        let doc = parse(SAMPLE, "docs/sample.md");

        assert_eq!(doc.path, "docs/sample.md");
        assert_eq!(doc.front_matter.get("type").and_then(|v| v.as_str()), Some("log"));
        assert_eq!(doc.preamble, "Intro paragraph.");
        assert_eq!(doc.blocks.len(), 2);

        let setup = &doc.blocks[0];
        assert_eq!(setup.anchor, "setup");
        assert_eq!(setup.heading, "Setup");
        assert_eq!(setup.level, 2);
        assert_eq!(setup.machine.kind, "task");
        assert_eq!(setup.machine.id, "t-1");
        assert_eq!(setup.machine.status, "active");
        assert_eq!(setup.machine.extra.get("priority"), Some(&serde_json::json!(3)));
        // Separator line removed, blank edges trimmed.
        assert_eq!(setup.body, "First body line.\n\nSecond body line.");

        let notes = &doc.blocks[1];
        assert_eq!(notes.anchor, "notes");
        assert_eq!(notes.level, 3);
        assert_eq!(notes.machine.kind, "");
        assert_eq!(notes.machine.status, "draft");
        assert_eq!(notes.body, "Just text, no fence.");
    }

    #[test]
    fn line_spans_cover_each_block() {
        let doc = parse(SAMPLE, "docs/sample.md");
        assert_eq!(doc.blocks[0].start_line, 8);
        assert_eq!(doc.blocks[0].end_line, 24);
        assert_eq!(doc.blocks[1].start_line, 24);
    }

    #[test]
    fn missing_front_matter_yields_empty_mapping() {
        let doc = parse("## Only {#only}\n\nBody.\n", "a.md");
        assert!(doc.front_matter.is_empty());
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn malformed_front_matter_degrades_to_empty_mapping() {
        let doc = parse("---\n: [unbalanced\n---\n\n## B {#b}\n", "a.md");
        assert!(doc.front_matter.is_empty());
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn unterminated_front_matter_is_ordinary_content() {
        let doc = parse("---\ntype: log\n\n## B {#b}\n\nBody.\n", "a.md");
        assert!(doc.front_matter.is_empty());
        // The stray opener lands in the preamble.
        assert!(doc.preamble.contains("type: log"));
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn plain_headings_are_not_block_boundaries() {
        let doc = parse("## Anchored {#a}\n\n## Plain heading\n\nStill body.\n", "a.md");
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].body, "## Plain heading\n\nStill body.");
    }

    #[test]
    fn invalid_anchor_charset_is_not_a_boundary() {
        let doc = parse("## Bad {#no spaces}\n\n## Good {#ok_1-2}\n", "a.md");
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].anchor, "ok_1-2");
    }

    #[test]
    fn seven_hashes_is_not_a_heading() {
        let doc = parse("####### Too deep {#deep}\n\n## Ok {#ok}\n", "a.md");
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].anchor, "ok");
    }

    #[test]
    fn unterminated_fence_keeps_defaults() {
        let text = "## A {#a}\n\n```adl\ntype: task\nid: t-1\n\nNo closing fence.\n";
        let doc = parse(text, "a.md");
        assert_eq!(doc.blocks.len(), 1);
        let block = &doc.blocks[0];
        assert_eq!(block.machine.kind, "");
        assert_eq!(block.machine.id, "");
        assert_eq!(block.machine.status, "draft");
        assert_eq!(block.body, "");
    }

    #[test]
    fn legacy_fence_label_is_recognized() {
        let text = "## A {#a}\n\n```machine\ntype: event\nid: e-1\n```\n";
        let doc = parse(text, "a.md");
        assert_eq!(doc.blocks[0].machine.kind, "event");
    }

    #[test]
    fn unlabeled_code_fences_stay_in_body() {
        let text = "## A {#a}\n\n```\nplain code\n```\n";
        let doc = parse(text, "a.md");
        assert_eq!(doc.blocks[0].machine.kind, "");
        assert!(doc.blocks[0].body.contains("plain code"));
    }

    #[test]
    fn malformed_payload_yaml_degrades_to_defaults() {
        let text = "## A {#a}\n\n```adl\n: [broken\n```\n";
        let doc = parse(text, "a.md");
        assert_eq!(doc.blocks[0].machine.kind, "");
        assert_eq!(doc.blocks[0].machine.status, "draft");
    }

    #[test]
    fn duplicate_anchor_lookup_is_last_write_wins() {
        let text = "## First {#dup}\n\nOld.\n\n## Second {#dup}\n\nNew.\n";
        let doc = parse(text, "a.md");
        assert_eq!(doc.blocks.len(), 2, "duplicate anchors must not merge blocks");
        assert_eq!(doc.block("dup").unwrap().body, "New.");

        // Stable across repeated parses.
        let again = parse(text, "a.md");
        assert_eq!(again.block("dup").unwrap().body, "New.");
    }

    #[test]
    fn empty_input_parses_to_empty_document() {
        let doc = parse("", "empty.md");
        assert!(doc.front_matter.is_empty());
        assert!(doc.preamble.is_empty());
        assert!(doc.blocks.is_empty());
    }

    #[test]
    fn crlf_input_parses_like_lf() {
        let text = "---\r\ntype: log\r\n---\r\n\r\n## A {#a}\r\n\r\nBody.\r\n";
        let doc = parse(text, "a.md");
        assert_eq!(doc.front_matter.get("type").and_then(|v| v.as_str()), Some("log"));
        assert_eq!(doc.blocks[0].body, "Body.");
    }
}

// Canonical ADL serialization.
//
// This is the on-disk form the executor writes: front-matter fenced by
// `---`, one blank line between parts, the machine fence always emitted
// with the required fields first. Serialization is a pure function of
// parsed content, so untouched blocks re-serialize to identical bytes.

use serde_json::Value;

use crate::types::{Block, Document};

use super::machine;

pub fn serialize(document: &Document) -> String {
    let mut out = String::new();

    if !document.front_matter.is_empty() {
        out.push_str("---\n");
        out.push_str(&yaml_block(&Value::Object(document.front_matter.clone())));
        out.push_str("---\n");
    }

    let preamble = document.preamble.trim();
    if !preamble.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(preamble);
        out.push('\n');
    }

    for block in &document.blocks {
        if !out.is_empty() {
            out.push('\n');
        }
        write_block(&mut out, block);
    }

    out
}

fn write_block(out: &mut String, block: &Block) {
    let level = block.level.clamp(1, 6) as usize;
    out.push_str(&"#".repeat(level));
    out.push(' ');
    if !block.heading.is_empty() {
        out.push_str(&block.heading);
        out.push(' ');
    }
    out.push_str(&format!("{{#{}}}\n", block.anchor));

    out.push('\n');
    out.push_str("```");
    out.push_str(machine::FENCE_LABEL);
    out.push('\n');
    out.push_str(&yaml_block(&machine::to_value(&block.machine)));
    out.push_str("```\n");

    let body = block.body.trim();
    if !body.is_empty() {
        out.push('\n');
        out.push_str(body);
        out.push('\n');
    }
}

/// YAML text for a mapping, ending in exactly one newline.
fn yaml_block(value: &Value) -> String {
    let mut text = serde_yaml::to_string(value).unwrap_or_default();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::adl::parse;
    use crate::types::{Document, MachineRecord};

    use super::*;

    fn sample_document() -> Document {
        let text = "---\ntype: log\n---\n\nPreamble text.\n\n## Setup {#setup}\n\n```adl\ntype: task\nid: t-1\nstatus: active\ntitle: Setup\n```\n\nBody line.\n\n### Notes {#notes}\n\nFree text only.\n";
        parse(text, "docs/sample.md")
    }

    #[test]
    fn round_trip_preserves_anchors_machine_and_body() {
        let doc = sample_document();
        let rendered = serialize(&doc);
        let reparsed = parse(&rendered, &doc.path);

        assert_eq!(reparsed.front_matter, doc.front_matter);
        assert_eq!(reparsed.preamble, doc.preamble);
        assert_eq!(reparsed.blocks.len(), doc.blocks.len());
        for (left, right) in doc.blocks.iter().zip(reparsed.blocks.iter()) {
            assert_eq!(left.anchor, right.anchor);
            assert_eq!(left.heading, right.heading);
            assert_eq!(left.level, right.level);
            assert_eq!(left.machine, right.machine);
            assert_eq!(left.body, right.body);
        }
    }

    #[test]
    fn serialization_is_stable() {
        let doc = sample_document();
        let first = serialize(&doc);
        let second = serialize(&parse(&first, &doc.path));
        assert_eq!(first, second, "canonical form must be a fixed point");
    }

    #[test]
    fn machine_fence_leads_with_required_fields() {
        let doc = sample_document();
        let rendered = serialize(&doc);
        let fence_start = rendered.find("```adl\n").unwrap();
        let after = &rendered[fence_start + 7..];
        assert!(after.starts_with("type: task\nid: t-1\nstatus: active\ntitle: Setup\n"));
    }

    #[test]
    fn numeric_looking_strings_survive_the_round_trip() {
        let mut doc = sample_document();
        doc.blocks[0].machine.extra.insert("build".to_string(), json!("0042"));
        let reparsed = parse(&serialize(&doc), &doc.path);
        assert_eq!(
            reparsed.blocks[0].machine.extra.get("build"),
            Some(&json!("0042")),
            "string scalars must not collapse into numbers"
        );
    }

    #[test]
    fn document_without_front_matter_has_no_fence() {
        let doc = parse("## A {#a}\n", "a.md");
        let rendered = serialize(&doc);
        assert!(!rendered.starts_with("---"));
        assert!(rendered.starts_with("## A {#a}\n"));
    }

    #[test]
    fn blockless_record_still_serializes_machine_defaults() {
        let doc = parse("## A {#a}\n\nBody only.\n", "a.md");
        let rendered = serialize(&doc);
        assert!(rendered.contains("```adl\ntype: ''\nid: ''\nstatus: draft\ntitle: ''\n```\n"));
        let reparsed = parse(&rendered, "a.md");
        assert_eq!(reparsed.blocks[0].machine, MachineRecord::default());
    }

    #[test]
    fn empty_heading_round_trips() {
        let doc = parse("##  {#bare}\n", "a.md");
        assert_eq!(doc.blocks[0].heading, "");
        let rendered = serialize(&doc);
        let reparsed = parse(&rendered, "a.md");
        assert_eq!(reparsed.blocks[0].heading, "");
        assert_eq!(reparsed.blocks[0].anchor, "bare");
    }
}

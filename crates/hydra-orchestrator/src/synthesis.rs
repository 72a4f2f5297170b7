//! Weighted-voting code synthesis (spec §4.7.1). Grounded on
//! `core/code_synthesis.py` in `original_source/`; re-expressed with
//! `similar::TextDiff::ratio()` in place of `difflib.SequenceMatcher`.

use std::collections::HashMap;

use hydra_core::task::SubTaskResult;
use regex::Regex;
use similar::TextDiff;
use std::sync::LazyLock;

/// Blocks below this ratio are treated as unrelated, not variants of the
/// same candidate (spec §4.7.1).
const SIMILARITY_THRESHOLD: f64 = 0.7;
const NON_CODE_BLOCK_PENALTY: f64 = 0.8;
const INVALID_SYNTAX_PENALTY: f64 = 0.7;

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:python|py|javascript|js|java|cpp|c\+\+|rust|go)?\n(.*?)```").unwrap()
});

#[derive(Debug, Clone)]
struct CodeBlock {
    code: String,
    model: String,
    confidence: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SynthesisResult {
    pub code: String,
    pub confidence: f64,
    pub explanations: Vec<String>,
}

/// Merges every model's response to every subtask into one synthesized
/// answer, weighted by `model_weights` (default `1.0` per spec §4.7.1).
#[must_use]
pub fn synthesize(results: &[SubTaskResult], model_weights: &HashMap<String, f64>) -> SynthesisResult {
    if results.is_empty() {
        return SynthesisResult {
            code: String::new(),
            confidence: 0.0,
            explanations: vec!["No valid responses received".to_string()],
        };
    }

    let blocks = extract_code_blocks(results);
    if blocks.is_empty() {
        return SynthesisResult {
            code: String::new(),
            confidence: 0.0,
            explanations: vec!["No valid responses received".to_string()],
        };
    }
    if blocks.len() == 1 {
        return SynthesisResult {
            code: blocks[0].code.clone(),
            confidence: blocks[0].confidence,
            explanations: Vec::new(),
        };
    }

    let consensus = build_consensus(&blocks, model_weights);
    let (code, confidence, fixes) = validate_syntax(&consensus);
    SynthesisResult { code, confidence, explanations: fixes }
}

fn extract_code_blocks(results: &[SubTaskResult]) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    for result in results {
        let matches: Vec<&str> = FENCE.captures_iter(&result.text).map(|c| c.get(1).unwrap().as_str()).collect();
        if !matches.is_empty() {
            for code in matches {
                blocks.push(CodeBlock {
                    code: code.trim().to_string(),
                    model: result.model.clone(),
                    confidence: result.confidence,
                });
            }
        } else {
            let code_lines: Vec<&str> =
                result.text.trim().lines().filter(|l| !l.starts_with('#') || l.starts_with("#!")).collect();
            if !code_lines.is_empty() {
                blocks.push(CodeBlock {
                    code: code_lines.join("\n"),
                    model: result.model.clone(),
                    confidence: result.confidence * NON_CODE_BLOCK_PENALTY,
                });
            }
        }
    }
    blocks
}

fn build_consensus(blocks: &[CodeBlock], model_weights: &HashMap<String, f64>) -> String {
    let groups = group_similar(blocks);
    let best_group = groups
        .iter()
        .max_by(|a, b| group_score(a, model_weights).total_cmp(&group_score(b, model_weights)))
        .expect("groups is non-empty when blocks is non-empty");

    if best_group.len() == 1 {
        return best_group[0].code.clone();
    }
    merge_similar_blocks(best_group, model_weights)
}

fn group_score(group: &[&CodeBlock], model_weights: &HashMap<String, f64>) -> f64 {
    group.iter().map(|b| weight_of(model_weights, &b.model) * b.confidence).sum()
}

fn weight_of(model_weights: &HashMap<String, f64>, model: &str) -> f64 {
    model_weights.get(model).copied().unwrap_or(1.0)
}

/// Single-pass greedy grouping: each ungrouped block starts a new group
/// and absorbs every later ungrouped block whose similarity ratio to it
/// exceeds [`SIMILARITY_THRESHOLD`] (spec §4.7.1).
fn group_similar(blocks: &[CodeBlock]) -> Vec<Vec<&CodeBlock>> {
    let mut used = vec![false; blocks.len()];
    let mut groups = Vec::new();

    for i in 0..blocks.len() {
        if used[i] {
            continue;
        }
        let mut group = vec![&blocks[i]];
        used[i] = true;
        for j in (i + 1)..blocks.len() {
            if used[j] {
                continue;
            }
            let ratio = f64::from(TextDiff::from_chars(blocks[i].code.as_str(), blocks[j].code.as_str()).ratio());
            if ratio > SIMILARITY_THRESHOLD {
                group.push(&blocks[j]);
                used[j] = true;
            }
        }
        groups.push(group);
    }
    groups
}

fn merge_similar_blocks(blocks: &[&CodeBlock], model_weights: &HashMap<String, f64>) -> String {
    let split: Vec<Vec<&str>> = blocks.iter().map(|b| b.code.lines().collect()).collect();
    let max_lines = split.iter().map(Vec::len).max().unwrap_or(0);

    let mut merged = Vec::with_capacity(max_lines);
    for line_idx in 0..max_lines {
        let mut votes: HashMap<&str, f64> = HashMap::new();
        for (block, lines) in blocks.iter().zip(&split) {
            if let Some(line) = lines.get(line_idx) {
                *votes.entry(line).or_insert(0.0) += weight_of(model_weights, &block.model);
            }
        }
        if let Some((best_line, _)) = votes.into_iter().max_by(|a, b| a.1.total_cmp(&b.1)) {
            merged.push(best_line.to_string());
        }
    }
    merged.join("\n")
}

/// Heuristic syntax check: balanced delimiters, plus two Python-specific
/// repairs the original applies (indentation rounded to a multiple of 4,
/// a trailing `:` added to unterminated control-flow lines). This is an
/// approximation, not a real compiler invocation; invalid-after-repair
/// code is penalized rather than rejected.
fn validate_syntax(code: &str) -> (String, f64, Vec<String>) {
    if delimiters_balanced(code) {
        return (code.to_string(), 1.0, Vec::new());
    }

    let mut fixed = fix_indentation(code);
    if fixed == code {
        fixed = fix_missing_colons(code);
    }

    let mut fixes = Vec::new();
    if fixed != code {
        fixes.push("Fixed syntax error: unbalanced delimiters or missing block terminator".to_string());
    }
    // Penalized regardless of whether the repair actually closed the gap:
    // neither heuristic guarantees the result is now valid.
    (fixed, INVALID_SYNTAX_PENALTY, fixes)
}

fn delimiters_balanced(code: &str) -> bool {
    let mut stack = Vec::new();
    for ch in code.chars() {
        match ch {
            '(' | '[' | '{' => stack.push(ch),
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            '}' => {
                if stack.pop() != Some('{') {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty()
}

fn fix_indentation(code: &str) -> String {
    code.lines()
        .map(|line| {
            if line.trim().is_empty() {
                return line.to_string();
            }
            let indent = line.len() - line.trim_start().len();
            if indent % 4 == 0 {
                return line.to_string();
            }
            let rounded = (indent / 4) * 4;
            format!("{}{}", " ".repeat(rounded), line.trim_start())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const CONTROL_KEYWORDS: &[&str] = &["def ", "class ", "if ", "for ", "while ", "try:", "except"];

fn fix_missing_colons(code: &str) -> String {
    code.lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return line.to_string();
            }
            if CONTROL_KEYWORDS.iter().any(|kw| line.contains(kw)) && !line.trim_end().ends_with(':') {
                return format!("{}:", line.trim_end());
            }
            line.to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(model: &str, text: &str) -> SubTaskResult {
        SubTaskResult {
            subtask_id: hydra_core::task::SubTaskId("0".to_string()),
            model: model.to_string(),
            text: text.to_string(),
            confidence: 1.0,
        }
    }

    #[test]
    fn single_response_short_circuits_voting() {
        let results = vec![result("a", "```python\nprint('hi')\n```")];
        let out = synthesize(&results, &HashMap::new());
        assert_eq!(out.code, "print('hi')");
        assert_eq!(out.confidence, 1.0);
    }

    #[test]
    fn no_responses_reports_explanation() {
        let out = synthesize(&[], &HashMap::new());
        assert_eq!(out.confidence, 0.0);
        assert_eq!(out.explanations, vec!["No valid responses received".to_string()]);
    }

    #[test]
    fn fenced_code_blocks_are_extracted_per_result() {
        let results = vec![result("a", "```python\nx = 1\n```"), result("b", "```python\nx = 1\n```")];
        let blocks = extract_code_blocks(&results);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].code, "x = 1");
    }

    #[test]
    fn similar_blocks_merge_by_weighted_line_vote() {
        let blocks = vec![
            CodeBlock { code: "x = 1\ny = 2".to_string(), model: "a".to_string(), confidence: 1.0 },
            CodeBlock { code: "x = 1\ny = 3".to_string(), model: "b".to_string(), confidence: 1.0 },
        ];
        let refs: Vec<&CodeBlock> = blocks.iter().collect();
        let mut weights = HashMap::new();
        weights.insert("b".to_string(), 2.0);
        let merged = merge_similar_blocks(&refs, &weights);
        assert_eq!(merged, "x = 1\ny = 3");
    }

    #[test]
    fn balanced_delimiters_pass_without_penalty() {
        let (code, confidence, fixes) = validate_syntax("def f(x):\n    return (x + 1)");
        assert_eq!(code, "def f(x):\n    return (x + 1)");
        assert_eq!(confidence, 1.0);
        assert!(fixes.is_empty());
    }

    #[test]
    fn unbalanced_delimiters_are_penalized() {
        let (_, confidence, _) = validate_syntax("def f(x:\n    return (x + 1)");
        assert_eq!(confidence, INVALID_SYNTAX_PENALTY);
    }
}

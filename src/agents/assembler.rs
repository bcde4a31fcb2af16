//! Context assembly.
//!
//! Turns retrieved items into one bounded context block. Overlapping
//! segments of the same document are merged, repeated URLs collapse to
//! their best-scoring snippet, and scores are normalized per source kind
//! before greedy selection.

use crate::types::{AssembledContext, Citation, RetrievedItem, SourceKind};
use crate::utils::toml_config::AssemblerConfig;
use crate::utils::truncate_chars;
use std::collections::HashMap;

const SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    budget_chars: usize,
    min_item_chars: usize,
}

/// An item with its position in the original result order.
struct Candidate {
    item: RetrievedItem,
    order: usize,
}

impl ContextAssembler {
    pub fn new(budget_chars: usize, min_item_chars: usize) -> Self {
        Self {
            budget_chars,
            min_item_chars,
        }
    }

    pub fn from_config(config: &AssemblerConfig) -> Self {
        Self::new(config.budget_chars, config.min_item_chars)
    }

    /// Build the context block. The rendered text never exceeds the
    /// character budget; empty input gives an empty context.
    pub fn assemble(&self, items: Vec<RetrievedItem>) -> AssembledContext {
        let mut candidates = dedupe(items);
        normalize_scores(&mut candidates);
        candidates.sort_by(|a, b| {
            b.item
                .score
                .total_cmp(&a.item.score)
                .then(a.item.kind.cmp(&b.item.kind))
                .then(a.order.cmp(&b.order))
        });

        let mut blocks: Vec<String> = Vec::new();
        let mut citations: Vec<Citation> = Vec::new();
        let mut markers: HashMap<(SourceKind, String), usize> = HashMap::new();
        let mut used = 0;

        for Candidate { item, .. } in candidates {
            if item.text.trim().is_empty() {
                continue;
            }

            let key = (item.kind, item.source_id.clone());
            let marker = markers
                .get(&key)
                .copied()
                .unwrap_or(citations.len() + 1);

            let separator = if blocks.is_empty() { 0 } else { SEPARATOR.len() };
            let header = block_header(marker, &item);
            let header_chars = header.chars().count();
            let text_chars = item.text.chars().count();
            let fixed = used + separator + header_chars;
            if fixed >= self.budget_chars {
                break;
            }
            let remaining = self.budget_chars - fixed;

            let (text, last) = if text_chars <= remaining {
                (item.text.as_str(), false)
            } else if remaining >= self.min_item_chars {
                (truncate_chars(&item.text, remaining), true)
            } else {
                break;
            };

            used += separator + header_chars + text.chars().count();
            blocks.push(format!("{}{}", header, text));

            if !markers.contains_key(&key) {
                markers.insert(key, marker);
                citations.push(Citation {
                    marker,
                    kind: item.kind,
                    source_id: item.source_id.clone(),
                    title: item.title.clone(),
                    url: item.url.clone(),
                });
            }

            if last {
                break;
            }
        }

        AssembledContext {
            text: blocks.join(SEPARATOR),
            citations,
        }
    }
}

fn block_header(marker: usize, item: &RetrievedItem) -> String {
    format!("[{}] ({}) {}\n", marker, item.kind, item.title)
}

/// Merge overlapping spans of the same document and collapse repeated URLs.
fn dedupe(items: Vec<RetrievedItem>) -> Vec<Candidate> {
    let mut local: HashMap<String, Vec<Candidate>> = HashMap::new();
    let mut web: Vec<Candidate> = Vec::new();
    let mut url_slot: HashMap<String, usize> = HashMap::new();

    for (order, item) in items.into_iter().enumerate() {
        match item.kind {
            SourceKind::Local => local
                .entry(item.source_id.clone())
                .or_default()
                .push(Candidate { item, order }),
            SourceKind::Web => {
                let url = item.url.clone().unwrap_or_else(|| item.source_id.clone());
                match url_slot.get(&url) {
                    Some(&slot) => {
                        if item.score > web[slot].item.score {
                            web[slot].item = item;
                        }
                    }
                    None => {
                        url_slot.insert(url, web.len());
                        web.push(Candidate { item, order });
                    }
                }
            }
        }
    }

    let mut out: Vec<Candidate> = local.into_values().flat_map(merge_spans).collect();
    out.extend(web);
    out
}

/// Merge candidates from one document whose texts overlap.
///
/// Spans are narrowed to the bytes the text actually covers first, so a
/// snippet capped by the retriever only joins a neighbour it really meets.
fn merge_spans(mut group: Vec<Candidate>) -> Vec<Candidate> {
    for c in group.iter_mut() {
        if let Some((start, end)) = c.item.span {
            c.item.span = Some((start, end.min(start + c.item.text.len())));
        }
    }
    group.sort_by_key(|c| (c.item.span.map(|s| s.0).unwrap_or(0), c.order));

    let mut merged: Vec<Candidate> = Vec::new();
    for next in group {
        let Some(last) = merged.last_mut() else {
            merged.push(next);
            continue;
        };
        match (last.item.span, next.item.span) {
            (Some((start, end)), Some((next_start, next_end))) if next_start < end => {
                if next_end > end {
                    let Some(tail) = next.item.text.get(end - next_start..) else {
                        merged.push(next);
                        continue;
                    };
                    last.item.text.push_str(tail);
                }
                last.item.span = Some((start, end.max(next_end)));
                last.item.score = last.item.score.max(next.item.score);
                last.order = last.order.min(next.order);
            }
            _ => merged.push(next),
        }
    }
    merged
}

/// Divide each score by the best score of its kind.
fn normalize_scores(candidates: &mut [Candidate]) {
    for kind in [SourceKind::Local, SourceKind::Web] {
        let max = candidates
            .iter()
            .filter(|c| c.item.kind == kind)
            .map(|c| c.item.score)
            .fold(f32::NEG_INFINITY, f32::max);
        if max > 0.0 && max.is_finite() {
            for c in candidates.iter_mut().filter(|c| c.item.kind == kind) {
                c.item.score /= max;
            }
        }
    }
}

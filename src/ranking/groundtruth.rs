use std::collections::HashMap;

use tracing::debug;

use crate::model::CoverSet;

const GROUNDTRUTH_FIELDS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct Groundtruth {
    cover_sets: Vec<CoverSet>,
    membership: HashMap<String, usize>,
    titles: HashMap<String, String>,
    pub skipped_rows: usize,
}

impl Groundtruth {
    pub fn cover_sets(&self) -> &[CoverSet] {
        &self.cover_sets
    }

    pub fn cover_set_of(&self, id: &str) -> Option<&CoverSet> {
        self.membership
            .get(id)
            .and_then(|index| self.cover_sets.get(*index))
    }

    pub fn title(&self, id: &str) -> Option<&str> {
        self.titles.get(id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.cover_sets.is_empty()
    }
}

pub fn load_groundtruth<I, S>(lines: I) -> Groundtruth
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groundtruth = Groundtruth::default();
    let mut label_index = HashMap::<String, usize>::new();

    for (line_no, raw) in lines.into_iter().enumerate() {
        let line = raw.as_ref().trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }

        let fields = split_fields(line);
        if fields.len() != GROUNDTRUTH_FIELDS {
            debug!(
                line = line_no + 1,
                fields = fields.len(),
                "skipping groundtruth row with unexpected field count"
            );
            groundtruth.skipped_rows += 1;
            continue;
        }

        let id = fields[0].trim();
        let label = fields[1].trim();
        if id.is_empty() || label.is_empty() {
            debug!(line = line_no + 1, "skipping groundtruth row with empty id or label");
            groundtruth.skipped_rows += 1;
            continue;
        }

        let set_index = *label_index.entry(label.to_string()).or_insert_with(|| {
            groundtruth.cover_sets.push(CoverSet {
                label: label.to_string(),
                members: Vec::new(),
            });
            groundtruth.cover_sets.len() - 1
        });

        match groundtruth.membership.get(id) {
            Some(existing) if *existing == set_index => {
                debug!(line = line_no + 1, id = %id, "duplicate cover set member ignored");
                continue;
            }
            Some(existing) => {
                debug!(
                    line = line_no + 1,
                    id = %id,
                    kept_label = %groundtruth.cover_sets[*existing].label,
                    dropped_label = %label,
                    "candidate already belongs to another cover set; row ignored"
                );
                groundtruth.skipped_rows += 1;
                continue;
            }
            None => {}
        }

        groundtruth.cover_sets[set_index].members.push(id.to_string());
        groundtruth.membership.insert(id.to_string(), set_index);
        groundtruth
            .titles
            .insert(id.to_string(), fields[2].trim().to_string());
    }

    groundtruth.cover_sets.retain(|set| !set.members.is_empty());
    groundtruth.membership = groundtruth
        .cover_sets
        .iter()
        .enumerate()
        .flat_map(|(index, set)| set.members.iter().map(move |id| (id.clone(), index)))
        .collect();

    groundtruth
}

pub fn load_recording_relevance<I, S>(lines: I, recording_id: &str) -> Option<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut relevant = None;
    for raw in lines {
        let fields = split_fields(raw.as_ref().trim_end_matches(['\r', '\n']));
        let Some((first, rest)) = fields.split_first() else {
            continue;
        };
        if first.trim() == recording_id {
            relevant = Some(
                rest.iter()
                    .map(|field| field.trim().to_string())
                    .filter(|field| !field.is_empty())
                    .collect(),
            );
        }
    }
    relevant
}

/// Comma-separated fields with double-quote quoting; `""` inside quotes is a
/// literal quote.
pub(crate) fn split_fields(line: &str) -> Vec<String> {
    if line.is_empty() {
        return Vec::new();
    }

    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(character) = chars.next() {
        match character {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            other => field.push(other),
        }
    }
    fields.push(field);
    fields
}

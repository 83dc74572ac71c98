//! Interactive duplicate resolution: a side-by-side table and a choice of which photo to keep.

use console::{style, Term};
use dialoguer::Select;

use flickr_cli_core::contract::{DuplicatePrompt, ItemRecord};
use flickr_cli_core::duplicates::DuplicateGroup;
use flickr_cli_core::error::WorkflowError;
use flickr_cli_core::short_url::short_url;

const MAX_CELL: usize = 40;

fn cell(value: &str) -> String {
    let flat = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX_CELL {
        return flat;
    }
    let mut cut: String = flat.chars().take(MAX_CELL - 1).collect();
    cut.push('…');
    cut
}

fn taken(record: &ItemRecord) -> String {
    format!("{} ({})", record.taken.taken, record.taken.granularity.code())
}

/// One row per compared field plus a header of short URLs. Rows that differ are marked `*`.
pub fn render_diff_table(group: &DuplicateGroup) -> Vec<String> {
    let fields: [(&str, fn(&ItemRecord) -> String); 3] = [
        ("Title", |r: &ItemRecord| r.title.clone()),
        ("Description", |r: &ItemRecord| r.description.clone()),
        ("Date taken", taken),
    ];

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut header = vec![String::new()];
    header.extend(group.records.iter().map(|r| short_url(&r.id)));
    rows.push(header);
    for (label, get) in fields {
        let values: Vec<String> = group.records.iter().map(|r| cell(&get(r))).collect();
        let differs = values.windows(2).any(|w| w[0] != w[1]);
        let mut row = vec![if differs {
            format!("* {label}")
        } else {
            format!("  {label}")
        }];
        row.extend(values);
        rows.push(row);
    }

    let columns = rows[0].len();
    let widths: Vec<usize> = (0..columns)
        .map(|c| rows.iter().map(|r| r[c].chars().count()).max().unwrap_or(0))
        .collect();
    rows.iter()
        .map(|row| {
            row.iter()
                .zip(&widths)
                .map(|(value, width)| format!("{value:<width$}"))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        })
        .collect()
}

/// Prompts on the terminal; answers `None` when nobody is attending it.
pub struct TerminalPrompt {
    term: Term,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl DuplicatePrompt for TerminalPrompt {
    fn choose(&self, group: &DuplicateGroup) -> Result<Option<usize>, WorkflowError> {
        let write = |line: String| {
            self.term
                .write_line(&line)
                .map_err(|e| WorkflowError::Prompt(e.to_string()))
        };

        write(String::new())?;
        write(format!(
            "{} {} photos share {}",
            style("[DUPLICATES]").yellow().bold(),
            group.records.len(),
            style(&group.tag).cyan()
        ))?;
        write(format!("  {}", group.tag_url()))?;
        for (i, line) in render_diff_table(group).into_iter().enumerate() {
            if i == 0 {
                write(format!("  {}", style(line).bold()))?;
            } else {
                write(format!("  {line}"))?;
            }
        }

        if !console::user_attended() {
            tracing::debug!(tag = %group.tag, "Not attended, skipping duplicate choice");
            return Ok(None);
        }

        let mut items = group.short_urls();
        items.push("None (decide later)".to_string());
        let selection = Select::new()
            .with_prompt("Which photo do you want to keep?")
            .items(&items)
            .default(items.len() - 1)
            .interact_on(&self.term)
            .map_err(|e| WorkflowError::Prompt(e.to_string()))?;

        Ok((selection < group.records.len()).then_some(selection))
    }
}

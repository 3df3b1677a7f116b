use std::collections::HashMap;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::evolution::describe::title_case;
use crate::evolution::rows::SPLIT_BRANCH_COUNT;
use crate::evolution::variants::is_cosmetic_cap;
use crate::evolution::{DisplayRow, EvolutionChart, RegionalTag, NO_EVOLUTION_DATA};
use crate::records::PokemonRecord;
use crate::resolver::Resolver;

const TEXT_MAIN: Color = Color::Rgb(232, 242, 244);
const TEXT_DIM: Color = Color::Rgb(176, 195, 207);
const ACCENT_TEAL: Color = Color::Rgb(72, 204, 184);
const ACCENT_GOLD: Color = Color::Rgb(228, 176, 88);

const ARROW: &str = " → ";
const BRANCH_UP: &str = "  ↗ ";
const BRANCH_DOWN: &str = "  ↘ ";
const FAN_MIDDLE: &str = "  ├ ";
const FAN_LAST: &str = "  └ ";
const UNKNOWN_STAGE: &str = "Unknown";

const NAME_OVERRIDES: &[(&str, &str)] = &[
    ("mr-mime", "Mr. Mime"),
    ("mr-rime", "Mr. Rime"),
    ("mime-jr", "Mime Jr."),
    ("type-null", "Type: Null"),
    ("ho-oh", "Ho-Oh"),
    ("porygon-z", "Porygon-Z"),
    ("jangmo-o", "Jangmo-o"),
    ("hakamo-o", "Hakamo-o"),
    ("kommo-o", "Kommo-o"),
    ("farfetchd", "Farfetch'd"),
    ("sirfetchd", "Sirfetch'd"),
    ("nidoran-f", "Nidoran♀"),
    ("nidoran-m", "Nidoran♂"),
    ("flabebe", "Flabébé"),
];

/// `ninetales-alola` -> `Alolan Ninetales`; other slugs are title-cased.
pub fn display_name(slug: &str) -> String {
    let slug = slug.trim().to_ascii_lowercase();
    if let Some((_, name)) = NAME_OVERRIDES.iter().find(|(key, _)| *key == slug) {
        return name.to_string();
    }
    if is_cosmetic_cap(&slug) {
        return title_case(&slug);
    }

    let parts: Vec<&str> = slug.split('-').filter(|part| !part.is_empty()).collect();
    for tag in RegionalTag::ALL {
        let Some(position) = parts.iter().position(|part| *part == tag.token()) else {
            continue;
        };
        let rest: Vec<&str> = parts
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != position)
            .map(|(_, part)| *part)
            .collect();
        if rest.is_empty() {
            break;
        }
        return format!("{} {}", tag.adjective(), display_name(&rest.join("-")));
    }
    title_case(&slug)
}

/// Label for a non-default form of `species`, e.g. `Alolan Form` or `Partner`.
pub fn form_label(species: &str, pokemon: &str) -> Option<String> {
    let suffix = pokemon.strip_prefix(species)?.strip_prefix('-')?;
    if suffix.is_empty() {
        return None;
    }
    if species == "rockruff" && suffix == "own-tempo" {
        return Some("Own Tempo".to_string());
    }
    if suffix == "starter" {
        return Some("Partner".to_string());
    }
    if let Some(tag) = RegionalTag::ALL.into_iter().find(|tag| tag.token() == suffix) {
        return Some(format!("{} Form", tag.adjective()));
    }
    if suffix == "gmax" || suffix == "gigantamax" {
        return Some("Gigantamax".to_string());
    }
    if let Some(rest) = suffix.strip_prefix("mega") {
        let rest = rest.trim_start_matches('-');
        return Some(if rest.is_empty() {
            "Mega".to_string()
        } else {
            format!("Mega {}", title_case(rest))
        });
    }
    Some(format!("{} Form", title_case(suffix)))
}

/// What one stage of a row shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageCard {
    pub name: String,
    pub form: Option<String>,
    pub number: Option<u32>,
    pub types: Vec<String>,
}

impl StageCard {
    pub fn from_record(record: &PokemonRecord) -> Self {
        let number = record
            .species_id
            .as_deref()
            .and_then(|id| id.parse().ok())
            .unwrap_or(record.id);
        Self {
            name: display_name(&record.species_name),
            form: form_label(&record.species_name, &record.name),
            number: Some(number),
            types: record.types.iter().map(|name| title_case(name)).collect(),
        }
    }

    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_STAGE.to_string(),
            form: None,
            number: None,
            types: Vec::new(),
        }
    }

    fn spans(&self) -> Vec<Span<'static>> {
        let mut spans = vec![Span::styled(
            self.name.clone(),
            Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
        )];
        if let Some(form) = &self.form {
            spans.push(Span::styled(format!(" ({form})"), Style::default().fg(ACCENT_GOLD)));
        }
        if let Some(number) = self.number {
            spans.push(Span::styled(format!(" #{number:04}"), Style::default().fg(TEXT_DIM)));
        }
        if !self.types.is_empty() {
            spans.push(Span::styled(
                format!(" [{}]", self.types.join("/")),
                Style::default().fg(ACCENT_TEAL),
            ));
        }
        spans
    }
}

/// Resolves every stage of `chart`; stages that fail to load render as unknown.
pub async fn load_stage_cards(
    resolver: &Resolver,
    chart: &EvolutionChart,
) -> HashMap<String, StageCard> {
    let identifiers = chart.identifiers();
    resolver
        .resolve_many(&identifiers)
        .await
        .into_iter()
        .map(|(identifier, result)| {
            let card = match result {
                Ok(record) => StageCard::from_record(&record),
                Err(err) => {
                    tracing::warn!(identifier = %identifier, error = %err, "stage unavailable");
                    StageCard::unknown()
                }
            };
            (identifier, card)
        })
        .collect()
}

/// Text lines for `chart`. More one-step rows leaving the same stage than a
/// split row holds (Eevee) are drawn as one hub with a branch per target.
pub fn chart_lines(chart: &EvolutionChart, cards: &HashMap<String, StageCard>) -> Vec<Line<'static>> {
    let rows = match chart {
        EvolutionChart::NoData => {
            return vec![Line::from(Span::styled(
                NO_EVOLUTION_DATA,
                Style::default().fg(TEXT_DIM),
            ))]
        }
        EvolutionChart::Rows(rows) => rows,
    };

    let mut lines = Vec::new();
    let mut index = 0;
    while index < rows.len() {
        if index > 0 {
            lines.push(Line::default());
        }
        if let Some((hub, len)) = fan_out_run(&rows[index..]) {
            lines.push(Line::from(card_for(cards, hub).spans()));
            for (offset, row) in rows[index..index + len].iter().enumerate() {
                let Some((_, condition, target)) = single_edge(row) else {
                    continue;
                };
                let marker = if offset + 1 == len { FAN_LAST } else { FAN_MIDDLE };
                lines.push(branch_line(marker, condition, target, cards));
            }
            index += len;
            continue;
        }
        match &rows[index] {
            DisplayRow::Linear {
                identifiers,
                conditions,
            } => lines.push(Line::from(chain_spans(identifiers, conditions, cards))),
            DisplayRow::Split {
                prefix_identifiers,
                prefix_conditions,
                branches,
            } => {
                lines.push(Line::from(chain_spans(
                    prefix_identifiers,
                    prefix_conditions,
                    cards,
                )));
                for (marker, branch) in [BRANCH_UP, BRANCH_DOWN].into_iter().zip(branches) {
                    lines.push(branch_line(marker, &branch.condition, &branch.identifier, cards));
                }
            }
        }
        index += 1;
    }
    lines
}

/// Leading run of one-step rows sharing a source stage, if it is longer
/// than a split row.
fn fan_out_run(rows: &[DisplayRow]) -> Option<(&str, usize)> {
    let (hub, _, _) = single_edge(rows.first()?)?;
    let len = rows
        .iter()
        .take_while(|row| single_edge(row).is_some_and(|(source, _, _)| source == hub))
        .count();
    (len > SPLIT_BRANCH_COUNT).then_some((hub, len))
}

/// `(source, condition, target)` of a two-stage linear row.
fn single_edge(row: &DisplayRow) -> Option<(&str, &str, &str)> {
    match row {
        DisplayRow::Linear {
            identifiers,
            conditions,
        } if identifiers.len() == 2 => Some((
            identifiers[0].as_str(),
            conditions.first().map(String::as_str).unwrap_or(""),
            identifiers[1].as_str(),
        )),
        _ => None,
    }
}

fn branch_line(
    marker: &'static str,
    condition: &str,
    identifier: &str,
    cards: &HashMap<String, StageCard>,
) -> Line<'static> {
    let mut spans = vec![Span::styled(marker, Style::default().fg(TEXT_DIM))];
    if let Some(condition) = condition_span(condition) {
        spans.push(condition);
        spans.push(arrow());
    }
    spans.extend(card_for(cards, identifier).spans());
    Line::from(spans)
}

fn chain_spans(
    identifiers: &[String],
    conditions: &[String],
    cards: &HashMap<String, StageCard>,
) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (index, identifier) in identifiers.iter().enumerate() {
        if index > 0 {
            spans.push(arrow());
            if let Some(condition) = conditions
                .get(index - 1)
                .and_then(|condition| condition_span(condition))
            {
                spans.push(condition);
                spans.push(arrow());
            }
        }
        spans.extend(card_for(cards, identifier).spans());
    }
    spans
}

fn arrow() -> Span<'static> {
    Span::styled(ARROW, Style::default().fg(TEXT_DIM))
}

fn condition_span(condition: &str) -> Option<Span<'static>> {
    if condition.is_empty() {
        return None;
    }
    Some(Span::styled(
        condition.to_string(),
        Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::ITALIC),
    ))
}

fn card_for(cards: &HashMap<String, StageCard>, identifier: &str) -> StageCard {
    cards.get(identifier).cloned().unwrap_or_else(|| StageCard {
        name: display_name(identifier),
        form: None,
        number: identifier.parse().ok(),
        types: Vec::new(),
    })
}

pub fn plain_text(chart: &EvolutionChart, cards: &HashMap<String, StageCard>) -> String {
    chart_lines(chart, cards)
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bordered chart panel.
pub struct EvolutionChartWidget<'a> {
    chart: &'a EvolutionChart,
    cards: &'a HashMap<String, StageCard>,
    title: String,
}

impl<'a> EvolutionChartWidget<'a> {
    pub fn new(chart: &'a EvolutionChart, cards: &'a HashMap<String, StageCard>) -> Self {
        Self {
            chart,
            cards,
            title: "EVOLUTION".to_string(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Rows needed to draw the chart without wrapping, borders included.
    pub fn height(&self) -> u16 {
        let lines = chart_lines(self.chart, self.cards).len();
        u16::try_from(lines + 2).unwrap_or(u16::MAX)
    }
}

impl Widget for EvolutionChartWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title)
            .style(Style::default().fg(TEXT_MAIN));
        Paragraph::new(chart_lines(self.chart, self.cards))
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

use crate::lookup::{LookupResponse, Region};
use crate::route::{ViewMode, char_href};
use serde::Serialize;

/// Placeholder shown for absent values and empty lists.
pub const EMPTY: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharChip {
    pub ch: String,
    pub href: String,
}

impl CharChip {
    fn new(ch: &str, view: ViewMode) -> Self {
        Self {
            ch: ch.to_string(),
            href: char_href(ch, view),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionRow {
    pub region: &'static str,
    pub script: &'static str,
    pub chip: Option<CharChip>,
    pub same_as_input: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChipRow {
    pub label: &'static str,
    pub chips: Vec<CharChip>,
}

impl ChipRow {
    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// Chips as plain text, `—` when there are none.
    pub fn joined(&self) -> String {
        join_chips(&self.chips)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudyRow {
    pub key: &'static str,
    pub value: String,
}

/// Display-ready rows for one lookup response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupView {
    pub char: String,
    pub lang: String,
    /// Raw `detected_input_lang` code, empty when the API sent none.
    pub lang_code: String,
    pub view: ViewMode,
    pub forms: Vec<FormRow>,
    pub regions: Vec<RegionRow>,
    pub composition: Vec<ChipRow>,
    pub variants: Vec<CharChip>,
    pub definition: String,
    pub study: Option<Vec<StudyRow>>,
    pub notes_markdown: Option<String>,
}

impl LookupView {
    pub fn from_response(response: &LookupResponse, view: ViewMode) -> Self {
        let forms = [
            ("Japanese", &response.japanese),
            ("Simplified", &response.simplified),
            ("Traditional", &response.traditional),
        ]
        .into_iter()
        .map(|(label, form)| FormRow {
            label,
            value: format!("{} ({})", or_empty(&form.char), form.same_label()),
        })
        .collect();

        let regions = response
            .region_rows()
            .into_iter()
            .map(|(region, form)| region_row(region, form.char.as_str(), form.same_as_input, view))
            .collect();

        let composition = [
            ("Decomposition", &response.composition.decomposition),
            ("JP supercompositions", &response.composition.jp_supercompositions),
            ("ZH supercompositions", &response.composition.zh_supercompositions),
            (
                "Merged supercompositions",
                &response.composition.merged_supercompositions,
            ),
        ]
        .into_iter()
        .map(|(label, chars)| ChipRow {
            label,
            chips: chips(chars, view),
        })
        .collect();

        let study = response.cjk_learn.as_ref().map(|learn| {
            learn
                .rows()
                .into_iter()
                .map(|(key, value)| StudyRow {
                    key,
                    value: value
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| EMPTY.to_string()),
                })
                .collect()
        });

        let input_lang = response.input_lang();
        Self {
            char: or_empty(&response.char).to_string(),
            lang: input_lang
                .as_ref()
                .map(|lang| lang.label().to_string())
                .unwrap_or_else(|| EMPTY.to_string()),
            lang_code: input_lang
                .as_ref()
                .map(|lang| lang.code().to_string())
                .unwrap_or_default(),
            view,
            forms,
            regions,
            composition,
            variants: chips(&response.variants, view),
            definition: response
                .unihan_definition
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .unwrap_or(EMPTY)
                .to_string(),
            study,
            notes_markdown: response
                .md
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string),
        }
    }

    /// Study rows as `key: value` lines, `—` when the API sent none.
    pub fn study_text(&self) -> String {
        match &self.study {
            Some(rows) => rows
                .iter()
                .map(|row| format!("{}: {}", row.key, row.value))
                .collect::<Vec<_>>()
                .join("\n"),
            None => EMPTY.to_string(),
        }
    }

    pub fn variants_text(&self) -> String {
        join_chips(&self.variants)
    }
}

fn region_row(region: Region, ch: &str, same_as_input: bool, view: ViewMode) -> RegionRow {
    RegionRow {
        region: region.label(),
        script: region.script(),
        chip: (!ch.is_empty()).then(|| CharChip::new(ch, view)),
        same_as_input,
    }
}

fn chips(chars: &[String], view: ViewMode) -> Vec<CharChip> {
    chars
        .iter()
        .filter(|ch| !ch.is_empty())
        .map(|ch| CharChip::new(ch, view))
        .collect()
}

fn join_chips(chips: &[CharChip]) -> String {
    if chips.is_empty() {
        return EMPTY.to_string();
    }
    chips
        .iter()
        .map(|chip| chip.ch.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn or_empty(value: &str) -> &str {
    if value.is_empty() { EMPTY } else { value }
}

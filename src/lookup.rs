use serde::{Deserialize, Serialize};
use std::fmt;

/// One script form of the looked-up character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Form {
    pub char: String,
    pub same_as_input: bool,
}

impl Form {
    pub fn same_label(&self) -> &'static str {
        if self.same_as_input { "same" } else { "diff" }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Composition {
    pub decomposition: Vec<String>,
    pub jp_supercompositions: Vec<String>,
    pub zh_supercompositions: Vec<String>,
    pub merged_supercompositions: Vec<String>,
}

/// Index values arrive either as numbers (`index_rtk: 12`) or as strings
/// (`index_hanja: "80_夕_外"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LearnValue {
    Number(i64),
    Text(String),
}

impl fmt::Display for LearnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearnValue::Number(value) => write!(f, "{value}"),
            LearnValue::Text(value) => f.write_str(value),
        }
    }
}

/// Study-list metadata (RTK/RTH/RSH keywords and indices, Hanja level index).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CjkLearn {
    pub keyword_rtk: Option<LearnValue>,
    pub keyword_rth: Option<LearnValue>,
    pub keyword_rsh: Option<LearnValue>,
    pub index_hanja: Option<LearnValue>,
    pub index_rtk: Option<LearnValue>,
    pub index_rth: Option<LearnValue>,
    pub index_rsh: Option<LearnValue>,
}

impl CjkLearn {
    pub fn rows(&self) -> [(&'static str, Option<&LearnValue>); 7] {
        [
            ("keyword_rtk", self.keyword_rtk.as_ref()),
            ("keyword_rth", self.keyword_rth.as_ref()),
            ("keyword_rsh", self.keyword_rsh.as_ref()),
            ("index_hanja", self.index_hanja.as_ref()),
            ("index_rtk", self.index_rtk.as_ref()),
            ("index_rth", self.index_rth.as_ref()),
            ("index_rsh", self.index_rsh.as_ref()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Japan,
    MainlandChina,
    TaiwanHongKong,
}

impl Region {
    pub fn label(self) -> &'static str {
        match self {
            Region::Japan => "Japan",
            Region::MainlandChina => "Mainland China",
            Region::TaiwanHongKong => "Taiwan / Hong Kong",
        }
    }

    pub fn script(self) -> &'static str {
        match self {
            Region::Japan => "Japanese",
            Region::MainlandChina => "Simplified",
            Region::TaiwanHongKong => "Traditional",
        }
    }
}

/// Response body of `GET /api/lookup`. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupResponse {
    pub char: String,
    pub detected_input_lang: String,
    pub japanese: Form,
    pub simplified: Form,
    pub traditional: Form,
    pub composition: Composition,
    pub variants: Vec<String>,
    pub md: Option<String>,
    pub unihan_definition: Option<String>,
    pub cjk_learn: Option<CjkLearn>,
}

impl LookupResponse {
    pub fn input_lang(&self) -> Option<InputLang> {
        let code = self.detected_input_lang.trim();
        if code.is_empty() {
            None
        } else {
            Some(InputLang::from_code(code))
        }
    }

    pub fn region_rows(&self) -> [(Region, &Form); 3] {
        [
            (Region::Japan, &self.japanese),
            (Region::MainlandChina, &self.simplified),
            (Region::TaiwanHongKong, &self.traditional),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLang {
    Simplified,
    Traditional,
    Japanese,
    Other(String),
}

impl InputLang {
    pub fn from_code(code: &str) -> Self {
        match code {
            "sc" => InputLang::Simplified,
            "tc" => InputLang::Traditional,
            "jp" => InputLang::Japanese,
            other => InputLang::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            InputLang::Simplified => "sc",
            InputLang::Traditional => "tc",
            InputLang::Japanese => "jp",
            InputLang::Other(code) => code,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            InputLang::Simplified => "Simplified Chinese",
            InputLang::Traditional => "Traditional Chinese",
            InputLang::Japanese => "Japanese",
            InputLang::Other(code) => code,
        }
    }
}

impl fmt::Display for InputLang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

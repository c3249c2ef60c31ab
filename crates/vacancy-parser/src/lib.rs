//! # vacancy-parser
//!
//! Converts the rendered text of a vacancy detail overlay into a typed [`Record`].
//!
//! Every field is located by its own rule, which re-scans the whole text for an
//! anchor and stops at the next known section header. Sections can be missing or
//! out of order without affecting the other fields. A field that cannot be found
//! is set to [`PLACEHOLDER`]; parsing never fails.
//!
//! ```
//! use vacancy_parser::{parse_record, PLACEHOLDER};
//!
//! let record = parse_record("Título da Vaga: Marceneiro\tTipo de Requisição: Vaga nova\n");
//! assert_eq!(record.title, "Marceneiro");
//! assert_eq!(record.salary, PLACEHOLDER);
//! ```

pub mod format;

pub use format::{render, render_all};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Value of any field the parser could not find.
pub const PLACEHOLDER: &str = "—";

/// One vacancy, as extracted from its detail overlay plus its table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub title: String,
    pub company: String,
    pub salary: String,
    pub schedule: String,
    pub contract_type: String,
    pub benefits: String,
    pub activities_description: String,
    pub requirements: String,
    pub education: String,
    pub seniority_level: String,
    pub functional_area: String,
    pub location: String,
    pub notes: String,
    pub status_label: String,
    pub assignee_name: String,
}

impl Default for Record {
    fn default() -> Self {
        let p = || PLACEHOLDER.to_string();
        Self {
            title: p(),
            company: p(),
            salary: p(),
            schedule: p(),
            contract_type: p(),
            benefits: p(),
            activities_description: p(),
            requirements: p(),
            education: p(),
            seniority_level: p(),
            functional_area: p(),
            location: p(),
            notes: p(),
            status_label: p(),
            assignee_name: p(),
        }
    }
}

impl Record {
    /// Attach the quick fields read from the table row.
    pub fn with_row_meta(mut self, status: impl Into<String>, assignee: impl Into<String>) -> Self {
        self.status_label = non_blank(status.into());
        self.assignee_name = non_blank(assignee.into());
        self
    }
}

fn non_blank(value: String) -> String {
    if value.trim().is_empty() {
        PLACEHOLDER.to_string()
    } else {
        value
    }
}

/// Fields located directly in the overlay text.
///
/// `Street`, `District`, `City` and `State` are sub-fields of the composite
/// [`Record::location`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Company,
    Salary,
    Schedule,
    ContractType,
    Benefits,
    ActivitiesDescription,
    Requirements,
    Notes,
    Street,
    District,
    City,
    State,
    Education,
    SeniorityLevel,
    FunctionalArea,
}

impl Field {
    /// Every field, in catalogue order.
    pub const ALL: [Field; 16] = [
        Field::Title,
        Field::Company,
        Field::Salary,
        Field::Schedule,
        Field::ContractType,
        Field::Benefits,
        Field::ActivitiesDescription,
        Field::Requirements,
        Field::Notes,
        Field::Street,
        Field::District,
        Field::City,
        Field::State,
        Field::Education,
        Field::SeniorityLevel,
        Field::FunctionalArea,
    ];

    /// Anchor pattern with its stop boundary. Capture group 1 is the value.
    fn pattern(self) -> &'static str {
        match self {
            Field::Title => r"Título da Vaga:\s*(.+?)\s+Tipo de Requisição",
            Field::Company => r"Empresa\s+E-mail\s+Telefone\n[\d\s]+\t[\d\s]+\t(.+?)\t",
            Field::Salary => r"Salário\n\n(.+?)\n",
            Field::Schedule => r"Jornada\n\n(.+?)\n",
            Field::ContractType => r"Tipo de contrato\n\n(.+?)\n",
            Field::Benefits => r"(?s)Benefícios da Vaga\n(.+?)\nJustificativa",
            Field::ActivitiesDescription => {
                r"(?s)Descrição das atividades que o profissional irá realizar\n(.+?)\nRequisitos"
            }
            Field::Requirements => r"(?s)Requisitos\n(.+?)\nObservações",
            Field::Notes => r"(?s)Observações\n(.+?)\nCEP",
            Field::Street => r"CEP\s+Endereço\s+Complemento\n[^\t]+\t(.+?)\t",
            Field::District => r"Bairro\s+Cidade\s+UF\n(.+?)\t",
            Field::City => r"Bairro\s+Cidade\s+UF\n[^\t]+\t(.+?)\t",
            Field::State => r"Bairro\s+Cidade\s+UF\n[^\t]+\t[^\t]+\t(.+?)\n",
            Field::Education => {
                r"(?s)Escolaridade\nNível\s+Curso\s+Situação\s+Tempo de formado\s+Importância\n(.+?)\nConhecimentos"
            }
            Field::SeniorityLevel => r"Níveis de atuação\n(.+?)\n",
            Field::FunctionalArea => r"Áreas de atuação\n(.+?)\n",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Compiled rules, indexed by `Field::slot`. A rule that fails to compile
/// stays `None` and only its own field falls back to the placeholder.
static CATALOGUE: LazyLock<Vec<Option<Regex>>> = LazyLock::new(|| {
    Field::ALL
        .iter()
        .map(|field| Regex::new(field.pattern()).ok())
        .collect()
});

static DISPLAY_TITLE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"Título da Vaga:\s*(.+?)\s+(?:Tipo de Requisição|$)").ok()
});

fn capture(re: Option<&Regex>, text: &str) -> Option<String> {
    let caps = re?.captures(text)?;
    let value = caps.get(1)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Extract a single field, or the placeholder when it is absent.
pub fn extract_field(text: &str, field: Field) -> String {
    capture(CATALOGUE[field.slot()].as_ref(), text).unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Address parts that make up [`Record::location`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub street: String,
    pub district: String,
    pub city: String,
    pub state: String,
}

impl Location {
    /// Parse each part independently.
    pub fn parse(text: &str) -> Self {
        Self {
            street: extract_field(text, Field::Street),
            district: extract_field(text, Field::District),
            city: extract_field(text, Field::City),
            state: extract_field(text, Field::State),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {} - {}",
            self.street, self.district, self.city, self.state
        )
    }
}

/// Parse the full overlay text into a record.
///
/// `status_label` and `assignee_name` are not part of the overlay and are left
/// as placeholders; see [`Record::with_row_meta`].
pub fn parse_record(text: &str) -> Record {
    Record {
        title: extract_field(text, Field::Title),
        company: extract_field(text, Field::Company),
        salary: extract_field(text, Field::Salary),
        schedule: extract_field(text, Field::Schedule),
        contract_type: extract_field(text, Field::ContractType),
        benefits: extract_field(text, Field::Benefits),
        activities_description: extract_field(text, Field::ActivitiesDescription),
        requirements: extract_field(text, Field::Requirements),
        education: extract_field(text, Field::Education),
        seniority_level: extract_field(text, Field::SeniorityLevel),
        functional_area: extract_field(text, Field::FunctionalArea),
        location: Location::parse(text).to_string(),
        notes: extract_field(text, Field::Notes),
        ..Record::default()
    }
}

/// Title currently displayed by the overlay, if its text carries one.
///
/// Accepts a title that runs to the end of the text, which happens while the
/// overlay is still rendering.
pub fn parse_display_title(text: &str) -> Option<String> {
    capture(DISPLAY_TITLE.as_ref(), text)
}

//! Fixed-template text rendering of records.

use crate::Record;

const HEADING: &str = "RESUMO DA VAGA";

fn rule(len: usize) -> String {
    "━".repeat(len)
}

/// Render one record as a labelled summary block.
pub fn render(record: &Record) -> String {
    let sep = rule(9);
    format!(
        "{sep}{HEADING}{sep}\n\
Cargo: {}\n\
Empresa: {}\n\
Status: {}\n\
Salário: {}\n\
Jornada: {}\n\
Tipo de contrato: {}\n\
Benefícios: {}\n\
\n\
Descrição das atividades:\n\
{}\n\
\n\
Experiências e qualificações:\n\
{}\n\
\n\
Escolaridade: {}\n\
Nível de atuação: {}\n\
Área de atuação: {}\n\
Local: {}\n\
Observações: {}\n\
{sep}",
        record.title,
        record.company,
        record.status_label,
        record.salary,
        record.schedule,
        record.contract_type,
        record.benefits,
        record.activities_description,
        record.requirements,
        record.education,
        record.seniority_level,
        record.functional_area,
        record.location,
        record.notes,
    )
}

/// Render several records separated by a divider line.
pub fn render_all(records: &[Record]) -> String {
    let divider = format!("\n{}\n\n", "_".repeat(30));
    records
        .iter()
        .map(render)
        .collect::<Vec<_>>()
        .join(&divider)
}

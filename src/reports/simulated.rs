//! Dados simulados de negócios
//!
//! Usados quando não há conexão ou o Bitrix24 não respondeu. A semente é fixa
//! para que o mesmo pedido produza sempre os mesmos números.

use super::PendingFields;
use bitrix::Table;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const CATEGORIES: &[(&str, u32)] = &[("0", 1), ("2", 1)];

const STAGES: &[(&str, u32)] = &[("C2:PREPARATION", 1), ("C2:NEW", 1), ("C0:NEW", 1)];

const PENDENCIAS: &[(&str, u32)] = &[
    ("", 50),
    ("Pendência documento", 15),
    ("Pendência pagamento", 15),
    ("Pendência contrato", 10),
    ("Pendência assinatura", 10),
];

const DATAS_MARCADAS: &[(&str, u32)] = &[
    ("", 70),
    ("2023-05-10 10:00", 10),
    ("2023-05-15 14:30", 10),
    ("2023-05-20 09:15", 10),
];

/// Gera `rows` negócios com as mesmas colunas de uma exportação real
pub fn generate(rows: usize, seed: u64, fields: &PendingFields) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut table = Table::with_columns([
        "ID",
        "TITLE",
        "CATEGORY_ID",
        "STAGE_ID",
        fields.pendencias.as_str(),
        fields.data_marcada.as_str(),
    ]);

    for i in 1..=rows {
        table.push_row(vec![
            Some(i.to_string()),
            Some(format!("Negócio {}", i)),
            Some(pick(&mut rng, CATEGORIES).to_string()),
            Some(pick(&mut rng, STAGES).to_string()),
            Some(pick(&mut rng, PENDENCIAS).to_string()),
            Some(pick(&mut rng, DATAS_MARCADAS).to_string()),
        ]);
    }

    table
}

fn pick<'a>(rng: &mut StdRng, options: &[(&'a str, u32)]) -> &'a str {
    options
        .choose_weighted(rng, |(_, weight)| *weight)
        .map(|(value, _)| *value)
        .unwrap_or_default()
}

//! Tabela normalizada
//!
//! Todas as respostas do Bitrix24 terminam aqui: colunas nomeadas e linhas
//! posicionais, cada célula `string | null`. As operações são puras e
//! devolvem uma nova tabela; a original nunca é alterada.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Valor de uma célula (`None` = null)
pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Visão de uma linha com acesso por nome de coluna
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    cells: &'a [Cell],
}

impl<'a> Row<'a> {
    /// Valor da coluna; `None` se a coluna não existe ou a célula é null
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.cells.get(idx)?.as_deref()
    }

    /// Verdadeiro quando a célula existe e não é vazia após trim
    pub fn is_filled(&self, column: &str) -> bool {
        self.get(column).map_or(false, |v| !v.trim().is_empty())
    }

    pub fn cells(&self) -> &'a [Cell] {
        self.cells
    }
}

impl Table {
    /// Tabela sem linhas com o conjunto de colunas informado
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Adiciona uma linha alinhada às colunas
    ///
    /// Linhas curtas recebem null nas posições finais; células excedentes são descartadas.
    pub fn push_row(&mut self, mut cells: Vec<Cell>) {
        cells.resize(self.columns.len(), None);
        self.rows.push(cells);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(move |cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    pub fn row(&self, idx: usize) -> Option<Row<'_>> {
        self.rows.get(idx).map(|cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    /// Valores de uma coluna, na ordem das linhas
    pub fn column_values<'a>(&'a self, column: &str) -> Vec<Option<&'a str>> {
        match self.columns.iter().position(|c| c == column) {
            Some(idx) => self.rows.iter().map(|r| r[idx].as_deref()).collect(),
            None => Vec::new(),
        }
    }

    /// Mantém apenas as colunas informadas que existem, na ordem pedida
    pub fn select(&self, columns: &[&str]) -> Table {
        let picked: Vec<(usize, &str)> = columns
            .iter()
            .filter_map(|name| {
                self.columns
                    .iter()
                    .position(|c| c == name)
                    .map(|idx| (idx, *name))
            })
            .collect();

        Table {
            columns: picked.iter().map(|(_, name)| name.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| picked.iter().map(|(idx, _)| row[*idx].clone()).collect())
                .collect(),
        }
    }

    /// Garante a presença da coluna, preenchendo com `default` quando ausente
    ///
    /// Retorna `true` se a coluna precisou ser criada.
    pub fn ensure_column(&mut self, column: &str, default: &str) -> bool {
        if self.has_column(column) {
            return false;
        }
        self.columns.push(column.to_string());
        for row in &mut self.rows {
            row.push(Some(default.to_string()));
        }
        true
    }

    /// Subconjunto das linhas que satisfazem o predicado
    pub fn filter<F>(&self, predicate: F) -> Table
    where
        F: Fn(&Row<'_>) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows()
                .filter(|row| predicate(row))
                .map(|row| row.cells.to_vec())
                .collect(),
        }
    }

    /// Renomeia colunas; nomes sem entrada no mapeamento permanecem
    pub fn rename<F>(&self, rename: F) -> Table
    where
        F: Fn(&str) -> Option<String>,
    {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| rename(c).unwrap_or_else(|| c.clone()))
                .collect(),
            rows: self.rows.clone(),
        }
    }

    /// Inner join por igualdade de `left_key` (self) e `right_key` (other)
    ///
    /// Colunas do resultado: todas as da esquerda seguidas das da direita que
    /// ainda não existem na esquerda. Chaves null nunca casam. Se a chave não
    /// existir em um dos lados o resultado é vazio.
    pub fn inner_join(&self, other: &Table, left_key: &str, right_key: &str) -> Table {
        let right_extra: Vec<usize> = other
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !self.has_column(c))
            .map(|(idx, _)| idx)
            .collect();

        let mut columns = self.columns.clone();
        columns.extend(right_extra.iter().map(|idx| other.columns[*idx].clone()));

        let (Some(left_idx), Some(right_idx)) = (
            self.columns.iter().position(|c| c == left_key),
            other.columns.iter().position(|c| c == right_key),
        ) else {
            return Table { columns, rows: Vec::new() };
        };

        let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
        for (pos, row) in other.rows.iter().enumerate() {
            if let Some(key) = row[right_idx].as_deref() {
                index.entry(key).or_default().push(pos);
            }
        }

        let mut rows = Vec::new();
        for left in &self.rows {
            let Some(key) = left[left_idx].as_deref() else {
                continue;
            };
            let Some(matches) = index.get(key) else {
                continue;
            };
            for pos in matches {
                let right = &other.rows[*pos];
                let mut joined = left.clone();
                joined.extend(right_extra.iter().map(|idx| right[*idx].clone()));
                rows.push(joined);
            }
        }

        Table { columns, rows }
    }
}

use crate::models::{Provider, RawRow};
use crate::providers::Adapter;
use crate::sheet::{Sheet, Workbook};

/// Detection order. Generic stays last so it only catches what nothing else claims.
pub const ADAPTER_PRIORITY: &[Adapter] = &[Adapter::Samsung, Adapter::Kb, Adapter::Generic];

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub rows: Vec<RawRow>,
    pub provider: Provider,
    /// Name of the sheet the rows came from.
    pub sheet: Option<String>,
}

pub fn detect_adapter(sheet: &Sheet) -> Adapter {
    ADAPTER_PRIORITY
        .iter()
        .find(|a| a.detect(sheet))
        .copied()
        .unwrap_or(Adapter::Generic)
}

/// Parse every sheet and keep the one yielding the most rows.
///
/// An explicit `samsung`/`kb` hint is authoritative: its adapter runs on every
/// sheet and an empty result is returned as-is. Without a hint (or with
/// `other`) each sheet gets the first adapter that detects it.
pub fn parse_workbook(workbook: &Workbook, hint: Option<Provider>) -> ParseOutcome {
    let forced = hint
        .filter(|p| *p != Provider::Other)
        .map(Adapter::for_provider);

    let mut best = ParseOutcome {
        rows: Vec::new(),
        provider: forced.map_or(Provider::Other, |a| a.provider()),
        sheet: None,
    };
    for sheet in &workbook.sheets {
        let adapter = forced.unwrap_or_else(|| detect_adapter(sheet));
        let rows = adapter.parse(sheet);
        tracing::debug!(sheet = %sheet.name, adapter = ?adapter, rows = rows.len(), "scored sheet");
        if rows.len() > best.rows.len() {
            best = ParseOutcome {
                rows,
                provider: adapter.provider(),
                sheet: Some(sheet.name.clone()),
            };
        }
    }
    best
}

use chrono::Utc;
use clap::Args;
use scholarship_quota::error::AppError;
use scholarship_quota::workflows::distribution::{
    ItemResultView, MatrixDistributionEngine, QuotaMatrix, Ranking, RankingHeader, RankingId,
    RankingImporter, SubTypeCode,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::debug;

#[derive(Args, Debug)]
pub(crate) struct DistributeArgs {
    /// Ranking CSV (rank_position, application_id, status, sub_types, college_code, ...)
    #[arg(long)]
    pub(crate) ranking_csv: PathBuf,
    /// Quota matrix JSON keyed by sub-type, then college
    #[arg(long)]
    pub(crate) quotas_json: PathBuf,
    /// Sub-type priority, highest first (comma separated)
    #[arg(long, value_delimiter = ',', required = true)]
    pub(crate) priority: Vec<String>,
    /// Identifier reported in the summary
    #[arg(long, default_value = "offline")]
    pub(crate) ranking_id: String,
    /// Scholarship type recorded on the imported ranking
    #[arg(long, default_value = "unspecified")]
    pub(crate) scholarship_type: String,
    /// Academic year recorded on the imported ranking
    #[arg(long, default_value_t = 0)]
    pub(crate) academic_year: i32,
    /// Include per-item results alongside the summary
    #[arg(long)]
    pub(crate) list_items: bool,
}

pub(crate) fn run_distribute(args: DistributeArgs) -> Result<(), AppError> {
    let DistributeArgs {
        ranking_csv,
        quotas_json,
        priority,
        ranking_id,
        scholarship_type,
        academic_year,
        list_items,
    } = args;

    let ranking = RankingImporter::from_path(
        &ranking_csv,
        RankingHeader {
            id: RankingId::new(ranking_id),
            scholarship_type,
            academic_year,
            semester: None,
        },
    )?;
    let raw = std::fs::read_to_string(&quotas_json)?;
    let matrix: QuotaMatrix = serde_json::from_str(&raw)?;
    debug!(
        items = ranking.items.len(),
        sub_types = matrix.sub_types().count(),
        "offline inputs loaded"
    );

    let report = distribute_offline(ranking, &matrix, &parse_priority(&priority), list_items);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn parse_priority(raw: &[String]) -> Vec<SubTypeCode> {
    raw.iter()
        .map(|code| code.trim())
        .filter(|code| !code.is_empty())
        .map(SubTypeCode::new)
        .collect()
}

/// Runs the engine without any storage and renders the summary, optionally with item results.
pub(crate) fn distribute_offline(
    mut ranking: Ranking,
    matrix: &QuotaMatrix,
    priority: &[SubTypeCode],
    list_items: bool,
) -> Value {
    ranking.sort_items();
    let engine = MatrixDistributionEngine::default();
    let mut outcome = engine.distribute(&ranking.items, matrix, priority, &[]);
    outcome.summary.ranking_id = Some(ranking.id.clone());
    ranking.apply_outcome(&outcome, Utc::now());

    if !list_items {
        return json!(outcome.summary);
    }

    let items: Vec<ItemResultView> = ranking.items.iter().map(ItemResultView::from_item).collect();
    json!({
        "distributed_at": ranking.distribution_executed_at,
        "summary": outcome.summary,
        "items": items,
    })
}

//! Output formatting for search reports, digests and batch summaries
//! (table, JSON, markdown, CSV).

use crate::aggregate::{self, Digest, LocalOption};
use crate::batch::BatchSummaryRow;
use crate::config::OutputFormat;
use crate::models::ComparisonRow;
use crate::pricing::{describe, PriceConverter};
use crate::search::SearchReport;
use crate::sources::AdapterRegistry;
use serde::Serialize;

/// Per-source bookkeeping shown under a report.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub kind: Option<String>,
    pub rows: usize,
    pub rejected: usize,
    pub filtered: usize,
    pub error: Option<String>,
}

/// Everything a report renders: the ranked views plus source bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub query: String,
    pub status: Option<String>,
    pub cheapest: Vec<ComparisonRow>,
    pub local: Vec<LocalOption>,
    /// Cheapest first, at most `max_rows`
    pub listings: Vec<ComparisonRow>,
    pub total_listings: usize,
    pub sources: Vec<SourceSummary>,
}

impl ReportView {
    pub fn build(report: &SearchReport, converter: &PriceConverter, max_rows: usize) -> Self {
        let rows = report.rows();
        let mut listings = aggregate::by_total(&rows);
        listings.truncate(max_rows);

        Self {
            query: report.query.to_string(),
            status: report.status_line(),
            cheapest: aggregate::cheapest_per_group(&rows),
            local: aggregate::local_summary(&rows, converter),
            listings,
            total_listings: rows.len(),
            sources: report
                .outcomes
                .iter()
                .map(|o| SourceSummary {
                    source: o.source.to_string(),
                    kind: o.kind.map(|k| k.to_string()),
                    rows: o.rows.len(),
                    rejected: o.rejected,
                    filtered: o.filtered,
                    error: o.error.as_ref().map(|e| e.to_string()),
                })
                .collect(),
        }
    }
}

const TITLE_WIDTH: usize = 50;

/// Formats results for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a full search report.
    pub fn format_report(&self, view: &ReportView) -> String {
        match self.format {
            OutputFormat::Json => Self::json(view, "{}"),
            OutputFormat::Table => self.table_report(view),
            OutputFormat::Markdown => self.markdown_report(view),
            OutputFormat::Csv => self.csv_rows(&view.listings),
        }
    }

    /// Formats priced rows on their own.
    pub fn format_rows(&self, rows: &[ComparisonRow]) -> String {
        if rows.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => Self::csv_header().to_string(),
                _ => "No listings found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => Self::json(rows, "[]"),
            OutputFormat::Table => self.table_rows(rows).join("\n"),
            OutputFormat::Markdown => self.markdown_rows(rows).join("\n"),
            OutputFormat::Csv => self.csv_rows(rows),
        }
    }

    pub fn format_digest(&self, digest: &Digest) -> String {
        match self.format {
            OutputFormat::Json => Self::json(digest, "{}"),
            OutputFormat::Table => digest.to_string(),
            OutputFormat::Markdown => digest
                .lines
                .iter()
                .map(|l| format!("- **{}:** {}", l.label, l.summary.as_deref().unwrap_or(aggregate::EMPTY_DIGEST)))
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Csv => {
                let mut lines = vec!["source,summary".to_string()];
                for line in &digest.lines {
                    lines.push(format!(
                        "{},{}",
                        line.label,
                        Self::csv_escape(line.summary.as_deref().unwrap_or_default())
                    ));
                }
                lines.join("\n")
            }
        }
    }

    pub fn format_batch(&self, rows: &[BatchSummaryRow]) -> String {
        let amount = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_default();

        match self.format {
            OutputFormat::Json => Self::json(rows, "[]"),
            OutputFormat::Table => {
                let mut lines = vec![
                    format!("{:<40}  {:<14}  {:>5}  {:>9}  {:>9}  {}", "Query", "Source", "Rows", "Min", "Max", "Status"),
                    format!("{:-<40}  {:-<14}  {:->5}  {:->9}  {:->9}  {:-<10}", "", "", "", "", "", ""),
                ];
                for row in rows {
                    lines.push(format!(
                        "{:<40}  {:<14}  {:>5}  {:>9}  {:>9}  {}",
                        truncate(&row.query, 40),
                        row.source.as_str(),
                        row.count,
                        amount(row.min_total),
                        amount(row.max_total),
                        row.status
                    ));
                }
                lines.join("\n")
            }
            OutputFormat::Markdown => {
                let mut lines = vec![
                    "| Query | Source | Rows | Min | Max | Status |".to_string(),
                    "|-------|--------|------|-----|-----|--------|".to_string(),
                ];
                for row in rows {
                    lines.push(format!(
                        "| {} | {} | {} | {} | {} | {} |",
                        row.query,
                        row.source,
                        row.count,
                        amount(row.min_total),
                        amount(row.max_total),
                        row.status
                    ));
                }
                lines.join("\n")
            }
            OutputFormat::Csv => {
                let mut lines = vec!["query,source,rows,min_total,max_total,status".to_string()];
                for row in rows {
                    lines.push(format!(
                        "{},{},{},{},{},{}",
                        Self::csv_escape(&row.query),
                        row.source,
                        row.count,
                        row.min_total.map(|v| v.to_string()).unwrap_or_default(),
                        row.max_total.map(|v| v.to_string()).unwrap_or_default(),
                        Self::csv_escape(&row.status)
                    ));
                }
                lines.join("\n")
            }
        }
    }

    /// Lists the registered sources.
    pub fn format_sources(&self, registry: &AdapterRegistry) -> String {
        #[derive(Serialize)]
        struct SourceInfo<'a> {
            id: &'a str,
            kind: String,
            url: &'a str,
        }

        let infos: Vec<SourceInfo> = registry
            .all()
            .map(|a| SourceInfo { id: a.id().as_str(), kind: a.kind().to_string(), url: a.base_url() })
            .collect();

        match self.format {
            OutputFormat::Json => Self::json(&infos, "[]"),
            OutputFormat::Table => {
                let mut lines = vec![
                    format!("{:<14} {:<16} {}", "Source", "Kind", "URL"),
                    format!("{:-<14} {:-<16} {:-<30}", "", "", ""),
                ];
                lines.extend(infos.iter().map(|i| format!("{:<14} {:<16} {}", i.id, i.kind, i.url)));
                lines.join("\n")
            }
            OutputFormat::Markdown => {
                let mut lines = vec!["| Source | Kind | URL |".to_string(), "|--------|------|-----|".to_string()];
                lines.extend(infos.iter().map(|i| format!("| {} | {} | {} |", i.id, i.kind, i.url)));
                lines.join("\n")
            }
            OutputFormat::Csv => {
                let mut lines = vec!["source,kind,url".to_string()];
                lines.extend(infos.iter().map(|i| format!("{},{},{}", i.id, i.kind, i.url)));
                lines.join("\n")
            }
        }
    }

    // JSON formatting

    fn json<T: Serialize + ?Sized>(value: &T, fallback: &str) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| fallback.to_string())
    }

    // Table formatting

    fn table_report(&self, view: &ReportView) -> String {
        let mut lines = vec![format!("Results for: {}", view.query), String::new()];

        if !view.cheapest.is_empty() {
            lines.push("Cheapest per format and condition".to_string());
            lines.extend(self.table_rows(&view.cheapest));
            lines.push(String::new());
        }

        if !view.local.is_empty() {
            lines.push("Local sellers".to_string());
            for option in &view.local {
                let price = option.row.price_home.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "N/A".to_string());
                lines.push(format!("  {:<20} {:>9}  {}", option.name, price, truncate(&option.row.listing.title, TITLE_WIDTH)));
            }
            lines.push(String::new());
        }

        if !view.listings.is_empty() {
            lines.push(format!("All listings ({} of {})", view.listings.len(), view.total_listings));
            lines.extend(self.table_rows(&view.listings));
            lines.push(String::new());
        }

        for source in view.sources.iter().filter(|s| s.rejected > 0 || s.filtered > 0) {
            lines.push(format!(
                "{}: {} rejected, {} not relevant",
                source.source, source.rejected, source.filtered
            ));
        }

        if let Some(status) = &view.status {
            lines.push(status.clone());
        }

        lines.join("\n").trim_end().to_string()
    }

    fn table_rows(&self, rows: &[ComparisonRow]) -> Vec<String> {
        let mut lines = vec![
            format!(
                "{:>3}  {:<13}  {:<9}  {:<12}  {:>9}  {:<16}  {:<20}  {}",
                "#", "Source", "Format", "Condition", "Total", "Price+Ship", "Seller", "Title"
            ),
            format!(
                "{:->3}  {:-<13}  {:-<9}  {:-<12}  {:->9}  {:-<16}  {:-<20}  {:-<width$}",
                "", "", "", "", "", "", "", "", width = TITLE_WIDTH
            ),
        ];

        for (i, row) in rows.iter().enumerate() {
            let listing = &row.listing;
            let total = row.total_home.map(|t| format!("{:.2}", t)).unwrap_or_else(|| "N/A".to_string());
            let mut seller = listing.seller_name.clone().unwrap_or_default();
            if row.is_local {
                seller = format!("* {}", seller);
            }

            lines.push(format!(
                "{:>3}  {:<13}  {:<9}  {:<12}  {:>9}  {:<16}  {:<20}  {}",
                row.rank.unwrap_or(i + 1),
                listing.source.as_str(),
                listing.format.as_str(),
                truncate(&listing.condition, 12),
                total,
                describe(row).unwrap_or_default(),
                truncate(&seller, 20),
                truncate(&listing.title, TITLE_WIDTH)
            ));
        }

        lines
    }

    // Markdown formatting

    fn markdown_report(&self, view: &ReportView) -> String {
        let mut lines = vec![format!("## {}", view.query), String::new()];

        if !view.cheapest.is_empty() {
            lines.push("### Cheapest per format and condition".to_string());
            lines.push(String::new());
            lines.extend(self.markdown_rows(&view.cheapest));
            lines.push(String::new());
        }

        if !view.local.is_empty() {
            lines.push("### Local sellers".to_string());
            lines.push(String::new());
            for option in &view.local {
                let price = option.row.price_home.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "N/A".to_string());
                lines.push(format!("- **{}:** {} ({})", option.name, price, option.row.listing.title));
            }
            lines.push(String::new());
        }

        if !view.listings.is_empty() {
            lines.push("### All listings".to_string());
            lines.push(String::new());
            lines.extend(self.markdown_rows(&view.listings));
            lines.push(String::new());
        }

        if let Some(status) = &view.status {
            lines.push(format!("*{}*", status));
        }

        lines.join("\n").trim_end().to_string()
    }

    fn markdown_rows(&self, rows: &[ComparisonRow]) -> Vec<String> {
        let mut lines = vec![
            "| # | Source | Format | Condition | Total | Price+Ship | Seller | Title |".to_string(),
            "|---|--------|--------|-----------|-------|------------|--------|-------|".to_string(),
        ];

        for (i, row) in rows.iter().enumerate() {
            let listing = &row.listing;
            let total = row.total_home.map(|t| format!("{:.2}", t)).unwrap_or_else(|| "N/A".to_string());
            let seller = match (&listing.seller_name, row.is_local) {
                (Some(name), true) => format!("{} (local)", name),
                (Some(name), false) => name.clone(),
                (None, _) => String::new(),
            };
            let title = match listing.extra("url") {
                Some(url) => format!("[{}]({})", truncate(&listing.title, 40), url),
                None => truncate(&listing.title, 40),
            };

            lines.push(format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |",
                row.rank.unwrap_or(i + 1),
                listing.source,
                listing.format,
                listing.condition,
                total,
                describe(row).unwrap_or_default(),
                seller,
                title
            ));
        }

        lines
    }

    // CSV formatting

    fn csv_header() -> &'static str {
        "rank,source,format,condition,title,author,price,currency,shipping,price_home,shipping_home,total_home,local,seller,url"
    }

    fn csv_rows(&self, rows: &[ComparisonRow]) -> String {
        let number = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        let mut lines = vec![Self::csv_header().to_string()];

        for (i, row) in rows.iter().enumerate() {
            let listing = &row.listing;
            lines.push(format!(
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                row.rank.unwrap_or(i + 1),
                listing.source,
                listing.format,
                Self::csv_escape(&listing.condition),
                Self::csv_escape(&listing.title),
                Self::csv_escape(&listing.author),
                number(listing.price.as_ref().map(|p| p.amount)),
                listing.price.as_ref().map(|p| p.currency.as_str()).unwrap_or_default(),
                number(listing.shipping),
                number(row.price_home),
                number(row.shipping_home),
                number(row.total_home),
                row.is_local,
                Self::csv_escape(listing.seller_name.as_deref().unwrap_or_default()),
                listing.extra("url").unwrap_or_default()
            ));
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

/// Shortens to `width` characters, marking the cut with `...`.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

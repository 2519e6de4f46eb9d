use anyhow::Result;
use invoice_dispatch::entity_matcher::{DirectoryEntry, DirectoryMatch, EntityCluster};
use invoice_dispatch::{RunEntryRow, RunRow, StatusEntry};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "csv" => Self::Csv,
            "markdown" | "md" => Self::Markdown,
            _ => Self::Table,
        }
    }
}

/// Normalization result for one input name.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NormalizedName {
    pub input: String,
    pub canonical: String,
    pub resolution_key: String,
}

#[derive(Tabled, Serialize)]
struct NormalizeRow {
    #[tabled(rename = "Input")]
    #[serde(rename = "Input")]
    input: String,
    #[tabled(rename = "Canonical")]
    #[serde(rename = "Canonical")]
    canonical: String,
    #[tabled(rename = "Resolution Key")]
    #[serde(rename = "Resolution Key")]
    resolution_key: String,
}

#[derive(Tabled, Serialize)]
struct ClusterRow {
    #[tabled(rename = "Key")]
    #[serde(rename = "Key")]
    key: String,
    #[tabled(rename = "Display Name")]
    #[serde(rename = "Display Name")]
    display_name: String,
    #[tabled(rename = "Items")]
    #[serde(rename = "Items")]
    items: usize,
    #[tabled(rename = "Labels")]
    #[serde(rename = "Labels")]
    labels: String,
}

#[derive(Tabled, Serialize)]
struct MatchRow {
    #[tabled(rename = "Query")]
    #[serde(rename = "Query")]
    query: String,
    #[tabled(rename = "Match")]
    #[serde(rename = "Match")]
    matched: String,
    #[tabled(rename = "Layer")]
    #[serde(rename = "Layer")]
    layer: String,
    #[tabled(rename = "Score")]
    #[serde(rename = "Score")]
    score: String,
    #[tabled(rename = "To")]
    #[serde(rename = "To")]
    to: String,
    #[tabled(rename = "Cc")]
    #[serde(rename = "Cc")]
    cc: String,
}

#[derive(Tabled, Serialize)]
struct DirectoryRow {
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "To")]
    #[serde(rename = "To")]
    to: String,
    #[tabled(rename = "Cc")]
    #[serde(rename = "Cc")]
    cc: String,
}

#[derive(Tabled, Serialize)]
struct StatusRow {
    #[tabled(rename = "Entity")]
    #[serde(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Documents")]
    #[serde(rename = "Documents")]
    documents: usize,
    #[tabled(rename = "Matched")]
    #[serde(rename = "Matched")]
    matched: String,
    #[tabled(rename = "Layer")]
    #[serde(rename = "Layer")]
    layer: String,
    #[tabled(rename = "To")]
    #[serde(rename = "To")]
    to: String,
    #[tabled(rename = "Status")]
    #[serde(rename = "Status")]
    status: String,
}

#[derive(Tabled, Serialize)]
struct HistoryRow {
    #[tabled(rename = "Run")]
    #[serde(rename = "Run")]
    run_id: i64,
    #[tabled(rename = "Generated")]
    #[serde(rename = "Generated")]
    generated_at: String,
    #[tabled(rename = "Dry Run")]
    #[serde(rename = "Dry Run")]
    dry_run: String,
    #[tabled(rename = "Total")]
    #[serde(rename = "Total")]
    total: i64,
    #[tabled(rename = "Sent")]
    #[serde(rename = "Sent")]
    sent: i64,
    #[tabled(rename = "Errors")]
    #[serde(rename = "Errors")]
    errors: i64,
    #[tabled(rename = "Report")]
    #[serde(rename = "Report")]
    report: String,
}

#[derive(Tabled, Serialize)]
struct HistoryEntryRow {
    #[tabled(rename = "#")]
    #[serde(rename = "#")]
    position: i64,
    #[tabled(rename = "Entity")]
    #[serde(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Documents")]
    #[serde(rename = "Documents")]
    documents: usize,
    #[tabled(rename = "Matched")]
    #[serde(rename = "Matched")]
    matched: String,
    #[tabled(rename = "Layer")]
    #[serde(rename = "Layer")]
    layer: String,
    #[tabled(rename = "Status")]
    #[serde(rename = "Status")]
    status: String,
}

// -- Row builders --

fn join<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    values.into_iter().map(String::as_str).collect::<Vec<_>>().join("; ")
}

fn build_normalize_rows(names: &[NormalizedName]) -> Vec<NormalizeRow> {
    names
        .iter()
        .map(|n| NormalizeRow {
            input: n.input.clone(),
            canonical: n.canonical.clone(),
            resolution_key: n.resolution_key.clone(),
        })
        .collect()
}

fn build_cluster_rows<T: AsRef<str>>(clusters: &[EntityCluster<T>]) -> Vec<ClusterRow> {
    clusters
        .iter()
        .map(|c| ClusterRow {
            key: c.key.clone(),
            display_name: c.display_name.clone(),
            items: c.members.len(),
            labels: c
                .members
                .iter()
                .map(|m| m.as_ref())
                .collect::<Vec<_>>()
                .join("; "),
        })
        .collect()
}

fn build_match_rows(query: &str, m: &DirectoryMatch<'_>) -> Vec<MatchRow> {
    vec![MatchRow {
        query: query.to_string(),
        matched: m.entry.name.clone(),
        layer: m.match_type.to_string(),
        score: m.score.map(|s| s.to_string()).unwrap_or_default(),
        to: join(&m.entry.to),
        cc: join(&m.entry.cc),
    }]
}

fn build_directory_rows(entries: &[DirectoryEntry]) -> Vec<DirectoryRow> {
    entries
        .iter()
        .map(|e| DirectoryRow {
            name: e.name.clone(),
            to: join(&e.to),
            cc: join(&e.cc),
        })
        .collect()
}

fn build_status_rows(entries: &[StatusEntry]) -> Vec<StatusRow> {
    entries
        .iter()
        .map(|e| StatusRow {
            entity: e.entity.clone(),
            documents: e.documents.len(),
            matched: e.matched_name.clone().unwrap_or_default(),
            layer: e.match_type.map(|m| m.to_string()).unwrap_or_default(),
            to: join(&e.to),
            status: e.status.to_string(),
        })
        .collect()
}

fn build_history_rows(runs: &[RunRow]) -> Vec<HistoryRow> {
    runs.iter()
        .map(|r| HistoryRow {
            run_id: r.run_id,
            generated_at: r.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            dry_run: if r.dry_run { "yes" } else { "no" }.to_string(),
            total: r.total,
            sent: r.sent,
            errors: r.errors,
            report: r.report_path.clone().unwrap_or_default(),
        })
        .collect()
}

fn build_history_entry_rows(entries: &[RunEntryRow]) -> Vec<HistoryEntryRow> {
    entries
        .iter()
        .map(|e| HistoryEntryRow {
            position: e.position + 1,
            entity: e.entity.clone(),
            documents: e.documents.len(),
            matched: e.matched_name.clone().unwrap_or_default(),
            layer: e.match_type.clone().unwrap_or_default(),
            status: match &e.reason {
                Some(reason) => format!("{}: {}", e.status, reason),
                None => e.status.clone(),
            },
        })
        .collect()
}

// -- Generic printers --

fn print_rows<R: Tabled + Serialize>(rows: Vec<R>, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Markdown => {
            let mut table = Table::new(rows);
            table.with(Style::markdown());
            println!("{}", table);
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        _ => println!("{}", Table::new(rows)),
    }
    Ok(())
}

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

// -- Per-command output --

pub fn print_normalized(names: &[NormalizedName], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(&names);
            Ok(())
        }
        _ => print_rows(build_normalize_rows(names), format),
    }
}

pub fn print_clusters<T: AsRef<str> + Serialize>(clusters: &[EntityCluster<T>], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(&clusters);
            Ok(())
        }
        _ => print_rows(build_cluster_rows(clusters), format),
    }
}

pub fn print_match(query: &str, m: &DirectoryMatch<'_>, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(m);
            Ok(())
        }
        _ => print_rows(build_match_rows(query, m), format),
    }
}

pub fn print_directory(entries: &[DirectoryEntry], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(&entries);
            Ok(())
        }
        _ => print_rows(build_directory_rows(entries), format),
    }
}

pub fn print_status_entries(entries: &[StatusEntry], format: &OutputFormat) -> Result<()> {
    print_rows(build_status_rows(entries), format)
}

pub fn print_history(runs: &[RunRow], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(&runs);
            Ok(())
        }
        _ => print_rows(build_history_rows(runs), format),
    }
}

pub fn print_history_entries(entries: &[RunEntryRow], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(&entries);
            Ok(())
        }
        _ => print_rows(build_history_entry_rows(entries), format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoice_dispatch::entity_matcher::{
        load_default_rules, resolve, ContactDirectory, EntityClusterer, MatchType,
    };
    use invoice_dispatch::{DispatchStatus, StatusEntry};

    fn directory() -> ContactDirectory {
        let mut dir = ContactDirectory::new();
        dir.add_row("Hospital Central", "b@central.com; a@central.com", &["cc@central.com"]);
        dir.add_row("Santa Casa", "sc@example.com", &[]);
        dir
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("CSV"), OutputFormat::Csv);
        assert_eq!(OutputFormat::parse("md"), OutputFormat::Markdown);
        assert_eq!(OutputFormat::parse("markdown"), OutputFormat::Markdown);
        assert_eq!(OutputFormat::parse("anything"), OutputFormat::Table);
    }

    #[test]
    fn test_build_cluster_rows() {
        let rules = load_default_rules().unwrap();
        let clusterer = EntityClusterer::new(&rules).unwrap();
        let clusters = clusterer.group(vec![
            "Boleto_Hospital_Central_Itau_20240101",
            "Boleto_Hospital_Central_Ltda_Bradesco_20240102",
        ]);
        let rows = build_cluster_rows(&clusters);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "HOSPITAL CENTRAL");
        assert_eq!(rows[0].display_name, "Hospital Central Ltda");
        assert_eq!(rows[0].items, 2);
        assert_eq!(
            rows[0].labels,
            "Boleto_Hospital_Central_Itau_20240101; Boleto_Hospital_Central_Ltda_Bradesco_20240102"
        );
    }

    #[test]
    fn test_build_cluster_rows_empty() {
        let rows = build_cluster_rows::<&str>(&[]);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_build_match_rows() {
        let rules = load_default_rules().unwrap();
        let dir = directory();
        let m = resolve("Hospital Central Ltda", &dir, &rules).unwrap();
        let rows = build_match_rows("Hospital Central Ltda", &m);
        assert_eq!(rows[0].matched, "Hospital Central");
        assert_eq!(rows[0].layer, "containment");
        assert_eq!(rows[0].score, "");
        assert_eq!(rows[0].to, "a@central.com; b@central.com");
        assert_eq!(rows[0].cc, "cc@central.com");
    }

    #[test]
    fn test_build_directory_rows() {
        let dir = directory();
        let rows = build_directory_rows(dir.entries());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "Santa Casa");
        assert_eq!(rows[1].cc, "");
    }

    #[test]
    fn test_build_status_rows() {
        let entries = vec![StatusEntry {
            entity: "Hospital Central".to_string(),
            key: "HOSPITAL CENTRAL".to_string(),
            documents: vec!["a.pdf".to_string(), "b.pdf".to_string()],
            matched_name: Some("Hospital Central".to_string()),
            match_type: Some(MatchType::Exact),
            to: vec!["a@central.com".to_string()],
            cc: Vec::new(),
            status: DispatchStatus::failed("outbox full"),
        }];
        let rows = build_status_rows(&entries);
        assert_eq!(rows[0].documents, 2);
        assert_eq!(rows[0].layer, "exact");
        assert_eq!(rows[0].status, "Error - outbox full");
    }

    #[test]
    fn test_build_history_entry_rows() {
        let entries = vec![RunEntryRow {
            position: 0,
            entity: "Clinica Aurora".to_string(),
            entity_key: "CLINICA AURORA".to_string(),
            documents: vec!["c.pdf".to_string()],
            matched_name: None,
            match_type: None,
            recipients: Vec::new(),
            cc: Vec::new(),
            status: "failed".to_string(),
            reason: Some("disk full".to_string()),
        }];
        let rows = build_history_entry_rows(&entries);
        assert_eq!(rows[0].position, 1);
        assert_eq!(rows[0].matched, "");
        assert_eq!(rows[0].status, "failed: disk full");
    }

    #[test]
    fn test_build_normalize_rows() {
        let names = vec![NormalizedName {
            input: "Hospital São José Ltda".to_string(),
            canonical: "HOSPITAL SAO JOSE".to_string(),
            resolution_key: "SAO JOSE".to_string(),
        }];
        let rows = build_normalize_rows(&names);
        assert_eq!(rows[0].canonical, "HOSPITAL SAO JOSE");
        assert_eq!(rows[0].resolution_key, "SAO JOSE");
    }
}

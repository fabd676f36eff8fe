use tabled::{settings::Style, Table, Tabled};

use crate::relation::Relation;
use crate::report::{AuditReport, ContentNode};
use crate::scenario::StepOutcome;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        render(&self.rows)
    }
}

fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[derive(Tabled)]
struct RelationRow {
    #[tabled(rename = "Id")]
    id: i64,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Content")]
    parent: i64,
    #[tabled(rename = "Media")]
    child: i64,
}

pub fn relations_table(relations: &[Relation]) -> String {
    let rows: Vec<RelationRow> = relations
        .iter()
        .map(|r| RelationRow {
            id: r.id,
            kind: r.kind.to_string(),
            parent: r.parent_id,
            child: r.child_id,
        })
        .collect();
    render(&rows)
}

#[derive(Tabled)]
struct UsageRow {
    #[tabled(rename = "Id")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "State")]
    state: &'static str,
}

pub fn usage_table(nodes: &[ContentNode]) -> String {
    let rows: Vec<UsageRow> = nodes
        .iter()
        .map(|n| UsageRow {
            id: n.id,
            name: n.name.clone(),
            path: n.path_name.clone(),
            state: match (n.trashed, n.published) {
                (true, _) => "trashed",
                (false, true) => "published",
                (false, false) => "draft",
            },
        })
        .collect();
    render(&rows)
}

#[derive(Tabled)]
struct AuditRow {
    #[tabled(rename = "Problem")]
    problem: &'static str,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Related")]
    related: String,
}

pub fn audit_table(report: &AuditReport) -> String {
    let mut rows = Vec::new();
    for dup in &report.duplicate_mirrors {
        rows.push(AuditRow {
            problem: "several folders",
            subject: format!("content {}", dup.content_id),
            related: join_ids(&dup.folder_ids),
        });
    }
    for shared in &report.shared_folders {
        rows.push(AuditRow {
            problem: "shared folder",
            subject: format!("media {}", shared.folder_id),
            related: join_ids(&shared.content_ids),
        });
    }
    for orphan in &report.orphans {
        rows.push(AuditRow {
            problem: "missing endpoint",
            subject: format!("relation {} ({})", orphan.relation.id, orphan.relation.kind),
            related: format!("{} node missing", orphan.missing),
        });
    }
    render(&rows)
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Op")]
    op: &'static str,
    #[tabled(rename = "Nodes")]
    nodes: String,
}

pub fn steps_table(outcomes: &[StepOutcome]) -> String {
    let rows: Vec<StepRow> = outcomes
        .iter()
        .map(|o| StepRow {
            index: o.index + 1,
            op: o.op,
            nodes: join_ids(&o.nodes),
        })
        .collect();
    render(&rows)
}

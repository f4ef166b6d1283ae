//! Record kinds and their canonical field aliases.
//!
//! Alias order is significant: the resolver picks the first alias present in a database.

use serde::Serialize;

use crate::PropertyType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    /// Display title; never projected as blank.
    Title,
    Value,
}

/// Property assumed when the schema itself could not be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackProperty {
    pub name: &'static str,
    pub type_tag: &'static str,
}

impl FallbackProperty {
    pub fn property_type(&self) -> PropertyType {
        PropertyType::from_tag(self.type_tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalField {
    pub key: &'static str,
    pub aliases: &'static [&'static str],
    pub role: FieldRole,
    pub fallback: Option<FallbackProperty>,
}

impl CanonicalField {
    const fn value(key: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            key,
            aliases,
            role: FieldRole::Value,
            fallback: None,
        }
    }

    const fn title(aliases: &'static [&'static str], fallback_name: &'static str) -> Self {
        Self {
            key: "title",
            aliases,
            role: FieldRole::Title,
            fallback: Some(FallbackProperty {
                name: fallback_name,
                type_tag: "title",
            }),
        }
    }

    const fn or_assume(self, name: &'static str, type_tag: &'static str) -> Self {
        Self {
            fallback: Some(FallbackProperty { name, type_tag }),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordKind {
    /// Path segment under `/api`.
    pub slug: &'static str,
    /// Response key for list bodies.
    pub list_key: &'static str,
    /// Response key for create/update bodies.
    pub singular_key: &'static str,
    pub fields: &'static [CanonicalField],
    pub required: &'static [&'static str],
    /// Env-configured database used when a request omits `databaseId`.
    pub default_database_env: Option<&'static str>,
}

impl RecordKind {
    pub fn field(&self, key: &str) -> Option<&'static CanonicalField> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn title_field(&self) -> Option<&'static CanonicalField> {
        self.fields.iter().find(|f| f.role == FieldRole::Title)
    }
}

const TITLE: &[&str] = &["Title", "Name", "title", "name"];
const STATUS: &[&str] = &["Status", "Statut", "State", "status"];
const PRIORITY: &[&str] = &["Priority", "Priorité", "priority"];
const DESCRIPTION: &[&str] = &["Description", "Notes", "Details", "description"];
const CATEGORY: &[&str] = &["Category", "Type", "Catégorie"];
const TAGS: &[&str] = &["Tags", "Labels", "Étiquettes", "tags"];
const ASSIGNEE: &[&str] = &["Assignee", "Assignée", "Assigned To", "Owner"];
const UNIT: &[&str] = &["Unit", "Unité"];

const fn status() -> CanonicalField {
    CanonicalField::value("status", STATUS).or_assume("Status", "select")
}

const fn description() -> CanonicalField {
    CanonicalField::value("description", DESCRIPTION)
}

pub static TASKS: RecordKind = RecordKind {
    slug: "tasks",
    list_key: "tasks",
    singular_key: "task",
    fields: &[
        CanonicalField::title(&["Title", "Name", "Task", "Tâche", "title", "name"], "Name"),
        status(),
        CanonicalField::value("priority", PRIORITY),
        CanonicalField::value("dueDate", &["Due Date", "Due", "Deadline", "Échéance", "Date"])
            .or_assume("Date", "date"),
        CanonicalField::value("assignee", ASSIGNEE),
        CanonicalField::value("tags", TAGS),
        description(),
        CanonicalField::value("completed", &["Done", "Completed", "Terminé"]),
    ],
    required: &["title"],
    default_database_env: None,
};

pub static GOALS: RecordKind = RecordKind {
    slug: "goals",
    list_key: "goals",
    singular_key: "goal",
    fields: &[
        CanonicalField::title(TITLE, "Name"),
        status(),
        CanonicalField::value("target", &["Target", "Target Value", "Objectif"]),
        CanonicalField::value("current", &["Current", "Current Value", "Progress", "Actuel"]),
        CanonicalField::value("unit", UNIT),
        CanonicalField::value("deadline", &["Deadline", "Due Date", "Échéance", "Date"])
            .or_assume("Date", "date"),
        description(),
    ],
    required: &["title"],
    default_database_env: None,
};

pub static MILESTONES: RecordKind = RecordKind {
    slug: "milestones",
    list_key: "milestones",
    singular_key: "milestone",
    fields: &[
        CanonicalField::title(TITLE, "Name"),
        status(),
        CanonicalField::value("date", &["Date", "Due Date", "Target Date", "Échéance"])
            .or_assume("Date", "date"),
        CanonicalField::value("progress", &["Progress", "Completion", "Avancement"]),
        description(),
    ],
    required: &["title"],
    default_database_env: None,
};

pub static ESSENTIALS: RecordKind = RecordKind {
    slug: "essentials",
    list_key: "essentials",
    singular_key: "essential",
    fields: &[
        CanonicalField::title(&["Name", "Title", "name", "title"], "Name"),
        CanonicalField::value("category", CATEGORY),
        CanonicalField::value("priority", PRIORITY),
        CanonicalField::value("link", &["URL", "Link", "Lien", "url"]),
        CanonicalField::value("cost", &["Cost", "Price", "Prix"]),
        CanonicalField::value("notes", &["Notes", "Description"]),
    ],
    required: &["title"],
    default_database_env: None,
};

pub static FEEDBACK: RecordKind = RecordKind {
    slug: "feedback",
    list_key: "feedback",
    singular_key: "feedback",
    fields: &[
        CanonicalField::title(TITLE, "Title"),
        CanonicalField::value("feedback", &["Feedback", "Content", "Message", "Comment"]),
        CanonicalField::value("userName", &["User Name", "User", "Username", "Utilisateur"]),
        CanonicalField::value("email", &["Email", "E-mail"]),
        CanonicalField::value("rating", &["Rating", "Score"]),
        status(),
        CanonicalField::value("category", CATEGORY),
        CanonicalField::value("date", &["Date", "Submitted", "Submitted At"]).or_assume("Date", "date"),
    ],
    required: &["title", "feedback", "userName"],
    default_database_env: None,
};

pub static DOCUMENTS: RecordKind = RecordKind {
    slug: "documents",
    list_key: "documents",
    singular_key: "document",
    fields: &[
        CanonicalField::title(TITLE, "Name"),
        CanonicalField::value("link", &["URL", "Link", "Lien", "File"]),
        CanonicalField::value("type", &["Type", "Category", "Format"]),
        description(),
        CanonicalField::value("tags", TAGS),
        CanonicalField::value("date", &["Date", "Created", "Updated"]),
    ],
    required: &["title"],
    default_database_env: None,
};

pub static METRICS: RecordKind = RecordKind {
    slug: "metrics",
    list_key: "metrics",
    singular_key: "metric",
    fields: &[
        CanonicalField::title(&["Metric", "Name", "Title", "name", "title"], "Name"),
        CanonicalField::value("value", &["Value", "Valeur", "Amount"]),
        CanonicalField::value("target", &["Target", "Objectif"]),
        CanonicalField::value("unit", UNIT),
        CanonicalField::value("date", &["Date", "Period", "Période"]).or_assume("Date", "date"),
        CanonicalField::value("category", CATEGORY),
    ],
    required: &["title"],
    default_database_env: None,
};

pub static RECURRING_TASKS: RecordKind = RecordKind {
    slug: "recurring-tasks",
    list_key: "recurringTasks",
    singular_key: "recurringTask",
    fields: &[
        CanonicalField::title(&["Title", "Name", "Task", "Tâche", "title", "name"], "Name"),
        CanonicalField::value("frequency", &["Frequency", "Fréquence", "Recurrence", "Récurrence"]),
        status(),
        CanonicalField::value("assignee", ASSIGNEE),
        CanonicalField::value("nextDue", &["Next Due", "Next Date", "Due Date", "Date"]),
        CanonicalField::value("lastDone", &["Last Done", "Last Completed", "Dernière fois"]),
        CanonicalField::value("active", &["Active", "Enabled", "Actif"]),
    ],
    required: &["title"],
    default_database_env: None,
};

pub static SALES: RecordKind = RecordKind {
    slug: "sales",
    list_key: "sales",
    singular_key: "sale",
    fields: &[
        CanonicalField::title(&["Order", "Name", "Title", "name", "title"], "Name"),
        CanonicalField::value("amount", &["Amount", "Total", "Revenue", "Montant"]),
        CanonicalField::value("quantity", &["Quantity", "Qty", "Quantité"]),
        CanonicalField::value("product", &["Product", "Item", "Produit"]),
        CanonicalField::value("customer", &["Customer", "Client"]),
        CanonicalField::value("date", &["Date", "Order Date"]).or_assume("Date", "date"),
        CanonicalField::value("status", &["Financial Status", "Status", "Statut"]),
        CanonicalField::value("channel", &["Channel", "Source", "Canal"]),
    ],
    required: &["title"],
    default_database_env: None,
};

pub static PROJECTS: RecordKind = RecordKind {
    slug: "projects",
    list_key: "projects",
    singular_key: "project",
    fields: &[
        CanonicalField::title(TITLE, "Name"),
        status(),
        description(),
        CanonicalField::value("githubRepo", &["GitHub", "GitHub Repo", "Repository", "Repo"]),
        CanonicalField::value("driveFolder", &["Drive Folder", "Google Drive", "Drive"]),
        CanonicalField::value("startDate", &["Start Date", "Start", "Début"]),
        CanonicalField::value("endDate", &["End Date", "End", "Fin"]),
    ],
    required: &["title"],
    default_database_env: Some("NOTION_DATABASE_ID"),
};

pub static CATALOG: &[&RecordKind] = &[
    &TASKS,
    &GOALS,
    &MILESTONES,
    &ESSENTIALS,
    &FEEDBACK,
    &DOCUMENTS,
    &METRICS,
    &RECURRING_TASKS,
    &SALES,
    &PROJECTS,
];

pub fn record_kind(slug: &str) -> Option<&'static RecordKind> {
    CATALOG.iter().copied().find(|k| k.slug == slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::NormalizedRecord;

    #[test]
    fn every_kind_has_exactly_one_title_field() {
        for kind in CATALOG {
            let titles = kind
                .fields
                .iter()
                .filter(|f| f.role == FieldRole::Title)
                .count();
            assert_eq!(titles, 1, "{}", kind.slug);
        }
    }

    #[test]
    fn required_fields_exist_in_kind() {
        for kind in CATALOG {
            for key in kind.required {
                assert!(kind.field(key).is_some(), "{}: {key}", kind.slug);
            }
        }
    }

    #[test]
    fn slugs_and_field_keys_are_unique() {
        let slugs: HashSet<_> = CATALOG.iter().map(|k| k.slug).collect();
        assert_eq!(slugs.len(), CATALOG.len());
        for kind in CATALOG {
            let keys: HashSet<_> = kind.fields.iter().map(|f| f.key).collect();
            assert_eq!(keys.len(), kind.fields.len(), "{}", kind.slug);
        }
    }

    #[test]
    fn field_keys_never_shadow_the_page_envelope() {
        for kind in CATALOG {
            for field in kind.fields {
                assert!(
                    !NormalizedRecord::ENVELOPE_KEYS.contains(&field.key),
                    "{}: `{}` collides with the envelope",
                    kind.slug,
                    field.key
                );
            }
        }
        assert!(ESSENTIALS.field("link").is_some());
        assert!(DOCUMENTS.field("link").is_some());
    }

    #[test]
    fn feedback_requires_author_and_body() {
        assert_eq!(FEEDBACK.required, &["title", "feedback", "userName"]);
    }

    #[test]
    fn lookup_by_slug() {
        assert_eq!(record_kind("recurring-tasks").map(|k| k.list_key), Some("recurringTasks"));
        assert!(record_kind("unknown").is_none());
        let status = TASKS.field("status").and_then(|f| f.fallback).unwrap();
        assert_eq!(status.property_type(), PropertyType::Select);
    }
}

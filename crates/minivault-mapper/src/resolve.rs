use async_trait::async_trait;
use minivault_core::{normalize_id, CanonicalField, DatabaseSchema, FieldRole, PropertyDescriptor};
use minivault_upstream::{NotionClient, UpstreamError};
use tracing::{debug, warn};

/// Where database schemas come from. Exactly one fetch per [`resolve`] call.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn fetch_schema(&self, database_id: &str) -> Result<DatabaseSchema, UpstreamError>;
}

#[async_trait]
impl SchemaSource for NotionClient {
    async fn fetch_schema(&self, database_id: &str) -> Result<DatabaseSchema, UpstreamError> {
        let value = self.retrieve_database(database_id).await?;
        Ok(DatabaseSchema::from_notion(&value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub key: &'static str,
    pub role: FieldRole,
    /// The property this field maps to in the current database, if any.
    pub property: Option<PropertyDescriptor>,
    pub fallback: Option<PropertyDescriptor>,
}

impl ResolvedField {
    pub fn present(&self) -> bool {
        self.property.is_some()
    }
}

/// Canonical field → actual property name and type for one database.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFieldMap {
    database_id: String,
    schema_available: bool,
    fields: Vec<ResolvedField>,
}

impl ResolvedFieldMap {
    pub fn from_schema(schema: &DatabaseSchema, fields: &[CanonicalField]) -> Self {
        Self {
            database_id: schema.id.clone(),
            schema_available: true,
            fields: fields
                .iter()
                .map(|field| ResolvedField {
                    key: field.key,
                    role: field.role,
                    property: resolve_field(schema, field),
                    fallback: fallback_of(field),
                })
                .collect(),
        }
    }

    /// Every field unresolved; used when the schema itself could not be read.
    pub fn unavailable(database_id: &str, fields: &[CanonicalField]) -> Self {
        Self {
            database_id: normalize_id(database_id),
            schema_available: false,
            fields: fields
                .iter()
                .map(|field| ResolvedField {
                    key: field.key,
                    role: field.role,
                    property: None,
                    fallback: fallback_of(field),
                })
                .collect(),
        }
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub fn schema_available(&self) -> bool {
        self.schema_available
    }

    pub fn get(&self, key: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedField> {
        self.fields.iter()
    }

    /// Property to read for `key`; only proven-present properties.
    pub fn read_target(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.get(key)?.property.as_ref()
    }

    /// Property to write for `key`. Falls back to the historical default names only
    /// when the schema fetch failed; a fetched schema lacking the field means skip it.
    pub fn write_target(&self, key: &str) -> Option<&PropertyDescriptor> {
        let field = self.get(key)?;
        match &field.property {
            Some(property) => Some(property),
            None if !self.schema_available => field.fallback.as_ref(),
            None => None,
        }
    }
}

fn resolve_field(schema: &DatabaseSchema, field: &CanonicalField) -> Option<PropertyDescriptor> {
    let by_alias = field.aliases.iter().find_map(|alias| schema.get(alias));
    let resolved = match (by_alias, field.role) {
        (Some(property), _) => Some(property),
        (None, FieldRole::Title) => schema.title_property(),
        (None, FieldRole::Value) => None,
    };
    if resolved.is_none() {
        debug!(field = field.key, "no matching property in schema");
    }
    resolved.cloned()
}

fn fallback_of(field: &CanonicalField) -> Option<PropertyDescriptor> {
    field
        .fallback
        .map(|f| PropertyDescriptor::new(f.name, f.property_type()))
}

/// Fetch the schema once and resolve every field against it.
///
/// Never fails: a fetch error degrades to an all-unresolved map.
pub async fn resolve(
    source: &dyn SchemaSource,
    database_id: &str,
    fields: &[CanonicalField],
) -> ResolvedFieldMap {
    let database_id = normalize_id(database_id);
    match source.fetch_schema(&database_id).await {
        Ok(schema) => ResolvedFieldMap::from_schema(&schema, fields),
        Err(err) => {
            warn!(%database_id, error = %err, "schema fetch failed; treating all fields as unresolved");
            ResolvedFieldMap::unavailable(&database_id, fields)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use minivault_core::catalog::{ESSENTIALS, GOALS, TASKS};
    use minivault_core::PropertyType;
    use minivault_upstream::Service;

    pub(crate) fn schema(props: &[(&str, PropertyType)]) -> DatabaseSchema {
        DatabaseSchema {
            id: "db1".into(),
            properties: props
                .iter()
                .map(|(name, ty)| (name.to_string(), PropertyDescriptor::new(*name, ty.clone())))
                .collect::<BTreeMap<_, _>>(),
            ..Default::default()
        }
    }

    pub(crate) struct FixedSchema {
        pub schema: Option<DatabaseSchema>,
        pub calls: AtomicUsize,
    }

    impl FixedSchema {
        pub fn ok(schema: DatabaseSchema) -> Self {
            Self {
                schema: Some(schema),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                schema: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SchemaSource for FixedSchema {
        async fn fetch_schema(&self, _database_id: &str) -> Result<DatabaseSchema, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.schema.clone().ok_or(UpstreamError::Status {
                service: Service::Notion,
                status: 404,
                message: "Could not find database".into(),
            })
        }
    }

    #[tokio::test]
    async fn first_listed_alias_wins_consistently() {
        let source = FixedSchema::ok(schema(&[
            ("Name", PropertyType::RichText),
            ("Title", PropertyType::Title),
        ]));
        for _ in 0..3 {
            let resolved = resolve(&source, "db1", GOALS.fields).await;
            assert_eq!(resolved.read_target("title").unwrap().name, "Title");
        }

        let resolved = resolve(&source, "db1", ESSENTIALS.fields).await;
        assert_eq!(resolved.read_target("title").unwrap().name, "Name");
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn title_role_falls_back_to_the_schema_title_property() {
        let source = FixedSchema::ok(schema(&[
            ("Projet", PropertyType::Title),
            ("Statut", PropertyType::Select),
        ]));
        let resolved = resolve(&source, "db1", TASKS.fields).await;
        assert_eq!(resolved.read_target("title").unwrap().name, "Projet");
        assert_eq!(resolved.read_target("status").unwrap().name, "Statut");
        assert!(!resolved.get("priority").unwrap().present());
        assert!(resolved.write_target("priority").is_none());
    }

    #[tokio::test]
    async fn resolved_type_comes_from_the_schema() {
        let source = FixedSchema::ok(schema(&[
            ("Name", PropertyType::Title),
            ("Status", PropertyType::RichText),
        ]));
        let resolved = resolve(&source, "db1", TASKS.fields).await;
        assert_eq!(
            resolved.write_target("status").unwrap().property_type,
            PropertyType::RichText
        );
    }

    #[tokio::test]
    async fn failed_fetch_degrades_to_fallback_writes() {
        let source = FixedSchema::failing();
        let resolved = resolve(&source, "1b2c3d4e-5f60-4718-8a9b-0c1d2e3f4a5b", TASKS.fields).await;

        assert!(!resolved.schema_available());
        assert_eq!(resolved.database_id(), "1b2c3d4e5f6047188a9b0c1d2e3f4a5b");
        assert!(resolved.iter().all(|f| !f.present()));
        assert!(resolved.read_target("title").is_none());
        assert_eq!(
            resolved.write_target("title"),
            Some(&PropertyDescriptor::new("Name", PropertyType::Title))
        );
        assert_eq!(
            resolved.write_target("status"),
            Some(&PropertyDescriptor::new("Status", PropertyType::Select))
        );
        assert!(resolved.write_target("priority").is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}

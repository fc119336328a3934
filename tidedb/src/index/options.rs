use crate::collection::Document;
use crate::common::{COMPOUND_FIELD_SEPARATOR, DOC_ID};
use crate::errors::TideResult;
use serde::{Deserialize, Serialize};

/// Options describing an index.
///
/// `field_name` is a (possibly dotted) field path, or a comma-separated list of
/// paths for a compound index. The options are persisted in the datafile as an
/// `$$indexCreated` record, using the `fieldName`/`unique`/`sparse` keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOptions {
    field_name: String,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    sparse: bool,
}

impl IndexOptions {
    pub fn new(field_name: &str) -> IndexOptions {
        IndexOptions {
            field_name: normalize_field_name(field_name),
            unique: false,
            sparse: false,
        }
    }

    /// Reads options from a `{fieldName, unique, sparse}` document.
    ///
    /// A missing or non-string `fieldName` yields an empty field name, which
    /// [`crate::Datastore::ensure_index`] rejects.
    pub fn from_document(document: &Document) -> TideResult<IndexOptions> {
        let field_name = document
            .get("fieldName")
            .as_str()
            .map(normalize_field_name)
            .unwrap_or_default();
        Ok(IndexOptions {
            field_name,
            unique: document.get("unique").as_bool().unwrap_or(false),
            sparse: document.get("sparse").as_bool().unwrap_or(false),
        })
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn with_sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_sparse(&self) -> bool {
        self.sparse
    }

    /// The indexed field paths, one for a simple index.
    pub fn fields(&self) -> Vec<String> {
        self.field_name
            .split(COMPOUND_FIELD_SEPARATOR)
            .map(String::from)
            .collect()
    }

    pub fn is_compound(&self) -> bool {
        self.field_name.contains(COMPOUND_FIELD_SEPARATOR)
    }

    pub(crate) fn normalized(mut self) -> Self {
        self.field_name = normalize_field_name(&self.field_name);
        self
    }
}

fn normalize_field_name(field_name: &str) -> String {
    field_name
        .split(COMPOUND_FIELD_SEPARATOR)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(COMPOUND_FIELD_SEPARATOR)
}

pub fn unique_index(field_name: &str) -> IndexOptions {
    IndexOptions::new(field_name).with_unique(true)
}

pub fn non_unique_index(field_name: &str) -> IndexOptions {
    IndexOptions::new(field_name)
}

pub(crate) fn id_index() -> IndexOptions {
    unique_index(DOC_ID)
}

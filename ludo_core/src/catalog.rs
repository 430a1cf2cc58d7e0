//! Entity catalog: the closed set of collections the backend serves.
//!
//! Maps the kebab-case path alias used at the HTTP boundary (e.g.
//! `exercise-types`) to the canonical PascalCase collection name and its
//! declared field shape. Built once at startup and handed to whoever needs
//! it; unknown aliases are rejected with a typed error at lookup time.

use std::collections::HashMap;

use errors::RequestError;
use serde::{Deserialize, Serialize};

/// Which physical database an entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityScope {
    /// One collection per tenant database.
    Tenant,
    /// Lives in the fixed system database; bypasses tenant resolution.
    System,
}

/// Declared BSON shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    String,
    Int,
    Double,
    Bool,
    Date,
    ObjectId,
    Array,
    Object,
}

impl FieldKind {
    /// The `bsonType` alias the server's $jsonSchema validator expects.
    pub fn bson_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::Date => "date",
            Self::ObjectId => "objectId",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn field(name: &'static str, kind: FieldKind, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required,
    }
}

/// One known entity: path alias, canonical collection name, scope, shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    /// Kebab-case alias used in request paths.
    pub segment: &'static str,
    /// Canonical collection name on the wire and in storage.
    pub collection: &'static str,
    pub scope: EntityScope,
    /// Whether documents carry a `teams` membership array that restricts
    /// caller visibility.
    pub team_scoped: bool,
    pub fields: &'static [FieldSpec],
}

/// Every entity kind the backend knows about. Closed set: anything not
/// listed here does not exist as far as routing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Team,
    Match,
    Training,
    Exercise,
    ExerciseType,
    Label,
    ScoutingReport,
    Report,
    Season,
    Company,
    User,
    SettingTemplate,
}

static PLAYER: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Player,
    segment: "players",
    collection: "Player",
    scope: EntityScope::Tenant,
    team_scoped: true,
    fields: &[
        field("firstName", FieldKind::String, true),
        field("lastName", FieldKind::String, true),
        field("birthDate", FieldKind::Date, false),
        field("position", FieldKind::String, false),
        field("teams", FieldKind::Array, false),
        field("labels", FieldKind::Object, false),
    ],
};

static TEAM: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Team,
    segment: "teams",
    collection: "Team",
    scope: EntityScope::Tenant,
    team_scoped: false,
    fields: &[
        field("name", FieldKind::String, true),
        field("season", FieldKind::ObjectId, false),
        field("coach", FieldKind::String, false),
    ],
};

static MATCH: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Match,
    segment: "matches",
    collection: "Match",
    scope: EntityScope::Tenant,
    team_scoped: true,
    fields: &[
        field("opponent", FieldKind::String, true),
        field("date", FieldKind::Date, true),
        field("home", FieldKind::Bool, false),
        field("score", FieldKind::Object, false),
        field("teams", FieldKind::Array, false),
    ],
};

static TRAINING: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Training,
    segment: "trainings",
    collection: "Training",
    scope: EntityScope::Tenant,
    team_scoped: true,
    fields: &[
        field("date", FieldKind::Date, true),
        field("teams", FieldKind::Array, false),
        field("exercises", FieldKind::Array, false),
        field("notes", FieldKind::String, false),
    ],
};

static EXERCISE: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Exercise,
    segment: "exercises",
    collection: "Exercise",
    scope: EntityScope::Tenant,
    team_scoped: false,
    fields: &[
        field("name", FieldKind::String, true),
        field("description", FieldKind::String, false),
        field("exerciseType", FieldKind::ObjectId, false),
        field("durationMinutes", FieldKind::Int, false),
    ],
};

static EXERCISE_TYPE: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::ExerciseType,
    segment: "exercise-types",
    collection: "ExerciseType",
    scope: EntityScope::Tenant,
    team_scoped: false,
    fields: &[field("name", FieldKind::String, true)],
};

static LABEL: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Label,
    segment: "labels",
    collection: "Label",
    scope: EntityScope::Tenant,
    team_scoped: false,
    fields: &[
        field("name", FieldKind::String, true),
        field("entity", FieldKind::String, true),
        field("fieldType", FieldKind::String, true),
        field("options", FieldKind::Array, false),
    ],
};

static SCOUTING_REPORT: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::ScoutingReport,
    segment: "scouting-reports",
    collection: "ScoutingReport",
    scope: EntityScope::Tenant,
    team_scoped: true,
    fields: &[
        field("player", FieldKind::ObjectId, true),
        field("scout", FieldKind::String, false),
        field("rating", FieldKind::Int, false),
        field("notes", FieldKind::String, false),
        field("teams", FieldKind::Array, false),
    ],
};

static REPORT: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Report,
    segment: "reports",
    collection: "Report",
    scope: EntityScope::Tenant,
    team_scoped: true,
    fields: &[
        field("title", FieldKind::String, true),
        field("generatedAt", FieldKind::Date, false),
        field("payload", FieldKind::Object, false),
        field("teams", FieldKind::Array, false),
    ],
};

static SEASON: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Season,
    segment: "seasons",
    collection: "Season",
    scope: EntityScope::Tenant,
    team_scoped: false,
    fields: &[
        field("name", FieldKind::String, true),
        field("start", FieldKind::Date, false),
        field("end", FieldKind::Date, false),
    ],
};

static COMPANY: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Company,
    segment: "companies",
    collection: "Company",
    scope: EntityScope::System,
    team_scoped: false,
    fields: &[
        field("name", FieldKind::String, true),
        field("database", FieldKind::String, true),
        field("contact", FieldKind::Object, false),
    ],
};

static USER: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::User,
    segment: "users",
    collection: "User",
    scope: EntityScope::System,
    team_scoped: false,
    fields: &[
        field("email", FieldKind::String, true),
        field("passwordHash", FieldKind::String, false),
        field("company", FieldKind::ObjectId, false),
        field("roles", FieldKind::Array, false),
    ],
};

static SETTING_TEMPLATE: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::SettingTemplate,
    segment: "setting-templates",
    collection: "SettingTemplate",
    scope: EntityScope::System,
    team_scoped: false,
    fields: &[
        field("name", FieldKind::String, true),
        field("settings", FieldKind::Object, false),
    ],
};

impl EntityKind {
    pub const ALL: &'static [EntityKind] = &[
        Self::Player,
        Self::Team,
        Self::Match,
        Self::Training,
        Self::Exercise,
        Self::ExerciseType,
        Self::Label,
        Self::ScoutingReport,
        Self::Report,
        Self::Season,
        Self::Company,
        Self::User,
        Self::SettingTemplate,
    ];

    pub fn descriptor(self) -> &'static EntityDescriptor {
        match self {
            Self::Player => &PLAYER,
            Self::Team => &TEAM,
            Self::Match => &MATCH,
            Self::Training => &TRAINING,
            Self::Exercise => &EXERCISE,
            Self::ExerciseType => &EXERCISE_TYPE,
            Self::Label => &LABEL,
            Self::ScoutingReport => &SCOUTING_REPORT,
            Self::Report => &REPORT,
            Self::Season => &SEASON,
            Self::Company => &COMPANY,
            Self::User => &USER,
            Self::SettingTemplate => &SETTING_TEMPLATE,
        }
    }
}

/// Read-only registry: path alias -> entity descriptor.
///
/// Constructed once at process start and passed explicitly to the route
/// model provider; tests build fresh instances.
#[derive(Debug)]
pub struct EntityCatalog {
    by_segment: HashMap<&'static str, &'static EntityDescriptor>,
}

impl EntityCatalog {
    /// Catalog holding every built-in entity kind.
    pub fn new() -> Self {
        let by_segment = EntityKind::ALL
            .iter()
            .map(|kind| {
                let descriptor = kind.descriptor();
                (descriptor.segment, descriptor)
            })
            .collect();
        Self { by_segment }
    }

    /// Resolves a non-empty path segment to its descriptor.
    pub fn lookup(&self, segment: &str) -> Result<&'static EntityDescriptor, RequestError> {
        if segment.is_empty() {
            return Err(RequestError::EmptyCollectionName);
        }
        self.by_segment
            .get(segment)
            .copied()
            .ok_or_else(|| RequestError::UnknownCollection {
                segment: segment.to_string(),
            })
    }

    /// Resolution for routes where the collection segment is optional:
    /// an absent or empty segment means the route needs no model.
    pub fn lookup_optional(
        &self,
        segment: Option<&str>,
    ) -> Result<Option<&'static EntityDescriptor>, RequestError> {
        match segment {
            None | Some("") => Ok(None),
            Some(s) => self.lookup(s).map(Some),
        }
    }

    /// Resolution for routes that require a collection segment.
    pub fn lookup_required(
        &self,
        segment: Option<&str>,
    ) -> Result<&'static EntityDescriptor, RequestError> {
        match segment {
            None | Some("") => Err(RequestError::EmptyCollectionName),
            Some(s) => self.lookup(s),
        }
    }

    pub fn len(&self) -> usize {
        self.by_segment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_segment.is_empty()
    }
}

impl Default for EntityCatalog {
    fn default() -> Self {
        Self::new()
    }
}

//! Vocabulary IRIs used by form templates, instances and history records.

pub mod rdf {
    pub const NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
    pub const REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
    pub const NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
    pub const LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
}

pub mod xsd {
    pub const NS: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
}

/// Form definition vocabulary.
pub mod form {
    pub const NS: &str = "http://lblod.data.gift/vocabularies/forms/";
    pub const FORM: &str = "http://lblod.data.gift/vocabularies/forms/Form";
    pub const EXTENSION: &str = "http://lblod.data.gift/vocabularies/forms/Extension";
    pub const TARGET_TYPE: &str = "http://lblod.data.gift/vocabularies/forms/targetType";
    pub const TARGET_LABEL: &str = "http://lblod.data.gift/vocabularies/forms/targetLabel";
    pub const INCLUDES: &str = "http://lblod.data.gift/vocabularies/forms/includes";
    pub const LISTING: &str = "http://lblod.data.gift/vocabularies/forms/Listing";
    pub const EACH: &str = "http://lblod.data.gift/vocabularies/forms/each";
    pub const SCOPE: &str = "http://lblod.data.gift/vocabularies/forms/scope";
    pub const OPTIONS: &str = "http://lblod.data.gift/vocabularies/forms/options";
}

pub mod ext {
    pub const NS: &str = "http://mu.semte.ch/vocabularies/ext/";
    pub const GENERATED_FORM: &str = "http://mu.semte.ch/vocabularies/ext/GeneratedForm";
    pub const TTL_CODE: &str = "http://mu.semte.ch/vocabularies/ext/ttlCode";
    pub const PREFIX: &str = "http://mu.semte.ch/vocabularies/ext/prefix";
    pub const EXTENDS_FORM: &str = "http://mu.semte.ch/vocabularies/ext/extendsForm";
    pub const EXTENDS_GROUP: &str = "http://mu.semte.ch/vocabularies/ext/extendsGroup";
    pub const FORM_HISTORY: &str = "http://mu.semte.ch/vocabularies/ext/FormHistory";
}

pub mod mu {
    pub const NS: &str = "http://mu.semte.ch/vocabularies/core/";
    pub const UUID: &str = "http://mu.semte.ch/vocabularies/core/uuid";
}

/// SHACL, only the path vocabulary.
pub mod sh {
    pub const NS: &str = "http://www.w3.org/ns/shacl#";
    pub const PATH: &str = "http://www.w3.org/ns/shacl#path";
    pub const GROUP: &str = "http://www.w3.org/ns/shacl#group";
    pub const INVERSE_PATH: &str = "http://www.w3.org/ns/shacl#inversePath";
    pub const ALTERNATIVE_PATH: &str = "http://www.w3.org/ns/shacl#alternativePath";
}

pub mod skos {
    pub const NS: &str = "http://www.w3.org/2004/02/skos/core#";
    pub const IN_SCHEME: &str = "http://www.w3.org/2004/02/skos/core#inScheme";
}

pub mod dct {
    pub const NS: &str = "http://purl.org/dc/terms/";
    pub const IS_VERSION_OF: &str = "http://purl.org/dc/terms/isVersionOf";
    pub const ISSUED: &str = "http://purl.org/dc/terms/issued";
    pub const CREATOR: &str = "http://purl.org/dc/terms/creator";
    pub const DESCRIPTION: &str = "http://purl.org/dc/terms/description";
}

/// ActivityStreams tombstones.
pub mod activity {
    pub const NS: &str = "http://www.w3.org/ns/activitystreams#";
    pub const TOMBSTONE: &str = "http://www.w3.org/ns/activitystreams#Tombstone";
    pub const DELETED: &str = "http://www.w3.org/ns/activitystreams#deleted";
    pub const FORMER_TYPE: &str = "http://www.w3.org/ns/activitystreams#formerType";
}

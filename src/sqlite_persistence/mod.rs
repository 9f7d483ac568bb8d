mod versioned_schema;

pub use versioned_schema::{
    open_versioned, read_schema_version, Column, ForeignKey, SqlType, Table, VersionedSchema,
    BASE_DB_VERSION,
};

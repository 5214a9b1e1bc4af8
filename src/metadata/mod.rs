//! Metadata documents that accompany a published package.
//!
//! - `system`: per-object technical metadata (checksum, size, access policy)
//! - `eml`: the package-level descriptive record
//! - `resource_map`: the OAI-ORE aggregation graph
//! - `licenses`, `extra_files`: the members the pipeline generates itself

pub mod checksum;
pub mod eml;
pub mod extra_files;
pub mod licenses;
pub mod resource_map;
pub mod system;
pub(crate) mod xml;

pub use checksum::{compute_md5, file_md5, md5_hex, FileStream, MemoryStream, ReadableStream, StreamDigest, CHUNK_SIZE};
pub use eml::{
    create_descriptive_record, read_object_entries, strip_html_tags, FileSizes, ObjectEntry,
    DESCRIPTIVE_RECORD_NAME, EML_FORMAT_ID,
};
pub use extra_files::ExtraFile;
pub use licenses::{find_license, License, SUPPORTED_LICENSES};
pub use resource_map::{ResourceMap, RESOURCE_MAP_FORMAT_ID};
pub use system::{
    generate_system_metadata, AccessPolicy, AccessRule, Checksum, Content, Permission,
    SystemMetadata, CHECKSUM_ALGORITHM, PUBLIC_SUBJECT,
};

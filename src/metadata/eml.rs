//! Package-level descriptive record (EML 2.1.1).
//!
//! The EML schema is positional: element order inside `dataset` is
//! validated, so sections are emitted strictly as
//! title, creator, abstract, intellectualRights, contact, otherEntity*.

use std::sync::LazyLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use super::extra_files::ExtraFile;
use super::licenses::rights_text;
use super::xml::XmlDocument;
use crate::error::{IdentityError, MetadataError};
use crate::identity::directory_for;
use crate::pid::Pid;
use crate::storage::{Tale, User};

/// Format id of the descriptive record; also the EML namespace.
pub const EML_FORMAT_ID: &str = "eml://ecoinformatics.org/eml-2.1.1";

/// File name the descriptive record is uploaded under.
pub const DESCRIPTIVE_RECORD_NAME: &str = "science_metadata.xml";

const ENTITY_TYPE: &str = "dataTable";

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<]+?>").expect("HTML tag pattern is valid"));

/// One object described in the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub name: String,
    pub description: String,
    pub size: u64,
    pub format: String,
}

impl ObjectEntry {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        size: u64,
        format: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            size,
            format: format.into(),
        }
    }

    fn extra(file: ExtraFile, size: u64) -> Self {
        Self::new(file.file_name(), file.description(), size, file.record_format())
    }
}

/// Sizes of the package members the pipeline generates itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileSizes {
    pub tale_yaml: u64,
    pub license: u64,
    /// The environment snapshot.
    pub repository: u64,
}

struct Publisher<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
}

impl<'a> Publisher<'a> {
    fn from_user(user: &'a User) -> Result<Self, IdentityError> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        let first_name = present(&user.first_name);
        let last_name = present(&user.last_name);
        let email = present(&user.email);

        match (first_name, last_name, email) {
            (Some(first_name), Some(last_name), Some(email)) => Ok(Self {
                first_name,
                last_name,
                email,
            }),
            _ => {
                let mut missing = Vec::new();
                if first_name.is_none() {
                    missing.push("firstName");
                }
                if last_name.is_none() {
                    missing.push("lastName");
                }
                if email.is_none() {
                    missing.push("email");
                }
                Err(IdentityError::MissingIdentity { missing })
            }
        }
    }

    fn write_party(&self, doc: &mut XmlDocument, element: &str, user_id: &str) -> Result<(), MetadataError> {
        doc.open(element, &[])?;
        doc.open("individualName", &[])?;
        doc.text_element("givenName", &[], self.first_name)?;
        doc.text_element("surName", &[], self.last_name)?;
        doc.close("individualName")?;
        doc.text_element("electronicMailAddress", &[], self.email)?;
        doc.text_element("userId", &[("directory", directory_for(user_id))], user_id)?;
        doc.close(element)
    }
}

pub fn strip_html_tags(text: &str) -> String {
    HTML_TAG.replace_all(text, "").into_owned()
}

/// Builds the EML record for a package.
///
/// `items` are emitted in the given order, followed by entries for the
/// package-info file, the license (when `file_sizes.license > 0`) and the
/// environment snapshot (when `file_sizes.repository > 0`).
///
/// # Errors
///
/// Returns `MetadataError::Identity` when the user lacks a first name, last
/// name or email address.
pub fn create_descriptive_record(
    tale: &Tale,
    user: &User,
    items: &[ObjectEntry],
    metadata_pid: &Pid,
    file_sizes: &FileSizes,
    license_id: &str,
    user_id: &str,
) -> Result<Vec<u8>, MetadataError> {
    let publisher = Publisher::from_user(user)?;
    tracing::debug!(pid = %metadata_pid, items = items.len(), "Creating EML record");

    let mut doc = XmlDocument::new()?;
    doc.open(
        "eml:eml",
        &[
            ("xmlns:eml", EML_FORMAT_ID),
            ("xsi:schemaLocation", "eml://ecoinformatics.org/eml-2.1.1 eml.xsd"),
            ("xmlns:stmml", "http://www.xml-cml.org/schema/stmml-1.1"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
            ("scope", "system"),
            ("system", "knb"),
            ("packageId", metadata_pid.as_str()),
        ],
    )?;
    doc.open("dataset", &[])?;
    doc.text_element("title", &[], &tale.title)?;

    publisher.write_party(&mut doc, "creator", user_id)?;

    if let Some(description) = tale.description.as_deref().filter(|d| !d.is_empty()) {
        doc.open("abstract", &[])?;
        doc.text_element("para", &[], &strip_html_tags(description))?;
        doc.close("abstract")?;
    }

    doc.open("intellectualRights", &[])?;
    doc.open("section", &[])?;
    doc.open("para", &[])?;
    doc.text_element("literalLayout", &[], rights_text(license_id))?;
    doc.close("para")?;
    doc.close("section")?;
    doc.close("intellectualRights")?;

    publisher.write_party(&mut doc, "contact", user_id)?;

    for item in items {
        write_object_entry(&mut doc, item)?;
    }
    write_object_entry(&mut doc, &ObjectEntry::extra(ExtraFile::TaleConfig, file_sizes.tale_yaml))?;
    if file_sizes.license > 0 {
        write_object_entry(&mut doc, &ObjectEntry::extra(ExtraFile::License, file_sizes.license))?;
    }
    if file_sizes.repository > 0 {
        write_object_entry(
            &mut doc,
            &ObjectEntry::extra(ExtraFile::Environment, file_sizes.repository),
        )?;
    }

    doc.close("dataset")?;
    doc.close("eml:eml")?;
    Ok(doc.finish())
}

fn write_object_entry(doc: &mut XmlDocument, entry: &ObjectEntry) -> Result<(), MetadataError> {
    doc.open("otherEntity", &[])?;
    doc.text_element("entityName", &[], &entry.name)?;
    let description = strip_html_tags(&entry.description);
    if !description.is_empty() {
        doc.text_element("entityDescription", &[], &description)?;
    }

    doc.open("physical", &[])?;
    doc.text_element("objectName", &[], &entry.name)?;
    doc.text_element("size", &[("unit", "bytes")], &entry.size.to_string())?;
    doc.open("dataFormat", &[])?;
    doc.open("externallyDefinedFormat", &[])?;
    doc.text_element("formatName", &[], &entry.format)?;
    doc.close("externallyDefinedFormat")?;
    doc.close("dataFormat")?;
    doc.close("physical")?;

    doc.text_element("entityType", &[], ENTITY_TYPE)?;
    doc.close("otherEntity")
}

/// Reads the `otherEntity` entries of an EML record back, in document order.
pub fn read_object_entries(xml: &[u8]) -> Result<Vec<ObjectEntry>, MetadataError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<ObjectEntry> = None;
    let mut open_tag: Vec<u8> = Vec::new();

    loop {
        match reader
            .read_event()
            .map_err(|e| MetadataError::Xml(e.to_string()))?
        {
            Event::Start(start) => {
                open_tag = start.name().as_ref().to_vec();
                if open_tag == b"otherEntity" {
                    current = Some(ObjectEntry::new("", "", 0, ""));
                }
            }
            Event::Text(text) => {
                let Some(entry) = current.as_mut() else {
                    continue;
                };
                let value = text
                    .unescape()
                    .map_err(|e| MetadataError::Xml(e.to_string()))?
                    .into_owned();
                match open_tag.as_slice() {
                    b"entityName" => entry.name = value,
                    b"entityDescription" => entry.description = value,
                    b"size" => {
                        entry.size = value
                            .parse()
                            .map_err(|_| MetadataError::Xml(format!("invalid size '{}'", value)))?
                    }
                    b"formatName" => entry.format = value,
                    _ => {}
                }
            }
            Event::End(end) => {
                if end.name().as_ref() == b"otherEntity" {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                }
                open_tag.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tale() -> Tale {
        Tale {
            id: "tale-1".to_string(),
            title: "Soil moisture across a watershed gradient".to_string(),
            description: Some("<p>A <b>reproducible</b> analysis</p>".to_string()),
            ..Tale::default()
        }
    }

    fn user() -> User {
        User {
            id: "u1".to_string(),
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            email: Some("jane@example.org".to_string()),
        }
    }

    fn items() -> Vec<ObjectEntry> {
        vec![
            ObjectEntry::new("b.csv", "<i>second</i> file", 20, "text/csv"),
            ObjectEntry::new("a.csv", "", 10, "text/csv"),
        ]
    }

    fn render(file_sizes: FileSizes, license_id: &str) -> String {
        let xml = create_descriptive_record(
            &tale(),
            &user(),
            &items(),
            &Pid::from("eml-pid"),
            &file_sizes,
            license_id,
            "https://orcid.org/0000-0001",
        )
        .expect("record builds");
        String::from_utf8(xml).expect("utf8")
    }

    fn assert_in_order(xml: &str, needles: &[&str]) {
        let mut cursor = 0;
        for needle in needles {
            let found = xml[cursor..]
                .find(needle)
                .unwrap_or_else(|| panic!("{} missing or out of order", needle));
            cursor += found + needle.len();
        }
    }

    #[test]
    fn test_section_order() {
        let xml = render(
            FileSizes {
                tale_yaml: 100,
                license: 50,
                repository: 900,
            },
            "CC-BY-4.0",
        );
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("packageId=\"eml-pid\""));
        assert_in_order(
            &xml,
            &[
                "<dataset>",
                "<title>Soil moisture",
                "<creator>",
                "<givenName>Jane</givenName>",
                "<surName>Doe</surName>",
                "<electronicMailAddress>jane@example.org</electronicMailAddress>",
                "<userId directory=\"https://orcid.org\">",
                "<abstract>",
                "<para>A reproducible analysis</para>",
                "<intellectualRights>",
                "CC-BY 4.0",
                "<contact>",
                "<entityName>b.csv</entityName>",
                "<entityName>a.csv</entityName>",
                "<entityName>tale.yml</entityName>",
                "<entityName>LICENSE</entityName>",
                "<entityName>docker-environment.tar.gz</entityName>",
                "</dataset>",
            ],
        );
    }

    #[test]
    fn test_entry_field_order() {
        let xml = render(FileSizes::default(), "CC0-1.0");
        assert_in_order(
            &xml,
            &[
                "<otherEntity>",
                "<entityName>b.csv</entityName>",
                "<entityDescription>second file</entityDescription>",
                "<objectName>b.csv</objectName>",
                "<size unit=\"bytes\">20</size>",
                "<formatName>text/csv</formatName>",
                "<entityType>dataTable</entityType>",
                "</otherEntity>",
            ],
        );
    }

    #[test]
    fn test_optional_entries_skipped_when_empty() {
        let xml = render(
            FileSizes {
                tale_yaml: 12,
                license: 0,
                repository: 0,
            },
            "CC0-1.0",
        );
        assert!(xml.contains("<entityName>tale.yml</entityName>"));
        assert!(!xml.contains("<entityName>LICENSE</entityName>"));
        assert!(!xml.contains("docker-environment.tar.gz"));
    }

    #[test]
    fn test_no_abstract_without_description() {
        let mut tale = tale();
        tale.description = None;
        let xml = create_descriptive_record(
            &tale,
            &user(),
            &[],
            &Pid::from("p"),
            &FileSizes::default(),
            "CC0-1.0",
            "CN=someone",
        )
        .expect("record builds");
        let xml = String::from_utf8(xml).expect("utf8");
        assert!(!xml.contains("<abstract>"));
        assert!(xml.contains("directory=\"https://cilogon.org\""));
    }

    #[test]
    fn test_unknown_license_has_empty_rights() {
        let xml = render(FileSizes::default(), "WTFPL");
        assert!(xml.contains("<literalLayout></literalLayout>"));
    }

    #[test]
    fn test_missing_email_is_identity_error() {
        let mut user = user();
        user.email = None;
        let result = create_descriptive_record(
            &tale(),
            &user,
            &items(),
            &Pid::from("p"),
            &FileSizes::default(),
            "CC0-1.0",
            "someone",
        );
        match result {
            Err(MetadataError::Identity(IdentityError::MissingIdentity { missing })) => {
                assert_eq!(missing, vec!["email"]);
            }
            other => panic!("expected identity error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_round_trip_preserves_object_order() {
        let file_sizes = FileSizes {
            tale_yaml: 100,
            license: 50,
            repository: 0,
        };
        let xml = render(file_sizes, "CC0-1.0");
        let entries = read_object_entries(xml.as_bytes()).expect("parses");

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b.csv", "a.csv", "tale.yml", "LICENSE"]);
        assert_eq!(entries[0].description, "second file");
        assert_eq!(entries[0].size, 20);
        assert_eq!(entries[1].description, "");
        assert_eq!(entries[2].format, "application/x-yaml");
        assert_eq!(entries[3].size, 50);
    }

    #[test]
    fn test_strip_html_tags() {
        assert_eq!(strip_html_tags("<p>Hello <a href=\"x\">world</a></p>"), "Hello world");
        assert_eq!(strip_html_tags("plain"), "plain");
    }
}

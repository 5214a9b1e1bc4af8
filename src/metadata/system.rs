//! Per-object technical metadata ("system metadata").
//!
//! Every object uploaded to a member node travels with one of these
//! records. The checksum algorithm is always MD5 and the access policy is
//! always a single public-read rule; private packages are not supported.

use std::fmt;

use super::checksum::{compute_md5, md5_hex, ReadableStream};
use super::xml::XmlDocument;
use crate::error::MetadataError;
use crate::pid::Pid;

/// The only checksum algorithm the repository accepts from us.
pub const CHECKSUM_ALGORITHM: &str = "MD5";

/// Subject that stands for anonymous users.
pub const PUBLIC_SUBJECT: &str = "public";

const SYSTEM_METADATA_NAMESPACE: &str = "http://ns.dataone.org/service/types/v2.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub subjects: Vec<String>,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    pub rules: Vec<AccessRule>,
}

impl AccessPolicy {
    /// One rule: `public` may `read`.
    pub fn public_read() -> Self {
        Self {
            rules: vec![AccessRule {
                subjects: vec![PUBLIC_SUBJECT.to_string()],
                permissions: vec![Permission::Read],
            }],
        }
    }
}

/// Content being described.
pub enum Content<'a> {
    /// Whole in-memory buffer, hashed in one pass.
    Buffer(&'a [u8]),
    /// A stream hashed chunk by chunk to bound memory use.
    Stream(&'a mut dyn ReadableStream),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemMetadata {
    pub pid: Pid,
    pub format_id: String,
    pub size: u64,
    pub checksum: Checksum,
    /// Empty for objects without a meaningful file name (the resource map).
    pub file_name: String,
    pub rights_holder: String,
    pub access_policy: AccessPolicy,
}

/// Builds the system metadata for one object.
///
/// `size` overrides the measured content length; callers pass it for files
/// whose size the storage layer already reports.
pub fn generate_system_metadata(
    pid: impl Into<Pid>,
    format_id: &str,
    content: Content<'_>,
    name: &str,
    rights_holder: &str,
    size: Option<u64>,
) -> Result<SystemMetadata, MetadataError> {
    let (digest, measured) = match content {
        Content::Buffer(bytes) => (md5_hex(bytes), bytes.len() as u64),
        Content::Stream(stream) => {
            let digest = compute_md5(stream)?;
            (digest.hex, digest.bytes_read)
        }
    };

    Ok(SystemMetadata {
        pid: pid.into(),
        format_id: format_id.to_string(),
        size: size.unwrap_or(measured),
        checksum: Checksum {
            algorithm: CHECKSUM_ALGORITHM.to_string(),
            value: digest,
        },
        file_name: name.to_string(),
        rights_holder: rights_holder.to_string(),
        access_policy: AccessPolicy::public_read(),
    })
}

impl SystemMetadata {
    /// Serializes to the DataONE v2 `systemMetadata` document, elements in
    /// schema order.
    pub fn to_xml(&self) -> Result<Vec<u8>, MetadataError> {
        let mut doc = XmlDocument::new()?;
        doc.open("d1:systemMetadata", &[("xmlns:d1", SYSTEM_METADATA_NAMESPACE)])?;
        doc.text_element("serialVersion", &[], "1")?;
        doc.text_element("identifier", &[], self.pid.as_str())?;
        doc.text_element("formatId", &[], &self.format_id)?;
        doc.text_element("size", &[], &self.size.to_string())?;
        doc.text_element(
            "checksum",
            &[("algorithm", self.checksum.algorithm.as_str())],
            &self.checksum.value,
        )?;
        doc.text_element("rightsHolder", &[], &self.rights_holder)?;

        doc.open("accessPolicy", &[])?;
        for rule in &self.access_policy.rules {
            doc.open("allow", &[])?;
            for subject in &rule.subjects {
                doc.text_element("subject", &[], subject)?;
            }
            for permission in &rule.permissions {
                doc.text_element("permission", &[], permission.as_str())?;
            }
            doc.close("allow")?;
        }
        doc.close("accessPolicy")?;

        if !self.file_name.is_empty() {
            doc.text_element("fileName", &[], &self.file_name)?;
        }
        doc.close("d1:systemMetadata")?;
        Ok(doc.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::checksum::MemoryStream;

    fn assert_fixed_policy(meta: &SystemMetadata) {
        assert_eq!(meta.checksum.algorithm, "MD5");
        assert_eq!(meta.access_policy.rules.len(), 1);
        let rule = &meta.access_policy.rules[0];
        assert_eq!(rule.subjects, vec!["public".to_string()]);
        assert_eq!(rule.permissions, vec![Permission::Read]);
    }

    #[test]
    fn test_buffer_metadata() {
        let meta = generate_system_metadata(
            "pid-1",
            "text/plain",
            Content::Buffer(b"hello world"),
            "LICENSE",
            "http://orcid.org/0000-0001",
            None,
        )
        .expect("metadata");
        assert_eq!(meta.pid.as_str(), "pid-1");
        assert_eq!(meta.size, 11);
        assert_eq!(meta.checksum.value, "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(meta.file_name, "LICENSE");
        assert_fixed_policy(&meta);
    }

    #[test]
    fn test_stream_metadata_with_size_override() {
        let data = b"hello world";
        let mut stream = MemoryStream::new(data);
        let meta = generate_system_metadata(
            7u64,
            "text/csv",
            Content::Stream(&mut stream),
            "data.csv",
            "owner",
            Some(4096),
        )
        .expect("metadata");
        assert_eq!(meta.pid.as_str(), "7");
        assert_eq!(meta.size, 4096);
        assert_eq!(meta.checksum.value, md5_hex(data));
        assert_fixed_policy(&meta);
    }

    #[test]
    fn test_policy_fixed_for_any_input() {
        for (format, content, owner) in [
            ("application/octet-stream", &b""[..], ""),
            ("http://www.openarchives.org/ore/terms", &b"<rdf/>"[..], "someone"),
        ] {
            let meta = generate_system_metadata(
                Pid::generate(),
                format,
                Content::Buffer(content),
                "",
                owner,
                None,
            )
            .expect("metadata");
            assert_fixed_policy(&meta);
        }
    }

    #[test]
    fn test_xml_element_order() {
        let meta = generate_system_metadata(
            "pid-1",
            "text/plain",
            Content::Buffer(b"x"),
            "LICENSE",
            "owner",
            None,
        )
        .expect("metadata");
        let xml = String::from_utf8(meta.to_xml().expect("xml")).expect("utf8");

        let order = [
            "<serialVersion>",
            "<identifier>pid-1</identifier>",
            "<formatId>text/plain</formatId>",
            "<size>1</size>",
            "<checksum algorithm=\"MD5\">",
            "<rightsHolder>owner</rightsHolder>",
            "<subject>public</subject>",
            "<permission>read</permission>",
            "<fileName>LICENSE</fileName>",
        ];
        let mut cursor = 0;
        for needle in order {
            let found = xml[cursor..]
                .find(needle)
                .unwrap_or_else(|| panic!("{} missing or out of order in {}", needle, xml));
            cursor += found + needle.len();
        }
    }

    #[test]
    fn test_xml_omits_empty_file_name() {
        let meta = generate_system_metadata(
            "map",
            "http://www.openarchives.org/ore/terms",
            Content::Buffer(b"x"),
            "",
            "owner",
            None,
        )
        .expect("metadata");
        let xml = String::from_utf8(meta.to_xml().expect("xml")).expect("utf8");
        assert!(!xml.contains("fileName"));
    }
}

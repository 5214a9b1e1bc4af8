//! Small element-oriented layer over the `quick-xml` writer.
//!
//! The documents this crate produces are validated positionally by the
//! repository, so elements are written strictly in call order.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::MetadataError;

pub(crate) struct XmlDocument {
    writer: Writer<Vec<u8>>,
}

impl XmlDocument {
    /// Starts a UTF-8 document with an XML declaration.
    pub(crate) fn new() -> Result<Self, MetadataError> {
        let mut doc = Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        };
        doc.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(doc)
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), MetadataError> {
        self.writer
            .write_event(event)
            .map_err(|e| MetadataError::Xml(e.to_string()))
    }

    pub(crate) fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), MetadataError> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.event(Event::Start(start))
    }

    pub(crate) fn close(&mut self, name: &str) -> Result<(), MetadataError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    /// Writes `<name attrs>text</name>`.
    pub(crate) fn text_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<(), MetadataError> {
        self.open(name, attributes)?;
        // Always emit the text event so empty elements stay on one line.
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    /// Writes a self-closing `<name attrs/>`.
    pub(crate) fn empty_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), MetadataError> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.event(Event::Empty(start))
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

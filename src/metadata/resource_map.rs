//! OAI-ORE resource map: "package P aggregates O1..On, described by M".

use super::xml::XmlDocument;
use crate::error::MetadataError;
use crate::pid::Pid;
use crate::repository::Network;

/// Format id of the resource map object.
pub const RESOURCE_MAP_FORMAT_ID: &str = "http://www.openarchives.org/ore/terms";

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const ORE_NS: &str = "http://www.openarchives.org/ore/terms/";
const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
const CITO_NS: &str = "http://purl.org/spar/cito/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMap {
    pid: Pid,
    metadata_pid: Pid,
    object_pids: Vec<Pid>,
}

impl ResourceMap {
    /// Missing (`None`) and empty pids are dropped; they stand for objects
    /// whose upload failed or was skipped.
    pub fn new(
        pid: impl Into<Pid>,
        metadata_pid: impl Into<Pid>,
        object_pids: impl IntoIterator<Item = Option<Pid>>,
    ) -> Self {
        Self {
            pid: pid.into(),
            metadata_pid: metadata_pid.into(),
            object_pids: object_pids
                .into_iter()
                .flatten()
                .filter(|pid| !pid.is_empty())
                .collect(),
        }
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    pub fn metadata_pid(&self) -> &Pid {
        &self.metadata_pid
    }

    pub fn object_pids(&self) -> &[Pid] {
        &self.object_pids
    }

    /// Renders the graph as RDF/XML with resource URIs resolved through the
    /// coordinating node of `network`.
    pub fn to_rdf_xml(&self, network: Network) -> Result<Vec<u8>, MetadataError> {
        let map_uri = network.resolve_uri(self.pid.as_str());
        let aggregation_uri = format!("{}#aggregation", map_uri);
        let metadata_uri = network.resolve_uri(self.metadata_pid.as_str());
        let object_uris: Vec<String> = self
            .object_pids
            .iter()
            .map(|pid| network.resolve_uri(pid.as_str()))
            .collect();

        let mut doc = XmlDocument::new()?;
        doc.open(
            "rdf:RDF",
            &[
                ("xmlns:rdf", RDF_NS),
                ("xmlns:ore", ORE_NS),
                ("xmlns:dcterms", DCTERMS_NS),
                ("xmlns:cito", CITO_NS),
            ],
        )?;

        let resource_map_type = format!("{}ResourceMap", ORE_NS);
        doc.open("rdf:Description", &[("rdf:about", &map_uri)])?;
        doc.empty_element("rdf:type", &[("rdf:resource", &resource_map_type)])?;
        doc.text_element("dcterms:identifier", &[], self.pid.as_str())?;
        doc.empty_element("ore:describes", &[("rdf:resource", &aggregation_uri)])?;
        doc.close("rdf:Description")?;

        let aggregation_type = format!("{}Aggregation", ORE_NS);
        doc.open("rdf:Description", &[("rdf:about", &aggregation_uri)])?;
        doc.empty_element("rdf:type", &[("rdf:resource", &aggregation_type)])?;
        doc.empty_element("ore:aggregates", &[("rdf:resource", &metadata_uri)])?;
        for uri in &object_uris {
            doc.empty_element("ore:aggregates", &[("rdf:resource", uri)])?;
        }
        doc.empty_element("ore:isDescribedBy", &[("rdf:resource", &map_uri)])?;
        doc.close("rdf:Description")?;

        doc.open("rdf:Description", &[("rdf:about", &metadata_uri)])?;
        doc.text_element("dcterms:identifier", &[], self.metadata_pid.as_str())?;
        for uri in &object_uris {
            doc.empty_element("cito:documents", &[("rdf:resource", uri)])?;
        }
        doc.empty_element("ore:isAggregatedBy", &[("rdf:resource", &aggregation_uri)])?;
        doc.close("rdf:Description")?;

        for (pid, uri) in self.object_pids.iter().zip(&object_uris) {
            doc.open("rdf:Description", &[("rdf:about", uri)])?;
            doc.text_element("dcterms:identifier", &[], pid.as_str())?;
            doc.empty_element("cito:isDocumentedBy", &[("rdf:resource", &metadata_uri)])?;
            doc.empty_element("ore:isAggregatedBy", &[("rdf:resource", &aggregation_uri)])?;
            doc.close("rdf:Description")?;
        }

        doc.close("rdf:RDF")?;
        Ok(doc.finish())
    }
}

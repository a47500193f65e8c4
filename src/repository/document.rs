//! Relationship and descriptive-metadata document parsing

use crate::error::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// URI prefix the repository puts in front of object references
pub const RESOURCE_PREFIX: &str = "info:fedora/";

/// Qualified name of the model relation
pub const HAS_MODEL: &str = "fedora-model:hasModel";

/// One element of a relationship document
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    /// Element name as written, namespace prefix included
    pub name: String,
    /// `rdf:resource` attribute, if present
    pub resource: Option<String>,
    /// Text content
    pub text: String,
}

impl Relation {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let resource = match start
            .try_get_attribute("rdf:resource")
            .map_err(quick_xml::Error::from)?
        {
            Some(attr) => Some(
                attr.unescape_value()
                    .map_err(quick_xml::Error::from)?
                    .into_owned(),
            ),
            None => None,
        };

        Ok(Self {
            name,
            resource,
            text: String::new(),
        })
    }

    /// Element name without its namespace prefix
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }
}

/// Parsed relationship document, elements kept in document order
#[derive(Clone, Debug, Default)]
pub struct RelsExt {
    relations: Vec<Relation>,
}

impl RelsExt {
    /// Parse a RELS-EXT document
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut relations: Vec<Relation> = Vec::new();
        let mut open: Vec<usize> = Vec::new();

        loop {
            match reader.read_event().map_err(quick_xml::Error::from)? {
                Event::Start(start) => {
                    relations.push(Relation::from_start(&start)?);
                    open.push(relations.len() - 1);
                }
                Event::Empty(start) => relations.push(Relation::from_start(&start)?),
                Event::Text(text) => {
                    if let Some(&index) = open.last() {
                        let text = text.unescape().map_err(quick_xml::Error::from)?;
                        relations[index].text.push_str(&text);
                    }
                }
                Event::End(_) => {
                    open.pop();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { relations })
    }

    /// All relations, in document order
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Resource values of every element named exactly `tag`, with the
    /// repository URI prefix stripped
    pub fn resources(&self, tag: &str) -> Vec<String> {
        self.relations
            .iter()
            .filter(|r| r.name == tag)
            .filter_map(|r| r.resource.as_deref())
            .map(|v| v.strip_prefix(RESOURCE_PREFIX).unwrap_or(v).to_string())
            .collect()
    }

    /// Model relations, trying the namespaced tag first and the bare one when
    /// the namespaced lookup is not conclusive
    pub fn models(&self) -> Vec<String> {
        let models = self.resources(HAS_MODEL);
        if models.len() == 1 {
            return models;
        }
        self.resources(unqualified(HAS_MODEL))
    }

    /// Child references under `tag`, falling back to the unqualified tag when
    /// the qualified one yields nothing
    pub fn children(&self, tag: &str) -> Vec<String> {
        let children = self.resources(tag);
        if children.is_empty() && tag.contains(':') {
            return self.resources(unqualified(tag));
        }
        children
    }

    /// Image-server address of a page (`tiles-url` in any namespace spelling)
    pub fn tiles_url(&self) -> Option<&str> {
        self.relations
            .iter()
            .filter(|r| r.local_name() == "tiles-url")
            .map(|r| r.text.trim())
            .find(|t| !t.is_empty())
    }
}

fn unqualified(tag: &str) -> &str {
    tag.split_once(':').map_or(tag, |(_, local)| local)
}

/// Text of the first `element` (bare or `mods:`-prefixed) in a MODS document
pub fn first_element_text(xml: &str, element: &str) -> Result<Option<String>> {
    let prefixed = format!("mods:{element}");
    let wanted = |name: &[u8]| name == element.as_bytes() || name == prefixed.as_bytes();

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut capture: Option<String> = None;

    loop {
        match reader.read_event().map_err(quick_xml::Error::from)? {
            Event::Start(start) if capture.is_none() && wanted(start.name().as_ref()) => {
                capture = Some(String::new());
            }
            Event::Text(text) => {
                if let Some(buf) = capture.as_mut() {
                    buf.push_str(&text.unescape().map_err(quick_xml::Error::from)?);
                }
            }
            Event::End(end) if wanted(end.name().as_ref()) => {
                if let Some(buf) = capture.take() {
                    return Ok(Some(buf.trim().to_string()));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

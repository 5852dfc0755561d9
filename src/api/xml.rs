use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::map::Entry;
use serde_json::{Map, Value};

use super::GeonamesError;

const ATTRIBUTES_KEY: &str = "$";
const TEXT_KEY: &str = "_";

/// An element whose end tag has not been seen yet
#[derive(Debug, Default)]
struct OpenElement {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl OpenElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, GeonamesError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(decode_error)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(decode_error)?;
            attributes.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }

    fn into_value(self) -> (String, Value) {
        let OpenElement {
            name,
            attributes,
            children,
            text,
        } = self;
        let text = text.trim();

        if attributes.is_empty() && children.is_empty() {
            return (name, Value::String(text.to_string()));
        }

        let mut object = Map::new();
        if !attributes.is_empty() {
            object.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
        }
        if !text.is_empty() {
            object.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        }
        object.extend(children);
        (name, Value::Object(object))
    }
}

fn decode_error(err: impl std::fmt::Display) -> GeonamesError {
    GeonamesError::Decode(format!("invalid XML: {err}"))
}

/// Single children stay scalar; a repeated name turns into an array.
fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.entry(name) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(mut slot) => match slot.get_mut() {
            Value::Array(items) => items.push(value),
            existing => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        },
    }
}

fn close(
    stack: &mut Vec<OpenElement>,
    root: &mut Option<(String, Value)>,
    element: OpenElement,
) -> Result<(), GeonamesError> {
    let (name, value) = element.into_value();
    match stack.last_mut() {
        Some(parent) => insert_child(&mut parent.children, name, value),
        None if root.is_none() => *root = Some((name, value)),
        None => return Err(decode_error("more than one root element")),
    }
    Ok(())
}

/// Translate an XML document into the equivalent JSON value.
///
/// Follows the usual "non-explicit array" mapping: the root element becomes
/// the only key of the returned object, text is trimmed, attributes sit
/// under `"$"`, and only repeated child elements become arrays.
pub fn xml_to_json(xml: &str) -> Result<Value, GeonamesError> {
    // Text is trimmed once per element on close, not per event
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(OpenElement::from_start(&e)?),
            Ok(Event::Empty(e)) => {
                let element = OpenElement::from_start(&e)?;
                close(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                if let Some(element) = stack.last_mut() {
                    let text = e.unescape().map_err(decode_error)?;
                    element.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(element) = stack.last_mut() {
                    element.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| decode_error("unexpected closing tag"))?;
                close(&mut stack, &mut root, element)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(decode_error(e)),
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(decode_error(format!("unclosed element <{}>", open.name)));
    }

    let (name, value) = root.ok_or_else(|| decode_error("document has no root element"))?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_child_stays_scalar() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<geonames>
  <geoname>
    <toponymName>Beringen</toponymName>
    <geonameId>2802433</geonameId>
    <fcode>PPL</fcode>
  </geoname>
</geonames>"#;

        let value = xml_to_json(xml).unwrap();
        assert_eq!(
            value,
            json!({
                "geonames": {
                    "geoname": {
                        "toponymName": "Beringen",
                        "geonameId": "2802433",
                        "fcode": "PPL"
                    }
                }
            })
        );
    }

    #[test]
    fn test_repeated_children_become_array() {
        let xml = "<geonames><geoname><name>Earth</name></geoname>\
                   <geoname><name>Europe</name></geoname>\
                   <geoname><name>Belgium</name></geoname></geonames>";

        let value = xml_to_json(xml).unwrap();
        let nodes = value["geonames"]["geoname"].as_array().unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[2]["name"], "Belgium");
    }

    #[test]
    fn test_text_is_trimmed_and_unescaped() {
        let value = xml_to_json("<a><b>  Saint &amp; Co  </b><c/></a>").unwrap();
        assert_eq!(value["a"]["b"], "Saint & Co");
        assert_eq!(value["a"]["c"], "");
    }

    #[test]
    fn test_mixed_text_keeps_inner_whitespace() {
        let value = xml_to_json("<a>hello <b>x</b> world</a>").unwrap();
        assert_eq!(value, json!({"a": {"_": "hello  world", "b": "x"}}));
    }

    #[test]
    fn test_attributes_and_mixed_text() {
        let value = xml_to_json(r#"<status message="user does not exist." value="10">x<y>1</y></status>"#)
            .unwrap();
        assert_eq!(value["status"]["$"]["message"], "user does not exist.");
        assert_eq!(value["status"]["$"]["value"], "10");
        assert_eq!(value["status"]["_"], "x");
        assert_eq!(value["status"]["y"], "1");
    }

    #[test]
    fn test_malformed_documents_rejected() {
        assert!(matches!(
            xml_to_json("<geonames><geoname>"),
            Err(GeonamesError::Decode(_))
        ));
        assert!(matches!(xml_to_json(""), Err(GeonamesError::Decode(_))));
        assert!(matches!(
            xml_to_json("<a></b>"),
            Err(GeonamesError::Decode(_))
        ));
    }
}

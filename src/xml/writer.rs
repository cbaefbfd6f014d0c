// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Serialize an owned [`Document`] through [`quick_xml::Writer`].

use super::{Document, Element, Node, Result};

use quick_xml::{
    events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event},
    Writer,
};
use std::io::Write;

/// Write `document` as indented UTF-8 XML.
///
/// Output always starts with an XML declaration, followed by the prolog
/// with the document type declaration at its recorded position, and then
/// the root element. Elements that only hold text are kept on one line.
///
/// # Errors
///
/// - Return [`XmlError::Io`](super::XmlError::Io) if `output` cannot be
///   written to.
pub fn write_document(document: &Document, output: impl Write) -> Result<()> {
    let mut writer = Writer::new_with_indent(output, b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let (before, after) = document.prolog().split_at(document.doctype_position());
    for node in before {
        write_node(&mut writer, node)?;
    }

    if let Some(doctype) = document.doctype() {
        let content = doctype.to_string();
        writer.write_event(Event::DocType(BytesText::from_escaped(content.as_str())))?;
    }

    for node in after {
        write_node(&mut writer, node)?;
    }

    write_element(&mut writer, document.root())?;
    writer.get_mut().write_all(b"\n")?;

    Ok(())
}

/// Write document into a string.
pub fn write_string(document: &Document) -> Result<String> {
    let mut buffer = Vec::new();
    write_document(document, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &Node) -> Result<()> {
    match node {
        Node::Element(element) => write_element(writer, element)?,
        Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        Node::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
        Node::Comment(text) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
        }
        Node::ProcessingInstruction(text) => {
            writer.write_event(Event::PI(BytesPI::new(text.as_str())))?
        }
    }

    Ok(())
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<()> {
    let name = element.qualified_name();
    let start = BytesStart::new(name.as_str()).with_attributes(
        element
            .attributes()
            .iter()
            .map(|attr| (attr.name.as_str(), attr.value.as_str())),
    );

    if element.children().is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for node in element.children() {
        write_node(writer, node)?;
    }
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{reader::parse_str, DocType};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn write_pretty_document() -> anyhow::Result<()> {
        let root = Element::new("web-app")
            .with_child(
                Element::new("context-param")
                    .with_child(Element::new("param-name").with_text("a<b"))
                    .with_child(Element::new("param-value").with_text("1")),
            )
            .with_child(Element::new("distributable"));
        let document = Document::new(root).with_doctype(DocType::public(
            "web-app",
            "-//Sun Microsystems, Inc.//DTD Web Application 2.3//EN",
            "http://java.sun.com/dtd/web-app_2_3.dtd",
        ));

        let result = write_string(&document)?;
        let expect = indoc! {r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <!DOCTYPE web-app PUBLIC "-//Sun Microsystems, Inc.//DTD Web Application 2.3//EN" "http://java.sun.com/dtd/web-app_2_3.dtd">
            <web-app>
                <context-param>
                    <param-name>a&lt;b</param-name>
                    <param-value>1</param-value>
                </context-param>
                <distributable/>
            </web-app>
        "#};
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn write_then_parse_is_stable() -> anyhow::Result<()> {
        let input = indoc! {r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <!-- header -->
            <web-app xmlns="http://java.sun.com/xml/ns/javaee" version="2.5">
                <!-- filters -->
                <filter>
                    <filter-name>f</filter-name>
                    <filter-class>org.example.F</filter-class>
                </filter>
            </web-app>
        "#};
        let document = parse_str(input)?;
        let output = write_string(&document)?;
        assert_eq!(parse_str(&output)?, document);
        assert_eq!(output, input);

        Ok(())
    }
}

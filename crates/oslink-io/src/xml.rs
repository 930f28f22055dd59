//! Small helpers shared by the XML readers.

use oslink_core::{OslinkError, OslinkResult};
use quick_xml::events::BytesStart;
use quick_xml::name::LocalName;

pub(crate) fn xml_error(err: quick_xml::Error) -> OslinkError {
    OslinkError::MalformedDocument(format!("xml: {err}"))
}

pub(crate) fn attribute_value(event: &BytesStart, key: &str) -> OslinkResult<Option<String>> {
    for attr in event.attributes().with_checks(false) {
        let attr =
            attr.map_err(|err| OslinkError::MalformedDocument(format!("xml attribute: {err}")))?;
        if attr.key.local_name().as_ref() == key.as_bytes() {
            let value = attr.unescape_value().map_err(xml_error)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

pub(crate) fn local_name_as_str<'a>(name: &'a LocalName<'a>) -> &'a str {
    std::str::from_utf8(name.as_ref()).unwrap_or_default()
}

pub(crate) fn usize_attr(event: &BytesStart, key: &str) -> OslinkResult<Option<usize>> {
    match attribute_value(event, key)? {
        None => Ok(None),
        Some(text) => parse_usize(key, &text).map(Some),
    }
}

pub(crate) fn i64_attr(event: &BytesStart, key: &str) -> OslinkResult<Option<i64>> {
    match attribute_value(event, key)? {
        None => Ok(None),
        Some(text) => text
            .parse()
            .map(Some)
            .map_err(|_| OslinkError::MalformedDocument(format!("bad {key} value '{text}'"))),
    }
}

pub(crate) fn f64_attr(event: &BytesStart, key: &str) -> OslinkResult<Option<f64>> {
    match attribute_value(event, key)? {
        None => Ok(None),
        Some(text) => parse_f64(key, &text).map(Some),
    }
}

pub(crate) fn parse_usize(what: &str, text: &str) -> OslinkResult<usize> {
    text.parse()
        .map_err(|_| OslinkError::MalformedDocument(format!("bad {what} value '{text}'")))
}

pub(crate) fn parse_f64(what: &str, text: &str) -> OslinkResult<f64> {
    text.parse()
        .map_err(|_| OslinkError::MalformedDocument(format!("bad {what} value '{text}'")))
}
